//! Errors raised by the core pipeline.
//!
//! Nothing here is fatal: the controller logs, counts, and moves on to the
//! next tick.

use thiserror::Error;

use crate::protocol::Channel;

#[derive(Debug, Error)]
pub enum PublishError {
    /// No client connected; the notification is dropped, not buffered.
    #[error("no client connected, {0} notification dropped")]
    NotConnected(Channel),

    /// The BLE stack refused the write.
    #[error("{channel} notify failed")]
    Transport {
        channel: Channel,
        #[source]
        source: anyhow::Error,
    },
}
