// Bandy - Connection Lifecycle
//
// Turns the transport's level-triggered "connected" flag into connect and
// disconnect edges, evaluated exactly once per tick against a shadow copy.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionEdges {
    pub entered: bool,
    pub left: bool,
}

#[derive(Debug, Default)]
pub struct ConnectionLifecycle {
    old_connected: bool,
    /// Re-advertise once the current client goes away.
    readvertise_armed: bool,
    /// Notifications sent on the current connection.
    notifications: u32,
    connections: u32,
}

impl ConnectionLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.old_connected
    }

    pub fn notifications(&self) -> u32 {
        self.notifications
    }

    /// Connections accepted since boot.
    pub fn connections(&self) -> u32 {
        self.connections
    }

    pub fn count_notification(&mut self) {
        self.notifications = self.notifications.wrapping_add(1);
    }

    pub fn on_tick(&mut self, connected_now: bool) -> ConnectionEdges {
        let edges = ConnectionEdges {
            entered: connected_now && !self.old_connected,
            left: !connected_now && self.old_connected,
        };
        self.old_connected = connected_now;

        if edges.entered {
            self.connections += 1;
            self.notifications = 0;
            self.readvertise_armed = true;
            log::info!("Client connected (#{})", self.connections);
        }
        if edges.left {
            log::info!(
                "Client disconnected after {} notifications",
                self.notifications
            );
        }
        edges
    }

    /// Consume the re-advertise request armed on connect.
    pub fn take_readvertise(&mut self) -> bool {
        core::mem::take(&mut self.readvertise_armed)
    }
}
