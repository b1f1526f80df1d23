// Bandy - Button Gesture Dispatcher
//
// Debounced button handler with single-click, double-click, and long-press
// detection.  Polled once per scheduler tick with the tick's `now`; it never
// reads the clock itself.

use crate::config::GestureConfig;
use crate::events::Gesture;
use crate::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    /// Debounced press accepted at `since`.
    Pressed { since: Millis },
    /// Released after a short press; waiting for another click.
    AwaitingNextClick { released_at: Millis },
    /// Held past the long-press threshold.
    LongPressHeld,
    /// Already down when the dispatcher started; ignored until released.
    Latched,
}

pub struct GestureDispatcher {
    config: GestureConfig,
    phase: Phase,
    clicks: u8,

    // Debounce filter: the phase machine only sees `stable`.
    last_raw: bool,
    last_change: Millis,
    stable: bool,
}

impl GestureDispatcher {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            clicks: 0,
            last_raw: false,
            last_change: 0,
            stable: false,
        }
    }

    /// Treat the button as held since `now` and swallow that press.  Used at
    /// boot when the wake button is still down.
    pub fn latch_held(&mut self, now: Millis) {
        self.phase = Phase::Latched;
        self.clicks = 0;
        self.last_raw = true;
        self.last_change = now;
        self.stable = true;
    }

    #[cfg(test)]
    fn is_long_pressed(&self) -> bool {
        self.phase == Phase::LongPressHeld
    }

    #[cfg(test)]
    fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Feed the current (already active-level-corrected) button state.
    pub fn update(&mut self, pressed: bool, now: Millis) -> Option<Gesture> {
        // ---- debounce filter ----
        if pressed != self.last_raw {
            self.last_raw = pressed;
            self.last_change = now;
        }
        if self.last_raw != self.stable
            && now.wrapping_sub(self.last_change) >= self.config.debounce_ms
        {
            self.stable = self.last_raw;
        }
        let pressed = self.stable;

        match self.phase {
            Phase::Idle => {
                if pressed {
                    self.clicks = 0;
                    self.phase = Phase::Pressed { since: now };
                }
                None
            }

            Phase::Pressed { since } => {
                if !pressed {
                    self.clicks = self.clicks.saturating_add(1);
                    self.phase = Phase::AwaitingNextClick { released_at: now };
                    None
                } else if now.wrapping_sub(since) > self.config.long_press_ms {
                    self.clicks = 0;
                    self.phase = Phase::LongPressHeld;
                    Some(Gesture::LongPressStart)
                } else {
                    None
                }
            }

            Phase::AwaitingNextClick { released_at } => {
                if pressed {
                    self.phase = Phase::Pressed { since: now };
                    None
                } else if now.wrapping_sub(released_at) > self.config.click_window_ms {
                    let gesture = if self.clicks >= 2 {
                        Gesture::DoubleClick
                    } else {
                        Gesture::Click
                    };
                    self.clicks = 0;
                    self.phase = Phase::Idle;
                    Some(gesture)
                } else {
                    None
                }
            }

            Phase::LongPressHeld => {
                if !pressed {
                    self.phase = Phase::Idle;
                    Some(Gesture::LongPressStop)
                } else {
                    None
                }
            }

            Phase::Latched => {
                if !pressed {
                    self.phase = Phase::Idle;
                }
                None
            }
        }
    }
}
