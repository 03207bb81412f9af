//! The periodic tick thread.
//!
//! A dedicated thread drives reconciliation at a fixed interval. Control
//! messages arrive on a channel and the wait itself is the schedule:
//! `recv_timeout(interval)` either times out (run a tick) or yields a
//! control message. Replacing the interval restarts a full wait, so no
//! partial-interval tick is ever issued; shutdown lets the in-flight tick
//! finish — there is no mid-tick cancellation.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::engine::EngineState;

/// Messages from the engine facade to the tick thread.
pub(crate) enum ControlMsg {
    /// Replace the tick interval, effective from the next scheduled tick.
    SetInterval(Duration),
    /// Stop the schedule and exit the thread.
    Shutdown,
}

/// State owned by the tick thread's main loop.
pub(crate) struct TickLoop {
    state: Arc<EngineState>,
    control_rx: Receiver<ControlMsg>,
    interval: Duration,
}

impl TickLoop {
    pub fn new(state: Arc<EngineState>, control_rx: Receiver<ControlMsg>, interval: Duration) -> Self {
        Self {
            state,
            control_rx,
            interval,
        }
    }

    /// Run until shutdown. The first tick fires immediately; the schedule
    /// starts from there.
    pub fn run(mut self) {
        self.state.tick();
        loop {
            match self.control_rx.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => self.state.tick(),
                Ok(ControlMsg::SetInterval(interval)) => self.interval = interval,
                // A dropped sender means the owner is gone; treat it as
                // shutdown rather than ticking forever.
                Ok(ControlMsg::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }
}
