//! Poll Timer
//!
//! A cancellable, fixed-period ticker. Ticks are delivered as
//! [`ControllerEvent::Tick`] on the controller's event channel, so they are
//! handled on the same loop as every other state change. Each tick carries
//! the timer's id; a tick already queued when its timer is cancelled can
//! still be received and is recognised by that id.
//!
//! The timer runs until [`PollTimer::cancel`] is called or the handle is
//! dropped. Missed ticks are delayed rather than bursted, so a stalled loop
//! does not come back to a pile of queued polls.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::controller::ControllerEvent;

/// Handle to a running poll timer
#[derive(Debug)]
pub struct PollTimer {
    id: u64,
    period: Duration,
    handle: JoinHandle<()>,
}

impl PollTimer {
    /// Start ticking every `period`; the first tick fires one period from now
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(period: Duration, id: u64, tx: mpsc::UnboundedSender<ControllerEvent>) -> Self {
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if tx.send(ControllerEvent::Tick { timer: id }).is_err() {
                    // Controller is gone
                    break;
                }
            }
        });

        tracing::debug!(id, period_ms = period.as_millis() as u64, "Poll timer started");
        Self { id, period, handle }
    }

    /// Id stamped on every tick this timer sends
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Tick period
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether the timer task is still running
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the timer; no further ticks are sent
    pub fn cancel(&self) {
        if !self.handle.is_finished() {
            self.handle.abort();
            tracing::debug!("Poll timer cancelled");
        }
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
