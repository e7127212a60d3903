//! One-shot timers that post a message into a mailbox
//!
//! Timers never touch session state themselves: when they fire they send a
//! message to the task owning that state, which decides what it means.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Cancellable handle to a scheduled message
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Cancel the timer. A message that was already delivered stays delivered.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

/// Deliver `msg` to `tx` after `delay`
pub fn schedule<T>(delay: Duration, tx: mpsc::UnboundedSender<T>, msg: T) -> TimerHandle
where
    T: Send + 'static,
{
    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        // Receiver gone means the owner already shut down
        let _ = tx.send(msg);
    });
    TimerHandle { task }
}

/// The pair of collection-phase timers, always cancelled together
#[derive(Debug, Default)]
pub struct PhaseTimers {
    pub warning: Option<TimerHandle>,
    pub end: Option<TimerHandle>,
}

impl PhaseTimers {
    pub fn cancel_all(&mut self) {
        if let Some(timer) = self.warning.take() {
            timer.cancel();
        }
        if let Some(timer) = self.end.take() {
            timer.cancel();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.warning.is_some() || self.end.is_some()
    }
}
