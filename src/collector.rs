//! Bounded-time, filtered event collector
//!
//! A collector listens for participant actions for a fixed window. Events
//! that pass its filter are handed to a handler one at a time, in the order
//! they were pushed. The collector ends when the window elapses, when it is
//! stopped through a handle, or when the handler asks it to stop. Whatever
//! the cause, the end callback runs exactly once and no event is handled
//! after it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

/// What the handler wants after processing an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Why a collector finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The window ran out
    Elapsed,
    /// Stopped through a handle or by the handler
    Stopped,
}

/// An event the collector refused, handed back to the caller
#[derive(Debug)]
pub enum Rejected<E> {
    /// The filter said no
    Filtered(E),
    /// The collector already ended (or is ending)
    Closed(E),
}

impl<E> Rejected<E> {
    pub fn into_inner(self) -> E {
        match self {
            Rejected::Filtered(event) | Rejected::Closed(event) => event,
        }
    }
}

type Filter<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Handle for pushing events into a running collector and stopping it
pub struct CollectorHandle<E> {
    events: mpsc::UnboundedSender<E>,
    filter: Filter<E>,
    stop: Arc<watch::Sender<bool>>,
    done: watch::Receiver<Option<EndReason>>,
}

impl<E> Clone for CollectorHandle<E> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            filter: self.filter.clone(),
            stop: self.stop.clone(),
            done: self.done.clone(),
        }
    }
}

impl<E> std::fmt::Debug for CollectorHandle<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<E> CollectorHandle<E> {
    /// Queue an event for the handler
    pub fn push(&self, event: E) -> Result<(), Rejected<E>> {
        if self.is_closed() {
            return Err(Rejected::Closed(event));
        }
        if !(self.filter)(&event) {
            return Err(Rejected::Filtered(event));
        }
        self.events
            .send(event)
            .map_err(|mpsc::error::SendError(event)| Rejected::Closed(event))
    }

    /// Ask the collector to stop. Idempotent.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// True once the collector stopped accepting events
    pub fn is_closed(&self) -> bool {
        *self.stop.borrow() || self.events.is_closed()
    }

    /// The end reason, if the end callback already completed
    pub fn end_reason(&self) -> Option<EndReason> {
        *self.done.borrow()
    }

    /// Wait until the collector ended and its end callback completed
    pub async fn finished(&self) -> EndReason {
        let mut done = self.done.clone();
        loop {
            if let Some(reason) = *done.borrow_and_update() {
                return reason;
            }
            if done.changed().await.is_err() {
                // Task vanished without reporting (runtime shutdown)
                return EndReason::Stopped;
            }
        }
    }
}

/// Start a collector running for `window`
///
/// `handler` sees every accepted event exactly once. `on_end` runs once,
/// after the last handled event.
pub fn spawn<E, F, H, HFut, D, DFut>(
    window: Duration,
    filter: F,
    mut handler: H,
    on_end: D,
) -> CollectorHandle<E>
where
    E: Send + 'static,
    F: Fn(&E) -> bool + Send + Sync + 'static,
    H: FnMut(E) -> HFut + Send + 'static,
    HFut: Future<Output = Flow> + Send + 'static,
    D: FnOnce(EndReason) -> DFut + Send + 'static,
    DFut: Future<Output = ()> + Send + 'static,
{
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let (done_tx, done_rx) = watch::channel(None);
    let deadline = Instant::now() + window;

    tokio::spawn(async move {
        let reason = loop {
            tokio::select! {
                biased;

                _ = stop_rx.changed() => break EndReason::Stopped,

                _ = tokio::time::sleep_until(deadline) => break EndReason::Elapsed,

                event = events_rx.recv() => match event {
                    Some(event) => {
                        if handler(event).await == Flow::Stop {
                            break EndReason::Stopped;
                        }
                    }
                    None => break EndReason::Stopped,
                },
            }
        };

        // Anything still queued is dropped unhandled
        events_rx.close();
        drop(events_rx);

        tracing::debug!("Collector ended: {:?}", reason);
        on_end(reason).await;
        done_tx.send_replace(Some(reason));
    });

    CollectorHandle {
        events: events_tx,
        filter: Arc::new(filter),
        stop: Arc::new(stop_tx),
        done: done_rx,
    }
}
