//! Sinks for progress events emitted during a run.

use std::sync::mpsc;

use futures::{stream::BoxStream, StreamExt};
use pagespeed_types::events::{ProgressEvent, ProgressStage};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

/// Receives progress events synchronously, in emission order.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Writes every event to the log. Countdown ticks go to `debug`.
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        match event.stage {
            ProgressStage::Waiting { remaining_secs } => debug!(
                remaining_secs,
                completed = event.completed_count,
                total = event.total_count,
                "{}",
                event.message
            ),
            ProgressStage::IterationFailed { index } => warn!(
                iteration = index,
                completed = event.completed_count,
                total = event.total_count,
                error = event
                    .iteration
                    .as_ref()
                    .and_then(|it| it.error.as_deref())
                    .unwrap_or_default(),
                "{}",
                event.message
            ),
            _ => info!(
                completed = event.completed_count,
                total = event.total_count,
                "{}",
                event.message
            ),
        }
    }
}

/// Forwards events over a std channel, for consumers on a blocking thread.
pub struct ChannelObserver {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        // A closed receiver only means nobody is watching any more.
        let _ = self.tx.send(event.clone());
    }
}

/// Publishes events to any number of async subscribers.
#[derive(Clone)]
pub struct BroadcastObserver {
    tx: broadcast::Sender<ProgressEvent>,
}

impl BroadcastObserver {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> BoxStream<'static, ProgressEvent> {
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(|event| async move { event.ok() })
            .boxed()
    }
}

impl ProgressObserver for BroadcastObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        let _ = self.tx.send(event.clone());
    }
}

/// Fans each event out to several observers.
#[derive(Default)]
pub struct CompositeObserver<'a> {
    observers: Vec<&'a dyn ProgressObserver>,
}

impl<'a> CompositeObserver<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: &'a dyn ProgressObserver) -> Self {
        self.observers.push(observer);
        self
    }
}

impl ProgressObserver for CompositeObserver<'_> {
    fn on_progress(&self, event: &ProgressEvent) {
        for observer in &self.observers {
            observer.on_progress(event);
        }
    }
}
