//! Queue manager: owns the queue and drives decoding and classification rounds.
//!
//! Background tasks never touch the queue. They post messages over a channel and the owner
//! applies them through [`QueueManager::poll`] or [`QueueManager::next_event`], so every
//! mutation happens on the thread that owns the manager.

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::classifier::Classifier;
use crate::error::{ClassifyError, QueueError};
use crate::intake::{DecodedImage, ImageFile, decode_batch};
use crate::queue::{Category, ImageId, ImageQueue, ImageStatus, QueuedImage, Upload};

/// Called whenever a background task has posted a message, e.g. to request a repaint.
pub type Notifier = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoundId(u64);

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundSummary {
    pub classified: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// What changed after applying a background message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// A decoded batch was appended; `dropped` files could not be read.
    BatchAdded { ids: Vec<ImageId>, dropped: usize },
    Classified { id: ImageId, category: Category },
    /// The request failed. The entry stays processing until the next round.
    ClassificationFailed { id: ImageId, error: String },
    /// A result arrived for an entry that was removed, cleared or re-submitted.
    Discarded { id: ImageId },
    RoundFinished { round: RoundId, summary: RoundSummary },
}

enum Outcome {
    Classified(Category),
    Failed(ClassifyError),
    Cancelled,
}

enum Message {
    Decoded {
        batch: Vec<DecodedImage>,
        requested: usize,
    },
    Settled {
        round: RoundId,
        id: ImageId,
        outcome: Outcome,
    },
    RoundDone {
        round: RoundId,
        summary: RoundSummary,
    },
}

struct ActiveRound {
    id: RoundId,
    cancel: CancellationToken,
    per_image: HashMap<ImageId, CancellationToken>,
}

pub struct QueueManager<C: Classifier> {
    queue: ImageQueue,
    classifier: Arc<C>,
    max_in_flight: usize,
    runtime: Handle,
    tx: UnboundedSender<Message>,
    rx: UnboundedReceiver<Message>,
    round: Option<ActiveRound>,
    next_round: u64,
    shutdown: CancellationToken,
    notifier: Option<Notifier>,
}

impl<C: Classifier> QueueManager<C> {
    pub fn new(classifier: C, max_in_flight: usize, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            queue: ImageQueue::new(),
            classifier: Arc::new(classifier),
            max_in_flight: max_in_flight.max(1),
            runtime,
            tx,
            rx,
            round: None,
            next_round: 0,
            shutdown: CancellationToken::new(),
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: impl Fn() + Send + Sync + 'static) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    /// Snapshot of the queue for rendering.
    pub fn queue(&self) -> &ImageQueue {
        &self.queue
    }

    pub fn is_classifying(&self) -> bool {
        self.round.is_some()
    }

    /// Swap the classifier and concurrency bound. A running round keeps its old settings.
    pub fn reconfigure(&mut self, classifier: C, max_in_flight: usize) {
        self.classifier = Arc::new(classifier);
        self.max_in_flight = max_in_flight.max(1);
    }

    /// Decode `files` in the background and append them as one batch, in input order.
    pub fn add_files(&self, files: Vec<ImageFile>) {
        if files.is_empty() {
            return;
        }
        let requested = files.len();
        tracing::info!("Decoding {} file(s)", requested);
        let tx = self.tx.clone();
        let notifier = self.notifier.clone();
        let shutdown = self.shutdown.clone();
        self.runtime.spawn(async move {
            let batch = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return,
                batch = decode_batch(files) => batch,
            };
            if tx.send(Message::Decoded { batch, requested }).is_ok() {
                notify(&notifier);
            }
        });
    }

    /// Mark every entry as processing and classify them all, at most `max_in_flight`
    /// requests at a time. Results are merged by id as they arrive.
    pub fn classify_all(&mut self) -> Result<RoundId, QueueError> {
        let uploads = self.queue.begin_round()?;
        if let Some(previous) = self.round.take() {
            tracing::info!("Superseding {}", previous.id);
            previous.cancel.cancel();
        }

        let round = RoundId(self.next_round);
        self.next_round += 1;
        let cancel = self.shutdown.child_token();
        let mut per_image = HashMap::with_capacity(uploads.len());
        let jobs: Vec<(Upload, CancellationToken)> = uploads
            .into_iter()
            .map(|upload| {
                let token = cancel.child_token();
                per_image.insert(upload.id, token.clone());
                (upload, token)
            })
            .collect();
        tracing::info!(
            "Starting {} for {} image(s), {} at a time",
            round,
            jobs.len(),
            self.max_in_flight
        );

        self.runtime.spawn(run_round(
            Arc::clone(&self.classifier),
            jobs,
            self.max_in_flight,
            round,
            self.tx.clone(),
            self.notifier.clone(),
        ));
        self.round = Some(ActiveRound {
            id: round,
            cancel,
            per_image,
        });
        Ok(round)
    }

    /// Remove the entry at `index`. Its outstanding request, if any, is cancelled.
    pub fn remove_at(&mut self, index: usize) -> Result<QueuedImage, QueueError> {
        let removed = self.queue.remove_at(index)?;
        if let Some(token) = self
            .round
            .as_mut()
            .and_then(|round| round.per_image.remove(&removed.id()))
        {
            token.cancel();
        }
        Ok(removed)
    }

    /// Drop every entry and cancel the running round. Safe to call repeatedly.
    pub fn clear_all(&mut self) {
        self.queue.clear();
        if let Some(round) = self.round.take() {
            tracing::info!("Cancelling {}", round.id);
            round.cancel.cancel();
        }
    }

    /// Apply every message posted so far without waiting.
    pub fn poll(&mut self) -> Vec<QueueEvent> {
        let mut events = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            events.extend(self.apply(message));
        }
        events
    }

    /// Wait for the next message that produces an event and apply it.
    ///
    /// The manager keeps a sender of its own, so this never yields `None` while it is alive:
    /// on an idle manager it waits indefinitely. Bound it with `tokio::time::timeout` when
    /// nothing is pending.
    pub async fn next_event(&mut self) -> Option<QueueEvent> {
        loop {
            let message = self.rx.recv().await?;
            if let Some(event) = self.apply(message) {
                return Some(event);
            }
        }
    }

    fn apply(&mut self, message: Message) -> Option<QueueEvent> {
        match message {
            Message::Decoded { batch, requested } => {
                let dropped = requested - batch.len();
                let ids = self.queue.append_batch(batch);
                tracing::info!("Queued {} image(s), {} dropped", ids.len(), dropped);
                Some(QueueEvent::BatchAdded { ids, dropped })
            }
            Message::Settled { round, id, outcome } => {
                let current = match self.round.as_mut() {
                    Some(active) if active.id == round => active,
                    _ => {
                        tracing::debug!("Discarding result for {} from stale {}", id, round);
                        return Some(QueueEvent::Discarded { id });
                    }
                };
                current.per_image.remove(&id);
                match outcome {
                    Outcome::Classified(category) => {
                        if self.queue.complete(id, category.clone()) {
                            Some(QueueEvent::Classified { id, category })
                        } else {
                            tracing::debug!("Discarding result for removed image {}", id);
                            Some(QueueEvent::Discarded { id })
                        }
                    }
                    Outcome::Failed(error) => {
                        let Some(entry) = self
                            .queue
                            .get(id)
                            .filter(|e| *e.status() == ImageStatus::Processing)
                        else {
                            tracing::debug!("Discarding failure for removed image {}", id);
                            return Some(QueueEvent::Discarded { id });
                        };
                        tracing::error!(
                            "Error during classification of {}: {}",
                            entry.name(),
                            error
                        );
                        Some(QueueEvent::ClassificationFailed {
                            id,
                            error: error.to_string(),
                        })
                    }
                    Outcome::Cancelled => None,
                }
            }
            Message::RoundDone { round, summary } => {
                if self.round.as_ref().is_some_and(|active| active.id == round) {
                    self.round = None;
                }
                tracing::info!(
                    "Finished {}: {} classified, {} failed, {} cancelled",
                    round,
                    summary.classified,
                    summary.failed,
                    summary.cancelled
                );
                Some(QueueEvent::RoundFinished { round, summary })
            }
        }
    }
}

impl<C: Classifier> Drop for QueueManager<C> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_round<C: Classifier>(
    classifier: Arc<C>,
    jobs: Vec<(Upload, CancellationToken)>,
    max_in_flight: usize,
    round: RoundId,
    tx: UnboundedSender<Message>,
    notifier: Option<Notifier>,
) {
    let mut summary = RoundSummary::default();
    let mut settled = stream::iter(jobs)
        .map(move |(upload, cancel)| {
            let classifier = Arc::clone(&classifier);
            async move {
                let id = upload.id;
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Outcome::Cancelled,
                    result = classifier.classify(upload) => match result {
                        Ok(category) => Outcome::Classified(category),
                        Err(error) => Outcome::Failed(error),
                    },
                };
                (id, outcome)
            }
        })
        .buffer_unordered(max_in_flight);

    while let Some((id, outcome)) = settled.next().await {
        match outcome {
            Outcome::Classified(_) => summary.classified += 1,
            Outcome::Failed(_) => summary.failed += 1,
            Outcome::Cancelled => {
                summary.cancelled += 1;
                continue;
            }
        }
        if tx.send(Message::Settled { round, id, outcome }).is_err() {
            return;
        }
        notify(&notifier);
    }

    if tx.send(Message::RoundDone { round, summary }).is_ok() {
        notify(&notifier);
    }
}

fn notify(notifier: &Option<Notifier>) {
    if let Some(notify) = notifier {
        notify();
    }
}
