//! Diff sync: commit transitions -> remote batches
//!
//! # Core Concepts
//!
//! - **[`DiffSync`]**: store-side handle. Diffs each transition and queues
//!   the batch without waiting on the network. Holds the pause switch.
//! - **[`SyncWorker`]**: drains the queue on the tokio runtime and calls the
//!   remote, one batch at a time, in commit order.
//! - **[`SyncFailures`]**: receiving end of failed batches. Nothing is
//!   retried; the UI shows the error and the pending changes, then reloads.

use crate::batch::TopicBatch;
use crate::error::{RemoteError, SyncFailure};
use crate::remote::TopicRemote;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use topic_graph::TopicState;

/// Batch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStatus {
    /// Batches handed to the worker
    pub queued: u64,
    /// Batches the remote accepted
    pub dispatched: u64,
    /// Batches that failed (remote error or queue unavailable)
    pub failed: u64,
    /// Transitions ignored while paused
    pub skipped_while_paused: u64,
}

impl SyncStatus {
    /// Batches queued but not yet answered
    #[inline]
    #[must_use]
    pub fn in_flight(&self) -> u64 {
        self.queued.saturating_sub(self.dispatched + self.failed)
    }
}

/// Failed batches, in the order they failed
#[derive(Debug)]
pub struct SyncFailures {
    receiver: mpsc::UnboundedReceiver<SyncFailure>,
}

impl SyncFailures {
    /// Next failure if one is waiting
    pub fn try_next(&mut self) -> Option<SyncFailure> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next failure; `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<SyncFailure> {
        self.receiver.recv().await
    }
}

/// Store-side sync handle
#[derive(Debug)]
pub struct DiffSync {
    paused: bool,
    sender: Option<mpsc::Sender<TopicBatch>>,
    failures: mpsc::UnboundedSender<SyncFailure>,
    status: Arc<Mutex<SyncStatus>>,
}

/// Worker draining queued batches into the remote
pub struct SyncWorker {
    topic: String,
    remote: Arc<dyn TopicRemote>,
    receiver: mpsc::Receiver<TopicBatch>,
    failures: mpsc::UnboundedSender<SyncFailure>,
    status: Arc<Mutex<SyncStatus>>,
}

impl std::fmt::Debug for SyncWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncWorker").field("topic", &self.topic).finish_non_exhaustive()
    }
}

impl DiffSync {
    /// Handle, worker and failure receiver for `topic`
    ///
    /// The worker must be driven (see [`SyncWorker::run`]) for batches to
    /// reach the remote.
    #[must_use]
    pub fn channel(
        topic: impl Into<String>,
        remote: Arc<dyn TopicRemote>,
        capacity: usize,
    ) -> (Self, SyncWorker, SyncFailures) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (failures, failure_receiver) = mpsc::unbounded_channel();
        let status = Arc::new(Mutex::new(SyncStatus::default()));

        let sync = Self {
            paused: false,
            sender: Some(sender),
            failures: failures.clone(),
            status: Arc::clone(&status),
        };
        let worker = SyncWorker {
            topic: topic.into(),
            remote,
            receiver,
            failures,
            status,
        };
        (sync, worker, SyncFailures { receiver: failure_receiver })
    }

    /// Like [`DiffSync::channel`], with the worker spawned on the current
    /// tokio runtime
    ///
    /// # Panics
    /// Outside a tokio runtime.
    #[must_use]
    pub fn spawn(topic: impl Into<String>, remote: Arc<dyn TopicRemote>, capacity: usize) -> (Self, SyncFailures) {
        let (sync, worker, failures) = Self::channel(topic, remote, capacity);
        tokio::spawn(worker.run());
        (sync, failures)
    }

    /// Handle that never sends anything (local-only topics)
    #[must_use]
    pub fn disabled() -> (Self, SyncFailures) {
        let (failures, failure_receiver) = mpsc::unbounded_channel();
        let sync = Self {
            paused: false,
            sender: None,
            failures,
            status: Arc::new(Mutex::new(SyncStatus::default())),
        };
        (sync, SyncFailures { receiver: failure_receiver })
    }

    /// Stop diffing until [`DiffSync::resume`]
    ///
    /// Use around bulk writes (load, reset, restore) so they are not sent
    /// back to the remote.
    #[inline]
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Diff future transitions again; paused ones are not replayed
    #[inline]
    pub fn resume(&mut self) {
        self.paused = false;
    }

    #[inline]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Counters snapshot
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        *self.status.lock()
    }

    /// Diff a committed transition and queue the batch
    ///
    /// Returns the queued batch, or `None` when paused, disabled or nothing
    /// changed.
    pub fn on_transition(&mut self, before: &TopicState, after: &TopicState) -> Option<TopicBatch> {
        if self.paused {
            self.status.lock().skipped_while_paused += 1;
            tracing::debug!("sync paused, transition not diffed");
            return None;
        }
        let sender = self.sender.as_ref()?;

        let batch = TopicBatch::between(before, after);
        if batch.is_empty() {
            return None;
        }
        tracing::debug!(batch = %batch.id, changes = batch.len(), "queueing sync batch");

        match sender.try_send(batch.clone()) {
            Ok(()) => {
                self.status.lock().queued += 1;
                Some(batch)
            }
            Err(err) => {
                let reason = match err {
                    mpsc::error::TrySendError::Full(_) => "sync queue is full",
                    mpsc::error::TrySendError::Closed(_) => "sync worker stopped",
                };
                tracing::error!(batch = %batch.id, reason, "could not queue sync batch");
                self.status.lock().failed += 1;
                let failure = SyncFailure {
                    error: RemoteError::Unreachable(reason.to_string()),
                    pending: batch,
                };
                if self.failures.send(failure).is_err() {
                    tracing::warn!("sync failure dropped, nobody is listening");
                }
                None
            }
        }
    }
}

impl SyncWorker {
    /// Drain batches until every [`DiffSync`] handle is dropped
    pub async fn run(mut self) {
        tracing::info!(topic = %self.topic, "sync worker started");
        while let Some(batch) = self.receiver.recv().await {
            self.dispatch(batch).await;
        }
        tracing::info!(topic = %self.topic, "sync worker stopped");
    }

    /// Send queued batches until the queue is momentarily empty
    ///
    /// Returns how many batches were handled. Useful when driving the
    /// worker by hand.
    pub async fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(batch) = self.receiver.try_recv() {
            self.dispatch(batch).await;
            handled += 1;
        }
        handled
    }

    async fn dispatch(&self, batch: TopicBatch) {
        match self.remote.apply_batch(&self.topic, &batch).await {
            Ok(()) => {
                self.status.lock().dispatched += 1;
                tracing::info!(topic = %self.topic, batch = %batch.id, changes = batch.len(), "synced batch");
            }
            Err(error) => {
                self.status.lock().failed += 1;
                tracing::error!(
                    topic = %self.topic,
                    batch = %batch.id,
                    changes = batch.len(),
                    error = %error,
                    "sync failed"
                );
                let failure = SyncFailure { error, pending: batch };
                if self.failures.send(failure).is_err() {
                    tracing::warn!("sync failure dropped, nobody is listening");
                }
            }
        }
    }
}
