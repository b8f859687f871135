//! Hand-off between the push endpoint and persistence. The endpoint answers as
//! soon as a job is queued; the worker owns the write and its error handling.

use crate::ingestor::Ingestor;
use crate::metrics_defs::{PUSH_ENQUEUED, PUSH_FAILED};
use crate::record::CanonicalRecord;
use shared::counter;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct PushJob {
    pub key: String,
    pub record: CanonicalRecord,
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("push queue is full")]
    Full,

    #[error("push worker is no longer running")]
    Closed,
}

#[derive(Clone)]
pub struct PushQueue {
    sender: mpsc::Sender<PushJob>,
}

impl PushQueue {
    /// Starts the worker and returns the queue feeding it.
    ///
    /// At most `concurrency` jobs are persisted at the same time; once
    /// `capacity` jobs are waiting, `try_enqueue` refuses new ones.
    pub fn spawn(ingestor: Ingestor, capacity: usize, concurrency: usize) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let worker = tokio::spawn(run_worker(ingestor, receiver, concurrency));
        (PushQueue { sender }, worker)
    }

    /// Queues a job without waiting, so it either lands or fails right away.
    pub fn try_enqueue(&self, job: PushJob) -> Result<(), QueueError> {
        self.sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => QueueError::Full,
            TrySendError::Closed(_) => QueueError::Closed,
        })?;
        counter!(PUSH_ENQUEUED).increment(1);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

async fn run_worker(ingestor: Ingestor, mut receiver: mpsc::Receiver<PushJob>, concurrency: usize) {
    let permits = Arc::new(Semaphore::new(concurrency));

    while let Some(job) = receiver.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let ingestor = ingestor.clone();

        tokio::spawn(async move {
            let _permit = permit;
            match ingestor.persist(std::slice::from_ref(&job.record)).await {
                Ok(_) => tracing::debug!(key = %job.key, "Persisted pushed call record"),
                Err(e) => {
                    counter!(PUSH_FAILED).increment(1);
                    tracing::error!(key = %job.key, error = %e, "Failed to persist pushed call record");
                }
            }
        });
    }

    tracing::info!("Push queue closed, worker stopping");
}
