//! Component E — admission control, bounded worker pool, tracking-id
//! issuance (spec §4.E).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::clients::{LlmClient, MeshClient};
use crate::config::{CoreConfig, GRACE_SECONDS};
use crate::error::{Result, RuntimeError};
use crate::orchestrator::PipelineOrchestrator;
use crate::store::JobResultStore;
use crate::types::{new_tracking_id, JobStatus, RoomRequest, TrackingId};

struct Job {
    ruid: TrackingId,
    request: RoomRequest,
}

/// Live counters exposed by `GET /queue/status` (spec §6).
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct QueueMetrics {
    pub queued: usize,
    pub active: usize,
    pub completed: usize,
    #[serde(rename = "maxConcurrent")]
    pub max_concurrent: usize,
}

/// Bounded MPMC FIFO of admitted jobs plus a fixed pool of worker tasks,
/// each permanently looping take→process.
pub struct QueueManager {
    sender: Option<mpsc::Sender<Job>>,
    store: JobResultStore,
    queued: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
    max_concurrent: usize,
    worker_handles: Vec<tokio::task::JoinHandle<()>>,
}

impl QueueManager {
    /// Spawns `config.n_workers` worker tasks pulling from a bounded channel
    /// of capacity `config.queue_capacity`.
    pub fn new<L, M>(
        config: CoreConfig,
        store: JobResultStore,
        orchestrator: Arc<PipelineOrchestrator<L, M>>,
    ) -> Self
    where
        L: LlmClient + 'static,
        M: MeshClient + 'static,
    {
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let queued = Arc::new(AtomicUsize::new(0));
        let active = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));

        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let mut worker_handles = Vec::with_capacity(config.n_workers);
        for worker_id in 0..config.n_workers {
            let receiver = receiver.clone();
            let store = store.clone();
            let orchestrator = orchestrator.clone();
            let queued = queued.clone();
            let active = active.clone();
            let completed = completed.clone();

            let handle = tokio::spawn(async move {
                // Closing the sender drains any buffered jobs before `recv`
                // returns `None`, giving shutdown its "drain, then exit"
                // semantics without a separate signal channel.
                loop {
                    let job = receiver.lock().await.recv().await;
                    let Some(job) = job else { break };
                    queued.fetch_sub(1, Ordering::SeqCst);
                    active.fetch_add(1, Ordering::SeqCst);
                    info!(worker_id, ruid = %job.ruid, "claimed job");

                    store.update_status(&job.ruid, JobStatus::Processing).await;
                    let bundle = orchestrator.create_room(&job.request, &job.ruid).await;

                    let success = bundle.get("success").and_then(|v| v.as_bool()).unwrap_or(false);
                    let final_status = if success { JobStatus::Completed } else { JobStatus::Failed };
                    if let Err(e) = store.store_final(&job.ruid, bundle, final_status).await {
                        error!(ruid = %job.ruid, "failed to store terminal state: {e}");
                    }

                    active.fetch_sub(1, Ordering::SeqCst);
                    completed.fetch_add(1, Ordering::SeqCst);
                }
            });
            worker_handles.push(handle);
        }

        Self {
            sender: Some(sender),
            store,
            queued,
            active,
            completed,
            max_concurrent: config.n_workers,
            worker_handles,
        }
    }

    /// Allocates a ruid, registers it QUEUED, enqueues the job and returns
    /// the ruid synchronously without waiting for processing.
    pub async fn submit(&self, request: RoomRequest) -> Result<TrackingId> {
        let ruid = new_tracking_id();
        self.store.register(&ruid).await;

        let Some(sender) = self.sender.as_ref() else {
            self.store.delete(&ruid).await;
            return Err(RuntimeError::validation("queue is shutting down"));
        };

        match sender.try_send(Job { ruid: ruid.clone(), request }) {
            Ok(()) => {
                self.queued.fetch_add(1, Ordering::SeqCst);
                Ok(ruid)
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.store.delete(&ruid).await;
                Err(RuntimeError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.store.delete(&ruid).await;
                Err(RuntimeError::validation("queue is shutting down"))
            }
        }
    }

    pub fn metrics(&self) -> QueueMetrics {
        QueueMetrics {
            queued: self.queued.load(Ordering::SeqCst),
            active: self.active.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            max_concurrent: self.max_concurrent,
        }
    }

    /// Stops accepting new submissions, waits up to `GRACE_SECONDS` for
    /// in-flight and already-queued jobs to drain, then aborts any worker
    /// still running.
    pub async fn shutdown(mut self) {
        self.sender.take();

        let deadline = tokio::time::sleep(GRACE_SECONDS);
        tokio::pin!(deadline);
        let mut handles = std::mem::take(&mut self.worker_handles);

        loop {
            if handles.is_empty() {
                return;
            }
            tokio::select! {
                _ = &mut deadline => {
                    for handle in handles {
                        handle.abort();
                    }
                    return;
                }
                (result, _idx, remaining) = futures::future::select_all(handles) => {
                    if let Err(e) = result {
                        error!("worker task ended abnormally: {e}");
                    }
                    handles = remaining;
                }
            }
        }
    }
}
