//! The shared job queue and its worker pool.
//!
//! Enqueue persists a Queued record and sends the job id over a channel; the
//! receiver sits behind a mutex shared by all workers, so at most one worker
//! claims any given job. Claiming takes the payload out of the slot and moves
//! the record to Running; execution happens outside every lock, fully in
//! parallel across workers. Workers never retry, and a terminal record is
//! never rewritten.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

use super::executor::JobExecutor;
use super::{JobId, JobRecord, JobRequest, JobState, JobView};
use crate::error::JobError;
use chrono::Utc;

struct JobSlot {
    record: JobRecord,
    /// Present until a worker claims the job.
    request: Option<JobRequest>,
}

struct QueueShared {
    jobs: RwLock<HashMap<JobId, JobSlot>>,
}

/// Shared job queue with an owned worker pool.
///
/// Enqueue is safe from any number of threads. Dropping the queue shuts it
/// down: intake closes, already-queued jobs drain, workers join.
pub struct JobQueue {
    shared: Arc<QueueShared>,
    sender: Mutex<Option<mpsc::Sender<JobId>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

static_assertions::assert_impl_all!(JobQueue: Send, Sync);

impl JobQueue {
    /// Spawn a worker pool of `worker_count` threads (at least one) running
    /// the given executor.
    pub fn start(executor: Arc<dyn JobExecutor>, worker_count: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<JobId>();
        let receiver = Arc::new(Mutex::new(receiver));
        let shared = Arc::new(QueueShared {
            jobs: RwLock::new(HashMap::new()),
        });

        let worker_count = worker_count.max(1);
        let workers = (0..worker_count)
            .map(|index| {
                let shared = Arc::clone(&shared);
                let receiver = Arc::clone(&receiver);
                let executor = Arc::clone(&executor);
                std::thread::Builder::new()
                    .name(format!("job-worker-{}", index))
                    .spawn(move || worker_loop(index, shared, receiver, executor))
                    .expect("failed to spawn job worker thread")
            })
            .collect();

        info!("Job queue started with {} workers", worker_count);
        Self {
            shared,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        }
    }

    /// Enqueue a job, returning its generated identity.
    ///
    /// # Errors
    ///
    /// [`JobError::QueueClosed`] after shutdown; enqueue never reports
    /// execution failures; those land in the job's Failed state.
    pub fn enqueue(&self, request: JobRequest) -> Result<JobId, JobError> {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return Err(JobError::QueueClosed);
        };

        let id = JobId::generate();
        self.shared.jobs.write().insert(
            id,
            JobSlot {
                record: JobRecord::queued(id),
                request: Some(request),
            },
        );

        if sender.send(id).is_err() {
            // no worker will ever claim it; fail the record in place
            if let Some(slot) = self.shared.jobs.write().get_mut(&id) {
                slot.record.state = JobState::Failed;
                slot.record.error = Some("queue shut down before the job was claimed".to_string());
                slot.record.completed_at = Some(Utc::now());
            }
            return Err(JobError::QueueClosed);
        }

        debug!("Enqueued job {}", id);
        Ok(id)
    }

    /// Read the current snapshot of a job.
    ///
    /// Returns None for an unknown id, a distinct outcome rather than a default
    /// state. The snapshot may be stale by the time the caller looks at it;
    /// re-polling eventually observes a terminal state.
    pub fn poll(&self, id: &JobId) -> Option<JobView> {
        self.shared.jobs.read().get(id).map(|slot| slot.record.view())
    }

    /// Number of jobs currently known to the queue (any state).
    pub fn len(&self) -> usize {
        self.shared.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.jobs.read().is_empty()
    }

    /// Close intake, drain already-queued jobs, and join the workers.
    ///
    /// Running jobs complete normally; there is no cancellation.
    pub fn shutdown(&self) {
        let closed = self.sender.lock().take().is_some();
        if closed {
            info!("Job queue shutting down");
        }
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            let _ = handle.join();
        }
    }
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    index: usize,
    shared: Arc<QueueShared>,
    receiver: Arc<Mutex<mpsc::Receiver<JobId>>>,
    executor: Arc<dyn JobExecutor>,
) {
    debug!("Worker {} started", index);
    loop {
        // holding the receiver lock across recv serializes claims: exactly
        // one idle worker wakes per message
        let id = {
            let receiver = receiver.lock();
            match receiver.recv() {
                Ok(id) => id,
                Err(_) => break,
            }
        };

        let request = {
            let mut jobs = shared.jobs.write();
            let Some(slot) = jobs.get_mut(&id) else {
                warn!("Worker {} received unknown job {}", index, id);
                continue;
            };
            if slot.record.state != JobState::Queued {
                warn!(
                    "Worker {} skipping job {} in state {:?}",
                    index, id, slot.record.state
                );
                continue;
            }
            slot.record.state = JobState::Running;
            slot.record.started_at = Some(Utc::now());
            slot.request.take()
        };

        let Some(request) = request else {
            warn!("Worker {} claimed job {} with no payload", index, id);
            continue;
        };

        debug!("Worker {} running job {}", index, id);
        let outcome = executor.execute(request);

        let mut jobs = shared.jobs.write();
        if let Some(slot) = jobs.get_mut(&id) {
            if slot.record.state.is_terminal() {
                // terminal records are immutable
                continue;
            }
            match outcome {
                Ok(result) => {
                    slot.record.state = JobState::Succeeded;
                    slot.record.result = Some(result);
                    debug!("Job {} succeeded", id);
                }
                Err(e) => {
                    slot.record.state = JobState::Failed;
                    slot.record.error = Some(e.to_string());
                    warn!("Job {} failed: {}", id, e);
                }
            }
            slot.record.completed_at = Some(Utc::now());
        }
    }
    debug!("Worker {} stopped", index);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Executor that records concurrency and sleeps briefly.
    struct RecordingExecutor {
        running: AtomicUsize,
        peak: AtomicUsize,
        fail: bool,
    }

    impl RecordingExecutor {
        fn new(fail: bool) -> Self {
            Self {
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl JobExecutor for RecordingExecutor {
        fn execute(&self, _request: JobRequest) -> Result<Value, JobError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            self.running.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                Err(JobError::Execution("boom".to_string()))
            } else {
                Ok(json!({"ok": true}))
            }
        }
    }

    fn generation_request() -> JobRequest {
        JobRequest::Generation {
            text_prompt: "t".to_string(),
            image_prompt: "i".to_string(),
        }
    }

    fn await_terminal(queue: &JobQueue, id: &JobId) -> JobView {
        for _ in 0..200 {
            let view = queue.poll(id).expect("job should exist");
            if view.state.is_terminal() {
                return view;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("job never reached a terminal state");
    }

    #[test]
    fn test_enqueue_poll_success_lifecycle() {
        let queue = JobQueue::start(Arc::new(RecordingExecutor::new(false)), 1);
        let id = queue.enqueue(generation_request()).unwrap();

        // a fresh job is Queued or Running, never terminal before any worker
        // could plausibly have run it to completion
        let first = queue.poll(&id).unwrap();
        assert!(matches!(first.state, JobState::Queued | JobState::Running));

        let terminal = await_terminal(&queue, &id);
        assert_eq!(terminal.state, JobState::Succeeded);
        assert_eq!(terminal.result.unwrap(), json!({"ok": true}));
        assert!(terminal.error.is_none());
        assert!(terminal.started_at.is_some());
        assert!(terminal.completed_at.is_some());
    }

    #[test]
    fn test_failed_job_records_error_and_stays_failed() {
        let queue = JobQueue::start(Arc::new(RecordingExecutor::new(true)), 1);
        let id = queue.enqueue(generation_request()).unwrap();

        let terminal = await_terminal(&queue, &id);
        assert_eq!(terminal.state, JobState::Failed);
        assert!(terminal.error.unwrap().contains("boom"));
        assert!(terminal.result.is_none());

        // no retries: still Failed on a later poll
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(queue.poll(&id).unwrap().state, JobState::Failed);
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let queue = JobQueue::start(Arc::new(RecordingExecutor::new(false)), 1);
        let unknown = JobId::generate();
        assert!(queue.poll(&unknown).is_none());
    }

    #[test]
    fn test_workers_run_jobs_in_parallel() {
        let executor = Arc::new(RecordingExecutor::new(false));
        let queue = JobQueue::start(executor.clone(), 4);

        let ids: Vec<JobId> = (0..8)
            .map(|_| queue.enqueue(generation_request()).unwrap())
            .collect();
        for id in &ids {
            assert_eq!(await_terminal(&queue, id).state, JobState::Succeeded);
        }

        assert!(executor.peak.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_enqueue_after_shutdown_is_rejected() {
        let queue = JobQueue::start(Arc::new(RecordingExecutor::new(false)), 1);
        queue.shutdown();

        let result = queue.enqueue(generation_request());
        assert!(matches!(result, Err(JobError::QueueClosed)));
    }

    #[test]
    fn test_shutdown_drains_queued_jobs() {
        let queue = JobQueue::start(Arc::new(RecordingExecutor::new(false)), 2);
        let ids: Vec<JobId> = (0..4)
            .map(|_| queue.enqueue(generation_request()).unwrap())
            .collect();

        queue.shutdown();
        for id in &ids {
            assert_eq!(queue.poll(id).unwrap().state, JobState::Succeeded);
        }
    }

    #[test]
    fn test_state_never_reverts_after_terminal() {
        let queue = JobQueue::start(Arc::new(RecordingExecutor::new(false)), 2);
        let id = queue.enqueue(generation_request()).unwrap();
        let terminal = await_terminal(&queue, &id);

        for _ in 0..10 {
            assert_eq!(queue.poll(&id).unwrap().state, terminal.state);
        }
    }
}
