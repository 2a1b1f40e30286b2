//! Worker pool: bounded consumers over a single-producer FIFO job queue.
//!
//! Each job is processed in full by one worker; there is no shared
//! in-memory state between jobs, so workers can restart between jobs
//! without loss. A panic inside a job handler is caught and recorded as a
//! structured failure; it never poisons the pool.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Opaque job envelope. The transport that fills the queue is external;
/// the pool is agnostic to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub job_id: String,
    pub kind: String,
    pub payload: serde_json::Value,
}

/// Terminal outcome of one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub kind: String,
    /// SUCCESS | FAILED | PANICKED.
    pub status: String,
    pub detail: Option<String>,
}

/// Handler invoked per job. Errors are recorded; they do not stop the
/// pool.
pub type JobHandler = dyn Fn(&JobDescriptor) -> Result<(), String> + Send + Sync;

/// A bounded pool of worker threads draining one FIFO queue.
pub struct WorkerPool {
    sender: Option<Sender<JobDescriptor>>,
    outcomes: Arc<Mutex<Vec<JobOutcome>>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `n_workers` threads consuming from the pool's queue.
    pub fn new(n_workers: usize, handler: Arc<JobHandler>) -> Self {
        let (sender, receiver) = mpsc::channel::<JobDescriptor>();
        let receiver = Arc::new(Mutex::new(receiver));
        let outcomes: Arc<Mutex<Vec<JobOutcome>>> = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::with_capacity(n_workers.max(1));
        for worker_idx in 0..n_workers.max(1) {
            let receiver = Arc::clone(&receiver);
            let outcomes = Arc::clone(&outcomes);
            let handler = Arc::clone(&handler);

            handles.push(std::thread::spawn(move || loop {
                // Queue pop is the only long-blocking point besides the
                // job's own subprocesses.
                let job = {
                    let guard = match receiver.lock() {
                        Ok(guard) => guard,
                        Err(_) => return,
                    };
                    guard.recv()
                };
                let job = match job {
                    Ok(job) => job,
                    // Channel closed: graceful shutdown.
                    Err(_) => return,
                };

                info!(worker = worker_idx, job_id = %job.job_id, kind = %job.kind, "job start");
                let result = catch_unwind(AssertUnwindSafe(|| handler(&job)));

                let outcome = match result {
                    Ok(Ok(())) => JobOutcome {
                        job_id: job.job_id.clone(),
                        kind: job.kind.clone(),
                        status: "SUCCESS".to_string(),
                        detail: None,
                    },
                    Ok(Err(message)) => {
                        error!(job_id = %job.job_id, error = %message, "job failed");
                        JobOutcome {
                            job_id: job.job_id.clone(),
                            kind: job.kind.clone(),
                            status: "FAILED".to_string(),
                            detail: Some(message),
                        }
                    }
                    Err(panic) => {
                        let message = panic
                            .downcast_ref::<String>()
                            .cloned()
                            .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
                            .unwrap_or_else(|| "panic with non-string payload".to_string());
                        error!(job_id = %job.job_id, panic = %message, "job panicked");
                        JobOutcome {
                            job_id: job.job_id.clone(),
                            kind: job.kind.clone(),
                            status: "PANICKED".to_string(),
                            detail: Some(message),
                        }
                    }
                };

                if let Ok(mut guard) = outcomes.lock() {
                    guard.push(outcome);
                }
            }));
        }

        Self { sender: Some(sender), outcomes, handles }
    }

    /// Enqueue a job. Returns false if the pool is already shut down.
    pub fn submit(&self, job: JobDescriptor) -> bool {
        match &self.sender {
            Some(sender) => sender.send(job).is_ok(),
            None => false,
        }
    }

    /// Close the queue and wait for all workers to drain it.
    ///
    /// Returns the recorded outcomes in completion order.
    pub fn shutdown(mut self) -> Vec<JobOutcome> {
        self.sender = None;
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        match Arc::try_unwrap(std::mem::take(&mut self.outcomes)) {
            Ok(mutex) => mutex.into_inner().unwrap_or_default(),
            Err(shared) => shared.lock().map(|g| g.clone()).unwrap_or_default(),
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(1, Arc::new(|_job: &JobDescriptor| Ok(())))
    }
}
