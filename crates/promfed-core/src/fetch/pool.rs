use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::worker::{FetchOutcome, FetchWorker};

/// Summary of one fetch cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub jobs: usize,
    pub stored: usize,
    pub empty: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

#[derive(Default)]
struct CycleState {
    stored: AtomicUsize,
    empty: AtomicUsize,
    failed: AtomicUsize,
}

impl CycleState {
    fn record(&self, outcome: FetchOutcome) {
        let counter = match outcome {
            FetchOutcome::Stored => &self.stored,
            FetchOutcome::Empty => &self.empty,
            FetchOutcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn report(&self, jobs: usize, elapsed: Duration) -> CycleReport {
        CycleReport {
            jobs,
            stored: self.stored.load(Ordering::Relaxed),
            empty: self.empty.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

struct Job {
    metric_name: String,
    cycle: Arc<CycleState>,
    // Dropped when the job is finished; the cycle waits for every clone to go away.
    _done: mpsc::Sender<()>,
}

/// Fixed set of workers draining a shared job queue.
///
/// At most `size` queries are in flight at any time. [`WorkerPool::run_cycle`] returns only
/// after every job it enqueued has completed.
pub struct WorkerPool {
    jobs: mpsc::Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(size: usize, worker: Arc<FetchWorker>) -> Self {
        let size = size.max(1);
        let (jobs, rx) = mpsc::channel::<Job>(size);
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..size)
            .map(|id| tokio::spawn(work(id, Arc::clone(&rx), Arc::clone(&worker))))
            .collect();
        debug!(workers = size, "worker pool started");

        Self { jobs, workers }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Enqueue one job per name and wait until all of them are done.
    ///
    /// Stops enqueueing once `token` is cancelled; jobs already queued still run.
    pub async fn run_cycle<I>(&self, names: I, token: &CancellationToken) -> CycleReport
    where
        I: IntoIterator<Item = String>,
    {
        let started = Instant::now();
        let cycle = Arc::new(CycleState::default());
        let (done, mut all_done) = mpsc::channel::<()>(1);

        let mut jobs = 0;
        for metric_name in names {
            if token.is_cancelled() {
                debug!(enqueued = jobs, "cycle interrupted by shutdown");
                break;
            }
            let job = Job {
                metric_name,
                cycle: Arc::clone(&cycle),
                _done: done.clone(),
            };
            if self.jobs.send(job).await.is_err() {
                warn!("worker pool is closed; dropping remaining jobs");
                break;
            }
            jobs += 1;
        }
        drop(done);

        // Yields `None` once the last job guard is dropped.
        let _ = all_done.recv().await;
        cycle.report(jobs, started.elapsed())
    }

    /// Close the queue and wait for the workers to exit.
    pub async fn shutdown(self) {
        drop(self.jobs);
        for handle in self.workers {
            if let Err(e) = handle.await {
                warn!("fetch worker terminated abnormally: {e}");
            }
        }
        debug!("worker pool stopped");
    }
}

async fn work(id: usize, rx: Arc<Mutex<mpsc::Receiver<Job>>>, worker: Arc<FetchWorker>) {
    loop {
        let job = { rx.lock().await.recv().await };
        let Some(job) = job else { break };

        trace!(worker = id, metric_name = %job.metric_name, "job picked");
        let outcome = worker.fetch(&job.metric_name).await;
        job.cycle.record(outcome);
    }
    trace!(worker = id, "worker exiting");
}
