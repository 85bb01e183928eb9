//! Shared worker-thread pool backing the `SharedPool` and
//! `DedicatedWorker` executor policies.
//!
//! A `DedicatedWorker` is just a `WorkerPool` of size one, owned by a
//! single `Signal`. `SharedPool` is one pool shared by every signal
//! that opts into it. Jobs are plain `FnOnce` closures; ordering
//! within one pool is FIFO per worker stripe, not globally.

use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, unbounded};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed-size pool of worker threads draining a shared job queue.
pub struct WorkerPool {
    sender: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns a pool with `size` worker threads. `size` of zero is
    /// rejected: a pool with no workers can never make progress.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "worker pool must have at least one thread");
        let (sender, receiver): (Sender<Job>, Receiver<Job>) = unbounded();
        let workers = (0..size)
            .map(|id| {
                let receiver = receiver.clone();
                std::thread::Builder::new()
                    .name(format!("sigflow-worker-{id}"))
                    .spawn(move || {
                        for job in receiver.iter() {
                            job();
                        }
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();
        Self { sender, workers }
    }

    /// A pool sized to the machine's available parallelism, falling
    /// back to 1 if that can't be determined.
    pub fn with_default_size() -> Self {
        Self::new(num_cpus::get().max(1))
    }

    /// Number of worker threads in this pool.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Submits a job to run on whichever worker picks it up next.
    /// Never blocks: the job queue is unbounded.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // The only way this send fails is if every worker thread has
        // panicked and dropped its receiver; propagating that as a
        // panic here surfaces the failure immediately rather than
        // silently dropping work.
        self.sender
            .send(Box::new(job))
            .expect("worker pool has no live threads to receive this job");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Dropping `sender` closes the channel; each worker's `for job
        // in receiver.iter()` loop then exits once drained, so join
        // always completes in finite time provided jobs themselves
        // terminate.
        let dangling_sender = unbounded::<Job>().0;
        let _ = std::mem::replace(&mut self.sender, dangling_sender);
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
