//! Task executors.
//!
//! Each bearer half serializes its state transitions by running every
//! mutation on one executor; the crypto work fans out onto a shared worker
//! pool and posts its completions back. Executors never block: a full queue
//! is reported to the caller, which drops the work and counts it.

use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::Mutex;
use std::collections::VecDeque;
#[cfg(test)]
use std::sync::Arc;
use std::thread::JoinHandle;

pub type Task = Box<dyn FnOnce() + Send>;

pub trait TaskExecutor: Send + Sync {
    /// Enqueues a task. Returns false if the executor cannot accept it.
    fn execute(&self, task: Task) -> bool;
}

/// Runs every task in the caller's context. Used for SRBs, where RRC must
/// observe the result of a submission synchronously.
#[derive(Default)]
pub struct InlineExecutor;

impl TaskExecutor for InlineExecutor {
    fn execute(&self, task: Task) -> bool {
        task();
        true
    }
}

/// Bounded queue drained explicitly. The deterministic executor for tests.
pub struct ManualExecutor {
    queue: Mutex<VecDeque<Task>>,
    capacity: usize,
}

impl ManualExecutor {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// Runs queued tasks until the queue stays empty, including tasks that
    /// were enqueued while draining.
    pub fn run_pending_tasks(&self) {
        while self.try_run_next() {}
    }

    pub fn try_run_next(&self) -> bool {
        let task = self.queue.lock().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    pub fn nof_pending_tasks(&self) -> usize {
        self.queue.lock().len()
    }
}

impl TaskExecutor for ManualExecutor {
    fn execute(&self, task: Task) -> bool {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            return false;
        }
        queue.push_back(task);
        true
    }
}

/// Fixed-size thread pool fed by a bounded MPMC channel. One pool is shared
/// by every bearer's crypto work.
pub struct WorkerPool {
    sender: Option<Sender<Task>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(name: &str, nof_workers: usize, queue_size: usize) -> Self {
        let (sender, receiver) = bounded::<Task>(queue_size);
        let workers = (0..nof_workers)
            .map(|i| {
                let receiver = receiver.clone();
                std::thread::Builder::new()
                    .name(format!("{name}#{i}"))
                    .spawn(move || {
                        for task in receiver.iter() {
                            task();
                        }
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();
        Self {
            sender: Some(sender),
            workers,
        }
    }

    pub fn executor(&self) -> WorkerPoolExecutor {
        WorkerPoolExecutor {
            sender: self
                .sender
                .as_ref()
                .expect("worker pool already stopped")
                .clone(),
        }
    }

    /// Closes the queue and joins the workers. Executor handles cloned from
    /// this pool must be dropped first, or the workers keep waiting for
    /// more work.
    pub fn stop(&mut self) {
        self.sender = None;
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Cloneable handle submitting onto a [`WorkerPool`].
#[derive(Clone)]
pub struct WorkerPoolExecutor {
    sender: Sender<Task>,
}

impl TaskExecutor for WorkerPoolExecutor {
    fn execute(&self, task: Task) -> bool {
        match self.sender.try_send(task) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }
}
