//! Priority-ordered job queue with a fixed number of tokio workers.
//!
//! Jobs run highest priority first, FIFO within a priority. A queued job can
//! be re-prioritized or cancelled through its [`QueueTicket`]; both are no-ops
//! once a worker has picked the job up.
//!
//! Re-prioritizing pushes a new heap entry with a bumped version instead of
//! searching the heap. Entries whose version no longer matches the job are
//! skipped when popped.
//!
//! A job may be tied to an [`Interest`]. When such a job reaches the top of
//! the heap but its interest has dropped to a lower priority, it is pushed
//! back at that priority instead of running.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;

use super::Priority;

/// Whoever a queued job is running for.
pub trait Interest: Send + Sync {
    /// The priority the job still deserves, or `None` if that can't be told
    /// without blocking.
    fn current_priority(&self) -> Option<Priority>;
}

pub struct RequestQueue {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

struct Shared {
    name: String,
    state: Mutex<State>,
    notify: Notify,
}

#[derive(Default)]
struct State {
    heap: BinaryHeap<Entry>,
    jobs: HashMap<u64, Job>,
    next_id: u64,
    next_seq: u64,
    shutdown: bool,
}

struct Job {
    priority: Priority,
    version: u64,
    interest: Option<Weak<dyn Interest>>,
    task: BoxFuture<'static, ()>,
}

#[derive(Debug, PartialEq, Eq)]
struct Entry {
    priority: Priority,
    seq: u64,
    id: u64,
    version: u64,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, then lower sequence (older) first
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl State {
    fn push_entry(&mut self, id: u64, priority: Priority, version: u64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry {
            priority,
            seq,
            id,
            version,
        });
    }

    fn pop(&mut self) -> Option<BoxFuture<'static, ()>> {
        while let Some(entry) = self.heap.pop() {
            let Some(job) = self.jobs.get_mut(&entry.id) else {
                continue;
            };
            if job.version != entry.version {
                continue;
            }

            // Priorities only go down here; each job sinks a bounded number of times
            let lapsed = job
                .interest
                .as_ref()
                .and_then(Weak::upgrade)
                .and_then(|interest| interest.current_priority())
                .filter(|current| *current < job.priority);
            if let Some(current) = lapsed {
                job.priority = current;
                job.version += 1;
                let version = job.version;
                self.push_entry(entry.id, current, version);
                continue;
            }

            return self.jobs.remove(&entry.id).map(|job| job.task);
        }
        None
    }
}

impl RequestQueue {
    /// Spawn `workers` workers (at least one) on `runtime`.
    pub fn new(name: impl Into<String>, workers: usize, runtime: &Handle) -> Self {
        let shared = Arc::new(Shared {
            name: name.into(),
            state: Mutex::new(State::default()),
            notify: Notify::new(),
        });

        let workers = (0..workers.max(1))
            .map(|_| runtime.spawn(worker_loop(shared.clone())))
            .collect();

        Self { shared, workers }
    }

    /// Queue a job. The receiver yields its output, or an error if the job
    /// was cancelled before it ran or panicked.
    pub fn enqueue<F, T>(&self, priority: Priority, job: F) -> (QueueTicket, oneshot::Receiver<T>)
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.push(priority, None, job)
    }

    /// Queue a job on behalf of `interest`, which may lower its priority
    /// while it waits.
    pub fn enqueue_for<F, T>(
        &self,
        priority: Priority,
        interest: Weak<dyn Interest>,
        job: F,
    ) -> (QueueTicket, oneshot::Receiver<T>)
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.push(priority, Some(interest), job)
    }

    fn push<F, T>(
        &self,
        priority: Priority,
        interest: Option<Weak<dyn Interest>>,
        job: F,
    ) -> (QueueTicket, oneshot::Receiver<T>)
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let task: BoxFuture<'static, ()> = Box::pin(async move {
            let _ = tx.send(job.await);
        });

        let id = {
            let mut state = self.shared.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.jobs.insert(
                id,
                Job {
                    priority,
                    version: 0,
                    interest,
                    task,
                },
            );
            state.push_entry(id, priority, 0);
            id
        };
        self.shared.notify.notify_one();

        let ticket = QueueTicket {
            id,
            shared: Arc::downgrade(&self.shared),
        };
        (ticket, rx)
    }

    /// Jobs waiting for a worker.
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.shared.state.lock().jobs.len()
    }
}

impl Drop for RequestQueue {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.notify.notify_waiters();
        for worker in &self.workers {
            worker.abort();
        }
    }
}

async fn worker_loop(shared: Arc<Shared>) {
    loop {
        let notified = shared.notify.notified();
        let next = {
            let mut state = shared.state.lock();
            if state.shutdown {
                return;
            }
            state.pop()
        };

        match next {
            Some(task) => {
                // A panicking job drops its sender; the worker lives on
                if AssertUnwindSafe(task).catch_unwind().await.is_err() {
                    tracing::error!(queue = %shared.name, "Queued job panicked");
                }
            }
            None => notified.await,
        }
    }
}

/// Handle to a queued job.
#[derive(Clone)]
pub struct QueueTicket {
    id: u64,
    shared: Weak<Shared>,
}

impl QueueTicket {
    /// Move a still-queued job to a new priority.
    pub fn set_priority(&self, priority: Priority) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let mut state = shared.state.lock();
        let Some(job) = state.jobs.get_mut(&self.id) else {
            return;
        };
        if job.priority == priority {
            return;
        }
        job.priority = priority;
        job.version += 1;
        let version = job.version;
        state.push_entry(self.id, priority, version);
        tracing::trace!(queue = %shared.name, job = self.id, ?priority, "Re-prioritized job");
    }

    /// Drop a still-queued job. Returns false if it already started.
    pub fn cancel(&self) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let removed = shared.state.lock().jobs.remove(&self.id);
        removed.is_some()
    }

    #[cfg(test)]
    pub fn is_queued(&self) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| shared.state.lock().jobs.contains_key(&self.id))
    }
}
