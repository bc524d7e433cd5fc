//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Default number of jobs a queue runs at once.
pub const DEFAULT_CONCURRENCY: usize = 256;

type Job = BoxFuture<'static, ()>;

/// Point-in-time view of a [`WorkQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMetrics {
    /// Queue name used in logs.
    pub name: &'static str,

    /// Maximum number of jobs running at once
    pub concurrency: usize,

    /// Jobs currently running
    pub running: usize,

    /// Jobs waiting for a slot
    pub pending: usize,

    /// Total jobs accepted
    pub submitted: u64,

    /// Total jobs that ran to completion or unwound
    pub completed: u64,

    /// Total jobs dropped unstarted by a kill
    pub discarded: u64,
}

impl QueueMetrics {
    /// Share of the slots in use, as a percentage (0-100).
    pub fn utilization_percent(&self) -> f64 {
        if self.concurrency == 0 {
            0.0
        } else {
            (self.running as f64 / self.concurrency as f64) * 100.0
        }
    }

    /// Check if every slot is in use.
    pub fn is_full(&self) -> bool {
        self.running >= self.concurrency
    }

    /// Check if nothing is running or waiting.
    pub fn is_idle(&self) -> bool {
        self.running == 0 && self.pending == 0
    }
}

/// A bounded-concurrency job scheduler.
///
/// Jobs start in submission order. At most `concurrency` run at once; the
/// rest wait in FIFO order until a running job finishes. A job holds its
/// slot for as long as its future runs, and releases it even if the future
/// panics.
///
/// After [`kill`](Self::kill), waiting jobs are dropped unstarted and new
/// jobs are refused. Jobs already running are left alone.
///
/// Jobs are spawned on the ambient tokio runtime.
///
/// # Examples
///
/// ```rust
/// use nanomessage::backpressure::WorkQueue;
///
/// # async fn example() {
/// let queue = WorkQueue::new("outbound", 2);
///
/// for n in 0..4 {
///     queue.push(async move {
///         println!("job {n}");
///     });
/// }
///
/// let metrics = queue.metrics();
/// println!("{} running, {} waiting", metrics.running, metrics.pending);
///
/// queue.kill();
/// assert!(!queue.push(async {}));
/// # }
/// ```
#[derive(Clone)]
pub struct WorkQueue {
    name: &'static str,
    state: Arc<Mutex<QueueState>>,
}

struct QueueState {
    concurrency: usize,
    running: usize,
    pending: VecDeque<Job>,
    killed: bool,
    submitted: u64,
    completed: u64,
    discarded: u64,
}

impl QueueState {
    fn take_startable(&mut self) -> Vec<Job> {
        let mut jobs = Vec::new();
        while self.running < self.concurrency {
            let Some(job) = self.pending.pop_front() else {
                break;
            };
            self.running += 1;
            jobs.push(job);
        }
        jobs
    }
}

impl WorkQueue {
    /// Creates a queue running at most `concurrency` jobs at once.
    ///
    /// A concurrency of 0 is raised to 1.
    pub fn new(name: &'static str, concurrency: usize) -> Self {
        Self {
            name,
            state: Arc::new(Mutex::new(QueueState {
                concurrency: concurrency.max(1),
                running: 0,
                pending: VecDeque::new(),
                killed: false,
                submitted: 0,
                completed: 0,
                discarded: 0,
            })),
        }
    }

    /// Queue name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Submits a job. Returns `false` if the queue was killed.
    pub fn push<F>(&self, job: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let startable = {
            let mut state = self.state.lock();
            if state.killed {
                return false;
            }
            state.submitted += 1;
            state.pending.push_back(job.boxed());
            state.take_startable()
        };
        self.start(startable);
        true
    }

    /// Changes the concurrency limit.
    ///
    /// Raising the limit starts waiting jobs right away. Lowering it lets
    /// running jobs finish.
    pub fn set_concurrency(&self, concurrency: usize) {
        let startable = {
            let mut state = self.state.lock();
            state.concurrency = concurrency.max(1);
            if state.killed {
                Vec::new()
            } else {
                state.take_startable()
            }
        };
        tracing::debug!(queue = self.name, concurrency, "Queue concurrency changed");
        self.start(startable);
    }

    /// Current concurrency limit.
    pub fn concurrency(&self) -> usize {
        self.state.lock().concurrency
    }

    /// Jobs currently running.
    pub fn running(&self) -> usize {
        self.state.lock().running
    }

    /// Jobs waiting for a slot.
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Returns `true` once [`kill`](Self::kill) was called.
    pub fn is_killed(&self) -> bool {
        self.state.lock().killed
    }

    /// Drops waiting jobs and refuses new ones.
    pub fn kill(&self) {
        let discarded = {
            let mut state = self.state.lock();
            state.killed = true;
            let discarded = std::mem::take(&mut state.pending);
            state.discarded += discarded.len() as u64;
            discarded
        };
        tracing::debug!(queue = self.name, discarded = discarded.len(), "Queue killed");
        drop(discarded);
    }

    /// Snapshot of the queue counters.
    pub fn metrics(&self) -> QueueMetrics {
        let state = self.state.lock();
        QueueMetrics {
            name: self.name,
            concurrency: state.concurrency,
            running: state.running,
            pending: state.pending.len(),
            submitted: state.submitted,
            completed: state.completed,
            discarded: state.discarded,
        }
    }

    fn start(&self, jobs: Vec<Job>) {
        if jobs.is_empty() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(queue = self.name, jobs = jobs.len(), "No runtime to start queued jobs");
            let mut state = self.state.lock();
            state.running -= jobs.len();
            state.discarded += jobs.len() as u64;
            return;
        };
        for job in jobs {
            let slot = Slot {
                queue: self.clone(),
            };
            handle.spawn(async move {
                let _slot = slot;
                job.await;
            });
        }
    }
}

impl fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkQueue")
            .field("metrics", &self.metrics())
            .finish()
    }
}

/// Frees a running slot when the job's task ends.
struct Slot {
    queue: WorkQueue,
}

impl Drop for Slot {
    fn drop(&mut self) {
        let startable = {
            let mut state = self.queue.state.lock();
            state.running = state.running.saturating_sub(1);
            state.completed += 1;
            if state.killed {
                Vec::new()
            } else {
                state.take_startable()
            }
        };
        self.queue.start(startable);
    }
}
