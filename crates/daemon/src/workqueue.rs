// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workqueue: a fixed pool of workers draining a FIFO of named tasks.
//!
//! Tasks carry a name used for duplicate suppression, an optional cancel
//! callback, and an optional timeout. A periodic sweeper (driven by the
//! timer service) warns about tasks past half their timeout and force-
//! cancels tasks past the full timeout by tripping the task's cancellation
//! token; the owning worker then runs the cancel callback exactly once and
//! marks the task `Canceled`. Cancellation takes effect at the task's next
//! suspension point.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::module::{Module, ModuleError};
use crate::timer::{TimerHandle, TimerService};

pub const DEFAULT_WORKERS: usize = 8;

/// Sweep interval for the timeout checker.
pub const TIMEOUT_CHECK_INTERVAL: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    Queued,
    Processing,
    Done,
    Canceled,
}

impl WorkStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkStatus::Done | WorkStatus::Canceled)
    }
}

type WorkFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type CancelFn = Box<dyn FnOnce() + Send>;

/// A named unit of work. Owned by the queue from enqueue to completion.
pub struct Work {
    name: String,
    fut: WorkFuture,
    cancel_cb: Option<CancelFn>,
    timeout: Option<Duration>,
    status_tx: watch::Sender<WorkStatus>,
    status_rx: watch::Receiver<WorkStatus>,
}

impl Work {
    pub fn new(name: impl Into<String>, fut: impl Future<Output = ()> + Send + 'static) -> Self {
        let (status_tx, status_rx) = watch::channel(WorkStatus::Queued);
        Self {
            name: name.into(),
            fut: Box::pin(fut),
            cancel_cb: None,
            timeout: None,
            status_tx,
            status_rx,
        }
    }

    /// Cancel the task if it runs longer than `timeout`. Without this, the
    /// task is never cancelled by the sweeper.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Callback invoked when the task is force-cancelled.
    pub fn on_cancel(mut self, cb: impl FnOnce() + Send + 'static) -> Self {
        self.cancel_cb = Some(Box::new(cb));
        self
    }

    pub fn handle(&self) -> WorkHandle {
        WorkHandle { status: self.status_rx.clone() }
    }
}

/// Observer side of a submitted task.
#[derive(Clone)]
pub struct WorkHandle {
    status: watch::Receiver<WorkStatus>,
}

impl WorkHandle {
    pub fn status(&self) -> WorkStatus {
        *self.status.borrow()
    }

    /// Wait until the task reaches a terminal status.
    pub async fn wait(&mut self) -> WorkStatus {
        loop {
            let status = *self.status.borrow();
            if status.is_terminal() {
                return status;
            }
            if self.status.changed().await.is_err() {
                return *self.status.borrow();
            }
        }
    }
}

struct RunningWork {
    name: String,
    started: Instant,
    timeout: Option<Duration>,
    warned: bool,
    cancel: CancellationToken,
}

pub struct Workqueue {
    queue: Mutex<VecDeque<Work>>,
    not_empty: Notify,
    slots: Vec<Mutex<Option<RunningWork>>>,
    stop: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Workqueue {
    pub fn new(worker_count: usize) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            not_empty: Notify::new(),
            slots: (0..worker_count).map(|_| Mutex::new(None)).collect(),
            stop: CancellationToken::new(),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Spawn the worker tasks. Idempotent.
    pub fn spawn_workers(self: &Arc<Self>) {
        let mut workers = self.workers.lock();
        if !workers.is_empty() {
            return;
        }
        for slot in 0..self.slots.len() {
            let wq = Arc::clone(self);
            workers.push(tokio::spawn(async move { wq.worker_loop(slot).await }));
        }
    }

    /// Enqueue a task. The returned handle observes its status; the caller
    /// may drop it for fire-and-forget submission.
    pub fn add(&self, work: Work) -> WorkHandle {
        let handle = work.handle();
        if self.stop.is_cancelled() {
            // queue is draining; release the task without running it
            work.status_tx.send_replace(WorkStatus::Canceled);
            return handle;
        }
        self.queue.lock().push_back(work);
        self.not_empty.notify_one();
        handle
    }

    /// Enqueue a task and wait until it is `Done` or `Canceled`.
    pub async fn add_sync(&self, work: Work) -> WorkStatus {
        let mut handle = self.add(work);
        handle.wait().await
    }

    /// True if any task named `name` is queued or currently owned by a
    /// worker. Producers consult this to coalesce redundant work.
    pub fn pending(&self, name: &str) -> bool {
        if self.queue.lock().iter().any(|w| w.name == name) {
            return true;
        }
        self.slots
            .iter()
            .any(|slot| slot.lock().as_ref().is_some_and(|r| r.name == name))
    }

    /// Inspect every worker's current task: warn past half the timeout,
    /// force-cancel past the full timeout. Invoked by the sweeper timer.
    pub fn check_timeouts(&self) {
        let now = Instant::now();
        for slot in &self.slots {
            let mut guard = slot.lock();
            let Some(running) = guard.as_mut() else { continue };
            let Some(timeout) = running.timeout else { continue };
            let elapsed = now.saturating_duration_since(running.started);
            if elapsed > timeout {
                warn!(task = %running.name, elapsed_s = elapsed.as_secs(), "canceling task");
                running.cancel.cancel();
            } else if elapsed > timeout / 2 && !running.warned {
                warn!(
                    task = %running.name,
                    elapsed_s = elapsed.as_secs(),
                    "task is taking too much time"
                );
                running.warned = true;
            }
        }
    }

    /// Drain and stop. Queued tasks are released `Canceled` without
    /// running; in-flight tasks are cancelled; workers are joined.
    pub async fn shutdown(&self) {
        self.stop.cancel();
        self.not_empty.notify_waiters();
        for slot in &self.slots {
            if let Some(running) = slot.lock().as_ref() {
                running.cancel.cancel();
            }
        }
        let drained: Vec<Work> = self.queue.lock().drain(..).collect();
        for work in drained {
            work.status_tx.send_replace(WorkStatus::Canceled);
        }
        let workers: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for worker in workers {
            let _ = worker.await;
        }
    }

    async fn worker_loop(&self, slot: usize) {
        loop {
            let work = loop {
                if self.stop.is_cancelled() {
                    return;
                }
                {
                    let mut queue = self.queue.lock();
                    if let Some(work) = queue.pop_front() {
                        if !queue.is_empty() {
                            // more items queued; wake another worker
                            self.not_empty.notify_one();
                        }
                        break work;
                    }
                }
                tokio::select! {
                    _ = self.not_empty.notified() => {}
                    _ = self.stop.cancelled() => return,
                }
            };
            self.run_one(slot, work).await;
        }
    }

    async fn run_one(&self, slot: usize, work: Work) {
        debug!(task = %work.name, "processing");
        let started = Instant::now();
        let cancel = CancellationToken::new();
        *self.slots[slot].lock() = Some(RunningWork {
            name: work.name.clone(),
            started,
            timeout: work.timeout,
            warned: false,
            cancel: cancel.clone(),
        });

        let Work { name, fut, cancel_cb, status_tx, .. } = work;
        status_tx.send_replace(WorkStatus::Processing);
        // the queue-wide stop token covers workers that picked work up
        // after shutdown scanned the slots
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                if let Some(cb) = cancel_cb {
                    cb();
                }
                status_tx.send_replace(WorkStatus::Canceled);
                warn!(task = %name, "canceled");
            }
            _ = self.stop.cancelled() => {
                if let Some(cb) = cancel_cb {
                    cb();
                }
                status_tx.send_replace(WorkStatus::Canceled);
                warn!(task = %name, "canceled");
            }
            () = fut => {
                status_tx.send_replace(WorkStatus::Done);
            }
        }
        debug!(
            task = %name,
            took_ms = started.elapsed().as_millis() as u64,
            "finished"
        );
        *self.slots[slot].lock() = None;
    }
}

/// Module glue: spawns the pool and registers the timeout sweeper.
pub struct WorkqueueModule {
    wq: Arc<Workqueue>,
    timers: Arc<TimerService>,
    sweeper: Mutex<Option<TimerHandle>>,
}

impl WorkqueueModule {
    pub fn new(wq: Arc<Workqueue>, timers: Arc<TimerService>) -> Arc<Self> {
        Arc::new(Self { wq, timers, sweeper: Mutex::new(None) })
    }
}

#[async_trait]
impl Module for WorkqueueModule {
    fn name(&self) -> &'static str {
        "workqueue"
    }

    fn deps(&self) -> &'static [&'static str] {
        &["timer"]
    }

    async fn init(&self) -> Result<(), ModuleError> {
        self.wq.spawn_workers();
        let wq = Arc::clone(&self.wq);
        let handle = self.timers.add("workqueue timeout check", TIMEOUT_CHECK_INTERVAL, move || {
            wq.check_timeouts();
        });
        *self.sweeper.lock() = Some(handle);
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), ModuleError> {
        if let Some(handle) = self.sweeper.lock().take() {
            self.timers.remove(handle);
        }
        self.wq.shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
#[path = "workqueue_tests.rs"]
mod tests;
