//! Scheduler for dispatching crawl work and detecting termination
//!
//! This module handles:
//! - The visited set: one dispatch per canonical URL per run
//! - The outstanding set: tasks submitted but not yet finished
//! - Global concurrency limiting via a semaphore
//! - Waiting until dynamically discovered work has fully drained
//! - Cancelling all work at once when the crawl cannot continue

use crate::url::normalize_url;
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Notify, Semaphore};
use tokio::task::AbortHandle;

/// Scheduler owns the visited set, the worker pool and the outstanding set
///
/// Work is submitted with [`Scheduler::enqueue`], which may be called from
/// inside a running unit of work. Each submission becomes a tokio task that
/// waits for one of `max_workers` permits before it runs, so the permit count
/// is the only backpressure on fetch and inference calls.
pub struct Scheduler {
    /// Canonical URLs that have ever been dispatched
    visited: Mutex<HashSet<String>>,

    /// Canonical URLs whose work has not finished yet, with the handle that
    /// cancels it (`None` until the task has been spawned)
    outstanding: Mutex<HashMap<String, Option<AbortHandle>>>,

    /// Worker pool bound
    permits: Arc<Semaphore>,

    /// Signalled every time a unit of work finishes
    completed: Notify,

    aborted: AtomicBool,
}

impl Scheduler {
    /// Creates a new scheduler with `max_workers` concurrent slots
    pub fn new(max_workers: usize) -> Arc<Self> {
        Arc::new(Self {
            visited: Mutex::new(HashSet::new()),
            outstanding: Mutex::new(HashMap::new()),
            permits: Arc::new(Semaphore::new(max_workers.max(1))),
            completed: Notify::new(),
            aborted: AtomicBool::new(false),
        })
    }

    /// Dispatches `work` for `url` unless the URL was seen before
    ///
    /// The URL is normalized first; the membership check and insert happen
    /// under one guard, so concurrent discoveries of the same page dispatch
    /// it exactly once. `work` receives the canonical URL.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Returns
    ///
    /// * `true` - A new task was submitted
    /// * `false` - The URL was invalid, already visited, or the scheduler was aborted
    pub fn enqueue<F>(self: &Arc<Self>, url: &str, work: F) -> bool
    where
        F: FnOnce(String) -> BoxFuture<'static, ()> + Send + 'static,
    {
        if self.is_aborted() {
            tracing::debug!("Scheduler aborted, not dispatching {}", url);
            return false;
        }

        let Some(canonical) = normalize_url(url) else {
            tracing::warn!("Ignoring invalid URL: {}", url);
            return false;
        };

        {
            let mut visited = self.visited.lock().unwrap_or_else(PoisonError::into_inner);
            if !visited.insert(canonical.clone()) {
                tracing::debug!("Already visited: {}", canonical);
                return false;
            }
        }

        self.outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(canonical.clone(), None);

        let scheduler = Arc::clone(self);
        let url = canonical.clone();
        let handle = tokio::spawn(async move {
            let _done = CompletionGuard {
                scheduler: Arc::clone(&scheduler),
                url: url.clone(),
            };

            // Fails only once the pool has been closed by `abort`
            let Ok(_permit) = scheduler.permits.clone().acquire_owned().await else {
                tracing::debug!("Dropping queued task for {}", url);
                return;
            };
            if scheduler.is_aborted() {
                return;
            }

            work(url).await;
        });

        // The task may already be gone, or cleared by `abort`
        let mut outstanding = self.outstanding.lock().unwrap_or_else(PoisonError::into_inner);
        match outstanding.get_mut(&canonical) {
            Some(slot) => *slot = Some(handle.abort_handle()),
            None if self.is_aborted() => handle.abort(),
            None => {}
        }

        true
    }

    /// Waits until no submitted work remains
    ///
    /// Running tasks may submit more work, so emptiness is re-checked after
    /// every completion rather than counting a fixed frontier.
    pub async fn wait_until_idle(&self) {
        loop {
            let completed = self.completed.notified();
            let remaining = self.outstanding_count();
            if remaining == 0 {
                return;
            }
            tracing::trace!("{} tasks outstanding", remaining);
            completed.await;
        }
    }

    /// Stops the crawl: no further dispatching, and every submitted task is
    /// cancelled
    ///
    /// Queued tasks never run. Running tasks are cancelled at their next
    /// `.await`, so a fetch or a streaming answer in progress is dropped.
    /// The outstanding set is emptied at once and [`Self::wait_until_idle`]
    /// returns without waiting for the cancelled tasks to unwind.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.permits.close();

        let cancelled: Vec<AbortHandle> = self
            .outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .filter_map(|(_, handle)| handle)
            .collect();

        tracing::debug!("Cancelling {} outstanding tasks", cancelled.len());
        for handle in cancelled {
            handle.abort();
        }
        self.completed.notify_one();
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Returns whether the canonical form of `url` has been dispatched
    pub fn is_visited(&self, url: &str) -> bool {
        normalize_url(url)
            .map(|canonical| {
                self.visited
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .contains(&canonical)
            })
            .unwrap_or(false)
    }

    pub fn visited_count(&self) -> usize {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn outstanding_count(&self) -> usize {
        self.outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Removes a task from the outstanding set when its work ends, including
/// when it panics or is cancelled
struct CompletionGuard {
    scheduler: Arc<Scheduler>,
    url: String,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.scheduler
            .outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.url);
        self.scheduler.completed.notify_one();
    }
}
