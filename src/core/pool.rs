// src/core/pool.rs

//! A bounded worker pool on top of the tokio runtime.
//!
//! Every unit of work is spawned immediately but must hold one of `size`
//! semaphore permits while it runs, so at most `size` units make progress at
//! once and the rest wait in FIFO order. There is no admission control: the
//! queue of waiting units is unbounded.
//!
//! When analyses and link probes share one pool, a pool filled with
//! analyses leaves their probes queued until the aggregate probe deadline
//! expires, which shows up as an undercount of broken links. Giving probes
//! their own pool removes that coupling.
//!
//! Shutdown only closes the pool to new top-level work. Units that are
//! already running may still fan out through [`WorkerPool::spawn_nested`],
//! and the drain waits for that work too.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::core::error::PoolError;

#[derive(Debug)]
pub struct WorkerPool {
    name: String,
    size: usize,
    slots: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl WorkerPool {
    /// Creates a pool with `size` worker slots (at least one).
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        let size = size.max(1);
        let name = name.into();
        debug!(pool = %name, size, "Creating worker pool.");
        Self {
            name,
            size,
            slots: Arc::new(Semaphore::new(size)),
            tracker: TaskTracker::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Units that are either running or waiting for a slot.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.tracker.is_closed()
    }

    /// Queues `task` and returns a handle to its output.
    ///
    /// Dropping the handle detaches the task; aborting it cancels the task
    /// whether it is running or still waiting for a slot. Fails once
    /// [`shutdown`](Self::shutdown) has been called.
    pub fn spawn<F>(&self, task: F) -> Result<JoinHandle<F::Output>, PoolError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        if self.tracker.is_closed() {
            return Err(PoolError::ShutDown(self.name.clone()));
        }
        Ok(self.spawn_nested(task))
    }

    /// Queues work on behalf of a unit that is already running.
    ///
    /// Accepted while the pool drains, so an in-flight analysis can still
    /// schedule its link probes after shutdown has begun.
    pub fn spawn_nested<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let slots = Arc::clone(&self.slots);
        self.tracker.spawn(async move {
            // The semaphore is never closed, so acquisition only fails if it is.
            let _permit = slots.acquire_owned().await;
            task.await
        })
    }

    /// Stops accepting work and waits for queued and running units to finish.
    pub async fn shutdown(&self) {
        self.tracker.close();
        info!(pool = %self.name, pending = self.tracker.len(), "Draining worker pool.");
        self.tracker.wait().await;
        info!(pool = %self.name, "Worker pool drained.");
    }
}
