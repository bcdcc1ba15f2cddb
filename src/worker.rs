//! Worker: a pool of polling tasks draining queues.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio::time;

use crate::config::{AckCallback, FailCallback, WorkerConfig};
use crate::error::{ByplayError, Result};
use crate::executor::execute_once;
use crate::job::Ack;
use crate::queue::Queue;
use crate::registry::Registry;

const STATE_NEW: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_TERMINATED: u8 = 2;

/// Lifecycle state of a [`Worker`]. Single-shot: `New → Running →
/// Terminated`, no restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Constructed, not yet started.
    New,
    /// The master task is running.
    Running,
    /// The master task has exited; all polling tasks are joined.
    Terminated,
}

/// Handle to the polling task a callback runs on.
pub struct PollerHandle {
    index: usize,
    stopped: Arc<AtomicBool>,
}

impl PollerHandle {
    /// Index of this polling task within the worker, starting at 0.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Stop polling in just this task.
    ///
    /// The task exits cleanly after the current cycle's callbacks return;
    /// the worker itself keeps running. Useful in tests that drain a queue
    /// once and exit.
    pub fn interrupt(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// A pool of polling tasks that drain job queues in parallel.
///
/// Each polling task leases one connection from the pool per cycle, runs
/// [`execute_once`], dispatches the callbacks, and sleeps for the polling
/// interval. Coordination between tasks happens entirely through the
/// database's row locks; the worker holds no claim-related in-process state.
pub struct Worker {
    pool: PgPool,
    registry: Arc<Registry>,
    config: WorkerConfig,
    state: Arc<AtomicU8>,
    running: Arc<AtomicBool>,
    stop: Arc<Notify>,
    done: Arc<Notify>,
}

impl Worker {
    /// Create a new worker over the given pool and registry.
    pub fn new(pool: PgPool, registry: Arc<Registry>, config: WorkerConfig) -> Self {
        Self {
            pool,
            registry,
            config,
            state: Arc::new(AtomicU8::new(STATE_NEW)),
            running: Arc::new(AtomicBool::new(true)),
            stop: Arc::new(Notify::new()),
            done: Arc::new(Notify::new()),
        }
    }

    /// Start polling in the background.
    ///
    /// Spawns the master task, which spawns the polling tasks and then waits
    /// for [`interrupt`](Worker::interrupt). The lifecycle is single-shot: a
    /// second start, including after an interrupt, fails.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<()> {
        self.state
            .compare_exchange(STATE_NEW, STATE_RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ByplayError::Worker("a worker can only be started once".to_string()))?;

        let pool = self.pool.clone();
        let registry = Arc::clone(&self.registry);
        let queues = Arc::new(self.config.queues.clone());
        let threads_num = self.config.threads_num;
        let interval = self.config.polling_interval;
        let on_fail = Arc::clone(&self.config.on_fail);
        let on_ack = Arc::clone(&self.config.on_ack);
        let state = Arc::clone(&self.state);
        let running = Arc::clone(&self.running);
        let stop = Arc::clone(&self.stop);
        let done = Arc::clone(&self.done);

        tokio::spawn(async move {
            let mut tasks = JoinSet::new();
            for index in 0..threads_num {
                let poller = Poller {
                    index,
                    pool: pool.clone(),
                    registry: Arc::clone(&registry),
                    queues: Arc::clone(&queues),
                    interval,
                    running: Arc::clone(&running),
                    stop: Arc::clone(&stop),
                    stopped: Arc::new(AtomicBool::new(false)),
                    on_fail: Arc::clone(&on_fail),
                    on_ack: Arc::clone(&on_ack),
                };
                tasks.spawn(poller.run());
            }
            tracing::info!(threads = threads_num, "worker started");

            wait_for_interrupt(&running, &stop).await;

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::error!(error = %e, "polling task died"),
                    Err(e) => tracing::error!(error = %e, "polling task panicked"),
                }
            }

            state.store(STATE_TERMINATED, Ordering::SeqCst);
            done.notify_waiters();
            tracing::info!("worker terminated");
        });

        Ok(())
    }

    /// Request graceful shutdown.
    ///
    /// Jobs already executing finish their transactions; no new jobs are
    /// reserved; each polling task exits at its next safe point, then the
    /// master joins them and the worker reaches
    /// [`WorkerState::Terminated`].
    pub fn interrupt(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stop.notify_waiters();
        tracing::info!("worker interrupt requested");
    }

    /// Wait until the worker reaches [`WorkerState::Terminated`].
    pub async fn join(&self) {
        loop {
            let notified = self.done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.state.load(Ordering::SeqCst) == STATE_TERMINATED {
                return;
            }
            notified.await;
        }
    }

    /// The current lifecycle state.
    pub fn state(&self) -> WorkerState {
        match self.state.load(Ordering::SeqCst) {
            STATE_NEW => WorkerState::New,
            STATE_TERMINATED => WorkerState::Terminated,
            _ => WorkerState::Running,
        }
    }
}

/// Block until the running flag drops.
///
/// The notify interest is registered before the flag is re-checked, so an
/// interrupt arriving between the check and the await is not lost.
async fn wait_for_interrupt(running: &AtomicBool, stop: &Notify) {
    loop {
        let notified = stop.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if !running.load(Ordering::SeqCst) {
            return;
        }
        notified.await;
    }
}

/// One polling task.
struct Poller {
    index: usize,
    pool: PgPool,
    registry: Arc<Registry>,
    queues: Arc<Vec<Queue>>,
    interval: Duration,
    running: Arc<AtomicBool>,
    stop: Arc<Notify>,
    stopped: Arc<AtomicBool>,
    on_fail: FailCallback,
    on_ack: AckCallback,
}

impl Poller {
    async fn run(self) -> Result<()> {
        tracing::debug!(poller = self.index, "polling task started");

        while self.running.load(Ordering::SeqCst) && !self.stopped.load(Ordering::SeqCst) {
            let ack = self.cycle().await?;
            self.dispatch(&ack);
            if !self.running.load(Ordering::SeqCst) || self.stopped.load(Ordering::SeqCst) {
                break;
            }
            self.idle().await;
        }

        tracing::debug!(poller = self.index, "polling task stopped");
        Ok(())
    }

    /// One execution cycle on a freshly leased connection. SQL errors
    /// propagate and kill this polling task; the master logs the loss.
    async fn cycle(&self) -> Result<Ack> {
        let mut conn = self.pool.acquire().await?;
        execute_once(&mut conn, &self.registry, self.queues.as_slice()).await
    }

    fn dispatch(&self, ack: &Ack) {
        let handle = PollerHandle {
            index: self.index,
            stopped: Arc::clone(&self.stopped),
        };
        if let Ack::Failed(err, row) = ack {
            (self.on_fail)(&handle, err, row);
        }
        (self.on_ack)(&handle, ack);
    }

    /// Interruptible sleep between cycles. An interrupt arriving during the
    /// sleep wakes the task immediately.
    async fn idle(&self) {
        let notified = self.stop.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        tokio::select! {
            _ = notified => {}
            _ = time::sleep(self.interval) => {}
        }
    }
}
