//! Configuration for the worker.

use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use crate::job::{Ack, JobError, JobRow};
use crate::queue::Queue;
use crate::worker::PollerHandle;

/// Callback fired on a failed job, before the ack callback.
pub type FailCallback = Arc<dyn Fn(&PollerHandle, &JobError, &JobRow) + Send + Sync>;

/// Callback fired after every execution cycle, empty cycles included.
pub type AckCallback = Arc<dyn Fn(&PollerHandle, &Ack) + Send + Sync>;

/// Configuration for a [`crate::Worker`].
#[derive(Clone)]
pub struct WorkerConfig {
    /// Ordered priority list of queues to poll. Empty means any queue,
    /// ordered globally by arrival.
    pub queues: Vec<Queue>,
    /// Number of parallel polling tasks.
    pub threads_num: usize,
    /// Sleep between execution cycles within one polling task.
    pub polling_interval: Duration,
    /// Called on a failed job with the error and the FAILED row.
    pub on_fail: FailCallback,
    /// Called with the ack of every cycle. May stop its own polling task via
    /// [`PollerHandle::interrupt`].
    pub on_ack: AckCallback,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queues: Vec::new(),
            threads_num: 1,
            polling_interval: Duration::from_millis(5000),
            on_fail: Arc::new(default_on_fail),
            on_ack: Arc::new(|_, _| {}),
        }
    }
}

impl WorkerConfig {
    /// Create a new builder.
    pub fn builder() -> WorkerConfigBuilder {
        WorkerConfigBuilder::new()
    }
}

impl fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("queues", &self.queues)
            .field("threads_num", &self.threads_num)
            .field("polling_interval", &self.polling_interval)
            .finish_non_exhaustive()
    }
}

/// The default failure callback: one locked emission to standard error, so
/// lines from concurrent polling tasks never interleave.
fn default_on_fail(_poller: &PollerHandle, err: &JobError, row: &JobRow) {
    let line = format!("Job failed: {:?}\nException: {}\n", row, err);
    let mut stderr = std::io::stderr().lock();
    let _ = stderr.write_all(line.as_bytes());
}

/// Builder for [`WorkerConfig`].
#[derive(Default)]
pub struct WorkerConfigBuilder {
    config: WorkerConfig,
}

impl WorkerConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ordered priority list of queues to poll.
    pub fn queues(mut self, queues: impl IntoIterator<Item = Queue>) -> Self {
        self.config.queues = queues.into_iter().collect();
        self
    }

    /// Set the number of parallel polling tasks.
    pub fn threads_num(mut self, num: usize) -> Self {
        self.config.threads_num = num;
        self
    }

    /// Set the sleep between execution cycles.
    pub fn polling_interval(mut self, interval: Duration) -> Self {
        self.config.polling_interval = interval;
        self
    }

    /// Set the failure callback.
    pub fn on_fail(
        mut self,
        callback: impl Fn(&PollerHandle, &JobError, &JobRow) + Send + Sync + 'static,
    ) -> Self {
        self.config.on_fail = Arc::new(callback);
        self
    }

    /// Set the ack callback.
    pub fn on_ack(mut self, callback: impl Fn(&PollerHandle, &Ack) + Send + Sync + 'static) -> Self {
        self.config.on_ack = Arc::new(callback);
        self
    }

    /// Build the WorkerConfig.
    pub fn build(self) -> WorkerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert!(config.queues.is_empty());
        assert_eq!(config.threads_num, 1);
        assert_eq!(config.polling_interval, Duration::from_millis(5000));
    }

    #[test]
    fn test_builder() {
        let config = WorkerConfig::builder()
            .queues([Queue::new("a").unwrap(), Queue::new("b").unwrap()])
            .threads_num(4)
            .polling_interval(Duration::from_millis(50))
            .build();
        assert_eq!(config.queues.len(), 2);
        assert_eq!(config.threads_num, 4);
        assert_eq!(config.polling_interval, Duration::from_millis(50));
    }
}
