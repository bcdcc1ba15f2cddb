//! Job rows, lifecycle states, and execution acks.

use std::fmt;

/// Lifecycle state of a job row.
///
/// The numeric values are part of the on-disk contract: existing deployments
/// carry them in the `state` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[repr(i16)]
pub enum JobState {
    /// Scheduled and eligible for reservation.
    New = 0,
    /// Executed to completion. Terminal.
    Done = 1,
    /// Execution raised; the job's own SQL was rolled back. Terminal.
    Failed = 2,
}

/// One persisted job: a scheduled callable invocation and its state.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct JobRow {
    /// Server-assigned id; strictly increasing with insertion time and
    /// therefore the FIFO order within a queue.
    pub id: i64,
    /// Symbolic name of the callable, resolved through the registry.
    pub job: String,
    /// Positional arguments as a JSON array, opaque to the engine.
    pub args: String,
    /// Lifecycle state.
    pub state: JobState,
    /// Queue tag the job was scheduled to.
    pub queue: String,
}

/// Error produced by a job execution.
///
/// Jobs return this from their handler; panics raised during execution are
/// converted into one as well.
#[derive(Debug)]
pub struct JobError {
    message: String,
}

impl JobError {
    /// Create a new job error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl<E: std::error::Error> From<E> for JobError {
    fn from(err: E) -> Self {
        Self::new(err.to_string())
    }
}

/// Result of one execution cycle.
#[derive(Debug)]
pub enum Ack {
    /// No NEW row matched the queue filter (or all candidates were locked by
    /// peers).
    Empty,
    /// The job ran to completion; the row is in state [`JobState::Done`].
    Done(JobRow),
    /// The job raised; the row is in state [`JobState::Failed`] and the job's
    /// own SQL was rolled back.
    Failed(JobError, JobRow),
}

impl Ack {
    /// Whether this cycle found no job to run.
    pub fn is_empty(&self) -> bool {
        matches!(self, Ack::Empty)
    }

    /// The job row, if a job was executed this cycle.
    pub fn row(&self) -> Option<&JobRow> {
        match self {
            Ack::Empty => None,
            Ack::Done(row) | Ack::Failed(_, row) => Some(row),
        }
    }
}
