//! String-keyed registry of job functions.
//!
//! The engine stores only a symbolic name per job row; the host populates a
//! [`Registry`] at startup mapping each name to its callable (and, optionally,
//! to the queue the name should be scheduled to by default).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use sqlx::PgConnection;

use crate::error::{ByplayError, Result};
use crate::job::JobError;
use crate::queue::Queue;

/// Context handed to a running job.
///
/// It exposes the connection of the transaction the job runs in: any SQL a
/// job issues through it commits or rolls back together with the job's row
/// state. The source contract distinguished a raw driver handle from a
/// high-level wrapper; both collapse to the one `&mut PgConnection` here.
pub struct JobContext<'a> {
    conn: &'a mut PgConnection,
}

impl<'a> JobContext<'a> {
    pub(crate) fn new(conn: &'a mut PgConnection) -> Self {
        Self { conn }
    }

    /// The in-transaction connection.
    pub fn conn(&mut self) -> &mut PgConnection {
        self.conn
    }
}

/// Future returned by a job function.
pub type JobFuture<'a> = Pin<Box<dyn Future<Output = std::result::Result<(), JobError>> + Send + 'a>>;

/// A job callable.
///
/// Plain `fn` items with the shape
/// `fn(JobContext<'_>, Vec<Value>) -> JobFuture<'_>` implement this trait via
/// the blanket impl; stateful jobs implement it on their own type.
pub trait JobFn: Send + Sync {
    /// Run the job with the given context and positional arguments.
    fn call<'a>(&'a self, ctx: JobContext<'a>, argv: Vec<Value>) -> JobFuture<'a>;
}

impl<F> JobFn for F
where
    F: for<'a> Fn(JobContext<'a>, Vec<Value>) -> JobFuture<'a> + Send + Sync,
{
    fn call<'a>(&'a self, ctx: JobContext<'a>, argv: Vec<Value>) -> JobFuture<'a> {
        (self)(ctx, argv)
    }
}

struct Entry {
    handler: Arc<dyn JobFn>,
    queue: Option<Queue>,
}

/// Maps job names to their callables.
#[derive(Default)]
pub struct Registry {
    jobs: HashMap<String, Entry>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job under the given name.
    pub fn register(&mut self, name: impl Into<String>, job: impl JobFn + 'static) -> &mut Self {
        self.jobs.insert(
            name.into(),
            Entry {
                handler: Arc::new(job),
                queue: None,
            },
        );
        self
    }

    /// Register a job together with the queue [`crate::schedule`] routes it
    /// to by default.
    pub fn register_in(
        &mut self,
        name: impl Into<String>,
        queue: Queue,
        job: impl JobFn + 'static,
    ) -> &mut Self {
        self.jobs.insert(
            name.into(),
            Entry {
                handler: Arc::new(job),
                queue: Some(queue),
            },
        );
        self
    }

    /// Whether a job of this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    /// The queue annotation of a registered job, if it has one.
    ///
    /// Fails with [`ByplayError::UnknownJob`] if the name is not registered.
    pub fn queue_of(&self, name: &str) -> Result<Option<&Queue>> {
        self.jobs
            .get(name)
            .map(|entry| entry.queue.as_ref())
            .ok_or_else(|| ByplayError::UnknownJob(name.to_string()))
    }

    /// Resolve the callable for a job name.
    pub(crate) fn resolve(&self, name: &str) -> Result<Arc<dyn JobFn>> {
        self.jobs
            .get(name)
            .map(|entry| Arc::clone(&entry.handler))
            .ok_or_else(|| ByplayError::UnknownJob(name.to_string()))
    }
}
