//! # byplay - Durable PostgreSQL-Backed Job Queue
//!
//! A Rust library for background job processing on top of PostgreSQL (9.5+).
//! Jobs are rows; workers claim them with `FOR UPDATE SKIP LOCKED` and run
//! each one inside its own database transaction, so a job's side effects in
//! that database are committed on success and rolled back on failure.
//!
//! ## Features
//!
//! - **Transactional execution**: each job runs under a savepoint inside the
//!   claiming transaction; a failed job leaves no trace of its own SQL
//! - **No double execution**: concurrent workers skip rows locked by peers,
//!   so N workers claim N distinct jobs without blocking each other
//! - **Multi-queue priority**: an ordered queue list is drained in strict
//!   priority order, FIFO within each queue
//! - **Transactional scheduling**: scheduling on a caller's open transaction
//!   stands or falls with that transaction
//! - **Graceful shutdown**: interruption lets running jobs finish their
//!   transactions before the worker terminates
//!
//! ## Quick Start
//!
//! ### Scheduling jobs
//!
//! ```rust,no_run
//! use byplay::{install, schedule_to};
//! use serde_json::json;
//! use sqlx::PgPool;
//!
//! #[tokio::main]
//! async fn main() -> byplay::Result<()> {
//!     let pool = PgPool::connect("postgres://localhost/app").await?;
//!     let mut conn = pool.acquire().await?;
//!
//!     // Create the job table (idempotent).
//!     install(&mut conn).await?;
//!
//!     // One INSERT; pass a transaction's connection to couple the job to it.
//!     schedule_to(&mut *conn, None, "app.send-email", &[json!("user@example.com")]).await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Processing jobs
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use byplay::{JobContext, JobFuture, Registry, Worker, WorkerConfig};
//! use serde_json::Value;
//! use sqlx::PgPool;
//!
//! fn send_email(mut ctx: JobContext<'_>, argv: Vec<Value>) -> JobFuture<'_> {
//!     Box::pin(async move {
//!         // SQL issued through the context commits or rolls back with the job.
//!         sqlx::query("INSERT INTO emails (recipient) VALUES ($1)")
//!             .bind(argv[0].as_str().unwrap_or_default())
//!             .execute(ctx.conn())
//!             .await?;
//!         Ok(())
//!     })
//! }
//!
//! #[tokio::main]
//! async fn main() -> byplay::Result<()> {
//!     let pool = PgPool::connect("postgres://localhost/app").await?;
//!
//!     let mut registry = Registry::new();
//!     registry.register("app.send-email", send_email);
//!
//!     let worker = Worker::new(pool, Arc::new(registry), WorkerConfig::default());
//!     worker.start()?;
//!     tokio::signal::ctrl_c().await.ok();
//!     worker.interrupt();
//!     worker.join().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod job;
pub mod queue;
pub mod registry;
pub mod schedule;
pub mod schema;
pub mod worker;

// Re-export main types
pub use config::{AckCallback, FailCallback, WorkerConfig, WorkerConfigBuilder};
pub use error::{ByplayError, Result};
pub use executor::execute_once;
pub use job::{Ack, JobError, JobRow, JobState};
pub use queue::{Queue, DEFAULT_QUEUE};
pub use registry::{JobContext, JobFn, JobFuture, Registry};
pub use schedule::{pending_count, schedule, schedule_to};
pub use schema::{install, uninstall};
pub use worker::{PollerHandle, Worker, WorkerState};
