//! Producer API: inserting job rows.

use serde_json::Value;
use sqlx::PgExecutor;

use crate::error::Result;
use crate::job::JobState;
use crate::queue::Queue;
use crate::registry::Registry;

/// Schedule a job onto an explicit queue.
///
/// Inserts one NEW row on the caller's executor and returns the
/// server-assigned id. `None` means the `default` queue.
///
/// No transaction is opened here: handed the connection of an open
/// transaction, the insert participates in it and is rolled back with it.
/// That is how scheduling is coupled to the commit of related business data.
pub async fn schedule_to<'e, E>(
    executor: E,
    queue: Option<&Queue>,
    job: &str,
    args: &[Value],
) -> Result<i64>
where
    E: PgExecutor<'e>,
{
    let queue = queue.cloned().unwrap_or_default();
    let args = serde_json::to_string(args)?;
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO byplay (job, args, state, queue) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(job)
    .bind(&args)
    .bind(JobState::New)
    .bind(queue.as_str())
    .fetch_one(executor)
    .await?;

    tracing::debug!(job, queue = queue.as_str(), id, "job scheduled");
    Ok(id)
}

/// Schedule a job onto the queue its registry entry names.
///
/// Reads the queue annotation attached at registration time (see
/// [`Registry::register_in`]) and delegates to [`schedule_to`]; jobs
/// registered without an annotation go to the `default` queue. Scheduling an
/// unregistered name is a precondition error.
pub async fn schedule<'e, E>(
    executor: E,
    registry: &Registry,
    job: &str,
    args: &[Value],
) -> Result<i64>
where
    E: PgExecutor<'e>,
{
    let queue = registry.queue_of(job)?;
    schedule_to(executor, queue, job, args).await
}

/// Number of NEW rows waiting on one queue, or on all queues.
pub async fn pending_count<'e, E>(executor: E, queue: Option<&Queue>) -> Result<i64>
where
    E: PgExecutor<'e>,
{
    let count: i64 = match queue {
        Some(q) => {
            sqlx::query_scalar("SELECT COUNT(*) FROM byplay WHERE state = $1 AND queue = $2")
                .bind(JobState::New)
                .bind(q.as_str())
                .fetch_one(executor)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(*) FROM byplay WHERE state = $1")
                .bind(JobState::New)
                .fetch_one(executor)
                .await?
        }
    };
    Ok(count)
}
