//! Reservation and execution of single jobs.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde_json::Value;
use sqlx::{Acquire, PgConnection, Postgres, Transaction};

use crate::error::Result;
use crate::job::{Ack, JobError, JobRow, JobState};
use crate::queue::Queue;
use crate::registry::{JobContext, Registry};

/// A reserved row: locked by the current transaction, state still NEW.
struct Candidate {
    id: i64,
    job: String,
    args: String,
}

const RESERVE_ANY: &str = "SELECT id, job, args
    FROM byplay
    WHERE state = $1
    ORDER BY id
    LIMIT 1
    FOR UPDATE SKIP LOCKED";

const RESERVE_QUEUE: &str = "SELECT id, job, args
    FROM byplay
    WHERE state = $1 AND queue = $2
    ORDER BY id
    LIMIT 1
    FOR UPDATE SKIP LOCKED";

/// Lock the oldest NEW row on one queue (or on any queue).
///
/// `SKIP LOCKED` makes concurrent transactions pass over rows already locked
/// by peers, so parallel workers claim distinct rows without blocking. The
/// lock lives until the enclosing transaction ends; the row itself is not
/// modified here.
async fn reserve_from(
    tx: &mut Transaction<'_, Postgres>,
    queue: Option<&Queue>,
) -> Result<Option<Candidate>> {
    let row: Option<(i64, String, String)> = match queue {
        Some(q) => {
            sqlx::query_as(RESERVE_QUEUE)
                .bind(JobState::New)
                .bind(q.as_str())
                .fetch_optional(&mut **tx)
                .await?
        }
        None => {
            sqlx::query_as(RESERVE_ANY)
                .bind(JobState::New)
                .fetch_optional(&mut **tx)
                .await?
        }
    };
    Ok(row.map(|(id, job, args)| Candidate { id, job, args }))
}

/// Claim one pending job from a prioritised list of queues.
///
/// Queues are tried in the given order, stopping at the first hit, so a
/// worker exhausts a higher-priority queue before descending. An empty list
/// means any queue, ordered globally by id.
async fn reserve(
    tx: &mut Transaction<'_, Postgres>,
    queues: &[Queue],
) -> Result<Option<Candidate>> {
    if queues.is_empty() {
        return reserve_from(tx, None).await;
    }
    for queue in queues {
        if let Some(candidate) = reserve_from(tx, Some(queue)).await? {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

async fn mark(tx: &mut Transaction<'_, Postgres>, id: i64, state: JobState) -> Result<JobRow> {
    let row = sqlx::query_as::<_, JobRow>(
        "UPDATE byplay SET state = $1 WHERE id = $2 RETURNING id, job, args, state, queue",
    )
    .bind(state)
    .bind(id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

/// Perform one full execution cycle: reserve, run, mark, commit.
///
/// Opens a transaction on `conn`, reserves the oldest NEW row matching
/// `queues` (empty slice: any queue), and runs the registered callable under
/// a savepoint. A normal return releases the savepoint and marks the row
/// DONE; an error or panic rolls back to the savepoint (undoing the job's
/// own SQL while keeping the reservation lock) and marks the row FAILED.
/// Either way the enclosing transaction commits the marking together with the
/// reservation, so no other worker can re-reserve the row in between.
///
/// Job errors are returned inside the [`Ack`], never as `Err`. An unknown job
/// name and SQL errors during reservation or marking do propagate as `Err`
/// (the transaction drops and rolls back, leaving the row NEW).
///
/// `conn` must not already be inside a transaction: the commit issued here
/// would prematurely finalise the caller's transaction. This is a documented
/// hazard, not a checked condition.
pub async fn execute_once(
    conn: &mut PgConnection,
    registry: &Registry,
    queues: &[Queue],
) -> Result<Ack> {
    let mut tx = sqlx::Connection::begin(conn).await?;

    let Some(candidate) = reserve(&mut tx, queues).await? else {
        tx.commit().await?;
        return Ok(Ack::Empty);
    };

    tracing::debug!(id = candidate.id, job = %candidate.job, "job claimed");

    let handler = registry.resolve(&candidate.job)?;
    let argv: Vec<Value> = serde_json::from_str(&candidate.args)?;

    let mut savepoint = tx.begin().await?;
    let outcome = {
        let ctx = JobContext::new(&mut *savepoint);
        AssertUnwindSafe(handler.call(ctx, argv)).catch_unwind().await
    };

    match flatten_panic(outcome) {
        Ok(()) => {
            savepoint.commit().await?;
            let row = mark(&mut tx, candidate.id, JobState::Done).await?;
            tx.commit().await?;
            tracing::debug!(id = row.id, job = %row.job, "job done");
            Ok(Ack::Done(row))
        }
        Err(err) => {
            savepoint.rollback().await?;
            let row = mark(&mut tx, candidate.id, JobState::Failed).await?;
            tx.commit().await?;
            tracing::debug!(id = row.id, job = %row.job, error = %err, "job failed");
            Ok(Ack::Failed(err, row))
        }
    }
}

type Caught = std::result::Result<std::result::Result<(), JobError>, Box<dyn std::any::Any + Send>>;

fn flatten_panic(outcome: Caught) -> std::result::Result<(), JobError> {
    match outcome {
        Ok(result) => result,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "job panicked".to_string());
            Err(JobError::new(message))
        }
    }
}
