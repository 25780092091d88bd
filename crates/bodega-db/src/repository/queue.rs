//! # Offline Queue Repository
//!
//! Durable storage for sales captured while the backend was unreachable.
//!
//! ## Operation lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   enqueue ──► pending ──► syncing ──┬──► (row removed)   success        │
//! │                  ▲                  │                                   │
//! │                  └──────────────────┼──── transient failure             │
//! │                                     │     (attempts += 1)               │
//! │                                     └──► failed           rejection or  │
//! │                                                           attempts      │
//! │                                                           exhausted     │
//! │                                                                         │
//! │  Failed entries are never dropped automatically: they stay for         │
//! │  operator review until retried or cleared.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The operation id doubles as the sale's client id, which is what makes
//! replay idempotent across crashes mid-sync.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use bodega_core::{QueueOperation, QueueStatus};

const SELECT_OP: &str = r#"
    SELECT id, store_id, user_id, payload, status, attempts, last_error, created_at
    FROM queue_operations
"#;

/// Repository for the offline operation queue.
#[derive(Debug, Clone)]
pub struct QueueRepository {
    pool: SqlitePool,
}

impl QueueRepository {
    /// Creates a new QueueRepository.
    pub fn new(pool: SqlitePool) -> Self {
        QueueRepository { pool }
    }

    /// Enqueues a serialized operation with the given id.
    pub async fn enqueue(
        &self,
        id: &str,
        store_id: &str,
        user_id: &str,
        payload: &str,
    ) -> DbResult<QueueOperation> {
        let now = Utc::now();

        debug!(id, store_id, "Enqueuing offline operation");

        sqlx::query(
            r#"
            INSERT INTO queue_operations (
                id, store_id, user_id, payload, status, attempts, last_error, created_at
            ) VALUES (?1, ?2, ?3, ?4, 'pending', 0, NULL, ?5)
            "#,
        )
        .bind(id)
        .bind(store_id)
        .bind(user_id)
        .bind(payload)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("QueueOperation", id))
    }

    /// Gets an operation by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<QueueOperation>> {
        let op = sqlx::query_as::<_, QueueOperation>(&format!("{SELECT_OP} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(op)
    }

    /// Returns the oldest pending operation, if any. Replay is strictly
    /// ordered: operations never overtake an older pending one.
    pub async fn next_pending(&self) -> DbResult<Option<QueueOperation>> {
        let op = sqlx::query_as::<_, QueueOperation>(&format!(
            "{SELECT_OP} WHERE status = 'pending' ORDER BY created_at, id LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(op)
    }

    /// Lists operations in a given state, oldest first.
    pub async fn list_by_status(&self, status: QueueStatus) -> DbResult<Vec<QueueOperation>> {
        let ops = sqlx::query_as::<_, QueueOperation>(&format!(
            "{SELECT_OP} WHERE status = ?1 ORDER BY created_at, id"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(ops)
    }

    /// Counts pending operations.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM queue_operations WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Claims a pending operation for replay. The guard keeps two replay
    /// loops from claiming the same row.
    pub async fn mark_syncing(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE queue_operations SET status = 'syncing', attempts = attempts + 1 \
             WHERE id = ?1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("QueueOperation (pending)", id));
        }
        Ok(())
    }

    /// Returns a syncing operation to pending after a transient failure.
    pub async fn return_to_pending(&self, id: &str, error: &str) -> DbResult<()> {
        sqlx::query(
            "UPDATE queue_operations SET status = 'pending', last_error = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Parks an operation as failed for operator review.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        sqlx::query(
            "UPDATE queue_operations SET status = 'failed', last_error = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Requeues a failed operation for another replay round.
    pub async fn retry_failed(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE queue_operations SET status = 'pending', attempts = 0, last_error = NULL \
             WHERE id = ?1 AND status = 'failed'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("QueueOperation (failed)", id));
        }
        Ok(())
    }

    /// Removes a successfully replayed operation.
    pub async fn remove(&self, id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM queue_operations WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
