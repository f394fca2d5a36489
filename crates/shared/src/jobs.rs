//! The persistent job queue backing the two background job kinds: message
//! processing (C5) and calendar sync (C6). Producers (the API, the
//! orchestrator itself) enqueue rows here; the worker's poll loop claims
//! them with `FOR UPDATE SKIP LOCKED` and reports results back.
//!
//! Grounded in the original outbox-message table: one queue, a
//! discriminated `job_type`, a JSON payload, retry bookkeeping with
//! exponential backoff, and batched status updates.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use eventline_core::types::{CalendarId, EventId, MessageId};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_type", rename_all = "snake_case")]
pub enum JobType {
    ProcessMessage,
    SyncEvent,
    DeleteEventSync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A claimed row from the job queue.
#[derive(Debug, Clone, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub job_type: JobType,
    pub payload: sqlx::types::Json<serde_json::Value>,
    pub status: JobStatus,
    pub retry_count: i32,
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProcessMessagePayload {
    message_id: MessageId,
}

#[derive(Debug, Serialize, Deserialize)]
struct SyncEventPayload {
    event_id: EventId,
    calendar_id: Option<CalendarId>,
}

impl Job {
    pub fn message_id(&self) -> Option<MessageId> {
        serde_json::from_value::<ProcessMessagePayload>(self.payload.0.clone())
            .ok()
            .map(|p| p.message_id)
    }

    pub fn sync_target(&self) -> Option<(EventId, Option<CalendarId>)> {
        serde_json::from_value::<SyncEventPayload>(self.payload.0.clone())
            .ok()
            .map(|p| (p.event_id, p.calendar_id))
    }
}

/// The outcome of running one claimed job, destined for a batched update.
pub enum JobResult {
    Completed(Uuid),
    Reschedule {
        id: Uuid,
        retry_count: i32,
        scheduled_at: DateTime<Utc>,
        error: String,
    },
    Failed {
        id: Uuid,
        error: String,
    },
}

/// Enqueue a message-processing job (C5). Re-running the orchestrator on
/// an already-processed message is a no-op at the orchestrator level, so
/// duplicate enqueues are harmless.
pub async fn enqueue_process_message(pool: &PgPool, message_id: MessageId) -> Result<Uuid, sqlx::Error> {
    enqueue(pool, JobType::ProcessMessage, serde_json::json!({ "message_id": message_id })).await
}

/// Enqueue a calendar-sync job (C6), run only after the approval commit
/// that put the event into `APPROVED`.
pub async fn enqueue_sync_event(
    pool: &PgPool,
    event_id: EventId,
    calendar_id: Option<CalendarId>,
) -> Result<Uuid, sqlx::Error> {
    enqueue(
        pool,
        JobType::SyncEvent,
        serde_json::json!({ "event_id": event_id, "calendar_id": calendar_id }),
    )
    .await
}

/// Enqueue a job to delete the external event, run when a synced event is
/// deleted locally.
pub async fn enqueue_delete_event_sync(pool: &PgPool, event_id: EventId) -> Result<Uuid, sqlx::Error> {
    enqueue(
        pool,
        JobType::DeleteEventSync,
        serde_json::json!({ "event_id": event_id, "calendar_id": serde_json::Value::Null }),
    )
    .await
}

async fn enqueue(pool: &PgPool, job_type: JobType, payload: serde_json::Value) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO jobs (id, job_type, payload, status, retry_count, scheduled_at, created_at)
        VALUES ($1, $2, $3, 'pending', 0, NOW(), NOW())
        "#,
    )
    .bind(id)
    .bind(job_type)
    .bind(sqlx::types::Json(payload))
    .execute(pool)
    .await?;
    Ok(id)
}

/// Claim up to `batch_size` due jobs, marking them `processing` in the
/// same statement so two workers never race for the same row.
pub async fn fetch_pending_jobs(pool: &PgPool, batch_size: i64) -> Result<Vec<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(
        r#"
        UPDATE jobs
        SET status = 'processing'
        WHERE id IN (
            SELECT id FROM jobs
            WHERE status = 'pending'
              AND scheduled_at <= NOW()
            ORDER BY scheduled_at
            LIMIT $1
            FOR UPDATE SKIP LOCKED
        )
        RETURNING id, job_type, payload, status, retry_count, scheduled_at, created_at
        "#,
    )
    .bind(batch_size)
    .fetch_all(pool)
    .await
}

pub async fn count_pending(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE status = 'pending'")
        .fetch_one(pool)
        .await
}

/// Apply a batch of job results in one round-trip per outcome kind.
pub async fn bulk_update_jobs(pool: &PgPool, results: Vec<JobResult>) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for result in results {
        match result {
            JobResult::Completed(id) => {
                sqlx::query("UPDATE jobs SET status = 'completed' WHERE id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            JobResult::Reschedule { id, retry_count, scheduled_at, error: _ } => {
                sqlx::query(
                    "UPDATE jobs SET status = 'pending', retry_count = $2, scheduled_at = $3 WHERE id = $1",
                )
                .bind(id)
                .bind(retry_count)
                .bind(scheduled_at)
                .execute(&mut *tx)
                .await?;
            }
            JobResult::Failed { id, error: _ } => {
                sqlx::query("UPDATE jobs SET status = 'failed' WHERE id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }
    tx.commit().await
}

/// Exponential backoff in minutes: `2^(retry_count+1)`.
pub fn backoff_schedule(retry_count: i32) -> DateTime<Utc> {
    let backoff_minutes = 2_i64.pow((retry_count + 1) as u32);
    Utc::now() + ChronoDuration::minutes(backoff_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_each_retry() {
        let now = Utc::now();
        let first = backoff_schedule(0) - now;
        let second = backoff_schedule(1) - now;
        assert!(second.num_minutes() > first.num_minutes());
    }

    #[test]
    fn job_extracts_message_id_payload() {
        let message_id = MessageId::new();
        let job = Job {
            id: Uuid::new_v4(),
            job_type: JobType::ProcessMessage,
            payload: sqlx::types::Json(serde_json::json!({ "message_id": message_id })),
            status: JobStatus::Processing,
            retry_count: 0,
            scheduled_at: Utc::now(),
            created_at: Utc::now(),
        };
        assert_eq!(job.message_id(), Some(message_id));
        assert_eq!(job.sync_target(), None);
    }

    #[test]
    fn job_extracts_sync_event_payload() {
        let event_id = EventId::new();
        let calendar_id = CalendarId::new();
        let job = Job {
            id: Uuid::new_v4(),
            job_type: JobType::SyncEvent,
            payload: sqlx::types::Json(
                serde_json::json!({ "event_id": event_id, "calendar_id": calendar_id }),
            ),
            status: JobStatus::Processing,
            retry_count: 0,
            scheduled_at: Utc::now(),
            created_at: Utc::now(),
        };
        assert_eq!(job.sync_target(), Some((event_id, Some(calendar_id))));
    }
}
