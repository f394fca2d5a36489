//! Eventline Worker - background job processor.
//!
//! Polls the shared job queue and dispatches each claimed job to the
//! matching handler: message processing (C5), calendar sync (C6), or the
//! sync-undo delete (C6 undo path).

pub mod config;
pub mod orchestrator;
pub mod sync;

pub use config::Config;

use anyhow::Result;
use eventline_shared::jobs::{self, Job, JobResult, JobType};
use sqlx::PgPool;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Run the background worker service until cancelled or an unrecoverable
/// error occurs.
pub async fn run_worker(pool: PgPool, config: Config, shutdown: Option<CancellationToken>) -> Result<()> {
    info!(
        "Starting worker: poll_interval={}s, max_retries={}, batch_size={}",
        config.poll_interval_secs, config.max_retry_count, config.batch_size
    );

    let janitor_handle = tokio::spawn(run_janitor_loop(pool.clone(), config.clone(), shutdown.clone()));

    let result = run_worker_loop(pool, config, shutdown).await;
    janitor_handle.abort();
    result
}

/// Periodic sweep that deletes `REJECTED` events past their retention
/// window (§4.7). Runs independently of the job queue's poll loop since
/// it isn't triggered by any enqueued work.
async fn run_janitor_loop(pool: PgPool, config: Config, shutdown: Option<CancellationToken>) {
    let mut interval = tokio::time::interval(Duration::from_secs(config.janitor_interval_secs));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                match eventline_shared::repo::delete_rejected_older_than(&pool, config.rejected_event_retention_days).await {
                    Ok(count) if count > 0 => info!("janitor: swept {} rejected event(s)", count),
                    Ok(_) => {}
                    Err(e) => error!("janitor: sweep failed: {}", e),
                }
            }
            _ = async {
                if let Some(ref token) = shutdown {
                    token.cancelled().await;
                } else {
                    std::future::pending::<()>().await;
                }
            } => {
                info!("janitor: stopping on shutdown signal");
                return;
            }
        }
    }
}

/// Main worker processing loop: concurrent batch-fetch, per-job
/// processing, and batched status updates, all overlapped via `JoinSet`s.
async fn run_worker_loop(pool: PgPool, config: Config, shutdown: Option<CancellationToken>) -> Result<()> {
    let poll_interval = Duration::from_secs(config.poll_interval_secs);
    let mut last_status_log_time = Instant::now()
        .checked_sub(Duration::from_secs(config.status_log_interval_secs))
        .unwrap_or_else(Instant::now);

    let (fetch_tx, mut fetch_rx) = tokio::sync::mpsc::channel(1);

    {
        let pool = pool.clone();
        let fetch_tx = fetch_tx.clone();
        let batch_size = config.batch_size;
        tokio::spawn(async move {
            let result = jobs::fetch_pending_jobs(&pool, batch_size).await;
            let _ = fetch_tx.send(result).await;
        });
    }
    let mut is_fetching = true;

    let mut tasks = tokio::task::JoinSet::new();
    let mut update_tasks = tokio::task::JoinSet::new();
    let mut pending_results = Vec::new();
    let max_pending_results = config.batch_size as usize;
    let mut flush_interval = tokio::time::interval(Duration::from_secs(1));

    let mut is_shutdown = false;

    loop {
        if is_shutdown && tasks.is_empty() && pending_results.is_empty() && update_tasks.is_empty() {
            info!("Worker shutdown complete");
            break;
        }

        tokio::select! {
            _ = async {
                if !is_shutdown {
                    if let Some(ref token) = shutdown {
                        token.cancelled().await;
                    } else {
                        std::future::pending::<()>().await;
                    }
                } else {
                    std::future::pending::<()>().await;
                }
            } => {
                info!("Worker received shutdown signal, draining tasks...");
                is_shutdown = true;
            }

            Some(res) = fetch_rx.recv(), if !is_shutdown => {
                match res {
                    Ok(jobs) => {
                        if jobs.is_empty() {
                            let pool = pool.clone();
                            let fetch_tx = fetch_tx.clone();
                            let batch_size = config.batch_size;
                            tokio::spawn(async move {
                                tokio::time::sleep(poll_interval).await;
                                let result = jobs::fetch_pending_jobs(&pool, batch_size).await;
                                let _ = fetch_tx.send(result).await;
                            });
                        } else {
                            is_fetching = false;
                            info!("Fetched {} jobs", jobs.len());
                            for job in jobs {
                                let pool = pool.clone();
                                let config = config.clone();
                                tasks.spawn(async move { process_job(&pool, &config, job).await });
                            }
                        }
                    }
                    Err(e) => {
                        error!("Failed to fetch pending jobs: {}", e);
                        let pool = pool.clone();
                        let fetch_tx = fetch_tx.clone();
                        let batch_size = config.batch_size;
                        tokio::spawn(async move {
                            tokio::time::sleep(poll_interval).await;
                            let result = jobs::fetch_pending_jobs(&pool, batch_size).await;
                            let _ = fetch_tx.send(result).await;
                        });
                    }
                }
            }

            Some(res) = tasks.join_next(), if !tasks.is_empty() => {
                match res {
                    Ok(job_result) => {
                        pending_results.push(job_result);
                        if pending_results.len() >= max_pending_results {
                            let batch: Vec<_> = pending_results.drain(..).collect();
                            let pool = pool.clone();
                            update_tasks.spawn(async move {
                                if let Err(e) = jobs::bulk_update_jobs(&pool, batch).await {
                                    error!("Failed to bulk update jobs: {}", e);
                                }
                            });
                        }
                    }
                    Err(e) => {
                        error!("Task join error: {}", e);
                    }
                }
            }

            Some(res) = update_tasks.join_next(), if !update_tasks.is_empty() => {
                if let Err(e) = res {
                    error!("Update task join error: {}", e);
                }
            }

            _ = flush_interval.tick() => {
                if !pending_results.is_empty() {
                    let batch: Vec<_> = pending_results.drain(..).collect();
                    let pool = pool.clone();
                    update_tasks.spawn(async move {
                        if let Err(e) = jobs::bulk_update_jobs(&pool, batch).await {
                            error!("Failed to bulk update jobs: {}", e);
                        }
                    });
                }

                if last_status_log_time.elapsed() >= Duration::from_secs(config.status_log_interval_secs) {
                    let pool = pool.clone();
                    tokio::spawn(async move {
                        if let Ok(pending_count) = jobs::count_pending(&pool).await
                            && pending_count > 0
                        {
                            info!("Queue status: {} pending jobs remaining", pending_count);
                        }
                    });
                    last_status_log_time = Instant::now();
                }
            }
        }

        if !is_shutdown && !is_fetching && tasks.len() < config.batch_size as usize {
            let batch_size = (config.batch_size as usize).saturating_sub(tasks.len());
            if batch_size > 0 {
                let pool = pool.clone();
                let fetch_tx = fetch_tx.clone();
                tokio::spawn(async move {
                    let result = jobs::fetch_pending_jobs(&pool, batch_size as i64).await;
                    let _ = fetch_tx.send(result).await;
                });
                is_fetching = true;
            }
        }

        if is_shutdown && tasks.is_empty() && !pending_results.is_empty() {
            let batch: Vec<_> = pending_results.drain(..).collect();
            let pool = pool.clone();
            update_tasks.spawn(async move {
                if let Err(e) = jobs::bulk_update_jobs(&pool, batch).await {
                    error!("Failed to bulk update jobs: {}", e);
                }
            });
        }
    }

    Ok(())
}

/// Dispatch one claimed job to its handler and turn the outcome into a
/// [`JobResult`] destined for the batched update.
pub(crate) async fn process_job(pool: &PgPool, config: &Config, job: Job) -> JobResult {
    info!("Processing job {} (type: {:?}, retry: {})", job.id, job.job_type, job.retry_count);

    let outcome = match job.job_type {
        JobType::ProcessMessage => match job.message_id() {
            Some(message_id) => orchestrator::process_message(pool, &config.core, message_id).await,
            None => Err(anyhow::anyhow!("process_message job {} has no message_id payload", job.id)),
        },
        JobType::SyncEvent => match job.sync_target() {
            Some((event_id, calendar_id)) => sync::sync_event(pool, config, event_id, calendar_id).await,
            None => Err(anyhow::anyhow!("sync_event job {} has no event_id payload", job.id)),
        },
        JobType::DeleteEventSync => match job.sync_target() {
            Some((event_id, _)) => sync::delete_event_sync(pool, config, event_id).await,
            None => Err(anyhow::anyhow!("delete_event_sync job {} has no event_id payload", job.id)),
        },
    };

    match outcome {
        Ok(()) => {
            info!("Job {} completed successfully", job.id);
            JobResult::Completed(job.id)
        }
        Err(e) => {
            warn!("Job {} failed: {}", job.id, e);
            let error_msg = e.to_string();
            if job.retry_count < config.max_retry_count {
                let scheduled_at = jobs::backoff_schedule(job.retry_count);
                info!("Rescheduling job {} for retry {} at {}", job.id, job.retry_count + 1, scheduled_at);
                JobResult::Reschedule {
                    id: job.id,
                    retry_count: job.retry_count + 1,
                    scheduled_at,
                    error: error_msg,
                }
            } else {
                error!("Job {} exceeded max retries ({}), marking as failed", job.id, config.max_retry_count);
                JobResult::Failed { id: job.id, error: error_msg }
            }
        }
    }
}
