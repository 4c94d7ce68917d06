//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring batch collection over every Seoul Open API source.

use std::sync::Arc;

use seoulpet_collector::{run_recorded_batch, BatchCollector};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::CollectRange;

/// Builds and starts the background job scheduler.
///
/// When `cron` is `None` no job is registered and the scheduler idles.
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// cron expression is rejected, or the scheduler fails to start.
pub async fn build_scheduler(
    batch: Arc<BatchCollector>,
    cron: Option<&str>,
    range: CollectRange,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    match cron {
        Some(expr) => {
            register_collection_job(&scheduler, expr, batch, range).await?;
            tracing::info!(cron = expr, "scheduler: batch collection job registered");
        }
        None => tracing::info!("scheduler: SEOULPET_COLLECT_CRON empty; no collection job"),
    }

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_collection_job(
    scheduler: &JobScheduler,
    cron: &str,
    batch: Arc<BatchCollector>,
    range: CollectRange,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let batch = Arc::clone(&batch);

        Box::pin(async move {
            tracing::info!(
                start = range.start,
                end = range.end,
                "scheduler: starting batch collection"
            );
            run_collection_job(&batch, range).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn run_collection_job(batch: &BatchCollector, range: CollectRange) {
    match run_recorded_batch(batch, "scheduler", range.start, range.end).await {
        Ok(run) if run.succeeded => tracing::info!(
            run_id = run.run_id,
            collected = run.summary.total_collected,
            saved = run.summary.total_saved,
            failed_tasks = run.summary.failed_tasks,
            "scheduler: batch collection complete"
        ),
        Ok(run) => tracing::error!(
            run_id = run.run_id,
            failed_tasks = run.summary.failed_tasks,
            "scheduler: every collection task failed"
        ),
        Err(e) => tracing::error!(error = %e, "scheduler: could not record collection run"),
    }
}
