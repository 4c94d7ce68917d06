//! Batch runs recorded in `collection_runs`.

use seoulpet_core::BatchSummary;
use seoulpet_db::DbError;

use crate::batch::BatchCollector;

/// A finished batch and the `collection_runs` row that records it.
#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub run_id: i64,
    pub succeeded: bool,
    pub summary: BatchSummary,
}

/// Runs `batch` over `start..=end` between opening and closing a
/// `collection_runs` row tagged with `trigger_source`.
///
/// The run is marked `failed` when every task died; otherwise it is marked
/// `succeeded` with its totals and the summary as JSON, even when individual
/// sources reported `error`.
///
/// # Errors
///
/// Returns [`DbError`] if the run row cannot be created or closed. The
/// summary is lost in that case; the collected data is not.
pub async fn run_recorded_batch(
    batch: &BatchCollector,
    trigger_source: &str,
    start: u32,
    end: u32,
) -> Result<RecordedRun, DbError> {
    let pool = batch.collector().pool();
    let run = seoulpet_db::create_collection_run(
        pool,
        trigger_source,
        saturating_i32(start),
        saturating_i32(end),
    )
    .await?;

    let summary = batch.collect_all(start, end).await;

    if summary.total_tasks > 0 && summary.failed_tasks == summary.total_tasks {
        let message = format!("all {} collection tasks failed", summary.failed_tasks);
        fail_run_best_effort(pool, run.id, message).await;
        return Ok(RecordedRun {
            run_id: run.id,
            succeeded: false,
            summary,
        });
    }

    let summary_json = serde_json::to_value(&summary).unwrap_or_else(|e| {
        tracing::warn!(run_id = run.id, error = %e, "could not serialize batch summary");
        serde_json::Value::Null
    });

    if let Err(e) = seoulpet_db::complete_collection_run(
        pool,
        run.id,
        saturating_i32(summary.total_collected),
        saturating_i32(summary.total_saved),
        &summary_json,
    )
    .await
    {
        fail_run_best_effort(pool, run.id, e.to_string()).await;
        return Err(e);
    }

    tracing::info!(
        run_id = run.id,
        trigger_source,
        saved = summary.total_saved,
        "collection run recorded"
    );
    Ok(RecordedRun {
        run_id: run.id,
        succeeded: true,
        summary,
    })
}

async fn fail_run_best_effort(pool: &sqlx::PgPool, run_id: i64, message: String) {
    if let Err(mark_err) = seoulpet_db::fail_collection_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark collection run as failed"
        );
    }
}

fn saturating_i32<N: TryInto<i32>>(value: N) -> i32 {
    value.try_into().unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::saturating_i32;

    #[test]
    fn saturating_i32_clamps_large_counts() {
        assert_eq!(saturating_i32(42_usize), 42);
        assert_eq!(saturating_i32(u32::MAX), i32::MAX);
        assert_eq!(saturating_i32(usize::MAX), i32::MAX);
    }
}
