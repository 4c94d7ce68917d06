//! Single-source fetch and upsert.
//!
//! One call moves one page range of one upstream source into its destination
//! table. Every record is upserted inside its own savepoint of a shared
//! transaction, so a record Postgres rejects is rolled back alone and the
//! rest of the range still commits together.

use std::future::Future;

use seoulpet_client::ClientError;
use seoulpet_core::{CollectionResult, Record, SkippedRecord};
use seoulpet_db::{upsert_record, validate_conflict_target, DbError, Destination};
use sqlx::{Connection, PgPool};

/// What happened to one fetched record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Saved,
    Skipped { index: usize, reason: String },
}

/// Running tally of [`RecordOutcome`]s for one collection.
#[derive(Debug, Default)]
pub struct SaveReport {
    saved: usize,
    skipped: Vec<SkippedRecord>,
}

impl SaveReport {
    pub fn record(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Saved => self.saved += 1,
            RecordOutcome::Skipped { index, reason } => {
                self.skipped.push(SkippedRecord { index, reason });
            }
        }
    }

    #[must_use]
    pub fn saved_count(&self) -> usize {
        self.saved
    }

    #[must_use]
    pub fn skipped(&self) -> &[SkippedRecord] {
        &self.skipped
    }

    /// Closes the tally into a `success` result over `collected` records.
    #[must_use]
    pub fn into_result(mut self, collected: usize) -> CollectionResult {
        self.skipped.sort_by_key(|s| s.index);
        CollectionResult::saved(collected, self.saved, self.skipped)
    }
}

/// Fetches records and upserts them into a [`Destination`] table.
#[derive(Debug, Clone)]
pub struct Collector {
    pool: PgPool,
}

impl Collector {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Fetches rows `start..=end` with `fetch` and upserts them into
    /// `T::TABLE`, keyed by `unique_fields`.
    ///
    /// Never fails: a fetch error or a failed transaction becomes an `error`
    /// result with zero counts, an empty fetch a `warning`, and anything else
    /// a `success` whose `saved_count` counts the records that made it in.
    /// Records that fail conversion or the upsert itself are listed in
    /// `skipped` and not retried.
    pub async fn collect_and_save<T, F, Fut>(
        &self,
        fetch: F,
        start: u32,
        end: u32,
        unique_fields: &[&str],
    ) -> CollectionResult
    where
        T: Destination,
        F: FnOnce(u32, u32) -> Fut,
        Fut: Future<Output = Result<Vec<Record>, ClientError>>,
    {
        let table = T::TABLE;

        let records = match fetch(start, end).await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(table, start, end, error = %e, "fetch failed");
                return CollectionResult::failed(e.to_string());
            }
        };

        if records.is_empty() {
            tracing::warn!(table, start, end, "no records returned");
            return CollectionResult::empty();
        }

        if let Err(e) = validate_conflict_target::<T>(unique_fields) {
            tracing::error!(table, error = %e, "refusing to upsert");
            return CollectionResult::failed(e.to_string());
        }

        let collected = records.len();
        let mut report = SaveReport::default();
        let mut rows: Vec<(usize, T)> = Vec::with_capacity(collected);

        for (index, record) in records.iter().enumerate() {
            match T::from_record(record) {
                Ok(row) => rows.push((index, row)),
                Err(e) => {
                    tracing::warn!(table, index, error = %e, "skipping invalid record");
                    report.record(RecordOutcome::Skipped {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if !rows.is_empty() {
            if let Err(e) = self.save_rows(&rows, unique_fields, &mut report).await {
                tracing::error!(table, error = %e, "transaction failed; nothing saved");
                return CollectionResult::failed(e.to_string());
            }
        }

        tracing::info!(
            table,
            collected,
            saved = report.saved_count(),
            skipped = report.skipped().len(),
            "collection finished"
        );
        report.into_result(collected)
    }

    async fn save_rows<T: Destination>(
        &self,
        rows: &[(usize, T)],
        unique_fields: &[&str],
        report: &mut SaveReport,
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        for (index, row) in rows {
            let mut savepoint = Connection::begin(&mut *tx).await?;
            match upsert_record(&mut *savepoint, row, unique_fields).await {
                Ok(()) => {
                    savepoint.commit().await?;
                    report.record(RecordOutcome::Saved);
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    tracing::warn!(table = T::TABLE, index, error = %e, "skipping record rejected by database");
                    report.record(RecordOutcome::Skipped {
                        index: *index,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
