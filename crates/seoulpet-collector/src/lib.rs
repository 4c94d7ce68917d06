//! Fetch-validate-upsert pipeline for Seoul Open API datasets.
//!
//! [`Collector::collect_and_save`] moves one page range of one source into its
//! table. [`BatchCollector::collect_all`] runs every bound source concurrently
//! and folds the outcomes into a [`seoulpet_core::BatchSummary`].
//! [`run_recorded_batch`] wraps a batch in a `collection_runs` row.

pub mod batch;
pub mod collector;
pub mod runs;
pub mod sources;

pub use batch::{run_batch, summarize, BatchCollector};
pub use collector::{Collector, RecordOutcome, SaveReport};
pub use runs::{run_recorded_batch, RecordedRun};
pub use sources::{Source, SourceBinding};
