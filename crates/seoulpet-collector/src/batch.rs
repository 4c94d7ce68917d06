//! Concurrent collection over every bound source.

use std::sync::Arc;

use seoulpet_client::SeoulOpenApi;
use seoulpet_core::{BatchSummary, CollectionResult};
use tokio::task::{JoinError, JoinHandle};

use crate::collector::Collector;
use crate::sources::SourceBinding;

pub struct BatchCollector {
    collector: Collector,
    api: Arc<SeoulOpenApi>,
    bindings: Vec<SourceBinding>,
}

impl BatchCollector {
    #[must_use]
    pub fn new(collector: Collector, api: Arc<SeoulOpenApi>, bindings: Vec<SourceBinding>) -> Self {
        Self {
            collector,
            api,
            bindings,
        }
    }

    /// A batch over [`SourceBinding::defaults`].
    #[must_use]
    pub fn with_default_bindings(collector: Collector, api: Arc<SeoulOpenApi>) -> Self {
        Self::new(collector, api, SourceBinding::defaults())
    }

    #[must_use]
    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    #[must_use]
    pub fn bindings(&self) -> &[SourceBinding] {
        &self.bindings
    }

    /// Collects `start..=end` from every binding at once.
    ///
    /// Each binding runs as its own Tokio task; tasks are awaited in binding
    /// order, so `details[i]` always describes `bindings[i]`.
    pub async fn collect_all(&self, start: u32, end: u32) -> BatchSummary {
        tracing::info!(tasks = self.bindings.len(), start, end, "starting batch collection");

        let tasks = self
            .bindings
            .iter()
            .map(|binding| {
                let name = binding.source.name().to_string();
                let binding = binding.clone();
                let collector = self.collector.clone();
                let api = Arc::clone(&self.api);
                let handle = tokio::spawn(async move {
                    binding.collect(&collector, &api, start, end).await
                });
                (name, handle)
            })
            .collect();

        let summary = run_batch(tasks).await;
        tracing::info!(
            successful = summary.successful_tasks,
            failed = summary.failed_tasks,
            collected = summary.total_collected,
            saved = summary.total_saved,
            "batch collection finished"
        );
        summary
    }
}

/// Awaits `tasks` in the given order and summarizes them.
pub async fn run_batch(tasks: Vec<(String, JoinHandle<CollectionResult>)>) -> BatchSummary {
    let mut outcomes = Vec::with_capacity(tasks.len());
    for (source, handle) in tasks {
        outcomes.push((source, handle.await));
    }
    summarize(outcomes)
}

/// Folds task outcomes, in submission order, into a [`BatchSummary`]. A
/// [`JoinError`] counts as a failed task carrying the join error's message.
pub fn summarize(outcomes: Vec<(String, Result<CollectionResult, JoinError>)>) -> BatchSummary {
    BatchSummary::from_outcomes(outcomes.into_iter().map(|(source, outcome)| {
        let outcome = outcome.map_err(|e| {
            tracing::error!(source = %source, error = %e, "collection task died");
            e.to_string()
        });
        (source, outcome)
    }))
}
