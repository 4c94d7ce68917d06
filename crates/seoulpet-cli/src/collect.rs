//! Collection command handlers for the CLI.
//!
//! A real run is recorded in `collection_runs` with trigger `cli`, exactly as
//! server-triggered runs are. `--dry-run` only fetches and reports what
//! upstream returned, without opening a database connection.

use std::sync::Arc;

use clap::{Args, Subcommand};
use seoulpet_client::SeoulOpenApi;
use seoulpet_collector::{run_recorded_batch, BatchCollector, Collector, Source, SourceBinding};
use seoulpet_core::{AppConfig, BatchSummary};

/// Row window shared by every `collect` sub-command. Unset bounds fall back to
/// `SEOULPET_COLLECT_START` / `SEOULPET_COLLECT_END`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Args)]
pub struct RangeArgs {
    /// First row to fetch (1-based)
    #[arg(long)]
    pub start: Option<u32>,
    /// Last row to fetch (inclusive)
    #[arg(long)]
    pub end: Option<u32>,
}

impl RangeArgs {
    fn resolve(self, config: &AppConfig) -> anyhow::Result<(u32, u32)> {
        let start = self.start.unwrap_or(config.collect_start);
        let end = self.end.unwrap_or(config.collect_end);
        if start == 0 {
            anyhow::bail!("--start must be >= 1");
        }
        if end < start {
            anyhow::bail!("--end ({end}) must not be before --start ({start})");
        }
        Ok((start, end))
    }
}

/// Sub-commands available under `collect`.
#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum CollectCommands {
    /// Collect every source concurrently
    All {
        #[command(flatten)]
        range: RangeArgs,

        /// Print the batch summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Collect pet registration totals per region
    Registrations {
        #[command(flatten)]
        range: RangeArgs,

        /// Fetch only; do not write to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Collect licensed animal hospitals
    Clinics {
        #[command(flatten)]
        range: RangeArgs,

        /// Fetch only; do not write to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Collect realtime weather station observations
    Weather {
        #[command(flatten)]
        range: RangeArgs,

        /// Fetch only; do not write to the database
        #[arg(long)]
        dry_run: bool,
    },
}

impl CollectCommands {
    /// The single source this command targets, or `None` for `all`.
    fn source(&self) -> Option<Source> {
        match self {
            Self::All { .. } => None,
            Self::Registrations { .. } => Some(Source::PetRegistrations),
            Self::Clinics { .. } => Some(Source::PetClinics),
            Self::Weather { .. } => Some(Source::Weather),
        }
    }

    fn range(&self) -> RangeArgs {
        match self {
            Self::All { range, .. }
            | Self::Registrations { range, .. }
            | Self::Clinics { range, .. }
            | Self::Weather { range, .. } => *range,
        }
    }

    fn dry_run(&self) -> bool {
        match self {
            Self::All { .. } => false,
            Self::Registrations { dry_run, .. }
            | Self::Clinics { dry_run, .. }
            | Self::Weather { dry_run, .. } => *dry_run,
        }
    }

    fn bindings(&self) -> Vec<SourceBinding> {
        match self.source() {
            Some(source) => vec![SourceBinding::new(source)],
            None => SourceBinding::defaults(),
        }
    }
}

/// Runs a `collect` sub-command.
///
/// # Errors
///
/// Returns an error if the range is invalid, the client or pool cannot be
/// built, the run cannot be recorded, or every collection task failed.
/// Per-source `error` results are printed but do not fail the command on
/// their own.
pub(crate) async fn run_collect(config: &AppConfig, command: &CollectCommands) -> anyhow::Result<()> {
    let (start, end) = command.range().resolve(config)?;
    let api = Arc::new(SeoulOpenApi::from_app_config(config)?);

    if command.dry_run() {
        for binding in command.bindings() {
            run_dry(&api, &binding, start, end).await?;
        }
        return Ok(());
    }

    let pool = seoulpet_db::connect_pool(
        &config.database_url,
        seoulpet_db::PoolConfig::from_app_config(config),
    )
    .await?;
    let batch = BatchCollector::new(Collector::new(pool), api, command.bindings());

    let run = run_recorded_batch(&batch, "cli", start, end).await?;

    if matches!(command, CollectCommands::All { json: true, .. }) {
        println!("{}", serde_json::to_string_pretty(&run.summary)?);
    } else {
        print!("{}", render_summary(&run.summary));
    }
    println!("collection run {} recorded", run.run_id);

    if !run.succeeded {
        anyhow::bail!(
            "all {} collection task(s) failed; see run {}",
            run.summary.failed_tasks,
            run.run_id
        );
    }
    Ok(())
}

async fn run_dry(
    api: &SeoulOpenApi,
    binding: &SourceBinding,
    start: u32,
    end: u32,
) -> anyhow::Result<()> {
    let rows = api.fetch_rows(&binding.service, start, end).await?;
    println!(
        "dry-run: {} returned {} row(s) for {start}..={end}",
        binding.service,
        rows.len()
    );
    if let Some(first) = rows.first() {
        let fields: Vec<&str> = first.keys().map(String::as_str).collect();
        println!("  fields: {}", fields.join(", "));
    }
    Ok(())
}

/// One line per task followed by the batch totals.
fn render_summary(summary: &BatchSummary) -> String {
    let mut out = String::new();
    for detail in &summary.details {
        out.push_str(&format!(
            "[{}] {:<18} {:<8} collected={:<6} saved={:<6} {}\n",
            detail.task_index,
            detail.source,
            detail.status.to_string(),
            detail.collected_count,
            detail.saved_count,
            detail.message
        ));
    }
    out.push_str(&format!(
        "tasks: {} ok / {} failed, collected {}, saved {}\n",
        summary.successful_tasks, summary.failed_tasks, summary.total_collected, summary.total_saved
    ));
    out
}
