//! Generic `INSERT ... ON CONFLICT DO UPDATE` for collected rows.
//!
//! A [`Destination`] names its table, its insertable columns in bind order and
//! the default conflict key. The statement overwrites every non-key column
//! with the incoming value and bumps `updated_at`, so replaying the same rows
//! leaves the table unchanged apart from timestamps.

use std::collections::HashSet;

use seoulpet_core::FromRecord;
use sqlx::postgres::{PgArguments, PgConnection};
use sqlx::query::Query;
use sqlx::Postgres;

use crate::DbError;

pub type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// A table that collected rows are upserted into.
pub trait Destination: FromRecord + Send + Sync + 'static {
    const TABLE: &'static str;
    /// Insertable columns, in the order [`Destination::bind_columns`] binds them.
    const COLUMNS: &'static [&'static str];
    /// Columns of the table's unique constraint.
    const CONFLICT_KEY: &'static [&'static str];

    /// Binds one value per entry of [`Destination::COLUMNS`].
    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q>;
}

/// Checks that `target` is a non-empty set of known, distinct columns.
///
/// # Errors
///
/// Returns [`DbError::InvalidConflictTarget`] describing the first problem.
pub fn validate_conflict_target<T: Destination>(target: &[&str]) -> Result<(), DbError> {
    let invalid = |reason: String| DbError::InvalidConflictTarget {
        table: T::TABLE,
        reason,
    };

    if target.is_empty() {
        return Err(invalid("at least one column is required".to_string()));
    }

    let mut seen = HashSet::new();
    for column in target {
        if !T::COLUMNS.contains(column) {
            return Err(invalid(format!("unknown column '{column}'")));
        }
        if !seen.insert(*column) {
            return Err(invalid(format!("column '{column}' listed twice")));
        }
    }
    Ok(())
}

/// Renders the upsert statement for `table`.
///
/// Columns are trusted identifiers; callers validate `conflict` first.
#[must_use]
pub fn upsert_sql(table: &str, columns: &[&str], conflict: &[&str]) -> String {
    let placeholders = (1..=columns.len())
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut assignments: Vec<String> = columns
        .iter()
        .filter(|column| !conflict.contains(*column))
        .map(|column| format!("{column} = EXCLUDED.{column}"))
        .collect();
    assignments.push("updated_at = NOW()".to_string());

    format!(
        "INSERT INTO {table} ({columns}) VALUES ({placeholders}) \
         ON CONFLICT ({conflict}) DO UPDATE SET {assignments}",
        columns = columns.join(", "),
        conflict = conflict.join(", "),
        assignments = assignments.join(", "),
    )
}

/// Upserts one row on the given connection, keyed by `conflict`.
///
/// # Errors
///
/// Returns [`DbError::InvalidConflictTarget`] for a bad key, or
/// [`DbError::Sqlx`] if the statement fails.
pub async fn upsert_record<T: Destination>(
    conn: &mut PgConnection,
    row: &T,
    conflict: &[&str],
) -> Result<(), DbError> {
    validate_conflict_target::<T>(conflict)?;
    let sql = upsert_sql(T::TABLE, T::COLUMNS, conflict);
    row.bind_columns(sqlx::query(&sql)).execute(conn).await?;
    Ok(())
}
