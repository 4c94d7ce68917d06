//! Database operations for the `pet_registrations` table.

use chrono::{DateTime, Utc};
use seoulpet_core::records::{full_address, registration_percentages};
use seoulpet_core::PetRegistration;
use sqlx::PgPool;

use crate::upsert::{Destination, PgQuery};
use crate::DbError;

const SELECT_COLUMNS: &str = "id, sido, sigungu, dog_registration_total, cat_registration_total, \
     total_registration, data_year, data_month, update_date, created_at, updated_at";

const TOP_REGION_LIMIT: i64 = 5;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `pet_registrations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PetRegistrationRow {
    pub id: i64,
    pub sido: String,
    pub sigungu: Option<String>,
    pub dog_registration_total: i32,
    pub cat_registration_total: i32,
    pub total_registration: i32,
    pub data_year: Option<String>,
    pub data_month: Option<String>,
    pub update_date: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PetRegistrationRow {
    #[must_use]
    pub fn full_address(&self) -> String {
        full_address(&self.sido, self.sigungu.as_deref())
    }

    /// `(dog_percentage, cat_percentage)` of `total_registration`.
    #[must_use]
    pub fn percentages(&self) -> (f64, f64) {
        registration_percentages(
            self.dog_registration_total,
            self.cat_registration_total,
            self.total_registration,
        )
    }
}

/// Sparse update: `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct PetRegistrationPatch {
    pub sido: Option<String>,
    pub sigungu: Option<String>,
    pub dog_registration_total: Option<i32>,
    pub cat_registration_total: Option<i32>,
    pub total_registration: Option<i32>,
    pub data_year: Option<String>,
    pub data_month: Option<String>,
    pub update_date: Option<String>,
}

impl PetRegistrationPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sido.is_none()
            && self.sigungu.is_none()
            && self.dog_registration_total.is_none()
            && self.cat_registration_total.is_none()
            && self.total_registration.is_none()
            && self.data_year.is_none()
            && self.data_month.is_none()
            && self.update_date.is_none()
    }
}

/// Nationwide aggregate over every stored region.
#[derive(Debug, Clone)]
pub struct PetRegistrationSummaryRow {
    pub total_regions: i64,
    pub total_dogs: i64,
    pub total_cats: i64,
    pub total_pets: i64,
    pub average_dog_percentage: f64,
    pub average_cat_percentage: f64,
    /// Largest regions by `total_registration`, at most five.
    pub top_regions: Vec<PetRegistrationRow>,
}

#[derive(sqlx::FromRow)]
struct TotalsRow {
    total_regions: i64,
    total_dogs: i64,
    total_cats: i64,
    total_pets: i64,
    average_dog_percentage: f64,
    average_cat_percentage: f64,
}

/// Totals for one `sido` across its districts.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SidoStatsRow {
    pub sido: String,
    pub region_count: i64,
    pub total_dogs: i64,
    pub total_cats: i64,
    pub total_pets: i64,
}

/// Totals for one district.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SigunguStatsRow {
    pub sido: String,
    pub sigungu: String,
    pub total_dogs: i64,
    pub total_cats: i64,
    pub total_pets: i64,
}

/// Totals across every stored row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TotalStatsRow {
    pub region_count: i64,
    pub total_dogs: i64,
    pub total_cats: i64,
    pub total_pets: i64,
}

/// Registration totals broken down per `sido`, per district and overall.
#[derive(Debug, Clone)]
pub struct PetRegistrationStats {
    pub sido_stats: Vec<SidoStatsRow>,
    /// Rows without a `sigungu` are city-level and only count toward
    /// `sido_stats` and `total_stats`.
    pub sigungu_stats: Vec<SigunguStatsRow>,
    pub total_stats: TotalStatsRow,
}

// ---------------------------------------------------------------------------
// Upsert target
// ---------------------------------------------------------------------------

impl Destination for PetRegistration {
    const TABLE: &'static str = "pet_registrations";
    const COLUMNS: &'static [&'static str] = &[
        "sido",
        "sigungu",
        "dog_registration_total",
        "cat_registration_total",
        "total_registration",
        "data_year",
        "data_month",
        "update_date",
    ];
    const CONFLICT_KEY: &'static [&'static str] = &["sido", "sigungu"];

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.sido)
            .bind(&self.sigungu)
            .bind(self.dog_registration_total)
            .bind(self.cat_registration_total)
            .bind(self.total_registration)
            .bind(&self.data_year)
            .bind(&self.data_month)
            .bind(&self.update_date)
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns one page of registrations, optionally restricted to one `sido`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_pet_registrations(
    pool: &PgPool,
    sido: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<PetRegistrationRow>, DbError> {
    let rows = sqlx::query_as::<_, PetRegistrationRow>(&format!(
        "SELECT {SELECT_COLUMNS} \
         FROM pet_registrations \
         WHERE ($1::text IS NULL OR sido = $1) \
         ORDER BY sido, sigungu NULLS FIRST, id \
         LIMIT $2 OFFSET $3"
    ))
    .bind(sido)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Counts registrations, optionally restricted to one `sido`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_pet_registrations(pool: &PgPool, sido: Option<&str>) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM pet_registrations WHERE ($1::text IS NULL OR sido = $1)",
    )
    .bind(sido)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_pet_registration(pool: &PgPool, id: i64) -> Result<PetRegistrationRow, DbError> {
    sqlx::query_as::<_, PetRegistrationRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM pet_registrations WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Inserts a new region. A duplicate `(sido, sigungu)` surfaces as a unique
/// violation from Postgres.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_pet_registration(
    pool: &PgPool,
    registration: &PetRegistration,
) -> Result<PetRegistrationRow, DbError> {
    let row = sqlx::query_as::<_, PetRegistrationRow>(&format!(
        "INSERT INTO pet_registrations \
             (sido, sigungu, dog_registration_total, cat_registration_total, \
              total_registration, data_year, data_month, update_date) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(&registration.sido)
    .bind(&registration.sigungu)
    .bind(registration.dog_registration_total)
    .bind(registration.cat_registration_total)
    .bind(registration.total_registration)
    .bind(&registration.data_year)
    .bind(&registration.data_month)
    .bind(&registration.update_date)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Applies the set fields of `patch` and bumps `updated_at`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_pet_registration(
    pool: &PgPool,
    id: i64,
    patch: &PetRegistrationPatch,
) -> Result<PetRegistrationRow, DbError> {
    sqlx::query_as::<_, PetRegistrationRow>(&format!(
        "UPDATE pet_registrations SET \
             sido                   = COALESCE($2, sido), \
             sigungu                = COALESCE($3, sigungu), \
             dog_registration_total = COALESCE($4, dog_registration_total), \
             cat_registration_total = COALESCE($5, cat_registration_total), \
             total_registration     = COALESCE($6, total_registration), \
             data_year              = COALESCE($7, data_year), \
             data_month             = COALESCE($8, data_month), \
             update_date            = COALESCE($9, update_date), \
             updated_at             = NOW() \
         WHERE id = $1 \
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(id)
    .bind(&patch.sido)
    .bind(&patch.sigungu)
    .bind(patch.dog_registration_total)
    .bind(patch.cat_registration_total)
    .bind(patch.total_registration)
    .bind(&patch.data_year)
    .bind(&patch.data_month)
    .bind(&patch.update_date)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has the given `id`, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_pet_registration(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM pet_registrations WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Aggregates all regions. Average percentages are the mean of per-region
/// percentages, rounded to two decimals; regions with a zero total count as 0%.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn pet_registration_summary(
    pool: &PgPool,
) -> Result<PetRegistrationSummaryRow, DbError> {
    let totals = sqlx::query_as::<_, TotalsRow>(
        "SELECT COUNT(*) AS total_regions, \
                COALESCE(SUM(dog_registration_total), 0)::bigint AS total_dogs, \
                COALESCE(SUM(cat_registration_total), 0)::bigint AS total_cats, \
                COALESCE(SUM(total_registration), 0)::bigint AS total_pets, \
                COALESCE(AVG(CASE WHEN total_registration > 0 \
                    THEN dog_registration_total * 100.0 / total_registration \
                    ELSE 0 END), 0)::float8 AS average_dog_percentage, \
                COALESCE(AVG(CASE WHEN total_registration > 0 \
                    THEN cat_registration_total * 100.0 / total_registration \
                    ELSE 0 END), 0)::float8 AS average_cat_percentage \
         FROM pet_registrations",
    )
    .fetch_one(pool)
    .await?;

    let top_regions = sqlx::query_as::<_, PetRegistrationRow>(&format!(
        "SELECT {SELECT_COLUMNS} \
         FROM pet_registrations \
         ORDER BY total_registration DESC, id \
         LIMIT $1"
    ))
    .bind(TOP_REGION_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(PetRegistrationSummaryRow {
        total_regions: totals.total_regions,
        total_dogs: totals.total_dogs,
        total_cats: totals.total_cats,
        total_pets: totals.total_pets,
        average_dog_percentage: round2(totals.average_dog_percentage),
        average_cat_percentage: round2(totals.average_cat_percentage),
        top_regions,
    })
}

/// Per-`sido`, per-district and overall totals, each list largest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any of the queries fails.
pub async fn pet_registration_stats(pool: &PgPool) -> Result<PetRegistrationStats, DbError> {
    let sido_stats = sqlx::query_as::<_, SidoStatsRow>(
        "SELECT sido, \
                COUNT(*) AS region_count, \
                SUM(dog_registration_total)::bigint AS total_dogs, \
                SUM(cat_registration_total)::bigint AS total_cats, \
                SUM(total_registration)::bigint AS total_pets \
         FROM pet_registrations \
         GROUP BY sido \
         ORDER BY total_pets DESC, sido",
    )
    .fetch_all(pool)
    .await?;

    let sigungu_stats = sqlx::query_as::<_, SigunguStatsRow>(
        "SELECT sido, sigungu, \
                SUM(dog_registration_total)::bigint AS total_dogs, \
                SUM(cat_registration_total)::bigint AS total_cats, \
                SUM(total_registration)::bigint AS total_pets \
         FROM pet_registrations \
         WHERE sigungu IS NOT NULL \
         GROUP BY sido, sigungu \
         ORDER BY total_pets DESC, sido, sigungu",
    )
    .fetch_all(pool)
    .await?;

    let total_stats = sqlx::query_as::<_, TotalStatsRow>(
        "SELECT COUNT(*) AS region_count, \
                COALESCE(SUM(dog_registration_total), 0)::bigint AS total_dogs, \
                COALESCE(SUM(cat_registration_total), 0)::bigint AS total_cats, \
                COALESCE(SUM(total_registration), 0)::bigint AS total_pets \
         FROM pet_registrations",
    )
    .fetch_one(pool)
    .await?;

    Ok(PetRegistrationStats {
        sido_stats,
        sigungu_stats,
        total_stats,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn row(sigungu: Option<&str>, dogs: i32, cats: i32, total: i32) -> PetRegistrationRow {
        PetRegistrationRow {
            id: 1,
            sido: "서울특별시".to_string(),
            sigungu: sigungu.map(str::to_string),
            dog_registration_total: dogs,
            cat_registration_total: cats,
            total_registration: total,
            data_year: None,
            data_month: None,
            update_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn row_derives_address_and_percentages() {
        let r = row(Some("강남구"), 100, 50, 150);
        assert_eq!(r.full_address(), "서울특별시 강남구");
        assert_eq!(r.percentages(), (66.67, 33.33));
    }

    #[test]
    fn province_row_without_total_has_zero_percentages() {
        let r = row(None, 0, 0, 0);
        assert_eq!(r.full_address(), "서울특별시");
        assert_eq!(r.percentages(), (0.0, 0.0));
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(PetRegistrationPatch::default().is_empty());
        let patch = PetRegistrationPatch {
            total_registration: Some(3),
            ..PetRegistrationPatch::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn round2_keeps_two_decimals() {
        assert!((round2(66.666_666) - 66.67).abs() < f64::EPSILON);
        assert!((round2(0.0)).abs() < f64::EPSILON);
    }
}
