//! Database operations for the `pet_clinics` table.

use chrono::{DateTime, Utc};
use seoulpet_core::PetClinic;
use sqlx::PgPool;

use crate::upsert::{Destination, PgQuery};
use crate::DbError;

/// A row from the `pet_clinics` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PetClinicRow {
    pub id: i64,
    pub mgt_no: String,
    pub name: String,
    pub business_status: Option<String>,
    pub phone: Option<String>,
    pub road_address: Option<String>,
    pub lot_address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub license_date: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Destination for PetClinic {
    const TABLE: &'static str = "pet_clinics";
    const COLUMNS: &'static [&'static str] = &[
        "mgt_no",
        "name",
        "business_status",
        "phone",
        "road_address",
        "lot_address",
        "latitude",
        "longitude",
        "license_date",
    ];
    const CONFLICT_KEY: &'static [&'static str] = &["mgt_no"];

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.mgt_no)
            .bind(&self.name)
            .bind(&self.business_status)
            .bind(&self.phone)
            .bind(&self.road_address)
            .bind(&self.lot_address)
            .bind(self.latitude)
            .bind(self.longitude)
            .bind(&self.license_date)
    }
}

/// Returns clinics ordered by name, optionally filtered by business status
/// (e.g. `"영업/정상"`).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_pet_clinics(
    pool: &PgPool,
    business_status: Option<&str>,
    limit: i64,
) -> Result<Vec<PetClinicRow>, DbError> {
    let rows = sqlx::query_as::<_, PetClinicRow>(
        "SELECT id, mgt_no, name, business_status, phone, road_address, lot_address, \
                latitude, longitude, license_date, created_at, updated_at \
         FROM pet_clinics \
         WHERE ($1::text IS NULL OR business_status = $1) \
         ORDER BY name, id \
         LIMIT $2",
    )
    .bind(business_status)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no clinic has the given management
/// number, or [`DbError::Sqlx`] if the query fails.
pub async fn get_pet_clinic(pool: &PgPool, mgt_no: &str) -> Result<PetClinicRow, DbError> {
    sqlx::query_as::<_, PetClinicRow>(
        "SELECT id, mgt_no, name, business_status, phone, road_address, lot_address, \
                latitude, longitude, license_date, created_at, updated_at \
         FROM pet_clinics \
         WHERE mgt_no = $1",
    )
    .bind(mgt_no)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
