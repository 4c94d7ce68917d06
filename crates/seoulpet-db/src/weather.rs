//! Database operations for the `weather_observations` table.

use chrono::{DateTime, Utc};
use seoulpet_core::WeatherObservation;
use sqlx::PgPool;

use crate::upsert::{Destination, PgQuery};
use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WeatherObservationRow {
    pub id: i64,
    pub station_name: String,
    pub observed_at: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub precipitation: Option<f64>,
    pub wind_speed: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Destination for WeatherObservation {
    const TABLE: &'static str = "weather_observations";
    const COLUMNS: &'static [&'static str] = &[
        "station_name",
        "observed_at",
        "temperature",
        "humidity",
        "precipitation",
        "wind_speed",
    ];
    const CONFLICT_KEY: &'static [&'static str] = &["station_name", "observed_at"];

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.station_name)
            .bind(&self.observed_at)
            .bind(self.temperature)
            .bind(self.humidity)
            .bind(self.precipitation)
            .bind(self.wind_speed)
    }
}

/// Most recent observations first, optionally for one station.
///
/// `observed_at` is the upstream `YYYYMMDDHHMM` string, so lexical order is
/// chronological.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_weather_observations(
    pool: &PgPool,
    station_name: Option<&str>,
    limit: i64,
) -> Result<Vec<WeatherObservationRow>, DbError> {
    let rows = sqlx::query_as::<_, WeatherObservationRow>(
        "SELECT id, station_name, observed_at, temperature, humidity, precipitation, \
                wind_speed, created_at, updated_at \
         FROM weather_observations \
         WHERE ($1::text IS NULL OR station_name = $1) \
         ORDER BY observed_at DESC, station_name \
         LIMIT $2",
    )
    .bind(station_name)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// The newest observation of every station, ordered by station name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_weather_by_station(
    pool: &PgPool,
) -> Result<Vec<WeatherObservationRow>, DbError> {
    let rows = sqlx::query_as::<_, WeatherObservationRow>(
        "SELECT DISTINCT ON (station_name) \
                id, station_name, observed_at, temperature, humidity, precipitation, \
                wind_speed, created_at, updated_at \
         FROM weather_observations \
         ORDER BY station_name, observed_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
