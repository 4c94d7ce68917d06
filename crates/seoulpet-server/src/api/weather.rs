use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use seoulpet_db::WeatherObservationRow;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct WeatherQuery {
    pub station_name: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct WeatherItem {
    station_name: String,
    observed_at: String,
    temperature: Option<f64>,
    humidity: Option<f64>,
    precipitation: Option<f64>,
    wind_speed: Option<f64>,
    updated_at: DateTime<Utc>,
}

impl From<WeatherObservationRow> for WeatherItem {
    fn from(row: WeatherObservationRow) -> Self {
        Self {
            station_name: row.station_name,
            observed_at: row.observed_at,
            temperature: row.temperature,
            humidity: row.humidity,
            precipitation: row.precipitation,
            wind_speed: row.wind_speed,
            updated_at: row.updated_at,
        }
    }
}

pub(super) async fn list_weather(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<ApiResponse<Vec<WeatherItem>>>, ApiError> {
    let station = query
        .station_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let rows =
        seoulpet_db::list_weather_observations(&state.pool, station, normalize_limit(query.limit))
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

/// Newest observation per station.
pub(super) async fn latest_weather(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<WeatherItem>>>, ApiError> {
    let rows = seoulpet_db::latest_weather_by_station(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{get, json_body, open_app, send};
    use axum::http::StatusCode;
    use seoulpet_core::WeatherObservation;

    async fn seed(pool: &sqlx::PgPool, station: &str, observed_at: &str, temperature: f64) {
        let row = WeatherObservation {
            station_name: station.to_string(),
            observed_at: observed_at.to_string(),
            temperature: Some(temperature),
            humidity: Some(55.0),
            precipitation: Some(0.0),
            wind_speed: Some(1.2),
        };
        let mut conn = pool.acquire().await.expect("connection");
        seoulpet_db::upsert_record(&mut *conn, &row, &["station_name", "observed_at"])
            .await
            .expect("seed observation");
    }

    #[test]
    fn weather_item_is_serializable() {
        let item = WeatherItem {
            station_name: "종로구".to_string(),
            observed_at: "2024-05-01 13:00".to_string(),
            temperature: Some(21.5),
            humidity: None,
            precipitation: None,
            wind_speed: None,
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["temperature"], 21.5);
        assert!(json["humidity"].is_null());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn latest_returns_one_row_per_station(pool: sqlx::PgPool) {
        seed(&pool, "종로구", "2024-05-01 12:00", 19.0).await;
        seed(&pool, "종로구", "2024-05-01 13:00", 21.5).await;
        seed(&pool, "강남구", "2024-05-01 13:00", 22.0).await;

        let response = send(open_app(pool.clone()), get("/api/v1/weather/latest")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        let rows = json["data"].as_array().expect("data array");
        assert_eq!(rows.len(), 2);
        let jongno = rows
            .iter()
            .find(|r| r["station_name"] == "종로구")
            .expect("jongno row");
        assert_eq!(jongno["observed_at"], "2024-05-01 13:00");

        let all = json_body(send(open_app(pool), get("/api/v1/weather?limit=10")).await).await;
        assert_eq!(all["data"].as_array().map(Vec::len), Some(3));
    }
}
