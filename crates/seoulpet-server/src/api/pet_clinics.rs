use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use seoulpet_db::{DbError, PetClinicRow};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct PetClinicsQuery {
    pub business_status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct PetClinicItem {
    mgt_no: String,
    name: String,
    business_status: Option<String>,
    phone: Option<String>,
    road_address: Option<String>,
    lot_address: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    license_date: Option<String>,
    updated_at: DateTime<Utc>,
}

impl From<PetClinicRow> for PetClinicItem {
    fn from(row: PetClinicRow) -> Self {
        Self {
            mgt_no: row.mgt_no,
            name: row.name,
            business_status: row.business_status,
            phone: row.phone,
            road_address: row.road_address,
            lot_address: row.lot_address,
            latitude: row.latitude,
            longitude: row.longitude,
            license_date: row.license_date,
            updated_at: row.updated_at,
        }
    }
}

pub(super) async fn list_pet_clinics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PetClinicsQuery>,
) -> Result<Json<ApiResponse<Vec<PetClinicItem>>>, ApiError> {
    let status = query
        .business_status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let rows = seoulpet_db::list_pet_clinics(&state.pool, status, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

pub(super) async fn get_pet_clinic(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(mgt_no): Path<String>,
) -> Result<Json<ApiResponse<PetClinicItem>>, ApiError> {
    let row = seoulpet_db::get_pet_clinic(&state.pool, &mgt_no)
        .await
        .map_err(|e| match e {
            DbError::NotFound => ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("pet clinic '{mgt_no}' not found"),
            ),
            other => map_db_error(req_id.0.clone(), &other),
        })?;
    Ok(Json(ApiResponse::new(row.into(), req_id.0)))
}
