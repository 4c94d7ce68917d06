//! Pet registration handlers: paged listing, CRUD, summary and regional stats.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use seoulpet_core::PetRegistration;
use seoulpet_db::{DbError, PetRegistrationPatch, PetRegistrationRow};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

const DEFAULT_PER_PAGE: i64 = 100;
const MAX_PER_PAGE: i64 = 1000;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    pub sido: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreatePetRegistrationRequest {
    pub sido: String,
    pub sigungu: Option<String>,
    pub dog_registration_total: i32,
    pub cat_registration_total: i32,
    pub total_registration: i32,
    pub data_year: Option<String>,
    pub data_month: Option<String>,
    pub update_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct UpdatePetRegistrationRequest {
    pub sido: Option<String>,
    pub sigungu: Option<String>,
    pub dog_registration_total: Option<i32>,
    pub cat_registration_total: Option<i32>,
    pub total_registration: Option<i32>,
    pub data_year: Option<String>,
    pub data_month: Option<String>,
    pub update_date: Option<String>,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct PetRegistrationItem {
    id: i64,
    sido: String,
    sigungu: Option<String>,
    full_address: String,
    dog_registration_total: i32,
    cat_registration_total: i32,
    total_registration: i32,
    dog_percentage: f64,
    cat_percentage: f64,
    data_year: Option<String>,
    data_month: Option<String>,
    update_date: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PetRegistrationRow> for PetRegistrationItem {
    fn from(row: PetRegistrationRow) -> Self {
        let full_address = row.full_address();
        let (dog_percentage, cat_percentage) = row.percentages();
        Self {
            id: row.id,
            sido: row.sido,
            sigungu: row.sigungu,
            full_address,
            dog_registration_total: row.dog_registration_total,
            cat_registration_total: row.cat_registration_total,
            total_registration: row.total_registration,
            dog_percentage,
            cat_percentage,
            data_year: row.data_year,
            data_month: row.data_month,
            update_date: row.update_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// One page of registrations. `total_count` counts every row, `match_count`
/// the rows matching the filter and `current_count` the rows on this page.
#[derive(Debug, Serialize)]
pub(super) struct PetRegistrationPage {
    items: Vec<PetRegistrationItem>,
    page: i64,
    per_page: i64,
    total_count: i64,
    match_count: i64,
    current_count: usize,
}

#[derive(Debug, Serialize)]
pub(super) struct PetRegistrationSummaryItem {
    total_regions: i64,
    total_dogs: i64,
    total_cats: i64,
    total_pets: i64,
    average_dog_percentage: f64,
    average_cat_percentage: f64,
    top_regions: Vec<PetRegistrationItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct SidoStatsItem {
    sido: String,
    region_count: i64,
    total_dogs: i64,
    total_cats: i64,
    total_pets: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct SigunguStatsItem {
    sido: String,
    sigungu: String,
    full_address: String,
    total_dogs: i64,
    total_cats: i64,
    total_pets: i64,
    dog_percentage: f64,
    cat_percentage: f64,
}

#[derive(Debug, Serialize)]
pub(super) struct TotalStatsItem {
    region_count: i64,
    total_dogs: i64,
    total_cats: i64,
    total_pets: i64,
    dog_percentage: f64,
    cat_percentage: f64,
}

#[derive(Debug, Serialize)]
pub(super) struct PetRegistrationStatsItem {
    sido_stats: Vec<SidoStatsItem>,
    sigungu_stats: Vec<SigunguStatsItem>,
    total_stats: TotalStatsItem,
}

/// Share of `total` taken by `part`, as a percentage rounded to two decimals.
#[allow(clippy::cast_precision_loss)]
fn share(part: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (part as f64 * 10_000.0 / total as f64).round() / 100.0
}

impl From<seoulpet_db::PetRegistrationStats> for PetRegistrationStatsItem {
    fn from(stats: seoulpet_db::PetRegistrationStats) -> Self {
        let sido_stats = stats
            .sido_stats
            .into_iter()
            .map(|row| SidoStatsItem {
                sido: row.sido,
                region_count: row.region_count,
                total_dogs: row.total_dogs,
                total_cats: row.total_cats,
                total_pets: row.total_pets,
            })
            .collect();
        let sigungu_stats = stats
            .sigungu_stats
            .into_iter()
            .map(|row| SigunguStatsItem {
                full_address: format!("{} {}", row.sido, row.sigungu),
                dog_percentage: share(row.total_dogs, row.total_pets),
                cat_percentage: share(row.total_cats, row.total_pets),
                sido: row.sido,
                sigungu: row.sigungu,
                total_dogs: row.total_dogs,
                total_cats: row.total_cats,
                total_pets: row.total_pets,
            })
            .collect();
        let totals = stats.total_stats;
        Self {
            sido_stats,
            sigungu_stats,
            total_stats: TotalStatsItem {
                region_count: totals.region_count,
                total_dogs: totals.total_dogs,
                total_cats: totals.total_cats,
                total_pets: totals.total_pets,
                dog_percentage: share(totals.total_dogs, totals.total_pets),
                cat_percentage: share(totals.total_cats, totals.total_pets),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn normalize_page(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    (
        page.unwrap_or(1).max(1),
        per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
    )
}

fn validate_count(req_id: &str, field: &str, value: Option<i32>) -> Result<(), ApiError> {
    match value {
        Some(v) if v < 0 => Err(ApiError::new(
            req_id,
            "validation_error",
            format!("{field} must be >= 0, got {v}"),
        )),
        _ => Ok(()),
    }
}

fn validate_patch(req_id: &str, body: &UpdatePetRegistrationRequest) -> Result<(), ApiError> {
    if body.sido.as_deref().is_some_and(|s| s.trim().is_empty()) {
        return Err(ApiError::new(req_id, "validation_error", "sido must not be empty"));
    }
    validate_count(req_id, "dog_registration_total", body.dog_registration_total)?;
    validate_count(req_id, "cat_registration_total", body.cat_registration_total)?;
    validate_count(req_id, "total_registration", body.total_registration)?;
    Ok(())
}

fn map_write_error(req_id: &str, e: &DbError) -> ApiError {
    if let DbError::Sqlx(sqlx::Error::Database(db_err)) = e {
        match db_err.code().as_deref() {
            Some("23505") => {
                return ApiError::new(
                    req_id,
                    "conflict",
                    "a registration for that sido/sigungu already exists",
                );
            }
            // check_violation or string_data_right_truncation
            Some("23514" | "22001") => {
                return ApiError::new(req_id, "validation_error", db_err.message().to_owned());
            }
            _ => {}
        }
    }
    map_db_error(req_id.to_owned(), e)
}

fn not_found(req_id: &str, id: i64) -> ApiError {
    ApiError::new(
        req_id,
        "not_found",
        format!("pet registration {id} not found"),
    )
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/pet-registrations
pub(super) async fn list_pet_registrations(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PetRegistrationPage>>, ApiError> {
    let (page, per_page) = normalize_page(query.page, query.per_page);
    let sido = query.sido.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let offset = (page - 1).saturating_mul(per_page);

    let rows = seoulpet_db::list_pet_registrations(&state.pool, sido, per_page, offset)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let total_count = seoulpet_db::count_pet_registrations(&state.pool, None)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let match_count = match sido {
        Some(_) => seoulpet_db::count_pet_registrations(&state.pool, sido)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?,
        None => total_count,
    };

    let items: Vec<PetRegistrationItem> = rows.into_iter().map(Into::into).collect();
    let data = PetRegistrationPage {
        current_count: items.len(),
        items,
        page,
        per_page,
        total_count,
        match_count,
    };
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

/// GET /api/v1/pet-registrations/{id}
pub(super) async fn get_pet_registration(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<PetRegistrationItem>>, ApiError> {
    let row = seoulpet_db::get_pet_registration(&state.pool, id)
        .await
        .map_err(|e| match e {
            DbError::NotFound => not_found(&req_id.0, id),
            other => map_db_error(req_id.0.clone(), &other),
        })?;
    Ok(Json(ApiResponse::new(row.into(), req_id.0)))
}

/// POST /api/v1/pet-registrations
pub(super) async fn create_pet_registration(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreatePetRegistrationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PetRegistrationItem>>), ApiError> {
    let rid = &req_id.0;

    let registration = PetRegistration {
        sido: body.sido.trim().to_owned(),
        sigungu: body.sigungu,
        dog_registration_total: body.dog_registration_total,
        cat_registration_total: body.cat_registration_total,
        total_registration: body.total_registration,
        data_year: body.data_year,
        data_month: body.data_month,
        update_date: body.update_date,
    };
    registration
        .validate()
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;

    let row = seoulpet_db::create_pet_registration(&state.pool, &registration)
        .await
        .map_err(|e| map_write_error(rid, &e))?;

    tracing::info!(id = row.id, sido = %row.sido, "pet registration created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(row.into(), req_id.0)),
    ))
}

/// PATCH /api/v1/pet-registrations/{id}
pub(super) async fn update_pet_registration(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePetRegistrationRequest>,
) -> Result<Json<ApiResponse<PetRegistrationItem>>, ApiError> {
    let rid = &req_id.0;
    validate_patch(rid, &body)?;

    let patch = PetRegistrationPatch {
        sido: body.sido.map(|s| s.trim().to_owned()),
        sigungu: body.sigungu,
        dog_registration_total: body.dog_registration_total,
        cat_registration_total: body.cat_registration_total,
        total_registration: body.total_registration,
        data_year: body.data_year,
        data_month: body.data_month,
        update_date: body.update_date,
    };
    if patch.is_empty() {
        return Err(ApiError::new(
            rid,
            "bad_request",
            "request body must set at least one field",
        ));
    }

    let row = seoulpet_db::update_pet_registration(&state.pool, id, &patch)
        .await
        .map_err(|e| match e {
            DbError::NotFound => not_found(rid, id),
            other => map_write_error(rid, &other),
        })?;
    Ok(Json(ApiResponse::new(row.into(), req_id.0)))
}

/// DELETE /api/v1/pet-registrations/{id}
pub(super) async fn delete_pet_registration(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    seoulpet_db::delete_pet_registration(&state.pool, id)
        .await
        .map_err(|e| match e {
            DbError::NotFound => not_found(&req_id.0, id),
            other => map_db_error(req_id.0.clone(), &other),
        })?;
    tracing::info!(id, "pet registration deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/pet-registrations/summary
pub(super) async fn pet_registration_summary(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<PetRegistrationSummaryItem>>, ApiError> {
    let summary = seoulpet_db::pet_registration_summary(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = PetRegistrationSummaryItem {
        total_regions: summary.total_regions,
        total_dogs: summary.total_dogs,
        total_cats: summary.total_cats,
        total_pets: summary.total_pets,
        average_dog_percentage: summary.average_dog_percentage,
        average_cat_percentage: summary.average_cat_percentage,
        top_regions: summary.top_regions.into_iter().map(Into::into).collect(),
    };
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

/// GET /api/v1/pet-registrations/stats
pub(super) async fn pet_registration_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<PetRegistrationStatsItem>>, ApiError> {
    let stats = seoulpet_db::pet_registration_stats(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(stats.into(), req_id.0)))
}
