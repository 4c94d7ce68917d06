use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use seoulpet_collector::run_recorded_batch;
use seoulpet_core::BatchSummary;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, CollectRange};

#[derive(Debug, Deserialize)]
pub(super) struct CollectionRunsQuery {
    pub limit: Option<i64>,
}

/// Body of `POST /collection-runs`; missing bounds fall back to the
/// configured collection range.
#[derive(Debug, Default, Deserialize)]
pub(super) struct TriggerCollectionRequest {
    pub start: Option<u32>,
    pub end: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(super) struct CollectionRunItem {
    collection_run_id: Uuid,
    trigger_source: String,
    status: String,
    range_start: i32,
    range_end: i32,
    total_collected: i32,
    total_saved: i32,
    summary: Option<serde_json::Value>,
    error_message: Option<String>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct TriggeredRunItem {
    run_id: i64,
    status: &'static str,
    summary: BatchSummary,
}

fn resolve_range(
    req_id: &str,
    body: &TriggerCollectionRequest,
    defaults: CollectRange,
) -> Result<CollectRange, ApiError> {
    let start = body.start.unwrap_or(defaults.start);
    let end = body.end.unwrap_or(defaults.end);
    if start == 0 {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "start must be >= 1",
        ));
    }
    if end < start {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("end ({end}) must not be before start ({start})"),
        ));
    }
    Ok(CollectRange { start, end })
}

pub(super) async fn list_collection_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CollectionRunsQuery>,
) -> Result<Json<ApiResponse<Vec<CollectionRunItem>>>, ApiError> {
    let rows = seoulpet_db::list_collection_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| CollectionRunItem {
            collection_run_id: row.public_id,
            trigger_source: row.trigger_source,
            status: row.status,
            range_start: row.range_start,
            range_end: row.range_end,
            total_collected: row.total_collected,
            total_saved: row.total_saved,
            summary: row.summary,
            error_message: row.error_message,
            started_at: row.started_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse::new(data, req_id.0)))
}

/// POST /api/v1/collection-runs: collects every source now and answers with
/// the batch summary once all tasks have finished.
pub(super) async fn trigger_collection_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<TriggerCollectionRequest>,
) -> Result<Json<ApiResponse<TriggeredRunItem>>, ApiError> {
    let range = resolve_range(&req_id.0, &body, state.range)?;
    tracing::info!(start = range.start, end = range.end, "api: collection run requested");

    let run = run_recorded_batch(&state.batch, "api", range.start, range.end)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = TriggeredRunItem {
        run_id: run.run_id,
        status: if run.succeeded { "succeeded" } else { "failed" },
        summary: run.summary,
    };
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{
        app_with, batch_for, dev_auth, get, json_body, lazy_pool, open_app, send, with_json,
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DEFAULTS: CollectRange = CollectRange { start: 1, end: 1000 };

    #[test]
    fn resolve_range_falls_back_to_defaults() {
        let range = resolve_range("req", &TriggerCollectionRequest::default(), DEFAULTS)
            .expect("defaults are valid");
        assert_eq!(range, DEFAULTS);

        let body = TriggerCollectionRequest {
            start: Some(5),
            end: None,
        };
        let range = resolve_range("req", &body, DEFAULTS).expect("partial override");
        assert_eq!(range, CollectRange { start: 5, end: 1000 });
    }

    #[test]
    fn resolve_range_rejects_zero_start_and_inverted_bounds() {
        let zero = TriggerCollectionRequest {
            start: Some(0),
            end: Some(5),
        };
        assert_eq!(
            resolve_range("req", &zero, DEFAULTS)
                .expect_err("zero start")
                .error
                .code,
            "validation_error"
        );

        let inverted = TriggerCollectionRequest {
            start: Some(10),
            end: Some(2),
        };
        let err = resolve_range("req", &inverted, DEFAULTS).expect_err("inverted");
        assert!(err.error.message.contains("end (2)"));
    }

    #[tokio::test]
    async fn trigger_with_inverted_range_is_bad_request() {
        let response = send(
            open_app(lazy_pool()),
            with_json("POST", "/api/v1/collection-runs", &json!({ "start": 10, "end": 1 })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[test]
    fn collection_run_item_is_serializable() {
        let item = CollectionRunItem {
            collection_run_id: Uuid::new_v4(),
            trigger_source: "api".to_string(),
            status: "succeeded".to_string(),
            range_start: 1,
            range_end: 1000,
            total_collected: 12,
            total_saved: 11,
            summary: Some(json!({ "total_tasks": 3 })),
            error_message: None,
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&item).expect("serialize collection run");
        assert!(json.contains("\"trigger_source\":\"api\""));
        assert!(json.contains("\"total_saved\":11"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn trigger_records_a_run_and_lists_it(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "RESULT": { "CODE": "INFO-200", "MESSAGE": "해당하는 데이터가 없습니다." }
            })))
            .mount(&server)
            .await;

        let app = app_with(pool.clone(), batch_for(pool.clone(), &server.uri()), dev_auth());

        let response = send(
            app,
            with_json("POST", "/api/v1/collection-runs", &json!({ "end": 10 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["data"]["status"], "succeeded");
        assert_eq!(json["data"]["summary"]["total_tasks"], 3);
        assert_eq!(json["data"]["summary"]["total_saved"], 0);

        let listed = json_body(send(open_app(pool), get("/api/v1/collection-runs")).await).await;
        let runs = listed["data"].as_array().expect("runs");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0]["trigger_source"], "api");
        assert_eq!(runs[0]["range_end"], 10);
        assert_eq!(runs[0]["status"], "succeeded");
    }
}
