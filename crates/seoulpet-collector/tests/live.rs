//! Database-backed collector tests using `#[sqlx::test]`.
//!
//! `DATABASE_URL` must point at a Postgres 15+ server.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use seoulpet_client::{ApiClient, ClientConfig, ClientError, SeoulOpenApi};
use seoulpet_collector::{run_recorded_batch, BatchCollector, Collector, Source, SourceBinding};
use seoulpet_core::{CollectionStatus, PetRegistration, Record};

fn record(value: serde_json::Value) -> Record {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn registration(sido: &str, sigungu: &str, dogs: i64, cats: i64) -> Record {
    record(json!({
        "sido": sido,
        "sigungu": sigungu,
        "dog_registration_total": dogs,
        "cat_registration_total": cats,
        "total_registration": dogs + cats
    }))
}

async fn count_registrations(pool: &sqlx::PgPool) -> i64 {
    seoulpet_db::count_pet_registrations(pool, None)
        .await
        .expect("count")
}

#[sqlx::test(migrations = "../../migrations")]
async fn saves_valid_records_and_skips_the_rest(pool: sqlx::PgPool) {
    let collector = Collector::new(pool.clone());
    let records = vec![
        registration("서울특별시", "강남구", 100, 50),
        record(json!({ "sigungu": "no sido" })),
        // Longer than VARCHAR(50): rejected by Postgres inside its savepoint.
        registration(&"가".repeat(60), "종로구", 1, 1),
        registration("서울특별시", "서초구", 10, 10),
    ];

    let result = collector
        .collect_and_save::<PetRegistration, _, _>(
            move |_, _| async move { Ok::<_, ClientError>(records) },
            1,
            4,
            &["sido", "sigungu"],
        )
        .await;

    assert_eq!(result.status, CollectionStatus::Success);
    assert_eq!(result.collected_count, 4);
    assert_eq!(result.saved_count, 2);
    let skipped: Vec<usize> = result.skipped.iter().map(|s| s.index).collect();
    assert_eq!(skipped, vec![1, 2]);
    assert_eq!(count_registrations(&pool).await, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn rerunning_the_same_range_is_idempotent(pool: sqlx::PgPool) {
    let collector = Collector::new(pool.clone());
    for _ in 0..2 {
        let result = collector
            .collect_and_save::<PetRegistration, _, _>(
                |_, _| async {
                    Ok::<_, ClientError>(vec![registration("Seoul", "Gangnam", 100, 50)])
                },
                1,
                1,
                &["sido", "sigungu"],
            )
            .await;
        assert_eq!(result.saved_count, 1);
    }

    assert_eq!(count_registrations(&pool).await, 1);
    let rows = seoulpet_db::list_pet_registrations(&pool, Some("Seoul"), 10, 0)
        .await
        .expect("list");
    assert_eq!(rows[0].total_registration, 150);
    assert_eq!(rows[0].percentages().0, 66.67);
}

#[sqlx::test(migrations = "../../migrations")]
async fn recorded_batch_persists_rows_and_run(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/test-key/json/tbPetRegistrationStatus/1/5/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tbPetRegistrationStatus": {
                "list_total_count": 1,
                "RESULT": { "CODE": "INFO-000", "MESSAGE": "정상 처리되었습니다" },
                "row": [{
                    "SIDO": "서울특별시", "SIGUNGU": "강남구",
                    "DOG_REG_CNT": "100", "CAT_REG_CNT": "50", "TOT_REG_CNT": "150"
                }]
            }
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(&ClientConfig {
        base_url: server.uri(),
        timeout_secs: 5,
        max_connections: 10,
        max_idle_connections: 5,
        user_agent: "seoulpet-test/0.1".to_string(),
    })
    .expect("client");
    let api = Arc::new(SeoulOpenApi::new(client, "test-key"));
    let batch = BatchCollector::new(
        Collector::new(pool.clone()),
        api,
        vec![SourceBinding::new(Source::PetRegistrations)],
    );

    let recorded = run_recorded_batch(&batch, "cli", 1, 5)
        .await
        .expect("recorded run");
    assert!(recorded.succeeded);
    assert_eq!(recorded.summary.total_saved, 1);

    let run = seoulpet_db::get_collection_run(&pool, recorded.run_id)
        .await
        .expect("run row");
    assert_eq!(run.status, "succeeded");
    assert_eq!(run.total_saved, 1);
    assert_eq!(count_registrations(&pool).await, 1);
}
