//! Admin queue introspection over HTTP.

mod common;

use axum::http::StatusCode;
use boxoffice_core::roles::{ROLE_ADMIN, ROLE_CUSTOMER};
use boxoffice_core::status::JobState;
use common::{body_json, delete_auth, get_auth, post_json_auth};
use serde_json::json;
use sqlx::PgPool;

/// Book one reservation so each ticket queue holds one waiting job.
async fn seed_jobs(pool: &PgPool, app: axum::Router) {
    let (_, customer) = common::create_user(pool, "fan@example.com", ROLE_CUSTOMER).await;
    let event_id = common::create_event(pool, 10, 5).await;
    let response = post_json_auth(
        app,
        "/api/v1/reservations",
        json!({ "event_id": event_id, "ticket_count": 1 }),
        &customer,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

async fn first_job_id(pool: &PgPool, queue: &str) -> i64 {
    sqlx::query_scalar("SELECT id FROM queue_jobs WHERE queue = $1 ORDER BY id LIMIT 1")
        .bind(queue)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stats_count_jobs_per_queue(pool: PgPool) {
    let (_, admin) = common::create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    let app = common::build_test_app(pool.clone());
    seed_jobs(&pool, app.clone()).await;

    let response = get_auth(app, "/api/v1/admin/queues/stats", &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["queues"]["ticket_artifacts"]["waiting"], 1);
    assert_eq!(data["queues"]["confirmations"]["waiting"], 1);
    assert_eq!(data["queues"]["confirmations"]["failed"], 0);
    assert!(data["timestamp"].is_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn queue_routes_are_admin_only(pool: PgPool) {
    let (_, customer) = common::create_user(&pool, "c@example.com", ROLE_CUSTOMER).await;
    let app = common::build_test_app(pool);

    let response = get_auth(app, "/api/v1/admin/queues/stats", &customer).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_defaults_to_waiting_jobs(pool: PgPool) {
    let (_, admin) = common::create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    let app = common::build_test_app(pool.clone());
    seed_jobs(&pool, app.clone()).await;

    let waiting = get_auth(app.clone(), "/api/v1/admin/queues/ticket_artifacts/jobs", &admin).await;
    assert_eq!(waiting.status(), StatusCode::OK);
    let jobs = body_json(waiting).await["data"].clone();
    assert_eq!(jobs.as_array().unwrap().len(), 1);
    assert_eq!(jobs[0]["name"], "render-ticket-artifact");
    assert_eq!(jobs[0]["max_attempts"], 3);
    assert!(jobs[0]["payload"]["ticket_code"].is_string());

    let failed = get_auth(
        app.clone(),
        "/api/v1/admin/queues/ticket_artifacts/jobs?state=failed",
        &admin,
    )
    .await;
    assert!(body_json(failed).await["data"].as_array().unwrap().is_empty());

    let bad_state = get_auth(
        app.clone(),
        "/api/v1/admin/queues/ticket_artifacts/jobs?state=sleeping",
        &admin,
    )
    .await;
    assert_eq!(bad_state.status(), StatusCode::BAD_REQUEST);

    let unknown = get_auth(app, "/api/v1/admin/queues/emails/jobs", &admin).await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn retry_only_applies_to_failed_jobs(pool: PgPool) {
    let (_, admin) = common::create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    let app = common::build_test_app(pool.clone());
    seed_jobs(&pool, app.clone()).await;
    let id = first_job_id(&pool, "confirmations").await;
    let uri = format!("/api/v1/admin/queues/confirmations/jobs/{id}/retry");

    let early = post_json_auth(app.clone(), &uri, json!({}), &admin).await;
    assert_eq!(early.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(early).await["code"], "INVALID_STATE");

    sqlx::query(
        "UPDATE queue_jobs SET state_id = $2, attempts_made = 3, last_error = 'smtp down' \
         WHERE id = $1",
    )
    .bind(id)
    .bind(JobState::Failed.id())
    .execute(&pool)
    .await
    .unwrap();

    let retried = post_json_auth(app.clone(), &uri, json!({}), &admin).await;
    assert_eq!(retried.status(), StatusCode::OK);
    let job = body_json(retried).await["data"].clone();
    assert_eq!(job["state_id"], JobState::Waiting.id());
    assert_eq!(job["attempts_made"], 0);

    // Scoped to the queue in the path.
    let wrong_queue = post_json_auth(
        app,
        &format!("/api/v1/admin/queues/ticket_artifacts/jobs/{id}/retry"),
        json!({}),
        &admin,
    )
    .await;
    assert_eq!(wrong_queue.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn remove_deletes_idle_jobs(pool: PgPool) {
    let (_, admin) = common::create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    let app = common::build_test_app(pool.clone());
    seed_jobs(&pool, app.clone()).await;
    let id = first_job_id(&pool, "ticket_artifacts").await;
    let uri = format!("/api/v1/admin/queues/ticket_artifacts/jobs/{id}");

    let removed = delete_auth(app.clone(), &uri, &admin).await;
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);

    let again = delete_auth(app, &uri, &admin).await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}
