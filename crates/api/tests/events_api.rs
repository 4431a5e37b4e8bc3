//! Event CRUD and availability over HTTP.

mod common;

use axum::http::StatusCode;
use boxoffice_core::roles::{ROLE_ADMIN, ROLE_CUSTOMER};
use chrono::{Duration, Utc};
use common::{body_json, delete_auth, get, post_json_auth, put_json_auth};
use serde_json::json;
use sqlx::PgPool;

fn new_event_body() -> serde_json::Value {
    json!({
        "name": "Midnight Cinema",
        "description": "Cult classics under the stars",
        "starts_at": (Utc::now() + Duration::days(14)).to_rfc3339(),
        "capacity_max": 120,
        "price_cents": 1_250,
        "category": "cinema",
        "location": "Rooftop"
    })
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_creates_event_with_zero_used(pool: PgPool) {
    let (_, admin) = common::create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(app.clone(), "/api/v1/events", new_event_body(), &admin).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["capacity_used"], 0);
    assert_eq!(data["available"], 120);
    assert_eq!(data["category"], "cinema");

    let id = data["id"].as_i64().unwrap();
    let fetched = get(app, &format!("/api/v1/events/{id}")).await;
    assert_eq!(fetched.status(), StatusCode::OK);
    assert_eq!(body_json(fetched).await["data"]["name"], "Midnight Cinema");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn customers_cannot_write_events(pool: PgPool) {
    let (_, customer) = common::create_user(&pool, "fan@example.com", ROLE_CUSTOMER).await;
    let event_id = common::create_event(&pool, 10, 5).await;
    let app = common::build_test_app(pool);

    let create = post_json_auth(app.clone(), "/api/v1/events", new_event_body(), &customer).await;
    assert_eq!(create.status(), StatusCode::FORBIDDEN);

    let delete = delete_auth(app, &format!("/api/v1/events/{event_id}"), &customer).await;
    assert_eq!(delete.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_validates_fields(pool: PgPool) {
    let (_, admin) = common::create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    let app = common::build_test_app(pool);

    let mut zero_capacity = new_event_body();
    zero_capacity["capacity_max"] = json!(0);
    let response = post_json_auth(app.clone(), "/api/v1/events", zero_capacity, &admin).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut bad_category = new_event_body();
    bad_category["category"] = json!("opera");
    let response = post_json_auth(app.clone(), "/api/v1/events", bad_category, &admin).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut past = new_event_body();
    past["starts_at"] = json!((Utc::now() - Duration::days(1)).to_rfc3339());
    let response = post_json_auth(app, "/api/v1/events", past, &admin).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn capacity_cannot_drop_below_sold_tickets(pool: PgPool) {
    let (_, admin) = common::create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    let event_id = common::create_event(&pool, 50, 5).await;
    common::set_used(&pool, event_id, 30).await;
    let app = common::build_test_app(pool);
    let uri = format!("/api/v1/events/{event_id}");

    let too_small = put_json_auth(app.clone(), &uri, json!({ "capacity_max": 20 }), &admin).await;
    assert_eq!(too_small.status(), StatusCode::BAD_REQUEST);

    let ok = put_json_auth(app, &uri, json!({ "capacity_max": 30, "name": "Renamed" }), &admin).await;
    assert_eq!(ok.status(), StatusCode::OK);
    let data = body_json(ok).await["data"].clone();
    assert_eq!(data["capacity_max"], 30);
    assert_eq!(data["available"], 0);
    assert_eq!(data["name"], "Renamed");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_cannot_touch_capacity_used(pool: PgPool) {
    let (_, admin) = common::create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    let event_id = common::create_event(&pool, 10, 5).await;
    let app = common::build_test_app(pool);

    let response = put_json_auth(
        app,
        &format!("/api/v1/events/{event_id}"),
        json!({ "capacity_used": 9 }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["capacity_used"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn availability_reports_remaining(pool: PgPool) {
    let event_id = common::create_event(&pool, 50, 5).await;
    common::set_used(&pool, event_id, 48).await;
    let app = common::build_test_app(pool);

    let response = get(app.clone(), &format!("/api/v1/events/{event_id}/availability")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["event_id"], event_id);
    assert_eq!(data["capacity_max"], 50);
    assert_eq!(data["capacity_used"], 48);
    assert_eq!(data["available"], 2);

    let missing = get(app, "/api/v1/events/999999/availability").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_filters_by_search(pool: PgPool) {
    common::create_event(&pool, 10, 3).await;
    let app = common::build_test_app(pool);

    let hit = get(app.clone(), "/api/v1/events?search=harbour").await;
    assert_eq!(hit.status(), StatusCode::OK);
    assert_eq!(body_json(hit).await["data"].as_array().unwrap().len(), 1);

    let miss = get(app, "/api/v1/events?search=symphony").await;
    assert!(body_json(miss).await["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_blocked_while_reserved(pool: PgPool) {
    let (_, admin) = common::create_user(&pool, "admin@example.com", ROLE_ADMIN).await;
    let (_, customer) = common::create_user(&pool, "fan@example.com", ROLE_CUSTOMER).await;
    let booked = common::create_event(&pool, 10, 5).await;
    let empty = common::create_event(&pool, 10, 5).await;
    let app = common::build_test_app(pool);

    let reserve = post_json_auth(
        app.clone(),
        "/api/v1/reservations",
        json!({ "event_id": booked, "ticket_count": 1 }),
        &customer,
    )
    .await;
    assert_eq!(reserve.status(), StatusCode::CREATED);

    let blocked = delete_auth(app.clone(), &format!("/api/v1/events/{booked}"), &admin).await;
    assert_eq!(blocked.status(), StatusCode::CONFLICT);

    let deleted = delete_auth(app.clone(), &format!("/api/v1/events/{empty}"), &admin).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = delete_auth(app, &format!("/api/v1/events/{empty}"), &admin).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}
