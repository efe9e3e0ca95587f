use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use carebook::{
    app::build_app,
    config::{AppConfig, JwtConfig},
    db, seed, AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn test_app() -> Router {
    let pool = db::connect_in_memory().await.expect("open db");
    seed::seed_demo_data(&pool).await.expect("seed");
    let config = Arc::new(AppConfig {
        database_url: "sqlite::memory:".into(),
        jwt: JwtConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        },
        seed_demo_data: true,
    });
    build_app(AppState::from_parts(pool, config))
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
        Some(v) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string())),
        None => req.body(Body::empty()),
    }
    .expect("failed to build request");

    let resp = app.clone().oneshot(req).await.expect("request failed");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    (status, bytes.to_vec())
}

fn json_of(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("response was not json")
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json_of(&body)["access_token"]
        .as_str()
        .expect("access token")
        .to_string()
}

async fn book(app: &Router, token: &str, sub_type: &str, date: &str) -> i64 {
    let (status, body) = call(
        app,
        "POST",
        "/api/v1/appointments",
        Some(token),
        Some(json!({
            "appointment_type": "Consultation",
            "sub_type": sub_type,
            "date": date,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json_of(&body)["id"].as_i64().expect("id")
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app().await;
    let (status, body) = call(&app, "GET", "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn register_then_duplicate_conflicts() {
    let app = test_app().await;
    let payload = json!({ "username": "newbie", "name": "New Bie", "password": "longenough" });

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let v = json_of(&body);
    assert_eq!(v["user"]["username"], "newbie");
    assert_eq!(v["user"]["role"], "user");
    assert!(v["user"].get("password_hash").is_none());

    let (status, _) = call(&app, "POST", "/api/v1/auth/register", None, Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn register_validates_input() {
    let app = test_app().await;
    let cases = [
        json!({ "username": "x", "name": "Short", "password": "longenough" }),
        json!({ "username": "okname", "name": "  ", "password": "longenough" }),
        json!({ "username": "okname", "name": "Ok Name", "password": "short" }),
    ];
    for payload in cases {
        let (status, _) = call(&app, "POST", "/api/v1/auth/register", None, Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn login_failures_are_uniform() {
    let app = test_app().await;
    let (s1, b1) = call(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "username": "user1", "password": "wrong-password" })),
    )
    .await;
    let (s2, b2) = call(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "username": "nobody", "password": "password1" })),
    )
    .await;
    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(b1, b2);
}

#[tokio::test]
async fn me_requires_a_valid_token() {
    let app = test_app().await;
    let (status, _) = call(&app, "GET", "/api/v1/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, "GET", "/api/v1/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app, "user2", "password2").await;
    let (status, body) = call(&app, "GET", "/api/v1/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["name"], "Jane Smith");
}

#[tokio::test]
async fn refresh_issues_a_new_pair() {
    let app = test_app().await;
    let (_, body) = call(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "username": "user1", "password": "password1" })),
    )
    .await;
    let tokens = json_of(&body);

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        None,
        Some(json!({ "refresh_token": tokens["refresh_token"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["user"]["username"], "user1");

    // an access token is not accepted as a refresh token, and the reason is not leaked
    for rejected in [tokens["access_token"].clone(), json!("not-a-jwt")] {
        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": rejected })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, b"Invalid or expired token");
    }
}

#[tokio::test]
async fn booking_lifecycle() {
    let app = test_app().await;
    let token = login(&app, "user2", "password2").await;

    let later = book(&app, &token, "Eye consult", "2030-05-02T09:00:00+02:00").await;
    let sooner = book(&app, &token, "Dental consult", "2030-05-01T09:00:00Z").await;

    let (status, body) = call(&app, "GET", "/api/v1/appointments", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let list = json_of(&body);
    let ids: Vec<i64> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![sooner, later]);
    assert_eq!(list[1]["date"], "2030-05-02T07:00:00Z");
    assert_eq!(list[1]["status"], "confirmed");
    let created_at = list[1]["created_at"].clone();

    let (status, _) = call(
        &app,
        "PUT",
        &format!("/api/v1/appointments/{later}"),
        Some(&token),
        Some(json!({
            "appointment_type": "Medical screening",
            "sub_type": "Hearing screening",
            "date": "2030-04-30T08:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = call(&app, "GET", "/api/v1/appointments", Some(&token), None).await;
    let list = json_of(&body);
    assert_eq!(list[0]["id"].as_i64(), Some(later));
    assert_eq!(list[0]["sub_type"], "Hearing screening");
    assert_eq!(list[0]["created_at"], created_at);

    let (status, _) = call(
        &app,
        "DELETE",
        &format!("/api/v1/appointments/{sooner}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(
        &app,
        "DELETE",
        &format!("/api/v1/appointments/{sooner}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = call(&app, "GET", "/api/v1/appointments", Some(&token), None).await;
    assert_eq!(json_of(&body).as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn booking_rejects_services_outside_the_category() {
    let app = test_app().await;
    let token = login(&app, "user1", "password1").await;
    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/appointments",
        Some(&token),
        Some(json!({
            "appointment_type": "Consultation",
            "sub_type": "Cardiac screening",
            "date": "2030-01-01T09:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn booking_rejects_past_dates() {
    let app = test_app().await;
    let token = login(&app, "user1", "password1").await;
    let past = json!({
        "appointment_type": "Consultation",
        "sub_type": "Eye consult",
        "date": "2020-06-01T09:00:00Z",
    });

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/appointments",
        Some(&token),
        Some(past.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"Date must not be in the past");

    let id = book(&app, &token, "Eye consult", "2030-06-01T09:00:00Z").await;
    let (status, _) = call(
        &app,
        "PUT",
        &format!("/api/v1/appointments/{id}"),
        Some(&token),
        Some(past),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = call(&app, "GET", "/api/v1/appointments", Some(&token), None).await;
    let list = json_of(&body);
    let kept = list
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["id"].as_i64() == Some(id))
        .expect("still booked");
    assert_eq!(kept["date"], "2030-06-01T09:00:00Z");
}

#[tokio::test]
async fn booking_rejects_dates_past_year_9999_in_utc() {
    let app = test_app().await;
    let token = login(&app, "user1", "password1").await;
    // parses fine, but is 10000-01-01T04:00:00Z
    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/appointments",
        Some(&token),
        Some(json!({
            "appointment_type": "Consultation",
            "sub_type": "Eye consult",
            "date": "9999-12-31T23:00:00-05:00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"Date out of range");

    let (_, body) = call(&app, "GET", "/api/v1/appointments", Some(&token), None).await;
    // only the seeded booking
    assert_eq!(json_of(&body).as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn users_cannot_touch_each_others_appointments() {
    let app = test_app().await;
    let owner = login(&app, "user1", "password1").await;
    let other = login(&app, "user2", "password2").await;
    let id = book(&app, &owner, "General consult", "2030-02-02T10:00:00Z").await;

    let (status, _) = call(
        &app,
        "DELETE",
        &format!("/api/v1/appointments/{id}"),
        Some(&other),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app,
        "PUT",
        &format!("/api/v1/appointments/{id}"),
        Some(&other),
        Some(json!({
            "appointment_type": "Consultation",
            "sub_type": "Eye consult",
            "date": "2030-02-03T10:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = call(&app, "GET", "/api/v1/appointments", Some(&owner), None).await;
    let list = json_of(&body);
    let mine = list
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["id"].as_i64() == Some(id))
        .expect("still booked");
    assert_eq!(mine["sub_type"], "General consult");

    // admins may cancel anyone's booking
    let admin = login(&app, "admin", "admin123").await;
    let (status, _) = call(
        &app,
        "DELETE",
        &format!("/api/v1/appointments/{id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn admin_views_are_role_gated() {
    let app = test_app().await;
    let user = login(&app, "user1", "password1").await;

    let (status, _) = call(&app, "GET", "/api/v1/admin/appointments", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(
        &app,
        "GET",
        "/api/v1/admin/appointments/export",
        Some(&user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, "GET", "/api/v1/admin/appointments", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_lists_everyone_by_date() {
    let app = test_app().await;
    let john = login(&app, "user1", "password1").await;
    let jane = login(&app, "user2", "password2").await;
    // booked in the opposite order of their dates
    let jane_later = book(&app, &jane, "Antenatal consult", "2031-03-01T10:00:00Z").await;
    let john_sooner = book(&app, &john, "Eye consult", "2031-02-01T10:00:00Z").await;

    let admin = login(&app, "admin", "admin123").await;
    let (status, body) = call(&app, "GET", "/api/v1/admin/appointments", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let list = json_of(&body);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 3);
    // seeded booking for user1 is 2023-12-15 10:00 UTC
    assert_eq!(list[0]["username"], "user1");
    assert_eq!(list[0]["sub_type"], "Dental consult");
    assert_eq!(list[1]["id"].as_i64(), Some(john_sooner));
    assert_eq!(list[1]["owner_name"], "John Doe");
    assert_eq!(list[2]["id"].as_i64(), Some(jane_later));
    assert_eq!(list[2]["username"], "user2");
    assert_eq!(list[2]["owner_name"], "Jane Smith");
}

#[tokio::test]
async fn admin_export_is_a_csv_attachment() {
    let app = test_app().await;
    let admin = login(&app, "admin", "admin123").await;

    let req = Request::builder()
        .method("GET")
        .uri("/api/v1/admin/appointments/export")
        .header(header::AUTHORIZATION, format!("Bearer {admin}"))
        .body(Body::empty())
        .expect("failed to build request");
    let resp = app.clone().oneshot(req).await.expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/csv"));
    let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.contains("appointments_export.csv"));

    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = std::str::from_utf8(&body).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("Username,Name,Type,Service,Date,Status,Created At")
    );
    let row = lines.next().expect("seeded row");
    assert!(row.starts_with(
        "user1,John Doe,Consultation,Dental consult,2023-12-15 10:00,confirmed,"
    ));
    assert!(lines.next().is_none());
}

#[tokio::test]
async fn catalog_lists_categories() {
    let app = test_app().await;
    let (status, body) = call(&app, "GET", "/api/v1/appointments/catalog", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let v = json_of(&body);
    assert_eq!(v[0]["category"], "Consultation");
    assert_eq!(v[1]["category"], "Medical screening");
    assert!(v[0]["sub_types"]
        .as_array()
        .unwrap()
        .iter()
        .any(|s| s == "Dental consult"));
}
