//! HTTP API tests
//! Drives the full router against the in-memory store

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use clinic::api::{create_router, AppState};
use clinic::auth::Role;
use clinic::config::Config;
use clinic::store::{ClinicStore, MemoryStore, NewAppointment, NewService, NewUser};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = Some("api-test-secret".to_string());
    config.auth.bcrypt_cost = 4;
    config
}

fn test_app() -> (Router, Arc<AppState>) {
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(test_config(), store).expect("state"));
    (create_router(Arc::clone(&state)), state)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_with_cookie(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn set_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// `name=value` part of a Set-Cookie header
fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap_or_default().to_string()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

fn register_body() -> Value {
    json!({
        "email": "a@x.com",
        "password": "secret123",
        "firstName": "A",
        "lastName": "B"
    })
}

async fn seed_user(state: &AppState, email: &str, password: &str, role: Role) -> i32 {
    let password_hash = clinic::auth::hash_password(password, 4).unwrap();
    state
        .store
        .insert_user(NewUser {
            email: email.to_string(),
            password_hash,
            first_name: "Seed".to_string(),
            last_name: "User".to_string(),
            phone: None,
            role,
            date_of_birth: None,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app();
    let response = app.oneshot(get_with_cookie("/api/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_register_creates_patient_and_sets_cookie() {
    let (app, _) = test_app();

    let response = app
        .clone()
        .oneshot(post_json("/api/auth/register", register_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookie = set_cookie(&response);
    assert!(cookie.starts_with("auth_token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Max-Age=604800"));
    assert!(cookie.contains("Path=/"));
    assert!(!cookie.contains("Secure"));

    let body = body_json(response).await;
    assert_eq!(body["message"], "Registration successful");
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["user"]["firstName"], "A");
    assert_eq!(body["user"]["lastName"], "B");
    assert_eq!(body["user"]["role"], "patient");
    assert!(body["user"].get("passwordHash").is_none());

    // Same email again
    let response = app
        .oneshot(post_json("/api/auth/register", register_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_missing_fields() {
    let (app, _) = test_app();

    for body in [
        json!({ "email": "a@x.com", "password": "secret123", "firstName": "A" }),
        json!({ "email": "", "password": "secret123", "firstName": "A", "lastName": "B" }),
        json!({}),
    ] {
        let response = app
            .clone()
            .oneshot(post_json("/api/auth/register", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Missing required fields");
    }
}

#[tokio::test]
async fn test_register_malformed_json() {
    let (app, _) = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_with_optional_fields() {
    let (app, state) = test_app();
    let mut body = register_body();
    body["phone"] = json!("555-0100");
    body["dateOfBirth"] = json!("1990-04-01");

    let response = app
        .oneshot(post_json("/api/auth/register", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let user = state.store.find_user_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(user.phone.as_deref(), Some("555-0100"));
    assert_eq!(user.date_of_birth.unwrap().to_string(), "1990-04-01");
    assert!(user.password_hash.starts_with("$2"));
}

#[tokio::test]
async fn test_login_success_and_failures_are_indistinguishable() {
    let (app, _) = test_app();
    app.clone()
        .oneshot(post_json("/api/auth/register", register_body()))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            json!({ "email": "a@x.com", "password": "secret123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).starts_with("auth_token="));
    let body = body_json(response).await;
    assert_eq!(body["message"], "Login successful");
    assert!(body["token"].as_str().is_some_and(|t| t.split('.').count() == 3));
    assert_eq!(body["user"]["role"], "patient");
    assert!(body["user"].get("passwordHash").is_none());

    let wrong_password = app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            json!({ "email": "a@x.com", "password": "wrong" }),
        ))
        .await
        .unwrap();
    let unknown_email = app
        .oneshot(post_json(
            "/api/auth/login",
            json!({ "email": "nobody@x.com", "password": "secret123" }),
        ))
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(&wrong_password).is_empty());
    let a = body_json(wrong_password).await;
    let b = body_json(unknown_email).await;
    assert_eq!(a, json!({ "message": "Invalid credentials" }));
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_logout_clears_cookie_and_session_ends() {
    let (app, _) = test_app();
    let response = app
        .clone()
        .oneshot(post_json("/api/auth/register", register_body()))
        .await
        .unwrap();
    let session = cookie_pair(&set_cookie(&response));

    let response = app
        .clone()
        .oneshot(get_with_cookie("/dashboard", Some(&session)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let logout = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .header(header::COOKIE, &session)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(logout).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = set_cookie(&response);
    assert_eq!(cleared, "auth_token=; Path=/; Max-Age=0");
    assert_eq!(body_json(response).await["message"], "Logged out successfully");

    // The browser now sends the emptied cookie
    let response = app
        .oneshot(get_with_cookie("/dashboard", Some(&cookie_pair(&cleared))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login?from=/dashboard");
}

#[tokio::test]
async fn test_logout_without_session_succeeds() {
    let (app, _) = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_paths() {
    let (app, state) = test_app();
    let patient_id = seed_user(&state, "p@x.com", "pw", Role::Patient).await;
    let admin_id = seed_user(&state, "admin@x.com", "pw", Role::Admin).await;
    let patient = state.tokens().issue(patient_id, "p@x.com", Role::Patient).unwrap();
    let admin = state.tokens().issue(admin_id, "admin@x.com", Role::Admin).unwrap();

    let response = app
        .clone()
        .oneshot(get_with_cookie("/admin/patients", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login?from=/admin/patients");

    let response = app
        .clone()
        .oneshot(get_with_cookie(
            "/admin/patients",
            Some(&format!("auth_token={}", patient)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/unauthorized");

    let response = app
        .oneshot(get_with_cookie(
            "/admin/patients",
            Some(&format!("auth_token={}", admin)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let patients = body.as_array().unwrap();
    assert_eq!(patients.len(), 1);
    assert_eq!(patients[0]["email"], "p@x.com");
}

#[tokio::test]
async fn test_expired_cookie_redirects_to_login() {
    let (app, state) = test_app();
    let token = state
        .tokens()
        .issue_at(1, "a@x.com", Role::Patient, Utc::now() - Duration::days(8))
        .unwrap();

    let response = app
        .oneshot(get_with_cookie("/dashboard", Some(&format!("auth_token={}", token))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login?from=/dashboard");
}

#[tokio::test]
async fn test_dashboard_lists_upcoming_appointments() {
    let (app, state) = test_app();
    let patient_id = seed_user(&state, "p@x.com", "pw", Role::Patient).await;
    let service = state
        .store
        .insert_service(NewService {
            name: "Cleaning".to_string(),
            description: None,
            duration: 30,
            price: Some(8000),
        })
        .await
        .unwrap();

    for days in [-1, 2] {
        state
            .store
            .insert_appointment(NewAppointment {
                patient_id,
                service_id: service.id,
                staff_id: None,
                start_time: Utc::now() + Duration::days(days),
                end_time: Utc::now() + Duration::days(days) + Duration::minutes(30),
                notes: None,
            })
            .await
            .unwrap();
    }

    let token = state.tokens().issue(patient_id, "p@x.com", Role::Patient).unwrap();
    let response = app
        .oneshot(get_with_cookie("/dashboard", Some(&format!("auth_token={}", token))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], "p@x.com");
    assert_eq!(body["upcomingAppointments"].as_array().unwrap().len(), 1);
    assert_eq!(body["upcomingAppointments"][0]["status"], "pending");
}

#[tokio::test]
async fn test_profile_update_for_patient() {
    let (app, state) = test_app();
    let patient_id = seed_user(&state, "p@x.com", "pw", Role::Patient).await;
    let token = state.tokens().issue(patient_id, "p@x.com", Role::Patient).unwrap();

    let request = Request::builder()
        .method("PUT")
        .uri("/profile")
        .header(header::COOKIE, format!("auth_token={}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "phone": "555-0199", "firstName": "Ada" }).to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["phone"], "555-0199");
    assert_eq!(body["user"]["firstName"], "Ada");

    let response = app
        .oneshot(get_with_cookie("/profile", Some(&format!("auth_token={}", token))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["firstName"], "Ada");
}

#[tokio::test]
async fn test_profile_update_forbidden_for_staff() {
    let (app, state) = test_app();
    let staff_id = seed_user(&state, "s@x.com", "pw", Role::Staff).await;
    let token = state.tokens().issue(staff_id, "s@x.com", Role::Staff).unwrap();

    let request = Request::builder()
        .method("PUT")
        .uri("/profile")
        .header(header::COOKIE, format!("auth_token={}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "phone": "555-0199" }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_token_for_deleted_user_is_unauthenticated() {
    let (app, state) = test_app();
    let token = state.tokens().issue(999, "ghost@x.com", Role::Patient).unwrap();

    let response = app
        .oneshot(get_with_cookie("/profile", Some(&format!("auth_token={}", token))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_stats() {
    let (app, state) = test_app();
    let admin_id = seed_user(&state, "admin@x.com", "pw", Role::Admin).await;
    seed_user(&state, "p1@x.com", "pw", Role::Patient).await;
    seed_user(&state, "p2@x.com", "pw", Role::Patient).await;
    state
        .store
        .insert_service(NewService {
            name: "Checkup".to_string(),
            description: Some("Annual".to_string()),
            duration: 45,
            price: None,
        })
        .await
        .unwrap();

    let token = state.tokens().issue(admin_id, "admin@x.com", Role::Admin).unwrap();
    let response = app
        .oneshot(get_with_cookie("/admin/stats", Some(&format!("auth_token={}", token))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({
            "totalPatients": 2,
            "totalAppointments": 0,
            "upcomingAppointments": 0,
            "activeServices": 1
        })
    );
}

#[tokio::test]
async fn test_state_requires_secret() {
    let store = Arc::new(MemoryStore::new());
    assert!(AppState::new(Config::default(), store).is_err());
}

#[tokio::test]
async fn test_state_rejects_invalid_bcrypt_cost() {
    let mut config = test_config();
    config.auth.bcrypt_cost = 99;
    let store = Arc::new(MemoryStore::new());
    assert!(AppState::new(config, store).is_err());
}

#[tokio::test]
async fn test_unknown_email_login_still_runs_bcrypt() {
    let mut config = test_config();
    config.auth.bcrypt_cost = 10;
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(config, store).expect("state"));
    let app = create_router(Arc::clone(&state));

    assert!(state.dummy_hash().contains("$10$"));
    assert!(!clinic::auth::verify_password("secret123", state.dummy_hash()));

    // 1024 bcrypt rounds cannot finish in under 10ms
    let started = std::time::Instant::now();
    let response = app
        .oneshot(post_json(
            "/api/auth/login",
            json!({ "email": "nobody@x.com", "password": "secret123" }),
        ))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(
        elapsed >= std::time::Duration::from_millis(10),
        "unknown email answered in {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_register_rejects_unusable_emails() {
    let (app, state) = test_app();

    for email in [
        "a\n@x.com",
        "a\r\nx-user-role: admin@x.com",
        "a@x\u{7f}.com",
        "a b@x.com",
        "no-at-sign",
        "@x.com",
        "a@",
    ] {
        let mut body = register_body();
        body["email"] = json!(email);
        let response = app
            .clone()
            .oneshot(post_json("/api/auth/register", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "accepted {:?}", email);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Invalid email address");
    }

    assert!(state.store.find_users(Default::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_register_trims_email() {
    let (app, state) = test_app();
    let mut body = register_body();
    body["email"] = json!("  a@x.com ");

    let response = app
        .clone()
        .oneshot(post_json("/api/auth/register", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(state.store.find_user_by_email("a@x.com").await.unwrap().is_some());

    let response = app
        .clone()
        .oneshot(post_json("/api/auth/register", register_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(post_json(
            "/api/auth/login",
            json!({ "email": " a@x.com", "password": "secret123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_register_accepts_whitespace_password() {
    let (app, _) = test_app();
    let mut body = register_body();
    body["password"] = json!("   ");

    let response = app
        .clone()
        .oneshot(post_json("/api/auth/register", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(post_json(
            "/api/auth/login",
            json!({ "email": "a@x.com", "password": "   " }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
