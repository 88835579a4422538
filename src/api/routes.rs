//! Health and auth route handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::server::SharedState;
use crate::auth::models::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use crate::auth::password::{hash_password_async, verify_login};
use crate::auth::{Role, UserInfo};
use crate::error::{Error, Result};
use crate::store::NewUser;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

pub async fn unauthorized() -> impl IntoResponse {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "message": "You do not have permission to view this page" })),
    )
}

/// A present, non-empty field
fn required(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.is_empty())
}

/// Emails are echoed into the `x-user-email` header, so they must be valid
/// header values as well as look like an address
fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !email.chars().any(|c| c.is_whitespace() || c.is_control())
        && HeaderValue::from_str(email).is_ok()
}

fn parse_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| Error::Validation(e.body_text()))
}

pub async fn register(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response> {
    let req = parse_body(payload)?;

    let (Some(email), Some(password), Some(first_name), Some(last_name)) = (
        required(req.email.map(|email| email.trim().to_string())),
        required(req.password),
        required(req.first_name),
        required(req.last_name),
    ) else {
        return Err(Error::Validation("Missing required fields".to_string()));
    };
    if !valid_email(&email) {
        return Err(Error::Validation("Invalid email address".to_string()));
    }

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(Error::Conflict(
            "User already exists with this email".to_string(),
        ));
    }

    let password_hash = hash_password_async(password, state.config.auth.bcrypt_cost).await?;

    // The store rejects a duplicate that raced past the lookup above
    let user = state
        .store
        .insert_user(NewUser {
            email,
            password_hash,
            first_name,
            last_name,
            phone: req.phone.filter(|p| !p.trim().is_empty()),
            role: Role::Patient,
            date_of_birth: req.date_of_birth,
        })
        .await?;

    let token = state.tokens().issue(user.id, &user.email, user.role)?;
    tracing::info!(user_id = user.id, "Registered new patient");

    let mut session = state.session(&headers);
    session.set_auth_cookie(&token);

    let body = RegisterResponse {
        message: "Registration successful".to_string(),
        user: UserInfo::from(user),
    };
    let mut response = (StatusCode::CREATED, Json(body)).into_response();
    session.store().write_to(response.headers_mut());
    Ok(response)
}

pub async fn login(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response> {
    let req = parse_body(payload)?;

    // Unknown email and wrong password produce the same response in the same time
    let user = state.store.find_user_by_email(req.email.trim()).await?;
    let stored = user.as_ref().map(|user| user.password_hash.clone());
    let matched = verify_login(req.password, stored, state.dummy_hash()).await;

    let user = match user {
        Some(user) if matched => user,
        Some(user) => {
            tracing::info!(user_id = user.id, "Failed login: wrong password");
            return Err(Error::InvalidCredentials);
        }
        None => {
            tracing::info!("Failed login: unknown email");
            return Err(Error::InvalidCredentials);
        }
    };

    let token = state.tokens().issue(user.id, &user.email, user.role)?;
    tracing::info!(user_id = user.id, role = %user.role, "User logged in");

    let mut session = state.session(&headers);
    session.set_auth_cookie(&token);

    let body = LoginResponse {
        message: "Login successful".to_string(),
        token,
        user: UserInfo::from(user),
    };
    let mut response = (StatusCode::OK, Json(body)).into_response();
    session.store().write_to(response.headers_mut());
    Ok(response)
}

pub async fn logout(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let mut session = state.session(&headers);
    session.clear_auth_cookie();

    let mut response = Json(json!({ "message": "Logged out successfully" })).into_response();
    session.store().write_to(response.headers_mut());
    response
}
