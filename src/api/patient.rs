//! Handlers for the signed-in user's own data

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;

use super::server::SharedState;
use crate::auth::{Identity, Role, UserInfo};
use crate::error::{Error, Result};
use crate::store::{Appointment, AppointmentFilter, User, UserUpdate};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub user: UserInfo,
    pub upcoming_appointments: Vec<Appointment>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub message: String,
    pub user: UserInfo,
}

/// Resolve the gate's identity to the stored user. A token whose user no
/// longer exists counts as signed out.
pub async fn current_user(state: &SharedState, identity: &Identity) -> Result<User> {
    state
        .store
        .find_user(identity.user_id)
        .await?
        .ok_or(Error::Unauthenticated)
}

pub async fn get_profile(
    State(state): State<SharedState>,
    identity: Identity,
) -> Result<Json<UserInfo>> {
    let user = current_user(&state, &identity).await?;
    Ok(Json(UserInfo::from(user)))
}

pub async fn update_profile(
    State(state): State<SharedState>,
    identity: Identity,
    payload: std::result::Result<Json<UserUpdate>, JsonRejection>,
) -> Result<Json<ProfileResponse>> {
    match identity.role {
        Role::Patient => {}
        Role::Admin | Role::Staff => return Err(Error::Forbidden),
    }

    let Json(update) = payload.map_err(|e| Error::Validation(e.body_text()))?;
    if update.is_empty() {
        return Err(Error::Validation("No fields to update".to_string()));
    }
    let blank = |field: &Option<String>| field.as_deref().is_some_and(|v| v.trim().is_empty());
    if blank(&update.first_name) || blank(&update.last_name) {
        return Err(Error::Validation("Name fields must not be blank".to_string()));
    }

    let user = state
        .store
        .update_user(identity.user_id, update)
        .await?
        .ok_or(Error::Unauthenticated)?;
    tracing::info!(user_id = user.id, "Profile updated");

    Ok(Json(ProfileResponse {
        message: "Profile updated".to_string(),
        user: UserInfo::from(user),
    }))
}

pub async fn dashboard(
    State(state): State<SharedState>,
    identity: Identity,
) -> Result<Json<DashboardResponse>> {
    let user = current_user(&state, &identity).await?;
    let upcoming_appointments = state
        .store
        .find_appointments(AppointmentFilter {
            patient_id: Some(user.id),
            upcoming: true,
        })
        .await?;

    Ok(Json(DashboardResponse {
        user: UserInfo::from(user),
        upcoming_appointments,
    }))
}
