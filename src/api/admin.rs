//! Admin area handlers. Mounted under the admin-only prefix.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::server::SharedState;
use crate::auth::{Identity, Role, UserInfo};
use crate::error::{Error, Result};
use crate::store::{Appointment, AppointmentFilter, Service, ServiceFilter, UserFilter};

#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentsQuery {
    pub patient_id: Option<i32>,
    #[serde(default)]
    pub upcoming: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicesQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_patients: usize,
    pub total_appointments: usize,
    pub upcoming_appointments: usize,
    pub active_services: usize,
}

// The gate already enforces this for the admin prefix; handlers check again
// in case the prefix list is reconfigured
fn require_admin(identity: &Identity) -> Result<()> {
    if identity.role.is_admin() {
        Ok(())
    } else {
        Err(Error::Forbidden)
    }
}

pub async fn list_patients(
    State(state): State<SharedState>,
    identity: Identity,
    Query(query): Query<UsersQuery>,
) -> Result<Json<Vec<UserInfo>>> {
    require_admin(&identity)?;

    let role = query.role.unwrap_or(Role::Patient);
    let users = state.store.find_users(UserFilter { role: Some(role) }).await?;
    Ok(Json(users.into_iter().map(UserInfo::from).collect()))
}

pub async fn list_appointments(
    State(state): State<SharedState>,
    identity: Identity,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Json<Vec<Appointment>>> {
    require_admin(&identity)?;

    let appointments = state
        .store
        .find_appointments(AppointmentFilter {
            patient_id: query.patient_id,
            upcoming: query.upcoming,
        })
        .await?;
    Ok(Json(appointments))
}

pub async fn list_services(
    State(state): State<SharedState>,
    identity: Identity,
    Query(query): Query<ServicesQuery>,
) -> Result<Json<Vec<Service>>> {
    require_admin(&identity)?;

    let services = state
        .store
        .find_services(ServiceFilter {
            active_only: query.active_only,
        })
        .await?;
    Ok(Json(services))
}

pub async fn stats(
    State(state): State<SharedState>,
    identity: Identity,
) -> Result<Json<AdminStats>> {
    require_admin(&identity)?;

    let store = &state.store;
    let patients = store
        .find_users(UserFilter {
            role: Some(Role::Patient),
        })
        .await?;
    let appointments = store.find_appointments(AppointmentFilter::default()).await?;
    let upcoming = store
        .find_appointments(AppointmentFilter {
            patient_id: None,
            upcoming: true,
        })
        .await?;
    let services = store
        .find_services(ServiceFilter { active_only: true })
        .await?;

    Ok(Json(AdminStats {
        total_patients: patients.len(),
        total_appointments: appointments.len(),
        upcoming_appointments: upcoming.len(),
        active_services: services.len(),
    }))
}
