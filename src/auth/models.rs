//! Authentication models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::store::User;

/// User roles for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Clinic administrator - full access including /admin
    Admin,
    /// Clinic staff
    Staff,
    /// Registered patient
    Patient,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Patient => "patient",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "staff" => Some(Role::Staff),
            "patient" => Some(Role::Patient),
            _ => None,
        }
    }

    /// Whether this role may enter admin-only paths
    pub fn is_admin(&self) -> bool {
        match self {
            Role::Admin => true,
            Role::Staff | Role::Patient => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verified identity attached to a request by the access gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
}

/// Registration body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
}

/// Login credentials
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// User projection returned by the API. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            phone: user.phone,
            date_of_birth: user.date_of_birth,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserInfo,
}

/// Login response with token
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::Admin, Role::Staff, Role::Patient] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::parse("Admin"), None);
    }

    #[test]
    fn test_only_admin_is_admin() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::Staff.is_admin());
        assert!(!Role::Patient.is_admin());
    }

    #[test]
    fn test_user_info_omits_hash() {
        let now = chrono::Utc::now();
        let user = User {
            id: 7,
            email: "a@x.com".to_string(),
            password_hash: "$2b$12$secret".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            phone: None,
            role: Role::Patient,
            date_of_birth: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string(&UserInfo::from(user)).unwrap();
        assert!(json.contains("\"firstName\":\"A\""));
        assert!(json.contains("\"role\":\"patient\""));
        assert!(!json.contains("secret"));
        assert!(!json.contains("phone"));
    }
}
