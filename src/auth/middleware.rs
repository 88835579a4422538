//! Access gate middleware and identity extractor

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::auth::cookies::{cookie_from_headers, AUTH_COOKIE};
use crate::auth::jwt::TokenService;
use crate::auth::models::Identity;
use crate::config::AuthConfig;
use crate::error::Error;

pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
pub const USER_EMAIL_HEADER: HeaderName = HeaderName::from_static("x-user-email");
pub const USER_ROLE_HEADER: HeaderName = HeaderName::from_static("x-user-role");

/// Which paths need a session, which need an admin, and where to send
/// requests that fail either check
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    pub protected_paths: Vec<String>,
    pub admin_paths: Vec<String>,
    pub login_path: String,
    pub unauthorized_path: String,
}

impl AccessPolicy {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            protected_paths: config.protected_paths.clone(),
            admin_paths: config.admin_paths.clone(),
            login_path: config.login_path.clone(),
            unauthorized_path: config.unauthorized_path.clone(),
        }
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_paths.iter().any(|p| path.starts_with(p.as_str()))
    }

    pub fn is_admin_only(&self, path: &str) -> bool {
        self.admin_paths.iter().any(|p| path.starts_with(p.as_str()))
    }

    /// Login location remembering where the request was headed
    pub fn login_redirect(&self, from: &str) -> String {
        // '/' is legal in a query value and keeps the target readable
        let from = urlencoding::encode(from).replace("%2F", "/");
        format!("{}?from={}", self.login_path, from)
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::from_config(&AuthConfig::default())
    }
}

/// Outcome of the gate for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Not a protected path; forward untouched
    Pass,
    /// Verified; forward with this identity attached
    Allow(Identity),
    /// Send the client elsewhere
    Redirect(String),
}

/// Path policy plus the token verifier
#[derive(Debug, Clone)]
pub struct AccessGate {
    policy: AccessPolicy,
    tokens: TokenService,
}

impl AccessGate {
    pub fn new(policy: AccessPolicy, tokens: TokenService) -> Self {
        Self { policy, tokens }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Run the gate steps in order for one request path and its cookie
    pub fn evaluate(&self, path: &str, token: Option<&str>) -> GateDecision {
        if !self.policy.is_protected(path) {
            return GateDecision::Pass;
        }

        let Some(token) = token.filter(|t| !t.is_empty()) else {
            tracing::debug!(path, "No session cookie, redirecting to login");
            return GateDecision::Redirect(self.policy.login_redirect(path));
        };

        let Some(claims) = self.tokens.verify(token) else {
            tracing::debug!(path, "Invalid session token, redirecting to login");
            return GateDecision::Redirect(self.policy.login_redirect(path));
        };

        if self.policy.is_admin_only(path) && !claims.role.is_admin() {
            tracing::debug!(
                path,
                user_id = claims.user_id,
                role = %claims.role,
                "Admin path denied"
            );
            return GateDecision::Redirect(self.policy.unauthorized_path.clone());
        }

        GateDecision::Allow(claims.identity())
    }
}

fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

fn strip_identity_headers(headers: &mut HeaderMap) {
    headers.remove(USER_ID_HEADER);
    headers.remove(USER_EMAIL_HEADER);
    headers.remove(USER_ROLE_HEADER);
}

fn attach_identity(headers: &mut HeaderMap, identity: &Identity) -> bool {
    let Ok(email) = HeaderValue::from_str(&identity.email) else {
        return false;
    };
    headers.insert(USER_ID_HEADER, HeaderValue::from(identity.user_id));
    headers.insert(USER_EMAIL_HEADER, email);
    headers.insert(USER_ROLE_HEADER, HeaderValue::from_static(identity.role.as_str()));
    true
}

/// Middleware enforcing the access policy on every request
pub async fn access_gate(
    State(gate): State<Arc<AccessGate>>,
    mut req: Request,
    next: Next,
) -> Response {
    // Identity headers are only ever set here
    strip_identity_headers(req.headers_mut());

    let path = req.uri().path().to_string();
    let token = cookie_from_headers(req.headers(), AUTH_COOKIE);

    match gate.evaluate(&path, token.as_deref()) {
        GateDecision::Pass => next.run(req).await,
        GateDecision::Redirect(location) => redirect(&location),
        GateDecision::Allow(identity) => {
            if !attach_identity(req.headers_mut(), &identity) {
                return redirect(&gate.policy().login_redirect(&path));
            }
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
    }
}

/// Extracts the identity the gate attached. Handlers using this must sit
/// behind [`access_gate`] on a protected path.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(Error::Unauthenticated)
    }
}
