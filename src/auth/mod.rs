//! Authentication and session management

pub mod cookies;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;

pub use cookies::{AuthSession, CookieStore, DocumentCookies, ServerCookies, AUTH_COOKIE};
pub use jwt::{Claims, TokenService};
pub use middleware::{access_gate, AccessGate, AccessPolicy, GateDecision};
pub use models::{Identity, Role, UserInfo};
pub use password::{hash_password, verify_password};
