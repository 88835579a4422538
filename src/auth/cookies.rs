//! Session cookie storage
//!
//! The auth cookie is read and written through [`CookieStore`], which has
//! two adapters with the same observable behavior:
//!
//! - [`DocumentCookies`] keeps cookies the way a browser document does: a
//!   single `name=value; name2=value2` string that `Set-Cookie` style
//!   strings are applied to.
//! - [`ServerCookies`] reads the inbound request's `Cookie` header and
//!   queues `Set-Cookie` headers for the outgoing response.
//!
//! [`AuthSession`] layers the `auth_token` policy on top of either one.

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::Duration;

/// Name of the session cookie
pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Transport attributes for a cookie write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub path: String,
    /// Seconds
    pub max_age: i64,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            max_age: Duration::days(7).num_seconds(),
            secure: false,
            http_only: false,
            same_site: None,
        }
    }
}

/// Compose a `Set-Cookie` string. The value is percent-encoded.
pub fn compose_cookie(name: &str, value: &str, options: &CookieOptions) -> String {
    let mut cookie = format!("{}={}", name, urlencoding::encode(value));

    cookie.push_str(&format!("; Max-Age={}", options.max_age));
    if !options.path.is_empty() {
        cookie.push_str(&format!("; Path={}", options.path));
    }
    if options.secure {
        cookie.push_str("; Secure");
    }
    if options.http_only {
        cookie.push_str("; HttpOnly");
    }
    if let Some(same_site) = options.same_site {
        cookie.push_str(&format!("; SameSite={}", same_site.as_str()));
    }

    cookie
}

/// The string that removes a cookie
pub fn expired_cookie(name: &str) -> String {
    format!("{}=; Path=/; Max-Age=0", name)
}

/// Find a cookie in a `Cookie` header style string by exact name match.
/// The value is percent-decoded; undecodable values are returned raw.
pub fn parse_cookie(cookie_str: &str, name: &str) -> Option<String> {
    cookie_str.split(';').find_map(|pair| {
        let (cookie_name, cookie_value) = pair.trim().split_once('=')?;
        if cookie_name != name {
            return None;
        }
        Some(
            urlencoding::decode(cookie_value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| cookie_value.to_string()),
        )
    })
}

/// Read the named cookie from request headers. Multiple `Cookie` headers
/// are searched in order.
pub fn cookie_from_headers(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie_str| parse_cookie(cookie_str, name))
}

/// Minimal cookie capability shared by both execution contexts
pub trait CookieStore {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&mut self, name: &str, value: &str, options: &CookieOptions);
    fn delete(&mut self, name: &str);
}

/// Document-style cookie state, as seen by code running in a browser
#[derive(Debug, Clone, Default)]
pub struct DocumentCookies {
    entries: Vec<(String, String)>,
}

impl DocumentCookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from an existing `name=value; ...` string
    pub fn from_cookie_string(cookie_str: &str) -> Self {
        let entries = cookie_str
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                Some((name.to_string(), value.to_string()))
            })
            .collect();
        Self { entries }
    }

    /// The `document.cookie` view: `name=value` pairs joined by `; `
    pub fn cookie_string(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Apply a `Set-Cookie` string. `Max-Age` of zero or less removes the
    /// cookie; other attributes do not affect what the document sees.
    pub fn apply(&mut self, set_cookie: &str) {
        let mut parts = set_cookie.split(';');
        let Some((name, value)) = parts.next().and_then(|p| p.trim().split_once('=')) else {
            return;
        };

        let expired = parts.any(|attr| {
            attr.trim()
                .split_once('=')
                .filter(|(key, _)| key.eq_ignore_ascii_case("max-age"))
                .and_then(|(_, v)| v.trim().parse::<i64>().ok())
                .is_some_and(|age| age <= 0)
        });

        self.entries.retain(|(existing, _)| existing != name);
        if !expired {
            self.entries.push((name.to_string(), value.to_string()));
        }
    }
}

impl CookieStore for DocumentCookies {
    fn get(&self, name: &str) -> Option<String> {
        parse_cookie(&self.cookie_string(), name)
    }

    fn set(&mut self, name: &str, value: &str, options: &CookieOptions) {
        self.apply(&compose_cookie(name, value, options));
    }

    fn delete(&mut self, name: &str) {
        self.apply(&expired_cookie(name));
    }
}

/// Request/response cookie jar for server-side handlers
#[derive(Debug, Clone, Default)]
pub struct ServerCookies {
    incoming: HeaderMap,
    pending: Vec<(String, Option<String>, String)>,
}

impl ServerCookies {
    /// Jar over the inbound request headers
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut incoming = HeaderMap::new();
        for value in headers.get_all(header::COOKIE) {
            incoming.append(header::COOKIE, value.clone());
        }
        Self {
            incoming,
            pending: Vec::new(),
        }
    }

    /// The queued `Set-Cookie` values, in write order
    pub fn set_cookie_headers(&self) -> Vec<HeaderValue> {
        self.pending
            .iter()
            .filter_map(|(_, _, set_cookie)| HeaderValue::from_str(set_cookie).ok())
            .collect()
    }

    /// Copy the queued `Set-Cookie` headers onto a response
    pub fn write_to(&self, headers: &mut HeaderMap) {
        for value in self.set_cookie_headers() {
            headers.append(header::SET_COOKIE, value);
        }
    }
}

impl CookieStore for ServerCookies {
    fn get(&self, name: &str) -> Option<String> {
        // A write made while handling this request wins over the inbound header
        if let Some((_, value, _)) = self.pending.iter().rev().find(|(n, _, _)| n == name) {
            return value.clone();
        }
        cookie_from_headers(&self.incoming, name)
    }

    fn set(&mut self, name: &str, value: &str, options: &CookieOptions) {
        self.pending.push((
            name.to_string(),
            Some(value.to_string()),
            compose_cookie(name, value, options),
        ));
    }

    fn delete(&mut self, name: &str) {
        self.pending
            .push((name.to_string(), None, expired_cookie(name)));
    }
}

/// Auth cookie policy over any [`CookieStore`]
#[derive(Debug, Clone)]
pub struct AuthSession<S: CookieStore> {
    store: S,
    secure: bool,
    max_age: Duration,
}

impl<S: CookieStore> AuthSession<S> {
    /// `secure` is the production flag; `max_age` should match the token lifetime
    pub fn new(store: S, secure: bool, max_age: Duration) -> Self {
        Self {
            store,
            secure,
            max_age,
        }
    }

    pub fn options(&self) -> CookieOptions {
        CookieOptions {
            path: "/".to_string(),
            max_age: self.max_age.num_seconds(),
            secure: self.secure,
            http_only: true,
            same_site: Some(SameSite::Lax),
        }
    }

    pub fn set_auth_cookie(&mut self, token: &str) {
        let options = self.options();
        self.store.set(AUTH_COOKIE, token, &options);
    }

    pub fn get_auth_token(&self) -> Option<String> {
        self.store.get(AUTH_COOKIE).filter(|token| !token.is_empty())
    }

    /// Safe to call when no cookie is present
    pub fn clear_auth_cookie(&mut self) {
        self.store.delete(AUTH_COOKIE);
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
