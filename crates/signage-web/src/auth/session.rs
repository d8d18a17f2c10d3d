use std::time::{Duration, Instant};

use axum::http::header::{HeaderValue, COOKIE};
use axum::http::HeaderMap;
use cookie::{Cookie, SameSite};
use dashmap::DashMap;

use super::csrf;

pub const SESSION_COOKIE: &str = "signage_session";

/// Idle lifetime of a session that never logged in.
pub const ANONYMOUS_TTL_SECS: u64 = 15 * 60;

#[derive(Debug, Clone)]
pub struct Session {
    pub csrf_token: String,
    /// Set once the visitor has logged in.
    pub admin_username: Option<String>,
    pub last_seen: Instant,
}

impl Session {
    fn fresh(admin_username: Option<String>) -> Self {
        Self {
            csrf_token: csrf::generate_token(),
            admin_username,
            last_seen: Instant::now(),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.admin_username.is_some()
    }
}

/// Server-side sessions keyed by the id in the session cookie.
///
/// Logged-in sessions expire after `ttl` without activity. Anonymous ones,
/// which any cookieless request can create, get the shorter `anonymous_ttl`.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
    anonymous_ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_seconds: u64) -> Self {
        Self::with_ttls(ttl_seconds, ttl_seconds.min(ANONYMOUS_TTL_SECS))
    }

    pub fn with_ttls(ttl_seconds: u64, anonymous_ttl_seconds: u64) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: Duration::from_secs(ttl_seconds),
            anonymous_ttl: Duration::from_secs(anonymous_ttl_seconds),
        }
    }

    fn is_expired(&self, session: &Session) -> bool {
        let ttl = if session.is_logged_in() {
            self.ttl
        } else {
            self.anonymous_ttl
        };
        session.last_seen.elapsed() > ttl
    }

    /// Starts an anonymous session with its own anti-forgery token.
    pub fn create(&self) -> (String, Session) {
        let session_id = uuid::Uuid::new_v4().to_string();
        let session = Session::fresh(None);
        self.sessions.insert(session_id.clone(), session.clone());
        tracing::debug!("Session created: store_size={}", self.sessions.len());
        (session_id, session)
    }

    /// Looks up a live session and marks it as used.
    pub fn get(&self, session_id: &str) -> Option<Session> {
        let mut entry = self.sessions.get_mut(session_id)?;
        if self.is_expired(&entry) {
            drop(entry);
            self.sessions.remove(session_id);
            tracing::debug!("Session expired");
            return None;
        }
        entry.last_seen = Instant::now();
        Some(entry.clone())
    }

    /// Replaces `old_id` with a new authenticated session.
    ///
    /// Both the id and the anti-forgery token change, so a session id
    /// planted before login is useless afterwards.
    pub fn login(&self, old_id: &str, username: &str) -> (String, Session) {
        self.sessions.remove(old_id);
        let session_id = uuid::Uuid::new_v4().to_string();
        let session = Session::fresh(Some(username.to_string()));
        self.sessions.insert(session_id.clone(), session.clone());
        (session_id, session)
    }

    pub fn set_username(&self, session_id: &str, username: &str) {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            entry.admin_username = Some(username.to_string());
        }
    }

    pub fn remove(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    pub fn cleanup_expired(&self) {
        self.sessions.retain(|_, session| !self.is_expired(session));
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}

/// Session id carried by the request's cookies, if any.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.value().to_string())
}

/// `Set-Cookie` value carrying a session id.
pub fn session_cookie(session_id: &str, secure: bool) -> HeaderValue {
    let cookie = Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build();
    header_value(&cookie)
}

/// `Set-Cookie` value that makes the browser drop the session cookie.
pub fn removal_cookie() -> HeaderValue {
    let mut cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .build();
    cookie.make_removal();
    header_value(&cookie)
}

fn header_value(cookie: &Cookie<'_>) -> HeaderValue {
    // Cookie names and values here are ASCII (uuid / fixed strings).
    HeaderValue::from_str(&cookie.to_string()).unwrap_or_else(|_| HeaderValue::from_static(""))
}
