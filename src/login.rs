use crate::app::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Login request body
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub ok: bool,
    pub message: String,
}

/// An authenticated session
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub expires_at: SystemTime,
}

/// Global sessions storage
///
/// Stores all active sessions in a thread-safe map. Sessions live in memory
/// only; a restart logs everyone out.
lazy_static! {
    static ref SESSIONS: RwLock<HashMap<String, Session>> = RwLock::new(HashMap::new());
}

const SESSION_COOKIE: &str = "session";
const SESSION_DURATION: u64 = 8 * 60 * 60; // 8 hours in seconds

/// Check a username/password pair against the configured credential pairs
///
/// # Arguments
/// * `credentials` - The configured `(user, pass)` pairs
/// * `username` - Submitted username
/// * `password` - Submitted password
///
/// # Returns
/// * `bool` - True when the pair matches any configured pair
pub fn verify_credentials(
    credentials: &[(String, String)],
    username: &str,
    password: &str,
) -> bool {
    credentials
        .iter()
        .any(|(user, pass)| user == username && pass == password)
}

/// Create a new session for an authenticated user
///
/// # Arguments
/// * `username` - The username to create a session for
///
/// # Returns
/// * `String` - A unique session ID
pub fn create_session(username: &str) -> String {
    let session_id = Uuid::new_v4().to_string();
    let expires_at = SystemTime::now() + Duration::from_secs(SESSION_DURATION);

    let session = Session {
        user_id: username.to_string(),
        expires_at,
    };

    let mut sessions = SESSIONS.write().unwrap();
    sessions.insert(session_id.clone(), session);

    session_id
}

/// Validate a session
///
/// # Arguments
/// * `session_id` - The session ID to validate
///
/// # Returns
/// * `Option<String>` - The username for the session if valid and unexpired
pub fn validate_session(session_id: &str) -> Option<String> {
    let sessions = SESSIONS.read().unwrap();

    if let Some(session) = sessions.get(session_id) {
        if session.expires_at > SystemTime::now() {
            return Some(session.user_id.clone());
        }
    }

    None
}

fn drop_session(session_id: &str) {
    let mut sessions = SESSIONS.write().unwrap();
    sessions.remove(session_id);
}

/// Handle login requests
///
/// Compares the submitted pair against the environment-configured
/// credentials; on success sets an HTTP-only session cookie valid for 8
/// hours, on failure returns 401 with a message the login page surfaces
/// inline.
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(credentials): Json<Credentials>,
) -> Response {
    if verify_credentials(
        &state.config.credentials,
        &credentials.username,
        &credentials.password,
    ) {
        let session_id = create_session(&credentials.username);
        let mut cookie = Cookie::new(SESSION_COOKIE, session_id);
        cookie.set_http_only(true);
        cookie.set_path("/");
        cookie.set_same_site(SameSite::Lax);
        (
            jar.add(cookie),
            Json(LoginResponse {
                ok: true,
                message: "logged in".to_string(),
            }),
        )
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(LoginResponse {
                ok: false,
                message: "Invalid username or password".to_string(),
            }),
        )
            .into_response()
    }
}

/// Handle logout: drop the session and clear the cookie
pub async fn handle_logout(jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        drop_session(cookie.value());
    }
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    (jar.add(cookie), Redirect::to("/login"))
}

// Paths reachable without a session: the login page and endpoint, static
// assets, shared dashboards, and the read-only data endpoints the display
// screens poll.
fn is_public_path(path: &str) -> bool {
    const PUBLIC_EXACT: &[&str] = &[
        "/login",
        "/api/login",
        "/favicon.ico",
        "/api/data",
        "/api/technical",
        "/api/supply",
        "/api/events",
        "/api/news",
        "/api/news-en",
        "/api/rates",
    ];
    const PUBLIC_PREFIX: &[&str] = &["/static/", "/share/"];

    PUBLIC_EXACT.contains(&path) || PUBLIC_PREFIX.iter().any(|prefix| path.starts_with(prefix))
}

/// Page-gating middleware
///
/// Everything outside the allow-list requires a valid session; requests
/// without one are redirected to `/login?next=<original path>` so the login
/// page can send the user back where they were headed.
pub async fn require_auth(
    jar: CookieJar,
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let path = request.uri().path().to_string();

    if is_public_path(&path) {
        return next.run(request).await;
    }

    if let Some(session_cookie) = jar.get(SESSION_COOKIE) {
        if let Some(username) = validate_session(session_cookie.value()) {
            request.extensions_mut().insert(username);
            return next.run(request).await;
        }
    }

    let target = format!("/login?next={}", urlencoding::encode(&path));
    Redirect::to(&target).into_response()
}
