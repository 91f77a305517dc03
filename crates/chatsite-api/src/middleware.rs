use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use chatsite_types::api::SessionClaims;
use chatsite_types::models::User;

use crate::error::ApiError;
use crate::state::{AppState, with_store};

pub const SESSION_COOKIE: &str = "chatsite_session";

const SESSION_DAYS: i64 = 30;

/// The caller's session, attached to every request by [`load_session`].
/// Anonymous when there is no valid cookie.
#[derive(Debug, Clone, Default)]
pub struct Session(pub Option<SessionClaims>);

impl Session {
    pub fn claims(&self) -> Option<&SessionClaims> {
        self.0.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.0.is_some()
    }

    pub fn email(&self) -> Option<&str> {
        self.0.as_ref().map(|c| c.sub.as_str())
    }

    pub fn dark_mode(&self) -> bool {
        self.0.as_ref().is_some_and(|c| c.dark_mode)
    }
}

/// Decode the session cookie, if any, and attach a [`Session`].
/// Never rejects: handlers decide what an anonymous caller gets.
pub async fn load_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let claims = jar.get(SESSION_COOKIE).and_then(|cookie| {
        decode_token(&state.session_secret, cookie.value())
            .inspect_err(|e| debug!("Ignoring invalid session cookie: {}", e))
            .ok()
    });

    req.extensions_mut().insert(Session(claims));
    next.run(req).await
}

/// The logged-in user for a page route. Anonymous callers, and sessions
/// whose user has gone away, get [`ApiError::LoginRequired`].
pub async fn require_user(state: &AppState, session: &Session) -> Result<User, ApiError> {
    let email = session.email().ok_or(ApiError::LoginRequired)?.to_string();
    with_store(state, move |s| s.get_user_by_email(&email))
        .await?
        .ok_or(ApiError::LoginRequired)
}

/// The logged-in user for a JSON route: 401 when anonymous, 404 when the
/// session's user no longer exists.
pub async fn require_user_json(state: &AppState, session: &Session) -> Result<User, ApiError> {
    let email = session.email().ok_or(ApiError::Unauthorized)?.to_string();
    with_store(state, move |s| s.get_user_by_email(&email))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

pub fn create_token(secret: &[u8], user: &User) -> jsonwebtoken::errors::Result<String> {
    let claims = SessionClaims {
        sub: user.email.clone(),
        username: user.username.clone(),
        dark_mode: user.settings.dark_mode,
        exp: (chrono::Utc::now() + chrono::Duration::days(SESSION_DAYS)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

pub fn decode_token(secret: &[u8], token: &str) -> jsonwebtoken::errors::Result<SessionClaims> {
    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Store a fresh session for `user` in the jar.
pub fn start_session(jar: CookieJar, secret: &[u8], user: &User) -> Result<CookieJar, ApiError> {
    let token = create_token(secret, user).map_err(|e| ApiError::Internal(e.to_string()))?;
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(SESSION_DAYS));
    Ok(jar.add(cookie))
}

/// A `Set-Cookie` value that deletes the session cookie.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    cookie.make_removal();
    cookie
}
