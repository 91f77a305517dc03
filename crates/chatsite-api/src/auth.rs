use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Form,
    extract::{Multipart, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use chatsite_store::StoreError;
use chatsite_types::api::LoginForm;
use chatsite_types::models::{GENERATED_AVATAR, User};

use crate::error::ApiError;
use crate::middleware::{Session, start_session};
use crate::render;
use crate::state::{AppState, with_store};
use crate::uploads::{self, ProfileForm};

// -- Validation --

pub fn validate_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err("Username must be 3-32 characters".into());
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err("Username may only contain letters, digits, '_', '-' and '.'".into());
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err("Invalid email address".into())
    }
}

// -- Passwords --

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// Argon2 PHC strings are verified; anything else is a plaintext password
/// from an older data file and is compared as-is.
pub fn verify_password(stored: &str, candidate: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => stored == candidate,
    }
}

// -- Handlers --

pub async fn login_page(Extension(session): Extension<Session>) -> Response {
    if session.is_logged_in() {
        return Redirect::to("/").into_response();
    }
    render::page(&session, &render::login_form(None)).into_response()
}

pub async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    if session.is_logged_in() {
        return Ok(Redirect::to("/").into_response());
    }

    let email = form.email.trim().to_string();
    let user = with_store(&state, move |s| s.get_user_by_email(&email)).await?;

    match user {
        Some(user) if verify_password(&user.password, &form.password) => {
            info!("User {} logged in", user.email);
            let jar = start_session(jar, &state.session_secret, &user)?;
            Ok((jar, Redirect::to("/")).into_response())
        }
        _ => {
            warn!("Failed login for {}", form.email.trim());
            let body = render::login_form(Some("Invalid email or password"));
            Ok(render::page(&session, &body).into_response())
        }
    }
}

pub async fn register_page(Extension(session): Extension<Session>) -> Response {
    if session.is_logged_in() {
        return Redirect::to("/").into_response();
    }
    render::page(&session, &render::register_form(None)).into_response()
}

pub async fn register(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    if session.is_logged_in() {
        return Ok(Redirect::to("/").into_response());
    }

    let form_error = |message: &str| {
        render::page(&session, &render::register_form(Some(message))).into_response()
    };

    let form = match ProfileForm::read(multipart).await {
        Ok(form) => form,
        Err(ApiError::BadRequest(message)) => return Ok(form_error(&message)),
        Err(e) => return Err(e),
    };
    let username = form.field("username").trim().to_string();
    let email = form.field("email").trim().to_string();
    let password = form.field("password").to_string();

    if let Err(message) = validate_username(&username).and(validate_email(&email)) {
        return Ok(form_error(&message));
    }
    if password.is_empty() {
        return Ok(form_error("Password is required"));
    }

    let (e, u) = (email.clone(), username.clone());
    let (by_email, by_username) = with_store(&state, move |s| {
        Ok((s.get_user_by_email(&e)?, s.get_user_by_username(&u)?))
    })
    .await?;
    if by_email.is_some() {
        return Ok(form_error("Email already registered"));
    }
    if by_username.is_some() {
        return Ok(form_error("Username already taken"));
    }

    let mut avatar = GENERATED_AVATAR.to_string();
    if let Some(upload) = &form.upload {
        let ext = match upload.validate() {
            Ok(ext) => ext,
            Err(e) => return Ok(form_error(&e.to_string())),
        };
        avatar = uploads::save_avatar(&state.pfp_dir, &username, &ext, &upload.data).await?;
    }

    let user = User::new(username, email, hash_password(&password)?, avatar);
    let stored = user.clone();
    match with_store(&state, move |s| s.create_user(stored)).await {
        Ok(()) => {}
        // Lost a race with a concurrent registration.
        Err(ApiError::Store(e @ (StoreError::EmailTaken | StoreError::UsernameTaken))) => {
            uploads::discard_avatar(&state, &user.profile.avatar, None).await;
            return Ok(form_error(&ApiError::Store(e).public_message()));
        }
        Err(e) => return Err(e),
    }

    info!("Registered user {} <{}>", user.username, user.email);
    let jar = start_session(jar, &state.session_secret, &user)?;
    Ok((jar, Redirect::to("/")).into_response())
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (jar.remove(crate::middleware::removal_cookie()), Redirect::to("/login"))
}
