use axum::{
    Extension, Json,
    extract::{Multipart, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use chatsite_types::api::{StatusResponse, ToggleThemeRequest};
use chatsite_types::models::{GENERATED_AVATAR, User, is_generated_avatar};

use crate::auth::validate_username;
use crate::error::{ApiError, JsonError};
use crate::middleware::{Session, require_user, require_user_json, start_session};
use crate::render;
use crate::state::{AppState, with_store};
use crate::uploads::{self, ProfileForm};

/// GET /settings
pub async fn settings(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>, ApiError> {
    let user = require_user(&state, &session).await?;
    Ok(render::page(&session, &render::settings(&user, session.dark_mode())))
}

/// POST /update-profile: new username and/or picture. Problems are
/// answered as plain-text 400s.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let current = require_user(&state, &session).await?;
    let form = ProfileForm::read(multipart).await?;

    let username = form.field("username").trim().to_string();
    validate_username(&username).map_err(ApiError::BadRequest)?;

    let name = username.clone();
    let existing = with_store(&state, move |s| s.get_user_by_username(&name)).await?;
    if existing.is_some_and(|u| u.email != current.email) {
        return Err(ApiError::BadRequest("Username already taken".into()));
    }

    let mut updated = current.clone();
    updated.username = username;

    // Files written or moved below are undone if the record is not saved.
    let mut saved = None;
    let mut moved = false;
    if let Some(upload) = &form.upload {
        let ext = upload.validate()?;
        let avatar =
            uploads::save_avatar(&state.pfp_dir, &updated.username, &ext, &upload.data).await?;
        updated.profile.avatar = avatar.clone();
        saved = Some(avatar);
    } else if updated.username != current.username && owns_avatar(&state, &current).await? {
        updated.profile.avatar =
            match uploads::move_avatar(&state.pfp_dir, &current.profile.avatar, &updated.username)
                .await?
            {
                Some(avatar) => avatar,
                None => GENERATED_AVATAR.to_string(),
            };
        moved = true;
    }

    let (email, stored) = (current.email.clone(), updated.clone());
    if let Err(e) = with_store(&state, move |s| s.update_user(&email, stored)).await {
        if let Some(avatar) = saved.filter(|a| *a != current.profile.avatar) {
            uploads::discard_avatar(&state, &avatar, Some(current.email.as_str())).await;
        }
        if moved && !is_generated_avatar(&updated.profile.avatar) {
            if let Err(undo) =
                uploads::move_avatar(&state.pfp_dir, &updated.profile.avatar, &current.username).await
            {
                warn!("Could not restore avatar of {}: {}", current.email, undo);
            }
        }
        return Err(e);
    }

    if saved.is_some() && updated.profile.avatar != current.profile.avatar {
        uploads::discard_avatar(&state, &current.profile.avatar, Some(current.email.as_str())).await;
    }

    info!("Updated profile of {}", updated.email);
    let jar = start_session(jar, &state.session_secret, &updated)?;
    Ok((jar, Redirect::to("/settings")).into_response())
}

/// True when `user` has an uploaded avatar nobody else points at, so its
/// file can follow a rename.
async fn owns_avatar(state: &AppState, user: &User) -> Result<bool, ApiError> {
    if user.has_generated_avatar() {
        return Ok(false);
    }
    let avatar = user.profile.avatar.clone();
    let users = with_store(state, move |s| s.users_with_avatar(&avatar)).await?;
    Ok(users.iter().all(|email| *email == user.email))
}

/// POST /toggle-theme: persist the dark-mode switch.
pub async fn toggle_theme(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
    Json(req): Json<ToggleThemeRequest>,
) -> Result<Response, JsonError> {
    let mut user = require_user_json(&state, &session).await?;
    user.settings.dark_mode = req.dark_mode;

    let (email, stored) = (user.email.clone(), user.clone());
    with_store(&state, move |s| s.update_user(&email, stored)).await?;

    let jar = start_session(jar, &state.session_secret, &user)?;
    Ok((jar, Json(StatusResponse::success())).into_response())
}
