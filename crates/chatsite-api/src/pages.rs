use std::collections::HashMap;

use axum::{
    Extension,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};

use chatsite_types::models::User;

use crate::error::ApiError;
use crate::middleware::{Session, require_user};
use crate::render::{self, MessageView};
use crate::state::{AppState, with_store};

const UNKNOWN_AUTHOR: &str = "Unknown";

/// GET /: the public room.
pub async fn index(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>, ApiError> {
    let me = require_user(&state, &session).await?;

    let email = me.email.clone();
    let (users, messages, partners) = with_store(&state, move |s| {
        Ok((
            s.list_users()?,
            s.list_public_messages()?,
            s.list_conversation_partners(&email)?,
        ))
    })
    .await?;

    let names: HashMap<&str, &str> = users
        .iter()
        .map(|u| (u.email.as_str(), u.username.as_str()))
        .collect();

    let views: Vec<MessageView> = messages
        .iter()
        .map(|m| {
            let author = names.get(m.author.as_str()).copied().unwrap_or(UNKNOWN_AUTHOR);
            MessageView::new(m, author, m.author == me.email)
        })
        .collect();

    let others: Vec<User> = users
        .iter()
        .filter(|u| u.email != me.email)
        .cloned()
        .collect();
    let conversations: Vec<User> = partners
        .iter()
        .filter_map(|p| users.iter().find(|u| &u.email == p).cloned())
        .collect();

    Ok(render::page(&session, &render::home(&others, &conversations, &views)))
}

/// GET /chat/{username}: private conversation with another user.
pub async fn private_chat(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(username): Path<String>,
) -> Result<Response, ApiError> {
    let me = require_user(&state, &session).await?;

    let partner = with_store(&state, move |s| s.get_user_by_username(&username))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    if partner.email == me.email {
        return Ok(Redirect::to("/").into_response());
    }

    let (a, b) = (me.email.clone(), partner.email.clone());
    let messages = with_store(&state, move |s| s.get_private_messages(&a, &b)).await?;

    let views: Vec<MessageView> = messages
        .iter()
        .map(|m| {
            let author = if m.author == me.email {
                me.username.as_str()
            } else if m.author == partner.email {
                partner.username.as_str()
            } else {
                UNKNOWN_AUTHOR
            };
            MessageView::new(m, author, false)
        })
        .collect();

    Ok(render::page(&session, &render::conversation(&partner, &views)).into_response())
}

/// GET /info
pub async fn info(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>, ApiError> {
    require_user(&state, &session).await?;
    Ok(render::page(&session, &render::info()))
}
