use axum::{
    Extension, Json,
    extract::{Path, State},
};
use tracing::debug;

use chatsite_types::api::{EditMessageRequest, SendMessageRequest, StatusResponse};
use chatsite_types::models::{Message, User};

use crate::error::{ApiError, JsonError};
use crate::middleware::{Session, require_user_json};
use crate::state::{AppState, with_store};

/// POST /send-message: to the public log, or to one recipient when
/// `is_private` is set and a recipient is given.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<StatusResponse>, JsonError> {
    if !session.is_logged_in() {
        return Err(ApiError::Unauthorized.into());
    }

    let content = req.content.unwrap_or_default();
    if content.trim().is_empty() {
        return Err(ApiError::BadRequest("Message content required".into()).into());
    }

    let user = require_user_json(&state, &session).await?;
    let message = Message::new(user.email.clone(), content);

    match req.recipient.filter(|r| req.is_private && !r.is_empty()) {
        Some(recipient) => {
            if recipient == user.email {
                return Err(ApiError::BadRequest("Cannot send a private message to yourself".into()).into());
            }
            let lookup = recipient.clone();
            with_store(&state, move |s| s.get_user_by_email(&lookup))
                .await?
                .ok_or_else(|| ApiError::NotFound("Recipient not found".into()))?;

            debug!("Private message {} -> {}", user.email, recipient);
            let from = user.email;
            with_store(&state, move |s| s.add_private_message(&from, &recipient, message)).await?;
        }
        None => {
            with_store(&state, move |s| s.add_public_message(message)).await?;
        }
    }

    Ok(Json(StatusResponse::success()))
}

/// Load a public message and check that `user` wrote it.
async fn own_message(state: &AppState, user: &User, id: String) -> Result<Message, ApiError> {
    let message = with_store(state, move |s| s.get_public_message(&id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Message not found".into()))?;
    if message.author != user.email {
        return Err(ApiError::Forbidden("You can only change your own messages".into()));
    }
    Ok(message)
}

/// POST /messages/{id}/edit
pub async fn edit_message(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(req): Json<EditMessageRequest>,
) -> Result<Json<StatusResponse>, JsonError> {
    let user = require_user_json(&state, &session).await?;
    if req.content.trim().is_empty() {
        return Err(ApiError::BadRequest("Message content required".into()).into());
    }

    let message = own_message(&state, &user, id).await?;
    let found = with_store(&state, move |s| s.update_public_message(&message.id, &req.content)).await?;
    if !found {
        return Err(ApiError::NotFound("Message not found".into()).into());
    }

    Ok(Json(StatusResponse::success()))
}

/// POST /messages/{id}/delete
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, JsonError> {
    let user = require_user_json(&state, &session).await?;

    let message = own_message(&state, &user, id).await?;
    let found = with_store(&state, move |s| s.delete_public_message(&message.id)).await?;
    if !found {
        return Err(ApiError::NotFound("Message not found".into()).into());
    }

    Ok(Json(StatusResponse::success()))
}
