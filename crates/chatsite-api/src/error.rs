use axum::{
    Json,
    http::{StatusCode, header},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use chatsite_store::StoreError;
use chatsite_types::api::StatusResponse;
use thiserror::Error;
use tracing::error;

use crate::middleware::removal_cookie;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// JSON endpoints answer 401.
    #[error("Not logged in")]
    Unauthorized,

    /// Page endpoints clear the session and send the browser to `/login`.
    #[error("Login required")]
    LoginRequired,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::LoginRequired => StatusCode::SEE_OTHER,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::EmailTaken | StoreError::UsernameTaken) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::UserNotFound) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the client. Internal details stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            Self::Store(StoreError::EmailTaken) => "Email already registered".into(),
            Self::Store(StoreError::UsernameTaken) => "Username already taken".into(),
            Self::Store(StoreError::UserNotFound) => "User not found".into(),
            Self::Store(_) | Self::Internal(_) => "Internal server error".into(),
            other => other.to_string(),
        }
    }

    fn log(&self) {
        if self.status().is_server_error() {
            error!("Request failed: {}", self);
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        if let Self::LoginRequired = self {
            return (
                AppendHeaders([(header::SET_COOKIE, removal_cookie().to_string())]),
                Redirect::to("/login"),
            )
                .into_response();
        }
        (self.status(), self.public_message()).into_response()
    }
}

/// Error flavour for JSON endpoints: `{"status": "error", "message": ...}`.
#[derive(Debug)]
pub struct JsonError(pub ApiError);

impl From<ApiError> for JsonError {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl From<StoreError> for JsonError {
    fn from(e: StoreError) -> Self {
        Self(ApiError::Store(e))
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        self.0.log();
        let status = match self.0 {
            ApiError::LoginRequired => StatusCode::UNAUTHORIZED,
            ref other => other.status(),
        };
        (status, Json(StatusResponse::error(self.0.public_message()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_client_messages() {
        let taken = ApiError::from(StoreError::UsernameTaken);
        assert_eq!(taken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(taken.public_message(), "Username already taken");

        let missing = ApiError::from(StoreError::UserNotFound);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.public_message(), "User not found");

        let io = ApiError::from(StoreError::Io(std::io::Error::other("disk on fire")));
        assert_eq!(io.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(io.public_message(), "Internal server error");
    }

    #[test]
    fn login_required_redirects() {
        let resp = ApiError::LoginRequired.into_response();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/login");
        assert!(resp.headers().contains_key(header::SET_COOKIE));
    }

    #[test]
    fn json_flavour_uses_401_for_login() {
        let resp = JsonError(ApiError::LoginRequired).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
