use serde::{Deserialize, Serialize};

// -- Session --

/// Claims carried in the session cookie. `sub` is the user's email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub username: String,
    #[serde(default)]
    pub dark_mode: bool,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    pub recipient: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditMessageRequest {
    pub content: String,
}

// -- Settings --

#[derive(Debug, Default, Deserialize)]
pub struct ToggleThemeRequest {
    #[serde(default)]
    pub dark_mode: bool,
}

/// `{"status": "success"}` or `{"status": "error", "message": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            status: "success".into(),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            message: Some(message.into()),
        }
    }
}
