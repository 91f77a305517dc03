use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("email already registered")]
    EmailTaken,

    #[error("username already taken")]
    UsernameTaken,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid conversation participant: {0}")]
    InvalidParticipant(String),

    #[error("conversation file {0} belongs to another pair")]
    ConversationMismatch(String),

    #[error("store lock poisoned: {0}")]
    LockPoisoned(String),
}
