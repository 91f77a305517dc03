use std::path::PathBuf;
use std::sync::Arc;

use chatsite_store::Store;
use tracing::error;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Store,
    /// HMAC key for session tokens.
    pub session_secret: Vec<u8>,
    /// Directory uploaded avatars are written to and served from.
    pub pfp_dir: PathBuf,
}

impl AppStateInner {
    pub fn new(store: Store, session_secret: Vec<u8>, pfp_dir: PathBuf) -> std::io::Result<AppState> {
        std::fs::create_dir_all(&pfp_dir)?;
        Ok(Arc::new(Self {
            store,
            session_secret,
            pfp_dir,
        }))
    }
}

/// Run a blocking store call off the async runtime.
pub async fn with_store<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Store) -> chatsite_store::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.store))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .map_err(ApiError::from)
}
