pub mod auth;
pub mod avatar;
pub mod error;
pub mod format;
pub mod messages;
pub mod middleware;
pub mod pages;
pub mod profile;
pub mod render;
pub mod state;
pub mod uploads;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_http::services::ServeDir;

pub use state::{AppState, AppStateInner};

/// Room for a maximum-size picture plus the other form fields. Larger
/// pictures are read and then refused with the upload error message.
const MAX_BODY_SIZE: usize = 4 * uploads::MAX_FILE_SIZE;

/// All routes, with the session layer applied.
pub fn router(state: AppState) -> Router {
    let pfp = ServeDir::new(&state.pfp_dir);

    Router::new()
        .route("/", get(pages::index))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", get(auth::logout))
        .route("/settings", get(profile::settings))
        .route("/update-profile", post(profile::update_profile))
        .route("/toggle-theme", post(profile::toggle_theme))
        .route("/info", get(pages::info))
        .route("/chat/{username}", get(pages::private_chat))
        .route("/send-message", post(messages::send_message))
        .route("/messages/{id}/edit", post(messages::edit_message))
        .route("/messages/{id}/delete", post(messages::delete_message))
        .route("/avatar/{username}", get(avatar::serve_avatar))
        .nest_service("/pfp", pfp)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(from_fn_with_state(state.clone(), middleware::load_session))
        .with_state(state)
}
