use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use thiserror::Error;
use tracing::{info, warn};

use chatsite_types::models::is_generated_avatar;

use crate::error::ApiError;
use crate::state::{AppState, with_store};

/// 2 MB upload limit for profile pictures.
pub const MAX_FILE_SIZE: usize = 2 * 1024 * 1024;

pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Prefix of stored avatar paths; also the URL the pfp directory is served under.
pub const PFP_PREFIX: &str = "pfp";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("File too large (max 2MB)")]
    TooLarge,

    #[error("Invalid file type (only JPG, PNG, GIF allowed)")]
    InvalidType,
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
}

pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    // JPEG: FF D8 FF
    if bytes.len() >= 3 && bytes[..3] == [0xFF, 0xD8, 0xFF] {
        return Some(ImageFormat::Jpeg);
    }
    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if bytes.len() >= 8 && &bytes[..8] == b"\x89PNG\r\n\x1a\n" {
        return Some(ImageFormat::Png);
    }
    // GIF87a / GIF89a
    if bytes.len() >= 6 && (&bytes[..6] == b"GIF87a" || &bytes[..6] == b"GIF89a") {
        return Some(ImageFormat::Gif);
    }
    None
}

/// Lowercased extension after the last dot.
pub fn extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Keep ASCII alphanumerics, `-`, `_` and `.`; drop leading dots.
pub fn secure_filename(name: &str) -> String {
    let kept: String = name
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    kept.trim_start_matches('.').to_string()
}

/// A file part of a multipart form.
#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub data: Bytes,
}

impl Upload {
    /// Size first, then extension, then content signature. Returns the
    /// extension to store the file under.
    pub fn validate(&self) -> Result<String, UploadError> {
        if self.data.len() > MAX_FILE_SIZE {
            return Err(UploadError::TooLarge);
        }
        let ext = extension(&self.file_name)
            .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
            .ok_or(UploadError::InvalidType)?;
        detect_format(&self.data).ok_or(UploadError::InvalidType)?;
        Ok(ext)
    }
}

/// Text fields plus the optional `profile_pic` file of a profile form.
#[derive(Debug, Default)]
pub struct ProfileForm {
    fields: HashMap<String, String>,
    pub upload: Option<Upload>,
}

impl ProfileForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == "profile_pic" {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(bad_form)?;
                // Browsers send an empty part when no file was picked.
                if !file_name.is_empty() && !data.is_empty() {
                    form.upload = Some(Upload { file_name, data });
                }
            } else {
                let value = field.text().await.map_err(bad_form)?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or_default()
    }
}

fn bad_form(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("Rejected oversized form: {}", e);
        return UploadError::TooLarge.into();
    }
    warn!("Rejected multipart form: {}", e);
    ApiError::BadRequest("Invalid form data".into())
}

fn stored_name(username: &str, ext: &str) -> String {
    secure_filename(&format!("{username}.{ext}"))
}

/// Write a validated upload as `<pfp_dir>/<username>.<ext>` and return the
/// avatar path to store on the user.
pub async fn save_avatar(
    pfp_dir: &Path,
    username: &str,
    ext: &str,
    data: &[u8],
) -> Result<String, ApiError> {
    let file_name = stored_name(username, ext);
    let path = pfp_dir.join(&file_name);

    tokio::fs::write(&path, data).await.map_err(|e| {
        ApiError::Internal(format!("failed to write {}: {}", path.display(), e))
    })?;

    info!("Saved avatar {}", path.display());
    Ok(format!("{PFP_PREFIX}/{file_name}"))
}

/// On-disk location of an uploaded avatar. `None` for generated ones.
pub fn avatar_file(pfp_dir: &Path, avatar: &str) -> Option<PathBuf> {
    if is_generated_avatar(avatar) {
        return None;
    }
    let name = avatar.strip_prefix(PFP_PREFIX)?.trim_start_matches('/');
    if name.is_empty() || secure_filename(name) != name {
        return None;
    }
    Some(pfp_dir.join(name))
}

/// Move an uploaded avatar to `<new_username>.<ext>` and return its new
/// avatar path. `None` when there is no file to move.
pub async fn move_avatar(
    pfp_dir: &Path,
    avatar: &str,
    new_username: &str,
) -> Result<Option<String>, ApiError> {
    let (Some(from), Some(ext)) = (avatar_file(pfp_dir, avatar), extension(avatar)) else {
        return Ok(None);
    };
    let file_name = stored_name(new_username, &ext);
    let to = pfp_dir.join(&file_name);

    if to != from {
        match tokio::fs::rename(&from, &to).await {
            Ok(()) => info!("Moved avatar {} -> {}", from.display(), to.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ApiError::Internal(format!(
                    "failed to move {}: {}",
                    from.display(),
                    e
                )));
            }
        }
    }
    Ok(Some(format!("{PFP_PREFIX}/{file_name}")))
}

/// Delete an uploaded avatar file. Missing files are not an error.
pub async fn remove_avatar(pfp_dir: &Path, avatar: &str) {
    let Some(path) = avatar_file(pfp_dir, avatar) else {
        return;
    };
    match tokio::fs::remove_file(&path).await {
        Ok(()) => info!("Removed avatar {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove avatar {}: {}", path.display(), e),
    }
}

/// Remove an uploaded avatar unless a user other than `owner` still points
/// at it.
pub async fn discard_avatar(state: &AppState, avatar: &str, owner: Option<&str>) {
    if is_generated_avatar(avatar) {
        return;
    }
    let lookup = avatar.to_string();
    match with_store(state, move |s| s.users_with_avatar(&lookup)).await {
        Ok(users) if users.iter().all(|email| Some(email.as_str()) == owner) => {
            remove_avatar(&state.pfp_dir, avatar).await;
        }
        Ok(_) => info!("Keeping avatar {}, another user still uses it", avatar),
        Err(e) => warn!("Keeping avatar {}: {}", avatar, e),
    }
}
