use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marker stored in `profile.avatar` when the user has no uploaded picture.
pub const GENERATED_AVATAR: &str = "generated";

/// Default avatar path written by older versions. Treated as generated.
pub const LEGACY_DEFAULT_AVATAR: &str = "pfp/default.jpg";

/// Local naive ISO-8601 with microseconds, e.g. `2024-05-01T13:04:05.123456`.
pub fn now_timestamp() -> String {
    Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// True for avatar values that name no uploaded file.
pub fn is_generated_avatar(avatar: &str) -> bool {
    avatar.is_empty() || avatar == GENERATED_AVATAR || avatar == LEGACY_DEFAULT_AVATAR
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string, or plaintext for records written by older versions.
    pub password: String,
    pub profile: Profile,
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub avatar: String,
    pub joined_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub dark_mode: bool,
}

impl User {
    pub fn new(username: String, email: String, password: String, avatar: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            password,
            profile: Profile {
                avatar,
                joined_at: now_timestamp(),
            },
            settings: Settings::default(),
        }
    }

    pub fn has_generated_avatar(&self) -> bool {
        is_generated_avatar(&self.profile.avatar)
    }
}

/// A chat message. Public and private messages share this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    /// Author email.
    pub author: String,
    pub content: String,
    pub timestamp: String,
    #[serde(default)]
    pub edited: bool,
}

impl Message {
    pub fn new(author: String, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            author,
            content,
            timestamp: now_timestamp(),
            edited: false,
        }
    }
}

// -- On-disk documents --

/// `users.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsersDocument {
    #[serde(default)]
    pub users: Vec<User>,
}

/// `msgs.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagesDocument {
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// `private_msgs/<a>-<b>.json`. Participants are sorted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    pub participants: Vec<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    /// The participant that is not `email`, if `email` takes part.
    pub fn partner_of(&self, email: &str) -> Option<&str> {
        if !self.participants.iter().any(|p| p == email) {
            return None;
        }
        self.participants
            .iter()
            .find(|p| p.as_str() != email)
            .map(String::as_str)
    }
}
