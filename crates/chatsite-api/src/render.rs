//! Server-side HTML. Every page is one layout around a content fragment.

use axum::response::Html;

use chatsite_types::models::{Message, User};

use crate::avatar::{avatar_url, encode_path_segment};
use crate::format::{escape_html, format_message, format_time};
use crate::middleware::Session;

const STYLE: &str = include_str!("../assets/style.css");
const SCRIPT: &str = include_str!("../assets/app.js");

pub const SITE_TITLE: &str = "CHAT SITE";

pub fn page(session: &Session, content: &str) -> Html<String> {
    let body_class = if session.dark_mode() { "dark-mode" } else { "" };
    let account_link = if session.is_logged_in() {
        r#"<a href="/logout" title="Logout">🚪</a>"#
    } else {
        r#"<a href="/login" title="Login">🔑</a>"#
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{SITE_TITLE}</title>
    <style>{STYLE}</style>
</head>
<body class="{body_class}">
    <div class="header">
        <h1>{SITE_TITLE}</h1>
        <div class="nav-icons">
            <a href="/" title="Home">🏠</a>
            <a href="/settings" title="Settings">⚙️</a>
            <a href="/info" title="Info">ℹ️</a>
            {account_link}
        </div>
    </div>
    <div class="container">
{content}
    </div>
    <script>{SCRIPT}</script>
</body>
</html>
"#
    ))
}

fn error_block(error: Option<&str>) -> String {
    error
        .map(|e| format!(r#"<div class="error-message">{}</div>"#, escape_html(e)))
        .unwrap_or_default()
}

pub fn login_form(error: Option<&str>) -> String {
    format!(
        r#"<div class="login-container">
    <h2>Login</h2>
    <form action="/login" method="POST">
        <div class="form-group">
            <label for="email">Email</label>
            <input type="email" id="email" name="email" required>
        </div>
        <div class="form-group">
            <label for="password">Password</label>
            <input type="password" id="password" name="password" required>
        </div>
        {error}
        <button type="submit" class="form-submit">Login</button>
    </form>
    <div class="form-footer">
        Don't have an account? <a href="/register">Register</a>
    </div>
</div>"#,
        error = error_block(error),
    )
}

pub fn register_form(error: Option<&str>) -> String {
    format!(
        r#"<div class="register-container">
    <h2>Register</h2>
    <form action="/register" method="POST" enctype="multipart/form-data">
        <div class="form-group">
            <label for="username">Username</label>
            <input type="text" id="username" name="username" required>
        </div>
        <div class="form-group">
            <label for="email">Email</label>
            <input type="email" id="email" name="email" required>
        </div>
        <div class="form-group">
            <label for="password">Password</label>
            <input type="password" id="password" name="password" required>
        </div>
        <div class="form-group">
            <label for="profile_pic">Profile Picture (optional)</label>
            <input type="file" id="profile_pic" name="profile_pic" accept="image/png,image/jpeg,image/gif">
        </div>
        {error}
        <button type="submit" class="form-submit">Register</button>
    </form>
    <div class="form-footer">
        Already have an account? <a href="/login">Login</a>
    </div>
</div>"#,
        error = error_block(error),
    )
}

/// A message ready to render.
#[derive(Debug)]
pub struct MessageView {
    pub id: String,
    pub author: String,
    pub raw: String,
    pub time: String,
    pub edited: bool,
    /// Show edit/delete controls.
    pub editable: bool,
}

impl MessageView {
    pub fn new(message: &Message, author: &str, editable: bool) -> Self {
        Self {
            id: message.id.clone(),
            author: author.to_string(),
            raw: message.content.clone(),
            time: format_time(&message.timestamp),
            edited: message.edited,
            editable,
        }
    }
}

fn message_list(messages: &[MessageView]) -> String {
    messages
        .iter()
        .map(|m| {
            let id = escape_html(&m.id);
            let edited = if m.edited {
                r#"<span class="message-edited">Edited</span>"#
            } else {
                ""
            };
            let actions = if m.editable {
                format!(
                    r#"<span class="message-actions"><button type="button" onclick="editMessage('{id}')">edit</button><button type="button" onclick="deleteMessage('{id}')">delete</button></span>"#
                )
            } else {
                String::new()
            };
            format!(
                r#"            <div class="message-container" data-message-id="{id}" data-raw="{raw}">
                <div class="message-header">{author} {edited}{actions}</div>
                <div class="message-content">{content}</div>
                <div class="message-time">{time}</div>
            </div>"#,
                raw = escape_html(&m.raw),
                author = escape_html(&m.author),
                content = format_message(&m.raw),
                time = escape_html(&m.time),
            )
        })
        .collect::<Vec<_>>()
        .join("\n            <div class=\"separator\"></div>\n")
}

fn composer(recipient: Option<&str>) -> String {
    let recipient = recipient
        .map(|r| format!(r#" data-recipient="{}""#, escape_html(r)))
        .unwrap_or_default();
    format!(
        r#"        <div class="formatting-buttons">
            <button type="button" class="format-button" id="bold-btn">Bold</button>
            <button type="button" class="format-button" id="italic-btn">Italic</button>
        </div>
        <div class="input-area">
            <textarea class="message-input" id="message-input" placeholder="Type your message..."{recipient}></textarea>
            <button class="send-button" onclick="sendMessage()">Send</button>
        </div>"#
    )
}

fn user_item(user: &User) -> String {
    let name = escape_html(&user.username);
    format!(
        r#"            <li class="user-item">
                <img src="{avatar}" alt="{name}" class="user-pic">
                <span class="user-name">{name}</span>
                <a class="start-chat" href="/chat/{path}">Chat</a>
            </li>"#,
        avatar = escape_html(&avatar_url(user)),
        path = encode_path_segment(&user.username),
    )
}

fn user_list(users: &[User]) -> String {
    users.iter().map(user_item).collect::<Vec<_>>().join("\n")
}

/// Public room: other users, open conversations, the log and a composer.
pub fn home(others: &[User], conversations: &[User], messages: &[MessageView]) -> String {
    let conversations = if conversations.is_empty() {
        String::new()
    } else {
        format!(
            r#"        <h3>Conversations</h3>
        <ul class="user-list">
{}
        </ul>"#,
            user_list(conversations)
        )
    };

    format!(
        r#"<div class="chat-container">
    <div class="sidebar">
        <h3>Online Users</h3>
        <ul class="user-list">
{users}
        </ul>
{conversations}
    </div>
    <div class="chat-area">
        <div class="messages" id="messages">
{messages}
        </div>
{composer}
    </div>
</div>"#,
        users = user_list(others),
        messages = message_list(messages),
        composer = composer(None),
    )
}

/// Two-party conversation page.
pub fn conversation(partner: &User, messages: &[MessageView]) -> String {
    format!(
        r#"<div class="chat-container">
    <div class="sidebar">
        <h3>Private chat</h3>
        <ul class="user-list">
{partner}
        </ul>
        <p><a href="/">Back to public chat</a></p>
    </div>
    <div class="chat-area">
        <div class="messages" id="messages">
{messages}
        </div>
{composer}
    </div>
</div>"#,
        partner = user_item(partner),
        messages = message_list(messages),
        composer = composer(Some(&partner.email)),
    )
}

pub fn settings(user: &User, dark_mode: bool) -> String {
    let name = escape_html(&user.username);
    format!(
        r#"<div class="profile-container">
    <div class="profile-header">
        <img src="{avatar}" alt="{name}" class="profile-pic">
        <div>
            <h2 class="profile-username">{name}</h2>
            <p class="profile-email">{email}</p>
        </div>
    </div>
    <form class="settings-form" action="/update-profile" method="POST" enctype="multipart/form-data">
        <div class="settings-option">
            <label for="username">Username</label>
            <input type="text" id="username" name="username" value="{name}" required>
        </div>
        <div class="settings-option">
            <label for="profile_pic">Profile Picture</label>
            <input type="file" id="profile_pic" name="profile_pic" accept="image/png,image/jpeg,image/gif">
        </div>
        <div class="settings-option theme-toggle">
            <label>Dark Mode</label>
            <label class="switch">
                <input type="checkbox" id="theme-toggle"{checked}>
                <span class="slider"></span>
            </label>
        </div>
        <div class="settings-actions">
            <button type="submit" class="form-submit">Save Changes</button>
        </div>
    </form>
</div>"#,
        avatar = escape_html(&avatar_url(user)),
        email = escape_html(&user.email),
        checked = if dark_mode { " checked" } else { "" },
    )
}

pub fn info() -> String {
    format!(
        r#"<div class="info-container">
    <h2>About {SITE_TITLE}</h2>
    <p>Welcome to {SITE_TITLE}, a small chat application.</p>
    <h3>Features</h3>
    <ul>
        <li>Public chat room for all users</li>
        <li>Private messaging between users</li>
        <li>User profiles with avatars</li>
        <li>Light/dark mode toggle</li>
        <li>Basic text formatting (bold, italic)</li>
    </ul>
    <h3>How to Use</h3>
    <p>1. Register an account or login if you already have one</p>
    <p>2. Join the public chat or start a private conversation</p>
    <p>3. Customize your profile in the settings</p>
    <h3>Technical Details</h3>
    <ul>
        <li>Rust backend on axum and tokio</li>
        <li>Server-rendered HTML with a little vanilla JavaScript</li>
        <li>JSON files for storage</li>
    </ul>
</div>"#
    )
}
