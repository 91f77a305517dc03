use axum::{
    extract::Path,
    http::{StatusCode, header},
    response::IntoResponse,
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha2::{Digest, Sha256};

use chatsite_types::models::User;

use crate::format::escape_html;

/// Background colors for generated avatars. All dark enough for white text.
const PALETTE: &[&str] = &[
    "#4a76a8", "#e5533d", "#2e9e6a", "#8e44ad", "#d35400", "#16a085",
    "#c0392b", "#2c3e50", "#7f8c2d", "#b8336a", "#1f6fb2", "#6d4c41",
];

const SIZE: u32 = 64;

fn digest(username: &str) -> [u8; 32] {
    Sha256::digest(username.as_bytes()).into()
}

pub fn avatar_color(username: &str) -> &'static str {
    let d = digest(username);
    let idx = u16::from_be_bytes([d[0], d[1]]) as usize % PALETTE.len();
    PALETTE[idx]
}

/// First character, uppercased. `?` for an empty name.
pub fn avatar_letter(username: &str) -> String {
    username
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_string())
}

/// Colored circle with the username's initial. Same name, same bytes.
pub fn generate_svg(username: &str) -> String {
    let half = SIZE / 2;
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{SIZE}" height="{SIZE}" viewBox="0 0 {SIZE} {SIZE}"><circle cx="{half}" cy="{half}" r="{half}" fill="{color}"/><text x="50%" y="50%" dy=".35em" text-anchor="middle" font-family="Segoe UI, Helvetica, Arial, sans-serif" font-size="30" font-weight="bold" fill="#ffffff">{letter}</text></svg>"##,
        color = avatar_color(username),
        letter = escape_html(&avatar_letter(username)),
    )
}

/// Everything outside the RFC 3986 unreserved set.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Where the browser should load this user's picture from.
pub fn avatar_url(user: &User) -> String {
    if user.has_generated_avatar() {
        format!("/avatar/{}", encode_path_segment(&user.username))
    } else {
        format!("/{}", user.profile.avatar.trim_start_matches('/'))
    }
}

/// GET /avatar/{username}: generated SVG. A trailing `.svg` is ignored.
pub async fn serve_avatar(Path(name): Path<String>) -> impl IntoResponse {
    let username = name.strip_suffix(".svg").unwrap_or(&name);
    let svg = generate_svg(username);
    let etag = format!("\"{}\"", hex::encode(&Sha256::digest(svg.as_bytes())[..8]));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/svg+xml".to_string()),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
            (header::ETAG, etag),
        ],
        svg,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatsite_types::models::GENERATED_AVATAR;

    #[test]
    fn deterministic_per_username() {
        assert_eq!(generate_svg("alice"), generate_svg("alice"));
        assert_eq!(avatar_color("alice"), avatar_color("alice"));
        assert!(PALETTE.contains(&avatar_color("bob")));
    }

    #[test]
    fn palette_is_spread() {
        let names = ["alice", "bob", "carol", "dave", "erin", "frank", "grace", "heidi"];
        let mut colors: Vec<&str> = names.iter().map(|n| avatar_color(n)).collect();
        colors.sort();
        colors.dedup();
        assert!(colors.len() > 1);
    }

    #[test]
    fn letter_is_uppercased_initial() {
        assert_eq!(avatar_letter("alice"), "A");
        assert_eq!(avatar_letter("élan"), "É");
        assert_eq!(avatar_letter(""), "?");
        assert!(generate_svg("zed").contains(">Z</text>"));
        assert!(generate_svg("<x").contains(">&lt;</text>"));
    }

    #[test]
    fn urls_for_generated_and_uploaded() {
        let mut user = User::new("a b".into(), "ab@x.io".into(), "pw".into(), GENERATED_AVATAR.into());
        assert_eq!(avatar_url(&user), "/avatar/a%20b");

        user.profile.avatar = "pfp/default.jpg".into();
        assert_eq!(avatar_url(&user), "/avatar/a%20b");

        user.profile.avatar = "pfp/ab.png".into();
        assert_eq!(avatar_url(&user), "/pfp/ab.png");
    }

    #[test]
    fn path_segments_keep_unreserved() {
        assert_eq!(encode_path_segment("a.b-c_d~e"), "a.b-c_d~e");
        assert_eq!(encode_path_segment("x/y?z"), "x%2Fy%3Fz");
        assert_eq!(encode_path_segment("é"), "%C3%A9");
    }
}
