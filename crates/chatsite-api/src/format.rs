//! Text helpers for rendering messages into HTML.

use chrono::{DateTime, NaiveDateTime};

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Escape `text`, then render `**bold**` and `*italic*` pairs.
/// A marker without a partner is left as typed.
pub fn format_message(text: &str) -> String {
    let escaped = escape_html(text);
    let tokens = tokenize(&escaped);

    let paired_bold = tokens.iter().filter(|t| matches!(t, Token::Bold)).count() / 2 * 2;
    let paired_italic = tokens.iter().filter(|t| matches!(t, Token::Italic)).count() / 2 * 2;

    let (mut bold_seen, mut italic_seen) = (0, 0);
    let mut out = String::with_capacity(escaped.len() + 16);
    for token in tokens {
        match token {
            Token::Text(t) => out.push_str(t),
            Token::Bold => {
                out.push_str(match bold_seen {
                    n if n >= paired_bold => "**",
                    n if n % 2 == 0 => "<strong>",
                    _ => "</strong>",
                });
                bold_seen += 1;
            }
            Token::Italic => {
                out.push_str(match italic_seen {
                    n if n >= paired_italic => "*",
                    n if n % 2 == 0 => "<em>",
                    _ => "</em>",
                });
                italic_seen += 1;
            }
        }
    }
    out
}

#[derive(Debug, Clone, Copy)]
enum Token<'a> {
    Text(&'a str),
    Bold,
    Italic,
}

/// `**` is always read as one bold marker, a lone `*` as italic.
fn tokenize(text: &str) -> Vec<Token<'_>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let (mut start, mut i) = (0, 0);

    while i < bytes.len() {
        if bytes[i] != b'*' {
            i += 1;
            continue;
        }
        if start < i {
            tokens.push(Token::Text(&text[start..i]));
        }
        if bytes.get(i + 1) == Some(&b'*') {
            tokens.push(Token::Bold);
            i += 2;
        } else {
            tokens.push(Token::Italic);
            i += 1;
        }
        start = i;
    }
    if start < bytes.len() {
        tokens.push(Token::Text(&text[start..]));
    }
    tokens
}

/// Accepts local naive ISO-8601 (with or without fractional seconds, `T` or
/// space separated) and RFC 3339.
pub fn parse_timestamp(timestamp: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(dt.naive_local());
    }
    timestamp
        .parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

/// `1:04 pm` style clock time. Unparseable input is returned unchanged.
pub fn format_time(timestamp: &str) -> String {
    match parse_timestamp(timestamp) {
        Some(dt) => {
            let clock = dt.format("%I:%M %p").to_string().to_lowercase();
            match clock.strip_prefix('0') {
                Some(rest) => rest.to_string(),
                None => clock,
            }
        }
        None => timestamp.to_string(),
    }
}
