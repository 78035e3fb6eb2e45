// src/format.rs
//! Post formatter: one feed entry in, one status payload out.
//!
//! Layout is fixed (golden-tested), blank lines included:
//!
//! ```text
//! {title}[ by {name}][ ({email})]
//!
//! {published}
//!
//! {link}
//!
//! [\n #Tag #Tag...]
//! ```

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::feed::NormalizedEntry;

/// Publish time layout inside a post.
pub const PUBLISHED_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostPayload {
    pub status: String,
    /// Sent as `Idempotency-Key`; stable for the same link and publish time.
    #[serde(skip)]
    pub idempotency_key: String,
}

pub fn format_post(entry: &NormalizedEntry) -> PostPayload {
    let mut byline = String::new();
    if let Some(author) = &entry.author {
        if let Some(name) = author.name.as_deref().filter(|n| !n.is_empty()) {
            byline.push_str(" by ");
            byline.push_str(name);
        }
        if let Some(email) = author.email.as_deref().filter(|e| !e.is_empty()) {
            byline.push_str(" (");
            byline.push_str(email);
            byline.push(')');
        }
    }

    let mut hashtags = String::new();
    if !entry.categories.is_empty() {
        hashtags.push('\n');
        for cat in &entry.categories {
            hashtags.push_str(" #");
            hashtags.push_str(&pascal_case(cat));
        }
    }

    let status = format!(
        "{}{}\n\n{}\n\n{}\n\n{}",
        entry.title,
        byline,
        entry.published_at.format(PUBLISHED_FORMAT),
        entry.link,
        hashtags
    );

    PostPayload {
        status,
        idempotency_key: idempotency_key(entry),
    }
}

/// `tech-news` → `TechNews`, `rust 2024edition` → `Rust2024Edition`.
pub fn pascal_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for word in s.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let mut upper_next = true;
        for c in word.chars() {
            if upper_next && c.is_alphabetic() {
                out.extend(c.to_uppercase());
                upper_next = false;
            } else {
                out.push(c);
                upper_next = c.is_ascii_digit();
            }
        }
    }
    out
}

fn idempotency_key(entry: &NormalizedEntry) -> String {
    let mut hasher = Sha256::new();
    hasher.update(entry.link.as_bytes());
    hasher.update(entry.published_at.to_rfc3339().as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(32);
    for b in digest.iter().take(16) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
