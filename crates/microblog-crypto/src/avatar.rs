use md5::{Digest, Md5};

pub const GRAVATAR_BASE: &str = "https://www.gravatar.com/avatar/";

/// Fallback image gravatar renders for unknown email hashes.
pub const DEFAULT_IMAGE: &str = "identicon";

/// Hex MD5 of the normalized (trimmed, lowercased) email.
pub fn email_digest(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    hex::encode(Md5::digest(normalized.as_bytes()))
}

/// Gravatar URL for an email at the requested pixel size.
pub fn gravatar_url(email: &str, size: u32) -> String {
    format!(
        "{}{}?id={}&s={}",
        GRAVATAR_BASE,
        email_digest(email),
        DEFAULT_IMAGE,
        size
    )
}
