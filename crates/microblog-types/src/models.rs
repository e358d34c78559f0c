use anyhow::Result;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Timestamps keep microsecond precision, the resolution they are stored at.
const TIMESTAMP_PRECISION: u16 = 6;

pub fn truncate_timestamp(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(TIMESTAMP_PRECISION)
}

/// A user account. Built transiently with `User::new` and persisted by the
/// database layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    /// Argon2id PHC string. Never serialized.
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub about_me: Option<String>,
    pub last_seen: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: None,
            password_hash: None,
            about_me: None,
            last_seen: truncate_timestamp(Utc::now()),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_about_me(mut self, about_me: impl Into<String>) -> Self {
        self.about_me = Some(about_me.into());
        self
    }

    /// Replace the stored hash with a fresh salted hash of `plaintext`.
    pub fn set_password(&mut self, plaintext: &str) -> Result<()> {
        self.password_hash = Some(microblog_crypto::hash_password(plaintext)?);
        Ok(())
    }

    /// False when no password has been set.
    pub fn check_password(&self, plaintext: &str) -> bool {
        self.password_hash
            .as_deref()
            .is_some_and(|hash| microblog_crypto::verify_password(plaintext, hash))
    }

    pub fn avatar(&self, size: u32) -> String {
        microblog_crypto::gravatar_url(self.email.as_deref().unwrap_or(""), size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: Uuid,
}

impl Post {
    /// A post by `author`, timestamped now.
    pub fn new(author: &User, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            body: body.into(),
            timestamp: truncate_timestamp(Utc::now()),
            user_id: author.id,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = truncate_timestamp(timestamp);
        self
    }
}
