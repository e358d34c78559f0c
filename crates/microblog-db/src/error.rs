use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Conflicts callers may want to match on. Returned inside `anyhow::Error`;
/// recover with `err.downcast_ref::<DbError>()`.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Timestamp outside years 0000-9999: {0}")]
    TimestampOutOfRange(DateTime<Utc>),

    #[error("DB lock poisoned")]
    LockPoisoned,

    #[error("Invalid {column} in row: {value:?}")]
    InvalidRow { column: &'static str, value: String },
}
