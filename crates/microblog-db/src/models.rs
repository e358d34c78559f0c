//! Database row types: these map directly to SQLite rows.
//! Distinct from microblog-types models to keep the DB layer independent.

use anyhow::Result;
use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use microblog_types::{Post, User};
use rusqlite::Row;
use uuid::Uuid;

use crate::error::DbError;

/// Column lists for `users u` / `posts p`, in `from_row` order.
pub const USER_COLUMNS: &str = "u.id, u.username, u.email, u.password_hash, u.about_me, u.last_seen";
pub const POST_COLUMNS: &str = "p.id, p.body, p.timestamp, p.user_id";

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub about_me: Option<String>,
    pub last_seen: String,
}

impl UserRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            about_me: row.get(4)?,
            last_seen: row.get(5)?,
        })
    }

    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: parse_id("users.id", &self.id)?,
            last_seen: parse_timestamp("users.last_seen", &self.last_seen)?,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            about_me: self.about_me,
        })
    }
}

pub struct PostRow {
    pub id: String,
    pub body: String,
    pub timestamp: String,
    pub user_id: String,
}

impl PostRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            body: row.get(1)?,
            timestamp: row.get(2)?,
            user_id: row.get(3)?,
        })
    }

    pub fn into_post(self) -> Result<Post> {
        Ok(Post {
            id: parse_id("posts.id", &self.id)?,
            timestamp: parse_timestamp("posts.timestamp", &self.timestamp)?,
            user_id: parse_id("posts.user_id", &self.user_id)?,
            body: self.body,
        })
    }
}

/// Fixed-width RFC 3339 in UTC, so text order matches time order.
/// Only years 0000-9999 have a four-digit form; anything else is rejected.
pub fn format_timestamp(ts: &DateTime<Utc>) -> Result<String> {
    if !(0..=9999).contains(&ts.year()) {
        return Err(DbError::TimestampOutOfRange(*ts).into());
    }
    Ok(ts.to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn parse_timestamp(column: &'static str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| invalid(column, value))
}

fn parse_id(column: &'static str, value: &str) -> Result<Uuid> {
    value.parse().map_err(|_| invalid(column, value))
}

fn invalid(column: &'static str, value: &str) -> anyhow::Error {
    DbError::InvalidRow {
        column,
        value: value.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_format_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 1).unwrap();
        let later = whole + chrono::Duration::microseconds(500_000);

        let a = format_timestamp(&whole).unwrap();
        let b = format_timestamp(&later).unwrap();
        assert_eq!(a, "2024-01-01T12:00:01.000000Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(parse_timestamp("t", &b).unwrap(), later);
    }

    #[test]
    fn years_without_four_digits_rejected() {
        let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        let err = format_timestamp(&far).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DbError>(),
            Some(DbError::TimestampOutOfRange(ts)) if *ts == far
        ));

        let last = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(format_timestamp(&last).unwrap(), "9999-12-31T23:59:59.000000Z");
    }

    #[test]
    fn bad_row_values_are_typed_errors() {
        let row = PostRow {
            id: "not-a-uuid".into(),
            body: "hi".into(),
            timestamp: "2024-01-01T12:00:01.000000Z".into(),
            user_id: Uuid::new_v4().to_string(),
        };

        let err = row.into_post().unwrap_err();
        match err.downcast_ref::<DbError>() {
            Some(DbError::InvalidRow { column, .. }) => assert_eq!(*column, "posts.id"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
