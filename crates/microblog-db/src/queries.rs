use crate::Database;
use crate::error::DbError;
use crate::models::{POST_COLUMNS, PostRow, USER_COLUMNS, UserRow, format_timestamp};
use anyhow::Result;
use chrono::{DateTime, Utc};
use microblog_types::models::truncate_timestamp;
use microblog_types::{Page, Post, User};
use rusqlite::{Connection, Params};
use tracing::debug;
use uuid::Uuid;

/// Posts by the user plus posts by everyone the user follows. Binds ?1.
const FEED_FILTER: &str =
    "p.user_id = ?1 OR p.user_id IN (SELECT followed_id FROM followers WHERE follower_id = ?1)";

/// Equal timestamps fall back to insertion order.
const NEWEST_FIRST: &str = "ORDER BY p.timestamp DESC, p.rowid DESC";

impl Database {
    // -- Users --

    pub fn insert_user(&self, user: &User) -> Result<()> {
        self.transaction(|tx| insert_user(tx, user))
    }

    pub fn update_user(&self, user: &User) -> Result<()> {
        self.transaction(|tx| update_user(tx, user))
    }

    pub fn delete_user(&self, user: &User) -> Result<bool> {
        self.with_conn(|conn| delete_user(conn, user.id))
    }

    /// Record activity at `at`, on both the row and the in-memory user.
    pub fn touch_last_seen(&self, user: &mut User, at: DateTime<Utc>) -> Result<()> {
        let at = truncate_timestamp(at);
        self.with_conn(|conn| touch_last_seen(conn, user.id, at))?;
        user.last_seen = at;
        Ok(())
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| get_user_by_id(conn, id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| get_user_by_username(conn, username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_conn(|conn| get_user_by_email(conn, email))
    }

    // -- Posts --

    pub fn insert_post(&self, post: &Post) -> Result<()> {
        self.transaction(|tx| insert_post(tx, post))
    }

    pub fn posts_by(&self, user: &User) -> Result<Vec<Post>> {
        self.with_conn(|conn| posts_by(conn, user))
    }

    pub fn post_count(&self, user: &User) -> Result<u64> {
        self.with_conn(|conn| post_count(conn, user))
    }

    /// Every post, newest first.
    pub fn explore_page(&self, page: u32) -> Result<Page<Post>> {
        self.with_conn(|conn| explore_page(conn, page, self.posts_per_page()))
    }

    // -- Follows --

    pub fn follow(&self, user: &User, other: &User) -> Result<bool> {
        self.transaction(|tx| follow(tx, user, other))
    }

    pub fn unfollow(&self, user: &User, other: &User) -> Result<bool> {
        self.with_conn(|conn| unfollow(conn, user, other))
    }

    pub fn is_following(&self, user: &User, other: &User) -> Result<bool> {
        self.with_conn(|conn| is_following(conn, user, other))
    }

    pub fn followed(&self, user: &User) -> Result<Vec<User>> {
        self.with_conn(|conn| followed(conn, user))
    }

    pub fn followers(&self, user: &User) -> Result<Vec<User>> {
        self.with_conn(|conn| followers(conn, user))
    }

    pub fn followed_count(&self, user: &User) -> Result<u64> {
        self.with_conn(|conn| followed_count(conn, user))
    }

    pub fn followers_count(&self, user: &User) -> Result<u64> {
        self.with_conn(|conn| followers_count(conn, user))
    }

    // -- Feed --

    pub fn followed_posts(&self, user: &User) -> Result<Vec<Post>> {
        self.with_conn(|conn| followed_posts(conn, user))
    }

    pub fn followed_posts_page(&self, user: &User, page: u32) -> Result<Page<Post>> {
        self.with_conn(|conn| followed_posts_page(conn, user, page, self.posts_per_page()))
    }
}

// -- Users --

pub fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    ensure_unique_identity(conn, user)?;

    conn.execute(
        "INSERT INTO users (id, username, email, password_hash, about_me, last_seen)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            user.id.to_string(),
            user.username,
            user.email,
            user.password_hash,
            user.about_me,
            format_timestamp(&user.last_seen)?,
        ],
    )?;

    debug!("Inserted user {} ({})", user.username, user.id);
    Ok(())
}

pub fn update_user(conn: &Connection, user: &User) -> Result<()> {
    ensure_unique_identity(conn, user)?;

    let changed = conn.execute(
        "UPDATE users
         SET username = ?2, email = ?3, password_hash = ?4, about_me = ?5, last_seen = ?6
         WHERE id = ?1",
        rusqlite::params![
            user.id.to_string(),
            user.username,
            user.email,
            user.password_hash,
            user.about_me,
            format_timestamp(&user.last_seen)?,
        ],
    )?;

    if changed == 0 {
        return Err(DbError::UserNotFound(user.id).into());
    }
    Ok(())
}

/// Deletes the user; their posts and follow edges cascade.
pub fn delete_user(conn: &Connection, id: Uuid) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM users WHERE id = ?1", [id.to_string()])?;
    if deleted > 0 {
        debug!("Deleted user {}", id);
    }
    Ok(deleted > 0)
}

pub fn touch_last_seen(conn: &Connection, id: Uuid, at: DateTime<Utc>) -> Result<()> {
    let changed = conn.execute(
        "UPDATE users SET last_seen = ?2 WHERE id = ?1",
        (id.to_string(), format_timestamp(&at)?),
    )?;

    if changed == 0 {
        return Err(DbError::UserNotFound(id).into());
    }
    Ok(())
}

pub fn get_user_by_id(conn: &Connection, id: Uuid) -> Result<Option<User>> {
    query_user(conn, "u.id = ?1", [id.to_string()])
}

pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    query_user(conn, "u.username = ?1", [username])
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    query_user(conn, "u.email = ?1", [email])
}

// -- Posts --

pub fn insert_post(conn: &Connection, post: &Post) -> Result<()> {
    ensure_user_exists(conn, post.user_id)?;

    conn.execute(
        "INSERT INTO posts (id, body, timestamp, user_id) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            post.id.to_string(),
            post.body,
            format_timestamp(&post.timestamp)?,
            post.user_id.to_string(),
        ],
    )?;

    debug!("Inserted post {} by {}", post.id, post.user_id);
    Ok(())
}

pub fn posts_by(conn: &Connection, user: &User) -> Result<Vec<Post>> {
    let sql = format!(
        "SELECT {} FROM posts p WHERE p.user_id = ?1 {}",
        POST_COLUMNS, NEWEST_FIRST
    );
    query_posts(conn, &sql, [user.id.to_string()])
}

pub fn post_count(conn: &Connection, user: &User) -> Result<u64> {
    count(
        conn,
        "SELECT COUNT(*) FROM posts WHERE user_id = ?1",
        [user.id.to_string()],
    )
}

pub fn explore_page(conn: &Connection, page: u32, per_page: u32) -> Result<Page<Post>> {
    paginate_posts(conn, None, page, per_page)
}

// -- Follows --

/// Adds the edge user -> other. Both users must be persisted. Returns false
/// when the edge already existed or when `other` is `user`.
pub fn follow(conn: &Connection, user: &User, other: &User) -> Result<bool> {
    ensure_user_exists(conn, user.id)?;
    ensure_user_exists(conn, other.id)?;

    if user.id == other.id {
        debug!("Ignoring self-follow by {}", user.username);
        return Ok(false);
    }

    let added = conn.execute(
        "INSERT OR IGNORE INTO followers (follower_id, followed_id) VALUES (?1, ?2)",
        (user.id.to_string(), other.id.to_string()),
    )?;

    if added > 0 {
        debug!("{} now follows {}", user.username, other.username);
    }
    Ok(added > 0)
}

/// Removes the edge user -> other. Returns false when there was none.
pub fn unfollow(conn: &Connection, user: &User, other: &User) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM followers WHERE follower_id = ?1 AND followed_id = ?2",
        (user.id.to_string(), other.id.to_string()),
    )?;

    if removed > 0 {
        debug!("{} unfollowed {}", user.username, other.username);
    }
    Ok(removed > 0)
}

pub fn is_following(conn: &Connection, user: &User, other: &User) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM followers WHERE follower_id = ?1 AND followed_id = ?2)",
        (user.id.to_string(), other.id.to_string()),
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Users `user` follows, by username.
pub fn followed(conn: &Connection, user: &User) -> Result<Vec<User>> {
    let sql = format!(
        "SELECT {} FROM users u
         JOIN followers f ON f.followed_id = u.id
         WHERE f.follower_id = ?1
         ORDER BY u.username",
        USER_COLUMNS
    );
    query_users(conn, &sql, [user.id.to_string()])
}

/// Users following `user`, by username.
pub fn followers(conn: &Connection, user: &User) -> Result<Vec<User>> {
    let sql = format!(
        "SELECT {} FROM users u
         JOIN followers f ON f.follower_id = u.id
         WHERE f.followed_id = ?1
         ORDER BY u.username",
        USER_COLUMNS
    );
    query_users(conn, &sql, [user.id.to_string()])
}

pub fn followed_count(conn: &Connection, user: &User) -> Result<u64> {
    count(
        conn,
        "SELECT COUNT(*) FROM followers WHERE follower_id = ?1",
        [user.id.to_string()],
    )
}

pub fn followers_count(conn: &Connection, user: &User) -> Result<u64> {
    count(
        conn,
        "SELECT COUNT(*) FROM followers WHERE followed_id = ?1",
        [user.id.to_string()],
    )
}

// -- Feed --

pub fn followed_posts(conn: &Connection, user: &User) -> Result<Vec<Post>> {
    let sql = format!(
        "SELECT {} FROM posts p WHERE {} {}",
        POST_COLUMNS, FEED_FILTER, NEWEST_FIRST
    );
    query_posts(conn, &sql, [user.id.to_string()])
}

pub fn followed_posts_page(
    conn: &Connection,
    user: &User,
    page: u32,
    per_page: u32,
) -> Result<Page<Post>> {
    paginate_posts(conn, Some((FEED_FILTER, user.id)), page, per_page)
}

// -- Helpers --

/// Page numbers below 1 are treated as 1, page sizes below 1 as 1. Offsets
/// past what SQLite can bind as an integer just yield an empty page.
fn paginate_posts(
    conn: &Connection,
    filter: Option<(&str, Uuid)>,
    page: u32,
    per_page: u32,
) -> Result<Page<Post>> {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let offset = (u64::from(page - 1) * u64::from(per_page)).min(i64::MAX as u64);

    let (where_clause, params) = match filter {
        Some((clause, id)) => (format!("WHERE {}", clause), vec![id.to_string()]),
        None => (String::new(), vec![]),
    };

    let total = count(
        conn,
        &format!("SELECT COUNT(*) FROM posts p {}", where_clause),
        rusqlite::params_from_iter(params.iter()),
    )?;

    let sql = format!(
        "SELECT {} FROM posts p {} {} LIMIT {} OFFSET {}",
        POST_COLUMNS, where_clause, NEWEST_FIRST, per_page, offset
    );
    let items = query_posts(conn, &sql, rusqlite::params_from_iter(params.iter()))?;

    Ok(Page {
        items,
        page,
        per_page,
        total,
    })
}

/// Username and email must not belong to any other user.
fn ensure_unique_identity(conn: &Connection, user: &User) -> Result<()> {
    let id = user.id.to_string();

    let username_owner: Option<String> = conn
        .query_row(
            "SELECT id FROM users WHERE username = ?1 AND id <> ?2",
            (&user.username, &id),
            |row| row.get(0),
        )
        .optional()?;
    if username_owner.is_some() {
        return Err(DbError::UsernameTaken(user.username.clone()).into());
    }

    if let Some(email) = &user.email {
        let email_owner: Option<String> = conn
            .query_row(
                "SELECT id FROM users WHERE email = ?1 AND id <> ?2",
                (email, &id),
                |row| row.get(0),
            )
            .optional()?;
        if email_owner.is_some() {
            return Err(DbError::EmailTaken(email.clone()).into());
        }
    }

    Ok(())
}

fn ensure_user_exists(conn: &Connection, id: Uuid) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
        [id.to_string()],
        |row| row.get(0),
    )?;

    if !exists {
        return Err(DbError::UserNotFound(id).into());
    }
    Ok(())
}

fn query_user<P: Params>(conn: &Connection, filter: &str, params: P) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users u WHERE {}", USER_COLUMNS, filter);
    let row = conn.query_row(&sql, params, UserRow::from_row).optional()?;
    row.map(UserRow::into_user).transpose()
}

fn query_users<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, UserRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(UserRow::into_user).collect()
}

fn query_posts<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Post>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, PostRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(PostRow::into_post).collect()
}

fn count<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<u64> {
    let n: i64 = conn.query_row(sql, params, |row| row.get(0))?;
    Ok(u64::try_from(n)?)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
