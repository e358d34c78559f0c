use anyhow::{Result, anyhow};
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "microblog.db";
pub const DEFAULT_POSTS_PER_PAGE: u32 = 25;

const MEMORY_PATH: &str = ":memory:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    Memory,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub location: DbLocation,
    pub posts_per_page: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            location: DbLocation::File(DEFAULT_DB_PATH.into()),
            posts_per_page: DEFAULT_POSTS_PER_PAGE,
        }
    }
}

impl DbConfig {
    /// Read `MICROBLOG_DB_PATH` and `MICROBLOG_POSTS_PER_PAGE`, loading
    /// `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let location = match lookup("MICROBLOG_DB_PATH") {
            Some(path) if path == MEMORY_PATH => DbLocation::Memory,
            Some(path) if !path.is_empty() => DbLocation::File(path.into()),
            _ => DbLocation::File(DEFAULT_DB_PATH.into()),
        };

        let posts_per_page = match lookup("MICROBLOG_POSTS_PER_PAGE") {
            Some(raw) => {
                let n: u32 = raw
                    .parse()
                    .map_err(|e| anyhow!("Invalid MICROBLOG_POSTS_PER_PAGE {:?}: {}", raw, e))?;
                if n == 0 {
                    return Err(anyhow!("MICROBLOG_POSTS_PER_PAGE must be at least 1"));
                }
                n
            }
            None => DEFAULT_POSTS_PER_PAGE,
        };

        Ok(Self {
            location,
            posts_per_page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = DbConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, DbConfig::default());
    }

    #[test]
    fn memory_and_file_paths() {
        let config = DbConfig::from_lookup(lookup(&[("MICROBLOG_DB_PATH", ":memory:")])).unwrap();
        assert_eq!(config.location, DbLocation::Memory);

        let config =
            DbConfig::from_lookup(lookup(&[("MICROBLOG_DB_PATH", "/var/lib/app.db")])).unwrap();
        assert_eq!(config.location, DbLocation::File("/var/lib/app.db".into()));
    }

    #[test]
    fn page_size_is_validated() {
        let config =
            DbConfig::from_lookup(lookup(&[("MICROBLOG_POSTS_PER_PAGE", "10")])).unwrap();
        assert_eq!(config.posts_per_page, 10);

        assert!(DbConfig::from_lookup(lookup(&[("MICROBLOG_POSTS_PER_PAGE", "0")])).is_err());
        assert!(DbConfig::from_lookup(lookup(&[("MICROBLOG_POSTS_PER_PAGE", "ten")])).is_err());
    }
}
