use std::ops::Deref;

use crate::{Database, DbConfig, DbLocation};

/// Fresh in-memory database per test; the whole schema is dropped on teardown.
pub struct TestDb(Database);

impl TestDb {
    pub fn new() -> Self {
        init_tracing();
        Self(Database::open_in_memory().unwrap())
    }

    pub fn with_page_size(posts_per_page: u32) -> Self {
        init_tracing();
        let config = DbConfig {
            location: DbLocation::Memory,
            posts_per_page,
        };
        Self(Database::from_config(&config).unwrap())
    }
}

impl Deref for TestDb {
    type Target = Database;

    fn deref(&self) -> &Database {
        &self.0
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        let _ = self.0.drop_all();
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "microblog_db=debug".into()),
        )
        .with_test_writer()
        .try_init();
}
