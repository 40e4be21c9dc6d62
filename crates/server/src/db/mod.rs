pub mod models;
pub mod projects;
pub mod tasks;
pub mod users;

use std::{path::Path, str::FromStr, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};

pub use projects::ProjectRepo;
pub use tasks::TaskRepo;
pub use users::UserRepo;

const MAX_CONNECTIONS: u32 = 5;

#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the SQLite database behind `url`.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let parent = options.clone().get_filename().parent().map(Path::to_path_buf);
        if let Some(parent) = parent.filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        tracing::debug!(url, "Database pool ready");

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Takes the first row of a fully drained `RETURNING` result.
///
/// SQLite completes an `INSERT`/`UPDATE ... RETURNING` only after every row has
/// been stepped; a statement read with `fetch_one` stays open on its pooled
/// connection and other connections keep seeing the old data.
pub(crate) fn first_row<T>(rows: Vec<T>) -> Option<T> {
    rows.into_iter().next()
}
