use std::path::Path;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::info;

/// Open (creating if needed) the database file and apply pending migrations
pub async fn connect(path: impl AsRef<Path>) -> anyhow::Result<SqlitePool> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    info!("Opening database {}", path.display());
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let database = SqlitePoolOptions::new().connect_with(options).await?;
    sqlx::migrate!().run(&database).await?;
    Ok(database)
}

/// Single-connection in-memory database; the data lives as long as the pool
#[cfg(test)]
pub async fn memory() -> anyhow::Result<SqlitePool> {
    let options = "sqlite::memory:".parse::<SqliteConnectOptions>()?;
    let database = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    sqlx::migrate!().run(&database).await?;
    Ok(database)
}
