use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use lesson_server::{
    api::{self, ApiDoc, AppState},
    config::Config,
    curriculum::Catalog,
    db,
    utils::init_log,
};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Path to database file
    #[arg(short, long)]
    database: Option<PathBuf>,
    /// Path to a curriculum TOML file
    #[arg(long)]
    curriculum: Option<PathBuf>,
    #[arg(short = 'H', long)]
    host: Option<String>,
    #[arg(short, long)]
    port: Option<u16>,
    /// Directory for log files
    #[arg(short, long)]
    log_dir: Option<PathBuf>,
}

impl Args {
    async fn into_config(self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path).await?,
            None => Config::default(),
        };
        if let Some(database) = self.database {
            config.database = database;
        }
        if let Some(curriculum) = self.curriculum {
            config.curriculum = Some(curriculum);
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(log_dir) = self.log_dir {
            config.log_dir = Some(log_dir);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = Args::parse().into_config().await?;
    let _guard = init_log(config.log_dir.clone())?;

    let catalog = match &config.curriculum {
        Some(path) => Catalog::load(path).await?,
        None => Catalog::builtin()?,
    };
    info!(
        "Curriculum: {} chapters, {} lessons",
        catalog.chapters().len(),
        catalog.len()
    );

    let database = db::connect(&config.database).await?;
    let session_store = SqliteStore::new(database.clone());
    session_store.migrate().await?;

    let addr = (config.host.clone(), config.port);
    let state = Arc::new(AppState {
        database,
        catalog,
        config,
    });
    let app = api::app(state, session_store)?
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Starting server at http://{}", listener.local_addr()?);
    info!("Swagger UI available at http://{}/swagger-ui/", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
