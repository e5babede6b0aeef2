use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// SQLite database file, created on first start
    pub database: PathBuf,
    /// Curriculum TOML file; the built-in curriculum is used when unset
    pub curriculum: Option<PathBuf>,
    /// Directory for daily rotated log files; logs go to stdout when unset
    pub log_dir: Option<PathBuf>,
    /// Origins allowed to call the API with credentials
    pub cors_origins: Vec<String>,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sessions expire after this many days without a request
    pub ttl_days: i64,
    pub secure_cookie: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database: PathBuf::from("database/lesson.db"),
            curriculum: None,
            log_dir: None,
            cors_origins: Vec::new(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_days: 5,
            secure_cookie: false,
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(
            &path,
            r#"
port = 3000
cors_origins = ["http://localhost:5173"]

[session]
secure_cookie = true
"#,
        )
        .await
        .unwrap();
        let config = Config::load(&path).await.unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.cors_origins, vec!["http://localhost:5173".to_string()]);
        assert!(config.session.secure_cookie);
        assert_eq!(config.session.ttl_days, 5);
        assert_eq!(config.curriculum, None);
    }

    #[tokio::test]
    async fn empty_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "").await.unwrap();
        assert_eq!(Config::load(&path).await.unwrap(), Config::default());
    }

    #[tokio::test]
    async fn invalid_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "port = \"eighty\"").await.unwrap();
        assert!(Config::load(&path).await.is_err());
        assert!(Config::load(dir.path().join("missing.toml")).await.is_err());
    }
}
