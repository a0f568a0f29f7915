use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Explicit bind host. When unset it follows `environment`.
    pub host: Option<String>,
    pub port: u16,
    /// `production` binds every interface, anything else binds localhost
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 5000,
            environment: "development".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn bind_host(&self) -> &str {
        match &self.host {
            Some(host) => host,
            None if self.is_production() => "0.0.0.0",
            None => "localhost",
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host(), self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON-lines file holding the book collection
    pub data_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/books.jsonl"),
        }
    }
}

impl AppConfig {
    /// Load `config.toml` (or `$BOOKSHELF_CONFIG`) if present, then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var("BOOKSHELF_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(environment) = lookup("BOOKSHELF_ENV") {
            self.server.environment = environment;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid PORT value '{port}'"))?;
        }
        if let Some(data_path) = lookup("BOOKSHELF_DATA") {
            self.storage.data_path = PathBuf::from(data_path);
        }
        Ok(())
    }
}
