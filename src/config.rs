//! Configuration.
//!
//! Read from `<config dir>/schemaql/config.toml` unless a path is given:
//!
//! ```toml
//! database_url = "postgres://localhost/app"
//! block_list = ["secret_.*", "password"]
//! max_connections = 5
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::catalog::Engine;
use crate::error::{SchemaqlError, SchemaqlResult};

/// Main configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database connection URL
    pub database_url: Option<String>,

    /// Engine; inferred from the URL scheme when absent
    pub engine: Option<Engine>,

    /// Anchored name patterns hidden from compilation
    pub block_list: Vec<String>,

    pub max_connections: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            engine: None,
            block_list: Vec::new(),
            max_connections: 5,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("schemaql").join("config.toml"))
    }

    /// Load from `path`, or from the default location. A missing default
    /// file gives the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> SchemaqlResult<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> SchemaqlResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SchemaqlError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> SchemaqlResult<Self> {
        toml::from_str(content).map_err(|e| SchemaqlError::Config(e.to_string()))
    }

    /// The configured engine, else the one implied by the URL.
    pub fn resolve_engine(&self) -> SchemaqlResult<Engine> {
        if let Some(engine) = self.engine {
            return Ok(engine);
        }
        match &self.database_url {
            Some(url) => Engine::from_url(url),
            None => Err(SchemaqlError::Config(
                "No database URL. Use --database-url or set SCHEMAQL_DATABASE_URL".into(),
            )),
        }
    }
}

/// Builder for Config
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn database(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = Some(url.into());
        self
    }

    pub fn engine(mut self, engine: Engine) -> Self {
        self.config.engine = Some(engine);
        self
    }

    pub fn block(mut self, pattern: impl Into<String>) -> Self {
        self.config.block_list.push(pattern.into());
        self
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.config.max_connections = n;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
