//! Runtime configuration.

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::{Error, Result};

/// Connection settings, typically loaded from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQL dialect to render statements for.
    #[serde(default)]
    pub dialect: Dialect,

    /// Connection string handed to the provider. Absent when the caller
    /// constructs the pool itself.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Upper bound on pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            database_url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::config(format!("invalid config: {e}")))
    }
}
