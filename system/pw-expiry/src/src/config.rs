use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::account_db::DEFAULT_SHADOW_PATH;
use crate::error::ExpiryError;
use crate::report::ReportFormat;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/pw_expiry/config.toml";

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct PwExpiryConfig {
    pub core: CoreConfig,
    pub report: ReportConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    pub shadow_path: String,
    pub log_level: String,
    pub strict: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            shadow_path: DEFAULT_SHADOW_PATH.to_string(),
            log_level: "warn".to_string(),
            strict: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    pub format: ReportFormat,
    pub all: bool,
    pub only_notify: bool,
}

impl PwExpiryConfig {
    pub async fn build_from(path: &str) -> Result<Self> {
        let cfg = fs::read_to_string(path)
            .await
            .with_context(|| format!("read config {}", path))?;
        toml::from_str(&cfg).or_else(|e: toml::de::Error| {
            Err(ExpiryError::Config {
                path: path.into(),
                reason: e.to_string(),
            }
            .into())
        })
    }

    /// An explicit path must load; without one the default path is used
    /// when present, built-in defaults otherwise.
    pub async fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::build_from(path).await,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::build_from(DEFAULT_CONFIG_PATH).await
            }
            None => {
                debug!("{} absent, built-in defaults", DEFAULT_CONFIG_PATH);
                Ok(Self::default())
            }
        }
    }
}
