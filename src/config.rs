use crate::error::{NetSalesError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Deployment settings of the dashboard, conventionally a `config.json`
/// next to the binary. Unknown fields are tolerated so the file can carry
/// settings for other layers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// SHA-256 digests of accepted passwords, feeding
    /// [`crate::auth::PasswordGate`].
    #[serde(default)]
    pub keys: Vec<String>,

    /// Sales API base URL. Overridden by the `BASE_URL` environment
    /// variable.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Sellers preselected in the sales-team view.
    #[serde(default)]
    pub default_sellers: Vec<String>,

    /// NITs of medical-sample accounts, excluded from "sin muestras"
    /// totals and from the products view.
    #[serde(default)]
    pub sample_payee_nits: Vec<String>,
}

impl DashboardConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|error| NetSalesError::Config(format!("{}: {}", path.display(), error)))
    }

    pub fn from_json(document: &str) -> Result<Self> {
        Ok(serde_json::from_str(document)?)
    }

    /// The API base URL to use, trailing slash stripped. The `BASE_URL`
    /// environment variable wins over the configured value.
    pub fn resolved_base_url(&self) -> Result<String> {
        if let Ok(url) = env::var("BASE_URL") {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.trim_end_matches('/').to_string());
            }
        }
        match self.base_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url.trim_end_matches('/').to_string()),
            _ => Err(NetSalesError::Config(
                "no base URL configured; set BASE_URL or base_url".to_string(),
            )),
        }
    }
}
