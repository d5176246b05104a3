pub mod ask;
pub mod doctor;
pub mod inspect;
pub mod serve;

use std::path::Path;

use askfolio_config::{AppConfig, DEFAULT_CONFIG_FILE};
use tracing::debug;

/// Load config from `path` (or the default file) with environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let path = path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
    debug!(path = %path.display(), exists = path.exists(), "Loading config");
    let config = AppConfig::load_with_env(path).map_err(|e| format!("Failed to load config: {e}"))?;
    Ok(config)
}
