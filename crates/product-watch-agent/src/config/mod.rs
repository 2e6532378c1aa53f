//! Configuration loading and path resolution.

use std::path::{Path, PathBuf};

use product_watch::WatchConfig;

use crate::types::AgentResult;

pub const ENV_CONFIG_PATH: &str = "PRODUCT_WATCH_CONFIG";
pub const ENV_STORE_PATH: &str = "PRODUCT_WATCH_STORE";

const LOCAL_DIR: &str = ".product-watch";
const CONFIG_FILE: &str = "config.json";
const STORE_FILE: &str = "state.json";

/// Resolve the config file path. `None` means run on built-in defaults.
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        return Some(PathBuf::from(env_path));
    }

    let cwd_config = Path::new(LOCAL_DIR).join(CONFIG_FILE);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    let home_config = home_dir().join(LOCAL_DIR).join(CONFIG_FILE);
    home_config.exists().then_some(home_config)
}

/// Resolve the durable store path.
pub fn resolve_store_path(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    if let Ok(env_path) = std::env::var(ENV_STORE_PATH) {
        return PathBuf::from(env_path);
    }

    let cwd_dir = Path::new(LOCAL_DIR);
    if cwd_dir.is_dir() {
        return cwd_dir.join(STORE_FILE);
    }

    home_dir().join(LOCAL_DIR).join(STORE_FILE)
}

/// Load the config file if there is one, then apply environment overrides.
pub fn load_config(path: Option<&Path>) -> AgentResult<WatchConfig> {
    let config = match path {
        Some(path) => {
            tracing::info!("Loading config from {}", path.display());
            WatchConfig::from_file(path)?
        }
        None => {
            tracing::debug!("No config file, using defaults");
            WatchConfig::default()
        }
    };
    Ok(config.with_env_overrides())
}

fn home_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
}
