// Runtime configuration.
// Reads cache locations, application origin, and build identity from the environment.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use url::Url;

use crate::error::{CacheError, Result};

/// Region name used for the persistent store and the default bucket prefix.
pub const APP_NAME: &str = "rustyclint";

/// Default store name inside the region.
pub const DEFAULT_STORE_NAME: &str = "app-cache-v2";

/// Default origin the application is served from.
pub const DEFAULT_ORIGIN: &str = "http://localhost:5173";

/// Default interval between expired-entry sweeps: 5 minutes.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Get the base cache directory (~/.cache/rustyclint on Linux).
pub fn default_cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.cache_dir().to_path_buf())
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for the persistent store. `None` means memory only.
    pub cache_dir: Option<PathBuf>,
    /// Store name within the region.
    pub store_name: String,
    /// Origin of the running application.
    pub origin: Url,
    /// Fixed build identifier used as the network cache generation tag.
    pub build_id: String,
    /// Interval for the background expiry sweeper.
    pub sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            store_name: DEFAULT_STORE_NAME.to_string(),
            origin: Url::parse(DEFAULT_ORIGIN).expect("default origin is a valid URL"),
            build_id: env!("CARGO_PKG_VERSION").to_string(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl Config {
    /// Load configuration from `RUSTYCLINT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(dir) = lookup("RUSTYCLINT_CACHE_DIR") {
            config.cache_dir = Some(PathBuf::from(dir));
        }

        if let Some(name) = lookup("RUSTYCLINT_STORE_NAME") {
            if name.is_empty() {
                return Err(CacheError::Config("RUSTYCLINT_STORE_NAME is empty".to_string()));
            }
            config.store_name = name;
        }

        if let Some(origin) = lookup("RUSTYCLINT_ORIGIN") {
            config.origin = Url::parse(&origin)
                .map_err(|e| CacheError::Config(format!("RUSTYCLINT_ORIGIN: {}", e)))?;
        }

        if let Some(build_id) = lookup("RUSTYCLINT_BUILD_ID").filter(|id| !id.is_empty()) {
            config.build_id = build_id;
        }

        if let Some(secs) = lookup("RUSTYCLINT_SWEEP_SECS") {
            let secs = secs
                .parse::<u64>()
                .map_err(|e| CacheError::Config(format!("RUSTYCLINT_SWEEP_SECS: {}", e)))?;
            config.sweep_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Directory holding this region's entries, if persistence is enabled.
    pub fn region_dir(&self) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(APP_NAME).join(&self.store_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.store_name, DEFAULT_STORE_NAME);
        assert_eq!(config.origin.as_str(), "http://localhost:5173/");
        assert_eq!(config.build_id, env!("CARGO_PKG_VERSION"));
        assert_eq!(config.sweep_interval, DEFAULT_SWEEP_INTERVAL);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("RUSTYCLINT_CACHE_DIR", "/tmp/rc"),
            ("RUSTYCLINT_STORE_NAME", "test-store"),
            ("RUSTYCLINT_ORIGIN", "https://app.example.com"),
            ("RUSTYCLINT_BUILD_ID", "build-42"),
            ("RUSTYCLINT_SWEEP_SECS", "30"),
        ]))
        .unwrap();

        assert!(config.region_dir().unwrap().ends_with("rustyclint/test-store"));
        assert_eq!(config.origin.host_str(), Some("app.example.com"));
        assert_eq!(config.build_id, "build-42");
        assert_eq!(config.sweep_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_lookup(lookup(&[("RUSTYCLINT_ORIGIN", "not a url")])).is_err());
        assert!(Config::from_lookup(lookup(&[("RUSTYCLINT_SWEEP_SECS", "soon")])).is_err());
        assert!(Config::from_lookup(lookup(&[("RUSTYCLINT_STORE_NAME", "")])).is_err());
    }

    #[test]
    fn test_empty_build_id_keeps_default() {
        let config = Config::from_lookup(lookup(&[("RUSTYCLINT_BUILD_ID", "")])).unwrap();
        assert_eq!(config.build_id, env!("CARGO_PKG_VERSION"));
    }
}
