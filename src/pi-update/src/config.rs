//! Update configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::{CURRENT_VERSION, DEFAULT_REGISTRY_URL, PACKAGE_NAME};

/// Registry request timeout.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Install command timeout.
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Where compiled single-file binaries are published.
pub const RELEASE_URL: &str = "https://github.com/badlogic/pi-mono/releases/latest";

/// Environment overrides read by [`UpdateConfig::from_env`].
pub const ENV_REGISTRY_URL: &str = "PI_UPDATE_REGISTRY_URL";
pub const ENV_CACHE_PATH: &str = "PI_UPDATE_CACHE_PATH";
pub const ENV_CURRENT_VERSION: &str = "PI_UPDATE_CURRENT_VERSION";

/// Configuration for the update checker.
///
/// Everything the checker would otherwise take from the process (home
/// directory, installed version, registry host) lives here so tests and
/// embedders can redirect it.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// npm package name of the tool being updated
    pub package_name: String,
    /// Registry base URL, without trailing slash
    pub registry_url: String,
    /// Location of the persisted version cache
    pub cache_path: PathBuf,
    /// Version of the running tool
    pub current_version: String,
    /// Short name used in user-facing messages
    pub app_name: String,
    /// Manual download page for installs that cannot self-update
    pub release_url: String,
    pub fetch_timeout: Duration,
    pub install_timeout: Duration,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            package_name: PACKAGE_NAME.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            cache_path: default_cache_path(),
            current_version: CURRENT_VERSION.to_string(),
            app_name: "pi".to_string(),
            release_url: RELEASE_URL.to_string(),
            fetch_timeout: FETCH_TIMEOUT,
            install_timeout: INSTALL_TIMEOUT,
        }
    }
}

impl UpdateConfig {
    /// Default config with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(ENV_REGISTRY_URL)
            && !url.trim().is_empty()
        {
            config = config.with_registry_url(url);
        }
        if let Ok(path) = std::env::var(ENV_CACHE_PATH)
            && !path.trim().is_empty()
        {
            config = config.with_cache_path(path);
        }
        if let Ok(version) = std::env::var(ENV_CURRENT_VERSION)
            && !version.trim().is_empty()
        {
            config = config.with_current_version(version.trim());
        }

        config
    }

    pub fn with_registry_url(mut self, url: impl Into<String>) -> Self {
        self.registry_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }

    pub fn with_package_name(mut self, name: impl Into<String>) -> Self {
        self.package_name = name.into();
        self
    }

    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_install_timeout(mut self, timeout: Duration) -> Self {
        self.install_timeout = timeout;
        self
    }

    /// URL of the "latest" metadata document for the package.
    pub fn latest_url(&self) -> String {
        format!("{}/{}/latest", self.registry_url, self.package_name)
    }
}

/// `~/.pi/agent/update-cache.json`
fn default_cache_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".pi")
        .join("agent")
        .join("update-cache.json")
}
