//! pi Update - version check cache and interactive update flow for pi.
//!
//! Provides:
//! - A persisted "latest known version" cache refreshed in the background
//! - Per-version dismissal that lifts itself once a newer version appears
//! - Install command selection for npm, pnpm, yarn and bun installs
//! - An update prompt driven through host-provided UI and process services
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pi_update::{HookContext, LifecycleEvent, UpdateConfig, UpdateController};
//!
//! let controller = Arc::new(UpdateController::new(UpdateConfig::from_env()));
//!
//! // On session start: answer from the cache, refresh it in the background.
//! controller.handle_lifecycle(LifecycleEvent::SessionStart, &HookContext::with_ui(ui.clone()));
//!
//! // On `/update`: fetch now and offer the install.
//! let outcome = controller.run_update_command(ui.as_ref()).await;
//! ```

mod cache;
mod config;
mod error;
mod host;
mod manager;
mod method;
mod registry;
mod version;

pub use cache::{UpdateCache, VersionCache};
pub use config::{FETCH_TIMEOUT, INSTALL_TIMEOUT, RELEASE_URL, UpdateConfig};
pub use error::{UpdateError, UpdateResult};
pub use host::{
    ExecOutput, HookContext, LifecycleEvent, LoaderHandle, NotifyLevel, ProcessHost,
    TokioProcessHost, UpdateUi,
};
pub use manager::{PromptChoice, UpdateController, UpdateOutcome, UpgradeDecision};
pub use method::{
    EnvironmentSignals, InstallCommand, InstallCommandResolver, PackageManager, RuntimeKind,
};
pub use registry::RegistryClient;
pub use version::{VersionTriple, is_newer};

/// Version of this crate (set at compile time)
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// npm package the checker tracks by default
pub const PACKAGE_NAME: &str = "@mariozechner/pi-coding-agent";

/// Default npm registry URL
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";
