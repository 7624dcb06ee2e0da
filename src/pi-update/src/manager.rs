//! Update controller - decides when to prompt and drives the update flow.
//!
//! Passive checks (session start/switch) answer from the cache only, so they
//! never wait on the network, and kick off a detached refresh that warms the
//! cache for the next run. The explicit `update` command fetches in the
//! foreground and always offers the prompt when a newer version exists, even
//! one the user previously dismissed.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use crate::cache::{UpdateCache, VersionCache};
use crate::config::UpdateConfig;
use crate::host::{
    HookContext, LifecycleEvent, NotifyLevel, ProcessHost, TokioProcessHost, UpdateUi,
};
use crate::method::{EnvironmentSignals, InstallCommand, InstallCommandResolver, PackageManager};
use crate::registry::RegistryClient;
use crate::version::is_newer;

/// Whether a passive check should prompt, and why not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeDecision {
    /// Nothing cached yet
    NoCache,
    /// Cached version is not newer than the running one
    UpToDate,
    /// Newer version exists but the user skipped it
    Dismissed(String),
    /// Newer version exists and should be offered
    Prompt(String),
}

impl UpgradeDecision {
    /// Decide from a cache snapshot and the running version.
    pub fn evaluate(cache: Option<&VersionCache>, current_version: &str) -> Self {
        let Some(cache) = cache else {
            return Self::NoCache;
        };
        if !is_newer(&cache.latest_version, current_version) {
            return Self::UpToDate;
        }
        if cache.is_dismissed() {
            return Self::Dismissed(cache.latest_version.clone());
        }
        Self::Prompt(cache.latest_version.clone())
    }

    /// The version to offer, if any.
    pub fn prompt_version(&self) -> Option<&str> {
        match self {
            Self::Prompt(version) => Some(version),
            _ => None,
        }
    }
}

/// Choices offered by the update prompt, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    UpdateNow,
    Skip,
    SkipThisVersion,
}

impl PromptChoice {
    pub const ALL: [PromptChoice; 3] = [Self::UpdateNow, Self::Skip, Self::SkipThisVersion];

    /// Menu label; the install option shows the command it will run.
    pub fn label(&self, command: &InstallCommand) -> String {
        match self {
            Self::UpdateNow => format!("Update now ({command})"),
            Self::Skip => "Skip".to_string(),
            Self::SkipThisVersion => "Skip this version".to_string(),
        }
    }

    fn from_label(label: &str, command: &InstallCommand) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label(command) == label)
    }
}

/// Where an update flow ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Install succeeded; `restarted` is true if the user chose to shut down
    Installed { version: String, restarted: bool },
    /// User skipped for now
    Skipped,
    /// User skipped this version for good
    Dismissed { version: String },
    /// Self-update is impossible; manual instructions were shown
    ManualInstructions,
    /// Install command failed or could not run
    Failed,
    /// User stopped waiting
    Cancelled,
    /// Explicit check found nothing newer
    AlreadyLatest,
    /// Explicit check could not get an answer from the registry
    Unreachable,
}

/// Orchestrates the cache, registry, resolver and host.
pub struct UpdateController {
    config: UpdateConfig,
    cache: UpdateCache,
    registry: RegistryClient,
    resolver: InstallCommandResolver,
    process: Arc<dyn ProcessHost>,
    background: TaskTracker,
}

impl UpdateController {
    /// Create a controller for the running process.
    pub fn new(config: UpdateConfig) -> Self {
        Self::with_host(config, EnvironmentSignals::detect(), Arc::new(TokioProcessHost))
    }

    /// Create with explicit environment signals and process host.
    pub fn with_host(
        config: UpdateConfig,
        signals: EnvironmentSignals,
        process: Arc<dyn ProcessHost>,
    ) -> Self {
        let cache = UpdateCache::new(config.cache_path.clone());
        let registry = RegistryClient::new(&config);
        let resolver =
            InstallCommandResolver::new(&config.package_name, &config.release_url, signals);

        Self {
            config,
            cache,
            registry,
            resolver,
            process,
            background: TaskTracker::new(),
        }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    pub fn cache(&self) -> &UpdateCache {
        &self.cache
    }

    /// Get the detected package manager.
    pub fn package_manager(&self) -> PackageManager {
        self.resolver.package_manager()
    }

    /// Command that would install `version`.
    pub fn install_command(&self, version: &str) -> InstallCommand {
        self.resolver.resolve(version)
    }

    /// Decide from the cache alone, without refreshing it.
    pub fn decide(&self) -> UpgradeDecision {
        UpgradeDecision::evaluate(self.cache.read().as_ref(), &self.config.current_version)
    }

    /// Version to offer right now, if any.
    ///
    /// Answers from the cache synchronously and, whatever the answer, starts
    /// a background refresh whose result is only seen by later calls.
    pub fn get_upgrade_version(&self) -> Option<String> {
        let decision = self.decide();
        let _ = self.spawn_refresh();

        tracing::debug!(?decision, "Passive update check");
        match decision {
            UpgradeDecision::Prompt(version) => Some(version),
            _ => None,
        }
    }

    /// Fetch the latest version and persist it in the background.
    ///
    /// The dismissal is read again when the result is written, so a skip
    /// issued while the request was in flight survives. The handle may be
    /// dropped; the task keeps running.
    pub fn spawn_refresh(&self) -> JoinHandle<()> {
        let registry = self.registry.clone();
        let cache = self.cache.clone();

        self.background.spawn(async move {
            if let Some(latest) = registry.fetch_latest().await {
                let stored = cache.record_latest(&latest);
                tracing::debug!("Refreshed update cache: {:?}", stored);
            }
        })
    }

    /// Wait for every background refresh started so far.
    ///
    /// Only needed by hosts about to exit; long-running hosts can ignore
    /// refreshes entirely.
    pub async fn wait_for_background(&self) {
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }

    /// Skip `version` on future passive checks.
    pub fn dismiss(&self, version: &str) {
        self.cache.dismiss(version);
    }

    /// Lifecycle hook for session start and session switch.
    ///
    /// Does nothing without an interactive surface. Otherwise returns
    /// immediately; if the cache says an update is due, the prompt runs on a
    /// spawned task whose handle the caller is free to drop.
    pub fn handle_lifecycle(
        self: &Arc<Self>,
        event: LifecycleEvent,
        ctx: &HookContext,
    ) -> Option<JoinHandle<UpdateOutcome>> {
        let ui = Arc::clone(ctx.ui()?);
        tracing::debug!(?event, "Lifecycle update check");

        let latest = self.get_upgrade_version()?;
        let controller = Arc::clone(self);
        Some(tokio::spawn(async move {
            controller.show_update_prompt(ui.as_ref(), &latest).await
        }))
    }

    /// The explicit `update` command.
    ///
    /// Fetches in the foreground, records the result (keeping any dismissal)
    /// and prompts when the registry has something newer, ignoring the
    /// dismissal.
    pub async fn run_update_command(&self, ui: &dyn UpdateUi) -> UpdateOutcome {
        let registry = self.registry.clone();
        let fetch = tokio::spawn(async move { registry.fetch_latest().await });

        let Some(latest) = wait_with_loader(ui, "Checking for updates...", fetch)
            .await
            .flatten()
        else {
            ui.notify("Could not reach npm registry.", NotifyLevel::Error);
            return UpdateOutcome::Unreachable;
        };

        self.cache.record_latest(&latest);

        if !is_newer(&latest, &self.config.current_version) {
            ui.notify(
                &format!(
                    "Already on latest version ({}).",
                    self.config.current_version
                ),
                NotifyLevel::Info,
            );
            return UpdateOutcome::AlreadyLatest;
        }

        self.show_update_prompt(ui, &latest).await
    }

    /// Offer to install `latest`.
    pub async fn show_update_prompt(&self, ui: &dyn UpdateUi, latest: &str) -> UpdateOutcome {
        let command = self.resolver.resolve(latest);
        let options: Vec<String> = PromptChoice::ALL
            .iter()
            .map(|choice| choice.label(&command))
            .collect();
        let title = format!("Update {} → {}", self.config.current_version, latest);

        let choice = ui
            .select(&title, &options)
            .await
            .and_then(|label| PromptChoice::from_label(&label, &command));

        match choice {
            None | Some(PromptChoice::Skip) => UpdateOutcome::Skipped,
            Some(PromptChoice::SkipThisVersion) => {
                self.dismiss(latest);
                UpdateOutcome::Dismissed {
                    version: latest.to_string(),
                }
            }
            Some(PromptChoice::UpdateNow) => self.install(ui, latest, command).await,
        }
    }

    /// Run the install command, then offer to shut down.
    async fn install(
        &self,
        ui: &dyn UpdateUi,
        latest: &str,
        command: InstallCommand,
    ) -> UpdateOutcome {
        let (program, args) = match command {
            InstallCommand::Exec { program, args } => (program, args),
            InstallCommand::Manual { instructions } => {
                ui.notify(&instructions, NotifyLevel::Info);
                return UpdateOutcome::ManualInstructions;
            }
        };

        let process = Arc::clone(&self.process);
        let timeout = self.config.install_timeout;
        let run = tokio::spawn(async move { process.exec(&program, &args, timeout).await });

        let Some(result) = wait_with_loader(ui, &format!("Installing {latest}..."), run).await
        else {
            return UpdateOutcome::Cancelled;
        };

        match result {
            Ok(output) if output.success() => {}
            Ok(output) => {
                tracing::warn!("Update to {} exited with {}", latest, output.code);
                ui.notify(
                    &format!(
                        "Update failed (exit {}): {}",
                        output.code,
                        output.diagnostics()
                    ),
                    NotifyLevel::Error,
                );
                return UpdateOutcome::Failed;
            }
            Err(e) => {
                tracing::warn!("Update to {} failed: {}", latest, e);
                ui.notify(&format!("Update failed: {e}"), NotifyLevel::Error);
                return UpdateOutcome::Failed;
            }
        }

        let app = &self.config.app_name;
        let restarted = ui
            .confirm(
                &format!("Updated to {latest}!"),
                &format!("Shut down {app}? (Use {app} -c to continue this session)"),
            )
            .await;
        if restarted {
            self.process.shutdown();
        }

        UpdateOutcome::Installed {
            version: latest.to_string(),
            restarted,
        }
    }
}

/// Wait for `task` behind a loader.
///
/// Returns `None` if the user aborts or the task panics. Aborting only
/// abandons the wait; the task itself runs on to completion or timeout.
async fn wait_with_loader<T>(ui: &dyn UpdateUi, title: &str, task: JoinHandle<T>) -> Option<T>
where
    T: Send + 'static,
{
    let loader = ui.show_loader(title);
    let abort = loader.abort_token().clone();

    tokio::select! {
        result = task => result.ok(),
        _ = abort.cancelled() => {
            tracing::debug!("{} aborted by user", title);
            None
        }
    }
}
