//! Contracts the update flow needs from its host application.
//!
//! The controller never draws anything or spawns processes itself. It asks
//! an [`UpdateUi`] for loaders, menus and notifications, and a
//! [`ProcessHost`] to run the install command and shut the host down.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::{UpdateError, UpdateResult};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Info,
    Warning,
    Error,
}

/// A loading indicator shown while the flow waits on the network or a child
/// process.
///
/// The UI cancels `abort` when the user asks to stop waiting. The indicator
/// is dismissed when the handle is dropped.
pub struct LoaderHandle {
    abort: CancellationToken,
    on_done: Option<Box<dyn FnOnce() + Send>>,
}

impl LoaderHandle {
    pub fn new(abort: CancellationToken) -> Self {
        Self {
            abort,
            on_done: None,
        }
    }

    /// Run `f` once the caller is done with the loader.
    pub fn on_done(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_done = Some(Box::new(f));
        self
    }

    pub fn abort_token(&self) -> &CancellationToken {
        &self.abort
    }
}

impl Drop for LoaderHandle {
    fn drop(&mut self) {
        if let Some(done) = self.on_done.take() {
            done();
        }
    }
}

impl std::fmt::Debug for LoaderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderHandle")
            .field("aborted", &self.abort.is_cancelled())
            .finish()
    }
}

/// Interactive surface provided by the host.
#[async_trait]
pub trait UpdateUi: Send + Sync {
    /// Show a loading indicator with an abort affordance.
    fn show_loader(&self, title: &str) -> LoaderHandle;

    /// Let the user pick one of `options`. `None` means the menu was closed.
    async fn select(&self, title: &str, options: &[String]) -> Option<String>;

    /// Ask a yes/no question.
    async fn confirm(&self, title: &str, message: &str) -> bool;

    fn notify(&self, message: &str, level: NotifyLevel);
}

/// Result of running an external program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Captured stderr, or stdout when stderr is empty.
    pub fn diagnostics(&self) -> &str {
        if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        }
    }
}

/// Process-level services provided by the host.
#[async_trait]
pub trait ProcessHost: Send + Sync {
    /// Run `program` with `args`, giving up after `timeout`.
    async fn exec(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> UpdateResult<ExecOutput>;

    /// Shut the host process down.
    fn shutdown(&self);
}

/// [`ProcessHost`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessHost;

#[async_trait]
impl ProcessHost for TokioProcessHost {
    async fn exec(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> UpdateResult<ExecOutput> {
        tracing::info!("Running: {} {}", program, args.join(" "));

        let output = Command::new(program).args(args).output();
        let output = tokio::time::timeout(timeout, output)
            .await
            .map_err(|_| UpdateError::CommandTimeout {
                program: program.to_string(),
                timeout,
            })?
            .map_err(|e| UpdateError::SpawnFailed {
                program: program.to_string(),
                message: e.to_string(),
            })?;

        Ok(ExecOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn shutdown(&self) {
        tracing::info!("Shutting down after update");
        std::process::exit(0);
    }
}

/// Host lifecycle events the update check hooks into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    SessionStart,
    SessionSwitch,
}

/// Context delivered with a lifecycle event.
#[derive(Clone, Default)]
pub struct HookContext {
    ui: Option<Arc<dyn UpdateUi>>,
}

impl HookContext {
    /// Context with an interactive surface attached.
    pub fn with_ui(ui: Arc<dyn UpdateUi>) -> Self {
        Self { ui: Some(ui) }
    }

    /// Context for a non-interactive run (print mode, RPC, ...).
    pub fn headless() -> Self {
        Self { ui: None }
    }

    pub fn has_ui(&self) -> bool {
        self.ui.is_some()
    }

    pub fn ui(&self) -> Option<&Arc<dyn UpdateUi>> {
        self.ui.as_ref()
    }
}

impl std::fmt::Debug for HookContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookContext")
            .field("has_ui", &self.has_ui())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_diagnostics_prefers_stderr() {
        let output = ExecOutput {
            code: 1,
            stdout: "some progress\n".to_string(),
            stderr: "EACCES: permission denied\n".to_string(),
        };
        assert_eq!(output.diagnostics(), "EACCES: permission denied");

        let output = ExecOutput {
            code: 1,
            stdout: "npm ERR! 404\n".to_string(),
            stderr: "  ".to_string(),
        };
        assert_eq!(output.diagnostics(), "npm ERR! 404");
        assert!(!output.success());
    }

    #[test]
    fn test_loader_runs_done_on_drop() {
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        let loader = LoaderHandle::new(CancellationToken::new())
            .on_done(move || flag.store(true, Ordering::SeqCst));

        assert!(!done.load(Ordering::SeqCst));
        drop(loader);
        assert!(done.load(Ordering::SeqCst));
    }

    #[test]
    fn test_headless_context() {
        assert!(!HookContext::headless().has_ui());
        assert!(HookContext::default().ui().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exec_captures_output() {
        let host = TokioProcessHost;
        let output = host
            .exec(
                "sh",
                &["-c".to_string(), "echo out; echo err >&2; exit 3".to_string()],
                Duration::from_secs(10),
            )
            .await
            .unwrap();
        assert_eq!(output.code, 3);
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exec_timeout() {
        let host = TokioProcessHost;
        let err = host
            .exec("sleep", &["5".to_string()], Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_exec_spawn_failure() {
        let host = TokioProcessHost;
        let err = host
            .exec("pi-update-no-such-program", &[], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::SpawnFailed { .. }));
    }
}
