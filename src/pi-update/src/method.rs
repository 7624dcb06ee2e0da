//! Installation method detection.
//!
//! Works out which package manager put the running tool on disk and builds
//! the command that installs a given version with it. Detection is split in
//! two: [`EnvironmentSignals::detect`] probes the process, and
//! [`PackageManager::classify`] is a pure function over those signals.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Markers found in the module path of a compiled single-file bun binary.
const BUN_BINARY_MARKERS: &[&str] = &["$bunfs", "~BUN", "%7EBUN"];

/// Path segments left behind by each package manager, in priority order.
const PNPM_MARKERS: &[&str] = &["/pnpm/", "/.pnpm/"];
const YARN_MARKERS: &[&str] = &["/yarn/", "/.yarn/"];

/// JavaScript runtime executing the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    #[default]
    Node,
    Bun,
}

impl RuntimeKind {
    /// Parse a runtime identifier such as `"bun"` or `"node"`.
    pub fn from_id(id: &str) -> Self {
        if id.trim().eq_ignore_ascii_case("bun") {
            Self::Bun
        } else {
            Self::Node
        }
    }
}

/// What the environment tells us about how the tool was installed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSignals {
    /// Runtime executing the tool
    pub runtime: RuntimeKind,
    /// Resolved on-disk location of the installed package
    pub module_path: String,
    /// Path of the running executable
    pub exe_path: String,
}

impl EnvironmentSignals {
    pub fn new(
        runtime: RuntimeKind,
        module_path: impl Into<String>,
        exe_path: impl Into<String>,
    ) -> Self {
        Self {
            runtime,
            module_path: module_path.into(),
            exe_path: exe_path.into(),
        }
    }

    /// Gather signals from the running process.
    ///
    /// The module path is the executable with symlinks resolved, which is
    /// where global package-manager shims end up pointing. Never fails; an
    /// unknown executable path is left empty.
    pub fn detect() -> Self {
        let exe = std::env::current_exe().ok();
        let exe_path = exe
            .as_deref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let module_path = exe
            .as_deref()
            .and_then(|p| std::fs::canonicalize(p).ok())
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| exe_path.clone());

        let runtime = if exe.as_deref().is_some_and(is_bun_executable) {
            RuntimeKind::Bun
        } else {
            RuntimeKind::Node
        };

        Self {
            runtime,
            module_path,
            exe_path,
        }
    }
}

fn is_bun_executable(path: &Path) -> bool {
    path.file_stem()
        .is_some_and(|stem| stem.eq_ignore_ascii_case("bun"))
}

/// Package manager responsible for the installed tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageManager {
    /// Compiled bun binary; cannot update itself
    BunBinary,
    Bun,
    Pnpm,
    Yarn,
    /// Default when nothing more specific is detected
    Npm,
}

impl PackageManager {
    /// Classify an installation from environment signals.
    ///
    /// Priority: compiled bun binary, bun runtime, pnpm path markers, yarn
    /// path markers, then npm.
    pub fn classify(signals: &EnvironmentSignals) -> Self {
        if contains_any(&signals.module_path, BUN_BINARY_MARKERS) {
            return Self::BunBinary;
        }

        if signals.runtime == RuntimeKind::Bun {
            return Self::Bun;
        }

        let module_path = normalize(&signals.module_path);
        let exe_path = normalize(&signals.exe_path);
        let paths = [module_path.as_str(), exe_path.as_str()];

        if paths.iter().any(|p| contains_any(p, PNPM_MARKERS)) {
            return Self::Pnpm;
        }
        if paths.iter().any(|p| contains_any(p, YARN_MARKERS)) {
            return Self::Yarn;
        }

        Self::Npm
    }

    /// Detect from the running process.
    pub fn detect() -> Self {
        Self::classify(&EnvironmentSignals::detect())
    }

    /// Build the command that installs `package@version`.
    ///
    /// `release_url` is only used by the compiled-binary case, which gets a
    /// manual instruction instead of a runnable command.
    pub fn install_command(
        &self,
        package: &str,
        version: &str,
        release_url: &str,
    ) -> InstallCommand {
        let target = format!("{package}@{version}");
        match self {
            Self::BunBinary => InstallCommand::Manual {
                instructions: format!("Download from: {release_url}"),
            },
            Self::Bun => InstallCommand::exec("bun", ["install", "-g", target.as_str()]),
            Self::Pnpm => InstallCommand::exec("pnpm", ["install", "-g", target.as_str()]),
            Self::Yarn => InstallCommand::exec("yarn", ["global", "add", target.as_str()]),
            Self::Npm => InstallCommand::exec("npm", ["install", "-g", target.as_str()]),
        }
    }

    /// Check if this installation can be updated by running a command.
    pub fn supports_self_update(&self) -> bool {
        !matches!(self, Self::BunBinary)
    }

    /// Get a human-readable description of this method.
    pub fn description(&self) -> &'static str {
        match self {
            Self::BunBinary => "bun compiled binary",
            Self::Bun => "bun",
            Self::Pnpm => "pnpm",
            Self::Yarn => "yarn",
            Self::Npm => "npm",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// How to install an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallCommand {
    /// Run `program` with `args`
    Exec { program: String, args: Vec<String> },
    /// Nothing can be run; show the instructions to the user instead
    Manual { instructions: String },
}

impl InstallCommand {
    pub fn exec<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Exec {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_executable(&self) -> bool {
        matches!(self, Self::Exec { .. })
    }
}

impl fmt::Display for InstallCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exec { program, args } => {
                f.write_str(program)?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
            Self::Manual { instructions } => f.write_str(instructions),
        }
    }
}

/// Resolves install commands for one configured package.
#[derive(Debug, Clone)]
pub struct InstallCommandResolver {
    package_name: String,
    release_url: String,
    signals: EnvironmentSignals,
}

impl InstallCommandResolver {
    pub fn new(
        package_name: impl Into<String>,
        release_url: impl Into<String>,
        signals: EnvironmentSignals,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            release_url: release_url.into(),
            signals,
        }
    }

    pub fn package_manager(&self) -> PackageManager {
        PackageManager::classify(&self.signals)
    }

    /// Resolve the command installing `version`. Always succeeds, falling
    /// back to npm.
    pub fn resolve(&self, version: &str) -> InstallCommand {
        self.package_manager()
            .install_command(&self.package_name, version, &self.release_url)
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Use forward slashes so Windows paths match the same markers.
fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PKG: &str = "@mariozechner/pi-coding-agent";
    const RELEASES: &str = "https://github.com/badlogic/pi-mono/releases/latest";

    fn node(module_path: &str, exe_path: &str) -> EnvironmentSignals {
        EnvironmentSignals::new(RuntimeKind::Node, module_path, exe_path)
    }

    #[test]
    fn test_classify_bun_binary() {
        let signals = EnvironmentSignals::new(
            RuntimeKind::Bun,
            "file:///$bunfs/root/pi",
            "/usr/local/bin/pi",
        );
        assert_eq!(PackageManager::classify(&signals), PackageManager::BunBinary);

        let signals = node("B:/~BUN/root/pi.exe", "C:\\tools\\pi.exe");
        assert_eq!(PackageManager::classify(&signals), PackageManager::BunBinary);
    }

    #[test]
    fn test_classify_bun_runtime() {
        let signals = EnvironmentSignals::new(
            RuntimeKind::Bun,
            "/home/user/.bun/install/global/node_modules/pkg/dist/cli.js",
            "/home/user/.bun/bin/bun",
        );
        assert_eq!(PackageManager::classify(&signals), PackageManager::Bun);
    }

    #[test]
    fn test_classify_pnpm() {
        let signals = node(
            "/home/user/.local/share/pnpm/global/5/.pnpm/pkg@1.0.0/node_modules/pkg/dist/cli.js",
            "/usr/bin/node",
        );
        assert_eq!(PackageManager::classify(&signals), PackageManager::Pnpm);
    }

    #[test]
    fn test_classify_yarn() {
        let signals = node(
            "/home/user/.config/yarn/global/node_modules/pkg/dist/cli.js",
            "/usr/bin/node",
        );
        assert_eq!(PackageManager::classify(&signals), PackageManager::Yarn);
    }

    #[test]
    fn test_classify_exe_path_marker() {
        let signals = node("/opt/pkg/dist/cli.js", "/home/user/.yarn/bin/node");
        assert_eq!(PackageManager::classify(&signals), PackageManager::Yarn);
    }

    #[test]
    fn test_classify_pnpm_before_yarn() {
        let signals = node("/home/user/.yarn/pnpm/pkg/cli.js", "/usr/bin/node");
        assert_eq!(PackageManager::classify(&signals), PackageManager::Pnpm);
    }

    #[test]
    fn test_classify_windows_paths() {
        let signals = node(
            "C:\\Users\\me\\AppData\\Local\\pnpm\\global\\5\\node_modules\\pkg\\cli.js",
            "C:\\Program Files\\nodejs\\node.exe",
        );
        assert_eq!(PackageManager::classify(&signals), PackageManager::Pnpm);
    }

    #[test]
    fn test_classify_defaults_to_npm() {
        let signals = node("/usr/lib/node_modules/pkg/dist/cli.js", "/usr/bin/node");
        assert_eq!(PackageManager::classify(&signals), PackageManager::Npm);
        assert_eq!(
            PackageManager::classify(&EnvironmentSignals::default()),
            PackageManager::Npm
        );
    }

    #[test]
    fn test_install_commands() {
        assert_eq!(
            PackageManager::Npm
                .install_command(PKG, "1.2.3", RELEASES)
                .to_string(),
            "npm install -g @mariozechner/pi-coding-agent@1.2.3"
        );
        assert_eq!(
            PackageManager::Pnpm
                .install_command(PKG, "1.2.3", RELEASES)
                .to_string(),
            "pnpm install -g @mariozechner/pi-coding-agent@1.2.3"
        );
        assert_eq!(
            PackageManager::Yarn
                .install_command(PKG, "1.2.3", RELEASES)
                .to_string(),
            "yarn global add @mariozechner/pi-coding-agent@1.2.3"
        );
        assert_eq!(
            PackageManager::Bun.install_command(PKG, "1.2.3", RELEASES),
            InstallCommand::exec("bun", ["install", "-g", "@mariozechner/pi-coding-agent@1.2.3"])
        );
    }

    #[test]
    fn test_bun_binary_is_manual() {
        let cmd = PackageManager::BunBinary.install_command(PKG, "1.2.3", RELEASES);
        assert!(!cmd.is_executable());
        assert_eq!(
            cmd.to_string(),
            "Download from: https://github.com/badlogic/pi-mono/releases/latest"
        );
        assert!(!PackageManager::BunBinary.supports_self_update());
        assert!(PackageManager::Npm.supports_self_update());
    }

    #[test]
    fn test_resolver() {
        let resolver = InstallCommandResolver::new(
            PKG,
            RELEASES,
            node("/usr/lib/node_modules/pkg/cli.js", "/usr/bin/node"),
        );
        assert_eq!(resolver.package_manager(), PackageManager::Npm);
        assert_eq!(
            resolver.resolve("2.0.0"),
            InstallCommand::exec("npm", ["install", "-g", "@mariozechner/pi-coding-agent@2.0.0"])
        );
    }

    #[test]
    fn test_runtime_from_id() {
        assert_eq!(RuntimeKind::from_id("bun"), RuntimeKind::Bun);
        assert_eq!(RuntimeKind::from_id("Bun "), RuntimeKind::Bun);
        assert_eq!(RuntimeKind::from_id("node"), RuntimeKind::Node);
        assert_eq!(RuntimeKind::from_id(""), RuntimeKind::Node);
    }

    #[test]
    fn test_detect_never_panics() {
        let signals = EnvironmentSignals::detect();
        let _ = PackageManager::classify(&signals);
    }
}
