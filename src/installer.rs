//! Installer abstraction
//!
//! The dependency cache and runtime assembly stages never run package
//! ecosystem commands directly; they go through the [`Installer`] trait. The
//! process-backed implementation expands the command templates declared in
//! `galley.toml`, keeping galley ecosystem-agnostic. The mock implementation
//! records invocations so tests can assert the cache reuse invariant without
//! any real package manager.

use crate::config::InstallerConfig;
use crate::error::InstallError;
use crate::manifest::DependencySpec;
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::process::Command;
use tracing::debug;

#[async_trait]
pub trait Installer: Send + Sync {
    /// Install a single dependency specifier into an environment root
    async fn install_dependency(
        &self,
        spec: &DependencySpec,
        env_root: &Path,
    ) -> Result<(), InstallError>;

    /// Install system packages for the stage rooted at `root`
    async fn install_system(&self, packages: &[String], root: &Path) -> Result<(), InstallError>;
}

/// Installer that shells out to the configured command templates
pub struct ProcessInstaller {
    config: InstallerConfig,
}

impl ProcessInstaller {
    pub fn new(config: InstallerConfig) -> Self {
        Self { config }
    }

    fn expand(template: &[String], spec: &str, env_root: &Path) -> Vec<String> {
        template
            .iter()
            .map(|arg| {
                arg.replace("{spec}", spec)
                    .replace("{env}", &env_root.display().to_string())
            })
            .collect()
    }

    async fn run(argv: &[String]) -> Result<(), InstallError> {
        let command = argv.join(" ");
        debug!(command = %command, "Running install command");

        let output = Command::new(&argv[0])
            .args(&argv[1..])
            .output()
            .await
            .map_err(|source| InstallError::Spawn {
                command: command.clone(),
                source,
            })?;

        if output.status.success() {
            return Ok(());
        }

        match output.status.code() {
            Some(status) => Err(InstallError::CommandFailed {
                status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
            None => Err(InstallError::Terminated),
        }
    }
}

#[async_trait]
impl Installer for ProcessInstaller {
    async fn install_dependency(
        &self,
        spec: &DependencySpec,
        env_root: &Path,
    ) -> Result<(), InstallError> {
        let argv = Self::expand(&self.config.dependency, &spec.to_string(), env_root);
        Self::run(&argv).await
    }

    async fn install_system(&self, packages: &[String], root: &Path) -> Result<(), InstallError> {
        if packages.is_empty() {
            return Ok(());
        }

        let template = self
            .config
            .system
            .as_ref()
            .ok_or(InstallError::SystemInstallerMissing)?;

        let mut argv = Self::expand(template, "", root);
        argv.extend(packages.iter().cloned());
        Self::run(&argv).await
    }
}

/// Recording installer for tests
///
/// "Installs" a dependency by writing a file named after the package into the
/// environment root, so produced environments have deterministic content.
#[derive(Default)]
pub struct MockInstaller {
    dependency_calls: AtomicUsize,
    system_calls: AtomicUsize,
    installed: Mutex<Vec<String>>,
    fail_on: Mutex<Option<String>>,
}

impl MockInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make installs of the named package fail
    pub fn fail_on(&self, name: &str) {
        *self.fail_on.lock().unwrap() = Some(name.to_string());
    }

    pub fn dependency_call_count(&self) -> usize {
        self.dependency_calls.load(Ordering::SeqCst)
    }

    pub fn system_call_count(&self) -> usize {
        self.system_calls.load(Ordering::SeqCst)
    }

    pub fn installed(&self) -> Vec<String> {
        self.installed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Installer for MockInstaller {
    async fn install_dependency(
        &self,
        spec: &DependencySpec,
        env_root: &Path,
    ) -> Result<(), InstallError> {
        self.dependency_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_on.lock().unwrap().as_deref() == Some(spec.name.as_str()) {
            return Err(InstallError::CommandFailed {
                status: 1,
                stderr: format!("no candidate for '{}'", spec),
            });
        }

        std::fs::write(env_root.join(&spec.name), spec.to_string()).map_err(|source| {
            InstallError::Spawn {
                command: format!("mock install {}", spec),
                source,
            }
        })?;

        self.installed.lock().unwrap().push(spec.to_string());
        Ok(())
    }

    async fn install_system(&self, packages: &[String], _root: &Path) -> Result<(), InstallError> {
        if !packages.is_empty() {
            self.system_calls.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
