//! Application configuration (`galley.toml`)
//!
//! The configuration file is the application collaborator's half of the
//! contract: it declares the startup command, the optional introspection
//! command, the optional startup script, the manifest location, the installer
//! command templates and the system packages each stage needs. galley supplies
//! the pipeline around it.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration file name, expected at the source tree root
pub const CONFIG_FILE: &str = "galley.toml";

/// Default manifest file name when `galley.toml` does not override it
pub const DEFAULT_MANIFEST: &str = "deps.txt";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration not found: {0} (expected a galley.toml at the source root)")]
    NotFound(PathBuf),

    #[error("Failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Deployment variant, fixed at build time
///
/// Live reload is a development-only concern: Production launch directives
/// never carry the reload flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Development,
    Production,
}

impl Variant {
    pub fn is_development(&self) -> bool {
        matches!(self, Variant::Development)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Development => write!(f, "development"),
            Variant::Production => write!(f, "production"),
        }
    }
}

/// Installer command templates
///
/// `dependency` is the argv used to install a single manifest specifier;
/// `{spec}` expands to the specifier and `{env}` to the environment root.
/// `system` is the argv prefix for system package installation; package names
/// are appended. The concrete package ecosystem is the application's choice,
/// not galley's.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct InstallerConfig {
    pub dependency: Vec<String>,
    #[serde(default)]
    pub system: Option<Vec<String>>,
}

/// System packages installed per stage
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SystemPackages {
    /// Needed while resolving/compiling dependencies (e.g. native
    /// crypto/LDAP/SASL headers)
    #[serde(default)]
    pub build: Vec<String>,
    /// Needed only by the assembled runtime image
    #[serde(default)]
    pub runtime: Vec<String>,
}

impl SystemPackages {
    pub fn is_empty(&self) -> bool {
        self.build.is_empty() && self.runtime.is_empty()
    }
}

/// Per-application configuration parsed from `galley.toml`
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Application name; becomes the image directory name
    pub name: String,

    /// Server startup argv for the direct-command launch strategy
    pub command: Vec<String>,

    /// Introspection argv producing the schema artifact on stdout; the
    /// artifact generation step is skipped when absent
    #[serde(default)]
    pub introspect: Option<Vec<String>>,

    /// Startup script (relative to the source root) selecting the
    /// delegated-script launch strategy
    #[serde(default)]
    pub entrypoint_script: Option<String>,

    /// Manifest file, relative to the source root
    #[serde(default = "default_manifest")]
    pub manifest: String,

    pub installer: InstallerConfig,

    #[serde(default)]
    pub packages: SystemPackages,

    /// Environment variables recorded in the image for the runtime process
    #[serde(default)]
    pub env: HashMap<String, String>,
}

fn default_manifest() -> String {
    DEFAULT_MANIFEST.to_string()
}

impl AppConfig {
    /// Load and validate the configuration under a source tree
    pub fn load(source_root: &Path) -> Result<Self, ConfigError> {
        let path = source_root.join(CONFIG_FILE);
        if !path.is_file() {
            return Err(ConfigError::NotFound(path));
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        let config: AppConfig =
            toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })?;

        config.validate()?;
        Ok(config)
    }

    /// Parse from a string (primarily for tests)
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from(CONFIG_FILE),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "'name' must not be empty".to_string(),
            ));
        }

        if self.command.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "'command' must contain at least the server executable".to_string(),
            ));
        }

        if self.installer.dependency.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "'installer.dependency' must not be empty".to_string(),
            ));
        }

        if !self
            .installer
            .dependency
            .iter()
            .any(|arg| arg.contains("{spec}"))
        {
            return Err(ConfigError::ValidationFailed(
                "'installer.dependency' must contain a '{spec}' placeholder".to_string(),
            ));
        }

        if let Some(system) = &self.installer.system {
            if system.is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "'installer.system' must not be an empty command".to_string(),
                ));
            }
        }

        if !self.packages.is_empty() && self.installer.system.is_none() {
            return Err(ConfigError::ValidationFailed(
                "system packages are declared but 'installer.system' is not set".to_string(),
            ));
        }

        if let Some(introspect) = &self.introspect {
            if introspect.is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "'introspect' must not be an empty command".to_string(),
                ));
            }
        }

        if let Some(script) = &self.entrypoint_script {
            if script.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "'entrypoint_script' must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Manifest path relative to a source root
    pub fn manifest_path(&self, source_root: &Path) -> PathBuf {
        source_root.join(&self.manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name = "svc"
command = ["serve"]

[installer]
dependency = ["pkg", "install", "--into", "{env}", "{spec}"]
"#;

    #[test]
    fn test_parse_minimal_config() {
        let config = AppConfig::parse(MINIMAL).unwrap();
        assert_eq!(config.name, "svc");
        assert_eq!(config.manifest, DEFAULT_MANIFEST);
        assert!(config.introspect.is_none());
        assert!(config.entrypoint_script.is_none());
        assert!(config.env.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let content = r#"
name = "clubs"
command = ["appserver", "main:app"]
introspect = ["appserver-export", "main"]
entrypoint_script = "entrypoint.sh"
manifest = "requirements.txt"

[installer]
dependency = ["pkg", "install", "--into", "{env}", "{spec}"]
system = ["syspkg", "add"]

[packages]
build = ["libldap-dev", "libsasl-dev"]
runtime = ["libldap"]

[env]
GLOBAL_DEBUG = "false"
"#;
        let config = AppConfig::parse(content).unwrap();
        assert_eq!(config.manifest, "requirements.txt");
        assert_eq!(config.packages.build.len(), 2);
        assert_eq!(config.packages.runtime, vec!["libldap".to_string()]);
        assert_eq!(config.env.get("GLOBAL_DEBUG").map(String::as_str), Some("false"));
        assert_eq!(
            config.entrypoint_script.as_deref(),
            Some("entrypoint.sh")
        );
    }

    #[test]
    fn test_empty_command_rejected() {
        let content = MINIMAL.replace(r#"command = ["serve"]"#, "command = []");
        let err = AppConfig::parse(&content).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationFailed(_)));
    }

    #[test]
    fn test_missing_spec_placeholder_rejected() {
        let content = MINIMAL.replace("{spec}", "spec");
        let err = AppConfig::parse(&content).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationFailed(_)));
    }

    #[test]
    fn test_packages_require_system_installer() {
        let content = format!("{}\n[packages]\nbuild = [\"libfoo\"]\n", MINIMAL);
        let err = AppConfig::parse(&content).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationFailed(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_variant_display() {
        assert_eq!(Variant::Development.to_string(), "development");
        assert_eq!(Variant::Production.to_string(), "production");
        assert!(Variant::Development.is_development());
        assert!(!Variant::Production.is_development());
    }
}
