//! Image spec data structures
//!
//! `image.json` is the machine-readable description of a built application
//! image: metadata about the build, the declared listen port, the runtime
//! environment variables and exactly one launch directive. It is written once
//! at publish time and read back by `galley launch`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Listen port shared by every deployment variant; declared, not negotiated
pub const LISTEN_PORT: u16 = 80;

/// Bind address for direct-command launches
pub const BIND_HOST: &str = "0.0.0.0";

/// Source overlay directory inside an image
pub const APP_DIR: &str = "app";

/// Name of the symlink importing the cached environment
pub const DEPS_LINK: &str = "deps";

/// Well-known schema artifact path at the image root
pub const SCHEMA_ARTIFACT_FILE: &str = "schema.export";

/// Image spec file name at the image root
pub const IMAGE_SPEC_FILE: &str = "image.json";

fn default_version() -> String {
    "1.0".to_string()
}

/// How the server process is started; resolved once at build time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum LaunchDirective {
    /// Literal process invocation with explicit bind address and port
    DirectCommand {
        command: Vec<String>,
        host: String,
        port: u16,
        /// Re-read source changes without rebuilding; development variants only
        reload: bool,
    },
    /// Defer to a startup script shipped inside the image
    DelegatedScript { script: String },
}

impl LaunchDirective {
    /// Full argv the runtime executes, relative to the image root
    pub fn argv(&self) -> Vec<String> {
        match self {
            LaunchDirective::DirectCommand {
                command,
                host,
                port,
                reload,
            } => {
                let mut argv = command.clone();
                argv.push("--host".to_string());
                argv.push(host.clone());
                argv.push("--port".to_string());
                argv.push(port.to_string());
                if *reload {
                    argv.push("--reload".to_string());
                }
                argv
            }
            LaunchDirective::DelegatedScript { script } => vec![script.clone()],
        }
    }

    pub fn is_delegated(&self) -> bool {
        matches!(self, LaunchDirective::DelegatedScript { .. })
    }
}

/// Metadata about a build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub name: String,
    pub variant: String,
    pub build_id: String,
    pub built_at: DateTime<Utc>,
    /// Digest of the cached environment the image references
    pub environment: String,
}

/// Complete description of a built application image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSpec {
    #[serde(default = "default_version")]
    pub version: String,
    pub metadata: ImageMetadata,
    /// Environment variables for the runtime process
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    pub port: u16,
    /// Present iff the artifact generation step ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_artifact: Option<String>,
    pub launch: LaunchDirective,
}

/// What a completed build hands back to the caller
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub spec: ImageSpec,
    pub image_path: PathBuf,
    /// Whether the dependency cache stage reused a published environment
    pub reused_environment: bool,
}
