//! Build pipeline error taxonomy
//!
//! Every stage failure is fatal: the pipeline short-circuits, nothing is
//! published, and the failing stage's error is reported verbatim. No stage
//! retries internally; retries belong to whatever invokes galley.

use crate::config::ConfigError;
use crate::digest::Digest;
use crate::manifest::ManifestError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single installer command invocation
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("install command exited with status {status}: {stderr}")]
    CommandFailed { status: i32, stderr: String },

    #[error("install command was terminated by a signal")]
    Terminated,

    #[error("failed to spawn install command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no system install command configured")]
    SystemInstallerMissing,
}

/// Dependency cache stage failure: a package could not be resolved or
/// installed
#[derive(Debug, Error)]
pub enum DependencyInstallError {
    #[error("failed to install dependency '{spec}'")]
    Package {
        spec: String,
        #[source]
        source: InstallError,
    },

    #[error("failed to install build-time system packages {packages:?}")]
    BuildPackages {
        packages: Vec<String>,
        #[source]
        source: InstallError,
    },
}

/// Runtime assembly stage failure
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("cached environment {digest} is absent from the store")]
    EnvironmentMissing { digest: Digest },

    #[error("cached environment was produced from a different manifest (expected {expected}, found {found})")]
    EnvironmentMismatch { expected: Digest, found: Digest },

    #[error("failed to install runtime system packages {packages:?}")]
    RuntimePackages {
        packages: Vec<String>,
        #[source]
        source: InstallError,
    },

    #[error("failed to import cached environment into the image: {source}")]
    EnvironmentImport {
        #[source]
        source: std::io::Error,
    },

    #[error("failed to overlay source file {path}: {source}")]
    SourceCopy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Artifact generation step failure; a broken schema must never ship
#[derive(Debug, Error)]
pub enum SchemaExportError {
    #[error("failed to spawn introspection command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("introspection command exited with status {status}: {stderr}")]
    CommandFailed { status: i32, stderr: String },

    #[error("introspection command produced empty output")]
    EmptyOutput,

    #[error("failed to write schema artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Environment store failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to initialize store at {path}: {source}")]
    Init {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {waited:?} waiting for another producer of environment {digest}")]
    LockTimeout { digest: Digest, waited: Duration },

    #[error("environment {digest} has a corrupt completion marker")]
    CorruptMarker { digest: Digest },

    #[error("store i/o failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Entrypoint selection failure
#[derive(Debug, Error)]
pub enum EntrypointError {
    #[error("entrypoint script '{script}' is not present in the assembled image")]
    ScriptMissing { script: String },
}

/// Failure to hand off to a built image's launch directive
///
/// A process that starts and then exits is not an error here: its exit code
/// is propagated as-is, outside the pipeline's responsibility.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("image not found at {0}")]
    ImageMissing(PathBuf),

    #[error("image spec not found at {0}")]
    SpecMissing(PathBuf),

    #[error("failed to read image spec {path}: {source}")]
    SpecRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse image spec {path}: {source}")]
    SpecParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Aggregate build failure, carrying the failing stage's error
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    DependencyInstall(#[from] DependencyInstallError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    SchemaExport(#[from] SchemaExportError),

    #[error(transparent)]
    Entrypoint(#[from] EntrypointError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("i/o failure during build: {0}")]
    Io(#[from] std::io::Error),

    #[error("pipeline invariant violated: {0}")]
    Internal(&'static str),
}
