//! galley - multi-stage application image builder
//!
//! galley turns an application source tree plus a dependency manifest into a
//! runnable application image. The work happens in a strictly sequential
//! pipeline:
//!
//! 1. **Dependency cache** - install the manifest's dependencies into an
//!    isolated, content-addressed environment, reused by every later build
//!    that declares the same manifest.
//! 2. **Runtime assembly** - install runtime-only system packages, import the
//!    cached environment by reference and overlay the application source.
//! 3. **Schema export** (optional) - run the application's introspection
//!    command and persist its output as a static artifact inside the image.
//! 4. **Entrypoint selection** - resolve exactly one launch directive, either
//!    a direct server command or a delegated startup script.
//!
//! The application itself is an opaque collaborator: it contributes a startup
//! command, a manifest, an optional introspection command and an optional
//! startup script via `galley.toml`. galley never looks inside it.
//!
//! # Example Usage
//!
//! ```ignore
//! use galley::config::{AppConfig, Variant};
//! use galley::installer::ProcessInstaller;
//! use galley::pipeline::{BuildContext, BuildPipeline};
//! use galley::store::CacheStore;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! async fn build(source: &Path) -> anyhow::Result<()> {
//!     let config = AppConfig::load(source)?;
//!     let installer = Arc::new(ProcessInstaller::new(config.installer.clone()));
//!     let store = CacheStore::open(Path::new("/var/lib/galley/store"))?;
//!     let mut context = BuildContext::new(
//!         source.to_path_buf(),
//!         Path::new("out").to_path_buf(),
//!         config,
//!         Variant::Production,
//!         installer,
//!         store,
//!     )?;
//!     let report = BuildPipeline::new(None).execute(&mut context).await?;
//!     println!("image at {}", report.image_path.display());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod digest;
pub mod error;
pub mod export;
pub mod image;
pub mod installer;
pub mod launch;
pub mod manifest;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod util;

// Re-export key types for convenient access
pub use config::{AppConfig, ConfigError, Variant};
pub use digest::Digest;
pub use error::{AssemblyError, BuildError, DependencyInstallError, SchemaExportError};
pub use image::{BuildReport, ImageSpec, LaunchDirective};
pub use installer::{Installer, MockInstaller, ProcessInstaller};
pub use manifest::{DependencySpec, Manifest, ManifestError};
pub use pipeline::{BuildContext, BuildPipeline};
pub use store::CacheStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
