//! Build context shared by the pipeline phases

use crate::config::{AppConfig, Variant};
use crate::digest::Digest;
use crate::error::BuildError;
use crate::image::LaunchDirective;
use crate::installer::Installer;
use crate::manifest::Manifest;
use crate::store::{CacheStore, CachedEnv};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Context that owns one build's inputs and accumulates phase results
///
/// The inputs (source, config, manifest, installer, store) are fixed at
/// construction; the `Option` fields are populated by the phases in order and
/// consumed at publish time.
pub struct BuildContext {
    /// Application source tree
    pub source_root: PathBuf,

    /// Directory published images land in
    pub output_root: PathBuf,

    /// Application collaborator contract (`galley.toml`)
    pub config: AppConfig,

    /// Deployment variant, fixed for the whole build
    pub variant: Variant,

    /// Installer seam used by the cache and assembly stages
    pub installer: Arc<dyn Installer>,

    /// Content-addressed environment store
    pub store: CacheStore,

    /// Dependency manifest, captured once at construction
    pub manifest: Manifest,

    /// Digest of the manifest's canonical form; the environment key
    pub digest: Digest,

    /// Unique id of this build
    pub build_id: String,

    /// Set by the dependency cache stage
    pub cached_env: Option<CachedEnv>,

    /// Whether the cache stage reused a published environment
    pub reused_environment: bool,

    /// Image staging directory, set by the assembly stage
    pub staging: Option<PathBuf>,

    /// Schema artifact path relative to the image root, set by the artifact
    /// generation step when it runs
    pub schema_artifact: Option<String>,

    /// Set by the entrypoint selector
    pub directive: Option<LaunchDirective>,
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("source_root", &self.source_root)
            .field("output_root", &self.output_root)
            .field("config", &self.config)
            .field("variant", &self.variant)
            .field("installer", &"<dyn Installer>")
            .field("store", &self.store)
            .field("manifest", &self.manifest)
            .field("digest", &self.digest)
            .field("build_id", &self.build_id)
            .field("cached_env", &self.cached_env)
            .field("reused_environment", &self.reused_environment)
            .field("staging", &self.staging)
            .field("schema_artifact", &self.schema_artifact)
            .field("directive", &self.directive)
            .finish()
    }
}

impl BuildContext {
    /// Create a context, capturing the manifest and its digest
    pub fn new(
        source_root: PathBuf,
        output_root: PathBuf,
        config: AppConfig,
        variant: Variant,
        installer: Arc<dyn Installer>,
        store: CacheStore,
    ) -> Result<Self, BuildError> {
        let manifest = Manifest::load(&config.manifest_path(&source_root))?;
        let digest = manifest.digest();

        Ok(Self {
            source_root,
            output_root,
            config,
            variant,
            installer,
            store,
            manifest,
            digest,
            build_id: Uuid::new_v4().to_string(),
            cached_env: None,
            reused_environment: false,
            staging: None,
            schema_artifact: None,
            directive: None,
        })
    }

    /// The resolved cached environment; errors when the cache stage has not
    /// run yet
    pub fn cached_env(&self) -> Result<&CachedEnv, BuildError> {
        self.cached_env
            .as_ref()
            .ok_or(BuildError::Internal("cached environment not resolved"))
    }

    /// The image staging directory; errors when assembly has not run yet
    pub fn staging(&self) -> Result<&Path, BuildError> {
        self.staging
            .as_deref()
            .ok_or(BuildError::Internal("image not assembled"))
    }

    /// Final location the image is published to
    pub fn image_path(&self) -> PathBuf {
        self.output_root.join(&self.config.name)
    }

    /// Drop any staged image output; used when a phase fails
    pub fn discard_staging(&mut self) {
        if let Some(staging) = self.staging.take() {
            let _ = std::fs::remove_dir_all(staging);
        }
    }
}
