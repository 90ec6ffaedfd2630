//! Runtime assembly stage
//!
//! Builds the image staging directory in three order-sensitive steps: install
//! runtime-only system packages, import the cached environment by reference
//! (a symlink, never a copy), then overlay the application source. The cached
//! environment itself is never touched.

use super::super::context::BuildContext;
use super::super::phase_trait::BuildPhase;
use crate::error::{AssemblyError, BuildError};
use crate::image::{APP_DIR, DEPS_LINK};
use async_trait::async_trait;
use ignore::WalkBuilder;
use std::fs;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

pub struct AssemblePhase;

#[async_trait]
impl BuildPhase for AssemblePhase {
    async fn execute(&self, context: &mut BuildContext) -> Result<(), BuildError> {
        let env = context.cached_env()?.clone();

        // Re-verify the referenced environment: it may have been pruned since
        // the cache stage resolved it, or resolved for another manifest
        match context.store.lookup(&env.digest)? {
            Some(_) => {}
            None => {
                return Err(AssemblyError::EnvironmentMissing {
                    digest: env.digest.clone(),
                }
                .into())
            }
        }
        if env.digest != context.digest {
            return Err(AssemblyError::EnvironmentMismatch {
                expected: context.digest.clone(),
                found: env.digest.clone(),
            }
            .into());
        }

        let staging = context
            .output_root
            .join(format!(".staging-{}", Uuid::new_v4()));
        fs::create_dir_all(&staging)?;
        debug!(staging = %staging.display(), "Assembling image");

        // (1) runtime-only system packages
        context
            .installer
            .install_system(&context.config.packages.runtime, &staging)
            .await
            .map_err(|source| AssemblyError::RuntimePackages {
                packages: context.config.packages.runtime.clone(),
                source,
            })?;

        // (2) import the cached environment by reference
        std::os::unix::fs::symlink(&env.path, staging.join(DEPS_LINK))
            .map_err(|source| AssemblyError::EnvironmentImport { source })?;

        // (3) overlay the source tree. The output and store directories may
        // live inside the source tree; compare canonicalized paths so they
        // never leak into the overlay.
        let app_dir = staging.join(APP_DIR);
        fs::create_dir_all(&app_dir)?;
        let excluded = [
            fs::canonicalize(&context.output_root)?,
            fs::canonicalize(context.store.root())?,
        ];
        let source_root = fs::canonicalize(&context.source_root)?;
        overlay_source(&source_root, &app_dir, &excluded)?;

        context.staging = Some(staging);
        Ok(())
    }
}

/// Copy the source tree into `dest`, honoring ignore files and skipping any
/// `excluded` roots that happen to live inside the source tree
fn overlay_source(
    source_root: &Path,
    dest: &Path,
    excluded: &[std::path::PathBuf],
) -> Result<(), AssemblyError> {
    let walker = WalkBuilder::new(source_root)
        .hidden(false)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(false)
        .build();

    for entry in walker {
        let entry = entry.map_err(|err| AssemblyError::SourceCopy {
            path: source_root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Other, err),
        })?;
        let path = entry.path();

        if path == source_root {
            continue;
        }
        if excluded.iter().any(|ex| path.starts_with(ex)) {
            continue;
        }

        let relative = path
            .strip_prefix(source_root)
            .expect("walker yields paths under its root");
        let target = dest.join(relative);

        let copy_err = |source: std::io::Error| AssemblyError::SourceCopy {
            path: path.to_path_buf(),
            source,
        };

        match entry.file_type() {
            Some(file_type) if file_type.is_dir() => {
                fs::create_dir_all(&target).map_err(copy_err)?;
            }
            Some(file_type) if file_type.is_symlink() => {
                let link = fs::read_link(path).map_err(copy_err)?;
                std::os::unix::fs::symlink(link, &target).map_err(copy_err)?;
            }
            Some(_) => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(copy_err)?;
                }
                fs::copy(path, &target).map_err(copy_err)?;
            }
            None => continue,
        }
    }

    Ok(())
}
