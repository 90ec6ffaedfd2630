//! Dependency cache stage
//!
//! Resolves the build's cached environment: reuse a published one when the
//! manifest digest matches, otherwise take the producer lock and install
//! build-time system packages plus every manifest specifier into a staged
//! environment, publishing it on success. This stage never reads application
//! source, which is what makes the result reusable across source-only builds.

use super::super::context::BuildContext;
use super::super::phase_trait::BuildPhase;
use crate::error::{BuildError, DependencyInstallError};
use crate::store::EnvSlot;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// How long a build waits for another producer of the same environment
const PRODUCE_TIMEOUT: Duration = Duration::from_secs(600);

pub struct DepsCachePhase;

#[async_trait]
impl BuildPhase for DepsCachePhase {
    async fn execute(&self, context: &mut BuildContext) -> Result<(), BuildError> {
        let slot = context.store.acquire(&context.digest, PRODUCE_TIMEOUT).await?;

        match slot {
            EnvSlot::Ready(env) => {
                info!(digest = %env.digest, "Cached environment reused");
                context.reused_environment = true;
                context.cached_env = Some(env);
            }
            EnvSlot::Producer(producer) => {
                debug!(
                    digest = %producer.digest(),
                    packages = context.config.packages.build.len(),
                    dependencies = context.manifest.len(),
                    "Producing cached environment"
                );

                context
                    .installer
                    .install_system(&context.config.packages.build, producer.staging_root())
                    .await
                    .map_err(|source| DependencyInstallError::BuildPackages {
                        packages: context.config.packages.build.clone(),
                        source,
                    })?;

                for spec in context.manifest.specs() {
                    context
                        .installer
                        .install_dependency(spec, producer.staging_root())
                        .await
                        .map_err(|source| DependencyInstallError::Package {
                            spec: spec.to_string(),
                            source,
                        })?;
                }

                let env = producer.commit(&context.manifest)?;
                info!(digest = %env.digest, "Cached environment produced");
                context.reused_environment = false;
                context.cached_env = Some(env);
            }
        }

        Ok(())
    }
}
