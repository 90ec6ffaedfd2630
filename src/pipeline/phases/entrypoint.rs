//! Entrypoint selector
//!
//! Resolves the image's single launch directive at build time. A declared
//! startup script selects the delegated-script strategy; otherwise the
//! direct-command strategy embeds the bind address, the fixed port and, for
//! development builds only, the live-reload flag. The choice is final: the
//! runtime never re-evaluates it.

use super::super::context::BuildContext;
use super::super::phase_trait::BuildPhase;
use crate::config::{AppConfig, Variant};
use crate::error::{BuildError, EntrypointError};
use crate::image::{APP_DIR, BIND_HOST, LISTEN_PORT, LaunchDirective};
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

pub struct EntrypointPhase;

#[async_trait]
impl BuildPhase for EntrypointPhase {
    async fn execute(&self, context: &mut BuildContext) -> Result<(), BuildError> {
        let app_dir = context.staging()?.join(APP_DIR);
        let directive = select(&context.config, context.variant, &app_dir)?;

        info!(
            strategy = if directive.is_delegated() { "delegated_script" } else { "direct_command" },
            "Launch directive selected"
        );
        context.directive = Some(directive);
        Ok(())
    }
}

/// Resolve the launch directive for a configuration
///
/// `app_dir` is where a declared startup script must exist: the image overlay
/// during a build, or the source tree when planning.
pub fn select(
    config: &AppConfig,
    variant: Variant,
    app_dir: &Path,
) -> Result<LaunchDirective, EntrypointError> {
    if let Some(script) = &config.entrypoint_script {
        if !app_dir.join(script).is_file() {
            return Err(EntrypointError::ScriptMissing {
                script: script.clone(),
            });
        }
        return Ok(LaunchDirective::DelegatedScript {
            script: format!("{}/{}", APP_DIR, script),
        });
    }

    Ok(LaunchDirective::DirectCommand {
        command: config.command.clone(),
        host: BIND_HOST.to_string(),
        port: LISTEN_PORT,
        reload: variant.is_development(),
    })
}
