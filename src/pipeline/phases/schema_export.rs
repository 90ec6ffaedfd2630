//! Artifact generation step
//!
//! Runs the application's introspection command inside the assembled image
//! and persists its stdout as the schema artifact. A non-zero exit or empty
//! output aborts the build: a broken schema must never ship. The step is
//! skipped entirely when the application declares no introspection command.

use super::super::context::BuildContext;
use super::super::phase_trait::BuildPhase;
use crate::error::{BuildError, SchemaExportError};
use crate::image::{APP_DIR, SCHEMA_ARTIFACT_FILE};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

pub struct SchemaExportPhase;

#[async_trait]
impl BuildPhase for SchemaExportPhase {
    async fn execute(&self, context: &mut BuildContext) -> Result<(), BuildError> {
        let introspect = match &context.config.introspect {
            Some(argv) => argv.clone(),
            None => {
                debug!("No introspection command declared, skipping schema export");
                return Ok(());
            }
        };

        let staging = context.staging()?.to_path_buf();
        let env_path = context.cached_env()?.path.clone();
        let command = introspect.join(" ");

        debug!(command = %command, "Exporting schema");
        let output = Command::new(&introspect[0])
            .args(&introspect[1..])
            .current_dir(staging.join(APP_DIR))
            .env("GALLEY_DEPS", &env_path)
            .output()
            .await
            .map_err(|source| SchemaExportError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SchemaExportError::CommandFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            return Err(SchemaExportError::EmptyOutput.into());
        }

        let artifact = staging.join(SCHEMA_ARTIFACT_FILE);
        std::fs::write(&artifact, &output.stdout).map_err(|source| SchemaExportError::Write {
            path: artifact.clone(),
            source,
        })?;

        info!(artifact = %artifact.display(), bytes = output.stdout.len(), "Schema artifact written");
        context.schema_artifact = Some(SCHEMA_ARTIFACT_FILE.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::assemble::AssemblePhase;
    use super::super::deps_cache::DepsCachePhase;
    use super::*;
    use crate::config::{AppConfig, Variant};
    use crate::installer::MockInstaller;
    use crate::store::CacheStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn context_with_introspect(dir: &TempDir, introspect: &str) -> BuildContext {
        let source = dir.path().join("src");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("deps.txt"), "libfoo\n").unwrap();
        std::fs::write(
            source.join("galley.toml"),
            format!(
                r#"
name = "svc"
command = ["serve"]
{introspect}

[installer]
dependency = ["pkg", "install", "{{spec}}", "--into", "{{env}}"]
"#
            ),
        )
        .unwrap();

        let config = AppConfig::load(&source).unwrap();
        let store = CacheStore::open(&dir.path().join("store")).unwrap();
        BuildContext::new(
            source,
            dir.path().join("out"),
            config,
            Variant::Production,
            Arc::new(MockInstaller::new()),
            store,
        )
        .unwrap()
    }

    async fn run_until_schema(context: &mut BuildContext) -> Result<(), BuildError> {
        DepsCachePhase.execute(context).await.unwrap();
        AssemblePhase.execute(context).await.unwrap();
        SchemaExportPhase.execute(context).await
    }

    #[tokio::test]
    async fn test_schema_written_from_stdout() {
        let dir = TempDir::new().unwrap();
        let mut context = context_with_introspect(
            &dir,
            r#"introspect = ["sh", "-c", "echo 'type Query { ping: String }'"]"#,
        );

        run_until_schema(&mut context).await.unwrap();

        assert_eq!(
            context.schema_artifact.as_deref(),
            Some(SCHEMA_ARTIFACT_FILE)
        );
        let content =
            std::fs::read_to_string(context.staging().unwrap().join(SCHEMA_ARTIFACT_FILE)).unwrap();
        assert!(content.contains("type Query"));
    }

    #[tokio::test]
    async fn test_step_skipped_without_introspection_command() {
        let dir = TempDir::new().unwrap();
        let mut context = context_with_introspect(&dir, "");

        run_until_schema(&mut context).await.unwrap();

        assert!(context.schema_artifact.is_none());
        assert!(!context
            .staging()
            .unwrap()
            .join(SCHEMA_ARTIFACT_FILE)
            .exists());
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails_build() {
        let dir = TempDir::new().unwrap();
        let mut context = context_with_introspect(
            &dir,
            r#"introspect = ["sh", "-c", "echo broken >&2; exit 2"]"#,
        );

        let err = run_until_schema(&mut context).await.unwrap_err();
        match err {
            BuildError::SchemaExport(SchemaExportError::CommandFailed { status, stderr }) => {
                assert_eq!(status, 2);
                assert_eq!(stderr, "broken");
            }
            other => panic!("Expected CommandFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_output_fails_build() {
        let dir = TempDir::new().unwrap();
        let mut context =
            context_with_introspect(&dir, r#"introspect = ["sh", "-c", "printf '  \n'"]"#);

        let err = run_until_schema(&mut context).await.unwrap_err();
        assert!(matches!(
            err,
            BuildError::SchemaExport(SchemaExportError::EmptyOutput)
        ));
    }
}
