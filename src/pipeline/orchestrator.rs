//! Build pipeline orchestration
//!
//! Runs the four stages strictly in order over a shared context, then
//! publishes the staged image in one rename. Any stage failure discards the
//! staging directory; a failed build leaves nothing in the output directory.

use super::context::BuildContext;
use super::phase_trait::BuildPhase;
use super::phases::{
    assemble::AssemblePhase, deps_cache::DepsCachePhase, entrypoint::EntrypointPhase,
    schema_export::SchemaExportPhase,
};
use crate::error::BuildError;
use crate::image::{BuildReport, ImageMetadata, ImageSpec, IMAGE_SPEC_FILE, LISTEN_PORT};
use crate::progress::{ProgressEvent, ProgressHandler};
use chrono::Utc;
use std::fs;
use std::time::Instant;
use tracing::{debug, info};

pub struct BuildPipeline {
    progress_handler: Option<Box<dyn ProgressHandler>>,
}

impl BuildPipeline {
    pub fn new(progress_handler: Option<Box<dyn ProgressHandler>>) -> Self {
        Self { progress_handler }
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(handler) = &self.progress_handler {
            handler.on_progress(&event);
        }
    }

    pub async fn execute(&self, context: &mut BuildContext) -> Result<BuildReport, BuildError> {
        let start = Instant::now();
        info!(
            "Starting build pipeline for: {}",
            context.source_root.display()
        );
        self.emit(ProgressEvent::Started {
            source_path: context.source_root.display().to_string(),
        });

        let phases: Vec<(Box<dyn BuildPhase>, &str)> = vec![
            (Box::new(DepsCachePhase), "DepsCachePhase"),
            (Box::new(AssemblePhase), "AssemblePhase"),
            (Box::new(SchemaExportPhase), "SchemaExportPhase"),
            (Box::new(EntrypointPhase), "EntrypointPhase"),
        ];

        for (phase, phase_name) in phases {
            info!("Phase: {}", phase_name);
            self.emit(ProgressEvent::PhaseStarted {
                phase: phase_name.to_string(),
            });

            let phase_start = Instant::now();
            if let Err(err) = phase.execute(context).await {
                self.emit(ProgressEvent::Failed {
                    error: err.to_string(),
                });
                context.discard_staging();
                return Err(err);
            }

            if phase_name == "DepsCachePhase" {
                let digest = context.digest.to_string();
                if context.reused_environment {
                    self.emit(ProgressEvent::EnvironmentReused { digest });
                } else {
                    self.emit(ProgressEvent::EnvironmentProduced {
                        digest,
                        duration: phase_start.elapsed(),
                    });
                }
            }

            self.emit(ProgressEvent::PhaseComplete {
                phase: phase_name.to_string(),
                duration: phase_start.elapsed(),
            });
            debug!("Phase {} complete", phase_name);
        }

        let report = match self.publish(context) {
            Ok(report) => report,
            Err(err) => {
                self.emit(ProgressEvent::Failed {
                    error: err.to_string(),
                });
                context.discard_staging();
                return Err(err);
            }
        };

        info!(
            "Pipeline complete: image published at {}",
            report.image_path.display()
        );
        self.emit(ProgressEvent::Completed {
            image_path: report.image_path.display().to_string(),
            total_time: start.elapsed(),
        });

        Ok(report)
    }

    /// Write the image spec into the staging directory and rename it into the
    /// final location, replacing any previous build of the same application
    fn publish(&self, context: &mut BuildContext) -> Result<BuildReport, BuildError> {
        let directive = context
            .directive
            .clone()
            .ok_or(BuildError::Internal("launch directive not selected"))?;
        let env = context.cached_env()?;

        let spec = ImageSpec {
            version: "1.0".to_string(),
            metadata: ImageMetadata {
                name: context.config.name.clone(),
                variant: context.variant.to_string(),
                build_id: context.build_id.clone(),
                built_at: Utc::now(),
                environment: env.digest.to_string(),
            },
            env: context.config.env.clone(),
            port: LISTEN_PORT,
            schema_artifact: context.schema_artifact.clone(),
            launch: directive,
        };

        let staging = context.staging()?.to_path_buf();
        let spec_json = serde_json::to_string_pretty(&spec)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        fs::write(staging.join(IMAGE_SPEC_FILE), spec_json + "\n")?;

        let image_path = context.image_path();
        if image_path.exists() {
            fs::remove_dir_all(&image_path)?;
        }
        fs::rename(&staging, &image_path)?;
        context.staging = None;

        Ok(BuildReport {
            spec,
            image_path,
            reused_environment: context.reused_environment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoOpHandler;

    #[tokio::test]
    async fn test_pipeline_creation() {
        let pipeline = BuildPipeline::new(None);
        assert!(pipeline.progress_handler.is_none());
    }

    #[tokio::test]
    async fn test_pipeline_with_progress() {
        let pipeline = BuildPipeline::new(Some(Box::new(NoOpHandler)));
        assert!(pipeline.progress_handler.is_some());
    }
}
