//! Progress handler that reports through tracing

use super::handler::{ProgressEvent, ProgressHandler};
use tracing::{error, info};

/// Handler that logs every progress event at an appropriate level
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { source_path } => {
                info!(source = %source_path, "Build started");
            }
            ProgressEvent::PhaseStarted { phase } => {
                info!(phase = %phase, "Phase started");
            }
            ProgressEvent::PhaseComplete { phase, duration } => {
                info!(phase = %phase, duration_ms = duration.as_millis() as u64, "Phase complete");
            }
            ProgressEvent::EnvironmentReused { digest } => {
                info!(digest = %digest, "Reusing cached environment");
            }
            ProgressEvent::EnvironmentProduced { digest, duration } => {
                info!(digest = %digest, duration_ms = duration.as_millis() as u64, "Environment produced");
            }
            ProgressEvent::Completed {
                image_path,
                total_time,
            } => {
                info!(image = %image_path, duration_ms = total_time.as_millis() as u64, "Build complete");
            }
            ProgressEvent::Failed { error: message } => {
                error!(error = %message, "Build failed");
            }
        }
    }
}
