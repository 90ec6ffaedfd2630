//! Progress handler trait and events

use std::time::Duration;

/// Events emitted during a build
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Build started
    Started { source_path: String },

    /// A pipeline phase started
    PhaseStarted { phase: String },

    /// A pipeline phase completed
    PhaseComplete { phase: String, duration: Duration },

    /// The dependency cache stage reused a published environment
    EnvironmentReused { digest: String },

    /// The dependency cache stage produced a new environment
    EnvironmentProduced { digest: String, duration: Duration },

    /// Build completed successfully
    Completed {
        image_path: String,
        total_time: Duration,
    },

    /// Build failed
    Failed { error: String },
}

/// Trait for handling progress events during a build
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {
        // Intentionally empty
    }
}
