pub mod context;
pub mod orchestrator;
pub mod phase_trait;
pub mod phases;

pub use context::BuildContext;
pub use orchestrator::BuildPipeline;
pub use phase_trait::BuildPhase;
