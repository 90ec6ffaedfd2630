use super::context::BuildContext;
use crate::error::BuildError;
use async_trait::async_trait;

/// One stage of the build pipeline
///
/// Phases run strictly in order over a shared context; the first error aborts
/// the build and nothing is published.
#[async_trait]
pub trait BuildPhase: Send + Sync {
    async fn execute(&self, context: &mut BuildContext) -> Result<(), BuildError>;
}
