use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::core::{
    domain::{ExecutionLimits, Language, PreparedSource, Runnable, SourceArtifact},
    errors::SpawnError,
    traits::runner::Runner,
};

/// Everything a strategy may touch while building a job.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub runner: &'a dyn Runner,
    pub outputs_dir: &'a Path,
    pub compile_limits: &'a ExecutionLimits,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileStatus {
    Succeeded,
    Failed { diagnostic: String },
}

/// Per-language build strategy.
///
/// A strategy never runs the submitted program. It only decides how the source
/// is laid out on disk, which toolchain invocation turns it into something
/// runnable, and what the final command looks like.
#[async_trait::async_trait]
pub trait LanguageStrategy: std::fmt::Debug + Send + Sync {
    fn language(&self) -> Language;

    /// Pure source transform; the caller writes the result to disk.
    fn materialize(&self, job_id: Uuid, source: &str) -> PreparedSource;

    /// Paths the compile step may create. Registered for cleanup before
    /// compiling so partial outputs are removed too.
    fn artifacts(&self, _source: &SourceArtifact, _ctx: &BuildContext<'_>) -> Vec<PathBuf> {
        Vec::new()
    }

    async fn compile(
        &self,
        _source: &SourceArtifact,
        _ctx: &BuildContext<'_>,
    ) -> Result<CompileStatus, SpawnError> {
        Ok(CompileStatus::Succeeded)
    }

    fn resolve_runnable(&self, source: &SourceArtifact, ctx: &BuildContext<'_>) -> Runnable;
}
