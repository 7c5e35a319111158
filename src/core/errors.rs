use std::path::PathBuf;

/// Errors returned to the caller of the pipeline. Everything else ends up
/// inside an `Outcome`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("failed to prepare directory {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The process could not be started or awaited. Points at the environment
/// (missing toolchain, permissions), never at the submitted program.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to launch `{program}`: {msg}")]
pub struct SpawnError {
    pub program: String,
    pub msg: String,
}
