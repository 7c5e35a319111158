/// Native module contains implementations of core traits
/// without any isolation layer like Docker or Runc: toolchains
/// and submitted programs run as plain child processes.
pub mod capture;
pub mod languages;
pub mod runner;

use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::core::{errors::PipelineError, pipeline::executing::Pipeline};

use self::{languages::native_registry, runner::NativeRunner};

/// Pipeline over the native registry and runner.
pub fn native_pipeline(config: PipelineConfig) -> Result<Pipeline, PipelineError> {
    let registry = native_registry(&config.toolchain);
    let runner = Arc::new(NativeRunner::new(config.minimum_grace));
    Pipeline::new(config, registry, runner)
}
