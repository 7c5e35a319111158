pub mod config;
pub mod constants;
pub mod core;
pub mod native;

pub use crate::config::{ConfigError, PipelineConfig, Toolchain};
pub use crate::core::{
    domain::{ExecutionLimits, Job, Language, Outcome, Verdict},
    errors::PipelineError,
    pipeline::{
        executing::Pipeline,
        grading::{CaseReport, TestCase},
    },
};
pub use crate::native::native_pipeline;
