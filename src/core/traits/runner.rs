use crate::core::{
    domain::{ExecutionLimits, RunResult, Runnable},
    errors::SpawnError,
};

#[mockall::automock]
#[async_trait::async_trait]
pub trait Runner: std::fmt::Debug + Send + Sync {
    async fn run(
        &self,
        runnable: &Runnable,
        stdin: &str,
        limits: &ExecutionLimits,
    ) -> Result<RunResult, SpawnError>;
}
