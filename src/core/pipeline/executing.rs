use std::path::PathBuf;
use std::sync::Arc;

use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::constants::COMPILER_OUTPUT_CAP_BYTES;
use crate::core::{
    domain::{CompiledTarget, ExecutionLimits, Job, Language, Outcome},
    errors::PipelineError,
    pipeline::{
        classifying::classify, cleanup::release, compiling::prepare,
        materializing::materialize,
    },
    registry::LanguageRegistry,
    traits::{
        language::{BuildContext, LanguageStrategy},
        runner::Runner,
    },
};

/// Materialize, compile, run, classify, clean up.
///
/// Every job gets its own file names, so any number of jobs may run through
/// one `Pipeline` at the same time. There is no admission control here.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    registry: Arc<LanguageRegistry>,
    runner: Arc<dyn Runner>,
}

impl Pipeline {
    /// Creates the working directories once; they are not touched again
    /// except for per-job files.
    pub fn new(
        config: PipelineConfig,
        registry: LanguageRegistry,
        runner: Arc<dyn Runner>,
    ) -> Result<Self, PipelineError> {
        for dir in [&config.codes_dir, &config.outputs_dir] {
            std::fs::create_dir_all(dir).map_err(|source| PipelineError::Workspace {
                path: dir.clone(),
                source,
            })?;
        }

        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            runner,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub(crate) fn runner(&self) -> &dyn Runner {
        self.runner.as_ref()
    }

    /// Rejects unknown language tags before touching the filesystem.
    pub async fn execute(
        &self,
        language: &str,
        source_code: &str,
        stdin: &str,
        time_limit_ms: u64,
        output_cap_bytes: usize,
    ) -> Result<Outcome, PipelineError> {
        let language: Language = language.parse()?;
        let job = Job::new(
            language,
            source_code,
            stdin,
            ExecutionLimits::new(time_limit_ms, output_cap_bytes),
        );
        self.run_job(job).await
    }

    #[tracing::instrument(skip_all, fields(job_id = %job.id, language = %job.language))]
    pub async fn run_job(&self, job: Job) -> Result<Outcome, PipelineError> {
        let strategy = self.strategy(job.language)?;
        tracing::debug!(created_at = %job.created_at, "Job accepted");

        let mut cleanup = Vec::new();
        let outcome = match self
            .build(strategy.as_ref(), job.id, &job.source_code, &mut cleanup)
            .await
        {
            Err(outcome) => outcome,
            Ok(target) => self.run_target(&target, &job).await,
        };
        release(&cleanup).await;

        tracing::info!(
            verdict = %outcome.verdict,
            elapsed_ms = outcome.execution_time_ms,
            "Job finished"
        );
        Ok(outcome)
    }

    pub(crate) fn strategy(
        &self,
        language: Language,
    ) -> Result<Arc<dyn LanguageStrategy>, PipelineError> {
        self.registry.get(language)
    }

    /// Writes and compiles the source. Every path that may be created is pushed
    /// to `cleanup` before the step that creates it. Environment failures come
    /// back as a ready-made `InternalError` outcome.
    pub(crate) async fn build(
        &self,
        strategy: &dyn LanguageStrategy,
        job_id: Uuid,
        source_code: &str,
        cleanup: &mut Vec<PathBuf>,
    ) -> Result<CompiledTarget, Outcome> {
        let (source, written) =
            materialize(strategy, &self.config.codes_dir, job_id, source_code).await;
        cleanup.push(source.path.clone());
        written.map_err(|e| Outcome::internal_error(format!("Failed to write source: {}", e)))?;

        let compile_limits = ExecutionLimits {
            time_limit: self.config.compile_timeout,
            output_cap_bytes: COMPILER_OUTPUT_CAP_BYTES,
        };
        let ctx = BuildContext {
            runner: self.runner.as_ref(),
            outputs_dir: &self.config.outputs_dir,
            compile_limits: &compile_limits,
        };
        cleanup.extend(strategy.artifacts(&source, &ctx));

        prepare(strategy, &source, &ctx).await.map_err(|e| {
            tracing::error!("Internal error while compiling: {}", e);
            Outcome::internal_error(e.to_string())
        })
    }

    async fn run_target(&self, target: &CompiledTarget, job: &Job) -> Outcome {
        let Some(runnable) = target.runnable() else {
            return classify(target, None);
        };

        match self.runner.run(runnable, &job.stdin, &job.limits).await {
            Ok(run) => classify(target, Some(&run)),
            Err(e) => {
                tracing::error!("Internal error while running: {}", e);
                Outcome::internal_error(e.to_string())
            }
        }
    }
}
