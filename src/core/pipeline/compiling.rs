use crate::core::{
    domain::{CompiledTarget, Runnable, SourceArtifact},
    errors::SpawnError,
    traits::language::{BuildContext, CompileStatus, LanguageStrategy},
};

/// Builds the job's source with its strategy and resolves the command to run.
#[tracing::instrument(skip_all, fields(job_id = %source.job_id, language = %strategy.language()))]
pub async fn prepare(
    strategy: &dyn LanguageStrategy,
    source: &SourceArtifact,
    ctx: &BuildContext<'_>,
) -> Result<CompiledTarget, SpawnError> {
    let artifacts = strategy.artifacts(source, ctx);

    tracing::debug!("Start compiling");
    let status = strategy.compile(source, ctx).await?;
    tracing::debug!("Compilation result: {:?}", status);

    Ok(match status {
        CompileStatus::Succeeded => {
            CompiledTarget::ready(strategy.resolve_runnable(source, ctx), artifacts)
        }
        CompileStatus::Failed { diagnostic } => CompiledTarget::failed(diagnostic, artifacts),
    })
}

/// Runs a toolchain command under the compile limits.
///
/// Timeouts, non-zero exits and signals all count as a failed build. The
/// diagnostic is the compiler's stderr, then its stdout, then a synthesized
/// status line.
pub async fn invoke_compiler(
    command: &Runnable,
    ctx: &BuildContext<'_>,
) -> Result<CompileStatus, SpawnError> {
    tracing::debug!(command = %command, "Invoking compiler");
    let result = ctx.runner.run(command, "", ctx.compile_limits).await?;

    if !result.timed_out && result.exit_code == Some(0) {
        return Ok(CompileStatus::Succeeded);
    }

    let diagnostic = if !result.stderr.is_empty() {
        result.stderr_lossy()
    } else if !result.stdout.is_empty() {
        result.stdout_lossy()
    } else if result.timed_out {
        format!(
            "Compilation timed out after {} ms",
            ctx.compile_limits.time_limit.as_millis()
        )
    } else if let Some(code) = result.exit_code {
        format!("Compiler exited with status {}", code)
    } else {
        format!(
            "Compiler terminated by signal {}",
            result.signal.unwrap_or_default()
        )
    };

    Ok(CompileStatus::Failed { diagnostic })
}
