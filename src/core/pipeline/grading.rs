use futures::stream::FuturesUnordered;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::core::{
    domain::{CompiledTarget, ExecutionLimits, Language, Outcome, Verdict},
    errors::PipelineError,
    pipeline::{classifying::classify, cleanup::release, executing::Pipeline},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseReport {
    pub index: usize,
    pub passed: bool,
    pub outcome: Outcome,
}

impl Pipeline {
    /// Compiles once and runs every case against the same target, all at the
    /// same time. Reports come back in case order.
    #[tracing::instrument(skip_all, fields(language = %language, cases = cases.len()))]
    pub async fn execute_with_testcases(
        &self,
        language: &str,
        source_code: &str,
        cases: &[TestCase],
        limits: &ExecutionLimits,
    ) -> Result<Vec<CaseReport>, PipelineError> {
        let language: Language = language.parse()?;
        let strategy = self.strategy(language)?;
        let job_id = Uuid::new_v4();

        let mut cleanup = Vec::new();
        let reports = match self
            .build(strategy.as_ref(), job_id, source_code, &mut cleanup)
            .await
        {
            Err(outcome) => (0..cases.len())
                .map(|index| CaseReport {
                    index,
                    passed: false,
                    outcome: outcome.clone(),
                })
                .collect(),
            Ok(target) => self.run_cases(&target, cases, limits).await,
        };
        release(&cleanup).await;

        tracing::info!(
            %job_id,
            passed = reports.iter().filter(|r| r.passed).count(),
            "Test cases finished"
        );
        Ok(reports)
    }

    async fn run_cases(
        &self,
        target: &CompiledTarget,
        cases: &[TestCase],
        limits: &ExecutionLimits,
    ) -> Vec<CaseReport> {
        let Some(runnable) = target.runnable() else {
            let outcome = classify(target, None);
            return (0..cases.len())
                .map(|index| CaseReport {
                    index,
                    passed: false,
                    outcome: outcome.clone(),
                })
                .collect();
        };

        let mut running: FuturesUnordered<_> = cases
            .iter()
            .enumerate()
            .map(|(index, case)| async move {
                (index, self.runner().run(runnable, &case.input, limits).await)
            })
            .collect();

        let mut reports = Vec::with_capacity(cases.len());
        while let Some((index, result)) = running.next().await {
            let case = &cases[index];
            let report = match result {
                Ok(run) => {
                    let outcome = classify(target, Some(&run));
                    let passed = outcome.verdict == Verdict::Accepted
                        && normalize(&run.stdout_lossy()) == normalize(&case.expected_output);
                    CaseReport {
                        index,
                        passed,
                        outcome,
                    }
                }
                Err(e) => {
                    tracing::error!(index, "Internal error while running case: {}", e);
                    CaseReport {
                        index,
                        passed: false,
                        outcome: Outcome::internal_error(e.to_string()),
                    }
                }
            };
            reports.push(report);
        }

        reports.sort_by_key(|report| report.index);
        reports
    }
}

/// Trailing whitespace on each line and trailing blank lines are not significant.
pub fn normalize(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .join("\n")
        .trim_end_matches('\n')
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::config::PipelineConfig;
    use crate::core::{domain::RunResult, traits::runner::MockRunner};
    use crate::native::languages::native_registry;

    fn pipeline_with(runner: MockRunner) -> (tempfile::TempDir, Pipeline) {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::with_root(dir.path());
        let registry = native_registry(&config.toolchain);
        let pipeline = Pipeline::new(config, registry, Arc::new(runner)).unwrap();
        (dir, pipeline)
    }

    fn case(input: &str, expected_output: &str) -> TestCase {
        TestCase {
            input: input.to_string(),
            expected_output: expected_output.to_string(),
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("1 2  \n3\t\n\n\n"), "1 2\n3");
        assert_eq!(normalize("a\r\nb\r\n"), "a\nb");
        assert_eq!(normalize(""), "");
        assert_ne!(normalize(" a"), normalize("a"));
    }

    #[test]
    fn test_cases_deserialize_from_camel_case() {
        let cases: Vec<TestCase> =
            serde_json::from_str(r#"[{"input": "1 2", "expectedOutput": "3"}]"#).unwrap();

        assert_eq!(cases, vec![case("1 2", "3")]);
    }

    #[tokio::test]
    async fn test_each_case_is_graded_against_its_expectation() {
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .withf(|runnable, _, _| runnable.program == PathBuf::from("python3"))
            .times(3)
            .returning(|_, stdin, _| {
                let stdout = match stdin {
                    "1 2" => "3 \n\n",
                    "2 2" => "5\n",
                    _ => "",
                };
                Ok(RunResult {
                    stdout: stdout.as_bytes().to_vec(),
                    exit_code: Some(if stdin.is_empty() { 1 } else { 0 }),
                    ..Default::default()
                })
            });
        let (dir, pipeline) = pipeline_with(runner);

        let reports = pipeline
            .execute_with_testcases(
                "python",
                "a, b = map(int, input().split()); print(a + b)",
                &[case("1 2", "3"), case("2 2", "4"), case("", "")],
                &ExecutionLimits::new(1000, 1000),
            )
            .await
            .unwrap();

        assert_eq!(reports.iter().map(|r| r.index).collect::<Vec<_>>(), [0, 1, 2]);
        assert!(reports[0].passed);
        assert!(!reports[1].passed);
        assert_eq!(reports[1].outcome.verdict, Verdict::Accepted);
        assert!(!reports[2].passed);
        assert_eq!(reports[2].outcome.verdict, Verdict::RuntimeError);
        assert_eq!(std::fs::read_dir(dir.path().join("codes")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_compile_error_fails_every_case_without_running() {
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .times(1)
            .withf(|runnable, _, _| runnable.program == PathBuf::from("gcc"))
            .return_const(Ok(RunResult {
                stderr: b"error: unknown type name 'nt'".to_vec(),
                exit_code: Some(1),
                ..Default::default()
            }));
        let (_dir, pipeline) = pipeline_with(runner);

        let reports = pipeline
            .execute_with_testcases(
                "c",
                "nt main() {}",
                &[case("", ""), case("x", "x")],
                &ExecutionLimits::new(1000, 1000),
            )
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| !r.passed));
        assert!(
            reports
                .iter()
                .all(|r| r.outcome.verdict == Verdict::CompileError)
        );
    }

    #[tokio::test]
    async fn test_unsupported_language_is_rejected() {
        let mut runner = MockRunner::new();
        runner.expect_run().never();
        let (_dir, pipeline) = pipeline_with(runner);

        let result = pipeline
            .execute_with_testcases("cobol", "", &[case("", "")], &ExecutionLimits::new(1000, 1000))
            .await;

        assert!(matches!(result, Err(PipelineError::UnsupportedLanguage(_))));
    }
}
