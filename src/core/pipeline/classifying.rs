use crate::core::domain::{BuildStatus, CompiledTarget, Outcome, RunResult, Verdict};

/// Maps a build and its run to a verdict. Pure: no I/O, no hidden state.
///
/// Order matters: compile failure, then deadline, then abnormal exit.
/// Whether the output is a correct answer is not decided here.
pub fn classify(target: &CompiledTarget, run: Option<&RunResult>) -> Outcome {
    let run = match (&target.status, run) {
        (BuildStatus::Failed { diagnostic }, _) => {
            return Outcome {
                verdict: Verdict::CompileError,
                output: diagnostic.clone(),
                execution_time_ms: 0,
                exit_code: None,
                signal: None,
            };
        }
        (BuildStatus::Ready(_), None) => {
            return Outcome::internal_error("Program was built but never run".to_string());
        }
        (BuildStatus::Ready(_), Some(run)) => run,
    };

    let verdict = if run.timed_out {
        Verdict::TimeLimitExceeded
    } else if run.signal.is_some() || run.exit_code.is_some_and(|code| code != 0) {
        Verdict::RuntimeError
    } else if run.exit_code == Some(0) {
        Verdict::Accepted
    } else {
        Verdict::InternalError
    };

    Outcome {
        verdict,
        output: run.combined_output(),
        execution_time_ms: run.execution_time_ms,
        exit_code: run.exit_code,
        signal: run.signal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::Runnable;

    fn ready() -> CompiledTarget {
        CompiledTarget::ready(Runnable::new("/tmp/job.out"), vec![])
    }

    fn exited(code: i32) -> RunResult {
        RunResult {
            stdout: b"out".to_vec(),
            exit_code: Some(code),
            execution_time_ms: 12,
            ..Default::default()
        }
    }

    #[test]
    fn test_compile_error_wins() {
        let target = CompiledTarget::failed("main.cpp:1: error".to_string(), vec![]);

        let outcome = classify(&target, Some(&exited(0)));

        assert_eq!(outcome.verdict, Verdict::CompileError);
        assert_eq!(outcome.output, "main.cpp:1: error");
        assert_eq!(outcome.exit_code, None);
    }

    #[test]
    fn test_timeout_wins_over_exit_status() {
        let run = RunResult {
            timed_out: true,
            exit_code: Some(0),
            ..exited(0)
        };

        assert_eq!(classify(&ready(), Some(&run)).verdict, Verdict::TimeLimitExceeded);
    }

    #[test]
    fn test_nonzero_exit_and_signal_are_runtime_errors() {
        assert_eq!(classify(&ready(), Some(&exited(1))).verdict, Verdict::RuntimeError);

        let signalled = RunResult {
            exit_code: None,
            signal: Some(11),
            ..exited(0)
        };
        let outcome = classify(&ready(), Some(&signalled));
        assert_eq!(outcome.verdict, Verdict::RuntimeError);
        assert_eq!(outcome.signal, Some(11));
    }

    #[test]
    fn test_clean_exit_is_accepted() {
        let run = RunResult {
            stderr: b"debug".to_vec(),
            ..exited(0)
        };

        let outcome = classify(&ready(), Some(&run));

        assert_eq!(outcome.verdict, Verdict::Accepted);
        assert_eq!(outcome.output, "out\n--- stderr ---\ndebug");
        assert_eq!(outcome.execution_time_ms, 12);
        assert_eq!(outcome.exit_code, Some(0));
    }

    #[test]
    fn test_ready_target_without_run_is_internal_error() {
        assert_eq!(classify(&ready(), None).verdict, Verdict::InternalError);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let cases = [
            (ready(), Some(exited(0))),
            (ready(), Some(exited(2))),
            (CompiledTarget::failed("e".to_string(), vec![]), None),
        ];

        for (target, run) in &cases {
            assert_eq!(classify(target, run.as_ref()), classify(target, run.as_ref()));
        }
    }
}
