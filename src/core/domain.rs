use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::constants::STDERR_DELIMITER;
use crate::core::errors::PipelineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Language {
    Cpp,
    C,
    Python,
    Java,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::Cpp, Language::C, Language::Python, Language::Java];

    pub fn tag(&self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::Python => "python",
            Language::Java => "java",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::Python => "py",
            Language::Java => "java",
        }
    }
}

impl FromStr for Language {
    type Err = PipelineError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|language| language.tag() == tag)
            .ok_or_else(|| PipelineError::UnsupportedLanguage(tag.to_string()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionLimits {
    pub time_limit: Duration,
    pub output_cap_bytes: usize,
}

impl ExecutionLimits {
    pub fn new(time_limit_ms: u64, output_cap_bytes: usize) -> Self {
        Self {
            time_limit: Duration::from_millis(time_limit_ms),
            output_cap_bytes,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Job {
    pub id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub language: Language,
    pub source_code: String,
    pub stdin: String,
    pub limits: ExecutionLimits,
}

impl Job {
    pub fn new(language: Language, source_code: &str, stdin: &str, limits: ExecutionLimits) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: chrono::Utc::now(),
            language,
            source_code: source_code.to_string(),
            stdin: stdin.to_string(),
            limits,
        }
    }
}

/// Extra facts the materializer hands over to the compile step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildMeta {
    /// Public type name the launcher has to start (Java only).
    pub class_name: Option<String>,
}

/// Source text after language-specific fixes, not yet on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedSource {
    pub file_name: String,
    pub contents: String,
    pub meta: BuildMeta,
}

/// Source file written for a job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceArtifact {
    pub job_id: Uuid,
    pub path: PathBuf,
    pub meta: BuildMeta,
}

/// Argument-vector command; never passed through a shell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Runnable {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl Runnable {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for Runnable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildStatus {
    Ready(Runnable),
    Failed { diagnostic: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledTarget {
    pub status: BuildStatus,
    /// Paths produced by the compile step; the source file is tracked separately.
    pub artifacts: Vec<PathBuf>,
}

impl CompiledTarget {
    pub fn ready(runnable: Runnable, artifacts: Vec<PathBuf>) -> Self {
        Self {
            status: BuildStatus::Ready(runnable),
            artifacts,
        }
    }

    pub fn failed(diagnostic: String, artifacts: Vec<PathBuf>) -> Self {
        Self {
            status: BuildStatus::Failed { diagnostic },
            artifacts,
        }
    }

    pub fn runnable(&self) -> Option<&Runnable> {
        match &self.status {
            BuildStatus::Ready(runnable) => Some(runnable),
            BuildStatus::Failed { .. } => None,
        }
    }

    pub fn compile_error(&self) -> Option<&str> {
        match &self.status {
            BuildStatus::Ready(_) => None,
            BuildStatus::Failed { diagnostic } => Some(diagnostic),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub timed_out: bool,
    pub output_limit_exceeded: bool,
    pub execution_time_ms: u64,
}

impl RunResult {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Stdout followed by stderr under a delimiter when stderr is not empty.
    pub fn combined_output(&self) -> String {
        let mut output = self.stdout_lossy();
        if !self.stderr.is_empty() {
            output.push_str(STDERR_DELIMITER);
            output.push_str(&self.stderr_lossy());
        }
        output
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Verdict {
    Accepted,
    CompileError,
    RuntimeError,
    TimeLimitExceeded,
    InternalError,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::Accepted => "Accepted",
            Verdict::CompileError => "Compile Error",
            Verdict::RuntimeError => "Runtime Error",
            Verdict::TimeLimitExceeded => "Time Limit Exceeded",
            Verdict::InternalError => "Internal Error",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub verdict: Verdict,
    pub output: String,
    pub execution_time_ms: u64,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
}

impl Outcome {
    pub fn internal_error(msg: String) -> Self {
        Self {
            verdict: Verdict::InternalError,
            output: msg,
            execution_time_ms: 0,
            exit_code: None,
            signal: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_tags_round_trip() {
        for language in Language::ALL {
            assert_eq!(language.tag().parse::<Language>().unwrap(), language);
        }
    }

    #[test]
    fn test_unknown_language_tag() {
        let err = "ruby".parse::<Language>().unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedLanguage(tag) if tag == "ruby"));
        assert!("Python".parse::<Language>().is_err());
    }

    #[test]
    fn test_combined_output_skips_empty_stderr() {
        let result = RunResult {
            stdout: b"42\n".to_vec(),
            ..Default::default()
        };
        assert_eq!(result.combined_output(), "42\n");

        let result = RunResult {
            stdout: b"42\n".to_vec(),
            stderr: b"warning".to_vec(),
            ..Default::default()
        };
        assert_eq!(result.combined_output(), "42\n\n--- stderr ---\nwarning");
    }

    #[test]
    fn test_compiled_target_accessors() {
        let target = CompiledTarget::ready(Runnable::new("/bin/true"), vec![]);
        assert!(target.compile_error().is_none());
        assert_eq!(target.runnable().unwrap().program, PathBuf::from("/bin/true"));

        let target = CompiledTarget::failed("boom".to_string(), vec![]);
        assert!(target.runnable().is_none());
        assert_eq!(target.compile_error(), Some("boom"));
    }

    #[test]
    fn test_outcome_serializes_camel_case() {
        let json = serde_json::to_value(Outcome::internal_error("boom".to_string())).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "verdict": "InternalError",
                "output": "boom",
                "executionTimeMs": 0,
                "exitCode": null,
                "signal": null,
            })
        );
    }
}
