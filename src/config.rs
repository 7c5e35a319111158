use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DEFAULT_COMPILE_TIMEOUT, DEFAULT_MINIMUM_GRACE};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: expected milliseconds")]
    InvalidDuration { var: &'static str, value: String },
}

/// Toolchain binaries. Bare names are resolved through `PATH` at spawn time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toolchain {
    pub gpp: PathBuf,
    pub gcc: PathBuf,
    pub python: PathBuf,
    pub javac: PathBuf,
    pub java: PathBuf,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            gpp: "g++".into(),
            gcc: "gcc".into(),
            python: "python3".into(),
            javac: "javac".into(),
            java: "java".into(),
        }
    }
}

impl Toolchain {
    /// Binaries that can't be found, as `(name, path)` pairs.
    pub fn missing(&self) -> Vec<(&'static str, &PathBuf)> {
        [
            ("g++", &self.gpp),
            ("gcc", &self.gcc),
            ("python", &self.python),
            ("javac", &self.javac),
            ("java", &self.java),
        ]
        .into_iter()
        .filter(|(_, path)| which::which(path).is_err())
        .collect()
    }
}

/// Working directories and toolchain for the pipeline. Built once at startup
/// and shared read-only afterwards.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Where job sources are written.
    pub codes_dir: PathBuf,
    /// Where compiled binaries and class directories go.
    pub outputs_dir: PathBuf,
    pub toolchain: Toolchain,
    pub compile_timeout: Duration,
    /// Lower bound of every run deadline.
    pub minimum_grace: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let base_dir = std::env::temp_dir().join("coderunner");
        Self {
            codes_dir: base_dir.join("codes"),
            outputs_dir: base_dir.join("outputs"),
            toolchain: Toolchain::default(),
            compile_timeout: DEFAULT_COMPILE_TIMEOUT,
            minimum_grace: DEFAULT_MINIMUM_GRACE,
        }
    }
}

impl PipelineConfig {
    /// Both working directories under one root.
    pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        Self {
            codes_dir: root.join("codes"),
            outputs_dir: root.join("outputs"),
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let path = |var: &str, default: PathBuf| lookup(var).map(PathBuf::from).unwrap_or(default);

        Ok(Self {
            codes_dir: path("CODERUNNER_CODES_DIR", defaults.codes_dir),
            outputs_dir: path("CODERUNNER_OUTPUTS_DIR", defaults.outputs_dir),
            toolchain: Toolchain {
                gpp: path("GNUCPP_PATH", defaults.toolchain.gpp),
                gcc: path("GCC_PATH", defaults.toolchain.gcc),
                python: path("PYTHON_PATH", defaults.toolchain.python),
                javac: path("JAVAC_PATH", defaults.toolchain.javac),
                java: path("JAVA_PATH", defaults.toolchain.java),
            },
            compile_timeout: millis(
                &lookup,
                "CODERUNNER_COMPILE_TIMEOUT_MS",
                defaults.compile_timeout,
            )?,
            minimum_grace: millis(&lookup, "CODERUNNER_MIN_GRACE_MS", defaults.minimum_grace)?,
        })
    }
}

fn millis<F>(lookup: &F, var: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::InvalidDuration { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = PipelineConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.toolchain, Toolchain::default());
        assert_eq!(config.compile_timeout, Duration::from_millis(5000));
        assert_eq!(config.minimum_grace, Duration::from_millis(50));
        assert!(config.codes_dir.ends_with("coderunner/codes"));
        assert!(config.outputs_dir.ends_with("coderunner/outputs"));
    }

    #[test]
    fn test_overrides_from_environment() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("GNUCPP_PATH", "/opt/gcc/bin/g++"),
            ("CODERUNNER_CODES_DIR", "/srv/codes"),
            ("CODERUNNER_COMPILE_TIMEOUT_MS", " 12000 "),
        ]))
        .unwrap();

        assert_eq!(config.toolchain.gpp, PathBuf::from("/opt/gcc/bin/g++"));
        assert_eq!(config.toolchain.gcc, PathBuf::from("gcc"));
        assert_eq!(config.codes_dir, PathBuf::from("/srv/codes"));
        assert_eq!(config.compile_timeout, Duration::from_secs(12));
    }

    #[test]
    fn test_invalid_duration_is_rejected() {
        let err = PipelineConfig::from_lookup(lookup(&[("CODERUNNER_MIN_GRACE_MS", "soon")]))
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidDuration { var: "CODERUNNER_MIN_GRACE_MS", .. }
        ));
    }

    #[test]
    fn test_with_root_places_both_directories() {
        let config = PipelineConfig::with_root("/var/lib/coderunner");
        assert_eq!(config.codes_dir, PathBuf::from("/var/lib/coderunner/codes"));
        assert_eq!(config.outputs_dir, PathBuf::from("/var/lib/coderunner/outputs"));
    }
}
