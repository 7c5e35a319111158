use std::time::Duration;

pub const STDOUT_TRUNCATION_MARKER: &str = "\n...[output truncated]";
pub const STDERR_TRUNCATION_MARKER: &str = "\n...[stderr truncated]";

/// Separates stdout from stderr in an outcome's combined output.
pub const STDERR_DELIMITER: &str = "\n--- stderr ---\n";

pub const DEFAULT_TIME_LIMIT_MS: u64 = 2000;
pub const DEFAULT_OUTPUT_CAP_BYTES: usize = 10_000;

pub const DEFAULT_COMPILE_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_MINIMUM_GRACE: Duration = Duration::from_millis(50);

/// Upper bound on compiler diagnostics kept for a compile error.
pub const COMPILER_OUTPUT_CAP_BYTES: usize = 64 * 1024;

/// How long stream readers may keep draining once the process is resolved.
pub const DRAIN_GRACE: Duration = Duration::from_millis(250);
