//! Error types for `stormfront`
//!
//! The hierarchy mirrors the failure taxonomy of the entrance sequence:
//! particle launch failures are recovered locally, bypass conditions are
//! not errors at all, and anything else surfaces as a [`SequenceError`] so
//! the host can apply the reveal-everything fallback.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `stormfront` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Sequence error (a timeline step failed unexpectedly)
    pub const SEQUENCE_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `stormfront` operations.
#[derive(Debug, Error)]
pub enum StormfrontError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Timeline execution error
    #[error(transparent)]
    Sequence(#[from] SequenceError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StormfrontError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => ExitCode::CONFIG_ERROR,
            Self::Sequence(_) => ExitCode::SEQUENCE_ERROR,
            Self::Json(_) => ExitCode::ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}: {}", summarize(.issues))]
    ValidationError {
        /// Path to the configuration file (or `<defaults>`)
        path: String,
        /// List of validation issues found
        issues: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// Environment variable referenced in configuration is not set
    #[error("environment variable '{var}' not set (referenced at line {line})")]
    EnvVarNotSet {
        /// Name of the environment variable
        var: String,
        /// 1-based line in the raw configuration text
        line: usize,
    },
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., `"stage.particles.count"`)
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Prevents the configuration from being used
    Error,
    /// Reported, but the configuration still loads
    Warning,
}

// ============================================================================
// Sequence Errors
// ============================================================================

/// Unexpected failures while playing the entrance timeline.
///
/// Bypass conditions (reduced motion, missing elements) are not errors;
/// they are reported through [`crate::sequence::RunOutcome`].
#[derive(Debug, Error)]
pub enum SequenceError {
    /// A blocking timeline step panicked or was aborted
    #[error("timeline step '{cue}' failed: {source}")]
    StepFailed {
        /// Label of the cue whose task failed
        cue: String,
        /// Underlying join error
        #[source]
        source: tokio::task::JoinError,
    },

    /// A step panicked on the playback task itself
    #[error("entrance playback panicked: {message}")]
    Panicked {
        /// Panic payload, when it was a string
        message: String,
    },
}

// ============================================================================
// Particle Errors
// ============================================================================

/// Particle simulation launch errors.
///
/// Always recovered locally by the orchestrator; the sequence continues
/// with an absent particle handle.
#[derive(Debug, Error)]
pub enum ParticleError {
    /// No particle container element is attached to the stage
    #[error("particle container is not attached")]
    MissingContainer,

    /// The simulation backend refused to start
    #[error("particle simulation failed to launch: {0}")]
    LaunchFailed(String),
}
