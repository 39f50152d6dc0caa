//! Configuration loader.
//!
//! Pipeline:
//! 1. Read the file (UTF-8 BOM stripped)
//! 2. Environment variable expansion on the raw text
//! 3. YAML parsing into [`RunConfig`]
//! 4. Validation; errors abort, warnings are returned alongside
//! 5. Freeze with `Arc`

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{ConfigError, Severity, ValidationIssue};

use super::schema::RunConfig;

/// Origin label used when no file backs the configuration.
pub const DEFAULTS_ORIGIN: &str = "<defaults>";

/// Result of loading a configuration.
#[derive(Debug)]
pub struct LoadResult {
    /// The validated configuration.
    pub config: Arc<RunConfig>,

    /// Non-fatal issues found during validation.
    pub warnings: Vec<ValidationIssue>,
}

/// Loads run configurations from YAML.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Creates a loader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, an environment
    /// variable without a default is unset, YAML parsing fails, or
    /// validation reports any error-severity issue.
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        debug!(path = %path.display(), bytes = raw.len(), "loading configuration");
        self.load_str(&raw, path)
    }

    /// Loads and validates configuration text; `origin` is used in errors.
    ///
    /// # Errors
    ///
    /// See [`ConfigLoader::load`].
    pub fn load_str(&self, raw: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let expanded = expand_env(raw).map_err(|e| match e {
            ConfigError::ParseError { line, message, .. } => ConfigError::ParseError {
                path: origin.to_path_buf(),
                line,
                message,
            },
            other => other,
        })?;

        let config: RunConfig = if expanded.trim().is_empty() {
            RunConfig::default()
        } else {
            serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?
        };

        finish(config, &origin.display().to_string())
    }

    /// Validates a configuration built in code (defaults plus CLI flags).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] on any error-severity issue.
    pub fn check(&self, config: RunConfig) -> Result<LoadResult, ConfigError> {
        finish(config, DEFAULTS_ORIGIN)
    }
}

fn finish(config: RunConfig, origin: &str) -> Result<LoadResult, ConfigError> {
    let issues = config.validate();
    if issues.iter().any(|i| i.severity == Severity::Error) {
        return Err(ConfigError::ValidationError {
            path: origin.to_string(),
            issues,
        });
    }
    for issue in &issues {
        warn!(origin, "{issue}");
    }
    Ok(LoadResult {
        config: Arc::new(config),
        warnings: issues,
    })
}

/// Expands environment references in raw YAML text.
///
/// Supports:
/// - `${VAR}` - value of `VAR`; error if unset
/// - `${VAR:-default}` - `default` if `VAR` is unset
/// - `$$` - literal `$`
fn expand_env(raw: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(raw.len());
    let mut line = 1usize;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\n' => {
                line += 1;
                out.push(c);
            }
            '$' if chars.peek() == Some(&'$') => {
                chars.next();
                out.push('$');
            }
            '$' if chars.peek() == Some(&'{') => {
                chars.next();
                let mut spec = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    spec.push(c);
                }
                if !closed {
                    return Err(ConfigError::ParseError {
                        path: Path::new(DEFAULTS_ORIGIN).to_path_buf(),
                        line: Some(line),
                        message: format!("unclosed environment reference: ${{{spec}"),
                    });
                }

                let (var, default) = match spec.split_once(":-") {
                    Some((var, default)) => (var, Some(default)),
                    None => (spec.as_str(), None),
                };
                match (std::env::var(var), default) {
                    (Ok(value), _) => out.push_str(&value),
                    (Err(_), Some(default)) => out.push_str(default),
                    (Err(_), None) => {
                        return Err(ConfigError::EnvVarNotSet {
                            var: var.to_string(),
                            line,
                        });
                    }
                }
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}
