//! Layered settings: defaults, then an optional YAML file, then environment
//! variables, then process arguments — each layer overriding only the
//! fields it actually sets.
//!
//! Uses direct `std::env::var(...)` reads for the environment layer
//! rather than a generic layered-config crate.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use superego_breaker::BreakerConfig;
use superego_inference::cli::CliProviderConfig;
use thiserror::Error;

/// Environment variable naming the rules file path.
pub const ENV_RULES_PATH: &str = "SUPEREGO_RULES";
/// Environment variable naming the (optional) settings YAML file.
pub const ENV_CONFIG_PATH: &str = "SUPEREGO_CONFIG";
/// Environment variable overriding the tracing filter.
pub const ENV_LOG_LEVEL: &str = "SUPEREGO_LOG_LEVEL";
/// Environment variable overriding the HTTP listen port.
pub const ENV_HTTP_PORT: &str = "SUPEREGO_HTTP_PORT";

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The settings file did not parse as valid YAML for this schema.
    #[error("invalid config file {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },
    /// An environment variable held a value of the wrong type.
    #[error("environment variable {name} has an invalid value: {value}")]
    InvalidEnvValue {
        /// Variable name.
        name: &'static str,
        /// The value that failed to parse.
        value: String,
    },
}

/// File-layer schema: every field optional, so a partial file only
/// overrides what it names.
#[derive(Debug, Default, Deserialize)]
struct FileLayer {
    rules_path: Option<PathBuf>,
    log_level: Option<String>,
    http_port: Option<u16>,
    audit_capacity: Option<usize>,
    audit_ttl_seconds: Option<i64>,
    #[serde(default)]
    breaker: BreakerFileLayer,
    #[serde(default)]
    providers: Vec<CliProviderFileLayer>,
    #[serde(default)]
    sensitive_key_patterns: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct BreakerFileLayer {
    failure_threshold: Option<u32>,
    recovery_timeout_secs: Option<u64>,
    success_threshold: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CliProviderFileLayer {
    name: String,
    program: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env_passthrough: Vec<String>,
    #[serde(default = "default_provider_cwd")]
    cwd: String,
    #[serde(default = "default_provider_timeout_secs")]
    timeout_secs: u64,
    #[serde(default = "default_provider_attempts")]
    attempts: u32,
}

fn default_provider_cwd() -> String {
    "/".to_string()
}
fn default_provider_timeout_secs() -> u64 {
    10
}
fn default_provider_attempts() -> u32 {
    2
}

/// Fully resolved configuration, after every layer has been applied.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Path to the active rules YAML file.
    pub rules_path: PathBuf,
    /// Tracing filter directive (e.g. `"info"`, `"debug,superego_policy=trace"`).
    pub log_level: String,
    /// HTTP listen port for `superego-transport`'s REST/WS/SSE server.
    pub http_port: u16,
    /// Maximum number of entries the audit log retains.
    pub audit_capacity: usize,
    /// Audit entry time-to-live, in seconds.
    pub audit_ttl_seconds: i64,
    /// Circuit breaker configuration guarding provider calls.
    pub breaker: BreakerConfig,
    /// Configured CLI inference providers, in registration order.
    pub providers: Vec<CliProviderConfig>,
    /// Overrides for which parameter-tree keys are treated as sensitive;
    /// `None` keeps `superego_sanitize::Redactor`'s built-in defaults.
    pub sensitive_key_patterns: Option<Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from("rules.yaml"),
            log_level: "info".to_string(),
            http_port: 8080,
            audit_capacity: superego_audit::DEFAULT_CAPACITY,
            audit_ttl_seconds: superego_audit::DEFAULT_TTL_SECONDS,
            breaker: BreakerConfig::default(),
            providers: Vec::new(),
            sensitive_key_patterns: None,
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional YAML file, environment
    /// variables, then `args` (simple `--key=value` flags), in that
    /// precedence.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if a named file cannot be read/parsed, or an
    /// environment variable holds a value that fails to parse for its
    /// field's type.
    pub fn load(file_path: Option<&std::path::Path>, args: &[String]) -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(path) = file_path {
            settings.apply_file(path)?;
        }
        settings.apply_env()?;
        settings.apply_args(args)?;
        Ok(settings)
    }

    fn apply_file(&mut self, path: &std::path::Path) -> Result<(), ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let layer: FileLayer = serde_yaml::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;

        if let Some(v) = layer.rules_path {
            self.rules_path = v;
        }
        if let Some(v) = layer.log_level {
            self.log_level = v;
        }
        if let Some(v) = layer.http_port {
            self.http_port = v;
        }
        if let Some(v) = layer.audit_capacity {
            self.audit_capacity = v;
        }
        if let Some(v) = layer.audit_ttl_seconds {
            self.audit_ttl_seconds = v;
        }
        if let Some(v) = layer.breaker.failure_threshold {
            self.breaker.failure_threshold = v;
        }
        if let Some(v) = layer.breaker.recovery_timeout_secs {
            self.breaker.recovery_timeout = Duration::from_secs(v);
        }
        if let Some(v) = layer.breaker.success_threshold {
            self.breaker.success_threshold = v;
        }
        if let Some(v) = layer.sensitive_key_patterns {
            self.sensitive_key_patterns = Some(v);
        }
        if !layer.providers.is_empty() {
            self.providers = layer
                .providers
                .into_iter()
                .map(|p| CliProviderConfig {
                    name: p.name,
                    program: p.program,
                    args: p.args,
                    env_passthrough: p.env_passthrough,
                    cwd: p.cwd,
                    timeout: Duration::from_secs(p.timeout_secs),
                    attempts: p.attempts,
                    retry_delay: Duration::from_millis(100),
                })
                .collect();
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = std::env::var(ENV_RULES_PATH) {
            self.rules_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var(ENV_LOG_LEVEL) {
            self.log_level = v;
        }
        if let Ok(v) = std::env::var(ENV_HTTP_PORT) {
            self.http_port = v.parse().map_err(|_| ConfigError::InvalidEnvValue {
                name: ENV_HTTP_PORT,
                value: v,
            })?;
        }
        Ok(())
    }

    fn apply_args(&mut self, args: &[String]) -> Result<(), ConfigError> {
        for arg in args {
            let Some(rest) = arg.strip_prefix("--") else { continue };
            let Some((key, value)) = rest.split_once('=') else { continue };
            match key {
                "rules-path" => self.rules_path = PathBuf::from(value),
                "log-level" => self.log_level = value.to_string(),
                "http-port" => {
                    self.http_port = value.parse().map_err(|_| ConfigError::InvalidEnvValue {
                        name: "--http-port",
                        value: value.to_string(),
                    })?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.http_port, 8080);
        assert_eq!(settings.audit_capacity, superego_audit::DEFAULT_CAPACITY);
    }

    #[test]
    fn file_layer_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "http_port: 9000\nlog_level: debug").unwrap();
        let settings = Settings::load(Some(file.path()), &[]).unwrap();
        assert_eq!(settings.http_port, 9000);
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn args_override_file_and_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "http_port: 9000").unwrap();
        let args = vec!["--http-port=9100".to_string()];
        let settings = Settings::load(Some(file.path()), &args).unwrap();
        assert_eq!(settings.http_port, 9100);
    }

    #[test]
    fn env_overrides_file_but_args_override_env() {
        std::env::set_var(ENV_LOG_LEVEL, "warn");
        let settings = Settings::load(None, &["--log-level=trace".to_string()]).unwrap();
        assert_eq!(settings.log_level, "trace");
        std::env::remove_var(ENV_LOG_LEVEL);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Settings::load(Some(std::path::Path::new("/nonexistent/path.yaml")), &[]);
        assert!(err.is_err());
    }
}
