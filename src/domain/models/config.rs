use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Convergence loop limits
    #[serde(default)]
    pub controller: ControllerConfig,

    /// Wait durations between attempts
    #[serde(default)]
    pub backoff: BackoffConfig,

    /// Signal patterns used to classify apply outcomes
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// HTTP target connection
    #[serde(default)]
    pub target: TargetConfig,

    /// Audit report output
    #[serde(default)]
    pub audit: AuditConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Convergence loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ControllerConfig {
    /// Maximum apply attempts charged against the budget
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Upper bound on any single adapter call, in milliseconds
    #[serde(default = "default_per_attempt_timeout_ms")]
    pub per_attempt_timeout_ms: u64,

    /// Stop without applying anything when the first observation is already zero
    #[serde(default = "default_true")]
    pub initial_pending_check: bool,

    /// Consecutive rate-limited outcomes tolerated before giving up
    #[serde(default = "default_max_consecutive_rate_limits")]
    pub max_consecutive_rate_limits: u32,
}

const fn default_max_attempts() -> u32 {
    15
}

const fn default_per_attempt_timeout_ms() -> u64 {
    60_000
}

const fn default_true() -> bool {
    true
}

const fn default_max_consecutive_rate_limits() -> u32 {
    5
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            per_attempt_timeout_ms: default_per_attempt_timeout_ms(),
            initial_pending_check: true,
            max_consecutive_rate_limits: default_max_consecutive_rate_limits(),
        }
    }
}

impl ControllerConfig {
    pub const fn per_attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.per_attempt_timeout_ms)
    }
}

/// How the transient-failure delay grows with the attempt count
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// `base * attempts`, capped
    #[default]
    Linear,
    /// `base * 2^(attempts - 1)`, capped
    Exponential,
}

/// Backoff policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BackoffConfig {
    #[serde(default)]
    pub strategy: BackoffStrategy,

    /// Base delay for transient and indeterminate outcomes
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Cap for transient and indeterminate outcomes
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Fixed delay after a rate-limited outcome
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,

    /// Pause after a successful apply
    #[serde(default = "default_success_pause_ms")]
    pub success_pause_ms: u64,
}

const fn default_base_delay_ms() -> u64 {
    5_000
}

const fn default_max_delay_ms() -> u64 {
    60_000
}

const fn default_rate_limit_delay_ms() -> u64 {
    180_000
}

const fn default_success_pause_ms() -> u64 {
    2_000
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            strategy: BackoffStrategy::default(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
            success_pause_ms: default_success_pause_ms(),
        }
    }
}

impl BackoffConfig {
    /// All delays zero. Used by simulations and tests.
    pub fn immediate() -> Self {
        Self {
            strategy: BackoffStrategy::Linear,
            base_delay_ms: 0,
            max_delay_ms: 0,
            rate_limit_delay_ms: 0,
            success_pause_ms: 0,
        }
    }
}

/// Case-insensitive regular expressions per outcome kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClassifierConfig {
    #[serde(default = "default_rate_limited_patterns")]
    pub rate_limited: Vec<String>,

    #[serde(default = "default_terminal_patterns")]
    pub terminal: Vec<String>,

    #[serde(default = "default_transient_patterns")]
    pub transient: Vec<String>,

    #[serde(default = "default_success_patterns")]
    pub success: Vec<String>,
}

fn to_strings(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(ToString::to_string).collect()
}

fn default_rate_limited_patterns() -> Vec<String> {
    to_strings(&[r"rate[\s_-]?limit", r"too many( requests)?", r"throttl", r"\b429\b"])
}

fn default_terminal_patterns() -> Vec<String> {
    to_strings(&[
        r"does not exist",
        r"not found",
        r"permission denied",
        r"unauthori[sz]ed",
        r"forbidden",
        r"access denied",
        r"syntax error",
        r"already exists",
    ])
}

fn default_transient_patterns() -> Vec<String> {
    to_strings(&[
        r"edge function",
        r"time[sd]? ?out",
        r"network",
        r"connection (reset|refused|closed)",
        r"(service|temporarily) unavailable",
        r"bad gateway",
        r"\b(not|no|0)\s+(\w+\s+)?applied\b",
        r"\bunsuccessful(ly)?\b",
        r"\bincomplete\b",
        r"\b5\d\d\b",
        r"error",
        r"fail(ed|ure)?",
    ])
}

fn default_success_patterns() -> Vec<String> {
    to_strings(&[r"\bsuccess(ful(ly)?)?\b", r"\bapplied\b", r"\bcomplete(d)?\b"])
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rate_limited: default_rate_limited_patterns(),
            terminal: default_terminal_patterns(),
            transient: default_transient_patterns(),
            success: default_success_patterns(),
        }
    }
}

/// HTTP migration-runner target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TargetConfig {
    /// Base URL of the migration runner API
    #[serde(default)]
    pub base_url: String,

    /// Bearer token sent with every request
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,

    #[serde(default = "default_status_path")]
    pub status_path: String,

    #[serde(default = "default_pending_path")]
    pub pending_path: String,

    #[serde(default = "default_apply_path")]
    pub apply_path: String,
}

fn default_status_path() -> String {
    "/status".to_string()
}

fn default_pending_path() -> String {
    "/pending".to_string()
}

fn default_apply_path() -> String {
    "/apply".to_string()
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_token: None,
            status_path: default_status_path(),
            pending_path: default_pending_path(),
            apply_path: default_apply_path(),
        }
    }
}

/// Audit report configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuditConfig {
    /// Write JSON reports to `report_dir`
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
}

fn default_report_dir() -> PathBuf {
    PathBuf::from(".converge/reports")
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            report_dir: default_report_dir(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Log file rotation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Directory for log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}
