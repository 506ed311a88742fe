use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed classification of one apply attempt.
///
/// Variants are declared in ascending priority order so that `Ord` matches
/// the tie-breaking rule used by the classifier: when several kinds are
/// plausible for one signal, the greatest wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// No recognizable signal. Retried like a transient failure.
    Indeterminate,
    /// The item was applied.
    Success,
    /// A failure that may succeed on retry (network, edge function, 5xx).
    TransientFailure,
    /// A structural failure that retrying will not fix.
    TerminalFailure,
    /// The target is throttling requests.
    RateLimited,
}

impl OutcomeKind {
    /// All kinds, highest priority first.
    pub const BY_PRIORITY: [Self; 5] = [
        Self::RateLimited,
        Self::TerminalFailure,
        Self::TransientFailure,
        Self::Success,
        Self::Indeterminate,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Indeterminate => "indeterminate",
            Self::Success => "success",
            Self::TransientFailure => "transient_failure",
            Self::TerminalFailure => "terminal_failure",
            Self::RateLimited => "rate_limited",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "indeterminate" => Some(Self::Indeterminate),
            "success" => Some(Self::Success),
            "transient_failure" | "transient" => Some(Self::TransientFailure),
            "terminal_failure" | "terminal" => Some(Self::TerminalFailure),
            "rate_limited" | "ratelimited" => Some(Self::RateLimited),
            _ => None,
        }
    }

    /// Whether this outcome consumes one unit of the attempt budget.
    pub const fn consumes_budget(&self) -> bool {
        !matches!(self, Self::RateLimited)
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw response from an apply call, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawSignal {
    /// Free-form text, e.g. a status banner read from the target.
    Text { text: String },
    /// A status code with an optional body, e.g. from an HTTP API.
    Status { code: u16, body: String },
    /// Nothing recognizable arrived within the per-attempt timeout.
    None,
}

impl RawSignal {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn status(code: u16, body: impl Into<String>) -> Self {
        Self::Status {
            code,
            body: body.into(),
        }
    }

    /// The textual part of the signal, if any.
    pub fn body(&self) -> &str {
        match self {
            Self::Text { text } => text,
            Self::Status { body, .. } => body,
            Self::None => "",
        }
    }

    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Short human-readable summary used as the audit message.
    pub fn summary(&self) -> String {
        match self {
            Self::Text { text } => text.trim().to_string(),
            Self::Status { code, body } if body.trim().is_empty() => format!("HTTP {code}"),
            Self::Status { code, body } => format!("HTTP {code}: {}", body.trim()),
            Self::None => "no signal".to_string(),
        }
    }
}

/// Classified result of one apply attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub kind: OutcomeKind,
    /// Human-readable detail. Never inspected by control logic.
    pub message: String,
}

impl ApplyOutcome {
    pub fn new(kind: OutcomeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
