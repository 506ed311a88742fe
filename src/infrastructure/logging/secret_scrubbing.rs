use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static BEARER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)bearer\s+[a-zA-Z0-9\-_\.=]+"));
static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"(?i)["']?(api_key|apikey|access_token|token|secret|service_role_key)["']?\s*([:=])\s*["']?[a-zA-Z0-9\-_\.]{8,}["']?"#,
    )
});
static PASSWORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"(?i)["']?password["']?\s*([:=])\s*["']?[^"'\s,}]+["']?"#));
static URL_CREDENTIALS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)(postgres(?:ql)?|mysql)://([^:/\s]+):[^@\s]+@"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| unreachable!("invalid scrubbing pattern: {err}"))
}

/// Redacts credentials from text that leaves the process through logs or audit reports.
///
/// Adapter responses routinely echo connection strings and tokens in error
/// bodies, so every message is passed through here before it is recorded.
#[derive(Clone, Copy, Default)]
pub struct SecretScrubber;

impl SecretScrubber {
    pub const fn new() -> Self {
        Self
    }

    /// Scrub a message of sensitive data
    pub fn scrub_message(&self, message: &str) -> String {
        let scrubbed = BEARER_PATTERN.replace_all(message, "Bearer [TOKEN_REDACTED]");
        let scrubbed = TOKEN_PATTERN.replace_all(&scrubbed, "$1$2[REDACTED]");
        let scrubbed = PASSWORD_PATTERN.replace_all(&scrubbed, "password$1[REDACTED]");
        URL_CREDENTIALS_PATTERN
            .replace_all(&scrubbed, "$1://$2:[REDACTED]@")
            .into_owned()
    }
}

impl fmt::Debug for SecretScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretScrubber").finish()
    }
}
