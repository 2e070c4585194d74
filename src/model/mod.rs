//! Typed scrape targets and alert rules
//!
//! Records arrive as JSON snapshots from the persistence layer. They are
//! validated while deserializing, so nested relabel lists and label maps
//! never travel through the compiler as loosely-typed blobs.

pub mod relabel;
pub mod rule;
pub mod target;

pub use relabel::{RelabelAction, RelabelConfig};
pub use rule::{AlertRule, DEFAULT_FOR_DURATION, DEFAULT_SEVERITY};
pub use target::{Target, DEFAULT_METRICS_PATH, DEFAULT_SCRAPE_INTERVAL};

use once_cell::sync::Lazy;
use regex::Regex;

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+y)?(\d+w)?(\d+d)?(\d+h)?(\d+m)?(\d+s)?(\d+ms)?$")
        .expect("duration pattern is valid")
});

static LABEL_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("label pattern is valid"));

/// Check a Prometheus duration string such as `30s`, `1h30m` or `0`
pub fn is_valid_duration(value: &str) -> bool {
    value == "0" || (!value.is_empty() && DURATION_RE.is_match(value))
}

/// Check a Prometheus label name
pub fn is_valid_label_name(name: &str) -> bool {
    LABEL_NAME_RE.is_match(name)
}

/// Check a `host:port` scrape address
pub fn is_valid_address(address: &str) -> bool {
    if address.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    match address.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}

/// Record validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("{record}.{field} must not be empty")]
    EmptyField {
        record: &'static str,
        field: &'static str,
    },

    #[error("invalid scrape address '{0}', expected host:port")]
    InvalidAddress(String),

    #[error("invalid duration '{value}' for {field}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("metrics_path '{0}' must start with '/'")]
    InvalidMetricsPath(String),

    #[error("invalid label name '{0}'")]
    InvalidLabelName(String),

    #[error("hashmod relabeling requires modulus > 0")]
    MissingModulus,

    #[error("{0} relabeling requires a non-empty regex")]
    MissingRegex(RelabelAction),
}
