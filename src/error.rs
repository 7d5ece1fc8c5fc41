//! Error types for the ABI-to-MCP pipeline

use thiserror::Error;

use crate::abi::ValidationIssue;
use crate::runtime::TxError;

/// One failed fetch attempt, kept so a source-not-found error can explain itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    pub fetcher: String,
    pub reason: String,
}

impl FetchAttempt {
    pub fn new(fetcher: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            fetcher: fetcher.into(),
            reason: reason.into(),
        }
    }
}

/// Errors produced while fetching, parsing, mapping, or generating.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not resolve ABI source '{input}': {}", format_attempts(.attempts))]
    SourceNotFound {
        input: String,
        attempts: Vec<FetchAttempt>,
    },

    #[error("contract {address} is not verified on {service}")]
    NotVerified { address: String, service: String },

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("invalid address '{0}': expected 0x followed by 40 hex digits")]
    InvalidAddress(String),

    #[error("unknown network '{0}'")]
    UnknownNetwork(String),

    #[error("ABI parse error{}: {message}", format_location(.index, .entry_type))]
    Parse {
        index: Option<usize>,
        entry_type: Option<String>,
        message: String,
    },

    #[error("ABI validation failed with {} issue(s)", .0.len())]
    Validation(Vec<ValidationIssue>),

    #[error("network error calling {url}{}: {message}", format_status(.status))]
    Network {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("rate limited by {url}{}", format_retry(.retry_after))]
    RateLimited {
        url: String,
        retry_after: Option<u64>,
    },

    #[error("generation error: {0}")]
    Generation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Runtime(#[from] TxError),
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a parse error that is not yet tied to an ABI entry.
    pub fn parse(message: impl Into<String>) -> Self {
        Error::Parse {
            index: None,
            entry_type: None,
            message: message.into(),
        }
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::SourceNotFound { .. } => "source_not_found",
            Error::NotVerified { .. } => "not_verified",
            Error::FileNotFound(_) => "file_not_found",
            Error::InvalidAddress(_) => "invalid_address",
            Error::UnknownNetwork(_) => "unknown_network",
            Error::Parse { .. } => "parse_error",
            Error::Validation(_) => "validation_error",
            Error::Network { .. } => "network_error",
            Error::RateLimited { .. } => "rate_limited",
            Error::Generation(_) => "generation_error",
            Error::Io(_) => "io_error",
            Error::Runtime(e) => e.kind(),
        }
    }

    /// Whether a fetcher failure should let the registry try the next fetcher.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::SourceNotFound { .. } | Error::NotVerified { .. } | Error::FileNotFound(_)
        )
    }
}

fn format_attempts(attempts: &[FetchAttempt]) -> String {
    if attempts.is_empty() {
        return "no fetcher can handle this source".to_string();
    }
    attempts
        .iter()
        .map(|a| format!("[{}] {}", a.fetcher, a.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

fn format_location(index: &Option<usize>, entry_type: &Option<String>) -> String {
    match (index, entry_type) {
        (Some(i), Some(t)) => format!(" in entry {} ({})", i, t),
        (Some(i), None) => format!(" in entry {}", i),
        (None, Some(t)) => format!(" in {} entry", t),
        (None, None) => String::new(),
    }
}

fn format_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

fn format_retry(retry_after: &Option<u64>) -> String {
    retry_after
        .map(|s| format!(", retry after {}s", s))
        .unwrap_or_default()
}
