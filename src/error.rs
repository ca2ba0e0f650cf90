use std::path::PathBuf;
use thiserror::Error;

/// Failure to obtain either ledger. Callers treat every variant as the
/// "no data" state rather than a crash.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV ledger {origin}: {source}")]
    Csv {
        origin: String,
        #[source]
        source: csv::Error,
    },
    #[error("malformed JSON ledger {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no ledger data: both the historical and current ledgers are empty")]
    NoData,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("both --historical and --current must be given together (only {given} was set)")]
    HalfLedgerPair { given: &'static str },
    #[error("unknown status '{0}' (expected one of Churn, Retained-Growth, Retained-Decline, New-or-Recovered, Inactive)")]
    UnknownStatus(String),
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write CSV {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to encode JSON for {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log level/filter '{value}': unable to build EnvFilter")]
    EnvFilter {
        value: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("telemetry error: {0}")]
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}
