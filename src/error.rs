use std::path::PathBuf;

use serde::Serialize;

/// A problem encountered while loading job listings.
///
/// Returned as an error, it halts rendering. Collected as a warning, it only
/// drops the offending source.
#[derive(thiserror::Error, Serialize, Clone, PartialEq, Eq, Debug)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadError {
    /// A local source file does not exist.
    #[error("{} not found", .path.display())]
    MissingSource { path: PathBuf },
    /// A local source file exists but could not be read.
    #[error("failed to read {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },
    /// A remote source could not be fetched.
    #[error("failed to fetch {url}: {message}")]
    Network { url: String, message: String },
    /// A source body is not a JSON list of records.
    #[error("{origin} is not a JSON list of records: {message}")]
    MalformedPayload { origin: String, message: String },
    /// Some required fields are absent from every loaded record.
    #[error("required field(s) missing from every record: {}", .fields.join(", "))]
    SchemaViolation { fields: Vec<String> },
}

/// A problem reading the dashboard configuration file.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {error}", .path.display())]
    Read {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error("failed to parse {}: {error}", .path.display())]
    Parse {
        path: PathBuf,
        error: ron::error::SpannedError,
    },
}
