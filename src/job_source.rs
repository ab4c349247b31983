use std::{fmt::Display, future::Future, path::PathBuf};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tiny_bail::prelude::*;
use url::Url;

use crate::{error::LoadError, job::JobTable};

/// Where job listings are loaded from.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum JobSource {
    /// A local JSON file.
    File(PathBuf),
    /// A single remote JSON document.
    Url(Url),
    /// Several remote JSON documents, concatenated in order.
    Batch(Vec<Url>),
    /// Remote JSON documents listed by a directory index.
    Directory {
        /// A JSON list of entries, either URLs or `{name, download_url}` objects.
        index: Url,
        /// Only entries whose name matches are fetched.
        #[serde(with = "serde_regex", default = "default_name_re")]
        name_re: Regex,
    },
}

fn default_name_re() -> Regex {
    Regex::new(r"\.json$").unwrap()
}

impl Display for JobSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{}", url),
            Self::Batch(urls) => write!(f, "{} batch files", urls.len()),
            Self::Directory { index, .. } => write!(f, "directory {}", index),
        }
    }
}

/// Retrieves the body of a remote document.
pub trait Fetch {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<String, LoadError>> + Send;
}

impl Fetch for reqwest::Client {
    async fn fetch(&self, url: &Url) -> Result<String, LoadError> {
        let network = |e: reqwest::Error| LoadError::Network {
            url: url.to_string(),
            message: e.to_string(),
        };
        let response = self
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(network)?;
        response.text().await.map_err(network)
    }
}

/// The outcome of loading a [`JobSource`].
#[derive(Serialize, Clone, Debug)]
pub struct LoadReport {
    pub table: JobTable,
    /// Problems that cost some records but not the whole load.
    pub warnings: Vec<LoadError>,
    /// Directory entries that were not lists of records.
    pub skipped: Vec<String>,
    pub loaded_at: DateTime<Utc>,
}

impl LoadReport {
    fn new() -> Self {
        Self {
            table: JobTable::new(),
            warnings: vec![],
            skipped: vec![],
            loaded_at: Utc::now(),
        }
    }

    fn warn(&mut self, error: LoadError) {
        log::warn!("{}", error);
        self.warnings.push(error);
    }

    /// Fails if some required field is absent from every record.
    ///
    /// An empty table has nothing to violate.
    pub fn validate(&self, required: &[String]) -> Result<(), LoadError> {
        if self.table.is_empty() {
            return Ok(());
        }
        let missing = self.table.missing_fields(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(LoadError::SchemaViolation {
                fields: missing.into_iter().map(Into::into).collect(),
            })
        }
    }
}

/// One entry of a directory index.
#[derive(Clone, PartialEq, Eq, Debug)]
struct DirectoryEntry {
    name: String,
    url: Url,
}

impl JobSource {
    /// Loads every record this source points at.
    ///
    /// Only a missing or unreadable local file is an error here. Remote
    /// failures are collected as warnings in the report.
    pub async fn load(&self, fetcher: &impl Fetch) -> Result<LoadReport, LoadError> {
        let mut report = LoadReport::new();
        match self {
            Self::File(path) => {
                let parsed = match tokio::fs::read_to_string(path).await {
                    Ok(json) => JobTable::from_json_str(&json),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        return Err(LoadError::MissingSource { path: path.clone() });
                    }
                    // Not UTF-8, so not JSON either.
                    Err(e) if e.kind() == std::io::ErrorKind::InvalidData => Err(e.to_string()),
                    Err(e) => {
                        return Err(LoadError::Io {
                            path: path.clone(),
                            message: e.to_string(),
                        });
                    }
                };
                match parsed {
                    Ok(table) => report.table = table,
                    Err(message) => report.warn(LoadError::MalformedPayload {
                        origin: path.display().to_string(),
                        message,
                    }),
                }
            }
            Self::Url(url) => {
                if let Err(e) = load_url(fetcher, url, &mut report.table).await {
                    report.warn(e);
                }
            }
            Self::Batch(urls) => {
                for url in urls {
                    if let Err(e) = load_url(fetcher, url, &mut report.table).await {
                        report.warn(e);
                    }
                }
            }
            Self::Directory { index, name_re } => {
                let entries = match load_index(fetcher, index).await {
                    Ok(entries) => entries,
                    Err(e) => {
                        report.warn(e);
                        return Ok(report);
                    }
                };
                for entry in entries {
                    if !name_re.is_match(&entry.name) {
                        log::debug!("[{}] Ignoring {}", index, entry.name);
                        continue;
                    }
                    match load_url(fetcher, &entry.url, &mut report.table).await {
                        Ok(()) => {}
                        Err(e @ LoadError::MalformedPayload { .. }) => {
                            report.skipped.push(entry.name);
                            report.warn(e);
                        }
                        Err(e) => report.warn(e),
                    }
                }
            }
        }

        log::info!("[{}] Loaded {} jobs", self, report.table.len());
        report.loaded_at = Utc::now();
        Ok(report)
    }
}

async fn load_url(fetcher: &impl Fetch, url: &Url, table: &mut JobTable) -> Result<(), LoadError> {
    let body = fetcher.fetch(url).await?;
    let loaded = JobTable::from_json_str(&body).map_err(|message| LoadError::MalformedPayload {
        origin: url.to_string(),
        message,
    })?;
    log::debug!("[{}] Found {} jobs", url, loaded.len());
    table.append(loaded);
    Ok(())
}

async fn load_index(fetcher: &impl Fetch, index: &Url) -> Result<Vec<DirectoryEntry>, LoadError> {
    let body = fetcher.fetch(index).await?;
    parse_index(index, &body).map_err(|message| LoadError::MalformedPayload {
        origin: index.to_string(),
        message,
    })
}

/// Extracts the entries of a directory index.
///
/// Entries may be plain strings (URLs, possibly relative to the indexed
/// directory) or objects with a `name` and one of `download_url`, `url` or
/// `path`. Entries that can't be resolved to a URL are dropped.
fn parse_index(index: &Url, body: &str) -> Result<Vec<DirectoryEntry>, String> {
    let value: Value = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let Value::Array(items) = value else {
        return Err("expected a list of entries".to_string());
    };

    // Relative entries live inside the indexed directory, even when the
    // index URL has no trailing slash.
    let mut base = index.clone();
    if !base.path().ends_with('/') {
        if let Ok(mut segments) = base.path_segments_mut() {
            segments.push("");
        }
    }

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let (name, location) = match &item {
            Value::String(location) => (None, location.as_str()),
            Value::Object(object) => {
                let name = object.get("name").and_then(Value::as_str);
                let location = ["download_url", "url", "path"]
                    .into_iter()
                    .find_map(|key| object.get(key).and_then(Value::as_str))
                    .or(name);
                let Some(location) = location else {
                    log::warn!("[{}] Entry has no location: {}", index, item);
                    continue;
                };
                (name, location)
            }
            _ => {
                log::warn!("[{}] Unrecognized entry: {}", index, item);
                continue;
            }
        };

        let url = c!(base.join(location));
        let name = name
            .map(str::to_string)
            .or_else(|| url.path_segments()?.last().map(str::to_string))
            .unwrap_or_else(|| url.to_string());
        entries.push(DirectoryEntry { name, url });
    }

    Ok(entries)
}
