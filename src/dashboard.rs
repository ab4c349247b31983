use std::{collections::HashMap, net::SocketAddr, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, LoadError},
    filter::FilterCriteria,
    job_source::{Fetch, JobSource, LoadReport},
    page::{self, View},
    schema::Schema,
};

/// The contents of the dashboard's RON config file.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    pub source: JobSource,
    #[serde(default)]
    pub schema: Schema,
}

fn default_title() -> String {
    "Job Listings Dashboard".to_string()
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8501))
}

impl DashboardConfig {
    pub fn new(source: JobSource, schema: Schema) -> Self {
        Self {
            title: default_title(),
            listen: default_listen(),
            source,
            schema,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.to_path_buf(),
            error,
        })?;
        ron::from_str(&config_str).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }
}

/// Loads job listings once and renders them on demand.
pub struct Dashboard<F = reqwest::Client> {
    pub config: DashboardConfig,
    fetcher: F,
    /// Loaded reports keyed by their source.
    cache: HashMap<String, Arc<LoadReport>>,
}

impl Dashboard {
    const CONFIG_FILE_PATH: &str = "data/dashboard.ron";

    pub fn new(config: DashboardConfig) -> Self {
        // Some index APIs (GitHub's among them) refuse requests without a user agent.
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self::with_fetcher(config, client)
    }

    pub fn from_config_file() -> Result<Self, ConfigError> {
        let config = DashboardConfig::from_file(Self::CONFIG_FILE_PATH)?;
        log::info!("Loaded config from {}", Self::CONFIG_FILE_PATH);
        Ok(Self::new(config))
    }
}

impl<F: Fetch> Dashboard<F> {
    pub fn with_fetcher(config: DashboardConfig, fetcher: F) -> Self {
        Self {
            config,
            fetcher,
            cache: HashMap::new(),
        }
    }

    /// The listings of the configured source, loading them on first use.
    ///
    /// Fatal errors are not remembered, so the next call tries again.
    pub async fn load(&mut self) -> Result<Arc<LoadReport>, LoadError> {
        let key = cache_key(&self.config.source);
        if let Some(report) = self.cache.get(&key) {
            log::debug!("[{}] Using cached jobs", self.config.source);
            return Ok(report.clone());
        }

        let report = self.config.source.load(&self.fetcher).await?;
        report.validate(&self.config.schema.required)?;

        let report = Arc::new(report);
        self.cache.insert(key, report.clone());
        Ok(report)
    }

    /// Forgets loaded listings so the next [`Self::load`] fetches them again.
    pub fn reload(&mut self) {
        log::info!("Clearing {} cached load(s)", self.cache.len());
        self.cache.clear();
    }

    /// Loads (or reuses) the listings and renders them for `criteria`.
    pub async fn view(&mut self, criteria: &FilterCriteria) -> Result<View, LoadError> {
        let report = self.load().await?;
        Ok(page::render(
            &self.config.title,
            &report,
            &self.config.schema,
            criteria,
        ))
    }

    /// Empty criteria for the configured schema.
    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria::for_schema(&self.config.schema)
    }
}

fn cache_key(source: &JobSource) -> String {
    ron::to_string(source).unwrap_or_else(|_| format!("{:?}", source))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use url::Url;

    use super::*;
    use crate::{job_source::tests::MockFetch, page::Notice};

    fn batch() -> JobSource {
        JobSource::Batch(vec![
            Url::parse("https://jobs.example/jobs_1.json").unwrap(),
            Url::parse("https://jobs.example/jobs_2.json").unwrap(),
        ])
    }

    #[test]
    fn parse_config() {
        let config: DashboardConfig = ron::from_str(
            r#"(
                title: "Game Jobs",
                source: Batch(["https://jobs.example/jobs_1.json"]),
                schema: (title: "title", link: "url", search: ["title", "company_site"]),
            )"#,
        )
        .unwrap();

        assert_eq!(config.title, "Game Jobs");
        assert_eq!(config.listen, default_listen());
        assert_eq!(config.schema.search, ["title", "company_site"]);

        let config: DashboardConfig = ron::from_str(r#"(source: File("jobs.json"))"#).unwrap();
        assert_eq!(config.schema, Schema::listing());
    }

    #[tokio::test]
    async fn loads_are_memoized() {
        let fetcher = MockFetch::default()
            .with("https://jobs.example/jobs_1.json", r#"[{"title": "A", "url": "a.com/1"}]"#)
            .with("https://jobs.example/jobs_2.json", r#"[{"title": "B", "url": "b.com/1"}]"#);
        let config = DashboardConfig::new(batch(), Schema::company_site());
        let mut dashboard = Dashboard::with_fetcher(config, fetcher);

        let first = dashboard.load().await.unwrap();
        let second = dashboard.load().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(dashboard.fetcher.requests.load(Ordering::SeqCst), 2);

        dashboard.reload();
        let third = dashboard.load().await.unwrap();
        assert_eq!(third.table, first.table);
        assert_eq!(dashboard.fetcher.requests.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn schema_violation_is_fatal_and_not_cached() {
        let fetcher = MockFetch::default()
            .with("https://jobs.example/jobs_1.json", r#"[{"title": "A"}]"#)
            .with("https://jobs.example/jobs_2.json", r#"[{"title": "B"}]"#);
        let config = DashboardConfig::new(batch(), Schema::company_site());
        let mut dashboard = Dashboard::with_fetcher(config, fetcher);

        for _ in 0..2 {
            let error = dashboard.load().await.unwrap_err();
            assert_eq!(
                error,
                LoadError::SchemaViolation {
                    fields: vec!["url".to_string()],
                },
            );
        }
        assert_eq!(dashboard.fetcher.requests.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn empty_source_list_shows_notice() {
        let config = DashboardConfig::new(JobSource::Batch(vec![]), Schema::company_site());
        let mut dashboard = Dashboard::with_fetcher(config, MockFetch::default());

        let criteria = dashboard.criteria();
        let view = dashboard.view(&criteria).await.unwrap();
        assert_eq!(view.summary.total, 0);
        assert_eq!(view.notice, Some(Notice::NoListings));
    }

    #[tokio::test]
    async fn view_filters() {
        let fetcher = MockFetch::default()
            .with(
                "https://jobs.example/jobs_1.json",
                r#"[{"title": "Engineer", "company_site": "a.com", "url": "a.com/1"}]"#,
            )
            .with(
                "https://jobs.example/jobs_2.json",
                r#"[{"title": "Analyst", "company_site": "b.com", "url": "b.com/1"}]"#,
            );
        let config = DashboardConfig::new(batch(), Schema::company_site());
        let mut dashboard = Dashboard::with_fetcher(config, fetcher);

        let criteria = dashboard.criteria().with_query("ANALYST");
        let view = dashboard.view(&criteria).await.unwrap();
        assert_eq!(view.summary.total, 1);
        assert_eq!(view.cards[0].title, "Analyst");
    }
}
