use serde::{Deserialize, Serialize};

/// A record field together with the label it is displayed under.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct Field {
    pub label: String,
    pub key: String,
}

impl Field {
    pub fn new(label: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: key.into(),
        }
    }
}

/// Describes what the fields of a [`crate::JobRecord`] mean to the dashboard.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(deny_unknown_fields)]
pub struct Schema {
    /// The field shown as the card heading.
    pub title: String,
    /// The field holding the URL of the job page.
    pub link: String,
    /// Fields shown on each card below the heading.
    #[serde(default)]
    pub details: Vec<Field>,
    /// Categorical fields offered as multiselect filters.
    #[serde(default)]
    pub filters: Vec<Field>,
    /// Fields the keyword search looks in.
    #[serde(default)]
    pub search: Vec<String>,
    /// Fields whose distinct values are counted in the summary.
    #[serde(default)]
    pub metrics: Vec<Field>,
    /// Fields that must appear in at least one record.
    #[serde(default)]
    pub required: Vec<String>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::listing()
    }
}

impl Schema {
    /// `{job_title, company, location, job_url}` records, as written by a scraper.
    pub fn listing() -> Self {
        Self {
            title: "job_title".into(),
            link: "job_url".into(),
            details: vec![
                Field::new("Company", "company"),
                Field::new("Location", "location"),
            ],
            filters: vec![
                Field::new("Company", "company"),
                Field::new("Location", "location"),
            ],
            search: vec!["job_title".into(), "company".into()],
            metrics: vec![
                Field::new("Companies", "company"),
                Field::new("Locations", "location"),
            ],
            required: vec!["job_title".into(), "company".into(), "job_url".into()],
        }
    }

    /// `{title, company_site, url}` records, as published in batch files.
    pub fn company_site() -> Self {
        Self {
            title: "title".into(),
            link: "url".into(),
            details: vec![Field::new("Company", "company_site")],
            filters: vec![
                Field::new("Title", "title"),
                Field::new("Company", "company_site"),
            ],
            search: vec!["title".into(), "company_site".into()],
            metrics: vec![Field::new("Unique Companies", "company_site")],
            required: vec!["title".into(), "url".into()],
        }
    }

    pub fn is_filter(&self, key: &str) -> bool {
        self.filters.iter().any(|field| field.key == key)
    }
}
