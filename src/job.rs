use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A job posting as a flat set of named text fields.
///
/// The set of fields depends on where the posting came from, so nothing beyond
/// "string keys to string values" is assumed here. See [`crate::Schema`] for
/// which fields mean what.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq, Debug)]
#[serde(transparent)]
pub struct JobRecord {
    fields: BTreeMap<String, String>,
}

impl JobRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Builds a record from one element of a JSON payload.
    ///
    /// Returns `None` if the element is not an object. Numbers and booleans are
    /// kept as text; `null` and nested values are dropped.
    pub fn from_json(value: Value) -> Option<Self> {
        let Value::Object(object) = value else {
            return None;
        };

        let mut fields = BTreeMap::new();
        for (key, value) in object {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => {
                    log::trace!("Dropping non-scalar field: {}", key);
                    continue;
                }
            };
            fields.insert(key, value);
        }

        Some(Self { fields })
    }
}

/// An ordered list of job postings, in the order they arrived from their sources.
///
/// Duplicates are kept.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq, Debug)]
#[serde(transparent)]
pub struct JobTable {
    records: Vec<JobRecord>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, JobRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    /// Appends another table's records after this one's.
    pub fn append(&mut self, other: JobTable) {
        self.records.extend(other.records);
    }

    /// Parses a JSON document that should hold a list of records.
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let value: Value = serde_json::from_str(json).map_err(|e| e.to_string())?;
        let Value::Array(items) = value else {
            return Err(format!("expected a list, found {}", json_kind(&value)));
        };

        let mut records = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let kind = json_kind(&item);
            let record = JobRecord::from_json(item)
                .ok_or_else(|| format!("item {} is {}, not an object", i, kind))?;
            records.push(record);
        }

        Ok(Self { records })
    }

    /// The distinct values of a field, in first-seen order.
    pub fn distinct_values(&self, key: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter_map(|record| record.get(key))
            .filter(|value| seen.insert(*value))
            .collect()
    }

    pub fn count_distinct(&self, key: &str) -> usize {
        self.distinct_values(key).len()
    }

    /// The fields from `required` that no record carries at all.
    pub fn missing_fields<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|key| !self.records.iter().any(|record| record.contains(key)))
            .map(String::as_str)
            .collect()
    }
}

impl FromIterator<JobRecord> for JobTable {
    fn from_iter<T: IntoIterator<Item = JobRecord>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a JobTable {
    type Item = &'a JobRecord;
    type IntoIter = std::slice::Iter<'a, JobRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list() {
        let table = JobTable::from_json_str(
            r#"[
                {"job_title": "Gameplay Programmer", "company": "Riot", "location": "LA", "job_url": "https://riot.com/1"},
                {"title": "Analyst", "company_site": "b.com", "url": "b.com/1", "openings": 2, "remote": true, "salary": null}
            ]"#,
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].get("company"), Some("Riot"));
        assert_eq!(table.records()[1].get("openings"), Some("2"));
        assert_eq!(table.records()[1].get("remote"), Some("true"));
        assert!(!table.records()[1].contains("salary"));
        assert_eq!(table.records()[1].get("title"), Some("Analyst"));
    }

    #[test]
    fn parse_rejects_non_lists() {
        for json in [
            r#"{"job_title": "Engineer"}"#,
            r#"[{"job_title": "Engineer"}, "Engineer"]"#,
            "<!DOCTYPE html><html></html>",
            "",
        ] {
            assert!(JobTable::from_json_str(json).is_err(), "{}", json);
        }
    }

    #[test]
    fn parse_empty_list() {
        assert!(JobTable::from_json_str("[]").unwrap().is_empty());
    }

    #[test]
    fn distinct_values_keep_first_seen_order() {
        let table: JobTable = ["b.com", "a.com", "b.com", "c.com"]
            .into_iter()
            .map(|site| JobRecord::new().with_field("company_site", site))
            .chain([JobRecord::new().with_field("title", "No Site")])
            .collect();

        assert_eq!(
            table.distinct_values("company_site"),
            ["b.com", "a.com", "c.com"],
        );
        assert_eq!(table.count_distinct("company_site"), 3);
        assert_eq!(table.count_distinct("location"), 0);
    }

    #[test]
    fn missing_fields() {
        let table: JobTable = [
            JobRecord::new().with_field("title", "Engineer"),
            JobRecord::new()
                .with_field("title", "Analyst")
                .with_field("url", "b.com/1"),
        ]
        .into_iter()
        .collect();
        let required = vec!["title".to_string(), "url".to_string(), "company_site".to_string()];

        assert_eq!(table.missing_fields(&required), ["company_site"]);
    }

    #[test]
    fn append_preserves_duplicates() {
        let record = JobRecord::new().with_field("title", "Engineer");
        let mut table: JobTable = [record.clone()].into_iter().collect();
        table.append([record.clone()].into_iter().collect());

        assert_eq!(table.records(), [record.clone(), record]);
    }
}
