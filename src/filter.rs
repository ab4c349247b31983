use std::collections::{BTreeMap, BTreeSet};

use crate::{
    job::{JobRecord, JobTable},
    schema::Schema,
};

/// The query-string key that carries the keyword search.
pub const QUERY_KEY: &str = "q";

/// What the user has asked to see.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct FilterCriteria {
    /// Accepted values per field. A field with no entry is unconstrained.
    pub selections: BTreeMap<String, BTreeSet<String>>,
    /// Free-text keywords, any of which may match.
    pub query: Option<String>,
    /// Fields the keywords are looked up in.
    pub search_fields: Vec<String>,
}

impl FilterCriteria {
    /// Empty criteria that search the fields the schema designates.
    pub fn for_schema(schema: &Schema) -> Self {
        Self {
            search_fields: schema.search.clone(),
            ..Self::default()
        }
    }

    /// Criteria from decoded query-string pairs like `company=Riot&q=gameplay`.
    ///
    /// Keys that are not filters of the schema are ignored.
    pub fn from_pairs<K, V>(schema: &Schema, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut criteria = Self::for_schema(schema);
        for (key, value) in pairs {
            let key = key.as_ref();
            if key == QUERY_KEY {
                criteria = criteria.with_query(value);
            } else if schema.is_filter(key) {
                criteria = criteria.select(key, value);
            } else {
                log::debug!("Ignoring unknown filter: {}", key);
            }
        }
        criteria
    }

    pub fn select(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.selections
            .entry(key.into())
            .or_default()
            .insert(value.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn is_selected(&self, key: &str, value: &str) -> bool {
        self.selections
            .get(key)
            .is_some_and(|values| values.contains(value))
    }

    /// The lowercased keywords of the query. Empty if there is no query.
    pub fn tokens(&self) -> Vec<String> {
        self.query
            .as_deref()
            .unwrap_or_default()
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
            .collect()
    }

    fn matches_tokens(&self, record: &JobRecord, tokens: &[String]) -> bool {
        // Every non-empty selection must contain the record's value.
        for (key, values) in &self.selections {
            if values.is_empty() {
                continue;
            }
            match record.get(key) {
                Some(value) if values.contains(value) => {}
                _ => return false,
            }
        }

        if tokens.is_empty() {
            return true;
        }
        self.search_fields
            .iter()
            .filter_map(|key| record.get(key))
            .map(str::to_lowercase)
            .any(|haystack| tokens.iter().any(|token| haystack.contains(token.as_str())))
    }
}

impl JobTable {
    /// The records that satisfy `criteria`, in their original order.
    pub fn filter(&self, criteria: &FilterCriteria) -> JobTable {
        let tokens = criteria.tokens();
        self.iter()
            .filter(|record| criteria.matches_tokens(record, &tokens))
            .cloned()
            .collect()
    }
}
