//! Turns a filtered table into something to look at.

use chrono::{DateTime, Utc};
use colored::Colorize as _;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use serde::Serialize;
use url::Url;

use crate::{
    error::LoadError,
    filter::{FilterCriteria, QUERY_KEY},
    job::JobRecord,
    job_source::LoadReport,
    schema::Schema,
};

/// Headline counts over the filtered records.
#[derive(Serialize, Clone, PartialEq, Eq, Debug)]
pub struct Summary {
    pub total: usize,
    /// `(label, number of distinct values)` per grouping field.
    pub distinct: Vec<(String, usize)>,
}

impl Summary {
    pub const TOTAL_LABEL: &'static str = "Total Jobs";

    /// The `(label, value)` pairs, total first.
    pub fn metrics(&self) -> impl Iterator<Item = (&str, usize)> {
        std::iter::once((Self::TOTAL_LABEL, self.total))
            .chain(self.distinct.iter().map(|(label, n)| (label.as_str(), *n)))
    }
}

/// A multiselect over one categorical field.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FilterControl {
    pub label: String,
    pub key: String,
    /// `(value, selected)` in first-seen order.
    pub options: Vec<(String, bool)>,
}

/// One job posting as displayed.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Card {
    pub title: String,
    /// `(label, value)` pairs. Missing values are shown as a dash.
    pub details: Vec<(String, String)>,
    pub link: Option<Url>,
}

/// Shown instead of cards when there are none.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Notice {
    /// Nothing was loaded at all.
    NoListings,
    /// The filters excluded everything.
    NoMatches,
}

impl Notice {
    pub fn message(self) -> &'static str {
        match self {
            Self::NoListings => "No job listings available.",
            Self::NoMatches => "No jobs match the selected filters.",
        }
    }
}

/// Everything a page shows for one set of filters.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct View {
    pub title: String,
    pub summary: Summary,
    pub filters: Vec<FilterControl>,
    pub query: String,
    pub cards: Vec<Card>,
    pub notice: Option<Notice>,
    pub warnings: Vec<String>,
    pub loaded_at: DateTime<Utc>,
}

/// Filters the loaded table and lays out the result.
pub fn render(
    title: impl Into<String>,
    report: &LoadReport,
    schema: &Schema,
    criteria: &FilterCriteria,
) -> View {
    let table = &report.table;
    let filtered = table.filter(criteria);

    let summary = Summary {
        total: filtered.len(),
        distinct: schema
            .metrics
            .iter()
            .map(|field| (field.label.clone(), filtered.count_distinct(&field.key)))
            .collect(),
    };

    // Options come from the whole table so that narrowing one filter doesn't
    // hide the choices of another.
    let filters = schema
        .filters
        .iter()
        .map(|field| FilterControl {
            label: field.label.clone(),
            key: field.key.clone(),
            options: table
                .distinct_values(&field.key)
                .into_iter()
                .map(|value| (value.to_string(), criteria.is_selected(&field.key, value)))
                .collect(),
        })
        .collect();

    let notice = if table.is_empty() {
        Some(Notice::NoListings)
    } else if filtered.is_empty() {
        Some(Notice::NoMatches)
    } else {
        None
    };

    let mut warnings: Vec<String> = report.warnings.iter().map(ToString::to_string).collect();
    if !report.skipped.is_empty() {
        warnings.push(format!(
            "Skipped {} file(s) that were not lists of jobs: {}",
            report.skipped.len(),
            report.skipped.join(", "),
        ));
    }

    View {
        title: title.into(),
        summary,
        filters,
        query: criteria.query.clone().unwrap_or_default(),
        cards: filtered.iter().map(|record| card(record, schema)).collect(),
        notice,
        warnings,
        loaded_at: report.loaded_at,
    }
}

fn card(record: &JobRecord, schema: &Schema) -> Card {
    Card {
        title: record.get(&schema.title).unwrap_or("(untitled)").to_string(),
        details: schema
            .details
            .iter()
            .map(|field| {
                let value = record.get(&field.key).unwrap_or("—");
                (field.label.clone(), value.to_string())
            })
            .collect(),
        link: record.get(&schema.link).and_then(parse_link),
    }
}

/// Parses an outbound link, assuming `https` if no scheme is given.
fn parse_link(link: &str) -> Option<Url> {
    let link = link.trim();
    let url = Url::parse(link)
        .ok()
        .filter(|url| url.has_host())
        .or_else(|| Url::parse(&format!("https://{}", link)).ok())?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

const STYLE: &str = r#"
body { font-family: 'Segoe UI', sans-serif; margin: 0; display: flex; background: #f5f6f8; }
aside { width: 260px; padding: 20px; background: #ffffff; min-height: 100vh; box-shadow: 1px 0 4px rgba(0,0,0,0.05); }
aside select { width: 100%; min-height: 120px; margin-bottom: 16px; }
aside input[type=search] { width: 100%; margin-bottom: 16px; }
main { flex: 1; padding: 20px 40px; }
.metrics { display: flex; gap: 40px; }
.metric-label { font-size: 14px; color: #555; }
.metric-value { font-size: 32px; }
.warning { background: #fff4e5; padding: 10px 16px; border-radius: 8px; margin-bottom: 10px; }
.error { background: #fdecea; padding: 10px 16px; border-radius: 8px; }
.notice { background: #e8f0fe; padding: 10px 16px; border-radius: 8px; }
.job-card { background-color: #ffffff; padding: 20px; border-radius: 12px; box-shadow: 0 4px 8px rgba(0,0,0,0.05); margin-bottom: 20px; }
.job-title { font-size: 20px; color: #2c3e50; margin-bottom: 8px; }
.job-meta { font-size: 16px; margin-bottom: 4px; color: #555; }
a.job-link { color: #1a73e8; text-decoration: none; font-weight: bold; }
"#;

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        text(title),
        STYLE,
        body,
    )
}

impl View {
    pub fn to_html(&self) -> String {
        let mut body = String::new();

        // Sidebar.
        body.push_str("<aside>\n<h2>Filter Jobs</h2>\n<form method=\"get\" action=\"/\">\n");
        body.push_str(&format!(
            "<label>Search<input type=\"search\" name=\"{}\" value=\"{}\" placeholder=\"Keywords\"></label>\n",
            QUERY_KEY,
            attr(&self.query),
        ));
        for control in &self.filters {
            body.push_str(&format!(
                "<label>Select {}<select name=\"{}\" multiple>\n",
                text(&control.label),
                attr(&control.key),
            ));
            for (value, selected) in &control.options {
                body.push_str(&format!(
                    "<option value=\"{}\"{}>{}</option>\n",
                    attr(value),
                    if *selected { " selected" } else { "" },
                    text(value),
                ));
            }
            body.push_str("</select></label>\n");
        }
        body.push_str("<button type=\"submit\">Apply</button>\n</form>\n");
        body.push_str("<form method=\"post\" action=\"/reload\"><button type=\"submit\">Reload data</button></form>\n");
        body.push_str("</aside>\n<main>\n");
        body.push_str(&format!("<h1>{}</h1>\n", text(&self.title)));

        for warning in &self.warnings {
            body.push_str(&format!("<div class=\"warning\">{}</div>\n", text(warning)));
        }

        // Metrics.
        body.push_str("<h2>Overview</h2>\n<div class=\"metrics\">\n");
        for (label, value) in self.summary.metrics() {
            body.push_str(&format!(
                "<div class=\"metric\"><div class=\"metric-label\">{}</div><div class=\"metric-value\">{}</div></div>\n",
                text(label),
                value,
            ));
        }
        body.push_str("</div>\n<hr>\n");

        // Cards.
        body.push_str("<h2>Job Listings</h2>\n");
        if let Some(notice) = self.notice {
            body.push_str(&format!("<div class=\"notice\">{}</div>\n", notice.message()));
        }
        for card in &self.cards {
            body.push_str("<div class=\"job-card\">\n");
            body.push_str(&format!("<div class=\"job-title\">{}</div>\n", text(&card.title)));
            for (label, value) in &card.details {
                body.push_str(&format!(
                    "<div class=\"job-meta\"><strong>{}:</strong> {}</div>\n",
                    text(label),
                    text(value),
                ));
            }
            if let Some(link) = &card.link {
                body.push_str(&format!(
                    "<a class=\"job-link\" href=\"{}\" target=\"_blank\" rel=\"noopener\">View Job Posting</a>\n",
                    attr(link.as_str()),
                ));
            }
            body.push_str("</div>\n");
        }

        body.push_str(&format!(
            "<hr>\n<footer>Loaded {}</footer>\n</main>\n",
            self.loaded_at.format("%Y-%m-%d %H:%M UTC"),
        ));

        page(&self.title, &body)
    }

    /// Writes the view to stdout as a coloured listing.
    pub fn print(&self) {
        for warning in &self.warnings {
            println!("{} {}", "warning:".bold().yellow(), warning);
        }
        println!(
            "{}",
            self.summary
                .metrics()
                .map(|(label, value)| format!("{}: {}", label, value.to_string().bold()))
                .collect::<Vec<_>>()
                .join("  "),
        );
        if let Some(notice) = self.notice {
            println!("{}", notice.message().italic());
            return;
        }
        for card in &self.cards {
            println!(
                "{} {} {}",
                format!("{:48}", card.title.chars().take(48).collect::<String>()).green(),
                format!(
                    "{:40}",
                    card.details
                        .iter()
                        .map(|(_, value)| value.as_str())
                        .collect::<Vec<_>>()
                        .join(" | ")
                        .chars()
                        .take(40)
                        .collect::<String>(),
                ),
                card.link
                    .as_ref()
                    .map(|url| format!("({})", url).italic().to_string())
                    .unwrap_or_default(),
            );
        }
    }
}

/// A page explaining why nothing could be shown.
pub fn render_error(title: &str, error: &LoadError) -> String {
    let body = format!(
        "<main>\n<h1>{}</h1>\n<div class=\"error\">{}</div>\n</main>\n",
        text(title),
        text(&error.to_string()),
    );
    page(title, &body)
}
