//! HTTP front end for the dashboard.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;

use crate::{
    dashboard::Dashboard,
    error::LoadError,
    filter::FilterCriteria,
    job::JobTable,
    job_source::LoadReport,
    page::{self, Summary},
};

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Mutex<Dashboard>>,
}

impl AppState {
    pub fn new(dashboard: Dashboard) -> Self {
        Self {
            dashboard: Arc::new(Mutex::new(dashboard)),
        }
    }
}

pub fn build_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/jobs", get(jobs))
        .route("/reload", post(reload))
        .route("/healthz", get(healthz))
        .route("/livez", get(livez))
        .with_state(state)
}

/// Serves the dashboard until the listener fails or Ctrl+C is pressed.
pub async fn listen(dashboard: Dashboard) -> std::io::Result<()> {
    let addr = dashboard.config.listen;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening at http://{}", addr);

    tokio::select! {
        r = axum::serve(listener, build_routes(AppState::new(dashboard))) => {
            log::warn!("Server ended unexpectedly: {:?}", r);
            r
        },
        _ = tokio::signal::ctrl_c() => {
            log::info!("Received Ctrl+C, closing server");
            Ok(())
        },
    }
}

/// A load error that stops the page from rendering.
struct PageError {
    title: String,
    error: LoadError,
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        log::error!("{}", self.error);
        let html = page::render_error(&self.title, &self.error);
        (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response()
    }
}

struct JsonError(LoadError);

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        log::error!("{}", self.0);
        let body = json!({ "error": self.0.to_string(), "details": self.0 });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

async fn index(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Html<String>, PageError> {
    let mut dashboard = state.dashboard.lock().await;
    let criteria = FilterCriteria::from_pairs(&dashboard.config.schema, pairs);
    log::debug!("Rendering page for {:?}", criteria);
    match dashboard.view(&criteria).await {
        Ok(view) => Ok(Html(view.to_html())),
        Err(error) => Err(PageError {
            title: dashboard.config.title.clone(),
            error,
        }),
    }
}

#[derive(Serialize)]
struct JobsResponse {
    summary: Summary,
    records: JobTable,
    warnings: Vec<LoadError>,
    skipped: Vec<String>,
    loaded_at: chrono::DateTime<chrono::Utc>,
}

impl JobsResponse {
    fn new(report: &LoadReport, summary: Summary, criteria: &FilterCriteria) -> Self {
        Self {
            summary,
            records: report.table.filter(criteria),
            warnings: report.warnings.clone(),
            skipped: report.skipped.clone(),
            loaded_at: report.loaded_at,
        }
    }
}

async fn jobs(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<JobsResponse>, JsonError> {
    let mut dashboard = state.dashboard.lock().await;
    let criteria = FilterCriteria::from_pairs(&dashboard.config.schema, pairs);
    let report = dashboard.load().await.map_err(JsonError)?;
    let view = page::render(
        &dashboard.config.title,
        &report,
        &dashboard.config.schema,
        &criteria,
    );

    Ok(Json(JobsResponse::new(&report, view.summary, &criteria)))
}

async fn reload(State(state): State<AppState>) -> Redirect {
    state.dashboard.lock().await.reload();
    Redirect::to("/")
}

async fn livez() {
    log::debug!("service is live");
}

async fn healthz(State(state): State<AppState>) -> StatusCode {
    // Healthy once the listings can be loaded.
    match state.dashboard.lock().await.load().await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request},
    };
    use tower::ServiceExt as _;

    use super::*;
    use crate::{dashboard::DashboardConfig, job_source::JobSource, schema::Schema};

    const JOBS: &str = r#"[
        {"job_title": "Gameplay Programmer", "company": "Riot", "location": "Los Angeles", "job_url": "https://riot.com/1"},
        {"job_title": "Data Analyst", "company": "Riot", "location": "Remote", "job_url": "https://riot.com/2"},
        {"job_title": "Frontend Developer", "company": "Valve", "location": "Remote", "job_url": "https://valve.com/1"}
    ]"#;

    fn app(dir: &tempfile::TempDir) -> Router {
        let path = dir.path().join("jobs.json");
        let config = DashboardConfig::new(JobSource::File(path), Schema::listing());
        build_routes(AppState::new(Dashboard::new(config)))
    }

    async fn get_page(app: Router, uri: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn index_renders_filtered_cards() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("jobs.json"), JOBS).unwrap();

        let (status, html) = get_page(app(&dir), "/?location=Remote&q=developer").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Frontend Developer"));
        assert!(!html.contains("Data Analyst"));
        assert!(html.contains("<option value=\"Los Angeles\">"));
        assert!(html.contains("<option value=\"Remote\" selected>"));
    }

    #[tokio::test]
    async fn missing_file_is_an_error_page() {
        let dir = tempfile::tempdir().unwrap();

        let (status, html) = get_page(app(&dir), "/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(html.contains("not found"));

        let (status, _) = get_page(app(&dir), "/healthz").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn jobs_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("jobs.json"), JOBS).unwrap();

        let (status, body) = get_page(app(&dir), "/jobs?company=Riot").await;
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["summary"]["total"], 2);
        assert_eq!(body["records"][1]["job_title"], "Data Analyst");
        assert_eq!(body["summary"]["distinct"][0], json!(["Companies", 1]));
        assert_eq!(body["skipped"], json!([]));
    }

    #[test]
    fn jobs_response_lists_skipped_entries() {
        let table = JobTable::from_json_str(JOBS).unwrap();
        let report = LoadReport {
            table,
            warnings: vec![LoadError::MalformedPayload {
                origin: "https://jobs.example/data/broken.json".to_string(),
                message: "expected a list".to_string(),
            }],
            skipped: vec!["broken.json".to_string()],
            loaded_at: chrono::Utc::now(),
        };
        let schema = Schema::listing();
        let criteria = FilterCriteria::for_schema(&schema).with_query("analyst");
        let view = page::render("Jobs", &report, &schema, &criteria);

        let body = serde_json::to_value(JobsResponse::new(&report, view.summary, &criteria)).unwrap();
        assert_eq!(body["skipped"], json!(["broken.json"]));
        assert_eq!(body["warnings"][0]["kind"], "malformed_payload");
        assert_eq!(body["records"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reload_picks_up_new_data() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("jobs.json"), "[]").unwrap();
        let app = app(&dir);

        let (_, html) = get_page(app.clone(), "/").await;
        assert!(html.contains("No job listings available."));

        std::fs::write(dir.path().join("jobs.json"), JOBS).unwrap();
        let (_, html) = get_page(app.clone(), "/").await;
        assert!(html.contains("No job listings available."));

        let request = Request::builder()
            .method(Method::POST)
            .uri("/reload")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let (_, html) = get_page(app, "/").await;
        assert!(html.contains("Gameplay Programmer"));
    }
}
