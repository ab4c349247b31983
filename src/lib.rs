mod dashboard;
mod error;
mod filter;
mod job;
mod job_source;
pub mod page;
mod schema;
pub mod server;

pub use dashboard::{Dashboard, DashboardConfig};
pub use error::{ConfigError, LoadError};
pub use filter::FilterCriteria;
pub use job::{JobRecord, JobTable};
pub use job_source::{Fetch, JobSource, LoadReport};
pub use schema::{Field, Schema};

pub fn init_logger(default_level: log::LevelFilter) {
    pretty_env_logger::formatted_timed_builder()
        .filter_level(default_level)
        .parse_default_env()
        .init();
}
