use job_dashboard::{init_logger, Dashboard};
use tiny_bail::prelude::*;

#[tokio::main]
async fn main() {
    init_logger(log::LevelFilter::Info);
    let mut dashboard = r!(Dashboard::from_config_file());

    // Any arguments are search keywords.
    let keywords = std::env::args().skip(1).collect::<Vec<_>>();
    let mut criteria = dashboard.criteria();
    if !keywords.is_empty() {
        criteria = criteria.with_query(keywords.join(" "));
    }

    let view = r!(dashboard.view(&criteria).await);
    view.print();
}
