use job_dashboard::{init_logger, server, Dashboard};
use tiny_bail::prelude::*;

#[tokio::main]
async fn main() {
    init_logger(log::LevelFilter::Info);
    let dashboard = r!(Dashboard::from_config_file());
    r!(server::listen(dashboard).await);
}
