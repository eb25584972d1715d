use anyhow::Context;
use clap::Parser;

use tubedrop::config::AppConfig;
use tubedrop::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::parse();
    init_logging(&config.log_filter);

    let bind = config.bind;
    tubedrop::run(config)
        .await
        .with_context(|| format!("tubedrop failed while serving on {}", bind))
}
