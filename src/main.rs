use anyhow::Result;
use clap::Parser;

use assess_pipeline::cli::Cli;
use assess_pipeline::utils::logging;
use assess_pipeline::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::load(cli.config.as_deref())?;

    // 初始化日志
    logging::init(config.verbose_logging);
    logging::log_startup(&config);

    let app = App::initialize(config)?;
    cli.run(&app).await
}
