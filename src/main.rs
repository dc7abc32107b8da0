use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use roughbanner::config::{AppConfig, setup_logging};
use roughbanner::pipeline::Pipeline;
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let cli = roughbanner::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return ExitCode::FAILURE;
    }

    let config = match AppConfig::from_options(&cli.providers) {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    let pipeline = Arc::new(Pipeline::from_config(&config));

    if let Err(err) =
        roughbanner::web::setup_server(&cli.listen_address, cli.port, pipeline).await
    {
        error!("Application error: {}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
