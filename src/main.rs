use campaign_imagegen::config::{pipeline_from_cli, setup_logging};
use clap::Parser;
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = campaign_imagegen::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return;
    }

    let pipeline = match pipeline_from_cli(&cli) {
        Ok(pipeline) => pipeline,
        Err(err) => {
            error!("Failed to set up the OpenAI client: {}", err);
            return;
        }
    };

    if let Err(err) = campaign_imagegen::web::setup_server(
        &cli.listen_address,
        cli.port,
        cli.secure_cookies,
        cli.max_sessions,
        pipeline,
    )
    .await
    {
        error!("Application error: {}", err);
    }
}
