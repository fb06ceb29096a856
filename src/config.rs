//! Config handling

use std::time::Duration;

use tracing::log::LevelFilter;

use crate::cli::CliOptions;
use crate::error::ServiceError;
use crate::openai::OpenAiClient;
use crate::pipeline::{Pipeline, PipelineSettings};

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("tower_sessions", LevelFilter::Warn)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

impl From<&CliOptions> for PipelineSettings {
    fn from(cli: &CliOptions) -> Self {
        Self {
            text_model: cli.text_model.clone(),
            image_model: cli.image_model.clone(),
            image_quality: cli.image_quality.clone(),
            max_tokens: cli.max_tokens,
        }
    }
}

/// Builds the OpenAI-backed pipeline from the command line options.
pub fn pipeline_from_cli(cli: &CliOptions) -> Result<Pipeline, ServiceError> {
    let client = OpenAiClient::new(
        &cli.openai_base_url,
        cli.openai_api_key.clone(),
        cli.request_timeout_secs.map(Duration::from_secs),
    )?;
    Ok(Pipeline::openai(client, PipelineSettings::from(cli)))
}
