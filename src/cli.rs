//! CLI parser
use clap::Parser;
use std::num::NonZeroU16;

use crate::constants::{
    DEFAULT_IMAGE_MODEL, DEFAULT_IMAGE_QUALITY, DEFAULT_OPENAI_BASE_URL, DEFAULT_TEXT_MODEL,
    SESSION_STORE_CAPACITY, SUGGESTION_MAX_TOKENS,
};

#[derive(Parser, Debug, Clone)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "CAMPAIGN_DEBUG")]
    /// Enable debug logging. Env: CAMPAIGN_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "9000", env = "CAMPAIGN_PORT")]
    /// http listener, defaults to `9000`.
    /// Env: CAMPAIGN_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "CAMPAIGN_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: CAMPAIGN_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    /// OpenAI API key, sent to both the completion and image endpoints.
    /// Env: OPENAI_API_KEY
    pub openai_api_key: String,

    #[clap(long, default_value = DEFAULT_OPENAI_BASE_URL, env = "OPENAI_BASE_URL")]
    /// Base URL of the OpenAI-compatible API.
    /// Env: OPENAI_BASE_URL
    pub openai_base_url: String,

    #[clap(long, default_value = DEFAULT_TEXT_MODEL, env = "CAMPAIGN_TEXT_MODEL")]
    /// Model used to turn the assembled prompt into a suggestion.
    pub text_model: String,

    #[clap(long, default_value = DEFAULT_IMAGE_MODEL, env = "CAMPAIGN_IMAGE_MODEL")]
    /// Image model.
    pub image_model: String,

    #[clap(long, default_value = DEFAULT_IMAGE_QUALITY, env = "CAMPAIGN_IMAGE_QUALITY")]
    /// Quality tier requested from the image model.
    pub image_quality: String,

    #[clap(long, default_value_t = SUGGESTION_MAX_TOKENS, env = "CAMPAIGN_MAX_TOKENS")]
    /// Output-length ceiling for the suggestion call.
    pub max_tokens: u32,

    #[clap(long, env = "CAMPAIGN_REQUEST_TIMEOUT_SECS")]
    /// Timeout for each outbound API call, unset means the client's default (none).
    pub request_timeout_secs: Option<u64>,

    #[clap(long, env = "CAMPAIGN_SECURE_COOKIES")]
    /// Mark the session cookie `Secure`, turn this on when serving over https.
    pub secure_cookies: bool,

    #[clap(long, default_value_t = SESSION_STORE_CAPACITY, env = "CAMPAIGN_MAX_SESSIONS")]
    /// Most browser sessions kept in memory, the least recently active are dropped first.
    pub max_sessions: usize,
}
