//! Shared constants for things
//!

/// Default base URL for the OpenAI API.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model for suggestion refinement.
pub const DEFAULT_TEXT_MODEL: &str = "gpt-4o-mini";

/// Default image model.
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";

/// Default image quality tier.
pub const DEFAULT_IMAGE_QUALITY: &str = "standard";

/// Output-length ceiling for the suggestion call.
pub const SUGGESTION_MAX_TOKENS: u32 = 50;

/// File name offered for the downloaded image.
pub const DOWNLOAD_FILE_NAME: &str = "generated_image.png";

/// MIME type of the downloaded image.
pub const DOWNLOAD_MIME_TYPE: &str = "image/png";

/// Session key holding the [`crate::pipeline::SuggestionState`].
pub const SUGGESTION_SESSION_KEY: &str = "suggestion_state";

/// Sessions expire after this many minutes of inactivity.
pub const SESSION_INACTIVITY_MINUTES: i64 = 60;

/// Default cap on sessions held in memory.
pub const SESSION_STORE_CAPACITY: usize = 10_000;

/// How often expired sessions are swept from the store.
pub const SESSION_SWEEP_INTERVAL_SECS: u64 = 60;

/// Length of CSRF session tokens
pub const CSRF_TOKEN_LENGTH: usize = 32;
