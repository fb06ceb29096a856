//! The campaign pipeline: assembled prompt -> suggestion -> image.
//!
//! Each user action is one event. [`Pipeline::dispatch`] performs exactly one
//! transition against the session's [`SuggestionState`] and returns a
//! [`RenderPass`] describing what the page should show afterwards.
//!
//! ```text
//! Idle --get suggestion--> Suggested --generate image--> Imaged
//!   ^                         |  ^                          |
//!   |                         +--+ get suggestion           |
//!   +-- generate image: warning, no call    Suggested <-----+ (next render)
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::constants::{
    DEFAULT_IMAGE_MODEL, DEFAULT_IMAGE_QUALITY, DEFAULT_TEXT_MODEL, SUGGESTION_MAX_TOKENS,
};
use crate::error::ServiceError;
use crate::imaging::{GeneratedImage, ImageOffer, ImageSize};
use crate::openai::{
    CompletionRequest, ImageFetch, ImageGeneration, ImageRequest, ImageSource, OpenAiClient,
    TextCompletion,
};
use crate::prompt::{PromptFields, StyleTemplate, assemble_prompt, suggestion_instructions};

/// Shown when "Generate Image" is pressed before there's a suggestion.
pub const NEEDS_SUGGESTION_WARNING: &str = "Please get suggestions first to generate an image.";

/// Models and limits used for the outbound calls.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PipelineSettings {
    /// Model used for the suggestion
    pub text_model: String,
    /// Model used for the image
    pub image_model: String,
    /// Image quality tier
    pub image_quality: String,
    /// Output-length ceiling for the suggestion
    pub max_tokens: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            image_quality: DEFAULT_IMAGE_QUALITY.to_string(),
            max_tokens: SUGGESTION_MAX_TOKENS,
        }
    }
}

/// Where a session is in the flow.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    /// No suggestion yet
    Idle,
    /// A suggestion is stored, no image in this render
    Suggested,
    /// An image was produced in this render
    Imaged,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Suggested => "suggested",
            Stage::Imaged => "imaged",
        };
        f.write_str(name)
    }
}

/// The part of a session that outlives a single render: the last suggestion.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SuggestionState {
    suggestion: Option<String>,
}

impl SuggestionState {
    /// The stored suggestion, if there is a usable one.
    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion
            .as_deref()
            .filter(|suggestion| !suggestion.trim().is_empty())
    }

    /// `Idle` or `Suggested`; `Imaged` only exists within a render.
    pub fn stage(&self) -> Stage {
        match self.suggestion() {
            Some(_) => Stage::Suggested,
            None => Stage::Idle,
        }
    }

    fn store(&mut self, suggestion: String) {
        self.suggestion = Some(suggestion);
    }
}

/// What the user asked for.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Action {
    /// Just re-render with the current fields
    #[default]
    Refresh,
    /// "Get Suggestions"
    GetSuggestion,
    /// "Generate Image"
    GenerateImage,
}

/// Returned for an action name we don't recognise.
#[derive(Debug, Eq, PartialEq)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown action: {}", self.0)
    }
}

impl std::error::Error for UnknownAction {}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "refresh" => Ok(Action::Refresh),
            "suggest" => Ok(Action::GetSuggestion),
            "generate" => Ok(Action::GenerateImage),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

/// Everything the form submitted besides the action.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FormInput {
    /// The four keyword fields
    pub fields: PromptFields,
    /// Selected template, if any
    pub template: Option<StyleTemplate>,
    /// Selected image size
    pub size: ImageSize,
}

impl FormInput {
    /// The form as it looks on first load.
    pub fn initial() -> Self {
        Self {
            fields: PromptFields::example(),
            template: Some(StyleTemplate::Minimalist),
            size: ImageSize::Square,
        }
    }
}

/// How loud a notice is.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeLevel {
    /// Something went right
    Success,
    /// The user did something out of order
    Warning,
    /// A service call failed
    Error,
}

impl NoticeLevel {
    /// CSS class for the notice.
    pub fn class(self) -> &'static str {
        match self {
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

/// An inline message for the user.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Message text
    pub text: String,
}

impl Notice {
    fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// The result of one event: what to draw.
#[derive(Clone, Debug)]
pub struct RenderPass {
    /// Stage after the event
    pub stage: Stage,
    /// Prompt assembled from the submitted fields
    pub assembled_prompt: String,
    /// Text of the applied template, if any
    pub template_text: Option<&'static str>,
    /// The stored suggestion after the event
    pub suggestion: Option<String>,
    /// The image produced by this event, if any
    pub image: Option<ImageOffer>,
    /// Messages to show inline
    pub notices: Vec<Notice>,
}

/// Runs the suggestion and image calls against a set of capabilities.
#[derive(Clone)]
pub struct Pipeline {
    completion: Arc<dyn TextCompletion>,
    generator: Arc<dyn ImageGeneration>,
    fetcher: Arc<dyn ImageFetch>,
    settings: PipelineSettings,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Wires up the three capabilities.
    pub fn new(
        completion: Arc<dyn TextCompletion>,
        generator: Arc<dyn ImageGeneration>,
        fetcher: Arc<dyn ImageFetch>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            completion,
            generator,
            fetcher,
            settings,
        }
    }

    /// One OpenAI client serving all three capabilities.
    pub fn openai(client: OpenAiClient, settings: PipelineSettings) -> Self {
        let client = Arc::new(client);
        Self::new(client.clone(), client.clone(), client, settings)
    }

    /// The models and limits in use.
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Asks the text model to turn the assembled prompt into one suggestion sentence.
    pub async fn fetch_suggestion(&self, assembled_prompt: &str) -> Result<String, ServiceError> {
        let request = CompletionRequest {
            model: self.settings.text_model.clone(),
            instructions: suggestion_instructions(assembled_prompt),
            max_tokens: self.settings.max_tokens,
        };
        let text = self.completion.complete(&request).await?;
        let suggestion = text.trim();
        if suggestion.is_empty() {
            return Err(ServiceError::MalformedResponse(
                "the model returned an empty suggestion".to_string(),
            ));
        }
        Ok(suggestion.to_string())
    }

    /// Generates one image for `suggestion`, fetches it and decodes it.
    ///
    /// Callers must not pass an empty suggestion; [`Pipeline::dispatch`] gates this.
    pub async fn synthesize_image(
        &self,
        suggestion: &str,
        size: ImageSize,
    ) -> Result<GeneratedImage, ServiceError> {
        let request = ImageRequest {
            model: self.settings.image_model.clone(),
            prompt: suggestion.to_string(),
            quality: self.settings.image_quality.clone(),
            size,
        };
        let reference = self.generator.generate_image(&request).await?;
        let bytes = match reference.source {
            ImageSource::Url(url) => self.fetcher.fetch(&url).await?,
            ImageSource::Inline(bytes) => bytes,
        };
        let mut image = GeneratedImage::decode(&bytes, size)?;
        if let Some(revised_prompt) = reference.revised_prompt {
            debug!("Revised prompt from image model: {revised_prompt}");
            image.revised_prompt = Some(revised_prompt);
        }
        Ok(image)
    }

    /// Applies one action to the session and describes the resulting page.
    pub async fn dispatch(
        &self,
        state: &mut SuggestionState,
        input: &FormInput,
        action: Action,
    ) -> RenderPass {
        let assembled_prompt = assemble_prompt(&input.fields, input.template);
        let mut notices = Vec::new();
        let mut image = None;

        match action {
            Action::Refresh => {}
            Action::GetSuggestion => {
                info!("Fetching suggestion using {}", self.settings.text_model);
                match self.fetch_suggestion(&assembled_prompt).await {
                    Ok(suggestion) => {
                        debug!("Suggestion: {suggestion}");
                        state.store(suggestion);
                    }
                    Err(err) => {
                        error!("Suggestion request failed: {err}");
                        notices.push(Notice::error(format!("Error generating suggestions: {err}")));
                    }
                }
            }
            Action::GenerateImage => match state.suggestion() {
                None => {
                    warn!("Image requested before any suggestion");
                    notices.push(Notice::warning(NEEDS_SUGGESTION_WARNING));
                }
                Some(suggestion) => {
                    info!(
                        "Generating {} image using {}",
                        input.size, self.settings.image_model
                    );
                    match self
                        .synthesize_image(suggestion, input.size)
                        .await
                        .and_then(ImageOffer::new)
                    {
                        Ok(offer) => image = Some(offer),
                        Err(err) => {
                            error!("Image generation failed: {err}");
                            notices.push(Notice::error(format!("An error occurred: {err}")));
                        }
                    }
                }
            },
        }

        let stage = if image.is_some() {
            Stage::Imaged
        } else {
            state.stage()
        };

        RenderPass {
            stage,
            assembled_prompt,
            template_text: input.template.map(StyleTemplate::description),
            suggestion: state.suggestion().map(str::to_string),
            image,
            notices,
        }
    }
}
