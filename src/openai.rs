//! External capabilities (text completion, image generation, byte fetch) and
//! the OpenAI-backed client that implements all three.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::ServiceError;
use crate::imaging::ImageSize;

/// Request for a single text completion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier, eg `gpt-4o-mini`
    pub model: String,
    /// The full instruction text, prompt included
    pub instructions: String,
    /// Output-length ceiling
    pub max_tokens: u32,
}

/// Request for one generated image.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ImageRequest {
    /// Model identifier, eg `dall-e-3`
    pub model: String,
    /// The prompt to draw
    pub prompt: String,
    /// Quality tier, eg `standard`
    pub quality: String,
    /// Requested pixel size
    pub size: ImageSize,
}

/// Where the generated image ended up.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ImageSource {
    /// A remote URL to fetch
    Url(String),
    /// Bytes returned inline by the service
    Inline(Vec<u8>),
}

/// The image-generation service's answer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ImageReference {
    /// Where to get the bytes from
    pub source: ImageSource,
    /// The model's rewrite of the prompt, if it sent one
    pub revised_prompt: Option<String>,
}

/// Something that can turn instructions into one completion string.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Returns the raw completion text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError>;
}

/// Something that can draw one image from a prompt.
#[async_trait]
pub trait ImageGeneration: Send + Sync {
    /// Returns a reference to exactly one image.
    async fn generate_image(&self, request: &ImageRequest)
    -> Result<ImageReference, ServiceError>;
}

/// Plain network fetch of a URL's bytes.
#[async_trait]
pub trait ImageFetch: Send + Sync {
    /// Downloads the bytes behind `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ServiceError>;
}

// -----------------------------
// Chat Completions API (text)
// -----------------------------

#[derive(Serialize, Debug)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// -----------------------------
// Images API
// -----------------------------

/// Request body for POST /images/generations
#[derive(Serialize, Debug)]
struct ImagesGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
struct ImagesGenerateResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Deserialize, Debug)]
struct ImageData {
    b64_json: Option<String>,
    url: Option<String>,
    revised_prompt: Option<String>,
}

/// Talks to the OpenAI (or a compatible) HTTP API.
#[derive(Clone, Debug)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl OpenAiClient {
    /// Builds a client against `base_url`, eg `https://api.openai.com/v1`.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ServiceError> {
        // Url::join drops the last path segment unless the base ends in a slash.
        let mut base = base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)
            .map_err(|err| ServiceError::Transport(format!("Invalid base URL {base_url}: {err}")))?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        self.base_url
            .join(path)
            .map_err(|err| ServiceError::Transport(format!("Invalid endpoint {path}: {err}")))
    }

    async fn post_json<B: Serialize + Sync, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let url = self.endpoint(path)?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(ServiceError::Api {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        serde_json::from_slice(&bytes)
            .map_err(|err| ServiceError::MalformedResponse(format!("{path}: {err}")))
    }
}

#[async_trait]
impl TextCompletion for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.instructions,
            }],
            max_tokens: request.max_tokens,
        };
        debug!("Requesting completion from {}", request.model);
        let parsed: ChatCompletionResponse = self.post_json("chat/completions", &body).await?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ServiceError::MalformedResponse("chat/completions returned no content".to_string())
            })
    }
}

#[async_trait]
impl ImageGeneration for OpenAiClient {
    async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> Result<ImageReference, ServiceError> {
        let body = ImagesGenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            n: 1,
            size: request.size.as_str(),
            quality: Some(request.quality.as_str()).filter(|quality| !quality.is_empty()),
        };
        info!(
            "Generating {} image with model: {}",
            request.size, request.model
        );
        let parsed: ImagesGenerateResponse =
            self.post_json("images/generations", &body).await?;

        let first = parsed.data.into_iter().next().ok_or_else(|| {
            ServiceError::MalformedResponse("No image data returned".to_string())
        })?;

        let source = if let Some(url) = first.url {
            ImageSource::Url(url)
        } else if let Some(b64_json) = first.b64_json {
            let bytes = general_purpose::STANDARD
                .decode(b64_json)
                .map_err(|err| ServiceError::Decode(format!("base64: {err}")))?;
            ImageSource::Inline(bytes)
        } else {
            return Err(ServiceError::MalformedResponse(
                "Image response missing b64_json and url fields".to_string(),
            ));
        };

        Ok(ImageReference {
            source,
            revised_prompt: first.revised_prompt,
        })
    }
}

#[async_trait]
impl ImageFetch for OpenAiClient {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ServiceError> {
        // The image URL is pre-signed, no credentials go with it.
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(ServiceError::Api {
                status: status.as_u16(),
                body: format!("image download returned {} bytes", bytes.len()),
            });
        }
        debug!("Downloaded {} image bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_keep_the_base_path() {
        let client = OpenAiClient::new("https://api.openai.com/v1", "sk-test", None)
            .expect("build client");
        assert_eq!(
            client.endpoint("chat/completions").expect("join").as_str(),
            "https://api.openai.com/v1/chat/completions"
        );
        let client = OpenAiClient::new("http://localhost:8080/v1/", "sk-test", None)
            .expect("build client");
        assert_eq!(
            client.endpoint("images/generations").expect("join").as_str(),
            "http://localhost:8080/v1/images/generations"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(OpenAiClient::new("not a url", "sk-test", None).is_err());
    }

    #[test]
    fn image_request_serializes_like_the_api_expects() {
        let body = ImagesGenerateRequest {
            model: "dall-e-3",
            prompt: "a cat",
            n: 1,
            size: ImageSize::Portrait.as_str(),
            quality: Some("standard"),
        };
        let value = serde_json::to_value(&body).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "model": "dall-e-3",
                "prompt": "a cat",
                "n": 1,
                "size": "1024x1792",
                "quality": "standard"
            })
        );
    }
}
