//! Stub capabilities with call counters, for unit and router tests.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::openai::{
    CompletionRequest, ImageFetch, ImageGeneration, ImageReference, ImageRequest, ImageSource,
    TextCompletion,
};
use crate::pipeline::{Pipeline, PipelineSettings};

pub(crate) const STUB_IMAGE_URL: &str = "https://images.example.org/generated.png";

/// A tiny 3x2 RGB PNG with distinct pixels.
pub(crate) fn sample_png() -> Vec<u8> {
    let bitmap = image::RgbImage::from_fn(3, 2, |x, y| {
        image::Rgb([(x * 80) as u8, (y * 120) as u8, 200])
    });
    let mut output = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(bitmap)
        .write_to(&mut output, image::ImageFormat::Png)
        .expect("encode sample png");
    output.into_inner()
}

#[derive(Default)]
pub(crate) struct StubCompletion {
    pub(crate) calls: AtomicUsize,
    pub(crate) replies: Mutex<Vec<Result<String, ServiceError>>>,
    pub(crate) last_request: Mutex<Option<CompletionRequest>>,
}

impl StubCompletion {
    /// Replies are handed out in order; once exhausted every call fails.
    pub(crate) fn with_replies(replies: Vec<Result<String, ServiceError>>) -> Self {
        let mut replies = replies;
        replies.reverse();
        Self {
            replies: Mutex::new(replies),
            ..Default::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextCompletion for StubCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().expect("lock") = Some(request.clone());
        self.replies
            .lock()
            .expect("lock")
            .pop()
            .unwrap_or_else(|| Err(ServiceError::Transport("no more replies".to_string())))
    }
}

#[derive(Default)]
pub(crate) struct StubImages {
    pub(crate) calls: AtomicUsize,
    pub(crate) fail: bool,
    /// Answer with these bytes inline instead of a URL.
    pub(crate) inline: Option<Vec<u8>>,
    pub(crate) last_request: Mutex<Option<ImageRequest>>,
}

impl StubImages {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGeneration for StubImages {
    async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> Result<ImageReference, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().expect("lock") = Some(request.clone());
        if self.fail {
            return Err(ServiceError::Api {
                status: 400,
                body: "content policy violation".to_string(),
            });
        }
        let source = match &self.inline {
            Some(bytes) => ImageSource::Inline(bytes.clone()),
            None => ImageSource::Url(STUB_IMAGE_URL.to_string()),
        };
        Ok(ImageReference {
            source,
            revised_prompt: Some(format!("revised: {}", request.prompt)),
        })
    }
}

pub(crate) struct StubFetch {
    pub(crate) calls: AtomicUsize,
    pub(crate) bytes: Option<Vec<u8>>,
}

impl StubFetch {
    pub(crate) fn serving(bytes: Vec<u8>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            bytes: Some(bytes),
        }
    }

    pub(crate) fn broken() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            bytes: None,
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetch for StubFetch {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.bytes {
            Some(bytes) if url == STUB_IMAGE_URL => Ok(bytes.clone()),
            Some(_) => Err(ServiceError::Api {
                status: 404,
                body: url.to_string(),
            }),
            None => Err(ServiceError::Transport("connection reset by peer".to_string())),
        }
    }
}

pub(crate) struct Stubs {
    pub(crate) completion: Arc<StubCompletion>,
    pub(crate) images: Arc<StubImages>,
    pub(crate) fetch: Arc<StubFetch>,
}

impl Stubs {
    pub(crate) fn new(completion: StubCompletion, images: StubImages, fetch: StubFetch) -> Self {
        Self {
            completion: Arc::new(completion),
            images: Arc::new(images),
            fetch: Arc::new(fetch),
        }
    }

    pub(crate) fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            self.completion.clone(),
            self.images.clone(),
            self.fetch.clone(),
            PipelineSettings::default(),
        )
    }
}
