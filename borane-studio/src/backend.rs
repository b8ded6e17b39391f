use std::future::Future;

use borane_gemini::{
    Download, GeminiClient, GeminiError, GenerateContentRequest, GenerateContentResponse,
    GenerateVideosRequest, Operation,
};

use crate::config::Config;

/// Synchronous content generation.
pub trait ImageBackend: Send + Sync {
    fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> impl Future<Output = Result<GenerateContentResponse, GeminiError>> + Send;
}

/// Long-running video jobs and the download of their results.
pub trait VideoBackend: Send + Sync {
    fn submit(
        &self,
        request: &GenerateVideosRequest,
    ) -> impl Future<Output = Result<Operation, GeminiError>> + Send;

    fn poll(&self, job: &Operation) -> impl Future<Output = Result<Operation, GeminiError>> + Send;

    fn fetch(&self, uri: &str) -> impl Future<Output = Result<Download, GeminiError>> + Send;
}

/// Builds a backend authenticated with a given API key.
pub trait Connector: Send + Sync {
    type Backend: ImageBackend + VideoBackend + 'static;

    fn connect(&self, api_key: &str) -> Self::Backend;
}

/// [`ImageBackend`] and [`VideoBackend`] over the Gemini REST API.
pub struct GeminiBackend {
    client: GeminiClient,
    image_model: String,
    video_model: String,
}

impl GeminiBackend {
    pub fn new(
        client: GeminiClient,
        image_model: impl Into<String>,
        video_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            image_model: image_model.into(),
            video_model: video_model.into(),
        }
    }
}

impl ImageBackend for GeminiBackend {
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        self.client
            .generate_content(&self.image_model, request)
            .await
    }
}

impl VideoBackend for GeminiBackend {
    async fn submit(&self, request: &GenerateVideosRequest) -> Result<Operation, GeminiError> {
        self.client.generate_videos(&self.video_model, request).await
    }

    async fn poll(&self, job: &Operation) -> Result<Operation, GeminiError> {
        self.client.get_operation(job).await
    }

    async fn fetch(&self, uri: &str) -> Result<Download, GeminiError> {
        self.client.download(uri).await
    }
}

/// Connects to Gemini using the endpoint and models from [`Config`].
#[derive(Debug, Clone)]
pub struct GeminiConnector {
    base_url: String,
    image_model: String,
    video_model: String,
}

impl GeminiConnector {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.base_url.clone(),
            image_model: config.image_model.clone(),
            video_model: config.video_model.clone(),
        }
    }
}

impl Connector for GeminiConnector {
    type Backend = GeminiBackend;

    fn connect(&self, api_key: &str) -> GeminiBackend {
        GeminiBackend::new(
            GeminiClient::with_base_url(api_key, self.base_url.clone()),
            self.image_model.clone(),
            self.video_model.clone(),
        )
    }
}
