use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::error::GeminiError;
use crate::types::{
    Download, GenerateContentRequest, GenerateContentResponse, GenerateVideosRequest, Operation,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client for the Gemini API.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Creates a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Generates content (text and images) for a conversation.
    #[instrument(skip(self, request), fields(contents = request.contents.len()))]
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        debug!("Sending generateContent request");
        self.post_json(&format!("models/{model}:generateContent"), request)
            .await
    }

    /// Starts a video generation job.
    #[instrument(skip(self, request))]
    pub async fn generate_videos(
        &self,
        model: &str,
        request: &GenerateVideosRequest,
    ) -> Result<Operation, GeminiError> {
        debug!("Submitting video job");
        let operation: Operation = self
            .post_json(&format!("models/{model}:predictLongRunning"), request)
            .await?;
        debug!(operation = %operation.name, "Video job accepted");
        Ok(operation)
    }

    /// Fetches the current state of a long-running job.
    #[instrument(skip(self, operation), fields(operation = %operation.name))]
    pub async fn get_operation(&self, operation: &Operation) -> Result<Operation, GeminiError> {
        let response = self
            .http
            .get(format!("{}/{}", self.base_url, operation.name))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;
        decode(response).await
    }

    /// Downloads generated content from a signed locator.
    ///
    /// The key travels as a `key` query parameter because the locator points
    /// at a file endpoint that does not read the auth header.
    #[instrument(skip(self))]
    pub async fn download(&self, uri: &str) -> Result<Download, GeminiError> {
        let response = self
            .http
            .get(uri)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeminiError::Fetch {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = response.bytes().await?.to_vec();

        debug!(len = bytes.len(), "Downloaded content");
        Ok(Download {
            bytes,
            content_type,
        })
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, GeminiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, path))
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GeminiError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(|m| m.as_str())
                    .map(String::from)
            })
            .unwrap_or_else(|| {
                if text.is_empty() {
                    "Unknown error".to_string()
                } else {
                    text.clone()
                }
            });
        return Err(GeminiError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_str(&text)?)
}
