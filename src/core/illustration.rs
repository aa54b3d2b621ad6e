//! Illustration requester: the boundary to the fine-tune and image
//! generation backend.
//!
//! The core submits one fine-tune job per story, then asks for page
//! illustrations strictly in narrative order, one request at a time.

use async_trait::async_trait;
#[cfg(not(target_arch = "wasm32"))]
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::schema::story::StoryPage;

pub const IMAGE_WIDTH: u32 = 768;
pub const IMAGE_HEIGHT: u32 = 512;
pub const INFERENCE_STEPS: u32 = 30;
pub const GUIDANCE_SCALE: f32 = 7.0;
pub const NEGATIVE_PROMPT: &str = "ugly, blurry, dark, scary, realistic photo, adult, violence";

/// Reference returned by the stub fine-tune job.
pub const STUB_REFERENCE_HANDLE: &str = "stub://lora/child-lora.safetensors";

#[derive(Debug, Error)]
pub enum IllustrationError {
    #[cfg(not(target_arch = "wasm32"))]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{endpoint} returned status {status}")]
    Status { endpoint: &'static str, status: u16 },
    #[error("fine-tune job not ready (status {0:?})")]
    NotReady(FineTuneStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FineTuneStatus {
    Queued,
    Training,
    Ready,
}

/// Opaque token identifying the fine-tuned child model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceHandle(pub String);

impl ReferenceHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FineTuneRequest {
    pub child_id: String,
    /// Two or three uploaded reference photos, in upload order.
    pub photo_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FineTuneResponse {
    #[serde(rename = "loraUrl")]
    pub reference_handle: ReferenceHandle,
    pub status: FineTuneStatus,
}

/// One page illustration request. Everything but the handle, prompt and
/// seed is fixed by [`IllustrationRequest::for_prompt`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IllustrationRequest {
    #[serde(rename = "childLoraUrl")]
    pub reference_handle: ReferenceHandle,
    pub prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub cfg_scale: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl IllustrationRequest {
    pub fn for_prompt(reference_handle: &ReferenceHandle, prompt: &str) -> Self {
        Self {
            reference_handle: reference_handle.clone(),
            prompt: prompt.to_string(),
            negative_prompt: NEGATIVE_PROMPT.to_string(),
            width: IMAGE_WIDTH,
            height: IMAGE_HEIGHT,
            steps: INFERENCE_STEPS,
            cfg_scale: GUIDANCE_SCALE,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IllustrationResponse {
    pub image_url: String,
    pub seed: u64,
}

/// Backend that fine-tunes on the child's photos and paints pages.
#[async_trait]
pub trait IllustrationService: Send + Sync {
    async fn submit_fine_tune(
        &self,
        request: &FineTuneRequest,
    ) -> Result<FineTuneResponse, IllustrationError>;

    async fn generate(
        &self,
        request: &IllustrationRequest,
    ) -> Result<IllustrationResponse, IllustrationError>;
}

/// Submit the fine-tune job and return the handle, refusing to hand out
/// a handle for a job that is not ready yet.
pub async fn submit_fine_tune<S>(
    service: &S,
    request: &FineTuneRequest,
) -> Result<ReferenceHandle, IllustrationError>
where
    S: IllustrationService + ?Sized,
{
    let response = service.submit_fine_tune(request).await?;
    if response.status != FineTuneStatus::Ready {
        return Err(IllustrationError::NotReady(response.status));
    }
    tracing::info!(child_id = %request.child_id, "fine-tune ready");
    Ok(response.reference_handle)
}

/// Request one illustration per page, lowest page id first.
///
/// `on_page_ready` runs after each page resolves and before the next
/// request is issued. Returns once every page has been delivered.
pub async fn request_illustrations<S, F>(
    service: &S,
    pages: &[StoryPage],
    reference_handle: &ReferenceHandle,
    mut on_page_ready: F,
) -> Result<(), IllustrationError>
where
    S: IllustrationService + ?Sized,
    F: FnMut(u32, &str),
{
    let mut ordered: Vec<&StoryPage> = pages.iter().collect();
    ordered.sort_by_key(|page| page.id);

    for page in ordered {
        let request = IllustrationRequest::for_prompt(reference_handle, &page.illustration_prompt);
        let response = service.generate(&request).await?;
        tracing::debug!(page_id = page.id, seed = response.seed, "page illustrated");
        on_page_ready(page.id, &response.image_url);
    }
    Ok(())
}

/// Deterministic local backend used when no base URL is configured.
#[derive(Debug, Clone, Default)]
pub struct StubIllustrationService {
    latency: Duration,
}

impl StubIllustrationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }

    /// Placeholder image URL derived from the prompt's characters.
    pub fn placeholder_url(prompt: &str) -> String {
        let seed = prompt.chars().map(|c| c as u64).sum::<u64>() % 1000;
        format!("https://picsum.photos/seed/{seed}/{IMAGE_WIDTH}/{IMAGE_HEIGHT}")
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl IllustrationService for StubIllustrationService {
    async fn submit_fine_tune(
        &self,
        _request: &FineTuneRequest,
    ) -> Result<FineTuneResponse, IllustrationError> {
        self.pause().await;
        Ok(FineTuneResponse {
            reference_handle: ReferenceHandle(STUB_REFERENCE_HANDLE.to_string()),
            status: FineTuneStatus::Ready,
        })
    }

    async fn generate(
        &self,
        request: &IllustrationRequest,
    ) -> Result<IllustrationResponse, IllustrationError> {
        self.pause().await;
        Ok(IllustrationResponse {
            image_url: Self::placeholder_url(&request.prompt),
            seed: request.prompt.chars().count() as u64 * 7,
        })
    }
}

/// JSON-over-HTTP backend: `POST {base}/fine-tune` and `POST {base}/generate`.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct HttpIllustrationService {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(not(target_arch = "wasm32"))]
impl HttpIllustrationService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn post<B, R>(&self, endpoint: &'static str, body: &B) -> Result<R, IllustrationError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "illustration backend rejected request");
            return Err(IllustrationError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }
        Ok(response.json::<R>().await?)
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[async_trait]
impl IllustrationService for HttpIllustrationService {
    async fn submit_fine_tune(
        &self,
        request: &FineTuneRequest,
    ) -> Result<FineTuneResponse, IllustrationError> {
        self.post("fine-tune", request).await
    }

    async fn generate(
        &self,
        request: &IllustrationRequest,
    ) -> Result<IllustrationResponse, IllustrationError> {
        self.post("generate", request).await
    }
}
