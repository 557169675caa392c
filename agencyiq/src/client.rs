#![doc = "HTTP implementation of the core's ContentApi against the agencyiq web API."]
//
//! # HTTP client (CLI <-> Core)
//!
//! This module bridges the [`ContentApi`] trait from `agencyiq-core` to the
//! product's JSON API. The core never sees HTTP: it only receives domain
//! values or an [`ApiError`].
//!
//! - Every request carries the session cookie and a fresh `X-Request-Id`
//!   (logged with the operation so client and server logs can be matched).
//! - Every request has a timeout; video rendering gets a longer one. Expiry is
//!   reported as [`ApiError::Timeout`], which the core surfaces as a
//!   recoverable transport failure.
//! - Non-2xx bodies are searched for a `message` or `error` field so the user
//!   sees the server's own explanation.

use std::time::Duration;

use agencyiq_core::contract::{
    ApiError, AutoPostSummary, BrandPurpose, ContentApi, GenerateScheduleRequest,
    GenerateVideoRequest, GeneratedSchedule, LocalEvent, QuotaState, VideoAsset, VideoHandle,
    VideoPromptRequest,
};
use agencyiq_core::post::Post;
use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::load_config::ApiSection;

pub struct AgencyClient {
    http: reqwest::Client,
    base_url: String,
    session_cookie: String,
    request_timeout: Duration,
    video_timeout: Duration,
}

/// Post-returning endpoints answer either with the post or `{ "post": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PostEnvelope {
    Wrapped { post: Post },
    Bare(Post),
}

impl From<PostEnvelope> for Post {
    fn from(envelope: PostEnvelope) -> Self {
        match envelope {
            PostEnvelope::Wrapped { post } | PostEnvelope::Bare(post) => post,
        }
    }
}

#[derive(Deserialize)]
struct PromptsResponse {
    prompts: Vec<String>,
}

impl AgencyClient {
    pub fn new(api: &ApiSection, session_cookie: &str) -> Result<Self, ApiError> {
        let request_timeout = Duration::from_secs(api.request_timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| {
                tracing::error!(error = ?e, "Failed to build HTTP client");
                ApiError::Network(e.to_string())
            })?;
        tracing::info!(
            base_url = %api.base_url,
            request_timeout_secs = api.request_timeout_secs,
            video_timeout_secs = api.video_timeout_secs,
            session_cookie_set = !session_cookie.is_empty(),
            "Initialized AgencyClient"
        );
        Ok(Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            session_cookie: session_cookie.to_string(),
            request_timeout,
            video_timeout: Duration::from_secs(api.video_timeout_secs),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `path` followed by the post id as one percent-encoded segment.
    fn post_url(&self, path: &str, post_id: &str) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.url(path)).map_err(|e| ApiError::Network(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Network(format!("base URL {} cannot take a path", self.base_url)))?
            .push(post_id);
        Ok(url)
    }

    async fn send_raw(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
        timeout: Duration,
    ) -> Result<reqwest::Response, ApiError> {
        let request_id = Uuid::new_v4();
        tracing::info!(operation, %request_id, "Sending request");

        let response = builder
            .header(COOKIE, &self.session_cookie)
            .header("X-Request-Id", request_id.to_string())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(operation, %request_id, error = ?e, "Request failed");
                classify(e, timeout)
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(operation, %request_id, %status, "Request succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_message(&body);
        tracing::error!(operation, %request_id, %status, message = ?message, "Server returned an error");
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
        timeout: Duration,
    ) -> Result<T, ApiError> {
        let response = self.send_raw(operation, builder, timeout).await?;
        response.json::<T>().await.map_err(|e| {
            tracing::error!(operation, error = ?e, "Failed to decode response body");
            ApiError::Decode(e.to_string())
        })
    }
}

fn classify(e: reqwest::Error, timeout: Duration) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout(timeout)
    } else if e.is_decode() {
        ApiError::Decode(e.to_string())
    } else {
        ApiError::Network(e.to_string())
    }
}

/// Pull a human-readable message out of an error body, if it has one.
pub fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl ContentApi for AgencyClient {
    async fn fetch_posts(&self) -> Result<Vec<Post>, ApiError> {
        let posts: Vec<Post> = self
            .send("fetch posts", self.http.get(self.url("/api/posts")), self.request_timeout)
            .await?;
        tracing::info!(count = posts.len(), "Fetched posts");
        Ok(posts)
    }

    async fn fetch_brand_purpose(&self) -> Result<Option<BrandPurpose>, ApiError> {
        match self
            .send(
                "fetch brand purpose",
                self.http.get(self.url("/api/brand-purpose")),
                self.request_timeout,
            )
            .await
        {
            Ok(brand_purpose) => Ok(brand_purpose),
            Err(ApiError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                tracing::info!("No brand purpose on record");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_quota(&self) -> Result<QuotaState, ApiError> {
        self.send(
            "fetch quota",
            self.http.get(self.url("/api/subscription-usage")),
            self.request_timeout,
        )
        .await
    }

    async fn approve_post(&self, post_id: &str) -> Result<Post, ApiError> {
        tracing::info!(post_id, "Submitting approval");
        let envelope: PostEnvelope = self
            .send(
                "approve post",
                self.http
                    .post(self.url("/api/approve-post"))
                    .json(&json!({ "postId": post_id })),
                self.request_timeout,
            )
            .await?;
        Ok(envelope.into())
    }

    async fn edit_post_content(&self, post_id: &str, content: &str) -> Result<Post, ApiError> {
        tracing::info!(post_id, "Submitting content edit");
        let envelope: PostEnvelope = self
            .send(
                "edit post",
                self.http
                    .put(self.post_url("/api/posts", post_id)?)
                    .json(&json!({ "content": content })),
                self.request_timeout,
            )
            .await?;
        Ok(envelope.into())
    }

    async fn generate_schedule(
        &self,
        req: GenerateScheduleRequest,
    ) -> Result<GeneratedSchedule, ApiError> {
        tracing::info!(total_posts = req.total_posts, "Requesting generated schedule");
        self.send(
            "generate schedule",
            self.http.post(self.url("/api/generate-ai-schedule")).json(&req),
            self.video_timeout,
        )
        .await
    }

    async fn generate_video_prompts(
        &self,
        req: VideoPromptRequest,
    ) -> Result<Vec<String>, ApiError> {
        let response: PromptsResponse = self
            .send(
                "generate video prompts",
                self.http.post(self.url("/api/video/generate-prompts")).json(&req),
                self.request_timeout,
            )
            .await?;
        Ok(response.prompts)
    }

    async fn generate_video(&self, req: GenerateVideoRequest) -> Result<VideoHandle, ApiError> {
        tracing::info!(post_id = %req.post_id, theme = ?req.render.theme, "Requesting video render");
        self.send(
            "generate video",
            self.http.post(self.url("/api/video/render")).json(&req),
            self.video_timeout,
        )
        .await
    }

    async fn preview_video(&self, post_id: &str) -> Result<VideoAsset, ApiError> {
        self.send(
            "preview video",
            self.http.get(self.post_url("/api/video/preview", post_id)?),
            self.request_timeout,
        )
        .await
    }

    async fn attach_video(&self, post_id: &str, asset: &VideoAsset) -> Result<Post, ApiError> {
        tracing::info!(post_id, url = %asset.url, "Attaching approved video");
        let envelope: PostEnvelope = self
            .send(
                "approve video",
                self.http
                    .post(self.url("/api/video/approve"))
                    .json(&json!({ "postId": post_id, "videoUrl": asset.url })),
                self.request_timeout,
            )
            .await?;
        Ok(envelope.into())
    }

    async fn auto_post_schedule(&self) -> Result<AutoPostSummary, ApiError> {
        self.send(
            "auto-post schedule",
            self.http.post(self.url("/api/auto-post-schedule")),
            self.video_timeout,
        )
        .await
    }

    async fn fetch_local_events(&self) -> Result<Vec<LocalEvent>, ApiError> {
        self.send(
            "fetch local events",
            self.http.get(self.url("/api/local-events")),
            self.request_timeout,
        )
        .await
    }
}
