//! # contract: the collaborator interface consumed by the scheduling core
//!
//! Everything the core needs from the outside world (posts, brand purpose,
//! quota, the AI generation model, the video renderer and the publisher) is
//! reached through the [`ContentApi`] trait. The CLI crate provides the HTTP
//! implementation; tests use the `mockall`-generated `MockContentApi`.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`; the mock is exported with the
//!   `test-export-mocks` feature so integration tests in other crates can use it.
//!
//! ## Errors
//! - Implementors convert every transport, status and decoding problem into an
//!   [`ApiError`]. The core turns those into user-facing failures, preferring
//!   the server's own message.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::post::{Platform, Post};
use crate::render::RenderSettings;

/// The user's brand purpose, as captured by the brand-purpose setup flow.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandPurpose {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub brand_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub core_purpose: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub audience: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products_services: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pain_points: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motivations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_to_be_done: Option<String>,
}

/// A half-finished setup form arrives with null or missing fields; those
/// decode as empty so `is_complete` can reject them.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl BrandPurpose {
    /// Name, purpose and audience must all be filled in.
    pub fn is_complete(&self) -> bool {
        [&self.brand_name, &self.core_purpose, &self.audience]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Starter,
    Growth,
    Professional,
    #[serde(other)]
    Other,
}

impl PlanTier {
    /// Nominal posts per billing cycle. Display only: the server's
    /// `remaining_posts` is what caps generation.
    pub fn allocation(&self) -> Option<u32> {
        match self {
            PlanTier::Starter => Some(12),
            PlanTier::Growth => Some(27),
            PlanTier::Professional => Some(52),
            PlanTier::Other => None,
        }
    }
}

/// Subscription usage, owned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaState {
    pub total_allocation: i64,
    pub used_posts: i64,
    pub remaining_posts: i64,
    #[serde(rename = "subscriptionPlan", alias = "plan")]
    pub plan: PlanTier,
}

/// Request body for the AI schedule generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateScheduleRequest {
    pub brand_purpose: BrandPurpose,
    pub total_posts: u32,
    pub platforms: Vec<Platform>,
}

/// Strategic analysis returned alongside a generated schedule. Display only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleAnalysis {
    #[serde(default)]
    pub jtbd_score: Option<f64>,
    #[serde(default)]
    pub platform_weighting: BTreeMap<String, f64>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSchedule {
    pub posts: Vec<Post>,
    #[serde(default)]
    pub analysis: ScheduleAnalysis,
}

/// Inputs for the video prompt suggestion model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPromptRequest {
    pub post_id: String,
    pub platform: Platform,
    pub brand_name: String,
    pub core_purpose: String,
    pub audience: String,
    pub post_content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoRequest {
    pub post_id: String,
    pub prompt: String,
    pub render: RenderSettings,
}

/// Handle for a video the renderer accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoHandle {
    pub video_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// A playable reference to a rendered video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoAsset {
    #[serde(alias = "videoUrl")]
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoPostSummary {
    pub success_count: u32,
    pub total_posts: u32,
}

/// Entry in the local event catalog. `date_key` is `MM-DD` for recurring
/// events or `YYYY-MM-DD` for one-off events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalEvent {
    pub date_key: String,
    pub name: String,
}

/// Failure reported by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("server responded with status {status}: {}", .message.as_deref().unwrap_or("<no message>"))]
    Status { status: u16, message: Option<String> },

    #[error("network error: {0}")]
    Network(String),

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// The message the server chose to show the user, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => Some(message.as_str()),
            _ => None,
        }
    }
}

/// Trait for every remote operation the scheduling core consumes.
///
/// All methods are suspension points; nothing else in the core awaits.
/// The trait is `Send` + `Sync` so controllers can be shared across tasks.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Fetch the full post collection for the current user.
    async fn fetch_posts(&self) -> Result<Vec<Post>, ApiError>;

    /// Fetch the brand purpose, `None` if the user never set one up.
    async fn fetch_brand_purpose(&self) -> Result<Option<BrandPurpose>, ApiError>;

    async fn fetch_quota(&self) -> Result<QuotaState, ApiError>;

    async fn approve_post(&self, post_id: &str) -> Result<Post, ApiError>;

    async fn edit_post_content(&self, post_id: &str, content: &str) -> Result<Post, ApiError>;

    /// Run the AI schedule generator.
    async fn generate_schedule(
        &self,
        req: GenerateScheduleRequest,
    ) -> Result<GeneratedSchedule, ApiError>;

    async fn generate_video_prompts(&self, req: VideoPromptRequest)
        -> Result<Vec<String>, ApiError>;

    async fn generate_video(&self, req: GenerateVideoRequest) -> Result<VideoHandle, ApiError>;

    async fn preview_video(&self, post_id: &str) -> Result<VideoAsset, ApiError>;

    /// Persist an approved video onto its post. Does not change the post status.
    async fn attach_video(&self, post_id: &str, asset: &VideoAsset) -> Result<Post, ApiError>;

    /// Publish every approved post in one batch on the server side.
    async fn auto_post_schedule(&self) -> Result<AutoPostSummary, ApiError>;

    async fn fetch_local_events(&self) -> Result<Vec<LocalEvent>, ApiError>;
}
