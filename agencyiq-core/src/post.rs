//! Post data model and its lifecycle rules.
//!
//! A post moves `draft → scheduled → approved → {published | failed}`. The
//! client core only ever drives `draft|scheduled → approved`; publishing and
//! the retry of failed posts belong to the external publisher.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Social platform a post targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Facebook,
    Instagram,
    Linkedin,
    #[serde(alias = "twitter")]
    X,
    Youtube,
    Tiktok,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Facebook,
        Platform::Instagram,
        Platform::Linkedin,
        Platform::X,
        Platform::Youtube,
        Platform::Tiktok,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::Linkedin => "linkedin",
            Platform::X => "x",
            Platform::Youtube => "youtube",
            Platform::Tiktok => "tiktok",
        }
    }

    /// Short-form vertical video platforms.
    pub fn is_short_form(&self) -> bool {
        matches!(self, Platform::Instagram | Platform::Tiktok)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "facebook" => Ok(Platform::Facebook),
            "instagram" => Ok(Platform::Instagram),
            "linkedin" => Ok(Platform::Linkedin),
            "x" | "twitter" => Ok(Platform::X),
            "youtube" => Ok(Platform::Youtube),
            "tiktok" => Ok(Platform::Tiktok),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Approved,
    Published,
    Failed,
}

impl PostStatus {
    /// Only drafts and scheduled posts can be approved.
    pub fn can_approve(&self) -> bool {
        matches!(self, PostStatus::Draft | PostStatus::Scheduled)
    }

    /// Published posts are immutable apart from analytics backfill.
    pub fn can_edit(&self) -> bool {
        !matches!(self, PostStatus::Published)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PostStatus::Published | PostStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            PostStatus::Draft => 0,
            PostStatus::Scheduled => 1,
            PostStatus::Approved => 2,
            PostStatus::Published | PostStatus::Failed => 3,
        }
    }

    /// Forward-only transition check. `failed → approved` is the publisher's
    /// retry path and is accepted when observed, never initiated here.
    pub fn allows_transition_to(&self, next: PostStatus) -> bool {
        if *self == PostStatus::Failed && next == PostStatus::Approved {
            return true;
        }
        next.rank() >= self.rank() && !(*self == PostStatus::Published && next != PostStatus::Published)
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PostStatus::Draft => "draft",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Approved => "approved",
            PostStatus::Published => "published",
            PostStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PostAnalytics {
    #[serde(default)]
    pub reach: u64,
    #[serde(default)]
    pub engagement: u64,
    #[serde(default)]
    pub impressions: u64,
}

/// A unit of content targeted at one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub platform: Platform,
    pub content: String,
    pub status: PostStatus,
    pub scheduled_for: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_log: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics: Option<PostAnalytics>,
    #[serde(default, rename = "videoUrl", skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl Post {
    pub fn has_video(&self) -> bool {
        self.video_url.is_some()
    }
}

/// Identifiers are opaque; the server sends either strings or integers.
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_are_normalised_to_strings() {
        let json = r#"{
            "id": 42,
            "platform": "twitter",
            "content": "hello",
            "status": "scheduled",
            "scheduledFor": "2025-06-11T23:30:00+10:00"
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.id, "42");
        assert_eq!(post.platform, Platform::X);
        assert_eq!(post.scheduled_for.to_rfc3339(), "2025-06-11T13:30:00+00:00");
        assert!(post.video_url.is_none());
    }

    #[test]
    fn published_posts_cannot_move_backwards() {
        assert!(!PostStatus::Published.allows_transition_to(PostStatus::Approved));
        assert!(!PostStatus::Published.allows_transition_to(PostStatus::Failed));
        assert!(!PostStatus::Approved.allows_transition_to(PostStatus::Draft));
        assert!(PostStatus::Draft.allows_transition_to(PostStatus::Approved));
        assert!(PostStatus::Failed.allows_transition_to(PostStatus::Approved));
        assert!(PostStatus::Approved.allows_transition_to(PostStatus::Published));
    }
}
