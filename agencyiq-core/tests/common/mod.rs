#![allow(dead_code)]

use agencyiq_core::contract::{BrandPurpose, PlanTier, QuotaState};
use agencyiq_core::post::{Platform, Post, PostStatus};
use chrono::{DateTime, Utc};

pub fn post(id: &str, platform: Platform, status: PostStatus, scheduled_for: &str) -> Post {
    Post {
        id: id.to_string(),
        platform,
        content: format!("content for {id}"),
        status,
        scheduled_for: DateTime::parse_from_rfc3339(scheduled_for)
            .expect("valid RFC 3339 timestamp")
            .with_timezone(&Utc),
        published_at: None,
        error_log: None,
        ai_score: None,
        ai_recommendation: None,
        analytics: None,
        video_url: None,
    }
}

pub fn with_status(mut post: Post, status: PostStatus) -> Post {
    post.status = status;
    post
}

pub fn brand_purpose() -> BrandPurpose {
    BrandPurpose {
        brand_name: "Queensland Coffee Co".to_string(),
        core_purpose: "Help small cafes grow with ethically sourced beans".to_string(),
        audience: "Independent cafe owners in South East Queensland".to_string(),
        ..BrandPurpose::default()
    }
}

pub fn quota(remaining: i64) -> QuotaState {
    QuotaState {
        total_allocation: 27,
        used_posts: 27 - remaining,
        remaining_posts: remaining,
        plan: PlanTier::Growth,
    }
}
