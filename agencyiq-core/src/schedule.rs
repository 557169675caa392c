//! Schedule generation: brand purpose + quota in, a batch of new posts out.
//!
//! Preconditions are checked locally, in order, before anything is sent:
//!   1. a complete brand purpose (else `PrerequisiteMissing`, redirect the user)
//!   2. remaining quota (else `QuotaExhausted`)
//!   3. at least one target platform (else `ValidationFailure`)
//!
//! The generator's posts are appended to the visible collection so earlier
//! approved and published posts stay on screen. Failures are reported once;
//! the user re-invokes generation explicitly.

use std::sync::{Arc, PoisonError, RwLock};

use futures::future::try_join;
use tracing::{error, info};

use crate::contract::{
    BrandPurpose, ContentApi, GenerateScheduleRequest, GeneratedSchedule, QuotaState,
    ScheduleAnalysis,
};
use crate::error::{SchedulerError, SchedulerResult};
use crate::post::Platform;
use crate::quota::{allocate_generation_size, DEFAULT_GENERATION_CEILING};
use crate::store::PostStore;

pub struct ScheduleOrchestrator<A: ?Sized> {
    api: Arc<A>,
    store: PostStore,
    ceiling: u32,
    last_analysis: RwLock<Option<ScheduleAnalysis>>,
}

/// Brand purpose must exist and be complete before anything is generated.
pub fn require_brand_purpose(brand_purpose: Option<&BrandPurpose>) -> SchedulerResult<&BrandPurpose> {
    match brand_purpose {
        Some(bp) if bp.is_complete() => Ok(bp),
        _ => Err(SchedulerError::PrerequisiteMissing {
            what: "brand purpose",
        }),
    }
}

impl<A> ScheduleOrchestrator<A>
where
    A: ContentApi + ?Sized,
{
    pub fn new(api: Arc<A>, store: PostStore) -> Self {
        Self {
            api,
            store,
            ceiling: DEFAULT_GENERATION_CEILING,
            last_analysis: RwLock::new(None),
        }
    }

    pub fn with_ceiling(mut self, ceiling: u32) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Analysis from the most recent successful generation.
    pub fn last_analysis(&self) -> Option<ScheduleAnalysis> {
        self.last_analysis
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn generate_schedule(
        &self,
        brand_purpose: Option<&BrandPurpose>,
        quota: &QuotaState,
        platforms: &[Platform],
    ) -> SchedulerResult<GeneratedSchedule> {
        let brand_purpose = require_brand_purpose(brand_purpose).inspect_err(|_| {
            info!("Schedule generation needs a brand purpose; redirecting to setup");
        })?;
        let total_posts = allocate_generation_size(quota.remaining_posts, self.ceiling)?;
        if platforms.is_empty() {
            return Err(SchedulerError::ValidationFailure(
                "select at least one platform".to_string(),
            ));
        }

        let mut platforms = platforms.to_vec();
        platforms.sort();
        platforms.dedup();

        info!(
            brand = %brand_purpose.brand_name,
            total_posts,
            remaining = quota.remaining_posts,
            platforms = ?platforms,
            "Requesting AI schedule"
        );
        let request = GenerateScheduleRequest {
            brand_purpose: brand_purpose.clone(),
            total_posts,
            platforms,
        };

        let generated = match self.api.generate_schedule(request).await {
            Ok(generated) => generated,
            Err(e) => {
                error!(error = ?e, "Schedule generation failed");
                return Err(SchedulerError::transport("generate schedule", &e));
            }
        };

        self.store.merge(generated.posts.clone());
        *self
            .last_analysis
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(generated.analysis.clone());

        info!(
            generated = generated.posts.len(),
            visible = self.store.len(),
            "Schedule generated and merged"
        );
        Ok(generated)
    }

    /// Fetches brand purpose and quota, then generates.
    pub async fn generate_for_current_user(
        &self,
        platforms: &[Platform],
    ) -> SchedulerResult<GeneratedSchedule> {
        let (brand_purpose, quota) = try_join(
            self.api.fetch_brand_purpose(),
            self.api.fetch_quota(),
        )
        .await
        .map_err(|e| {
            error!(error = ?e, "Could not load brand purpose or quota");
            SchedulerError::transport("load brand purpose and quota", &e)
        })?;

        self.generate_schedule(brand_purpose.as_ref(), &quota, platforms)
            .await
    }
}
