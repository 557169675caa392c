//! Post lifecycle controller: approval and content edits for single posts.
//!
//! Each post has at most one mutation in flight. A second approval of the same
//! post while the first is pending is suppressed without a network call; an
//! edit while an approval is pending (or the reverse) is rejected. Different
//! posts never block each other.
//!
//! After every successful mutation the controller refetches the collection
//! instead of patching its local copy.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::DateTime;
use chrono_tz::Tz;
use tracing::{error, info, warn};

use crate::calendar::business_time;
use crate::contract::ContentApi;
use crate::error::{SchedulerError, SchedulerResult};
use crate::post::{Platform, PostStatus};
use crate::store::PostStore;

/// Transient, client-only sub-state of a post with a request in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostActivity {
    Approving,
    Editing,
}

/// Shown to the user once an approval lands.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalConfirmation {
    pub post_id: String,
    pub platform: Platform,
    pub scheduled_for: DateTime<Tz>,
}

impl fmt::Display for ApprovalConfirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Post {} approved for {}, scheduled for {} AEST",
            self.post_id,
            self.platform,
            self.scheduled_for.format("%a %d %b %Y %H:%M")
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApproveOutcome {
    Approved(ApprovalConfirmation),
    /// Already approved; no request was sent.
    AlreadyApproved,
    /// An approval for this post is still pending; no request was sent.
    Suppressed,
}

type Registry = Arc<Mutex<HashMap<String, PostActivity>>>;

/// Clears the post's in-flight marker when dropped, including when the
/// owning future is dropped or the request times out.
struct InFlightGuard {
    registry: Registry,
    post_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.post_id);
    }
}

pub struct PostLifecycleController<A: ?Sized> {
    api: Arc<A>,
    store: PostStore,
    in_flight: Registry,
}

impl<A> PostLifecycleController<A>
where
    A: ContentApi + ?Sized,
{
    pub fn new(api: Arc<A>, store: PostStore) -> Self {
        Self {
            api,
            store,
            in_flight: Arc::default(),
        }
    }

    pub fn store(&self) -> &PostStore {
        &self.store
    }

    pub fn activity(&self, post_id: &str) -> Option<PostActivity> {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(post_id)
            .copied()
    }

    pub fn is_approving(&self, post_id: &str) -> bool {
        self.activity(post_id) == Some(PostActivity::Approving)
    }

    /// Whether an approve action should be offered for this post right now.
    pub fn can_approve(&self, post_id: &str) -> bool {
        self.activity(post_id).is_none()
            && self
                .store
                .get(post_id)
                .is_some_and(|post| post.status.can_approve())
    }

    fn try_begin(&self, post_id: &str, activity: PostActivity) -> Result<InFlightGuard, PostActivity> {
        let mut registry = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = registry.get(post_id) {
            return Err(*current);
        }
        registry.insert(post_id.to_string(), activity);
        Ok(InFlightGuard {
            registry: Arc::clone(&self.in_flight),
            post_id: post_id.to_string(),
        })
    }

    /// Approve a draft or scheduled post.
    pub async fn approve(&self, post_id: &str) -> SchedulerResult<ApproveOutcome> {
        let post = self
            .store
            .get(post_id)
            .ok_or_else(|| SchedulerError::PostNotFound(post_id.to_string()))?;

        if post.status == PostStatus::Approved {
            info!(post_id, "Post already approved, nothing to send");
            return Ok(ApproveOutcome::AlreadyApproved);
        }
        if !post.status.can_approve() {
            return Err(SchedulerError::InvalidTransition {
                post_id: post_id.to_string(),
                action: "approve",
                status: post.status,
            });
        }

        let _guard = match self.try_begin(post_id, PostActivity::Approving) {
            Ok(guard) => guard,
            Err(PostActivity::Approving) => {
                info!(post_id, "Approval already in flight, suppressing duplicate");
                return Ok(ApproveOutcome::Suppressed);
            }
            Err(PostActivity::Editing) => {
                warn!(post_id, "Approval rejected while an edit is in flight");
                return Err(SchedulerError::PostBusy(post_id.to_string()));
            }
        };

        info!(post_id, platform = %post.platform, "Approving post");
        let returned = match self.api.approve_post(post_id).await {
            Ok(returned) => returned,
            Err(e) => {
                error!(post_id, error = ?e, "Approval failed; post keeps its status");
                return Err(SchedulerError::transport("approve post", &e));
            }
        };

        self.store
            .refresh_after_mutation(self.api.as_ref(), Some(returned.clone()))
            .await;
        let effective = self.store.get(post_id).unwrap_or(returned);

        let confirmation = ApprovalConfirmation {
            post_id: post_id.to_string(),
            platform: effective.platform,
            scheduled_for: business_time(&effective.scheduled_for),
        };
        info!(
            post_id,
            platform = %confirmation.platform,
            scheduled_for = %confirmation.scheduled_for,
            "Post approved"
        );
        Ok(ApproveOutcome::Approved(confirmation))
    }

    /// Replace a post's content. Status is left untouched.
    pub async fn edit_content(&self, post_id: &str, new_content: &str) -> SchedulerResult<()> {
        if new_content.trim().is_empty() {
            return Err(SchedulerError::ValidationFailure(
                "post content cannot be empty".to_string(),
            ));
        }

        let post = self
            .store
            .get(post_id)
            .ok_or_else(|| SchedulerError::PostNotFound(post_id.to_string()))?;
        if !post.status.can_edit() {
            return Err(SchedulerError::InvalidTransition {
                post_id: post_id.to_string(),
                action: "edit",
                status: post.status,
            });
        }

        let _guard = self.try_begin(post_id, PostActivity::Editing).map_err(|current| {
            warn!(post_id, ?current, "Edit rejected while another request is in flight");
            SchedulerError::PostBusy(post_id.to_string())
        })?;

        info!(post_id, chars = new_content.chars().count(), "Updating post content");
        let returned = match self.api.edit_post_content(post_id, new_content).await {
            Ok(returned) => returned,
            Err(e) => {
                error!(post_id, error = ?e, "Content update failed");
                return Err(SchedulerError::transport("edit post", &e));
            }
        };

        self.store
            .refresh_after_mutation(self.api.as_ref(), Some(returned))
            .await;
        info!(post_id, "Post content updated");
        Ok(())
    }
}
