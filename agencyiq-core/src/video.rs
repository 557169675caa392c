//! Video sub-workflow: prompt → generate → preview → approve, with at most one
//! regeneration.
//!
//! ```text
//! closed → prompting → generating → previewing → approved (closed)
//!                          ^             |
//!                          └─ regenerate ┘   (once per session)
//! ```
//!
//! The whole state lives in a [`VideoPromptSession`] value owned by the caller.
//! Transitions borrow it mutably, so a second action cannot start while one is
//! awaiting; approval and close consume it. Only one session per
//! [`VideoWorkflow`] is live at a time: the session holds a lease on the
//! workflow's slot and frees it when dropped.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::contract::{BrandPurpose, ContentApi, GenerateVideoRequest, VideoAsset, VideoPromptRequest};
use crate::error::{SchedulerError, SchedulerResult};
use crate::post::{Platform, Post};
use crate::render::RenderSettings;
use crate::schedule::require_brand_purpose;
use crate::store::PostStore;

/// Regenerations allowed per session.
pub const MAX_REGENERATIONS: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoStage {
    Prompting,
    Generating,
    Previewing,
}

type Slot = Arc<Mutex<Option<String>>>;

#[derive(Debug)]
struct SessionLease {
    slot: Slot,
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Ephemeral editing state for one post's video. Never persisted.
#[derive(Debug)]
pub struct VideoPromptSession {
    id: Uuid,
    post_id: String,
    platform: Platform,
    candidate_prompts: Vec<String>,
    selected_prompt: Option<String>,
    video_id: Option<String>,
    asset: Option<VideoAsset>,
    regeneration_count: u8,
    awaiting_custom_prompt: bool,
    stage: VideoStage,
    _lease: SessionLease,
}

impl VideoPromptSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn candidate_prompts(&self) -> &[String] {
        &self.candidate_prompts
    }

    pub fn selected_prompt(&self) -> Option<&str> {
        self.selected_prompt.as_deref()
    }

    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    pub fn asset(&self) -> Option<&VideoAsset> {
        self.asset.as_ref()
    }

    pub fn regeneration_count(&self) -> u8 {
        self.regeneration_count
    }

    pub fn awaiting_custom_prompt(&self) -> bool {
        self.awaiting_custom_prompt
    }

    pub fn stage(&self) -> VideoStage {
        self.stage
    }

    pub fn can_regenerate(&self) -> bool {
        self.stage == VideoStage::Previewing && self.regeneration_count < MAX_REGENERATIONS
    }

    /// Approval needs a previewable asset.
    pub fn can_approve(&self) -> bool {
        self.stage == VideoStage::Previewing && self.asset.is_some()
    }

    fn expect_stage(&self, expected: VideoStage, action: &str) -> SchedulerResult<()> {
        match self.stage {
            stage if stage == expected => Ok(()),
            VideoStage::Generating => Err(SchedulerError::SessionBusy(format!(
                "cannot {action} while a video is generating"
            ))),
            stage => Err(SchedulerError::ValidationFailure(format!(
                "cannot {action} while {stage:?}"
            ))),
        }
    }
}

/// A rejected approval or close hands the session back untouched.
#[derive(Debug)]
pub struct VideoSessionError {
    pub error: SchedulerError,
    pub session: VideoPromptSession,
}

impl fmt::Display for VideoSessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for VideoSessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub struct VideoWorkflow<A: ?Sized> {
    api: Arc<A>,
    store: PostStore,
    active: Slot,
}

impl<A> VideoWorkflow<A>
where
    A: ContentApi + ?Sized,
{
    pub fn new(api: Arc<A>, store: PostStore) -> Self {
        Self {
            api,
            store,
            active: Arc::default(),
        }
    }

    /// Post id of the live session, if any.
    pub fn active_post(&self) -> Option<String> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn reserve(&self, post_id: &str) -> SchedulerResult<SessionLease> {
        let mut slot = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = slot.as_deref() {
            return Err(SchedulerError::SessionBusy(format!(
                "a video session for post {current} is already open"
            )));
        }
        *slot = Some(post_id.to_string());
        Ok(SessionLease {
            slot: Arc::clone(&self.active),
        })
    }

    /// Open a session and load candidate prompts. Without a complete brand
    /// purpose no session is opened and the user must be redirected.
    pub async fn open(
        &self,
        post_id: &str,
        brand_purpose: Option<&BrandPurpose>,
    ) -> SchedulerResult<VideoPromptSession> {
        let brand_purpose = require_brand_purpose(brand_purpose).inspect_err(|_| {
            info!(post_id, "Video generation needs a brand purpose; redirecting to setup");
        })?;
        let post = self
            .store
            .get(post_id)
            .ok_or_else(|| SchedulerError::PostNotFound(post_id.to_string()))?;
        let lease = self.reserve(post_id)?;

        let request = VideoPromptRequest {
            post_id: post.id.clone(),
            platform: post.platform,
            brand_name: brand_purpose.brand_name.clone(),
            core_purpose: brand_purpose.core_purpose.clone(),
            audience: brand_purpose.audience.clone(),
            post_content: post.content.clone(),
        };
        let prompts = match self.api.generate_video_prompts(request).await {
            Ok(prompts) => prompts,
            Err(e) => {
                error!(post_id, error = ?e, "Failed to load video prompts");
                return Err(SchedulerError::transport("generate video prompts", &e));
            }
        };
        let candidate_prompts: Vec<String> = prompts
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if candidate_prompts.is_empty() {
            warn!(post_id, "Prompt generator returned no usable prompts");
            return Err(SchedulerError::TransportFailure {
                operation: "generate video prompts",
                message: "No video prompts were suggested. Please try again.".to_string(),
            });
        }

        let session = VideoPromptSession {
            id: Uuid::new_v4(),
            post_id: post.id,
            platform: post.platform,
            candidate_prompts,
            selected_prompt: None,
            video_id: None,
            asset: None,
            regeneration_count: 0,
            awaiting_custom_prompt: false,
            stage: VideoStage::Prompting,
            _lease: lease,
        };
        info!(
            session_id = %session.id,
            post_id,
            prompts = session.candidate_prompts.len(),
            "Video session opened"
        );
        Ok(session)
    }

    /// Fetches the brand purpose, then opens a session.
    pub async fn open_for_current_user(&self, post_id: &str) -> SchedulerResult<VideoPromptSession> {
        let brand_purpose = self.api.fetch_brand_purpose().await.map_err(|e| {
            error!(post_id, error = ?e, "Could not load brand purpose");
            SchedulerError::transport("load brand purpose", &e)
        })?;
        self.open(post_id, brand_purpose.as_ref()).await
    }

    /// Replace one candidate prompt with the user's edit.
    pub fn edit_prompt(
        &self,
        session: &mut VideoPromptSession,
        index: usize,
        text: &str,
    ) -> SchedulerResult<()> {
        session.expect_stage(VideoStage::Prompting, "edit a prompt")?;
        let text = text.trim();
        if text.is_empty() {
            return Err(SchedulerError::ValidationFailure(
                "prompt cannot be empty".to_string(),
            ));
        }
        let slot = session.candidate_prompts.get_mut(index).ok_or_else(|| {
            SchedulerError::ValidationFailure(format!("no prompt at position {index}"))
        })?;
        *slot = text.to_string();
        Ok(())
    }

    /// Generate a video from the chosen candidate prompt.
    pub async fn select_prompt(
        &self,
        session: &mut VideoPromptSession,
        index: usize,
    ) -> SchedulerResult<()> {
        session.expect_stage(VideoStage::Prompting, "select a prompt")?;
        let prompt = session
            .candidate_prompts
            .get(index)
            .cloned()
            .ok_or_else(|| {
                SchedulerError::ValidationFailure(format!("no prompt at position {index}"))
            })?;
        self.run_generation(session, prompt, VideoStage::Prompting)
            .await
    }

    /// Ask for a custom prompt. Refused once the regeneration is used up.
    pub fn begin_regeneration(&self, session: &mut VideoPromptSession) -> SchedulerResult<()> {
        session.expect_stage(VideoStage::Previewing, "regenerate")?;
        if session.regeneration_count >= MAX_REGENERATIONS {
            return Err(SchedulerError::RegenerationLimitReached {
                limit: MAX_REGENERATIONS,
            });
        }
        session.awaiting_custom_prompt = true;
        Ok(())
    }

    /// Regenerate with a custom prompt. Allowed once per session.
    pub async fn regenerate(
        &self,
        session: &mut VideoPromptSession,
        custom_prompt: &str,
    ) -> SchedulerResult<()> {
        session.expect_stage(VideoStage::Previewing, "regenerate")?;
        if session.regeneration_count >= MAX_REGENERATIONS {
            warn!(session_id = %session.id, "Regeneration limit reached");
            return Err(SchedulerError::RegenerationLimitReached {
                limit: MAX_REGENERATIONS,
            });
        }
        let custom_prompt = custom_prompt.trim();
        if custom_prompt.is_empty() {
            return Err(SchedulerError::ValidationFailure(
                "a custom prompt is required to regenerate".to_string(),
            ));
        }

        session.regeneration_count += 1;
        session.awaiting_custom_prompt = false;
        self.run_generation(session, custom_prompt.to_string(), VideoStage::Previewing)
            .await
    }

    async fn run_generation(
        &self,
        session: &mut VideoPromptSession,
        prompt: String,
        return_to: VideoStage,
    ) -> SchedulerResult<()> {
        session.stage = VideoStage::Generating;
        let request = GenerateVideoRequest {
            post_id: session.post_id.clone(),
            render: RenderSettings::for_post(session.platform, &prompt),
            prompt: prompt.clone(),
        };
        info!(
            session_id = %session.id,
            post_id = %session.post_id,
            theme = ?request.render.theme,
            regeneration = session.regeneration_count,
            "Generating video"
        );

        let handle = match self.api.generate_video(request).await {
            Ok(handle) => handle,
            Err(e) => {
                error!(session_id = %session.id, error = ?e, "Video generation failed");
                session.stage = return_to;
                return Err(SchedulerError::transport("generate video", &e));
            }
        };
        session.selected_prompt = Some(prompt);
        session.video_id = Some(handle.video_id);

        session.asset = match self.api.preview_video(&session.post_id).await {
            Ok(asset) => Some(asset),
            Err(e) => {
                warn!(
                    session_id = %session.id,
                    error = ?e,
                    "Preview unavailable; approval disabled until a preview exists"
                );
                None
            }
        };
        session.stage = VideoStage::Previewing;
        info!(session_id = %session.id, has_preview = session.asset.is_some(), "Video ready for preview");
        Ok(())
    }

    /// Attach the previewed video to its post and close the session. The
    /// post's status is not changed.
    pub async fn approve(&self, session: VideoPromptSession) -> Result<Post, VideoSessionError> {
        if let Err(error) = session.expect_stage(VideoStage::Previewing, "approve") {
            return Err(VideoSessionError { error, session });
        }
        let Some(asset) = session.asset.clone() else {
            return Err(VideoSessionError {
                error: SchedulerError::ValidationFailure(
                    "there is no video preview to approve".to_string(),
                ),
                session,
            });
        };

        info!(session_id = %session.id, post_id = %session.post_id, "Attaching approved video");
        let returned = match self.api.attach_video(&session.post_id, &asset).await {
            Ok(post) => post,
            Err(e) => {
                error!(session_id = %session.id, error = ?e, "Attaching video failed");
                return Err(VideoSessionError {
                    error: SchedulerError::transport("approve video", &e),
                    session,
                });
            }
        };

        let post_id = session.post_id.clone();
        drop(session);
        self.store
            .refresh_after_mutation(self.api.as_ref(), Some(returned.clone()))
            .await;
        info!(post_id = %post_id, "Video approved; session closed");
        Ok(self.store.get(&post_id).unwrap_or(returned))
    }

    /// Discard the session. Refused while a video is generating.
    pub fn close(&self, session: VideoPromptSession) -> Result<(), VideoSessionError> {
        if session.stage == VideoStage::Generating {
            return Err(VideoSessionError {
                error: SchedulerError::SessionBusy(
                    "cannot close while a video is generating".to_string(),
                ),
                session,
            });
        }
        info!(session_id = %session.id, post_id = %session.post_id, "Video session discarded");
        Ok(())
    }
}
