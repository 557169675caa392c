mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use agencyiq_core::contract::{
    ApiError, AutoPostSummary, BrandPurpose, ContentApi, GenerateScheduleRequest,
    GenerateVideoRequest, GeneratedSchedule, LocalEvent, MockContentApi, QuotaState,
    VideoAsset, VideoHandle, VideoPromptRequest,
};
use agencyiq_core::lifecycle::{ApproveOutcome, PostActivity, PostLifecycleController};
use agencyiq_core::post::{Platform, Post, PostStatus};
use agencyiq_core::store::PostStore;
use agencyiq_core::SchedulerError;
use async_trait::async_trait;
use tokio::sync::Notify;

use common::{post, with_status};

fn draft() -> Post {
    post("p1", Platform::Instagram, PostStatus::Draft, "2025-06-11T23:30:00+10:00")
}

/// Approvals stay pending until `release` is notified.
struct GatedApi {
    posts: Mutex<Vec<Post>>,
    approvals: AtomicUsize,
    release: Notify,
}

impl GatedApi {
    fn new(posts: Vec<Post>) -> Self {
        Self {
            posts: Mutex::new(posts),
            approvals: AtomicUsize::new(0),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl ContentApi for GatedApi {
    async fn fetch_posts(&self) -> Result<Vec<Post>, ApiError> {
        Ok(self.posts.lock().unwrap().clone())
    }

    async fn approve_post(&self, post_id: &str) -> Result<Post, ApiError> {
        self.approvals.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        let mut posts = self.posts.lock().unwrap();
        let post = posts.iter_mut().find(|p| p.id == post_id).unwrap();
        post.status = PostStatus::Approved;
        Ok(post.clone())
    }

    async fn fetch_brand_purpose(&self) -> Result<Option<BrandPurpose>, ApiError> {
        unimplemented!()
    }
    async fn fetch_quota(&self) -> Result<QuotaState, ApiError> {
        unimplemented!()
    }
    async fn edit_post_content(&self, _: &str, _: &str) -> Result<Post, ApiError> {
        unimplemented!("edits must not reach the network while an approval is pending")
    }
    async fn generate_schedule(&self, _: GenerateScheduleRequest) -> Result<GeneratedSchedule, ApiError> {
        unimplemented!()
    }
    async fn generate_video_prompts(&self, _: VideoPromptRequest) -> Result<Vec<String>, ApiError> {
        unimplemented!()
    }
    async fn generate_video(&self, _: GenerateVideoRequest) -> Result<VideoHandle, ApiError> {
        unimplemented!()
    }
    async fn preview_video(&self, _: &str) -> Result<VideoAsset, ApiError> {
        unimplemented!()
    }
    async fn attach_video(&self, _: &str, _: &VideoAsset) -> Result<Post, ApiError> {
        unimplemented!()
    }
    async fn auto_post_schedule(&self) -> Result<AutoPostSummary, ApiError> {
        unimplemented!()
    }
    async fn fetch_local_events(&self) -> Result<Vec<LocalEvent>, ApiError> {
        unimplemented!()
    }
}

#[tokio::test]
async fn approve_draft_sends_one_request_and_confirms() {
    let mut api = MockContentApi::new();
    api.expect_approve_post()
        .withf(|id: &str| id == "p1")
        .times(1)
        .returning(|_| Ok(with_status(draft(), PostStatus::Approved)));
    api.expect_fetch_posts()
        .times(1)
        .returning(|| Ok(vec![with_status(draft(), PostStatus::Approved)]));

    let controller = PostLifecycleController::new(Arc::new(api), PostStore::with_posts(vec![draft()]));
    let outcome = controller.approve("p1").await.expect("approval succeeds");

    let ApproveOutcome::Approved(confirmation) = outcome else {
        panic!("expected an approval confirmation, got {outcome:?}");
    };
    assert_eq!(confirmation.post_id, "p1");
    assert_eq!(confirmation.platform, Platform::Instagram);
    assert_eq!(
        confirmation.scheduled_for.format("%Y-%m-%d %H:%M").to_string(),
        "2025-06-11 23:30"
    );
    assert!(confirmation.to_string().contains("instagram"));
    assert_eq!(controller.store().get("p1").unwrap().status, PostStatus::Approved);
    assert!(!controller.can_approve("p1"));
}

#[tokio::test]
async fn approving_twice_sends_a_single_request() {
    let mut api = MockContentApi::new();
    api.expect_approve_post()
        .times(1)
        .returning(|_| Ok(with_status(draft(), PostStatus::Approved)));
    api.expect_fetch_posts()
        .returning(|| Ok(vec![with_status(draft(), PostStatus::Approved)]));

    let controller = PostLifecycleController::new(Arc::new(api), PostStore::with_posts(vec![draft()]));
    let (first, second) = tokio::join!(controller.approve("p1"), controller.approve("p1"));

    assert!(matches!(first, Ok(ApproveOutcome::Approved(_))));
    assert_eq!(second, Ok(ApproveOutcome::AlreadyApproved));
}

#[tokio::test]
async fn concurrent_approval_of_pending_post_is_suppressed() {
    let api = Arc::new(GatedApi::new(vec![draft()]));
    let controller = PostLifecycleController::new(Arc::clone(&api), PostStore::with_posts(vec![draft()]));

    let second = async {
        tokio::task::yield_now().await;
        assert!(controller.is_approving("p1"));
        assert!(!controller.can_approve("p1"));
        let outcome = controller.approve("p1").await;
        api.release.notify_one();
        outcome
    };
    let (first, second) = tokio::join!(controller.approve("p1"), second);

    assert!(matches!(first, Ok(ApproveOutcome::Approved(_))));
    assert_eq!(second, Ok(ApproveOutcome::Suppressed));
    assert_eq!(api.approvals.load(Ordering::SeqCst), 1);
    assert_eq!(controller.activity("p1"), None);
}

#[tokio::test]
async fn edit_is_rejected_while_approval_is_pending() {
    let api = Arc::new(GatedApi::new(vec![draft()]));
    let controller = PostLifecycleController::new(Arc::clone(&api), PostStore::with_posts(vec![draft()]));

    let edit = async {
        tokio::task::yield_now().await;
        assert_eq!(controller.activity("p1"), Some(PostActivity::Approving));
        let outcome = controller.edit_content("p1", "rewritten").await;
        api.release.notify_one();
        outcome
    };
    let (approval, edit) = tokio::join!(controller.approve("p1"), edit);

    assert!(approval.is_ok());
    assert_eq!(edit, Err(SchedulerError::PostBusy("p1".to_string())));
}

#[tokio::test]
async fn other_posts_are_not_blocked_by_a_pending_approval() {
    let other = post("p2", Platform::Linkedin, PostStatus::Scheduled, "2025-06-12T09:00:00+10:00");
    let api = Arc::new(GatedApi::new(vec![draft(), other.clone()]));
    let controller =
        PostLifecycleController::new(Arc::clone(&api), PostStore::with_posts(vec![draft(), other]));

    let second = async {
        tokio::task::yield_now().await;
        assert!(controller.is_approving("p1"));
        assert!(controller.is_approving("p2"));
        api.release.notify_one();
        tokio::task::yield_now().await;
        api.release.notify_one();
    };
    let (a, b, ()) = tokio::join!(controller.approve("p1"), controller.approve("p2"), second);

    assert!(matches!(a, Ok(ApproveOutcome::Approved(_))));
    assert!(matches!(b, Ok(ApproveOutcome::Approved(_))));
    assert_eq!(api.approvals.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_approval_keeps_status_and_reports_server_message() {
    let mut api = MockContentApi::new();
    api.expect_approve_post().times(1).returning(|_| {
        Err(ApiError::Status {
            status: 409,
            message: Some("Facebook connection expired".to_string()),
        })
    });

    let controller = PostLifecycleController::new(Arc::new(api), PostStore::with_posts(vec![draft()]));
    let err = controller.approve("p1").await.unwrap_err();

    assert_eq!(err.user_message(), "Facebook connection expired");
    assert!(err.is_recoverable());
    assert_eq!(controller.store().get("p1").unwrap().status, PostStatus::Draft);
    assert!(controller.can_approve("p1"), "guard must be released after a failure");
}

#[tokio::test]
async fn failure_without_server_message_uses_generic_text() {
    let mut api = MockContentApi::new();
    api.expect_approve_post()
        .returning(|_| Err(ApiError::Network("connection reset".to_string())));

    let controller = PostLifecycleController::new(Arc::new(api), PostStore::with_posts(vec![draft()]));
    let err = controller.approve("p1").await.unwrap_err();
    assert_eq!(
        err,
        SchedulerError::TransportFailure {
            operation: "approve post",
            message: agencyiq_core::error::GENERIC_FAILURE_MESSAGE.to_string(),
        }
    );
}

#[tokio::test]
async fn failed_refetch_falls_back_to_the_returned_post() {
    let mut api = MockContentApi::new();
    api.expect_approve_post()
        .returning(|_| Ok(with_status(draft(), PostStatus::Approved)));
    api.expect_fetch_posts()
        .returning(|| Err(ApiError::Timeout(std::time::Duration::from_secs(30))));

    let controller = PostLifecycleController::new(Arc::new(api), PostStore::with_posts(vec![draft()]));
    controller.approve("p1").await.unwrap();
    assert_eq!(controller.store().get("p1").unwrap().status, PostStatus::Approved);
}

#[tokio::test]
async fn approval_learned_from_background_refresh_disables_approve() {
    let mut api = MockContentApi::new();
    api.expect_fetch_posts()
        .returning(|| Ok(vec![with_status(draft(), PostStatus::Approved)]));
    api.expect_approve_post().never();

    let store = PostStore::with_posts(vec![draft()]);
    let api = Arc::new(api);
    store.refresh(api.as_ref()).await.unwrap();

    let controller = PostLifecycleController::new(api, store);
    assert!(!controller.can_approve("p1"));
    assert_eq!(controller.approve("p1").await, Ok(ApproveOutcome::AlreadyApproved));
}

#[tokio::test]
async fn published_and_unknown_posts_are_rejected_locally() {
    let published = post("pub", Platform::X, PostStatus::Published, "2025-06-01T10:00:00+10:00");
    let failed = post("fail", Platform::X, PostStatus::Failed, "2025-06-01T11:00:00+10:00");
    let api = MockContentApi::new();
    let controller = PostLifecycleController::new(
        Arc::new(api),
        PostStore::with_posts(vec![published, failed]),
    );

    assert!(matches!(
        controller.approve("pub").await,
        Err(SchedulerError::InvalidTransition { action: "approve", status: PostStatus::Published, .. })
    ));
    assert!(matches!(
        controller.approve("fail").await,
        Err(SchedulerError::InvalidTransition { status: PostStatus::Failed, .. })
    ));
    assert!(matches!(
        controller.edit_content("pub", "new text").await,
        Err(SchedulerError::InvalidTransition { action: "edit", .. })
    ));
    assert_eq!(
        controller.approve("missing").await,
        Err(SchedulerError::PostNotFound("missing".to_string()))
    );
}

#[tokio::test]
async fn edit_replaces_content_without_touching_status() {
    let scheduled = with_status(draft(), PostStatus::Scheduled);
    let mut edited = scheduled.clone();
    edited.content = "Fresh beans, fresh week".to_string();
    let returned = edited.clone();

    let mut api = MockContentApi::new();
    api.expect_edit_post_content()
        .withf(|id: &str, content: &str| id == "p1" && content == "Fresh beans, fresh week")
        .times(1)
        .returning(move |_, _| Ok(returned.clone()));
    api.expect_fetch_posts()
        .times(1)
        .returning(move || Ok(vec![edited.clone()]));

    let controller = PostLifecycleController::new(Arc::new(api), PostStore::with_posts(vec![scheduled]));
    controller
        .edit_content("p1", "Fresh beans, fresh week")
        .await
        .unwrap();

    let post = controller.store().get("p1").unwrap();
    assert_eq!(post.content, "Fresh beans, fresh week");
    assert_eq!(post.status, PostStatus::Scheduled);
}

#[tokio::test]
async fn blank_edit_never_reaches_the_network() {
    let mut api = MockContentApi::new();
    api.expect_edit_post_content().never();
    let controller = PostLifecycleController::new(Arc::new(api), PostStore::with_posts(vec![draft()]));

    assert!(matches!(
        controller.edit_content("p1", "   ").await,
        Err(SchedulerError::ValidationFailure(_))
    ));
}
