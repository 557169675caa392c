use tracing::{error, info, warn};

use crate::contract::{AutoPostSummary, ContentApi};
use crate::error::{SchedulerError, SchedulerResult};
use crate::store::PostStore;

/// Publish every approved post in one server-side batch, then refetch.
///
/// Per-post outcomes are never guessed locally: the refetched collection is
/// the only source for which posts ended up published or failed. A failed
/// batch is reported and left for the user to re-run.
pub async fn auto_post_schedule<A>(api: &A, store: &PostStore) -> SchedulerResult<AutoPostSummary>
where
    A: ContentApi + ?Sized,
{
    info!("[PUBLISH] Starting auto-post of approved schedule");

    let summary = match api.auto_post_schedule().await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = ?e, "[PUBLISH][ERROR] Auto-post failed");
            return Err(SchedulerError::transport("auto-post schedule", &e));
        }
    };
    info!(
        success_count = summary.success_count,
        total_posts = summary.total_posts,
        "[PUBLISH] Auto-post batch finished"
    );

    if let Err(e) = store.refresh(api).await {
        warn!(error = ?e, "[PUBLISH] Refetch after auto-post failed; collection may be stale");
    }

    Ok(summary)
}
