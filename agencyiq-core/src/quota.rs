use tracing::{debug, warn};

use crate::error::{SchedulerError, SchedulerResult};

/// Posts requested per generation when nothing else caps it.
pub const DEFAULT_GENERATION_CEILING: u32 = 30;

/// How many posts a generation request may ask for:
/// `min(ceiling, max(remaining, 0))`.
///
/// An exhausted quota is an error rather than a zero-sized request, so the
/// caller can surface it before calling the generator.
pub fn allocate_generation_size(remaining_posts: i64, requested_ceiling: u32) -> SchedulerResult<u32> {
    if remaining_posts <= 0 {
        warn!(remaining_posts, "Generation refused: quota exhausted");
        return Err(SchedulerError::QuotaExhausted {
            remaining: remaining_posts,
        });
    }

    let resolved = u32::try_from(remaining_posts)
        .unwrap_or(u32::MAX)
        .min(requested_ceiling);
    debug!(remaining_posts, requested_ceiling, resolved, "Resolved generation size");
    Ok(resolved)
}
