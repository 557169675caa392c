//! The visible post collection shared by every controller.
//!
//! Writers never compute new state from a local copy: they either replace the
//! whole collection with a server refetch or merge what the server returned.
//! Locks are held only for the duration of a copy, never across an await.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::contract::{ApiError, ContentApi};
use crate::post::Post;

#[derive(Debug, Clone, Default)]
pub struct PostStore {
    posts: Arc<RwLock<Vec<Post>>>,
}

impl PostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_posts(posts: Vec<Post>) -> Self {
        Self {
            posts: Arc::new(RwLock::new(posts)),
        }
    }

    /// Copy of the current collection, in arrival order.
    pub fn snapshot(&self) -> Vec<Post> {
        self.posts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, post_id: &str) -> Option<Post> {
        self.posts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.id == post_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.posts.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace everything with a canonical server copy.
    pub fn replace_all(&self, fresh: Vec<Post>) {
        let mut posts = self.posts.write().unwrap_or_else(PoisonError::into_inner);
        for incoming in &fresh {
            if let Some(known) = posts.iter().find(|p| p.id == incoming.id) {
                if !known.status.allows_transition_to(incoming.status) {
                    warn!(
                        post_id = %incoming.id,
                        from = %known.status,
                        to = %incoming.status,
                        "Server reported a backwards status transition"
                    );
                }
            }
        }
        debug!(count = fresh.len(), "Replacing post collection");
        *posts = fresh;
    }

    /// Append new posts; a post whose id is already known replaces that entry
    /// in place so every id appears once.
    pub fn merge(&self, incoming: Vec<Post>) {
        let mut posts = self.posts.write().unwrap_or_else(PoisonError::into_inner);
        for post in incoming {
            match posts.iter_mut().find(|p| p.id == post.id) {
                Some(existing) => *existing = post,
                None => posts.push(post),
            }
        }
    }

    /// Merge a single server-returned post.
    pub fn upsert(&self, post: Post) {
        self.merge(vec![post]);
    }

    /// Canonical refetch of the whole collection.
    pub async fn refresh<A>(&self, api: &A) -> Result<usize, ApiError>
    where
        A: ContentApi + ?Sized,
    {
        let fresh = api.fetch_posts().await?;
        let count = fresh.len();
        self.replace_all(fresh);
        info!(count, "Post collection refreshed");
        Ok(count)
    }

    /// Refetch after a mutation; if the refetch fails, fall back to the
    /// post the mutation returned so the new state is still observed.
    pub(crate) async fn refresh_after_mutation<A>(&self, api: &A, returned: Option<Post>)
    where
        A: ContentApi + ?Sized,
    {
        if let Err(e) = self.refresh(api).await {
            warn!(error = ?e, "Refetch after mutation failed; keeping server response");
            if let Some(post) = returned {
                self.upsert(post);
            }
        }
    }
}
