//! Visibility evaluation.
//!
//! One policy decides who may view a profile, view a post, and like or
//! comment on a post:
//!
//! | visibility | owner | follower | anyone else |
//! |------------|-------|----------|-------------|
//! | public     | yes   | yes      | yes         |
//! | friend     | yes   | yes      | no          |
//! | private    | yes   | no       | no          |
//!
//! Anonymous viewers always fall in the last column. Blocks are ignored
//! unless `visibility.enforce_blocks` is enabled, in which case a block in
//! either direction denies every non-owner view.

use crate::services::relationship::RelationshipStore;
use socialhub_common::{AppError, AppResult, config::VisibilityConfig};
use socialhub_db::entities::{Visibility, post, user_settings};

/// How the viewer relates to the owner of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// The viewer owns the resource.
    Owner,
    /// The viewer follows the owner.
    Follower,
    /// Anyone else, including anonymous viewers.
    Other,
}

/// The policy table.
#[must_use]
pub const fn is_visible_to(visibility: Visibility, audience: Audience) -> bool {
    match (visibility, audience) {
        (_, Audience::Owner) | (Visibility::Public, _) => true,
        (Visibility::Friend, Audience::Follower) => true,
        (Visibility::Friend | Visibility::Private, _) => false,
    }
}

/// Visibility evaluator backed by the relationship store.
#[derive(Clone)]
pub struct VisibilityService {
    relationships: RelationshipStore,
    enforce_blocks: bool,
}

impl VisibilityService {
    /// Create an evaluator that ignores blocks.
    #[must_use]
    pub const fn new(relationships: RelationshipStore) -> Self {
        Self {
            relationships,
            enforce_blocks: false,
        }
    }

    /// Create an evaluator with the configured block policy.
    #[must_use]
    pub const fn from_config(relationships: RelationshipStore, config: &VisibilityConfig) -> Self {
        Self::new(relationships).with_block_enforcement(config.enforce_blocks)
    }

    /// Deny non-owner views across a block in either direction.
    #[must_use]
    pub const fn with_block_enforcement(mut self, enforce_blocks: bool) -> Self {
        self.enforce_blocks = enforce_blocks;
        self
    }

    /// Whether block enforcement is enabled.
    #[must_use]
    pub const fn enforces_blocks(&self) -> bool {
        self.enforce_blocks
    }

    /// May `viewer_id` see a resource owned by `owner_id` with the given visibility?
    ///
    /// The relationship store is only consulted when the answer depends on it.
    pub async fn can_view(
        &self,
        viewer_id: Option<&str>,
        owner_id: &str,
        visibility: Visibility,
    ) -> AppResult<bool> {
        let Some(viewer_id) = viewer_id else {
            return Ok(is_visible_to(visibility, Audience::Other));
        };

        if viewer_id == owner_id {
            return Ok(true);
        }

        if self.enforce_blocks && self.relationships.is_blocked(viewer_id, owner_id).await? {
            return Ok(false);
        }

        let audience = match visibility {
            Visibility::Friend => {
                if self.relationships.is_following(viewer_id, owner_id).await? {
                    Audience::Follower
                } else {
                    Audience::Other
                }
            }
            Visibility::Public | Visibility::Private => Audience::Other,
        };

        Ok(is_visible_to(visibility, audience))
    }

    /// May the viewer see (and therefore like or comment on) this post?
    pub async fn can_view_post(
        &self,
        viewer_id: Option<&str>,
        post: &post::Model,
    ) -> AppResult<bool> {
        self.can_view(viewer_id, &post.author_id, post.visibility)
            .await
    }

    /// May the viewer see the profile details governed by these settings?
    pub async fn can_view_profile(
        &self,
        viewer_id: Option<&str>,
        settings: &user_settings::Model,
    ) -> AppResult<bool> {
        self.can_view(viewer_id, &settings.user_id, settings.profile_visibility)
            .await
    }

    /// Fail with `Forbidden` unless the viewer may see the post.
    pub async fn ensure_can_view_post(
        &self,
        viewer_id: Option<&str>,
        post: &post::Model,
    ) -> AppResult<()> {
        if self.can_view_post(viewer_id, post).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Post {} is not visible to this user",
                post.id
            )))
        }
    }
}
