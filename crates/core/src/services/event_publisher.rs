//! Event publisher service.
//!
//! Mutating services describe what happened as a [`DomainEvent`] and hand it
//! to an [`EventPublisher`] once the state change is stored. The notification
//! dispatcher consumes these events, either inline or through the job queue.

use async_trait::async_trait;
use serde::Serialize;
use socialhub_common::AppResult;
use std::sync::Arc;

/// Facts emitted on successful state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    /// A follow edge went from absent to present.
    FollowCreated {
        follower_id: String,
        followee_id: String,
    },
    /// A like was added to a post.
    LikeCreated {
        post_id: String,
        post_author_id: String,
        liker_id: String,
    },
    /// A comment was added to a post.
    CommentCreated {
        post_id: String,
        post_author_id: String,
        comment_id: String,
        commenter_id: String,
    },
}

impl DomainEvent {
    /// Short name used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::FollowCreated { .. } => "follow_created",
            Self::LikeCreated { .. } => "like_created",
            Self::CommentCreated { .. } => "comment_created",
        }
    }

    /// The user whose action produced the event.
    #[must_use]
    pub fn actor_id(&self) -> &str {
        match self {
            Self::FollowCreated { follower_id, .. } => follower_id,
            Self::LikeCreated { liker_id, .. } => liker_id,
            Self::CommentCreated { commenter_id, .. } => commenter_id,
        }
    }
}

/// Trait for publishing domain events.
///
/// This allows the core services to emit events without depending on how
/// (or when) they are consumed.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    async fn publish(&self, event: DomainEvent) -> AppResult<()>;
}

/// A no-op implementation of EventPublisher for testing or when side effects are disabled.
#[derive(Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish(&self, _event: DomainEvent) -> AppResult<()> {
        Ok(())
    }
}

/// Wrapper for boxed EventPublisher trait object.
pub type EventPublisherService = Arc<dyn EventPublisher>;
