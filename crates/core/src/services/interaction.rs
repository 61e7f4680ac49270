//! Interaction service: follow, like, comment, report and block.
//!
//! Each operation checks visibility before touching state, performs a single
//! atomic mutation, and publishes the resulting event afterwards.

use crate::services::event_publisher::{DomainEvent, EventPublisherService};
use crate::services::relationship::RelationshipStore;
use crate::services::visibility::VisibilityService;
use chrono::Utc;
use sea_orm::Set;
use serde::Serialize;
use socialhub_common::{AppError, AppResult, IdGenerator};
use socialhub_db::{
    entities::{comment, report},
    repositories::{
        CommentRepository, PostLikeRepository, PostRepository, ReportRepository, UserRepository,
    },
};
use tracing::{debug, info, warn};
use validator::Validate;

/// Maximum comment length in characters.
pub const MAX_COMMENT_LENGTH: usize = 10_000;

/// Maximum report reason length in characters.
pub const MAX_REPORT_REASON_LENGTH: usize = 2_000;

/// Validated comment body.
#[derive(Debug, Validate)]
struct CommentInput {
    #[validate(length(min = 1, max = 10000, message = "Comment must not be empty"))]
    content: String,
}

/// Validated report reason.
#[derive(Debug, Validate)]
struct ReportInput {
    #[validate(length(min = 1, max = 2000, message = "Report reason must not be empty"))]
    reason: String,
}

/// Result of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggle {
    /// Whether the actor likes the post after the toggle.
    pub liked: bool,
    /// Like count after the toggle.
    pub like_count: u64,
}

/// Interaction service for business logic.
#[derive(Clone)]
pub struct InteractionService {
    user_repo: UserRepository,
    post_repo: PostRepository,
    like_repo: PostLikeRepository,
    comment_repo: CommentRepository,
    report_repo: ReportRepository,
    relationships: RelationshipStore,
    visibility: VisibilityService,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl InteractionService {
    /// Create a new interaction service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        post_repo: PostRepository,
        like_repo: PostLikeRepository,
        comment_repo: CommentRepository,
        report_repo: ReportRepository,
        relationships: RelationshipStore,
        visibility: VisibilityService,
    ) -> Self {
        Self {
            user_repo,
            post_repo,
            like_repo,
            comment_repo,
            report_repo,
            relationships,
            visibility,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Follow a user.
    ///
    /// Returns `true` when a new relationship was created and `false` when
    /// the actor already followed the target.
    pub async fn request_follow(&self, actor_id: &str, target_id: &str) -> AppResult<bool> {
        if actor_id == target_id {
            return Err(AppError::InvalidOperation(
                "You cannot follow yourself".to_string(),
            ));
        }

        self.user_repo.get_active_by_id(target_id).await?;

        if self.visibility.enforces_blocks()
            && self.relationships.is_blocked(actor_id, target_id).await?
        {
            return Err(AppError::Forbidden(
                "You cannot follow this user".to_string(),
            ));
        }

        let event = self.relationships.follow(actor_id, target_id).await?;
        let created = event.is_some();
        if let Some(event) = event {
            self.publish(event).await;
        }

        Ok(created)
    }

    /// Unfollow a user. Unfollowing someone not followed is not an error.
    ///
    /// The target must exist but may be deactivated.
    pub async fn request_unfollow(&self, actor_id: &str, target_id: &str) -> AppResult<bool> {
        self.user_repo.get_by_id(target_id).await?;

        self.relationships.unfollow(actor_id, target_id).await
    }

    /// Like a post, or remove the like if already present.
    pub async fn toggle_like(&self, actor_id: &str, post_id: &str) -> AppResult<LikeToggle> {
        let post = self.post_repo.get_by_id(post_id).await?;
        self.visibility
            .ensure_can_view_post(Some(actor_id), &post)
            .await?;

        let liked = if self.like_repo.delete_by_pair(&post.id, actor_id).await? {
            debug!(post_id = %post.id, user_id = %actor_id, "Like removed");
            false
        } else {
            let created = self
                .like_repo
                .insert_if_absent(self.id_gen.generate(), &post.id, actor_id)
                .await?;

            if created {
                debug!(post_id = %post.id, user_id = %actor_id, "Like created");
                self.publish(DomainEvent::LikeCreated {
                    post_id: post.id.clone(),
                    post_author_id: post.author_id.clone(),
                    liker_id: actor_id.to_string(),
                })
                .await;
            }
            true
        };

        let like_count = self.like_repo.count_by_post(&post.id).await?;

        Ok(LikeToggle { liked, like_count })
    }

    /// Comment on a post.
    ///
    /// Content is trimmed and must be non-empty.
    pub async fn add_comment(
        &self,
        actor_id: &str,
        post_id: &str,
        content: &str,
    ) -> AppResult<comment::Model> {
        let post = self.post_repo.get_by_id(post_id).await?;
        self.visibility
            .ensure_can_view_post(Some(actor_id), &post)
            .await?;

        let input = CommentInput {
            content: content.trim().to_string(),
        };
        input.validate()?;

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post.id.clone()),
            user_id: Set(actor_id.to_string()),
            content: Set(input.content),
            created_at: Set(Utc::now().into()),
        };

        let created = self.comment_repo.create(model).await?;
        debug!(comment_id = %created.id, post_id = %post.id, "Comment created");

        self.publish(DomainEvent::CommentCreated {
            post_id: post.id,
            post_author_id: post.author_id,
            comment_id: created.id.clone(),
            commenter_id: actor_id.to_string(),
        })
        .await;

        Ok(created)
    }

    /// Comments on a post the viewer may see, oldest first.
    pub async fn list_comments(
        &self,
        viewer_id: Option<&str>,
        post_id: &str,
        limit: u64,
        since_id: Option<&str>,
    ) -> AppResult<Vec<comment::Model>> {
        let post = self.post_repo.get_by_id(post_id).await?;
        self.visibility.ensure_can_view_post(viewer_id, &post).await?;

        self.comment_repo
            .find_by_post(&post.id, limit.min(100), since_id)
            .await
    }

    /// Report a user to the moderators.
    pub async fn report_user(
        &self,
        actor_id: &str,
        target_id: &str,
        reason: &str,
    ) -> AppResult<report::Model> {
        if actor_id == target_id {
            return Err(AppError::InvalidOperation(
                "You cannot report yourself".to_string(),
            ));
        }

        let input = ReportInput {
            reason: reason.trim().to_string(),
        };
        input.validate()?;

        self.user_repo.get_active_by_id(target_id).await?;

        let model = report::ActiveModel {
            id: Set(self.id_gen.generate()),
            reporter_id: Set(actor_id.to_string()),
            reported_user_id: Set(target_id.to_string()),
            reason: Set(input.reason),
            created_at: Set(Utc::now().into()),
        };

        let created = self.report_repo.create(model).await?;
        info!(report_id = %created.id, reported_user_id = %target_id, "User reported");

        Ok(created)
    }

    /// Block a user. Blocking an already-blocked user is not an error.
    pub async fn block_user(&self, actor_id: &str, target_id: &str) -> AppResult<bool> {
        if actor_id == target_id {
            return Err(AppError::InvalidOperation(
                "You cannot block yourself".to_string(),
            ));
        }

        self.user_repo.get_active_by_id(target_id).await?;

        self.relationships.block(actor_id, target_id).await
    }

    /// Lift a block. Unblocking someone not blocked is not an error.
    ///
    /// The target must exist but may be deactivated.
    pub async fn unblock_user(&self, actor_id: &str, target_id: &str) -> AppResult<bool> {
        self.user_repo.get_by_id(target_id).await?;

        self.relationships.unblock(actor_id, target_id).await
    }

    /// Hand an event to the publisher. Failures are logged, never surfaced.
    async fn publish(&self, event: DomainEvent) {
        if let Some(ref publisher) = self.event_publisher {
            let kind = event.kind();
            if let Err(e) = publisher.publish(event).await {
                warn!(event = kind, error = %e, "Failed to publish event");
            }
        }
    }
}
