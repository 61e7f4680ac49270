//! Relationship store: the directed follow graph and the block set.

use crate::services::event_publisher::DomainEvent;
use socialhub_common::{AppResult, IdGenerator};
use socialhub_db::repositories::{BlockingRepository, FollowingRepository};
use tracing::debug;

/// Follow and block relationships between users.
///
/// Every mutation is idempotent. Redundant calls and self-targeted calls are
/// no-ops rather than errors; callers that need to reject self-targeting do
/// so before reaching the store.
#[derive(Clone)]
pub struct RelationshipStore {
    following_repo: FollowingRepository,
    blocking_repo: BlockingRepository,
    id_gen: IdGenerator,
}

impl RelationshipStore {
    /// Create a new relationship store.
    #[must_use]
    pub const fn new(following_repo: FollowingRepository, blocking_repo: BlockingRepository) -> Self {
        Self {
            following_repo,
            blocking_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Does `follower_id` follow `followee_id`?
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        if follower_id == followee_id {
            return Ok(false);
        }
        self.following_repo
            .is_following(follower_id, followee_id)
            .await
    }

    /// Has either user blocked the other?
    pub async fn is_blocked(&self, user_a: &str, user_b: &str) -> AppResult<bool> {
        if user_a == user_b {
            return Ok(false);
        }
        self.blocking_repo.is_blocked_either(user_a, user_b).await
    }

    /// Create a follow edge.
    ///
    /// Returns `FollowCreated` only when this call created the edge.
    pub async fn follow(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> AppResult<Option<DomainEvent>> {
        if follower_id == followee_id {
            return Ok(None);
        }

        let created = self
            .following_repo
            .insert_if_absent(self.id_gen.generate(), follower_id, followee_id)
            .await?;

        if !created {
            debug!(follower_id = %follower_id, followee_id = %followee_id, "Already following");
            return Ok(None);
        }

        debug!(follower_id = %follower_id, followee_id = %followee_id, "Follow created");
        Ok(Some(DomainEvent::FollowCreated {
            follower_id: follower_id.to_string(),
            followee_id: followee_id.to_string(),
        }))
    }

    /// Remove a follow edge. Returns whether an edge existed.
    pub async fn unfollow(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        let removed = self
            .following_repo
            .delete_by_pair(follower_id, followee_id)
            .await?;

        if removed {
            debug!(follower_id = %follower_id, followee_id = %followee_id, "Follow removed");
        }
        Ok(removed)
    }

    /// Block a user. Returns whether a new block was recorded.
    pub async fn block(&self, blocker_id: &str, blockee_id: &str) -> AppResult<bool> {
        if blocker_id == blockee_id {
            return Ok(false);
        }

        let created = self
            .blocking_repo
            .insert_if_absent(self.id_gen.generate(), blocker_id, blockee_id)
            .await?;

        if created {
            debug!(blocker_id = %blocker_id, blockee_id = %blockee_id, "Block created");
        }
        Ok(created)
    }

    /// Lift a block. Returns whether a block existed.
    pub async fn unblock(&self, blocker_id: &str, blockee_id: &str) -> AppResult<bool> {
        self.blocking_repo
            .delete_by_pair(blocker_id, blockee_id)
            .await
    }

    /// IDs of every user `user_id` follows.
    pub async fn followee_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        self.following_repo.find_followee_ids(user_id).await
    }

    /// Number of users following `user_id`.
    pub async fn count_followers(&self, user_id: &str) -> AppResult<u64> {
        self.following_repo.count_followers(user_id).await
    }

    /// Number of users `user_id` follows.
    pub async fn count_following(&self, user_id: &str) -> AppResult<u64> {
        self.following_repo.count_following(user_id).await
    }
}
