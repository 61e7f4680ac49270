//! Post repository.

use std::sync::Arc;

use crate::entities::{Post, Visibility, blocking, following, post};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
    sea_query::{Query, SelectStatement},
};
use socialhub_common::{AppError, AppResult};

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

/// Filters applied to visible-post listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisiblePostsQuery<'a> {
    /// Viewing user, `None` for anonymous.
    pub viewer_id: Option<&'a str>,
    /// Restrict to a single author.
    pub author_id: Option<&'a str>,
    /// Page size.
    pub limit: u64,
    /// Return only posts older than this ID.
    pub until_id: Option<&'a str>,
    /// Drop posts whose author and viewer are separated by a block.
    pub exclude_blocked: bool,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Create a new post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Newest-first page of posts the viewer may see, in one query.
    ///
    /// A post is visible when it is public, authored by the viewer, or
    /// friend-only and authored by someone the viewer follows.
    pub async fn find_visible(&self, query: VisiblePostsQuery<'_>) -> AppResult<Vec<post::Model>> {
        let mut condition = Condition::all().add(Self::visibility_condition(query.viewer_id));

        if let Some(author_id) = query.author_id {
            condition = condition.add(post::Column::AuthorId.eq(author_id));
        }

        if query.exclude_blocked
            && let Some(viewer_id) = query.viewer_id
        {
            condition = condition
                .add(post::Column::AuthorId.not_in_subquery(Self::blocked_by(viewer_id)))
                .add(post::Column::AuthorId.not_in_subquery(Self::blockers_of(viewer_id)));
        }

        let mut select = Post::find()
            .filter(condition)
            .order_by_desc(post::Column::Id);

        if let Some(id) = query.until_id {
            select = select.filter(post::Column::Id.lt(id));
        }

        select
            .limit(query.limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn visibility_condition(viewer_id: Option<&str>) -> Condition {
        let public = post::Column::Visibility.eq(Visibility::Public.as_str());

        match viewer_id {
            None => Condition::all().add(public),
            Some(viewer_id) => Condition::any()
                .add(public)
                .add(post::Column::AuthorId.eq(viewer_id))
                .add(
                    Condition::all()
                        .add(post::Column::Visibility.eq(Visibility::Friend.as_str()))
                        .add(post::Column::AuthorId.in_subquery(Self::followees_of(viewer_id))),
                ),
        }
    }

    fn followees_of(viewer_id: &str) -> SelectStatement {
        Query::select()
            .column(following::Column::FolloweeId)
            .from(following::Entity)
            .and_where(following::Column::FollowerId.eq(viewer_id))
            .to_owned()
    }

    fn blocked_by(viewer_id: &str) -> SelectStatement {
        Query::select()
            .column(blocking::Column::BlockeeId)
            .from(blocking::Entity)
            .and_where(blocking::Column::BlockerId.eq(viewer_id))
            .to_owned()
    }

    fn blockers_of(viewer_id: &str) -> SelectStatement {
        Query::select()
            .column(blocking::Column::BlockerId)
            .from(blocking::Entity)
            .and_where(blocking::Column::BlockeeId.eq(viewer_id))
            .to_owned()
    }
}
