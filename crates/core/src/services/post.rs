//! Post service.

use chrono::Utc;
use futures::{Stream, TryStreamExt, stream};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use socialhub_common::{AppError, AppResult, IdGenerator};
use socialhub_db::{
    entities::{Visibility, post},
    repositories::{PostLikeRepository, PostRepository, VisiblePostsQuery},
};
use tracing::debug;
use validator::Validate;

use crate::services::visibility::VisibilityService;

/// Maximum post length in characters.
pub const MAX_POST_LENGTH: usize = 10_000;

/// Largest page any listing returns.
const MAX_PAGE_SIZE: u64 = 100;

/// Input for creating a new post.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    #[validate(length(min = 1, max = 10000, message = "Post text must not be empty"))]
    pub text: String,

    #[serde(default)]
    pub visibility: Visibility,
}

/// A post detail page as seen by a particular viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub post: post::Model,
    pub like_count: u64,
    /// Always `false` for anonymous viewers.
    pub liked_by_user: bool,
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    like_repo: PostLikeRepository,
    visibility: VisibilityService,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        like_repo: PostLikeRepository,
        visibility: VisibilityService,
    ) -> Self {
        Self {
            post_repo,
            like_repo,
            visibility,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a new post.
    pub async fn create_post(
        &self,
        author_id: &str,
        input: CreatePostInput,
    ) -> AppResult<post::Model> {
        let input = CreatePostInput {
            text: input.text.trim().to_string(),
            ..input
        };
        input.validate()?;

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            author_id: Set(author_id.to_string()),
            text: Set(input.text),
            visibility: Set(input.visibility),
            created_at: Set(Utc::now().into()),
        };

        let created = self.post_repo.create(model).await?;
        debug!(post_id = %created.id, author_id = %author_id, visibility = %created.visibility, "Post created");

        Ok(created)
    }

    /// Get a post the viewer is allowed to see.
    pub async fn get_post(&self, viewer_id: Option<&str>, post_id: &str) -> AppResult<post::Model> {
        let post = self.post_repo.get_by_id(post_id).await?;
        self.visibility.ensure_can_view_post(viewer_id, &post).await?;
        Ok(post)
    }

    /// Get a post together with its like count and the viewer's like state.
    pub async fn view_post(&self, viewer_id: Option<&str>, post_id: &str) -> AppResult<PostView> {
        let post = self.get_post(viewer_id, post_id).await?;

        let like_count = self.like_repo.count_by_post(&post.id).await?;
        let liked_by_user = match viewer_id {
            Some(viewer_id) => self.like_repo.is_liked(&post.id, viewer_id).await?,
            None => false,
        };

        Ok(PostView {
            post,
            like_count,
            liked_by_user,
        })
    }

    /// Newest-first page of every post visible to the viewer.
    pub async fn list_visible_posts(
        &self,
        viewer_id: Option<&str>,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        self.post_repo
            .find_visible(VisiblePostsQuery {
                viewer_id,
                author_id: None,
                limit: limit.clamp(1, MAX_PAGE_SIZE),
                until_id,
                exclude_blocked: self.visibility.enforces_blocks(),
            })
            .await
    }

    /// One author's posts visible to the viewer, newest first.
    pub async fn list_posts_by(
        &self,
        viewer_id: Option<&str>,
        author_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        self.post_repo
            .find_visible(VisiblePostsQuery {
                viewer_id,
                author_id: Some(author_id),
                limit: limit.clamp(1, MAX_PAGE_SIZE),
                until_id,
                exclude_blocked: self.visibility.enforces_blocks(),
            })
            .await
    }

    /// Stream every post visible to the viewer, newest first.
    ///
    /// Pages are fetched lazily with `page_size` rows each. The stream ends
    /// after the first short page and stops at the first error. Calling this
    /// again starts over from the newest post.
    pub fn stream_visible_posts(
        &self,
        viewer_id: Option<String>,
        page_size: u64,
    ) -> impl Stream<Item = AppResult<post::Model>> + Send + 'static {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let service = self.clone();

        stream::try_unfold(Some(None), move |cursor| {
            let service = service.clone();
            let viewer_id = viewer_id.clone();
            async move { service.next_page(viewer_id, page_size, cursor).await }
        })
        .map_ok(|page| stream::iter(page.into_iter().map(Ok::<_, AppError>)))
        .try_flatten()
    }

    /// Fetch the page after `cursor`.
    ///
    /// `None` means the previous page was the last one, `Some(None)` means
    /// start from the newest post.
    async fn next_page(
        &self,
        viewer_id: Option<String>,
        page_size: u64,
        cursor: Option<Option<String>>,
    ) -> AppResult<Option<(Vec<post::Model>, Option<Option<String>>)>> {
        let Some(until_id) = cursor else {
            return Ok(None);
        };

        let page = self
            .list_visible_posts(viewer_id.as_deref(), page_size, until_id.as_deref())
            .await?;

        if page.is_empty() {
            return Ok(None);
        }

        let next = if (page.len() as u64) < page_size {
            None
        } else {
            page.last().map(|p| Some(p.id.clone()))
        };

        Ok(Some((page, next)))
    }
}
