//! Account service: registration, profile and privacy settings, profile pages.

use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use socialhub_common::{AppError, AppResult, IdGenerator};
use socialhub_db::{
    entities::{Visibility, post, user, user_settings},
    repositories::{PostRepository, UserRepository, UserSettingsRepository, VisiblePostsQuery},
};
use tracing::{debug, info};
use validator::Validate;

use crate::services::relationship::RelationshipStore;
use crate::services::visibility::VisibilityService;

/// Posts shown on a profile page.
const PROFILE_POST_LIMIT: u64 = 20;

/// Maximum bio length in characters.
pub const MAX_BIO_LENGTH: usize = 500;

/// Input for registering a new user.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 128))]
    pub username: String,

    #[validate(length(max = 256))]
    pub display_name: Option<String>,

    #[validate(email)]
    pub email: Option<String>,
}

/// Input for updating privacy and notification settings.
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsInput {
    pub allow_notifications: Option<bool>,
    pub profile_visibility: Option<Visibility>,
}

/// Input for editing the profile text. An empty bio clears it.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    #[validate(length(max = 500, message = "Bio is too long"))]
    #[serde(default)]
    pub bio: String,
}

/// A profile as seen by a particular viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub user: user::Model,
    pub is_own_profile: bool,
    pub is_following: bool,
    /// Whether the profile's visibility lets the viewer see details and posts.
    pub can_view_details: bool,
    /// `None` unless `can_view_details`.
    pub bio: Option<String>,
    /// Empty unless `can_view_details`.
    pub posts: Vec<post::Model>,
    pub followers_count: u64,
    pub following_count: u64,
}

/// Account service for business logic.
#[derive(Clone)]
pub struct AccountService {
    user_repo: UserRepository,
    settings_repo: UserSettingsRepository,
    post_repo: PostRepository,
    relationships: RelationshipStore,
    visibility: VisibilityService,
    id_gen: IdGenerator,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        settings_repo: UserSettingsRepository,
        post_repo: PostRepository,
        relationships: RelationshipStore,
        visibility: VisibilityService,
    ) -> Self {
        Self {
            user_repo,
            settings_repo,
            post_repo,
            relationships,
            visibility,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new user with default settings.
    pub async fn register(&self, input: RegisterInput) -> AppResult<user::Model> {
        input.validate()?;

        if !input
            .username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(AppError::Validation(
                "Username may only contain letters, digits and underscores".to_string(),
            ));
        }

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Validation("Username already taken".to_string()));
        }

        let user_model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username),
            display_name: Set(input.display_name.filter(|n| !n.trim().is_empty())),
            email: Set(input.email.filter(|e| !e.is_empty())),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        };

        let user = self.user_repo.create(user_model).await?;

        let defaults = UserSettingsRepository::defaults(&user.id);
        self.settings_repo
            .create(user_settings::ActiveModel {
                user_id: Set(defaults.user_id),
                allow_notifications: Set(defaults.allow_notifications),
                profile_visibility: Set(defaults.profile_visibility),
                bio: Set(defaults.bio),
                updated_at: Set(None),
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(user)
    }

    /// Get a user's settings.
    pub async fn get_settings(&self, user_id: &str) -> AppResult<user_settings::Model> {
        self.user_repo.get_by_id(user_id).await?;
        self.settings_repo.get_or_default(user_id).await
    }

    /// Update a user's settings.
    pub async fn update_settings(
        &self,
        user_id: &str,
        input: UpdateSettingsInput,
    ) -> AppResult<user_settings::Model> {
        let mut settings = self.get_settings(user_id).await?;

        if let Some(allow_notifications) = input.allow_notifications {
            settings.allow_notifications = allow_notifications;
        }
        if let Some(profile_visibility) = input.profile_visibility {
            settings.profile_visibility = profile_visibility;
        }
        settings.updated_at = Some(Utc::now().into());

        let updated = self.settings_repo.upsert(settings).await?;
        debug!(
            user_id = %user_id,
            allow_notifications = updated.allow_notifications,
            profile_visibility = %updated.profile_visibility,
            "Settings updated"
        );

        Ok(updated)
    }

    /// Replace a user's bio.
    pub async fn update_profile(
        &self,
        user_id: &str,
        input: UpdateProfileInput,
    ) -> AppResult<user_settings::Model> {
        let input = UpdateProfileInput {
            bio: input.bio.trim().to_string(),
        };
        input.validate()?;

        let mut settings = self.get_settings(user_id).await?;
        settings.bio = input.bio;
        settings.updated_at = Some(Utc::now().into());

        let updated = self.settings_repo.upsert(settings).await?;
        debug!(user_id = %user_id, bio_len = updated.bio.chars().count(), "Profile updated");

        Ok(updated)
    }

    /// Build the profile page for `username` as seen by the viewer.
    pub async fn view_profile(
        &self,
        viewer_id: Option<&str>,
        username: &str,
    ) -> AppResult<ProfileView> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))?;

        let is_own_profile = viewer_id == Some(user.id.as_str());

        let is_following = match viewer_id {
            Some(viewer_id) => self.relationships.is_following(viewer_id, &user.id).await?,
            None => false,
        };

        let settings = self.settings_repo.get_or_default(&user.id).await?;
        let can_view_details = self.visibility.can_view_profile(viewer_id, &settings).await?;

        let (bio, posts) = if can_view_details {
            let posts = self
                .post_repo
                .find_visible(VisiblePostsQuery {
                    viewer_id,
                    author_id: Some(&user.id),
                    limit: PROFILE_POST_LIMIT,
                    until_id: None,
                    exclude_blocked: self.visibility.enforces_blocks(),
                })
                .await?;
            (Some(settings.bio), posts)
        } else {
            (None, Vec::new())
        };

        let followers_count = self.relationships.count_followers(&user.id).await?;
        let following_count = self.relationships.count_following(&user.id).await?;

        Ok(ProfileView {
            user,
            is_own_profile,
            is_following,
            can_view_details,
            bio,
            posts,
            followers_count,
            following_count,
        })
    }
}
