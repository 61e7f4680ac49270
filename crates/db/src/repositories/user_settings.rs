//! User settings repository.

use std::sync::Arc;

use crate::entities::{UserSettings, Visibility, user_settings};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, sea_query::OnConflict,
};
use socialhub_common::{AppError, AppResult};

/// User settings repository for database operations.
#[derive(Clone)]
pub struct UserSettingsRepository {
    db: Arc<DatabaseConnection>,
}

impl UserSettingsRepository {
    /// Create a new user settings repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find settings by user ID.
    pub async fn find_by_user_id(&self, user_id: &str) -> AppResult<Option<user_settings::Model>> {
        UserSettings::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get settings for a user, falling back to the defaults when no row exists.
    pub async fn get_or_default(&self, user_id: &str) -> AppResult<user_settings::Model> {
        Ok(self
            .find_by_user_id(user_id)
            .await?
            .unwrap_or_else(|| Self::defaults(user_id)))
    }

    /// Default settings for a user (notifications on, public profile, empty bio).
    #[must_use]
    pub fn defaults(user_id: &str) -> user_settings::Model {
        user_settings::Model {
            user_id: user_id.to_string(),
            allow_notifications: true,
            profile_visibility: Visibility::Public,
            bio: String::new(),
            updated_at: None,
        }
    }

    /// Create settings for a user.
    pub async fn create(
        &self,
        model: user_settings::ActiveModel,
    ) -> AppResult<user_settings::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert or overwrite the settings row for `model.user_id`.
    pub async fn upsert(&self, model: user_settings::Model) -> AppResult<user_settings::Model> {
        UserSettings::insert(model.clone().into_active_model())
            .on_conflict(
                OnConflict::column(user_settings::Column::UserId)
                    .update_columns([
                        user_settings::Column::AllowNotifications,
                        user_settings::Column::ProfileVisibility,
                        user_settings::Column::Bio,
                        user_settings::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(model)
    }
}
