//! Test utilities for database operations.
//!
//! Provides an in-memory SQLite database migrated with the real schema, plus
//! seeding helpers for users and posts.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, DbErr, Set};
use sea_orm_migration::MigratorTrait;
use socialhub_common::IdGenerator;
use tracing::info;

use crate::entities::{Visibility, post, user, user_settings};
use crate::migrations::Migrator;

/// A migrated, throwaway database.
pub struct TestDatabase {
    /// Database connection.
    pub conn: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl TestDatabase {
    /// Create a fresh in-memory database and run every migration.
    ///
    /// The pool is pinned to a single connection; each SQLite in-memory
    /// connection would otherwise see its own empty database.
    pub async fn new() -> Result<Self, DbErr> {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;
        Migrator::up(&conn, None).await?;

        info!("Created in-memory test database");

        Ok(Self {
            conn: Arc::new(conn),
            id_gen: IdGenerator::new(),
        })
    }

    /// Get the database connection.
    #[must_use]
    pub fn connection(&self) -> Arc<DatabaseConnection> {
        self.conn.clone()
    }

    /// Insert an active user with default settings.
    pub async fn create_user(&self, username: &str) -> Result<user::Model, DbErr> {
        let email = format!("{username}@example.com");
        self.create_user_with(username, Some(&email), Visibility::Public, true)
            .await
    }

    /// Insert a user with explicit email, profile visibility and notification preference.
    pub async fn create_user_with(
        &self,
        username: &str,
        email: Option<&str>,
        profile_visibility: Visibility,
        allow_notifications: bool,
    ) -> Result<user::Model, DbErr> {
        let user = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(username.to_string()),
            display_name: Set(None),
            email: Set(email.map(ToString::to_string)),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.conn.as_ref())
        .await?;

        user_settings::ActiveModel {
            user_id: Set(user.id.clone()),
            allow_notifications: Set(allow_notifications),
            profile_visibility: Set(profile_visibility),
            bio: Set(String::new()),
            updated_at: Set(None),
        }
        .insert(self.conn.as_ref())
        .await?;

        Ok(user)
    }

    /// Insert a post.
    pub async fn create_post(
        &self,
        author_id: &str,
        text: &str,
        visibility: Visibility,
    ) -> Result<post::Model, DbErr> {
        post::ActiveModel {
            id: Set(self.id_gen.generate()),
            author_id: Set(author_id.to_string()),
            text: Set(text.to_string()),
            visibility: Set(visibility),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.conn.as_ref())
        .await
    }
}
