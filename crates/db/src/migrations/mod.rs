//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250601_000001_create_user_table;
mod m20250601_000002_create_user_settings_table;
mod m20250601_000003_create_following_table;
mod m20250601_000004_create_blocking_table;
mod m20250601_000005_create_post_table;
mod m20250601_000006_create_post_like_table;
mod m20250601_000007_create_comment_table;
mod m20250601_000008_create_notification_table;
mod m20250601_000009_create_report_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_user_table::Migration),
            Box::new(m20250601_000002_create_user_settings_table::Migration),
            Box::new(m20250601_000003_create_following_table::Migration),
            Box::new(m20250601_000004_create_blocking_table::Migration),
            Box::new(m20250601_000005_create_post_table::Migration),
            Box::new(m20250601_000006_create_post_like_table::Migration),
            Box::new(m20250601_000007_create_comment_table::Migration),
            Box::new(m20250601_000008_create_notification_table::Migration),
            Box::new(m20250601_000009_create_report_table::Migration),
        ]
    }
}
