//! Blocking repository.

use std::sync::Arc;

use crate::entities::{Blocking, blocking};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
    sea_query::OnConflict,
};
use socialhub_common::{AppError, AppResult};

/// Blocking repository for database operations.
#[derive(Clone)]
pub struct BlockingRepository {
    db: Arc<DatabaseConnection>,
}

impl BlockingRepository {
    /// Create a new blocking repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Check if either user has blocked the other.
    pub async fn is_blocked_either(&self, user_a: &str, user_b: &str) -> AppResult<bool> {
        let found = Blocking::find()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(blocking::Column::BlockerId.eq(user_a))
                            .add(blocking::Column::BlockeeId.eq(user_b)),
                    )
                    .add(
                        Condition::all()
                            .add(blocking::Column::BlockerId.eq(user_b))
                            .add(blocking::Column::BlockeeId.eq(user_a)),
                    ),
            )
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(found.is_some())
    }

    /// Insert the block unless it already exists. Returns whether a row was created.
    pub async fn insert_if_absent(
        &self,
        id: String,
        blocker_id: &str,
        blockee_id: &str,
    ) -> AppResult<bool> {
        let model = blocking::ActiveModel {
            id: Set(id),
            blocker_id: Set(blocker_id.to_string()),
            blockee_id: Set(blockee_id.to_string()),
            created_at: Set(Utc::now().into()),
        };

        let inserted = Blocking::insert(model)
            .on_conflict(
                OnConflict::columns([blocking::Column::BlockerId, blocking::Column::BlockeeId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inserted > 0)
    }

    /// Delete a blocking relationship by pair. Returns whether a row was removed.
    pub async fn delete_by_pair(&self, blocker_id: &str, blockee_id: &str) -> AppResult<bool> {
        let result = Blocking::delete_many()
            .filter(blocking::Column::BlockerId.eq(blocker_id))
            .filter(blocking::Column::BlockeeId.eq(blockee_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }
}
