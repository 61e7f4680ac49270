//! User settings entity (profile bio, privacy and notification preferences).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::visibility::Visibility;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_settings")]
pub struct Model {
    /// Same as user.id (1:1 relationship)
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,

    /// Send outbound mail for new notifications?
    #[sea_orm(default_value = true)]
    pub allow_notifications: bool,

    /// Who may see profile details and the profile's post list
    pub profile_visibility: Visibility,

    /// Free-form profile text, may be empty
    #[sea_orm(column_type = "Text")]
    pub bio: String,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
