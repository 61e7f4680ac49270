//! Visibility levels shared by posts and profiles.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Who may view (and therefore interact with) a resource.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Anyone, including anonymous viewers.
    #[sea_orm(string_value = "public")]
    #[default]
    Public,
    /// The owner and the owner's followers.
    #[sea_orm(string_value = "friend")]
    Friend,
    /// The owner only.
    #[sea_orm(string_value = "private")]
    Private,
}

impl Visibility {
    /// String form as stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Friend => "friend",
            Self::Private => "private",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
