//! Database repositories.

mod blocking;
mod comment;
mod following;
mod notification;
mod post;
mod post_like;
mod report;
mod user;
mod user_settings;

pub use blocking::BlockingRepository;
pub use comment::CommentRepository;
pub use following::FollowingRepository;
pub use notification::NotificationRepository;
pub use post::{PostRepository, VisiblePostsQuery};
pub use post_like::PostLikeRepository;
pub use report::ReportRepository;
pub use user::UserRepository;
pub use user_settings::UserSettingsRepository;
