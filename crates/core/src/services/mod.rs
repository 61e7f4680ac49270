//! Business logic services.

#![allow(missing_docs)]

pub mod account;
pub mod event_publisher;
pub mod interaction;
pub mod jobs;
pub mod mail;
pub mod notification;
pub mod post;
pub mod relationship;
pub mod visibility;

pub use account::{
    AccountService, ProfileView, RegisterInput, UpdateProfileInput, UpdateSettingsInput,
};
pub use event_publisher::{DomainEvent, EventPublisher, EventPublisherService, NoOpEventPublisher};
pub use interaction::{InteractionService, LikeToggle};
pub use jobs::{Job, JobSender, JobService, JobWorkerContext};
pub use mail::{MailTemplates, Mailer, MailerService, NoOpMailer, OutboundMail, SmtpMailer};
pub use notification::NotificationDispatcher;
pub use post::{CreatePostInput, PostService, PostView};
pub use relationship::RelationshipStore;
pub use visibility::{Audience, VisibilityService, is_visible_to};
