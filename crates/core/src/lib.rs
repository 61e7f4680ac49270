//! Core business logic for SocialHub.
//!
//! Services are plain structs over `socialhub-db` repositories. Mutations
//! return [`DomainEvent`]s which an [`EventPublisher`] turns into
//! notifications, either inline ([`NotificationDispatcher`]) or through the
//! background queue ([`JobSender`]).

pub mod services;

pub use services::*;
