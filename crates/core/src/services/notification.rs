//! Notification dispatcher.
//!
//! Turns domain events into in-app notifications and, when the recipient
//! allows it, outbound mail. A notification is only ever mutated from unread
//! to read, and only by its recipient.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::Set;
use socialhub_common::{AppError, AppResult, IdGenerator};
use socialhub_db::{
    entities::{notification, notification::NotificationType, user},
    repositories::{NotificationRepository, UserRepository, UserSettingsRepository},
};
use tracing::{debug, warn};

use crate::services::event_publisher::{DomainEvent, EventPublisher};
use crate::services::mail::{MailTemplates, MailerService};

/// Default upper bound for a single mail attempt.
const DEFAULT_MAIL_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound mail settings for the dispatcher.
#[derive(Clone)]
struct MailDelivery {
    mailer: MailerService,
    templates: MailTemplates,
}

/// Notification dispatcher.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notification_repo: NotificationRepository,
    user_repo: UserRepository,
    settings_repo: UserSettingsRepository,
    mail: Option<MailDelivery>,
    mail_timeout: Duration,
    id_gen: IdGenerator,
}

impl NotificationDispatcher {
    /// Create a dispatcher that only records in-app notifications.
    #[must_use]
    pub const fn new(
        notification_repo: NotificationRepository,
        user_repo: UserRepository,
        settings_repo: UserSettingsRepository,
    ) -> Self {
        Self {
            notification_repo,
            user_repo,
            settings_repo,
            mail: None,
            mail_timeout: DEFAULT_MAIL_TIMEOUT,
            id_gen: IdGenerator::new(),
        }
    }

    /// Enable outbound mail for new notifications.
    ///
    /// `dispatch` awaits `mailer.send` for up to the mail timeout. When the
    /// dispatcher publishes inline from request handlers, pass a
    /// [`JobSender`](crate::services::jobs::JobSender) here so the send only
    /// enqueues and the SMTP round trip runs on a job worker.
    pub fn set_mailer(&mut self, mailer: MailerService, templates: MailTemplates) {
        self.mail = Some(MailDelivery { mailer, templates });
    }

    /// Bound a single mail attempt.
    pub const fn set_mail_timeout(&mut self, timeout: Duration) {
        self.mail_timeout = timeout;
    }

    /// Handle one event.
    ///
    /// Returns the notification created, or `None` when the event produces
    /// none (self-likes and self-comments).
    pub async fn dispatch(&self, event: &DomainEvent) -> AppResult<Option<notification::Model>> {
        let (recipient_id, notification_type, post_id) = match event {
            DomainEvent::FollowCreated { followee_id, .. } => {
                (followee_id, NotificationType::Follow, None)
            }
            DomainEvent::LikeCreated {
                post_id,
                post_author_id,
                ..
            } => (post_author_id, NotificationType::Like, Some(post_id)),
            DomainEvent::CommentCreated {
                post_id,
                post_author_id,
                ..
            } => (post_author_id, NotificationType::Comment, Some(post_id)),
        };

        let actor_id = event.actor_id();
        if actor_id == recipient_id {
            debug!(event = event.kind(), user_id = %actor_id, "Skipping self-notification");
            return Ok(None);
        }

        let actor = self.user_repo.get_by_id(actor_id).await?;
        let message = Self::message(notification_type, &actor);

        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            recipient_id: Set(recipient_id.clone()),
            actor_id: Set(Some(actor.id.clone())),
            notification_type: Set(notification_type),
            post_id: Set(post_id.cloned()),
            message: Set(message),
            is_read: Set(false),
            created_at: Set(Utc::now().into()),
        };

        let created = self.notification_repo.create(model).await?;
        debug!(
            notification_id = %created.id,
            recipient_id = %created.recipient_id,
            event = event.kind(),
            "Notification created"
        );

        self.send_mail(&created).await;

        Ok(Some(created))
    }

    /// In-app message text for a notification.
    #[must_use]
    pub fn message(notification_type: NotificationType, actor: &user::Model) -> String {
        match notification_type {
            NotificationType::Follow => format!("{} started following you", actor.username),
            NotificationType::Like => format!("{} liked your post", actor.username),
            NotificationType::Comment => format!("{} commented on your post", actor.username),
        }
    }

    /// Mail the recipient about a stored notification.
    ///
    /// Never fails: missing address, disabled preference, delivery errors and
    /// timeouts are logged.
    async fn send_mail(&self, created: &notification::Model) {
        let Some(ref mail) = self.mail else {
            return;
        };

        let recipient = match self.user_repo.find_by_id(&created.recipient_id).await {
            Ok(Some(recipient)) => recipient,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, recipient_id = %created.recipient_id, "Failed to load mail recipient");
                return;
            }
        };

        let Some(to) = recipient.email.as_deref().filter(|e| !e.is_empty()) else {
            debug!(recipient_id = %recipient.id, "Recipient has no email, skipping mail");
            return;
        };

        match self.settings_repo.get_or_default(&recipient.id).await {
            Ok(settings) if !settings.allow_notifications => {
                debug!(recipient_id = %recipient.id, "Mail notifications disabled by recipient");
                return;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, recipient_id = %recipient.id, "Failed to load notification preference");
                return;
            }
        }

        let outbound = mail.templates.render(
            created.notification_type,
            to,
            &created.message,
            created.post_id.as_deref(),
        );

        match tokio::time::timeout(self.mail_timeout, mail.mailer.send(outbound)).await {
            Ok(Ok(())) => {
                debug!(notification_id = %created.id, "Notification mail handed off");
            }
            Ok(Err(e)) => {
                warn!(error = %e, notification_id = %created.id, "Failed to send notification mail");
            }
            Err(_) => {
                warn!(
                    notification_id = %created.id,
                    timeout_ms = self.mail_timeout.as_millis() as u64,
                    "Notification mail timed out"
                );
            }
        }
    }

    /// List notifications for a recipient (newest first).
    pub async fn list(
        &self,
        recipient_id: &str,
        limit: u64,
        until_id: Option<&str>,
        unread_only: bool,
    ) -> AppResult<Vec<notification::Model>> {
        self.notification_repo
            .find_by_recipient(recipient_id, limit.min(100), until_id, unread_only)
            .await
    }

    /// Count unread notifications.
    pub async fn count_unread(&self, recipient_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(recipient_id).await
    }

    /// Mark one notification read.
    ///
    /// Only the recipient may do this. Marking an already-read notification
    /// succeeds without change.
    pub async fn mark_read(&self, requester_id: &str, notification_id: &str) -> AppResult<()> {
        let notification = self
            .notification_repo
            .find_by_id(notification_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification {notification_id}")))?;

        if notification.recipient_id != requester_id {
            return Err(AppError::PermissionDenied(
                "Only the recipient can mark a notification as read".to_string(),
            ));
        }

        if !notification.is_read {
            self.notification_repo.mark_as_read(notification_id).await?;
        }
        Ok(())
    }

    /// Mark every notification of a recipient read. Returns how many changed.
    pub async fn mark_all_read(&self, recipient_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(recipient_id).await
    }
}

/// Inline dispatch: the event is handled before `publish` returns.
///
/// This includes the mail send, so wire the mailer through a
/// [`JobSender`](crate::services::jobs::JobSender) when used this way.
#[async_trait]
impl EventPublisher for NotificationDispatcher {
    async fn publish(&self, event: DomainEvent) -> AppResult<()> {
        self.dispatch(&event).await.map(|_| ())
    }
}
