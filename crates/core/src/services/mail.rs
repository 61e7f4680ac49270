//! Outbound mail.
//!
//! [`Mailer`] is the outbound messaging seam. [`SmtpMailer`] delivers over
//! SMTP with `lettre`; [`NoOpMailer`] only logs. [`MailTemplates`] renders
//! the notification messages.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
};
use serde::Serialize;
use socialhub_common::{
    AppError, AppResult,
    config::{InstanceConfig, MailConfig},
};
use socialhub_db::entities::notification::NotificationType;
use std::sync::Arc;
use thiserror::Error;

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMail {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub text_body: String,
    /// HTML body.
    pub html_body: String,
}

/// Outbound messaging collaborator.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message.
    async fn send(&self, mail: OutboundMail) -> AppResult<()>;
}

/// Wrapper for boxed Mailer trait object.
pub type MailerService = Arc<dyn Mailer>;

/// Mailer that drops every message after logging it.
#[derive(Clone, Default)]
pub struct NoOpMailer;

#[async_trait]
impl Mailer for NoOpMailer {
    async fn send(&self, mail: OutboundMail) -> AppResult<()> {
        tracing::debug!(to = %mail.to, subject = %mail.subject, "Mail disabled, dropping message");
        Ok(())
    }
}

#[derive(Debug, Error)]
enum MailError {
    #[error("invalid address {0}: {1}")]
    Address(String, lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        match err {
            MailError::Address(..) | MailError::Build(_) => Self::Validation(err.to_string()),
            MailError::Transport(_) => Self::ExternalService(err.to_string()),
        }
    }
}

/// SMTP mailer built on `lettre`'s async transport.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a mailer from configuration. No connection is opened until the first send.
    pub fn new(config: &MailConfig) -> AppResult<Self> {
        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host).map_err(MailError::from)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let mut builder = builder.port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let address = config
            .from_address
            .parse()
            .map_err(|e| MailError::Address(config.from_address.clone(), e))?;

        Ok(Self {
            transport: builder.build(),
            from: Mailbox::new(Some(config.from_name.clone()), address),
        })
    }

    fn build_message(&self, mail: OutboundMail) -> Result<Message, MailError> {
        let to = mail
            .to
            .parse()
            .map_err(|e| MailError::Address(mail.to.clone(), e))?;

        Ok(Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(None, to))
            .subject(mail.subject)
            .multipart(MultiPart::alternative_plain_html(
                mail.text_body,
                mail.html_body,
            ))?)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutboundMail) -> AppResult<()> {
        let to = mail.to.clone();
        let message = self.build_message(mail)?;

        self.transport
            .send(message)
            .await
            .map_err(MailError::from)?;

        tracing::debug!(to = %to, "Mail sent via SMTP");
        Ok(())
    }
}

/// Notification message templates.
#[derive(Debug, Clone)]
pub struct MailTemplates {
    instance_name: String,
    instance_url: String,
}

impl MailTemplates {
    /// Create templates for an instance.
    #[must_use]
    pub fn new(instance: &InstanceConfig) -> Self {
        Self {
            instance_name: instance.name.clone(),
            instance_url: instance.url.trim_end_matches('/').to_string(),
        }
    }

    /// Subject line for a notification type.
    #[must_use]
    pub const fn subject(notification_type: NotificationType) -> &'static str {
        match notification_type {
            NotificationType::Follow => "New Follower",
            NotificationType::Like => "New Like on Your Post",
            NotificationType::Comment => "New Comment on Your Post",
        }
    }

    /// Render the mail for a notification already shown in-app as `message`.
    #[must_use]
    pub fn render(
        &self,
        notification_type: NotificationType,
        to: &str,
        message: &str,
        post_id: Option<&str>,
    ) -> OutboundMail {
        let link = match post_id {
            Some(post_id) => format!("{}/posts/{post_id}", self.instance_url),
            None => format!("{}/notifications", self.instance_url),
        };

        let text_body = format!(
            "{message}.\n\nView it on {}: {link}\n\nYou can turn off these emails in your account settings.",
            self.instance_name
        );
        let html_body = self.wrap_html(&format!(
            "<p>{}.</p><p><a href=\"{}\">View it on {}</a></p>",
            escape_html(message),
            escape_html(&link),
            escape_html(&self.instance_name)
        ));

        OutboundMail {
            to: to.to_string(),
            subject: Self::subject(notification_type).to_string(),
            text_body,
            html_body,
        }
    }

    fn wrap_html(&self, content: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
</head>
<body style="font-family: sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    {content}
    <hr style="margin-top: 40px; border: none; border-top: 1px solid #e9ecef;">
    <p style="font-size: 12px; color: #6c757d;">
        This email was sent from <a href="{url}">{name}</a>.<br>
        You can manage your email preferences in your account settings.
    </p>
</body>
</html>"#,
            url = escape_html(&self.instance_url),
            name = escape_html(&self.instance_name),
        )
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
