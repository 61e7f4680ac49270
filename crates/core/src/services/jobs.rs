//! Job processing service for background tasks.
//!
//! A bounded in-memory queue drained by a fixed number of concurrent
//! workers. It runs event dispatch and mail delivery after the triggering
//! request has returned.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use socialhub_common::{AppError, AppResult, config::DeliveryConfig};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::services::event_publisher::{DomainEvent, EventPublisher};
use crate::services::mail::{Mailer, MailerService, OutboundMail};
use crate::services::notification::NotificationDispatcher;

/// Job types that can be processed.
#[derive(Debug, Clone)]
pub enum Job {
    /// Create the notification (and mail) for a domain event.
    DispatchEvent(DomainEvent),
    /// Deliver one outbound mail.
    SendMail(OutboundMail),
}

/// Job sender for enqueueing jobs.
///
/// Enqueueing never waits: a full queue is reported as `AppError::Queue`.
#[derive(Clone)]
pub struct JobSender {
    sender: mpsc::Sender<Job>,
}

impl JobSender {
    /// Enqueue a job for processing.
    pub fn enqueue(&self, job: Job) -> AppResult<()> {
        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => AppError::Queue("Job queue is full".to_string()),
            mpsc::error::TrySendError::Closed(_) => {
                AppError::Queue("Job queue is closed".to_string())
            }
        })
    }
}

#[async_trait]
impl EventPublisher for JobSender {
    async fn publish(&self, event: DomainEvent) -> AppResult<()> {
        self.enqueue(Job::DispatchEvent(event))
    }
}

/// Queues the message; delivery happens on a worker under the delivery timeout.
#[async_trait]
impl Mailer for JobSender {
    async fn send(&self, mail: OutboundMail) -> AppResult<()> {
        self.enqueue(Job::SendMail(mail))
    }
}

/// Job worker context containing services needed for job processing.
///
/// The dispatcher given here must deliver mail directly (or not at all);
/// wiring it to a [`JobSender`] would keep the queue open forever.
#[derive(Clone)]
pub struct JobWorkerContext {
    pub dispatcher: Option<NotificationDispatcher>,
    pub mailer: Option<MailerService>,
    pub delivery_timeout: Duration,
}

/// Job processing service.
pub struct JobService {
    sender: mpsc::Sender<Job>,
    receiver: mpsc::Receiver<Job>,
    workers: usize,
}

impl JobService {
    /// Create a new job service.
    #[must_use]
    pub fn new(config: &DeliveryConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_size.max(1));
        Self {
            sender,
            receiver,
            workers: config.workers.max(1),
        }
    }

    /// Get a job sender for enqueueing jobs.
    #[must_use]
    pub fn sender(&self) -> JobSender {
        JobSender {
            sender: self.sender.clone(),
        }
    }

    /// Start the job processor with the given context.
    ///
    /// The returned task finishes once every [`JobSender`] has been dropped
    /// and all queued jobs have completed.
    pub fn start(self, context: JobWorkerContext) -> JoinHandle<()> {
        let Self {
            sender,
            receiver,
            workers,
        } = self;
        drop(sender);

        let context = Arc::new(context);

        tokio::spawn(async move {
            info!(workers = workers, "Job worker starting");
            run_job_processor(receiver, context, workers).await;
            info!("Job worker stopped");
        })
    }
}

/// Run the job processor.
async fn run_job_processor(
    mut receiver: mpsc::Receiver<Job>,
    context: Arc<JobWorkerContext>,
    workers: usize,
) {
    let semaphore = Arc::new(Semaphore::new(workers));

    while let Some(job) = receiver.recv().await {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let ctx = context.clone();

        tokio::spawn(async move {
            let _permit = permit;
            process_job(job, &ctx).await;
        });
    }

    // Wait for in-flight jobs.
    let _ = semaphore.acquire_many(workers as u32).await;
}

/// Process a single job.
async fn process_job(job: Job, context: &JobWorkerContext) {
    match job {
        Job::DispatchEvent(event) => process_dispatch(context, event).await,
        Job::SendMail(mail) => process_send_mail(context, mail).await,
    }
}

async fn process_dispatch(context: &JobWorkerContext, event: DomainEvent) {
    let Some(ref dispatcher) = context.dispatcher else {
        debug!(event = event.kind(), "Dispatcher not available, dropping event");
        return;
    };

    match dispatcher.dispatch(&event).await {
        Ok(Some(notification)) => {
            debug!(
                event = event.kind(),
                notification_id = %notification.id,
                "Event dispatched"
            );
        }
        Ok(None) => {
            debug!(event = event.kind(), "Event produced no notification");
        }
        Err(e) => {
            error!(event = event.kind(), error = %e, "Failed to dispatch event");
        }
    }
}

async fn process_send_mail(context: &JobWorkerContext, mail: OutboundMail) {
    let Some(ref mailer) = context.mailer else {
        debug!(to = %mail.to, "Mailer not available, dropping mail");
        return;
    };

    let to = mail.to.clone();
    match tokio::time::timeout(context.delivery_timeout, mailer.send(mail)).await {
        Ok(Ok(())) => debug!(to = %to, "Mail delivered"),
        Ok(Err(e)) => warn!(to = %to, error = %e, "Failed to deliver mail"),
        Err(_) => warn!(
            to = %to,
            timeout_secs = context.delivery_timeout.as_secs(),
            "Mail delivery timed out"
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutboundMail>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, mail: OutboundMail) -> AppResult<()> {
            self.sent.lock().unwrap().push(mail);
            Ok(())
        }
    }

    struct SlowMailer;

    #[async_trait]
    impl Mailer for SlowMailer {
        async fn send(&self, _mail: OutboundMail) -> AppResult<()> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    fn mail(to: &str) -> OutboundMail {
        OutboundMail {
            to: to.to_string(),
            subject: "New Follower".to_string(),
            text_body: "bob started following you".to_string(),
            html_body: "<p>bob started following you</p>".to_string(),
        }
    }

    fn config(queue_size: usize) -> DeliveryConfig {
        DeliveryConfig {
            timeout_secs: 1,
            workers: 2,
            queue_size,
        }
    }

    #[tokio::test]
    async fn test_send_mail_jobs_are_delivered() {
        let recorder = Arc::new(RecordingMailer::default());
        let service = JobService::new(&config(10));
        let sender = service.sender();

        let handle = service.start(JobWorkerContext {
            dispatcher: None,
            mailer: Some(recorder.clone()),
            delivery_timeout: Duration::from_secs(1),
        });

        Mailer::send(&sender, mail("a@example.com")).await.unwrap();
        Mailer::send(&sender, mail("b@example.com")).await.unwrap();
        drop(sender);
        handle.await.unwrap();

        let mut sent: Vec<String> = recorder
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.to.clone())
            .collect();
        sent.sort();
        assert_eq!(sent, vec!["a@example.com", "b@example.com"]);
    }

    #[tokio::test]
    async fn test_full_queue_is_reported() {
        let service = JobService::new(&config(1));
        let sender = service.sender();

        sender.enqueue(Job::SendMail(mail("a@example.com"))).unwrap();
        let result = sender.enqueue(Job::SendMail(mail("b@example.com")));

        assert!(matches!(result, Err(AppError::Queue(_))));
    }

    #[tokio::test]
    async fn test_closed_queue_is_reported() {
        let service = JobService::new(&config(4));
        let sender = service.sender();
        drop(service);

        let event = DomainEvent::FollowCreated {
            follower_id: "a".to_string(),
            followee_id: "b".to_string(),
        };
        assert!(matches!(sender.publish(event).await, Err(AppError::Queue(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_mail_times_out() {
        let service = JobService::new(&config(4));
        let sender = service.sender();

        let handle = service.start(JobWorkerContext {
            dispatcher: None,
            mailer: Some(Arc::new(SlowMailer)),
            delivery_timeout: Duration::from_secs(1),
        });

        sender.enqueue(Job::SendMail(mail("a@example.com"))).unwrap();
        drop(sender);

        // Completes only because the worker gives up after the timeout.
        handle.await.unwrap();
    }
}
