//! End-to-end scenarios against a migrated in-memory database.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use socialhub_common::{
    AppError, AppResult,
    config::{DeliveryConfig, InstanceConfig},
};
use socialhub_core::{
    AccountService, CreatePostInput, DomainEvent, EventPublisher, InteractionService, JobService,
    JobWorkerContext, MailTemplates, Mailer, NotificationDispatcher, OutboundMail, PostService,
    RelationshipStore, UpdateProfileInput, UpdateSettingsInput, VisibilityService,
};
use socialhub_db::{
    entities::{Visibility, notification::NotificationType, post, user},
    repositories::{
        BlockingRepository, CommentRepository, FollowingRepository, NotificationRepository,
        PostLikeRepository, PostRepository, ReportRepository, UserRepository,
        UserSettingsRepository,
    },
    test_utils::TestDatabase,
};

/// Never finishes a send within a test's lifetime.
struct StalledMailer;

#[async_trait]
impl Mailer for StalledMailer {
    async fn send(&self, _mail: OutboundMail) -> AppResult<()> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

#[derive(Default)]
struct RecordingMailer {
    fail: bool,
    sent: Mutex<Vec<OutboundMail>>,
}

impl RecordingMailer {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<OutboundMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutboundMail) -> AppResult<()> {
        self.sent.lock().unwrap().push(mail);
        if self.fail {
            return Err(AppError::ExternalService("SMTP connection refused".to_string()));
        }
        Ok(())
    }
}

/// Records every event, then dispatches it inline.
struct RecordingPublisher {
    dispatcher: NotificationDispatcher,
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingPublisher {
    fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: DomainEvent) -> AppResult<()> {
        self.events.lock().unwrap().push(event.clone());
        self.dispatcher.publish(event).await
    }
}

struct Harness {
    db: TestDatabase,
    relationships: RelationshipStore,
    visibility: VisibilityService,
    dispatcher: NotificationDispatcher,
    interactions: InteractionService,
    posts: PostService,
    accounts: AccountService,
    mailer: Arc<RecordingMailer>,
    publisher: Arc<RecordingPublisher>,
}

fn instance() -> InstanceConfig {
    InstanceConfig {
        name: "SocialHub".to_string(),
        url: "https://social.example".to_string(),
    }
}

async fn harness() -> Harness {
    harness_with(false, RecordingMailer::default()).await
}

async fn harness_with(enforce_blocks: bool, mailer: RecordingMailer) -> Harness {
    let db = TestDatabase::new().await.unwrap();
    let conn = db.connection();
    let mailer = Arc::new(mailer);

    let relationships = RelationshipStore::new(
        FollowingRepository::new(conn.clone()),
        BlockingRepository::new(conn.clone()),
    );
    let visibility =
        VisibilityService::new(relationships.clone()).with_block_enforcement(enforce_blocks);

    let mut dispatcher = NotificationDispatcher::new(
        NotificationRepository::new(conn.clone()),
        UserRepository::new(conn.clone()),
        UserSettingsRepository::new(conn.clone()),
    );
    dispatcher.set_mailer(mailer.clone(), MailTemplates::new(&instance()));

    let publisher = Arc::new(RecordingPublisher {
        dispatcher: dispatcher.clone(),
        events: Mutex::default(),
    });

    let mut interactions = InteractionService::new(
        UserRepository::new(conn.clone()),
        PostRepository::new(conn.clone()),
        PostLikeRepository::new(conn.clone()),
        CommentRepository::new(conn.clone()),
        ReportRepository::new(conn.clone()),
        relationships.clone(),
        visibility.clone(),
    );
    interactions.set_event_publisher(publisher.clone());

    let posts = PostService::new(
        PostRepository::new(conn.clone()),
        PostLikeRepository::new(conn.clone()),
        visibility.clone(),
    );

    let accounts = AccountService::new(
        UserRepository::new(conn.clone()),
        UserSettingsRepository::new(conn.clone()),
        PostRepository::new(conn),
        relationships.clone(),
        visibility.clone(),
    );

    Harness {
        db,
        relationships,
        visibility,
        dispatcher,
        interactions,
        posts,
        accounts,
        mailer,
        publisher,
    }
}

impl Harness {
    async fn user(&self, username: &str) -> user::Model {
        self.db.create_user(username).await.unwrap()
    }

    async fn post(&self, author: &user::Model, visibility: Visibility) -> post::Model {
        self.db
            .create_post(&author.id, "hello", visibility)
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_private_profile_then_follow_then_friend() {
    let h = harness().await;
    let alice = h
        .db
        .create_user_with("alice", Some("alice@example.com"), Visibility::Private, true)
        .await
        .unwrap();
    let bob = h.user("bob").await;
    h.post(&alice, Visibility::Public).await;

    let profile = h.accounts.view_profile(Some(&bob.id), "alice").await.unwrap();
    assert!(!profile.can_view_details);
    assert!(profile.posts.is_empty());
    assert!(!profile.is_following);

    assert!(h.interactions.request_follow(&bob.id, &alice.id).await.unwrap());
    assert!(h.relationships.is_following(&bob.id, &alice.id).await.unwrap());

    let notifications = h.dispatcher.list(&alice.id, 10, None, false).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].message, "bob started following you");
    assert_eq!(notifications[0].notification_type, NotificationType::Follow);
    assert_eq!(notifications[0].actor_id.as_deref(), Some(bob.id.as_str()));

    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "alice@example.com");
    assert_eq!(sent[0].subject, "New Follower");

    // Following alone does not open a private profile.
    let profile = h.accounts.view_profile(Some(&bob.id), "alice").await.unwrap();
    assert!(profile.is_following);
    assert!(!profile.can_view_details);

    h.accounts
        .update_settings(
            &alice.id,
            UpdateSettingsInput {
                profile_visibility: Some(Visibility::Friend),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let profile = h.accounts.view_profile(Some(&bob.id), "alice").await.unwrap();
    assert!(profile.can_view_details);
    assert_eq!(profile.posts.len(), 1);
    assert_eq!(profile.followers_count, 1);

    let anonymous = h.accounts.view_profile(None, "alice").await.unwrap();
    assert!(!anonymous.can_view_details);
}

#[tokio::test]
async fn test_comment_on_friend_post_by_non_follower_is_forbidden() {
    let h = harness().await;
    let carol = h.user("carol").await;
    let dave = h.user("dave").await;
    let post = h.post(&carol, Visibility::Friend).await;

    let result = h.interactions.add_comment(&dave.id, &post.id, "hi").await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    let comments = h
        .interactions
        .list_comments(Some(&carol.id), &post.id, 10, None)
        .await
        .unwrap();
    assert!(comments.is_empty());
    assert!(h.publisher.events().is_empty());
    assert_eq!(h.dispatcher.count_unread(&carol.id).await.unwrap(), 0);

    let like = h.interactions.toggle_like(&dave.id, &post.id).await;
    assert!(matches!(like, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn test_follower_comment_is_trimmed_and_notifies() {
    let h = harness().await;
    let carol = h.user("carol").await;
    let dave = h.user("dave").await;
    let post = h.post(&carol, Visibility::Friend).await;
    h.interactions.request_follow(&dave.id, &carol.id).await.unwrap();

    let comment = h
        .interactions
        .add_comment(&dave.id, &post.id, "  nice post \n")
        .await
        .unwrap();
    assert_eq!(comment.content, "nice post");

    let blank = h.interactions.add_comment(&dave.id, &post.id, "   ").await;
    assert!(matches!(blank, Err(AppError::Validation(_))));

    let notifications = h.dispatcher.list(&carol.id, 10, None, false).await.unwrap();
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0].message, "dave commented on your post");
    assert_eq!(notifications[0].post_id.as_deref(), Some(post.id.as_str()));

    let subjects: Vec<String> = h.mailer.sent().into_iter().map(|m| m.subject).collect();
    assert_eq!(subjects, vec!["New Follower", "New Comment on Your Post"]);
}

#[tokio::test]
async fn test_self_like_creates_no_notification() {
    let h = harness().await;
    let erin = h.user("erin").await;
    let post = h.post(&erin, Visibility::Private).await;

    let toggle = h.interactions.toggle_like(&erin.id, &post.id).await.unwrap();
    assert!(toggle.liked);
    assert_eq!(toggle.like_count, 1);

    h.interactions
        .add_comment(&erin.id, &post.id, "note to self")
        .await
        .unwrap();

    assert_eq!(h.dispatcher.count_unread(&erin.id).await.unwrap(), 0);
    assert!(h.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_toggle_like_twice_restores_count() {
    let h = harness().await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;
    let post = h.post(&alice, Visibility::Public).await;

    let first = h.interactions.toggle_like(&bob.id, &post.id).await.unwrap();
    let second = h.interactions.toggle_like(&bob.id, &post.id).await.unwrap();

    assert!(first.liked);
    assert_eq!(first.like_count, 1);
    assert!(!second.liked);
    assert_eq!(second.like_count, 0);

    let likes: Vec<DomainEvent> = h
        .publisher
        .events()
        .into_iter()
        .filter(|e| matches!(e, DomainEvent::LikeCreated { .. }))
        .collect();
    assert_eq!(likes.len(), 1);

    let notifications = h.dispatcher.list(&alice.id, 10, None, false).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].message, "bob liked your post");
}

#[tokio::test]
async fn test_follow_twice_is_one_edge_and_one_event() {
    let h = harness().await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;

    assert!(h.interactions.request_follow(&bob.id, &alice.id).await.unwrap());
    assert!(!h.interactions.request_follow(&bob.id, &alice.id).await.unwrap());

    assert_eq!(h.relationships.count_followers(&alice.id).await.unwrap(), 1);
    assert_eq!(h.publisher.events().len(), 1);
    assert_eq!(h.dispatcher.count_unread(&alice.id).await.unwrap(), 1);

    assert!(h.interactions.request_unfollow(&bob.id, &alice.id).await.unwrap());
    assert!(!h.interactions.request_unfollow(&bob.id, &alice.id).await.unwrap());
    assert_eq!(h.relationships.count_followers(&alice.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_follow_missing_or_self() {
    let h = harness().await;
    let alice = h.user("alice").await;

    let missing = h.interactions.request_follow(&alice.id, "nobody").await;
    assert!(missing.unwrap_err().is_not_found());

    let own = h.interactions.request_follow(&alice.id, &alice.id).await;
    assert!(matches!(own, Err(AppError::InvalidOperation(_))));
}

#[tokio::test]
async fn test_unfollow_and_unblock_unknown_user() {
    let h = harness().await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;

    let unfollow = h.interactions.request_unfollow(&alice.id, "no-such-user").await;
    assert!(matches!(unfollow, Err(AppError::UserNotFound(_))));

    let unblock = h.interactions.unblock_user(&alice.id, "no-such-user").await;
    assert!(matches!(unblock, Err(AppError::UserNotFound(_))));

    // Existing user without an edge stays a no-op.
    assert!(!h.interactions.request_unfollow(&alice.id, &bob.id).await.unwrap());
    assert!(!h.interactions.unblock_user(&alice.id, &bob.id).await.unwrap());
}

#[tokio::test]
async fn test_mail_failure_keeps_notification() {
    let h = harness_with(false, RecordingMailer::failing()).await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;

    assert!(h.interactions.request_follow(&bob.id, &alice.id).await.unwrap());

    assert_eq!(h.mailer.sent().len(), 1);
    assert_eq!(h.dispatcher.count_unread(&alice.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_no_mail_without_address_or_consent() {
    let h = harness().await;
    let no_email = h
        .db
        .create_user_with("noemail", None, Visibility::Public, true)
        .await
        .unwrap();
    let opted_out = h
        .db
        .create_user_with("optout", Some("optout@example.com"), Visibility::Public, false)
        .await
        .unwrap();
    let bob = h.user("bob").await;

    h.interactions.request_follow(&bob.id, &no_email.id).await.unwrap();
    h.interactions.request_follow(&bob.id, &opted_out.id).await.unwrap();

    assert!(h.mailer.sent().is_empty());
    assert_eq!(h.dispatcher.count_unread(&no_email.id).await.unwrap(), 1);
    assert_eq!(h.dispatcher.count_unread(&opted_out.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_mark_read_only_by_recipient() {
    let h = harness().await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;
    let carol = h.user("carol").await;

    h.interactions.request_follow(&bob.id, &alice.id).await.unwrap();
    h.interactions.request_follow(&carol.id, &alice.id).await.unwrap();
    let notifications = h.dispatcher.list(&alice.id, 10, None, true).await.unwrap();
    let newest = &notifications[0];

    let denied = h.dispatcher.mark_read(&bob.id, &newest.id).await;
    assert!(matches!(denied, Err(AppError::PermissionDenied(_))));
    assert_eq!(h.dispatcher.count_unread(&alice.id).await.unwrap(), 2);

    h.dispatcher.mark_read(&alice.id, &newest.id).await.unwrap();
    h.dispatcher.mark_read(&alice.id, &newest.id).await.unwrap();
    assert_eq!(h.dispatcher.count_unread(&alice.id).await.unwrap(), 1);

    let unread = h.dispatcher.list(&alice.id, 10, None, true).await.unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].message, "bob started following you");

    assert_eq!(h.dispatcher.mark_all_read(&alice.id).await.unwrap(), 1);
    assert_eq!(h.dispatcher.count_unread(&alice.id).await.unwrap(), 0);

    let missing = h.dispatcher.mark_read(&alice.id, "missing").await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_blocks_ignored_unless_enforced() {
    let h = harness().await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;
    let post = h.post(&alice, Visibility::Public).await;

    assert!(h.interactions.block_user(&alice.id, &bob.id).await.unwrap());
    assert!(!h.interactions.block_user(&alice.id, &bob.id).await.unwrap());

    assert!(!h.visibility.enforces_blocks());
    assert!(h.posts.get_post(Some(&bob.id), &post.id).await.is_ok());
    let feed = h.posts.list_visible_posts(Some(&bob.id), 10, None).await.unwrap();
    assert_eq!(feed.len(), 1);
}

#[tokio::test]
async fn test_blocks_enforced_when_configured() {
    let h = harness_with(true, RecordingMailer::default()).await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;
    let carol = h.user("carol").await;
    let post = h.post(&alice, Visibility::Public).await;
    h.post(&carol, Visibility::Public).await;

    h.interactions.block_user(&alice.id, &bob.id).await.unwrap();

    let get = h.posts.get_post(Some(&bob.id), &post.id).await;
    assert!(matches!(get, Err(AppError::Forbidden(_))));

    let feed = h.posts.list_visible_posts(Some(&bob.id), 10, None).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].author_id, carol.id);

    let follow = h.interactions.request_follow(&bob.id, &alice.id).await;
    assert!(matches!(follow, Err(AppError::Forbidden(_))));

    // The owner is never affected by blocks.
    assert!(h.posts.get_post(Some(&alice.id), &post.id).await.is_ok());

    assert!(h.interactions.unblock_user(&alice.id, &bob.id).await.unwrap());
    assert!(h.posts.get_post(Some(&bob.id), &post.id).await.is_ok());
}

#[tokio::test]
async fn test_visible_feed_and_stream_agree() {
    let h = harness().await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;
    let carol = h.user("carol").await;

    h.interactions.request_follow(&bob.id, &alice.id).await.unwrap();
    for visibility in [Visibility::Public, Visibility::Friend, Visibility::Private] {
        h.post(&alice, visibility).await;
        h.post(&carol, visibility).await;
    }
    h.post(&bob, Visibility::Private).await;

    let feed = h.posts.list_visible_posts(Some(&bob.id), 100, None).await.unwrap();
    // alice: public + friend, carol: public, bob: own private.
    assert_eq!(feed.len(), 4);

    let streamed: Vec<post::Model> = h
        .posts
        .stream_visible_posts(Some(bob.id.clone()), 3)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(streamed, feed);

    let anonymous: Vec<post::Model> = h
        .posts
        .stream_visible_posts(None, 1)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(anonymous.len(), 2);
    assert!(anonymous.iter().all(|p| p.visibility == Visibility::Public));
}

#[tokio::test]
async fn test_create_post_and_list_by_author() {
    let h = harness().await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;

    let created = h
        .posts
        .create_post(
            &alice.id,
            CreatePostInput {
                text: "  first  ".to_string(),
                visibility: Visibility::Friend,
            },
        )
        .await
        .unwrap();
    assert_eq!(created.text, "first");

    let hidden = h.posts.list_posts_by(Some(&bob.id), &alice.id, 10, None).await.unwrap();
    assert!(hidden.is_empty());

    h.interactions.request_follow(&bob.id, &alice.id).await.unwrap();
    let shown = h.posts.list_posts_by(Some(&bob.id), &alice.id, 10, None).await.unwrap();
    assert_eq!(shown.len(), 1);

    // Unfollowing takes effect on the next read.
    h.interactions.request_unfollow(&bob.id, &alice.id).await.unwrap();
    let hidden = h.posts.list_posts_by(Some(&bob.id), &alice.id, 10, None).await.unwrap();
    assert!(hidden.is_empty());
}

#[tokio::test]
async fn test_register_and_settings() {
    let h = harness().await;

    let user = h
        .accounts
        .register(socialhub_core::RegisterInput {
            username: "newbie".to_string(),
            display_name: Some("New Person".to_string()),
            email: Some("newbie@example.com".to_string()),
        })
        .await
        .unwrap();

    let settings = h.accounts.get_settings(&user.id).await.unwrap();
    assert!(settings.allow_notifications);
    assert_eq!(settings.profile_visibility, Visibility::Public);

    let updated = h
        .accounts
        .update_settings(
            &user.id,
            UpdateSettingsInput {
                allow_notifications: Some(false),
                profile_visibility: None,
            },
        )
        .await
        .unwrap();
    assert!(!updated.allow_notifications);
    assert_eq!(updated.profile_visibility, Visibility::Public);

    let stored = h.accounts.get_settings(&user.id).await.unwrap();
    assert!(!stored.allow_notifications);

    let duplicate = h
        .accounts
        .register(socialhub_core::RegisterInput {
            username: "newbie".to_string(),
            display_name: None,
            email: None,
        })
        .await;
    assert!(matches!(duplicate, Err(AppError::Validation(_))));

    let missing = h.accounts.get_settings("nobody").await;
    assert!(matches!(missing, Err(AppError::UserNotFound(_))));
}

#[tokio::test]
async fn test_bio_follows_profile_visibility() {
    let h = harness().await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;

    let saved = h
        .accounts
        .update_profile(
            &alice.id,
            UpdateProfileInput {
                bio: "  Birdwatcher  ".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(saved.bio, "Birdwatcher");

    let public = h.accounts.view_profile(Some(&bob.id), "alice").await.unwrap();
    assert_eq!(public.bio.as_deref(), Some("Birdwatcher"));

    h.accounts
        .update_settings(
            &alice.id,
            UpdateSettingsInput {
                allow_notifications: None,
                profile_visibility: Some(Visibility::Private),
            },
        )
        .await
        .unwrap();

    let hidden = h.accounts.view_profile(Some(&bob.id), "alice").await.unwrap();
    assert!(!hidden.can_view_details);
    assert!(hidden.bio.is_none());

    let own = h.accounts.view_profile(Some(&alice.id), "alice").await.unwrap();
    assert_eq!(own.bio.as_deref(), Some("Birdwatcher"));

    // Changing visibility keeps the bio.
    let settings = h.accounts.get_settings(&alice.id).await.unwrap();
    assert_eq!(settings.bio, "Birdwatcher");
}

#[tokio::test]
async fn test_post_view_reports_like_state() {
    let h = harness().await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;
    let carol = h.user("carol").await;
    let post = h.post(&alice, Visibility::Public).await;

    h.interactions.toggle_like(&bob.id, &post.id).await.unwrap();

    let for_bob = h.posts.view_post(Some(&bob.id), &post.id).await.unwrap();
    assert_eq!(for_bob.like_count, 1);
    assert!(for_bob.liked_by_user);

    let for_carol = h.posts.view_post(Some(&carol.id), &post.id).await.unwrap();
    assert_eq!(for_carol.like_count, 1);
    assert!(!for_carol.liked_by_user);

    let anonymous = h.posts.view_post(None, &post.id).await.unwrap();
    assert!(!anonymous.liked_by_user);

    let private = h.post(&alice, Visibility::Private).await;
    let hidden = h.posts.view_post(Some(&bob.id), &private.id).await;
    assert!(matches!(hidden, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn test_report_user() {
    let h = harness().await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;

    let report = h
        .interactions
        .report_user(&alice.id, &bob.id, "  spam  ")
        .await
        .unwrap();
    assert_eq!(report.reason, "spam");
    assert_eq!(report.reported_user_id, bob.id);

    let missing = h.interactions.report_user(&alice.id, "nobody", "spam").await;
    assert!(missing.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_events_through_job_queue() {
    let db = TestDatabase::new().await.unwrap();
    let conn = db.connection();
    let alice = db.create_user("alice").await.unwrap();
    let bob = db.create_user("bob").await.unwrap();
    let mailer = Arc::new(RecordingMailer::default());

    let mut dispatcher = NotificationDispatcher::new(
        NotificationRepository::new(conn.clone()),
        UserRepository::new(conn.clone()),
        UserSettingsRepository::new(conn.clone()),
    );
    dispatcher.set_mailer(mailer.clone(), MailTemplates::new(&instance()));

    let jobs = JobService::new(&DeliveryConfig {
        timeout_secs: 5,
        workers: 2,
        queue_size: 16,
    });

    let relationships = RelationshipStore::new(
        FollowingRepository::new(conn.clone()),
        BlockingRepository::new(conn.clone()),
    );
    let mut interactions = InteractionService::new(
        UserRepository::new(conn.clone()),
        PostRepository::new(conn.clone()),
        PostLikeRepository::new(conn.clone()),
        CommentRepository::new(conn.clone()),
        ReportRepository::new(conn.clone()),
        relationships.clone(),
        VisibilityService::new(relationships),
    );
    interactions.set_event_publisher(Arc::new(jobs.sender()));

    let handle = jobs.start(JobWorkerContext {
        dispatcher: Some(dispatcher.clone()),
        mailer: Some(mailer.clone()),
        delivery_timeout: Duration::from_secs(5),
    });

    interactions.request_follow(&bob.id, &alice.id).await.unwrap();

    // Dropping the last sender lets the worker drain and stop.
    drop(interactions);
    handle.await.unwrap();

    assert_eq!(dispatcher.count_unread(&alice.id).await.unwrap(), 1);
    assert_eq!(mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_inline_dispatch_hands_mail_to_queue() {
    let db = TestDatabase::new().await.unwrap();
    let conn = db.connection();
    let alice = db.create_user("alice").await.unwrap();
    let bob = db.create_user("bob").await.unwrap();

    let jobs = JobService::new(&DeliveryConfig {
        timeout_secs: 3600,
        workers: 1,
        queue_size: 16,
    });

    let mut dispatcher = NotificationDispatcher::new(
        NotificationRepository::new(conn.clone()),
        UserRepository::new(conn.clone()),
        UserSettingsRepository::new(conn.clone()),
    );
    dispatcher.set_mailer(Arc::new(jobs.sender()), MailTemplates::new(&instance()));

    let relationships = RelationshipStore::new(
        FollowingRepository::new(conn.clone()),
        BlockingRepository::new(conn.clone()),
    );
    let mut interactions = InteractionService::new(
        UserRepository::new(conn.clone()),
        PostRepository::new(conn.clone()),
        PostLikeRepository::new(conn.clone()),
        CommentRepository::new(conn.clone()),
        ReportRepository::new(conn.clone()),
        relationships.clone(),
        VisibilityService::new(relationships),
    );
    interactions.set_event_publisher(Arc::new(dispatcher.clone()));

    let handle = jobs.start(JobWorkerContext {
        dispatcher: None,
        mailer: Some(Arc::new(StalledMailer)),
        delivery_timeout: Duration::from_secs(3600),
    });

    // The stalled SMTP send runs on the worker, not in the request.
    let followed = tokio::time::timeout(
        Duration::from_secs(5),
        interactions.request_follow(&bob.id, &alice.id),
    )
    .await
    .unwrap()
    .unwrap();

    assert!(followed);
    assert_eq!(dispatcher.count_unread(&alice.id).await.unwrap(), 1);

    handle.abort();
}
