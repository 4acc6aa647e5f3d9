//! Integration tests for the chat session and the identity collaborator.
//!
//! Chat delays are configured to zero so the async flows complete at once.

use anyhow::Result;
use async_trait::async_trait;
use design_board::capability::Capability;
use design_board::chat::{
    AGENT_GREETING, ChatSession, GREETING, KeywordResponder, Notifier, Responder,
    SimulatedAgentResponder,
};
use design_board::identity::{AuthSession, IdentityError, IdentityService, InMemoryIdentity};
use design_board::types::{ChatSender, ChatStatus, SubscriptionTier, UserRole};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Notifier that records what it was asked to show.
#[derive(Default)]
struct RecordingNotifier {
    seen: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, _body: &str) {
        self.seen.lock().unwrap().push(title.to_string());
    }
}

/// Responder that always fails.
struct BrokenResponder;

#[async_trait]
impl Responder for BrokenResponder {
    async fn respond(&self, _text: &str) -> Result<String> {
        anyhow::bail!("backend unavailable")
    }
}

fn session(notifier: Arc<RecordingNotifier>) -> ChatSession {
    ChatSession::new(
        Arc::new(KeywordResponder::new(Duration::ZERO).unwrap()),
        Arc::new(SimulatedAgentResponder::new(Duration::ZERO, Duration::ZERO)),
        notifier,
        Duration::ZERO,
    )
}

#[tokio::test]
async fn session_starts_with_greeting() {
    let chat = session(Arc::default());
    assert_eq!(chat.messages().len(), 1);
    assert_eq!(chat.messages()[0].sender, ChatSender::Ai);
    assert_eq!(chat.messages()[0].content, GREETING);
    assert_eq!(chat.status(), ChatStatus::Idle);
}

#[tokio::test]
async fn assistant_replies_by_keyword() {
    let mut chat = session(Arc::default());
    let reply = chat.send_message("We need a blog").await.unwrap();

    assert_eq!(reply.sender, ChatSender::Ai);
    assert!(reply.content.starts_with("For your blog"));
    assert_eq!(chat.messages().len(), 3);
    assert_eq!(chat.messages()[1].sender, ChatSender::User);
    assert!(!chat.is_typing());
}

#[tokio::test]
async fn human_agent_flow() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut chat = session(Arc::clone(&notifier));
    chat.set_notifications(true);

    chat.request_human_agent().await;
    assert_eq!(chat.status(), ChatStatus::Connected);
    assert_eq!(chat.preferred_agent(), ChatSender::Agent);
    assert_eq!(chat.messages().last().unwrap().content, AGENT_GREETING);

    let reply = chat.send_message("Logo ideas for a bakery").await.unwrap();
    assert_eq!(reply.sender, ChatSender::Agent);
    assert!(reply.content.contains("\"Logo ideas for a bakery...\""));

    let seen = notifier.seen.lock().unwrap().clone();
    assert_eq!(seen, vec!["Agent Connected", "New Message from Sarah"]);

    chat.clear();
    assert_eq!(chat.messages().len(), 1);
    assert_eq!(chat.status(), ChatStatus::Idle);
    assert_eq!(chat.preferred_agent(), ChatSender::Ai);
}

#[tokio::test]
async fn agent_preference_without_connection_uses_assistant() {
    let mut chat = session(Arc::default());
    chat.set_preferred_agent(ChatSender::Agent);

    let reply = chat.send_message("a new website").await.unwrap();
    assert_eq!(reply.sender, ChatSender::Agent);
    assert!(reply.content.starts_with("Let's break down your website"));
}

#[tokio::test]
async fn responder_failure_clears_typing() {
    let mut chat = ChatSession::new(
        Arc::new(BrokenResponder),
        Arc::new(BrokenResponder),
        Arc::new(RecordingNotifier::default()),
        Duration::ZERO,
    );
    assert!(chat.send_message("hello").await.is_err());
    assert!(!chat.is_typing());
    assert_eq!(chat.messages().len(), 2);
}

#[tokio::test]
async fn register_login_and_upgrade() {
    let identity: Arc<dyn IdentityService> = Arc::new(InMemoryIdentity::new());
    let mut auth = AuthSession::new(Arc::clone(&identity));
    assert!(!auth.is_authenticated());
    assert_eq!(auth.principal().unwrap_err(), IdentityError::NotAuthenticated);

    let user = auth.register("ana@studio.io", "secret1", "ana").await.unwrap().clone();
    assert_eq!(user.role, UserRole::User);
    assert_eq!(user.subscription, SubscriptionTier::Free);
    assert!(auth.principal().unwrap().has(Capability::RequestWork));

    auth.logout().await.unwrap();
    assert!(!auth.is_authenticated());
    assert_eq!(identity.current_user().await.unwrap(), None);

    auth.login("ana@studio.io", "secret1").await.unwrap();
    let upgraded = auth.update_subscription(SubscriptionTier::Starter).await.unwrap();
    assert_eq!(upgraded.subscription, SubscriptionTier::Starter);
    assert_eq!(upgraded.id, user.id);
}

#[tokio::test]
async fn restore_session_picks_up_signed_in_agent() {
    let identity: Arc<dyn IdentityService> = Arc::new(InMemoryIdentity::new().with_account(
        "sarah@studio.io",
        "manager1",
        "sarah",
        UserRole::Agent,
    ));
    identity.sign_in("sarah@studio.io", "manager1").await.unwrap();

    let mut auth = AuthSession::new(identity);
    let user = auth.restore_session().await.unwrap().cloned().unwrap();
    assert_eq!(user.role, UserRole::Agent);
    assert!(auth.principal().unwrap().has(Capability::ManageWorkflow));
    assert!(!auth.principal().unwrap().has(Capability::RequestWork));
}

#[tokio::test]
async fn registration_validates_input() {
    let identity = InMemoryIdentity::new();
    assert!(matches!(
        identity.sign_up("not-an-email", "secret1", "ana").await,
        Err(IdentityError::InvalidEmail(_))
    ));
    assert_eq!(
        identity.sign_up("ana@studio.io", "short", "ana").await.unwrap_err(),
        IdentityError::WeakPassword
    );
    assert_eq!(
        identity.sign_up("ana@studio.io", "secret1", "an").await.unwrap_err(),
        IdentityError::InvalidUsername
    );
}
