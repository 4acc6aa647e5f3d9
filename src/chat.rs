//! Project chat: responders and the chat session state.
//!
//! Replies come from a [`Responder`], so the keyword assistant and the
//! simulated human agent can be swapped for a real conversational backend
//! without touching the board.

use crate::types::{ChatMessage, ChatSender, ChatStatus};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use regex_lite::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

pub const GREETING: &str = "Hello! I'm your project assistant. Tell me about your project and I'll help you break it down into manageable tasks.";

pub const AGENT_GREETING: &str = "Hi there! I'm Sarah, your design project manager. I'll be helping you plan and organize your project today. What can I help you with?";

const FALLBACK_REPLY: &str = "Could you provide more details about your project? What specific goals are you trying to achieve? The more details you provide, the better I can help break this down into manageable tasks.";

/// Produces a reply to a chat message.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, text: &str) -> Result<String>;
}

/// Receives user-facing notifications (agent connected, new agent message).
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

/// Notifier that writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        info!(title, body, "notification");
    }
}

struct KeywordRule {
    pattern: Regex,
    reply: &'static str,
}

/// Assistant that answers from keyword rules; first match wins.
pub struct KeywordResponder {
    rules: Vec<KeywordRule>,
    delay: Duration,
}

impl KeywordResponder {
    pub fn new(delay: Duration) -> Result<Self> {
        let table: [(&str, &'static str); 5] = [
            (
                "website|web|site",
                "Let's break down your website project. What kind of website are you looking to create? Is it for a business, personal portfolio, e-commerce, or something else? What specific features would you like to include?",
            ),
            (
                "blog",
                "For your blog section, we'll need to consider a few components. Do you need categories, comments, search functionality? How many blog posts do you anticipate having? Would you like to include featured images?",
            ),
            (
                "design",
                "Let's talk about the design. What aesthetic are you going for? Do you have brand colors or a style guide? Are there any websites you like the design of that we could use as inspiration?",
            ),
            (
                "logo|brand",
                "For your branding needs, can you describe your brand's personality? What feelings do you want your logo to evoke? Do you have any color preferences or specific symbols you'd like to incorporate?",
            ),
            (
                "marketing|ad",
                "For your marketing campaign, let's define your target audience first. Which platforms would be most effective for reaching them? What's the key message you want to communicate?",
            ),
        ];

        let rules = table
            .into_iter()
            .map(|(pattern, reply)| {
                Ok(KeywordRule {
                    pattern: Regex::new(&format!("(?i){}", pattern))?,
                    reply,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules, delay })
    }

    /// Pick the reply without waiting.
    pub fn reply_for(&self, text: &str) -> &'static str {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(text))
            .map(|rule| rule.reply)
            .unwrap_or(FALLBACK_REPLY)
    }
}

#[async_trait]
impl Responder for KeywordResponder {
    async fn respond(&self, text: &str) -> Result<String> {
        tokio::time::sleep(self.delay).await;
        Ok(self.reply_for(text).to_string())
    }
}

/// Stand-in for a human project manager.
pub struct SimulatedAgentResponder {
    delay: Duration,
    jitter: Duration,
}

impl SimulatedAgentResponder {
    pub fn new(delay: Duration, jitter: Duration) -> Self {
        Self { delay, jitter }
    }

    pub fn reply_for(text: &str) -> String {
        let excerpt: String = text.chars().take(30).collect();
        format!(
            "Thank you for your message. I'm reviewing your request about \"{}...\" and will help you break this down into manageable tasks. Could you tell me more about your timeline and budget for this project?",
            excerpt
        )
    }
}

#[async_trait]
impl Responder for SimulatedAgentResponder {
    async fn respond(&self, text: &str) -> Result<String> {
        tokio::time::sleep(jittered(self.delay, self.jitter)).await;
        Ok(Self::reply_for(text))
    }
}

/// Base delay plus up to `jitter`, seeded from the clock's sub-second nanos.
fn jittered(base: Duration, jitter: Duration) -> Duration {
    use std::time::SystemTime;

    let jitter_ms = jitter.as_millis() as u64;
    if jitter_ms == 0 {
        return base;
    }
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    base + Duration::from_millis(u64::from(nanos) % (jitter_ms + 1))
}

/// A conversation with the assistant and, once connected, a human agent.
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    is_typing: bool,
    status: ChatStatus,
    preferred: ChatSender,
    notifications_enabled: bool,
    assistant: Arc<dyn Responder>,
    agent: Arc<dyn Responder>,
    notifier: Arc<dyn Notifier>,
    connect_delay: Duration,
}

impl ChatSession {
    pub fn new(
        assistant: Arc<dyn Responder>,
        agent: Arc<dyn Responder>,
        notifier: Arc<dyn Notifier>,
        connect_delay: Duration,
    ) -> Self {
        Self {
            messages: vec![message(ChatSender::Ai, GREETING)],
            is_typing: false,
            status: ChatStatus::Idle,
            preferred: ChatSender::Ai,
            notifications_enabled: false,
            assistant,
            agent,
            notifier,
            connect_delay,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    pub fn status(&self) -> ChatStatus {
        self.status
    }

    pub fn preferred_agent(&self) -> ChatSender {
        self.preferred
    }

    pub fn set_preferred_agent(&mut self, sender: ChatSender) {
        self.preferred = sender;
    }

    pub fn set_notifications(&mut self, enabled: bool) {
        self.notifications_enabled = enabled;
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
    }

    /// Append the user's message and the reply from the preferred responder.
    ///
    /// The human agent only answers once connected; otherwise the assistant
    /// does, but the reply is still attributed to the preferred sender.
    pub async fn send_message(&mut self, content: &str) -> Result<ChatMessage> {
        self.messages.push(message(ChatSender::User, content));
        self.is_typing = true;
        debug!(len = content.len(), "chat message sent");

        let responder = if self.preferred == ChatSender::Agent && self.status == ChatStatus::Connected {
            Arc::clone(&self.agent)
        } else {
            Arc::clone(&self.assistant)
        };

        let reply = responder.respond(content).await;
        self.is_typing = false;
        let reply = message(self.preferred, &reply?);
        self.messages.push(reply.clone());

        if self.notifications_enabled && self.preferred == ChatSender::Agent {
            let body: String = reply.content.chars().take(100).collect();
            self.notifier.notify("New Message from Sarah", &body);
        }

        Ok(reply)
    }

    /// Ask for a human agent: idle → waiting → connected.
    pub async fn request_human_agent(&mut self) {
        self.status = ChatStatus::Waiting;
        tokio::time::sleep(self.connect_delay).await;

        self.messages.push(message(ChatSender::Agent, AGENT_GREETING));
        self.status = ChatStatus::Connected;
        self.preferred = ChatSender::Agent;
        info!("human agent connected");

        if self.notifications_enabled {
            self.notifier
                .notify("Agent Connected", "Sarah is ready to help you with your project.");
        }
    }

    /// Reset to the greeting with the assistant.
    pub fn clear(&mut self) {
        self.messages = vec![message(ChatSender::Ai, GREETING)];
        self.status = ChatStatus::Idle;
        self.preferred = ChatSender::Ai;
    }
}

fn message(sender: ChatSender, content: &str) -> ChatMessage {
    ChatMessage {
        id: Uuid::new_v4().to_string(),
        sender,
        content: content.to_string(),
        timestamp: Utc::now(),
    }
}
