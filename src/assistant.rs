use rand::seq::SliceRandom;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::content::{self, ContentError};

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("no assistant service is configured")]
    NotConfigured,
    #[error("assistant request failed: {0}")]
    Request(String),
    #[error("assistant returned an empty reply")]
    EmptyReply,
}

/// A free-text question/answer service.
pub trait AssistantGateway {
    fn ask(&mut self, text: &str) -> Result<String, AssistantError>;
}

/// Gateway used when no remote assistant has been set up.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineGateway;

impl AssistantGateway for OfflineGateway {
    fn ask(&mut self, _text: &str) -> Result<String, AssistantError> {
        Err(AssistantError::NotConfigured)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Topic {
    pub keyword: String,
    pub reply: String,
}

/// Keyword-matched replies used when the gateway fails.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CannedResponder {
    pub topics: Vec<Topic>,
    pub off_topic: Vec<String>,
    pub off_topic_reply: String,
    pub generic: Vec<String>,
    /// Short safety tips, one shown at random on request.
    pub tips: Vec<String>,
}

impl CannedResponder {
    pub fn embedded() -> Result<Self, ContentError> {
        content::load(content::REPLIES_FILE)
    }

    /// The reply for a matched topic or off-topic subject, if any.
    pub fn matched_reply(&self, text: &str) -> Option<&str> {
        let lower = text.to_lowercase();
        if let Some(topic) = self.topics.iter().find(|t| lower.contains(&t.keyword)) {
            return Some(topic.reply.as_str());
        }
        if self
            .off_topic
            .iter()
            .any(|subject| lower.split(|c: char| !c.is_alphanumeric()).any(|w| w == subject.as_str()))
        {
            return Some(self.off_topic_reply.as_str());
        }
        None
    }

    pub fn reply(&self, text: &str) -> String {
        if let Some(reply) = self.matched_reply(text) {
            return reply.to_string();
        }
        self.generic
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| self.off_topic_reply.clone())
    }

    pub fn tip(&self) -> Option<&str> {
        self.tips.choose(&mut rand::thread_rng()).map(String::as_str)
    }
}

/// Asks the gateway, substituting a canned reply on any failure.
pub fn reply_or_fallback<G: AssistantGateway>(
    gateway: &mut G,
    canned: &CannedResponder,
    text: &str,
) -> String {
    match gateway.ask(text) {
        Ok(reply) if !reply.trim().is_empty() => reply,
        Ok(_) => {
            warn!(error = %AssistantError::EmptyReply, "using canned reply");
            canned.reply(text)
        }
        Err(e) => {
            warn!(error = %e, "using canned reply");
            canned.reply(text)
        }
    }
}
