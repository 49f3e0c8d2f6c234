//! Conversation sessions with the assistant and text ("voice") turns.

use crate::{
    client::{ApiClient, ApiError},
    features::query::{
        QueryCache, ACTIVE_SESSION_KEY, ANALYTICS_DASHBOARD_KEY, EMOTIONAL_TIMELINE_KEY,
    },
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const SESSIONS_PATH: &str = "sessions/";
pub const ACTIVE_SESSION_PATH: &str = "sessions/active/";
pub const VOICE_PATH: &str = "voice/process/";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Therapist,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub session: u64,
    pub sender: Sender,
    pub content: String,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
    #[serde(default)]
    pub sentiment_label: Option<String>,
    #[serde(default)]
    pub risk_level: Option<f64>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: u64,
    #[serde(default)]
    pub user: Option<u64>,
    #[serde(default)]
    pub started_at: String,
    #[serde(default)]
    pub ended_at: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SentimentScores {
    pub neg: f64,
    pub neu: f64,
    pub pos: f64,
    pub compound: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Analysis {
    pub sentiment_score: f64,
    pub sentiment_label: String,
    pub risk_level: f64,
    pub scores: SentimentScores,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct VoiceInputResponse {
    pub session_id: u64,
    pub user_message: Message,
    pub therapist_message: Message,
    pub analysis: Analysis,
    #[serde(default)]
    pub risk_detected: bool,
    #[serde(default)]
    pub recommended_category: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SessionSummary {
    pub summary: String,
    pub message: String,
}

#[derive(Serialize)]
struct VoiceInput<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<u64>,
}

/// The open session, if any. A 404 or an unreachable server count as none.
pub async fn active_session(api: &ApiClient) -> Result<Option<ConversationSession>, ApiError> {
    match api.get_optional_json(ACTIVE_SESSION_PATH).await {
        Ok(session) => Ok(session),
        Err(ApiError::Http { status: 404, .. }) => Ok(None),
        Err(ApiError::Network(message)) => {
            debug!("active session unavailable: {message}");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

pub async fn create_session(api: &ApiClient) -> Result<ConversationSession, ApiError> {
    api.post_json(SESSIONS_PATH, &serde_json::json!({})).await
}

pub async fn end_session(api: &ApiClient, id: u64) -> Result<(), ApiError> {
    api.post_empty(&format!("{SESSIONS_PATH}{id}/end_session/"))
        .await
}

pub async fn complete_with_summary(api: &ApiClient, id: u64) -> Result<SessionSummary, ApiError> {
    api.post_empty_json(&format!("{SESSIONS_PATH}{id}/complete_with_summary/"))
        .await
}

pub async fn get_session(api: &ApiClient, id: u64) -> Result<ConversationSession, ApiError> {
    api.get_json(&format!("{SESSIONS_PATH}{id}/")).await
}

/// Sends one turn. Without a session id the server opens a new session.
pub async fn process_text(
    api: &ApiClient,
    text: &str,
    session_id: Option<u64>,
) -> Result<VoiceInputResponse, ApiError> {
    api.post_json(VOICE_PATH, &VoiceInput { text, session_id })
        .await
}

/// Up to three quick replies matched on the assistant's last message.
#[must_use]
pub fn suggested_replies(response: &str) -> Vec<&'static str> {
    let response = response.to_lowercase();
    let mut replies = Vec::new();
    if response.contains("tell me") || response.contains("share") {
        replies.push("Sure, here is more");
    }
    if response.contains("how are you") || response.contains("how do you feel") {
        replies.push("Thanks for asking");
    }
    if response.contains("practice") || response.contains("exercise") {
        replies.push("Show me practices");
    }
    if replies.is_empty() {
        replies = vec!["Got it", "Thanks", "Tell me more"];
    }
    replies.truncate(3);
    replies
}

/// The open conversation and its transcript.
pub struct Conversation {
    api: ApiClient,
    cache: Arc<QueryCache>,
    session: Option<ConversationSession>,
    messages: Vec<Message>,
}

impl Conversation {
    #[must_use]
    pub fn new(api: ApiClient, cache: Arc<QueryCache>) -> Self {
        Self {
            api,
            cache,
            session: None,
            messages: Vec::new(),
        }
    }

    #[must_use]
    pub fn session(&self) -> Option<&ConversationSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Picks up the server's open session and its transcript.
    ///
    /// # Errors
    /// Propagates API errors other than "no session".
    pub async fn resume(&mut self) -> Result<Option<&ConversationSession>, ApiError> {
        if let Some(session) = active_session(&self.api).await? {
            self.messages.clone_from(&session.messages);
            self.session = Some(session);
        }
        Ok(self.session.as_ref())
    }

    /// Sends `text` and appends both sides of the turn to the transcript.
    ///
    /// # Errors
    /// Propagates the API error; the transcript is left unchanged.
    pub async fn say(&mut self, text: &str) -> Result<VoiceInputResponse, ApiError> {
        let session_id = self.session.as_ref().map(|session| session.id);
        let response = process_text(&self.api, text, session_id).await?;

        self.push(response.user_message.clone());
        self.push(response.therapist_message.clone());
        if response.risk_detected {
            warn!(session_id = response.session_id, "risk detected in conversation");
        }

        match get_session(&self.api, response.session_id).await {
            Ok(session) => self.session = Some(session),
            Err(err) => warn!("session refresh failed: {err}"),
        }
        self.cache.invalidate(ANALYTICS_DASHBOARD_KEY);
        self.cache.invalidate(ACTIVE_SESSION_KEY);
        Ok(response)
    }

    /// Closes the session and asks for its summary. `None` when nothing is open.
    ///
    /// # Errors
    /// Propagates the API error; the session stays open.
    pub async fn complete(&mut self) -> Result<Option<SessionSummary>, ApiError> {
        let Some(id) = self.session.as_ref().map(|session| session.id) else {
            return Ok(None);
        };
        let summary = complete_with_summary(&self.api, id).await?;
        info!(session_id = id, "session completed");
        self.close();
        self.cache.invalidate(EMOTIONAL_TIMELINE_KEY);
        Ok(Some(summary))
    }

    /// Ends the open session without a summary.
    ///
    /// # Errors
    /// Propagates the API error; the session stays open.
    pub async fn end(&mut self) -> Result<(), ApiError> {
        if let Some(id) = self.session.as_ref().map(|session| session.id) {
            end_session(&self.api, id).await?;
            info!(session_id = id, "session ended");
            self.close();
        }
        Ok(())
    }

    fn close(&mut self) {
        self.session = None;
        self.messages.clear();
        self.cache.invalidate(ANALYTICS_DASHBOARD_KEY);
        self.cache.invalidate(ACTIVE_SESSION_KEY);
    }

    fn push(&mut self, message: Message) {
        if !self.messages.iter().any(|known| known.id == message.id) {
            self.messages.push(message);
        }
    }
}
