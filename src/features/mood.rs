//! Mood journal entries ("emotional states") and the timeline view.

use crate::{
    client::{ApiClient, ApiError},
    features::{
        auth::AuthSession,
        query::{query_key, ANALYTICS_DASHBOARD_KEY, EMOTIONAL_TIMELINE_KEY},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr, time::Duration};
use tracing::{debug, info};

pub const EMOTIONAL_STATES_PATH: &str = "emotional-states/";
pub const TIMELINE_PATH: &str = "emotional-states/timeline/";

pub const DEFAULT_TIMELINE_DAYS: u32 = 30;
pub const TIMELINE_STALE_AFTER: Duration = Duration::from_secs(60);

/// Cookies kept for anonymous or first-time trackers.
pub const LAST_MOOD_COOKIE: &str = "last_mood";
pub const MOOD_TRACKED_COOKIE: &str = "mood_tracked";
pub const LAST_MOOD_DAYS: i64 = 7;
pub const MOOD_TRACKED_DAYS: i64 = 365;

pub const MIN_INTENSITY: u8 = 1;
pub const MAX_INTENSITY: u8 = 10;
pub const DEFAULT_INTENSITY: u8 = 8;

pub const RECORD_FAILED: &str = "Could not record your mood. Please try again.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Neutral,
    Sad,
    Anxious,
    Angry,
    Calm,
}

impl Mood {
    pub const ALL: [Mood; 6] = [
        Mood::Happy,
        Mood::Neutral,
        Mood::Sad,
        Mood::Anxious,
        Mood::Angry,
        Mood::Calm,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Neutral => "neutral",
            Self::Sad => "sad",
            Self::Anxious => "anxious",
            Self::Angry => "angry",
            Self::Calm => "calm",
        }
    }

    /// Picker label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Happy => "Good",
            Self::Neutral => "Okay",
            Self::Sad => "Not great",
            Self::Anxious => "Anxious",
            Self::Angry => "Angry",
            Self::Calm => "Calm",
        }
    }

    /// Describes `intensity` for this mood in five bands: up to 2, 4, 6, 8,
    /// and above.
    #[must_use]
    pub fn intensity_label(self, intensity: u8) -> &'static str {
        let band = match intensity {
            0..=2 => 0,
            3..=4 => 1,
            5..=6 => 2,
            7..=8 => 3,
            _ => 4,
        };
        let labels: [&str; 5] = match self {
            Self::Happy => ["A little good", "Good", "Very good", "Great", "Superb"],
            Self::Neutral => [
                "Slightly below normal",
                "A bit below normal",
                "Normal",
                "A bit above normal",
                "Above normal",
            ],
            Self::Sad => ["Slightly bad", "Bad", "Very bad", "Very hard", "Unbearable"],
            Self::Anxious => [
                "Mild unease",
                "Uneasy",
                "Anxious",
                "Strong anxiety",
                "Panic",
            ],
            Self::Angry => [
                "Mild irritation",
                "Irritated",
                "Angry",
                "Very angry",
                "Furious",
            ],
            Self::Calm => [
                "A little calm",
                "Calm",
                "Very calm",
                "Complete calm",
                "Deep serenity",
            ],
        };
        labels[band]
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|mood| mood.as_str() == wanted)
            .ok_or_else(|| format!("unknown mood: {value}"))
    }
}

/// A recorded entry. `mood` stays a string so moods the client does not know
/// yet still decode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionalState {
    pub id: u64,
    #[serde(default)]
    pub user: Option<u64>,
    #[serde(default)]
    pub session: Option<u64>,
    pub mood: String,
    pub intensity: u8,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub recorded_at: String,
}

#[derive(Debug, Serialize)]
struct NewEmotionalState<'a> {
    mood: Mood,
    intensity: u8,
    notes: &'a str,
}

pub async fn create(
    api: &ApiClient,
    mood: Mood,
    intensity: u8,
    notes: Option<&str>,
) -> Result<EmotionalState, ApiError> {
    let body = NewEmotionalState {
        mood,
        intensity: intensity.clamp(MIN_INTENSITY, MAX_INTENSITY),
        notes: notes.unwrap_or_default(),
    };
    api.post_json(EMOTIONAL_STATES_PATH, &body).await
}

pub async fn timeline(api: &ApiClient, days: u32) -> Result<Vec<EmotionalState>, ApiError> {
    api.get_json(&format!("{TIMELINE_PATH}?days={days}")).await
}

/// Records moods for the current session and keeps the dependent caches and
/// first-visit cookies in step.
#[derive(Clone)]
pub struct MoodTracker {
    auth: AuthSession,
}

impl MoodTracker {
    #[must_use]
    pub fn new(auth: AuthSession) -> Self {
        Self { auth }
    }

    /// # Errors
    /// Propagates the API error; use [`describe_error`] for the user-facing text.
    pub async fn record(
        &self,
        mood: Mood,
        intensity: u8,
        notes: Option<&str>,
    ) -> Result<EmotionalState, ApiError> {
        let api = self.auth.api();
        let state = create(api, mood, intensity, notes).await?;
        info!(id = state.id, %mood, "mood recorded");

        let cache = self.auth.cache();
        cache.invalidate(ANALYTICS_DASHBOARD_KEY);
        cache.invalidate(EMOTIONAL_TIMELINE_KEY);

        let cookies = api.cookies();
        if !self.auth.is_authenticated() || cookies.get(MOOD_TRACKED_COOKIE).is_none() {
            cookies.set(LAST_MOOD_COOKIE, mood.as_str(), Some(LAST_MOOD_DAYS));
            cookies.set(MOOD_TRACKED_COOKIE, "true", Some(MOOD_TRACKED_DAYS));
            debug!("mood saved to cookies");
        }
        Ok(state)
    }

    /// # Errors
    /// Propagates the API error.
    pub async fn timeline(&self, days: u32) -> Result<Vec<EmotionalState>, ApiError> {
        let api = self.auth.api();
        self.auth
            .cache()
            .get_or_fetch(
                &query_key(EMOTIONAL_TIMELINE_KEY, days),
                TIMELINE_STALE_AFTER,
                || timeline(api, days),
            )
            .await
    }
}

/// User-facing text for a failed record. Field errors win over `detail`,
/// `error`, a bare string body, then `non_field_errors`.
#[must_use]
pub fn describe_error(err: &ApiError) -> String {
    let ApiError::Http { details, .. } = err else {
        return err.to_string();
    };
    let Some(data) = details else {
        return RECORD_FAILED.to_string();
    };

    let first = |key: &str| -> Option<String> {
        data.get(key)?
            .as_array()?
            .first()
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let text = |key: &str| -> Option<String> {
        data.get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    if let Some(message) = first("mood") {
        format!("Mood error: {message}")
    } else if let Some(message) = first("intensity") {
        format!("Intensity error: {message}")
    } else if let Some(message) = text("detail").or_else(|| text("error")) {
        message
    } else if let Some(message) = data.as_str() {
        message.to_string()
    } else {
        first("non_field_errors").unwrap_or_else(|| RECORD_FAILED.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        client::ClientConfig,
        features::query::QueryCache,
        storage::CookieJar,
    };
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::{
        matchers::{body_json, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn tracker(server: &MockServer) -> MoodTracker {
        let config = ClientConfig::new(&format!("{}/api", server.uri())).unwrap();
        let api = ApiClient::new(config, Arc::new(CookieJar::new())).unwrap();
        api.cookies().set("csrftoken", "tok", None);
        MoodTracker::new(AuthSession::new(api, Arc::new(QueryCache::new())))
    }

    fn entry() -> Value {
        json!({"id": 7, "user": 1, "mood": "calm", "intensity": 6, "notes": "",
               "recorded_at": "2024-05-01T10:00:00Z"})
    }

    #[test]
    fn intensity_labels_follow_the_bands() {
        assert_eq!(Mood::Happy.intensity_label(1), "A little good");
        assert_eq!(Mood::Happy.intensity_label(4), "Good");
        assert_eq!(Mood::Sad.intensity_label(8), "Very hard");
        assert_eq!(Mood::Anxious.intensity_label(9), "Panic");
        assert_eq!(Mood::Calm.intensity_label(10), "Deep serenity");
        assert_eq!("Angry".parse::<Mood>(), Ok(Mood::Angry));
        assert!("bored".parse::<Mood>().is_err());
    }

    #[tokio::test]
    async fn first_record_sets_cookies_and_drops_stale_queries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/emotional-states/"))
            .and(body_json(json!({"mood": "calm", "intensity": 6, "notes": ""})))
            .respond_with(ResponseTemplate::new(201).set_body_json(entry()))
            .expect(1)
            .mount(&server)
            .await;

        let tracker = tracker(&server);
        let cache = tracker.auth.cache();
        cache.set(&query_key(EMOTIONAL_TIMELINE_KEY, 30), json!([]));
        cache.set(&query_key(ANALYTICS_DASHBOARD_KEY, 30), json!({}));

        let state = tracker.record(Mood::Calm, 6, None).await.unwrap();
        assert_eq!(state.id, 7);
        assert!(!cache.contains(&query_key(EMOTIONAL_TIMELINE_KEY, 30)));
        assert!(!cache.contains(&query_key(ANALYTICS_DASHBOARD_KEY, 30)));

        let cookies = tracker.auth.api().cookies();
        assert_eq!(cookies.get(LAST_MOOD_COOKIE).as_deref(), Some("calm"));
        assert_eq!(cookies.get(MOOD_TRACKED_COOKIE).as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn intensity_is_clamped_to_the_scale() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/emotional-states/"))
            .and(body_json(json!({"mood": "happy", "intensity": 10, "notes": "sun"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(entry()))
            .expect(1)
            .mount(&server)
            .await;

        tracker(&server).record(Mood::Happy, 42, Some("sun")).await.unwrap();
    }

    #[tokio::test]
    async fn timeline_is_cached_per_day_window() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/emotional-states/timeline/"))
            .and(query_param("days", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([entry()])))
            .expect(1)
            .mount(&server)
            .await;

        let tracker = tracker(&server);
        assert_eq!(tracker.timeline(7).await.unwrap().len(), 1);
        assert_eq!(tracker.timeline(7).await.unwrap()[0].mood, "calm");
    }

    #[test]
    fn error_text_prefers_field_errors() {
        let http = |details: Value| ApiError::Http {
            status: 400,
            message: "Bad Request".to_string(),
            details: Some(details),
        };
        assert_eq!(
            describe_error(&http(json!({"intensity": ["Ensure this value is <= 10."],
                                        "detail": "ignored"}))),
            "Intensity error: Ensure this value is <= 10."
        );
        assert_eq!(describe_error(&http(json!({"detail": "Nope"}))), "Nope");
        assert_eq!(describe_error(&http(json!("plain text"))), "plain text");
        assert_eq!(
            describe_error(&http(json!({"non_field_errors": ["Too many"]}))),
            "Too many"
        );
        assert_eq!(describe_error(&http(json!({"other": 1}))), RECORD_FAILED);
        assert_eq!(
            describe_error(&ApiError::Timeout("slow".to_string())),
            "Timeout: slow"
        );
    }
}
