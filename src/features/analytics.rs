//! Wellness dashboard for the last N days.

use crate::{
    client::{ApiClient, ApiError},
    features::query::{query_key, QueryCache, ANALYTICS_DASHBOARD_KEY},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};

pub const DASHBOARD_PATH: &str = "analytics/dashboard/";
pub const DEFAULT_DAYS: u32 = 30;
pub const DASHBOARD_STALE_AFTER: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThemeCount {
    pub theme: String,
    pub count: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPoint {
    pub date: String,
    pub mood_intensity: f64,
    pub sentiment: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub date: String,
    pub mood: String,
    pub intensity: f64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub related_session_id: Option<u64>,
    #[serde(default)]
    pub related_sentiment: Option<f64>,
}

/// Dashboard payload. Premium-only aggregates are absent for free accounts,
/// which get `upgrade_message` instead.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    #[serde(default)]
    pub total_sessions: u64,
    #[serde(default)]
    pub total_messages: u64,
    pub total_mood_entries: Option<u64>,
    pub total_cbt_completed: Option<u64>,
    pub average_sentiment: Option<f64>,
    pub sentiment_trend: Option<f64>,
    pub average_mood_intensity: Option<f64>,
    pub mood_trend: Option<f64>,
    pub mood_distribution: Option<BTreeMap<String, u64>>,
    pub mood_avg_intensity: Option<BTreeMap<String, f64>>,
    pub most_common_mood: Option<String>,
    #[serde(default)]
    pub risk_events: u64,
    pub wellness_score: Option<f64>,
    pub correlation_data: Option<Vec<CorrelationPoint>>,
    #[serde(default)]
    pub dominant_themes: Vec<ThemeCount>,
    #[serde(default)]
    pub emotional_timeline: Vec<TimelinePoint>,
    #[serde(default)]
    pub period_days: u32,
    pub is_premium: Option<bool>,
    pub upgrade_message: Option<String>,
}

pub async fn fetch_dashboard(api: &ApiClient, days: u32) -> Result<DashboardData, ApiError> {
    api.get_json(&format!("{DASHBOARD_PATH}?days={days}")).await
}

/// Dashboard through the query cache, keyed by the day window.
///
/// # Errors
/// Propagates the API error.
pub async fn dashboard(
    api: &ApiClient,
    cache: &QueryCache,
    days: u32,
) -> Result<DashboardData, ApiError> {
    cache
        .get_or_fetch(
            &query_key(ANALYTICS_DASHBOARD_KEY, days),
            DASHBOARD_STALE_AFTER,
            || fetch_dashboard(api, days),
        )
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{client::ClientConfig, storage::CookieJar};
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn free_dashboard_decodes_without_premium_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/analytics/dashboard/"))
            .and(query_param("days", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_sessions": 3, "total_messages": 12, "risk_events": 0,
                "dominant_themes": [{"theme": "work", "count": 2}],
                "emotional_timeline": [{"date": "2024-05-01", "mood": "calm", "intensity": 6}],
                "period_days": 7, "is_premium": false,
                "upgrade_message": "Upgrade for trends"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = ClientConfig::new(&format!("{}/api", server.uri())).unwrap();
        let api = ApiClient::new(config, Arc::new(CookieJar::new())).unwrap();
        let cache = QueryCache::new();

        let data = dashboard(&api, &cache, 7).await.unwrap();
        assert_eq!(data.total_sessions, 3);
        assert_eq!(data.dominant_themes[0].theme, "work");
        assert!(data.wellness_score.is_none());
        assert_eq!(data.upgrade_message.as_deref(), Some("Upgrade for trends"));

        // Second read is served from the cache.
        assert_eq!(dashboard(&api, &cache, 7).await.unwrap(), data);
    }
}
