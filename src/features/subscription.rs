//! Subscription status, plan changes and feature gating.

use crate::{
    client::{ApiClient, ApiError},
    features::{
        auth::{types::Tier, AuthSession},
        query::{CURRENT_USER_KEY, SUBSCRIPTION_STATUS_KEY},
    },
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

pub const STATUS_PATH: &str = "subscription/status/";
pub const UPGRADE_PATH: &str = "subscription/upgrade/";
pub const CANCEL_PATH: &str = "subscription/cancel/";
pub const LIMITS_PATH: &str = "subscription/limits/";

pub const STATUS_STALE_AFTER: Duration = Duration::from_secs(60);

pub const FEATURE_ADVANCED_ANALYTICS: &str = "advanced_analytics";
pub const FEATURE_UNLIMITED_CBT: &str = "unlimited_cbt";
pub const FEATURE_UNLIMITED_SESSIONS: &str = "unlimited_sessions";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: u64,
    pub tier: Tier,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub is_expired: bool,
    #[serde(default)]
    pub started_at: String,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

/// Plan limits. `None` means unlimited.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLimits {
    pub max_cbt_programs: Option<u32>,
    pub max_sessions_per_month: Option<u32>,
    #[serde(default)]
    pub advanced_analytics: bool,
    #[serde(default)]
    pub priority_support: bool,
    pub voice_sessions_per_month: Option<u32>,
}

impl Default for FeatureLimits {
    /// Free-tier limits, used until the status is known.
    fn default() -> Self {
        Self {
            max_cbt_programs: Some(2),
            max_sessions_per_month: Some(5),
            advanced_analytics: false,
            priority_support: false,
            voice_sessions_per_month: Some(3),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    pub subscription: Subscription,
    pub limits: FeatureLimits,
    #[serde(default)]
    pub is_premium: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Cancellation {
    pub message: String,
    pub subscription: Subscription,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LimitsResponse {
    pub limits: FeatureLimits,
    pub subscription_tier: String,
    #[serde(default)]
    pub is_premium: bool,
}

pub async fn fetch_status(api: &ApiClient) -> Result<SubscriptionStatus, ApiError> {
    api.get_json(STATUS_PATH).await
}

pub async fn upgrade(api: &ApiClient) -> Result<SubscriptionStatus, ApiError> {
    api.post_empty_json(UPGRADE_PATH).await
}

pub async fn cancel(api: &ApiClient) -> Result<Cancellation, ApiError> {
    api.post_empty_json(CANCEL_PATH).await
}

pub async fn fetch_limits(api: &ApiClient) -> Result<LimitsResponse, ApiError> {
    api.get_json(LIMITS_PATH).await
}

/// What the signed-in user may use, derived from the cached status and the
/// user's own premium flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entitlements {
    pub is_premium: bool,
    pub limits: FeatureLimits,
    pub subscription: Option<Subscription>,
}

impl Entitlements {
    #[must_use]
    pub fn new(status: Option<SubscriptionStatus>, user_is_premium: bool) -> Self {
        match status {
            Some(status) => Self {
                is_premium: status.is_premium || user_is_premium,
                limits: status.limits,
                subscription: Some(status.subscription),
            },
            None => Self {
                is_premium: user_is_premium,
                limits: FeatureLimits::default(),
                subscription: None,
            },
        }
    }

    /// Unknown feature names fall back to the premium flag.
    #[must_use]
    pub fn can_access(&self, feature: &str) -> bool {
        match feature {
            FEATURE_ADVANCED_ANALYTICS => self.limits.advanced_analytics,
            FEATURE_UNLIMITED_CBT => self.limits.max_cbt_programs.is_none(),
            FEATURE_UNLIMITED_SESSIONS => self.limits.max_sessions_per_month.is_none(),
            _ => self.is_premium,
        }
    }
}

/// Subscription queries bound to the auth session.
#[derive(Clone)]
pub struct Subscriptions {
    auth: AuthSession,
}

impl Subscriptions {
    #[must_use]
    pub fn new(auth: AuthSession) -> Self {
        Self { auth }
    }

    /// Cached status, or `None` for anonymous sessions (no request is made).
    ///
    /// # Errors
    /// Propagates the API error.
    pub async fn status(&self) -> Result<Option<SubscriptionStatus>, ApiError> {
        if !self.auth.is_authenticated() {
            return Ok(None);
        }
        let api = self.auth.api();
        self.auth
            .cache()
            .get_or_fetch(SUBSCRIPTION_STATUS_KEY, STATUS_STALE_AFTER, || {
                fetch_status(api)
            })
            .await
            .map(Some)
    }

    /// # Errors
    /// Propagates the status error.
    pub async fn entitlements(&self) -> Result<Entitlements, ApiError> {
        let user_is_premium = self.auth.user().is_some_and(|user| user.is_premium);
        let status = self.status().await?;
        Ok(Entitlements::new(status, user_is_premium))
    }

    /// Upgrades and drops the cached status and user so both are refetched.
    ///
    /// # Errors
    /// Propagates the API error.
    pub async fn upgrade(&self) -> Result<SubscriptionStatus, ApiError> {
        let status = upgrade(self.auth.api()).await?;
        let cache = self.auth.cache();
        cache.invalidate(SUBSCRIPTION_STATUS_KEY);
        cache.invalidate(CURRENT_USER_KEY);
        info!(tier = ?status.subscription.tier, "subscription upgraded");
        Ok(status)
    }

    /// # Errors
    /// Propagates the API error.
    pub async fn cancel(&self) -> Result<Cancellation, ApiError> {
        let cancellation = cancel(self.auth.api()).await?;
        self.auth.cache().invalidate(SUBSCRIPTION_STATUS_KEY);
        info!(
            cancel_at_period_end = cancellation.subscription.cancel_at_period_end,
            "subscription cancelled"
        );
        Ok(cancellation)
    }
}
