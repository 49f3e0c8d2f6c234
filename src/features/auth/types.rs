//! Request and response types for auth API calls. Request bodies borrow the
//! exposed password only for the duration of the call; they do not derive
//! `Debug` so they cannot end up in logs.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Premium,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    #[serde(default)]
    pub tier: Tier,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// Signed-in user as returned by the API. Contains no secrets.
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionSnapshot>,
    #[serde(rename = "isPremium", default)]
    pub is_premium: bool,
}

impl User {
    /// Premium either by the user flag or an active premium subscription.
    #[must_use]
    pub fn has_premium(&self) -> bool {
        self.is_premium
            || self
                .subscription
                .as_ref()
                .is_some_and(|subscription| subscription.is_premium)
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.first_name.is_empty() {
            &self.username
        } else {
            &self.first_name
        }
    }
}

#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LoginResponse {
    pub user: User,
    #[serde(default)]
    pub message: String,
}

/// Registration input. `username` falls back to the email.
pub struct Registration {
    pub email: String,
    pub password: SecretString,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Registration {
    #[must_use]
    pub fn new(email: impl Into<String>, password: SecretString) -> Self {
        Self {
            email: email.into(),
            password,
            username: None,
            first_name: None,
            last_name: None,
        }
    }

    pub(crate) fn request(&self) -> RegisterRequest<'_> {
        let password = self.password.expose_secret();
        RegisterRequest {
            username: self.username.as_deref().unwrap_or(&self.email),
            email: &self.email,
            password,
            password_confirm: password,
            first_name: self.first_name.as_deref(),
            last_name: self.last_name.as_deref(),
        }
    }
}

#[derive(Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub password_confirm: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<&'a str>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_reads_camel_case_flags_and_defaults() {
        let user: User = serde_json::from_value(json!({
            "id": 7,
            "username": "ann@example.com",
            "email": "ann@example.com",
            "isAdmin": true,
            "subscription": {"tier": "premium", "is_active": true, "is_premium": true, "expires_at": null}
        }))
        .unwrap();

        assert!(user.is_admin);
        assert!(!user.is_premium);
        assert!(user.has_premium());
        assert_eq!(user.subscription.unwrap().tier, Tier::Premium);
    }

    #[test]
    fn registration_defaults_username_and_confirmation() {
        let registration = Registration::new("a@b.co", SecretString::from("hunter22!"));
        let body = serde_json::to_value(registration.request()).unwrap();
        assert_eq!(
            body,
            json!({
                "username": "a@b.co",
                "email": "a@b.co",
                "password": "hunter22!",
                "password_confirm": "hunter22!"
            })
        );
    }
}
