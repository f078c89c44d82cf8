use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    #[serde(default)]
    pub is_active: bool,

    // Mail account used for both IMAP ingestion and outbound SMTP.
    pub mail_username: Option<String>,
    pub mail_password: Option<String>,
    pub imap_host: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,

    // Google Calendar OAuth tokens.
    pub google_access_token: Option<String>,
    pub google_refresh_token: Option<String>,

    // Assistant preferences.
    pub assistant_tone: String,
    pub assistant_language: String,

    // Alert settings.
    #[serde(default)]
    pub vip_senders: Vec<String>,
    #[serde(default)]
    pub emergency_keywords: Vec<String>,
    /// Wall-clock "HH:MM" at which this user receives the morning briefing.
    pub briefing_time: String,

    #[serde(default)]
    pub push_subscriptions: Vec<PushSubscription>,
    pub phone_number: Option<String>,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// A browser web-push subscription as returned by
/// `PushManager.subscribe()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

impl User {
    pub const COLLECTION: &'static str = "users";

    pub fn has_mail_account(&self) -> bool {
        self.mail_username.is_some() && self.mail_password.is_some()
    }

    pub fn has_calendar_account(&self) -> bool {
        self.google_access_token.is_some()
    }
}
