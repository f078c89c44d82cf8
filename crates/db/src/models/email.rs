use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// An ingested email. The mail collaborator populates the VIP/emergency
/// flags and AI annotations before the notification core ever sees the
/// record; the core only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,

    /// RFC 5322 Message-ID, the dedupe key across poll cycles.
    pub message_id: String,
    pub sender_email: String,
    pub sender_name: String,
    pub recipient_email: String,
    pub subject: String,
    pub body: String,
    pub body_html: Option<String>,

    #[serde(default)]
    pub status: EmailStatus,
    #[serde(default)]
    pub priority: EmailPriority,
    #[serde(default)]
    pub is_emergency: bool,
    #[serde(default)]
    pub is_from_vip: bool,

    // AI annotations; absent when the assistant is unavailable.
    pub summary: Option<String>,
    pub suggested_reply: Option<String>,
    pub sentiment: Option<String>,

    pub received_at: DateTime,
    pub processed_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    #[default]
    Unread,
    Read,
    Archived,
    Important,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Email {
    pub const COLLECTION: &'static str = "emails";
}
