use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// A persisted notification record with a typed classification and a
/// delivery/read lifecycle. Created by the alert factory, delivered by
/// the dispatch engine, surfaced to the owning user via the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,

    pub title: String,
    pub message: String,
    pub alert_type: AlertType,
    #[serde(default)]
    pub priority: AlertPriority,
    #[serde(default)]
    pub status: AlertStatus,

    /// Source links. At most one is set: email alerts link the email,
    /// meeting reminders link the event, briefing/system link neither.
    pub email_id: Option<ObjectId>,
    pub calendar_event_id: Option<ObjectId>,

    // Delivery channel selection, fixed at creation time.
    #[serde(default)]
    pub send_email: bool,
    #[serde(default)]
    pub send_push: bool,
    #[serde(default)]
    pub send_sms: bool,

    /// Flat key-value payload specific to the alert type (sender/subject
    /// for email alerts, location/link for meeting alerts).
    #[serde(default)]
    pub metadata: serde_json::Value,

    pub scheduled_for: Option<DateTime>,
    pub sent_at: Option<DateTime>,
    pub read_at: Option<DateTime>,
    pub dismissed_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    EmailVip,
    EmailEmergency,
    MeetingReminder,
    MorningBriefing,
    System,
}

/// Strictly ordered: Low < Normal < High < Urgent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    #[default]
    Pending,
    Sent,
    Read,
    Dismissed,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::EmailVip => "email_vip",
            AlertType::EmailEmergency => "email_emergency",
            AlertType::MeetingReminder => "meeting_reminder",
            AlertType::MorningBriefing => "morning_briefing",
            AlertType::System => "system",
        }
    }
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Pending => "pending",
            AlertStatus::Sent => "sent",
            AlertStatus::Read => "read",
            AlertStatus::Dismissed => "dismissed",
        }
    }

    /// Read and dismissed are terminal; no transition leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertStatus::Read | AlertStatus::Dismissed)
    }
}

impl Alert {
    pub const COLLECTION: &'static str = "alerts";

    /// Email alerts link an email, meeting reminders link an event,
    /// briefing/system alerts link neither. Never both.
    pub fn links_valid(&self) -> bool {
        match self.alert_type {
            AlertType::EmailVip | AlertType::EmailEmergency => {
                self.email_id.is_some() && self.calendar_event_id.is_none()
            }
            AlertType::MeetingReminder => {
                self.calendar_event_id.is_some() && self.email_id.is_none()
            }
            AlertType::MorningBriefing | AlertType::System => {
                self.email_id.is_none() && self.calendar_event_id.is_none()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_is_strictly_ordered() {
        assert!(AlertPriority::Low < AlertPriority::Normal);
        assert!(AlertPriority::Normal < AlertPriority::High);
        assert!(AlertPriority::High < AlertPriority::Urgent);
    }

    #[test]
    fn status_round_trips_snake_case() {
        let json = serde_json::to_string(&AlertStatus::Dismissed).unwrap();
        assert_eq!(json, "\"dismissed\"");
        let back: AlertStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AlertStatus::Dismissed);
    }

    #[test]
    fn unknown_status_is_rejected_on_read() {
        let result = serde_json::from_str::<AlertStatus>("\"snoozed\"");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_alert_type_is_rejected_on_read() {
        let result = serde_json::from_str::<AlertType>("\"email_digest\"");
        assert!(result.is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(!AlertStatus::Pending.is_terminal());
        assert!(!AlertStatus::Sent.is_terminal());
        assert!(AlertStatus::Read.is_terminal());
        assert!(AlertStatus::Dismissed.is_terminal());
    }

    #[test]
    fn link_invariant_per_type() {
        let now = DateTime::now();
        let mut alert = Alert {
            id: None,
            user_id: ObjectId::new(),
            title: "t".into(),
            message: "m".into(),
            alert_type: AlertType::EmailVip,
            priority: AlertPriority::High,
            status: AlertStatus::Pending,
            email_id: Some(ObjectId::new()),
            calendar_event_id: None,
            send_email: true,
            send_push: true,
            send_sms: false,
            metadata: serde_json::json!({}),
            scheduled_for: None,
            sent_at: None,
            read_at: None,
            dismissed_at: None,
            created_at: now,
            updated_at: now,
        };
        assert!(alert.links_valid());

        alert.calendar_event_id = Some(ObjectId::new());
        assert!(!alert.links_valid());

        alert.alert_type = AlertType::MorningBriefing;
        alert.email_id = None;
        alert.calendar_event_id = None;
        assert!(alert.links_valid());
    }
}
