use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,

    /// Upstream event id, the upsert key across sync cycles.
    pub google_event_id: String,
    pub calendar_id: String,

    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,

    pub start_at: DateTime,
    pub end_at: DateTime,
    #[serde(default)]
    pub is_all_day: bool,

    pub organizer_email: Option<String>,
    /// Attendee list as returned by the calendar API, stored opaquely.
    #[serde(default)]
    pub attendees: serde_json::Value,

    pub meeting_link: Option<String>,
    pub meeting_platform: Option<String>,

    pub summary: Option<String>,
    pub preparation_notes: Option<String>,

    #[serde(default)]
    pub reminder_sent: bool,
    pub reminder_minutes_before: i64,

    pub status: String,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl CalendarEvent {
    pub const COLLECTION: &'static str = "calendar_events";

    /// An event needs a reminder when none was sent yet and its start
    /// falls inside the next `reminder_minutes_before` minutes (events
    /// already started are excluded).
    pub fn needs_reminder(&self, now: DateTime) -> bool {
        if self.reminder_sent {
            return false;
        }
        let window_ms = self.reminder_minutes_before * 60 * 1000;
        let start = self.start_at.timestamp_millis();
        let now = now.timestamp_millis();
        start > now && start <= now + window_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(start_offset_mins: i64, reminder_sent: bool) -> CalendarEvent {
        let now = DateTime::now();
        let start = DateTime::from_millis(now.timestamp_millis() + start_offset_mins * 60_000);
        CalendarEvent {
            id: None,
            user_id: ObjectId::new(),
            google_event_id: "evt-1".into(),
            calendar_id: "primary".into(),
            title: "Standup".into(),
            description: None,
            location: None,
            start_at: start,
            end_at: DateTime::from_millis(start.timestamp_millis() + 30 * 60_000),
            is_all_day: false,
            organizer_email: None,
            attendees: serde_json::json!([]),
            meeting_link: None,
            meeting_platform: None,
            summary: None,
            preparation_notes: None,
            reminder_sent,
            reminder_minutes_before: 15,
            status: "confirmed".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn event_ten_minutes_out_is_inside_fifteen_minute_window() {
        let e = event(10, false);
        assert!(e.needs_reminder(DateTime::now()));
    }

    #[test]
    fn event_outside_window_or_already_reminded_is_skipped() {
        assert!(!event(20, false).needs_reminder(DateTime::now()));
        assert!(!event(10, true).needs_reminder(DateTime::now()));
    }

    #[test]
    fn event_already_started_is_skipped() {
        assert!(!event(-5, false).needs_reminder(DateTime::now()));
    }
}
