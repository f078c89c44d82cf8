use std::sync::Arc;

use bson::{DateTime, oid::ObjectId};
use tracing::info;

use adjutant_db::models::{Alert, AlertPriority, AlertStatus, AlertType, CalendarEvent, Email, User};

use crate::dao::alert::AlertStore;
use crate::dao::base::DaoResult;

use super::dispatch::DispatchEngine;

/// Builds typed alerts from domain events. Every `create_*` persists the
/// alert and synchronously hands it to the dispatch engine before
/// returning; a persistence failure propagates and abandons only that
/// one alert.
pub struct AlertFactory {
    store: Arc<dyn AlertStore>,
    dispatch: Arc<DispatchEngine>,
}

impl AlertFactory {
    pub fn new(store: Arc<dyn AlertStore>, dispatch: Arc<DispatchEngine>) -> Self {
        Self { store, dispatch }
    }

    /// Fan a freshly ingested email out into alerts. An email flagged
    /// both VIP and emergency yields two separate alerts.
    pub async fn process_new_email(&self, email: &Email, user: &User) -> DaoResult<Vec<Alert>> {
        let mut alerts = Vec::new();
        if email.is_from_vip {
            alerts.push(self.create_email_vip_alert(email, user).await?);
        }
        if email.is_emergency {
            alerts.push(self.create_emergency_email_alert(email, user).await?);
        }
        Ok(alerts)
    }

    pub async fn create_email_vip_alert(&self, email: &Email, user: &User) -> DaoResult<Alert> {
        let alert = build_vip_alert(email, owner_id(user)?);
        self.persist_and_dispatch(alert, user).await
    }

    pub async fn create_emergency_email_alert(
        &self,
        email: &Email,
        user: &User,
    ) -> DaoResult<Alert> {
        let alert = build_emergency_alert(email, owner_id(user)?);
        self.persist_and_dispatch(alert, user).await
    }

    pub async fn create_meeting_reminder_alert(
        &self,
        event: &CalendarEvent,
        user: &User,
    ) -> DaoResult<Alert> {
        let alert = build_meeting_reminder(event, owner_id(user)?, DateTime::now());
        self.persist_and_dispatch(alert, user).await
    }

    pub async fn create_morning_briefing_alert(
        &self,
        user: &User,
        briefing: String,
    ) -> DaoResult<Alert> {
        let alert = build_morning_briefing(owner_id(user)?, briefing);
        self.persist_and_dispatch(alert, user).await
    }

    async fn persist_and_dispatch(&self, alert: Alert, user: &User) -> DaoResult<Alert> {
        let persisted = self.store.insert(&alert).await?;
        info!(
            alert_type = persisted.alert_type.as_str(),
            user_id = %persisted.user_id,
            "Alert created"
        );
        self.dispatch.dispatch(&persisted, user).await
    }
}

fn owner_id(user: &User) -> DaoResult<ObjectId> {
    user.id
        .ok_or_else(|| crate::dao::base::DaoError::Validation("User has no id".to_string()))
}

fn new_alert(user_id: ObjectId, alert_type: AlertType, priority: AlertPriority) -> Alert {
    let now = DateTime::now();
    Alert {
        id: None,
        user_id,
        title: String::new(),
        message: String::new(),
        alert_type,
        priority,
        status: AlertStatus::Pending,
        email_id: None,
        calendar_event_id: None,
        send_email: false,
        send_push: false,
        send_sms: false,
        metadata: serde_json::json!({}),
        scheduled_for: None,
        sent_at: None,
        read_at: None,
        dismissed_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// VIP email: high priority, email + push.
pub fn build_vip_alert(email: &Email, user_id: ObjectId) -> Alert {
    let mut alert = new_alert(user_id, AlertType::EmailVip, AlertPriority::High);
    alert.title = format!("VIP Email from {}", email.sender_name);
    alert.message = format!(
        "You received an important email from {}: {}",
        email.sender_name, email.subject
    );
    alert.email_id = email.id;
    alert.send_email = true;
    alert.send_push = true;
    alert.metadata = serde_json::json!({
        "sender_email": email.sender_email,
        "subject": email.subject,
        "summary": email.summary,
    });
    alert
}

/// Emergency email: urgent priority, every channel.
pub fn build_emergency_alert(email: &Email, user_id: ObjectId) -> Alert {
    let mut alert = new_alert(user_id, AlertType::EmailEmergency, AlertPriority::Urgent);
    alert.title = format!("URGENT: Emergency Email from {}", email.sender_name);
    alert.message = format!(
        "URGENT EMAIL DETECTED from {}: {}. Immediate attention required.",
        email.sender_name, email.subject
    );
    alert.email_id = email.id;
    alert.send_email = true;
    alert.send_push = true;
    alert.send_sms = true;
    alert.metadata = serde_json::json!({
        "sender_email": email.sender_email,
        "subject": email.subject,
        "summary": email.summary,
        "emergency_detected": true,
    });
    alert
}

/// Meeting reminder: normal priority, push only.
pub fn build_meeting_reminder(event: &CalendarEvent, user_id: ObjectId, now: DateTime) -> Alert {
    let minutes_until =
        (event.start_at.timestamp_millis() - now.timestamp_millis()) / 60_000;

    let mut alert = new_alert(user_id, AlertType::MeetingReminder, AlertPriority::Normal);
    alert.title = format!("Meeting Reminder: {}", event.title);
    alert.message = format!(
        "Your meeting '{}' starts in {} minutes.",
        event.title, minutes_until
    );
    alert.calendar_event_id = event.id;
    alert.send_push = true;
    alert.metadata = serde_json::json!({
        "meeting_title": event.title,
        "meeting_link": event.meeting_link,
        "location": event.location,
        "minutes_until": minutes_until,
        "preparation_notes": event.preparation_notes,
    });
    alert
}

/// Morning briefing: normal priority, email + push, no source link.
pub fn build_morning_briefing(user_id: ObjectId, briefing: String) -> Alert {
    let mut alert = new_alert(user_id, AlertType::MorningBriefing, AlertPriority::Normal);
    alert.title = "Your Daily Morning Briefing".to_string();
    alert.message = briefing;
    alert.send_email = true;
    alert.send_push = true;
    alert.metadata = serde_json::json!({
        "briefing_type": "daily",
        "generated_at": alert.created_at.try_to_rfc3339_string().unwrap_or_default(),
    });
    alert
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::channel::NotificationChannel;
    use crate::test_support::{
        MemoryAlertStore, RecordingChannel, test_email, test_event, test_user,
    };

    fn factory(store: Arc<MemoryAlertStore>) -> AlertFactory {
        let channels: Vec<Arc<dyn NotificationChannel>> =
            vec![Arc::new(RecordingChannel::new("push"))];
        let dispatch = Arc::new(DispatchEngine::new(store.clone(), channels));
        AlertFactory::new(store, dispatch)
    }

    #[test]
    fn vip_recipe_selects_email_and_push() {
        let user_id = ObjectId::new();
        let alert = build_vip_alert(&test_email(true, false), user_id);

        assert_eq!(alert.alert_type, AlertType::EmailVip);
        assert_eq!(alert.priority, AlertPriority::High);
        assert!(alert.send_email && alert.send_push && !alert.send_sms);
        assert!(alert.email_id.is_some());
        assert!(alert.links_valid());
        assert_eq!(alert.metadata["subject"].as_str(), Some("Quarterly review"));
    }

    #[test]
    fn emergency_recipe_selects_all_three_channels() {
        let alert = build_emergency_alert(&test_email(false, true), ObjectId::new());

        assert_eq!(alert.alert_type, AlertType::EmailEmergency);
        assert_eq!(alert.priority, AlertPriority::Urgent);
        assert!(alert.send_email && alert.send_push && alert.send_sms);
        assert_eq!(alert.metadata["emergency_detected"], true);
    }

    #[test]
    fn reminder_recipe_is_push_only_with_event_link() {
        let now = DateTime::now();
        let event = test_event(10);
        let alert = build_meeting_reminder(&event, ObjectId::new(), now);

        assert_eq!(alert.alert_type, AlertType::MeetingReminder);
        assert_eq!(alert.priority, AlertPriority::Normal);
        assert!(!alert.send_email && alert.send_push && !alert.send_sms);
        assert!(alert.calendar_event_id.is_some());
        assert!(alert.email_id.is_none());
        let minutes = alert.metadata["minutes_until"].as_i64().unwrap();
        assert!((9..=10).contains(&minutes));
    }

    #[test]
    fn briefing_recipe_links_nothing() {
        let alert = build_morning_briefing(ObjectId::new(), "Good morning".into());

        assert_eq!(alert.alert_type, AlertType::MorningBriefing);
        assert!(alert.send_email && alert.send_push && !alert.send_sms);
        assert!(alert.email_id.is_none() && alert.calendar_event_id.is_none());
        assert!(alert.links_valid());
    }

    #[tokio::test]
    async fn doubly_flagged_email_yields_two_alerts() {
        let store = Arc::new(MemoryAlertStore::new());
        let factory = factory(store.clone());
        let user = test_user();

        let mut email = test_email(true, true);
        email.user_id = user.id.unwrap();

        let alerts = factory.process_new_email(&email, &user).await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].alert_type, AlertType::EmailVip);
        assert_eq!(alerts[1].alert_type, AlertType::EmailEmergency);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn create_dispatches_synchronously() {
        let store = Arc::new(MemoryAlertStore::new());
        let factory = factory(store.clone());
        let user = test_user();

        let mut email = test_email(true, false);
        email.user_id = user.id.unwrap();

        let alert = factory.create_email_vip_alert(&email, &user).await.unwrap();
        // Already sent when the factory call returns.
        assert!(alert.sent_at.is_some());
    }

    #[tokio::test]
    async fn persistence_failure_propagates_to_the_caller() {
        let store = Arc::new(MemoryAlertStore::failing_inserts());
        let factory = factory(store.clone());
        let user = test_user();

        let mut email = test_email(true, false);
        email.user_id = user.id.unwrap();

        let result = factory.create_email_vip_alert(&email, &user).await;
        assert!(result.is_err());
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn unflagged_email_yields_nothing() {
        let store = Arc::new(MemoryAlertStore::new());
        let factory = factory(store.clone());
        let user = test_user();

        let mut email = test_email(false, false);
        email.user_id = user.id.unwrap();

        let alerts = factory.process_new_email(&email, &user).await.unwrap();
        assert!(alerts.is_empty());
        assert_eq!(store.len(), 0);
    }
}
