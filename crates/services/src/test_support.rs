//! Doubles shared by the notification-core and scheduler tests: an
//! in-memory `AlertStore` that mirrors the Mongo filter semantics of
//! `AlertDao`, recording/failing channels, and entity builders.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bson::{DateTime, oid::ObjectId};

use adjutant_db::models::{
    Alert, AlertPriority, AlertStatus, AlertType, CalendarEvent, Email, EmailPriority,
    EmailStatus, User,
};

use crate::dao::alert::{AlertStats, AlertStore};
use crate::dao::base::{DaoError, DaoResult, PaginatedResult, PaginationParams};
use crate::notify::channel::{ChannelError, NotificationChannel};

#[derive(Default)]
pub struct MemoryAlertStore {
    alerts: Mutex<Vec<Alert>>,
    pub fail_inserts: bool,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_inserts() -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
            fail_inserts: true,
        }
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }

    pub fn push_raw(&self, alert: Alert) -> Alert {
        let mut alerts = self.alerts.lock().unwrap();
        let mut alert = alert;
        if alert.id.is_none() {
            alert.id = Some(ObjectId::new());
        }
        alerts.push(alert.clone());
        alert
    }
}

fn unread(status: AlertStatus) -> bool {
    matches!(status, AlertStatus::Pending | AlertStatus::Sent)
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn insert(&self, alert: &Alert) -> DaoResult<Alert> {
        if self.fail_inserts {
            return Err(DaoError::Validation("insert disabled".to_string()));
        }
        let mut stored = alert.clone();
        stored.id = Some(ObjectId::new());
        self.alerts.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn find_for_user(&self, user_id: ObjectId, alert_id: ObjectId) -> DaoResult<Alert> {
        self.alerts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == Some(alert_id) && a.user_id == user_id)
            .cloned()
            .ok_or(DaoError::NotFound)
    }

    async fn find_filtered(
        &self,
        user_id: ObjectId,
        alert_type: Option<AlertType>,
        status: Option<AlertStatus>,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Alert>> {
        let (page, per_page) = params.effective();
        let mut items: Vec<Alert> = self
            .alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user_id == user_id)
            .filter(|a| alert_type.is_none_or(|t| a.alert_type == t))
            .filter(|a| status.is_none_or(|s| a.status == s))
            .cloned()
            .collect();
        items.sort_by_key(|a| std::cmp::Reverse(a.created_at));

        let total = items.len() as u64;
        let skip = ((page - 1) * per_page) as usize;
        let items: Vec<Alert> = items.into_iter().skip(skip).take(per_page as usize).collect();

        Ok(PaginatedResult {
            items,
            total,
            page,
            per_page,
            total_pages: total.div_ceil(per_page),
        })
    }

    async fn find_unread(&self, user_id: ObjectId) -> DaoResult<Vec<Alert>> {
        let mut items: Vec<Alert> = self
            .alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user_id == user_id && unread(a.status))
            .cloned()
            .collect();
        items.sort_by_key(|a| std::cmp::Reverse(a.created_at));
        Ok(items)
    }

    async fn find_due_pending(&self, now: DateTime) -> DaoResult<Vec<Alert>> {
        Ok(self
            .alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.status == AlertStatus::Pending)
            .filter(|a| a.scheduled_for.is_none_or(|at| at <= now))
            .cloned()
            .collect())
    }

    async fn transition_sent(&self, alert_id: ObjectId, now: DateTime) -> DaoResult<bool> {
        let mut alerts = self.alerts.lock().unwrap();
        let Some(alert) = alerts
            .iter_mut()
            .find(|a| a.id == Some(alert_id) && a.status == AlertStatus::Pending)
        else {
            return Ok(false);
        };
        alert.status = AlertStatus::Sent;
        alert.sent_at = Some(now);
        alert.updated_at = now;
        Ok(true)
    }

    async fn mark_read(
        &self,
        user_id: ObjectId,
        alert_id: ObjectId,
        now: DateTime,
    ) -> DaoResult<bool> {
        let mut alerts = self.alerts.lock().unwrap();
        let Some(alert) = alerts
            .iter_mut()
            .find(|a| a.id == Some(alert_id) && a.user_id == user_id && unread(a.status))
        else {
            return Ok(false);
        };
        alert.status = AlertStatus::Read;
        alert.read_at = Some(now);
        alert.updated_at = now;
        Ok(true)
    }

    async fn dismiss(
        &self,
        user_id: ObjectId,
        alert_id: ObjectId,
        now: DateTime,
    ) -> DaoResult<bool> {
        let mut alerts = self.alerts.lock().unwrap();
        let Some(alert) = alerts
            .iter_mut()
            .find(|a| a.id == Some(alert_id) && a.user_id == user_id && unread(a.status))
        else {
            return Ok(false);
        };
        alert.status = AlertStatus::Dismissed;
        alert.dismissed_at = Some(now);
        alert.updated_at = now;
        Ok(true)
    }

    async fn mark_all_read(&self, user_id: ObjectId, now: DateTime) -> DaoResult<u64> {
        let mut alerts = self.alerts.lock().unwrap();
        let mut count = 0;
        for alert in alerts
            .iter_mut()
            .filter(|a| a.user_id == user_id && unread(a.status))
        {
            alert.status = AlertStatus::Read;
            alert.read_at = Some(now);
            alert.updated_at = now;
            count += 1;
        }
        Ok(count)
    }

    async fn briefing_exists_since(&self, user_id: ObjectId, since: DateTime) -> DaoResult<bool> {
        Ok(self.alerts.lock().unwrap().iter().any(|a| {
            a.user_id == user_id
                && a.alert_type == AlertType::MorningBriefing
                && a.created_at >= since
        }))
    }

    async fn stats(&self, user_id: ObjectId) -> DaoResult<AlertStats> {
        let alerts = self.alerts.lock().unwrap();
        let mine: Vec<&Alert> = alerts.iter().filter(|a| a.user_id == user_id).collect();
        Ok(AlertStats {
            total: mine.len() as u64,
            unread: mine.iter().filter(|a| unread(a.status)).count() as u64,
            urgent_unread: mine
                .iter()
                .filter(|a| unread(a.status) && a.priority == AlertPriority::Urgent)
                .count() as u64,
            email_alerts: mine
                .iter()
                .filter(|a| {
                    matches!(a.alert_type, AlertType::EmailVip | AlertType::EmailEmergency)
                })
                .count() as u64,
            meeting_alerts: mine
                .iter()
                .filter(|a| a.alert_type == AlertType::MeetingReminder)
                .count() as u64,
        })
    }
}

/// Channel double that records every send and always succeeds.
pub struct RecordingChannel {
    name: &'static str,
    sent: AtomicUsize,
}

impl RecordingChannel {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            sent: AtomicUsize::new(0),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn name(&self) -> &'static str {
        self.name
    }

    fn enabled_for(&self, alert: &Alert) -> bool {
        match self.name {
            "email" => alert.send_email,
            "push" => alert.send_push,
            "sms" => alert.send_sms,
            _ => true,
        }
    }

    async fn send(&self, _user: &User, _alert: &Alert) -> Result<(), ChannelError> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Channel double that always fails.
pub struct FailingChannel {
    name: &'static str,
}

impl FailingChannel {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl NotificationChannel for FailingChannel {
    fn name(&self) -> &'static str {
        self.name
    }

    fn enabled_for(&self, alert: &Alert) -> bool {
        match self.name {
            "email" => alert.send_email,
            "push" => alert.send_push,
            "sms" => alert.send_sms,
            _ => true,
        }
    }

    async fn send(&self, _user: &User, _alert: &Alert) -> Result<(), ChannelError> {
        Err(ChannelError::Sms("simulated outage".to_string()))
    }
}

pub fn test_user() -> User {
    let now = DateTime::now();
    User {
        id: Some(ObjectId::new()),
        email: "alice@test.com".to_string(),
        full_name: "Alice Tester".to_string(),
        password_hash: "hash".to_string(),
        is_active: true,
        mail_username: Some("alice@test.com".to_string()),
        mail_password: Some("secret".to_string()),
        imap_host: None,
        smtp_host: None,
        smtp_port: None,
        google_access_token: None,
        google_refresh_token: None,
        assistant_tone: "professional".to_string(),
        assistant_language: "en".to_string(),
        vip_senders: vec!["boss@corp.com".to_string()],
        emergency_keywords: vec!["urgent".to_string()],
        briefing_time: "08:00".to_string(),
        push_subscriptions: Vec::new(),
        phone_number: Some("+15550100".to_string()),
        created_at: now,
        updated_at: now,
    }
}

pub fn test_email(is_from_vip: bool, is_emergency: bool) -> Email {
    let now = DateTime::now();
    Email {
        id: Some(ObjectId::new()),
        user_id: ObjectId::new(),
        message_id: format!("<{}@test>", ObjectId::new()),
        sender_email: "boss@corp.com".to_string(),
        sender_name: "The Boss".to_string(),
        recipient_email: "alice@test.com".to_string(),
        subject: "Quarterly review".to_string(),
        body: "Please review the attached numbers.".to_string(),
        body_html: None,
        status: EmailStatus::Unread,
        priority: EmailPriority::Normal,
        is_emergency,
        is_from_vip,
        summary: Some("Review the numbers.".to_string()),
        suggested_reply: None,
        sentiment: None,
        received_at: now,
        processed_at: Some(now),
        created_at: now,
        updated_at: now,
    }
}

/// Event starting `start_offset_mins` minutes from now, 15-minute
/// reminder window, no reminder sent.
pub fn test_event(start_offset_mins: i64) -> CalendarEvent {
    let now = DateTime::now();
    let start = DateTime::from_millis(now.timestamp_millis() + start_offset_mins * 60_000);
    CalendarEvent {
        id: Some(ObjectId::new()),
        user_id: ObjectId::new(),
        google_event_id: format!("evt-{}", ObjectId::new()),
        calendar_id: "primary".to_string(),
        title: "Design sync".to_string(),
        description: Some("Weekly design sync".to_string()),
        location: Some("Room 5".to_string()),
        start_at: start,
        end_at: DateTime::from_millis(start.timestamp_millis() + 30 * 60_000),
        is_all_day: false,
        organizer_email: None,
        attendees: serde_json::json!([]),
        meeting_link: Some("https://meet.example/abc".to_string()),
        meeting_platform: Some("google_meet".to_string()),
        summary: None,
        preparation_notes: Some("Bring the mockups".to_string()),
        reminder_sent: false,
        reminder_minutes_before: 15,
        status: "confirmed".to_string(),
        created_at: now,
        updated_at: now,
    }
}

pub fn alert_of_type(alert_type: AlertType) -> Alert {
    let now = DateTime::now();
    let (send_email, send_push, send_sms) = match alert_type {
        AlertType::EmailVip => (true, true, false),
        AlertType::EmailEmergency => (true, true, true),
        AlertType::MeetingReminder => (false, true, false),
        AlertType::MorningBriefing => (true, true, false),
        AlertType::System => (false, true, false),
    };
    Alert {
        id: None,
        user_id: ObjectId::new(),
        title: "Test alert".to_string(),
        message: "Something happened".to_string(),
        alert_type,
        priority: AlertPriority::Normal,
        status: AlertStatus::Pending,
        email_id: matches!(alert_type, AlertType::EmailVip | AlertType::EmailEmergency)
            .then(ObjectId::new),
        calendar_event_id: (alert_type == AlertType::MeetingReminder).then(ObjectId::new),
        send_email,
        send_push,
        send_sms,
        metadata: serde_json::json!({}),
        scheduled_for: None,
        sent_at: None,
        read_at: None,
        dismissed_at: None,
        created_at: now,
        updated_at: now,
    }
}
