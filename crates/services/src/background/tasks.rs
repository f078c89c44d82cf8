use std::sync::Arc;
use std::time::Duration;

use bson::DateTime;
use chrono::{Local, Timelike};
use tracing::{info, warn};

use adjutant_config::SchedulerSettings;
use adjutant_db::models::User;

use crate::assistant::{AssistantService, EmailDigest, EventDigest, fallback_briefing};
use crate::calendar::CalendarService;
use crate::dao::alert::AlertStore;
use crate::dao::email::EmailDao;
use crate::dao::user::UserDao;
use crate::mail::MailService;
use crate::notify::dispatch::DispatchEngine;
use crate::notify::factory::AlertFactory;

use super::scheduler::{Cadence, Scheduler, parse_briefing_time};

/// Everything the producer tasks need, shared across registrations.
pub struct TaskContext {
    pub users: Arc<UserDao>,
    pub emails: Arc<EmailDao>,
    pub alerts: Arc<dyn AlertStore>,
    pub mail: Arc<MailService>,
    pub calendar: Arc<CalendarService>,
    pub assistant: Arc<AssistantService>,
    pub factory: Arc<AlertFactory>,
    pub dispatch: Arc<DispatchEngine>,
}

/// Register the five producer tasks in their fixed order: mail scan,
/// calendar sync, reminder scan, daily briefing, pending sweep.
pub fn register_tasks(
    scheduler: &mut Scheduler,
    ctx: Arc<TaskContext>,
    settings: &SchedulerSettings,
) {
    let mail_ctx = ctx.clone();
    scheduler.register(
        "mail-scan",
        Cadence::Every(Duration::from_secs(settings.mail_scan_secs)),
        move || check_new_mail(mail_ctx.clone()),
    );

    let calendar_ctx = ctx.clone();
    scheduler.register(
        "calendar-sync",
        Cadence::Every(Duration::from_secs(settings.calendar_sync_secs)),
        move || sync_calendars(calendar_ctx.clone()),
    );

    let reminder_ctx = ctx.clone();
    scheduler.register(
        "reminder-scan",
        Cadence::Every(Duration::from_secs(settings.reminder_scan_secs)),
        move || send_meeting_reminders(reminder_ctx.clone()),
    );

    let briefing_ctx = ctx.clone();
    scheduler.register(
        "daily-briefing",
        Cadence::Daily(parse_briefing_time(&settings.briefing_time)),
        move || send_morning_briefings(briefing_ctx.clone()),
    );

    let sweep_ctx = ctx;
    scheduler.register(
        "pending-sweep",
        Cadence::Every(Duration::from_secs(settings.pending_sweep_secs)),
        move || sweep_pending_alerts(sweep_ctx.clone()),
    );
}

/// Poll every active mail account for unseen messages and fan the
/// flagged ones out into alerts. One user's unreachable mail server
/// never affects the rest of the batch.
async fn check_new_mail(ctx: Arc<TaskContext>) -> anyhow::Result<()> {
    let users = ctx.users.find_active().await?;

    for user in users.iter().filter(|u| u.has_mail_account()) {
        let new_emails = match ctx.mail.fetch_new(user).await {
            Ok(emails) => emails,
            Err(error) => {
                warn!(user_id = ?user.id, %error, "Mail fetch failed, skipping user");
                continue;
            }
        };

        let mut created = 0;
        for email in &new_emails {
            match ctx.factory.process_new_email(email, user).await {
                Ok(alerts) => created += alerts.len(),
                Err(error) => {
                    warn!(
                        user_id = ?user.id,
                        email_id = ?email.id,
                        %error,
                        "Alert creation failed for email, continuing"
                    );
                }
            }
        }

        if !new_emails.is_empty() {
            info!(
                user_id = ?user.id,
                emails = new_emails.len(),
                alerts = created,
                "Processed new mail"
            );
        }
    }

    Ok(())
}

/// Mirror each connected user's calendar into local events.
async fn sync_calendars(ctx: Arc<TaskContext>) -> anyhow::Result<()> {
    let users = ctx.users.find_active().await?;

    for user in users.iter().filter(|u| u.has_calendar_account()) {
        match ctx.calendar.sync_events(user, 7).await {
            Ok(events) if !events.is_empty() => {
                info!(user_id = ?user.id, count = events.len(), "Calendar synced");
            }
            Ok(_) => {}
            Err(error) => {
                warn!(user_id = ?user.id, %error, "Calendar sync failed, skipping user");
            }
        }
    }

    Ok(())
}

/// Raise a reminder alert for every event whose reminder window opened,
/// then mark the event so it never reminds twice.
async fn send_meeting_reminders(ctx: Arc<TaskContext>) -> anyhow::Result<()> {
    let events = ctx.calendar.events_needing_reminder().await?;
    let mut sent = 0;

    for event in &events {
        let user = match ctx.users.base.find_by_id(event.user_id).await {
            Ok(user) => user,
            Err(error) => {
                warn!(event_id = ?event.id, %error, "Owner lookup failed, skipping event");
                continue;
            }
        };

        if let Err(error) = ctx.factory.create_meeting_reminder_alert(event, &user).await {
            warn!(event_id = ?event.id, %error, "Reminder alert failed, skipping event");
            continue;
        }
        if let Err(error) = ctx.calendar.mark_reminder_sent(event).await {
            warn!(event_id = ?event.id, %error, "Could not mark reminder sent");
        }
        sent += 1;
    }

    if sent > 0 {
        info!(count = sent, "Sent meeting reminders");
    }
    Ok(())
}

/// Build and deliver the daily briefing for every user whose configured
/// briefing time matches the current minute, at most once per day.
async fn send_morning_briefings(ctx: Arc<TaskContext>) -> anyhow::Result<()> {
    let users = ctx.users.find_active().await?;
    let now = Local::now();
    let current_hhmm = format!("{:02}:{:02}", now.hour(), now.minute());
    let midnight = today_start();

    for user in &users {
        if user.briefing_time != current_hhmm {
            continue;
        }

        let user_id = match user.id {
            Some(id) => id,
            None => continue,
        };

        match ctx.alerts.briefing_exists_since(user_id, midnight).await {
            Ok(true) => continue,
            Ok(false) => {}
            Err(error) => {
                warn!(user_id = %user_id, %error, "Briefing guard query failed, skipping user");
                continue;
            }
        }

        let briefing = generate_briefing(&ctx, user).await;
        if let Err(error) = ctx.factory.create_morning_briefing_alert(user, briefing).await {
            warn!(user_id = %user_id, %error, "Briefing alert failed, skipping user");
            continue;
        }
        info!(user_id = %user_id, "Morning briefing sent");
    }

    Ok(())
}

/// Compose the briefing from the last day's notable mail and the next
/// day's events; degrade to static text when the assistant is down.
async fn generate_briefing(ctx: &TaskContext, user: &User) -> String {
    let Some(user_id) = user.id else {
        return fallback_briefing();
    };

    let yesterday = DateTime::from_millis(DateTime::now().timestamp_millis() - 24 * 3600 * 1000);
    let emails = match ctx.emails.find_recent_notable(user_id, yesterday, 10).await {
        Ok(emails) => emails,
        Err(error) => {
            warn!(user_id = %user_id, %error, "Briefing email query failed");
            return fallback_briefing();
        }
    };
    let events = match ctx.calendar.upcoming(user_id, 24).await {
        Ok(events) => events,
        Err(error) => {
            warn!(user_id = %user_id, %error, "Briefing event query failed");
            return fallback_briefing();
        }
    };

    let email_digests: Vec<EmailDigest> = emails
        .iter()
        .map(|e| EmailDigest {
            sender_name: e.sender_name.clone(),
            subject: e.subject.clone(),
            summary: e.summary.clone().unwrap_or_else(|| e.subject.clone()),
            is_emergency: e.is_emergency,
            is_from_vip: e.is_from_vip,
        })
        .collect();
    let event_digests: Vec<EventDigest> = events
        .iter()
        .map(|e| EventDigest {
            title: e.title.clone(),
            start_time: e
                .start_at
                .try_to_rfc3339_string()
                .unwrap_or_default(),
            location: e.location.clone().unwrap_or_else(|| "Not specified".to_string()),
        })
        .collect();

    match ctx
        .assistant
        .generate_briefing(&email_digests, &event_digests)
        .await
    {
        Ok(briefing) => briefing,
        Err(error) => {
            warn!(user_id = %user_id, %error, "Briefing generation failed, using fallback");
            fallback_briefing()
        }
    }
}

/// Re-dispatch every alert stuck in `pending` whose `scheduled_for` has
/// elapsed. Dispatch itself keeps `sent_at` idempotent.
async fn sweep_pending_alerts(ctx: Arc<TaskContext>) -> anyhow::Result<()> {
    let due = ctx.alerts.find_due_pending(DateTime::now()).await?;
    let mut swept = 0;

    for alert in &due {
        let user = match ctx.users.base.find_by_id(alert.user_id).await {
            Ok(user) => user,
            Err(error) => {
                warn!(alert_id = ?alert.id, %error, "Owner lookup failed, skipping alert");
                continue;
            }
        };
        match ctx.dispatch.dispatch(alert, &user).await {
            Ok(_) => swept += 1,
            Err(error) => {
                warn!(alert_id = ?alert.id, %error, "Sweep dispatch failed, skipping alert");
            }
        }
    }

    if swept > 0 {
        info!(count = swept, "Swept pending alerts");
    }
    Ok(())
}

fn today_start() -> DateTime {
    let midnight = Local::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_local_timezone(Local)
        .single()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| DateTime::now().timestamp_millis() - 24 * 3600 * 1000);
    DateTime::from_millis(midnight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryAlertStore, alert_of_type, test_user};
    use adjutant_db::models::AlertType;
    use bson::oid::ObjectId;

    #[tokio::test]
    async fn briefing_guard_blocks_second_run_same_day() {
        let store = MemoryAlertStore::new();
        let user = test_user();
        let user_id = user.id.unwrap();

        let midnight = today_start();
        assert!(!store.briefing_exists_since(user_id, midnight).await.unwrap());

        let mut briefing = alert_of_type(AlertType::MorningBriefing);
        briefing.user_id = user_id;
        store.push_raw(briefing);

        assert!(store.briefing_exists_since(user_id, midnight).await.unwrap());
        // A different user remains unguarded.
        assert!(
            !store
                .briefing_exists_since(ObjectId::new(), midnight)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn sweep_query_only_returns_due_pending_alerts() {
        let store = MemoryAlertStore::new();
        let now = DateTime::now();

        // Due: pending with no schedule.
        store.push_raw(alert_of_type(AlertType::System));
        // Due: pending whose schedule elapsed.
        let mut scheduled = alert_of_type(AlertType::System);
        scheduled.scheduled_for = Some(DateTime::from_millis(now.timestamp_millis() - 1000));
        store.push_raw(scheduled);
        // Not due: scheduled in the future.
        let mut future = alert_of_type(AlertType::System);
        future.scheduled_for = Some(DateTime::from_millis(now.timestamp_millis() + 3_600_000));
        store.push_raw(future);
        // Not due: already sent.
        let mut sent = alert_of_type(AlertType::System);
        sent.status = adjutant_db::models::AlertStatus::Sent;
        sent.sent_at = Some(now);
        store.push_raw(sent);

        let due = store.find_due_pending(now).await.unwrap();
        assert_eq!(due.len(), 2);
    }
}
