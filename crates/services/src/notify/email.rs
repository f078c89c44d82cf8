use std::sync::Arc;

use async_trait::async_trait;

use adjutant_db::models::{Alert, AlertType, User};

use crate::mail::MailService;

use super::channel::{ChannelError, NotificationChannel};

/// Delivers an alert as a multipart email through the owning user's own
/// SMTP account.
pub struct EmailChannel {
    mailer: Arc<MailService>,
}

impl EmailChannel {
    pub fn new(mailer: Arc<MailService>) -> Self {
        Self { mailer }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    fn enabled_for(&self, alert: &Alert) -> bool {
        alert.send_email
    }

    async fn send(&self, user: &User, alert: &Alert) -> Result<(), ChannelError> {
        let subject = format!("Adjutant: {}", alert.title);
        let html = render_html(alert);
        let text = render_text(alert);

        self.mailer
            .send_email(user, &user.email, &subject, &text, &html)
            .await?;
        Ok(())
    }
}

/// Full HTML body: title, message, a type-specific detail fragment and a
/// footer.
pub fn render_html(alert: &Alert) -> String {
    format!(
        "<html>\n<body>\n<h2>{}</h2>\n<p>{}</p>\n{}\n<hr>\n\
         <p><small>This notification was sent by your Adjutant assistant.</small></p>\n\
         </body>\n</html>",
        alert.title,
        alert.message,
        render_metadata_fragment(alert),
    )
}

/// Plain-text fallback for the multipart message.
pub fn render_text(alert: &Alert) -> String {
    format!(
        "{}\n\n{}\n\n---\nThis notification was sent by your Adjutant assistant.",
        alert.title, alert.message
    )
}

/// Type-specific detail block rendered from the alert's metadata
/// payload. Email alerts show the sender/subject/summary table, meeting
/// reminders the location/link/notes block, everything else nothing.
fn render_metadata_fragment(alert: &Alert) -> String {
    let meta = &alert.metadata;
    match alert.alert_type {
        AlertType::EmailVip | AlertType::EmailEmergency => {
            format!(
                "<div style=\"background-color: #f5f5f5; padding: 10px; margin: 10px 0;\">\n\
                 <strong>Email Details:</strong><br>\n\
                 From: {}<br>\n\
                 Subject: {}<br>\n\
                 Summary: {}\n</div>",
                meta["sender_email"].as_str().unwrap_or("Unknown"),
                meta["subject"].as_str().unwrap_or("No subject"),
                meta["summary"].as_str().unwrap_or("No summary available"),
            )
        }
        AlertType::MeetingReminder => {
            let mut lines = format!(
                "Location: {}<br>\n",
                meta["location"].as_str().unwrap_or("Not specified")
            );
            if let Some(link) = meta["meeting_link"].as_str() {
                lines.push_str(&format!("Meeting Link: {}<br>\n", link));
            }
            if let Some(notes) = meta["preparation_notes"].as_str() {
                lines.push_str(&format!("Preparation Notes: {}<br>\n", notes));
            }
            format!(
                "<div style=\"background-color: #e3f2fd; padding: 10px; margin: 10px 0;\">\n\
                 <strong>Meeting Details:</strong><br>\n{}</div>",
                lines
            )
        }
        AlertType::MorningBriefing | AlertType::System => String::new(),
    }
}
