use async_trait::async_trait;
use reqwest::Client;

use adjutant_config::SmsSettings;
use adjutant_db::models::{Alert, User};

use super::channel::{ChannelError, NotificationChannel};

const MAX_SMS_LEN: usize = 160;

/// Fire-and-forget delivery through a Twilio-compatible HTTP gateway.
pub struct SmsChannel {
    settings: SmsSettings,
    client: Client,
}

impl SmsChannel {
    pub fn new(settings: SmsSettings) -> Self {
        Self {
            settings,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    fn name(&self) -> &'static str {
        "sms"
    }

    fn enabled_for(&self, alert: &Alert) -> bool {
        alert.send_sms
    }

    async fn send(&self, user: &User, alert: &Alert) -> Result<(), ChannelError> {
        let gateway_url = self
            .settings
            .gateway_url
            .as_deref()
            .ok_or(ChannelError::NotConfigured("sms"))?;
        let to = user
            .phone_number
            .as_deref()
            .ok_or(ChannelError::NoRecipient("sms"))?;

        let body = serde_json::json!({
            "to": to,
            "from": self.settings.from_number,
            "body": sms_body(alert),
        });

        let mut request = self.client.post(gateway_url).json(&body);
        if let Some(api_key) = &self.settings.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChannelError::Sms(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChannelError::Sms(format!(
                "gateway returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// `title: message`, truncated to a single SMS segment.
fn sms_body(alert: &Alert) -> String {
    let full = format!("{}: {}", alert.title, alert.message);
    match full.char_indices().nth(MAX_SMS_LEN) {
        Some((idx, _)) => full[..idx].to_string(),
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::alert_of_type;
    use adjutant_db::models::AlertType;

    #[test]
    fn sms_body_is_truncated_to_one_segment() {
        let mut alert = alert_of_type(AlertType::EmailEmergency);
        alert.message = "x".repeat(400);
        assert_eq!(sms_body(&alert).chars().count(), MAX_SMS_LEN);
    }
}
