use async_trait::async_trait;
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, URL_SAFE_NO_PAD,
    VapidSignatureBuilder, WebPushClient, WebPushMessageBuilder,
};

use adjutant_config::PushSettings;
use adjutant_db::models::{Alert, User};

use super::channel::{ChannelError, NotificationChannel};

/// Web-push delivery to every subscription the user has registered.
/// A user without subscriptions is not an error; a missing VAPID key is.
pub struct PushChannel {
    settings: PushSettings,
}

impl PushChannel {
    pub fn new(settings: PushSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl NotificationChannel for PushChannel {
    fn name(&self) -> &'static str {
        "push"
    }

    fn enabled_for(&self, alert: &Alert) -> bool {
        alert.send_push
    }

    async fn send(&self, user: &User, alert: &Alert) -> Result<(), ChannelError> {
        let private_key = self
            .settings
            .vapid_private_key
            .as_deref()
            .ok_or(ChannelError::NotConfigured("push"))?;

        if user.push_subscriptions.is_empty() {
            return Ok(());
        }

        let payload = serde_json::json!({
            "title": alert.title,
            "message": alert.message,
            "alert_type": alert.alert_type,
            "priority": alert.priority,
        })
        .to_string();

        let client = IsahcWebPushClient::new()?;

        for subscription in &user.push_subscriptions {
            let info = SubscriptionInfo::new(
                subscription.endpoint.clone(),
                subscription.p256dh.clone(),
                subscription.auth.clone(),
            );

            let mut signature =
                VapidSignatureBuilder::from_base64(private_key, URL_SAFE_NO_PAD, &info)?;
            signature.add_claim("sub", self.settings.vapid_subject.as_str());

            let mut builder = WebPushMessageBuilder::new(&info);
            builder.set_payload(ContentEncoding::Aes128Gcm, payload.as_bytes());
            builder.set_vapid_signature(signature.build()?);

            client.send(builder.build()?).await?;
        }

        Ok(())
    }
}
