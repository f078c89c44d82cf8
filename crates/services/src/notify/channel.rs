use async_trait::async_trait;
use thiserror::Error;

use adjutant_db::models::{Alert, User};

use crate::mail::MailError;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel not configured: {0}")]
    NotConfigured(&'static str),
    #[error("No recipient for {0}")]
    NoRecipient(&'static str),
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error("Web push error: {0}")]
    Push(#[from] web_push::WebPushError),
    #[error("SMS gateway error: {0}")]
    Sms(String),
}

/// One delivery medium. Channels fail independently: the dispatcher
/// attempts every enabled channel regardless of earlier failures and
/// only ever logs the errors.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this alert opted into this channel at creation time.
    fn enabled_for(&self, alert: &Alert) -> bool;

    async fn send(&self, user: &User, alert: &Alert) -> Result<(), ChannelError>;
}
