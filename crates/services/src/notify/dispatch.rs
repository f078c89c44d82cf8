use std::sync::Arc;

use bson::DateTime;
use tracing::{debug, warn};

use adjutant_db::models::{Alert, User};

use crate::dao::alert::AlertStore;
use crate::dao::base::{DaoError, DaoResult};

use super::channel::NotificationChannel;

/// Sends one alert through every channel it has enabled and advances its
/// delivery state. Channels are attempted sequentially and fail
/// independently: a failure is logged and never stops the remaining
/// channels, and the alert transitions `pending -> sent` regardless of
/// delivery outcome. Delivery is retried only by the pending sweep,
/// which calls back into this method; `sent_at` stamps only on the first
/// transition.
pub struct DispatchEngine {
    store: Arc<dyn AlertStore>,
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl DispatchEngine {
    pub fn new(store: Arc<dyn AlertStore>, channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        Self { store, channels }
    }

    pub async fn dispatch(&self, alert: &Alert, user: &User) -> DaoResult<Alert> {
        let alert_id = alert.id.ok_or(DaoError::Validation(
            "Cannot dispatch an unpersisted alert".to_string(),
        ))?;

        for channel in &self.channels {
            if !channel.enabled_for(alert) {
                continue;
            }
            match channel.send(user, alert).await {
                Ok(()) => {
                    debug!(channel = channel.name(), alert_id = %alert_id, "Alert delivered");
                }
                Err(error) => {
                    warn!(
                        channel = channel.name(),
                        alert_id = %alert_id,
                        %error,
                        "Channel delivery failed"
                    );
                }
            }
        }

        let transitioned = self.store.transition_sent(alert_id, DateTime::now()).await?;
        if transitioned {
            debug!(alert_id = %alert_id, "Alert marked sent");
        }

        self.store.find_for_user(alert.user_id, alert_id).await
    }
}
