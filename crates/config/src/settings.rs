use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub claude: ClaudeSettings,
    pub push: PushSettings,
    pub sms: SmsSettings,
    pub scheduler: SchedulerSettings,
    pub google: GoogleSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    pub issuer: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClaudeSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
}

/// VAPID keys for web-push delivery. Push is a no-op for a user with no
/// stored subscriptions, and disabled entirely when the private key is
/// absent.
#[derive(Debug, Deserialize, Clone)]
pub struct PushSettings {
    pub vapid_subject: String,
    pub vapid_private_key: Option<String>,
}

/// Outbound SMS gateway (Twilio-compatible REST endpoint). SMS is
/// disabled when no gateway URL is configured.
#[derive(Debug, Deserialize, Clone)]
pub struct SmsSettings {
    pub gateway_url: Option<String>,
    pub api_key: Option<String>,
    pub from_number: Option<String>,
}

/// Google OAuth client used to refresh calendar access tokens.
#[derive(Debug, Deserialize, Clone)]
pub struct GoogleSettings {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerSettings {
    pub mail_scan_secs: u64,
    pub calendar_sync_secs: u64,
    pub reminder_scan_secs: u64,
    pub pending_sweep_secs: u64,
    /// Wall-clock time ("HH:MM") at which the daily briefing scan fires.
    pub briefing_time: String,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("ADJUTANT"),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 3000)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("database.url", "mongodb://localhost:27017")?
            .set_default("database.name", "adjutant")?
            .set_default("jwt.secret", "change-me-in-production")?
            .set_default("jwt.access_token_ttl_secs", 3600)?
            .set_default("jwt.refresh_token_ttl_secs", 604800)?
            .set_default("jwt.issuer", "adjutant")?
            .set_default("claude.model", "claude-sonnet-4-5-20250929")?
            .set_default("claude.max_tokens", 1024)?
            .set_default("push.vapid_subject", "mailto:admin@adjutant.local")?
            .set_default("push.vapid_private_key", None::<String>)?
            .set_default("sms.gateway_url", None::<String>)?
            .set_default("sms.api_key", None::<String>)?
            .set_default("sms.from_number", None::<String>)?
            .set_default("google.client_id", "")?
            .set_default("google.client_secret", "")?
            .set_default("scheduler.mail_scan_secs", 300)?
            .set_default("scheduler.calendar_sync_secs", 600)?
            .set_default("scheduler.reminder_scan_secs", 60)?
            .set_default("scheduler.pending_sweep_secs", 30)?
            .set_default("scheduler.briefing_time", "08:00")?
            .build()?;

        config.try_deserialize()
    }
}
