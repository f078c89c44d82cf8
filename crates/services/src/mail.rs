use std::sync::Arc;

use bson::DateTime;
use futures::TryStreamExt;
use lettre::message::MultiPart;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use mail_parser::MessageParser;
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use adjutant_db::models::{Email, EmailPriority, EmailStatus, User};

use crate::assistant::AssistantService;
use crate::dao::base::DaoError;
use crate::dao::email::EmailDao;

const DEFAULT_IMAP_HOST: &str = "imap.gmail.com";
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const IMAP_PORT: u16 = 993;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("User has no mail account configured")]
    NoMailAccount,
    #[error("IMAP error: {0}")]
    Imap(#[from] async_imap::error::Error),
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("Message build error: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error(transparent)]
    Dao(#[from] DaoError),
}

/// Mail collaborator. Pulls unseen messages over IMAP, annotates and
/// flags them, persists the new ones; sends outbound mail over the
/// user's own SMTP account. The VIP/emergency flags computed here are
/// the single source of truth for the notification core.
pub struct MailService {
    emails: Arc<EmailDao>,
    assistant: Arc<AssistantService>,
}

impl MailService {
    pub fn new(emails: Arc<EmailDao>, assistant: Arc<AssistantService>) -> Self {
        Self { emails, assistant }
    }

    /// Fetch unseen messages for one user. Returns only messages not
    /// seen before (deduped by Message-ID), already flagged, annotated
    /// and persisted. A message that fails to parse is logged and
    /// skipped; the rest of the batch continues.
    pub async fn fetch_new(&self, user: &User) -> Result<Vec<Email>, MailError> {
        let (username, password) = mail_credentials(user)?;
        let host = user.imap_host.as_deref().unwrap_or(DEFAULT_IMAP_HOST);

        let tcp = TcpStream::connect((host, IMAP_PORT)).await?;
        let tls = tokio_native_tls::TlsConnector::from(
            native_tls::TlsConnector::builder().build()?,
        );
        let tls_stream = tls.connect(host, tcp).await?;

        let client = async_imap::Client::new(tls_stream);
        let mut session = client
            .login(username, password)
            .await
            .map_err(|(err, _client)| err)?;

        session.select("INBOX").await?;
        let unseen = session.search("UNSEEN").await?;

        let mut new_emails = Vec::new();
        for seq in unseen {
            let fetches: Vec<_> = session
                .fetch(seq.to_string(), "RFC822")
                .await?
                .try_collect()
                .await?;

            for fetch in fetches {
                let Some(raw) = fetch.body() else { continue };
                match self.ingest_message(raw, user).await {
                    Ok(Some(email)) => new_emails.push(email),
                    Ok(None) => {}
                    Err(error) => {
                        warn!(seq, %error, "Failed to ingest message, skipping");
                    }
                }
            }
        }

        session.logout().await?;
        Ok(new_emails)
    }

    /// Parse, dedupe, flag, annotate and persist one raw message.
    /// Returns `None` for unparseable or already-seen messages.
    async fn ingest_message(&self, raw: &[u8], user: &User) -> Result<Option<Email>, MailError> {
        let Some(parsed) = MessageParser::default().parse(raw) else {
            warn!("Unparseable message, skipping");
            return Ok(None);
        };

        let message_id = parsed
            .message_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| format!("<missing-{}>", uuid::Uuid::new_v4()));

        if self.emails.find_by_message_id(&message_id).await?.is_some() {
            debug!(%message_id, "Message already ingested");
            return Ok(None);
        }

        let (sender_name, sender_email) = parsed
            .from()
            .and_then(|addrs| addrs.first())
            .map(|addr| {
                let email = addr.address().unwrap_or_default().to_string();
                let name = addr
                    .name()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| email.clone());
                (name, email)
            })
            .unwrap_or_default();

        let recipient_email = parsed
            .to()
            .and_then(|addrs| addrs.first())
            .and_then(|addr| addr.address())
            .unwrap_or_default()
            .to_string();

        let subject = parsed.subject().unwrap_or_default().to_string();
        let body = parsed
            .body_text(0)
            .map(|text| text.to_string())
            .unwrap_or_default();
        let body_html = parsed.body_html(0).map(|html| html.to_string());

        let received_at = parsed
            .date()
            .map(|date| DateTime::from_millis(date.to_timestamp() * 1000))
            .unwrap_or_else(DateTime::now);

        let is_from_vip = is_vip_sender(&sender_email, &user.vip_senders);
        let is_emergency = contains_emergency_keyword(
            &format!("{} {}", subject, body),
            &user.emergency_keywords,
        );

        let (priority, status) = if is_emergency {
            (EmailPriority::Urgent, EmailStatus::Emergency)
        } else if is_from_vip {
            (EmailPriority::High, EmailStatus::Important)
        } else {
            (EmailPriority::Normal, EmailStatus::Unread)
        };

        // Advisory annotations; the assistant being down never blocks
        // ingestion.
        let summary = match self.assistant.summarize_email(&subject, &body).await {
            Ok(summary) => Some(summary),
            Err(error) => {
                debug!(%error, "Email summary unavailable");
                None
            }
        };
        let suggested_reply = self
            .assistant
            .draft_reply(&subject, &body, &user.assistant_tone, &user.assistant_language)
            .await
            .ok();
        let sentiment = self.assistant.analyze_sentiment(&body).await.ok();

        let now = DateTime::now();
        let email = Email {
            id: None,
            user_id: user.id.ok_or(DaoError::NotFound)?,
            message_id,
            sender_email,
            sender_name,
            recipient_email,
            subject,
            body,
            body_html,
            status,
            priority,
            is_emergency,
            is_from_vip,
            summary,
            suggested_reply,
            sentiment,
            received_at,
            processed_at: Some(now),
            created_at: now,
            updated_at: now,
        };

        Ok(Some(self.emails.insert(&email).await?))
    }

    /// Send a multipart (text + HTML) message through the user's SMTP
    /// account.
    pub async fn send_email(
        &self,
        user: &User,
        to: &str,
        subject: &str,
        text: &str,
        html: &str,
    ) -> Result<(), MailError> {
        let (username, password) = mail_credentials(user)?;
        let host = user.smtp_host.as_deref().unwrap_or(DEFAULT_SMTP_HOST);
        let port = user.smtp_port.unwrap_or(DEFAULT_SMTP_PORT);

        let message = Message::builder()
            .from(username.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(
                text.to_string(),
                html.to_string(),
            ))?;

        let mailer: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
                .port(port)
                .credentials(Credentials::new(username.to_string(), password.to_string()))
                .build();

        mailer.send(message).await?;
        debug!(%to, %subject, "Email sent");
        Ok(())
    }
}

fn mail_credentials(user: &User) -> Result<(&str, &str), MailError> {
    match (user.mail_username.as_deref(), user.mail_password.as_deref()) {
        (Some(username), Some(password)) => Ok((username, password)),
        _ => Err(MailError::NoMailAccount),
    }
}

/// Case-insensitive membership test against the user's VIP sender list.
pub fn is_vip_sender(sender_email: &str, vip_senders: &[String]) -> bool {
    vip_senders
        .iter()
        .any(|vip| vip.eq_ignore_ascii_case(sender_email))
}

/// Case-insensitive substring match against the user's emergency
/// keyword list.
pub fn contains_emergency_keyword(text: &str, keywords: &[String]) -> bool {
    let text = text.to_lowercase();
    keywords
        .iter()
        .any(|keyword| !keyword.is_empty() && text.contains(&keyword.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vip_match_is_case_insensitive() {
        let vips = vec!["Boss@Corp.com".to_string()];
        assert!(is_vip_sender("boss@corp.com", &vips));
        assert!(!is_vip_sender("intern@corp.com", &vips));
    }

    #[test]
    fn emergency_keyword_matches_inside_subject_and_body() {
        let keywords = vec!["outage".to_string(), "URGENT".to_string()];
        assert!(contains_emergency_keyword("Production OUTAGE in eu-west", &keywords));
        assert!(contains_emergency_keyword("this is urgent, call me", &keywords));
        assert!(!contains_emergency_keyword("weekly newsletter", &keywords));
    }

    #[test]
    fn empty_keyword_never_matches() {
        let keywords = vec![String::new()];
        assert!(!contains_emergency_keyword("anything", &keywords));
    }
}
