use std::sync::Arc;

use bson::DateTime;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, info, warn};

use adjutant_config::GoogleSettings;
use adjutant_db::models::{CalendarEvent, User};

use crate::assistant::AssistantService;
use crate::dao::base::DaoError;
use crate::dao::calendar_event::CalendarEventDao;
use crate::dao::user::UserDao;

const EVENTS_URL: &str = "https://www.googleapis.com/calendar/v3/calendars/primary/events";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("User has no calendar account connected")]
    NoCalendarAccount,
    #[error("Calendar request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),
    #[error("Calendar API error: {0}")]
    Api(String),
    #[error(transparent)]
    Dao(#[from] DaoError),
}

/// Calendar collaborator. Mirrors the user's primary Google calendar
/// into local `CalendarEvent` documents and answers the reminder-window
/// queries the scheduler runs against them.
pub struct CalendarService {
    events: Arc<CalendarEventDao>,
    users: Arc<UserDao>,
    assistant: Arc<AssistantService>,
    client: Client,
    google: GoogleSettings,
}

impl CalendarService {
    pub fn new(
        events: Arc<CalendarEventDao>,
        users: Arc<UserDao>,
        assistant: Arc<AssistantService>,
        google: GoogleSettings,
    ) -> Self {
        Self {
            events,
            users,
            assistant,
            client: Client::new(),
            google,
        }
    }

    /// Pull events for the next `days_ahead` days and upsert them by
    /// upstream event id. Returns the events that were new this sync.
    pub async fn sync_events(
        &self,
        user: &User,
        days_ahead: i64,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let access_token = user
            .google_access_token
            .as_deref()
            .ok_or(CalendarError::NoCalendarAccount)?;

        let now = Utc::now();
        let time_min = now.to_rfc3339();
        let time_max = (now + chrono::Duration::days(days_ahead)).to_rfc3339();

        let mut response = self
            .list_events(access_token, &time_min, &time_max)
            .await?;

        // Access token expired: refresh once and retry.
        if response.status() == StatusCode::UNAUTHORIZED {
            let refreshed = self.refresh_access_token(user).await?;
            response = self.list_events(&refreshed, &time_min, &time_max).await?;
        }

        if !response.status().is_success() {
            return Err(CalendarError::Api(format!(
                "events list returned {}",
                response.status()
            )));
        }

        let json: serde_json::Value = response.json().await?;
        let items = json["items"].as_array().cloned().unwrap_or_default();

        let mut new_events = Vec::new();
        for item in &items {
            match self.upsert_event(item, user).await {
                Ok(Some(event)) => new_events.push(event),
                Ok(None) => {}
                Err(error) => {
                    warn!(%error, "Failed to store calendar event, skipping");
                }
            }
        }

        if !new_events.is_empty() {
            info!(count = new_events.len(), "Synced new calendar events");
        }
        Ok(new_events)
    }

    async fn list_events(
        &self,
        access_token: &str,
        time_min: &str,
        time_max: &str,
    ) -> Result<reqwest::Response, CalendarError> {
        Ok(self
            .client
            .get(EVENTS_URL)
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", time_min),
                ("timeMax", time_max),
                ("maxResults", "50"),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await?)
    }

    /// Exchange the stored refresh token for a new access token and
    /// persist it on the user.
    async fn refresh_access_token(&self, user: &User) -> Result<String, CalendarError> {
        let refresh_token = user
            .google_refresh_token
            .as_deref()
            .ok_or(CalendarError::NoCalendarAccount)?;

        let resp = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.google.client_id.as_str()),
                ("client_secret", self.google.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let json: serde_json::Value = resp.json().await?;
        let access_token = json["access_token"]
            .as_str()
            .ok_or_else(|| CalendarError::TokenRefresh(json.to_string()))?
            .to_string();

        if let Some(user_id) = user.id {
            self.users
                .update_google_tokens(user_id, access_token.clone(), None)
                .await?;
        }

        debug!("Refreshed Google access token");
        Ok(access_token)
    }

    /// Store one upstream event unless it is already known. Returns the
    /// stored event only when it was new.
    async fn upsert_event(
        &self,
        item: &serde_json::Value,
        user: &User,
    ) -> Result<Option<CalendarEvent>, CalendarError> {
        let Some(google_event_id) = item["id"].as_str() else {
            return Ok(None);
        };

        if self.events.find_by_google_id(google_event_id).await?.is_some() {
            return Ok(None);
        }

        let title = item["summary"].as_str().unwrap_or("Untitled Event").to_string();
        let description = item["description"].as_str().map(|s| s.to_string());
        let location = item["location"].as_str().map(|s| s.to_string());

        let is_all_day = item["start"]["date"].is_string();
        let Some(start_at) = parse_event_time(&item["start"]) else {
            return Ok(None);
        };
        let end_at = parse_event_time(&item["end"]).unwrap_or(start_at);

        let organizer_email = item["organizer"]["email"].as_str().map(|s| s.to_string());
        let attendees = item["attendees"].clone();

        let (meeting_link, meeting_platform) = item["conferenceData"]["entryPoints"]
            .as_array()
            .and_then(|points| {
                points
                    .iter()
                    .find(|p| p["entryPointType"].as_str() == Some("video"))
            })
            .and_then(|p| p["uri"].as_str())
            .map(|uri| (Some(uri.to_string()), Some("google_meet".to_string())))
            .unwrap_or((None, None));

        // Advisory annotations, tolerant of the assistant being down.
        let summary = self
            .assistant
            .summarize_email(&title, description.as_deref().unwrap_or("Meeting scheduled"))
            .await
            .ok();
        let preparation_notes = match &description {
            Some(desc) => self
                .assistant
                .meeting_preparation_notes(&title, desc)
                .await
                .ok(),
            None => None,
        };

        let now = DateTime::now();
        let event = CalendarEvent {
            id: None,
            user_id: user.id.ok_or(DaoError::NotFound)?,
            google_event_id: google_event_id.to_string(),
            calendar_id: "primary".to_string(),
            title,
            description,
            location,
            start_at,
            end_at,
            is_all_day,
            organizer_email,
            attendees: if attendees.is_null() {
                serde_json::json!([])
            } else {
                attendees
            },
            meeting_link,
            meeting_platform,
            summary,
            preparation_notes,
            reminder_sent: false,
            reminder_minutes_before: 15,
            status: item["status"].as_str().unwrap_or("confirmed").to_string(),
            created_at: now,
            updated_at: now,
        };

        Ok(Some(self.events.insert(&event).await?))
    }

    /// Events starting within the next `hours` for one user.
    pub async fn upcoming(
        &self,
        user_id: bson::oid::ObjectId,
        hours: i64,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        Ok(self.events.find_upcoming(user_id, hours).await?)
    }

    /// Events whose reminder window has opened and which have not been
    /// reminded about yet, across all users.
    pub async fn events_needing_reminder(&self) -> Result<Vec<CalendarEvent>, CalendarError> {
        Ok(self.events.find_needing_reminder().await?)
    }

    pub async fn mark_reminder_sent(&self, event: &CalendarEvent) -> Result<(), CalendarError> {
        if let Some(event_id) = event.id {
            self.events.mark_reminder_sent(event_id).await?;
        }
        Ok(())
    }
}

/// Google event times come as either RFC 3339 `dateTime` or a bare
/// all-day `date`.
fn parse_event_time(value: &serde_json::Value) -> Option<DateTime> {
    if let Some(datetime) = value["dateTime"].as_str() {
        let parsed = chrono::DateTime::parse_from_rfc3339(datetime).ok()?;
        return Some(DateTime::from_millis(parsed.timestamp_millis()));
    }
    if let Some(date) = value["date"].as_str() {
        let parsed = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
        let midnight = parsed.and_hms_opt(0, 0, 0)?.and_utc();
        return Some(DateTime::from_millis(midnight.timestamp_millis()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_event_time() {
        let value = serde_json::json!({ "dateTime": "2026-03-01T09:30:00+01:00" });
        let parsed = parse_event_time(&value).unwrap();
        assert_eq!(parsed.timestamp_millis() % 1000, 0);
    }

    #[test]
    fn parses_all_day_date() {
        let value = serde_json::json!({ "date": "2026-03-01" });
        assert!(parse_event_time(&value).is_some());
    }

    #[test]
    fn missing_time_yields_none() {
        assert!(parse_event_time(&serde_json::json!({})).is_none());
    }
}
