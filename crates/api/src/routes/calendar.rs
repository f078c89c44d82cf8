use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use adjutant_db::models::CalendarEvent;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: String,
    pub title: String,
    pub location: Option<String>,
    pub start_at: String,
    pub end_at: String,
    pub is_all_day: bool,
    pub meeting_link: Option<String>,
    pub summary: Option<String>,
    pub preparation_notes: Option<String>,
    pub reminder_sent: bool,
}

impl From<CalendarEvent> for EventResponse {
    fn from(event: CalendarEvent) -> Self {
        Self {
            id: event.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: event.title,
            location: event.location,
            start_at: event.start_at.try_to_rfc3339_string().unwrap_or_default(),
            end_at: event.end_at.try_to_rfc3339_string().unwrap_or_default(),
            is_all_day: event.is_all_day,
            meeting_link: event.meeting_link,
            summary: event.summary,
            preparation_notes: event.preparation_notes,
            reminder_sent: event.reminder_sent,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    #[serde(default = "default_hours")]
    pub hours: i64,
}

fn default_hours() -> i64 {
    24
}

pub async fn upcoming(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Vec<EventResponse>>, ApiError> {
    let hours = query.hours.clamp(1, 24 * 7);
    let events = state.events.find_upcoming(auth.user_id, hours).await?;
    Ok(Json(events.into_iter().map(Into::into).collect()))
}
