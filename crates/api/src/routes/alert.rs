use axum::{
    Json,
    extract::{Path, Query, State},
};
use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

use adjutant_db::models::{Alert, AlertStatus, AlertType};
use adjutant_services::dao::alert::{AlertStats, AlertStore};
use adjutant_services::dao::base::PaginationParams;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub id: String,
    pub title: String,
    pub message: String,
    pub alert_type: AlertType,
    pub priority: String,
    pub status: AlertStatus,
    pub metadata: serde_json::Value,
    pub created_at: String,
    pub sent_at: Option<String>,
    pub read_at: Option<String>,
    pub dismissed_at: Option<String>,
}

impl From<Alert> for AlertResponse {
    fn from(alert: Alert) -> Self {
        Self {
            id: alert.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: alert.title,
            message: alert.message,
            alert_type: alert.alert_type,
            priority: format!("{:?}", alert.priority).to_lowercase(),
            status: alert.status,
            metadata: alert.metadata,
            created_at: rfc3339(Some(alert.created_at)).unwrap_or_default(),
            sent_at: rfc3339(alert.sent_at),
            read_at: rfc3339(alert.read_at),
            dismissed_at: rfc3339(alert.dismissed_at),
        }
    }
}

fn rfc3339(value: Option<DateTime>) -> Option<String> {
    value.and_then(|dt| dt.try_to_rfc3339_string().ok())
}

/// Unknown `alert_type`/`status` values are rejected by serde before the
/// handler runs.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub alert_type: Option<AlertType>,
    pub status: Option<AlertStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl ListQuery {
    fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let result = state
        .alerts
        .find_filtered(
            auth.user_id,
            query.alert_type,
            query.status,
            &query.pagination(),
        )
        .await?;

    let items: Vec<AlertResponse> = result.items.into_iter().map(Into::into).collect();

    Ok(Json(serde_json::json!({
        "items": items,
        "total": result.total,
        "page": result.page,
        "per_page": result.per_page,
        "total_pages": result.total_pages,
    })))
}

pub async fn unread(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<AlertResponse>>, ApiError> {
    let alerts = state.alerts.find_unread(auth.user_id).await?;
    Ok(Json(alerts.into_iter().map(Into::into).collect()))
}

pub async fn stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<AlertStats>, ApiError> {
    Ok(Json(state.alerts.stats(auth.user_id).await?))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(alert_id): Path<String>,
) -> Result<Json<AlertResponse>, ApiError> {
    let alert_oid = parse_id(&alert_id)?;
    let alert = state.alerts.find_for_user(auth.user_id, alert_oid).await?;
    Ok(Json(alert.into()))
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(alert_id): Path<String>,
) -> Result<Json<AlertResponse>, ApiError> {
    let alert_oid = parse_id(&alert_id)?;
    // A false return means the alert was already in a terminal state;
    // the refreshed record is returned either way.
    state
        .alerts
        .mark_read(auth.user_id, alert_oid, DateTime::now())
        .await?;
    let alert = state.alerts.find_for_user(auth.user_id, alert_oid).await?;
    Ok(Json(alert.into()))
}

pub async fn dismiss(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(alert_id): Path<String>,
) -> Result<Json<AlertResponse>, ApiError> {
    let alert_oid = parse_id(&alert_id)?;
    state
        .alerts
        .dismiss(auth.user_id, alert_oid, DateTime::now())
        .await?;
    let alert = state.alerts.find_for_user(auth.user_id, alert_oid).await?;
    Ok(Json(alert.into()))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let updated = state
        .alerts
        .mark_all_read(auth.user_id, DateTime::now())
        .await?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}

fn parse_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::BadRequest("Invalid alert id".to_string()))
}
