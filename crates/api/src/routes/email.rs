use axum::{
    Json,
    extract::{Path, Query, State},
};
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use adjutant_db::models::{Email, EmailStatus};
use adjutant_services::dao::base::PaginationParams;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Serialize)]
pub struct EmailResponse {
    pub id: String,
    pub sender_email: String,
    pub sender_name: String,
    pub subject: String,
    pub status: EmailStatus,
    pub priority: String,
    pub is_emergency: bool,
    pub is_from_vip: bool,
    pub summary: Option<String>,
    pub suggested_reply: Option<String>,
    pub received_at: String,
}

impl From<Email> for EmailResponse {
    fn from(email: Email) -> Self {
        Self {
            id: email.id.map(|id| id.to_hex()).unwrap_or_default(),
            sender_email: email.sender_email,
            sender_name: email.sender_name,
            subject: email.subject,
            status: email.status,
            priority: format!("{:?}", email.priority).to_lowercase(),
            is_emergency: email.is_emergency,
            is_from_vip: email.is_from_vip,
            summary: email.summary,
            suggested_reply: email.suggested_reply,
            received_at: email
                .received_at
                .try_to_rfc3339_string()
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<EmailStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let defaults = PaginationParams::default();
    let pagination = PaginationParams {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
    };
    let result = state
        .emails
        .find_filtered(auth.user_id, query.status, &pagination)
        .await?;

    let items: Vec<EmailResponse> = result.items.into_iter().map(Into::into).collect();

    Ok(Json(serde_json::json!({
        "items": items,
        "total": result.total,
        "page": result.page,
        "per_page": result.per_page,
        "total_pages": result.total_pages,
    })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(email_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email_oid = ObjectId::parse_str(&email_id)
        .map_err(|_| ApiError::BadRequest("Invalid email id".to_string()))?;

    let updated = state.emails.mark_read(auth.user_id, email_oid).await?;
    if !updated {
        return Err(ApiError::NotFound("Email not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Email marked as read" })))
}
