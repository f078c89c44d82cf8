use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use validator::Validate;

use adjutant_db::models::User;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub vip_senders: Vec<String>,
    pub emergency_keywords: Vec<String>,
    pub briefing_time: String,
    pub has_mail_account: bool,
    pub has_calendar_account: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            vip_senders: user.vip_senders.clone(),
            emergency_keywords: user.emergency_keywords.clone(),
            briefing_time: user.briefing_time.clone(),
            has_mail_account: user.has_mail_account(),
            has_calendar_account: user.has_calendar_account(),
        }
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let password_hash = state.auth.hash_password(&payload.password)?;
    let user = state
        .users
        .create(payload.email, payload.full_name, password_hash)
        .await?;

    let user_id = user
        .id
        .ok_or_else(|| ApiError::Internal("Created user has no id".to_string()))?;
    let tokens = state.auth.generate_tokens(user_id, &user.email)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = state
        .users
        .find_by_email(&payload.email)
        .await
        .map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    if !state
        .auth
        .verify_password(&payload.password, &user.password_hash)?
    {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let user_id = user
        .id
        .ok_or_else(|| ApiError::Internal("Stored user has no id".to_string()))?;
    let tokens = state.auth.generate_tokens(user_id, &user.email)?;

    Ok(Json(AuthResponse {
        user: user.into(),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.base.find_by_id(auth.user_id).await?;
    Ok(Json(user.into()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub vip_senders: Option<Vec<String>>,
    pub emergency_keywords: Option<Vec<String>>,
    pub briefing_time: Option<String>,
    pub phone_number: Option<String>,
}

pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if let Some(time) = &payload.briefing_time {
        if chrono::NaiveTime::parse_from_str(time, "%H:%M").is_err() {
            return Err(ApiError::BadRequest(
                "briefing_time must be HH:MM".to_string(),
            ));
        }
    }

    state
        .users
        .update_settings(
            auth.user_id,
            payload.vip_senders,
            payload.emergency_keywords,
            payload.briefing_time,
            payload.phone_number,
        )
        .await?;

    let user = state.users.base.find_by_id(auth.user_id).await?;
    Ok(Json(user.into()))
}
