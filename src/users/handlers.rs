use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::services::{hash_password, verify_password},
    auth::AuthUser,
    error::ApiError,
    games::stats::compute_stats,
    state::AppState,
    users::dto::{
        ChangePasswordRequest, DeleteAccountRequest, MessageResponse, ProfileResponse,
        PublicProfile, UpdateSettingsRequest,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_my_profile))
        .route("/profile/:user_id", get(get_profile))
        .route("/settings", post(update_settings))
        .route("/settings/password", post(change_password))
        .route("/account/delete", post(delete_account))
}

async fn build_profile(
    state: &AppState,
    user_id: &str,
    viewer: Option<&str>,
) -> Result<ProfileResponse, ApiError> {
    let user = state
        .store
        .get_user(user_id)
        .await
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let sessions = state.store.sessions_for_user(user_id).await;
    let stats = compute_stats(&sessions, OffsetDateTime::now_utc().date());

    Ok(ProfileResponse {
        user: PublicProfile {
            id: user.id.clone(),
            display_name: user.display_name,
            avatar: user.avatar,
            bio: user.bio,
            badges: user.badges,
            created_at: user.created_at,
        },
        stats,
        is_owner: viewer == Some(user.id.as_str()),
    })
}

#[instrument(skip(state))]
pub async fn get_my_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = build_profile(&state, &user_id, Some(&user_id)).await?;
    Ok(Json(profile))
}

#[instrument(skip(state, viewer))]
pub async fn get_profile(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let viewer_id = viewer.as_ref().map(|AuthUser(id)| id.as_str());
    let profile = build_profile(&state, &user_id, viewer_id).await?;
    Ok(Json(profile))
}

#[instrument(skip(state, payload))]
pub async fn update_settings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Some(name) = payload.display_name.as_deref() {
        if name.trim().len() < 2 {
            warn!(%user_id, "display name too short");
            return Err(ApiError::validation("Display name too short"));
        }
    }

    let mut user = state
        .store
        .get_user(&user_id)
        .await
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    if let Some(name) = payload.display_name {
        user.display_name = name.trim().to_string();
    }
    if let Some(bio) = payload.bio {
        user.bio = bio;
    }
    if let Some(theme) = payload.theme {
        user.theme = theme;
    }
    if let Some(avatar) = payload.avatar {
        user.avatar = Some(avatar);
    }
    if let Some(v) = payload.email_notifications {
        user.preferences.email_notifications = v;
    }
    if let Some(v) = payload.push_notifications {
        user.preferences.push_notifications = v;
    }
    if let Some(v) = payload.profile_visibility {
        user.preferences.profile_visibility = v;
    }

    state.store.put_user(user).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Settings updated".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.new_password.len() < 8 {
        return Err(ApiError::validation("Password too short"));
    }

    let mut user = state
        .store
        .get_user(&user_id)
        .await
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        warn!(%user_id, "password change with wrong current password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    user.password_hash = hash_password(&payload.new_password)?;
    state.store.put_user(user).await?;

    info!(%user_id, "password changed");
    Ok(Json(MessageResponse {
        success: true,
        message: "Password updated".into(),
    }))
}

/// Deleting the account also deletes every game session and reset token
/// belonging to it.
#[instrument(skip(state, payload))]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<DeleteAccountRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.email.trim().to_lowercase() != user_id {
        return Err(ApiError::validation("Email confirmation does not match"));
    }

    if state.store.get_user(&user_id).await.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }

    state.store.delete_user(&user_id).await?;

    info!(%user_id, "account deleted");
    Ok(Json(MessageResponse {
        success: true,
        message: "Account deleted".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn profile_response_serialization() {
        let response = ProfileResponse {
            user: PublicProfile {
                id: "a@example.com".into(),
                display_name: "A".into(),
                avatar: None,
                bio: String::new(),
                badges: BTreeSet::from(["first_game".to_string()]),
                created_at: OffsetDateTime::now_utc(),
            },
            stats: Default::default(),
            is_owner: true,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"isOwner\":true"));
        assert!(json.contains("first_game"));
        assert!(json.contains("totalGamesPlayed"));
    }

    #[test]
    fn settings_request_accepts_partial_bodies() {
        let payload: UpdateSettingsRequest =
            serde_json::from_str(r#"{"displayName":"New Name"}"#).unwrap();
        assert_eq!(payload.display_name.as_deref(), Some("New Name"));
        assert!(payload.bio.is_none());
        assert!(payload.email_notifications.is_none());
    }
}
