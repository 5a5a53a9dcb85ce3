use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, PublicUser,
            RefreshRequest, RegisterRequest, ResetPasswordRequest,
        },
        services::{
            hash_password, is_valid_email, mint_reset_token, verify_password, AuthUser, JwtKeys,
        },
    },
    error::ApiError,
    state::AppState,
    store::{Counters, Preferences, User},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(get_me))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

fn public_user(user: &User) -> PublicUser {
    PublicUser {
        id: user.id.clone(),
        display_name: user.display_name.clone(),
        avatar: user.avatar.clone(),
    }
}

fn token_pair(keys: &JwtKeys, user: &User) -> Result<AuthResponse, ApiError> {
    let access_token = keys.sign_access(&user.id).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        ApiError::Internal(e)
    })?;
    let refresh_token = keys.sign_refresh(&user.id).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        ApiError::Internal(e)
    })?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: public_user(user),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::validation("Invalid email"));
    }

    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::validation("Password too short"));
    }

    if state.store.get_user(&payload.email).await.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;

    let display_name = payload
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            payload
                .email
                .split('@')
                .next()
                .unwrap_or("User")
                .to_string()
        });

    let user = User {
        id: payload.email.clone(),
        password_hash: hash,
        display_name,
        avatar: None,
        bio: String::new(),
        theme: "light".into(),
        preferences: Preferences::default(),
        counters: Counters::default(),
        badges: Default::default(),
        created_at: OffsetDateTime::now_utc(),
    };
    state.store.put_user(user.clone()).await?;

    let keys = JwtKeys::from_ref(&state);
    let response = token_pair(&keys, &user)?;

    info!(user_id = %user.id, "user registered");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::validation("Invalid email"));
    }

    let user = match state.store.get_user(&payload.email).await {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::Unauthorized("Invalid credentials".into()));
        }
    };

    let ok = verify_password(&payload.password, &user.password_hash)?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let response = token_pair(&keys, &user)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let user = state
        .store
        .get_user(&claims.sub)
        .await
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    // Issue new pair
    let response = token_pair(&keys, &user)?;
    Ok(Json(response))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state.store.get_user(&user_id).await.ok_or_else(|| {
        error!(%user_id, "user not found");
        ApiError::Unauthorized("User not found".into())
    })?;

    Ok(Json(public_user(&user)))
}

/// Always acknowledges with the same body so callers cannot probe which
/// emails are registered.
#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if let Some(user) = state.store.get_user(&payload.email).await {
        let token = mint_reset_token(
            &user.id,
            state.config.reset_token_ttl_hours,
            OffsetDateTime::now_utc(),
        );
        let reset_url = format!("{}?token={}", state.config.reset_base_url, token.token);
        state.store.put_reset_token(token).await?;
        if let Err(e) = state.mailer.send_password_reset(&user.id, &reset_url).await {
            error!(error = %e, user_id = %user.id, "reset email send failed");
        }
    } else {
        info!(email = %payload.email, "forgot-password for unknown email");
    }

    Ok(Json(MessageResponse {
        success: true,
        message: "If that account exists, a reset link has been sent".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.password.len() < 8 {
        return Err(ApiError::validation("Password too short"));
    }

    // Taking the token removes it: consumed and expired tokens are gone
    // either way, and the caller has to restart the flow.
    let token = state
        .store
        .take_reset_token(&payload.token)
        .await?
        .ok_or_else(|| ApiError::validation("Invalid or expired reset token"))?;

    if token.used || token.is_expired(OffsetDateTime::now_utc()) {
        warn!(email = %token.email, "rejected stale reset token");
        return Err(ApiError::validation("Invalid or expired reset token"));
    }

    let mut user = state
        .store
        .get_user(&token.email)
        .await
        .ok_or_else(|| ApiError::validation("Invalid or expired reset token"))?;

    user.password_hash = hash_password(&payload.password)?;
    state.store.put_user(user).await?;

    info!(email = %token.email, "password reset");
    Ok(Json(MessageResponse {
        success: true,
        message: "Password updated".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_response_serialization() {
        let response = AuthResponse {
            access_token: "a".into(),
            refresh_token: "r".into(),
            user: PublicUser {
                id: "test@example.com".into(),
                display_name: "test".into(),
                avatar: None,
            },
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("access_token"));
        assert!(json.contains("test@example.com"));
        assert!(json.contains("displayName"));
    }
}
