use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::ApiError,
    games::{
        badges::evaluate_badges,
        dto::{AnalyticsResponse, AnalyticsTrends, LogSessionRequest, LogSessionResponse},
        stats::{compute_stats, Stats},
    },
    state::AppState,
    store::GameSession,
};

pub fn game_routes() -> Router<AppState> {
    Router::new()
        .route("/game-session", post(log_session))
        .route("/stats", get(get_stats))
        .route("/analytics/:game_type", get(get_analytics))
}

#[instrument(skip(state, payload))]
pub async fn log_session(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<LogSessionRequest>,
) -> Result<Json<LogSessionResponse>, ApiError> {
    let game_type = payload.game_type.trim().to_string();
    if game_type.is_empty() {
        return Err(ApiError::validation("gameType is required"));
    }
    if !payload.score.is_finite() || payload.score < 0.0 {
        return Err(ApiError::validation("score must be a non-negative number"));
    }

    let mut user = state
        .store
        .get_user(&user_id)
        .await
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    let duration_seconds = payload.duration.unwrap_or(0);
    let session = GameSession {
        id: Uuid::new_v4(),
        user_id: user_id.clone(),
        game_type,
        score: payload.score,
        difficulty: payload
            .difficulty
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| "medium".into()),
        duration_seconds,
        timestamp: OffsetDateTime::now_utc(),
    };
    let session_id = session.id;
    state.store.append_session(session).await?;

    user.counters.total_games_played += 1;
    user.counters.total_minutes_played += duration_seconds / 60;

    let new_badges = evaluate_badges(user.counters.total_games_played, &user.badges);
    if !new_badges.is_empty() {
        info!(user_id = %user.id, badges = ?new_badges, "badges awarded");
        user.badges.extend(new_badges.iter().cloned());
    }
    state.store.put_user(user).await?;

    Ok(Json(LogSessionResponse {
        success: true,
        session_id,
        new_badges,
    }))
}

#[instrument(skip(state))]
pub async fn get_stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Stats>, ApiError> {
    let sessions = state.store.sessions_for_user(&user_id).await;
    let today = OffsetDateTime::now_utc().date();
    Ok(Json(compute_stats(&sessions, today)))
}

#[instrument(skip(state))]
pub async fn get_analytics(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(game_type): Path<String>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let mut sessions: Vec<GameSession> = state
        .store
        .sessions_for_user(&user_id)
        .await
        .into_iter()
        .filter(|s| s.game_type == game_type)
        .collect();
    sessions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    if sessions.is_empty() {
        warn!(%user_id, %game_type, "analytics over empty session list");
    }

    let scores: Vec<f64> = sessions.iter().map(|s| s.score).collect();
    let dates: Vec<String> = sessions
        .iter()
        .map(|s| s.timestamp.date().to_string())
        .collect();

    Ok(Json(AnalyticsResponse {
        stats: score_trends(&scores),
        scores,
        dates,
    }))
}

/// Trend numbers over scores in play order. Total over any input.
fn score_trends(scores: &[f64]) -> AnalyticsTrends {
    if scores.len() >= 2 {
        let first = scores[0];
        let last = scores[scores.len() - 1];
        let improvement = if first > 0.0 {
            ((last - first) / first * 100.0 * 10.0).round() / 10.0
        } else {
            0.0
        };
        let average =
            (scores.iter().sum::<f64>() / scores.len() as f64).round();
        let best = scores.iter().copied().fold(f64::MIN, f64::max);
        let worst = scores.iter().copied().fold(f64::MAX, f64::min);
        AnalyticsTrends {
            improvement,
            average,
            best,
            worst,
            total_games: scores.len(),
        }
    } else {
        let only = scores.first().copied().unwrap_or(0.0);
        AnalyticsTrends {
            improvement: 0.0,
            average: only,
            best: only,
            worst: only,
            total_games: scores.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trends_over_improving_scores() {
        let trends = score_trends(&[10.0, 20.0, 15.0]);
        assert_eq!(trends.improvement, 50.0);
        assert_eq!(trends.average, 15.0);
        assert_eq!(trends.best, 20.0);
        assert_eq!(trends.worst, 10.0);
        assert_eq!(trends.total_games, 3);
    }

    #[test]
    fn trends_guard_zero_first_score() {
        let trends = score_trends(&[0.0, 20.0]);
        assert_eq!(trends.improvement, 0.0);
    }

    #[test]
    fn trends_over_single_and_empty_inputs() {
        let one = score_trends(&[7.0]);
        assert_eq!(one.average, 7.0);
        assert_eq!(one.best, 7.0);
        assert_eq!(one.worst, 7.0);
        assert_eq!(one.total_games, 1);

        let none = score_trends(&[]);
        assert_eq!(none.average, 0.0);
        assert_eq!(none.total_games, 0);
    }

    #[test]
    fn improvement_is_rounded_to_one_decimal() {
        let trends = score_trends(&[3.0, 4.0]);
        assert_eq!(trends.improvement, 33.3);
    }

    #[tokio::test]
    async fn minute_counter_floors_each_session_separately() {
        use crate::store::User;

        let state = AppState::fake();
        state
            .store
            .put_user(User {
                id: "a@example.com".into(),
                password_hash: "hash".into(),
                display_name: "Player".into(),
                avatar: None,
                bio: String::new(),
                theme: "light".into(),
                preferences: Default::default(),
                counters: Default::default(),
                badges: Default::default(),
                created_at: OffsetDateTime::now_utc(),
            })
            .await
            .unwrap();

        for _ in 0..2 {
            log_session(
                State(state.clone()),
                AuthUser("a@example.com".into()),
                Json(LogSessionRequest {
                    game_type: "memory".into(),
                    score: 10.0,
                    difficulty: None,
                    duration: Some(90),
                }),
            )
            .await
            .unwrap();
        }

        let user = state.store.get_user("a@example.com").await.unwrap();
        assert_eq!(user.counters.total_games_played, 2);
        // Each 90-second session floors to one stored minute.
        assert_eq!(user.counters.total_minutes_played, 2);

        // The reported stat floors the summed seconds: 180s is three minutes.
        let Json(stats) = get_stats(State(state.clone()), AuthUser("a@example.com".into()))
            .await
            .unwrap();
        assert_eq!(stats.total_minutes_played, 3);
    }

    #[test]
    fn log_session_response_serialization() {
        let response = LogSessionResponse {
            success: true,
            session_id: Uuid::new_v4(),
            new_badges: vec!["first_game".into()],
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("sessionId"));
        assert!(json.contains("newBadges"));
    }
}
