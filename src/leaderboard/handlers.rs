use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use time::{Duration, OffsetDateTime};
use tracing::instrument;

use crate::{
    auth::AuthUser,
    config::LeaderboardSource,
    error::ApiError,
    leaderboard::{
        dto::{LeaderboardEntry, LeaderboardQuery, LeaderboardResponse},
        rank::{rank_best_scores, rank_of, rank_sessions, RankedScore},
    },
    state::AppState,
};

const DEFAULT_LIMIT: usize = 10;

pub fn leaderboard_routes() -> Router<AppState> {
    Router::new().route("/leaderboards/:game_type", get(get_leaderboard))
}

/// Anything other than "week"/"month" ranks all-time, matching how the
/// query parameter has always defaulted.
fn window_start(timeframe: &str, now: OffsetDateTime) -> Option<OffsetDateTime> {
    match timeframe {
        "week" => Some(now - Duration::days(7)),
        "month" => Some(now - Duration::days(30)),
        _ => None,
    }
}

#[instrument(skip(state, caller))]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
    Path(game_type): Path<String>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let timeframe = query.timeframe.unwrap_or_else(|| "alltime".into());
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

    // The full deduplicated ranking is always computed; the caller's rank
    // may lie past the truncation point.
    let ranking: Vec<RankedScore> = match state.config.leaderboard_source {
        LeaderboardSource::Sessions => {
            let sessions = state.store.sessions_for_game(&game_type).await;
            let since = window_start(&timeframe, OffsetDateTime::now_utc());
            rank_sessions(&sessions, since)
        }
        // Stored best scores carry no dates, so timeframes do not apply.
        LeaderboardSource::Best => {
            let best = state.store.best_scores_for_game(&game_type).await;
            rank_best_scores(&best)
        }
    };

    let user_rank = caller
        .as_ref()
        .and_then(|AuthUser(id)| rank_of(&ranking, id));

    let mut leaderboard = Vec::with_capacity(limit.min(ranking.len()));
    for entry in ranking.into_iter().take(limit) {
        let user = state.store.get_user(&entry.user_id).await;
        let (display_name, avatar) = match user {
            Some(u) => (u.display_name, u.avatar),
            None => ("Anonymous".to_string(), None),
        };
        leaderboard.push(LeaderboardEntry {
            rank: entry.rank,
            user_id: entry.user_id,
            display_name,
            avatar,
            score: entry.score,
            difficulty: entry.difficulty,
            timestamp: entry.timestamp,
        });
    }

    Ok(Json(LeaderboardResponse {
        leaderboard,
        user_rank,
        game_type,
        timeframe,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{GameSession, User};

    fn session(user_id: &str, score: f64) -> GameSession {
        GameSession {
            id: uuid::Uuid::new_v4(),
            user_id: user_id.into(),
            game_type: "memory".into(),
            score,
            difficulty: "medium".into(),
            duration_seconds: 60,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    fn player(id: &str, display_name: &str) -> User {
        User {
            id: id.into(),
            password_hash: "hash".into(),
            display_name: display_name.into(),
            avatar: Some("data:image/png;base64,AAAA".into()),
            bio: String::new(),
            theme: "light".into(),
            preferences: Default::default(),
            counters: Default::default(),
            badges: Default::default(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn entries_without_a_user_record_fall_back_to_anonymous() {
        let state = AppState::fake();
        state
            .store
            .put_user(player("known@example.com", "Known Player"))
            .await
            .unwrap();
        state
            .store
            .append_session(session("known@example.com", 80.0))
            .await
            .unwrap();
        state
            .store
            .append_session(session("ghost@example.com", 50.0))
            .await
            .unwrap();

        let Json(body) = get_leaderboard(
            State(state),
            None,
            Path("memory".into()),
            Query(LeaderboardQuery {
                timeframe: None,
                limit: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(body.leaderboard.len(), 2);
        assert_eq!(body.leaderboard[0].display_name, "Known Player");
        assert!(body.leaderboard[0].avatar.is_some());
        let ghost = &body.leaderboard[1];
        assert_eq!(ghost.user_id, "ghost@example.com");
        assert_eq!(ghost.display_name, "Anonymous");
        assert!(ghost.avatar.is_none());
        assert_eq!(body.user_rank, None);
    }

    #[tokio::test]
    async fn caller_rank_is_reported_past_the_truncated_page() {
        let state = AppState::fake();
        for i in 0..15 {
            state
                .store
                .append_session(session(&format!("u{i}@example.com"), (100 - i) as f64))
                .await
                .unwrap();
        }

        let Json(body) = get_leaderboard(
            State(state),
            Some(AuthUser("u14@example.com".into())),
            Path("memory".into()),
            Query(LeaderboardQuery {
                timeframe: None,
                limit: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(body.leaderboard.len(), DEFAULT_LIMIT);
        assert_eq!(body.leaderboard[0].user_id, "u0@example.com");
        assert_eq!(body.user_rank, Some(15));
    }

    #[test]
    fn unknown_timeframe_means_alltime() {
        let now = OffsetDateTime::now_utc();
        assert!(window_start("alltime", now).is_none());
        assert!(window_start("yesteryear", now).is_none());
        assert_eq!(window_start("week", now), Some(now - Duration::days(7)));
        assert_eq!(window_start("month", now), Some(now - Duration::days(30)));
    }

    #[test]
    fn response_uses_wire_field_names() {
        let response = LeaderboardResponse {
            leaderboard: vec![LeaderboardEntry {
                rank: 1,
                user_id: "a@example.com".into(),
                display_name: "A".into(),
                avatar: None,
                score: 80.0,
                difficulty: Some("medium".into()),
                timestamp: Some(OffsetDateTime::now_utc()),
            }],
            user_rank: Some(1),
            game_type: "memory".into(),
            timeframe: "alltime".into(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"userRank\":1"));
        assert!(json.contains("\"gameType\":\"memory\""));
        assert!(json.contains("\"userId\":\"a@example.com\""));
        assert!(json.contains("\"displayName\":\"A\""));
    }
}
