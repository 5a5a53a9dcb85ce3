use std::collections::BTreeSet;

use axum::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

mod json;

pub use json::JsonStore;

/// Most recent sessions kept per (user, gameType). Overflow is evicted
/// oldest-first by insertion order, not by score.
pub const SESSION_CAP: usize = 100;

fn default_true() -> bool {
    true
}

fn default_visibility() -> String {
    "public".into()
}

fn default_theme() -> String {
    "light".into()
}

fn default_difficulty() -> String {
    "medium".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default = "default_true")]
    pub email_notifications: bool,
    #[serde(default)]
    pub push_notifications: bool,
    #[serde(default = "default_visibility")]
    pub profile_visibility: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            email_notifications: true,
            push_notifications: false,
            profile_visibility: default_visibility(),
        }
    }
}

/// Cumulative counters maintained at write time. Read-side statistics are
/// always recomputed from the session list; these exist so the badge
/// evaluator sees the lifetime total even after old sessions are evicted,
/// and so persisted user records keep their `stats` field shape.
///
/// Minutes accumulate with a per-session `duration / 60` floor, the way
/// existing records were written. The read-side stat floors the summed
/// seconds instead, so the two values drift for sub-minute remainders;
/// nothing reads this counter, it is carried for record compatibility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    #[serde(default)]
    pub total_games_played: u64,
    #[serde(default)]
    pub total_minutes_played: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub password_hash: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(rename = "stats", default)]
    pub counters: Counters,
    #[serde(default)]
    pub badges: BTreeSet<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub id: Uuid,
    pub user_id: String,
    pub game_type: String,
    pub score: f64,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    /// Seconds, may be 0.
    #[serde(rename = "duration", default)]
    pub duration_seconds: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetToken {
    pub token: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    #[serde(default)]
    pub used: bool,
}

impl ResetToken {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

/// Per-user best score for one game type, with no date attached. The shape
/// the alternative leaderboard path ranks over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestScore {
    pub user_id: String,
    pub score: f64,
}

/// The sole owner of persisted state. Reads degrade to empty results when
/// the backing data is missing or unreadable; they never fail the request.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_user(&self, id: &str) -> Option<User>;

    /// Create or replace the whole record. Last write wins.
    async fn put_user(&self, user: User) -> anyhow::Result<()>;

    /// Removes the user together with all their sessions and any reset
    /// tokens addressed to them.
    async fn delete_user(&self, id: &str) -> anyhow::Result<()>;

    /// Append-only; enforces [`SESSION_CAP`] per (user, gameType).
    async fn append_session(&self, session: GameSession) -> anyhow::Result<()>;

    async fn sessions_for_user(&self, user_id: &str) -> Vec<GameSession>;

    /// All users' sessions of one game type, in insertion order.
    async fn sessions_for_game(&self, game_type: &str) -> Vec<GameSession>;

    /// Per-user `max(score)` reduction over one game type.
    async fn best_scores_for_game(&self, game_type: &str) -> Vec<BestScore>;

    async fn put_reset_token(&self, token: ResetToken) -> anyhow::Result<()>;

    /// Removes and returns the token. Single use: a second take of the same
    /// token yields `None`.
    async fn take_reset_token(&self, token: &str) -> anyhow::Result<Option<ResetToken>>;
}
