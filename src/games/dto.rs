use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Inbound game-completion event. The timestamp is never taken from the
/// caller; the handler assigns it server-side.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSessionRequest {
    pub game_type: String,
    pub score: f64,
    #[serde(default)]
    pub difficulty: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub duration: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSessionResponse {
    pub success: bool,
    pub session_id: Uuid,
    pub new_badges: Vec<String>,
}

/// Chart feed for one game type: per-session scores and dates in play
/// order, plus trend numbers.
#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub scores: Vec<f64>,
    pub dates: Vec<String>,
    pub stats: AnalyticsTrends,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct AnalyticsTrends {
    /// First-to-last percent change, one decimal; 0 with fewer than two
    /// sessions or a zero first score.
    pub improvement: f64,
    pub average: f64,
    pub best: f64,
    pub worst: f64,
    pub total_games: usize,
}
