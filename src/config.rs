use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Which persistence shape feeds the leaderboard: the dated session stream,
/// or a single undated best score per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardSource {
    Sessions,
    Best,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub jwt: JwtConfig,
    pub reset_token_ttl_hours: i64,
    pub reset_base_url: String,
    pub leaderboard_source: LeaderboardSource,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = PathBuf::from(std::env::var("DATA_DIR")?);
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "braingames".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "braingames-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        let reset_token_ttl_hours = std::env::var("RESET_TOKEN_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(1);
        let reset_base_url = std::env::var("RESET_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080/reset-password".into());
        let leaderboard_source = match std::env::var("LEADERBOARD_SOURCE").as_deref() {
            Ok("best") => LeaderboardSource::Best,
            _ => LeaderboardSource::Sessions,
        };
        Ok(Self {
            data_dir,
            jwt,
            reset_token_ttl_hours,
            reset_base_url,
            leaderboard_source,
        })
    }
}
