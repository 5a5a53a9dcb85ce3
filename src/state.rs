use crate::config::AppConfig;
use crate::mailer::{LogMailer, Mailer};
use crate::store::{JsonStore, RecordStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store =
            Arc::new(JsonStore::open(&config.data_dir).await?) as Arc<dyn RecordStore>;
        let mailer = Arc::new(LogMailer) as Arc<dyn Mailer>;

        Ok(Self {
            store,
            mailer,
            config,
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{JwtConfig, LeaderboardSource};

        let config = Arc::new(AppConfig {
            data_dir: std::env::temp_dir().join("braingames-test"),
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            reset_token_ttl_hours: 1,
            reset_base_url: "http://localhost:8080/reset-password".into(),
            leaderboard_source: LeaderboardSource::Sessions,
        });

        Self {
            store: Arc::new(JsonStore::in_memory()) as Arc<dyn RecordStore>,
            mailer: Arc::new(LogMailer) as Arc<dyn Mailer>,
            config,
        }
    }
}
