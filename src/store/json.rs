use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use axum::async_trait;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{error, warn};

use super::{BestScore, GameSession, RecordStore, ResetToken, User, SESSION_CAP};

const USERS_FILE: &str = "users.json";
const SESSIONS_FILE: &str = "sessions.json";
const RESET_TOKENS_FILE: &str = "reset_tokens.json";

#[derive(Debug, Default)]
struct StoreData {
    users: HashMap<String, User>,
    /// Global append order; per-user insertion order follows from it.
    sessions: Vec<GameSession>,
    reset_tokens: HashMap<String, ResetToken>,
}

/// Flat-file record store. The whole dataset lives in memory behind one
/// `RwLock`; every mutation rewrites the touched file while still holding
/// the write lock, so writers are serialized and lost updates cannot occur.
/// Unreadable or corrupt files degrade to empty collections instead of
/// failing startup or a request.
pub struct JsonStore {
    dir: Option<PathBuf>,
    data: RwLock<StoreData>,
}

impl JsonStore {
    pub async fn open(dir: &Path) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let users = load_map::<User>(&dir.join(USERS_FILE)).await;
        let sessions = load_sessions(&dir.join(SESSIONS_FILE)).await;
        let reset_tokens = load_map::<ResetToken>(&dir.join(RESET_TOKENS_FILE)).await;

        Ok(Self {
            dir: Some(dir.to_path_buf()),
            data: RwLock::new(StoreData {
                users,
                sessions,
                reset_tokens,
            }),
        })
    }

    /// No backing files; everything is lost on drop. Used by tests.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            data: RwLock::new(StoreData::default()),
        }
    }

    async fn persist<T: Serialize>(&self, file: &str, value: &T) {
        let Some(dir) = &self.dir else { return };
        let path = dir.join(file);
        match serde_json::to_vec_pretty(value) {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::write(&path, bytes).await {
                    error!(error = %e, path = %path.display(), "store write failed; in-memory state kept");
                }
            }
            Err(e) => error!(error = %e, path = %path.display(), "store serialize failed"),
        }
    }
}

/// Reads a keyed collection, skipping entries that no longer match the
/// schema rather than dropping the whole file.
async fn load_map<T: serde::de::DeserializeOwned>(path: &Path) -> HashMap<String, T> {
    let raw: HashMap<String, serde_json::Value> = match read_json(path).await {
        Some(v) => v,
        None => return HashMap::new(),
    };
    let mut out = HashMap::with_capacity(raw.len());
    for (key, value) in raw {
        match serde_json::from_value::<T>(value) {
            Ok(record) => {
                out.insert(key, record);
            }
            Err(e) => warn!(error = %e, %key, path = %path.display(), "skipping malformed record"),
        }
    }
    out
}

async fn load_sessions(path: &Path) -> Vec<GameSession> {
    let raw: Vec<serde_json::Value> = match read_json(path).await {
        Some(v) => v,
        None => return Vec::new(),
    };
    let mut out = Vec::with_capacity(raw.len());
    for value in raw {
        match serde_json::from_value::<GameSession>(value) {
            Ok(session) => out.push(session),
            Err(e) => warn!(error = %e, path = %path.display(), "skipping malformed session"),
        }
    }
    out
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            error!(error = %e, path = %path.display(), "store read failed; starting empty");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(v) => Some(v),
        Err(e) => {
            error!(error = %e, path = %path.display(), "store file corrupt; starting empty");
            None
        }
    }
}

#[async_trait]
impl RecordStore for JsonStore {
    async fn get_user(&self, id: &str) -> Option<User> {
        self.data.read().await.users.get(id).cloned()
    }

    async fn put_user(&self, user: User) -> anyhow::Result<()> {
        let mut data = self.data.write().await;
        data.users.insert(user.id.clone(), user);
        self.persist(USERS_FILE, &data.users).await;
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> anyhow::Result<()> {
        let mut data = self.data.write().await;
        data.users.remove(id);
        data.sessions.retain(|s| s.user_id != id);
        data.reset_tokens.retain(|_, t| t.email != id);
        self.persist(USERS_FILE, &data.users).await;
        self.persist(SESSIONS_FILE, &data.sessions).await;
        self.persist(RESET_TOKENS_FILE, &data.reset_tokens).await;
        Ok(())
    }

    async fn append_session(&self, session: GameSession) -> anyhow::Result<()> {
        let user_id = session.user_id.clone();
        let game_type = session.game_type.clone();

        let mut data = self.data.write().await;
        data.sessions.push(session);

        let same_bucket =
            |s: &GameSession| s.user_id == user_id && s.game_type == game_type;
        let mut count = data.sessions.iter().filter(|s| same_bucket(s)).count();
        while count > SESSION_CAP {
            if let Some(pos) = data.sessions.iter().position(same_bucket) {
                data.sessions.remove(pos);
            }
            count -= 1;
        }

        self.persist(SESSIONS_FILE, &data.sessions).await;
        Ok(())
    }

    async fn sessions_for_user(&self, user_id: &str) -> Vec<GameSession> {
        self.data
            .read()
            .await
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    async fn sessions_for_game(&self, game_type: &str) -> Vec<GameSession> {
        self.data
            .read()
            .await
            .sessions
            .iter()
            .filter(|s| s.game_type == game_type)
            .cloned()
            .collect()
    }

    async fn best_scores_for_game(&self, game_type: &str) -> Vec<BestScore> {
        let data = self.data.read().await;
        let mut best: HashMap<&str, f64> = HashMap::new();
        for s in data.sessions.iter().filter(|s| s.game_type == game_type) {
            let entry = best.entry(s.user_id.as_str()).or_insert(s.score);
            if s.score > *entry {
                *entry = s.score;
            }
        }
        best.into_iter()
            .map(|(user_id, score)| BestScore {
                user_id: user_id.to_string(),
                score,
            })
            .collect()
    }

    async fn put_reset_token(&self, token: ResetToken) -> anyhow::Result<()> {
        let now = OffsetDateTime::now_utc();
        let mut data = self.data.write().await;
        // Opportunistic GC of tokens nobody will ever consume.
        data.reset_tokens.retain(|_, t| !t.is_expired(now) && !t.used);
        data.reset_tokens.insert(token.token.clone(), token);
        self.persist(RESET_TOKENS_FILE, &data.reset_tokens).await;
        Ok(())
    }

    async fn take_reset_token(&self, token: &str) -> anyhow::Result<Option<ResetToken>> {
        let mut data = self.data.write().await;
        let taken = data.reset_tokens.remove(token);
        if taken.is_some() {
            self.persist(RESET_TOKENS_FILE, &data.reset_tokens).await;
        }
        Ok(taken)
    }
}
