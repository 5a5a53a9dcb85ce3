use std::cmp::Ordering;
use std::collections::HashSet;

use time::OffsetDateTime;

use crate::store::{BestScore, GameSession};

/// One row of a ranking, before the user join. `difficulty` and
/// `timestamp` are absent on the best-score path, which ranks undated
/// per-user maxima.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedScore {
    pub rank: u32,
    pub user_id: String,
    pub score: f64,
    pub difficulty: Option<String>,
    pub timestamp: Option<OffsetDateTime>,
}

/// Full deduplicated ranking over a session stream, already filtered to one
/// game type. Sessions older than `since` are dropped when a window is
/// given. Sorting is stable, so equal scores keep their insertion order —
/// the documented tie-break. Each user keeps only their first (highest)
/// entry; ranks are dense 1..N.
pub fn rank_sessions(sessions: &[GameSession], since: Option<OffsetDateTime>) -> Vec<RankedScore> {
    let mut candidates: Vec<&GameSession> = sessions
        .iter()
        .filter(|s| since.map_or(true, |cut| s.timestamp >= cut))
        .collect();
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut seen: HashSet<&str> = HashSet::new();
    let mut ranking = Vec::new();
    for s in candidates {
        if seen.insert(s.user_id.as_str()) {
            ranking.push(RankedScore {
                rank: ranking.len() as u32 + 1,
                user_id: s.user_id.clone(),
                score: s.score,
                difficulty: Some(s.difficulty.clone()),
                timestamp: Some(s.timestamp),
            });
        }
    }
    ranking
}

/// Ranking over stored per-user best scores. Ties break on user id, since
/// this shape carries no insertion order to fall back on.
pub fn rank_best_scores(best: &[BestScore]) -> Vec<RankedScore> {
    let mut entries: Vec<&BestScore> = best.iter().collect();
    entries.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    entries
        .into_iter()
        .enumerate()
        .map(|(i, b)| RankedScore {
            rank: i as u32 + 1,
            user_id: b.user_id.clone(),
            score: b.score,
            difficulty: None,
            timestamp: None,
        })
        .collect()
}

/// The caller's place in the full ranking, top-N or not.
pub fn rank_of(ranking: &[RankedScore], user_id: &str) -> Option<u32> {
    ranking.iter().find(|r| r.user_id == user_id).map(|r| r.rank)
}
