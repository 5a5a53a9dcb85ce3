use std::collections::BTreeSet;

/// Milestone badges keyed by lifetime game count.
const MILESTONES: &[(u64, &str)] = &[
    (1, "first_game"),
    (10, "ten_games"),
    (50, "fifty_games"),
    (100, "hundred_games"),
];

/// Badges to add for the given lifetime total, minus any already held.
///
/// A milestone is awarded only when the counter lands on it exactly. With
/// the counter incremented once per logged session that is equivalent to a
/// threshold check, but a bulk jump over a milestone never awards it.
/// Product has not confirmed whether that is intended, so the equality
/// check is kept as shipped.
pub fn evaluate_badges(total_games_played: u64, existing: &BTreeSet<String>) -> Vec<String> {
    MILESTONES
        .iter()
        .filter(|(count, _)| *count == total_games_played)
        .map(|(_, badge)| (*badge).to_string())
        .filter(|badge| !existing.contains(badge))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_game_awards_first_badge() {
        let awarded = evaluate_badges(1, &BTreeSet::new());
        assert_eq!(awarded, vec!["first_game".to_string()]);
    }

    #[test]
    fn each_milestone_awards_its_badge() {
        for (count, badge) in [(10, "ten_games"), (50, "fifty_games"), (100, "hundred_games")] {
            assert_eq!(evaluate_badges(count, &BTreeSet::new()), vec![badge.to_string()]);
        }
    }

    #[test]
    fn skipping_over_a_milestone_awards_nothing() {
        // 9 -> 11 jumps over the ten_games milestone.
        assert!(evaluate_badges(11, &BTreeSet::new()).is_empty());
    }

    #[test]
    fn off_milestone_counts_award_nothing() {
        for count in [0, 2, 9, 49, 99, 101] {
            assert!(evaluate_badges(count, &BTreeSet::new()).is_empty());
        }
    }

    #[test]
    fn idempotent_on_already_held_badges() {
        let mut held = BTreeSet::new();
        held.extend(evaluate_badges(10, &held));
        let before = held.clone();

        held.extend(evaluate_badges(10, &held));
        assert_eq!(held, before);
        assert_eq!(held.len(), 1);
    }
}
