//! Pure phase-transition rules. Nothing here mutates a session; `Session`
//! asks these functions whether it may advance and to where.

use std::collections::HashMap;

use crate::phase::Phase;
use crate::player::{Player, PlayerId};

/// True iff every player currently in `roster` has a submission recorded for
/// `phase`.
///
/// An empty roster is vacuously complete; callers must not advance an empty
/// session (it is torn down instead). `Results` is terminal and never
/// completes: it only leaves through an explicit play-again.
pub fn is_complete(phase: Phase, roster: &[Player], submissions: &HashMap<PlayerId, String>) -> bool {
    if !phase.accepts_submissions() {
        return false;
    }
    roster.iter().all(|p| submissions.contains_key(&p.id))
}

/// Successor of `phase` in the fixed round order. `Results` has none.
pub fn next_phase(phase: Phase) -> Option<Phase> {
    match phase {
        Phase::Waiting => Some(Phase::Question),
        Phase::Question => Some(Phase::Answer),
        Phase::Answer => Some(Phase::Reaction),
        Phase::Reaction => Some(Phase::Results),
        Phase::Results => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_players;

    fn submitted(ids: &[PlayerId]) -> HashMap<PlayerId, String> {
        ids.iter().map(|&id| (id, format!("from {id}"))).collect()
    }

    #[test]
    fn complete_when_everyone_submitted() {
        assert!(is_complete(
            Phase::Question,
            &make_players(3),
            &submitted(&[3, 1, 2])
        ));
    }

    #[test]
    fn silent_player_keeps_phase_open() {
        assert!(!is_complete(
            Phase::Question,
            &make_players(3),
            &submitted(&[1, 2])
        ));
    }

    #[test]
    fn stale_submission_from_departed_player_does_not_count() {
        // Player 9 is no longer in the roster; player 2 still owes a submission.
        assert!(!is_complete(
            Phase::Answer,
            &make_players(2),
            &submitted(&[1, 9])
        ));
    }

    #[test]
    fn empty_roster_is_vacuously_complete() {
        assert!(is_complete(Phase::Reaction, &[], &HashMap::new()));
    }

    #[test]
    fn results_never_completes() {
        assert!(!is_complete(Phase::Results, &make_players(1), &submitted(&[1])));
    }

    #[test]
    fn every_phase_uses_the_same_rule() {
        let players = make_players(2);
        for phase in [Phase::Waiting, Phase::Question, Phase::Answer, Phase::Reaction] {
            assert!(!is_complete(phase, &players, &submitted(&[1])), "{phase}");
            assert!(is_complete(phase, &players, &submitted(&[1, 2])), "{phase}");
        }
    }

    #[test]
    fn successor_order() {
        let mut phase = Phase::Waiting;
        let mut seen = vec![phase];
        while let Some(next) = next_phase(phase) {
            seen.push(next);
            phase = next;
        }
        assert_eq!(seen, Phase::ALL.to_vec());
        assert_eq!(next_phase(Phase::Results), None);
    }
}
