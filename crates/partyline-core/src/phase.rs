use serde::{Deserialize, Serialize};

use crate::player::PlayerId;

/// One stage of a round. Rounds run through these in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Lobby: players join and signal ready. A ready signal is a
    /// submission tagged `Waiting` (content ignored); the round starts once
    /// every player has sent one.
    Waiting,
    /// Everyone writes a question.
    Question,
    /// Everyone answers the compiled questions.
    Answer,
    /// Everyone reacts to the answers.
    Reaction,
    /// Round summary. Terminal until someone asks to play again.
    Results,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Waiting,
        Phase::Question,
        Phase::Answer,
        Phase::Reaction,
        Phase::Results,
    ];

    /// Wire tag for this phase.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Question => "question",
            Self::Answer => "answer",
            Self::Reaction => "reaction",
            Self::Results => "results",
        }
    }

    /// Parse a wire tag (case-insensitive).
    pub fn from_str_opt(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Whether players can submit content while the session is in this phase.
    pub fn accepts_submissions(self) -> bool {
        !matches!(self, Self::Results)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One player's content for a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub player_id: PlayerId,
    pub content: String,
}

/// Payload produced when a session enters a new phase. Carries the
/// submissions of the phase that just finished, in roster order, so clients
/// can hand them out as prompts for the new phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseEntry {
    pub phase: Phase,
    pub round: u32,
    pub prompts: Vec<Submission>,
    /// Set when the previous phase was closed by timeout rather than by
    /// every player submitting.
    pub forced: bool,
}
