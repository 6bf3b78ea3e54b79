use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::error::SessionError;
use crate::phase::{Phase, PhaseEntry, Submission};
use crate::phase_engine;
use crate::player::{Player, PlayerId};
use crate::session_code::SessionCode;

/// Result of removing a player from a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub removed: Player,
    /// The roster is now empty and the session must be torn down.
    pub emptied: bool,
    /// The departure completed the current phase.
    pub entered: Option<PhaseEntry>,
}

/// One party-game instance: roster, current phase, and the submissions
/// collected for that phase.
#[derive(Debug)]
pub struct Session {
    code: SessionCode,
    players: Vec<Player>,
    phase: Phase,
    round: u32,
    submissions: HashMap<PlayerId, String>,
    created_at: u64,
    phase_entered_at: Instant,
    last_activity: Instant,
}

impl Session {
    /// Create a session in `Waiting` with `host_id` as its only player.
    pub fn new(code: SessionCode, host_id: PlayerId, host_name: String) -> Self {
        let now = Instant::now();
        Self {
            code,
            players: vec![Player {
                id: host_id,
                display_name: host_name,
                is_host: true,
            }],
            phase: Phase::Waiting,
            round: 1,
            submissions: HashMap::new(),
            created_at: unix_now(),
            phase_entered_at: now,
            last_activity: now,
        }
    }

    pub fn code(&self) -> &SessionCode {
        &self.code
    }

    /// Roster in join order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Creation time, Unix epoch seconds.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn host_id(&self) -> Option<PlayerId> {
        self.players.iter().find(|p| p.is_host).map(|p| p.id)
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Submissions for the current phase.
    pub fn submissions(&self) -> &HashMap<PlayerId, String> {
        &self.submissions
    }

    pub fn submitted_count(&self) -> usize {
        self.submissions.len()
    }

    /// How long the current phase has been open.
    pub fn phase_age(&self) -> Duration {
        self.phase_entered_at.elapsed()
    }

    /// Time since the last roster change or submission.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Append a player to the roster. Joins are only accepted while
    /// `Waiting`: a late join would change the completion denominator of a
    /// phase that is already running.
    pub fn add_player(&mut self, player_id: PlayerId, name: String) -> Result<(), SessionError> {
        if self.phase != Phase::Waiting {
            return Err(SessionError::InvalidPhase {
                requested: Phase::Waiting,
                current: self.phase,
            });
        }
        if self.contains(player_id) {
            return Err(SessionError::DuplicatePlayer(player_id));
        }
        self.players.push(Player {
            id: player_id,
            display_name: name,
            is_host: false,
        });
        self.touch();
        Ok(())
    }

    /// Remove a player and their pending submission. A departure can be the
    /// last thing the current phase was waiting on, so completion is
    /// re-evaluated before returning.
    pub fn remove_player(&mut self, player_id: PlayerId) -> Result<RemoveOutcome, SessionError> {
        let index = self
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or(SessionError::UnknownPlayer(player_id))?;

        let removed = self.players.remove(index);
        self.submissions.remove(&player_id);
        self.touch();

        if self.players.is_empty() {
            return Ok(RemoveOutcome {
                removed,
                emptied: true,
                entered: None,
            });
        }

        // Host migrates to the earliest remaining joiner
        if removed.is_host {
            self.players[0].is_host = true;
        }

        let entered = self.try_advance();
        Ok(RemoveOutcome {
            removed,
            emptied: false,
            entered,
        })
    }

    /// Record (or overwrite) a player's submission for `phase`, then check
    /// whether the phase is complete. Returns the new phase's entry payload
    /// if this submission completed it.
    pub fn submit(
        &mut self,
        player_id: PlayerId,
        phase: Phase,
        content: String,
    ) -> Result<Option<PhaseEntry>, SessionError> {
        if phase != self.phase || !self.phase.accepts_submissions() {
            return Err(SessionError::InvalidPhase {
                requested: phase,
                current: self.phase,
            });
        }
        if !self.contains(player_id) {
            return Err(SessionError::UnknownPlayer(player_id));
        }

        self.submissions.insert(player_id, content);
        self.touch();
        Ok(self.try_advance())
    }

    /// Advance out of `from` if the session is still there and the phase is
    /// complete. Calling it again after the transition (or with the phase
    /// still incomplete) does nothing.
    pub fn advance_phase(&mut self, from: Phase) -> Option<PhaseEntry> {
        if self.phase != from
            || self.players.is_empty()
            || !phase_engine::is_complete(self.phase, &self.players, &self.submissions)
        {
            return None;
        }
        let next = phase_engine::next_phase(self.phase)?;
        Some(self.enter(next, false))
    }

    /// Close the current round phase regardless of who has submitted. Silent
    /// players are recorded with an empty submission. The lobby and
    /// `Results` are never forced: a round only starts once everyone is ready.
    pub fn force_advance(&mut self) -> Option<PhaseEntry> {
        if self.players.is_empty()
            || self.phase == Phase::Waiting
            || !self.phase.accepts_submissions()
        {
            return None;
        }
        let next = phase_engine::next_phase(self.phase)?;
        for p in &self.players {
            self.submissions.entry(p.id).or_default();
        }
        Some(self.enter(next, true))
    }

    /// Start a new round from `Results`.
    pub fn play_again(&mut self, player_id: PlayerId) -> Result<PhaseEntry, SessionError> {
        if self.phase != Phase::Results {
            return Err(SessionError::InvalidPhase {
                requested: Phase::Results,
                current: self.phase,
            });
        }
        if !self.contains(player_id) {
            return Err(SessionError::UnknownPlayer(player_id));
        }
        self.round += 1;
        self.submissions.clear();
        Ok(self.enter(Phase::Waiting, false))
    }

    fn try_advance(&mut self) -> Option<PhaseEntry> {
        self.advance_phase(self.phase)
    }

    fn enter(&mut self, next: Phase, forced: bool) -> PhaseEntry {
        let mut submissions = std::mem::take(&mut self.submissions);
        let prompts = self
            .players
            .iter()
            .filter_map(|p| {
                submissions.remove(&p.id).map(|content| Submission {
                    player_id: p.id,
                    content,
                })
            })
            .collect();

        tracing::debug!(
            session = %self.code,
            from = ?self.phase,
            to = ?next,
            round = self.round,
            forced,
            "Phase advanced"
        );

        self.phase = next;
        self.phase_entered_at = Instant::now();
        self.touch();
        PhaseEntry {
            phase: next,
            round: self.round,
            prompts,
            forced,
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Shift the activity and phase clocks into the past.
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn backdate(&mut self, by: Duration) {
        let now = Instant::now();
        let past = now.checked_sub(by).unwrap_or(now);
        self.last_activity = past;
        self.phase_entered_at = past;
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
