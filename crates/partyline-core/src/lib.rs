pub mod error;
pub mod net;
pub mod phase;
pub mod phase_engine;
pub mod player;
pub mod registry;
pub mod session;
pub mod session_code;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::collections::VecDeque;

    use crate::player::{Player, PlayerId};
    use crate::registry::SessionRegistry;
    use crate::session_code::SessionCode;

    /// Create `n` test players with sequential IDs starting at 1.
    pub fn make_players(n: usize) -> Vec<Player> {
        (0..n)
            .map(|i| Player {
                id: i as PlayerId + 1,
                display_name: format!("Player{}", i + 1),
                is_host: i == 0,
            })
            .collect()
    }

    /// Registry that hands out `codes` in order, then falls back to random
    /// codes once the list runs out.
    pub fn scripted_registry(codes: &[&str]) -> SessionRegistry {
        let mut queue: VecDeque<SessionCode> = codes
            .iter()
            .map(|c| SessionCode::parse(c).unwrap_or_else(|| panic!("bad test code {c}")))
            .collect();
        SessionRegistry::with_code_generator(Box::new(move || {
            queue.pop_front().unwrap_or_else(SessionCode::generate)
        }))
    }
}
