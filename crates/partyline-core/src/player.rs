use serde::{Deserialize, Serialize};

/// Unique identifier for a player, derived from the connection that owns it.
pub type PlayerId = u64;

/// A player in a session roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub is_host: bool,
}

/// Trim and validate a display name. Returns `None` if the name is empty,
/// longer than `max_len` characters, or contains control characters.
pub fn normalize_display_name(raw: &str, max_len: usize) -> Option<String> {
    let name = raw.trim();
    if name.is_empty() || name.chars().count() > max_len || name.chars().any(|c| c.is_control()) {
        return None;
    }
    Some(name.to_string())
}
