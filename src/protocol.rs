//! Message shapes exchanged with the Cinemoji backend.
//!
//! These types describe the *shape* of server events and local action
//! requests, not their wire encoding — the [`Transport`](crate::Transport)
//! collaborator owns framing and encoding. All types derive `serde` so a
//! transport can serialize them however it likes (the reference backend
//! speaks tagged JSON).

use serde::{Deserialize, Serialize};

// ── Type aliases ────────────────────────────────────────────────────

/// Opaque identifier for a player, issued by the server.
pub type PlayerId = String;

/// Opaque identifier for a game session, issued by the server.
pub type SessionId = String;

// ── Enums ───────────────────────────────────────────────────────────

/// Lifecycle stage of a game session.
///
/// Phases only ever move forward: `Created → WaitingForPlayers → Started
/// → Finished`. `Finished` is terminal. The variant order matters — the
/// derived `Ord` is what the session store uses to refuse backward
/// transitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Session exists on the server but the creator is not yet seated.
    #[default]
    Created,
    /// Session is open and accepting joins.
    WaitingForPlayers,
    /// Rounds are in progress.
    Started,
    /// All rounds complete; results are available. Terminal.
    Finished,
}

impl GamePhase {
    /// Returns `true` once rounds have begun (Started or Finished).
    pub fn has_started(self) -> bool {
        self >= GamePhase::Started
    }

    /// Returns `true` for the terminal phase.
    pub fn is_terminal(self) -> bool {
        self == GamePhase::Finished
    }
}

// ── Structs ─────────────────────────────────────────────────────────

/// A participant as announced by the server.
///
/// The local identity becomes one of these once its join is confirmed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerProfile {
    pub id: PlayerId,
    pub display_name: String,
    /// Reference to the player's avatar (opaque to this crate).
    pub avatar_ref: String,
}

impl PlayerProfile {
    /// Returns `true` for the unset/empty sentinel (no id).
    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
}

/// Rules configured at game creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameConfig {
    /// Number of players the session admits. Must be at least 1.
    pub player_count: u32,
    /// Number of rounds to play. Must be at least 1.
    pub round_count: u32,
    /// Time limit per round in seconds. Must be greater than 0.
    pub round_duration_secs: u64,
}

impl Default for GameConfig {
    /// Backend defaults: 10 players, 10 rounds, 60 seconds per round.
    fn default() -> Self {
        Self {
            player_count: 10,
            round_count: 10,
            round_duration_secs: 60,
        }
    }
}

/// One player's final score, delivered with `GameFinished`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntry {
    pub player_id: PlayerId,
    pub score: i64,
}

// ── Messages ────────────────────────────────────────────────────────

/// Local action requests forwarded verbatim to the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientRequest {
    /// Ask the server to create a new game session. The creator's profile
    /// travels with the request; the server replies with `GameCreated`
    /// echoing the creator's id.
    CreateGame {
        player: PlayerProfile,
        config: GameConfig,
    },
    /// Ask to join an existing session. The roster is only mutated once
    /// the server broadcasts the corresponding `PlayerJoined`.
    JoinGame {
        session_id: SessionId,
        player: PlayerProfile,
    },
    /// Ask the server to start the game (creator only).
    StartGame { session_id: SessionId },
    /// Submit a guess for the current round. The payload is opaque here;
    /// scoring is entirely server-side.
    SubmitGuess {
        session_id: SessionId,
        payload: serde_json::Value,
    },
    /// Leave the session. Local teardown happens immediately; the server
    /// broadcasts `PlayerLeft` to the others.
    LeaveGame { session_id: SessionId },
}

/// Events pushed by the server.
///
/// Unknown event kinds deserialize to [`Unknown`](ServerEvent::Unknown)
/// and are ignored, so a newer server can ship new event types without
/// breaking older clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerEvent {
    /// Authoritative snapshot of a freshly created session.
    GameCreated {
        session_id: SessionId,
        creator_id: PlayerId,
        config: GameConfig,
    },
    /// A player joined (or re-announced with updated metadata).
    PlayerJoined {
        session_id: SessionId,
        player: PlayerProfile,
    },
    /// A player left the session.
    PlayerLeft {
        session_id: SessionId,
        player_id: PlayerId,
    },
    /// Rounds have begun.
    GameStarted { session_id: SessionId },
    /// All rounds complete; final standings attached.
    GameFinished {
        session_id: SessionId,
        results: Vec<ScoreEntry>,
    },
    /// Forward-compatibility catch-all for event kinds this client
    /// does not know about.
    #[serde(other)]
    Unknown,
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn phase_ordering_is_lifecycle_order() {
        assert!(GamePhase::Created < GamePhase::WaitingForPlayers);
        assert!(GamePhase::WaitingForPlayers < GamePhase::Started);
        assert!(GamePhase::Started < GamePhase::Finished);
    }

    #[test]
    fn phase_has_started() {
        assert!(!GamePhase::Created.has_started());
        assert!(!GamePhase::WaitingForPlayers.has_started());
        assert!(GamePhase::Started.has_started());
        assert!(GamePhase::Finished.has_started());
    }

    #[test]
    fn game_config_defaults_match_backend() {
        let config = GameConfig::default();
        assert_eq!(config.player_count, 10);
        assert_eq!(config.round_count, 10);
        assert_eq!(config.round_duration_secs, 60);
    }

    #[test]
    fn unknown_server_event_kind_deserializes_to_unknown() {
        let json = r#"{"type":"RoundHint","data":{"hint":"popcorn"}}"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, ServerEvent::Unknown));
    }

    #[test]
    fn server_event_uses_tagged_encoding() {
        let event = ServerEvent::GameStarted {
            session_id: "g1".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"GameStarted""#));
        assert!(json.contains(r#""session_id":"g1""#));
    }
}
