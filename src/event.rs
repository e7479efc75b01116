//! Events emitted to the presentation layer.
//!
//! Store mutations are reported as explicit [`StateChange`] values rather
//! than through observable field wrappers, so "what changed" stays
//! decoupled from how a view re-renders.

use crate::protocol::{PlayerId, PlayerProfile, ScoreEntry, SessionId};

/// A change the reconciler applied (or deliberately discarded).
///
/// One inbound server event can yield several of these, in application
/// order. Events that turn out to be no-ops (duplicate joins, repeated
/// phase transitions) yield nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    /// An authoritative session snapshot replaced the session store.
    SessionCreated { session_id: SessionId },
    /// A player was appended to the roster.
    PlayerJoined { player: PlayerProfile },
    /// An already-joined player's metadata was updated in place.
    PlayerUpdated { player: PlayerProfile },
    /// A player was removed from the roster.
    PlayerLeft { player_id: PlayerId },
    /// The session moved to the `Started` phase.
    GameStarted { session_id: SessionId },
    /// The session reached the terminal `Finished` phase; final standings
    /// attached.
    GameFinished {
        session_id: SessionId,
        results: Vec<ScoreEntry>,
    },
    /// Roster and session were cleared (explicit leave or post-results
    /// teardown). The identity is preserved.
    SessionCleared,
    /// Diagnostic: an event referenced a session other than the active
    /// one and was discarded. Recoverable, never user-facing.
    StaleEventDiscarded {
        active_session_id: SessionId,
        event_session_id: SessionId,
    },
}

/// Events delivered on the [`CinemojiClient`](crate::CinemojiClient)
/// event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CinemojiEvent {
    /// The transport loop is running. Always the first event.
    Connected,
    /// The transport closed or failed. Always the last event.
    Disconnected {
        /// Human-readable reason, if known.
        reason: Option<String>,
    },
    /// The reconciler applied a change to local state.
    StateChanged(StateChange),
}
