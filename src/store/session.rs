//! Metadata for the single active game session.

use std::time::Duration;

use crate::protocol::{GameConfig, GamePhase, PlayerId, SessionId};

/// Snapshot of the active session's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub creator_id: PlayerId,
    pub config: GameConfig,
    pub phase: GamePhase,
}

impl Session {
    /// Time limit per round.
    pub fn round_duration(&self) -> Duration {
        Duration::from_secs(self.config.round_duration_secs)
    }
}

impl Default for Session {
    /// The empty sentinel: no id, zeroed config, `Created` phase.
    fn default() -> Self {
        Self {
            id: String::new(),
            creator_id: String::new(),
            config: GameConfig {
                player_count: 0,
                round_count: 0,
                round_duration_secs: 0,
            },
            phase: GamePhase::Created,
        }
    }
}

/// Holds the currently active session. At most one session is active on a
/// client at a time; the empty-id sentinel means "no active session".
///
/// The phase is monotonic per session id: it never moves backward, and
/// `Finished` is terminal. Re-applying an already-reached phase is a
/// no-op, which makes duplicated server broadcasts harmless.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    session: Session,
}

impl SessionStore {
    /// Creates a store holding the empty sentinel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wholesale replace with an authoritative snapshot.
    ///
    /// Replacing the *same* session with an earlier phase is refused (the
    /// phase never moves backward); a snapshot for a different session id
    /// always wins, since the server is the source of truth. Returns
    /// whether the store changed.
    pub fn set(
        &mut self,
        id: SessionId,
        creator_id: PlayerId,
        config: GameConfig,
        phase: GamePhase,
    ) -> bool {
        if self.session.id == id && phase < self.session.phase {
            return false;
        }
        let next = Session {
            id,
            creator_id,
            config,
            phase,
        };
        if next == self.session {
            return false;
        }
        self.session = next;
        true
    }

    /// Returns the active session id, or the empty string if none.
    pub fn id(&self) -> &str {
        &self.session.id
    }

    /// Returns the creator's player id, or the empty string if none.
    pub fn creator_id(&self) -> &str {
        &self.session.creator_id
    }

    /// Returns the current phase.
    pub fn phase(&self) -> GamePhase {
        self.session.phase
    }

    /// Returns the full session snapshot (sentinel when inactive).
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns `true` if a session is active.
    pub fn is_active(&self) -> bool {
        !self.session.id.is_empty()
    }

    /// True iff the phase is `Started` or `Finished`.
    pub fn has_started(&self) -> bool {
        self.session.phase.has_started()
    }

    /// Moves the phase forward to `target`. Backward or repeated
    /// transitions are no-ops. Returns whether the phase changed.
    pub fn advance(&mut self, target: GamePhase) -> bool {
        if !self.is_active() || target <= self.session.phase {
            return false;
        }
        self.session.phase = target;
        true
    }

    /// Transitions to `Started`. No-op if already started or finished.
    pub fn mark_started(&mut self) -> bool {
        self.advance(GamePhase::Started)
    }

    /// Transitions to the terminal `Finished` phase. No-op if already there.
    pub fn mark_finished(&mut self) -> bool {
        self.advance(GamePhase::Finished)
    }

    /// Resets to the empty sentinel.
    pub fn clear(&mut self) {
        self.session = Session::default();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn config(players: u32, rounds: u32, secs: u64) -> GameConfig {
        GameConfig {
            player_count: players,
            round_count: rounds,
            round_duration_secs: secs,
        }
    }

    #[test]
    fn sentinel_is_inactive() {
        let store = SessionStore::new();
        assert!(!store.is_active());
        assert!(!store.has_started());
        assert_eq!(store.id(), "");
        assert_eq!(store.creator_id(), "");
        assert_eq!(store.phase(), GamePhase::Created);
    }

    #[test]
    fn set_then_mark_started() {
        let mut store = SessionStore::new();
        store.set(
            "g1".into(),
            "alice".into(),
            config(4, 5, 60),
            GamePhase::Created,
        );
        assert!(store.mark_started());
        assert!(store.has_started());
        assert_eq!(store.id(), "g1");
        assert_eq!(store.creator_id(), "alice");

        // A second mark_started leaves state unchanged.
        assert!(!store.mark_started());
        assert_eq!(store.phase(), GamePhase::Started);
    }

    #[test]
    fn phase_never_moves_backward_via_advance() {
        let mut store = SessionStore::new();
        store.set(
            "g1".into(),
            "alice".into(),
            config(4, 5, 60),
            GamePhase::Created,
        );
        assert!(store.advance(GamePhase::WaitingForPlayers));
        assert!(store.mark_started());
        assert!(store.mark_finished());

        assert!(!store.mark_started());
        assert!(!store.advance(GamePhase::WaitingForPlayers));
        assert_eq!(store.phase(), GamePhase::Finished);
    }

    #[test]
    fn set_refuses_backward_phase_for_same_session() {
        let mut store = SessionStore::new();
        store.set(
            "g1".into(),
            "alice".into(),
            config(4, 5, 60),
            GamePhase::Created,
        );
        store.mark_finished();

        let changed = store.set(
            "g1".into(),
            "alice".into(),
            config(4, 5, 60),
            GamePhase::Started,
        );
        assert!(!changed);
        assert_eq!(store.phase(), GamePhase::Finished);
    }

    #[test]
    fn set_accepts_different_session_id_regardless_of_phase() {
        let mut store = SessionStore::new();
        store.set(
            "g1".into(),
            "alice".into(),
            config(4, 5, 60),
            GamePhase::Finished,
        );
        let changed = store.set(
            "g2".into(),
            "bob".into(),
            config(2, 3, 30),
            GamePhase::Created,
        );
        assert!(changed);
        assert_eq!(store.id(), "g2");
        assert_eq!(store.phase(), GamePhase::Created);
    }

    #[test]
    fn set_identical_snapshot_reports_no_change() {
        let mut store = SessionStore::new();
        assert!(store.set(
            "g1".into(),
            "alice".into(),
            config(4, 5, 60),
            GamePhase::Created,
        ));
        assert!(!store.set(
            "g1".into(),
            "alice".into(),
            config(4, 5, 60),
            GamePhase::Created,
        ));
    }

    #[test]
    fn advance_on_inactive_store_is_noop() {
        let mut store = SessionStore::new();
        assert!(!store.mark_started());
        assert!(!store.has_started());
    }

    #[test]
    fn clear_resets_to_sentinel() {
        let mut store = SessionStore::new();
        store.set(
            "g1".into(),
            "alice".into(),
            config(4, 5, 60),
            GamePhase::Started,
        );
        store.clear();
        assert!(!store.is_active());
        assert_eq!(store.session(), &Session::default());
    }

    #[test]
    fn round_duration_converts_seconds() {
        let mut store = SessionStore::new();
        store.set(
            "g1".into(),
            "alice".into(),
            config(4, 5, 90),
            GamePhase::Created,
        );
        assert_eq!(store.session().round_duration(), Duration::from_secs(90));
    }
}
