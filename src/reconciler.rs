//! Session state reconciliation.
//!
//! The [`Reconciler`] is the only component that decides which store
//! mutation an inbound server event or local action produces. It owns the
//! three stores, enforces the cross-store invariants (roster uniqueness,
//! single active session, monotonic phase), and reports every applied
//! mutation as a [`StateChange`].
//!
//! Local actions never mutate state optimistically: `prepare_*` methods
//! only validate preconditions and hand back the typed request to
//! forward. The stores change when the server's confirmation event comes
//! back through [`Reconciler::apply`] — which also means a confirmation
//! arriving after the caller abandoned the action still applies cleanly
//! against current store state.
//!
//! All methods are synchronous, in-memory, and must be driven from a
//! single logical thread (or behind a single-writer lock) so events are
//! applied strictly in arrival order.

use tracing::{debug, warn};

use crate::error::{CinemojiError, Result};
use crate::event::StateChange;
use crate::protocol::{
    ClientRequest, GameConfig, GamePhase, PlayerProfile, ServerEvent, SessionId,
};
use crate::store::{IdentityStore, Roster, Session, SessionStore, UpsertOutcome};

/// Coordinates the identity, roster, and session stores.
#[derive(Debug, Default)]
pub struct Reconciler {
    identity: IdentityStore,
    roster: Roster,
    session: SessionStore,
}

impl Reconciler {
    /// Creates a reconciler with all stores at their empty sentinels.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Identity ────────────────────────────────────────────────────

    /// Replaces the local identity wholesale.
    ///
    /// If a different identity was set previously and had already joined
    /// the roster, that stale roster entry is removed.
    ///
    /// # Errors
    ///
    /// Returns [`CinemojiError::EmptyId`] if `id` is empty. An empty id
    /// is a caller bug, not a runtime condition, and is rejected before
    /// any state changes.
    pub fn set_identity(
        &mut self,
        id: impl Into<String>,
        display_name: impl Into<String>,
        avatar_ref: impl Into<String>,
    ) -> Result<()> {
        let id = id.into();
        if id.is_empty() {
            return Err(CinemojiError::EmptyId("player"));
        }
        let previous = self.identity.id().to_owned();
        if !previous.is_empty() && previous != id {
            self.roster.remove(&previous);
        }
        self.identity.set(id, display_name.into(), avatar_ref.into());
        Ok(())
    }

    /// Clears the local identity. Used on explicit logout.
    pub fn clear_identity(&mut self) {
        self.identity.clear();
    }

    // ── Local action requests ───────────────────────────────────────

    /// Validates a create-game action and returns the request to forward.
    ///
    /// No local session is constructed here — the session store is only
    /// populated once the server confirms with `GameCreated`, so a failed
    /// or abandoned creation never leaves a phantom local game.
    ///
    /// # Errors
    ///
    /// [`CinemojiError::NoIdentity`] if no identity is set, or
    /// [`CinemojiError::InvalidConfig`] if the config fails validation.
    pub fn prepare_create_game(&self, config: GameConfig) -> Result<ClientRequest> {
        if !self.identity.is_set() {
            return Err(CinemojiError::NoIdentity);
        }
        validate_config(&config)?;
        Ok(ClientRequest::CreateGame {
            player: self.identity.profile().clone(),
            config,
        })
    }

    /// Validates a join action and returns the request to forward.
    ///
    /// The roster is not touched: the server's `PlayerJoined` broadcast
    /// is the single authoritative trigger for roster insertion, which is
    /// what makes duplicated broadcasts and retries idempotent.
    ///
    /// # Errors
    ///
    /// [`CinemojiError::EmptyId`] for an empty session id, or
    /// [`CinemojiError::NoIdentity`] if no identity is set.
    pub fn prepare_join(&self, session_id: impl Into<SessionId>) -> Result<ClientRequest> {
        let session_id = session_id.into();
        if session_id.is_empty() {
            return Err(CinemojiError::EmptyId("session"));
        }
        if !self.identity.is_set() {
            return Err(CinemojiError::NoIdentity);
        }
        Ok(ClientRequest::JoinGame {
            session_id,
            player: self.identity.profile().clone(),
        })
    }

    /// Validates a start-game action and returns the request to forward.
    ///
    /// # Errors
    ///
    /// [`CinemojiError::NoActiveSession`] without an active session,
    /// [`CinemojiError::NotCreator`] if the local user did not create it,
    /// or [`CinemojiError::AlreadyStarted`] if rounds are already running.
    pub fn prepare_start(&self) -> Result<ClientRequest> {
        if !self.session.is_active() {
            return Err(CinemojiError::NoActiveSession);
        }
        if !self.is_creator() {
            return Err(CinemojiError::NotCreator);
        }
        if self.session.has_started() {
            return Err(CinemojiError::AlreadyStarted);
        }
        Ok(ClientRequest::StartGame {
            session_id: self.session.id().to_owned(),
        })
    }

    /// Validates a guess submission and returns the request to forward.
    /// The payload is opaque to this layer.
    ///
    /// # Errors
    ///
    /// [`CinemojiError::NoActiveSession`], [`CinemojiError::NotStarted`]
    /// before `GameStarted` arrives, or [`CinemojiError::AlreadyFinished`]
    /// once the session is terminal.
    pub fn prepare_guess(&self, payload: serde_json::Value) -> Result<ClientRequest> {
        if !self.session.is_active() {
            return Err(CinemojiError::NoActiveSession);
        }
        match self.session.phase() {
            GamePhase::Started => Ok(ClientRequest::SubmitGuess {
                session_id: self.session.id().to_owned(),
                payload,
            }),
            GamePhase::Finished => Err(CinemojiError::AlreadyFinished),
            GamePhase::Created | GamePhase::WaitingForPlayers => Err(CinemojiError::NotStarted),
        }
    }

    /// Validates a leave action and returns the request to forward.
    /// Call [`teardown`](Self::teardown) afterwards to clear local state.
    ///
    /// # Errors
    ///
    /// [`CinemojiError::NoActiveSession`] without an active session.
    pub fn prepare_leave(&self) -> Result<ClientRequest> {
        if !self.session.is_active() {
            return Err(CinemojiError::NoActiveSession);
        }
        Ok(ClientRequest::LeaveGame {
            session_id: self.session.id().to_owned(),
        })
    }

    /// Clears the roster and session. The identity is preserved so the
    /// user can join another game. Used on explicit leave and once
    /// `GameFinished` handling is complete.
    pub fn teardown(&mut self) -> Vec<StateChange> {
        if !self.session.is_active() && self.roster.is_empty() {
            return Vec::new();
        }
        self.roster.clear();
        self.session.clear();
        vec![StateChange::SessionCleared]
    }

    // ── Inbound server events ───────────────────────────────────────

    /// Applies one inbound server event to the stores.
    ///
    /// Returns the changes that were actually applied, in order. Stale
    /// events (session id mismatch) are discarded and reported via
    /// [`StateChange::StaleEventDiscarded`]; duplicate applications and
    /// unknown event kinds yield nothing. Never fails — the server is the
    /// source of truth and a message that cannot be applied is dropped,
    /// not escalated.
    pub fn apply(&mut self, event: ServerEvent) -> Vec<StateChange> {
        match event {
            ServerEvent::GameCreated {
                session_id,
                creator_id,
                config,
            } => self.apply_game_created(session_id, creator_id, config),
            ServerEvent::PlayerJoined { session_id, player } => {
                self.apply_player_joined(session_id, player)
            }
            ServerEvent::PlayerLeft {
                session_id,
                player_id,
            } => self.apply_player_left(session_id, player_id),
            ServerEvent::GameStarted { session_id } => self.apply_game_started(session_id),
            ServerEvent::GameFinished {
                session_id,
                results,
            } => self.apply_game_finished(session_id, results),
            ServerEvent::Unknown => {
                debug!("ignoring unknown server event kind");
                Vec::new()
            }
        }
    }

    fn apply_game_created(
        &mut self,
        session_id: SessionId,
        creator_id: String,
        config: GameConfig,
    ) -> Vec<StateChange> {
        if session_id.is_empty() || creator_id.is_empty() {
            warn!("discarding GameCreated with empty session or creator id");
            return Vec::new();
        }
        let mut changes = Vec::new();
        if self.session.is_active() && self.session.id() != session_id {
            // While a session is running, a snapshot for another session
            // is stale. Once the current one has finished, a new snapshot
            // supersedes it: tear down the old session and proceed.
            if !self.session.phase().is_terminal() {
                return vec![self.stale(session_id)];
            }
            changes.extend(self.teardown());
        }
        if self.session.is_active() && self.session.phase().is_terminal() {
            debug!(%session_id, "ignoring GameCreated for finished session");
            return Vec::new();
        }

        if self
            .session
            .set(session_id.clone(), creator_id.clone(), config, GamePhase::Created)
        {
            changes.push(StateChange::SessionCreated { session_id });
        }
        // Seat the creator. Only the creating client can do the self-add;
        // other clients learn about the creator via PlayerJoined.
        if self.identity.id() == creator_id {
            let player = self.identity.profile().clone();
            match self.roster.upsert(player.clone()) {
                UpsertOutcome::Inserted => changes.push(StateChange::PlayerJoined { player }),
                UpsertOutcome::Updated => changes.push(StateChange::PlayerUpdated { player }),
                UpsertOutcome::Unchanged => {}
            }
        }
        // The session is now open for joins.
        self.session.advance(GamePhase::WaitingForPlayers);
        changes
    }

    fn apply_player_joined(
        &mut self,
        session_id: SessionId,
        player: PlayerProfile,
    ) -> Vec<StateChange> {
        if self.session.id() != session_id {
            return vec![self.stale(session_id)];
        }
        if player.id.is_empty() {
            warn!(%session_id, "discarding PlayerJoined with empty player id");
            return Vec::new();
        }
        if self.session.phase().is_terminal() {
            debug!(%session_id, "ignoring PlayerJoined for finished session");
            return Vec::new();
        }
        // Later message wins: a re-announced player takes the new
        // metadata in place instead of being treated as a duplicate.
        match self.roster.upsert(player.clone()) {
            UpsertOutcome::Inserted => vec![StateChange::PlayerJoined { player }],
            UpsertOutcome::Updated => vec![StateChange::PlayerUpdated { player }],
            UpsertOutcome::Unchanged => {
                debug!(player_id = %player.id, "duplicate PlayerJoined, no change");
                Vec::new()
            }
        }
    }

    fn apply_player_left(&mut self, session_id: SessionId, player_id: String) -> Vec<StateChange> {
        if self.session.id() != session_id {
            return vec![self.stale(session_id)];
        }
        if player_id.is_empty() {
            warn!(%session_id, "discarding PlayerLeft with empty player id");
            return Vec::new();
        }
        if self.session.phase().is_terminal() {
            debug!(%session_id, "ignoring PlayerLeft for finished session");
            return Vec::new();
        }
        if self.roster.remove(&player_id) {
            vec![StateChange::PlayerLeft { player_id }]
        } else {
            debug!(%player_id, "PlayerLeft for absent player, no change");
            Vec::new()
        }
    }

    fn apply_game_started(&mut self, session_id: SessionId) -> Vec<StateChange> {
        if self.session.id() != session_id {
            return vec![self.stale(session_id)];
        }
        if self.session.mark_started() {
            vec![StateChange::GameStarted { session_id }]
        } else {
            debug!(%session_id, "duplicate GameStarted, no change");
            Vec::new()
        }
    }

    fn apply_game_finished(
        &mut self,
        session_id: SessionId,
        results: Vec<crate::protocol::ScoreEntry>,
    ) -> Vec<StateChange> {
        if self.session.id() != session_id {
            return vec![self.stale(session_id)];
        }
        // Results delivery is the one thing a finished session still
        // accepts — but re-delivery is a no-op, so state after applying
        // the event twice equals state after applying it once.
        if self.session.mark_finished() {
            vec![StateChange::GameFinished {
                session_id,
                results,
            }]
        } else {
            debug!(%session_id, "duplicate GameFinished, no change");
            Vec::new()
        }
    }

    fn stale(&self, event_session_id: SessionId) -> StateChange {
        warn!(
            active = %self.session.id(),
            received = %event_session_id,
            "discarding event for non-active session"
        );
        StateChange::StaleEventDiscarded {
            active_session_id: self.session.id().to_owned(),
            event_session_id,
        }
    }

    // ── Derived reads ───────────────────────────────────────────────

    /// Returns `true` if the local identity created the active session.
    pub fn is_creator(&self) -> bool {
        self.identity.is_set() && self.identity.id() == self.session.creator_id()
    }

    /// True iff the session phase is `Started` or `Finished`.
    pub fn has_started(&self) -> bool {
        self.session.has_started()
    }

    /// The current roster, in join order.
    pub fn roster(&self) -> &[PlayerProfile] {
        self.roster.players()
    }

    /// The active session snapshot, or `None` if no session is active.
    pub fn session(&self) -> Option<&Session> {
        self.session.is_active().then(|| self.session.session())
    }

    /// The local identity, or `None` if unset.
    pub fn identity(&self) -> Option<&PlayerProfile> {
        self.identity.is_set().then(|| self.identity.profile())
    }
}

/// Rejects configs the server would refuse: zero counts or duration.
fn validate_config(config: &GameConfig) -> Result<()> {
    if config.player_count < 1 {
        return Err(CinemojiError::InvalidConfig(
            "player_count must be at least 1".into(),
        ));
    }
    if config.round_count < 1 {
        return Err(CinemojiError::InvalidConfig(
            "round_count must be at least 1".into(),
        ));
    }
    if config.round_duration_secs == 0 {
        return Err(CinemojiError::InvalidConfig(
            "round_duration must be greater than zero".into(),
        ));
    }
    Ok(())
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
    use crate::protocol::ScoreEntry;

    fn config() -> GameConfig {
        GameConfig {
            player_count: 4,
            round_count: 5,
            round_duration_secs: 60,
        }
    }

    fn player(id: &str, name: &str) -> PlayerProfile {
        PlayerProfile {
            id: id.into(),
            display_name: name.into(),
            avatar_ref: format!("avatar-{id}"),
        }
    }

    fn game_created(session_id: &str, creator_id: &str) -> ServerEvent {
        ServerEvent::GameCreated {
            session_id: session_id.into(),
            creator_id: creator_id.into(),
            config: config(),
        }
    }

    fn player_joined(session_id: &str, p: PlayerProfile) -> ServerEvent {
        ServerEvent::PlayerJoined {
            session_id: session_id.into(),
            player: p,
        }
    }

    /// Reconciler with identity "alice" set and session "g1" created by her.
    fn alice_in_g1() -> Reconciler {
        let mut r = Reconciler::new();
        r.set_identity("alice", "Alice", "a1").unwrap();
        r.apply(game_created("g1", "alice"));
        r
    }

    // ── Identity ────────────────────────────────────────────────────

    #[test]
    fn set_identity_rejects_empty_id() {
        let mut r = Reconciler::new();
        let err = r.set_identity("", "Alice", "a1").unwrap_err();
        assert!(matches!(err, CinemojiError::EmptyId("player")));
        assert!(r.identity().is_none());
    }

    #[test]
    fn set_identity_removes_stale_roster_entry() {
        let mut r = alice_in_g1();
        assert_eq!(r.roster().len(), 1);

        r.set_identity("alice2", "Alice", "a1").unwrap();
        assert!(r.roster().is_empty(), "old id's roster entry must go");
        assert_eq!(r.identity().unwrap().id, "alice2");
    }

    // ── Create flow ─────────────────────────────────────────────────

    #[test]
    fn prepare_create_requires_identity() {
        let r = Reconciler::new();
        assert!(matches!(
            r.prepare_create_game(config()),
            Err(CinemojiError::NoIdentity)
        ));
    }

    #[test]
    fn prepare_create_rejects_invalid_config() {
        let mut r = Reconciler::new();
        r.set_identity("alice", "Alice", "a1").unwrap();

        let mut bad = config();
        bad.round_count = 0;
        assert!(matches!(
            r.prepare_create_game(bad),
            Err(CinemojiError::InvalidConfig(_))
        ));

        let mut bad = config();
        bad.round_duration_secs = 0;
        assert!(matches!(
            r.prepare_create_game(bad),
            Err(CinemojiError::InvalidConfig(_))
        ));
    }

    #[test]
    fn prepare_create_does_not_mutate_state() {
        let mut r = Reconciler::new();
        r.set_identity("alice", "Alice", "a1").unwrap();
        let request = r.prepare_create_game(config()).unwrap();
        assert!(matches!(request, ClientRequest::CreateGame { .. }));
        // No optimistic session, no optimistic roster entry.
        assert!(r.session().is_none());
        assert!(r.roster().is_empty());
    }

    #[test]
    fn game_created_sets_session_and_seats_creator() {
        let mut r = Reconciler::new();
        r.set_identity("alice", "Alice", "a1").unwrap();

        let changes = r.apply(game_created("g1", "alice"));
        assert_eq!(changes.len(), 2);
        assert!(matches!(
            changes[0],
            StateChange::SessionCreated { ref session_id } if session_id == "g1"
        ));
        assert!(matches!(changes[1], StateChange::PlayerJoined { .. }));

        let session = r.session().unwrap();
        assert_eq!(session.id, "g1");
        assert_eq!(session.creator_id, "alice");
        assert_eq!(session.phase, GamePhase::WaitingForPlayers);
        assert!(r.is_creator());
        assert_eq!(r.roster().len(), 1);
        assert_eq!(r.roster()[0].id, "alice");
    }

    #[test]
    fn game_created_on_non_creator_does_not_self_add() {
        let mut r = Reconciler::new();
        r.set_identity("bob", "Bob", "b1").unwrap();

        let changes = r.apply(game_created("g1", "alice"));
        assert_eq!(changes.len(), 1);
        assert!(r.roster().is_empty());
        assert!(!r.is_creator());
    }

    #[test]
    fn duplicate_game_created_is_noop() {
        let mut r = alice_in_g1();
        let changes = r.apply(game_created("g1", "alice"));
        assert!(changes.is_empty());
        assert_eq!(r.roster().len(), 1);
        assert_eq!(r.session().unwrap().phase, GamePhase::WaitingForPlayers);
    }

    #[test]
    fn game_created_for_other_session_is_stale_while_active() {
        let mut r = alice_in_g1();
        let changes = r.apply(game_created("g2", "bob"));
        assert_eq!(
            changes,
            vec![StateChange::StaleEventDiscarded {
                active_session_id: "g1".into(),
                event_session_id: "g2".into(),
            }]
        );
        assert_eq!(r.session().unwrap().id, "g1");
    }

    #[test]
    fn new_session_supersedes_finished_one() {
        let mut r = alice_in_g1();
        r.apply(ServerEvent::GameFinished {
            session_id: "g1".into(),
            results: vec![],
        });

        let changes = r.apply(game_created("g2", "alice"));
        assert_eq!(changes[0], StateChange::SessionCleared);
        assert!(matches!(
            changes[1],
            StateChange::SessionCreated { ref session_id } if session_id == "g2"
        ));

        let session = r.session().unwrap();
        assert_eq!(session.id, "g2");
        assert_eq!(session.phase, GamePhase::WaitingForPlayers);
        assert_eq!(r.roster().len(), 1, "only the creator is seated again");
    }

    // ── Join flow ───────────────────────────────────────────────────

    #[test]
    fn prepare_join_requires_identity_and_session_id() {
        let mut r = Reconciler::new();
        assert!(matches!(
            r.prepare_join("g1"),
            Err(CinemojiError::NoIdentity)
        ));
        r.set_identity("bob", "Bob", "b1").unwrap();
        assert!(matches!(
            r.prepare_join(""),
            Err(CinemojiError::EmptyId("session"))
        ));
        assert!(r.prepare_join("g1").is_ok());
        // Join never mutates the roster; the broadcast does.
        assert!(r.roster().is_empty());
    }

    #[test]
    fn player_joined_applied_twice_equals_once() {
        let mut r = alice_in_g1();
        let bob = player("bob", "Bob");

        let first = r.apply(player_joined("g1", bob.clone()));
        assert_eq!(first, vec![StateChange::PlayerJoined { player: bob.clone() }]);

        let second = r.apply(player_joined("g1", bob));
        assert!(second.is_empty());
        assert_eq!(r.roster().len(), 2);
    }

    #[test]
    fn rejoin_with_new_metadata_updates_in_place() {
        let mut r = alice_in_g1();
        r.apply(player_joined("g1", player("p1", "Bob")));
        r.apply(player_joined("g1", player("p2", "Carol")));

        let renamed = PlayerProfile {
            id: "p1".into(),
            display_name: "Bobby".into(),
            avatar_ref: "a2".into(),
        };
        let changes = r.apply(player_joined("g1", renamed.clone()));
        assert_eq!(changes, vec![StateChange::PlayerUpdated { player: renamed }]);

        // Position preserved, metadata replaced.
        assert_eq!(r.roster().len(), 3);
        assert_eq!(r.roster()[1].id, "p1");
        assert_eq!(r.roster()[1].display_name, "Bobby");
        assert_eq!(r.roster()[1].avatar_ref, "a2");
    }

    #[test]
    fn player_joined_for_other_session_is_discarded() {
        let mut r = alice_in_g1();
        let changes = r.apply(player_joined("g9", player("bob", "Bob")));
        assert!(matches!(
            changes.as_slice(),
            [StateChange::StaleEventDiscarded { .. }]
        ));
        assert_eq!(r.roster().len(), 1);
    }

    #[test]
    fn player_joined_with_empty_id_is_discarded() {
        let mut r = alice_in_g1();
        let changes = r.apply(player_joined("g1", player("", "Ghost")));
        assert!(changes.is_empty());
        assert_eq!(r.roster().len(), 1);
    }

    #[test]
    fn player_left_removes_from_roster() {
        let mut r = alice_in_g1();
        r.apply(player_joined("g1", player("bob", "Bob")));

        let changes = r.apply(ServerEvent::PlayerLeft {
            session_id: "g1".into(),
            player_id: "bob".into(),
        });
        assert_eq!(
            changes,
            vec![StateChange::PlayerLeft {
                player_id: "bob".into()
            }]
        );
        assert_eq!(r.roster().len(), 1);

        // Departure of an absent player is a no-op.
        let changes = r.apply(ServerEvent::PlayerLeft {
            session_id: "g1".into(),
            player_id: "bob".into(),
        });
        assert!(changes.is_empty());
    }

    // ── Start flow ──────────────────────────────────────────────────

    #[test]
    fn prepare_start_enforces_preconditions() {
        let mut r = Reconciler::new();
        assert!(matches!(
            r.prepare_start(),
            Err(CinemojiError::NoActiveSession)
        ));

        // Bob is not the creator of g1.
        r.set_identity("bob", "Bob", "b1").unwrap();
        r.apply(game_created("g1", "alice"));
        assert!(matches!(r.prepare_start(), Err(CinemojiError::NotCreator)));

        let mut r = alice_in_g1();
        assert!(r.prepare_start().is_ok());
        r.apply(ServerEvent::GameStarted {
            session_id: "g1".into(),
        });
        assert!(matches!(
            r.prepare_start(),
            Err(CinemojiError::AlreadyStarted)
        ));
    }

    #[test]
    fn game_started_is_idempotent_and_monotonic() {
        let mut r = alice_in_g1();

        let changes = r.apply(ServerEvent::GameStarted {
            session_id: "g1".into(),
        });
        assert_eq!(
            changes,
            vec![StateChange::GameStarted {
                session_id: "g1".into()
            }]
        );
        assert!(r.has_started());

        let changes = r.apply(ServerEvent::GameStarted {
            session_id: "g1".into(),
        });
        assert!(changes.is_empty());
        assert!(r.has_started());
    }

    #[test]
    fn stale_game_started_leaves_active_session_untouched() {
        let mut r = alice_in_g1();
        let changes = r.apply(ServerEvent::GameStarted {
            session_id: "g2".into(),
        });
        assert_eq!(
            changes,
            vec![StateChange::StaleEventDiscarded {
                active_session_id: "g1".into(),
                event_session_id: "g2".into(),
            }]
        );
        assert!(!r.has_started());
        assert_eq!(r.session().unwrap().id, "g1");
    }

    // ── Guess flow ──────────────────────────────────────────────────

    #[test]
    fn prepare_guess_requires_started_phase() {
        let mut r = alice_in_g1();
        assert!(matches!(r.prepare_guess(serde_json::json!({})), Err(CinemojiError::NotStarted)));

        r.apply(ServerEvent::GameStarted {
            session_id: "g1".into(),
        });
        let request = r.prepare_guess(serde_json::json!({"movie": "Up"})).unwrap();
        assert!(matches!(request, ClientRequest::SubmitGuess { .. }));

        r.apply(ServerEvent::GameFinished {
            session_id: "g1".into(),
            results: vec![],
        });
        assert!(matches!(
            r.prepare_guess(serde_json::json!({})),
            Err(CinemojiError::AlreadyFinished)
        ));
    }

    // ── Finish & teardown ───────────────────────────────────────────

    #[test]
    fn game_finished_delivers_results_once() {
        let mut r = alice_in_g1();
        r.apply(ServerEvent::GameStarted {
            session_id: "g1".into(),
        });

        let results = vec![ScoreEntry {
            player_id: "alice".into(),
            score: 42,
        }];
        let changes = r.apply(ServerEvent::GameFinished {
            session_id: "g1".into(),
            results: results.clone(),
        });
        assert_eq!(
            changes,
            vec![StateChange::GameFinished {
                session_id: "g1".into(),
                results: results.clone(),
            }]
        );
        assert!(r.has_started());
        assert_eq!(r.session().unwrap().phase, GamePhase::Finished);

        // Re-delivery is a duplicate: no change.
        let changes = r.apply(ServerEvent::GameFinished {
            session_id: "g1".into(),
            results,
        });
        assert!(changes.is_empty());
    }

    #[test]
    fn finished_session_ignores_everything_but_results() {
        let mut r = alice_in_g1();
        r.apply(ServerEvent::GameFinished {
            session_id: "g1".into(),
            results: vec![],
        });

        assert!(r
            .apply(player_joined("g1", player("late", "Latecomer")))
            .is_empty());
        assert!(r
            .apply(ServerEvent::PlayerLeft {
                session_id: "g1".into(),
                player_id: "alice".into(),
            })
            .is_empty());
        assert!(r
            .apply(ServerEvent::GameStarted {
                session_id: "g1".into(),
            })
            .is_empty());
        assert_eq!(r.roster().len(), 1);
        assert_eq!(r.session().unwrap().phase, GamePhase::Finished);
    }

    #[test]
    fn teardown_clears_roster_and_session_keeps_identity() {
        let mut r = alice_in_g1();
        r.apply(player_joined("g1", player("bob", "Bob")));

        let changes = r.teardown();
        assert_eq!(changes, vec![StateChange::SessionCleared]);
        assert!(r.roster().is_empty());
        assert!(r.session().is_none());
        assert_eq!(r.identity().unwrap().id, "alice");

        // Second teardown has nothing to do.
        assert!(r.teardown().is_empty());
    }

    #[test]
    fn confirmation_after_abandoned_action_still_applies() {
        // Caller prepared a join, navigated away, and the broadcast
        // arrives anyway: it applies against current store state.
        let mut r = Reconciler::new();
        r.set_identity("bob", "Bob", "b1").unwrap();
        let _abandoned = r.prepare_join("g1").unwrap();

        r.apply(game_created("g1", "alice"));
        let changes = r.apply(player_joined("g1", player("bob", "Bob")));
        assert!(matches!(
            changes.as_slice(),
            [StateChange::PlayerJoined { .. }]
        ));
        assert_eq!(r.roster().len(), 1);
    }

    #[test]
    fn unknown_event_is_ignored() {
        let mut r = alice_in_g1();
        assert!(r.apply(ServerEvent::Unknown).is_empty());
        assert_eq!(r.session().unwrap().id, "g1");
    }
}
