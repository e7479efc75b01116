//! The set of players joined to the active session.

use crate::protocol::PlayerProfile;

/// Outcome of a [`Roster::upsert`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The player was not present and has been appended.
    Inserted,
    /// The player was present with different metadata; the entry was
    /// updated in place (position unchanged).
    Updated,
    /// The player was present with identical metadata; nothing changed.
    Unchanged,
}

/// Insertion-ordered collection of players, keyed by player id.
///
/// Ids are unique within the roster; duplicate inserts are no-ops and
/// never reorder existing entries. A linear scan is fine at party-game
/// roster sizes.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: Vec<PlayerProfile>,
}

impl Roster {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the player if the id is not already present.
    ///
    /// Returns `true` if an insertion occurred. Existing entries are left
    /// untouched, so a duplicated join broadcast cannot create a duplicate
    /// entry or reorder the list.
    pub fn add(&mut self, player: PlayerProfile) -> bool {
        if self.contains(&player.id) {
            return false;
        }
        self.players.push(player);
        true
    }

    /// Update-if-present, insert-if-absent.
    ///
    /// A re-announced player with changed metadata (e.g. renamed) keeps
    /// its roster position but takes the later message's display name and
    /// avatar — last writer wins.
    pub fn upsert(&mut self, player: PlayerProfile) -> UpsertOutcome {
        match self.players.iter_mut().find(|p| p.id == player.id) {
            Some(existing) if *existing == player => UpsertOutcome::Unchanged,
            Some(existing) => {
                existing.display_name = player.display_name;
                existing.avatar_ref = player.avatar_ref;
                UpsertOutcome::Updated
            }
            None => {
                self.players.push(player);
                UpsertOutcome::Inserted
            }
        }
    }

    /// Removes a player. No-op if absent. Returns whether a removal occurred.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.id != id);
        self.players.len() != before
    }

    /// Returns `true` if a player with the given id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    /// Read-only view of the players in insertion order.
    ///
    /// A fresh call always reflects current state; this is not a one-shot
    /// cursor.
    pub fn players(&self) -> &[PlayerProfile] {
        &self.players
    }

    /// Number of players in the roster.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns `true` if no players have joined.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Empties the roster.
    pub fn clear(&mut self) {
        self.players.clear();
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn player(id: &str, name: &str, avatar: &str) -> PlayerProfile {
        PlayerProfile {
            id: id.into(),
            display_name: name.into(),
            avatar_ref: avatar.into(),
        }
    }

    #[test]
    fn add_is_idempotent_per_id() {
        let mut roster = Roster::new();
        assert!(roster.add(player("p1", "Bob", "a1")));
        assert!(!roster.add(player("p1", "Bob", "a1")));
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.players()[0].display_name, "Bob");
    }

    #[test]
    fn add_preserves_insertion_order() {
        let mut roster = Roster::new();
        roster.add(player("p1", "Alice", "a1"));
        roster.add(player("p2", "Bob", "a2"));
        roster.add(player("p3", "Carol", "a3"));
        // Re-adding p1 must not move it.
        roster.add(player("p1", "Alice", "a1"));

        let ids: Vec<&str> = roster.players().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn duplicate_add_does_not_overwrite_metadata() {
        let mut roster = Roster::new();
        roster.add(player("p1", "Bob", "a1"));
        assert!(!roster.add(player("p1", "Bobby", "a2")));
        assert_eq!(roster.players()[0].display_name, "Bob");
    }

    #[test]
    fn upsert_updates_in_place_keeping_position() {
        let mut roster = Roster::new();
        roster.add(player("p1", "Bob", "a1"));
        roster.add(player("p2", "Carol", "a2"));

        let outcome = roster.upsert(player("p1", "Bobby", "a9"));
        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.players()[0].id, "p1");
        assert_eq!(roster.players()[0].display_name, "Bobby");
        assert_eq!(roster.players()[0].avatar_ref, "a9");
    }

    #[test]
    fn upsert_identical_is_unchanged() {
        let mut roster = Roster::new();
        roster.add(player("p1", "Bob", "a1"));
        assert_eq!(
            roster.upsert(player("p1", "Bob", "a1")),
            UpsertOutcome::Unchanged
        );
    }

    #[test]
    fn upsert_inserts_when_absent() {
        let mut roster = Roster::new();
        assert_eq!(
            roster.upsert(player("p1", "Bob", "a1")),
            UpsertOutcome::Inserted
        );
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn remove_is_noop_when_absent() {
        let mut roster = Roster::new();
        roster.add(player("p1", "Bob", "a1"));
        assert!(!roster.remove("p2"));
        assert!(roster.remove("p1"));
        assert!(roster.is_empty());
    }

    #[test]
    fn clear_empties_roster() {
        let mut roster = Roster::new();
        roster.add(player("p1", "Bob", "a1"));
        roster.add(player("p2", "Carol", "a2"));
        roster.clear();
        assert!(roster.is_empty());
        assert!(roster.players().is_empty());
    }

    #[test]
    fn repeated_ids_appear_at_most_once_in_first_insertion_order() {
        let mut roster = Roster::new();
        for id in ["p2", "p1", "p2", "p3", "p1", "p2"] {
            roster.add(player(id, id, "a"));
        }
        let ids: Vec<&str> = roster.players().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p1", "p3"]);
    }
}
