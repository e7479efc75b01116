//! The local participant's identity.

use crate::protocol::{PlayerId, PlayerProfile};

/// Holds the local participant's identity.
///
/// Exactly one identity exists per client. The empty sentinel (all fields
/// empty) means "not set". The identity survives session teardown so a
/// user can join another game without re-entering their profile.
#[derive(Debug, Clone, Default)]
pub struct IdentityStore {
    current: PlayerProfile,
}

impl IdentityStore {
    /// Creates an empty identity store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the identity wholesale. Inputs are validated by the caller.
    pub fn set(&mut self, id: PlayerId, display_name: String, avatar_ref: String) {
        self.current = PlayerProfile {
            id,
            display_name,
            avatar_ref,
        };
    }

    /// Returns the current id, or the empty string if unset.
    pub fn id(&self) -> &str {
        &self.current.id
    }

    /// Returns the full profile. Empty sentinel when unset.
    pub fn profile(&self) -> &PlayerProfile {
        &self.current
    }

    /// Returns `true` once an identity has been set.
    pub fn is_set(&self) -> bool {
        !self.current.is_empty()
    }

    /// Resets to the empty sentinel. Used on explicit logout.
    pub fn clear(&mut self) {
        self.current = PlayerProfile::default();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn starts_unset() {
        let store = IdentityStore::new();
        assert!(!store.is_set());
        assert_eq!(store.id(), "");
    }

    #[test]
    fn set_replaces_wholesale() {
        let mut store = IdentityStore::new();
        store.set("u1".into(), "Alice".into(), "a1".into());
        assert!(store.is_set());
        assert_eq!(store.id(), "u1");
        assert_eq!(store.profile().display_name, "Alice");

        store.set("u2".into(), "Bob".into(), "a2".into());
        assert_eq!(store.id(), "u2");
        assert_eq!(store.profile().avatar_ref, "a2");
    }

    #[test]
    fn clear_returns_to_sentinel() {
        let mut store = IdentityStore::new();
        store.set("u1".into(), "Alice".into(), "a1".into());
        store.clear();
        assert!(!store.is_set());
        assert_eq!(store.id(), "");
        assert_eq!(store.profile().display_name, "");
        assert_eq!(store.profile().avatar_ref, "");
    }
}
