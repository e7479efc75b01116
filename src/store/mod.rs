//! Passive state holders for the client's view of a game session.
//!
//! The stores never call outward — they are plain data with
//! accessor/mutator contracts. All cross-store coordination and invariant
//! enforcement lives in the [`Reconciler`](crate::Reconciler), which owns
//! one instance of each.

pub mod identity;
pub mod roster;
pub mod session;

pub use identity::IdentityStore;
pub use roster::{Roster, UpsertOutcome};
pub use session::{Session, SessionStore};
