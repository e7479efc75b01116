//! # Cinemoji Client
//!
//! Client-side session state layer for the Cinemoji multiplayer party
//! game: the local participant's identity, the roster of joined players,
//! and the lifecycle of the active game session.
//!
//! The core is the [`Reconciler`] — the single place where inbound server
//! events and local action requests turn into store mutations, under the
//! invariants that matter: roster ids are unique and insertion-ordered,
//! at most one session is active, and the session phase only ever moves
//! forward. The server is the source of truth; local state is a cache
//! that converges to server-announced state and is never mutated
//! optimistically.
//!
//! ## Features
//!
//! - **Transport-agnostic** — implement the [`Transport`] trait for any
//!   backend; the state layer never sees bytes
//! - **Event-driven** — receive typed [`CinemojiEvent`]s via a channel
//!   from the background transport loop
//! - **Synchronous core** — the [`Reconciler`] and its stores are plain
//!   in-memory state, directly constructible and unit-testable without a
//!   runtime
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! let transport = connect_somehow().await;
//! let (client, mut events) = CinemojiClient::start(transport, CinemojiConfig::new());
//!
//! client.set_identity("u1", "Alice", "avatars/cat.png")?;
//! client.create_game(CreateGameParams::new().with_round_count(5))?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         CinemojiEvent::StateChanged(change) => { /* re-render */ }
//!         CinemojiEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

pub mod client;
pub mod error;
pub mod event;
pub mod protocol;
pub mod reconciler;
pub mod store;
pub mod transport;

// Re-export primary types for ergonomic imports.
pub use client::{CinemojiClient, CinemojiConfig, CreateGameParams};
pub use error::CinemojiError;
pub use event::{CinemojiEvent, StateChange};
pub use protocol::{ClientRequest, GameConfig, GamePhase, PlayerProfile, ScoreEntry, ServerEvent};
pub use reconciler::Reconciler;
pub use store::Session;
pub use transport::Transport;
