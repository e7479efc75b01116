#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for Cinemoji client integration tests.
//!
//! Provides a scripted [`MockTransport`] and helper functions for
//! constructing common server events.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use cinemoji_client::protocol::{ClientRequest, GameConfig, PlayerProfile, ScoreEntry, ServerEvent};
use cinemoji_client::{CinemojiError, Transport};

// ── MockTransport ───────────────────────────────────────────────────

/// A scripted mock transport for integration testing.
///
/// Server events are consumed in order by `recv()`. All requests sent by
/// the client are recorded in `sent`.
pub struct MockTransport {
    /// Scripted server events (consumed in order by `recv`).
    incoming: VecDeque<Option<Result<ServerEvent, CinemojiError>>>,
    /// Recorded outgoing requests from the client.
    pub sent: Arc<StdMutex<Vec<ClientRequest>>>,
    /// Whether `close()` has been called.
    pub closed: Arc<AtomicBool>,
}

impl MockTransport {
    /// Create a new mock transport with the given scripted incoming events.
    ///
    /// Returns the transport plus shared handles for inspecting sent
    /// requests and whether close was called.
    #[allow(clippy::type_complexity)]
    pub fn new(
        incoming: Vec<Option<Result<ServerEvent, CinemojiError>>>,
    ) -> (
        Self,
        Arc<StdMutex<Vec<ClientRequest>>>,
        Arc<AtomicBool>,
    ) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming: VecDeque::from(incoming),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, sent, closed)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, request: ClientRequest) -> Result<(), CinemojiError> {
        self.sent.lock().unwrap().push(request);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<ServerEvent, CinemojiError>> {
        if let Some(item) = self.incoming.pop_front() {
            item
        } else {
            // No more scripted events — hang forever so the transport
            // loop stays alive until shutdown is called.
            std::future::pending().await
        }
    }

    async fn close(&mut self) -> Result<(), CinemojiError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── Event builders ──────────────────────────────────────────────────

/// A 4-player, 5-round, 60-second config used across tests.
pub fn small_config() -> GameConfig {
    GameConfig {
        player_count: 4,
        round_count: 5,
        round_duration_secs: 60,
    }
}

/// A player profile with a derived avatar ref.
pub fn profile(id: &str, name: &str) -> PlayerProfile {
    PlayerProfile {
        id: id.into(),
        display_name: name.into(),
        avatar_ref: format!("avatars/{id}.png"),
    }
}

/// `GameCreated` for the given session and creator, with [`small_config`].
pub fn game_created(session_id: &str, creator_id: &str) -> ServerEvent {
    ServerEvent::GameCreated {
        session_id: session_id.into(),
        creator_id: creator_id.into(),
        config: small_config(),
    }
}

/// `PlayerJoined` broadcast for the given session.
pub fn player_joined(session_id: &str, player: PlayerProfile) -> ServerEvent {
    ServerEvent::PlayerJoined {
        session_id: session_id.into(),
        player,
    }
}

/// `PlayerLeft` broadcast for the given session.
pub fn player_left(session_id: &str, player_id: &str) -> ServerEvent {
    ServerEvent::PlayerLeft {
        session_id: session_id.into(),
        player_id: player_id.into(),
    }
}

/// `GameStarted` for the given session.
pub fn game_started(session_id: &str) -> ServerEvent {
    ServerEvent::GameStarted {
        session_id: session_id.into(),
    }
}

/// `GameFinished` with the given standings.
pub fn game_finished(session_id: &str, results: Vec<(&str, i64)>) -> ServerEvent {
    ServerEvent::GameFinished {
        session_id: session_id.into(),
        results: results
            .into_iter()
            .map(|(player_id, score)| ScoreEntry {
                player_id: player_id.into(),
                score,
            })
            .collect(),
    }
}
