//! Async client for the Cinemoji session state layer.
//!
//! [`CinemojiClient`] is a thin handle over a background transport loop
//! task. Outbound requests travel through an unbounded MPSC channel;
//! state changes and connection lifecycle events are emitted on a bounded
//! channel ([`tokio::sync::mpsc::Receiver<CinemojiEvent>`]) returned from
//! [`CinemojiClient::start`].
//!
//! The loop owns event application order: inbound server events are
//! applied to the shared [`Reconciler`] strictly in arrival order, one at
//! a time. The handle reaches the same reconciler through a single-writer
//! mutex, which is what keeps local-action validation and the derived
//! reads synchronous.
//!
//! # Example
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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::error::{CinemojiError, Result};
use crate::event::{CinemojiEvent, StateChange};
use crate::protocol::{ClientRequest, GameConfig, PlayerProfile, SessionId};
use crate::reconciler::Reconciler;
use crate::store::Session;
use crate::transport::Transport;

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`CinemojiClient`].
///
/// All fields have sensible defaults.
///
/// # Example
///
/// ```
/// use cinemoji_client::client::CinemojiConfig;
/// use std::time::Duration;
///
/// let config = CinemojiConfig::new()
///     .with_event_channel_capacity(512)
///     .with_shutdown_timeout(Duration::from_secs(5));
/// assert_eq!(config.event_channel_capacity, 512);
/// ```
#[derive(Debug, Clone)]
pub struct CinemojiConfig {
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer cannot keep up with incoming server events,
    /// events are dropped (with a warning logged) to avoid blocking the
    /// transport loop. The `Disconnected` event is always delivered
    /// regardless of capacity.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Timeout for the graceful shutdown.
    ///
    /// When [`CinemojiClient::shutdown`] is called, the background
    /// transport loop is given this much time to close the transport and
    /// emit a final `Disconnected` event. If the timeout expires the task
    /// is aborted.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl Default for CinemojiConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl CinemojiConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the capacity of the bounded event channel.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the timeout for the graceful shutdown.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

// ── CreateGameParams ────────────────────────────────────────────────

/// Parameters for creating a game.
///
/// Wraps [`GameConfig`] with a builder. Defaults match the backend's:
/// 10 players, 10 rounds, 60 seconds per round.
///
/// # Example
///
/// ```
/// use cinemoji_client::client::CreateGameParams;
/// use std::time::Duration;
///
/// let params = CreateGameParams::new()
///     .with_player_count(4)
///     .with_round_count(5)
///     .with_round_duration(Duration::from_secs(90));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CreateGameParams {
    config: GameConfig,
}

impl CreateGameParams {
    /// Create params with the backend defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many players the session admits.
    #[must_use]
    pub fn with_player_count(mut self, player_count: u32) -> Self {
        self.config.player_count = player_count;
        self
    }

    /// Set the number of rounds.
    #[must_use]
    pub fn with_round_count(mut self, round_count: u32) -> Self {
        self.config.round_count = round_count;
        self
    }

    /// Set the per-round time limit. Sub-second durations truncate to
    /// whole seconds.
    #[must_use]
    pub fn with_round_duration(mut self, round_duration: Duration) -> Self {
        self.config.round_duration_secs = round_duration.as_secs();
        self
    }

    /// The resulting game config. Validation happens at
    /// [`CinemojiClient::create_game`] time.
    pub fn into_config(self) -> GameConfig {
        self.config
    }
}

// ── Client handle ───────────────────────────────────────────────────

/// Async client handle for the Cinemoji session state layer.
///
/// Created via [`CinemojiClient::start`], which spawns a background
/// transport loop and returns this handle together with an event
/// receiver.
///
/// Action methods validate against current state, queue the typed
/// request to the transport loop, and return immediately once the
/// request is queued (no round-trip await). Derived reads are pure,
/// synchronous snapshots of current store state.
pub struct CinemojiClient {
    /// Sender half of the request channel to the transport loop.
    cmd_tx: mpsc::UnboundedSender<ClientRequest>,
    /// Reconciler shared with the transport loop behind a single-writer lock.
    reconciler: Arc<Mutex<Reconciler>>,
    /// Whether the transport is believed to be connected.
    connected: Arc<AtomicBool>,
    /// Handle to the background transport loop task.
    task: Option<tokio::task::JoinHandle<()>>,
    /// Oneshot sender to signal the transport loop to shut down gracefully.
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    /// Timeout for the graceful shutdown.
    shutdown_timeout: Duration,
}

impl CinemojiClient {
    /// Start the client transport loop and return a handle plus event
    /// receiver.
    ///
    /// # Arguments
    ///
    /// * `transport` — A connected [`Transport`] implementation.
    /// * `config` — Client configuration.
    ///
    /// # Returns
    ///
    /// A tuple of `(client_handle, event_receiver)`. The receiver yields
    /// [`CinemojiEvent`]s until the transport closes or the client shuts
    /// down.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(
        transport: impl Transport,
        config: CinemojiConfig,
    ) -> (Self, mpsc::Receiver<CinemojiEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<ClientRequest>();
        // Clamp capacity to at least 1 (tokio panics on 0).
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<CinemojiEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let reconciler = Arc::new(Mutex::new(Reconciler::new()));
        let connected = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(transport_loop(
            transport,
            cmd_rx,
            event_tx,
            Arc::clone(&reconciler),
            Arc::clone(&connected),
            shutdown_rx,
        ));

        let client = Self {
            cmd_tx,
            reconciler,
            connected,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };

        (client, event_rx)
    }

    // ── Identity ────────────────────────────────────────────────────

    /// Set the local identity. Purely local; nothing is sent.
    ///
    /// # Errors
    ///
    /// Returns [`CinemojiError::EmptyId`] for an empty id — a caller bug,
    /// rejected before any state changes.
    pub fn set_identity(
        &self,
        id: impl Into<String>,
        display_name: impl Into<String>,
        avatar_ref: impl Into<String>,
    ) -> Result<()> {
        self.lock_reconciler()
            .set_identity(id, display_name, avatar_ref)
    }

    /// Clear the local identity (explicit logout). Purely local.
    pub fn clear_identity(&self) {
        self.lock_reconciler().clear_identity();
    }

    // ── Actions ─────────────────────────────────────────────────────

    /// Request creation of a new game session.
    ///
    /// No local state changes until the server confirms with
    /// `GameCreated`, which arrives on the event channel as
    /// [`StateChange::SessionCreated`].
    ///
    /// # Errors
    ///
    /// Validation errors from the reconciler, or
    /// [`CinemojiError::NotConnected`] if the transport has closed.
    pub fn create_game(&self, params: CreateGameParams) -> Result<()> {
        let request = self
            .lock_reconciler()
            .prepare_create_game(params.into_config())?;
        self.send(request)
    }

    /// Request to join an existing session. The roster is only mutated
    /// once the server's `PlayerJoined` broadcast comes back.
    ///
    /// # Errors
    ///
    /// Validation errors from the reconciler, or
    /// [`CinemojiError::NotConnected`] if the transport has closed.
    pub fn join_game(&self, session_id: impl Into<SessionId>) -> Result<()> {
        let request = self.lock_reconciler().prepare_join(session_id)?;
        self.send(request)
    }

    /// Request the game start (creator only).
    ///
    /// # Errors
    ///
    /// Validation errors from the reconciler, or
    /// [`CinemojiError::NotConnected`] if the transport has closed.
    pub fn start_game(&self) -> Result<()> {
        let request = self.lock_reconciler().prepare_start()?;
        self.send(request)
    }

    /// Submit an opaque guess payload for the current round.
    ///
    /// # Errors
    ///
    /// Validation errors from the reconciler, or
    /// [`CinemojiError::NotConnected`] if the transport has closed.
    pub fn submit_guess(&self, payload: serde_json::Value) -> Result<()> {
        let request = self.lock_reconciler().prepare_guess(payload)?;
        self.send(request)
    }

    /// Leave the active session: notifies the server and tears down local
    /// roster and session state immediately. The identity is preserved.
    ///
    /// The changes applied by the teardown are returned to the caller
    /// directly (locally-initiated changes are not echoed on the event
    /// channel).
    ///
    /// # Errors
    ///
    /// [`CinemojiError::NoActiveSession`] without an active session, or
    /// [`CinemojiError::NotConnected`] if the transport has closed.
    pub fn leave_game(&self) -> Result<Vec<StateChange>> {
        let request = self.lock_reconciler().prepare_leave()?;
        self.send(request)?;
        Ok(self.teardown())
    }

    /// Tear down local roster and session state without notifying the
    /// server. Used once `GameFinished` handling is complete.
    pub fn teardown(&self) -> Vec<StateChange> {
        self.lock_reconciler().teardown()
    }

    /// Shut down the client, closing the transport and stopping the
    /// background task.
    ///
    /// After calling this method, the event receiver will yield `None`
    /// once the transport loop exits.
    pub async fn shutdown(&mut self) {
        debug!("CinemojiClient: shutdown requested");

        // Signal the transport loop to shut down gracefully.
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        // Await the transport loop with a timeout. If it doesn't exit in
        // time, abort it so the task cannot detach and run indefinitely.
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("transport loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("transport loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("transport loop aborted: {join_err}");
                    }
                }
            }
        }

        self.connected.store(false, Ordering::Release);
    }

    // ── Derived reads ───────────────────────────────────────────────

    /// Returns `true` if the transport is believed to be connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Returns `true` if the local identity created the active session.
    pub fn is_creator(&self) -> bool {
        self.lock_reconciler().is_creator()
    }

    /// True iff the session phase is `Started` or `Finished`.
    pub fn has_started(&self) -> bool {
        self.lock_reconciler().has_started()
    }

    /// Snapshot of the current roster, in join order.
    pub fn current_roster(&self) -> Vec<PlayerProfile> {
        self.lock_reconciler().roster().to_vec()
    }

    /// Snapshot of the active session, or `None` if no session is active.
    pub fn current_session(&self) -> Option<Session> {
        self.lock_reconciler().session().cloned()
    }

    /// Snapshot of the local identity, or `None` if unset.
    pub fn current_identity(&self) -> Option<PlayerProfile> {
        self.lock_reconciler().identity().cloned()
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Queue a `ClientRequest` to the transport loop.
    fn send(&self, request: ClientRequest) -> Result<()> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(CinemojiError::NotConnected);
        }
        self.cmd_tx
            .send(request)
            .map_err(|_| CinemojiError::NotConnected)
    }

    fn lock_reconciler(&self) -> MutexGuard<'_, Reconciler> {
        lock(&self.reconciler)
    }
}

/// Lock the shared reconciler, recovering from a poisoned lock.
///
/// The reconciler's mutations are all-or-nothing in-memory writes, so a
/// panic mid-hold cannot leave it half-mutated in a way worth dying for.
fn lock(reconciler: &Arc<Mutex<Reconciler>>) -> MutexGuard<'_, Reconciler> {
    match reconciler.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl std::fmt::Debug for CinemojiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CinemojiClient")
            .field("connected", &self.is_connected())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for CinemojiClient {
    fn drop(&mut self) {
        // `Drop` is synchronous so we cannot await a graceful shutdown.
        // The only safe action is to abort the spawned task, which causes
        // the transport loop future to be dropped immediately. The
        // `shutdown_tx` oneshot is intentionally *not* sent here: sending
        // it would trigger a graceful path that calls async
        // `transport.close()`, but there is no executor context to drive
        // it inside `Drop`.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Transport loop ──────────────────────────────────────────────────

/// Background transport loop that multiplexes send/receive via
/// `tokio::select!`.
///
/// Exits when:
/// - The request channel closes (client handle dropped or shutdown called)
/// - The transport returns `None` (server closed connection)
/// - A transport error occurs
async fn transport_loop(
    mut transport: impl Transport,
    mut cmd_rx: mpsc::UnboundedReceiver<ClientRequest>,
    event_tx: mpsc::Sender<CinemojiEvent>,
    reconciler: Arc<Mutex<Reconciler>>,
    connected: Arc<AtomicBool>,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) {
    debug!("transport loop started");

    // Emit the synthetic Connected event before entering the select loop.
    emit_event(&event_tx, CinemojiEvent::Connected).await;

    loop {
        tokio::select! {
            // Branch 1: outgoing request from the client handle
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(request) => {
                        debug!("sending client request: {:?}", std::mem::discriminant(&request));
                        if let Err(e) = transport.send(request).await {
                            error!("transport send error: {e}");
                            emit_disconnected(
                                &event_tx,
                                &connected,
                                Some(format!("transport send error: {e}")),
                            ).await;
                            break;
                        }
                    }
                    // Request channel closed — client handle dropped.
                    None => {
                        debug!("request channel closed, shutting down transport loop");
                        let _ = transport.close().await;
                        emit_disconnected(&event_tx, &connected, Some("client shut down".into())).await;
                        break;
                    }
                }
            }

            // Branch 2: shutdown signal
            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                emit_disconnected(&event_tx, &connected, Some("client shut down".into())).await;
                break;
            }

            // Branch 3: incoming event from the server
            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(server_event)) => {
                        // Apply under the lock, strictly in arrival order.
                        let changes = lock(&reconciler).apply(server_event);
                        for change in changes {
                            emit_event(&event_tx, CinemojiEvent::StateChanged(change)).await;
                        }
                    }
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        emit_disconnected(
                            &event_tx,
                            &connected,
                            Some(format!("transport receive error: {e}")),
                        ).await;
                        break;
                    }
                    // Transport closed cleanly.
                    None => {
                        debug!("transport closed by server");
                        emit_disconnected(&event_tx, &connected, None).await;
                        break;
                    }
                }
            }
        }
    }

    debug!("transport loop exited");
}

/// Emit an event to the event channel. If the channel is full, log a
/// warning and drop the event to avoid blocking the transport loop.
async fn emit_event(event_tx: &mpsc::Sender<CinemojiEvent>, event: CinemojiEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!("event channel full, dropping event: {dropped:?}");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Emit a [`Disconnected`](CinemojiEvent::Disconnected) event and update
/// the connected flag.
///
/// Uses `send().await` (blocking) instead of `try_send` because
/// `Disconnected` is always the last event on the channel and must never
/// be silently dropped.
async fn emit_disconnected(
    event_tx: &mpsc::Sender<CinemojiEvent>,
    connected: &AtomicBool,
    reason: Option<String>,
) {
    connected.store(false, Ordering::Release);
    let event = CinemojiEvent::Disconnected { reason };
    if event_tx.send(event).await.is_err() {
        debug!("event channel closed, receiver dropped");
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::ServerEvent;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    // ── Mock transport ──────────────────────────────────────────────

    /// A mock transport that records sent requests and replays scripted
    /// server events.
    struct MockTransport {
        /// Events that `recv()` will yield in order.
        incoming: VecDeque<Option<std::result::Result<ServerEvent, CinemojiError>>>,
        /// Recorded outgoing requests.
        sent: Arc<StdMutex<Vec<ClientRequest>>>,
        /// Whether `close()` was called.
        closed: Arc<AtomicBool>,
    }

    impl MockTransport {
        #[allow(clippy::type_complexity)]
        fn new(
            incoming: Vec<Option<std::result::Result<ServerEvent, CinemojiError>>>,
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
        async fn send(&mut self, request: ClientRequest) -> std::result::Result<(), CinemojiError> {
            self.sent.lock().unwrap().push(request);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<ServerEvent, CinemojiError>> {
            if let Some(item) = self.incoming.pop_front() {
                // An explicit `None` entry signals a clean transport close;
                // `Some(result)` delivers the scripted event or error.
                item
            } else {
                // All scripted events have been delivered — hang forever
                // so the transport loop stays alive until shutdown.
                std::future::pending().await
            }
        }

        async fn close(&mut self) -> std::result::Result<(), CinemojiError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn game_created_event() -> ServerEvent {
        ServerEvent::GameCreated {
            session_id: "g1".into(),
            creator_id: "alice".into(),
            config: GameConfig::default(),
        }
    }

    async fn expect_connected(events: &mut mpsc::Receiver<CinemojiEvent>) {
        let event = events.recv().await.unwrap();
        assert!(matches!(event, CinemojiEvent::Connected));
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn connected_is_first_event() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = CinemojiClient::start(transport, CinemojiConfig::new());

        let first = events.recv().await.unwrap();
        assert!(
            matches!(first, CinemojiEvent::Connected),
            "expected Connected as first event, got {first:?}"
        );

        client.shutdown().await;
    }

    #[tokio::test]
    async fn game_created_event_reaches_stores_and_channel() {
        let (transport, _sent, _closed) =
            MockTransport::new(vec![Some(Ok(game_created_event()))]);
        let (mut client, mut events) = CinemojiClient::start(transport, CinemojiConfig::new());
        client.set_identity("alice", "Alice", "a1").unwrap();

        expect_connected(&mut events).await;
        let event = events.recv().await.unwrap();
        assert!(matches!(
            event,
            CinemojiEvent::StateChanged(StateChange::SessionCreated { ref session_id })
                if session_id == "g1"
        ));
        let event = events.recv().await.unwrap();
        assert!(matches!(
            event,
            CinemojiEvent::StateChanged(StateChange::PlayerJoined { .. })
        ));

        assert!(client.is_creator());
        assert_eq!(client.current_session().unwrap().id, "g1");
        assert_eq!(client.current_roster().len(), 1);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn create_game_sends_request_with_identity() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = CinemojiClient::start(transport, CinemojiConfig::new());
        client.set_identity("alice", "Alice", "a1").unwrap();

        expect_connected(&mut events).await;
        client
            .create_game(CreateGameParams::new().with_player_count(4))
            .unwrap();

        // Give the loop a moment to process.
        tokio::time::sleep(Duration::from_millis(50)).await;

        {
            let requests = sent.lock().unwrap();
            assert_eq!(requests.len(), 1);
            if let ClientRequest::CreateGame { player, config } = &requests[0] {
                assert_eq!(player.id, "alice");
                assert_eq!(config.player_count, 4);
            } else {
                panic!("expected CreateGame request, got {:?}", requests[0]);
            }
        }

        client.shutdown().await;
    }

    #[tokio::test]
    async fn create_game_without_identity_fails_and_sends_nothing() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = CinemojiClient::start(transport, CinemojiConfig::new());

        expect_connected(&mut events).await;
        let result = client.create_game(CreateGameParams::new());
        assert!(matches!(result, Err(CinemojiError::NoIdentity)));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(sent.lock().unwrap().is_empty());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn disconnected_on_transport_close() {
        let (transport, _sent, _closed) = MockTransport::new(vec![
            // Explicit None signals clean transport close.
            None,
        ]);
        let (mut client, mut events) = CinemojiClient::start(transport, CinemojiConfig::new());

        expect_connected(&mut events).await;
        let event = events.recv().await.unwrap();
        assert!(matches!(event, CinemojiEvent::Disconnected { .. }));
        assert!(!client.is_connected());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn transport_recv_error_emits_disconnected_with_reason() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Err(
            CinemojiError::TransportReceive("boom".into()),
        ))]);
        let (mut client, mut events) = CinemojiClient::start(transport, CinemojiConfig::new());

        expect_connected(&mut events).await;
        let event = events.recv().await.unwrap();
        if let CinemojiEvent::Disconnected { reason } = event {
            assert!(reason.unwrap().contains("boom"));
        } else {
            panic!("expected Disconnected, got {event:?}");
        }

        client.shutdown().await;
    }

    #[tokio::test]
    async fn not_connected_error_after_shutdown() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = CinemojiClient::start(transport, CinemojiConfig::new());
        client.set_identity("alice", "Alice", "a1").unwrap();

        expect_connected(&mut events).await;
        client.shutdown().await;

        let result = client.create_game(CreateGameParams::new());
        assert!(matches!(result, Err(CinemojiError::NotConnected)));
    }

    #[tokio::test]
    async fn shutdown_emits_disconnected_and_closes_transport() {
        let (transport, _sent, closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = CinemojiClient::start(transport, CinemojiConfig::new());

        expect_connected(&mut events).await;
        client.shutdown().await;

        let event = events.recv().await.unwrap();
        assert!(matches!(event, CinemojiEvent::Disconnected { .. }));
        if let CinemojiEvent::Disconnected { reason } = event {
            assert_eq!(reason.as_deref(), Some("client shut down"));
        }
        assert!(closed.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn double_shutdown_does_not_panic() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = CinemojiClient::start(transport, CinemojiConfig::new());

        expect_connected(&mut events).await;
        client.shutdown().await;
        client.shutdown().await; // should not panic
    }

    #[tokio::test]
    async fn drop_without_explicit_shutdown() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (client, mut events) = CinemojiClient::start(transport, CinemojiConfig::new());

        expect_connected(&mut events).await;

        // Drop the client without calling shutdown. The transport loop
        // should exit and the event channel close; verify no hang.
        drop(client);
        while let Some(_event) = events.recv().await {}
    }

    #[tokio::test]
    async fn event_channel_backpressure_does_not_block() {
        // More events than the channel capacity; the loop must not block.
        let mut incoming: Vec<Option<std::result::Result<ServerEvent, CinemojiError>>> =
            vec![Some(Ok(game_created_event()))];
        for i in 0..20 {
            incoming.push(Some(Ok(ServerEvent::PlayerJoined {
                session_id: "g1".into(),
                player: PlayerProfile {
                    id: format!("p{i}"),
                    display_name: format!("Player {i}"),
                    avatar_ref: String::new(),
                },
            })));
        }
        incoming.push(None);

        let (transport, _sent, _closed) = MockTransport::new(incoming);
        let config = CinemojiConfig::new().with_event_channel_capacity(1);
        let (mut client, mut events) = CinemojiClient::start(transport, config);

        // Let the channel fill up and events get dropped.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut count = 0;
        while let Some(_event) = events.recv().await {
            count += 1;
        }
        // Connected may be dropped or not, but Disconnected is always
        // delivered; overall we must see fewer events than were produced.
        assert!(count >= 1, "expected at least the Disconnected event");
        assert!(
            count < 22,
            "expected backpressure to drop some events, but got all {count}"
        );
        // All joins were applied to the roster even though channel
        // notifications were dropped.
        assert_eq!(client.current_roster().len(), 20);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn config_defaults_and_builders() {
        let config = CinemojiConfig::new();
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));

        let config = CinemojiConfig::new()
            .with_event_channel_capacity(0)
            .with_shutdown_timeout(Duration::from_secs(5));
        assert_eq!(config.event_channel_capacity, 1, "capacity clamps to 1");
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn create_game_params_builder() {
        let config = CreateGameParams::new()
            .with_player_count(4)
            .with_round_count(5)
            .with_round_duration(Duration::from_secs(90))
            .into_config();
        assert_eq!(config.player_count, 4);
        assert_eq!(config.round_count, 5);
        assert_eq!(config.round_duration_secs, 90);
    }

    #[tokio::test]
    async fn debug_impl_for_client() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = CinemojiClient::start(transport, CinemojiConfig::new());

        expect_connected(&mut events).await;
        let debug_str = format!("{client:?}");
        assert!(debug_str.contains("CinemojiClient"));
        assert!(debug_str.contains("connected"));

        client.shutdown().await;
    }

    /// Transport that hangs forever in `close()` so shutdown
    /// timeout/abort can be tested.
    struct HangingCloseTransport {
        close_called: Arc<AtomicBool>,
        dropped: Arc<AtomicBool>,
    }

    impl HangingCloseTransport {
        fn new() -> (Self, Arc<AtomicBool>, Arc<AtomicBool>) {
            let close_called = Arc::new(AtomicBool::new(false));
            let dropped = Arc::new(AtomicBool::new(false));
            (
                Self {
                    close_called: Arc::clone(&close_called),
                    dropped: Arc::clone(&dropped),
                },
                close_called,
                dropped,
            )
        }
    }

    impl Drop for HangingCloseTransport {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::Release);
        }
    }

    #[async_trait]
    impl Transport for HangingCloseTransport {
        async fn send(&mut self, _request: ClientRequest) -> std::result::Result<(), CinemojiError> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<ServerEvent, CinemojiError>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> std::result::Result<(), CinemojiError> {
            self.close_called.store(true, Ordering::Release);
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn shutdown_timeout_aborts_stuck_transport_task() {
        let (transport, close_called, dropped) = HangingCloseTransport::new();
        let config = CinemojiConfig::new().with_shutdown_timeout(Duration::from_millis(20));
        let (mut client, mut events) = CinemojiClient::start(transport, config);

        expect_connected(&mut events).await;
        client.shutdown().await;

        assert!(
            close_called.load(Ordering::Acquire),
            "transport.close() should have been attempted during graceful shutdown"
        );
        assert!(
            dropped.load(Ordering::Acquire),
            "timed-out shutdown should abort and drop the transport loop task"
        );
        assert!(!client.is_connected());
    }
}
