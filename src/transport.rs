//! Transport abstraction for talking to the Cinemoji backend.
//!
//! The [`Transport`] trait is a bidirectional channel of *typed* protocol
//! messages. Wire encoding, framing, and connection management all live
//! behind this seam — the state layer never sees bytes. The reference
//! backend is reached over HTTP for requests and a WebSocket for the
//! event stream, but any implementation that can deliver
//! [`ServerEvent`]s and accept [`ClientRequest`]s works.
//!
//! # Connection Setup
//!
//! Connection setup is intentionally NOT part of this trait — different
//! transports have fundamentally different connection parameters.
//! Construct a connected transport externally, then pass it to
//! `CinemojiClient::start`.
//!
//! # Implementing a Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use cinemoji_client::error::CinemojiError;
//! use cinemoji_client::protocol::{ClientRequest, ServerEvent};
//! use cinemoji_client::transport::Transport;
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, request: ClientRequest) -> Result<(), CinemojiError> {
//!         // Encode and transmit the request
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<ServerEvent, CinemojiError>> {
//!         // Decode and return the next server event
//!         // Return None when the connection is closed cleanly
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), CinemojiError> {
//!         // Gracefully shut down the connection
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::CinemojiError;
use crate::protocol::{ClientRequest, ServerEvent};

/// A bidirectional typed message channel to the Cinemoji backend.
///
/// # Object Safety
///
/// This trait is object-safe, so `Box<dyn Transport>` works for dynamic
/// dispatch. `CinemojiClient::start` accepts `impl Transport`
/// (monomorphized) for the common case.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method **MUST** be cancel-safe because
/// it is used inside `tokio::select!`. If `recv` is cancelled before
/// completion, calling it again must not lose an event. Channel-based
/// implementations (e.g., wrapping `mpsc::Receiver`) are naturally
/// cancel-safe.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a local action request to the server.
    ///
    /// # Errors
    ///
    /// Returns [`CinemojiError::TransportSend`] if the request could not
    /// be sent (e.g., connection broken).
    async fn send(&mut self, request: ClientRequest) -> Result<(), CinemojiError>;

    /// Receive the next event from the server.
    ///
    /// Returns:
    /// - `Some(Ok(event))` — a complete event was received
    /// - `Some(Err(e))` — a transport error occurred
    /// - `None` — the connection was closed cleanly by the server
    ///
    /// # Cancel Safety
    ///
    /// This method **MUST** be cancel-safe (see [trait documentation](Transport)).
    async fn recv(&mut self) -> Option<Result<ServerEvent, CinemojiError>>;

    /// Close the transport connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the graceful shutdown fails. Implementations
    /// should still release resources even if the close handshake fails.
    async fn close(&mut self) -> Result<(), CinemojiError>;
}
