//! Error types for the Cinemoji client.

use thiserror::Error;

/// Errors that can occur when using the Cinemoji client.
#[derive(Debug, Error)]
pub enum CinemojiError {
    /// Failed to send a request through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive an event from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    ///
    /// Produced by [`Transport`](crate::Transport) implementations, not
    /// by this crate itself.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    ///
    /// For [`Transport`](crate::Transport) implementations that encode
    /// messages as JSON; the state layer itself never touches the wire.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted an operation that requires an active connection, but the
    /// client is not connected.
    #[error("not connected to server")]
    NotConnected,

    /// A caller passed an empty id where a non-empty one is required.
    /// This is a contract violation by the caller, not a runtime condition.
    #[error("empty {0} id")]
    EmptyId(&'static str),

    /// Game configuration failed validation before being sent.
    #[error("invalid game config: {0}")]
    InvalidConfig(String),

    /// No identity has been set, but the requested action needs one.
    #[error("no local identity set")]
    NoIdentity,

    /// No session is active, but the requested action needs one.
    #[error("no active session")]
    NoActiveSession,

    /// Only the session creator may perform the requested action.
    #[error("local user is not the session creator")]
    NotCreator,

    /// The game has already started and the action is no longer valid.
    #[error("game already started")]
    AlreadyStarted,

    /// The game has not started yet and the action is not valid yet.
    #[error("game not started")]
    NotStarted,

    /// The game has finished; no further round actions are accepted.
    #[error("game already finished")]
    AlreadyFinished,

    /// An I/O error occurred inside a [`Transport`](crate::Transport)
    /// implementation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for Cinemoji client operations.
pub type Result<T> = std::result::Result<T, CinemojiError>;
