//! Error types for the chat server
//!
//! Defines application-level errors and message send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// protocol errors (an `ERROR` line is sent back, the connection stays open).
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Unknown command, or a known one with missing arguments
    #[error("Invalid command")]
    InvalidCommand,

    /// Command is not allowed in the session's current state
    #[error("Command not allowed in current state")]
    InvalidState,

    /// Nickname already held by a live session
    #[error("Name already in use: {0}")]
    NameInUse(String),

    /// Private message recipient is not connected
    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    /// Merge source or target does not exist
    #[error("One or both rooms do not exist")]
    RoomNotFound,

    /// Merge would put two members with the same name in one room
    #[error("duplicate username")]
    DuplicateUsername,

    /// Inbound line exceeded the maximum line length
    #[error("line too long")]
    LineTooLong,
}

/// Message send errors
///
/// Occurs when attempting to send messages through closed channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}
