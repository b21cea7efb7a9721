//! Session struct definition
//!
//! Server-side state of one connection: its display name, where it is in the
//! protocol state machine, and the channel its outbound lines go through.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::RoomName;

/// Protocol state of a session
///
/// The current room lives inside `Inside`, so a session has a room exactly
/// when it is inside one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no name chosen yet
    NoIdentity,
    /// Named, not in any room
    Outside,
    /// Named and member of the given room
    Inside(RoomName),
}

/// Connected client session
#[derive(Debug)]
pub struct Session {
    /// Display name (None before the first successful `/nick`)
    pub display_name: Option<String>,
    /// Where the session is in the protocol
    pub state: SessionState,
    /// Server → Client message channel
    pub sender: mpsc::Sender<ServerMessage>,
}

impl Session {
    /// Create a new session in the `NoIdentity` state
    pub fn new(sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            display_name: None,
            state: SessionState::NoIdentity,
            sender,
        }
    }

    /// Send a message to this session's connection
    ///
    /// Returns an error if the channel is closed (connection gone).
    pub async fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Display name, or an empty string before one was chosen
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or_default()
    }

    pub fn has_identity(&self) -> bool {
        self.state != SessionState::NoIdentity
    }

    /// Room the session is currently in
    pub fn current_room(&self) -> Option<&RoomName> {
        match &self.state {
            SessionState::Inside(room) => Some(room),
            _ => None,
        }
    }
}
