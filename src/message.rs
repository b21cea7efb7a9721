//! Message protocol definitions
//!
//! Newline-delimited text protocol. Inbound lines are classified into a
//! closed `ClientMessage` enum; outbound lines are rendered from
//! `ServerMessage` through its `Display` impl.

use std::fmt;

use crate::error::AppError;
use crate::types::RoomName;

/// Client → Server message
///
/// A line starting with a single `/` is a command; everything else is chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// `/nick <name>` - choose or change the display name
    Nick(String),
    /// `/join <room>` - enter a room, creating it if needed
    Join(RoomName),
    /// `/leave` - leave the current room
    Leave,
    /// `/bye` - end the session
    Bye,
    /// `/priv <name> <text>` - private message to one user
    Priv { recipient: String, text: String },
    /// `/merge <target> <source>` - move every member of `source` into `target`
    Merge { target: RoomName, source: RoomName },
    /// Plain chat line for the current room
    Chat(String),
}

impl ClientMessage {
    /// Classify one complete line (delimiter already stripped).
    ///
    /// `//text` is the escape for chat lines that start with a slash: exactly
    /// one leading `/` is removed and the rest is chat.
    pub fn parse(line: &str) -> Result<Self, AppError> {
        if line.starts_with("//") {
            return Ok(ClientMessage::Chat(line[1..].to_string()));
        }
        if !line.starts_with('/') {
            return Ok(ClientMessage::Chat(line.to_string()));
        }

        let (name, rest) = match line.split_once(' ') {
            Some((name, rest)) => (name, Some(rest)),
            None => (line, None),
        };

        match name {
            "/nick" => Ok(ClientMessage::Nick(single_word(rest)?.to_string())),
            "/join" => Ok(ClientMessage::Join(RoomName::new(single_word(rest)?))),
            "/leave" => Ok(ClientMessage::Leave),
            "/bye" => Ok(ClientMessage::Bye),
            "/priv" => {
                let (recipient, text) = rest
                    .and_then(|rest| rest.split_once(' '))
                    .filter(|(recipient, text)| !recipient.is_empty() && !text.is_empty())
                    .ok_or(AppError::InvalidCommand)?;
                Ok(ClientMessage::Priv {
                    recipient: recipient.to_string(),
                    text: text.to_string(),
                })
            }
            "/merge" => {
                let (target, source) = rest
                    .and_then(|rest| rest.split_once(' '))
                    .ok_or(AppError::InvalidCommand)?;
                Ok(ClientMessage::Merge {
                    target: RoomName::new(single_word(Some(target))?),
                    source: RoomName::new(single_word(Some(source))?),
                })
            }
            _ => Err(AppError::InvalidCommand),
        }
    }
}

/// Names and rooms are single non-empty words; anything else would make the
/// space-separated server lines ambiguous.
fn single_word(arg: Option<&str>) -> Result<&str, AppError> {
    match arg {
        Some(word) if !word.is_empty() && !word.contains(char::is_whitespace) => Ok(word),
        _ => Err(AppError::InvalidCommand),
    }
}

/// Server → Client message
///
/// Each variant renders to exactly one wire line (without the trailing `\n`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Request succeeded
    Ok,
    /// Request failed, optionally with a human readable reason
    Error { detail: Option<String> },
    /// Session ended by `/bye`; the connection is closed after this line
    Bye,
    /// Chat line broadcast to a room
    Message { from: String, text: String },
    /// Someone entered the room
    Joined { username: String, room: RoomName },
    /// Someone left the room
    Left { username: String, room: RoomName },
    /// A room member changed name
    NewNick { old: String, new: String },
    /// Private message
    Private { from: String, text: String },
    /// A member of a merged room arrived in this room
    MergedIn {
        username: String,
        source: RoomName,
        target: RoomName,
    },
    /// Merge acknowledgment
    MergeOk,
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Ok => write!(f, "OK"),
            ServerMessage::Error { detail: None } => write!(f, "ERROR"),
            ServerMessage::Error {
                detail: Some(detail),
            } => write!(f, "ERROR: {}", detail),
            ServerMessage::Bye => write!(f, "BYE"),
            ServerMessage::Message { from, text } => write!(f, "MESSAGE {} {}", from, text),
            ServerMessage::Joined { username, room } => write!(f, "JOINED {} {}", username, room),
            ServerMessage::Left { username, room } => write!(f, "LEFT {} {}", username, room),
            ServerMessage::NewNick { old, new } => write!(f, "NEWNICK {} {}", old, new),
            ServerMessage::Private { from, text } => write!(f, "PRIVATE {} {}", from, text),
            ServerMessage::MergedIn {
                username,
                source,
                target,
            } => write!(f, "{} from {} joined {}", username, source, target),
            ServerMessage::MergeOk => write!(f, "OK: MERGE SUCCESSFUL"),
        }
    }
}

/// Convert AppError to ServerMessage for client notification
///
/// Most protocol errors are a bare `ERROR`; merge failures and over-long
/// lines carry a reason.
impl From<AppError> for ServerMessage {
    fn from(err: AppError) -> Self {
        let detail = match &err {
            AppError::RoomNotFound | AppError::DuplicateUsername | AppError::LineTooLong => {
                Some(err.to_string())
            }
            _ => None,
        };
        ServerMessage::Error { detail }
    }
}
