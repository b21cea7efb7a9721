//! ChatServer Actor implementation
//!
//! The central actor that owns all state: sessions, the name directory and
//! the room registry. Connection handlers only forward lines to it, so every
//! state change and the broadcast it causes happen in one uninterrupted step.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::directory::Directory;
use crate::error::AppError;
use crate::message::{ClientMessage, ServerMessage};
use crate::room::RoomRegistry;
use crate::session::{Session, SessionState};
use crate::types::{ClientId, RoomName};

/// Commands sent from handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New client connected
    Connect {
        client_id: ClientId,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// Client connection closed or failed
    Disconnect { client_id: ClientId },
    /// One complete inbound line
    Line { client_id: ClientId, line: String },
    /// An inbound line exceeded the maximum length and was discarded
    Overflow { client_id: ClientId },
}

/// The main ChatServer actor
///
/// Processes commands from connection handlers one at a time.
pub struct ChatServer {
    /// All live sessions: ClientId -> Session
    sessions: HashMap<ClientId, Session>,
    /// Taken display names
    directory: Directory,
    /// All rooms, including empty ones
    rooms: RoomRegistry,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            sessions: HashMap::new(),
            directory: Directory::new(),
            rooms: RoomRegistry::new(),
            receiver,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    async fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect { client_id, sender } => {
                self.handle_connect(client_id, sender);
            }
            ServerCommand::Disconnect { client_id } => {
                self.handle_disconnect(client_id).await;
            }
            ServerCommand::Line { client_id, line } => {
                self.handle_line(client_id, line).await;
            }
            ServerCommand::Overflow { client_id } => {
                warn!("Line too long from {}, discarded", client_id);
                self.send_to(client_id, AppError::LineTooLong.into()).await;
            }
        }
    }

    /// Handle new client connection
    fn handle_connect(&mut self, client_id: ClientId, sender: mpsc::Sender<ServerMessage>) {
        info!("Client {} connected", client_id);
        self.sessions
            .insert(client_id, Session::new(sender));
        debug!(
            "Total sessions: {}, Total rooms: {}",
            self.sessions.len(),
            self.rooms.len()
        );
    }

    /// Handle connection loss
    ///
    /// A no-op for sessions already ended by `/bye`.
    async fn handle_disconnect(&mut self, client_id: ClientId) {
        if self.end_session(client_id).await.is_some() {
            info!("Client {} disconnected", client_id);
        }
        debug!(
            "Total sessions: {}, Total rooms: {}",
            self.sessions.len(),
            self.rooms.len()
        );
    }

    /// Parse and execute one line, answering protocol errors with `ERROR`
    async fn handle_line(&mut self, client_id: ClientId, line: String) {
        if !self.sessions.contains_key(&client_id) {
            return;
        }
        debug!("Line from {}: {:?}", client_id, line);

        let result = match ClientMessage::parse(&line) {
            Ok(msg) => self.dispatch(client_id, msg).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!("Rejected request from {}: {}", client_id, e);
            self.send_to(client_id, e.into()).await;
        }
    }

    async fn dispatch(&mut self, client_id: ClientId, msg: ClientMessage) -> Result<(), AppError> {
        match msg {
            ClientMessage::Nick(name) => self.handle_nick(client_id, name).await,
            ClientMessage::Join(room) => self.handle_join(client_id, room).await,
            ClientMessage::Leave => self.handle_leave(client_id).await,
            ClientMessage::Bye => self.handle_bye(client_id).await,
            ClientMessage::Priv { recipient, text } => {
                self.handle_private(client_id, recipient, text).await
            }
            ClientMessage::Merge { target, source } => {
                self.handle_merge(client_id, target, source).await
            }
            ClientMessage::Chat(text) => self.handle_chat(client_id, text).await,
        }
    }

    /// Handle `/nick`: first name choice or rename
    async fn handle_nick(&mut self, client_id: ClientId, name: String) -> Result<(), AppError> {
        let Some(session) = self.sessions.get_mut(&client_id) else {
            return Ok(());
        };

        let old = session.display_name.clone();
        self.directory.rename(client_id, old.as_deref(), &name)?;
        session.display_name = Some(name.clone());
        if session.state == SessionState::NoIdentity {
            session.state = SessionState::Outside;
        }
        let room = session.current_room().cloned();

        match &old {
            Some(old) => info!("Client {} renamed '{}' -> '{}'", client_id, old, name),
            None => info!("Client {} is now '{}'", client_id, name),
        }

        if let (Some(room), Some(old)) = (room, old) {
            self.broadcast(&room, ServerMessage::NewNick { old, new: name })
                .await;
        }

        self.send_to(client_id, ServerMessage::Ok).await;
        Ok(())
    }

    /// Handle `/join`, leaving the current room first if there is one
    async fn handle_join(&mut self, client_id: ClientId, room: RoomName) -> Result<(), AppError> {
        let Some(session) = self.sessions.get(&client_id) else {
            return Ok(());
        };

        if !session.has_identity() {
            return Err(AppError::InvalidState);
        }

        let username = session.name().to_string();
        let previous = session.current_room().cloned();
        if let Some(previous) = previous {
            self.leave_room(client_id, &username, &previous).await;
        }

        // Existing members hear about the newcomer before it is added
        self.rooms.get_or_create(&room);
        self.broadcast(
            &room,
            ServerMessage::Joined {
                username: username.clone(),
                room: room.clone(),
            },
        )
        .await;
        self.rooms.get_or_create(&room).add(client_id);

        if let Some(session) = self.sessions.get_mut(&client_id) {
            session.state = SessionState::Inside(room.clone());
        }

        info!("Client {} ('{}') joined room {}", client_id, username, room);
        self.send_to(client_id, ServerMessage::Ok).await;
        Ok(())
    }

    /// Handle `/leave`
    async fn handle_leave(&mut self, client_id: ClientId) -> Result<(), AppError> {
        let Some(session) = self.sessions.get(&client_id) else {
            return Ok(());
        };

        let Some(room) = session.current_room().cloned() else {
            return Err(AppError::InvalidState);
        };
        let username = session.name().to_string();

        self.leave_room(client_id, &username, &room).await;
        if let Some(session) = self.sessions.get_mut(&client_id) {
            session.state = SessionState::Outside;
        }

        info!("Client {} ('{}') left room {}", client_id, username, room);
        self.send_to(client_id, ServerMessage::Ok).await;
        Ok(())
    }

    /// Handle `/bye`
    ///
    /// Dropping the session drops its sender, which lets the connection's
    /// write task flush `BYE` and close the socket.
    async fn handle_bye(&mut self, client_id: ClientId) -> Result<(), AppError> {
        if let Some(session) = self.end_session(client_id).await {
            info!("Client {} ('{}') said bye", client_id, session.name());
            let _ = session.send(ServerMessage::Bye).await;
        }
        Ok(())
    }

    /// Handle `/priv`
    async fn handle_private(
        &mut self,
        client_id: ClientId,
        recipient: String,
        text: String,
    ) -> Result<(), AppError> {
        let Some(session) = self.sessions.get(&client_id) else {
            return Ok(());
        };

        if !session.has_identity() {
            return Err(AppError::InvalidState);
        }

        let recipient_id = self
            .directory
            .lookup(&recipient)
            .ok_or(AppError::RecipientNotFound(recipient))?;

        let msg = ServerMessage::Private {
            from: session.name().to_string(),
            text,
        };
        self.send_to(recipient_id, msg).await;
        Ok(())
    }

    /// Handle `/merge`: move every member of `source` into `target`
    ///
    /// Each member already in `target` is told about every arrival, followed
    /// by a merge acknowledgment; the requester gets one final acknowledgment.
    async fn handle_merge(
        &mut self,
        client_id: ClientId,
        target: RoomName,
        source: RoomName,
    ) -> Result<(), AppError> {
        let Some(session) = self.sessions.get(&client_id) else {
            return Ok(());
        };

        if !session.has_identity() {
            return Err(AppError::InvalidState);
        }

        if target == source {
            return Err(AppError::InvalidCommand);
        }

        let (Some(target_room), Some(source_room)) =
            (self.rooms.get(&target), self.rooms.get(&source))
        else {
            return Err(AppError::RoomNotFound);
        };

        let conflict = {
            let target_names: HashSet<&str> = target_room
                .members
                .iter()
                .filter_map(|id| self.sessions.get(id))
                .map(Session::name)
                .collect();
            source_room
                .members
                .iter()
                .filter_map(|id| self.sessions.get(id))
                .any(|member| target_names.contains(member.name()))
        };
        if conflict {
            return Err(AppError::DuplicateUsername);
        }

        let moved = self
            .rooms
            .remove_merged(&source)
            .map(|room| room.member_ids())
            .unwrap_or_default();

        for member_id in &moved {
            let Some(member) = self.sessions.get_mut(member_id) else {
                continue;
            };
            member.state = SessionState::Inside(target.clone());
            let notice = ServerMessage::MergedIn {
                username: member.name().to_string(),
                source: source.clone(),
                target: target.clone(),
            };

            self.rooms.get_or_create(&target).add(*member_id);
            for observer in self.rooms.member_ids(&target) {
                if observer == *member_id {
                    continue;
                }
                self.send_to(observer, notice.clone()).await;
                self.send_to(observer, ServerMessage::MergeOk).await;
            }
        }

        info!(
            "Client {} merged room {} into {} ({} members moved)",
            client_id,
            source,
            target,
            moved.len()
        );
        self.send_to(client_id, ServerMessage::MergeOk).await;
        Ok(())
    }

    /// Handle a plain chat line
    async fn handle_chat(&mut self, client_id: ClientId, text: String) -> Result<(), AppError> {
        let Some(session) = self.sessions.get(&client_id) else {
            return Ok(());
        };

        let Some(room) = session.current_room().cloned() else {
            return Err(AppError::InvalidState);
        };

        let msg = ServerMessage::Message {
            from: session.name().to_string(),
            text,
        };
        self.broadcast(&room, msg).await;
        Ok(())
    }

    /// Helper: Remove a session and everything that refers to it
    ///
    /// Announces the departure to its room. Returns the removed session so
    /// the caller can still write to it.
    async fn end_session(&mut self, client_id: ClientId) -> Option<Session> {
        let session = self.sessions.remove(&client_id)?;

        if let Some(room) = session.current_room() {
            self.leave_room(client_id, session.name(), room).await;
        }

        if let Some(name) = &session.display_name {
            if self.directory.lookup(name) == Some(client_id) {
                self.directory.remove(name);
            }
        }

        Some(session)
    }

    /// Helper: Take a member out of a room and tell the rest of the room
    ///
    /// The caller owns the session state transition.
    async fn leave_room(&mut self, client_id: ClientId, username: &str, room: &RoomName) {
        self.rooms.remove_member(room, client_id);
        self.broadcast(
            room,
            ServerMessage::Left {
                username: username.to_string(),
                room: room.clone(),
            },
        )
        .await;
    }

    /// Helper: Send a message to every current member of a room
    async fn broadcast(&self, room: &RoomName, msg: ServerMessage) {
        for member_id in self.rooms.member_ids(room) {
            self.send_to(member_id, msg.clone()).await;
        }
    }

    /// Helper: Send a message to one session, ignoring closed connections
    async fn send_to(&self, client_id: ClientId, msg: ServerMessage) {
        let Some(session) = self.sessions.get(&client_id) else {
            return;
        };

        if session.send(msg).await.is_err() {
            debug!("Dropping message for closed connection {}", client_id);
        }
    }
}
