//! Multi-room Line Chat Server Library
//!
//! A TCP chat server speaking a newline-delimited text protocol, built on
//! tokio using the Actor pattern for state management.
//!
//! # Features
//! - Line framing with partial-read buffering
//! - Nicknames, unique across the server
//! - Named rooms, created on first join
//! - Room chat, private messages and room merging
//! - Disconnection cleanup
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor owning sessions, directory and rooms
//! - Each connection has a `handler` task forwarding lines to the server
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use chat_server_rooms::serve;
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8000").await.unwrap();
//!     serve(listener).await;
//! }
//! ```

pub mod client;
pub mod codec;
pub mod directory;
pub mod error;
pub mod handler;
pub mod message;
pub mod room;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use codec::{Frame, LineCodec};
pub use directory::Directory;
pub use error::{AppError, SendError};
pub use handler::{handle_connection, serve};
pub use message::{ClientMessage, ServerMessage};
pub use room::{Room, RoomRegistry};
pub use server::{ChatServer, ServerCommand};
pub use session::{Session, SessionState};
pub use types::{ClientId, RoomName};
