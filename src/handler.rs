//! TCP connection handler
//!
//! Handles individual client connections: line framing and bidirectional
//! communication with the ChatServer. Also hosts the accept loop.

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info};

use crate::codec::{Frame, LineCodec, READ_BUFFER_SIZE};
use crate::error::AppError;
use crate::message::ServerMessage;
use crate::server::{ChatServer, ServerCommand};
use crate::types::ClientId;

/// Channel buffer size for server commands
pub const CHANNEL_BUFFER_SIZE: usize = 256;

/// Channel buffer size for one connection's outbound lines
pub const CLIENT_BUFFER_SIZE: usize = 32;

/// Start the ChatServer actor and accept connections forever
///
/// Accept failures are logged and do not stop the loop.
pub async fn serve(listener: TcpListener) {
    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    tokio::spawn(ChatServer::new(cmd_rx).run());

    info!("ChatServer actor started");

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let cmd_tx = cmd_tx.clone();

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, cmd_tx).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Handle a new TCP connection
///
/// Registers a session with the ChatServer, forwards every complete line to
/// it and writes back whatever it sends. A read or write failure on this
/// connection ends only this connection.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let (reader, writer) = stream.into_split();
    let mut lines = FramedRead::with_capacity(reader, LineCodec::new(), READ_BUFFER_SIZE);
    let mut sink = FramedWrite::new(writer, LineCodec::new());

    // Generate client ID
    let client_id = ClientId::new();
    info!("Client {} connected from {}", client_id, peer_addr);

    // Create channel for server -> client messages
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(CLIENT_BUFFER_SIZE);

    // Register with ChatServer
    if cmd_tx
        .send(ServerCommand::Connect {
            client_id,
            sender: msg_tx,
        })
        .await
        .is_err()
    {
        error!("Failed to register client {} - server closed", client_id);
        return Err(AppError::ChannelSend);
    }

    // Clone cmd_tx for read task
    let cmd_tx_read = cmd_tx.clone();

    // Spawn read task (socket -> ServerCommand)
    let mut read_task = tokio::spawn(async move {
        while let Some(frame) = lines.next().await {
            let cmd = match frame {
                Ok(Frame::Line(line)) => ServerCommand::Line { client_id, line },
                Ok(Frame::Overflow) => ServerCommand::Overflow { client_id },
                Err(e) => {
                    error!("Read error for {}: {}", client_id, e);
                    break;
                }
            };
            // Same queue as ordinary lines, so replies keep request order
            if cmd_tx_read.send(cmd).await.is_err() {
                debug!("Server closed, ending read task for {}", client_id);
                break;
            }
        }
        debug!("Read task ended for {}", client_id);
    });

    // Spawn write task (ServerMessage -> socket)
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            let closing = msg == ServerMessage::Bye;
            if let Err(e) = sink.send(msg).await {
                debug!("Write failed for {}: {}", client_id, e);
                break;
            }
            if closing {
                break;
            }
        }
        debug!("Write task ended for {}", client_id);

        // Flush and shut down our half of the socket
        let _ = sink.close().await;
    });

    // Wait for either task to complete, then stop the other one
    tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", client_id);
            write_task.abort();
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", client_id);
            read_task.abort();
        }
    }

    // Send disconnect command
    let _ = cmd_tx.send(ServerCommand::Disconnect { client_id }).await;

    info!("Client {} disconnected", client_id);

    Ok(())
}
