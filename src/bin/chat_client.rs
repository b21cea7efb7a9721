//! Terminal chat client
//!
//! Reads lines from stdin and sends them to the server; prints whatever the
//! server sends back.

use clap::Parser;
use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use chat_server_rooms::client::{prepare_outbound, render, Rendered};
use chat_server_rooms::{Frame, LineCodec};

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server host name or address
    host: String,
    /// Server port
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_client=warn")),
        )
        .init();

    let args = Args::parse();

    let stream = TcpStream::connect((args.host.as_str(), args.port)).await?;
    info!("Connected to {}:{}", args.host, args.port);

    let (reader, mut writer) = stream.into_split();
    let mut inbound = FramedRead::new(reader, LineCodec::new());
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            frame = inbound.next() => match frame {
                Some(Ok(Frame::Line(line))) => match render(&line) {
                    Rendered::Line(text) => println!("{}", text),
                    Rendered::Closed => break,
                },
                Some(Ok(Frame::Overflow)) => {
                    warn!("Discarded oversized line from server");
                }
                Some(Err(e)) => {
                    error!("Connection error: {}", e);
                    break;
                }
                None => {
                    info!("Server closed the connection");
                    break;
                }
            },
            line = input.next_line() => match line? {
                Some(line) if !line.is_empty() => {
                    let outbound = format!("{}\n", prepare_outbound(&line));
                    writer.write_all(outbound.as_bytes()).await?;
                }
                Some(_) => {}
                // stdin closed
                None => break,
            },
        }
    }

    Ok(())
}
