//! Client-side protocol helpers
//!
//! Used by the `chat_client` binary: preparing typed lines for the wire and
//! turning server lines into something readable.

/// Commands the server understands
pub const KNOWN_COMMANDS: [&str; 6] = ["/join", "/leave", "/bye", "/nick", "/priv", "/merge"];

/// How an inbound server line should be shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Text to print
    Line(String),
    /// Server ended the session
    Closed,
}

/// Prepare a typed line for sending
///
/// A line that looks like a command but names none the server knows gets an
/// extra leading `/`, so it reaches the room as chat instead of bouncing
/// with `ERROR`.
pub fn prepare_outbound(input: &str) -> String {
    if input.starts_with('/') && !input.starts_with("//") {
        let command = input.split(' ').next().unwrap_or(input);
        if !KNOWN_COMMANDS.contains(&command) {
            return format!("/{}", input);
        }
    }
    input.to_string()
}

/// Render one server line for display
pub fn render(line: &str) -> Rendered {
    let parts: Vec<&str> = line.splitn(3, ' ').collect();

    let text = match parts.as_slice() {
        ["MESSAGE", from, text] => format!("{}: {}", from, text),
        ["JOINED", user, room] => format!("{} joined {}", user, room),
        ["JOINED", user] => format!("{} joined the room", user),
        ["LEFT", user, room] => format!("{} left {}", user, room),
        ["LEFT", user] => format!("{} left the room", user),
        ["NEWNICK", old, new] => format!("{} is now called {}", old, new),
        ["PRIVATE", from, text] => format!("Private message from {}: {}", from, text),
        ["BYE"] => return Rendered::Closed,
        _ => line.to_string(),
    };
    Rendered::Line(text)
}
