//! Line framing for the text protocol
//!
//! `LineCodec` turns the raw byte stream of one connection into complete
//! lines and renders outbound `ServerMessage`s as `\n`-terminated lines.
//! Used with `FramedRead` / `FramedWrite` from tokio-util.

use std::cmp;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::AppError;
use crate::message::ServerMessage;

/// Capacity of the per-connection read buffer
pub const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Longest accepted line in bytes, `\n` excluded (a `\r` before it counts)
pub const MAX_LINE_LENGTH: usize = 16 * 1024;

/// Lines shorter than this many characters are dropped without a reply
const MIN_LINE_CHARS: usize = 2;

/// One decoded unit of inbound traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Complete line, delimiter stripped
    Line(String),
    /// A line exceeded `MAX_LINE_LENGTH`; its bytes are discarded up to the
    /// next delimiter
    Overflow,
}

/// Newline-delimited codec
///
/// Keeps partial lines in the `FramedRead` buffer between reads and only
/// rescans bytes it has not looked at yet.
#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Index in the buffer where the next newline search starts
    next_index: usize,
    max_length: usize,
    /// Set while skipping the tail of an over-long line
    is_discarding: bool,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length,
            is_discarding: false,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = Frame;
    type Error = AppError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, AppError> {
        loop {
            let read_to = cmp::min(self.max_length.saturating_add(1), buf.len());
            let newline_offset = buf[self.next_index..read_to]
                .iter()
                .position(|b| *b == b'\n');

            match (self.is_discarding, newline_offset) {
                (true, Some(offset)) => {
                    buf.advance(self.next_index + offset + 1);
                    self.is_discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    buf.advance(read_to);
                    self.next_index = 0;
                    if buf.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let newline_index = self.next_index + offset;
                    self.next_index = 0;
                    let raw = buf.split_to(newline_index + 1);
                    let raw = &raw[..raw.len() - 1];
                    // Length is judged with only the `\n` removed
                    if String::from_utf8_lossy(raw).chars().count() < MIN_LINE_CHARS {
                        continue;
                    }
                    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
                    let line = String::from_utf8_lossy(raw).into_owned();
                    return Ok(Some(Frame::Line(line)));
                }
                (false, None) if buf.len() > self.max_length => {
                    self.is_discarding = true;
                    return Ok(Some(Frame::Overflow));
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, AppError> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                // Unterminated tail is never delivered
                buf.clear();
                self.next_index = 0;
                self.is_discarding = false;
                Ok(None)
            }
        }
    }
}

impl Encoder<ServerMessage> for LineCodec {
    type Error = AppError;

    fn encode(&mut self, msg: ServerMessage, dst: &mut BytesMut) -> Result<(), AppError> {
        let line = msg.to_string();
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(text: &str) -> Frame {
        Frame::Line(text.to_string())
    }

    fn decode_all(codec: &mut LineCodec, buf: &mut BytesMut) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = codec.decode(buf).unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("/nick alice\n/join lobby\nhello\n");

        assert_eq!(
            decode_all(&mut codec, &mut buf),
            vec![line("/nick alice"), line("/join lobby"), line("hello")]
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_line_is_buffered() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("hel");

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"lo wor");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"ld\nnext");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(line("hello world")));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], b"next");
    }

    #[test]
    fn test_short_lines_are_dropped() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("\nx\n\r\nok\n");

        assert_eq!(decode_all(&mut codec, &mut buf), vec![line("ok")]);
    }

    #[test]
    fn test_carriage_return_counts_toward_short_line_length() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("x\r\n");

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(line("x")));
    }

    #[test]
    fn test_carriage_return_counts_toward_max_length() {
        let mut codec = LineCodec::with_max_length(8);
        let mut buf = BytesMut::from("01234567\r\nafter\n");

        assert_eq!(
            decode_all(&mut codec, &mut buf),
            vec![Frame::Overflow, line("after")]
        );
    }

    #[test]
    fn test_crlf_is_stripped() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("/nick bob\r\n");

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(line("/nick bob")));
    }

    #[test]
    fn test_overflow_is_reported_once_and_skipped() {
        let mut codec = LineCodec::with_max_length(8);
        let mut buf = BytesMut::from("0123456789");

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Frame::Overflow));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"abcdef\nafter\n");
        assert_eq!(decode_all(&mut codec, &mut buf), vec![line("after")]);
    }

    #[test]
    fn test_line_at_max_length_is_accepted() {
        let mut codec = LineCodec::with_max_length(8);
        let mut buf = BytesMut::from("01234567\n");

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(line("01234567")));
    }

    #[test]
    fn test_eof_drops_unterminated_tail() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("done\npartial");

        assert_eq!(codec.decode_eof(&mut buf).unwrap(), Some(line("done")));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_encode_server_message() {
        let mut codec = LineCodec::new();
        let mut dst = BytesMut::new();

        codec.encode(ServerMessage::Ok, &mut dst).unwrap();
        codec.encode(ServerMessage::Bye, &mut dst).unwrap();
        assert_eq!(&dst[..], b"OK\nBYE\n");
    }

    proptest! {
        #[test]
        fn prop_chunking_does_not_change_lines(
            lines in proptest::collection::vec("[a-z /]{2,20}", 1..8),
            cuts in proptest::collection::vec(0usize..200, 0..6),
        ) {
            let stream: String = lines.iter().map(|l| format!("{l}\n")).collect();
            let bytes = stream.as_bytes();

            let mut cuts: Vec<usize> = cuts.into_iter().map(|c| c % (bytes.len() + 1)).collect();
            cuts.push(bytes.len());
            cuts.sort_unstable();

            let mut codec = LineCodec::new();
            let mut buf = BytesMut::new();
            let mut frames = Vec::new();
            let mut start = 0;
            for cut in cuts {
                buf.extend_from_slice(&bytes[start..cut]);
                start = cut;
                frames.extend(decode_all(&mut codec, &mut buf));
            }

            let expected: Vec<Frame> = lines.iter().map(|l| line(l)).collect();
            prop_assert_eq!(frames, expected);
        }
    }
}
