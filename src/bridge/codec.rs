// Wire codec: self-delimiting JSON frames.
// Requests may be newline-terminated or bare; responses are always written with a trailing newline.

use serde_json::Value;

use super::error::DecodeError;
use super::protocol::{Command, Response};

/// Result of attempting to decode one frame from a buffer
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A complete command was decoded
    Frame(Command),
    /// The buffer does not yet hold a complete frame
    NeedMoreBytes,
    /// The frame is malformed; the connection must be closed
    Error(DecodeError),
}

/// Try to decode one command from the front of `buf`.
///
/// Returns the outcome and the number of bytes consumed. Nothing is consumed
/// unless a whole frame was recognised, so a partial frame is never handed to
/// the caller.
pub fn decode(buf: &[u8]) -> (Decoded, usize) {
    let Some(start) = buf.iter().position(|b| !b.is_ascii_whitespace()) else {
        return (Decoded::NeedMoreBytes, 0);
    };

    let mut stream = serde_json::Deserializer::from_slice(&buf[start..]).into_iter::<Value>();
    match stream.next() {
        None => (Decoded::NeedMoreBytes, 0),
        Some(Err(e)) if e.is_eof() => (Decoded::NeedMoreBytes, 0),
        Some(Err(e)) => (Decoded::Error(DecodeError::Syntax(e.to_string())), 0),
        Some(Ok(value)) => {
            let consumed = start + stream.byte_offset();
            match command_from_value(value) {
                Ok(command) => (Decoded::Frame(command), consumed),
                Err(e) => (Decoded::Error(e), consumed),
            }
        }
    }
}

fn command_from_value(value: Value) -> Result<Command, DecodeError> {
    if !value.is_object() {
        return Err(DecodeError::Structure(
            "frame must be a JSON object".to_string(),
        ));
    }
    serde_json::from_value(value).map_err(|e| DecodeError::Structure(e.to_string()))
}

/// Serialize a response as one newline-terminated frame
pub fn encode_response(response: &Response) -> serde_json::Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec(response)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Serialize a command as one newline-terminated frame
pub fn encode_command(command: &Command) -> serde_json::Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec(command)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Buffers up to this size are re-parsed on every read so malformed input is
/// rejected before the frame completes. Larger partial frames are only scanned.
const EAGER_PARSE_LIMIT: usize = 64 * 1024;

/// Incremental scan for the end of a top-level JSON object or array.
///
/// Tracks nesting depth outside strings, so each byte is looked at once no
/// matter how many reads the frame arrives in.
#[derive(Debug, Default)]
struct FrameScan {
    pos: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl FrameScan {
    /// Continue from where the last call stopped. Returns the exclusive end
    /// of the frame once its closing bracket has been seen.
    fn advance(&mut self, bytes: &[u8]) -> Option<usize> {
        while let Some(&b) = bytes.get(self.pos) {
            self.pos += 1;
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                }
                continue;
            }
            match b {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        return Some(self.pos);
                    }
                }
                _ => {}
            }
        }
        None
    }
}

/// Partial-frame accumulator for one connection.
///
/// Bytes are only ever appended, and only removed in whole-frame units.
#[derive(Debug)]
pub struct FrameBuffer {
    bytes: Vec<u8>,
    max_frame_bytes: usize,
    scan: FrameScan,
}

impl FrameBuffer {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            bytes: Vec::new(),
            max_frame_bytes,
            scan: FrameScan::default(),
        }
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decode the next frame, consuming its bytes on success or on a
    /// structural error.
    pub fn next_frame(&mut self) -> Decoded {
        let Some(start) = self.bytes.iter().position(|b| !b.is_ascii_whitespace()) else {
            return self.need_more();
        };

        let (decoded, consumed) = if matches!(self.bytes[start], b'{' | b'[') {
            match self.scan.advance(&self.bytes) {
                Some(end) => match decode(&self.bytes[..end]) {
                    (Decoded::NeedMoreBytes, _) => (
                        Decoded::Error(DecodeError::Syntax("unterminated frame".to_string())),
                        0,
                    ),
                    done => done,
                },
                None if self.bytes.len() <= EAGER_PARSE_LIMIT => decode(&self.bytes),
                None => (Decoded::NeedMoreBytes, 0),
            }
        } else {
            decode(&self.bytes)
        };

        if matches!(decoded, Decoded::NeedMoreBytes) {
            return self.need_more();
        }
        self.bytes.drain(..consumed);
        self.scan = FrameScan::default();
        decoded
    }

    fn need_more(&self) -> Decoded {
        if self.bytes.len() > self.max_frame_bytes {
            return Decoded::Error(DecodeError::FrameTooLarge {
                limit: self.max_frame_bytes,
            });
        }
        Decoded::NeedMoreBytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::protocol::ErrorKind;
    use serde_json::json;

    const FRAME: &[u8] =
        br#"{"type": "create_object", "params": {"type": "sphere", "location": [2, 0, 1], "name": "MySphere"}}"#;

    #[test]
    fn decodes_complete_frame() {
        let (decoded, consumed) = decode(FRAME);
        assert_eq!(consumed, FRAME.len());
        match decoded {
            Decoded::Frame(cmd) => {
                assert_eq!(cmd.name, "create_object");
                assert_eq!(cmd.params["name"], "MySphere");
                assert_eq!(cmd.params["location"], json!([2, 0, 1]));
            }
            other => panic!("expected frame, got {:?}", other),
        }
    }

    #[test]
    fn partial_frame_consumes_nothing() {
        for cut in 1..FRAME.len() {
            let (decoded, consumed) = decode(&FRAME[..cut]);
            assert_eq!(decoded, Decoded::NeedMoreBytes, "cut at {}", cut);
            assert_eq!(consumed, 0);
        }
    }

    #[test]
    fn empty_and_whitespace_buffers_need_more_bytes() {
        assert_eq!(decode(b""), (Decoded::NeedMoreBytes, 0));
        assert_eq!(decode(b" \n\r\n"), (Decoded::NeedMoreBytes, 0));
    }

    #[test]
    fn byte_at_a_time_matches_all_at_once() {
        let (whole, _) = decode(FRAME);

        let mut buffer = FrameBuffer::new(1 << 20);
        let mut result = None;
        for byte in FRAME {
            buffer.extend(std::slice::from_ref(byte));
            match buffer.next_frame() {
                Decoded::NeedMoreBytes => continue,
                other => {
                    result = Some(other);
                    break;
                }
            }
        }

        assert_eq!(result, Some(whole));
        assert!(buffer.is_empty());
    }

    #[test]
    fn two_frames_in_one_buffer_decode_in_order() {
        let mut buffer = FrameBuffer::new(1 << 20);
        buffer.extend(b"{\"type\":\"ping\"}\n{\"type\":\"get_scene_info\"}\n");

        let first = buffer.next_frame();
        let second = buffer.next_frame();
        assert_eq!(first, Decoded::Frame(Command::new("ping")));
        assert_eq!(second, Decoded::Frame(Command::new("get_scene_info")));
        assert_eq!(buffer.next_frame(), Decoded::NeedMoreBytes);
    }

    #[test]
    fn bare_frames_without_newlines_are_split() {
        let mut buffer = FrameBuffer::new(1 << 20);
        buffer.extend(b"{\"type\":\"ping\"}{\"type\":\"help\"}");
        assert_eq!(buffer.next_frame(), Decoded::Frame(Command::new("ping")));
        assert_eq!(buffer.next_frame(), Decoded::Frame(Command::new("help")));
    }

    #[test]
    fn syntax_error_is_decode_error() {
        let (decoded, _) = decode(b"not valid json\n");
        assert!(matches!(decoded, Decoded::Error(DecodeError::Syntax(_))));
    }

    #[test]
    fn missing_type_is_structure_error() {
        let (decoded, consumed) = decode(br#"{"params": {}}"#);
        assert!(matches!(decoded, Decoded::Error(DecodeError::Structure(_))));
        assert_eq!(consumed, 14);
    }

    #[test]
    fn non_object_frame_is_structure_error() {
        let (decoded, _) = decode(b"[1, 2, 3]");
        assert!(matches!(decoded, Decoded::Error(DecodeError::Structure(_))));
    }

    #[test]
    fn oversized_partial_frame_is_rejected() {
        let mut buffer = FrameBuffer::new(16);
        buffer.extend(br#"{"type": "execute_code", "params": {"code": "#);
        assert_eq!(
            buffer.next_frame(),
            Decoded::Error(DecodeError::FrameTooLarge { limit: 16 })
        );
    }

    #[test]
    fn encode_then_decode_preserves_command() {
        let cmd = Command::with_params(
            "modify_object",
            json!({"name": "Cube", "location": [1.5, -2.0, 0.25], "visible": false}),
        );
        let bytes = encode_command(&cmd).unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));
        assert_eq!(decode(&bytes), (Decoded::Frame(cmd), bytes.len() - 1));
    }

    #[test]
    fn encoded_response_is_one_line() {
        let bytes = encode_response(&Response::err(ErrorKind::NotFound, "gone\nreally")).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.matches('\n').count(), 1);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn brackets_inside_strings_do_not_end_the_frame() {
        let frame = br#"{"type": "execute_code", "params": {"code": "print(\"}]\\\\\")"}}"#;
        let mut buffer = FrameBuffer::new(1 << 20);
        for chunk in frame.chunks(5) {
            buffer.extend(chunk);
            if let Decoded::Frame(cmd) = buffer.next_frame() {
                assert_eq!(cmd.params["code"], json!("print(\"}]\\\\\")"));
                assert!(buffer.is_empty());
                return;
            }
        }
        panic!("frame never completed");
    }

    #[test]
    fn small_partial_frame_with_bad_syntax_fails_early() {
        let mut buffer = FrameBuffer::new(1 << 20);
        buffer.extend(br#"{"type": oops"#);
        assert!(matches!(buffer.next_frame(), Decoded::Error(DecodeError::Syntax(_))));
    }

    #[test]
    fn multi_megabyte_frame_in_small_reads() {
        let code = "x".repeat(4 * 1024 * 1024);
        let bytes = encode_command(&Command::with_params("execute_code", json!({"code": code}))).unwrap();

        let mut buffer = FrameBuffer::new(16 * 1024 * 1024);
        let mut frames = Vec::new();
        for chunk in bytes.chunks(8 * 1024) {
            buffer.extend(chunk);
            loop {
                match buffer.next_frame() {
                    Decoded::Frame(cmd) => frames.push(cmd),
                    Decoded::NeedMoreBytes => break,
                    Decoded::Error(e) => panic!("unexpected error: {}", e),
                }
            }
        }

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].params["code"].as_str().map(str::len), Some(4 * 1024 * 1024));
    }
}
