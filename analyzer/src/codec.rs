//! LSP base-protocol framing: `Content-Length: N\r\n\r\n{json}`.
//!
//! Decoding is an explicit incremental state machine over an accumulated
//! byte buffer, so partial chunks from a slow pipe are handled without
//! recursion or re-scanning from the start of the stream. A malformed
//! JSON body consumes exactly its announced byte count, leaving the
//! buffer aligned on the next frame.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum frame size (4 MiB) to prevent unbounded memory allocation.
pub const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("missing Content-Length header")]
    MissingContentLength,
    #[error("invalid Content-Length value: {0}")]
    InvalidContentLength(String),
    #[error("Content-Length {0} exceeds maximum {MAX_FRAME_BYTES}")]
    Oversized(usize),
    #[error("frame body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("frame read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected EOF inside a frame")]
    UnexpectedEof,
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Debug)]
enum DecodeState {
    /// Scanning for the blank line that ends the header block.
    Header,
    /// Headers consumed; waiting for `len` body bytes.
    Body { len: usize },
}

/// Incremental frame decoder. Feed bytes with [`push`](Self::push), then
/// drain complete frames with [`next_frame`](Self::next_frame).
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    state: DecodeState,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            state: DecodeState::Header,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Whether a partially-received frame is buffered (used to tell a
    /// clean EOF from a truncated one).
    #[must_use]
    pub fn has_partial(&self) -> bool {
        !self.buf.is_empty() || matches!(self.state, DecodeState::Body { .. })
    }

    /// Try to extract the next complete frame.
    ///
    /// `Ok(None)` means more bytes are needed. An `Err` consumes the
    /// offending header block or body so the decoder stays aligned for
    /// the frame after it.
    pub fn next_frame(&mut self) -> Result<Option<serde_json::Value>, DecodeError> {
        loop {
            match self.state {
                DecodeState::Header => {
                    let Some(end) = find_subslice(&self.buf, HEADER_TERMINATOR) else {
                        return Ok(None);
                    };
                    let header_block = self.buf.drain(..end + HEADER_TERMINATOR.len()).collect::<Vec<u8>>();
                    let len = parse_content_length(&header_block)?;
                    if len > MAX_FRAME_BYTES {
                        return Err(DecodeError::Oversized(len));
                    }
                    self.state = DecodeState::Body { len };
                }
                DecodeState::Body { len } => {
                    if self.buf.len() < len {
                        return Ok(None);
                    }
                    let body = self.buf.drain(..len).collect::<Vec<u8>>();
                    // Buffer is aligned on the next frame whether or not
                    // this body parses.
                    self.state = DecodeState::Header;
                    return Ok(Some(serde_json::from_slice(&body)?));
                }
            }
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Parse the `Content-Length` header out of a header block.
/// Header names compare case-insensitively; unknown headers are ignored.
fn parse_content_length(block: &[u8]) -> Result<usize, DecodeError> {
    let text = String::from_utf8_lossy(block);
    for line in text.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("Content-Length") {
            let value = value.trim();
            return value
                .parse()
                .map_err(|_| DecodeError::InvalidContentLength(value.to_string()));
        }
    }
    Err(DecodeError::MissingContentLength)
}

/// Async frame reader over a child's stdout.
///
/// Malformed frames are logged and skipped; the caller only sees complete
/// valid frames, a clean EOF (`Ok(None)`), or a fatal error.
pub struct FrameReader<R> {
    reader: R,
    decoder: FrameDecoder,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            decoder: FrameDecoder::new(),
        }
    }

    pub async fn read_frame(&mut self) -> Result<Option<serde_json::Value>, CodecError> {
        loop {
            match self.decoder.next_frame() {
                Ok(Some(frame)) => return Ok(Some(frame)),
                Ok(None) => {}
                Err(e @ DecodeError::Oversized(_)) => return Err(e.into()),
                Err(e) => {
                    tracing::warn!("skipping malformed analyzer frame: {e}");
                    continue;
                }
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                if self.decoder.has_partial() {
                    return Err(CodecError::UnexpectedEof);
                }
                return Ok(None);
            }
            self.decoder.push(&chunk[..n]);
        }
    }
}

/// Async frame writer over a child's stdin.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write_frame(&mut self, msg: &serde_json::Value) -> Result<(), CodecError> {
        let body = serde_json::to_string(msg).map_err(DecodeError::from)?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        self.writer.write_all(header.as_bytes()).await?;
        self.writer.write_all(body.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_bytes(value: &serde_json::Value) -> Vec<u8> {
        let body = serde_json::to_string(value).unwrap();
        let mut out = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
        out.extend_from_slice(body.as_bytes());
        out
    }

    #[tokio::test]
    async fn roundtrip() {
        let msg = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "textDocument/publishDiagnostics",
            "params": { "uri": "file:///game.crag" }
        });

        let mut buf = Vec::new();
        let mut writer = FrameWriter::new(&mut buf);
        writer.write_frame(&msg).await.unwrap();

        let mut reader = FrameReader::new(buf.as_slice());
        assert_eq!(reader.read_frame().await.unwrap().unwrap(), msg);
    }

    #[tokio::test]
    async fn multiple_frames_in_one_buffer() {
        let msg1 = serde_json::json!({"jsonrpc": "2.0", "id": 1});
        let msg2 = serde_json::json!({"jsonrpc": "2.0", "id": 2});

        let mut buf = frame_bytes(&msg1);
        buf.extend(frame_bytes(&msg2));

        let mut reader = FrameReader::new(buf.as_slice());
        assert_eq!(reader.read_frame().await.unwrap().unwrap(), msg1);
        assert_eq!(reader.read_frame().await.unwrap().unwrap(), msg2);
    }

    #[test]
    fn decoder_handles_byte_at_a_time_arrival() {
        let msg = serde_json::json!({"jsonrpc": "2.0", "id": 7, "result": {"ok": true}});
        let wire = frame_bytes(&msg);

        let mut decoder = FrameDecoder::new();
        for (i, byte) in wire.iter().enumerate() {
            decoder.push(std::slice::from_ref(byte));
            let got = decoder.next_frame().unwrap();
            if i + 1 < wire.len() {
                assert!(got.is_none(), "frame complete too early at byte {i}");
            } else {
                assert_eq!(got.unwrap(), msg);
            }
        }
    }

    #[test]
    fn decoder_handles_split_across_chunks() {
        let msg = serde_json::json!({"k": "value with é"});
        let wire = frame_bytes(&msg);
        let (a, b) = wire.split_at(wire.len() / 2);

        let mut decoder = FrameDecoder::new();
        decoder.push(a);
        assert!(decoder.next_frame().unwrap().is_none());
        decoder.push(b);
        assert_eq!(decoder.next_frame().unwrap().unwrap(), msg);
    }

    #[test]
    fn malformed_body_does_not_desync_next_frame() {
        let bad = b"Content-Length: 3\r\n\r\nnot";
        let good = serde_json::json!({"id": 1});

        let mut decoder = FrameDecoder::new();
        decoder.push(bad);
        decoder.push(&frame_bytes(&good));

        assert!(matches!(decoder.next_frame(), Err(DecodeError::Json(_))));
        assert_eq!(decoder.next_frame().unwrap().unwrap(), good);
    }

    #[test]
    fn missing_content_length_consumes_header_block() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"Content-Type: application/json\r\n\r\n");
        decoder.push(&frame_bytes(&serde_json::json!({"id": 2})));

        assert!(matches!(
            decoder.next_frame(),
            Err(DecodeError::MissingContentLength)
        ));
        assert_eq!(
            decoder.next_frame().unwrap().unwrap(),
            serde_json::json!({"id": 2})
        );
    }

    #[test]
    fn content_length_is_case_insensitive_and_extra_headers_ignored() {
        let body = r#"{"id":1}"#;
        let wire = format!(
            "Content-Type: application/vscode-jsonrpc\r\ncontent-length: {}\r\n\r\n{body}",
            body.len()
        );
        let mut decoder = FrameDecoder::new();
        decoder.push(wire.as_bytes());
        assert_eq!(decoder.next_frame().unwrap().unwrap()["id"], 1);
    }

    #[test]
    fn invalid_content_length_value_is_an_error() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"Content-Length: nan\r\n\r\n");
        assert!(matches!(
            decoder.next_frame(),
            Err(DecodeError::InvalidContentLength(_))
        ));
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut decoder = FrameDecoder::new();
        decoder.push(format!("Content-Length: {}\r\n\r\n", MAX_FRAME_BYTES + 1).as_bytes());
        assert!(matches!(decoder.next_frame(), Err(DecodeError::Oversized(_))));
    }

    #[test]
    fn content_length_counts_bytes_not_chars() {
        let body = r#"{"k":"é"}"#;
        assert_eq!(body.len(), 10); // 2-byte UTF-8 char
        let mut decoder = FrameDecoder::new();
        decoder.push(format!("Content-Length: {}\r\n\r\n{body}", body.len()).as_bytes());
        assert_eq!(decoder.next_frame().unwrap().unwrap()["k"], "é");
    }

    #[tokio::test]
    async fn clean_eof_returns_none() {
        let mut reader = FrameReader::new(&b""[..]);
        assert!(reader.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn eof_mid_body_is_an_error() {
        let mut reader = FrameReader::new(&b"Content-Length: 100\r\n\r\nhello"[..]);
        assert!(matches!(
            reader.read_frame().await,
            Err(CodecError::UnexpectedEof)
        ));
    }

    #[tokio::test]
    async fn eof_mid_headers_is_an_error() {
        let mut reader = FrameReader::new(&b"Content-Length: 10\r\n"[..]);
        assert!(matches!(
            reader.read_frame().await,
            Err(CodecError::UnexpectedEof)
        ));
    }

    #[tokio::test]
    async fn reader_skips_malformed_body_and_returns_next() {
        let mut wire = b"Content-Length: 3\r\n\r\nnot".to_vec();
        wire.extend(frame_bytes(&serde_json::json!({"id": 9})));
        let mut reader = FrameReader::new(wire.as_slice());
        assert_eq!(reader.read_frame().await.unwrap().unwrap()["id"], 9);
    }

    #[tokio::test]
    async fn written_content_length_is_byte_count() {
        let msg = serde_json::json!({"k": "é"});
        let mut buf = Vec::new();
        FrameWriter::new(&mut buf).write_frame(&msg).await.unwrap();

        let body = serde_json::to_string(&msg).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with(&format!("Content-Length: {}\r\n\r\n", body.len())));
    }
}
