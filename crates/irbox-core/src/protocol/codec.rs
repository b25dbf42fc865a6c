//! Line codec for the IR box text protocol.
//!
//! Wire format:
//! ```text
//! <ASCII text without CR or LF>\r\n
//! ```
//! Every command and every response is exactly one such line.  There is no
//! header, no length prefix, and no request identifier.

use thiserror::Error;
use tracing::warn;

/// Two-byte terminator closing every line on the wire.
pub const LINE_TERMINATOR: &[u8; 2] = b"\r\n";

/// Longest line body (excluding the terminator) the decoder will buffer.
///
/// Device responses are short status lines or `tx(...)` echoes; anything
/// longer means the stream is out of sync.
pub const MAX_LINE_LEN: usize = 4096;

/// Errors that can occur while encoding commands or decoding response lines.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// No complete line is buffered yet.
    #[error("insufficient data: no line terminator in {buffered} buffered bytes")]
    InsufficientData { buffered: usize },

    /// A line grew past [`MAX_LINE_LEN`] without a terminator.
    #[error("line exceeds {limit} bytes without a terminator")]
    LineTooLong { limit: usize },

    /// An outgoing message contains non-ASCII characters.
    #[error("message is not ASCII: {0:?}")]
    NonAscii(String),

    /// An outgoing message contains a CR or LF, which would split it into
    /// several lines on the wire.
    #[error("message contains an embedded line terminator: {0:?}")]
    EmbeddedTerminator(String),

    /// Command arguments cannot be expressed on the wire.
    #[error("malformed arguments: {0}")]
    MalformedArguments(String),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes one line of text into wire bytes, appending `\r\n`.
///
/// # Errors
///
/// Returns [`ProtocolError::NonAscii`] or [`ProtocolError::EmbeddedTerminator`]
/// when `text` cannot travel as a single ASCII line.
///
/// # Examples
///
/// ```rust
/// use irbox_core::encode_line;
///
/// assert_eq!(encode_line("nop").unwrap(), b"nop\r\n".to_vec());
/// ```
pub fn encode_line(text: &str) -> Result<Vec<u8>, ProtocolError> {
    if !text.is_ascii() {
        return Err(ProtocolError::NonAscii(text.to_string()));
    }
    if text.contains(['\r', '\n']) {
        return Err(ProtocolError::EmbeddedTerminator(text.to_string()));
    }

    let mut buf = Vec::with_capacity(text.len() + LINE_TERMINATOR.len());
    buf.extend_from_slice(text.as_bytes());
    buf.extend_from_slice(LINE_TERMINATOR);
    Ok(buf)
}

/// Decodes one line from the beginning of `bytes`.
///
/// Returns the line without its terminator and the number of bytes consumed
/// (line + terminator), so the caller can advance their read cursor.
///
/// Non-ASCII bytes are not rejected: the device owns the response text, and
/// dropping a line would shift every later response onto the wrong request.
/// They are replaced with U+FFFD and logged.
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] when no terminator is buffered
/// yet and [`ProtocolError::LineTooLong`] when the buffered line is longer
/// than [`MAX_LINE_LEN`].
///
/// # Examples
///
/// ```rust
/// use irbox_core::decode_line;
///
/// let (line, consumed) = decode_line(b"+rx\r\nleftover").unwrap();
/// assert_eq!(line, "+rx");
/// assert_eq!(consumed, 5);
/// ```
pub fn decode_line(bytes: &[u8]) -> Result<(String, usize), ProtocolError> {
    let Some(end) = find_terminator(bytes) else {
        // A trailing CR may be half of the terminator, not part of the body.
        let body_len = bytes.len() - usize::from(bytes.last() == Some(&LINE_TERMINATOR[0]));
        if body_len > MAX_LINE_LEN {
            return Err(ProtocolError::LineTooLong {
                limit: MAX_LINE_LEN,
            });
        }
        return Err(ProtocolError::InsufficientData {
            buffered: bytes.len(),
        });
    };

    if end > MAX_LINE_LEN {
        return Err(ProtocolError::LineTooLong {
            limit: MAX_LINE_LEN,
        });
    }

    let body = &bytes[..end];
    if !body.is_ascii() {
        warn!("response line contains non-ASCII bytes; replacing them");
    }
    let line = String::from_utf8_lossy(body).into_owned();
    Ok((line, end + LINE_TERMINATOR.len()))
}

fn find_terminator(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(LINE_TERMINATOR.len())
        .position(|w| w == LINE_TERMINATOR)
}

// ── Streaming decoder ─────────────────────────────────────────────────────────

/// Accumulates bytes read from a stream and yields complete lines.
///
/// TCP is a *stream* protocol: one `read()` may return half a line, or
/// several lines at once, or a terminator split between two reads.  Feed every
/// chunk with [`feed`](LineDecoder::feed) and then drain lines with
/// [`next_line`](LineDecoder::next_line) until it returns `Ok(None)`.
///
/// An oversized line is reported exactly once, however many reads it spans,
/// so a caller that answers each error with a placeholder keeps one entry
/// per device line.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
    /// Skipping the rest of a line already reported as too long.
    discarding: bool,
}

impl LineDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(256),
            discarding: false,
        }
    }

    /// Appends freshly read bytes to the internal buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Removes and returns the next complete line, if one is buffered.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::LineTooLong`] once per oversized line; its
    /// bytes are discarded up to the next terminator so decoding resumes
    /// with the following line.
    pub fn next_line(&mut self) -> Result<Option<String>, ProtocolError> {
        if self.discarding {
            match find_terminator(&self.buf) {
                Some(end) => {
                    self.buf.drain(..end + LINE_TERMINATOR.len());
                    self.discarding = false;
                }
                None => {
                    self.discard_keeping_split_terminator();
                    return Ok(None);
                }
            }
        }

        match decode_line(&self.buf) {
            Ok((line, consumed)) => {
                self.buf.drain(..consumed);
                Ok(Some(line))
            }
            Err(ProtocolError::InsufficientData { .. }) => Ok(None),
            Err(e) => {
                match find_terminator(&self.buf) {
                    Some(end) => {
                        self.buf.drain(..end + LINE_TERMINATOR.len());
                    }
                    None => {
                        self.discard_keeping_split_terminator();
                        self.discarding = true;
                    }
                }
                Err(e)
            }
        }
    }

    /// Empties the buffer except for a trailing CR, which may be the first
    /// half of the terminator.
    fn discard_keeping_split_terminator(&mut self) {
        let split = self.buf.last() == Some(&LINE_TERMINATOR[0]);
        self.buf.clear();
        if split {
            self.buf.push(LINE_TERMINATOR[0]);
        }
    }

    /// Number of bytes buffered but not yet returned as a line.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Discards any partially received line.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.discarding = false;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_line_appends_crlf() {
        assert_eq!(encode_line("nop").unwrap(), b"nop\r\n");
    }

    #[test]
    fn test_encode_line_empty_text_is_bare_terminator() {
        assert_eq!(encode_line("").unwrap(), b"\r\n");
    }

    #[test]
    fn test_encode_line_rejects_non_ascii() {
        let result = encode_line("tx(ü)");
        assert!(matches!(result, Err(ProtocolError::NonAscii(_))));
    }

    #[test]
    fn test_encode_line_rejects_embedded_terminator() {
        assert!(matches!(
            encode_line("nop\r\nrx"),
            Err(ProtocolError::EmbeddedTerminator(_))
        ));
        assert!(matches!(
            encode_line("nop\n"),
            Err(ProtocolError::EmbeddedTerminator(_))
        ));
    }

    #[test]
    fn test_decode_line_strips_terminator() {
        // Arrange
        let bytes = b"-unsupported\r\n";

        // Act
        let (line, consumed) = decode_line(bytes).unwrap();

        // Assert
        assert_eq!(line, "-unsupported");
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn test_decode_line_without_terminator_is_insufficient() {
        let result = decode_line(b"+no");
        assert_eq!(result, Err(ProtocolError::InsufficientData { buffered: 3 }));
    }

    #[test]
    fn test_decode_line_bare_lf_is_not_a_terminator() {
        let result = decode_line(b"+a\nb");
        assert!(matches!(result, Err(ProtocolError::InsufficientData { .. })));
    }

    #[test]
    fn test_decode_line_empty_line() {
        let (line, consumed) = decode_line(b"\r\n").unwrap();
        assert_eq!(line, "");
        assert_eq!(consumed, 2);
    }

    #[test]
    fn test_decode_line_replaces_non_ascii_instead_of_failing() {
        let (line, consumed) = decode_line(b"-bad \xff\r\n").unwrap();
        assert!(line.starts_with("-bad "));
        assert_eq!(consumed, 8);
    }

    #[test]
    fn test_decode_line_overlong_line_is_rejected() {
        let mut bytes = vec![b'x'; MAX_LINE_LEN + 1];
        assert_eq!(
            decode_line(&bytes),
            Err(ProtocolError::LineTooLong {
                limit: MAX_LINE_LEN
            })
        );
        bytes.extend_from_slice(b"\r\n");
        assert!(matches!(
            decode_line(&bytes),
            Err(ProtocolError::LineTooLong { .. })
        ));
    }

    #[test]
    fn test_line_decoder_handles_terminator_split_across_reads() {
        // Arrange
        let mut decoder = LineDecoder::new();

        // Act – CR arrives in one read, LF in the next
        decoder.feed(b"+nop\r");
        let first = decoder.next_line().unwrap();
        decoder.feed(b"\n");
        let second = decoder.next_line().unwrap();

        // Assert
        assert_eq!(first, None);
        assert_eq!(second.as_deref(), Some("+nop"));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_line_decoder_yields_coalesced_lines_in_order() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"+\r\n+rx\r\ntx(0x08,0x04,0x10)\r\n+no");

        assert_eq!(decoder.next_line().unwrap().as_deref(), Some("+"));
        assert_eq!(decoder.next_line().unwrap().as_deref(), Some("+rx"));
        assert_eq!(
            decoder.next_line().unwrap().as_deref(),
            Some("tx(0x08,0x04,0x10)")
        );
        assert_eq!(decoder.next_line().unwrap(), None);
        assert_eq!(decoder.buffered(), 3);
    }

    #[test]
    fn test_line_decoder_resynchronises_after_overflow() {
        // Arrange
        let mut decoder = LineDecoder::new();
        decoder.feed(&vec![b'x'; MAX_LINE_LEN + 10]);

        // Act
        let overflow = decoder.next_line();
        decoder.feed(b"tail of the long line\r\n+ok\r\n");
        let recovered = decoder.next_line().unwrap();

        // Assert
        assert!(matches!(overflow, Err(ProtocolError::LineTooLong { .. })));
        assert_eq!(recovered.as_deref(), Some("+ok"));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_line_decoder_reports_long_line_once_across_reads() {
        // Arrange – one oversized line arrives in three reads
        let mut decoder = LineDecoder::new();
        let mut errors = 0;
        let mut lines = Vec::new();

        // Act
        for chunk in [
            vec![b'x'; MAX_LINE_LEN + 1],
            vec![b'y'; MAX_LINE_LEN + 1],
            b"zz\r".to_vec(),
            b"\n+next\r\n".to_vec(),
        ] {
            decoder.feed(&chunk);
            loop {
                match decoder.next_line() {
                    Ok(Some(line)) => lines.push(line),
                    Ok(None) => break,
                    Err(_) => errors += 1,
                }
            }
        }

        // Assert
        assert_eq!(errors, 1);
        assert_eq!(lines, ["+next"]);
    }

    #[test]
    fn test_line_decoder_accepts_longest_line_with_split_terminator() {
        let mut decoder = LineDecoder::new();
        let mut bytes = vec![b'x'; MAX_LINE_LEN];
        bytes.push(b'\r');
        decoder.feed(&bytes);

        assert_eq!(decoder.next_line().unwrap(), None);
        decoder.feed(b"\n");
        assert_eq!(decoder.next_line().unwrap().map(|l| l.len()), Some(MAX_LINE_LEN));
    }

    #[test]
    fn test_line_decoder_reports_terminated_long_line_once() {
        let mut decoder = LineDecoder::new();
        let mut bytes = vec![b'x'; MAX_LINE_LEN + 1];
        bytes.extend_from_slice(b"\r\n+after\r\n");
        decoder.feed(&bytes);

        assert!(matches!(decoder.next_line(), Err(ProtocolError::LineTooLong { .. })));
        assert_eq!(decoder.next_line().unwrap().as_deref(), Some("+after"));
        assert_eq!(decoder.next_line().unwrap(), None);
    }

    #[test]
    fn test_line_decoder_clear_discards_partial_line() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"+half");
        decoder.clear();
        decoder.feed(b"+whole\r\n");
        assert_eq!(decoder.next_line().unwrap().as_deref(), Some("+whole"));
    }
}
