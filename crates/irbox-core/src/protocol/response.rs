//! Response line classification.
//!
//! The device answers every command with one line.  The first character is
//! the only status signal: `+` means success (anything after it is payload),
//! any other first character means failure and the whole line is the error
//! message.

use std::fmt;

/// Marker that opens every successful response.
pub const SUCCESS_MARKER: char = '+';

/// One response line received from the device, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    text: String,
}

impl Response {
    /// Wraps a decoded response line.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// `true` iff the line starts with `+`.
    pub fn is_success(&self) -> bool {
        self.text.starts_with(SUCCESS_MARKER)
    }

    /// The full response text, exactly as received.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text after the `+` marker of a successful response.
    ///
    /// Returns `None` for failed responses.
    pub fn payload(&self) -> Option<&str> {
        self.text.strip_prefix(SUCCESS_MARKER)
    }

    /// Human-facing message with a leading `+` or `-` status marker removed.
    ///
    /// `-unsupported` reads `unsupported`; text without a marker is returned
    /// unchanged.
    pub fn detail(&self) -> &str {
        self.text
            .strip_prefix(['+', '-'])
            .unwrap_or(&self.text)
    }

    /// Consumes the response and returns the full text.
    pub fn into_text(self) -> String {
        self.text
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<String> for Response {
    fn from(text: String) -> Self {
        Self { text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_prefix_is_success() {
        assert!(Response::new("+").is_success());
        assert!(Response::new("+rx").is_success());
    }

    #[test]
    fn test_any_other_first_character_is_failure() {
        for text in ["-unsupported", "error", "", " +", "tx(0x08,0x04,0x10)"] {
            assert!(!Response::new(text).is_success(), "{text:?} must fail");
        }
    }

    #[test]
    fn test_failure_keeps_full_text() {
        let response = Response::new("-unsupported");
        assert_eq!(response.text(), "-unsupported");
        assert_eq!(response.payload(), None);
    }

    #[test]
    fn test_payload_strips_marker_only() {
        assert_eq!(Response::new("+").payload(), Some(""));
        assert_eq!(Response::new("+norx").payload(), Some("norx"));
    }

    #[test]
    fn test_detail_strips_status_marker() {
        assert_eq!(Response::new("-unsupported").detail(), "unsupported");
        assert_eq!(Response::new("+rx").detail(), "rx");
        assert_eq!(Response::new("bad command").detail(), "bad command");
    }
}
