//! Test support: a scripted transport double.
//!
//! Used by this crate's own tests and available to downstream crates that
//! test against the driver without hardware.

use std::collections::VecDeque;

use crate::transport::Transport;

/// Scripted transport: replays a canned inbound byte stream, captures
/// outbound writes, and advances a manual clock by one millisecond per
/// poll so every timeout loop terminates.
pub struct ScriptedTransport {
    inbound: VecDeque<u8>,
    written: Vec<u8>,
    triggers: Vec<(Vec<u8>, Vec<u8>)>,
    clock: u32,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        ScriptedTransport {
            inbound: VecDeque::new(),
            written: Vec::new(),
            triggers: Vec::new(),
            clock: 0,
        }
    }

    pub fn with_script(script: &[u8]) -> Self {
        let mut transport = Self::new();
        transport.script(script);
        transport
    }

    /// Append bytes to the inbound stream.
    pub fn script(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    /// Queue a reply that becomes readable once the written stream ends
    /// with `pattern`. Each trigger fires at most once. This models
    /// replies that only exist after the driver has sent the command that
    /// provokes them.
    pub fn reply_on(&mut self, pattern: &[u8], reply: &[u8]) {
        self.triggers.push((pattern.to_vec(), reply.to_vec()));
    }

    /// Everything the driver has written so far.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Written bytes as text, for command-line assertions.
    pub fn written_str(&self) -> &str {
        std::str::from_utf8(&self.written).expect("written bytes are not UTF-8")
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ScriptedTransport {
    fn try_read(&mut self) -> Option<u8> {
        self.clock = self.clock.wrapping_add(1);
        self.inbound.pop_front()
    }

    fn write(&mut self, bytes: &[u8]) {
        self.written.extend_from_slice(bytes);
        let mut fired = Vec::new();
        for (i, (pattern, reply)) in self.triggers.iter().enumerate() {
            if self.written.ends_with(pattern) {
                self.inbound.extend(reply.iter().copied());
                fired.push(i);
            }
        }
        for i in fired.into_iter().rev() {
            self.triggers.remove(i);
        }
    }

    fn bytes_available(&self) -> usize {
        self.inbound.len()
    }

    fn now_millis(&self) -> u32 {
        self.clock
    }
}
