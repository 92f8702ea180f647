//! Byte-level primitives over the transport.
//!
//! [`Link`] owns the transport and provides the four waiting primitives
//! everything else is built from: token scanning, field extraction,
//! terminal-phrase matching, and drain. Each one polls the transport
//! against its own deadline; none blocks beyond its timeout.

use espbridge_protocol::{PhraseMatcher, ResultCode};
use log::trace;

use crate::transport::{DiagnosticSink, Transport};

/// Quiet window used when draining: the drain ends once no byte has
/// arrived for this long, so a reply still trickling in is consumed whole.
const DRAIN_QUIET_MS: u32 = 3;

/// A live serial link to the co-processor.
///
/// Every byte consumed from the transport is mirrored to the optional
/// diagnostic sink before it is interpreted.
pub struct Link<T: Transport> {
    transport: T,
    sink: Option<Box<dyn DiagnosticSink>>,
}

impl<T: Transport> Link<T> {
    /// Create a link with no diagnostic sink.
    pub fn new(transport: T) -> Self {
        Link { transport, sink: None }
    }

    /// Attach a diagnostic sink; every consumed byte is recorded to it.
    pub fn set_sink(&mut self, sink: Box<dyn DiagnosticSink>) {
        self.sink = Some(sink);
    }

    /// Access the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Current value of the transport's monotonic clock.
    pub fn now(&self) -> u32 {
        self.transport.now_millis()
    }

    /// Bytes already received and waiting.
    pub fn available(&self) -> usize {
        self.transport.bytes_available()
    }

    /// Read one pending byte, mirroring it to the sink.
    pub fn try_read(&mut self) -> Option<u8> {
        let byte = self.transport.try_read()?;
        if let Some(sink) = &mut self.sink {
            sink.record(byte);
        }
        Some(byte)
    }

    /// Write a command line, appending the CRLF terminator.
    pub fn send_line(&mut self, line: &str) {
        trace!("-> {}", line);
        self.transport.write(line.as_bytes());
        self.transport.write(b"\r\n");
    }

    /// Write raw payload bytes with no terminator.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.transport.write(bytes);
    }

    /// Scan the stream for a literal token.
    ///
    /// Maintains a cursor into the token; a matching byte advances it and
    /// any mismatch restarts it from zero. Returns `true` once the whole
    /// token has been seen, `false` if the timeout elapses first.
    pub fn scan(&mut self, token: &str, timeout_ms: u32) -> bool {
        let token = token.as_bytes();
        let mut matched = 0;
        let start = self.now();
        while matched < token.len() {
            if let Some(byte) = self.try_read() {
                if byte == token[matched] {
                    matched += 1;
                } else {
                    matched = 0;
                }
            }
            if self.now().wrapping_sub(start) > timeout_ms {
                break;
            }
        }
        matched == token.len()
    }

    /// Read bytes into `buf` until `terminator` is seen or the timeout
    /// elapses. The terminator is consumed but not stored; the stored run
    /// is always followed by a `0` terminator byte. Returns the count of
    /// bytes stored.
    ///
    /// Once only the terminator slot remains free, further bytes are
    /// consumed but dropped, so an oversized field cannot overrun `buf`.
    pub fn read_until(&mut self, buf: &mut [u8], terminator: u8, timeout_ms: u32) -> usize {
        let start = self.now();
        let mut count = 0;
        loop {
            if let Some(byte) = self.try_read() {
                if byte == terminator {
                    break;
                }
                if count + 1 < buf.len() {
                    buf[count] = byte;
                    count += 1;
                }
            }
            if self.now().wrapping_sub(start) > timeout_ms {
                break;
            }
        }
        if !buf.is_empty() {
            buf[count] = 0;
        }
        count
    }

    /// Race all terminal phrases against the stream.
    ///
    /// Consumes bytes until one phrase completes, returning its result
    /// code, or until `timeout_ms` elapses, returning
    /// [`ResultCode::Timeout`].
    pub fn await_response(&mut self, timeout_ms: u32) -> ResultCode {
        let mut matcher = PhraseMatcher::new();
        let start = self.now();
        loop {
            if let Some(byte) = self.try_read() {
                if let Some(code) = matcher.feed(byte) {
                    return code;
                }
            }
            if self.now().wrapping_sub(start) >= timeout_ms {
                trace!("await_response timed out after {} ms", timeout_ms);
                return ResultCode::Timeout;
            }
        }
    }

    /// Drain pending reply bytes so they cannot corrupt the next command's
    /// matching. Keeps reading until the stream has been quiet for a few
    /// milliseconds.
    pub fn drain(&mut self) {
        let mut last_byte_at = self.now();
        loop {
            if self.try_read().is_some() {
                last_byte_at = self.now();
            } else if self.now().wrapping_sub(last_byte_at) >= DRAIN_QUIET_MS {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use crate::transport::TraceBuffer;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_scan_finds_token_mid_stream() {
        let mut link = Link::new(ScriptedTransport::with_script(b"xx> "));
        assert!(link.scan("> ", 100));
    }

    #[test]
    fn test_scan_times_out_without_token() {
        let mut link = Link::new(ScriptedTransport::with_script(b"xxxxxxx"));
        assert!(!link.scan("> ", 5));
    }

    #[test]
    fn test_scan_restarts_on_mismatch() {
        // "rearready": the first "rea" dead-ends at 'r', the scan restarts
        // and still finds the full token.
        let mut link = Link::new(ScriptedTransport::with_script(b"rearready"));
        assert!(link.scan("ready", 100));
    }

    #[test]
    fn test_read_until_stops_at_terminator() {
        let mut link = Link::new(ScriptedTransport::with_script(b"abc\"rest"));
        let mut buf = [0u8; 8];
        let count = link.read_until(&mut buf, b'"', 100);
        assert_eq!(count, 3);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(buf[3], 0);
    }

    #[test]
    fn test_read_until_bounds_storage() {
        let mut link = Link::new(ScriptedTransport::with_script(b"longfield\"x"));
        let mut buf = [0u8; 5];
        let count = link.read_until(&mut buf, b'"', 100);
        assert_eq!(count, 4);
        assert_eq!(&buf[..4], b"long");
        assert_eq!(buf[4], 0);
    }

    #[test]
    fn test_await_response_returns_phrase_code() {
        let mut link = Link::new(ScriptedTransport::with_script(b"AT+CIPMUX=1\r\r\nOK\r\n"));
        assert_eq!(link.await_response(100), ResultCode::Ok);
    }

    #[test]
    fn test_await_response_timeout_bounds() {
        let mut link = Link::new(ScriptedTransport::with_script(b"nothing here"));
        let start = link.now();
        assert_eq!(link.await_response(50), ResultCode::Timeout);
        let elapsed = link.now().wrapping_sub(start);
        assert!(elapsed >= 50, "timed out early at {} ms", elapsed);
        // One poll's worth of slack past the deadline.
        assert!(elapsed <= 51, "timed out late at {} ms", elapsed);
    }

    #[test]
    fn test_await_response_elapsed_under_timeout_on_match() {
        let mut link = Link::new(ScriptedTransport::with_script(b"\r\nSEND OK\r\n"));
        let start = link.now();
        assert_eq!(link.await_response(100), ResultCode::SendOk);
        assert!(link.now().wrapping_sub(start) < 100);
    }

    #[test]
    fn test_drain_consumes_pending_bytes() {
        let mut link = Link::new(ScriptedTransport::with_script(b"leftover reply\r\n"));
        link.drain();
        assert_eq!(link.available(), 0);
    }

    #[test]
    fn test_consumed_bytes_are_mirrored_to_sink() {
        #[derive(Default)]
        struct Shared(Rc<RefCell<Vec<u8>>>);
        impl DiagnosticSink for Shared {
            fn record(&mut self, byte: u8) {
                self.0.borrow_mut().push(byte);
            }
        }

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut link = Link::new(ScriptedTransport::with_script(b"xx> "));
        link.set_sink(Box::new(Shared(seen.clone())));
        assert!(link.scan("> ", 100));
        assert_eq!(seen.borrow().as_slice(), b"xx> ");
    }

    #[test]
    fn test_trace_buffer_as_link_sink() {
        let mut link = Link::new(ScriptedTransport::with_script(b"\r\nOK\r\n"));
        link.set_sink(Box::new(TraceBuffer::new(4)));
        assert_eq!(link.await_response(100), ResultCode::Ok);
    }

    #[test]
    fn test_send_line_appends_crlf() {
        let mut link = Link::new(ScriptedTransport::new());
        link.send_line("AT+CIPMUX=1");
        assert_eq!(link.transport_mut().written(), b"AT+CIPMUX=1\r\n");
    }
}
