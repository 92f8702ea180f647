//! The serial transport seam and the diagnostic byte sink.

use bytes::{Buf, BytesMut};

/// Byte-stream transport to the co-processor.
///
/// Implemented over a UART, a pty, or a test double. The driver never
/// blocks on the transport itself; every wait is a poll loop against
/// [`Transport::try_read`] bounded by the operation's own timeout, measured
/// with [`Transport::now_millis`].
pub trait Transport {
    /// Read one pending byte, or `None` if nothing has arrived.
    fn try_read(&mut self) -> Option<u8>;

    /// Write raw bytes toward the device.
    fn write(&mut self, bytes: &[u8]);

    /// Number of bytes already received and waiting to be read.
    fn bytes_available(&self) -> usize;

    /// Monotonic millisecond clock. Wraps at `u32::MAX`; elapsed times are
    /// computed with wrapping subtraction.
    fn now_millis(&self) -> u32;
}

/// Observational sink for every byte the driver consumes from the device.
///
/// Purely diagnostic: recording never affects matching or framing. Inject
/// one to capture the reply stream for post-hoc inspection.
pub trait DiagnosticSink {
    /// Record one consumed byte.
    fn record(&mut self, byte: u8);
}

/// Default capacity of [`TraceBuffer`].
pub const TRACE_BUFFER_CAPACITY: usize = 32;

/// Bounded ring of the most recently consumed bytes.
#[derive(Debug)]
pub struct TraceBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl TraceBuffer {
    /// Create a trace buffer keeping at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        TraceBuffer { buf: BytesMut::with_capacity(capacity), capacity }
    }

    /// The retained bytes, oldest first.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Discard the retained bytes.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl Default for TraceBuffer {
    fn default() -> Self {
        Self::new(TRACE_BUFFER_CAPACITY)
    }
}

impl DiagnosticSink for TraceBuffer {
    fn record(&mut self, byte: u8) {
        self.buf.extend_from_slice(&[byte]);
        if self.buf.len() > self.capacity {
            let excess = self.buf.len() - self.capacity;
            self.buf.advance(excess);
        }
    }
}
