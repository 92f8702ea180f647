//! Protocol constants.

/// Default reply timeout in milliseconds.
///
/// Used for simple status and configuration commands whose replies arrive
/// as soon as the firmware has parsed the line.
pub const DEFAULT_TIMEOUT_MS: u32 = 3_000;

/// Extended reply timeout in milliseconds.
///
/// Used for operations that involve network-level negotiation (joining an
/// access point, opening a connection, starting a server) and therefore
/// carry externally imposed latency.
pub const EXTENDED_TIMEOUT_MS: u32 = 10_000;

/// Default UART baud rate of the co-processor after reset.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Prompt emitted by the firmware when it is ready to accept payload bytes
/// after a send-length command.
pub const SEND_PROMPT: &str = "> ";

/// Marker that prefixes every inbound data frame header.
///
/// The full header is `+IPD,[<channel>,]<len>:` followed immediately by
/// `<len>` raw payload bytes.
pub const FRAME_MARKER: &str = "+IPD,";

/// Byte terminating the decimal length field of a frame header.
pub const FRAME_LENGTH_DELIMITER: u8 = b':';

/// Token printed by the firmware once it has finished booting.
pub const READY_TOKEN: &str = "ready";

/// Capacity of an IPv4 address text buffer: the longest dotted-quad form
/// (`255.255.255.255`, 15 bytes) plus a terminator.
pub const IP_ADDR_CAPACITY: usize = 16;
