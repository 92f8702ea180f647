//! Blocking serial driver for ESP8266-class WiFi co-processors.
//!
//! The driver turns structured operations (join a network, open a TCP or
//! UDP connection, send a buffer, receive a buffer) into AT command lines
//! and interprets the asynchronous reply stream back into typed results,
//! under per-operation time bounds.
//!
//! # Model
//!
//! Single-threaded and synchronous: the calling thread is the state
//! machine driver. Every wait is a poll loop against the transport's
//! non-blocking read, bounded by the operation's own timeout against the
//! transport's monotonic clock. There is exactly one in-flight command at
//! a time; driving one transport from several threads requires external
//! serialization.
//!
//! # Example
//!
//! ```rust,ignore
//! use espbridge_driver::Esp8266;
//! use espbridge_protocol::{Channel, Mux, Protocol, Topology};
//!
//! let mut device = Esp8266::new(serial);
//! device.begin(115_200)?;
//! device.join("lab", "secret")?;
//! device.setup(Topology::Client, Protocol::Tcp, Mux::Single)?;
//! device.connect("192.168.1.10", 8080)?;
//! device.send(b"hello")?;
//! let mut buf = [0u8; 256];
//! let received = device.receive(Channel::Single, &mut buf, Some(3_000))?;
//! device.close(Channel::Single);
//! ```

mod device;
mod error;
mod framer;
mod link;
pub mod testing;
mod transport;

pub use device::*;
pub use error::*;
pub use link::*;
pub use transport::*;

pub use espbridge_protocol as protocol;
