//! AT command protocol for ESP8266-class WiFi co-processors.
//!
//! This crate holds the sans-I/O half of the driver: AT command encoding,
//! terminal-phrase recognition, and the shared protocol types. It performs
//! no I/O of its own; the `espbridge-driver` crate drives these types
//! against a serial transport.
//!
//! # Protocol Overview
//!
//! The co-processor exposes a line-oriented AT command interface:
//!
//! - **Commands** (host → device): ASCII lines terminated with CRLF, e.g.
//!   `AT+CIPSTART=2,"TCP","192.168.1.10",8080`
//! - **Replies** (device → host): free text in which a small set of literal
//!   terminal phrases (`OK`, `ERROR`, `CONNECT`, `SEND OK`, ...)
//!   conclusively determines each command's outcome
//! - **Data frames** (device → host): a `+IPD,[<channel>,]<len>:` header
//!   followed immediately by `<len>` raw payload bytes
//!
//! # Example
//!
//! ```rust
//! use espbridge_protocol::{Channel, Command, CommandSet, PhraseMatcher, Protocol, ResultCode};
//!
//! let cmd = Command::Start {
//!     channel: Channel::Id(2),
//!     protocol: Protocol::Tcp,
//!     address: "192.168.1.10",
//!     port: 8080,
//! };
//! assert_eq!(cmd.encode(CommandSet::Current), "AT+CIPSTART=2,\"TCP\",\"192.168.1.10\",8080");
//!
//! let mut matcher = PhraseMatcher::new();
//! assert_eq!(matcher.feed_all(b"2,CONNECT\r\n"), Some(ResultCode::Connect));
//! ```

mod commands;
pub mod constants;
mod error;
mod responses;
mod types;

pub use commands::*;
pub use error::*;
pub use responses::*;
pub use types::*;
