//! Commands that can be sent to the WiFi co-processor.
//!
//! Every command encodes to a single ASCII line following the vendor AT
//! syntax. The driver appends the CRLF terminator when it writes the line,
//! so `encode` produces the bare command text.

use std::fmt::Write;

use crate::types::{Channel, Mux, Protocol, TransferMode, WifiMode};

/// Which generation of the AT command set the firmware speaks.
///
/// Firmware releases from AT instruction set v0.22 onward deprecate the
/// bare `AT+UART`/`AT+CWMODE`/`AT+CWJAP` names in favor of `_CUR` variants
/// whose effect does not persist across reset. The set is chosen once at
/// configuration time and used consistently for every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandSet {
    /// Pre-v0.22 firmware: bare command names.
    Legacy,
    /// v0.22 and later firmware: `_CUR` command names.
    #[default]
    Current,
}

impl CommandSet {
    fn uart(&self) -> &'static str {
        match self {
            CommandSet::Legacy => "AT+UART",
            CommandSet::Current => "AT+UART_CUR",
        }
    }

    fn mode(&self) -> &'static str {
        match self {
            CommandSet::Legacy => "AT+CWMODE",
            CommandSet::Current => "AT+CWMODE_CUR",
        }
    }

    fn join(&self) -> &'static str {
        match self {
            CommandSet::Legacy => "AT+CWJAP",
            CommandSet::Current => "AT+CWJAP_CUR",
        }
    }
}

/// Commands understood by the co-processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// Enable or disable command echo (`ATE1`/`ATE0`).
    Echo {
        /// Whether the firmware should echo received command bytes.
        on: bool,
    },

    /// Software reset (`AT+RST`).
    Reset,

    /// Change the UART baud rate (`AT+UART` family).
    SetBaud {
        /// New baud rate; 8 data bits, 1 stop bit, no parity, no flow control.
        baud: u32,
    },

    /// Select the WiFi operating mode (`AT+CWMODE` family).
    SetMode {
        /// Station, access point, or both.
        mode: WifiMode,
    },

    /// Select single or multiple connection mode (`AT+CIPMUX`).
    SetMux {
        /// Multiplexing mode.
        mux: Mux,
    },

    /// Select the IP transfer mode (`AT+CIPMODE`).
    SetTransferMode {
        /// Normal or unvarnished transmission.
        mode: TransferMode,
    },

    /// Join an access point (`AT+CWJAP` family).
    Join {
        /// SSID of the access point.
        ssid: &'a str,
        /// Pass phrase.
        password: &'a str,
    },

    /// Disconnect from the access point (`AT+CWQAP`).
    Quit,

    /// Query the currently joined access point (`AT+CWJAP?`).
    QueryJoin,

    /// Query the IP connection status (`AT+CIPSTATUS`).
    QueryStatus,

    /// Query the station and access-point addresses (`AT+CIFSR`).
    QueryIp,

    /// Open a client connection (`AT+CIPSTART`).
    Start {
        /// Connection id, omitted in single-connection mode.
        channel: Channel,
        /// TCP or UDP.
        protocol: Protocol,
        /// Destination address text (IP or hostname).
        address: &'a str,
        /// Destination port.
        port: u16,
    },

    /// Announce a payload of the given length (`AT+CIPSEND`).
    Send {
        /// Connection id, omitted in single-connection mode.
        channel: Channel,
        /// Payload length in bytes.
        length: usize,
    },

    /// Start the passive server (`AT+CIPSERVER=1`).
    ServerStart {
        /// Listening port.
        port: u16,
    },

    /// Stop the passive server (`AT+CIPSERVER=0`).
    ServerStop {
        /// Optional connection id to scope the stop to.
        channel: Channel,
    },

    /// Close a client connection (`AT+CIPCLOSE`).
    Close {
        /// Optional connection id to close.
        channel: Channel,
    },
}

impl Command<'_> {
    /// Encode the command as its AT line, without the CRLF terminator.
    pub fn encode(&self, set: CommandSet) -> String {
        let mut line = String::new();
        match self {
            Command::Echo { on } => {
                line.push_str(if *on { "ATE1" } else { "ATE0" });
            }
            Command::Reset => line.push_str("AT+RST"),
            Command::SetBaud { baud } => {
                let _ = write!(line, "{}={},8,1,0,0", set.uart(), baud);
            }
            Command::SetMode { mode } => {
                let _ = write!(line, "{}={}", set.mode(), mode.value());
            }
            Command::SetMux { mux } => {
                let _ = write!(line, "AT+CIPMUX={}", mux.value());
            }
            Command::SetTransferMode { mode } => {
                let _ = write!(line, "AT+CIPMODE={}", mode.value());
            }
            Command::Join { ssid, password } => {
                let _ = write!(line, "{}=\"{}\",\"{}\"", set.join(), ssid, password);
            }
            Command::Quit => line.push_str("AT+CWQAP"),
            Command::QueryJoin => line.push_str("AT+CWJAP?"),
            Command::QueryStatus => line.push_str("AT+CIPSTATUS"),
            Command::QueryIp => line.push_str("AT+CIFSR"),
            Command::Start { channel, protocol, address, port } => {
                line.push_str("AT+CIPSTART=");
                if let Some(digit) = channel.digit() {
                    line.push(digit);
                    line.push(',');
                }
                let _ = write!(line, "\"{}\",\"{}\",{}", protocol.name(), address, port);
            }
            Command::Send { channel, length } => {
                line.push_str("AT+CIPSEND=");
                if let Some(digit) = channel.digit() {
                    line.push(digit);
                    line.push(',');
                }
                let _ = write!(line, "{}", length);
            }
            Command::ServerStart { port } => {
                let _ = write!(line, "AT+CIPSERVER=1,{}", port);
            }
            Command::ServerStop { channel } => {
                line.push_str("AT+CIPSERVER=0");
                if let Some(digit) = channel.digit() {
                    line.push(',');
                    line.push(digit);
                }
            }
            Command::Close { channel } => {
                line.push_str("AT+CIPCLOSE");
                if let Some(digit) = channel.digit() {
                    line.push('=');
                    line.push(digit);
                }
            }
        }
        line
    }
}
