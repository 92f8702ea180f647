//! Shared protocol types.

use crate::error::{ProtocolError, ProtocolResult};

/// Identifies one of the device's multiplexed connections.
///
/// In single-connection mode commands carry no connection id at all, which
/// is modeled as [`Channel::Single`] rather than a sentinel integer. The
/// wire grammar encodes an id as one decimal digit, both in commands
/// (`AT+CIPSEND=2,5`) and in inbound frame headers (`+IPD,2,<len>:`), so
/// ids above 9 are rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Channel {
    /// Single-connection mode; commands omit the id.
    #[default]
    Single,
    /// One of the multiplexed connections.
    Id(u8),
}

impl Channel {
    /// Create a multiplexed channel, validating the single-digit range.
    pub fn id(id: u8) -> ProtocolResult<Channel> {
        if id <= 9 {
            Ok(Channel::Id(id))
        } else {
            Err(ProtocolError::InvalidChannel(id))
        }
    }

    /// Whether a connection id is present.
    pub fn is_specified(&self) -> bool {
        matches!(self, Channel::Id(_))
    }

    /// The digit character for the id, if one is present.
    pub fn digit(&self) -> Option<char> {
        match self {
            Channel::Single => None,
            Channel::Id(id) => Some((b'0' + id) as char),
        }
    }
}

/// Transfer protocol selected for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// TCP connection.
    #[default]
    Tcp,
    /// UDP transmission.
    Udp,
}

impl Protocol {
    /// The quoted protocol name used in `AT+CIPSTART`.
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }
}

/// Connection multiplexing mode (`AT+CIPMUX`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mux {
    /// One connection at a time, commands carry no channel id.
    #[default]
    Single,
    /// Multiple connections identified by channel id.
    Multi,
}

impl Mux {
    /// Wire value for `AT+CIPMUX`.
    pub fn value(&self) -> u8 {
        match self {
            Mux::Single => 0,
            Mux::Multi => 1,
        }
    }
}

/// WiFi operating mode (`AT+CWMODE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiMode {
    /// Station: joins an existing access point.
    Station,
    /// Soft access point.
    AccessPoint,
    /// Station and access point simultaneously.
    Both,
}

impl WifiMode {
    /// Wire value for `AT+CWMODE`.
    pub fn value(&self) -> u8 {
        match self {
            WifiMode::Station => 1,
            WifiMode::AccessPoint => 2,
            WifiMode::Both => 3,
        }
    }
}

/// IP transfer mode (`AT+CIPMODE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Normal framed transfer.
    Normal,
    /// Unvarnished (transparent) transmission.
    Unvarnished,
}

impl TransferMode {
    /// Wire value for `AT+CIPMODE`.
    pub fn value(&self) -> u8 {
        match self {
            TransferMode::Normal => 0,
            TransferMode::Unvarnished => 1,
        }
    }
}

/// The device's current role as tracked by this layer.
///
/// At most one topology is active at a time; it is set only by a
/// successful `server()` or `connect()` and unconditionally cleared by
/// `close()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Topology {
    /// No connection established.
    #[default]
    None,
    /// Passive server started with `AT+CIPSERVER`.
    Server,
    /// Active client connection opened with `AT+CIPSTART`.
    Client,
    /// Server and client simultaneously.
    Peer,
}

/// Connection state reported by `AT+CIPSTATUS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Station has an IP address.
    GotIp,
    /// Connection established.
    Connected,
    /// Connection torn down.
    Disconnected,
    /// Not connected to an access point.
    NotConnected,
    /// Status digit missing or unrecognized.
    Unknown,
}

impl LinkStatus {
    /// Map the digit following `STATUS:` in the reply.
    pub fn from_digit(digit: u8) -> LinkStatus {
        match digit {
            b'2' => LinkStatus::GotIp,
            b'3' => LinkStatus::Connected,
            b'4' => LinkStatus::Disconnected,
            b'5' => LinkStatus::NotConnected,
            _ => LinkStatus::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_id_range() {
        assert_eq!(Channel::id(0), Ok(Channel::Id(0)));
        assert_eq!(Channel::id(9), Ok(Channel::Id(9)));
        assert_eq!(Channel::id(10), Err(ProtocolError::InvalidChannel(10)));
    }

    #[test]
    fn test_channel_digit() {
        assert_eq!(Channel::Single.digit(), None);
        assert_eq!(Channel::Id(4).digit(), Some('4'));
    }

    #[test]
    fn test_link_status_digits() {
        assert_eq!(LinkStatus::from_digit(b'2'), LinkStatus::GotIp);
        assert_eq!(LinkStatus::from_digit(b'3'), LinkStatus::Connected);
        assert_eq!(LinkStatus::from_digit(b'4'), LinkStatus::Disconnected);
        assert_eq!(LinkStatus::from_digit(b'5'), LinkStatus::NotConnected);
        assert_eq!(LinkStatus::from_digit(b'9'), LinkStatus::Unknown);
    }
}
