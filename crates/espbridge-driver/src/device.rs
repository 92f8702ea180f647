//! The device handle: command formatters plus the connection-topology
//! state machine.
//!
//! [`Esp8266`] is an explicit, caller-owned context; there is no shared
//! default instance. It tracks the last role this layer established on the
//! device (`None`/`Server`/`Client`/`Peer`) and dispatches teardown on it:
//! a server is stopped with `AT+CIPSERVER=0`, a client connection with
//! `AT+CIPCLOSE`, and in either case the tracked topology returns to
//! `None` regardless of the device's reply.

use espbridge_protocol::constants::{
    DEFAULT_TIMEOUT_MS, EXTENDED_TIMEOUT_MS, IP_ADDR_CAPACITY, READY_TOKEN,
};
use espbridge_protocol::{
    Channel, Command, CommandSet, LinkStatus, Mux, Protocol, ResultCode, Topology, TransferMode,
    WifiMode,
};
use log::debug;

use crate::error::{DriverError, DriverResult};
use crate::link::Link;
use crate::transport::{DiagnosticSink, Transport};

/// Driver handle for one ESP8266-class co-processor.
pub struct Esp8266<T: Transport> {
    link: Link<T>,
    command_set: CommandSet,
    topology: Topology,
    protocol: Protocol,
    mux: Mux,
    sta_ip: [u8; IP_ADDR_CAPACITY],
    ap_ip: [u8; IP_ADDR_CAPACITY],
}

impl<T: Transport> Esp8266<T> {
    /// Create a handle over the given transport, speaking the current
    /// (v0.22+) command set.
    pub fn new(transport: T) -> Self {
        Self::with_command_set(transport, CommandSet::Current)
    }

    /// Create a handle for a firmware speaking the given command set.
    pub fn with_command_set(transport: T, command_set: CommandSet) -> Self {
        Esp8266 {
            link: Link::new(transport),
            command_set,
            topology: Topology::None,
            protocol: Protocol::Tcp,
            mux: Mux::Single,
            sta_ip: [0; IP_ADDR_CAPACITY],
            ap_ip: [0; IP_ADDR_CAPACITY],
        }
    }

    /// Attach a diagnostic sink recording every byte consumed from the
    /// device.
    pub fn set_sink(&mut self, sink: Box<dyn DiagnosticSink>) {
        self.link.set_sink(sink);
    }

    /// The last topology this layer established.
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Access the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        self.link.transport_mut()
    }

    fn encode(&self, command: Command<'_>) -> String {
        command.encode(self.command_set)
    }

    /// Await a reply and require the generic `OK`.
    fn expect_ok(&mut self, timeout_ms: u32) -> DriverResult<()> {
        match self.link.await_response(timeout_ms) {
            ResultCode::Ok => Ok(()),
            ResultCode::Timeout => Err(DriverError::Timeout),
            other => Err(DriverError::Device(other)),
        }
    }

    /// In multi-connection mode every connect/send must name a channel.
    fn require_channel(&self, channel: Channel) -> DriverResult<()> {
        if self.mux == Mux::Multi && !channel.is_specified() {
            return Err(DriverError::ChannelRequired);
        }
        Ok(())
    }

    /// Start the session: switch the device to `baud` and disable command
    /// echo.
    pub fn begin(&mut self, baud: u32) -> DriverResult<()> {
        self.link.send_line(&self.encode(Command::SetBaud { baud }));
        self.link.drain();
        self.link.send_line(&self.encode(Command::Echo { on: false }));
        self.expect_ok(DEFAULT_TIMEOUT_MS)?;
        self.link.drain();
        Ok(())
    }

    /// End the session: leave the access point and restore command echo.
    pub fn end(&mut self) {
        let _ = self.disconnect();
        self.link.send_line(&self.encode(Command::Echo { on: true }));
    }

    /// Software reset via `AT+RST`, waiting for the boot banner.
    pub fn reset_soft(&mut self) -> DriverResult<()> {
        self.link.send_line(&self.encode(Command::Reset));
        self.wait_ready()
    }

    /// Wait for the boot banner after a reset. Used on its own when the
    /// reset line is toggled externally.
    pub fn wait_ready(&mut self) -> DriverResult<()> {
        if self.link.scan(READY_TOKEN, EXTENDED_TIMEOUT_MS) {
            Ok(())
        } else {
            Err(DriverError::Timeout)
        }
    }

    /// Configure operating mode, multiplexing, and (optionally) the IP
    /// transfer mode.
    pub fn config(
        &mut self,
        mode: WifiMode,
        mux: Mux,
        transfer: Option<TransferMode>,
    ) -> DriverResult<()> {
        self.link.send_line(&self.encode(Command::SetMode { mode }));
        self.expect_ok(DEFAULT_TIMEOUT_MS)?;
        self.link.send_line(&self.encode(Command::SetMux { mux }));
        self.expect_ok(DEFAULT_TIMEOUT_MS)?;
        // CIPMODE applies only once a connection exists; skip it when the
        // caller leaves the transfer mode unspecified.
        if let Some(mode) = transfer {
            self.link.send_line(&self.encode(Command::SetTransferMode { mode }));
            self.expect_ok(DEFAULT_TIMEOUT_MS)?;
        }
        Ok(())
    }

    /// Join an access point. Network negotiation gets the extended
    /// timeout.
    pub fn join(&mut self, ssid: &str, password: &str) -> DriverResult<()> {
        self.link.send_line(&self.encode(Command::Join { ssid, password }));
        self.expect_ok(EXTENDED_TIMEOUT_MS)
    }

    /// Disconnect from the access point.
    pub fn disconnect(&mut self) -> DriverResult<()> {
        self.link.send_line(&self.encode(Command::Quit));
        self.expect_ok(DEFAULT_TIMEOUT_MS)
    }

    /// Query the joined access point. On success the SSID is stored into
    /// `ssid` and `true` is returned.
    pub fn is_connected(&mut self, ssid: &mut [u8]) -> bool {
        self.link.send_line(&self.encode(Command::QueryJoin));
        if self.link.scan("+CWJAP:\"", DEFAULT_TIMEOUT_MS)
            && self.link.read_until(ssid, b'"', DEFAULT_TIMEOUT_MS) > 0
        {
            self.link.drain();
            return true;
        }
        false
    }

    /// Query the station and access-point addresses, returning the one for
    /// `mode`. The device never reports an address longer than the
    /// dotted-quad maximum, so the fixed buffers cannot overflow.
    pub fn ip(&mut self, mode: WifiMode) -> Option<&str> {
        self.link.send_line(&self.encode(Command::QueryIp));
        if self.link.scan("+CIFSR:STAIP,\"", DEFAULT_TIMEOUT_MS) {
            self.link.read_until(&mut self.sta_ip, b'"', DEFAULT_TIMEOUT_MS);
        }
        if self.link.scan("+CIFSR:APIP,\"", DEFAULT_TIMEOUT_MS) {
            self.link.read_until(&mut self.ap_ip, b'"', DEFAULT_TIMEOUT_MS);
        } else {
            // No access-point report; the device is not in SoftAP mode.
            self.ap_ip[0] = 0;
        }
        self.link.drain();
        match mode {
            WifiMode::Station => ip_text(&self.sta_ip),
            WifiMode::AccessPoint => ip_text(&self.ap_ip),
            WifiMode::Both => None,
        }
    }

    /// Query the IP connection status.
    pub fn status(&mut self) -> LinkStatus {
        self.link.send_line(&self.encode(Command::QueryStatus));
        let mut status = LinkStatus::Unknown;
        if self.link.scan("STATUS:", DEFAULT_TIMEOUT_MS) {
            // The digit follows the token immediately and is already
            // buffered once the scan completes.
            if let Some(digit) = self.link.try_read() {
                status = LinkStatus::from_digit(digit);
            }
        }
        self.link.drain();
        status
    }

    /// Set up the connection topology: configure the WiFi mode for the
    /// intended role and record the protocol and multiplexing mode every
    /// subsequent connect/send will use.
    ///
    /// The tracked topology itself only changes on a successful
    /// [`server`](Self::server) or [`connect`](Self::connect); a failure
    /// here leaves it untouched.
    pub fn setup(&mut self, topology: Topology, protocol: Protocol, mux: Mux) -> DriverResult<()> {
        let mux = match topology {
            // A server must accept several inbound connections.
            Topology::Server => Mux::Multi,
            _ => mux,
        };
        match topology {
            Topology::Client => self.config(WifiMode::Station, mux, None)?,
            Topology::Server => self.config(WifiMode::AccessPoint, mux, None)?,
            Topology::Peer => self.config(WifiMode::Both, mux, None)?,
            Topology::None => {}
        }
        self.protocol = protocol;
        self.mux = mux;
        Ok(())
    }

    /// Start the passive server on `port`. On the connection-established
    /// reply the topology moves to `Server`.
    pub fn server(&mut self, port: u16) -> DriverResult<()> {
        self.link.send_line(&self.encode(Command::ServerStart { port }));
        let result = match self.link.await_response(EXTENDED_TIMEOUT_MS) {
            ResultCode::Connect => {
                debug!("topology {:?} -> {:?}", self.topology, Topology::Server);
                self.topology = Topology::Server;
                Ok(())
            }
            ResultCode::Timeout => Err(DriverError::Timeout),
            other => Err(DriverError::Device(other)),
        };
        self.link.drain();
        result
    }

    /// Open a client connection in single-connection mode.
    pub fn connect(&mut self, address: &str, port: u16) -> DriverResult<()> {
        self.connect_on(Channel::Single, address, port)
    }

    /// Open a client connection on an explicit channel. On the
    /// connection-established reply the topology moves to `Client`.
    pub fn connect_on(&mut self, channel: Channel, address: &str, port: u16) -> DriverResult<()> {
        self.require_channel(channel)?;
        self.link.send_line(&self.encode(Command::Start {
            channel,
            protocol: self.protocol,
            address,
            port,
        }));
        let result = match self.link.await_response(EXTENDED_TIMEOUT_MS) {
            ResultCode::Connect => {
                debug!("topology {:?} -> {:?}", self.topology, Topology::Client);
                self.topology = Topology::Client;
                Ok(())
            }
            ResultCode::Timeout => Err(DriverError::Timeout),
            other => Err(DriverError::Device(other)),
        };
        self.link.drain();
        result
    }

    /// Send a payload in single-connection mode.
    pub fn send(&mut self, payload: &[u8]) -> DriverResult<()> {
        self.send_on(Channel::Single, payload)
    }

    /// Send a payload on an explicit channel.
    pub fn send_on(&mut self, channel: Channel, payload: &[u8]) -> DriverResult<()> {
        self.require_channel(channel)?;
        self.link.send_payload(channel, payload, self.command_set)
    }

    /// Open a connection to `address:port` and send `payload` over it in
    /// one call. Chiefly useful for UDP, where the "connection" only fixes
    /// the datagram destination.
    pub fn send_to(
        &mut self,
        channel: Channel,
        address: &str,
        port: u16,
        payload: &[u8],
    ) -> DriverResult<()> {
        self.connect_on(channel, address, port)?;
        self.send_on(channel, payload)
    }

    /// Wait for an inbound frame header and return its advertised length.
    /// `None` waits indefinitely.
    pub fn listen(&mut self, channel: Channel, timeout_ms: Option<u32>) -> DriverResult<usize> {
        self.link.listen(channel, timeout_ms)
    }

    /// Receive one inbound frame into `buf`, returning the count of bytes
    /// stored.
    pub fn receive(
        &mut self,
        channel: Channel,
        buf: &mut [u8],
        timeout_ms: Option<u32>,
    ) -> DriverResult<usize> {
        self.link.receive(channel, buf, timeout_ms)
    }

    /// Bytes already received and waiting.
    pub fn available(&self) -> usize {
        self.link.available()
    }

    /// Read one pending byte.
    pub fn read(&mut self) -> Option<u8> {
        self.link.try_read()
    }

    /// Close the active connection, dispatching on the current topology:
    /// a server is stopped, a client connection closed, and with no
    /// topology no command is issued at all. The tracked topology returns
    /// to `None` unconditionally, and any reply is drained so it cannot
    /// corrupt the next command's matching.
    pub fn close(&mut self, channel: Channel) {
        self.link.drain();
        let issued = match self.topology {
            Topology::Server => {
                self.link.send_line(&self.encode(Command::ServerStop { channel }));
                true
            }
            Topology::Client | Topology::Peer => {
                self.link.send_line(&self.encode(Command::Close { channel }));
                true
            }
            Topology::None => false,
        };
        if self.topology != Topology::None {
            debug!("topology {:?} -> {:?}", self.topology, Topology::None);
        }
        self.topology = Topology::None;
        if issued {
            // The acknowledgement is deliberately ignored; waiting for it
            // just keeps the reply out of the next command's stream.
            let _ = self.link.await_response(DEFAULT_TIMEOUT_MS);
        }
    }
}

/// The text form of a stored IP address, up to its terminator.
fn ip_text(buf: &[u8]) -> Option<&str> {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    if end == 0 {
        return None;
    }
    std::str::from_utf8(&buf[..end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;

    fn device_with_script(script: &[u8]) -> Esp8266<ScriptedTransport> {
        Esp8266::new(ScriptedTransport::with_script(script))
    }

    #[test]
    fn test_server_establishes_server_topology() {
        let mut device = device_with_script(b"CONNECT\r\n");
        assert_eq!(device.topology(), Topology::None);
        assert_eq!(device.server(333), Ok(()));
        assert_eq!(device.topology(), Topology::Server);
        assert_eq!(device.transport_mut().written(), b"AT+CIPSERVER=1,333\r\n");
    }

    #[test]
    fn test_close_on_server_issues_server_stop() {
        let mut device = device_with_script(b"CONNECT\r\n");
        assert_eq!(device.server(333), Ok(()));

        device.close(Channel::Single);
        assert_eq!(device.topology(), Topology::None);
        assert_eq!(
            device.transport_mut().written_str(),
            "AT+CIPSERVER=1,333\r\nAT+CIPSERVER=0\r\n"
        );
    }

    #[test]
    fn test_close_on_client_issues_close() {
        let mut device = device_with_script(b"CONNECT\r\n");
        assert_eq!(device.connect("192.168.1.10", 8080), Ok(()));
        assert_eq!(device.topology(), Topology::Client);

        device.close(Channel::Single);
        assert_eq!(device.topology(), Topology::None);
        assert_eq!(
            device.transport_mut().written_str(),
            "AT+CIPSTART=\"TCP\",\"192.168.1.10\",8080\r\nAT+CIPCLOSE\r\n"
        );
    }

    #[test]
    fn test_close_without_topology_issues_nothing() {
        let mut device = device_with_script(b"");
        device.close(Channel::Single);
        assert!(device.transport_mut().written().is_empty());
        assert_eq!(device.topology(), Topology::None);
    }

    #[test]
    fn test_close_resets_topology_even_on_silent_device() {
        let mut device = device_with_script(b"CONNECT\r\n");
        assert_eq!(device.connect("10.0.0.1", 80), Ok(()));
        // No reply to CIPCLOSE at all; state still returns to None.
        device.close(Channel::Single);
        assert_eq!(device.topology(), Topology::None);
    }

    #[test]
    fn test_connect_failure_leaves_topology_untouched() {
        let mut device = device_with_script(b"\r\nERROR\r\n");
        assert_eq!(
            device.connect("10.0.0.1", 80),
            Err(DriverError::Device(ResultCode::Error))
        );
        assert_eq!(device.topology(), Topology::None);
    }

    #[test]
    fn test_connect_timeout() {
        let mut device = device_with_script(b"");
        assert_eq!(device.connect("10.0.0.1", 80), Err(DriverError::Timeout));
        assert_eq!(device.topology(), Topology::None);
    }

    #[test]
    fn test_setup_records_protocol_and_mux() {
        // Two OKs: CWMODE then CIPMUX.
        let mut device = device_with_script(b"\r\nOK\r\n\r\nOK\r\n");
        assert_eq!(device.setup(Topology::Client, Protocol::Udp, Mux::Multi), Ok(()));
        assert_eq!(
            device.transport_mut().written_str(),
            "AT+CWMODE_CUR=1\r\nAT+CIPMUX=1\r\n"
        );

        // The recorded protocol flows into CIPSTART.
        device.transport_mut().script(b"CONNECT\r\n");
        assert_eq!(device.connect_on(Channel::Id(1), "10.0.0.1", 5000), Ok(()));
        assert!(device
            .transport_mut()
            .written_str()
            .ends_with("AT+CIPSTART=1,\"UDP\",\"10.0.0.1\",5000\r\n"));
    }

    #[test]
    fn test_setup_failure_does_not_corrupt_state() {
        let mut device = device_with_script(b"\r\nERROR\r\n");
        assert_eq!(
            device.setup(Topology::Client, Protocol::Udp, Mux::Multi),
            Err(DriverError::Device(ResultCode::Error))
        );
        assert_eq!(device.topology(), Topology::None);

        // Protocol selection was not recorded: a later connect still uses
        // the TCP default.
        device.transport_mut().script(b"CONNECT\r\n");
        assert_eq!(device.connect("10.0.0.1", 80), Ok(()));
        assert!(device
            .transport_mut()
            .written_str()
            .ends_with("AT+CIPSTART=\"TCP\",\"10.0.0.1\",80\r\n"));
    }

    #[test]
    fn test_multi_mux_requires_channel() {
        let mut device = device_with_script(b"\r\nOK\r\n\r\nOK\r\n");
        assert_eq!(device.setup(Topology::Client, Protocol::Tcp, Mux::Multi), Ok(()));

        assert_eq!(device.connect("10.0.0.1", 80), Err(DriverError::ChannelRequired));
        assert_eq!(device.send(b"hello"), Err(DriverError::ChannelRequired));
    }

    #[test]
    fn test_join_uses_current_command_set() {
        let mut device = device_with_script(b"\r\nOK\r\n");
        assert_eq!(device.join("lab", "secret"), Ok(()));
        assert_eq!(
            device.transport_mut().written_str(),
            "AT+CWJAP_CUR=\"lab\",\"secret\"\r\n"
        );
    }

    #[test]
    fn test_join_legacy_command_set() {
        let mut device = Esp8266::with_command_set(
            ScriptedTransport::with_script(b"\r\nOK\r\n"),
            CommandSet::Legacy,
        );
        assert_eq!(device.join("lab", "secret"), Ok(()));
        assert_eq!(device.transport_mut().written_str(), "AT+CWJAP=\"lab\",\"secret\"\r\n");
    }

    #[test]
    fn test_status_parses_digit() {
        let mut device = device_with_script(b"STATUS:3\r\n\r\nOK\r\n");
        assert_eq!(device.status(), LinkStatus::Connected);
    }

    #[test]
    fn test_status_unknown_without_report() {
        let mut device = device_with_script(b"\r\nERROR\r\n");
        assert_eq!(device.status(), LinkStatus::Unknown);
    }

    #[test]
    fn test_ip_reports_station_address() {
        let mut device = device_with_script(
            b"+CIFSR:STAIP,\"192.168.1.23\"\r\n+CIFSR:APIP,\"192.168.4.1\"\r\n\r\nOK\r\n",
        );
        assert_eq!(device.ip(WifiMode::Station), Some("192.168.1.23"));
    }

    #[test]
    fn test_ip_clears_ap_address_when_absent() {
        let mut device = device_with_script(b"+CIFSR:STAIP,\"192.168.1.23\"\r\n\r\nOK\r\n");
        assert_eq!(device.ip(WifiMode::AccessPoint), None);
    }

    #[test]
    fn test_is_connected_extracts_ssid() {
        let mut device = device_with_script(b"+CWJAP:\"lab\"\r\n\r\nOK\r\n");
        let mut ssid = [0u8; 33];
        assert!(device.is_connected(&mut ssid));
        assert_eq!(&ssid[..3], b"lab");
    }

    #[test]
    fn test_send_to_connects_then_sends() {
        let mut device = device_with_script(b"\r\nOK\r\n\r\nOK\r\n");
        assert_eq!(device.setup(Topology::Client, Protocol::Udp, Mux::Multi), Ok(()));

        // Replies appear only after the command that provokes them, so the
        // post-connect drain cannot eat the send handshake.
        let transport = device.transport_mut();
        transport.reply_on(b"AT+CIPSTART=0,\"UDP\",\"10.0.0.255\",7000\r\n", b"CONNECT\r\n");
        transport.reply_on(b"AT+CIPSEND=0,4\r\n", b"\r\nOK\r\n> ");
        transport.reply_on(b"ping", b"\r\nSEND OK\r\n");
        assert_eq!(device.send_to(Channel::Id(0), "10.0.0.255", 7000, b"ping"), Ok(()));
        assert!(device.transport_mut().written_str().contains(
            "AT+CIPSTART=0,\"UDP\",\"10.0.0.255\",7000\r\nAT+CIPSEND=0,4\r\n"
        ));
        assert!(device.transport_mut().written().ends_with(b"ping"));
    }

    #[test]
    fn test_reset_soft_waits_for_ready() {
        let mut device = device_with_script(b"AT+RST\r\n\r\nOK\r\nready\r\n");
        assert_eq!(device.reset_soft(), Ok(()));
    }

    #[test]
    fn test_begin_switches_baud_and_echo() {
        let mut transport = ScriptedTransport::new();
        // The OK belongs to ATE0; it must not be eaten by the post-baud
        // drain.
        transport.reply_on(b"ATE0\r\n", b"\r\nOK\r\n");
        let mut device = Esp8266::new(transport);
        assert_eq!(device.begin(9600), Ok(()));
        assert_eq!(
            device.transport_mut().written_str(),
            "AT+UART_CUR=9600,8,1,0,0\r\nATE0\r\n"
        );
    }
}
