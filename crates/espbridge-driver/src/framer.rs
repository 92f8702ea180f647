//! Data-channel framing: inbound `+IPD` frames and the outbound send
//! handshake.
//!
//! Inbound deliveries are announced by a `+IPD,[<channel>,]<len>:` header
//! followed immediately by `<len>` raw payload bytes. Outbound sends are a
//! four-step handshake: announce the length with `AT+CIPSEND`, wait for the
//! `> ` prompt, write the payload, wait for `SEND OK`.

use espbridge_protocol::constants::{
    DEFAULT_TIMEOUT_MS, FRAME_LENGTH_DELIMITER, FRAME_MARKER, SEND_PROMPT,
};
use espbridge_protocol::{Channel, Command, CommandSet, ResultCode};
use log::trace;

use crate::error::{DriverError, DriverResult};
use crate::link::Link;
use crate::transport::Transport;

impl<T: Transport> Link<T> {
    /// Wait for an inbound frame header and return its advertised payload
    /// length.
    ///
    /// Scans for the frame marker plus the channel digit when one is
    /// specified (`+IPD,2,` versus `+IPD,`), then accumulates the decimal
    /// length up to the `:` delimiter. With `timeout_ms` of `None` the
    /// scan blocks until a header appears. No bound is placed on the
    /// advertised length; the device is trusted to report frames it can
    /// actually deliver.
    pub fn listen(&mut self, channel: Channel, timeout_ms: Option<u32>) -> DriverResult<usize> {
        let mut header = String::from(FRAME_MARKER);
        if let Some(digit) = channel.digit() {
            header.push(digit);
            header.push(',');
        }

        let start = self.now();
        loop {
            if self.available() > 0 && self.scan(&header, DEFAULT_TIMEOUT_MS) {
                // The device is mid-header: the length digits and the
                // delimiter follow unconditionally.
                let mut length = 0usize;
                loop {
                    let byte = loop {
                        if let Some(byte) = self.try_read() {
                            break byte;
                        }
                    };
                    if byte == FRAME_LENGTH_DELIMITER {
                        break;
                    }
                    if byte.is_ascii_digit() {
                        length = length * 10 + usize::from(byte - b'0');
                    }
                }
                trace!("inbound frame on {:?}: {} bytes", channel, length);
                return Ok(length);
            }
            if let Some(timeout) = timeout_ms {
                if self.now().wrapping_sub(start) >= timeout {
                    return Err(DriverError::Timeout);
                }
            }
        }
    }

    /// Receive one inbound frame into `buf`.
    ///
    /// Waits for the frame header, then reads the advertised number of
    /// payload bytes, with `timeout_ms` bounding the whole read rather
    /// than each byte. Returns the count of bytes actually stored; bytes
    /// beyond `buf`'s capacity are consumed and dropped.
    pub fn receive(
        &mut self,
        channel: Channel,
        buf: &mut [u8],
        timeout_ms: Option<u32>,
    ) -> DriverResult<usize> {
        let advertised = self.listen(channel, timeout_ms)?;

        let start = self.now();
        let mut stored = 0;
        let mut remaining = advertised;
        while remaining > 0 {
            if let Some(byte) = self.try_read() {
                if stored < buf.len() {
                    buf[stored] = byte;
                    stored += 1;
                }
                remaining -= 1;
            }
            if let Some(timeout) = timeout_ms {
                if self.now().wrapping_sub(start) >= timeout {
                    break;
                }
            }
        }
        if remaining > 0 {
            trace!("receive stopped {} bytes short of the advertised length", remaining);
        }
        Ok(stored)
    }

    /// Run the outbound send handshake for `payload`.
    ///
    /// Only the `SEND OK` acknowledgement maps to success; every other
    /// outcome of the final wait, timeout included, collapses into
    /// [`DriverError::SendFailed`].
    pub fn send_payload(
        &mut self,
        channel: Channel,
        payload: &[u8],
        set: CommandSet,
    ) -> DriverResult<()> {
        if payload.is_empty() {
            return Err(DriverError::EmptyPayload);
        }

        self.send_line(&Command::Send { channel, length: payload.len() }.encode(set));
        match self.await_response(DEFAULT_TIMEOUT_MS) {
            ResultCode::Ok => {}
            ResultCode::Timeout => return Err(DriverError::Timeout),
            other => return Err(DriverError::Device(other)),
        }

        if !self.scan(SEND_PROMPT, DEFAULT_TIMEOUT_MS) {
            return Err(DriverError::Timeout);
        }
        self.write_raw(payload);

        match self.await_response(DEFAULT_TIMEOUT_MS) {
            ResultCode::SendOk => Ok(()),
            other => Err(DriverError::SendFailed(other)),
        }
    }
}
