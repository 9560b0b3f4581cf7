//! Wire protocol between the harness and the device peer.
//!
//! One exchange consists of a fixed 24-byte request header, an optional
//! payload, and an 8-byte completion response. All integers are little-endian.
//!
//! Request header layout (field order significant):
//!
//! | field           | width   | meaning                                   |
//! |-----------------|---------|-------------------------------------------|
//! | direction       | 32 bits | 0 = read, 1 = write                       |
//! | address         | 64 bits | page-aligned logical byte offset          |
//! | size            | 32 bits | request length in bytes, > 0              |
//! | issue_timestamp | 64 bits | microseconds since harness start          |
//!
//! When the deployment transfers real data, `size` payload bytes follow the
//! header on the request side for writes and precede the completion on the
//! response side for reads. The completion response is always exactly 8 bytes:
//! a u64 count of microseconds the device *simulated* spending on the request,
//! not wall-clock transport time.
//!
//! The stream has no resynchronization marker. Any short read/write, length
//! mismatch, or validation failure leaves the byte stream in an unknown state,
//! so every fault here is terminal for the whole session.

use std::path::Path;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::{debug, info};

use crate::config::HarnessConfig;

/// Exact size of the encoded request header.
pub const REQUEST_HEADER_LEN: usize = 24;

/// Exact size of the completion response.
pub const COMPLETION_LEN: usize = 8;

/// Transfer direction of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Read = 0,
    Write = 1,
}

impl Direction {
    fn from_wire(code: u32) -> Result<Self, ProtocolError> {
        match code {
            0 => Ok(Direction::Read),
            1 => Ok(Direction::Write),
            other => Err(ProtocolError::BadDirection(other)),
        }
    }
}

/// Unrecoverable protocol faults.
///
/// There is no per-request retry: a malformed exchange cannot be skipped
/// without losing byte alignment with the peer, so callers must treat any of
/// these as fatal for the session.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("address {address:#x} is not aligned to the {page_size}-byte page size")]
    MisalignedAddress { address: u64, page_size: u64 },

    #[error("request size must be positive")]
    ZeroSize,

    #[error("payload of {size} bytes exceeds the {max} byte transport ceiling")]
    PayloadTooLarge { size: u32, max: u32 },

    #[error("unknown direction code {0} in request header")]
    BadDirection(u32),

    #[error("device stream failed during {stage}")]
    Stream {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// The fixed-layout request header.
///
/// Created by the load generator at emission time and never mutated
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub direction: Direction,
    /// Page-aligned logical byte offset.
    pub address: u64,
    /// Request length in bytes, always positive.
    pub size: u32,
    /// Microseconds since harness start at the moment of emission.
    pub issue_timestamp: u64,
}

impl RequestHeader {
    /// Encode into the exact 24-byte wire representation.
    pub fn encode(&self) -> [u8; REQUEST_HEADER_LEN] {
        let mut buf = [0u8; REQUEST_HEADER_LEN];
        buf[0..4].copy_from_slice(&(self.direction as u32).to_le_bytes());
        buf[4..12].copy_from_slice(&self.address.to_le_bytes());
        buf[12..16].copy_from_slice(&self.size.to_le_bytes());
        buf[16..24].copy_from_slice(&self.issue_timestamp.to_le_bytes());
        buf
    }

    /// Decode a 24-byte wire representation.
    pub fn decode(buf: &[u8; REQUEST_HEADER_LEN]) -> Result<Self, ProtocolError> {
        let direction = u32::from_le_bytes(buf[0..4].try_into().expect("slice of fixed width"));
        Ok(Self {
            direction: Direction::from_wire(direction)?,
            address: u64::from_le_bytes(buf[4..12].try_into().expect("slice of fixed width")),
            size: u32::from_le_bytes(buf[12..16].try_into().expect("slice of fixed width")),
            issue_timestamp: u64::from_le_bytes(
                buf[16..24].try_into().expect("slice of fixed width"),
            ),
        })
    }

    /// Validate address alignment and size before anything hits the wire.
    pub fn validate(&self, page_size: u64) -> Result<(), ProtocolError> {
        if self.size == 0 {
            return Err(ProtocolError::ZeroSize);
        }
        if self.address % page_size != 0 {
            return Err(ProtocolError::MisalignedAddress {
                address: self.address,
                page_size,
            });
        }
        Ok(())
    }
}

/// The single live connection to the device peer.
///
/// The harness is the client; exactly one connection is expected and
/// sufficient, and whoever owns the link serializes all exchanges on it.
pub struct DeviceLink {
    stream: UnixStream,
    page_size: u64,
    /// Deployment-wide payload toggle: when set, writes carry `size` data
    /// bytes and reads receive `size` data bytes before the completion.
    transfer_data: bool,
    max_payload: u32,
    /// Reused for both outgoing write payloads and incoming read payloads.
    payload_buf: Vec<u8>,
}

impl DeviceLink {
    /// Connect to the device peer's listening socket.
    ///
    /// Connection failure is fatal at startup; there is nothing to retry
    /// against a peer that is not there.
    pub async fn connect(path: &Path, config: &HarnessConfig) -> std::io::Result<Self> {
        let stream = UnixStream::connect(path).await?;
        info!("connected to device peer at `{}`", path.display());
        Ok(Self {
            stream,
            page_size: config.page_size,
            transfer_data: config.transfer_data,
            max_payload: config.max_payload,
            payload_buf: Vec::new(),
        })
    }

    /// Execute one full request/response exchange.
    ///
    /// Writes exactly `24 + (payload? size : 0)` bytes, then reads exactly
    /// `(payload-on-read? size : 0) + 8` bytes. Returns the device-reported
    /// processing time in microseconds.
    pub async fn issue(&mut self, header: &RequestHeader) -> Result<u64, ProtocolError> {
        header.validate(self.page_size)?;
        if self.transfer_data && header.size > self.max_payload {
            return Err(ProtocolError::PayloadTooLarge {
                size: header.size,
                max: self.max_payload,
            });
        }

        self.stream
            .write_all(&header.encode())
            .await
            .map_err(|source| ProtocolError::Stream {
                stage: "request header send",
                source,
            })?;

        if self.transfer_data {
            let size = header.size as usize;
            if self.payload_buf.len() < size {
                self.payload_buf.resize(size, 0);
            }
            match header.direction {
                Direction::Write => {
                    self.stream
                        .write_all(&self.payload_buf[..size])
                        .await
                        .map_err(|source| ProtocolError::Stream {
                            stage: "write payload send",
                            source,
                        })?;
                }
                Direction::Read => {
                    self.stream
                        .read_exact(&mut self.payload_buf[..size])
                        .await
                        .map_err(|source| ProtocolError::Stream {
                            stage: "read payload recv",
                            source,
                        })?;
                }
            }
        }

        let mut completion = [0u8; COMPLETION_LEN];
        self.stream
            .read_exact(&mut completion)
            .await
            .map_err(|source| ProtocolError::Stream {
                stage: "completion recv",
                source,
            })?;

        let time_used_us = u64::from_le_bytes(completion);
        debug!(
            address = header.address,
            size = header.size,
            time_used_us,
            "exchange complete"
        );
        Ok(time_used_us)
    }
}
