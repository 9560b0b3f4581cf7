//! In-process mock device peer for integration tests.
//!
//! Implements the device side of the wire contract: accept one connection,
//! read 24-byte request headers, consume/produce payload bytes when data
//! transfer is enabled, and answer each request with an 8-byte completion
//! carrying a fixed simulated processing time.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixListener;
use tokio::task::JoinHandle;

pub const DIR_READ: u32 = 0;
pub const DIR_WRITE: u32 = 1;

/// One request header as observed by the device.
#[derive(Debug, Clone, Copy)]
pub struct SeenRequest {
    pub direction: u32,
    pub address: u64,
    pub size: u32,
    pub issue_timestamp: u64,
}

pub struct MockDevice {
    pub seen: Arc<Mutex<Vec<SeenRequest>>>,
    handle: JoinHandle<()>,
}

impl MockDevice {
    /// Bind the socket and serve a single connection until the client hangs
    /// up. Every request is answered with `processing_us` as its completion.
    pub fn spawn(path: &Path, transfer_data: bool, processing_us: u64) -> Self {
        let listener = UnixListener::bind(path).expect("bind mock device socket");
        let seen = Arc::new(Mutex::new(Vec::new()));

        let handle = tokio::spawn({
            let seen = seen.clone();
            async move {
                let (mut stream, _) = listener.accept().await.expect("accept client");
                let mut payload = Vec::new();

                loop {
                    let mut header = [0u8; 24];
                    if stream.read_exact(&mut header).await.is_err() {
                        // Client closed the connection; a clean end of run.
                        break;
                    }

                    let request = SeenRequest {
                        direction: u32::from_le_bytes(header[0..4].try_into().unwrap()),
                        address: u64::from_le_bytes(header[4..12].try_into().unwrap()),
                        size: u32::from_le_bytes(header[12..16].try_into().unwrap()),
                        issue_timestamp: u64::from_le_bytes(header[16..24].try_into().unwrap()),
                    };
                    assert!(request.size > 0, "device received a zero-size request");
                    seen.lock().push(request);

                    if transfer_data {
                        let size = request.size as usize;
                        if payload.len() < size {
                            payload.resize(size, 0);
                        }
                        match request.direction {
                            DIR_WRITE => stream
                                .read_exact(&mut payload[..size])
                                .await
                                .expect("read write payload"),
                            DIR_READ => {
                                stream
                                    .write_all(&payload[..size])
                                    .await
                                    .expect("send read payload");
                                size
                            }
                            other => panic!("device received unknown direction {other}"),
                        };
                    }

                    stream
                        .write_all(&processing_us.to_le_bytes())
                        .await
                        .expect("send completion");
                }
            }
        });

        Self { seen, handle }
    }

    pub fn request_count(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn shutdown(self) {
        self.handle.abort();
    }
}
