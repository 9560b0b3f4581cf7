//! Asynchronous submission pipeline.
//!
//! Decouples rate-paced request emission from request execution. Producers
//! enqueue [`RequestDescriptor`]s without ever blocking; one dedicated worker
//! task owns the device link and executes exchanges strictly in FIFO order,
//! recording each completion in the activity log.
//!
//! There is deliberately no backpressure: the queue is unbounded, so when the
//! device cannot keep up with the offered intensity the backlog grows for the
//! remainder of the round. That is an inherited property of the measurement
//! design, surfaced with a one-shot high-water-mark warning rather than fixed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::protocol::{DeviceLink, Direction, RequestHeader};
use crate::session::Session;

/// One request to be executed by the pipeline.
///
/// Created by the generator at emission time, consumed exactly once by the
/// worker, never mutated in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub direction: Direction,
    /// Page-aligned logical byte offset.
    pub address: u64,
    /// Request length in bytes, always positive.
    pub size: u32,
    /// Microseconds since harness start at emission.
    pub issue_timestamp: u64,
}

impl RequestDescriptor {
    /// The wire header for this request.
    pub fn to_header(self) -> RequestHeader {
        RequestHeader {
            direction: self.direction,
            address: self.address,
            size: self.size,
            issue_timestamp: self.issue_timestamp,
        }
    }
}

/// Unbounded FIFO queue with a blocking receive side.
///
/// The consumer sleeps while the queue is empty and is woken exactly when
/// work arrives; `enqueue` never blocks the caller and never rejects.
#[derive(Debug)]
pub struct SubmissionQueue {
    inner: Mutex<VecDeque<RequestDescriptor>>,
    available: Notify,
    high_water: usize,
    high_water_warned: AtomicBool,
}

impl SubmissionQueue {
    pub fn new(high_water: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            available: Notify::new(),
            high_water,
            high_water_warned: AtomicBool::new(false),
        }
    }

    /// Append a descriptor and wake the worker.
    pub fn enqueue(&self, descriptor: RequestDescriptor) {
        let depth = {
            let mut queue = self.inner.lock();
            queue.push_back(descriptor);
            queue.len()
        };
        if depth >= self.high_water && !self.high_water_warned.swap(true, Ordering::Relaxed) {
            warn!(
                depth,
                "submission backlog crossed the high-water mark; the device is not keeping up \
                 with the offered intensity"
            );
        }
        self.available.notify_one();
    }

    /// Block until a descriptor is available and pop it.
    pub async fn recv(&self) -> RequestDescriptor {
        loop {
            if let Some(descriptor) = self.inner.lock().pop_front() {
                return descriptor;
            }
            // notify_one stores a permit, so a push racing with this wait
            // completes the next notified() immediately.
            self.available.notified().await;
        }
    }

    /// Current backlog depth.
    pub fn depth(&self) -> usize {
        self.inner.lock().len()
    }

    /// Lock the underlying queue. Exposed so the round reset can hold the
    /// queue and the log locks jointly; see [`Session::reset_round`].
    pub(crate) fn lock(&self) -> MutexGuard<'_, VecDeque<RequestDescriptor>> {
        self.inner.lock()
    }

    /// Re-arm the high-water warning after a reset.
    pub(crate) fn rearm_high_water(&self) {
        self.high_water_warned.store(false, Ordering::Relaxed);
    }
}

/// The single consumer of the submission queue.
///
/// Owns the only live connection to the device peer, so all execution is
/// serialized by construction: requests hit the device in enqueue order and
/// completions are logged in that same order.
pub struct PipelineWorker {
    session: Session,
    link: DeviceLink,
}

impl PipelineWorker {
    pub fn new(session: Session, link: DeviceLink) -> Self {
        Self { session, link }
    }

    /// Run until cancelled.
    ///
    /// Any protocol fault propagates out as a fatal error — the stream has no
    /// resynchronization marker, so a malformed exchange cannot be retried or
    /// skipped without losing byte alignment with the peer.
    pub async fn run(mut self) -> Result<()> {
        debug!("pipeline worker started");
        loop {
            let descriptor = tokio::select! {
                descriptor = self.session.queue.recv() => descriptor,
                _ = self.session.cancel.cancelled() => {
                    debug!("pipeline worker stopping on cancellation");
                    return Ok(());
                }
            };

            self.link
                .issue(&descriptor.to_header())
                .await
                .context("pipeline exchange failed")?;

            let finish_us = self.session.clock.now_us();
            self.session
                .log
                .lock()
                .push(descriptor.issue_timestamp, finish_us, descriptor.size);
        }
    }
}
