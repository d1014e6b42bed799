//! Observability and Metrics
//!
//! Counters for frames, bytes and failures seen by the stream transport.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

use crate::error::{ErrorKind, ProtocolError};

/// Global metrics collector for protocol operations
#[derive(Debug)]
pub struct Metrics {
    /// Total connections opened through `PacketIo::connect`
    pub connections_total: AtomicU64,
    /// Connections not yet closed
    pub connections_active: AtomicU64,
    /// Total frames sent
    pub frames_sent: AtomicU64,
    /// Total frames received
    pub frames_received: AtomicU64,
    /// Total bytes sent, length prefixes included
    pub bytes_sent: AtomicU64,
    /// Total bytes received, length prefixes included
    pub bytes_received: AtomicU64,
    /// Frames sent with a zlib body
    pub frames_compressed: AtomicU64,
    /// Raw (unframed) writes
    pub raw_writes: AtomicU64,
    /// Connection errors
    pub connection_errors: AtomicU64,
    /// Protocol errors (validation, format, resolution)
    pub protocol_errors: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            connections_total: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            frames_compressed: AtomicU64::new(0),
            raw_writes: AtomicU64::new(0),
            connection_errors: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a new connection
    pub fn connection_established(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection closed
    pub fn connection_closed(&self) {
        // Saturate so a close without a matching connect cannot wrap.
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Record a frame sent
    pub fn frame_sent(&self, byte_count: u64, compressed: bool) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
        if compressed {
            self.frames_compressed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a frame received
    pub fn frame_received(&self, byte_count: u64) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record bytes written outside the framing layer
    pub fn raw_write(&self, byte_count: u64) {
        self.raw_writes.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a connection error
    pub fn connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a protocol error
    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an error under the matching counter.
    pub fn record_error(&self, error: &ProtocolError) {
        match error.kind() {
            ErrorKind::Connection | ErrorKind::Io => self.connection_error(),
            ErrorKind::Validation | ErrorKind::Format | ErrorKind::Resolution => {
                self.protocol_error()
            }
            ErrorKind::Config => {}
        }
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_compressed: self.frames_compressed.load(Ordering::Relaxed),
            raw_writes: self.raw_writes.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            connections_total = snapshot.connections_total,
            connections_active = snapshot.connections_active,
            frames_sent = snapshot.frames_sent,
            frames_received = snapshot.frames_received,
            bytes_sent = snapshot.bytes_sent,
            bytes_received = snapshot.bytes_received,
            frames_compressed = snapshot.frames_compressed,
            raw_writes = snapshot.raw_writes,
            connection_errors = snapshot.connection_errors,
            protocol_errors = snapshot.protocol_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "Protocol metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub connections_total: u64,
    pub connections_active: u64,
    pub frames_sent: u64,
    pub frames_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub frames_compressed: u64,
    pub raw_writes: u64,
    pub connection_errors: u64,
    pub protocol_errors: u64,
    pub uptime_seconds: u64,
}

/// Global metrics instance (lazy static for simplicity)
static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

/// Get the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    &METRICS
}

/// Initialize metrics collection (call once at startup)
pub fn init_metrics() {
    let _ = global_metrics();
    info!("Metrics collection initialized");
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_us = duration.as_micros() as u64,
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReadPhase;

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.connection_established();
        metrics.frame_sent(10, false);
        metrics.frame_sent(40, true);
        metrics.frame_received(7);
        metrics.raw_write(3);
        metrics.connection_closed();
        metrics.connection_closed();

        let snap = metrics.snapshot();
        assert_eq!(snap.connections_total, 1);
        assert_eq!(snap.connections_active, 0);
        assert_eq!(snap.frames_sent, 2);
        assert_eq!(snap.frames_compressed, 1);
        assert_eq!(snap.bytes_sent, 53);
        assert_eq!(snap.bytes_received, 7);
    }

    #[test]
    fn test_record_error_classifies() {
        let metrics = Metrics::new();
        metrics.record_error(&ProtocolError::LengthPrefixTooLong);
        metrics.record_error(&ProtocolError::ConnectionClosed {
            phase: ReadPhase::Body,
            expected: 4,
            received: 1,
        });
        metrics.record_error(&ProtocolError::ConfigError("x".into()));

        let snap = metrics.snapshot();
        assert_eq!(snap.protocol_errors, 1);
        assert_eq!(snap.connection_errors, 1);
    }
}
