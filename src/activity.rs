//! Bounded, completion-ordered record of finished I/O.
//!
//! The pipeline worker appends one entry per completed request; the generator
//! queries "bytes transferred in window [t0, t1)" while a round is running.
//! Entries arrive in completion order, which with a single-consumer pipeline
//! is also issue order, so a backward scan can stop at the first entry that
//! finished at or before the window start.

/// One completed request.
///
/// Timestamps are microseconds since harness start and are non-decreasing in
/// arrival order. Entries are never mutated; they leave the log only through
/// capacity eviction (oldest first) or a round reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogEntry {
    pub start_us: u64,
    pub finish_us: u64,
    pub bytes: u32,
}

/// Fixed-capacity activity log.
///
/// Holds at most `capacity` entries at all times. Not internally synchronized;
/// shared users wrap it in a mutex (see [`crate::session::Session`]). The
/// capacity bound also bounds the query scan, so holding that lock across a
/// query stays cheap.
#[derive(Debug)]
pub struct ActivityLog {
    entries: std::collections::VecDeque<LogEntry>,
    capacity: usize,
}

impl ActivityLog {
    /// Create an empty log holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: std::collections::VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a completed request, evicting the single oldest entry if the
    /// log would exceed its capacity.
    pub fn push(&mut self, start_us: u64, finish_us: u64, bytes: u32) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            start_us,
            finish_us,
            bytes,
        });
    }

    /// Throughput over the window `(begin_us, end_us]` in kilobytes/second.
    ///
    /// Scans newest-to-oldest and stops at the first entry with
    /// `finish_us <= begin_us`; completion ordering makes that a valid early
    /// exit. The caller must ensure `end_us > begin_us` — a zero-width window
    /// is a divide-by-zero and is the caller's bug to prevent.
    pub fn query_throughput(&self, begin_us: u64, end_us: u64) -> f64 {
        debug_assert!(end_us > begin_us);
        let mut bytes: u64 = 0;
        for entry in self.entries.iter().rev() {
            if entry.finish_us <= begin_us {
                break;
            }
            if entry.finish_us <= end_us {
                bytes += u64::from(entry.bytes);
            }
        }
        (bytes as f64 / 1024.0) * 1_000_000.0 / (end_us - begin_us) as f64
    }

    /// Drop every entry; used between rounds.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in arrival order, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_entry_window_query_matches_formula() {
        let mut log = ActivityLog::new(16);
        let ts = 1_000_000;
        log.push(ts - 300, ts, 4096);

        // (4096 / 1024) KB * 1e6 / 2 us window.
        let kbps = log.query_throughput(ts - 1, ts + 1);
        assert_eq!(kbps, 2_000_000.0);
    }

    #[test]
    fn window_preceding_all_completions_is_zero() {
        let mut log = ActivityLog::new(16);
        log.push(5_000, 6_000, 4096);
        log.push(6_000, 7_000, 4096);

        assert_eq!(log.query_throughput(1_000, 4_000), 0.0);
    }

    #[test]
    fn query_excludes_entries_finished_at_or_before_window_start() {
        let mut log = ActivityLog::new(16);
        log.push(0, 100, 1024);
        log.push(100, 200, 2048);
        log.push(200, 300, 4096);

        // Only the entry finishing at 300 lies in (200, 400].
        let kbps = log.query_throughput(200, 400);
        assert_eq!(kbps, (4096.0 / 1024.0) * 1_000_000.0 / 200.0);
    }

    #[test]
    fn query_excludes_entries_finishing_after_window_end() {
        let mut log = ActivityLog::new(16);
        log.push(0, 100, 1024);
        log.push(100, 250, 2048);

        let kbps = log.query_throughput(0, 200);
        assert_eq!(kbps, (1024.0 / 1024.0) * 1_000_000.0 / 200.0);
    }

    #[test]
    fn capacity_overflow_evicts_oldest_entry() {
        let capacity = 8;
        let mut log = ActivityLog::new(capacity);
        for i in 0..=capacity as u64 {
            log.push(i, i + 1, i as u32);
        }

        assert_eq!(log.len(), capacity);
        let retained: Vec<u32> = log.entries().map(|e| e.bytes).collect();
        // The very first push (bytes=0) is gone; the rest remain in order.
        assert_eq!(retained, (1..=capacity as u32).collect::<Vec<_>>());
    }

    #[test]
    fn reset_clears_everything() {
        let mut log = ActivityLog::new(4);
        log.push(0, 1, 100);
        log.push(1, 2, 100);
        log.reset();

        assert!(log.is_empty());
        assert_eq!(log.query_throughput(0, 10), 0.0);
    }
}
