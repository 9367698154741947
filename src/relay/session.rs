//! Relay session accounting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::info;
use uuid::Uuid;

use super::pump::Direction;

/// Accounting record for one relay between a client and its target.
#[derive(Debug)]
pub struct RelaySession {
    pub id: String,
    pub target: String,
    start_time: Instant,
    bytes_up: AtomicU64,
    bytes_down: AtomicU64,
}

impl RelaySession {
    pub fn new(target: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            target,
            start_time: Instant::now(),
            bytes_up: AtomicU64::new(0),
            bytes_down: AtomicU64::new(0),
        }
    }

    /// Record the byte count of a finished copy direction.
    pub fn record(&self, direction: Direction, bytes: u64) {
        match direction {
            Direction::ClientToTarget => self.bytes_up.store(bytes, Ordering::Relaxed),
            Direction::TargetToClient => self.bytes_down.store(bytes, Ordering::Relaxed),
        }
    }

    pub fn bytes_up(&self) -> u64 {
        self.bytes_up.load(Ordering::Relaxed)
    }

    pub fn bytes_down(&self) -> u64 {
        self.bytes_down.load(Ordering::Relaxed)
    }

    pub fn duration(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Emit the completion record for this session.
    pub fn log_stats(&self) {
        info!(
            session_id = %self.id,
            target = %self.target,
            duration_ms = self.duration().as_millis() as u64,
            bytes_up = self.bytes_up(),
            bytes_down = self.bytes_down(),
            "relay session finished"
        );
    }
}
