//! Paced batch dispatch for CRM updates.

use std::time::Duration;

use crate::algo::payload::PropertyUpdate;
use crate::crm::{CrmWriter, ObjectKind};
use crate::error::{Error, Result};

/// Per-call item cap the CRM accepts for company and contact updates.
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// Pause between consecutive batch calls.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

/// Splits updates into fixed-size batches and pauses between calls.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    batch_size: usize,
    cooldown: Duration,
}

/// What a dispatch run did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DispatchReport {
    pub batches: usize,
    pub items: usize,
    pub sleeps: usize,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

impl RateLimiter {
    pub fn new(batch_size: usize, cooldown: Duration) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidInput("batch size must be at least 1".into()));
        }
        Ok(Self { batch_size, cooldown })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Dispatch with a real `thread::sleep` between batches.
    pub fn dispatch<W: CrmWriter + ?Sized>(
        &self,
        writer: &mut W,
        kind: ObjectKind,
        updates: &[PropertyUpdate],
    ) -> Result<DispatchReport> {
        self.dispatch_with(writer, kind, updates, std::thread::sleep)
    }

    /// Dispatch using `sleep` for the pause. The first failing batch stops
    /// the run and its error is returned; nothing is retried.
    pub fn dispatch_with<W, F>(
        &self,
        writer: &mut W,
        kind: ObjectKind,
        updates: &[PropertyUpdate],
        mut sleep: F,
    ) -> Result<DispatchReport>
    where
        W: CrmWriter + ?Sized,
        F: FnMut(Duration),
    {
        let mut report = DispatchReport::default();
        let total = updates.len().div_ceil(self.batch_size);
        for (i, chunk) in updates.chunks(self.batch_size).enumerate() {
            if i > 0 {
                tracing::debug!(cooldown = ?self.cooldown, "rate limiting before next batch");
                sleep(self.cooldown);
                report.sleeps += 1;
            }
            let start = i * self.batch_size;
            writer.write_property_batch(kind, chunk)?;
            report.batches += 1;
            report.items += chunk.len();
            tracing::info!(
                kind = kind.api_path(),
                batch = i + 1,
                of = total,
                from = start,
                to = start + chunk.len(),
                "updated batch"
            );
        }
        Ok(report)
    }
}
