//! The sync loop
//!
//! Runs sync attempts back to back with a fixed wait in between, counting
//! consecutive failures. The loop only ends by returning: after the first
//! attempt in one-time mode, or with [`LoopError::ErrorLimitExceeded`] once
//! the failure count goes over the limit.

use std::time::Duration;

use super::SyncOperation;
use crate::error::LoopError;

/// Consecutive failures tolerated before giving up.
pub const ERROR_LIMIT: u32 = 5;

/// Default pause between attempts.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(300);

/// When and how often the loop runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub wait: Duration,
    pub one_time: bool,
    pub error_limit: u32,
}

/// Consecutive failure count. Reset by any success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureCounter {
    count: u32,
}

impl FailureCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_failure(&mut self) -> u32 {
        self.count += 1;
        self.count
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn exceeds(&self, limit: u32) -> bool {
        self.count > limit
    }
}

pub struct SyncLoop {
    schedule: Schedule,
    failures: FailureCounter,
}

impl SyncLoop {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            failures: FailureCounter::new(),
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures.count()
    }

    /// One attempt plus bookkeeping. Errors only when the limit is exceeded.
    pub async fn run_iteration<S>(&mut self, operation: &S) -> Result<(), LoopError>
    where
        S: SyncOperation + ?Sized,
    {
        match operation.sync_once().await {
            Ok(report) => {
                tracing::debug!(
                    cloned = report.cloned,
                    rev = %report.rev,
                    permissions = report.permissions_applied,
                    notified = report.notified,
                    "sync completed"
                );
                self.failures.reset();
            }
            Err(err) => {
                let count = self.failures.record_failure();
                tracing::error!(
                    step = %err.step(),
                    failures = count,
                    "error syncing repo: {}",
                    err
                );
            }
        }

        if self.failures.exceeds(self.schedule.error_limit) {
            tracing::error!("error limit of {} exceeded", self.schedule.error_limit);
            return Err(LoopError::ErrorLimitExceeded {
                limit: self.schedule.error_limit,
            });
        }
        Ok(())
    }

    /// Run until one-time completion or the error limit.
    pub async fn run<S>(&mut self, operation: &S) -> Result<(), LoopError>
    where
        S: SyncOperation + ?Sized,
    {
        loop {
            self.run_iteration(operation).await?;

            if self.schedule.one_time {
                return Ok(());
            }

            tracing::debug!("wait {} seconds", self.schedule.wait.as_secs());
            tokio::time::sleep(self.schedule.wait).await;
            tracing::debug!("done");
        }
    }
}
