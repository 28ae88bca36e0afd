//! Concurrency limiting, pacing, and retry backoff
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - A politeness pause held inside each permit
//! - Raising the pause to the robots.txt crawl delay
//! - Exponential backoff between attempts

use crate::config::CrawlerConfig;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A unit of work admitted by the scheduler
///
/// Dropping it releases the concurrency slot.
pub struct Admission {
    pacing: Duration,
    _permit: OwnedSemaphorePermit,
}

impl Admission {
    /// Sleeps the pacing delay while still holding the slot
    pub async fn pace(self) {
        if !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }
    }
}

/// Bounds the number of concurrent tasks and paces them
///
/// Cloning shares the underlying semaphore.
#[derive(Debug, Clone)]
pub struct Scheduler {
    /// Global semaphore for limiting concurrent tasks
    semaphore: Arc<Semaphore>,

    /// Pause after each task before its slot is released
    pacing: Duration,
}

impl Scheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    ///
    /// * `concurrency` - Maximum number of tasks in flight (at least 1)
    /// * `pacing` - Delay held inside each slot after the task completes
    pub fn new(concurrency: usize, pacing: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            pacing,
        }
    }

    /// A scheduler with the same slots but a different pacing delay
    pub fn with_pacing(&self, pacing: Duration) -> Self {
        Self {
            semaphore: Arc::clone(&self.semaphore),
            pacing,
        }
    }

    /// Raises pacing to at least the robots.txt crawl delay
    pub fn respecting_crawl_delay(&self, crawl_delay: Option<f64>) -> Self {
        let robots_delay = crawl_delay
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(Duration::from_secs_f64)
            .unwrap_or(Duration::ZERO);
        self.with_pacing(std::cmp::max(self.pacing, robots_delay))
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    /// Slots not currently held
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Waits for a free slot
    ///
    /// # Returns
    ///
    /// * `Some(Admission)` - A held slot
    /// * `None` - The scheduler was shut down
    pub async fn admit(&self) -> Option<Admission> {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await.ok()?;
        Some(Admission {
            pacing: self.pacing,
            _permit: permit,
        })
    }

    /// Runs `task` inside a slot, pacing before the slot is released
    pub async fn run<F, T>(&self, task: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let admission = self.admit().await?;
        let output = task.await;
        admission.pace().await;
        Some(output)
    }
}

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts in total, counting the first
    pub max_attempts: u32,
    pub base: Duration,
    pub max: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base: Duration::from_millis(config.backoff_base_ms),
            max: Duration::from_millis(config.backoff_max_ms),
        }
    }

    /// Delay before retrying after failed attempt `attempt` (1-based)
    ///
    /// `base * 2^(attempt - 1)`, capped at `max`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base
            .checked_mul(1u32 << exponent)
            .map_or(self.max, |d| d.min(self.max))
    }

    /// Whether another attempt follows failed attempt `attempt`
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}
