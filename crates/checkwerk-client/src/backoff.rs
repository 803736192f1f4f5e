// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded exponential backoff with jitter for progress polling.
//
// The platform may hint how long to wait (`retryAfter`).  A hint can stretch
// a delay but never past the configured cap.

use std::time::Duration;

use checkwerk_core::config::PollConfig;
use tracing::trace;

/// Delay schedule for successive polls of one operation.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: PollConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: &PollConfig) -> Self {
        Self {
            config: config.clone(),
            attempt: 0,
        }
    }

    /// Number of delays handed out so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay before the next poll, honouring an optional server hint.
    pub fn next_delay(&mut self, hint: Option<Duration>) -> Duration {
        let computed = compute_delay(self.attempt, &self.config);
        self.attempt = self.attempt.saturating_add(1);

        let delay = match hint {
            Some(hint) => computed.max(hint),
            None => computed,
        }
        .min(self.config.max_interval());

        trace!(attempt = self.attempt, delay_ms = delay.as_millis(), "next poll delay");
        delay
    }
}

/// Compute exponential backoff delay with jitter.
///
/// delay = min(initial * multiplier^attempt + jitter, max_interval)
/// jitter is a value in [0, initial / 4).
pub fn compute_delay(attempt: u32, config: &PollConfig) -> Duration {
    let base_ms = config.initial_interval_ms;
    let factor = u64::from(config.multiplier.max(1)).saturating_pow(attempt.min(16));
    let exp_ms = base_ms.saturating_mul(factor);

    let total_ms = exp_ms.saturating_add(jitter(base_ms, attempt));
    let capped_ms = total_ms.min(config.max_interval_ms);

    Duration::from_millis(capped_ms)
}

/// Deterministic jitter spread by a hash of the attempt number.
fn jitter(base_ms: u64, attempt: u32) -> u64 {
    let hash = u64::from(attempt).wrapping_mul(6364136223846793005);
    hash % (base_ms / 4).max(1)
}
