// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::time::Duration;

use crate::{Error, Result};

/// Minimum size of every part but the last one accepted by BOS.
pub const DEFAULT_MIN_PART_SIZE: u64 = 5 * 1024 * 1024;
/// Default size of each part.
pub const DEFAULT_PART_SIZE: u64 = 8 * 1024 * 1024;
/// Maximum number of parts of one upload.
pub const MAX_PART_COUNT: usize = 10000;

/// Retry policy of a single request.
///
/// The delay before attempt `n + 1` is `initial_delay * factor^(n - 1)`,
/// capped at `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Attempts in total, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Growth of the delay between retries.
    pub factor: u32,
    /// Upper bound of a single delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            factor: 2,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Set the number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the delay before the first retry.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the growth factor.
    pub fn with_factor(mut self, factor: u32) -> Self {
        self.factor = factor;
        self
    }

    /// Set the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay to wait after `attempt` (1-based) failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1);
        let multiplier = self.factor.checked_pow(exp).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Config of multipart uploads.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadConfig {
    /// Size of each part except the last one.
    pub part_size: u64,
    /// Parts smaller than this are only allowed as the last part.
    pub min_part_size: u64,
    /// Parts uploaded at the same time.
    pub concurrency: usize,
    /// Timeout of every single request.
    pub timeout: Duration,
    /// Compare the returned eTag of each part with its local MD5.
    pub verify_etag: bool,
    /// Retry policy of each request.
    pub retry: RetryConfig,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            min_part_size: DEFAULT_MIN_PART_SIZE,
            concurrency: 3,
            timeout: Duration::from_secs(60),
            verify_etag: true,
            retry: RetryConfig::default(),
        }
    }
}

impl UploadConfig {
    /// Set part size.
    pub fn with_part_size(mut self, part_size: u64) -> Self {
        self.part_size = part_size;
        self
    }

    /// Set min part size.
    pub fn with_min_part_size(mut self, min_part_size: u64) -> Self {
        self.min_part_size = min_part_size;
        self
    }

    /// Set concurrency.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable eTag verification.
    pub fn with_verify_etag(mut self, verify_etag: bool) -> Self {
        self.verify_etag = verify_etag;
        self
    }

    /// Set retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Check the config before any request is sent.
    pub fn validate(&self) -> Result<()> {
        if self.part_size == 0 {
            return Err(Error::config_invalid("part size must be positive"));
        }
        if self.part_size < self.min_part_size {
            return Err(Error::config_invalid("part size must not be less than min part size")
                .with_context("part_size", self.part_size.to_string())
                .with_context("min_part_size", self.min_part_size.to_string()));
        }
        if self.concurrency == 0 {
            return Err(Error::config_invalid("concurrency must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(Error::config_invalid("timeout must be positive"));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::config_invalid("retry max attempts must be at least 1"));
        }
        Ok(())
    }
}
