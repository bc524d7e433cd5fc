//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Configuration types for engines.

use crate::backpressure::DEFAULT_CONCURRENCY;
use crate::codec::{DEFAULT_MAX_FRAME_SIZE, MIN_FRAME_SIZE};
use std::time::Duration;

/// Concurrency limits of the two work queues.
///
/// # Examples
///
/// ```rust
/// use nanomessage::Concurrency;
///
/// // Same limit both ways.
/// let both: Concurrency = 8.into();
/// assert_eq!(both, Concurrency { incoming: 8, outgoing: 8 });
///
/// let split = Concurrency { incoming: 64, outgoing: 4 };
/// assert_ne!(both, split);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Concurrency {
    /// Requests from the remote side handled at once.
    ///
    /// Default: 256
    pub incoming: usize,

    /// Local requests in flight at once.
    ///
    /// Default: 256
    pub outgoing: usize,
}

impl Default for Concurrency {
    fn default() -> Self {
        Self {
            incoming: DEFAULT_CONCURRENCY,
            outgoing: DEFAULT_CONCURRENCY,
        }
    }
}

impl From<usize> for Concurrency {
    fn from(limit: usize) -> Self {
        Self {
            incoming: limit,
            outgoing: limit,
        }
    }
}

/// Configuration for an engine.
///
/// # Examples
///
/// ```rust
/// use nanomessage::NanomessageConfig;
/// use std::time::Duration;
///
/// let config = NanomessageConfig {
///     timeout: Some(Duration::from_secs(2)),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NanomessageConfig {
    /// Default timeout applied to every request.
    ///
    /// Covers the time spent waiting for an outbound slot as well as the
    /// time waiting for the response. `None` waits forever.
    ///
    /// Default: None
    pub timeout: Option<Duration>,

    /// Work queue limits.
    pub concurrency: Concurrency,

    /// Maximum frame size in bytes, enforced when encoding and decoding.
    ///
    /// Default: 16 MB
    pub max_frame_size: usize,
}

impl Default for NanomessageConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            concurrency: Concurrency::default(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl NanomessageConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets both queue limits.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: impl Into<Concurrency>) -> Self {
        self.concurrency = concurrency.into();
        self
    }

    /// Sets the maximum frame size.
    #[must_use]
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Either concurrency limit is 0
    /// - Max frame size cannot hold a frame header
    /// - Timeout is zero
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency.incoming == 0 || self.concurrency.outgoing == 0 {
            return Err("concurrency limits must be greater than 0".to_string());
        }
        if self.max_frame_size < MIN_FRAME_SIZE {
            return Err(format!(
                "max_frame_size must be at least {} bytes",
                MIN_FRAME_SIZE
            ));
        }
        if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err("timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NanomessageConfig::default();
        assert_eq!(config.timeout, None);
        assert_eq!(config.concurrency.incoming, 256);
        assert_eq!(config.concurrency.outgoing, 256);
        assert_eq!(config.max_frame_size, 16 * 1024 * 1024);
    }

    #[test]
    fn test_builder_pattern() {
        let config = NanomessageConfig::new()
            .with_timeout(Some(Duration::from_millis(250)))
            .with_concurrency(Concurrency {
                incoming: 2,
                outgoing: 3,
            })
            .with_max_frame_size(64 * 1024);

        assert_eq!(config.timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.concurrency.incoming, 2);
        assert_eq!(config.concurrency.outgoing, 3);
        assert_eq!(config.max_frame_size, 64 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let config = NanomessageConfig::new().with_concurrency(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_tiny_frames() {
        let config = NanomessageConfig::new().with_max_frame_size(4);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = NanomessageConfig::new().with_timeout(Some(Duration::ZERO));
        assert!(config.validate().is_err());
    }
}
