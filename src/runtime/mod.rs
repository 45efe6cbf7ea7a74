// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime utilities for resilience and observability.
//!
//! This module provides the retry condition chain with its backoff strategies
//! and the request logger used by the Linode API client.

mod logging;
mod retry;

pub use logging::{LogLevel, LoggingConfig, RequestLogger, RequestMetrics, RequestSpan};
pub use retry::{
    BackoffStrategy, ExponentialBackoff, FixedBackoff, NoBackoff, RetryCondition, RetryConfig,
    RetryConfigBuilder, RetryDecision, RetryInput, RetryWait, DEFAULT_MAX_RETRIES,
    DEFAULT_MAX_WAIT_TIME, MAINTENANCE_MODE_HEADER, RETRY_AFTER_HEADER,
};
