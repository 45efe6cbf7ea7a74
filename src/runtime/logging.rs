// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request logging for the HTTP client.
//!
//! [`RequestLogger`] records timing and outcome counters for every call and,
//! in debug mode, dumps the full request and response with sensitive headers
//! redacted. Everything is emitted through `tracing` under the
//! `linode_api::http` target.
//!
//! # Example
//!
//! ```
//! use linode_api_rs::runtime::{LogLevel, LoggingConfig, RequestLogger};
//!
//! let logger = RequestLogger::with_config(
//!     LoggingConfig::new()
//!         .with_success_level(LogLevel::Debug)
//!         .with_sensitive_header("x-custom-auth"),
//! );
//! let span = logger.start("GET", "https://api.linode.com/v4/regions");
//! logger.finish_success(span, 200);
//! assert_eq!(logger.metrics().successful_requests(), 1);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use http::{HeaderMap, StatusCode};
use tracing::{debug, error, info, trace, warn};

const REDACTED: &str = "[REDACTED]";

/// Log level for request logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Trace level - most verbose.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warn level.
    Warn,
    /// Error level - only errors.
    Error,
    /// Disabled - no logging.
    Off,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Off => write!(f, "OFF"),
        }
    }
}

fn emit(level: LogLevel, msg: &str) {
    match level {
        LogLevel::Trace => trace!(target: "linode_api::http", "{}", msg),
        LogLevel::Debug => debug!(target: "linode_api::http", "{}", msg),
        LogLevel::Info => info!(target: "linode_api::http", "{}", msg),
        LogLevel::Warn => warn!(target: "linode_api::http", "{}", msg),
        LogLevel::Error => error!(target: "linode_api::http", "{}", msg),
        LogLevel::Off => {}
    }
}

fn default_sensitive_headers() -> Vec<String> {
    vec![
        "authorization".to_string(),
        "x-api-key".to_string(),
        "x-auth-token".to_string(),
    ]
}

/// Configuration for request logging.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level for successful requests.
    pub success_level: LogLevel,
    /// Log level for failed requests.
    pub error_level: LogLevel,
    /// Dump full requests and responses at DEBUG.
    pub debug_exchange: bool,
    /// Upper bound on logged body text.
    pub max_body_len: usize,
    /// Whether to redact sensitive headers.
    pub redact_sensitive: bool,
    /// List of sensitive header names to redact.
    pub sensitive_headers: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            success_level: LogLevel::Debug,
            error_level: LogLevel::Warn,
            debug_exchange: false,
            max_body_len: 2048,
            redact_sensitive: true,
            sensitive_headers: default_sensitive_headers(),
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the success log level.
    #[must_use]
    pub fn with_success_level(mut self, level: LogLevel) -> Self {
        self.success_level = level;
        self
    }

    /// Set the error log level.
    #[must_use]
    pub fn with_error_level(mut self, level: LogLevel) -> Self {
        self.error_level = level;
        self
    }

    /// Enable or disable full exchange dumps.
    #[must_use]
    pub fn with_debug_exchange(mut self, enabled: bool) -> Self {
        self.debug_exchange = enabled;
        self
    }

    /// Enable or disable sensitive data redaction.
    #[must_use]
    pub fn with_redaction(mut self, enabled: bool) -> Self {
        self.redact_sensitive = enabled;
        self
    }

    /// Add a sensitive header to redact.
    #[must_use]
    pub fn with_sensitive_header(mut self, header: impl Into<String>) -> Self {
        self.sensitive_headers.push(header.into());
        self
    }

    /// Create a verbose configuration for debugging.
    #[must_use]
    pub fn verbose() -> Self {
        Self {
            success_level: LogLevel::Debug,
            error_level: LogLevel::Error,
            debug_exchange: true,
            ..Self::default()
        }
    }

    /// Create a quiet configuration for production.
    #[must_use]
    pub fn quiet() -> Self {
        Self {
            success_level: LogLevel::Off,
            error_level: LogLevel::Warn,
            debug_exchange: false,
            ..Self::default()
        }
    }

    fn is_sensitive(&self, name: &str) -> bool {
        self.redact_sensitive
            && self
                .sensitive_headers
                .iter()
                .any(|h| h.eq_ignore_ascii_case(name))
    }

    /// Render headers as `name=value` pairs with sensitive values redacted.
    #[must_use]
    pub fn format_headers(&self, headers: &HeaderMap) -> String {
        let parts: Vec<String> = headers
            .iter()
            .map(|(name, value)| {
                if self.is_sensitive(name.as_str()) {
                    format!("{}={}", name, REDACTED)
                } else {
                    format!("{}={:?}", name, value)
                }
            })
            .collect();
        parts.join(", ")
    }

    fn format_body(&self, body: &[u8]) -> String {
        let text = String::from_utf8_lossy(body);
        if text.len() <= self.max_body_len {
            return text.into_owned();
        }
        let mut end = self.max_body_len;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... ({} bytes)", &text[..end], body.len())
    }
}

/// Counters kept by the request logger.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    retries: AtomicU64,
    cache_hits: AtomicU64,
}

impl RequestMetrics {
    /// Create a new metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful request.
    pub fn record_success(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed request.
    pub fn record_failure(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a retry attempt.
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a response served from the cache.
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the total number of requests.
    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Get the number of successful requests.
    #[must_use]
    pub fn successful_requests(&self) -> u64 {
        self.successful_requests.load(Ordering::Relaxed)
    }

    /// Get the number of failed requests.
    #[must_use]
    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    /// Get the number of retries performed.
    #[must_use]
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    /// Get the number of cache hits.
    #[must_use]
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Get the success rate (0.0 to 1.0).
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 1.0;
        }
        let successful = self.successful_requests.load(Ordering::Relaxed);
        successful as f64 / total as f64
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.successful_requests.store(0, Ordering::Relaxed);
        self.failed_requests.store(0, Ordering::Relaxed);
        self.retries.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
    }
}

/// A request logger that tracks timing and logs responses.
#[derive(Debug, Default)]
pub struct RequestLogger {
    config: LoggingConfig,
    metrics: RequestMetrics,
}

impl RequestLogger {
    /// Create a new request logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a request logger with custom configuration.
    #[must_use]
    pub fn with_config(config: LoggingConfig) -> Self {
        Self {
            config,
            metrics: RequestMetrics::new(),
        }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    /// Replace the configuration, keeping the counters.
    pub fn set_config(&mut self, config: LoggingConfig) {
        self.config = config;
    }

    /// Get the metrics.
    #[must_use]
    pub fn metrics(&self) -> &RequestMetrics {
        &self.metrics
    }

    /// Start tracking a request.
    #[must_use]
    pub fn start(&self, method: &str, url: &str) -> RequestSpan {
        RequestSpan {
            method: method.to_string(),
            url: url.to_string(),
            start: Instant::now(),
        }
    }

    /// Dump an outgoing request when debug mode is on.
    pub fn log_request(&self, span: &RequestSpan, headers: &HeaderMap, body: Option<&[u8]>) {
        if !self.config.debug_exchange {
            return;
        }
        let body = body.map(|b| self.config.format_body(b)).unwrap_or_default();
        debug!(
            target: "linode_api::http",
            method = %span.method,
            url = %span.url,
            headers = %self.config.format_headers(headers),
            body = %body,
            "request"
        );
    }

    /// Dump a received response when debug mode is on.
    pub fn log_response(
        &self,
        span: &RequestSpan,
        status: StatusCode,
        headers: &HeaderMap,
        body: &[u8],
    ) {
        if !self.config.debug_exchange {
            return;
        }
        debug!(
            target: "linode_api::http",
            method = %span.method,
            url = %span.url,
            status = status.as_u16(),
            elapsed = ?span.elapsed(),
            headers = %self.config.format_headers(headers),
            body = %self.config.format_body(body),
            "response"
        );
    }

    /// Log a retry decision. Always emitted at WARN.
    pub fn log_retry(&self, span: &RequestSpan, condition: &str, attempt: u32, wait: Duration) {
        self.metrics.record_retry();
        warn!(
            target: "linode_api::http",
            method = %span.method,
            url = %span.url,
            condition,
            attempt,
            wait = ?wait,
            "retrying request"
        );
    }

    /// Record a response served from the cache.
    pub fn log_cache_hit(&self, method: &str, url: &str) {
        self.metrics.record_cache_hit();
        trace!(target: "linode_api::http", method, url, "cache hit");
    }

    /// Finish tracking a request (success).
    pub fn finish_success(&self, span: RequestSpan, status: u16) {
        self.metrics.record_success();
        if self.config.success_level == LogLevel::Off {
            return;
        }
        let msg = format!(
            "{} {} -> {} in {:?}",
            span.method,
            span.url,
            status,
            span.elapsed()
        );
        emit(self.config.success_level, &msg);
    }

    /// Finish tracking a request (failure).
    pub fn finish_error(&self, span: RequestSpan, error: &str) {
        self.metrics.record_failure();
        if self.config.error_level == LogLevel::Off {
            return;
        }
        let msg = format!(
            "{} {} failed in {:?}: {}",
            span.method,
            span.url,
            span.elapsed(),
            error
        );
        emit(self.config.error_level, &msg);
    }
}

/// A span representing an in-flight request.
#[derive(Debug)]
pub struct RequestSpan {
    method: String,
    url: String,
    start: Instant,
}

impl RequestSpan {
    /// Get the method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Get the request URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
