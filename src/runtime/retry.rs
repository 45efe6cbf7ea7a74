// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry conditions and backoff strategies for resilient API calls.
//!
//! A [`RetryConfig`] holds an ordered chain of [`RetryCondition`]s. After every
//! non-2xx response the client asks the chain whether the request should be
//! repeated; the first matching condition decides, and its [`RetryWait`]
//! determines how long to sleep first.
//!
//! # Example
//!
//! ```
//! use linode_api_rs::runtime::{ExponentialBackoff, RetryCondition, RetryConfig};
//! use std::time::Duration;
//!
//! let retry = RetryConfig::builder()
//!     .max_wait_time(Duration::from_secs(60))
//!     .backoff(ExponentialBackoff::new(Duration::from_millis(500)))
//!     .condition(RetryCondition::new("conflict", |input| input.status.as_u16() == 409))
//!     .build();
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, StatusCode};
use tracing::info;

use crate::error::ApiError;

/// Header carrying the server's retry hint, in seconds.
pub const RETRY_AFTER_HEADER: &str = "Retry-After";
/// Header set by the API during maintenance windows.
pub const MAINTENANCE_MODE_HEADER: &str = "X-Maintenance-Mode";
/// Default cap on retry attempts for one request.
pub const DEFAULT_MAX_RETRIES: u32 = 1000;
/// Default budget for the total time spent waiting between retries.
pub const DEFAULT_MAX_WAIT_TIME: Duration = Duration::from_secs(30);

/// Error reasons that mean "the resource is busy, try again shortly".
const BUSY_PHRASES: &[&str] = &["linode busy"];

/// Defines a backoff strategy for retry delays.
pub trait BackoffStrategy: fmt::Debug + Send + Sync + 'static {
    /// Calculate the delay before the next retry attempt.
    ///
    /// # Arguments
    /// * `attempt` - The current attempt number (0-indexed)
    fn delay(&self, attempt: u32) -> Duration;
}

// =============================================================================
// No Backoff
// =============================================================================

/// No delay between retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl NoBackoff {
    /// Create a new no-backoff strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BackoffStrategy for NoBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}

// =============================================================================
// Fixed Backoff
// =============================================================================

/// Fixed delay between retries.
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    /// Create a new fixed backoff strategy.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Create a fixed backoff with delay in milliseconds.
    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }
}

impl BackoffStrategy for FixedBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

// =============================================================================
// Exponential Backoff
// =============================================================================

/// Exponential backoff - delay doubles with each attempt.
///
/// Optionally adds up to 25% random jitter to prevent thundering herd.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: bool,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff strategy.
    #[must_use]
    pub fn new(initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }

    /// Set the maximum delay cap.
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Set the multiplier for exponential growth.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Enable or disable jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let base_delay = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let max_delay = self.max_delay.as_millis() as f64;
        let capped_delay = base_delay.min(max_delay);

        let final_delay = if self.jitter {
            let jitter = rand::random::<f64>() * capped_delay * 0.25;
            (capped_delay + jitter).min(max_delay)
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

// =============================================================================
// Retry Conditions
// =============================================================================

/// What a retry condition gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct RetryInput<'a> {
    pub status: StatusCode,
    pub headers: &'a HeaderMap,
    pub error: Option<&'a ApiError>,
}

impl<'a> RetryInput<'a> {
    /// Create an input for a response.
    #[must_use]
    pub fn new(status: StatusCode, headers: &'a HeaderMap, error: Option<&'a ApiError>) -> Self {
        Self {
            status,
            headers,
            error,
        }
    }

    /// Value of a header as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `Retry-After` parsed as whole seconds.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        self.header(RETRY_AFTER_HEADER)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    /// Whether the API flagged this response as served during maintenance.
    #[must_use]
    pub fn in_maintenance(&self) -> bool {
        self.headers.contains_key(MAINTENANCE_MODE_HEADER)
    }
}

type Predicate = dyn Fn(&RetryInput<'_>) -> bool + Send + Sync;
type WaitFn = dyn Fn(&RetryInput<'_>, u32) -> Duration + Send + Sync;

/// How long to wait once a condition matched.
#[derive(Clone)]
pub enum RetryWait {
    /// Use the configured backoff strategy.
    Backoff,
    /// Honor `Retry-After` when present and parseable, else back off.
    RetryAfterOrBackoff,
    /// Caller supplied calculator, given the input and the attempt number.
    Custom(Arc<WaitFn>),
}

impl fmt::Debug for RetryWait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryWait::Backoff => f.write_str("Backoff"),
            RetryWait::RetryAfterOrBackoff => f.write_str("RetryAfterOrBackoff"),
            RetryWait::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// A named predicate over a response plus its wait policy.
#[derive(Clone)]
pub struct RetryCondition {
    name: Arc<str>,
    predicate: Arc<Predicate>,
    wait: RetryWait,
}

impl fmt::Debug for RetryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryCondition")
            .field("name", &self.name)
            .field("wait", &self.wait)
            .finish()
    }
}

impl RetryCondition {
    /// Create a condition that backs off when `predicate` matches.
    pub fn new<F>(name: impl Into<Arc<str>>, predicate: F) -> Self
    where
        F: Fn(&RetryInput<'_>) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
            wait: RetryWait::Backoff,
        }
    }

    /// Set the wait policy.
    #[must_use]
    pub fn with_wait(mut self, wait: RetryWait) -> Self {
        self.wait = wait;
        self
    }

    /// Condition name, used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate the predicate.
    #[must_use]
    pub fn matches(&self, input: &RetryInput<'_>) -> bool {
        (self.predicate)(input)
    }

    /// 429 Too Many Requests, or an error reason saying the resource is busy.
    #[must_use]
    pub fn rate_limited() -> Self {
        Self::new("rate_limited", |input| {
            if input.status == StatusCode::TOO_MANY_REQUESTS {
                return true;
            }
            input.error.is_some_and(|err| {
                BUSY_PHRASES
                    .iter()
                    .any(|phrase| err.has_reason_containing(phrase))
            })
        })
        .with_wait(RetryWait::RetryAfterOrBackoff)
    }

    /// 503 with a `Retry-After` hint. The hint is honored verbatim.
    #[must_use]
    pub fn service_unavailable() -> Self {
        Self::new("service_unavailable", |input| {
            if input.status != StatusCode::SERVICE_UNAVAILABLE {
                return false;
            }
            if input.in_maintenance() {
                info!(
                    target: "linode_api::http",
                    "Linode API is under maintenance, request will not be retried"
                );
                return false;
            }
            input.retry_after().is_some()
        })
        .with_wait(RetryWait::RetryAfterOrBackoff)
    }

    /// Any 5xx except 501 Not Implemented and maintenance-mode 503s.
    #[must_use]
    pub fn transient_server_error() -> Self {
        Self::new("transient_server_error", |input| {
            input.status.is_server_error()
                && input.status != StatusCode::NOT_IMPLEMENTED
                && !(input.status == StatusCode::SERVICE_UNAVAILABLE && input.in_maintenance())
        })
    }

    /// 408 Request Timeout.
    #[must_use]
    pub fn request_timeout() -> Self {
        Self::new("request_timeout", |input| {
            input.status == StatusCode::REQUEST_TIMEOUT
        })
    }

    /// 400 served as an HTML page by the nginx front end.
    #[must_use]
    pub fn proxy_bad_request() -> Self {
        Self::new("proxy_bad_request", |input| {
            input.status == StatusCode::BAD_REQUEST
                && input.header("Server") == Some("nginx")
                && input
                    .header("Content-Type")
                    .is_some_and(|ct| ct.starts_with("text/html"))
        })
    }

    /// The built-in chain, in evaluation order.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::rate_limited(),
            Self::service_unavailable(),
            Self::transient_server_error(),
            Self::request_timeout(),
            Self::proxy_bad_request(),
        ]
    }
}

/// Outcome of evaluating the condition chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after `wait`, because `condition` matched.
    Retry { condition: Arc<str>, wait: Duration },
    /// No condition matched, or the budget is spent.
    DoNotRetry,
}

impl RetryDecision {
    /// Whether the request should be repeated.
    #[must_use]
    pub fn should_retry(&self) -> bool {
        matches!(self, RetryDecision::Retry { .. })
    }

    /// The wait before the next attempt, zero when not retrying.
    #[must_use]
    pub fn wait(&self) -> Duration {
        match self {
            RetryDecision::Retry { wait, .. } => *wait,
            RetryDecision::DoNotRetry => Duration::ZERO,
        }
    }
}

// =============================================================================
// Retry Configuration
// =============================================================================

/// Complete retry configuration: the condition chain plus budgets.
///
/// Read-only once a client is built, so it can be shared by concurrent requests.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts for one request.
    pub max_retries: u32,
    /// Budget for the total time spent waiting between attempts.
    pub max_wait_time: Duration,
    /// Backoff strategy for calculating delays.
    pub backoff: Arc<dyn BackoffStrategy>,
    conditions: Vec<RetryCondition>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            max_wait_time: DEFAULT_MAX_WAIT_TIME,
            backoff: Arc::new(ExponentialBackoff::default()),
            conditions: RetryCondition::defaults(),
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Disable retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            max_wait_time: Duration::ZERO,
            backoff: Arc::new(NoBackoff),
            conditions: Vec::new(),
        }
    }

    /// Append a condition to the end of the chain.
    pub fn add_condition(&mut self, condition: RetryCondition) {
        self.conditions.push(condition);
    }

    /// The condition chain, in evaluation order.
    #[must_use]
    pub fn conditions(&self) -> &[RetryCondition] {
        &self.conditions
    }

    /// Evaluate the chain for one response, ignoring budgets.
    ///
    /// The first matching condition wins.
    #[must_use]
    pub fn should_retry(&self, attempt: u32, input: &RetryInput<'_>) -> RetryDecision {
        for condition in &self.conditions {
            if !condition.matches(input) {
                continue;
            }
            let wait = match &condition.wait {
                RetryWait::Backoff => self.backoff.delay(attempt),
                RetryWait::RetryAfterOrBackoff => input
                    .retry_after()
                    .unwrap_or_else(|| self.backoff.delay(attempt)),
                RetryWait::Custom(calc) => calc(input, attempt),
            };
            return RetryDecision::Retry {
                condition: condition.name.clone(),
                wait,
            };
        }
        RetryDecision::DoNotRetry
    }

    /// Evaluate the chain and apply the attempt and wait-time budgets.
    ///
    /// `waited` is the time already spent sleeping for this request. The
    /// returned wait never exceeds what is left of `max_wait_time`.
    #[must_use]
    pub fn next_retry(
        &self,
        attempt: u32,
        waited: Duration,
        input: &RetryInput<'_>,
    ) -> RetryDecision {
        if attempt >= self.max_retries || waited >= self.max_wait_time {
            return RetryDecision::DoNotRetry;
        }
        match self.should_retry(attempt, input) {
            RetryDecision::Retry { condition, wait } => {
                let remaining = self.max_wait_time - waited;
                RetryDecision::Retry {
                    condition,
                    wait: wait.min(remaining),
                }
            }
            RetryDecision::DoNotRetry => RetryDecision::DoNotRetry,
        }
    }
}

/// Builder for `RetryConfig`.
#[derive(Debug, Clone)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    /// Create a new builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RetryConfig::default(),
        }
    }

    /// Set maximum retry attempts.
    #[must_use]
    pub fn max_retries(mut self, max: u32) -> Self {
        self.config.max_retries = max;
        self
    }

    /// Set the total wait-time budget.
    #[must_use]
    pub fn max_wait_time(mut self, max: Duration) -> Self {
        self.config.max_wait_time = max;
        self
    }

    /// Set the backoff strategy.
    #[must_use]
    pub fn backoff<B: BackoffStrategy>(mut self, backoff: B) -> Self {
        self.config.backoff = Arc::new(backoff);
        self
    }

    /// Append a condition after the existing ones.
    #[must_use]
    pub fn condition(mut self, condition: RetryCondition) -> Self {
        self.config.conditions.push(condition);
        self
    }

    /// Remove every condition, including the built-in ones.
    #[must_use]
    pub fn clear_conditions(mut self) -> Self {
        self.config.conditions.clear();
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> RetryConfig {
        self.config
    }
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorReason;
    use http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    fn no_jitter() -> RetryConfig {
        RetryConfig::builder()
            .backoff(ExponentialBackoff::new(Duration::from_secs(1)).with_jitter(false))
            .build()
    }

    #[test]
    fn test_no_backoff() {
        let backoff = NoBackoff::new();
        assert_eq!(backoff.delay(0), Duration::ZERO);
        assert_eq!(backoff.delay(100), Duration::ZERO);
    }

    #[test]
    fn test_fixed_backoff() {
        let backoff = FixedBackoff::from_millis(100);
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(5), Duration::from_millis(100));
    }

    #[test]
    fn test_exponential_backoff() {
        let backoff = ExponentialBackoff::new(Duration::from_secs(1)).with_jitter(false);

        assert_eq!(backoff.delay(0), Duration::from_secs(1));
        assert_eq!(backoff.delay(1), Duration::from_secs(2));
        assert_eq!(backoff.delay(2), Duration::from_secs(4));
        assert_eq!(backoff.delay(3), Duration::from_secs(8));
        assert_eq!(backoff.delay(10), Duration::from_secs(30)); // Capped
    }

    #[test]
    fn test_exponential_backoff_jitter_stays_within_bounds() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(10));

        for _ in 0..50 {
            let delay = backoff.delay(2);
            assert!(delay >= Duration::from_millis(400));
            assert!(delay <= Duration::from_millis(500));
        }
        assert!(backoff.delay(20) <= Duration::from_secs(10));
    }

    #[test]
    fn test_rate_limited_is_retried_regardless_of_attempt() {
        let config = no_jitter();
        let map = HeaderMap::new();
        let input = RetryInput::new(StatusCode::TOO_MANY_REQUESTS, &map, None);

        for attempt in [0, 1, 7, 50] {
            let decision = config.should_retry(attempt, &input);
            assert!(decision.should_retry(), "attempt {attempt}");
        }
        assert_eq!(config.should_retry(2, &input).wait(), Duration::from_secs(4));
    }

    #[test]
    fn test_rate_limited_honors_retry_after() {
        let config = no_jitter();
        let map = headers(&[("Retry-After", "7")]);
        let input = RetryInput::new(StatusCode::TOO_MANY_REQUESTS, &map, None);

        assert_eq!(config.should_retry(3, &input).wait(), Duration::from_secs(7));
    }

    #[test]
    fn test_unparseable_retry_after_falls_back_to_backoff() {
        let config = no_jitter();
        let map = headers(&[("Retry-After", "Wed, 21 Oct 2015 07:28:00 GMT")]);
        let input = RetryInput::new(StatusCode::TOO_MANY_REQUESTS, &map, None);

        assert_eq!(config.should_retry(1, &input).wait(), Duration::from_secs(2));
    }

    #[test]
    fn test_linode_busy_is_retried() {
        let config = no_jitter();
        let map = HeaderMap::new();

        let plain = ApiError::from_status(400);
        let input = RetryInput::new(StatusCode::BAD_REQUEST, &map, Some(&plain));
        assert!(!config.should_retry(0, &input).should_retry());

        let busy = ApiError::new(
            400,
            vec![ErrorReason {
                field: None,
                reason: "Linode busy.".to_string(),
            }],
        );
        let input = RetryInput::new(StatusCode::BAD_REQUEST, &map, Some(&busy));
        match config.should_retry(0, &input) {
            RetryDecision::Retry { condition, .. } => assert_eq!(&*condition, "rate_limited"),
            RetryDecision::DoNotRetry => panic!("busy response should be retried"),
        }
    }

    #[test]
    fn test_not_implemented_is_never_retried() {
        let config = no_jitter();
        let map = HeaderMap::new();
        let input = RetryInput::new(StatusCode::NOT_IMPLEMENTED, &map, None);

        for attempt in [0, 1, 10] {
            assert_eq!(config.should_retry(attempt, &input), RetryDecision::DoNotRetry);
        }
    }

    #[test]
    fn test_service_unavailable_retry_after_is_exact() {
        let config = RetryConfig::default();
        let map = headers(&[("Retry-After", "20")]);
        let input = RetryInput::new(StatusCode::SERVICE_UNAVAILABLE, &map, None);

        match config.should_retry(0, &input) {
            RetryDecision::Retry { condition, wait } => {
                assert_eq!(&*condition, "service_unavailable");
                assert_eq!(wait, Duration::from_secs(20));
            }
            RetryDecision::DoNotRetry => panic!("503 with Retry-After should be retried"),
        }
    }

    #[test]
    fn test_maintenance_mode_is_not_retried() {
        let config = no_jitter();
        let map = headers(&[
            ("Retry-After", "20"),
            ("X-Maintenance-Mode", "Currently in maintenance mode."),
        ]);
        let input = RetryInput::new(StatusCode::SERVICE_UNAVAILABLE, &map, None);

        assert_eq!(config.should_retry(0, &input), RetryDecision::DoNotRetry);
    }

    #[test]
    fn test_transient_server_errors() {
        let config = no_jitter();
        let map = HeaderMap::new();

        for status in [500, 502, 503, 504] {
            let input = RetryInput::new(StatusCode::from_u16(status).unwrap(), &map, None);
            assert!(config.should_retry(0, &input).should_retry(), "{status}");
        }
        for status in [400, 401, 403, 404, 422] {
            let input = RetryInput::new(StatusCode::from_u16(status).unwrap(), &map, None);
            assert!(!config.should_retry(0, &input).should_retry(), "{status}");
        }
    }

    #[test]
    fn test_request_timeout_and_proxy_errors() {
        let config = no_jitter();
        let empty = HeaderMap::new();
        let input = RetryInput::new(StatusCode::REQUEST_TIMEOUT, &empty, None);
        assert!(config.should_retry(0, &input).should_retry());

        let nginx = headers(&[("Server", "nginx"), ("Content-Type", "text/html")]);
        let input = RetryInput::new(StatusCode::BAD_REQUEST, &nginx, None);
        assert!(config.should_retry(0, &input).should_retry());
    }

    #[test]
    fn test_next_retry_clamps_to_remaining_budget() {
        let config = RetryConfig::builder()
            .max_wait_time(Duration::from_secs(30))
            .build();
        let map = headers(&[("Retry-After", "20")]);
        let input = RetryInput::new(StatusCode::SERVICE_UNAVAILABLE, &map, None);

        let decision = config.next_retry(1, Duration::from_secs(25), &input);
        assert_eq!(decision.wait(), Duration::from_secs(5));

        let decision = config.next_retry(2, Duration::from_secs(30), &input);
        assert_eq!(decision, RetryDecision::DoNotRetry);
    }

    #[test]
    fn test_next_retry_caps_attempts() {
        let config = RetryConfig::builder()
            .max_retries(2)
            .backoff(NoBackoff)
            .build();
        let map = HeaderMap::new();
        let input = RetryInput::new(StatusCode::TOO_MANY_REQUESTS, &map, None);

        assert!(config.next_retry(1, Duration::ZERO, &input).should_retry());
        assert!(!config.next_retry(2, Duration::ZERO, &input).should_retry());
    }

    #[test]
    fn test_custom_condition_is_appended() {
        let mut config = RetryConfig::builder()
            .clear_conditions()
            .backoff(NoBackoff)
            .build();
        assert!(config.conditions().is_empty());

        config.add_condition(
            RetryCondition::new("conflict", |input| input.status == StatusCode::CONFLICT)
                .with_wait(RetryWait::Custom(Arc::new(|_, attempt| {
                    Duration::from_millis(10 * u64::from(attempt + 1))
                }))),
        );

        let map = HeaderMap::new();
        let input = RetryInput::new(StatusCode::CONFLICT, &map, None);
        assert_eq!(config.should_retry(2, &input).wait(), Duration::from_millis(30));

        let input = RetryInput::new(StatusCode::TOO_MANY_REQUESTS, &map, None);
        assert!(!config.should_retry(0, &input).should_retry());
    }

    #[test]
    fn test_retry_config_disabled() {
        let config = RetryConfig::disabled();
        let map = HeaderMap::new();
        let input = RetryInput::new(StatusCode::TOO_MANY_REQUESTS, &map, None);

        assert_eq!(config.max_retries, 0);
        assert!(!config.next_retry(0, Duration::ZERO, &input).should_retry());
    }
}
