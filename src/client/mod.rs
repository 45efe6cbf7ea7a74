// SPDX-License-Identifier: MIT OR Apache-2.0

//! The HTTP client wrapper.
//!
//! [`LinodeClient`] owns the transport, the retry configuration, the response
//! cache and the hook lists. One instance is meant to be shared (for example
//! behind an `Arc`) by every task issuing requests; only the cache and the
//! hook lists change after construction.
//!
//! Request futures are cancelled by dropping them. Wrap a call in
//! `tokio::time::timeout` to bound it, retries included.

pub mod cache;
pub mod hooks;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use rustls::pki_types::CertificateDer;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::config::{
    env_flag, ResolvedProfile, ENV_LINODE_API_VERSION, ENV_LINODE_CA, ENV_LINODE_DEBUG,
    ENV_LINODE_TOKEN, ENV_LINODE_URL,
};
use crate::error::{classify, LinodeError, RawResponse, Result};
use crate::pagination::{fetch_all, ListOptions, PageRequest, PageResult};
use crate::runtime::{
    LoggingConfig, RequestLogger, RequestMetrics, RetryCondition, RetryConfig, RetryDecision,
    RetryInput,
};

pub use cache::{CacheEntry, ResponseCache, DEFAULT_CACHE_EXPIRATION};
pub use hooks::{HookError, HookRegistry, HookRequest, HookResponse};

/// Public API host.
pub const DEFAULT_API_HOST: &str = "api.linode.com";
/// Public API version.
pub const DEFAULT_API_VERSION: &str = "v4";
/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Interval between poller checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// User agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("linode-api-rs/", env!("CARGO_PKG_VERSION"));

/// Header carrying server-side filter expressions.
pub const FILTER_HEADER: &str = "X-Filter";

/// Characters escaped in caller-supplied path segments.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encode one path segment.
#[must_use]
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

// =============================================================================
// Configuration
// =============================================================================

#[derive(Clone, Debug)]
pub struct LinodeClientConfig {
    /// API host or base URL. `https://` is assumed when no scheme is given.
    pub base_url: String,
    pub api_version: String,
    pub token: Option<String>,
    pub user_agent: String,
    /// Timeout of a single HTTP exchange, retries excluded.
    pub timeout: Duration,
    /// PEM bundle of extra trusted root certificates.
    pub ca_path: Option<String>,
    /// Log every request and response at DEBUG.
    pub debug: bool,
    pub retry: RetryConfig,
    pub poll_interval: Duration,
    pub cache_expiration: Duration,
    pub logging: LoggingConfig,
}

impl Default for LinodeClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_HOST.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            token: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            ca_path: None,
            debug: false,
            retry: RetryConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            cache_expiration: DEFAULT_CACHE_EXPIRATION,
            logging: LoggingConfig::default(),
        }
    }
}

impl LinodeClientConfig {
    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> LinodeClientConfigBuilder {
        LinodeClientConfigBuilder::new()
    }

    /// Defaults overridden by `LINODE_TOKEN`, `LINODE_URL`,
    /// `LINODE_API_VERSION`, `LINODE_CA` and `LINODE_DEBUG`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Apply environment overrides to an existing configuration.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        if let Some(token) = var(ENV_LINODE_TOKEN) {
            self.token = Some(token);
        }
        if let Some(url) = var(ENV_LINODE_URL) {
            self.base_url = url;
        }
        if let Some(version) = var(ENV_LINODE_API_VERSION) {
            self.api_version = version;
        }
        if let Some(ca) = var(ENV_LINODE_CA) {
            self.ca_path = Some(ca);
        }
        if let Some(debug) = var(ENV_LINODE_DEBUG) {
            self.debug = env_flag(&debug);
        }
        self
    }

    /// Take token, URL and version from a resolved profile.
    #[must_use]
    pub fn with_profile(mut self, profile: &ResolvedProfile) -> Self {
        self.token = Some(profile.token.clone());
        self.base_url = profile.api_url.clone();
        self.api_version = profile.api_version.clone();
        self
    }

    /// The versioned base URL every request path is joined onto.
    #[allow(clippy::result_large_err)]
    pub fn endpoint(&self) -> Result<Url> {
        let base = self.base_url.trim().trim_end_matches('/');
        let base = if base.contains("://") {
            base.to_string()
        } else {
            format!("https://{}", base)
        };
        let version = self.api_version.trim().trim_matches('/');
        let full = if version.is_empty() {
            format!("{}/", base)
        } else {
            format!("{}/{}/", base, version)
        };
        Url::parse(&full)
            .map_err(|e| LinodeError::Config(format!("Invalid API URL {}: {}", full, e)))
    }
}

/// Builder for `LinodeClientConfig`.
#[derive(Debug, Clone, Default)]
pub struct LinodeClientConfigBuilder {
    config: LinodeClientConfig,
}

impl LinodeClientConfigBuilder {
    /// Create a new builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    #[must_use]
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    #[must_use]
    pub fn ca_path(mut self, path: impl Into<String>) -> Self {
        self.config.ca_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn cache_expiration(mut self, expiration: Duration) -> Self {
        self.config.cache_expiration = expiration;
        self
    }

    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> LinodeClientConfig {
        self.config
    }
}

// =============================================================================
// Requests
// =============================================================================

/// One API call, before headers and hooks are applied.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the versioned base URL, e.g. `linode/instances/123`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub filter: Option<String>,
    pub body: Option<Bytes>,
    /// Eligible for the GET response cache.
    pub cacheable: bool,
}

impl ApiRequest {
    /// Create a request.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            filter: None,
            body: None,
            cacheable: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set the `X-Filter` expression.
    #[must_use]
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    /// Serialise `body` as the JSON request body.
    #[allow(clippy::result_large_err)]
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(Bytes::from(serde_json::to_vec(body)?));
        Ok(self)
    }

    /// Mark the request as cacheable.
    #[must_use]
    pub fn cacheable(mut self) -> Self {
        self.cacheable = true;
        self
    }

    /// Request for one page of a list endpoint.
    pub fn page(path: impl Into<String>, page: &PageRequest) -> Self {
        let mut request = Self::get(path).with_filter(page.filter.clone());
        for (key, value) in page.query() {
            request = request.with_query(key, value);
        }
        request
    }
}

// =============================================================================
// Client
// =============================================================================

#[derive(Debug)]
pub struct LinodeClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    retry: RetryConfig,
    cache: ResponseCache,
    hooks: HookRegistry,
    logger: RequestLogger,
    poll_interval: Duration,
}

impl LinodeClient {
    /// Build a client from a configuration.
    #[allow(clippy::result_large_err)]
    pub fn new(config: LinodeClientConfig) -> Result<Self> {
        let base_url = config.endpoint()?;

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone());
        if let Some(ca_path) = &config.ca_path {
            builder = builder.use_preconfigured_tls(Self::tls_config(ca_path)?);
        }
        let http = builder
            .build()
            .map_err(|e| LinodeError::Config(format!("Failed to build HTTP client: {e}")))?;

        let debug = config.debug || config.logging.debug_exchange;
        let logging = config.logging.clone().with_debug_exchange(debug);

        Ok(Self {
            http,
            base_url,
            token: config.token.filter(|t| !t.is_empty()),
            retry: config.retry,
            cache: ResponseCache::new(config.cache_expiration),
            hooks: HookRegistry::new(),
            logger: RequestLogger::with_config(logging),
            poll_interval: config.poll_interval,
        })
    }

    /// Build a client from environment variables.
    #[allow(clippy::result_large_err)]
    pub fn from_env() -> Result<Self> {
        Self::new(LinodeClientConfig::from_env())
    }

    /// TLS configuration trusting the public roots plus the certificates in `ca_path`.
    #[allow(clippy::result_large_err)]
    fn tls_config(ca_path: &str) -> Result<rustls::ClientConfig> {
        let _ = rustls::crypto::ring::default_provider().install_default();

        let ca_pem = std::fs::read(ca_path)
            .map_err(|e| LinodeError::Config(format!("Failed to read CA cert {ca_path}: {e}")))?;
        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        for cert in Self::load_pem_certs(&ca_pem)? {
            root_store
                .add(cert)
                .map_err(|e| LinodeError::Config(format!("Failed to add CA cert: {e}")))?;
        }

        let mut tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();
        tls_config.alpn_protocols = vec![b"http/1.1".to_vec()];
        Ok(tls_config)
    }

    /// Load PEM-encoded certificates
    #[allow(clippy::result_large_err)]
    fn load_pem_certs(pem_data: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
        let mut reader = std::io::BufReader::new(pem_data);
        let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| LinodeError::Config(format!("Failed to parse PEM certificates: {e}")))?;
        if certs.is_empty() {
            return Err(LinodeError::Config(
                "No certificates found in PEM data".to_string(),
            ));
        }
        Ok(certs)
    }

    /// The versioned base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Interval used by the `wait_for_*` helpers.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// The retry configuration.
    #[must_use]
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Request counters.
    #[must_use]
    pub fn metrics(&self) -> &RequestMetrics {
        self.logger.metrics()
    }

    // ========================================================================
    // Startup configuration
    // ========================================================================

    /// Set the budget for time spent waiting between retries.
    pub fn set_retry_max_wait_time(&mut self, max_wait_time: Duration) {
        self.retry.max_wait_time = max_wait_time;
    }

    /// Append a retry condition after the built-in ones.
    pub fn add_retry_condition(&mut self, condition: RetryCondition) {
        self.retry.add_condition(condition);
    }

    /// Replace the retry configuration.
    pub fn set_retry_config(&mut self, retry: RetryConfig) {
        self.retry = retry;
    }

    /// Set the interval used by the `wait_for_*` helpers.
    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }

    /// Toggle full request/response logging.
    pub fn set_debug(&mut self, debug: bool) {
        let config = self.logger.config().clone().with_debug_exchange(debug);
        self.logger.set_config(config);
    }

    // ========================================================================
    // Cache controls
    // ========================================================================

    /// Enable or disable the response cache. Stored entries survive.
    pub fn use_cache(&self, enabled: bool) {
        self.cache.set_enabled(enabled);
    }

    /// Drop every cached response.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Set the cache TTL. Zero expires entries immediately.
    pub fn set_cache_expiration(&self, expiration: Duration) {
        self.cache.set_expiration(expiration);
    }

    /// Drop cached responses for one endpoint path, e.g. `regions`.
    pub fn invalidate_cache_endpoint(&self, endpoint: &str) -> usize {
        self.cache.invalidate_endpoint(endpoint)
    }

    /// The response cache.
    #[must_use]
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    // ========================================================================
    // Hooks
    // ========================================================================

    /// Register a hook run before every attempt that goes on the wire.
    pub fn on_before_request<F>(&self, hook: F)
    where
        F: Fn(&mut HookRequest) -> std::result::Result<(), HookError> + Send + Sync + 'static,
    {
        self.hooks.on_before_request(hook);
    }

    /// Register a hook run on every received response.
    pub fn on_after_response<F>(&self, hook: F)
    where
        F: Fn(&HookResponse<'_>) -> std::result::Result<(), HookError> + Send + Sync + 'static,
    {
        self.hooks.on_after_response(hook);
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Resolve a request path against the base URL.
    #[allow(clippy::result_large_err)]
    pub fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| LinodeError::Validation(format!("Invalid request path {path}: {e}")))
    }

    #[allow(clippy::result_large_err)]
    fn request_headers(&self, request: &ApiRequest) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if request.body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        if let Some(token) = &self.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| LinodeError::Config(format!("Invalid API token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        if let Some(filter) = &request.filter {
            let value = HeaderValue::from_str(filter)
                .map_err(|e| LinodeError::Validation(format!("Invalid filter: {e}")))?;
            headers.insert(HeaderName::from_static("x-filter"), value);
        }
        Ok(headers)
    }

    async fn send(&self, request: &HookRequest) -> Result<RawResponse> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(RawResponse::new(status, headers, body))
    }

    /// Execute a request with caching, hooks and retries.
    ///
    /// Returns the successful response, or the last classified error once the
    /// retry chain declines. Transport failures are returned immediately.
    pub async fn execute(&self, request: ApiRequest) -> Result<RawResponse> {
        let mut url = self.url(&request.path)?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }

        let cache_key = (request.method == Method::GET
            && request.cacheable
            && self.cache.is_enabled())
        .then(|| cache::cache_key(&request.method, &url, request.filter.as_deref()));
        if let Some(key) = &cache_key {
            if let Some(body) = self.cache.get(key) {
                self.logger.log_cache_hit(request.method.as_str(), url.as_str());
                return Ok(RawResponse::new(StatusCode::OK, HeaderMap::new(), body));
            }
        }

        let headers = self.request_headers(&request)?;
        let span = self.logger.start(request.method.as_str(), url.as_str());
        let mut attempt = 0u32;
        let mut waited = Duration::ZERO;

        loop {
            let mut outgoing = HookRequest {
                method: request.method.clone(),
                url: url.clone(),
                headers: headers.clone(),
                body: request.body.clone(),
                attempt,
            };
            if let Err(e) = self.hooks.run_before(&mut outgoing) {
                let err = LinodeError::Hook(e.to_string());
                self.logger.finish_error(span, &err.to_string());
                return Err(err);
            }

            self.logger
                .log_request(&span, &outgoing.headers, outgoing.body.as_deref());
            let response = match self.send(&outgoing).await {
                Ok(response) => response,
                Err(err) => {
                    self.logger.finish_error(span, &err.to_string());
                    return Err(err);
                }
            };
            self.logger
                .log_response(&span, response.status, &response.headers, &response.body);

            let seen = HookResponse {
                method: &outgoing.method,
                url: &outgoing.url,
                response: &response,
            };
            if let Err(e) = self.hooks.run_after(&seen) {
                let err = LinodeError::Hook(e.to_string());
                self.logger.finish_error(span, &err.to_string());
                return Err(err);
            }

            let Some(api_error) = classify(&response) else {
                if let Some(key) = cache_key {
                    self.cache.insert(key, url.path(), response.body.clone());
                }
                self.logger.finish_success(span, response.status.as_u16());
                return Ok(response);
            };

            let input = RetryInput::new(response.status, &response.headers, Some(&api_error));
            match self.retry.next_retry(attempt, waited, &input) {
                RetryDecision::Retry { condition, wait } => {
                    self.logger.log_retry(&span, &condition, attempt, wait);
                    tokio::time::sleep(wait).await;
                    waited += wait;
                    attempt += 1;
                }
                RetryDecision::DoNotRetry => {
                    self.logger.finish_error(span, &api_error.to_string());
                    return Err(api_error.into());
                }
            }
        }
    }

    /// Execute a request and decode its JSON body.
    pub async fn request_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.execute(request).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// GET and decode.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request_json(ApiRequest::get(path)).await
    }

    /// GET through the response cache.
    pub async fn get_cached<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request_json(ApiRequest::get(path).cacheable()).await
    }

    /// POST a JSON body and decode the response.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(ApiRequest::post(path).with_json(body)?)
            .await
    }

    /// PUT a JSON body and decode the response.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(ApiRequest::put(path).with_json(body)?)
            .await
    }

    /// DELETE, ignoring the response body.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute(ApiRequest::delete(path)).await?;
        Ok(())
    }

    /// Fetch one page of a list endpoint.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page: &PageRequest,
        cacheable: bool,
    ) -> Result<PageResult<T>> {
        let mut request = ApiRequest::page(path, page);
        if cacheable {
            request = request.cacheable();
        }
        self.request_json(request).await
    }

    /// List every item of an endpoint, or one page if `opts.page` is set.
    pub async fn list<T: DeserializeOwned>(&self, path: &str, opts: &ListOptions) -> Result<Vec<T>> {
        fetch_all(opts, move |page| async move {
            self.get_page(path, &page, false).await
        })
        .await
    }

    /// Like [`list`](Self::list), through the response cache.
    pub async fn list_cached<T: DeserializeOwned>(
        &self,
        path: &str,
        opts: &ListOptions,
    ) -> Result<Vec<T>> {
        fetch_all(opts, move |page| async move {
            self.get_page(path, &page, true).await
        })
        .await
    }
}

/// Shared handle type for callers that spread one client across tasks.
pub type SharedClient = Arc<LinodeClient>;

#[cfg(test)]
mod tests;
