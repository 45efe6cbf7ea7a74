// SPDX-License-Identifier: MIT OR Apache-2.0

//! Before-request and after-response hooks.
//!
//! Hooks run synchronously in registration order. A before-request hook may
//! edit the outgoing request; returning an error aborts it before anything is
//! sent. An after-response hook sees every received response, including ones
//! that will be retried; returning an error fails the call with
//! [`LinodeError::Hook`](crate::error::LinodeError::Hook).

use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;
use http::{HeaderMap, Method};
use url::Url;

use crate::error::RawResponse;

/// Error type hooks report failures with.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

type BeforeFn = dyn Fn(&mut HookRequest) -> Result<(), HookError> + Send + Sync;
type AfterFn = dyn Fn(&HookResponse<'_>) -> Result<(), HookError> + Send + Sync;

/// The request as it is about to go on the wire.
#[derive(Debug, Clone)]
pub struct HookRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// Retry attempt this request belongs to, starting at 0.
    pub attempt: u32,
}

/// A received response together with the request that produced it.
#[derive(Debug, Clone, Copy)]
pub struct HookResponse<'a> {
    pub method: &'a Method,
    pub url: &'a Url,
    pub response: &'a RawResponse,
}

/// Hook lists shared by all requests of one client.
#[derive(Default)]
pub struct HookRegistry {
    before: RwLock<Vec<Arc<BeforeFn>>>,
    after: RwLock<Vec<Arc<AfterFn>>>,
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("before", &self.before_len())
            .field("after", &self.after_len())
            .finish()
    }
}

impl HookRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a before-request hook.
    pub fn on_before_request<F>(&self, hook: F)
    where
        F: Fn(&mut HookRequest) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.before
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(hook));
    }

    /// Register an after-response hook.
    pub fn on_after_response<F>(&self, hook: F)
    where
        F: Fn(&HookResponse<'_>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.after
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(hook));
    }

    /// Number of before-request hooks.
    #[must_use]
    pub fn before_len(&self) -> usize {
        self.before
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of after-response hooks.
    #[must_use]
    pub fn after_len(&self) -> usize {
        self.after
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run before-request hooks, stopping at the first error.
    pub fn run_before(&self, request: &mut HookRequest) -> Result<(), HookError> {
        // Snapshot so a hook may register further hooks without deadlocking.
        let hooks: Vec<Arc<BeforeFn>> = self
            .before
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for hook in hooks {
            hook(request)?;
        }
        Ok(())
    }

    /// Run after-response hooks, stopping at the first error.
    pub fn run_after(&self, response: &HookResponse<'_>) -> Result<(), HookError> {
        let hooks: Vec<Arc<AfterFn>> = self
            .after
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for hook in hooks {
            hook(response)?;
        }
        Ok(())
    }
}
