// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generic pagination over list endpoints.
//!
//! Every list endpoint returns the same envelope (`page`, `pages`, `results`,
//! `data`). [`fetch_all`] drives a page-fetch closure over that envelope and
//! concatenates the pages in server order. Filtering and sorting happen on the
//! server; the merged expression is forwarded unchanged on every page.
//!
//! Pages are fetched one after another. The first failed page aborts the run
//! and the items gathered so far are dropped. Overlapping pages caused by
//! concurrent mutation are passed through as-is.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{LinodeError, Result};
use crate::filter::Filter;

/// Sort direction for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-facing options for any list call.
///
/// A non-zero `page` fetches exactly that page and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub page: u32,
    pub page_size: u32,
    /// Opaque, pre-serialised filter expression.
    pub filter: Option<String>,
    pub order_by: Option<String>,
    pub order: Option<SortOrder>,
}

impl ListOptions {
    /// Options that fetch every page with server defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch only this page.
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Set the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set a raw filter expression.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set a filter built with [`Filter`].
    #[must_use]
    pub fn with_filter_expr(mut self, filter: &Filter) -> Self {
        self.filter = Some(filter.to_json());
        self
    }

    /// Sort by a field.
    #[must_use]
    pub fn sorted_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some(field.into());
        self.order = Some(order);
        self
    }

    /// The `X-Filter` value: the filter with any sort merged in.
    ///
    /// Sorting requires the filter, when present, to be a JSON object.
    pub fn filter_header(&self) -> Result<Option<String>> {
        if self.order_by.is_none() && self.order.is_none() {
            return Ok(self.filter.clone());
        }

        let mut object = match &self.filter {
            None => serde_json::Map::new(),
            Some(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => map,
                _ => {
                    return Err(LinodeError::Validation(format!(
                        "cannot apply sorting to a filter that is not a JSON object: {raw}"
                    )))
                }
            },
        };
        if let Some(order_by) = &self.order_by {
            object.insert("+order_by".to_string(), Value::String(order_by.clone()));
        }
        if let Some(order) = self.order {
            object.insert("+order".to_string(), Value::String(order.to_string()));
        }
        Ok(Some(Value::Object(object).to_string()))
    }

    fn page_request(&self, page: u32, filter: &Option<String>) -> PageRequest {
        PageRequest {
            page,
            page_size: self.page_size,
            filter: filter.clone(),
        }
    }
}

/// One page to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    /// Zero means the server default.
    pub page_size: u32,
    /// `X-Filter` value, sort fields included.
    pub filter: Option<String>,
}

impl PageRequest {
    /// Query parameters for this page.
    #[must_use]
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::with_capacity(2);
        if self.page != 0 {
            query.push(("page", self.page.to_string()));
        }
        if self.page_size != 0 {
            query.push(("page_size", self.page_size.to_string()));
        }
        query
    }
}

/// The list envelope returned by every list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    #[serde(rename = "data", default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(rename = "page", default)]
    pub current_page: u32,
    #[serde(rename = "pages", default)]
    pub total_pages: u32,
    #[serde(rename = "results", default)]
    pub total_results: u32,
}

/// Fetch every page, or exactly one if `opts.page` is set.
///
/// Stops when the current page reaches `total_pages` or a page comes back
/// empty.
pub async fn fetch_all<T, F, Fut>(opts: &ListOptions, mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<PageResult<T>>>,
{
    let filter = opts.filter_header()?;

    if opts.page != 0 {
        let result = fetch_page(opts.page_request(opts.page, &filter)).await?;
        return Ok(result.items);
    }

    let mut items = Vec::new();
    let mut page = 1;
    loop {
        let result = fetch_page(opts.page_request(page, &filter)).await?;
        let exhausted = result.items.is_empty() || page >= result.total_pages;
        debug!(
            page,
            pages = result.total_pages,
            results = result.total_results,
            count = result.items.len(),
            "fetched page"
        );
        items.extend(result.items);
        if exhausted {
            break;
        }
        page += 1;
    }
    Ok(items)
}
