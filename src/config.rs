//! Paginator configuration.

use crate::error::{PagerError, Result};
use serde::{Deserialize, Serialize};

/// What to do with the cursor when a load-more fetch fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorPolicy {
    /// Drop the cursor. No further pages are requested after the failure.
    #[default]
    Halt,
    /// Put the cursor back so the next proximity signal retries the page.
    RestoreCursor,
}

/// Paginator configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagerConfig {
    /// Collection path to page through.
    pub path: String,

    /// Child field holding the numeric sort value.
    pub order_by: String,

    /// Items per page. Zero or negative loads the whole collection at once.
    /// Default: 20
    pub page_size: i64,

    /// How close (in items) to the end of the visible range a scroll must
    /// get before the next page is requested.
    /// Default: 2
    pub visible_threshold: usize,

    /// Max buffered live events before the subscription is dropped.
    /// Default: 1000
    pub subscription_buffer: usize,

    /// Cursor handling after a failed load-more.
    pub on_fetch_error: FetchErrorPolicy,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            order_by: String::new(),
            page_size: 20,
            visible_threshold: 2,
            subscription_buffer: 1000,
            on_fetch_error: FetchErrorPolicy::Halt,
        }
    }
}

impl PagerConfig {
    pub fn new(path: impl Into<String>, order_by: impl Into<String>, page_size: i64) -> Self {
        Self {
            path: path.into(),
            order_by: order_by.into(),
            page_size,
            ..Default::default()
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(PagerError::InvalidConfig("path must not be empty".into()));
        }
        if self.order_by.trim().is_empty() {
            return Err(PagerError::InvalidConfig("order_by must not be empty".into()));
        }
        if self.subscription_buffer == 0 {
            return Err(PagerError::InvalidConfig(
                "subscription_buffer must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Page size as a count, or `None` for a single unbounded page.
    pub fn page_len(&self) -> Option<usize> {
        if self.page_size > 0 {
            Some(self.page_size as usize)
        } else {
            None
        }
    }

    /// Number of children requested per fetch: one page plus the overlap
    /// child shared with the neighbouring page.
    pub fn fetch_limit(&self) -> Option<usize> {
        self.page_len().map(|n| n + 1)
    }
}
