//! Browser session abstraction.
//!
//! [`BrowserSession`] is the seam between page objects and an automation
//! backend. Every page descriptor receives a [`Session`] explicitly; there is
//! no global browser. Backends:
//!
//! - [`MockSession`](crate::MockSession) - in-memory catalog app for tests
//! - `CdpSession` - Chromium over CDP (`browser` feature)

use crate::element::{Element, ElementList};
use crate::locator::Locator;
use crate::result::{PageError, PageResult};
use crate::wait::{self, WaitOptions};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default base URL of the application under test
pub const DEFAULT_BASE_URL: &str = "http://localhost:8085";

/// Environment variable carrying the base URL to test processes
pub const BASE_URL_ENV: &str = "PAGEWRIGHT_BASE_URL";

/// Environment variable carrying the element wait timeout
pub const WAIT_TIMEOUT_ENV: &str = "PAGEWRIGHT_WAIT_TIMEOUT_MS";

/// Automation backend driven by page objects.
///
/// All methods resolve the locator afresh on each call.
#[async_trait]
pub trait BrowserSession: Send + Sync + fmt::Debug {
    /// Load an absolute URL
    async fn load_url(&self, url: &str) -> PageResult<()>;

    /// URL currently displayed
    async fn current_url(&self) -> PageResult<String>;

    /// Number of elements matched by the locator
    async fn count(&self, locator: &Locator) -> PageResult<usize>;

    /// Visible text of every element matched by the locator
    async fn texts(&self, locator: &Locator) -> PageResult<Vec<String>>;

    /// Click the first element matched by the locator.
    ///
    /// Fails with [`PageError::ElementNotFound`] when nothing matches.
    async fn click(&self, locator: &Locator) -> PageResult<()>;

    /// Visible text of the first matched element
    async fn text(&self, locator: &Locator) -> PageResult<String> {
        self.texts(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PageError::ElementNotFound {
                locator: locator.to_string(),
            })
    }
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Base URL prepended to relative URLs
    pub base_url: String,
    /// Timeout for element waits in milliseconds
    pub wait_timeout_ms: u64,
    /// Polling interval for element waits in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            wait_timeout_ms: wait::DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: wait::DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl SessionConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the element wait timeout
    #[must_use]
    pub const fn with_wait_timeout(mut self, timeout_ms: u64) -> Self {
        self.wait_timeout_ms = timeout_ms;
        self
    }

    /// Set the polling interval for element waits
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Defaults overridden by `PAGEWRIGHT_*` variables, as exported by the
    /// e2e harness. Unparsable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(base_url) = lookup(BASE_URL_ENV) {
            config.base_url = base_url;
        }
        if let Some(timeout_ms) = lookup(WAIT_TIMEOUT_ENV).and_then(|v| v.parse().ok()) {
            config.wait_timeout_ms = timeout_ms;
        }
        config
    }

    /// Variables that reproduce this config through [`SessionConfig::from_env`]
    #[must_use]
    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            (BASE_URL_ENV, self.base_url.clone()),
            (WAIT_TIMEOUT_ENV, self.wait_timeout_ms.to_string()),
        ]
    }

    /// Wait options derived from this config
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: self.wait_timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// Resolve a possibly relative URL against the base URL
    #[must_use]
    pub fn resolve_url(&self, url: &str) -> String {
        if url.contains("://") || self.base_url.is_empty() {
            return url.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

/// Shared handle to one automation session.
///
/// Cheap to clone; every page object built on the same session drives the
/// same browser.
#[derive(Clone)]
pub struct Session {
    backend: Arc<dyn BrowserSession>,
    config: Arc<SessionConfig>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.backend)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl Session {
    /// Create a session with the default configuration
    #[must_use]
    pub fn new(backend: impl BrowserSession + 'static) -> Self {
        Self::with_config(backend, SessionConfig::default())
    }

    /// Create a session with a custom configuration
    #[must_use]
    pub fn with_config(backend: impl BrowserSession + 'static, config: SessionConfig) -> Self {
        Self::from_shared(Arc::new(backend), config)
    }

    /// Create a session over an already shared backend
    #[must_use]
    pub fn from_shared(backend: Arc<dyn BrowserSession>, config: SessionConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
        }
    }

    /// Session configuration
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The automation backend
    #[must_use]
    pub fn backend(&self) -> &dyn BrowserSession {
        self.backend.as_ref()
    }

    /// Load a URL, relative URLs resolved against the base URL
    pub async fn load_url(&self, url: &str) -> PageResult<()> {
        let resolved = self.config.resolve_url(url);
        tracing::debug!(url = %resolved, "loading url");
        self.backend.load_url(&resolved).await
    }

    /// URL currently displayed
    pub async fn current_url(&self) -> PageResult<String> {
        self.backend.current_url().await
    }

    /// Handle to the first element matched by the locator
    #[must_use]
    pub fn element(&self, locator: Locator) -> Element {
        Element::new(self.clone(), locator)
    }

    /// Handle to every element matched by the locator
    #[must_use]
    pub fn all(&self, locator: Locator) -> ElementList {
        ElementList::new(self.clone(), locator)
    }

    /// Wait until the locator matches at least one element
    pub async fn wait_for(&self, locator: Locator) -> PageResult<Element> {
        let options = self.config.wait_options();
        let backend = self.backend.clone();
        let target = locator.clone();
        wait::wait_for(&options, locator.to_string(), move || {
            let backend = backend.clone();
            let target = target.clone();
            async move { Ok(backend.count(&target).await? > 0) }
        })
        .await?;
        Ok(self.element(locator))
    }
}
