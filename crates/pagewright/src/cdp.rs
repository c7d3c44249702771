//! Chromium backend over the Chrome `DevTools` Protocol.
//!
//! Locators are compiled to script expressions (see
//! [`Locator::to_query`]) and evaluated in the page, so every query sees the
//! live DOM.

use crate::locator::Locator;
use crate::result::{PageError, PageResult};
use crate::session::BrowserSession;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Chromium launch options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromiumConfig {
    /// Run without a window
    pub headless: bool,
    /// Path to the chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for ChromiumConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl ChromiumConfig {
    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Browser session backed by a real Chromium page
#[derive(Debug)]
pub struct CdpSession {
    browser: Arc<Mutex<Browser>>,
    page: Page,
    handler: tokio::task::JoinHandle<()>,
}

impl CdpSession {
    /// Launch Chromium and open a blank page
    pub async fn launch(config: &ChromiumConfig) -> PageResult<Self> {
        let mut builder = BrowserConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(PageError::driver)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| PageError::driver(e.to_string()))?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| PageError::driver(e.to_string()))?;
        tracing::debug!("chromium session launched");

        Ok(Self {
            browser: Arc::new(Mutex::new(browser)),
            page,
            handler,
        })
    }

    /// Close the browser
    pub async fn close(self) -> PageResult<()> {
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(|e| PageError::driver(e.to_string()))?;
        self.handler.abort();
        Ok(())
    }

    async fn eval<T: DeserializeOwned>(&self, expr: String) -> PageResult<T> {
        let result = self
            .page
            .evaluate(expr)
            .await
            .map_err(|e| PageError::driver(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| PageError::driver(e.to_string()))
    }
}

#[async_trait]
impl BrowserSession for CdpSession {
    async fn load_url(&self, url: &str) -> PageResult<()> {
        let _ = self
            .page
            .goto(url)
            .await
            .map_err(|e| PageError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> PageResult<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| PageError::driver(e.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    async fn count(&self, locator: &Locator) -> PageResult<usize> {
        self.eval(locator.to_count_query()).await
    }

    async fn texts(&self, locator: &Locator) -> PageResult<Vec<String>> {
        self.eval(locator.to_texts_query()).await
    }

    async fn click(&self, locator: &Locator) -> PageResult<()> {
        if self.eval::<bool>(locator.to_click_query()).await? {
            Ok(())
        } else {
            Err(PageError::ElementNotFound {
                locator: locator.to_string(),
            })
        }
    }
}
