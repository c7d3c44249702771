//! Result and error types for pagewright.

use std::sync::Arc;
use thiserror::Error;

/// Result type for pagewright operations
pub type PageResult<T> = Result<T, PageError>;

/// Errors that can occur while navigating or querying a page
#[derive(Debug, Error)]
pub enum PageError {
    /// Navigation lifecycle invariant violated (double start, complete without start)
    #[error("Navigation lifecycle violated on {page}: {message}")]
    Lifecycle {
        /// Page object name
        page: String,
        /// What went wrong
        message: String,
    },

    /// The navigation recipe ended without reaching `complete_navigation`
    #[error(
        "Navigation of {page} is not complete! Make sure complete_navigation is called \
         before querying the page"
    )]
    NavigationNotComplete {
        /// Page object name
        page: String,
    },

    /// The navigation hook was never provided for this page
    #[error("Navigation recipe for {page} is not implemented")]
    NotImplemented {
        /// Page object name
        page: String,
    },

    /// Two accessors were registered under the same name
    #[error("Accessor `{name}` declared twice on {page}")]
    DuplicateAccessor {
        /// Page object name
        page: String,
        /// Accessor name
        name: String,
    },

    /// Navigation failed; carries the original failure to every waiter
    #[error(transparent)]
    NavigationFailed(Arc<PageError>),

    /// No element matched the locator
    #[error("No element found using locator: {locator}")]
    ElementNotFound {
        /// Locator description
        locator: String,
    },

    /// Loading a URL failed
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Automation backend error
    #[error("Browser driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PageError {
    /// Create a lifecycle error
    #[must_use]
    pub fn lifecycle(page: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Lifecycle {
            page: page.into(),
            message: message.into(),
        }
    }

    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// The underlying failure, looking through `NavigationFailed` carriers
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::NavigationFailed(inner) => inner.root(),
            other => other,
        }
    }

    /// Whether this error is a usage error in test code rather than a browser failure
    #[must_use]
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self.root(),
            Self::Lifecycle { .. }
                | Self::NavigationNotComplete { .. }
                | Self::NotImplemented { .. }
                | Self::DuplicateAccessor { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_message() {
        let err = PageError::lifecycle("ProductListing", "navigation already started");
        assert!(err.to_string().contains("ProductListing"));
        assert!(err.to_string().contains("already started"));
        assert!(err.is_programming_error());
    }

    #[test]
    fn test_navigation_failed_is_transparent() {
        let inner = PageError::ElementNotFound {
            locator: "by.id(\"prod-9\")".to_string(),
        };
        let expected = inner.to_string();
        let err = PageError::NavigationFailed(Arc::new(inner));
        assert_eq!(err.to_string(), expected);
        assert!(matches!(err.root(), PageError::ElementNotFound { .. }));
        assert!(!err.is_programming_error());
    }

    #[test]
    fn test_root_unwraps_nested_carriers() {
        let inner = PageError::NotImplemented {
            page: "Preview".to_string(),
        };
        let err = PageError::NavigationFailed(Arc::new(PageError::NavigationFailed(Arc::new(
            inner,
        ))));
        assert!(matches!(err.root(), PageError::NotImplemented { .. }));
        assert!(err.is_programming_error());
    }

    #[test]
    fn test_json_error_from() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: PageError = json_err.into();
        assert!(err.to_string().contains("JSON"));
    }
}
