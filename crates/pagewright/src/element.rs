//! Lazily resolved element handles.
//!
//! An [`Element`] is a session plus a locator. Creating one performs no
//! browser work; every method resolves the locator again, so a handle always
//! reflects the page as it is when queried.

use crate::locator::{Locator, Selector};
use crate::result::PageResult;
use crate::session::Session;

/// Handle to the first element matched by a locator
#[derive(Debug, Clone)]
pub struct Element {
    session: Session,
    locator: Locator,
}

impl Element {
    /// Create a handle
    #[must_use]
    pub fn new(session: Session, locator: Locator) -> Self {
        Self { session, locator }
    }

    /// The locator this handle resolves
    #[must_use]
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Handle to a descendant of this element
    #[must_use]
    pub fn element(&self, selector: Selector) -> Self {
        Self::new(self.session.clone(), self.locator.clone().child(selector))
    }

    /// Handle to every matching descendant of this element
    #[must_use]
    pub fn all(&self, selector: Selector) -> ElementList {
        ElementList::new(self.session.clone(), self.locator.clone().child(selector))
    }

    /// Click the element
    pub async fn click(&self) -> PageResult<()> {
        tracing::trace!(locator = %self.locator, "click");
        self.session.backend().click(&self.locator).await
    }

    /// Visible text of the element
    pub async fn text(&self) -> PageResult<String> {
        self.session.backend().text(&self.locator).await
    }

    /// Whether the element currently exists on the page
    pub async fn is_present(&self) -> PageResult<bool> {
        Ok(self.session.backend().count(&self.locator).await? > 0)
    }
}

/// Handle to every element matched by a locator
#[derive(Debug, Clone)]
pub struct ElementList {
    session: Session,
    locator: Locator,
}

impl ElementList {
    /// Create a handle
    #[must_use]
    pub fn new(session: Session, locator: Locator) -> Self {
        Self { session, locator }
    }

    /// The locator this handle resolves
    #[must_use]
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Number of matched elements
    pub async fn count(&self) -> PageResult<usize> {
        self.session.backend().count(&self.locator).await
    }

    /// Visible text of every matched element
    pub async fn texts(&self) -> PageResult<Vec<String>> {
        self.session.backend().texts(&self.locator).await
    }

    /// Handle to the first matched element
    #[must_use]
    pub fn first(&self) -> Element {
        Element::new(self.session.clone(), self.locator.clone())
    }
}
