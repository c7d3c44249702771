//! Pagewright: page objects that wait for their own navigation.
//!
//! A page object declares how to reach its screen (load a URL, click a
//! control, wait for a modal) and which values can be read from it. Reads
//! issued while the screen is still being reached are queued and answered,
//! in issue order, once navigation completes.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  open   ┌──────────────┐ spawn  ┌──────────────────┐
//! │ Scenario   │────────►│ PageObject   │───────►│ Navigation recipe│
//! │ (tests)    │         │ accessors    │        │ start → steps →  │
//! └────────────┘         └──────┬───────┘        │ complete         │
//!        ▲    get()/call()      │ admitted        └────────┬─────────┘
//!        └──────────────────────┤                          │
//!                        ┌──────▼───────┐   settle signal  │
//!                        │ Navigation   │◄─────────────────┘
//!                        │ State        │
//!                        └──────┬───────┘
//!                               ▼
//!                        ┌──────────────┐
//!                        │ Session      │  MockSession | CdpSession
//!                        └──────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pagewright::{MockSession, ProductPreviewPage, Session};
//!
//! let session = Session::new(MockSession::catalog());
//! let preview = ProductPreviewPage::open(&session, "prod-1")?;
//! let title = preview.title().await?.text().await?;
//! assert_eq!(title, "Preview of Samsung Galaxy S6");
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod element;
mod locator;
mod mock;
mod navigation;
mod page_object;
pub mod pages;
mod result;
pub mod route;
mod session;
mod wait;

/// Chromium backend (requires the `browser` feature)
#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc)]
pub mod cdp;

pub use element::{Element, ElementList};
pub use locator::{Locator, Selector};
pub use mock::{MockSession, Product};
pub use navigation::{Navigation, NavigationPhase, NavigationState};
pub use page_object::{
    AccessorKind, Action, PageContext, PageDescriptor, PageObject, PageObjectBuilder, Property,
};
pub use pages::{ProductDetailsPage, ProductListingPage, ProductPreviewPage, PRODUCT_REPEATER};
pub use result::{PageError, PageResult};
pub use route::Route;
pub use session::{
    BrowserSession, Session, SessionConfig, BASE_URL_ENV, DEFAULT_BASE_URL, WAIT_TIMEOUT_ENV,
};
pub use wait::{wait_for, WaitOptions, WaitResult, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};

#[cfg(feature = "browser")]
pub use cdp::{CdpSession, ChromiumConfig};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        Action, BrowserSession, Element, ElementList, Locator, MockSession, Navigation,
        NavigationPhase, PageContext, PageDescriptor, PageError, PageObject, PageResult,
        ProductDetailsPage, ProductListingPage, ProductPreviewPage, Property, Selector, Session,
        SessionConfig,
    };
}
