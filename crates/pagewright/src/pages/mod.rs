//! Page descriptors for the product catalog.
//!
//! Each descriptor owns a [`PageObject`](crate::PageObject) and the typed
//! accessor handles declared on it. Opening one starts its navigation
//! immediately; accessors can be called right away and are answered once the
//! page has settled.

use crate::locator::Locator;
use crate::navigation::Navigation;
use crate::result::PageResult;
use crate::route::{Route, LISTING_ROUTE};

mod details;
mod listing;
mod preview;

pub use details::ProductDetailsPage;
pub use listing::ProductListingPage;
pub use preview::ProductPreviewPage;

/// Repeater expression of the listing's product rows
pub const PRODUCT_REPEATER: &str = "product in products track by $index";

/// Product table of the listing view
const LISTING_VIEW: &str = ".view table";

/// Start navigation on the listing and wait until its view has rendered.
///
/// The load event fires before the client-side router fills the view, so a
/// recipe must not query the listing until the table is there.
async fn load_listing(nav: &Navigation) -> PageResult<()> {
    let url = Route::new(LISTING_ROUTE).url(&[]);
    nav.start_navigation(Some(&url)).await?;
    let _table = nav.session().wait_for(Locator::by_css(LISTING_VIEW)).await?;
    Ok(())
}
