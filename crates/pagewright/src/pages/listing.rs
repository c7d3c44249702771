use super::{load_listing, PRODUCT_REPEATER};
use crate::element::Element;
use crate::locator::Locator;
use crate::navigation::Navigation;
use crate::page_object::{Action, PageContext, PageDescriptor, PageObject, Property};
use crate::result::PageResult;
use crate::session::Session;
use async_trait::async_trait;

/// The product listing screen
#[derive(Debug, Clone)]
pub struct ProductListingPage {
    page: PageObject,
    product_count: Property<usize>,
    product_row: Action<String, Element>,
}

struct ListingRecipe;

#[async_trait]
impl PageDescriptor for ListingRecipe {
    async fn navigate(&self, nav: &Navigation) -> PageResult<()> {
        load_listing(nav).await?;
        nav.complete_navigation()
    }
}

impl ProductListingPage {
    /// Open the listing on `session`
    pub fn open(session: &Session) -> PageResult<Self> {
        let mut builder = PageObject::builder("ProductListing", session);
        let product_count = builder.property("productCount", |page: PageContext| async move {
            page.all(Locator::by_repeater(PRODUCT_REPEATER)).count().await
        })?;
        let product_row = builder.action("getProductRow", |page: PageContext, id: String| async move {
            Ok(page.element(Locator::by_id(id)))
        })?;

        Ok(Self {
            page: builder.navigate(ListingRecipe),
            product_count,
            product_row,
        })
    }

    /// The underlying page object
    #[must_use]
    pub const fn page(&self) -> &PageObject {
        &self.page
    }

    /// Wait for navigation to settle
    pub async fn ready(&self) -> PageResult<()> {
        self.page.ready().await
    }

    /// Number of product rows
    pub async fn product_count(&self) -> PageResult<usize> {
        self.product_count.get().await
    }

    /// Row of the product with `id`
    pub async fn product_row(&self, id: impl Into<String>) -> PageResult<Element> {
        self.product_row.call(id.into()).await
    }
}
