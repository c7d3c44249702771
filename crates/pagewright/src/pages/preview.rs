use super::load_listing;
use crate::element::Element;
use crate::locator::{Locator, Selector};
use crate::navigation::Navigation;
use crate::page_object::{PageContext, PageDescriptor, PageObject, Property};
use crate::result::PageResult;
use crate::session::Session;
use async_trait::async_trait;

const MODAL_TITLE: &str = ".modal-title";
const MODAL_CLOSE: &str = ".modal-footer button";

/// Preview modal of one product, opened from the listing
#[derive(Debug, Clone)]
pub struct ProductPreviewPage {
    page: PageObject,
    product_id: String,
    title: Property<Element>,
    close_button: Property<Element>,
}

struct PreviewRecipe {
    product_id: String,
}

#[async_trait]
impl PageDescriptor for PreviewRecipe {
    async fn navigate(&self, nav: &Navigation) -> PageResult<()> {
        load_listing(nav).await?;

        let session = nav.session();
        session
            .element(Locator::by_id(&self.product_id))
            .element(Selector::class_name("preview"))
            .click()
            .await?;
        let _title = session.wait_for(Locator::by_css(MODAL_TITLE)).await?;

        nav.complete_navigation()
    }
}

impl ProductPreviewPage {
    /// Open the preview of product `id` on `session`
    pub fn open(session: &Session, id: impl Into<String>) -> PageResult<Self> {
        let product_id = id.into();
        let mut builder = PageObject::builder(format!("ProductPreview({product_id})"), session);
        let title = builder.property("title", |page: PageContext| async move {
            Ok(page.element(Locator::by_css(MODAL_TITLE)))
        })?;
        let close_button = builder.property("closeButton", |page: PageContext| async move {
            Ok(page.element(Locator::by_css(MODAL_CLOSE)))
        })?;

        let page = builder.navigate(PreviewRecipe {
            product_id: product_id.clone(),
        });
        Ok(Self {
            page,
            product_id,
            title,
            close_button,
        })
    }

    /// The underlying page object
    #[must_use]
    pub const fn page(&self) -> &PageObject {
        &self.page
    }

    /// Id of the previewed product
    #[must_use]
    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    /// Wait for navigation to settle
    pub async fn ready(&self) -> PageResult<()> {
        self.page.ready().await
    }

    /// Modal title element
    pub async fn title(&self) -> PageResult<Element> {
        self.title.get().await
    }

    /// Modal close button
    pub async fn close_button(&self) -> PageResult<Element> {
        self.close_button.get().await
    }
}
