use crate::element::Element;
use crate::locator::Locator;
use crate::navigation::Navigation;
use crate::page_object::{Action, PageContext, PageDescriptor, PageObject, Property};
use crate::result::PageResult;
use crate::route::{Route, DETAILS_ROUTE};
use crate::session::Session;
use async_trait::async_trait;

/// Details screen of one product, reached by URL
#[derive(Debug, Clone)]
pub struct ProductDetailsPage {
    page: PageObject,
    heading: Property<Element>,
    fields: Property<Vec<String>>,
    field: Action<String, Option<String>>,
}

struct DetailsRecipe {
    url: String,
}

#[async_trait]
impl PageDescriptor for DetailsRecipe {
    async fn navigate(&self, nav: &Navigation) -> PageResult<()> {
        nav.start_navigation(Some(&self.url)).await?;
        let _fields = nav.session().wait_for(Locator::by_css("li")).await?;
        nav.complete_navigation()
    }
}

impl ProductDetailsPage {
    /// Open the details of product `id` on `session`
    pub fn open(session: &Session, id: &str) -> PageResult<Self> {
        let mut builder = PageObject::builder(format!("ProductDetails({id})"), session);
        let heading = builder.property("heading", |page: PageContext| async move {
            Ok(page.element(Locator::by_css("h1")))
        })?;
        let fields = builder.property("fields", |page: PageContext| async move {
            page.all(Locator::by_css("li")).texts().await
        })?;
        let field = builder.action("field", {
            let fields = fields.clone();
            move |_page: PageContext, label: String| {
                let fields = fields.clone();
                async move {
                    let prefix = format!("{label}: ");
                    Ok(fields
                        .get()
                        .await?
                        .into_iter()
                        .find_map(|line| line.strip_prefix(&prefix).map(str::to_string)))
                }
            }
        })?;

        let url = Route::new(DETAILS_ROUTE).url(&[("id", id)]);
        Ok(Self {
            page: builder.navigate(DetailsRecipe { url }),
            heading,
            fields,
            field,
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

    /// Page heading element
    pub async fn heading(&self) -> PageResult<Element> {
        self.heading.get().await
    }

    /// Text of every detail line, e.g. `"Name: Samsung Galaxy S6"`
    pub async fn fields(&self) -> PageResult<Vec<String>> {
        self.fields.get().await
    }

    /// Value of the detail line labelled `label`
    pub async fn field(&self, label: impl Into<String>) -> PageResult<Option<String>> {
        self.field.call(label.into()).await
    }
}
