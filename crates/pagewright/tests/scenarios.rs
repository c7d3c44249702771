//! End-to-end scenarios for the catalog page objects.
//!
//! Every scenario opens a page descriptor on a simulated catalog session and
//! asserts through accessors only, the way a browser suite would.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use async_trait::async_trait;
use pagewright::prelude::*;
use pagewright::{AccessorKind, Product};
use std::sync::Arc;
use std::time::Duration;

fn catalog_session() -> (MockSession, Session) {
    let mock = MockSession::catalog();
    (mock.clone(), Session::new(mock))
}

fn slow_session(latency_ms: u64) -> (MockSession, Session) {
    let mock = MockSession::catalog().with_latency(Duration::from_millis(latency_ms));
    (mock.clone(), Session::new(mock))
}

fn late_render_session(delay_ms: u64) -> (MockSession, Session) {
    let mock = MockSession::catalog().with_render_delay(Duration::from_millis(delay_ms));
    (mock.clone(), Session::new(mock))
}

// ============================================================================
// Product listing
// ============================================================================

#[tokio::test]
async fn test_listing_shows_catalog() {
    let (mock, session) = catalog_session();
    let listing = ProductListingPage::open(&session).unwrap();

    assert_eq!(listing.product_count().await.unwrap(), 2);
    let row = listing.product_row("prod-1").await.unwrap();
    assert!(row.is_present().await.unwrap());
    assert_eq!(
        mock.history()[0],
        "load_url:http://localhost:8085/#/products-listing"
    );
}

#[tokio::test]
async fn test_listing_declares_accessors() {
    let (_mock, session) = catalog_session();
    let listing = ProductListingPage::open(&session).unwrap();
    let page = listing.page();

    assert_eq!(page.name(), "ProductListing");
    assert_eq!(page.accessor_names(), vec!["getProductRow", "productCount"]);
    assert_eq!(page.accessor_kind("productCount"), Some(AccessorKind::Property));
}

#[tokio::test]
async fn test_missing_row_is_not_present() {
    let (_mock, session) = catalog_session();
    let listing = ProductListingPage::open(&session).unwrap();

    let row = listing.product_row("prod-9").await.unwrap();
    assert!(!row.is_present().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_reads_before_completion_are_deferred() {
    let (_mock, session) = slow_session(40);
    let listing = ProductListingPage::open(&session).unwrap();

    // issued while the listing URL is still loading
    let count = listing.product_count();
    assert_eq!(listing.page().phase(), NavigationPhase::NotStarted);
    assert_eq!(count.await.unwrap(), 2);
    assert_eq!(listing.page().phase(), NavigationPhase::Complete);
}

#[tokio::test(start_paused = true)]
async fn test_deferred_reads_reach_browser_in_issue_order() {
    let (mock, session) = slow_session(25);
    let listing = ProductListingPage::open(&session).unwrap();

    let (count, name) = tokio::join!(listing.product_count(), async {
        let row = listing.product_row("prod-2").await?;
        row.element(Selector::css("td a")).text().await
    });
    assert_eq!(count.unwrap(), 2);
    assert_eq!(name.unwrap(), "Samsung Galaxy S6 Edge");

    let history = mock.history();
    assert_eq!(history.len(), 4);
    assert!(history[0].starts_with("load_url:"));
    assert_eq!(history[1], "count:by.css(\".view table\")");
    assert!(history[2].starts_with("count:by.repeater"));
    assert!(history[3].starts_with("texts:by.id(\"prod-2\")"));
}

#[tokio::test(start_paused = true)]
async fn test_listing_waits_for_router_to_render() {
    let (mock, session) = late_render_session(120);
    let listing = ProductListingPage::open(&session).unwrap();

    assert_eq!(listing.product_count().await.unwrap(), 2);
    let view_checks = mock
        .history()
        .iter()
        .filter(|call| call.as_str() == "count:by.css(\".view table\")")
        .count();
    assert!(view_checks > 1);
}

struct ListingOnly;

#[async_trait]
impl PageDescriptor for ListingOnly {
    async fn navigate(&self, nav: &Navigation) -> PageResult<()> {
        nav.start_navigation(Some("#/products-listing")).await?;
        nav.complete_navigation()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_queued_calls_reach_browser_in_issue_order_across_threads() {
    let (mock, session) = slow_session(30);
    let mut builder = PageObject::builder("ListingOnly", &session);
    let present = builder
        .action("isPresent", |page: PageContext, id: String| async move {
            page.element(Locator::by_id(id)).is_present().await
        })
        .unwrap();
    let _page = builder.navigate(ListingOnly);
    let present = Arc::new(present);

    let mut calls = Vec::new();
    for i in 0..6 {
        let present = present.clone();
        calls.push(tokio::spawn(async move {
            present.call(format!("p{i}")).await
        }));
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    for call in calls {
        assert!(!call.await.unwrap().unwrap());
    }

    let reads: Vec<String> = mock
        .history()
        .into_iter()
        .filter(|call| call.starts_with("count:by.id("))
        .collect();
    let expected: Vec<String> = (0..6)
        .map(|i| format!("count:by.id(\"p{i}\")"))
        .collect();
    assert_eq!(reads, expected);
}

#[tokio::test]
async fn test_property_reads_are_not_cached() {
    let (mock, session) = catalog_session();
    let listing = ProductListingPage::open(&session).unwrap();
    assert_eq!(listing.product_count().await.unwrap(), 2);

    let mut catalog = Product::default_catalog();
    catalog.push(Product::new("prod-3", "Samsung Galaxy S7", "650.00"));
    mock.set_catalog(catalog);

    assert_eq!(listing.product_count().await.unwrap(), 3);
}

// ============================================================================
// Product preview
// ============================================================================

#[tokio::test]
async fn test_preview_shows_product_name() {
    let (mock, session) = catalog_session();
    let preview = ProductPreviewPage::open(&session, "prod-1").unwrap();

    let title = preview.title().await.unwrap();
    assert_eq!(title.text().await.unwrap(), "Preview of Samsung Galaxy S6");
    let close = preview.close_button().await.unwrap();
    assert!(close.is_present().await.unwrap());
    assert_eq!(mock.open_preview().as_deref(), Some("prod-1"));
}

#[tokio::test]
async fn test_preview_close_button_dismisses_modal() {
    let (mock, session) = catalog_session();
    let preview = ProductPreviewPage::open(&session, "prod-2").unwrap();

    preview.close_button().await.unwrap().click().await.unwrap();
    assert_eq!(mock.open_preview(), None);
    let title = preview.title().await.unwrap();
    assert!(!title.is_present().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_preview_title_waits_for_modal() {
    let (mock, session) = slow_session(30);
    let preview = ProductPreviewPage::open(&session, "prod-1").unwrap();

    let text = async { preview.title().await?.text().await };
    assert_eq!(text.await.unwrap(), "Preview of Samsung Galaxy S6");
    assert!(mock.was_called("click:by.id(\"prod-1\") > by.className(\"preview\")"));
}

#[tokio::test(start_paused = true)]
async fn test_preview_waits_for_listing_before_clicking() {
    let (mock, session) = late_render_session(120);
    let preview = ProductPreviewPage::open(&session, "prod-2").unwrap();

    let title = preview.title().await.unwrap();
    assert_eq!(title.text().await.unwrap(), "Preview of Samsung Galaxy S6 Edge");
    assert_eq!(mock.open_preview().as_deref(), Some("prod-2"));
}

#[tokio::test]
async fn test_preview_of_missing_product_fails_navigation() {
    let (_mock, session) = catalog_session();
    let preview = ProductPreviewPage::open(&session, "prod-9").unwrap();

    let err = preview.ready().await.unwrap_err();
    assert!(matches!(err, PageError::NavigationFailed(_)));
    assert!(matches!(err.root(), PageError::ElementNotFound { .. }));
    assert!(err.to_string().contains("prod-9"));

    let err = preview.title().await.unwrap_err();
    assert!(matches!(err.root(), PageError::ElementNotFound { .. }));
    assert!(preview.close_button().await.is_err());
    assert_eq!(preview.page().phase(), NavigationPhase::Started);
}

// ============================================================================
// Product details
// ============================================================================

#[tokio::test]
async fn test_details_lists_product_fields() {
    let (mock, session) = catalog_session();
    let details = ProductDetailsPage::open(&session, "prod-2").unwrap();

    let heading = details.heading().await.unwrap();
    assert_eq!(heading.text().await.unwrap(), "Products details");
    assert_eq!(details.fields().await.unwrap().len(), 3);
    assert_eq!(
        details.field("Name").await.unwrap().as_deref(),
        Some("Samsung Galaxy S6 Edge")
    );
    assert_eq!(details.field("Colour").await.unwrap(), None);
    assert_eq!(
        session.current_url().await.unwrap(),
        "http://localhost:8085/#/product-details/prod-2"
    );
    assert!(!mock.was_called("click"));
}

#[tokio::test]
async fn test_details_reached_from_listing_link() {
    let (_mock, session) = catalog_session();
    let listing = ProductListingPage::open(&session).unwrap();
    let row = listing.product_row("prod-1").await.unwrap();
    row.element(Selector::css("td a")).click().await.unwrap();

    assert_eq!(
        session.current_url().await.unwrap(),
        "http://localhost:8085/#/product-details/prod-1"
    );
}

// ============================================================================
// Custom descriptors
// ============================================================================

struct Abstract;

impl PageDescriptor for Abstract {}

struct StartsTwice;

#[async_trait]
impl PageDescriptor for StartsTwice {
    async fn navigate(&self, nav: &Navigation) -> PageResult<()> {
        nav.start_navigation(Some("#/products-listing")).await?;
        nav.start_navigation(None).await?;
        nav.complete_navigation()
    }
}

struct NeverCompletes;

#[async_trait]
impl PageDescriptor for NeverCompletes {
    async fn navigate(&self, nav: &Navigation) -> PageResult<()> {
        nav.start_navigation(Some("#/products-listing")).await
    }
}

#[tokio::test]
async fn test_descriptor_without_recipe() {
    let (mock, session) = catalog_session();
    let mut builder = PageObject::builder("Abstract", &session);
    let heading = builder
        .property("heading", |page: PageContext| async move {
            page.element(Locator::by_css("h1")).text().await
        })
        .unwrap();
    let page = builder.navigate(Abstract);

    let err = page.ready().await.unwrap_err();
    assert!(matches!(err.root(), PageError::NotImplemented { .. }));
    assert!(heading.get().await.is_err());
    assert!(mock.history().is_empty());
}

#[tokio::test]
async fn test_double_start_fails_page() {
    let (_mock, session) = catalog_session();
    let page = PageObject::builder("StartsTwice", &session).navigate(StartsTwice);

    let err = page.ready().await.unwrap_err();
    assert!(matches!(err.root(), PageError::Lifecycle { .. }));
    assert!(err.is_programming_error());
}

#[tokio::test]
async fn test_recipe_that_never_completes() {
    let (_mock, session) = catalog_session();
    let mut builder = PageObject::builder("NeverCompletes", &session);
    let count = builder
        .property("count", |page: PageContext| async move {
            page.all(Locator::by_css("tr")).count().await
        })
        .unwrap();
    let page = builder.navigate(NeverCompletes);

    let err = count.get().await.unwrap_err();
    assert!(matches!(err.root(), PageError::NavigationNotComplete { .. }));
    assert!(err.to_string().contains("complete_navigation"));
    assert_eq!(page.phase(), NavigationPhase::Started);
}

#[tokio::test]
async fn test_pages_on_one_session_are_independent() {
    let (_mock, session) = catalog_session();
    let broken = ProductPreviewPage::open(&session, "prod-9").unwrap();
    assert!(broken.ready().await.is_err());

    let listing = ProductListingPage::open(&session).unwrap();
    assert_eq!(listing.product_count().await.unwrap(), 2);
    assert_ne!(broken.page().id(), listing.page().id());
}
