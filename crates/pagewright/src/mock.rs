//! In-memory simulation of the product catalog app.
//!
//! [`MockSession`] renders the catalog's screens (listing, preview modal,
//! details) as a small element tree on every query and resolves locators
//! against it. Clicks drive the same transitions as the real app. It records
//! a call history for verification, like a mock driver, and can add latency
//! to every browser operation so tests can interleave with navigation.
//!
//! ```ignore
//! let mock = MockSession::catalog();
//! let session = Session::new(mock.clone());
//! let listing = ProductListingPage::open(&session)?;
//! assert_eq!(listing.product_count().await?, 2);
//! assert!(mock.was_called("load_url"));
//! ```

use crate::locator::{Locator, Selector};
use crate::pages::PRODUCT_REPEATER;
use crate::result::{PageError, PageResult};
use crate::route::{Route, DETAILS_ROUTE, LISTING_ROUTE};
use crate::session::BrowserSession;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

const BLANK_URL: &str = "about:blank";
const PLACEHOLDER_IMAGE: &str = "http://placehold.it/350x350";

/// A product in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product id, also the listing row's element id
    pub id: String,
    /// Display name
    pub name: String,
    /// Price as displayed
    pub price: String,
    /// Image URL
    pub image: String,
}

impl Product {
    /// Create a product with the placeholder image
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price: price.into(),
            image: PLACEHOLDER_IMAGE.to_string(),
        }
    }

    /// The two-entry catalog served by the app
    #[must_use]
    pub fn default_catalog() -> Vec<Self> {
        vec![
            Self::new("prod-1", "Samsung Galaxy S6", "420.00"),
            Self::new("prod-2", "Samsung Galaxy S6 Edge", "500.00"),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Screen {
    Blank,
    Listing,
    Details(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Click {
    OpenPreview(String),
    ClosePreview,
    Route(String),
}

#[derive(Debug)]
struct AppState {
    catalog: Vec<Product>,
    url: String,
    screen: Screen,
    preview: Option<String>,
    history: Vec<String>,
    render_delay: Duration,
    view_ready_at: Option<Instant>,
}

/// Simulated browser session over the catalog app
#[derive(Debug, Clone)]
pub struct MockSession {
    state: Arc<Mutex<AppState>>,
    latency: Option<Duration>,
}

impl Default for MockSession {
    fn default() -> Self {
        Self::catalog()
    }
}

impl MockSession {
    /// Session over the default catalog
    #[must_use]
    pub fn catalog() -> Self {
        Self::with_catalog(Product::default_catalog())
    }

    /// Session over a custom catalog
    #[must_use]
    pub fn with_catalog(catalog: Vec<Product>) -> Self {
        Self {
            state: Arc::new(Mutex::new(AppState {
                catalog,
                url: BLANK_URL.to_string(),
                screen: Screen::Blank,
                preview: None,
                history: Vec::new(),
                render_delay: Duration::ZERO,
                view_ready_at: None,
            })),
            latency: None,
        }
    }

    /// Delay every browser operation by `latency`
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Render each routed view only `delay` after the route changes, the way
    /// a client-side router fills its view after the page load event
    #[must_use]
    pub fn with_render_delay(self, delay: Duration) -> Self {
        self.lock().render_delay = delay;
        self
    }

    /// Replace the catalog; the next query sees the re-rendered page
    pub fn set_catalog(&self, catalog: Vec<Product>) {
        self.lock().catalog = catalog;
    }

    /// Calls made so far, as `method:argument`
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    /// Check if a method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.lock().history.iter().any(|c| c.starts_with(method))
    }

    /// Id of the product whose preview modal is open
    #[must_use]
    pub fn open_preview(&self) -> Option<String> {
        self.lock().preview.clone()
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Log a call, then apply latency. History keeps issue order even when
    /// latency lets calls overlap.
    async fn enter(&self, call: String) -> MutexGuard<'_, AppState> {
        self.lock().history.push(call);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.lock()
    }
}

impl AppState {
    fn route(&mut self, url: &str) {
        self.preview = None;
        self.view_ready_at = Some(Instant::now() + self.render_delay);
        if Route::new(LISTING_ROUTE).matches(url) {
            self.url = url.to_string();
            self.screen = Screen::Listing;
        } else if let Some(mut params) = Route::new(DETAILS_ROUTE).captures(url) {
            self.url = url.to_string();
            self.screen = Screen::Details(params.remove("id").unwrap_or_default());
        } else {
            let base = url.split_once('#').map_or(url, |(base, _)| base);
            self.url = format!("{base}{}", Route::new(LISTING_ROUTE).url(&[]));
            self.screen = Screen::Listing;
        }
    }

    fn apply(&mut self, click: Click) {
        match click {
            Click::OpenPreview(id) => self.preview = Some(id),
            Click::ClosePreview => self.preview = None,
            Click::Route(fragment) => {
                let base = self.url.split_once('#').map_or(self.url.as_str(), |(base, _)| base);
                let url = format!("{base}{fragment}");
                self.route(&url);
            }
        }
    }

    fn render(&self) -> Node {
        let body = Node::new("body");
        if self.view_ready_at.is_some_and(|at| Instant::now() < at) {
            return body;
        }
        match &self.screen {
            Screen::Blank => body,
            Screen::Listing => {
                let body = body.child(self.render_listing());
                match self.preview_product() {
                    Some(product) => body.child(render_preview(product)),
                    None => body,
                }
            }
            Screen::Details(id) => body.child(self.render_details(id)),
        }
    }

    fn preview_product(&self) -> Option<&Product> {
        let id = self.preview.as_ref()?;
        self.catalog.iter().find(|p| &p.id == id)
    }

    fn render_listing(&self) -> Node {
        let header = Node::new("tr").children(
            ["ID", "NAME", "PRICE", "PREVIEW"]
                .into_iter()
                .map(|label| Node::new("th").with_text(label)),
        );
        let rows = self.catalog.iter().map(|product| {
            let details = Route::new(DETAILS_ROUTE).url(&[("id", product.id.as_str())]);
            Node::new("tr")
                .attr("id", &product.id)
                .attr("ng-repeat", PRODUCT_REPEATER)
                .child(Node::new("td").with_text(&product.id))
                .child(
                    Node::new("td").child(
                        Node::new("a")
                            .attr("href", &details)
                            .with_text(&product.name)
                            .on_click(Click::Route(details.clone())),
                    ),
                )
                .child(Node::new("td").with_text(&product.price))
                .child(
                    Node::new("td").child(
                        Node::new("a")
                            .attr("class", "preview")
                            .on_click(Click::OpenPreview(product.id.clone()))
                            .child(Node::new("img").attr("src", &product.image)),
                    ),
                )
        });

        Node::new("div")
            .attr("class", "view")
            .child(Node::new("h1").with_text("Products listing"))
            .child(
                Node::new("table")
                    .attr("class", "table table-bordered table-striped")
                    .child(header)
                    .children(rows),
            )
    }

    fn render_details(&self, id: &str) -> Node {
        let (id, name, price) = self
            .catalog
            .iter()
            .find(|p| p.id == id)
            .map_or(("", "", ""), |p| (p.id.as_str(), p.name.as_str(), p.price.as_str()));
        Node::new("div")
            .attr("class", "view")
            .child(Node::new("h1").with_text("Products details"))
            .child(
                Node::new("ul")
                    .child(Node::new("li").with_text(format!("ID: {id}")))
                    .child(Node::new("li").with_text(format!("Name: {name}")))
                    .child(Node::new("li").with_text(format!("Price: {price}"))),
            )
    }
}

fn render_preview(product: &Product) -> Node {
    Node::new("div").attr("class", "modal").child(
        Node::new("div").attr("class", "modal-content").children([
            Node::new("div").attr("class", "modal-header").child(
                Node::new("h3")
                    .attr("class", "modal-title")
                    .with_text(format!("Preview of {}", product.name)),
            ),
            Node::new("div")
                .attr("class", "modal-body")
                .child(Node::new("img").attr("src", &product.image)),
            Node::new("div").attr("class", "modal-footer").child(
                Node::new("button")
                    .attr("class", "btn btn-primary")
                    .with_text("Close")
                    .on_click(Click::ClosePreview),
            ),
        ]),
    )
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn load_url(&self, url: &str) -> PageResult<()> {
        self.enter(format!("load_url:{url}")).await.route(url);
        Ok(())
    }

    async fn current_url(&self) -> PageResult<String> {
        Ok(self.enter("current_url".to_string()).await.url.clone())
    }

    async fn count(&self, locator: &Locator) -> PageResult<usize> {
        let state = self.enter(format!("count:{locator}")).await;
        let document = state.render();
        Ok(resolve(&document, locator)?.len())
    }

    async fn texts(&self, locator: &Locator) -> PageResult<Vec<String>> {
        let state = self.enter(format!("texts:{locator}")).await;
        let document = state.render();
        Ok(resolve(&document, locator)?
            .iter()
            .map(|hit| hit.node.text_content())
            .collect())
    }

    async fn click(&self, locator: &Locator) -> PageResult<()> {
        let mut state = self.enter(format!("click:{locator}")).await;
        let document = state.render();
        let hits = resolve(&document, locator)?;
        let hit = hits.first().ok_or_else(|| PageError::ElementNotFound {
            locator: locator.to_string(),
        })?;
        // clicks bubble to the nearest handler
        let handler = std::iter::once(hit.node)
            .chain(hit.ancestors.iter().rev().copied())
            .find_map(|node| node.on_click.clone());
        if let Some(click) = handler {
            state.apply(click);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
struct Node {
    tag: &'static str,
    attrs: Vec<(&'static str, String)>,
    text: String,
    children: Vec<Node>,
    on_click: Option<Click>,
}

impl Node {
    fn new(tag: &'static str) -> Self {
        Self {
            tag,
            ..Self::default()
        }
    }

    fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }

    fn on_click(mut self, click: Click) -> Self {
        self.on_click = Some(click);
        self
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    fn has_class(&self, class: &str) -> bool {
        self.get("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    fn text_content(&self) -> String {
        let mut parts = Vec::new();
        if !self.text.is_empty() {
            parts.push(self.text.clone());
        }
        parts.extend(
            self.children
                .iter()
                .map(Self::text_content)
                .filter(|t| !t.is_empty()),
        );
        parts.join(" ")
    }
}

struct Hit<'a> {
    node: &'a Node,
    ancestors: Vec<&'a Node>,
}

/// Resolve every step but the last to its first match, then return all
/// matches of the last step.
fn resolve<'a>(document: &'a Node, locator: &Locator) -> PageResult<Vec<Hit<'a>>> {
    let Some((last, scopes)) = locator.steps().split_last() else {
        return Ok(Vec::new());
    };
    let mut scope = Hit {
        node: document,
        ancestors: Vec::new(),
    };
    for step in scopes {
        match find(&scope, &Matcher::compile(step)?).into_iter().next() {
            Some(hit) => scope = hit,
            None => return Ok(Vec::new()),
        }
    }
    Ok(find(&scope, &Matcher::compile(last)?))
}

fn find<'a>(scope: &Hit<'a>, matcher: &Matcher) -> Vec<Hit<'a>> {
    fn walk<'a>(node: &'a Node, ancestors: &mut Vec<&'a Node>, matcher: &Matcher, out: &mut Vec<Hit<'a>>) {
        ancestors.push(node);
        for child in &node.children {
            if matcher.matches(child, ancestors) {
                out.push(Hit {
                    node: child,
                    ancestors: ancestors.clone(),
                });
            }
            walk(child, ancestors, matcher, out);
        }
        let _ = ancestors.pop();
    }

    let mut ancestors = scope.ancestors.clone();
    let mut out = Vec::new();
    walk(scope.node, &mut ancestors, matcher, &mut out);
    out
}

enum Matcher {
    Id(String),
    Class(String),
    Repeater(String),
    /// Comma-separated groups of descendant-combined compounds
    Css(Vec<Vec<Compound>>),
}

impl Matcher {
    fn compile(selector: &Selector) -> PageResult<Self> {
        Ok(match selector {
            Selector::Id(id) => Self::Id(id.clone()),
            Selector::ClassName(name) => Self::Class(name.clone()),
            Selector::Repeater(expr) => Self::Repeater(expr.clone()),
            Selector::Css(css) => Self::Css(
                split_outside_brackets(css, |c| c == ',')
                    .into_iter()
                    .map(|group| {
                        split_outside_brackets(group, char::is_whitespace)
                            .into_iter()
                            .map(|part| Compound::parse(part, css))
                            .collect::<PageResult<Vec<_>>>()
                    })
                    .collect::<PageResult<Vec<_>>>()?,
            ),
        })
    }

    fn matches(&self, node: &Node, ancestors: &[&Node]) -> bool {
        match self {
            Self::Id(id) => node.get("id") == Some(id.as_str()),
            Self::Class(name) => node.has_class(name),
            Self::Repeater(expr) => {
                node.get("ng-repeat") == Some(expr.as_str())
                    || node.get("data-ng-repeat") == Some(expr.as_str())
            }
            Self::Css(groups) => groups.iter().any(|group| matches_descendant(group, node, ancestors)),
        }
    }
}

fn matches_descendant(compounds: &[Compound], node: &Node, ancestors: &[&Node]) -> bool {
    let Some((subject, outer)) = compounds.split_last() else {
        return false;
    };
    if !subject.matches(node) {
        return false;
    }
    let mut remaining = outer.iter().rev().peekable();
    for ancestor in ancestors.iter().rev() {
        match remaining.peek() {
            Some(compound) if compound.matches(ancestor) => {
                let _ = remaining.next();
            }
            Some(_) => {}
            None => break,
        }
    }
    remaining.peek().is_none()
}

#[derive(Debug, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
}

impl Compound {
    fn parse(source: &str, css: &str) -> PageResult<Self> {
        let invalid = || PageError::driver(format!("unsupported CSS selector: {css}"));
        let is_start = |c: char| matches!(c, '.' | '#' | '[');

        let mut compound = Self::default();
        let tag_end = source.find(is_start).unwrap_or(source.len());
        let tag = &source[..tag_end];
        if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '*') {
            return Err(invalid());
        }
        if !tag.is_empty() && tag != "*" {
            compound.tag = Some(tag.to_ascii_lowercase());
        }

        let mut rest = &source[tag_end..];
        while let Some(marker) = rest.chars().next() {
            match marker {
                '.' | '#' => {
                    let body = &rest[1..];
                    let end = body.find(is_start).unwrap_or(body.len());
                    let name = &body[..end];
                    if name.is_empty() {
                        return Err(invalid());
                    }
                    if marker == '.' {
                        compound.classes.push(name.to_string());
                    } else {
                        compound.id = Some(name.to_string());
                    }
                    rest = &body[end..];
                }
                '[' => {
                    let end = rest.find(']').ok_or_else(invalid)?;
                    let (name, value) = rest[1..end].split_once('=').ok_or_else(invalid)?;
                    let value = value.trim().trim_matches(|c: char| c == '"' || c == '\'');
                    compound.attrs.push((name.trim().to_string(), value.to_string()));
                    rest = &rest[end + 1..];
                }
                _ => return Err(invalid()),
            }
        }
        Ok(compound)
    }

    fn matches(&self, node: &Node) -> bool {
        self.tag.as_deref().map_or(true, |tag| tag == node.tag)
            && self.id.as_deref().map_or(true, |id| node.get("id") == Some(id))
            && self.classes.iter().all(|class| node.has_class(class))
            && self
                .attrs
                .iter()
                .all(|(name, value)| node.get(name) == Some(value.as_str()))
    }
}

/// Split on `is_separator`, ignoring separators inside `[...]`
fn split_outside_brackets(source: &str, is_separator: impl Fn(char) -> bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_usize;
    let mut start = 0;
    for (i, c) in source.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            c if depth == 0 && is_separator(c) => {
                parts.push(&source[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&source[start..]);
    parts.into_iter().map(str::trim).filter(|p| !p.is_empty()).collect()
}
