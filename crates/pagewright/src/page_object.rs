//! Page Object base: guarded accessors over a navigating page.
//!
//! A concrete page is assembled from two parts:
//!
//! - an accessor table, declared through [`PageObjectBuilder`]: every
//!   [`Property`] and [`Action`] is wrapped once, at registration, with the
//!   navigation guard;
//! - a navigation recipe, a [`PageDescriptor`] run once when the page is
//!   opened.
//!
//! ```ignore
//! let mut builder = PageObjectBuilder::new("ProductListing", &session);
//! let product_count = builder.property("productCount", |page: PageContext| async move {
//!     page.all(Locator::by_repeater(PRODUCT_REPEATER)).count().await
//! })?;
//! let page = builder.navigate(ListingRoute);
//!
//! // Deferred until ListingRoute calls complete_navigation
//! assert_eq!(product_count.get().await?, 2);
//! ```
//!
//! Accessor calls made while navigation is still running are queued and run,
//! in issue order, once it completes. If navigation fails they all return
//! the navigation error.

use crate::element::{Element, ElementList};
use crate::locator::Locator;
use crate::navigation::{Navigation, NavigationPhase, NavigationState};
use crate::result::{PageError, PageResult};
use crate::session::Session;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Kind of a declared accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    /// Read-only value, re-evaluated on every read
    Property,
    /// Callable taking arguments
    Action,
}

/// Navigation recipe of a page descriptor.
///
/// Implementations call [`Navigation::start_navigation`], perform their
/// browser steps, then [`Navigation::complete_navigation`].
#[async_trait]
pub trait PageDescriptor: Send + Sync + 'static {
    /// Bring the browser into this page's state
    async fn navigate(&self, nav: &Navigation) -> PageResult<()> {
        Err(PageError::NotImplemented {
            page: nav.state().page().to_string(),
        })
    }
}

/// The page as seen by accessor implementations
#[derive(Debug, Clone)]
pub struct PageContext {
    state: Arc<NavigationState>,
    session: Session,
}

impl PageContext {
    /// Page object name
    #[must_use]
    pub fn page_name(&self) -> &str {
        self.state.page()
    }

    /// Current navigation phase
    #[must_use]
    pub fn phase(&self) -> NavigationPhase {
        self.state.phase()
    }

    /// Session the page drives
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Handle to the first element matched by the locator
    #[must_use]
    pub fn element(&self, locator: Locator) -> Element {
        self.session.element(locator)
    }

    /// Handle to every element matched by the locator
    #[must_use]
    pub fn all(&self, locator: Locator) -> ElementList {
        self.session.all(locator)
    }
}

type Getter<T> = dyn Fn(PageContext) -> BoxFuture<'static, PageResult<T>> + Send + Sync;
type Handler<A, T> = dyn Fn(PageContext, A) -> BoxFuture<'static, PageResult<T>> + Send + Sync;

/// Guarded read-only accessor
pub struct Property<T> {
    name: &'static str,
    context: PageContext,
    getter: Arc<Getter<T>>,
}

impl<T> Property<T> {
    /// Accessor name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Read the property once navigation has settled
    pub async fn get(&self) -> PageResult<T> {
        let context = self.context.clone();
        self.context
            .state
            .admitted(async move {
                tracing::trace!(page = %context.page_name(), property = self.name, "read");
                (self.getter)(context).await
            })
            .await
    }
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            context: self.context.clone(),
            getter: self.getter.clone(),
        }
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("page", &self.context.page_name())
            .finish()
    }
}

/// Guarded callable accessor
pub struct Action<A, T> {
    name: &'static str,
    context: PageContext,
    handler: Arc<Handler<A, T>>,
}

impl<A, T> Action<A, T> {
    /// Accessor name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Invoke the action with `args` once navigation has settled
    pub async fn call(&self, args: A) -> PageResult<T> {
        let context = self.context.clone();
        self.context
            .state
            .admitted(async move {
                tracing::trace!(page = %context.page_name(), action = self.name, "call");
                (self.handler)(context, args).await
            })
            .await
    }
}

impl<A, T> Clone for Action<A, T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            context: self.context.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<A, T> fmt::Debug for Action<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("page", &self.context.page_name())
            .finish()
    }
}

/// Builder declaring a page's accessor table
#[derive(Debug)]
pub struct PageObjectBuilder {
    context: PageContext,
    accessors: BTreeMap<&'static str, AccessorKind>,
}

impl PageObjectBuilder {
    /// Start declaring a page named `name` on `session`
    #[must_use]
    pub fn new(name: impl Into<String>, session: &Session) -> Self {
        Self {
            context: PageContext {
                state: Arc::new(NavigationState::new(name)),
                session: session.clone(),
            },
            accessors: BTreeMap::new(),
        }
    }

    fn register(&mut self, name: &'static str, kind: AccessorKind) -> PageResult<()> {
        if self.accessors.contains_key(name) {
            return Err(PageError::DuplicateAccessor {
                page: self.context.page_name().to_string(),
                name: name.to_string(),
            });
        }
        let _ = self.accessors.insert(name, kind);
        Ok(())
    }

    /// Declare a property
    pub fn property<T, F, Fut>(&mut self, name: &'static str, getter: F) -> PageResult<Property<T>>
    where
        F: Fn(PageContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PageResult<T>> + Send + 'static,
        T: 'static,
    {
        self.register(name, AccessorKind::Property)?;
        Ok(Property {
            name,
            context: self.context.clone(),
            getter: Arc::new(move |page| Box::pin(getter(page))),
        })
    }

    /// Declare an action
    pub fn action<A, T, F, Fut>(&mut self, name: &'static str, handler: F) -> PageResult<Action<A, T>>
    where
        F: Fn(PageContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PageResult<T>> + Send + 'static,
        A: 'static,
        T: 'static,
    {
        self.register(name, AccessorKind::Action)?;
        Ok(Action {
            name,
            context: self.context.clone(),
            handler: Arc::new(move |page, args| Box::pin(handler(page, args))),
        })
    }

    /// Finish the table and start navigating with `descriptor`.
    ///
    /// The recipe runs on a spawned task, so this must be called within a
    /// Tokio runtime. The returned page is usable immediately; its accessors
    /// wait for the recipe to complete.
    pub fn navigate<D: PageDescriptor>(self, descriptor: D) -> PageObject {
        let state = self.context.state.clone();
        let nav = Navigation::new(state.clone(), self.context.session.clone());
        let span = tracing::debug_span!("navigation", page = %state.page(), id = %state.id());
        let guard = AbandonGuard(state);

        tokio::spawn(
            async move {
                let guard = guard;
                if let Err(error) = descriptor.navigate(&nav).await {
                    let message = error.to_string();
                    if !guard.0.fail(error) {
                        tracing::warn!(%message, "navigation step failed after the page settled");
                    }
                }
            }
            .instrument(span),
        );

        PageObject {
            context: self.context,
            accessors: Arc::new(self.accessors),
        }
    }
}

/// Resolves a still-pending signal when the recipe ends or is dropped
/// without completing.
struct AbandonGuard(Arc<NavigationState>);

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        let _ = self.0.fail(PageError::NavigationNotComplete {
            page: self.0.page().to_string(),
        });
    }
}

/// A navigating page with its declared accessor table
#[derive(Debug, Clone)]
pub struct PageObject {
    context: PageContext,
    accessors: Arc<BTreeMap<&'static str, AccessorKind>>,
}

impl PageObject {
    /// Start declaring a page
    #[must_use]
    pub fn builder(name: impl Into<String>, session: &Session) -> PageObjectBuilder {
        PageObjectBuilder::new(name, session)
    }

    /// Page object name
    #[must_use]
    pub fn name(&self) -> &str {
        self.context.page_name()
    }

    /// Unique id of this instance
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.context.state.id()
    }

    /// Current navigation phase
    #[must_use]
    pub fn phase(&self) -> NavigationPhase {
        self.context.phase()
    }

    /// Session the page drives
    #[must_use]
    pub fn session(&self) -> &Session {
        self.context.session()
    }

    /// Kind of the accessor declared as `name`
    #[must_use]
    pub fn accessor_kind(&self, name: &str) -> Option<AccessorKind> {
        self.accessors.get(name).copied()
    }

    /// Declared accessor names, sorted
    #[must_use]
    pub fn accessor_names(&self) -> Vec<&'static str> {
        self.accessors.keys().copied().collect()
    }

    /// Wait for the navigation recipe to settle.
    ///
    /// Rejects with the recipe's failure; the original error is reachable
    /// through [`PageError::root`].
    pub async fn ready(&self) -> PageResult<()> {
        self.context.state.settled().await
    }
}
