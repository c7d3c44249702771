//! Navigation lifecycle and the settle signal.
//!
//! A page object reaches its screen through a *navigation sequence*: start,
//! zero or more browser steps, complete. [`NavigationState`] records where
//! that sequence is and owns the single-resolution signal that every accessor
//! waits on.
//!
//! ```text
//!   NotStarted ──start──► Started ──complete──► Complete
//!                                      │
//!            signal: Pending ──────────┴──► Complete | Failed(err)
//! ```
//!
//! Accessor calls enter a FIFO gate, wait for the signal, and run their body
//! while still holding their turn, so the browser sees them in the order they
//! were issued. Calls issued early are deferred, not rejected. A body that
//! calls another accessor of the same page runs it inside its own turn.

use crate::result::{PageError, PageResult};
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{watch, Semaphore};
use uuid::Uuid;

tokio::task_local! {
    /// Pages whose gate turn the current task holds
    static TURNS: Vec<Uuid>;
}

/// Lifecycle phase of a page object's navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NavigationPhase {
    /// `start_navigation` has not run
    #[default]
    NotStarted,
    /// Navigation steps are in flight
    Started,
    /// The page reached its target state
    Complete,
}

impl fmt::Display for NavigationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not started",
            Self::Started => "started",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
enum Settlement {
    Pending,
    Complete,
    Failed(Arc<PageError>),
}

impl Settlement {
    const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Navigation state owned by exactly one page object
#[derive(Debug)]
pub struct NavigationState {
    page: String,
    id: Uuid,
    phase: Mutex<NavigationPhase>,
    signal: watch::Sender<Settlement>,
    gate: Semaphore,
}

impl NavigationState {
    /// Create the state for a page in the `NotStarted` phase
    #[must_use]
    pub fn new(page: impl Into<String>) -> Self {
        let (signal, _) = watch::channel(Settlement::Pending);
        Self {
            page: page.into(),
            id: Uuid::new_v4(),
            phase: Mutex::new(NavigationPhase::NotStarted),
            signal,
            gate: Semaphore::new(1),
        }
    }

    /// Page object name
    #[must_use]
    pub fn page(&self) -> &str {
        &self.page
    }

    /// Unique id of the owning page object instance
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> NavigationPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the signal has resolved, successfully or not
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.signal.borrow().is_pending()
    }

    /// Transition `NotStarted` → `Started`
    pub fn start(&self) -> PageResult<()> {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if *phase != NavigationPhase::NotStarted {
            return Err(PageError::lifecycle(
                &self.page,
                format!("navigation already started (phase: {phase})"),
            ));
        }
        *phase = NavigationPhase::Started;
        tracing::debug!(page = %self.page, id = %self.id, "navigation started");
        Ok(())
    }

    /// Transition `Started` → `Complete` and release every queued accessor
    pub fn complete(&self) -> PageResult<()> {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        match *phase {
            NavigationPhase::Started => {}
            NavigationPhase::NotStarted => {
                return Err(PageError::lifecycle(&self.page, "navigation not started"));
            }
            NavigationPhase::Complete => {
                return Err(PageError::lifecycle(&self.page, "navigation already complete"));
            }
        }
        let completed = self.signal.send_if_modified(|settlement| {
            if settlement.is_pending() {
                *settlement = Settlement::Complete;
                true
            } else {
                false
            }
        });
        if !completed {
            return Err(PageError::lifecycle(&self.page, "navigation already failed"));
        }
        *phase = NavigationPhase::Complete;
        tracing::debug!(page = %self.page, id = %self.id, "navigation complete");
        Ok(())
    }

    /// Resolve the signal as failed.
    ///
    /// Returns `false` when the signal had already resolved; a page that
    /// completed stays complete.
    pub fn fail(&self, error: PageError) -> bool {
        let error = match error {
            PageError::NavigationFailed(inner) => inner,
            other => Arc::new(other),
        };
        let resolved = self.signal.send_if_modified(|settlement| {
            if settlement.is_pending() {
                *settlement = Settlement::Failed(error.clone());
                true
            } else {
                false
            }
        });
        if resolved {
            tracing::warn!(page = %self.page, id = %self.id, %error, "navigation failed");
        }
        resolved
    }

    /// Wait for the signal to resolve
    pub async fn settled(&self) -> PageResult<()> {
        let mut rx = self.signal.subscribe();
        let settlement = rx
            .wait_for(|s| !s.is_pending())
            .await
            .map(|settled| Settlement::clone(&settled))
            .unwrap_or(Settlement::Pending);
        match settlement {
            Settlement::Complete => Ok(()),
            Settlement::Failed(error) => Err(PageError::NavigationFailed(error)),
            Settlement::Pending => Err(PageError::NavigationNotComplete {
                page: self.page.clone(),
            }),
        }
    }

    /// Queue behind earlier callers, wait for the signal, then run `body`.
    ///
    /// The turn is held until `body` finishes, so bodies reach the session
    /// one at a time in issue order. Inside a turn, further calls on the same
    /// page run directly instead of queueing behind themselves. The turn is
    /// tracked per task: a body that spawns a task calling this page's
    /// accessors must not wait on that task.
    pub async fn admitted<T, F>(&self, body: F) -> PageResult<T>
    where
        F: Future<Output = PageResult<T>>,
    {
        let held = TURNS.try_with(|turns| turns.contains(&self.id)).unwrap_or(false);
        if held {
            self.settled().await?;
            return body.await;
        }

        let _turn = self
            .gate
            .acquire()
            .await
            .map_err(|_| PageError::NavigationNotComplete {
                page: self.page.clone(),
            })?;
        self.settled().await?;
        let mut turns = TURNS.try_with(|turns| turns.clone()).unwrap_or_default();
        turns.push(self.id);
        TURNS.scope(turns, body).await
    }
}

/// Handle given to navigation recipes.
///
/// Exposes the lifecycle primitives and the session the recipe drives.
#[derive(Debug, Clone)]
pub struct Navigation {
    state: Arc<NavigationState>,
    session: Session,
}

impl Navigation {
    /// Create a handle over a page's state
    #[must_use]
    pub fn new(state: Arc<NavigationState>, session: Session) -> Self {
        Self { state, session }
    }

    /// Flag the start of navigation, loading `url` as the first step when given
    pub async fn start_navigation(&self, url: Option<&str>) -> PageResult<()> {
        self.state.start()?;
        if let Some(url) = url {
            self.session.load_url(url).await?;
        }
        Ok(())
    }

    /// Flag the end of navigation, releasing queued accessor calls
    pub fn complete_navigation(&self) -> PageResult<()> {
        self.state.complete()
    }

    /// Session driven by this navigation
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Navigation state of the page
    #[must_use]
    pub fn state(&self) -> &NavigationState {
        &self.state
    }
}
