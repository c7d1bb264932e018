//! Guard for in-app route changes while a recording is bound to a report

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::recording::RecordingContext;

use super::controller::SessionController;
use super::ports::{DraftError, DraftSaver};

/// Result of a guarded route change
#[derive(Debug, Clone)]
pub enum NavigationOutcome {
    /// Nothing to protect; the route changed directly
    Allowed,
    /// The report draft was saved, then the route changed
    DraftSaved,
    /// Draft save failed but the caller forced the route change
    Forced(DraftError),
    /// Draft save failed; the user stays on the report
    Blocked(DraftError),
}

impl NavigationOutcome {
    pub fn proceeds(&self) -> bool {
        !matches!(self, Self::Blocked(_))
    }
}

/// Strip query, fragment and trailing slashes from an in-app route
pub fn normalize_route(route: &str) -> &str {
    let route = route.split(['?', '#']).next().unwrap_or(route);
    let trimmed = route.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

/// Whether `route` is the report page of `context`
pub fn is_report_route(route: &str, context: &RecordingContext) -> bool {
    normalize_route(route) == context.report_route()
}

/// Runs the "safe navigate" step when leaving the report page that owns
/// the active recording.
///
/// The guard only observes the session. It never pauses, saves or
/// discards it, so the recording keeps running on the next page.
pub struct NavigationGuard {
    session: Arc<dyn SessionController>,
    drafts: Arc<dyn DraftSaver>,
}

impl NavigationGuard {
    pub fn new(session: Arc<dyn SessionController>, drafts: Arc<dyn DraftSaver>) -> Self {
        Self { session, drafts }
    }

    /// Whether leaving `from` for `to` needs the safe-navigate step
    pub fn intercepts(&self, from: &str, to: &str) -> bool {
        let snapshot = self.session.snapshot();
        if !snapshot.status.is_active() {
            return false;
        }
        let Some(context) = snapshot.context else {
            return false;
        };
        is_report_route(from, &context) && !is_report_route(to, &context)
    }

    /// Guard a route change from `from` to `to`.
    ///
    /// # Arguments
    /// * `force` - Change route even when the draft could not be saved
    pub async fn navigate(&self, from: &str, to: &str, force: bool) -> NavigationOutcome {
        if !self.intercepts(from, to) {
            debug!(from, to, "navigation not intercepted");
            return NavigationOutcome::Allowed;
        }
        let Some(context) = self.session.snapshot().context else {
            return NavigationOutcome::Allowed;
        };

        match self.drafts.save_draft(&context).await {
            Ok(()) => {
                info!(from, to, "report draft saved before navigation");
                NavigationOutcome::DraftSaved
            }
            Err(err) if force => {
                warn!(error = %err, "draft save failed; navigating anyway");
                NavigationOutcome::Forced(err)
            }
            Err(err) => {
                warn!(error = %err, "draft save failed; navigation blocked");
                NavigationOutcome::Blocked(err)
            }
        }
    }
}
