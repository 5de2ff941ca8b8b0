//! Span context helpers for the application and post-processing runs.

use std::future::Future;

use tracing::{Span, span::Entered};
use uuid::Uuid;

use crate::init::build_sha;

/// Guard that keeps the application-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the application-level tracing span for the lifetime of the guard.
    #[must_use]
    pub fn new(mode: impl Into<String>) -> Self {
        let mode = mode.into();
        let span: &'static Span = Box::leak(Box::new(
            tracing::info_span!("app", mode = %mode, build_sha = %build_sha()),
        ));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

/// Record the current application mode on the active span.
pub fn record_app_mode(mode: &str) {
    Span::current().record("mode", tracing::field::display(mode));
}

/// Identifier of the post-processing run executing on this task, if any.
#[must_use]
pub fn current_run_id() -> Option<Uuid> {
    ACTIVE_RUN.try_with(|run_id| *run_id).ok()
}

/// Execute the future with `run_id` visible to [`current_run_id`].
pub async fn with_run_context<Fut, T>(run_id: Uuid, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    ACTIVE_RUN.scope(run_id, fut).await
}

tokio::task_local! {
    static ACTIVE_RUN: Uuid;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_context_guard_sets_app_mode_field() {
        let guard = GlobalContextGuard::new("test");
        record_app_mode("watch");
        drop(guard);
    }

    #[tokio::test]
    async fn run_context_is_scoped_to_future() {
        let run_id = Uuid::from_u128(99);
        let seen = with_run_context(run_id, async { current_run_id() }).await;
        assert_eq!(seen, Some(run_id));
        assert!(current_run_id().is_none());
    }
}
