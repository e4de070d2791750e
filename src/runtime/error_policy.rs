//! # Error Policy
//!
//! Requeue decisions for failed dispatches and watch stream errors.

use crate::controller::dispatcher::DispatchError;
use crate::crd::ResourceKey;
use crate::observability;
use crate::runtime::context::ControllerRuntime;
use kube::Resource;
use kube_runtime::controller::Action;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Upper bound of the watch restart backoff (milliseconds)
const MAX_WATCH_BACKOFF_MS: u64 = 30_000;

/// Decide when a failed dispatch runs again
///
/// - Conflicts requeue after a short fixed delay and do not consume a retry attempt
/// - Errors no redelivery can fix wait for the next change
/// - Anything else consumes the resource's retry execution; once exhausted the
///   resource waits for the next change
pub fn handle_dispatch_error<K>(
    obj: &Arc<K>,
    error: &DispatchError,
    ctx: &Arc<ControllerRuntime<K>>,
) -> Action
where
    K: Resource + Clone + Send + Sync + 'static,
{
    let key = ResourceKey::from_resource(obj.as_ref());
    let controller = ctx.controller_name();

    if error.is_conflict() {
        info!(
            resource = %key,
            delay_ms = ctx.conflict_requeue().as_millis(),
            "Write conflict, redelivering with fresh state"
        );
        observability::increment_requeues(controller, "conflict");
        return Action::requeue(ctx.conflict_requeue());
    }

    if !error.is_retryable() {
        error!(resource = %key, error = %error, "Dispatch failed permanently, waiting for the next change");
        ctx.reset_retry(&key);
        return Action::await_change();
    }

    match ctx.record_failure(&key) {
        Some(delay) => {
            let next_trigger_time = chrono::Utc::now()
                + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
            warn!(
                resource = %key,
                error = %error,
                delay_secs = delay.as_secs(),
                next_retry = %next_trigger_time.to_rfc3339(),
                "Dispatch failed, retrying with backoff"
            );
            observability::increment_requeues(controller, "error_backoff");
            Action::requeue(delay)
        }
        None => {
            error!(
                resource = %key,
                error = %error,
                "Retries exhausted, waiting for the next change"
            );
            Action::await_change()
        }
    }
}

/// Handle watch stream errors with appropriate classification and backoff
///
/// Returns `None` to filter out the error (allow restart) or `Some(())` to continue.
pub async fn handle_watch_stream_error(
    error_string: &str,
    backoff: &Arc<AtomicU64>,
    watch_restart_delay: Duration,
) -> Option<()> {
    // Dispatch failures were already handled by the dispatch error policy
    if error_string.contains("ReconcilerFailed") {
        return Some(());
    }

    let is_not_found = error_string.contains("ObjectNotFound")
        || error_string.contains("404")
        || error_string.contains("not found");
    let is_401 =
        (error_string.contains("401") || error_string.contains("Unauthorized")) && !is_not_found;
    let is_410 = error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone");
    let is_429 = error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests");

    if is_401 {
        error!("Watch authentication failed (401 Unauthorized) - RBAC may have been revoked or token expired");
        warn!(
            "Waiting {}s before retrying watch (RBAC may need time to propagate)...",
            watch_restart_delay.as_secs()
        );
        tokio::time::sleep(watch_restart_delay).await;
        None
    } else if is_410 {
        warn!(error_type = "410", "Watch resource version expired, watch will restart");
        None
    } else if is_429 {
        let current_backoff = backoff.load(Ordering::Relaxed);
        warn!(
            "API server storage reinitializing (429), backing off for {}ms before restart...",
            current_backoff
        );
        tokio::time::sleep(Duration::from_millis(current_backoff)).await;
        let new_backoff = current_backoff.saturating_mul(2).min(MAX_WATCH_BACKOFF_MS);
        backoff.store(new_backoff, Ordering::Relaxed);
        None
    } else if is_not_found {
        warn!(
            "Resource not found (404) - normal if it was deleted or the CRD is missing. Error: {}",
            error_string
        );
        Some(())
    } else {
        error!("Controller stream error: {}", error_string);
        tokio::time::sleep(watch_restart_delay).await;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_watch_error_classification() {
        let backoff = Arc::new(AtomicU64::new(10));

        assert_eq!(
            handle_watch_stream_error("too old resource version", &backoff, Duration::ZERO).await,
            None
        );
        assert_eq!(
            handle_watch_stream_error("ObjectNotFound", &backoff, Duration::ZERO).await,
            Some(())
        );
        assert_eq!(
            handle_watch_stream_error("ReconcilerFailed(...)", &backoff, Duration::ZERO).await,
            Some(())
        );
    }

    #[tokio::test]
    async fn test_too_many_requests_doubles_backoff() {
        let backoff = Arc::new(AtomicU64::new(10));
        assert_eq!(
            handle_watch_stream_error("429 TooManyRequests", &backoff, Duration::ZERO).await,
            None
        );
        assert_eq!(backoff.load(Ordering::Relaxed), 20);
    }
}
