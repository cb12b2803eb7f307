//! Detached handlers run after an event write.
//!
//! The HTTP response does not wait for them. A crash between the write and
//! the end of the dispatch loses the remaining deliveries; push chunks that
//! were already sent stay sent.

use std::time::Duration;

use domain::models::Event;
use domain::services::{NotificationPipeline, PipelineOutcome};
use persistence::repositories::SavedEventRepository;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::app::AppState;
use crate::middleware::metrics::{record_pipeline_outcome, record_pipeline_timeout};

/// Runs the notification pipeline under a deadline.
///
/// Returns `None` when the deadline passed first.
pub async fn run_event_updated(
    pipeline: &NotificationPipeline,
    deadline: Duration,
    before: &Event,
    after: &Event,
) -> Option<PipelineOutcome> {
    match tokio::time::timeout(deadline, pipeline.on_event_updated(Some(before), Some(after))).await
    {
        Ok(outcome) => {
            record_pipeline_outcome(&outcome);
            match &outcome {
                PipelineOutcome::Dispatched(report) => tracing::info!(
                    push_tokens = report.push.tokens_sent,
                    push_pruned = report.push.pruned.len(),
                    feed_delivered = report.feed_delivered(),
                    emails_enqueued = report.emails_enqueued(),
                    failures = report.failures(),
                    "Event change notifications dispatched"
                ),
                other => tracing::debug!(outcome = other.label(), "Event change not dispatched"),
            }
            Some(outcome)
        }
        Err(_) => {
            record_pipeline_timeout();
            tracing::error!(
                timeout_secs = deadline.as_secs(),
                "Event change dispatch timed out, remaining deliveries dropped"
            );
            None
        }
    }
}

/// Spawns the post-update work for one event: refreshes saved summaries and
/// fans out change notifications.
pub fn spawn_event_updated(
    state: &AppState,
    before: Event,
    after: Event,
    request_id: String,
) -> JoinHandle<()> {
    let pipeline = state.pipeline.clone();
    let saved = SavedEventRepository::new(state.pool.clone());
    let deadline = state.config.notifications.dispatch_timeout();
    let span = tracing::info_span!(
        "event_updated",
        event_id = %after.id,
        request_id = %request_id
    );

    tokio::spawn(
        async move {
            match saved.refresh_summaries(&after).await {
                Ok(0) => {}
                Ok(n) => tracing::debug!(refreshed = n, "Saved event summaries refreshed"),
                Err(e) => tracing::warn!(error = %e, "Failed to refresh saved event summaries"),
            }

            run_event_updated(&pipeline, deadline, &before, &after).await;
        }
        .instrument(span),
    )
}
