//! Prometheus metrics middleware.
//!
//! Provides HTTP request metrics, notification pipeline counters and the
//! Prometheus export endpoint.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::services::{DispatchReport, PipelineOutcome};
use metrics::{counter, histogram};
use std::sync::OnceLock;
use std::time::Instant;

/// Middleware to record HTTP request metrics.
///
/// Records the following metrics:
/// - `http_requests_total`: Counter with labels (method, path, status)
/// - `http_request_duration_seconds`: Histogram with labels (method, path)
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = method_to_str(req.method());
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(
        "http_requests_total",
        "method" => method,
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => path
    )
    .record(duration);

    response
}

/// Convert HTTP method to string for metric labels.
fn method_to_str(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::PATCH => "PATCH",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        _ => "OTHER",
    }
}

/// Records one run of the notification pipeline.
///
/// - `notifications_dispatched_total{outcome}` per run
/// - `notification_deliveries_total{channel, result}` per delivery unit
/// - `push_tokens_pruned_total`
pub fn record_pipeline_outcome(outcome: &PipelineOutcome) {
    counter!("notifications_dispatched_total", "outcome" => outcome.label()).increment(1);

    if let PipelineOutcome::Dispatched(report) = outcome {
        record_dispatch_report(report);
    }
}

fn record_dispatch_report(report: &DispatchReport) {
    let push = &report.push;
    counter!("notification_deliveries_total", "channel" => "push", "result" => "sent")
        .increment(push.tokens_sent as u64);
    counter!("notification_deliveries_total", "channel" => "push", "result" => "failed")
        .increment(push.tokens_failed as u64);
    counter!("push_tokens_pruned_total").increment(push.pruned.len() as u64);

    let feed_failed = report.feed.len() - report.feed_delivered();
    counter!("notification_deliveries_total", "channel" => "feed", "result" => "sent")
        .increment(report.feed_delivered() as u64);
    counter!("notification_deliveries_total", "channel" => "feed", "result" => "failed")
        .increment(feed_failed as u64);

    let email_failed = report.email.len() - report.emails_enqueued();
    counter!("notification_deliveries_total", "channel" => "email", "result" => "sent")
        .increment(report.emails_enqueued() as u64);
    counter!("notification_deliveries_total", "channel" => "email", "result" => "failed")
        .increment(email_failed as u64);
}

/// Records a sign-in role resolution.
pub fn record_role_resolution(role: &'static str) {
    counter!("role_resolutions_total", "role" => role).increment(1);
}

/// Records a pipeline run that hit the dispatch deadline.
pub fn record_pipeline_timeout() {
    counter!("notifications_dispatched_total", "outcome" => "timed_out").increment(1);
}

/// Records one mail outbox delivery attempt.
pub fn record_mail_delivery(result: &'static str) {
    counter!("mail_outbox_deliveries_total", "result" => result).increment(1);
}

static PROMETHEUS_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Handler for /metrics endpoint that returns Prometheus text format.
pub async fn metrics_handler() -> impl IntoResponse {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
    } else {
        (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            [(axum::http::header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        )
    }
}

/// Installs the Prometheus recorder.
///
/// Must be called once during startup before any metrics are recorded.
pub fn init_metrics() -> Result<(), metrics_exporter_prometheus::BuildError> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .set_buckets(&[0.001, 0.005, 0.01, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0])?
        .install_recorder()?;

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Prometheus recorder already initialized");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::services::{DeliveryOutcome, PushReport};
    use uuid::Uuid;

    #[test]
    fn test_method_to_str() {
        assert_eq!(method_to_str(&Method::GET), "GET");
        assert_eq!(method_to_str(&Method::PATCH), "PATCH");
        assert_eq!(method_to_str(&Method::TRACE), "OTHER");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let report = DispatchReport {
            push: PushReport {
                chunks: vec![DeliveryOutcome::Delivered],
                tokens_sent: 2,
                tokens_failed: 1,
                pruned: vec!["stale".to_string()],
            },
            feed: vec![(Uuid::new_v4(), DeliveryOutcome::Delivered)],
            email: vec![(
                "a@depauw.edu".to_string(),
                DeliveryOutcome::Failed("queue down".to_string()),
            )],
        };

        record_pipeline_outcome(&PipelineOutcome::Dispatched(report));
        record_pipeline_outcome(&PipelineOutcome::NoChanges);
        record_role_resolution("student");
    }
}
