//! Event and attendee report handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use domain::models::report::{CreateReportRequest, ListReportsResponse};
use domain::models::Report;
use persistence::repositories::ReportRepository;
use shared::pagination::{PageInfo, PageRequest};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{OptionalUserAuth, UserAuth};
use crate::routes::events::load_event;

/// File a report against an event or one of its attendees.
///
/// POST /api/v1/reports
pub async fn create_report(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<Report>), ApiError> {
    request.validate()?;
    request.validate_target()?;

    let event = load_event(&state, request.event_id).await?;
    let report = ReportRepository::new(state.pool.clone())
        .create(&event, auth.user_id, &auth.email, &request)
        .await?;

    info!(
        report_id = %report.id,
        event_id = %event.id,
        kind = report.kind.as_str(),
        "Report filed"
    );

    Ok((StatusCode::CREATED, Json(report)))
}

/// List reports for review. Admin only.
///
/// GET /api/v1/admin/reports
pub async fn list_reports(
    State(state): State<AppState>,
    auth: OptionalUserAuth,
    Query(page): Query<PageRequest>,
) -> Result<Json<ListReportsResponse>, ApiError> {
    state.roles.require_admin(auth.caller().as_ref()).await?;

    let page = page.normalized();
    let (reports, total) = ReportRepository::new(state.pool.clone())
        .list(page.limit(), page.offset())
        .await?;

    Ok(Json(ListReportsResponse {
        reports,
        pagination: PageInfo::new(page, total),
    }))
}
