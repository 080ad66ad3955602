use std::time::Duration;

use crate::attendance::filter::{AttendanceFilter, Period};
use crate::attendance::reconciler::{Reconciler, ScanAction};
use crate::attendance::scanner::{Notification, ScanDialog, SimulatedScanner, run_scan};
use crate::attendance::view::AttendanceView;
use crate::auth::credential::Credential;
use crate::client::attendance_store::{AttendanceStore, RecordQuery};
use crate::config::Config;
use crate::error::{ReconcileError, ScanFlowError};
use crate::model::attendance::{AttendanceRecord, MemberId};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceQuery {
    pub search: Option<String>,
    pub period: Option<Period>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub member_id: Option<String>,
    #[serde(rename = "type")]
    pub session_type: Option<String>,
    #[schema(value_type = Option<String>, format = DateTime, example = "2024-02-01T00:00:00")]
    pub start_date: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = DateTime, example = "2024-02-29T23:59:59")]
    pub end_date: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    #[schema(example = "MEM001")]
    pub member_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScanResponse {
    pub action: ScanAction,
    pub record: AttendanceRecord,
    pub notification: Notification,
}

impl From<AttendanceRecord> for ScanResponse {
    fn from(record: AttendanceRecord) -> Self {
        Self {
            action: ScanAction::of(&record),
            notification: Notification::for_record(&record),
            record,
        }
    }
}

/// Attendance panel
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(
        ("search", Query, description = "Case-insensitive match on member name or id"),
        ("period", Query, description = "all | today | thisWeek | thisMonth"),
        ("page", Query, description = "Zero-based page of the store's listing"),
        ("size", Query, description = "Records per page (1-100)"),
        ("memberId", Query, description = "Only this member's visits"),
        ("type", Query, description = "Only this session type"),
        ("startDate", Query, description = "Earliest check-in, ISO local date-time; also bounds the stats"),
        ("endDate", Query, description = "Latest check-in, ISO local date-time; also bounds the stats")
    ),
    responses(
        (status = 200, description = "Rendered rows, stats and an error banner if a fetch failed", body = AttendanceViewResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    credential: Credential,
    store: web::Data<dyn AttendanceStore>,
    query: web::Query<AttendanceQuery>,
) -> impl Responder {
    let query = query.into_inner();

    let record_query = RecordQuery {
        member_id: query.member_id.as_deref().and_then(MemberId::parse),
        session_type: query.session_type.filter(|t| !t.trim().is_empty()),
        page: query.page.unwrap_or(0),
        size: query.size.unwrap_or(20).clamp(1, 100),
        start_date: query.start_date,
        end_date: query.end_date,
    };
    let filter = AttendanceFilter {
        search_term: query.search.unwrap_or_default(),
        period: query.period.unwrap_or_default(),
    };

    let mut view = AttendanceView::new(store.into_inner());
    view.load(&record_query, &credential).await;

    HttpResponse::Ok().json(view.render(&filter))
}

/// Scan a member card
#[utoipa::path(
    post,
    path = "/api/attendance/scan",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Member checked in or out", body = ScanResponse),
        (status = 400, description = "Empty member id", body = Object, example = json!({
            "notification": { "kind": "error", "message": "member id must not be empty", "dismissible": true }
        })),
        (status = 502, description = "Neither check-in nor check-out was accepted", body = Object, example = json!({
            "notification": {
                "kind": "error",
                "message": "check-in failed: Conflict; check-out failed: Not Found",
                "dismissible": true
            }
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn scan(
    credential: Credential,
    reconciler: web::Data<Reconciler>,
    payload: web::Json<ScanRequest>,
) -> Result<HttpResponse, ReconcileError> {
    let record = reconciler
        .reconcile_scan(&payload.member_id, &credential)
        .await?;

    Ok(HttpResponse::Ok().json(ScanResponse::from(record)))
}

/// Run the front-desk scanner in simulation mode
#[utoipa::path(
    post,
    path = "/api/attendance/scanner/simulate",
    responses(
        (status = 200, description = "Simulated card was read and reconciled", body = ScanResponse),
        (status = 204, description = "Dialog closed without a read"),
        (status = 409, description = "The scanner is already reading", body = Object, example = json!({
            "notification": { "kind": "error", "message": "scanner is already reading a card", "dismissible": true }
        })),
        (status = 502, description = "Neither check-in nor check-out was accepted")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn simulate_scan(
    credential: Credential,
    config: web::Data<Config>,
    reconciler: web::Data<Reconciler>,
    dialog: web::Data<ScanDialog>,
) -> Result<HttpResponse, ScanFlowError> {
    let mut scanner = SimulatedScanner::new(
        config.scanner_member_id.clone(),
        Duration::from_millis(config.scanner_delay_ms),
    );

    match run_scan(&dialog, &mut scanner, &reconciler, &credential).await? {
        Some(record) => Ok(HttpResponse::Ok().json(ScanResponse::from(record))),
        None => {
            info!("Simulated scan produced no card");
            Ok(HttpResponse::NoContent().finish())
        }
    }
}
