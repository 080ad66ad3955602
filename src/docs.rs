use crate::api::attendance::{AttendanceQuery, ScanRequest, ScanResponse};
use crate::attendance::filter::Period;
use crate::attendance::reconciler::ScanAction;
use crate::attendance::scanner::{Notification, NotificationKind};
use crate::attendance::stats::StatsSource;
use crate::attendance::view::{AttendanceRow, AttendanceViewResponse, StatsPanel};
use crate::model::attendance::AttendanceRecord;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gym Attendance API",
        version = "1.0.0",
        description = r#"
## Gym Attendance Desk

Front-desk service for a gym: members scan their card on the way in and again on the way out.

### Key Features
- **Scan reconciliation**
  - One endpoint for both directions; the service works out whether a scan is a check-in or a check-out
- **Attendance panel**
  - Recent visits with active indicator, search by member and period filter
- **Statistics**
  - Total visits, unique visitors and average visit duration

### Security
Bearer tokens issued by the identity provider are passed through to the attendance store.
"#,
    ),
    paths(
        crate::api::attendance::list_attendance,
        crate::api::attendance::scan,
        crate::api::attendance::simulate_scan
    ),
    components(
        schemas(
            AttendanceQuery,
            AttendanceRecord,
            AttendanceRow,
            AttendanceViewResponse,
            StatsPanel,
            StatsSource,
            Period,
            ScanRequest,
            ScanResponse,
            ScanAction,
            Notification,
            NotificationKind
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Check-in, check-out and attendance reporting"),
    )
)]
pub struct ApiDoc;

/// Prefix the handlers are annotated with.
const DOC_PREFIX: &str = "/api";

/// The document with its paths moved under the prefix the routes are mounted on.
pub fn openapi_for(api_prefix: &str) -> openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    let prefix = api_prefix.trim_end_matches('/');
    let paths = std::mem::take(&mut doc.paths.paths);
    doc.paths.paths = paths
        .into_iter()
        .map(|(path, item)| {
            let rest = path.strip_prefix(DOC_PREFIX).unwrap_or(&path);
            (format!("{prefix}{rest}"), item)
        })
        .collect();
    doc
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
