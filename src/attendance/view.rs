use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{error, instrument, warn};
use utoipa::ToSchema;

use crate::attendance::filter::{AttendanceFilter, Period, apply_filter_at};
use crate::attendance::scanner::Notification;
use crate::attendance::stats::{StatsSource, aggregate};
use crate::auth::credential::Credential;
use crate::client::attendance_store::{AttendanceStore, RecordQuery, StatsWindow};
use crate::error::{ApiError, FetchError};
use crate::model::attendance::{AttendanceRecord, AttendanceStats};

const ACTIVE_LABEL: &str = "Active";
const NO_DURATION: &str = "-";
const ERROR_PREFIX: &str = "Error loading attendance data:";
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";
const SCOPE_PAGE_SIZE: u32 = 100;

#[derive(Debug, Default)]
pub struct ViewState {
    pub records: Vec<AttendanceRecord>,
    pub total: u64,
    pub page: u32,
    pub stats: Option<(AttendanceStats, StatsSource)>,
    pub errors: Vec<FetchError>,
}

/// One table row as the dashboard shows it.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRow {
    pub id: String,
    pub member_id: String,
    pub member_name: String,
    #[serde(rename = "type")]
    pub session_type: String,
    #[schema(example = "2024-02-15 09:00")]
    pub check_in: String,
    /// Checkout time, or the active indicator while the member is inside.
    #[schema(example = "Active")]
    pub check_out: String,
    #[schema(example = "90 min")]
    pub duration: String,
    pub active: bool,
}

impl From<&AttendanceRecord> for AttendanceRow {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            id: record.id.clone(),
            member_id: record.member_id.to_string(),
            member_name: record.member_name.clone(),
            session_type: record.session_type.clone(),
            check_in: record.check_in_time.format(DISPLAY_FORMAT).to_string(),
            check_out: match record.check_out_time {
                Some(out) => out.format(DISPLAY_FORMAT).to_string(),
                None => ACTIVE_LABEL.to_string(),
            },
            duration: match (record.check_out_time, record.duration_minutes) {
                (Some(_), Some(minutes)) => format!("{minutes} min"),
                _ => NO_DURATION.to_string(),
            },
            active: record.is_active(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsPanel {
    pub total_visits: u64,
    #[schema(nullable = true)]
    pub unique_visitors: Option<u64>,
    #[schema(nullable = true)]
    pub unique_visitors_today: Option<u64>,
    pub average_visit_duration: f64,
    #[schema(example = "90 min")]
    pub average_visit_duration_label: String,
    pub source: StatsSource,
}

impl StatsPanel {
    fn new(stats: AttendanceStats, source: StatsSource) -> Self {
        Self {
            total_visits: stats.total_visits,
            unique_visitors: stats.unique_visitors,
            unique_visitors_today: stats.unique_visitors_today,
            average_visit_duration: stats.average_visit_duration,
            average_visit_duration_label: format!(
                "{} min",
                stats.average_visit_duration.round() as i64
            ),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceViewResponse {
    pub period: Period,
    pub rows: Vec<AttendanceRow>,
    /// Rows left after local filtering.
    pub matched: usize,
    /// Records the store holds for the server-side query.
    pub total: u64,
    pub page: u32,
    pub stats: Option<StatsPanel>,
    /// Inline banner text when a fetch failed.
    pub error: Option<String>,
    pub notification: Option<Notification>,
}

/// Attendance panel: fetches records and stats, filters locally, renders.
pub struct AttendanceView {
    store: Arc<dyn AttendanceStore>,
    state: ViewState,
}

impl AttendanceView {
    pub fn new(store: Arc<dyn AttendanceStore>) -> Self {
        Self {
            store,
            state: ViewState::default(),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Fetches records and stats concurrently. A failure of one fetch is
    /// recorded without discarding the other's result.
    ///
    /// Stats cover every record in the query's date window, not just the
    /// loaded page. When the store's stats fail, or lack an all-time unique
    /// count, the whole window is listed and counted here instead.
    #[instrument(name = "attendance_load", skip_all, fields(page = query.page, size = query.size))]
    pub async fn load(&mut self, query: &RecordQuery, credential: &Credential) {
        self.state.errors.clear();

        let window = StatsWindow {
            start: query.start_date,
            end: query.end_date,
        };
        let (records, stats) = futures::join!(
            self.store.list(query, credential),
            self.store.stats(&window, credential)
        );

        match records {
            Ok(page) => {
                self.state.total = page.total;
                self.state.page = page.page;
                self.state.records = page.items;
            }
            Err(e) => {
                error!(error = %e, "Failed to load attendance records");
                self.state.records.clear();
                self.state.total = 0;
                self.state.errors.push(FetchError::Records(e));
            }
        }

        self.state.stats = match stats {
            Ok(stats) if stats.unique_visitors.is_some() => Some((stats, StatsSource::Store)),
            Ok(mut stats) => {
                match self.records_in_window(&window, credential).await {
                    Ok(all) => stats.unique_visitors = aggregate(&all).unique_visitors,
                    Err(e) => warn!(error = %e, "Could not count unique visitors"),
                }
                Some((stats, StatsSource::Store))
            }
            Err(e) => {
                warn!(error = %e, "Failed to load attendance stats");
                self.state.errors.push(FetchError::Stats(e));
                match self.records_in_window(&window, credential).await {
                    Ok(all) => Some((aggregate(&all), StatsSource::Computed)),
                    Err(e) => {
                        warn!(error = %e, "Could not aggregate stats locally");
                        None
                    }
                }
            }
        };
    }

    /// Every record in the window, walking the store's pages.
    async fn records_in_window(
        &self,
        window: &StatsWindow,
        credential: &Credential,
    ) -> Result<Vec<AttendanceRecord>, ApiError> {
        let mut query = RecordQuery {
            start_date: window.start,
            end_date: window.end,
            size: SCOPE_PAGE_SIZE,
            ..RecordQuery::default()
        };
        let mut records = Vec::new();
        loop {
            let page = self.store.list(&query, credential).await?;
            let fetched = page.items.len();
            records.extend(page.items);
            if fetched == 0 || records.len() as u64 >= page.total {
                return Ok(records);
            }
            query.page += 1;
        }
    }

    pub fn render(&self, filter: &AttendanceFilter) -> AttendanceViewResponse {
        self.render_at(filter, Local::now().date_naive())
    }

    pub fn render_at(&self, filter: &AttendanceFilter, today: NaiveDate) -> AttendanceViewResponse {
        let rows: Vec<AttendanceRow> = apply_filter_at(&self.state.records, filter, today)
            .into_iter()
            .map(AttendanceRow::from)
            .collect();

        let error = (!self.state.errors.is_empty()).then(|| {
            let raw = self
                .state
                .errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            format!("{ERROR_PREFIX} {raw}")
        });

        AttendanceViewResponse {
            period: filter.period,
            matched: rows.len(),
            rows,
            total: self.state.total,
            page: self.state.page,
            stats: self
                .state
                .stats
                .map(|(stats, source)| StatsPanel::new(stats, source)),
            notification: error.clone().map(Notification::error),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::testing::{Call, FakeStore};
    use crate::error::ApiError;
    use chrono::NaiveDateTime;

    fn ts(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M").unwrap()
    }

    fn visit(id: &str, member: &str, name: &str, check_in: &str, check_out: Option<&str>) -> AttendanceRecord {
        let check_in_time = ts(check_in);
        let check_out_time = check_out.map(ts);
        AttendanceRecord {
            id: id.into(),
            member_id: member.into(),
            member_name: name.into(),
            check_in_time,
            check_out_time,
            duration_minutes: check_out_time.map(|out| (out - check_in_time).num_minutes()),
            session_type: "Gym Session".into(),
        }
    }

    fn sample() -> Vec<AttendanceRecord> {
        vec![
            visit("1", "M1", "Jane Doe", "2024-02-15T09:00", Some("2024-02-15T10:30")),
            visit("2", "M2", "Bob Stone", "2024-02-16T08:15", None),
            visit("3", "M1", "Jane Doe", "2024-01-20T18:00", Some("2024-01-20T19:00")),
        ]
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 16).unwrap()
    }

    #[actix_web::test]
    async fn load_fetches_records_and_stats() {
        let store = Arc::new(FakeStore::default().with_records(sample()));
        let mut view = AttendanceView::new(store.clone());

        view.load(&RecordQuery::default(), &Credential::Anonymous).await;

        let state = view.state();
        assert!(state.errors.is_empty());
        assert_eq!(state.records.len(), 3);
        assert_eq!(state.stats.map(|(_, s)| s), Some(StatsSource::Store));

        let mut calls = store.calls();
        calls.sort_by_key(|c| format!("{c:?}"));
        assert_eq!(calls, vec![Call::List, Call::Stats]);
    }

    #[actix_web::test]
    async fn render_marks_open_visits_active() {
        let store = Arc::new(FakeStore::default().with_records(sample()));
        let mut view = AttendanceView::new(store);
        view.load(&RecordQuery::default(), &Credential::Anonymous).await;

        let response = view.render_at(&AttendanceFilter::default(), today());

        // most recent first, as the store sorts
        let ids: Vec<_> = response.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);

        let open = &response.rows[0];
        assert!(open.active);
        assert_eq!(open.check_out, "Active");
        assert_eq!(open.duration, "-");

        let closed = &response.rows[1];
        assert_eq!(closed.check_out, "2024-02-15 10:30");
        assert_eq!(closed.duration, "90 min");

        assert!(response.error.is_none());
        assert!(response.notification.is_none());
    }

    #[actix_web::test]
    async fn week_filter_keeps_stats_over_loaded_records() {
        let store = Arc::new(FakeStore::default().with_records(sample()));
        let mut view = AttendanceView::new(store);
        view.load(&RecordQuery::default(), &Credential::Anonymous).await;

        let filter = AttendanceFilter {
            period: Period::ThisWeek,
            ..AttendanceFilter::default()
        };
        let response = view.render_at(&filter, today());

        assert_eq!(response.matched, 2);
        let stats = response.stats.unwrap();
        assert_eq!(stats.total_visits, 3);
        assert_eq!(stats.unique_visitors, Some(2));
        assert_eq!(stats.average_visit_duration, 75.0);
        assert_eq!(stats.average_visit_duration_label, "75 min");
    }

    #[actix_web::test]
    async fn stats_failure_falls_back_to_client_aggregation() {
        let store = Arc::new(
            FakeStore::default()
                .with_records(sample())
                .failing_stats(ApiError::Transport("timed out".into())),
        );
        let mut view = AttendanceView::new(store);
        view.load(&RecordQuery::default(), &Credential::Anonymous).await;

        let response = view.render_at(&AttendanceFilter::default(), today());

        assert_eq!(response.rows.len(), 3);
        let stats = response.stats.unwrap();
        assert_eq!(stats.source, StatsSource::Computed);
        assert_eq!(stats.unique_visitors, Some(2));

        let banner = response.error.unwrap();
        assert!(banner.starts_with("Error loading attendance data:"));
        assert!(banner.contains("timed out"));
        assert_eq!(response.notification.unwrap().kind, crate::attendance::scanner::NotificationKind::Error);
    }

    #[actix_web::test]
    async fn records_failure_still_renders_store_stats() {
        let store = Arc::new(
            FakeStore::default()
                .with_records(sample())
                .failing_list(ApiError::Status {
                    status: 403,
                    message: "Access Denied".into(),
                }),
        );
        let mut view = AttendanceView::new(store);
        view.load(&RecordQuery::default(), &Credential::Anonymous).await;

        let response = view.render_at(&AttendanceFilter::default(), today());

        assert!(response.rows.is_empty());
        assert_eq!(response.stats.unwrap().source, StatsSource::Store);
        assert!(response.error.unwrap().contains("Access Denied"));
    }

    #[actix_web::test]
    async fn both_failures_leave_no_stats() {
        let store = Arc::new(
            FakeStore::default()
                .failing_list(ApiError::Transport("refused".into()))
                .failing_stats(ApiError::Transport("refused".into())),
        );
        let mut view = AttendanceView::new(store);
        view.load(&RecordQuery::default(), &Credential::Anonymous).await;

        assert_eq!(view.state().errors.len(), 2);
        assert!(view.render_at(&AttendanceFilter::default(), today()).stats.is_none());
    }

    fn many_visits(count: usize) -> Vec<AttendanceRecord> {
        (0..count)
            .map(|i| {
                let check_in = ts("2024-02-15T06:00") + chrono::Duration::minutes(i as i64);
                AttendanceRecord {
                    id: i.to_string(),
                    member_id: format!("M{i}").as_str().into(),
                    member_name: format!("Member {i}"),
                    check_in_time: check_in,
                    check_out_time: Some(check_in + chrono::Duration::minutes(30)),
                    duration_minutes: Some(30),
                    session_type: "Gym Session".into(),
                }
            })
            .collect()
    }

    #[actix_web::test]
    async fn computed_stats_cover_every_page() {
        let store = Arc::new(
            FakeStore::default()
                .with_records(many_visits(25))
                .failing_stats(ApiError::Transport("timed out".into())),
        );
        let mut view = AttendanceView::new(store.clone());
        view.load(&RecordQuery::default(), &Credential::Anonymous).await;

        let state = view.state();
        assert_eq!(state.records.len(), 20);
        assert_eq!(state.total, 25);

        let stats = view
            .render_at(&AttendanceFilter::default(), today())
            .stats
            .unwrap();
        assert_eq!(stats.source, StatsSource::Computed);
        assert_eq!(stats.total_visits, 25);
        assert_eq!(stats.unique_visitors, Some(25));
        assert_eq!(
            store.calls().iter().filter(|c| **c == Call::List).count(),
            2
        );
    }

    #[actix_web::test]
    async fn missing_all_time_unique_count_is_counted_locally() {
        let store = Arc::new(
            FakeStore::default()
                .with_records(many_visits(25))
                .reporting_today_only_uniques(3),
        );
        let mut view = AttendanceView::new(store);
        view.load(&RecordQuery::default(), &Credential::Anonymous).await;

        let stats = view
            .render_at(&AttendanceFilter::default(), today())
            .stats
            .unwrap();
        assert_eq!(stats.source, StatsSource::Store);
        assert_eq!(stats.unique_visitors, Some(25));
        assert_eq!(stats.unique_visitors_today, Some(3));
    }
}
