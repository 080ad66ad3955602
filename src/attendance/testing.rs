//! In-memory attendance store for tests. Behaves like the real backend:
//! a second check-in for a member who is inside is refused with 409 and a
//! check-out without an open record with 404.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::attendance::stats::aggregate;
use crate::auth::credential::Credential;
use crate::client::attendance_store::{AttendanceStore, RecordQuery, StatsWindow};
use crate::error::ApiError;
use crate::model::attendance::{
    AttendanceRecord, AttendanceStats, MemberId, MemberStatus, Page,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List,
    CheckIn(String),
    CheckOut(String),
    Stats,
    Status(String),
}

#[derive(Default)]
struct Failures {
    list: Option<ApiError>,
    check_in: Option<ApiError>,
    check_out: Option<ApiError>,
    stats: Option<ApiError>,
    status: Option<ApiError>,
}

struct State {
    records: Vec<AttendanceRecord>,
    calls: Vec<Call>,
    credentials: Vec<Credential>,
    now: NaiveDateTime,
    next_id: u64,
}

pub struct FakeStore {
    state: Mutex<State>,
    failures: Failures,
    accept_duplicates: bool,
    today_only_uniques: Option<u64>,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                records: Vec::new(),
                calls: Vec::new(),
                credentials: Vec::new(),
                now: NaiveDate::from_ymd_opt(2024, 2, 15)
                    .unwrap()
                    .and_hms_opt(9, 0, 0)
                    .unwrap(),
                next_id: 1,
            }),
            failures: Failures::default(),
            accept_duplicates: false,
            today_only_uniques: None,
        }
    }
}

impl FakeStore {
    pub fn with_records(self, records: Vec<AttendanceRecord>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.next_id += records.len() as u64;
            state.records = records;
        }
        self
    }

    pub fn failing_list(mut self, err: ApiError) -> Self {
        self.failures.list = Some(err);
        self
    }

    pub fn failing_check_in(mut self, err: ApiError) -> Self {
        self.failures.check_in = Some(err);
        self
    }

    pub fn failing_check_out(mut self, err: ApiError) -> Self {
        self.failures.check_out = Some(err);
        self
    }

    pub fn failing_stats(mut self, err: ApiError) -> Self {
        self.failures.stats = Some(err);
        self
    }

    pub fn failing_status(mut self, err: ApiError) -> Self {
        self.failures.status = Some(err);
        self
    }

    /// Mimics a backend that does not guard against double check-ins.
    pub fn accepting_duplicate_check_ins(mut self) -> Self {
        self.accept_duplicates = true;
        self
    }

    /// Stats carry only a today-scoped unique count, like the documented store payload.
    pub fn reporting_today_only_uniques(mut self, today: u64) -> Self {
        self.today_only_uniques = Some(today);
        self
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.state.lock().unwrap().now += Duration::minutes(minutes);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn credentials(&self) -> Vec<Credential> {
        self.state.lock().unwrap().credentials.clone()
    }

    pub fn open_records(&self, member_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .records
            .iter()
            .filter(|r| r.member_id.as_str() == member_id && r.is_active())
            .count()
    }

    fn record_call(&self, call: Call, credential: &Credential) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state.credentials.push(credential.clone());
    }
}

fn conflict(message: String) -> ApiError {
    ApiError::Status {
        status: 409,
        message,
    }
}

fn not_found(message: String) -> ApiError {
    ApiError::Status {
        status: 404,
        message,
    }
}

#[async_trait]
impl AttendanceStore for FakeStore {
    async fn list(
        &self,
        query: &RecordQuery,
        credential: &Credential,
    ) -> Result<Page<AttendanceRecord>, ApiError> {
        self.record_call(Call::List, credential);
        if let Some(err) = &self.failures.list {
            return Err(err.clone());
        }

        let state = self.state.lock().unwrap();
        let mut matching: Vec<_> = state
            .records
            .iter()
            .filter(|r| query.member_id.as_ref().is_none_or(|m| &r.member_id == m))
            .filter(|r| query.start_date.is_none_or(|start| r.check_in_time >= start))
            .filter(|r| query.end_date.is_none_or(|end| r.check_in_time <= end))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.check_in_time.cmp(&a.check_in_time));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip((query.page * query.size) as usize)
            .take(query.size as usize)
            .collect();

        Ok(Page {
            items,
            total,
            page: query.page,
            size: query.size,
        })
    }

    async fn check_in(
        &self,
        member_id: &MemberId,
        session_type: &str,
        credential: &Credential,
    ) -> Result<AttendanceRecord, ApiError> {
        self.record_call(Call::CheckIn(member_id.to_string()), credential);
        if let Some(err) = &self.failures.check_in {
            return Err(err.clone());
        }

        let mut state = self.state.lock().unwrap();
        let inside = state
            .records
            .iter()
            .any(|r| &r.member_id == member_id && r.is_active());
        if inside && !self.accept_duplicates {
            return Err(conflict(format!("Member {member_id} is already checked in.")));
        }

        let record = AttendanceRecord {
            id: state.next_id.to_string(),
            member_id: member_id.clone(),
            member_name: format!("Member {member_id}"),
            check_in_time: state.now,
            check_out_time: None,
            duration_minutes: None,
            session_type: session_type.to_string(),
        };
        state.next_id += 1;
        state.records.push(record.clone());
        Ok(record)
    }

    async fn check_out(
        &self,
        member_id: &MemberId,
        credential: &Credential,
    ) -> Result<AttendanceRecord, ApiError> {
        self.record_call(Call::CheckOut(member_id.to_string()), credential);
        if let Some(err) = &self.failures.check_out {
            return Err(err.clone());
        }

        let mut state = self.state.lock().unwrap();
        let now = state.now;
        let record = state
            .records
            .iter_mut()
            .filter(|r| &r.member_id == member_id && r.is_active())
            .max_by_key(|r| r.check_in_time)
            .ok_or_else(|| {
                not_found(format!("No active check-in found for member id: {member_id}"))
            })?;

        record.check_out_time = Some(now);
        record.duration_minutes = Some((now - record.check_in_time).num_minutes());
        Ok(record.clone())
    }

    async fn stats(
        &self,
        window: &StatsWindow,
        credential: &Credential,
    ) -> Result<AttendanceStats, ApiError> {
        self.record_call(Call::Stats, credential);
        if let Some(err) = &self.failures.stats {
            return Err(err.clone());
        }
        let in_window: Vec<_> = self
            .state
            .lock()
            .unwrap()
            .records
            .iter()
            .filter(|r| window.start.is_none_or(|start| r.check_in_time >= start))
            .filter(|r| window.end.is_none_or(|end| r.check_in_time <= end))
            .cloned()
            .collect();
        let mut stats = aggregate(&in_window);
        if let Some(today) = self.today_only_uniques {
            stats.unique_visitors = None;
            stats.unique_visitors_today = Some(today);
        }
        Ok(stats)
    }

    async fn status(
        &self,
        member_id: &MemberId,
        credential: &Credential,
    ) -> Result<MemberStatus, ApiError> {
        self.record_call(Call::Status(member_id.to_string()), credential);
        if let Some(err) = &self.failures.status {
            return Err(err.clone());
        }

        let state = self.state.lock().unwrap();
        let open_record = state
            .records
            .iter()
            .filter(|r| &r.member_id == member_id && r.is_active())
            .max_by_key(|r| r.check_in_time)
            .cloned();
        Ok(MemberStatus {
            checked_in: open_record.is_some(),
            open_record,
        })
    }
}
