use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::auth::credential::Credential;
use crate::client::api_client::ApiClient;
use crate::client::mapping::{
    RemotePage, RemoteRecord, RemoteStats, RemoteStatus, map_page, map_record, map_stats,
    map_status,
};
use crate::error::ApiError;
use crate::model::attendance::{
    AttendanceRecord, AttendanceStats, MemberId, MemberStatus, Page,
};

const WIRE_DATE_TIME: &str = "%Y-%m-%dT%H:%M:%S";

/// Server-side filters understood by `GET /attendance`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub member_id: Option<MemberId>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub session_type: Option<String>,
    /// Zero-based.
    pub page: u32,
    pub size: u32,
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self {
            member_id: None,
            start_date: None,
            end_date: None,
            session_type: None,
            page: 0,
            size: 20,
        }
    }
}

impl RecordQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(member_id) = &self.member_id {
            params.push(("memberId", member_id.to_string()));
        }
        if let Some(start) = self.start_date {
            params.push(("startDate", start.format(WIRE_DATE_TIME).to_string()));
        }
        if let Some(end) = self.end_date {
            params.push(("endDate", end.format(WIRE_DATE_TIME).to_string()));
        }
        if let Some(session_type) = &self.session_type {
            params.push(("type", session_type.clone()));
        }
        params.push(("page", self.page.to_string()));
        params.push(("size", self.size.to_string()));
        params
    }
}

/// Optional bounds for `GET /attendance/stats`; the store picks its own default window otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsWindow {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl StatsWindow {
    fn to_params(self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(start) = self.start {
            params.push(("startDate", start.format(WIRE_DATE_TIME).to_string()));
        }
        if let Some(end) = self.end {
            params.push(("endDate", end.format(WIRE_DATE_TIME).to_string()));
        }
        params
    }
}

/// Authoritative holder of attendance state.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn list(
        &self,
        query: &RecordQuery,
        credential: &Credential,
    ) -> Result<Page<AttendanceRecord>, ApiError>;

    async fn check_in(
        &self,
        member_id: &MemberId,
        session_type: &str,
        credential: &Credential,
    ) -> Result<AttendanceRecord, ApiError>;

    async fn check_out(
        &self,
        member_id: &MemberId,
        credential: &Credential,
    ) -> Result<AttendanceRecord, ApiError>;

    async fn stats(
        &self,
        window: &StatsWindow,
        credential: &Credential,
    ) -> Result<AttendanceStats, ApiError>;

    async fn status(
        &self,
        member_id: &MemberId,
        credential: &Credential,
    ) -> Result<MemberStatus, ApiError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckInBody<'a> {
    member_id: &'a str,
    #[serde(rename = "type")]
    session_type: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckOutBody<'a> {
    member_id: &'a str,
}

pub struct RestAttendanceStore {
    client: ApiClient,
}

impl RestAttendanceStore {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AttendanceStore for RestAttendanceStore {
    async fn list(
        &self,
        query: &RecordQuery,
        credential: &Credential,
    ) -> Result<Page<AttendanceRecord>, ApiError> {
        let page: RemotePage = self
            .client
            .get(&["attendance"], &query.to_params(), credential)
            .await?;
        map_page(page)
    }

    async fn check_in(
        &self,
        member_id: &MemberId,
        session_type: &str,
        credential: &Credential,
    ) -> Result<AttendanceRecord, ApiError> {
        let body = CheckInBody {
            member_id: member_id.as_str(),
            session_type,
        };
        let record: RemoteRecord = self
            .client
            .post(&["attendance", "check-in"], &body, credential)
            .await?;
        map_record(record)
    }

    async fn check_out(
        &self,
        member_id: &MemberId,
        credential: &Credential,
    ) -> Result<AttendanceRecord, ApiError> {
        let body = CheckOutBody {
            member_id: member_id.as_str(),
        };
        let record: RemoteRecord = self
            .client
            .post(&["attendance", "check-out"], &body, credential)
            .await?;
        map_record(record)
    }

    async fn stats(
        &self,
        window: &StatsWindow,
        credential: &Credential,
    ) -> Result<AttendanceStats, ApiError> {
        let stats: RemoteStats = self
            .client
            .get(&["attendance", "stats"], &window.to_params(), credential)
            .await?;
        Ok(map_stats(stats))
    }

    async fn status(
        &self,
        member_id: &MemberId,
        credential: &Credential,
    ) -> Result<MemberStatus, ApiError> {
        let status: RemoteStatus = self
            .client
            .get(&["attendance", "status", member_id.as_str()], &[], credential)
            .await?;
        map_status(status)
    }
}
