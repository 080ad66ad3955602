//! Transport shapes returned by the attendance store and their mapping onto
//! the view model. Each entity has exactly one mapping function.

use chrono::{DateTime, Local, NaiveDateTime};
use serde::Deserialize;

use crate::error::ApiError;
use crate::model::attendance::{
    AttendanceRecord, AttendanceStats, MemberId, MemberStatus, Page,
};

/// Ids travel as JSON numbers or strings depending on the endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RemoteId {
    Number(i64),
    Text(String),
}

impl RemoteId {
    fn into_string(self) -> String {
        match self {
            RemoteId::Number(n) => n.to_string(),
            RemoteId::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
    pub id: Option<RemoteId>,
    #[serde(alias = "firstname")]
    pub first_name: Option<String>,
    #[serde(alias = "lastname")]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    pub id: Option<RemoteId>,
    pub member_id: Option<RemoteId>,
    pub member_name: Option<String>,
    pub user: Option<RemoteUser>,
    pub check_in_time: Option<String>,
    pub check_out_time: Option<String>,
    #[serde(alias = "durationInMinutes")]
    pub duration_minutes: Option<i64>,
    #[serde(rename = "type")]
    pub session_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePageBody {
    pub content: Vec<RemoteRecord>,
    pub total_elements: Option<u64>,
    pub number: Option<u32>,
    pub size: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RemotePage {
    Paged(RemotePageBody),
    Bare(Vec<RemoteRecord>),
}

/// Stats body. The store has shipped two spellings; both are read and the
/// first present one wins.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteStats {
    pub total_visits: Option<u64>,
    pub total_check_ins: Option<u64>,
    /// All-time distinct members.
    pub unique_visitors: Option<u64>,
    /// Distinct members today only; never an all-time count.
    pub unique_members_checked_in_today: Option<u64>,
    pub average_visit_duration_minutes: Option<f64>,
    pub average_duration_minutes: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStatus {
    pub checked_in: bool,
    #[serde(default)]
    pub record: Option<RemoteRecord>,
}

/// Accepts ISO local date-times with or without seconds and fraction, and
/// RFC 3339 instants, which are shifted into local wall-clock time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

pub fn map_record(remote: RemoteRecord) -> Result<AttendanceRecord, ApiError> {
    let user = remote.user;

    let member_id = remote
        .member_id
        .or_else(|| user.as_ref().and_then(|u| u.id.clone()))
        .map(RemoteId::into_string)
        .and_then(|raw| MemberId::parse(&raw))
        .ok_or_else(|| ApiError::Decode("attendance record without member id".into()))?;

    let check_in_raw = remote
        .check_in_time
        .ok_or_else(|| ApiError::Decode("attendance record without checkInTime".into()))?;
    let check_in_time = parse_timestamp(&check_in_raw)
        .ok_or_else(|| ApiError::Decode(format!("invalid checkInTime {check_in_raw:?}")))?;

    let check_out_time = match remote.check_out_time.as_deref() {
        None => None,
        Some(raw) => Some(
            parse_timestamp(raw)
                .ok_or_else(|| ApiError::Decode(format!("invalid checkOutTime {raw:?}")))?,
        ),
    };

    let duration_minutes = check_out_time.map(|out| {
        remote
            .duration_minutes
            .unwrap_or_else(|| (out - check_in_time).num_minutes())
    });

    let member_name = remote
        .member_name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| user.as_ref().and_then(display_name))
        .unwrap_or_else(|| member_id.to_string());

    Ok(AttendanceRecord {
        id: remote.id.map(RemoteId::into_string).unwrap_or_default(),
        member_id,
        member_name,
        check_in_time,
        check_out_time,
        duration_minutes,
        session_type: remote.session_type.unwrap_or_default(),
    })
}

pub fn map_page(remote: RemotePage) -> Result<Page<AttendanceRecord>, ApiError> {
    match remote {
        RemotePage::Paged(body) => {
            let items = map_records(body.content)?;
            Ok(Page {
                total: body.total_elements.unwrap_or(items.len() as u64),
                page: body.number.unwrap_or(0),
                size: body.size.unwrap_or(items.len() as u32),
                items,
            })
        }
        RemotePage::Bare(records) => {
            let items = map_records(records)?;
            Ok(Page {
                total: items.len() as u64,
                page: 0,
                size: items.len() as u32,
                items,
            })
        }
    }
}

pub fn map_stats(remote: RemoteStats) -> AttendanceStats {
    AttendanceStats {
        total_visits: remote.total_visits.or(remote.total_check_ins).unwrap_or(0),
        unique_visitors: remote.unique_visitors,
        unique_visitors_today: remote.unique_members_checked_in_today,
        average_visit_duration: remote
            .average_visit_duration_minutes
            .or(remote.average_duration_minutes)
            .unwrap_or(0.0),
    }
}

pub fn map_status(remote: RemoteStatus) -> Result<MemberStatus, ApiError> {
    let open_record = remote.record.map(map_record).transpose()?;
    Ok(MemberStatus {
        checked_in: remote.checked_in,
        open_record,
    })
}

fn map_records(records: Vec<RemoteRecord>) -> Result<Vec<AttendanceRecord>, ApiError> {
    records.into_iter().map(map_record).collect()
}

fn display_name(user: &RemoteUser) -> Option<String> {
    let name = [user.first_name.as_deref(), user.last_name.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!name.is_empty()).then_some(name)
}
