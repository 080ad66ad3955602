use chrono::NaiveDateTime;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identifier printed on a member card, e.g. `MEM001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    /// Trims surrounding whitespace; an empty identifier is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MemberId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": "42",
        "memberId": "MEM001",
        "memberName": "Jane Doe",
        "checkInTime": "2024-02-15T09:00:00",
        "checkOutTime": "2024-02-15T10:30:00",
        "durationMinutes": 90,
        "type": "Gym Session"
    })
)]
pub struct AttendanceRecord {
    pub id: String,

    #[schema(value_type = String, example = "MEM001")]
    pub member_id: MemberId,

    pub member_name: String,

    #[schema(value_type = String, format = DateTime)]
    pub check_in_time: NaiveDateTime,

    /// Absent while the member is still inside.
    #[schema(value_type = Option<String>, format = DateTime, nullable = true)]
    pub check_out_time: Option<NaiveDateTime>,

    #[schema(nullable = true)]
    pub duration_minutes: Option<i64>,

    #[serde(rename = "type")]
    pub session_type: String,
}

impl AttendanceRecord {
    pub fn is_active(&self) -> bool {
        self.check_out_time.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    #[schema(example = 120)]
    pub total_visits: u64,
    /// Distinct member ids over the whole scope. `None` when the store did not
    /// report it and it could not be counted locally.
    #[schema(example = 37, nullable = true)]
    pub unique_visitors: Option<u64>,
    /// Distinct members seen today, when the store reports it.
    #[schema(example = 4, nullable = true)]
    pub unique_visitors_today: Option<u64>,
    /// Mean over closed visits, in minutes. Zero when nothing is closed yet.
    #[schema(example = 75.5)]
    pub average_visit_duration: f64,
}

/// Answer of the store's presence query.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberStatus {
    pub checked_in: bool,
    pub open_record: Option<AttendanceRecord>,
}

impl MemberStatus {
    /// Inside when the store says so, or when it still returns an open visit.
    pub fn is_inside(&self) -> bool {
        self.checked_in || self.open_record.as_ref().is_some_and(AttendanceRecord::is_active)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    /// Zero-based, as the store numbers pages.
    pub page: u32,
    pub size: u32,
}
