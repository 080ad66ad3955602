use std::collections::HashSet;

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance::{AttendanceRecord, AttendanceStats};

/// Where the numbers on the stats panel came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum StatsSource {
    Store,
    /// Aggregated from the loaded records because the store's stats were unavailable.
    Computed,
}

/// Client-side aggregation over a record set.
///
/// `unique_visitors` counts distinct member ids; the average only considers
/// records that carry a duration and is zero when none do.
pub fn aggregate(records: &[AttendanceRecord]) -> AttendanceStats {
    let unique: HashSet<_> = records.iter().map(|r| &r.member_id).collect();

    let durations: Vec<i64> = records.iter().filter_map(|r| r.duration_minutes).collect();
    let average_visit_duration = if durations.is_empty() {
        0.0
    } else {
        durations.iter().sum::<i64>() as f64 / durations.len() as f64
    };

    AttendanceStats {
        total_visits: records.len() as u64,
        unique_visitors: Some(unique.len() as u64),
        unique_visitors_today: None,
        average_visit_duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::filter::{AttendanceFilter, Period, apply_filter_at};
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M").unwrap()
    }

    fn visit(member: &str, check_in: &str, check_out: Option<&str>) -> AttendanceRecord {
        let check_in_time = ts(check_in);
        let check_out_time = check_out.map(ts);
        AttendanceRecord {
            id: format!("{member}@{check_in}"),
            member_id: member.into(),
            member_name: member.to_string(),
            check_in_time,
            check_out_time,
            duration_minutes: check_out_time.map(|out| (out - check_in_time).num_minutes()),
            session_type: "Gym Session".to_string(),
        }
    }

    #[test]
    fn empty_set_has_zero_stats() {
        let stats = aggregate(&[]);
        assert_eq!(stats.total_visits, 0);
        assert_eq!(stats.unique_visitors, Some(0));
        assert_eq!(stats.average_visit_duration, 0.0);
    }

    #[test]
    fn unique_visitors_ignores_repeat_check_ins() {
        let records = vec![
            visit("M1", "2024-02-13T09:00", Some("2024-02-13T10:00")),
            visit("M1", "2024-02-14T09:00", Some("2024-02-14T09:30")),
            visit("M2", "2024-02-14T18:00", None),
            visit("M1", "2024-02-15T07:00", None),
        ];

        let stats = aggregate(&records);
        assert_eq!(stats.total_visits, 4);
        assert_eq!(stats.unique_visitors, Some(2));
        assert_eq!(stats.average_visit_duration, 45.0);
    }

    #[test]
    fn week_view_with_one_closed_and_one_open_visit() {
        // Friday of the week 2024-02-11..=2024-02-17
        let today = NaiveDate::from_ymd_opt(2024, 2, 16).unwrap();
        let records = vec![
            visit("M1", "2024-02-15T09:00", Some("2024-02-15T10:30")),
            visit("M2", "2024-02-16T08:15", None),
        ];
        let filter = AttendanceFilter {
            period: Period::ThisWeek,
            ..AttendanceFilter::default()
        };

        let in_week = apply_filter_at(&records, &filter, today);
        assert_eq!(in_week.len(), 2);

        let stats = aggregate(&records);
        assert_eq!(stats.average_visit_duration, 90.0);
        assert_eq!(stats.unique_visitors, Some(2));
    }
}
