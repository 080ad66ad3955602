use chrono::{Datelike, Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::attendance::AttendanceRecord;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Period {
    #[default]
    All,
    Today,
    ThisWeek,
    ThisMonth,
}

impl Period {
    /// Inclusive calendar-date bounds of the period around `today`.
    /// Weeks run Sunday to Saturday.
    pub fn date_range(self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            Period::All => None,
            Period::Today => Some((today, today)),
            Period::ThisWeek => {
                let back = u64::from(today.weekday().num_days_from_sunday());
                let start = today.checked_sub_days(Days::new(back))?;
                Some((start, start.checked_add_days(Days::new(6))?))
            }
            Period::ThisMonth => {
                let first = today.with_day(1)?;
                let next_month = if today.month() == 12 {
                    NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?
                } else {
                    NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)?
                };
                Some((first, next_month.pred_opt()?))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceFilter {
    pub search_term: String,
    pub period: Period,
}

/// Filters against the local calendar date.
pub fn apply_filter<'a>(
    records: &'a [AttendanceRecord],
    filter: &AttendanceFilter,
) -> Vec<&'a AttendanceRecord> {
    apply_filter_at(records, filter, Local::now().date_naive())
}

/// Keeps records whose member name or id contains the search term
/// (case-insensitive) and whose check-in date falls in the period.
/// Input order is preserved.
pub fn apply_filter_at<'a>(
    records: &'a [AttendanceRecord],
    filter: &AttendanceFilter,
    today: NaiveDate,
) -> Vec<&'a AttendanceRecord> {
    let needle = filter.search_term.to_lowercase();
    let range = filter.period.date_range(today);

    records
        .iter()
        .filter(|record| {
            needle.is_empty()
                || record.member_name.to_lowercase().contains(&needle)
                || record.member_id.as_str().to_lowercase().contains(&needle)
        })
        .filter(|record| match range {
            None => true,
            Some((start, end)) => {
                let day = record.check_in_time.date();
                start <= day && day <= end
            }
        })
        .collect()
}
