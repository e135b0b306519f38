//! Rebalancing calendar: effective dates plus selection and announcement
//! cut-offs expressed in business days.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Date, Month, Weekday};

use crate::ConfigError;

const DEFAULT_DAY: u8 = 15;
const DEFAULT_SELECTION_OFFSET: u32 = 5;
const DEFAULT_ANNOUNCEMENT_OFFSET: u32 = 2;
const LOOKAHEAD_YEARS: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebalancingFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    SemiAnnual,
    Annual,
}

impl RebalancingFrequency {
    pub const ALL: [Self; 6] = [
        Self::Daily,
        Self::Weekly,
        Self::Monthly,
        Self::Quarterly,
        Self::SemiAnnual,
        Self::Annual,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::SemiAnnual => "semi_annual",
            Self::Annual => "annual",
        }
    }

    /// Months used when a schedule does not list its own.
    pub fn default_months(self) -> Vec<u8> {
        match self {
            Self::Quarterly => vec![3, 6, 9, 12],
            Self::SemiAnnual => vec![6, 12],
            Self::Annual => vec![12],
            Self::Daily | Self::Weekly | Self::Monthly => (1..=12).collect(),
        }
    }
}

impl Display for RebalancingFrequency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RebalancingFrequency {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "semi_annual" | "semiannual" => Ok(Self::SemiAnnual),
            "annual" | "yearly" => Ok(Self::Annual),
            _ => Err(ConfigError::UnknownFrequency {
                value: value.trim().to_owned(),
            }),
        }
    }
}

/// When an index rebalances.
///
/// Each configured month rebalances on `day`, clamped to the month's last
/// day. Saturdays move back to Friday and Sundays forward to Monday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScheduleRecord", into = "ScheduleRecord")]
pub struct RebalancingSchedule {
    frequency: RebalancingFrequency,
    months: Vec<u8>,
    day: u8,
    selection_offset: u32,
    announcement_offset: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScheduleRecord {
    frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    months: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    day: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selection_offset: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    announcement_offset: Option<u32>,
}

impl RebalancingSchedule {
    pub fn new(
        frequency: RebalancingFrequency,
        months: Vec<u8>,
        day: u8,
    ) -> Result<Self, ConfigError> {
        if months.is_empty() {
            return Err(ConfigError::EmptyMonths);
        }
        if let Some(value) = months.iter().copied().find(|month| !(1..=12).contains(month)) {
            return Err(ConfigError::InvalidMonth { value });
        }
        if !(1..=31).contains(&day) {
            return Err(ConfigError::InvalidDay { value: day });
        }

        let mut months = months;
        months.sort_unstable();
        months.dedup();

        Ok(Self {
            frequency,
            months,
            day,
            selection_offset: DEFAULT_SELECTION_OFFSET,
            announcement_offset: DEFAULT_ANNOUNCEMENT_OFFSET,
        })
    }

    /// March, June, September and December, on the 15th.
    pub fn quarterly() -> Self {
        Self {
            frequency: RebalancingFrequency::Quarterly,
            months: RebalancingFrequency::Quarterly.default_months(),
            day: DEFAULT_DAY,
            selection_offset: DEFAULT_SELECTION_OFFSET,
            announcement_offset: DEFAULT_ANNOUNCEMENT_OFFSET,
        }
    }

    pub fn monthly(day: u8) -> Result<Self, ConfigError> {
        Self::new(
            RebalancingFrequency::Monthly,
            RebalancingFrequency::Monthly.default_months(),
            day,
        )
    }

    /// June and December unless other months are given.
    pub fn semi_annual(months: Option<Vec<u8>>, day: u8) -> Result<Self, ConfigError> {
        Self::new(
            RebalancingFrequency::SemiAnnual,
            months.unwrap_or_else(|| RebalancingFrequency::SemiAnnual.default_months()),
            day,
        )
    }

    pub fn annual(month: u8, day: u8) -> Result<Self, ConfigError> {
        Self::new(RebalancingFrequency::Annual, vec![month], day)
    }

    pub fn with_offsets(mut self, selection_offset: u32, announcement_offset: u32) -> Self {
        self.selection_offset = selection_offset;
        self.announcement_offset = announcement_offset;
        self
    }

    pub fn frequency(&self) -> RebalancingFrequency {
        self.frequency
    }

    pub fn months(&self) -> &[u8] {
        &self.months
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn selection_offset(&self) -> u32 {
        self.selection_offset
    }

    pub fn announcement_offset(&self) -> u32 {
        self.announcement_offset
    }

    /// Effective dates whose unadjusted target falls within `[start, end]`,
    /// weekend-adjusted and sorted ascending.
    pub fn rebalancing_dates(&self, start: Date, end: Date) -> Vec<Date> {
        let mut dates = Vec::new();
        if start > end {
            return dates;
        }

        for year in start.year()..=end.year() {
            for month in &self.months {
                let Some(target) = target_date(year, *month, self.day) else {
                    continue;
                };
                if (start..=end).contains(&target) {
                    dates.push(adjust_for_weekend(target));
                }
            }
        }

        dates.sort_unstable();
        dates.dedup();
        dates
    }

    /// Date the selection snapshot is taken for an effective date.
    pub fn selection_date(&self, rebalancing_date: Date) -> Date {
        subtract_business_days(rebalancing_date, self.selection_offset)
    }

    /// Date changes are announced for an effective date.
    pub fn announcement_date(&self, rebalancing_date: Date) -> Date {
        subtract_business_days(rebalancing_date, self.announcement_offset)
    }

    pub fn is_rebalancing_date(&self, date: Date) -> bool {
        // Weekend adjustment moves a target by at most one day.
        let start = date.previous_day().unwrap_or(date);
        let end = date.next_day().unwrap_or(date);
        self.rebalancing_dates(start, end).contains(&date)
    }

    /// First effective date after `from`, looking at most two years ahead.
    pub fn next_rebalancing_date(&self, from: Date) -> Option<Date> {
        let start = from.next_day()?;
        let end = target_date(
            from.year() + LOOKAHEAD_YEARS,
            u8::from(from.month()),
            from.day(),
        )?;
        self.rebalancing_dates(start, end)
            .into_iter()
            .find(|date| *date > from)
    }
}

impl Default for RebalancingSchedule {
    fn default() -> Self {
        Self::quarterly()
    }
}

impl TryFrom<ScheduleRecord> for RebalancingSchedule {
    type Error = ConfigError;

    fn try_from(record: ScheduleRecord) -> Result<Self, Self::Error> {
        let frequency = record.frequency.parse::<RebalancingFrequency>()?;
        let months = record
            .months
            .unwrap_or_else(|| frequency.default_months());
        let schedule = Self::new(frequency, months, record.day.unwrap_or(DEFAULT_DAY))?;
        Ok(schedule.with_offsets(
            record.selection_offset.unwrap_or(DEFAULT_SELECTION_OFFSET),
            record
                .announcement_offset
                .unwrap_or(DEFAULT_ANNOUNCEMENT_OFFSET),
        ))
    }
}

impl From<RebalancingSchedule> for ScheduleRecord {
    fn from(value: RebalancingSchedule) -> Self {
        Self {
            frequency: value.frequency.as_str().to_owned(),
            months: Some(value.months),
            day: Some(value.day),
            selection_offset: Some(value.selection_offset),
            announcement_offset: Some(value.announcement_offset),
        }
    }
}

/// `day` of the given month, clamped to the month's last day.
fn target_date(year: i32, month: u8, day: u8) -> Option<Date> {
    let month = Month::try_from(month).ok()?;
    (1..=day)
        .rev()
        .find_map(|candidate| Date::from_calendar_date(year, month, candidate).ok())
}

fn adjust_for_weekend(date: Date) -> Date {
    match date.weekday() {
        Weekday::Saturday => date.previous_day().unwrap_or(date),
        Weekday::Sunday => date.next_day().unwrap_or(date),
        _ => date,
    }
}

fn subtract_business_days(date: Date, days: u32) -> Date {
    let mut result = date;
    let mut remaining = days;
    while remaining > 0 {
        let Some(previous) = result.previous_day() else {
            break;
        };
        result = previous;
        if !matches!(result.weekday(), Weekday::Saturday | Weekday::Sunday) {
            remaining -= 1;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn quarterly_dates_are_weekend_adjusted() {
        let schedule = RebalancingSchedule::quarterly();
        let dates = schedule.rebalancing_dates(date!(2024 - 01 - 01), date!(2024 - 12 - 31));

        // 2024-06-15 is a Saturday, 2024-09-15 a Sunday.
        assert_eq!(
            dates,
            vec![
                date!(2024 - 03 - 15),
                date!(2024 - 06 - 14),
                date!(2024 - 09 - 16),
                date!(2024 - 12 - 16),
            ]
        );
    }

    #[test]
    fn clamps_day_to_month_end() {
        let schedule = RebalancingSchedule::monthly(31).expect("valid");
        let dates = schedule.rebalancing_dates(date!(2023 - 02 - 01), date!(2023 - 04 - 30));

        // 2023-02-28 is a Tuesday, 2023-03-31 a Friday, 2023-04-30 a Sunday.
        assert_eq!(
            dates,
            vec![date!(2023 - 02 - 28), date!(2023 - 03 - 31), date!(2023 - 05 - 01)]
        );
    }

    #[test]
    fn subtracts_business_days_across_weekends() {
        let schedule = RebalancingSchedule::quarterly();
        // Monday 2024-12-16.
        assert_eq!(schedule.selection_date(date!(2024 - 12 - 16)), date!(2024 - 12 - 09));
        assert_eq!(
            schedule.announcement_date(date!(2024 - 12 - 16)),
            date!(2024 - 12 - 12)
        );
    }

    #[test]
    fn recognizes_adjusted_rebalancing_dates() {
        let schedule = RebalancingSchedule::quarterly();
        assert!(schedule.is_rebalancing_date(date!(2024 - 06 - 14)));
        assert!(!schedule.is_rebalancing_date(date!(2024 - 06 - 15)));
        assert!(!schedule.is_rebalancing_date(date!(2024 - 05 - 15)));
    }

    #[test]
    fn finds_next_rebalancing_date() {
        let schedule = RebalancingSchedule::annual(12, 15).expect("valid");
        assert_eq!(
            schedule.next_rebalancing_date(date!(2025 - 12 - 15)),
            Some(date!(2026 - 12 - 15))
        );
    }

    #[test]
    fn rejects_invalid_months_and_days() {
        assert!(matches!(
            RebalancingSchedule::annual(13, 1),
            Err(ConfigError::InvalidMonth { value: 13 })
        ));
        assert!(matches!(
            RebalancingSchedule::monthly(0),
            Err(ConfigError::InvalidDay { value: 0 })
        ));
        assert!(matches!(
            RebalancingSchedule::new(RebalancingFrequency::Monthly, Vec::new(), 1),
            Err(ConfigError::EmptyMonths)
        ));
    }

    #[test]
    fn deserializes_with_frequency_defaults() {
        let schedule: RebalancingSchedule =
            serde_json::from_str(r#"{"frequency":"semi-annual"}"#).expect("valid");
        assert_eq!(schedule.months(), &[6, 12]);
        assert_eq!(schedule.day(), 15);
        assert_eq!(schedule.selection_offset(), 5);

        let err = serde_json::from_str::<RebalancingSchedule>(r#"{"frequency":"hourly"}"#)
            .expect_err("must fail");
        assert!(err.to_string().contains("hourly"));
    }
}
