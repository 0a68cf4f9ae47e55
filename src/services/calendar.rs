//! Calendar days covered by a report window

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::types::{ReportError, Result};

/// `window_days` consecutive UTC dates ending the day before
/// `end_exclusive`, oldest first.
pub fn generate_range(window_days: i64, end_exclusive: NaiveDate) -> Result<Vec<NaiveDate>> {
    if window_days <= 0 {
        return Err(ReportError::InvalidWindow(window_days));
    }

    let start = Duration::try_days(window_days)
        .and_then(|span| end_exclusive.checked_sub_signed(span))
        .ok_or(ReportError::InvalidWindow(window_days))?;

    Ok(start.iter_days().take(window_days as usize).collect())
}

/// The closed historical range one report covers.
///
/// "Now" is read once by the caller and passed in, so a run that straddles
/// midnight still sees a single window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportWindow {
    days: Vec<NaiveDate>,
    end_exclusive: NaiveDate,
}

impl ReportWindow {
    /// Window of `window_days` full days ending yesterday relative to `now`
    pub fn ending_at(window_days: i64, now: DateTime<Utc>) -> Result<Self> {
        Self::ending_before(window_days, now.date_naive())
    }

    pub fn ending_before(window_days: i64, end_exclusive: NaiveDate) -> Result<Self> {
        let days = generate_range(window_days, end_exclusive)?;
        Ok(Self {
            days,
            end_exclusive,
        })
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// First day included
    pub fn start(&self) -> NaiveDate {
        self.days[0]
    }

    /// Last day included
    pub fn end(&self) -> NaiveDate {
        self.days[self.days.len() - 1]
    }

    pub fn end_exclusive(&self) -> NaiveDate {
        self.end_exclusive
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start() && date < self.end_exclusive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_length_and_order() {
        let days = generate_range(7, date(2026, 2, 10)).unwrap();

        assert_eq!(days.len(), 7);
        assert_eq!(days[0], date(2026, 2, 3));
        assert_eq!(days[6], date(2026, 2, 9));
        assert!(days.windows(2).all(|w| w[1] - w[0] == Duration::days(1)));
    }

    #[test]
    fn test_range_dates_distinct() {
        let days = generate_range(90, date(2026, 3, 1)).unwrap();
        let unique: HashSet<_> = days.iter().collect();
        assert_eq!(unique.len(), 90);
    }

    #[test]
    fn test_range_crosses_month_and_leap_day() {
        let days = generate_range(3, date(2024, 3, 2)).unwrap();
        assert_eq!(days, vec![date(2024, 2, 28), date(2024, 2, 29), date(2024, 3, 1)]);
    }

    #[test]
    fn test_range_single_day() {
        let days = generate_range(1, date(2026, 1, 1)).unwrap();
        assert_eq!(days, vec![date(2025, 12, 31)]);
    }

    #[test]
    fn test_range_rejects_non_positive() {
        assert!(matches!(
            generate_range(0, date(2026, 1, 1)),
            Err(ReportError::InvalidWindow(0))
        ));
        assert!(matches!(
            generate_range(-3, date(2026, 1, 1)),
            Err(ReportError::InvalidWindow(-3))
        ));
    }

    #[test]
    fn test_range_rejects_out_of_calendar() {
        let end = date(2026, 2, 8);
        assert!(matches!(
            generate_range(i64::MAX, end),
            Err(ReportError::InvalidWindow(i64::MAX))
        ));
        // representable as a span but before the earliest date
        assert!(matches!(
            generate_range(1_000_000_000, end),
            Err(ReportError::InvalidWindow(1_000_000_000))
        ));
        assert!(ReportWindow::ending_before(i64::MAX, end).is_err());
    }

    #[test]
    fn test_window_ends_yesterday() {
        let now = Utc.with_ymd_and_hms(2026, 2, 7, 0, 0, 1).unwrap();
        let window = ReportWindow::ending_at(2, now).unwrap();

        assert_eq!(window.start(), date(2026, 2, 5));
        assert_eq!(window.end(), date(2026, 2, 6));
        assert_eq!(window.end_exclusive(), date(2026, 2, 7));
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_window_contains() {
        let window = ReportWindow::ending_before(2, date(2026, 2, 7)).unwrap();

        assert!(!window.contains(date(2026, 2, 4)));
        assert!(window.contains(date(2026, 2, 5)));
        assert!(window.contains(date(2026, 2, 6)));
        assert!(!window.contains(date(2026, 2, 7)));
    }
}
