//! Month-end, quarter and business-day arithmetic.

use chrono::{Datelike, Months, NaiveDate, Weekday};

/// Months in which the previous quarter's flows are estimated.
const ESTIMATION_MONTHS: [u32; 4] = [1, 4, 7, 10];

pub fn is_month_end(date: NaiveDate) -> bool {
    date.succ_opt().is_some_and(|next| next.day() == 1)
}

/// Last day of the month before `date`.
pub fn previous_month_end(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)?.pred_opt()
}

/// The month-end that opens the three-month period closing at `quarter_end`,
/// e.g. 2025-06-30 for 2025-09-30.
pub fn quarter_start(quarter_end: NaiveDate) -> Option<NaiveDate> {
    quarter_end
        .with_day(1)?
        .checked_sub_months(Months::new(2))?
        .pred_opt()
}

pub fn is_business_day(date: NaiveDate, holidays: &[NaiveDate]) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !holidays.contains(&date)
}

/// True when `today` is one of the first `window` business days of January,
/// April, July or October.
pub fn is_quarterly_estimation_day(today: NaiveDate, window: u32, holidays: &[NaiveDate]) -> bool {
    if !ESTIMATION_MONTHS.contains(&today.month()) || !is_business_day(today, holidays) {
        return false;
    }

    let business_days_so_far = (1..=today.day())
        .filter_map(|day| today.with_day(day))
        .filter(|date| is_business_day(*date, holidays))
        .count();

    business_days_so_far <= window as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_is_month_end() {
        assert!(is_month_end(date(2025, 6, 30)));
        assert!(is_month_end(date(2024, 2, 29)));
        assert!(is_month_end(date(2025, 12, 31)));
        assert!(!is_month_end(date(2025, 2, 27)));
        assert!(!is_month_end(date(2025, 7, 1)));
    }

    #[test]
    fn test_previous_month_end() {
        assert_eq!(previous_month_end(date(2025, 10, 14)), Some(date(2025, 9, 30)));
        assert_eq!(previous_month_end(date(2025, 1, 2)), Some(date(2024, 12, 31)));
        assert_eq!(previous_month_end(date(2024, 3, 1)), Some(date(2024, 2, 29)));
    }

    #[test]
    fn test_quarter_start() {
        assert_eq!(quarter_start(date(2025, 9, 30)), Some(date(2025, 6, 30)));
        assert_eq!(quarter_start(date(2025, 12, 31)), Some(date(2025, 9, 30)));
        assert_eq!(quarter_start(date(2025, 3, 31)), Some(date(2024, 12, 31)));
        assert_eq!(quarter_start(date(2025, 6, 30)), Some(date(2025, 3, 31)));
        // Off-cycle quarters work the same way.
        assert_eq!(quarter_start(date(2024, 5, 31)), Some(date(2024, 2, 29)));
    }

    #[test]
    fn test_business_days() {
        // 2025-10-04 is a Saturday
        assert!(!is_business_day(date(2025, 10, 4), &[]));
        assert!(!is_business_day(date(2025, 10, 5), &[]));
        assert!(is_business_day(date(2025, 10, 6), &[]));
        assert!(!is_business_day(date(2025, 10, 6), &[date(2025, 10, 6)]));
    }

    #[test]
    fn test_estimation_window_october_2025() {
        // 1 Oct 2025 is a Wednesday, so the 10th business day is 14 Oct.
        assert!(is_quarterly_estimation_day(date(2025, 10, 1), 10, &[]));
        assert!(is_quarterly_estimation_day(date(2025, 10, 14), 10, &[]));
        assert!(!is_quarterly_estimation_day(date(2025, 10, 15), 10, &[]));
        // Weekends inside the window never qualify.
        assert!(!is_quarterly_estimation_day(date(2025, 10, 4), 10, &[]));
    }

    #[test]
    fn test_estimation_window_respects_holidays() {
        // With New Year's Day off, the 10th business day of Jan 2026 moves
        // from the 14th to the 15th.
        let holidays = [date(2026, 1, 1)];
        assert!(!is_quarterly_estimation_day(date(2026, 1, 1), 10, &holidays));
        assert!(!is_quarterly_estimation_day(date(2026, 1, 15), 10, &[]));
        assert!(is_quarterly_estimation_day(date(2026, 1, 15), 10, &holidays));
        assert!(!is_quarterly_estimation_day(date(2026, 1, 16), 10, &holidays));
    }

    #[test]
    fn test_estimation_only_in_quarter_opening_months() {
        assert!(!is_quarterly_estimation_day(date(2025, 11, 3), 10, &[]));
        assert!(!is_quarterly_estimation_day(date(2025, 9, 1), 10, &[]));
        assert!(is_quarterly_estimation_day(date(2025, 7, 1), 10, &[]));
        assert!(is_quarterly_estimation_day(date(2025, 4, 1), 10, &[]));
    }
}
