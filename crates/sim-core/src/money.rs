//! Currency and calendar display helpers.
//!
//! Money is carried as `i64` hundredths of a credit everywhere in the
//! simulation; conversion to `Decimal` happens only at the edges (logs, KPIs).

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;

/// Render fixed-point hundredths as credits, e.g. `12345` -> `123.45`.
pub fn to_credits(hundredths: i64) -> Decimal {
    Decimal::new(hundredths, 2)
}

/// Calendar date of simulation day `day`, counted from 2100-01-01.
///
/// Returns `None` for negative days or dates past chrono's range.
pub fn calendar_date(day: i64) -> Option<NaiveDate> {
    let epoch = NaiveDate::from_ymd_opt(2100, 1, 1)?;
    let offset = u64::try_from(day).ok()?;
    epoch.checked_add_days(Days::new(offset))
}

/// `value * ratio`, truncated toward zero.
pub fn scale(value: i64, ratio: f64) -> i64 {
    (value as f64 * ratio) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credits_have_two_decimals() {
        assert_eq!(to_credits(12345).to_string(), "123.45");
        assert_eq!(to_credits(-5).to_string(), "-0.05");
    }

    #[test]
    fn calendar_starts_at_epoch() {
        assert_eq!(calendar_date(0), NaiveDate::from_ymd_opt(2100, 1, 1));
        assert_eq!(calendar_date(31), NaiveDate::from_ymd_opt(2100, 2, 1));
        assert_eq!(calendar_date(-1), None);
    }

    #[test]
    fn scale_truncates() {
        assert_eq!(scale(1000, 0.015), 15);
        assert_eq!(scale(999, 1.1), 1098);
    }
}
