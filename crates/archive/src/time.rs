//! Encoding of the `time` coordinate: whole days since 1970-01-01.

use chrono::{Datelike, NaiveDate};

/// Units string recorded on the `time` array.
pub const TIME_UNITS: &str = "days since 1970-01-01";

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const EPOCH_DAYS_FROM_CE: i64 = 719_163;

pub fn date_to_days(date: NaiveDate) -> i64 {
    date.num_days_from_ce() as i64 - EPOCH_DAYS_FROM_CE
}

pub fn days_to_date(days: i64) -> Option<NaiveDate> {
    let from_ce = i32::try_from(days.checked_add(EPOCH_DAYS_FROM_CE)?).ok()?;
    NaiveDate::from_num_days_from_ce_opt(from_ce)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_offsets() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let d = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        assert_eq!(date_to_days(epoch), 0);
        assert_eq!(date_to_days(d), 18628);
        assert_eq!(days_to_date(18628), Some(d));
        assert_eq!(days_to_date(-1), NaiveDate::from_ymd_opt(1969, 12, 31));
        assert_eq!(days_to_date(i64::MAX), None);
    }
}
