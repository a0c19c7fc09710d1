//! 床位费核算
//!
//! 按占用天数计费：不足一天按一天计，在院期间最少一天。

use chrono::{DateTime, Utc};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// 计算应计费天数
pub fn billable_days(admitted_at: DateTime<Utc>, until: DateTime<Utc>) -> i64 {
    let elapsed = until.signed_duration_since(admitted_at).num_seconds();
    if elapsed <= 0 {
        return 1;
    }

    let full_days = elapsed / SECONDS_PER_DAY;
    let days = if elapsed % SECONDS_PER_DAY > 0 {
        full_days + 1
    } else {
        full_days
    };
    days.max(1)
}

/// 计算床位费
pub fn bed_charge(daily_rate: i64, days: i64) -> i64 {
    daily_rate * days
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_minimum_one_day() {
        let now = Utc::now();
        assert_eq!(billable_days(now, now), 1);
        assert_eq!(billable_days(now, now + Duration::minutes(5)), 1);
    }

    #[test]
    fn test_partial_day_rounds_up() {
        let now = Utc::now();
        assert_eq!(billable_days(now, now + Duration::hours(23)), 1);
        assert_eq!(billable_days(now, now + Duration::hours(25)), 2);
        assert_eq!(billable_days(now, now + Duration::hours(48)), 2);
        assert_eq!(billable_days(now, now + Duration::hours(49)), 3);
    }

    #[test]
    fn test_bed_charge() {
        assert_eq!(bed_charge(200_000, 3), 600_000);
    }
}
