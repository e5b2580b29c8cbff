use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Point-in-time usage of one service for the current day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceUsage {
    pub service_id: String,
    pub day: NaiveDate,
    pub used: u64,
    pub limit: u64,
    pub remaining: u64,
}

impl ServiceUsage {
    pub fn new(service_id: impl Into<String>, day: NaiveDate, used: u64, limit: u64) -> Self {
        Self {
            service_id: service_id.into(),
            day,
            used,
            limit,
            remaining: limit.saturating_sub(used),
        }
    }

    pub fn usage_percentage(&self) -> f64 {
        if self.limit == 0 {
            return 100.0;
        }
        (self.used.min(self.limit) as f64 / self.limit as f64) * 100.0
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn percentage_and_remaining() {
        let usage = ServiceUsage::new("assistant", day(), 10, 40);
        assert_eq!(usage.remaining, 30);
        assert!((usage.usage_percentage() - 25.0).abs() < f64::EPSILON);
        assert!(!usage.is_exhausted());
    }

    #[test]
    fn counter_above_a_lowered_limit_saturates() {
        let usage = ServiceUsage::new("search", day(), 12, 10);
        assert_eq!(usage.remaining, 0);
        assert!(usage.is_exhausted());
        assert!((usage.usage_percentage() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_limit_is_always_exhausted() {
        let usage = ServiceUsage::new("weather", day(), 0, 0);
        assert!(usage.is_exhausted());
    }
}
