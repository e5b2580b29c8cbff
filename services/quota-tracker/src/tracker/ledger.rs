use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily call caps, keyed by service id. Fixed for the life of a tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceLimits {
    limits: BTreeMap<String, u64>,
}

impl ServiceLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, service_id: impl Into<String>, daily_limit: u64) -> Self {
        self.limits.insert(service_id.into(), daily_limit);
        self
    }

    pub fn get(&self, service_id: &str) -> Option<u64> {
        self.limits.get(service_id).copied()
    }

    pub fn service_ids(&self) -> impl Iterator<Item = &str> {
        self.limits.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.limits.iter().map(|(id, limit)| (id.as_str(), *limit))
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }
}

/// Per-service call counts for a single calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLedger {
    pub day: NaiveDate,
    pub counters: BTreeMap<String, u64>,
}

impl UsageLedger {
    pub fn fresh(day: NaiveDate, limits: &ServiceLimits) -> Self {
        Self {
            day,
            counters: limits.service_ids().map(|id| (id.to_string(), 0)).collect(),
        }
    }

    pub fn used(&self, service_id: &str) -> u64 {
        self.counters.get(service_id).copied().unwrap_or(0)
    }

    /// Makes the counter set match `limits`: missing services start at zero,
    /// services that are no longer configured are dropped.
    /// Returns `true` when anything changed.
    pub fn normalize(&mut self, limits: &ServiceLimits) -> bool {
        let before = self.counters.len();
        self.counters.retain(|id, _| limits.get(id).is_some());
        let mut changed = self.counters.len() != before;

        for id in limits.service_ids() {
            if !self.counters.contains_key(id) {
                self.counters.insert(id.to_string(), 0);
                changed = true;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ServiceLimits {
        ServiceLimits::new()
            .with_limit("assistant", 50)
            .with_limit("weather", 20)
    }

    #[test]
    fn fresh_ledger_has_a_zero_entry_per_service() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let ledger = UsageLedger::fresh(day, &limits());

        assert_eq!(ledger.day, day);
        assert_eq!(ledger.counters.len(), 2);
        assert!(ledger.counters.values().all(|used| *used == 0));
    }

    #[test]
    fn normalize_fills_gaps_and_drops_strangers() {
        let mut ledger = UsageLedger {
            day: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            counters: [("weather".to_string(), 3), ("retired".to_string(), 8)]
                .into_iter()
                .collect(),
        };

        assert!(ledger.normalize(&limits()));
        assert_eq!(ledger.used("weather"), 3);
        assert_eq!(ledger.used("assistant"), 0);
        assert!(!ledger.counters.contains_key("retired"));
        assert!(!ledger.normalize(&limits()));
    }
}
