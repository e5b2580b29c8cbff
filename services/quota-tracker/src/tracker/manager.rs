use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::storage::LedgerStore;

use super::clock::Clock;
use super::error::QuotaError;
use super::ledger::{ServiceLimits, UsageLedger};
use super::metrics::ServiceUsage;

/// Gatekeeper for the daily call budgets.
///
/// Every public operation runs under one lock: load the ledger, roll it over
/// if the day changed, then read or bump a counter and persist. Callers must
/// not do network I/O while holding anything from the tracker; `try_consume`
/// returns before the outbound call is made.
pub struct QuotaTracker {
    store: Arc<dyn LedgerStore>,
    limits: ServiceLimits,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl QuotaTracker {
    pub fn new(store: Arc<dyn LedgerStore>, limits: ServiceLimits, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            limits,
            clock,
            lock: Mutex::new(()),
        }
    }

    pub fn limits(&self) -> &ServiceLimits {
        &self.limits
    }

    pub fn limit(&self, service_id: &str) -> Result<u64, QuotaError> {
        self.limits
            .get(service_id)
            .ok_or_else(|| QuotaError::UnknownService(service_id.to_string()))
    }

    /// Charges one call to `service_id` if today's budget allows it.
    ///
    /// `Ok(true)` means the call is already recorded; `Ok(false)` means the
    /// budget is spent and nothing was written.
    pub fn try_consume(&self, service_id: &str) -> Result<bool, QuotaError> {
        let limit = self.limit(service_id)?;
        let _guard = self.acquire();

        let mut ledger = self.current_ledger()?;
        let used = ledger.used(service_id);
        if used >= limit {
            debug!(service_id, used, limit, "daily quota exhausted");
            return Ok(false);
        }

        ledger.counters.insert(service_id.to_string(), used + 1);
        self.store.save(&ledger)?;

        debug!(service_id, used = used + 1, limit, "quota consumed");
        Ok(true)
    }

    pub fn used_today(&self, service_id: &str) -> Result<u64, QuotaError> {
        self.limit(service_id)?;
        let _guard = self.acquire();
        Ok(self.current_ledger()?.used(service_id))
    }

    pub fn remaining(&self, service_id: &str) -> Result<u64, QuotaError> {
        let limit = self.limit(service_id)?;
        let _guard = self.acquire();
        Ok(limit.saturating_sub(self.current_ledger()?.used(service_id)))
    }

    pub fn usage(&self, service_id: &str) -> Result<ServiceUsage, QuotaError> {
        let limit = self.limit(service_id)?;
        let _guard = self.acquire();
        let ledger = self.current_ledger()?;
        Ok(ServiceUsage::new(
            service_id,
            ledger.day,
            ledger.used(service_id),
            limit,
        ))
    }

    /// Usage of every configured service, ordered by service id.
    pub fn snapshot(&self) -> Result<Vec<ServiceUsage>, QuotaError> {
        let _guard = self.acquire();
        let ledger = self.current_ledger()?;
        Ok(self
            .limits
            .iter()
            .map(|(id, limit)| ServiceUsage::new(id, ledger.day, ledger.used(id), limit))
            .collect())
    }

    pub fn ledger(&self) -> Result<UsageLedger, QuotaError> {
        let _guard = self.acquire();
        self.current_ledger()
    }

    fn acquire(&self) -> MutexGuard<'_, ()> {
        // The guarded value is `()`, so a poisoned lock carries no broken state.
        self.lock.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Must be called with `self.lock` held.
    fn current_ledger(&self) -> Result<UsageLedger, QuotaError> {
        let today = self.clock.today();

        match self.store.load()? {
            None => Ok(UsageLedger::fresh(today, &self.limits)),
            Some(stored) if stored.day != today => {
                let fresh = UsageLedger::fresh(today, &self.limits);
                self.store.save(&fresh)?;
                info!(
                    previous_day = %stored.day,
                    day = %today,
                    "usage ledger rolled over"
                );
                Ok(fresh)
            }
            Some(mut stored) => {
                stored.normalize(&self.limits);
                Ok(stored)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryLedgerStore;
    use crate::tracker::ManualClock;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn tracker(limit: u64) -> (QuotaTracker, Arc<ManualClock>, Arc<MemoryLedgerStore>) {
        let clock = Arc::new(ManualClock::new(day(10)));
        let store = Arc::new(MemoryLedgerStore::new());
        let limits = ServiceLimits::new()
            .with_limit("weather", limit)
            .with_limit("search", 5);
        let tracker = QuotaTracker::new(store.clone(), limits, clock.clone());
        (tracker, clock, store)
    }

    #[test]
    fn grants_until_the_limit_then_denies() {
        let (tracker, clock, _) = tracker(3);

        assert!(tracker.try_consume("weather").unwrap());
        assert!(tracker.try_consume("weather").unwrap());
        assert!(tracker.try_consume("weather").unwrap());
        assert_eq!(tracker.used_today("weather").unwrap(), 3);

        assert!(!tracker.try_consume("weather").unwrap());
        assert_eq!(tracker.used_today("weather").unwrap(), 3);
        assert_eq!(tracker.remaining("weather").unwrap(), 0);

        clock.advance_days(1);
        assert!(tracker.try_consume("weather").unwrap());
        assert_eq!(tracker.used_today("weather").unwrap(), 1);
    }

    #[test]
    fn services_are_counted_independently() {
        let (tracker, _, _) = tracker(1);

        assert!(tracker.try_consume("weather").unwrap());
        assert!(!tracker.try_consume("weather").unwrap());
        assert!(tracker.try_consume("search").unwrap());
        assert_eq!(tracker.remaining("search").unwrap(), 4);
    }

    #[test]
    fn unknown_service_is_rejected_without_touching_the_ledger() {
        let (tracker, clock, store) = tracker(3);
        tracker.try_consume("weather").unwrap();
        let before = store.load().unwrap();

        clock.advance_days(1);
        let err = tracker.try_consume("horoscope").unwrap_err();
        assert!(matches!(err, QuotaError::UnknownService(ref id) if id == "horoscope"));
        assert!(matches!(
            tracker.remaining("horoscope"),
            Err(QuotaError::UnknownService(_))
        ));
        assert_eq!(store.load().unwrap(), before);
    }

    #[test]
    fn zero_limit_never_grants() {
        let (tracker, _, store) = tracker(0);
        assert!(!tracker.try_consume("weather").unwrap());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn status_reads_roll_over_but_never_increment() {
        let (tracker, clock, store) = tracker(3);
        tracker.try_consume("weather").unwrap();
        tracker.try_consume("search").unwrap();

        clock.set(day(12));
        assert_eq!(tracker.used_today("weather").unwrap(), 0);
        assert_eq!(tracker.remaining("search").unwrap(), 5);

        let persisted = store.load().unwrap().unwrap();
        assert_eq!(persisted.day, day(12));
        assert!(persisted.counters.values().all(|used| *used == 0));
    }

    #[test]
    fn rollover_resets_every_service_before_the_first_call() {
        let (tracker, clock, _) = tracker(2);
        tracker.try_consume("weather").unwrap();
        tracker.try_consume("weather").unwrap();
        for _ in 0..5 {
            tracker.try_consume("search").unwrap();
        }

        clock.advance_days(1);
        assert!(tracker.try_consume("search").unwrap());

        let ledger = tracker.ledger().unwrap();
        assert_eq!(ledger.day, day(11));
        assert_eq!(ledger.used("weather"), 0);
        assert_eq!(ledger.used("search"), 1);
    }

    #[test]
    fn snapshot_lists_every_configured_service() {
        let (tracker, _, _) = tracker(4);
        tracker.try_consume("weather").unwrap();

        let snapshot = tracker.snapshot().unwrap();
        let ids: Vec<_> = snapshot.iter().map(|u| u.service_id.as_str()).collect();
        assert_eq!(ids, vec!["search", "weather"]);
        assert_eq!(snapshot[1].used, 1);
        assert_eq!(snapshot[1].remaining, 3);
    }

    #[test]
    fn stored_counter_above_a_lowered_limit_stays_put() {
        let store = Arc::new(MemoryLedgerStore::with_ledger(UsageLedger {
            day: day(10),
            counters: [("weather".to_string(), 9)].into_iter().collect(),
        }));
        let tracker = QuotaTracker::new(
            store,
            ServiceLimits::new().with_limit("weather", 5),
            Arc::new(ManualClock::new(day(10))),
        );

        assert!(!tracker.try_consume("weather").unwrap());
        assert_eq!(tracker.used_today("weather").unwrap(), 9);
        assert_eq!(tracker.remaining("weather").unwrap(), 0);
    }
}
