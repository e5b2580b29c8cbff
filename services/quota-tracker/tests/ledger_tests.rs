use std::sync::{Arc, Barrier};
use std::thread;

use chrono::NaiveDate;
use omnia_quota_tracker::{
    JsonFileLedgerStore, LedgerStore, ManualClock, QuotaTracker, ServiceLimits,
    SqliteLedgerStore, UsageLedger,
};
use tempfile::TempDir;

fn june(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
}

fn limits() -> ServiceLimits {
    ServiceLimits::new()
        .with_limit("assistant", 50)
        .with_limit("weather", 3)
        .with_limit("search", 30)
}

fn sqlite_tracker(dir: &TempDir, clock: Arc<ManualClock>) -> QuotaTracker {
    let store = Arc::new(SqliteLedgerStore::new(dir.path()).expect("open sqlite ledger"));
    QuotaTracker::new(store, limits(), clock)
}

fn json_tracker(dir: &TempDir, clock: Arc<ManualClock>) -> QuotaTracker {
    let store = Arc::new(JsonFileLedgerStore::new(dir.path()).expect("open json ledger"));
    QuotaTracker::new(store, limits(), clock)
}

#[test]
fn sqlite_usage_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(june(3)));

    {
        let tracker = sqlite_tracker(&dir, clock.clone());
        assert!(tracker.try_consume("weather").unwrap());
        assert!(tracker.try_consume("weather").unwrap());
        assert!(tracker.try_consume("assistant").unwrap());
    }

    let restarted = sqlite_tracker(&dir, clock);
    assert_eq!(restarted.used_today("weather").unwrap(), 2);
    assert_eq!(restarted.used_today("assistant").unwrap(), 1);
    assert!(restarted.try_consume("weather").unwrap());
    assert!(!restarted.try_consume("weather").unwrap());
}

#[test]
fn json_usage_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(june(3)));

    {
        let tracker = json_tracker(&dir, clock.clone());
        for _ in 0..3 {
            assert!(tracker.try_consume("weather").unwrap());
        }
    }

    let restarted = json_tracker(&dir, clock);
    assert_eq!(restarted.used_today("weather").unwrap(), 3);
    assert!(!restarted.try_consume("weather").unwrap());
}

#[test]
fn restart_on_a_later_day_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(june(3)));
    {
        let tracker = sqlite_tracker(&dir, clock.clone());
        for _ in 0..3 {
            tracker.try_consume("weather").unwrap();
        }
    }

    clock.set(june(4));
    let restarted = sqlite_tracker(&dir, clock);
    assert!(restarted.try_consume("weather").unwrap());
    assert_eq!(restarted.used_today("weather").unwrap(), 1);
}

#[test]
fn stores_reload_identical_ledgers() {
    let ledger = UsageLedger {
        day: june(21),
        counters: [
            ("assistant".to_string(), 17),
            ("search".to_string(), 0),
            ("weather".to_string(), 3),
        ]
        .into_iter()
        .collect(),
    };

    let sqlite_dir = tempfile::tempdir().unwrap();
    let sqlite = SqliteLedgerStore::new(sqlite_dir.path()).unwrap();
    sqlite.save(&ledger).unwrap();
    drop(sqlite);
    let reopened = SqliteLedgerStore::new(sqlite_dir.path()).unwrap();
    assert_eq!(reopened.load().unwrap(), Some(ledger.clone()));

    let json_dir = tempfile::tempdir().unwrap();
    JsonFileLedgerStore::new(json_dir.path())
        .unwrap()
        .save(&ledger)
        .unwrap();
    let reopened = JsonFileLedgerStore::new(json_dir.path()).unwrap();
    assert_eq!(reopened.load().unwrap(), Some(ledger));
}

#[test]
fn concurrent_consumers_never_overrun_the_limit() {
    const CALLERS: usize = 16;
    const LIMIT: u64 = 5;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteLedgerStore::new(dir.path()).unwrap());
    let tracker = Arc::new(QuotaTracker::new(
        store.clone(),
        ServiceLimits::new().with_limit("search", LIMIT),
        Arc::new(ManualClock::new(june(9))),
    ));
    let barrier = Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let tracker = Arc::clone(&tracker);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                tracker.try_consume("search").unwrap()
            })
        })
        .collect();

    let grants = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|granted| *granted)
        .count();

    assert_eq!(grants as u64, LIMIT);
    assert_eq!(tracker.used_today("search").unwrap(), LIMIT);
    assert_eq!(store.load().unwrap().unwrap().used("search"), LIMIT);
}
