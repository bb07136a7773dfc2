use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use key_rotator::{KeyRegistry, ManualClock, RateLimit, RegistryError};

fn key_names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("key-{i}")).collect()
}

fn manual(keys: &[String]) -> (KeyRegistry, ManualClock) {
    let clock = ManualClock::default();
    let registry = KeyRegistry::with_clock(Arc::new(clock.clone()));
    registry.initialize(keys.iter().cloned()).unwrap();
    (registry, clock)
}

proptest! {
    #[test]
    fn unlimited_rotation_visits_every_key_once_per_cycle(n in 1usize..12, cycles in 1usize..4) {
        let keys = key_names(n);
        let registry = KeyRegistry::from_keys(keys.clone()).unwrap();
        for _ in 0..cycles {
            let round: Vec<String> = (0..n)
                .map(|_| registry.next_key(None).unwrap().into_inner())
                .collect();
            prop_assert_eq!(&round, &keys);
        }
    }

    #[test]
    fn snapshot_counts_successful_reports(reports in proptest::collection::vec(0usize..6, 0..60)) {
        let keys = key_names(4);
        let registry = KeyRegistry::from_keys(keys.clone()).unwrap();
        let mut expected: HashMap<String, u64> = HashMap::new();

        for idx in reports {
            let name = format!("key-{idx}");
            let result = registry.report_usage(&name);
            if idx < 4 {
                prop_assert!(result.is_ok());
                *expected.entry(name).or_default() += 1;
            } else {
                let is_unknown = matches!(result, Err(RegistryError::UnknownKey { .. }));
                prop_assert!(is_unknown);
            }
        }

        let snapshot = registry.usage_snapshot().unwrap();
        prop_assert_eq!(snapshot.len(), 4);
        for key in &keys {
            let want = expected.get(key).copied().unwrap_or(0);
            prop_assert_eq!(snapshot[key.as_str()], want);
        }
    }

    #[test]
    fn exceeded_iff_every_key_is_full(
        n in 1usize..6,
        max_uses in 1u32..4,
        uses in proptest::collection::vec(0u32..5, 6),
    ) {
        let keys = key_names(n);
        let (registry, _) = manual(&keys);
        for (key, count) in keys.iter().zip(&uses) {
            for _ in 0..*count {
                registry.report_usage(key).unwrap();
            }
        }

        let all_full = uses.iter().take(n).all(|c| *c >= max_uses);
        let result = registry.next_key(Some(RateLimit::per_secs(10, max_uses)));
        prop_assert_eq!(result.is_err(), all_full);
        if let Ok(key) = result {
            let idx: usize = key.as_str().trim_start_matches("key-").parse().unwrap();
            prop_assert!(uses[idx] < max_uses);
        }
    }
}

#[test]
fn test_two_keys_two_uses_scenario() {
    let keys = vec!["A".to_string(), "B".to_string()];
    let (registry, clock) = manual(&keys);
    let limit = Some(RateLimit::per_secs(5, 2));

    let mut picked = Vec::new();
    for _ in 0..4 {
        let key = registry.next_key(limit).unwrap();
        registry.report_usage(key.as_str()).unwrap();
        picked.push(key.into_inner());
        clock.advance(Duration::from_secs(1));
    }
    assert_eq!(picked, ["A", "B", "A", "B"]);

    let err = registry.next_key(limit).unwrap_err();
    assert!(err.is_rate_limited());
    // A's first use at t=0 leaves the window at t=5, it is t=4 now
    assert_eq!(err.retry_after(), Some(Duration::from_secs(1)));

    clock.advance(Duration::from_secs(1));
    assert_eq!(registry.next_key(limit).unwrap(), "A");
}

#[test]
fn test_concurrent_rotation_is_even() {
    let keys = key_names(4);
    let registry = Arc::new(KeyRegistry::from_keys(keys.clone()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..100 {
                    let key = registry.next_key(None).unwrap();
                    registry.report_usage(key.as_str()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = registry.usage_snapshot().unwrap();
    for key in &keys {
        assert_eq!(snapshot[key.as_str()], 200);
    }
}

#[test]
fn test_concurrent_acquire_never_exceeds_limit() {
    let keys = key_names(3);
    let registry = Arc::new(KeyRegistry::from_keys(keys.clone()).unwrap());
    let limit = Some(RateLimit::per_secs(3600, 5));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                (0..10)
                    .filter(|_| registry.acquire(limit).is_ok())
                    .count()
            })
        })
        .collect();
    let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(granted, 15);
    let snapshot = registry.usage_snapshot().unwrap();
    for key in &keys {
        assert_eq!(snapshot[key.as_str()], 5);
    }
}
