//! Cache behavior as seen by callers holding a shared instance

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use teidoc_core::operators::add_said_tag;
use teidoc_core::{TeiDocument, TextRange};
use teidoc_validation::{
    CacheKey, CachedValidator, ManualClock, StructuralOracle, ValidationCache, ValidationResult,
    ValidationSnapshot,
};

#[test]
fn test_ttl_expiry_scenario() {
    let clock = Arc::new(ManualClock::new());
    let cache: ValidationCache =
        ValidationCache::with_clock(100, Duration::from_secs(300), clock.clone()).unwrap();
    let key = CacheKey::new("passage-00000001".into(), 4.into());

    cache.set(key.clone(), ValidationResult::default());
    clock.advance(Duration::from_secs(301));

    assert_eq!(cache.get(&key), None);
    assert!(!cache.has(&key));
}

#[test]
fn test_capacity_scenario() {
    let cache: ValidationCache = ValidationCache::new(2, Duration::from_secs(300)).unwrap();
    let keys: Vec<CacheKey> = (1..=3)
        .map(|n| CacheKey::new(format!("passage-{n}").into(), 0.into()))
        .collect();

    for key in &keys {
        cache.set(key.clone(), ValidationResult::default());
    }

    assert!(!cache.has(&keys[0]));
    assert!(cache.has(&keys[1]));
    assert!(cache.has(&keys[2]));
}

#[test]
fn test_shared_cache_across_threads() {
    let cache: Arc<ValidationCache> =
        Arc::new(ValidationCache::new(1000, Duration::from_secs(300)).unwrap());

    let handles: Vec<_> = (0..4u64)
        .map(|worker| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for n in 0..50u64 {
                    let key = CacheKey::new(format!("passage-{worker}").into(), n.into());
                    cache.set(key.clone(), ValidationResult::default());
                    assert!(cache.get(&key).is_some());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(cache.len(), 200);
    assert_eq!(cache.stats().hits, 200);
}

#[test]
fn test_staleness_scenario() {
    let doc = TeiDocument::load(
        r##"<TEI><text><body><p>"Yes," said Tom.</p></body></text></TEI>"##,
    )
    .unwrap();
    let passage = doc.state().passages[0].id.clone();
    let cache: ValidationCache<ValidationSnapshot> =
        ValidationCache::new(10, Duration::from_secs(300)).unwrap();
    let validator = CachedValidator::new(StructuralOracle, "tei_all.rng", cache);

    let snapshot = validator.validate_passage(doc.state(), &passage).unwrap();
    assert!(!snapshot.is_stale(doc.state()));

    let edited = add_said_tag(&doc, &passage, TextRange::new(0, 6), None).unwrap();
    assert!(snapshot.is_stale(edited.state()));
    assert!(validator
        .cache()
        .has(&CacheKey::new(passage.clone(), doc.revision())));

    let fresh = validator.validate_passage(edited.state(), &passage).unwrap();
    assert_eq!(fresh.revision, edited.revision());
    assert!(fresh.result.valid);
}
