//! Temporary cache tests.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use strided_contract::backend::{DenseBackend, DenseTensor, ElementType};
use strided_contract::launch::{
    BufferSpec, CacheBudget, CacheConfig, CacheKey, CacheManager, ExecutionContext, Executor, PlanConfig,
};
use strided_contract::network::from_ncon;
use strided_contract::optimization::create_plan;
use strided_contract::{ContractError, ContractResult};

fn key(slot: usize) -> CacheKey {
    CacheKey::new(1, slot, ExecutionContext::MAIN)
}

fn spec() -> BufferSpec {
    BufferSpec::new([8], ElementType::F64)
}

fn buffer(marker: f64) -> ContractResult<Vec<f64>> {
    Ok(vec![marker; 8])
}

fn must_hit() -> ContractResult<Vec<f64>> {
    Err(ContractError::backend("expected a cached buffer"))
}

#[test]
fn test_release_then_acquire_returns_same_buffer() {
    let cache = CacheManager::default();

    let mut first = cache.acquire(key(0), &spec(), || buffer(0.0)).unwrap();
    first[3] = 42.0;
    cache.release(key(0), first);

    let again = cache.acquire(key(0), &spec(), must_hit).unwrap();
    assert_eq!(again[3], 42.0);
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(cache.stats().misses, 1);
}

#[test]
fn test_least_recently_acquired_is_evicted_first() {
    // room for two 64-byte buffers
    let cache = CacheManager::with_budget(128);

    let a = cache.acquire(key(1), &spec(), || buffer(1.0)).unwrap();
    let b = cache.acquire(key(2), &spec(), || buffer(2.0)).unwrap();
    cache.release(key(1), a);
    cache.release(key(2), b);

    let a = cache.acquire(key(1), &spec(), must_hit).unwrap();
    cache.release(key(1), a);

    let c = cache.acquire(key(3), &spec(), || buffer(3.0)).unwrap();
    cache.release(key(3), c);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.total_bytes(), 128);
    assert_eq!(cache.stats().evictions, 1);

    let a = cache.acquire(key(1), &spec(), must_hit).unwrap();
    assert_eq!(a[0], 1.0);
    let b = cache.acquire(key(2), &spec(), || buffer(-2.0)).unwrap();
    assert_eq!(b[0], -2.0);
}

#[test]
fn test_interleaved_release_keeps_later_acquire() {
    let cache = CacheManager::with_budget(128);

    let b = cache.acquire(key(2), &spec(), || buffer(2.0)).unwrap();
    let a = cache.acquire(key(1), &spec(), || buffer(1.0)).unwrap();
    // released in the opposite order of acquisition
    cache.release(key(1), a);
    cache.release(key(2), b);

    let c = cache.acquire(key(3), &spec(), || buffer(3.0)).unwrap();
    cache.release(key(3), c);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.stats().evictions, 1);
    assert_eq!(cache.acquire(key(1), &spec(), must_hit).unwrap()[0], 1.0);
    assert_eq!(cache.acquire(key(2), &spec(), || buffer(-2.0)).unwrap()[0], -2.0);
}

#[test]
fn test_buffers_in_use_are_never_evicted() {
    let cache = CacheManager::with_budget(64);

    let a = cache.acquire(key(1), &spec(), || buffer(1.0)).unwrap();
    let b = cache.acquire(key(2), &spec(), || buffer(2.0)).unwrap();
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.stats().evictions, 0);

    cache.release(key(1), a);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().evictions, 1);

    cache.release(key(2), b);
    assert_eq!(cache.acquire(key(2), &spec(), must_hit).unwrap()[0], 2.0);
}

#[test]
fn test_disabled_cache_always_allocates() {
    let cache = CacheManager::disabled();

    let a = cache.acquire(key(0), &spec(), || buffer(1.0)).unwrap();
    cache.release(key(0), a);
    let b = cache.acquire(key(0), &spec(), || buffer(2.0)).unwrap();

    assert_eq!(b[0], 2.0);
    assert!(cache.is_empty());
    assert_eq!(cache.stats().hits + cache.stats().misses, 0);
}

#[test]
fn test_toggling_keeps_contents_until_cleared() {
    let cache = CacheManager::default();
    let a = cache.acquire(key(0), &spec(), || buffer(1.0)).unwrap();
    cache.release(key(0), a);

    cache.set_enabled(false);
    assert!(!cache.is_enabled());
    assert_eq!(cache.len(), 1);

    cache.set_enabled(true);
    let a = cache.acquire(key(0), &spec(), must_hit).unwrap();
    cache.release(key(0), a);

    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.total_bytes(), 0);
}

#[test]
fn test_fractional_budget() {
    let config = CacheConfig::new().with_budget(CacheBudget::Fraction {
        fraction: 0.5,
        total_memory: 1000,
    });
    assert_eq!(CacheManager::new(&config).budget(), 500);
}

#[test]
fn test_concurrent_contexts_use_separate_temporaries() {
    let network = from_ncon([vec![-1, 1], vec![1, 2], vec![2, -2]]).unwrap();
    let plan = create_plan(&network, &PlanConfig::default()).unwrap();
    let cache = Arc::new(CacheManager::default());
    let backend = DenseBackend::<f64>::new();

    let m = DenseTensor::from_fn([3, 3], |ix| (ix[0] * 3 + ix[1]) as f64);
    let expected = Executor::new(&backend, &cache).execute(&plan, &[&m, &m, &m], 1.0).unwrap();

    std::thread::scope(|scope| {
        for t in 1..=4u64 {
            let cache = Arc::clone(&cache);
            let (plan, backend, m, expected) = (&plan, &backend, &m, &expected);
            scope.spawn(move || {
                let executor = Executor::new(backend, &cache).with_context(ExecutionContext::new(t));
                for _ in 0..3 {
                    let result = executor.execute(plan, &[m, m, m], 1.0).unwrap();
                    assert_eq!(&result, expected);
                }
            });
        }
    });

    // one temporary per context, main included
    assert_eq!(cache.len(), 5);
    assert_eq!(cache.stats().misses, 5);
    assert_eq!(cache.stats().hits, 8);
}
