//! Rate Limiter Integration Tests
//!
//! Admission sequences over the pure transition, checked against the
//! cooldown and per-window quota.

use std::collections::HashMap;

use soothsayer::core::{Admission, RateLimiter, RateLimiterState, RateLimits, Rejection};

/// Deterministic pseudo-random gaps (LCG)
fn gaps(seed: u64, n: usize, max_gap: u64) -> Vec<u64> {
    let mut x = seed;
    (0..n)
        .map(|_| {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (x >> 33) % max_gap
        })
        .collect()
}

/// Feed a call schedule through the limiter; returns admitted times and
/// the window each admission was counted in
fn simulate(limits: &RateLimits, times: &[u64]) -> Vec<(u64, u64)> {
    let mut state = RateLimiterState::default();
    let mut admitted = Vec::new();

    for &now in times {
        let (next, admission) = state.try_acquire(limits, now);
        match admission {
            Admission::Admitted => {
                let window = next.window_start_at.expect("window starts on admission");
                admitted.push((now, window));
            }
            Admission::Rejected(_) => assert_eq!(next, state, "rejection changed state"),
        }
        state = next;
    }
    admitted
}

#[test]
fn test_admissions_respect_quota_and_cooldown() {
    let cases = [
        RateLimits { max_requests_per_minute: 10, request_cooldown_ms: 5_000 },
        RateLimits { max_requests_per_minute: 3, request_cooldown_ms: 1_000 },
        RateLimits { max_requests_per_minute: 1, request_cooldown_ms: 0 },
        RateLimits { max_requests_per_minute: 50, request_cooldown_ms: 250 },
    ];

    for (seed, limits) in cases.iter().enumerate() {
        let mut now = 0;
        let times: Vec<u64> = gaps(seed as u64 + 7, 500, 8_000)
            .into_iter()
            .map(|gap| {
                now += gap;
                now
            })
            .collect();

        let admitted = simulate(limits, &times);
        assert!(!admitted.is_empty());

        let mut per_window: HashMap<u64, u32> = HashMap::new();
        for (_, window) in &admitted {
            *per_window.entry(*window).or_default() += 1;
        }
        for (window, count) in per_window {
            assert!(
                count <= limits.max_requests_per_minute,
                "window {} admitted {} > {}",
                window,
                count,
                limits.max_requests_per_minute
            );
        }

        for pair in admitted.windows(2) {
            let gap = pair[1].0 - pair[0].0;
            assert!(
                gap >= limits.request_cooldown_ms,
                "admissions {}ms apart, cooldown {}ms",
                gap,
                limits.request_cooldown_ms
            );
        }
    }
}

#[test]
fn test_eleven_calls_six_seconds_apart_all_admitted() {
    let limits = RateLimits::default();
    let times: Vec<u64> = (0..11).map(|i| i * 6_000).collect();

    let admitted = simulate(&limits, &times);
    assert_eq!(admitted.len(), 11);

    // The 11th call lands exactly on the window boundary and opens a new one
    assert_eq!(admitted[10], (60_000, 60_000));
}

#[test]
fn test_call_inside_cooldown_is_rejected() {
    let limits = RateLimits::default();
    let (state, first) = RateLimiterState::default().try_acquire(&limits, 0);
    assert_eq!(first, Admission::Admitted);

    let (_, second) = state.try_acquire(&limits, 2_000);
    assert_eq!(
        second,
        Admission::Rejected(Rejection::Cooldown { remaining_ms: 3_000 })
    );
}

#[tokio::test]
async fn test_quota_exhausted_until_window_rolls() {
    let limits = RateLimits {
        max_requests_per_minute: 10,
        request_cooldown_ms: 1_000,
    };
    let mut limiter = RateLimiter::new(limits);

    for i in 0..10 {
        assert!(limiter.try_acquire_at(i * 1_000).is_admitted());
    }
    assert_eq!(
        limiter.try_acquire_at(30_000),
        Admission::Rejected(Rejection::Quota { count: 10, max: 10 })
    );
    assert!(limiter.try_acquire_at(60_000).is_admitted());
    assert_eq!(limiter.state().request_count_in_window, 1);
}
