// 🎲 Variation Injector - Bounded jitter that makes static numbers look live
//
// jitter(base, v) = clamp(base + (u - 0.5) * v, 0, 5),  u ∈ [0, 1)
//
// Nothing is persisted; two calls with the same base are not expected to agree.

use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::model::clamp_rating;

/// Variance width for the overall rating
pub const OVERALL_VARIANCE: f64 = 0.05;
/// Variance width for a region rating
pub const REGION_VARIANCE: f64 = 0.08;
/// Variance width for a district rating
pub const DISTRICT_VARIANCE: f64 = 0.1;
/// Variance width for a featured review rating
pub const REVIEW_VARIANCE: f64 = 0.2;

// ============================================================================
// RANDOM SOURCE
// ============================================================================

/// Uniform samples in [0, 1). Injected so tests can pin the jitter.
pub trait RandomSource: Send + Sync {
    fn next_unit(&self) -> f64;
}

/// Thread-local RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Always returns the same sample
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn next_unit(&self) -> f64 {
        self.0
    }
}

/// Cycles through a scripted sequence
#[derive(Debug)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: AtomicUsize,
}

impl SequenceRandom {
    pub fn new(values: Vec<f64>) -> Self {
        SequenceRandom {
            values,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl RandomSource for SequenceRandom {
    fn next_unit(&self) -> f64 {
        if self.values.is_empty() {
            return 0.5;
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.values[i % self.values.len()]
    }
}

// ============================================================================
// INJECTOR
// ============================================================================

#[derive(Clone)]
pub struct VariationInjector {
    source: Arc<dyn RandomSource>,
}

impl VariationInjector {
    pub fn new(source: Arc<dyn RandomSource>) -> Self {
        VariationInjector { source }
    }

    /// Injector backed by the thread-local RNG
    pub fn live() -> Self {
        Self::new(Arc::new(ThreadRandom))
    }

    /// Perturb `base` by at most `variance / 2` either way, clamped to [0, 5]
    pub fn jitter(&self, base: f64, variance: f64) -> f64 {
        let change = (self.source.next_unit() - 0.5) * variance;
        clamp_rating(base + change)
    }

    /// Raw uniform sample, for synthetic counts and shuffles
    pub fn unit(&self) -> f64 {
        self.source.next_unit()
    }

    /// Integer in [low, low + span)
    pub fn int_in(&self, low: u64, span: u64) -> u64 {
        low + (self.unit() * span as f64).floor() as u64
    }

    /// Fisher-Yates over the injected source
    pub fn shuffle<T>(&self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = ((self.unit() * (i + 1) as f64).floor() as usize).min(i);
            items.swap(i, j);
        }
    }
}

impl Default for VariationInjector {
    fn default() -> Self {
        Self::live()
    }
}

impl std::fmt::Debug for VariationInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariationInjector").finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================
