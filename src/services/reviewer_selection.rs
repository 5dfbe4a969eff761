//! Reviewer selection.
//!
//! [`select`] is the pure sampling rule. [`ReviewerSelector`] owns the
//! randomness source that requests share; tests construct it from a seed
//! or from any [`RngCore`] they like.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::Mutex;

/// Reviewers assigned when a pull request is created.
pub const CREATE_REVIEWER_COUNT: usize = 2;

/// Replacements picked on reassignment.
pub const REASSIGN_REVIEWER_COUNT: usize = 1;

/// Pick `min(pool.len(), k)` distinct ids uniformly at random.
///
/// When the pool is no larger than `k` the whole pool is returned in its
/// original order. Callers treat the result as a set.
pub fn select<R: Rng + ?Sized>(pool: &[String], k: usize, rng: &mut R) -> Vec<String> {
    if pool.len() <= k {
        return pool.to_vec();
    }
    pool.choose_multiple(rng, k).cloned().collect()
}

/// Shared, thread-safe randomness for [`select`].
pub struct ReviewerSelector {
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl ReviewerSelector {
    pub fn new(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            rng: Mutex::new(Box::new(rng)),
        }
    }

    /// Seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible selection sequence.
    pub fn from_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn pick(&self, pool: &[String], k: usize) -> Vec<String> {
        // A poisoned lock still holds a usable generator
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        select(pool, k, &mut **rng)
    }
}

impl Default for ReviewerSelector {
    fn default() -> Self {
        Self::from_entropy()
    }
}
