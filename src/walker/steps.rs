//! Step sources
//!
//! A walker draws one step per iteration from a [`StepSource`]. The random
//! source is a symmetric two-outcome distribution: -1 or +1 with equal
//! probability.
//!
//! # Performance
//!
//! Uses the xoshiro256++ PRNG which is fast and has good statistical
//! properties. The same seed always yields the same step sequence, which is
//! what makes a finished walk replayable.
//!
//! # Example
//!
//! ```
//! use randwalk::walker::steps::{RandomSteps, StepSource};
//!
//! let mut steps = RandomSteps::with_seed(7);
//! for _ in 0..10 {
//!     let step = steps.next_step();
//!     assert!(step == -1 || step == 1);
//! }
//! ```

use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Source of unit steps for a walk
pub trait StepSource {
    /// Next step, either -1 or +1
    fn next_step(&mut self) -> i64;
}

/// Symmetric random step source
pub struct RandomSteps {
    rng: Xoshiro256PlusPlus,
}

impl RandomSteps {
    /// Create a step source with a specific seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }
}

impl StepSource for RandomSteps {
    #[inline(always)]
    fn next_step(&mut self) -> i64 {
        if self.rng.gen::<bool>() {
            1
        } else {
            -1
        }
    }
}

/// Replays a fixed step sequence, then keeps stepping right
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct ScriptedSteps {
    steps: std::vec::IntoIter<i64>,
}

#[cfg(test)]
impl ScriptedSteps {
    pub fn new(steps: Vec<i64>) -> Self {
        Self {
            steps: steps.into_iter(),
        }
    }
}

#[cfg(test)]
impl StepSource for ScriptedSteps {
    fn next_step(&mut self) -> i64 {
        self.steps.next().unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_steps_are_unit() {
        let mut steps = RandomSteps::with_seed(1);
        for _ in 0..1000 {
            let step = steps.next_step();
            assert!(step == -1 || step == 1);
        }
    }

    #[test]
    fn test_random_steps_seeded() {
        let mut steps1 = RandomSteps::with_seed(12345);
        let mut steps2 = RandomSteps::with_seed(12345);

        for _ in 0..100 {
            assert_eq!(steps1.next_step(), steps2.next_step());
        }
    }

    #[test]
    fn test_random_steps_roughly_symmetric() {
        let mut steps = RandomSteps::with_seed(42);
        let right = (0..10_000).filter(|_| steps.next_step() == 1).count();

        // Expect ~5000; allow 10% deviation
        assert!(right > 4500 && right < 5500, "right steps {} outside expected range", right);
    }

    #[test]
    fn test_scripted_steps() {
        let mut steps = ScriptedSteps::new(vec![-1, -1, 1]);
        assert_eq!(steps.next_step(), -1);
        assert_eq!(steps.next_step(), -1);
        assert_eq!(steps.next_step(), 1);
        assert_eq!(steps.next_step(), 1);
    }
}
