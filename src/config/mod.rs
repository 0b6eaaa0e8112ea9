//! Configuration module
//!
//! Handles CLI argument parsing and the simulation parameters every member of
//! the group receives identically at launch.

pub mod cli;

use crate::error::UsageError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Usage line printed by rank 0 when the positional arguments are wrong
pub const USAGE: &str = "Usage: randwalk [--np <p>] <domain_size> <max_steps>";

/// Simulation parameters
///
/// Built once per process from the positional launch arguments and handed to
/// the controller or walker entry point. The argument count is the only
/// check: zero, negative and non-numeric values are accepted and give
/// degenerate but well-defined walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Half-width D of the absorbing interval [-D, D]
    pub domain_half_width: i64,
    /// Maximum iterations M per walker
    pub max_steps: i64,
}

impl SimulationConfig {
    pub fn new(domain_half_width: i64, max_steps: i64) -> Self {
        Self {
            domain_half_width,
            max_steps,
        }
    }

    /// Build from the raw positional arguments (`domain_size`, `max_steps`)
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, UsageError> {
        if args.len() != 2 {
            return Err(UsageError::WrongArgumentCount(args.len()));
        }

        let domain_half_width = parse_leading_integer(args[0].as_ref());
        let max_steps = parse_leading_integer(args[1].as_ref());

        Ok(Self::new(domain_half_width, max_steps))
    }

    /// Step budget as an iteration count (non-positive budgets run no steps)
    pub fn step_budget(&self) -> u64 {
        u64::try_from(self.max_steps).unwrap_or(0)
    }

    /// Whether a position lies outside [-D, D]
    #[inline]
    pub fn is_out_of_bounds(&self, position: i64) -> bool {
        let (position, half_width) = (i128::from(position), i128::from(self.domain_half_width));
        position < -half_width || position > half_width
    }
}

impl fmt::Display for SimulationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "domain [-{d}, {d}], max {m} steps",
            d = self.domain_half_width,
            m = self.max_steps
        )
    }
}

/// Parse the leading integer of `value`, C `atoi` style
///
/// Leading whitespace and one sign are accepted, parsing stops at the first
/// non-digit, no digits at all gives 0, and out-of-range values saturate.
fn parse_leading_integer(value: &str) -> i64 {
    let value = value.trim_start();
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };

    digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .map(|b| i64::from(b - b'0'))
        .fold(0i64, |acc, digit| {
            if negative {
                acc.saturating_mul(10).saturating_sub(digit)
            } else {
                acc.saturating_mul(10).saturating_add(digit)
            }
        })
}
