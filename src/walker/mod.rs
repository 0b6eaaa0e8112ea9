//! Walker implementation
//!
//! A walker simulates one discrete-time random walk on the integers and
//! reports its outcome to the controller exactly once.
//!
//! # Walk
//!
//! Starting at position 0, each of up to `max_steps` iterations adds a step of
//! -1 or +1. After every step the termination rule is checked, in priority
//! order:
//!
//! 1. **Boundary exit**: position left [-D, D]. Stop immediately.
//! 2. **Step budget exhaustion**: the last iteration finished inside the bounds.
//!
//! A walk that leaves the bounds on its final iteration is a boundary exit.
//! Either way [`run_walk`] produces a single [`WalkOutcome`], and
//! [`run_walker`] hands it to a [`ReportSender`] that is consumed by the send,
//! so a second report cannot be expressed.
//!
//! # Example
//!
//! ```
//! use randwalk::config::SimulationConfig;
//! use randwalk::walker::{run_walk, steps::RandomSteps, Termination};
//!
//! let config = SimulationConfig::new(0, 100);
//! let outcome = run_walk(&config, &mut RandomSteps::with_seed(1));
//!
//! // Any first step leaves [0, 0]
//! assert_eq!(outcome.steps_taken, 1);
//! assert_eq!(outcome.termination, Termination::BoundaryExit);
//! ```

pub mod steps;

use crate::config::SimulationConfig;
use crate::distributed::transport::{CompletionReport, ReportSender};
use crate::group::{Rank, WalkerIdentity};
use anyhow::{Context, Result};
use std::time::{SystemTime, UNIX_EPOCH};
use steps::StepSource;
use tracing::debug;

/// Why a walk stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Position left [-D, D]
    BoundaryExit,
    /// All `max_steps` iterations ran without leaving the bounds
    StepBudgetExhausted,
}

/// Walker-local state, mutated once per step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkState {
    pub position: i64,
    pub steps_taken: u64,
}

impl WalkState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one step and report whether the walk left the bounds
    #[inline]
    pub fn advance(&mut self, step: i64, config: &SimulationConfig) -> Option<Termination> {
        self.position += step;
        self.steps_taken += 1;

        if config.is_out_of_bounds(self.position) {
            Some(Termination::BoundaryExit)
        } else {
            None
        }
    }
}

/// Result of a finished walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOutcome {
    pub steps_taken: u64,
    pub final_position: i64,
    pub termination: Termination,
}

impl WalkOutcome {
    fn new(state: WalkState, termination: Termination) -> Self {
        Self {
            steps_taken: state.steps_taken,
            final_position: state.position,
            termination,
        }
    }

    /// The report this walk sends to the controller
    pub fn report(&self) -> CompletionReport {
        CompletionReport {
            steps_taken: self.steps_taken,
        }
    }

    /// Console line announcing the walker's result
    pub fn status_line(&self, rank: Rank) -> String {
        match self.termination {
            Termination::BoundaryExit => {
                format!("Rank {}: Walker finished in {} steps.", rank, self.steps_taken)
            }
            Termination::StepBudgetExhausted => format!(
                "Rank {}: Walker finished in {} steps (max steps reached).",
                rank, self.steps_taken
            ),
        }
    }
}

/// Run one bounded random walk
pub fn run_walk<S: StepSource + ?Sized>(config: &SimulationConfig, steps: &mut S) -> WalkOutcome {
    let mut state = WalkState::new();

    for _ in 0..config.step_budget() {
        if let Some(termination) = state.advance(steps.next_step(), config) {
            return WalkOutcome::new(state, termination);
        }
    }

    WalkOutcome::new(state, Termination::StepBudgetExhausted)
}

/// Seed for a walker's step source
///
/// `base` defaults to the wall clock in nanoseconds. Adding the rank keeps
/// seeds distinct for processes started within the same clock tick.
pub fn walker_seed(rank: Rank, base: Option<u64>) -> u64 {
    let base = base.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    });
    base.wrapping_add(rank.0 as u64)
}

/// Walker entry point
///
/// Runs the walk, prints the status line and sends the single report.
pub async fn run_walker<S, R>(
    identity: WalkerIdentity,
    config: &SimulationConfig,
    steps: &mut R,
    sender: S,
) -> Result<WalkOutcome>
where
    S: ReportSender,
    R: StepSource + ?Sized,
{
    let outcome = run_walk(config, steps);
    debug!(
        rank = %identity.rank,
        steps = outcome.steps_taken,
        position = outcome.final_position,
        termination = ?outcome.termination,
        "walk finished"
    );

    println!("{}", outcome.status_line(identity.rank));

    sender
        .send(outcome.report())
        .await
        .with_context(|| format!("Rank {} failed to report completion", identity.rank))?;

    Ok(outcome)
}
