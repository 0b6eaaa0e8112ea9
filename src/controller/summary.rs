//! Step-count statistics over all walker reports
//!
//! Step counts are recorded into an HDR histogram so the median stays cheap
//! to compute for large groups. Min and max are tracked exactly.

use anyhow::{Context, Result};
use hdrhistogram::Histogram;
use serde::Serialize;

/// Aggregate outcome of a run, as seen by the controller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionSummary {
    /// Walkers that reported
    pub walkers_finished: usize,
    /// Step statistics (absent when the group had no walkers)
    pub steps: Option<StepStats>,
}

/// Distribution of reported step counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepStats {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub median: u64,
    /// Walkers whose report equals the full step budget
    pub reached_max_steps: usize,
}

impl CompletionSummary {
    /// Console line describing the step distribution
    pub fn steps_line(&self) -> Option<String> {
        self.steps.as_ref().map(|s| {
            format!(
                "Controller: Steps min {} / mean {:.1} / median {} / max {} ({} reached max steps)",
                s.min, s.mean, s.median, s.max, s.reached_max_steps
            )
        })
    }

    /// Final aggregate line
    pub fn finished_line(&self) -> String {
        format!("Controller: All {} walkers have finished.", self.walkers_finished)
    }
}

/// Accumulates step counts as reports arrive
pub struct StepStatistics {
    histogram: Histogram<u64>,
    step_budget: u64,
    min: u64,
    max: u64,
    reached_max_steps: usize,
}

impl StepStatistics {
    pub fn new(step_budget: u64) -> Result<Self> {
        let histogram = Histogram::new(3).context("Failed to create step histogram")?;

        Ok(Self {
            histogram,
            step_budget,
            min: u64::MAX,
            max: 0,
            reached_max_steps: 0,
        })
    }

    pub fn record(&mut self, steps_taken: u64) -> Result<()> {
        self.histogram
            .record(steps_taken)
            .with_context(|| format!("Failed to record step count {}", steps_taken))?;

        self.min = self.min.min(steps_taken);
        self.max = self.max.max(steps_taken);
        if steps_taken == self.step_budget {
            self.reached_max_steps += 1;
        }

        Ok(())
    }

    pub fn summary(&self, walkers_finished: usize) -> CompletionSummary {
        let steps = if self.histogram.len() == 0 {
            None
        } else {
            Some(StepStats {
                min: self.min,
                max: self.max,
                mean: self.histogram.mean(),
                median: self.histogram.value_at_quantile(0.5),
                reached_max_steps: self.reached_max_steps,
            })
        };

        CompletionSummary {
            walkers_finished,
            steps,
        }
    }
}
