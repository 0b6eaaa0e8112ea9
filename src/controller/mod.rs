//! Controller implementation
//!
//! The controller collects exactly one completion report from each walker,
//! in whatever order they arrive, and confirms aggregate completion.
//!
//! # State machine
//!
//! ```text
//! Waiting(0) -> Waiting(1) -> ... -> Waiting(N-1) -> Done
//! ```
//!
//! One transition per received report, no branching and no retries. Every
//! receive accepts a report from any walker.

pub mod summary;

use crate::config::SimulationConfig;
use crate::distributed::transport::{CompletionReport, ReportReceiver, Received};
use crate::error::TallyError;
use crate::group::Rank;
use anyhow::{Context, Result};
use std::collections::HashSet;
use summary::StepStatistics;
use tracing::debug;

pub use summary::{CompletionSummary, StepStats};

/// Controller progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Waiting { received: usize },
    Done,
}

/// Controller-local count of reports received
#[derive(Debug, Clone)]
pub struct CompletionTally {
    expected_count: usize,
    received_count: usize,
    reported: HashSet<Rank>,
}

impl CompletionTally {
    pub fn new(expected_count: usize) -> Self {
        Self {
            expected_count,
            received_count: 0,
            reported: HashSet::with_capacity(expected_count),
        }
    }

    pub fn state(&self) -> ControllerState {
        if self.received_count == self.expected_count {
            ControllerState::Done
        } else {
            ControllerState::Waiting {
                received: self.received_count,
            }
        }
    }

    pub fn received_count(&self) -> usize {
        self.received_count
    }

    pub fn expected_count(&self) -> usize {
        self.expected_count
    }

    /// Count one report
    ///
    /// Walkers are ranks `1..=expected_count`, and each may report once.
    pub fn record(&mut self, source: Rank, _report: CompletionReport) -> Result<ControllerState, TallyError> {
        if self.state() == ControllerState::Done {
            return Err(TallyError::AlreadyDone(source));
        }
        if source == Rank::CONTROLLER || source.as_usize() > self.expected_count {
            return Err(TallyError::UnknownRank {
                rank: source,
                max_rank: self.expected_count,
            });
        }
        if !self.reported.insert(source) {
            return Err(TallyError::DuplicateReport(source));
        }

        self.received_count += 1;
        Ok(self.state())
    }
}

/// Controller entry point
///
/// Performs `expected_count` wildcard receives, logging each report, then
/// prints the aggregate summary. Blocks for as long as any walker has not
/// reported.
pub async fn run_controller<R>(
    expected_count: usize,
    config: &SimulationConfig,
    receiver: &mut R,
) -> Result<CompletionSummary>
where
    R: ReportReceiver,
{
    let mut tally = CompletionTally::new(expected_count);
    let mut stats = StepStatistics::new(config.step_budget())?;

    while let ControllerState::Waiting { received } = tally.state() {
        let Received { source, report } = receiver.recv_any().await.with_context(|| {
            format!(
                "Failed waiting for walker report {} of {}",
                received + 1,
                expected_count
            )
        })?;

        tally
            .record(source, report)
            .context("Rejected walker report")?;
        stats.record(report.steps_taken)?;

        println!(
            "Controller: Received completion from Rank {} (steps taken: {})",
            source, report.steps_taken
        );
        debug!(received = tally.received_count(), expected = expected_count, "tally updated");
    }

    let summary = stats.summary(tally.received_count());
    if let Some(line) = summary.steps_line() {
        println!("{}", line);
    }
    println!("{}", summary.finished_line());

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::transport::{channel, ReportSender};

    fn report(steps_taken: u64) -> CompletionReport {
        CompletionReport { steps_taken }
    }

    #[test]
    fn test_tally_state_machine() {
        let mut tally = CompletionTally::new(3);
        assert_eq!(tally.state(), ControllerState::Waiting { received: 0 });

        assert_eq!(
            tally.record(Rank(2), report(5)),
            Ok(ControllerState::Waiting { received: 1 })
        );
        assert_eq!(
            tally.record(Rank(3), report(5)),
            Ok(ControllerState::Waiting { received: 2 })
        );
        assert_eq!(tally.record(Rank(1), report(5)), Ok(ControllerState::Done));
        assert_eq!(tally.received_count(), tally.expected_count());
    }

    #[test]
    fn test_tally_with_no_walkers_is_done() {
        let tally = CompletionTally::new(0);
        assert_eq!(tally.state(), ControllerState::Done);
    }

    #[test]
    fn test_tally_order_independence() {
        let orders: [[u32; 4]; 4] = [[1, 2, 3, 4], [4, 3, 2, 1], [2, 4, 1, 3], [3, 1, 4, 2]];

        for order in orders {
            let mut tally = CompletionTally::new(4);
            for rank in order {
                tally.record(Rank(rank), report(rank as u64)).unwrap();
            }
            assert_eq!(tally.state(), ControllerState::Done);
            assert_eq!(tally.received_count(), 4);
        }
    }

    #[test]
    fn test_tally_rejects_duplicate() {
        let mut tally = CompletionTally::new(3);
        tally.record(Rank(1), report(5)).unwrap();
        assert_eq!(
            tally.record(Rank(1), report(6)),
            Err(TallyError::DuplicateReport(Rank(1)))
        );
        assert_eq!(tally.received_count(), 1);
    }

    #[test]
    fn test_tally_rejects_unknown_rank() {
        let mut tally = CompletionTally::new(2);
        assert!(matches!(
            tally.record(Rank(0), report(1)),
            Err(TallyError::UnknownRank { .. })
        ));
        assert!(matches!(
            tally.record(Rank(3), report(1)),
            Err(TallyError::UnknownRank { .. })
        ));
    }

    #[test]
    fn test_tally_rejects_report_after_done() {
        let mut tally = CompletionTally::new(1);
        tally.record(Rank(1), report(2)).unwrap();
        assert_eq!(
            tally.record(Rank(1), report(2)),
            Err(TallyError::AlreadyDone(Rank(1)))
        );
    }

    #[tokio::test]
    async fn test_run_controller_out_of_order() {
        let config = SimulationConfig::new(3, 100);
        let (links, mut receiver) = channel();

        for (rank, steps) in [(4u32, 30u64), (2, 9), (3, 100), (1, 16)] {
            links.sender(Rank(rank)).send(report(steps)).await.unwrap();
        }

        let summary = run_controller(4, &config, &mut receiver).await.unwrap();
        assert_eq!(summary.walkers_finished, 4);

        let steps = summary.steps.unwrap();
        assert_eq!(steps.min, 9);
        assert_eq!(steps.max, 100);
        assert_eq!(steps.reached_max_steps, 1);
    }

    #[tokio::test]
    async fn test_run_controller_same_outcome_any_order() {
        let config = SimulationConfig::new(3, 100);
        let reports = [(1u32, 12u64), (2, 40), (3, 7)];
        let mut outcomes = Vec::new();

        for order in [[0usize, 1, 2], [2, 1, 0], [1, 2, 0]] {
            let (links, mut receiver) = channel();
            for idx in order {
                let (rank, steps) = reports[idx];
                links.sender(Rank(rank)).send(report(steps)).await.unwrap();
            }
            outcomes.push(run_controller(3, &config, &mut receiver).await.unwrap());
        }

        assert!(outcomes.iter().all(|s| s.walkers_finished == 3));
        assert!(outcomes.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_run_controller_with_no_walkers() {
        let config = SimulationConfig::new(3, 100);
        let (_links, mut receiver) = channel();

        let summary = run_controller(0, &config, &mut receiver).await.unwrap();
        assert_eq!(summary.walkers_finished, 0);
        assert!(summary.steps.is_none());
    }

    #[tokio::test]
    async fn test_run_controller_fails_on_duplicate() {
        let config = SimulationConfig::new(3, 100);
        let (links, mut receiver) = channel();

        links.sender(Rank(1)).send(report(3)).await.unwrap();
        links.sender(Rank(1)).send(report(3)).await.unwrap();

        let err = run_controller(2, &config, &mut receiver).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<TallyError>(),
            Some(&TallyError::DuplicateReport(Rank(1)))
        );
    }

    #[tokio::test]
    async fn test_run_controller_walkers_race() {
        let config = SimulationConfig::new(2, 50);
        let (links, mut receiver) = channel();

        let mut handles = Vec::new();
        for rank in 1..=8u32 {
            let sender = links.sender(Rank(rank));
            handles.push(tokio::spawn(async move {
                tokio::task::yield_now().await;
                sender.send(report(rank as u64)).await.unwrap();
            }));
        }
        drop(links);

        let summary = run_controller(8, &config, &mut receiver).await.unwrap();
        assert_eq!(summary.walkers_finished, 8);
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
