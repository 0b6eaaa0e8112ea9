//! Report transport abstraction
//!
//! Walkers hold a [`ReportSender`], the controller holds a [`ReportReceiver`].
//! The receiver is a wildcard-source fan-in: `recv_any` returns the next report
//! from whichever walker delivered first, tagged with the sender's rank as
//! known to the transport.
//!
//! Two implementations exist:
//! - [`channel`]: in-process, backed by a tokio mpsc queue (one producer per walker)
//! - [`crate::distributed::tcp`]: one TCP connection per walker process

use crate::group::Rank;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A walker's completion report
///
/// Carries only the step count; the sender is identified by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub steps_taken: u64,
}

/// A report as seen by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received {
    /// Rank the transport attributes the report to
    pub source: Rank,
    pub report: CompletionReport,
}

/// Walker side of the transport
///
/// `send` consumes the sender, so a walker can deliver at most one report.
#[allow(async_fn_in_trait)]
pub trait ReportSender {
    async fn send(self, report: CompletionReport) -> Result<()>;
}

/// Controller side of the transport
#[allow(async_fn_in_trait)]
pub trait ReportReceiver {
    /// Block until a report from any walker is available
    async fn recv_any(&mut self) -> Result<Received>;
}

/// Create an in-process transport
///
/// Returns a factory for per-rank senders and the single receiver.
pub fn channel() -> (ChannelLinks, ChannelReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelLinks { tx }, ChannelReceiver { rx })
}

/// Hands out rank-stamped senders for the in-process transport
#[derive(Debug, Clone)]
pub struct ChannelLinks {
    tx: mpsc::UnboundedSender<Received>,
}

impl ChannelLinks {
    pub fn sender(&self, rank: Rank) -> ChannelSender {
        ChannelSender {
            rank,
            tx: self.tx.clone(),
        }
    }
}

/// In-process walker link, bound to one rank
#[derive(Debug)]
pub struct ChannelSender {
    rank: Rank,
    tx: mpsc::UnboundedSender<Received>,
}

impl ReportSender for ChannelSender {
    async fn send(self, report: CompletionReport) -> Result<()> {
        self.tx
            .send(Received {
                source: self.rank,
                report,
            })
            .map_err(|_| anyhow::anyhow!("Controller dropped before rank {} reported", self.rank))
    }
}

/// In-process controller end
#[derive(Debug)]
pub struct ChannelReceiver {
    rx: mpsc::UnboundedReceiver<Received>,
}

impl ReportReceiver for ChannelReceiver {
    async fn recv_any(&mut self) -> Result<Received> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| anyhow::anyhow!("All walker links closed before every report arrived"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_stamps_source_rank() {
        let (links, mut receiver) = channel();

        links
            .sender(Rank(2))
            .send(CompletionReport { steps_taken: 9 })
            .await
            .unwrap();

        let received = receiver.recv_any().await.unwrap();
        assert_eq!(received.source, Rank(2));
        assert_eq!(received.report.steps_taken, 9);
    }

    #[tokio::test]
    async fn test_channel_receives_in_arrival_order() {
        let (links, mut receiver) = channel();

        for rank in [3u32, 1, 2] {
            links
                .sender(Rank(rank))
                .send(CompletionReport {
                    steps_taken: rank as u64 * 10,
                })
                .await
                .unwrap();
        }

        let sources: Vec<Rank> = [
            receiver.recv_any().await.unwrap(),
            receiver.recv_any().await.unwrap(),
            receiver.recv_any().await.unwrap(),
        ]
        .iter()
        .map(|r| r.source)
        .collect();
        assert_eq!(sources, vec![Rank(3), Rank(1), Rank(2)]);
    }

    #[tokio::test]
    async fn test_channel_closed_when_all_links_dropped() {
        let (links, mut receiver) = channel();
        drop(links);
        assert!(receiver.recv_any().await.is_err());
    }

    #[tokio::test]
    async fn test_send_fails_after_receiver_dropped() {
        let (links, receiver) = channel();
        drop(receiver);

        let result = links
            .sender(Rank(1))
            .send(CompletionReport { steps_taken: 1 })
            .await;
        assert!(result.is_err());
    }
}
