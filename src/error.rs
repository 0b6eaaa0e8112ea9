//! Error types for randwalk
//!
//! Structured errors for the conditions callers branch on:
//! - Usage errors (bad positional arguments, reported once by rank 0)
//! - Tally errors (a report the controller cannot account for)
//! - Protocol errors (a malformed conversation on the wire)
//!
//! Everything else (socket failures, spawn failures) travels as `anyhow::Error`
//! with context attached at the call site.

use crate::group::Rank;
use thiserror::Error;

/// Positional argument problems detected before any coordination starts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// Wrong number of positional arguments
    #[error("expected 2 positional arguments (domain_size, max_steps), got {0}")]
    WrongArgumentCount(usize),
}

/// Reports the controller refuses to count
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TallyError {
    /// Source rank is not one of the group's walkers
    #[error("report from rank {rank} but walkers are ranks 1..={max_rank}")]
    UnknownRank { rank: Rank, max_rank: usize },

    /// A walker reported twice
    #[error("duplicate report from rank {0}")]
    DuplicateReport(Rank),

    /// Report arrived after all walkers were accounted for
    #[error("report from rank {0} after all walkers finished")]
    AlreadyDone(Rank),
}

/// Wire-level conversation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Peer speaks a different protocol version
    #[error("protocol version mismatch: controller={expected}, walker={actual}")]
    VersionMismatch { expected: u32, actual: u32 },

    /// Report carried a tag other than the report tag
    #[error("unexpected message tag {0}")]
    UnexpectedTag(u32),

    /// Message arrived out of sequence
    #[error("expected {expected}, got {actual}")]
    UnexpectedMessage {
        expected: &'static str,
        actual: String,
    },

    /// Frame length exceeds the protocol maximum
    #[error("message too large: {0} bytes")]
    FrameTooLarge(usize),
}
