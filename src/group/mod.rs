//! Process group identity
//!
//! Every member of a launched group knows two things about itself: its rank
//! and the size of the group. Rank 0 is the controller, every other rank is a
//! walker. The role is decided once here and never re-derived.

pub mod launcher;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A member's unique identifier within the launched group
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rank(pub u32);

impl Rank {
    /// The controller's fixed rank
    pub const CONTROLLER: Rank = Rank(0);

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role a member plays for its whole lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Controller,
    Walker(Rank),
}

impl Role {
    pub fn from_rank(rank: Rank) -> Self {
        if rank == Rank::CONTROLLER {
            Role::Controller
        } else {
            Role::Walker(rank)
        }
    }
}

/// Identity of this process within the group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkerIdentity {
    pub rank: Rank,
    pub role: Role,
}

/// Launch-time facts about the group, as seen by one member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupContext {
    pub rank: Rank,
    pub world_size: usize,
}

impl GroupContext {
    /// Create a context, rejecting ranks outside the group
    pub fn new(rank: u32, world_size: usize) -> anyhow::Result<Self> {
        if world_size == 0 {
            anyhow::bail!("world size must be at least 1");
        }
        if rank as usize >= world_size {
            anyhow::bail!("rank {} is outside a group of {} processes", rank, world_size);
        }

        Ok(Self {
            rank: Rank(rank),
            world_size,
        })
    }

    pub fn identity(&self) -> WalkerIdentity {
        WalkerIdentity {
            rank: self.rank,
            role: Role::from_rank(self.rank),
        }
    }

    /// Number of walkers the controller waits for
    pub fn walker_count(&self) -> usize {
        self.world_size - 1
    }

    pub fn is_controller(&self) -> bool {
        self.rank == Rank::CONTROLLER
    }
}
