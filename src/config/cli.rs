//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Launch mode (default) - start a local group of member processes
    Launch,
    /// Member mode - run as one rank of a group (controller or walker)
    Member,
}

/// randwalk - distributed random walk simulation
#[derive(Parser, Debug)]
#[command(name = "randwalk")]
#[command(version, about, long_about = None)]
#[command(allow_negative_numbers = true)]
pub struct Cli {
    /// Execution mode: launch or member
    #[arg(long, value_enum, default_value = "launch")]
    pub mode: ExecutionMode,

    /// Number of processes in the group, controller included (launch mode only)
    #[arg(long = "np", short = 'n')]
    pub num_processes: Option<usize>,

    /// This member's rank (member mode only)
    #[arg(long, env = "RANDWALK_RANK")]
    pub rank: Option<u32>,

    /// Number of processes in the group (member mode only)
    #[arg(long, env = "RANDWALK_WORLD_SIZE")]
    pub world_size: Option<usize>,

    /// Controller address HOST:PORT (member mode only)
    #[arg(long, env = "RANDWALK_CONTROLLER")]
    pub controller: Option<String>,

    /// Base random seed; each walker adds its rank (default: wall clock)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Seconds a walker keeps retrying to reach the controller
    #[arg(long, default_value = "30")]
    pub connect_timeout_secs: u64,

    /// Print the controller's summary as a JSON line
    #[arg(long)]
    pub json: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Simulation parameters: <domain_size> <max_steps>
    ///
    /// Collected loosely so that a wrong count is reported by rank 0 only.
    #[arg(value_name = "PARAMS", num_args = 0..)]
    pub params: Vec<String>,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate mode-specific flags
    ///
    /// Positional parameters are not checked here; members check them after
    /// they know their rank.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.mode {
            ExecutionMode::Launch => {
                if self.num_processes == Some(0) {
                    anyhow::bail!("--np must be at least 1");
                }
            }
            ExecutionMode::Member => {
                if self.rank.is_none() {
                    anyhow::bail!("member mode requires --rank (or RANDWALK_RANK)");
                }
                if self.world_size.is_none() {
                    anyhow::bail!("member mode requires --world-size (or RANDWALK_WORLD_SIZE)");
                }
                if self.controller.is_none() {
                    anyhow::bail!("member mode requires --controller (or RANDWALK_CONTROLLER)");
                }
            }
        }

        Ok(())
    }

    /// Group size for launch mode
    pub fn group_size(&self) -> usize {
        self.num_processes.unwrap_or_else(num_cpus::get)
    }
}
