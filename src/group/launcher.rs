//! Local group launcher
//!
//! Starts a fixed-size group of member processes on this host: rank 0 becomes
//! the controller, the rest become walkers. The launcher picks the controller
//! address, hands every member the same parameters, and waits for the whole
//! group to exit. It takes no part in the coordination itself.

use crate::group::Rank;
use anyhow::{Context, Result};
use std::process::{Child, Command, ExitStatus, Stdio};
use tracing::{debug, warn};

/// What every member of the group is started with
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Processes in the group, controller included
    pub world_size: usize,
    /// Positional parameters forwarded verbatim to every member
    pub params: Vec<String>,
    pub seed: Option<u64>,
    pub connect_timeout_secs: u64,
    pub json: bool,
    pub debug: bool,
}

/// Exit statuses of a finished group
#[derive(Debug)]
pub struct GroupStatus {
    pub statuses: Vec<(Rank, ExitStatus)>,
}

impl GroupStatus {
    pub fn success(&self) -> bool {
        self.statuses.iter().all(|(_, status)| status.success())
    }

    pub fn failed_ranks(&self) -> Vec<Rank> {
        self.statuses
            .iter()
            .filter(|(_, status)| !status.success())
            .map(|(rank, _)| *rank)
            .collect()
    }
}

/// Launch the group and wait for every member to exit
pub fn launch_group(options: &LaunchOptions) -> Result<GroupStatus> {
    let exe_path = std::env::current_exe().context("Failed to get current executable path")?;
    let port = find_available_port()?;
    let controller_addr = format!("127.0.0.1:{}", port);

    debug!(
        world_size = options.world_size,
        controller = %controller_addr,
        "launching group"
    );

    let mut children: Vec<(Rank, Child)> = Vec::with_capacity(options.world_size);
    for rank in 0..options.world_size as u32 {
        let rank = Rank(rank);
        let mut cmd = Command::new(&exe_path);
        cmd.args(member_args(options, rank, &controller_addr));
        cmd.stdin(Stdio::null());

        match cmd.spawn() {
            Ok(child) => {
                debug!(%rank, pid = child.id(), "member launched");
                children.push((rank, child));
            }
            Err(e) => {
                teardown(children);
                return Err(e).with_context(|| format!("Failed to spawn member process for rank {}", rank));
            }
        }
    }

    let mut statuses = Vec::with_capacity(children.len());
    for (rank, mut child) in children {
        let status = child
            .wait()
            .with_context(|| format!("Failed to wait for rank {}", rank))?;
        if !status.success() {
            debug!(%rank, %status, "member failed");
        }
        statuses.push((rank, status));
    }

    Ok(GroupStatus { statuses })
}

/// Command line for one member
pub fn member_args(options: &LaunchOptions, rank: Rank, controller_addr: &str) -> Vec<String> {
    let mut args = vec![
        "--mode".to_string(),
        "member".to_string(),
        "--rank".to_string(),
        rank.to_string(),
        "--world-size".to_string(),
        options.world_size.to_string(),
        "--controller".to_string(),
        controller_addr.to_string(),
        "--connect-timeout-secs".to_string(),
        options.connect_timeout_secs.to_string(),
    ];

    if let Some(seed) = options.seed {
        args.push("--seed".to_string());
        args.push(seed.to_string());
    }
    if options.json {
        args.push("--json".to_string());
    }
    if options.debug {
        args.push("--debug".to_string());
    }

    // Parameters go after `--` so negative values are never read as flags
    args.push("--".to_string());
    args.extend(options.params.iter().cloned());

    args
}

/// Find an available port for the controller
fn find_available_port() -> Result<u16> {
    use std::net::TcpListener;

    let listener =
        TcpListener::bind(("127.0.0.1", 0)).context("Failed to find an available controller port")?;
    let port = listener
        .local_addr()
        .context("Failed to read probe listener address")?
        .port();
    drop(listener);

    debug!("Port {} is available", port);
    Ok(port)
}

/// Kill members that already started when the group cannot be completed
fn teardown(children: Vec<(Rank, Child)>) {
    for (rank, mut child) in children {
        if let Err(e) = child.kill() {
            warn!("Failed to kill rank {} (PID {}): {}", rank, child.id(), e);
        }
        let _ = child.wait();
    }
}
