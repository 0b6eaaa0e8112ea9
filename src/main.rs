//! randwalk CLI entry point

use anyhow::{Context, Result};
use randwalk::config::cli::{Cli, ExecutionMode};
use randwalk::config::{SimulationConfig, USAGE};
use randwalk::controller::run_controller;
use randwalk::distributed::{TcpReportListener, TcpReportSender};
use randwalk::group::launcher::{launch_group, LaunchOptions};
use randwalk::group::{GroupContext, Role};
use randwalk::walker::{run_walker, steps::RandomSteps, walker_seed};
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    if let Err(e) = randwalk::logging::setup_logging(cli.debug) {
        eprintln!("Warning: {:#}", e);
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    cli.validate()?;

    match cli.mode {
        ExecutionMode::Launch => run_launch(&cli),
        ExecutionMode::Member => run_member(&cli),
    }
}

/// Run in launch mode (start a local group)
fn run_launch(cli: &Cli) -> Result<ExitCode> {
    let options = LaunchOptions {
        world_size: cli.group_size(),
        params: cli.params.clone(),
        seed: cli.seed,
        connect_timeout_secs: cli.connect_timeout_secs,
        json: cli.json,
        debug: cli.debug,
    };

    let status = launch_group(&options).context("Failed to launch process group")?;

    if status.success() {
        Ok(ExitCode::SUCCESS)
    } else {
        debug!("Failed ranks: {:?}", status.failed_ranks());
        Ok(ExitCode::from(1))
    }
}

/// Run as one member of a group
fn run_member(cli: &Cli) -> Result<ExitCode> {
    // validate() guarantees these are present in member mode
    let (Some(rank), Some(world_size), Some(controller_addr)) =
        (cli.rank, cli.world_size, cli.controller.as_deref())
    else {
        anyhow::bail!("member mode requires --rank, --world-size and --controller");
    };

    let ctx = GroupContext::new(rank, world_size)?;

    let config = match SimulationConfig::from_args(&cli.params) {
        Ok(config) => config,
        Err(e) => {
            if ctx.is_controller() {
                eprintln!("{}", USAGE);
            }
            debug!(rank = %ctx.rank, "usage error: {}", e);
            return Ok(ExitCode::from(1));
        }
    };

    // One OS thread per member process
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let identity = ctx.identity();
    match identity.role {
        Role::Controller => runtime.block_on(controller_member(cli, &ctx, &config, controller_addr)),
        Role::Walker(_) => runtime.block_on(walker_member(cli, &ctx, &config, controller_addr)),
    }
}

/// Controller member: bind, collect every report, summarize
async fn controller_member(
    cli: &Cli,
    ctx: &GroupContext,
    config: &SimulationConfig,
    controller_addr: &str,
) -> Result<ExitCode> {
    let mut listener = TcpReportListener::bind(controller_addr).await?;
    let summary = run_controller(ctx.walker_count(), config, &mut listener).await?;

    if cli.json {
        let line = serde_json::to_string(&summary).context("Failed to serialize summary")?;
        println!("{}", line);
    }

    Ok(ExitCode::SUCCESS)
}

/// Walker member: connect, walk, report once
async fn walker_member(
    cli: &Cli,
    ctx: &GroupContext,
    config: &SimulationConfig,
    controller_addr: &str,
) -> Result<ExitCode> {
    let identity = ctx.identity();
    let seed = walker_seed(identity.rank, cli.seed);
    debug!(rank = %identity.rank, seed, %config, "walker starting");

    let timeout = Duration::from_secs(cli.connect_timeout_secs);
    let sender = TcpReportSender::connect(controller_addr, identity.rank, timeout).await?;

    let mut steps = RandomSteps::with_seed(seed);
    run_walker(identity, config, &mut steps, sender).await?;

    Ok(ExitCode::SUCCESS)
}
