use std::path::PathBuf;

use airis_connectors::{SpillStore, TransmissionPipeline};
use airis_core::{time::SystemTime, Aggregator};
use airis_node::{NodeConfig, Scheduler, SimulatedBus, SinkChoice};
use anyhow::Context;
use clap::Parser;

/// AIRIS air-quality telemetry node
#[derive(Parser, Debug)]
#[command(version, about = "AIRIS air-quality telemetry node", long_about = None)]
struct Args {
    /// Configuration file (defaults to ./airis.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Deployment profile: default, office, home or industrial
    #[arg(short, long)]
    profile: Option<String>,

    /// Directory for records that could not be delivered
    #[arg(long)]
    spill_dir: Option<PathBuf>,

    /// Device identifier reported in every record
    #[arg(long)]
    device_id: Option<String>,

    /// Seconds between successful deliveries
    #[arg(short, long)]
    interval: Option<u64>,

    /// Log records instead of sending them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let args = Args::parse();

    let mut config = NodeConfig::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(profile) = args.profile {
        config.device.profile = Some(profile);
    }
    if let Some(dir) = args.spill_dir {
        config.spill.directory = dir;
    }
    if let Some(id) = args.device_id {
        config.device.id = Some(id);
    }
    if let Some(interval) = args.interval {
        config.sampling.interval_seconds = Some(interval);
    }

    let ctx = config.into_context().context("resolving configuration")?;

    let aggregator = Aggregator::new(SimulatedBus::new(), SystemTime, ctx.thresholds.clone(), &ctx.sensors)
        .context("building sensor table")?;

    let sink = SinkChoice::select(ctx.http.clone(), args.dry_run)
        .build()
        .context("building sink")?;

    let mut pipeline = TransmissionPipeline::new(sink, SpillStore::new(&ctx.spill_dir));
    if let Some(location) = &ctx.location {
        pipeline = pipeline.with_location(location.clone());
    }

    let mut scheduler = Scheduler::new(aggregator, pipeline, ctx.device_id.clone(), ctx.interval);

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::error!("Cannot listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };
    scheduler.run(shutdown).await;

    Ok(())
}
