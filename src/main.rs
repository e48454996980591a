use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

use road_traffic::simulation::{SimConfig, SimWorld};

#[derive(Parser)]
#[command(name = "road_traffic")]
#[command(about = "Road traffic simulation on editable Bézier roads")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "1000")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.1")]
    delta: f32,

    /// Number of vehicles to spawn (overrides the config file)
    #[arg(long)]
    vehicles: Option<usize>,

    /// Seed for reproducible vehicle placement
    #[arg(long)]
    seed: Option<u64>,

    /// RON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use an open road instead of a ring road
    #[arg(long)]
    open_road: bool,

    /// Pause between printed reports, in milliseconds
    #[arg(long, default_value = "0")]
    sleep_ms: u64,

    /// Print the ASCII map with each report
    #[arg(long)]
    map: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    run_headless(&cli, &config)
}

/// Build the run configuration from the optional file and CLI overrides
fn load_config(cli: &Cli) -> Result<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimWorld::test_world_config(None),
    };

    if let Some(vehicles) = cli.vehicles {
        config.vehicle_count = vehicles;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.open_road {
        config.ring_road = false;
    }
    Ok(config)
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(cli: &Cli, config: &SimConfig) -> Result<()> {
    println!("Running road traffic simulation in headless mode...");
    println!("Ticks: {}, Delta: {}s", cli.ticks, cli.delta);

    // Calculate how many ticks equal 1 second of simulation time
    let ticks_per_second = ((1.0 / cli.delta).ceil() as u32).max(1);
    println!("Running {} ticks per second (simulated time)", ticks_per_second);
    println!();

    let mut world = SimWorld::from_config(config).context("Failed to build simulation world")?;

    println!("Initial state:");
    world.print_summary();
    if cli.map {
        world.draw_map();
    }
    println!();

    let mut tick = 0;
    while tick < cli.ticks {
        // Run ticks_per_second ticks (or remaining ticks if fewer)
        let ticks_to_run = ticks_per_second.min(cli.ticks - tick);

        for _ in 0..ticks_to_run {
            tick += 1;
            world.tick(cli.delta);
        }

        println!(
            "--- After tick {} ({:.1}s simulated time) ---",
            tick,
            tick as f32 * cli.delta
        );
        world.print_summary();
        if cli.map {
            world.draw_map();
        }
        println!();

        if tick < cli.ticks && cli.sleep_ms > 0 {
            std::thread::sleep(std::time::Duration::from_millis(cli.sleep_ms));
        }
    }

    println!("=== Final State ===");
    world.print_summary();
    world.draw_map();

    world.stats().log_summary();
    info!("Run finished after {} ticks", tick);
    Ok(())
}
