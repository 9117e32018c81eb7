use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, BufReader};
use tracing_subscriber::EnvFilter;

use arena_state::{GameConfig, TaskStateEngine};
use arena_viewer::{drive, EventFeed, LinkGraph, Report, Simulation, ViewerConfig};

#[derive(Parser)]
#[command(name = "arena-viewer", version, about = "Replay or simulate a page race and report its state")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (overrides the config file)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ViewArgs {
    /// Step back this many indices from live before reporting
    #[arg(long, default_value_t = 0)]
    step_back: usize,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay newline-delimited JSON events from a file, or stdin with "-"
    Replay {
        input: String,
        /// Shared start page
        #[arg(long)]
        start: String,
        /// Shared target page
        #[arg(long)]
        target: String,
        /// Game id to register (repeatable)
        #[arg(long = "game", required = true)]
        games: Vec<String>,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Race random walkers over the built-in link graph
    Simulate {
        #[arg(long, default_value = "Potato")]
        start: String,
        #[arg(long, default_value = "Philosophy")]
        target: String,
        /// Number of games
        #[arg(long)]
        games: Option<usize>,
        /// Step limit per game
        #[arg(long)]
        max_steps: Option<u32>,
        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
        /// Moves made before the solver answers for a page
        #[arg(long)]
        solver_lag: Option<u32>,
        #[command(flatten)]
        view: ViewArgs,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ViewerConfig::load(cli.config.as_deref()).context("loading viewer config")?;
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }
    init_logging(&config.log.level);

    match cli.command {
        Commands::Replay {
            input,
            start,
            target,
            games,
            view,
        } => {
            let configs: Vec<GameConfig> = games.iter().map(|id| GameConfig::new(id, &start, &target)).collect();
            let source: Box<dyn AsyncBufRead + Unpin + Send> = if input == "-" {
                Box::new(BufReader::new(tokio::io::stdin()))
            } else {
                let file = tokio::fs::File::open(&input)
                    .await
                    .with_context(|| format!("opening {input}"))?;
                Box::new(BufReader::new(file))
            };
            let feed = EventFeed::spawn(source, config.feed.channel_capacity);
            run(&configs, feed, &view).await
        }
        Commands::Simulate {
            start,
            target,
            games,
            max_steps,
            seed,
            solver_lag,
            view,
        } => {
            let sim = &mut config.simulation;
            sim.games = games.unwrap_or(sim.games);
            sim.max_steps = max_steps.unwrap_or(sim.max_steps);
            sim.seed = seed.or(sim.seed);
            sim.solver_lag = solver_lag.unwrap_or(sim.solver_lag);
            config.validate()?;

            let graph = LinkGraph::sample();
            let race = Simulation::new(&graph, &config.simulation).run(&start, &target)?;
            let feed = EventFeed::from_events(race.events, config.feed.channel_capacity);
            run(&race.configs, feed, &view).await
        }
    }
}

async fn run(configs: &[GameConfig], mut feed: EventFeed, view: &ViewArgs) -> anyhow::Result<()> {
    let mut engine = TaskStateEngine::new();
    if !engine.create_task(configs) {
        bail!("no games to register");
    }

    let stats = drive(&mut engine, &mut feed).await;
    let feed_stats = feed.finish().await?;
    tracing::info!(
        applied = stats.applied,
        ignored = stats.ignored,
        skipped = feed_stats.skipped,
        "Event stream finished"
    );

    for _ in 0..view.step_back {
        if !engine.step_backward() {
            break;
        }
    }

    let report = Report::capture(&engine)?;
    if view.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.to_text());
    }
    Ok(())
}
