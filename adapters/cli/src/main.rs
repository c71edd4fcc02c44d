#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a Beverage Bandits battle.

mod config;
mod snapshot_transfer;

use std::{
    fs,
    io::{self, Read, StdoutLock, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use bandits_core::{CellCoord, Event};
use bandits_rendering::{Presentation, Presenter, Scene, TextPresenter};
use bandits_system_analytics::{Analytics, BattleReport};
use bandits_system_power_search::PowerSearch;
use bandits_system_turns::{BattleObserver, Turns};
use bandits_world::{query, World};
use clap::Parser;
use config::CliConfig;
use snapshot_transfer::BattleTransfer;
use tracing_subscriber::EnvFilter;

/// Simulates Elves and Goblins fighting on a cave map.
#[derive(Debug, Parser)]
#[command(name = "bandits", version, about)]
struct Args {
    /// Map file to read; standard input when omitted.
    input: Option<PathBuf>,
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Attack power of every Elf.
    #[arg(long)]
    elf_power: Option<u32>,
    /// Attack power of every Goblin.
    #[arg(long)]
    goblin_power: Option<u32>,
    /// Hit points every unit starts with.
    #[arg(long)]
    starting_health: Option<u32>,
    /// Abort battles that take more rounds than this.
    #[arg(long)]
    max_rounds: Option<u32>,
    /// Print the map after every round.
    #[arg(long)]
    show_rounds: bool,
    /// Print the map before every unit's turn, marking the acting unit.
    #[arg(long)]
    show_turns: bool,
    /// Append unit health to printed map rows.
    #[arg(long)]
    annotate: bool,
    /// Colour printed maps with ANSI escapes.
    #[arg(long)]
    color: bool,
    /// Also find the weakest Elf power that wins without losses.
    #[arg(long)]
    search_elf_power: bool,
    /// Print an encoded snapshot of the final battle state.
    #[arg(long)]
    export_snapshot: bool,
    /// Resume from an encoded snapshot instead of reading a map.
    #[arg(long, value_name = "SNAPSHOT", conflicts_with = "input")]
    import_snapshot: Option<String>,
    /// More logging; repeat for more detail.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn settings(&self) -> Result<CliConfig> {
        let mut settings = match &self.config {
            Some(path) => CliConfig::load(path)?,
            None => CliConfig::default(),
        };
        if let Some(power) = self.elf_power {
            settings.battle.elf_power = power;
        }
        if let Some(power) = self.goblin_power {
            settings.battle.goblin_power = power;
        }
        if let Some(health) = self.starting_health {
            settings.battle.starting_health = health;
        }
        if self.max_rounds.is_some() {
            settings.max_rounds = self.max_rounds;
        }
        Ok(settings)
    }
}

/// Entry point for the Beverage Bandits command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    run(&args)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let settings = args.settings()?;
    let (mut world, map_text) = load_world(args, &settings)?;
    let battle = *query::config(&world);
    tracing::info!(
        "battle starts: elf power {}, goblin power {}",
        battle.elf_power,
        battle.goblin_power
    );

    let stdout = io::stdout();
    let presentation = Presentation {
        annotate: args.annotate,
        color: args.color,
    };
    let mut watch = BattleWatch {
        presenter: (args.show_rounds || args.show_turns)
            .then(|| TextPresenter::new(stdout.lock(), presentation)),
        show_rounds: args.show_rounds,
        show_turns: args.show_turns,
        analytics: Analytics::new(),
        error: None,
    };
    if args.show_rounds {
        watch.show(&world, None);
    }

    let _ = Turns::new()
        .run_observed(&mut world, settings.max_rounds, &mut watch)
        .context("battle failed")?;
    if let Some(error) = watch.error.take() {
        return Err(error.context("failed to print battle"));
    }
    let BattleWatch {
        presenter,
        mut analytics,
        ..
    } = watch;
    drop(presenter);

    let report = analytics.report(&world);
    let mut out = stdout.lock();
    print_report(&mut out, &report)?;

    if args.search_elf_power {
        let result = PowerSearch::new()
            .with_round_limit(settings.max_rounds)
            .run(&map_text, battle)
            .context("elf power search failed")?;
        writeln!(
            out,
            "Elves need attack power {} to win without losses",
            result.elf_power
        )?;
        print_report(&mut out, &result.report)?;
    }

    if args.export_snapshot {
        let encoded = BattleTransfer::capture(&world)
            .encode()
            .context("failed to encode snapshot")?;
        writeln!(out, "{encoded}")?;
    }

    Ok(())
}

/// Feeds analytics and prints frames while a battle runs.
struct BattleWatch<'a> {
    presenter: Option<TextPresenter<StdoutLock<'a>>>,
    show_rounds: bool,
    show_turns: bool,
    analytics: Analytics,
    error: Option<anyhow::Error>,
}

impl BattleWatch<'_> {
    fn show(&mut self, world: &World, highlight: Option<CellCoord>) {
        if self.error.is_some() {
            return;
        }
        let Some(presenter) = self.presenter.as_mut() else {
            return;
        };
        let frame = Scene::from_world(world, highlight)
            .map_err(anyhow::Error::from)
            .and_then(|scene| presenter.present(&scene));
        if let Err(error) = frame {
            self.error = Some(error);
        }
    }
}

impl BattleObserver for BattleWatch<'_> {
    fn before_turn(&mut self, world: &World, actor: CellCoord) {
        if self.show_turns {
            self.show(world, Some(actor));
        }
    }

    fn after_tick(&mut self, world: &World, events: &[Event]) {
        self.analytics.handle(events);
        if self.show_rounds {
            self.show(world, None);
        }
    }
}

fn load_world(args: &Args, settings: &CliConfig) -> Result<(World, String)> {
    if let Some(encoded) = &args.import_snapshot {
        let transfer = BattleTransfer::decode(encoded).context("failed to decode snapshot")?;
        let map_text = transfer.snapshot.map.clone();
        let world = transfer
            .into_world()
            .context("failed to restore snapshot")?;
        return Ok((world, map_text));
    }

    let map_text = match &args.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read map {}", path.display()))?,
        None => {
            let mut text = String::new();
            let _ = io::stdin()
                .read_to_string(&mut text)
                .context("failed to read map from standard input")?;
            text
        }
    };
    let world = World::from_text(&map_text, settings.battle).context("invalid map")?;
    Ok((world, map_text))
}

fn print_report(out: &mut impl Write, report: &BattleReport) -> Result<()> {
    writeln!(
        out,
        "Combat ends after {} full rounds",
        report.completed_rounds
    )?;
    match report.winner {
        Some(faction) => writeln!(
            out,
            "{} win with {} total hit points left",
            faction.plural(),
            report.remaining_health
        )?,
        None => writeln!(out, "Nobody was left standing")?,
    }
    writeln!(
        out,
        "Outcome: {} * {} = {}",
        report.completed_rounds, report.remaining_health, report.outcome
    )?;
    Ok(())
}
