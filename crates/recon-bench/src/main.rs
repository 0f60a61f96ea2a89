use std::path::PathBuf;

use clap::Parser;

use recon_bench::config::RunConfig;
use recon_bench::logging::init_logging;
use recon_bench::selfplay::MatchRunner;

/// Self-play harness for the fog-of-war belief engine.
#[derive(Debug, Parser)]
#[command(
    name = "recon-bench",
    author,
    version,
    about = "Fog-of-war chess self-play harness"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/selfplay.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of games to play.
    #[arg(long, value_name = "GAMES")]
    games: Option<usize>,

    /// Override the RNG base seed.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the per-game turn cap.
    #[arg(long, value_name = "TURNS")]
    max_turns: Option<usize>,

    /// Override the number of boards sampled per move decision.
    #[arg(long, value_name = "COUNT")]
    samples: Option<usize>,

    /// Exit after validating the configuration (no games are played).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = RunConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }
    if let Some(games) = cli.games {
        config.play.games = games;
    }
    if let Some(seed) = cli.seed {
        config.play.seed = Some(seed);
    }
    if let Some(max_turns) = cli.max_turns {
        config.play.max_turns = max_turns;
    }
    if let Some(samples) = cli.samples {
        config.play.samples = samples;
    }
    config.validate()?;

    let outputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let games = config.play.games;

    println!(
        "Loaded configuration '{run_id}' ({games} game{}, {} turns max, {} samples/move)",
        if games == 1 { "" } else { "s" },
        config.play.max_turns,
        config.play.samples
    );

    let logging_guard = init_logging(&config.logging, &outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: self-play skipped.");
        return Ok(());
    }

    let runner = MatchRunner::new(config, outputs);
    let summary = runner.run()?;

    println!(
        "Run '{run_id}' complete: {} games, {} turns → {}",
        summary.games_played,
        summary.turns_total,
        summary.jsonl_path.display()
    );
    if let Some(stats) = summary.final_entropy {
        println!(
            "Final belief entropy: {:.2} ± {:.2} bits (n={})",
            stats.mean, stats.ci95_half_width, stats.count
        );
    }
    if let Some(stats) = summary.certain_precision {
        println!(
            "Certain-square precision: {:.3} ± {:.3} (n={})",
            stats.mean, stats.ci95_half_width, stats.count
        );
    }
    if let Some(guard) = logging_guard.as_ref() {
        println!("Telemetry log: {}", guard.telemetry_path.display());
    }

    Ok(())
}
