use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::info;

use steiner_tw::canonical::CanonicalDecomposition;
use steiner_tw::config::{AlgorithmChoice, ReducerKind, SolverConfig};
use steiner_tw::io::{write_solution, Instance};
use steiner_tw::metrics::Metrics;
use steiner_tw::solver::solve;

#[derive(Debug, Copy, Clone, ValueEnum)]
enum AlgorithmArg {
    Auto,
    Td,
    Terminals,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum ReducerArg {
    Incremental,
    FourRussians,
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Instance in PACE 2018 format (reads stdin if omitted).
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Seed for root sampling.
    #[clap(long, value_name = "INT", default_value = "4321")]
    seed: u64,

    /// Algorithm to run.
    #[clap(long, value_enum, default_value = "auto")]
    algorithm: AlgorithmArg,

    /// Elimination strategy of the rank-based reducer.
    #[clap(long, value_enum, default_value = "four-russians")]
    reducer: ReducerArg,

    /// Write the canonical tree decomposition in Graphviz format.
    #[clap(long, value_name = "FILE")]
    dot: Option<PathBuf>,

    /// Print solver statistics to stderr.
    #[clap(long)]
    stats: bool,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    let level = match args.verbose {
        0 => simplelog::LevelFilter::Info,
        1 => simplelog::LevelFilter::Debug,
        _ => simplelog::LevelFilter::Trace,
    };
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let instance = match &args.input {
        Some(path) => {
            info!("Reading {}", path.display());
            Instance::load(path)?
        }
        None => Instance::read(std::io::stdin().lock())?,
    };

    let mut config = SolverConfig {
        seed: args.seed,
        algorithm: match args.algorithm {
            AlgorithmArg::Auto => AlgorithmChoice::Auto,
            AlgorithmArg::Td => AlgorithmChoice::TreeDecomposition,
            AlgorithmArg::Terminals => AlgorithmChoice::TerminalDp,
        },
        ..SolverConfig::default()
    };
    config.reduction.reducer = match args.reducer {
        ReducerArg::Incremental => ReducerKind::Incremental,
        ReducerArg::FourRussians => ReducerKind::FourRussians,
    };

    if let Some(path) = &args.dot {
        let Some(td) = &instance.decomposition else {
            color_eyre::eyre::bail!("--dot needs an instance with a tree decomposition");
        };
        let canonical = CanonicalDecomposition::build(td, &instance.graph, &config)?;
        let dot = canonical.to_dot_with_config(&instance.graph, &config.dot)?;
        File::create(path)?.write_all(dot.as_bytes())?;
        info!("Wrote canonical decomposition ({} bags) to {}", canonical.num_bags(), path.display());
    }

    let mut metrics = Metrics::default();
    let outcome = solve(&instance.graph, instance.decomposition.as_ref(), &config, &mut metrics)?;

    let stdout = std::io::stdout();
    write_solution(&mut stdout.lock(), &instance.graph, &outcome)?;

    if args.stats {
        eprintln!("{}", metrics);
        eprintln!("reduction ratio: {:.3}", metrics.reduction_ratio());
        eprintln!("time in DP: {:.2?}", metrics.total_time());
    }
    info!("All done in {:.2?}", time_total.elapsed());

    Ok(())
}
