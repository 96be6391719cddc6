use clap::Parser;
use log::info;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use steiner_tw::config::{AlgorithmChoice, SolverConfig};
use steiner_tw::decomposition::TreeDecomposition;
use steiner_tw::graph::Graph;
use steiner_tw::metrics::Metrics;
use steiner_tw::solver::{solve, Outcome};
use steiner_tw::types::{Cost, VertexId};

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Number of rows.
    #[arg(value_name = "INT", default_value = "8")]
    rows: usize,

    /// Number of columns (the path decomposition has bags of `cols + 1` vertices).
    #[arg(value_name = "INT", default_value = "5")]
    cols: usize,

    /// Number of terminals.
    #[clap(short, long, value_name = "INT", default_value = "8")]
    terminals: usize,

    /// Largest edge weight (weights are uniform in `1..=max_weight`).
    #[clap(long, value_name = "INT", default_value = "10")]
    max_weight: Cost,

    /// Random seed.
    #[clap(long, value_name = "INT", default_value = "42")]
    seed: u64,
}

/// Grid graph with random weights and its row-major path decomposition.
fn grid(rows: usize, cols: usize, max_weight: Cost, rng: &mut impl Rng) -> (Graph, TreeDecomposition) {
    let n = rows * cols;
    let mut graph = Graph::new(n);
    for i in 0..rows {
        for j in 0..cols {
            let k = i * cols + j;
            if j + 1 < cols {
                graph.add_edge(VertexId::from(k), VertexId::from(k + 1), rng.random_range(1..=max_weight));
            }
            if i + 1 < rows {
                graph.add_edge(VertexId::from(k), VertexId::from(k + cols), rng.random_range(1..=max_weight));
            }
        }
    }

    // Bag `k` holds vertices `k..=k+cols`.
    let bags = (0..n.saturating_sub(cols).max(1))
        .map(|k| (k..n.min(k + cols + 1)).map(VertexId::from).collect())
        .collect();
    (graph, TreeDecomposition::path(bags))
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let args = Cli::parse();
    println!("args = {:?}", args);

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let (mut graph, td) = grid(args.rows, args.cols, args.max_weight, &mut rng);
    let mut vertices: Vec<usize> = (0..graph.num_vertices()).collect();
    vertices.shuffle(&mut rng);
    for &v in vertices.iter().take(args.terminals) {
        graph.set_terminal(VertexId::from(v), true);
    }
    println!(
        "grid {}x{}: {} edges, {} terminals, width {}",
        args.rows,
        args.cols,
        graph.num_edges(),
        graph.num_terminals(),
        td.width()
    );

    let mut costs = Vec::new();
    for algorithm in [AlgorithmChoice::TreeDecomposition, AlgorithmChoice::TerminalDp] {
        let config = SolverConfig {
            seed: args.seed,
            algorithm,
            ..SolverConfig::default()
        };
        let time = std::time::Instant::now();
        let mut metrics = Metrics::default();
        let cost = match solve(&graph, Some(&td), &config, &mut metrics) {
            Ok(Outcome::Solved(tree)) => Some(tree.cost),
            Ok(Outcome::NoSolution) => None,
            Err(e) => {
                println!("{:?}: {}", algorithm, e);
                continue;
            }
        };
        println!("{:?}: cost {:?} in {:.2?}", algorithm, cost, time.elapsed());
        if algorithm == AlgorithmChoice::TreeDecomposition {
            println!("  {}", metrics);
        }
        costs.push(cost);
    }

    if costs.windows(2).all(|w| w[0] == w[1]) {
        info!("All algorithms agree");
    } else {
        color_eyre::eyre::bail!("Algorithms disagree: {:?}", costs);
    }

    Ok(())
}
