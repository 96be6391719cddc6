use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use test_log::test;

use steiner_tw::config::{AlgorithmChoice, FourRussiansConfig, ReducerKind, ReductionConfig, SolverConfig};
use steiner_tw::decomposition::TreeDecomposition;
use steiner_tw::graph::Graph;
use steiner_tw::io::{solution_to_string, Instance};
use steiner_tw::metrics::Metrics;
use steiner_tw::solver::{solve, Outcome, SteinerTree};
use steiner_tw::types::{BagId, Cost, EdgeId, VertexId};
use steiner_tw::union_find::UnionFind;

fn v(i: usize) -> VertexId {
    VertexId::from(i)
}

fn config(algorithm: AlgorithmChoice) -> SolverConfig {
    SolverConfig {
        algorithm,
        ..SolverConfig::default()
    }
}

/// Tree-decomposition DP that reduces every table it can, four-Russians blocks included.
fn eager_config(reducer: ReducerKind) -> SolverConfig {
    let mut config = config(AlgorithmChoice::TreeDecomposition);
    config.reduction = ReductionConfig {
        reducer,
        before_extend: 1.0,
        after_edge: 1.0,
        after_forget: 1.0,
        before_join: 1.0,
        four_russians: FourRussiansConfig { block: 2, min_remaining: 0 },
        ..ReductionConfig::default()
    };
    config
}

fn run(graph: &Graph, td: Option<&TreeDecomposition>, config: &SolverConfig) -> Outcome {
    solve(graph, td, config, &mut Metrics::default()).expect("valid instance")
}

fn cost_of(outcome: &Outcome) -> Option<Cost> {
    match outcome {
        Outcome::Solved(tree) => Some(tree.cost),
        Outcome::NoSolution => None,
    }
}

/// Checks that `tree` is a forest connecting all terminals with the claimed cost.
fn assert_valid_tree(graph: &Graph, tree: &SteinerTree) {
    assert_eq!(graph.weight_of(&tree.edges), tree.cost);
    let mut uf = UnionFind::new(graph.num_vertices());
    for &e in &tree.edges {
        let edge = graph.edge(e);
        assert!(uf.union(edge.u.index(), edge.v.index()), "{} closes a cycle", e);
    }
    let terminals = graph.terminals();
    for t in &terminals[1..] {
        assert!(uf.same(terminals[0].index(), t.index()), "{} is not connected", t);
    }
}

/// Cheapest edge subset connecting the terminals, by exhaustive search.
fn brute_force(graph: &Graph) -> Option<Cost> {
    let m = graph.num_edges();
    assert!(m <= 16);
    let terminals = graph.terminals();
    let mut best: Option<Cost> = None;
    for mask in 0u32..(1 << m) {
        let edges: Vec<EdgeId> = (0..m).filter(|&i| mask >> i & 1 == 1).map(EdgeId::from).collect();
        let cost = graph.weight_of(&edges);
        if best.is_some_and(|b| b <= cost) {
            continue;
        }
        let mut uf = UnionFind::new(graph.num_vertices());
        for &e in &edges {
            let edge = graph.edge(e);
            uf.union(edge.u.index(), edge.v.index());
        }
        if terminals.iter().all(|t| uf.same(terminals[0].index(), t.index())) {
            best = Some(cost);
        }
    }
    best
}

/// Decomposition from eliminating the vertices in index order.
fn elimination_decomposition(graph: &Graph) -> TreeDecomposition {
    let n = graph.num_vertices();
    let mut adj = vec![vec![false; n]; n];
    for (_, e) in graph.edges() {
        adj[e.u.index()][e.v.index()] = true;
        adj[e.v.index()][e.u.index()] = true;
    }
    let mut bags = Vec::with_capacity(n);
    let mut tree_edges = Vec::new();
    for x in 0..n {
        let later: Vec<usize> = (x + 1..n).filter(|&y| adj[x][y]).collect();
        for &a in &later {
            for &b in &later {
                if a != b {
                    adj[a][b] = true;
                }
            }
        }
        let parent = later.first().copied().unwrap_or(n - 1);
        if parent != x {
            tree_edges.push((BagId::from(x), BagId::from(parent)));
        }
        bags.push(std::iter::once(x).chain(later).map(v).collect());
    }
    TreeDecomposition::new(bags, tree_edges)
}

fn random_instance(rng: &mut ChaCha8Rng) -> Graph {
    let n = rng.random_range(3..=7);
    let mut pairs: Vec<(usize, usize)> = (0..n).flat_map(|a| (a + 1..n).map(move |b| (a, b))).collect();
    pairs.shuffle(rng);
    pairs.truncate(rng.random_range(n - 1..=12.min(pairs.len())));

    let mut graph = Graph::new(n);
    for (a, b) in pairs {
        graph.add_edge(v(a), v(b), rng.random_range(1..=9));
    }
    let mut vertices: Vec<usize> = (0..n).collect();
    vertices.shuffle(rng);
    for &t in vertices.iter().take(rng.random_range(2..=n.min(4))) {
        graph.set_terminal(v(t), true);
    }
    graph
}

const CYCLE: &str = "\
SECTION Graph
Nodes 4
Edges 4
E 1 2 1
E 2 3 1
E 3 4 1
E 4 1 5
END

SECTION Terminals
Terminals 4
T 1
T 2
T 3
T 4
END

SECTION Tree Decomposition
s td 2 3 4
b 1 1 2 3
b 2 1 3 4
1 2
END

EOF
";

#[test]
fn test_cycle_with_all_terminals() {
    let instance = Instance::from_pace_string(CYCLE).expect("valid");
    let heavy = EdgeId::new(3);
    for algorithm in [AlgorithmChoice::TreeDecomposition, AlgorithmChoice::TerminalDp] {
        let outcome = run(&instance.graph, instance.decomposition.as_ref(), &config(algorithm));
        let Outcome::Solved(tree) = &outcome else {
            panic!("{:?} found no solution", algorithm);
        };
        assert_eq!(tree.cost, 3);
        assert!(!tree.edges.contains(&heavy));
        assert_valid_tree(&instance.graph, tree);
        assert_eq!(solution_to_string(&instance.graph, &outcome), "VALUE 3\n1 2\n2 3\n3 4\n");
    }
}

#[test]
fn test_star_with_leaf_terminals() {
    let k = 6;
    let mut graph = Graph::new(k + 1);
    let mut bags = vec![vec![v(0)]];
    let mut tree_edges = Vec::new();
    for i in 1..=k {
        graph.add_edge(v(0), v(i), 1);
        graph.set_terminal(v(i), true);
        bags.push(vec![v(0), v(i)]);
        tree_edges.push((BagId::new(0), BagId::from(i)));
    }
    let td = TreeDecomposition::new(bags, tree_edges);

    for algorithm in [AlgorithmChoice::TreeDecomposition, AlgorithmChoice::TerminalDp] {
        let Outcome::Solved(tree) = run(&graph, Some(&td), &config(algorithm)) else {
            panic!("{:?} found no solution", algorithm);
        };
        assert_eq!(tree.cost, k as Cost);
        assert_eq!(tree.edges.len(), k);
        assert_valid_tree(&graph, &tree);
    }
}

#[test]
fn test_disconnected_terminals() {
    let mut graph = Graph::new(4);
    graph.add_edge(v(0), v(1), 1);
    graph.add_edge(v(2), v(3), 1);
    graph.set_terminal(v(1), true);
    graph.set_terminal(v(2), true);
    let td = TreeDecomposition::path(vec![vec![v(0), v(1)], vec![v(2), v(3)]]);

    for algorithm in [AlgorithmChoice::TreeDecomposition, AlgorithmChoice::TerminalDp] {
        let outcome = run(&graph, Some(&td), &config(algorithm));
        assert_eq!(outcome, Outcome::NoSolution, "{:?}", algorithm);
        assert_eq!(solution_to_string(&graph, &outcome), "Impossible\n");
    }
}

#[test]
fn test_auto_without_decomposition() {
    let mut instance = Instance::from_pace_string(CYCLE).expect("valid");
    instance.decomposition = None;
    let outcome = run(&instance.graph, None, &SolverConfig::default());
    assert_eq!(cost_of(&outcome), Some(3));
}

#[test]
fn test_algorithms_agree_with_brute_force() {
    let mut rng = ChaCha8Rng::seed_from_u64(2018);
    for round in 0..40 {
        let graph = random_instance(&mut rng);
        let expected = brute_force(&graph);
        let eliminated = elimination_decomposition(&graph);
        let single = TreeDecomposition::new(vec![graph.vertex_ids().collect()], Vec::new());

        let mut runs = Vec::new();
        for td in [&eliminated, &single] {
            for reducer in [ReducerKind::Incremental, ReducerKind::FourRussians] {
                let mut config = config(AlgorithmChoice::TreeDecomposition);
                config.seed = round;
                config.reduction.reducer = reducer;
                runs.push((format!("{:?} with {} bags", reducer, td.num_bags()), run(&graph, Some(td), &config)));
            }

            // Reduce at every opportunity; both reducers must keep the same entries.
            let mut stats = Vec::new();
            for reducer in [ReducerKind::Incremental, ReducerKind::FourRussians] {
                let mut config = eager_config(reducer);
                config.seed = round;
                let mut metrics = Metrics::default();
                let outcome = solve(&graph, Some(td), &config, &mut metrics).expect("valid instance");
                stats.push((metrics.reductions, metrics.reduced_away, metrics.largest_table));
                runs.push((format!("eager {:?} with {} bags", reducer, td.num_bags()), outcome));
            }
            assert_eq!(stats[0], stats[1], "round {}: reducers kept different entries", round);
        }
        runs.push((
            "terminal DP".to_string(),
            run(&graph, None, &config(AlgorithmChoice::TerminalDp)),
        ));

        for (name, outcome) in &runs {
            assert_eq!(cost_of(outcome), expected, "round {}: {}", round, name);
            if let Outcome::Solved(tree) = outcome {
                assert_valid_tree(&graph, tree);
            }
        }
    }
}

#[test]
fn test_larger_grid_agrees_with_terminal_dp() {
    // 4x4 grid, path decomposition of width 4.
    let (rows, cols) = (4, 4);
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut graph = Graph::new(rows * cols);
    for i in 0..rows {
        for j in 0..cols {
            let k = i * cols + j;
            if j + 1 < cols {
                graph.add_edge(v(k), v(k + 1), rng.random_range(1..=5));
            }
            if i + 1 < rows {
                graph.add_edge(v(k), v(k + cols), rng.random_range(1..=5));
            }
        }
    }
    for t in [0, 5, 10, 15, 3, 12] {
        graph.set_terminal(v(t), true);
    }
    let bags = (0..rows * cols - cols).map(|k| (k..=k + cols).map(v).collect()).collect();
    let td = TreeDecomposition::path(bags);

    let by_td = run(&graph, Some(&td), &config(AlgorithmChoice::TreeDecomposition));
    let by_terminals = run(&graph, Some(&td), &config(AlgorithmChoice::TerminalDp));
    assert!(cost_of(&by_td).is_some());
    assert_eq!(cost_of(&by_td), cost_of(&by_terminals));
    if let Outcome::Solved(tree) = &by_td {
        assert_valid_tree(&graph, tree);
    }
}
