//! Canonical binary tree decompositions.
//!
//! The evaluator needs a rooted decomposition in which every step is one of
//! a few primitive kinds. [`CanonicalDecomposition::build`] turns a validated
//! raw decomposition into one, building a new arena bottom-up (children
//! always get smaller ids than their parent) instead of rewiring the input.
//!
//! # Pipeline
//!
//! 1. **Coloring**: a consistent bag-local coloring of the vertices
//!    (see [`TreeDecomposition::coloring`]).
//! 2. **Root selection**: candidate roots are the bags holding a terminal.
//!    They are sampled in a seeded random order until the root search
//!    budget is spent, and the one with the lowest estimated evaluation
//!    cost wins (first seen on ties). With `W` the largest bag size, a
//!    single-child step costs `4^(max(|bag|, |child|) - W)`; a node with
//!    more than two children repeatedly merges its two smallest child sizes
//!    `a <= b` at a cost of `5^(b + 1 - W)`.
//! 3. **Pre-join narrowing**: a child of a join that holds vertices the join
//!    bag lacks is wrapped into a bag holding only the shared vertices.
//! 4. **Binary joins**: more than two children are merged pairwise into
//!    synthetic join bags, always picking the pair with the smallest union.
//! 5. **Forget before introduce**: a single child that needs both forgets
//!    and introduces gets an intermediate bag holding the intersection.
//! 6. **Edge assignment**: each graph edge is assigned to exactly one bag
//!    holding both endpoints by a greedy set cover, repeatedly choosing the
//!    bag with the fewest unassigned eligible edges.
//!
//! Afterwards every bag is a leaf, a pure introduce, a pure forget, a
//! pass-through, or a join whose children are subsets of it.

use std::collections::{BTreeSet, VecDeque};

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::color_set::ColorSet;
use crate::config::SolverConfig;
use crate::decomposition::TreeDecomposition;
use crate::error::SteinerError;
use crate::graph::Graph;
use crate::types::{BagId, Color, EdgeId, VertexId, MAX_BAG_SIZE};
use crate::vertex_set::VertexSet;

/// Where a canonical bag came from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BagOrigin {
    /// A bag of the input decomposition.
    Raw(BagId),
    /// Narrows a join child to the vertices it shares with the join.
    Narrowing,
    /// Part of a cascade splitting a many-child join into binary joins.
    JoinCascade,
    /// Separates the forgets of a step from its introduces.
    ForgetBeforeIntroduce,
}

/// The DP step a canonical bag performs.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Step {
    Leaf,
    Introduce,
    Forget,
    /// Single child with the same vertices.
    Pass,
    Join,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Step::Leaf => "leaf",
            Step::Introduce => "introduce",
            Step::Forget => "forget",
            Step::Pass => "pass",
            Step::Join => "join",
        }
    }
}

/// A bag of the canonical decomposition.
#[derive(Debug, Clone)]
pub struct CanonicalBag {
    vertices: Vec<VertexId>,
    colors: ColorSet,
    by_color: [Option<VertexId>; MAX_BAG_SIZE],
    children: Vec<BagId>,
    parent: Option<BagId>,
    introduce_edges: Vec<EdgeId>,
    subtree: VertexSet,
    origin: BagOrigin,
}

impl CanonicalBag {
    /// Bag vertices in ascending color order.
    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    pub fn colors(&self) -> ColorSet {
        self.colors
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// The vertex holding color `c` in this bag, if any.
    #[inline]
    pub fn vertex_of(&self, c: Color) -> Option<VertexId> {
        self.by_color[c.index()]
    }

    pub fn children(&self) -> &[BagId] {
        &self.children
    }

    pub fn parent(&self) -> Option<BagId> {
        self.parent
    }

    /// Edges this bag is responsible for introducing.
    pub fn introduce_edges(&self) -> &[EdgeId] {
        &self.introduce_edges
    }

    /// The bag vertices plus every neighbor of a bag vertex that occurs
    /// in the subtree below.
    pub fn subtree(&self) -> &VertexSet {
        &self.subtree
    }

    pub fn origin(&self) -> BagOrigin {
        self.origin
    }
}

/// A rooted, binary, colored tree decomposition with assigned edges.
#[derive(Debug, Clone)]
pub struct CanonicalDecomposition {
    bags: Vec<CanonicalBag>,
    root: BagId,
    colors: Vec<Option<Color>>,
    max_bag_size: usize,
    estimated_cost: f64,
}

impl CanonicalDecomposition {
    /// Validates `raw` against `graph` and builds its canonical form.
    pub fn build(raw: &TreeDecomposition, graph: &Graph, config: &SolverConfig) -> Result<Self, SteinerError> {
        raw.validate(graph)?;
        let colors = raw.coloring(graph)?;
        let (raw_root, estimated_cost) = select_root(raw, graph, config)?;
        info!(
            "Selected root bag {} (estimated cost {:.3e}) out of {} bags",
            raw_root,
            estimated_cost,
            raw.num_bags()
        );

        let mut td = CanonicalDecomposition {
            bags: Vec::with_capacity(2 * raw.num_bags()),
            root: BagId::new(0),
            colors,
            max_bag_size: raw.max_bag_size(),
            estimated_cost,
        };

        let mut built: Vec<Option<BagId>> = vec![None; raw.num_bags()];
        for (x, parent) in post_order(raw, raw_root) {
            let children: Vec<BagId> = raw
                .neighbors(x)
                .iter()
                .filter(|&&n| Some(n) != parent)
                .filter_map(|n| built[n.index()])
                .collect();
            let id = td.push_raw(x, raw.bag(x), children);
            built[x.index()] = Some(id);
        }
        td.root = built[raw_root.index()].ok_or_else(|| {
            SteinerError::MalformedDecomposition(format!("root bag {} was not reached", raw_root.index() + 1))
        })?;

        td.fill_subtrees(graph);
        td.assign_edges(graph);
        td.check_forgets(graph);

        debug!(
            "Canonical decomposition: {} bags ({} synthetic), {} joins, max bag size {}",
            td.bags.len(),
            td.bags.iter().filter(|b| !matches!(b.origin, BagOrigin::Raw(_))).count(),
            td.ids().filter(|&id| td.step(id) == Step::Join).count(),
            td.max_bag_size
        );
        Ok(td)
    }

    pub fn root(&self) -> BagId {
        self.root
    }

    pub fn bag(&self, id: BagId) -> &CanonicalBag {
        &self.bags[id.index()]
    }

    pub fn num_bags(&self) -> usize {
        self.bags.len()
    }

    /// Bag ids in ascending order; children come before their parents.
    pub fn ids(&self) -> impl Iterator<Item = BagId> + '_ {
        (0..self.bags.len()).map(BagId::from)
    }

    pub fn max_bag_size(&self) -> usize {
        self.max_bag_size
    }

    pub fn estimated_cost(&self) -> f64 {
        self.estimated_cost
    }

    pub fn color(&self, v: VertexId) -> Option<Color> {
        self.colors[v.index()]
    }

    /// Color of a vertex that occurs in some bag.
    ///
    /// # Panics
    ///
    /// Panics if `v` is in no bag.
    pub fn color_of(&self, v: VertexId) -> Color {
        match self.colors[v.index()] {
            Some(c) => c,
            None => panic!("Vertex {} occurs in a bag but has no color", v),
        }
    }

    /// Colors of `vertices`, which must all be colored.
    pub fn color_set(&self, vertices: &[VertexId]) -> ColorSet {
        vertices.iter().map(|&v| self.color_of(v)).collect()
    }

    pub fn bag_contains(&self, id: BagId, v: VertexId) -> bool {
        match self.colors[v.index()] {
            Some(c) => self.bags[id.index()].by_color[c.index()] == Some(v),
            None => false,
        }
    }

    /// Vertices of bag `a` that are not in bag `b`, in `a`'s color order.
    pub fn difference(&self, a: BagId, b: BagId) -> Vec<VertexId> {
        self.bag(a)
            .vertices
            .iter()
            .copied()
            .filter(|&v| !self.bag_contains(b, v))
            .collect()
    }

    /// The step performed at bag `id`.
    pub fn step(&self, id: BagId) -> Step {
        let bag = self.bag(id);
        match bag.children.as_slice() {
            [] => Step::Leaf,
            [child] => {
                let child = self.bag(*child);
                if bag.colors.len() > child.colors.len() {
                    Step::Introduce
                } else if bag.colors.len() < child.colors.len() {
                    Step::Forget
                } else {
                    Step::Pass
                }
            }
            _ => Step::Join,
        }
    }

    fn by_color(&self, vertices: &[VertexId]) -> [Option<VertexId>; MAX_BAG_SIZE] {
        let mut by_color = [None; MAX_BAG_SIZE];
        for &v in vertices {
            by_color[self.color_of(v).index()] = Some(v);
        }
        by_color
    }

    fn push_bag(&mut self, mut vertices: Vec<VertexId>, children: Vec<BagId>, origin: BagOrigin) -> BagId {
        vertices.sort_by_key(|&v| self.color_of(v));
        let id = BagId::from(self.bags.len());
        for &child in &children {
            debug_assert!(self.bags[child.index()].parent.is_none(), "{} already has a parent", child);
            self.bags[child.index()].parent = Some(id);
        }
        let bag = CanonicalBag {
            colors: self.color_set(&vertices),
            by_color: self.by_color(&vertices),
            vertices,
            children,
            parent: None,
            introduce_edges: Vec::new(),
            subtree: VertexSet::default(),
            origin,
        };
        self.bags.push(bag);
        id
    }

    /// Builds the canonical bags for raw bag `x` whose children are already built.
    fn push_raw(&mut self, x: BagId, vertices: &[VertexId], mut children: Vec<BagId>) -> BagId {
        let by_color = self.by_color(vertices);
        let in_x = |td: &Self, v: VertexId| by_color[td.color_of(v).index()] == Some(v);

        if children.len() >= 2 {
            for child in children.iter_mut() {
                let shared: Vec<VertexId> = self.bag(*child).vertices.iter().copied().filter(|&v| in_x(self, v)).collect();
                if shared.len() < self.bag(*child).len() {
                    *child = self.push_bag(shared, vec![*child], BagOrigin::Narrowing);
                }
            }
        }

        if children.len() > 2 {
            children = self.cascade_joins(children, vertices.len());
        }

        if let [child] = children[..] {
            let shared: Vec<VertexId> = self.bag(child).vertices.iter().copied().filter(|&v| in_x(self, v)).collect();
            let forgets = shared.len() < self.bag(child).len();
            let introduces = shared.len() < vertices.len();
            if forgets && introduces {
                children = vec![self.push_bag(shared, vec![child], BagOrigin::ForgetBeforeIntroduce)];
            }
        }

        self.push_bag(vertices.to_vec(), children, BagOrigin::Raw(x))
    }

    /// Merges join operands pairwise until two remain, or until the last
    /// two would together still be a proper subset of the join bag.
    fn cascade_joins(&mut self, mut operands: Vec<BagId>, bag_size: usize) -> Vec<BagId> {
        let union_size = |td: &Self, a: BagId, b: BagId| td.bag(a).colors.union(td.bag(b).colors).len();

        while operands.len() > 2 || (operands.len() == 2 && union_size(self, operands[0], operands[1]) < bag_size) {
            let mut best = (usize::MAX, 0, 1);
            for i in 0..operands.len() {
                for j in i + 1..operands.len() {
                    let size = union_size(self, operands[i], operands[j]);
                    if size < best.0 {
                        best = (size, i, j);
                    }
                }
            }
            let (_, i, j) = best;
            let right = operands.remove(j);
            let left = operands.remove(i);

            let (l, r) = (self.bag(left), self.bag(right));
            let vertices: Vec<VertexId> = l
                .colors
                .union(r.colors)
                .iter()
                .filter_map(|c| l.vertex_of(c).or(r.vertex_of(c)))
                .collect();
            let merged = self.push_bag(vertices, vec![left, right], BagOrigin::JoinCascade);
            operands.push(merged);
        }
        operands
    }

    fn fill_subtrees(&mut self, graph: &Graph) {
        for i in 0..self.bags.len() {
            let mut subtree: VertexSet = self.bags[i].vertices.iter().copied().collect();
            for &child in &self.bags[i].children {
                let below = &self.bags[child.index()].subtree;
                for &v in &self.bags[i].vertices {
                    for (_, w) in graph.neighbors(v) {
                        if below.contains(w) {
                            subtree.insert(w);
                        }
                    }
                }
            }
            self.bags[i].subtree = subtree;
        }
    }

    /// Every vertex forgotten at a bag has all its neighbors inside the
    /// child's subtree, so no edge of it can be introduced later.
    fn check_forgets(&self, graph: &Graph) {
        if !cfg!(debug_assertions) {
            return;
        }
        for id in self.ids() {
            for &child in self.bag(id).children() {
                for v in self.difference(child, id) {
                    for (_, w) in graph.neighbors(v) {
                        debug_assert!(
                            self.bag(child).subtree.contains(w),
                            "{} is forgotten at {} but its neighbor {} is outside the subtree",
                            v,
                            id,
                            w
                        );
                    }
                }
            }
        }
    }

    fn assign_edges(&mut self, graph: &Graph) {
        let mut available: Vec<Vec<EdgeId>> = vec![Vec::new(); self.bags.len()];
        let mut holders: Vec<Vec<BagId>> = vec![Vec::new(); graph.num_edges()];
        for id in self.ids() {
            for &v in &self.bag(id).vertices {
                for (e, w) in graph.neighbors(v) {
                    // Count each edge once, from its first endpoint; loops never enter a tree.
                    if graph.edge(e).u == v && w != v && self.bag_contains(id, w) {
                        available[id.index()].push(e);
                        holders[e.index()].push(id);
                    }
                }
            }
        }

        let mut count: Vec<usize> = available.iter().map(Vec::len).collect();
        let mut queue: BTreeSet<(usize, BagId)> =
            self.ids().filter(|id| count[id.index()] > 0).map(|id| (count[id.index()], id)).collect();
        let mut assigned = vec![false; graph.num_edges()];

        while let Some((_, id)) = queue.pop_first() {
            let edges: Vec<EdgeId> = available[id.index()]
                .iter()
                .copied()
                .filter(|e| !assigned[e.index()])
                .collect();
            for &e in &edges {
                assigned[e.index()] = true;
                for &h in &holders[e.index()] {
                    if h != id && queue.remove(&(count[h.index()], h)) {
                        count[h.index()] -= 1;
                        if count[h.index()] > 0 {
                            queue.insert((count[h.index()], h));
                        }
                    }
                }
            }
            self.bags[id.index()].introduce_edges = edges;
        }

        debug_assert!(
            graph.edges().all(|(e, edge)| assigned[e.index()] || edge.u == edge.v),
            "Some edge was not assigned to any bag"
        );
    }
}

/// Raw bags in post-order from `root`, with their parents.
fn post_order(raw: &TreeDecomposition, root: BagId) -> Vec<(BagId, Option<BagId>)> {
    let mut order = Vec::with_capacity(raw.num_bags());
    let mut stack = vec![(root, None, false)];
    while let Some((x, parent, expanded)) = stack.pop() {
        if expanded {
            order.push((x, parent));
            continue;
        }
        stack.push((x, parent, true));
        for &n in raw.neighbors(x).iter().rev() {
            if Some(n) != parent {
                stack.push((n, Some(x), false));
            }
        }
    }
    order
}

/// Estimated evaluation cost of the decomposition rooted at `root`.
pub fn estimate_cost(raw: &TreeDecomposition, root: BagId) -> f64 {
    let w = raw.max_bag_size() as i32;
    let mut cost = vec![0.0f64; raw.num_bags()];

    for (x, parent) in post_order(raw, root) {
        let size = raw.bag(x).len();
        let children: Vec<BagId> = raw.neighbors(x).iter().copied().filter(|&n| Some(n) != parent).collect();
        cost[x.index()] = match children.as_slice() {
            [] => 0.0,
            [c] => {
                let exp = size.max(raw.bag(*c).len()) as i32 - w;
                cost[c.index()] + 4f64.powi(exp)
            }
            _ => {
                let mut total: f64 = children.iter().map(|c| cost[c.index()]).sum();
                let mut sizes: Vec<usize> = children.iter().map(|c| raw.bag(*c).len()).collect();
                sizes.sort_unstable();
                let mut queue: VecDeque<usize> = sizes.into();
                while queue.len() > 2 {
                    let (Some(a), Some(b)) = (queue.pop_front(), queue.pop_front()) else {
                        break;
                    };
                    let merged = a.max(b) + 1;
                    queue.push_back(merged.min(size));
                    total += 5f64.powi(merged as i32 - w);
                }
                total
            }
        };
    }
    cost[root.index()]
}

/// Picks the root bag with the lowest estimated cost among a seeded random
/// sample of the bags holding a terminal.
fn select_root(raw: &TreeDecomposition, graph: &Graph, config: &SolverConfig) -> Result<(BagId, f64), SteinerError> {
    let mut candidates: Vec<BagId> = raw
        .bag_ids()
        .filter(|&b| raw.bag(b).iter().any(|&v| graph.is_terminal(v)))
        .collect();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    candidates.shuffle(&mut rng);

    let mut best: Option<(BagId, f64)> = None;
    let mut spent = 0usize;
    for (i, &candidate) in candidates.iter().enumerate() {
        if i > 0 && spent >= config.root_search_budget {
            break;
        }
        let cost = estimate_cost(raw, candidate);
        if best.map_or(true, |(_, b)| cost < b) {
            best = Some((candidate, cost));
        }
        spent += raw.num_bags();
    }

    best.ok_or_else(|| SteinerError::MalformedDecomposition("no bag contains a terminal".into()))
}
