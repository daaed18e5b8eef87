//! The product graph (PG): the cross-product of the topology and the preference-DFA tuple,
//! fused so that feasibility of a (path, preference) pair can be reasoned about jointly (§3,
//! §4.C, §4.D). [`builder`] constructs it; [`minimize`] shrinks it; [`regex_from_pg`]
//! reconstructs a path regex from a subgraph via state elimination, for §4.G's `Match::PathRegex`.

pub mod builder;
pub mod minimize;
pub mod regex_from_pg;

use crate::dfa::DfaStateId;
use crate::location::LocId;
use thiserror::Error;
use std::fmt;

/// Identifies a node in a [`ProductGraph`]'s arena. `Start`/`End` are the two synthetic poles;
/// `Node(i)` indexes into the arena's real-node vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PgNodeId {
    /// Synthetic pole every originator node connects from.
    Start,
    /// Synthetic pole every accepting node connects to.
    End,
    /// A real `(loc, state_vector)` node, indexed into the arena.
    Node(usize),
}

impl fmt::Display for PgNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PgNodeId::Start => write!(f, "Start"),
            PgNodeId::End => write!(f, "End"),
            PgNodeId::Node(i) => write!(f, "n{}", i),
        }
    }
}

/// Errors raised while building or minimizing a [`ProductGraph`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PgError {
    /// A BFS step referenced a node id that isn't in the arena. Indicates a builder bug; never
    /// expected to surface from a correctly constructed graph.
    #[error("dangling product graph node reference: {0}")]
    DanglingNode(PgNodeId),
    /// State-elimination on a PG subgraph ([`regex_from_pg`]) was asked to eliminate a graph with
    /// no nodes between the declared source and sink.
    #[error("cannot reconstruct a path regex: source and sink are disconnected in the subgraph")]
    DisconnectedSubgraph,
}

/// The smallest index *i* such that DFA *i* accepts in a given state vector, or `None` if no DFA
/// accepts (⊥ in §3's data model).
pub type AcceptRank = Option<usize>;

/// The smallest accepting index across `accepting`, i.e. `accept_rank` from §3.
pub fn accept_rank(accepting: &[bool]) -> AcceptRank {
    accepting.iter().position(|&a| a)
}

/// A real (non-pole) product-graph node: `(loc, state_vector, accept_rank)` from §3.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PgNode {
    /// Topology location this node is anchored at.
    pub loc: LocId,
    /// One DFA state per preference regex, in preference order.
    pub state_vector: Vec<DfaStateId>,
    /// Smallest *i* such that DFA *i* accepts in `state_vector`, if any.
    pub accept_rank: AcceptRank,
}

impl PgNode {
    /// Whether this node realizes any preference (`accept_rank != ⊥`).
    pub fn is_accepting(&self) -> bool {
        self.accept_rank.is_some()
    }
}

/// Arena-of-nodes product graph: nodes carry no owning pointers to each other, only integer
/// indices, since the graph may be cyclic (self-loops at routers reached by `Star` transitions).
#[derive(Debug, Clone, Default)]
pub struct ProductGraph {
    nodes: Vec<PgNode>,
    /// Outgoing adjacency, indexed like `nodes`. `Start`/`End` edges are tracked separately.
    out_edges: Vec<Vec<usize>>,
    in_edges: Vec<Vec<usize>>,
    start_edges: Vec<usize>,
    end_edges: Vec<usize>,
}

impl ProductGraph {
    /// Construct an empty graph (exposed for the builder; use [`builder::build_pg`] normally).
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    fn push_node(&mut self, node: PgNode) -> usize {
        self.nodes.push(node);
        self.out_edges.push(Vec::new());
        self.in_edges.push(Vec::new());
        self.nodes.len() - 1
    }

    fn add_real_edge(&mut self, from: usize, to: usize) {
        if !self.out_edges[from].contains(&to) {
            self.out_edges[from].push(to);
        }
        if !self.in_edges[to].contains(&from) {
            self.in_edges[to].push(from);
        }
    }

    /// Number of real (non-pole) nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no real nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolve a real node's data by its arena index.
    pub fn node(&self, idx: usize) -> &PgNode {
        &self.nodes[idx]
    }

    /// Iterate real node indices.
    pub fn node_indices(&self) -> impl Iterator<Item = usize> {
        0..self.nodes.len()
    }

    /// Real out-neighbors of a real node (edges among `(T x D)` nodes only, no poles).
    pub fn out_neighbors(&self, idx: usize) -> &[usize] {
        &self.out_edges[idx]
    }

    /// Real in-neighbors of a real node.
    pub fn in_neighbors(&self, idx: usize) -> &[usize] {
        &self.in_edges[idx]
    }

    /// Real nodes `Start` connects to: every node whose location can originate traffic.
    pub fn start_neighbors(&self) -> &[usize] {
        &self.start_edges
    }

    /// Real nodes that connect to `End`: every accepting node.
    pub fn end_predecessors(&self) -> &[usize] {
        &self.end_edges
    }

    /// All real nodes anchored at `loc`.
    pub fn nodes_at(&self, loc: LocId) -> Vec<usize> {
        self.node_indices().filter(|&i| self.nodes[i].loc == loc).collect()
    }

    /// Remove a set of nodes and every edge touching them, compacting indices. Returns the
    /// mapping from old index to new index (`None` for removed nodes), so callers tracking
    /// external references (e.g. orderings keyed by old index) can remap them.
    pub fn retain_nodes(&mut self, keep: &[bool]) -> Vec<Option<usize>> {
        debug_assert_eq!(keep.len(), self.nodes.len());
        let mut remap = vec![None; self.nodes.len()];
        let mut new_nodes = Vec::new();
        let mut new_out = Vec::new();
        let mut new_in = Vec::new();
        for (old, &k) in keep.iter().enumerate() {
            if k {
                remap[old] = Some(new_nodes.len());
                new_nodes.push(self.nodes[old].clone());
                new_out.push(Vec::new());
                new_in.push(Vec::new());
            }
        }
        for old_from in 0..self.nodes.len() {
            let Some(new_from) = remap[old_from] else { continue };
            for &old_to in &self.out_edges[old_from] {
                if let Some(new_to) = remap[old_to] {
                    new_out[new_from].push(new_to);
                    new_in[new_to].push(new_from);
                }
            }
        }
        self.start_edges = self.start_edges.iter().filter_map(|&i| remap[i]).collect();
        self.end_edges = self.end_edges.iter().filter_map(|&i| remap[i]).collect();
        self.nodes = new_nodes;
        self.out_edges = new_out;
        self.in_edges = new_in;
        remap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_rank_picks_smallest_accepting_index() {
        assert_eq!(accept_rank(&[false, true, true]), Some(1));
        assert_eq!(accept_rank(&[false, false]), None);
    }
}
