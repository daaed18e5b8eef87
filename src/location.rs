//! The topology: a directed graph of named locations over which regexes, DFAs and the product
//! graph are all built.

use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use thiserror::Error;

/// Index type used by petgraph to identify a location within [`Topology`].
pub type LocId = petgraph::graph::NodeIndex<u32>;

/// Identifier reserved to mean "any outside location" in constraint declarations (§6).
pub const ANY_OUTSIDE: &str = "out";

/// Whether a [`Location`] sits inside the network under control, or is an external peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind {
    /// Part of the network under control.
    Inside,
    /// An external peer outside the network under control.
    Outside,
}

/// A named vertex of the topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    name: String,
    kind: LocationKind,
    can_originate: bool,
}

impl Location {
    /// Name of the location.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this location is inside the network under control.
    pub fn is_inside(&self) -> bool {
        self.kind == LocationKind::Inside
    }

    /// Whether this location is an external peer.
    pub fn is_outside(&self) -> bool {
        self.kind == LocationKind::Outside
    }

    /// Whether this location is allowed to originate traffic for the prefix being compiled.
    pub fn can_originate(&self) -> bool {
        self.can_originate
    }
}

/// Errors raised while building or validating a [`Topology`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// Two locations were registered under the same name.
    #[error("location `{0}` is already registered")]
    DuplicateLocation(String),
    /// A name was referenced that is not a registered location.
    #[error("location `{0}` is not known in the topology")]
    UnknownLocation(String),
    /// The invariant from §3 was violated: the inside subgraph must be weakly connected.
    #[error("the inside subgraph is not weakly connected")]
    InsideDisconnected,
}

/// Directed graph over locations with a distinguished alphabet (inside ∪ outside locations).
///
/// Invariant: the inside subgraph is weakly connected; [`Topology::validate`] checks this and
/// compilation must abort if it is violated (§3).
#[derive(Debug, Clone)]
pub struct Topology {
    graph: DiGraph<Location, ()>,
    by_name: HashMap<String, LocId>,
}

impl Default for Topology {
    fn default() -> Self {
        Self::new()
    }
}

impl Topology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self { graph: DiGraph::new(), by_name: HashMap::new() }
    }

    /// Register a new location. Fails if the name is already taken.
    pub fn add_location(
        &mut self,
        name: impl Into<String>,
        kind: LocationKind,
        can_originate: bool,
    ) -> Result<LocId, TopologyError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(TopologyError::DuplicateLocation(name));
        }
        let id = self.graph.add_node(Location { name: name.clone(), kind, can_originate });
        self.by_name.insert(name, id);
        Ok(id)
    }

    /// Add a directed edge from `a` to `b` (direction matches the direction BGP announcements
    /// propagate: `a` announces to `b`; see §3/§4.C).
    pub fn add_edge(&mut self, a: LocId, b: LocId) {
        self.graph.update_edge(a, b, ());
    }

    /// Look up a location's id by name.
    pub fn id_of(&self, name: &str) -> Result<LocId, TopologyError> {
        self.by_name.get(name).copied().ok_or_else(|| TopologyError::UnknownLocation(name.into()))
    }

    /// Resolve a location's data.
    pub fn location(&self, id: LocId) -> &Location {
        &self.graph[id]
    }

    /// Every registered location (alphabet of inside ∪ outside locations), in insertion order.
    pub fn locations(&self) -> impl Iterator<Item = LocId> + '_ {
        self.graph.node_indices()
    }

    /// All inside locations.
    pub fn inside_locations(&self) -> Vec<LocId> {
        self.locations().filter(|&id| self.graph[id].is_inside()).collect()
    }

    /// All outside locations.
    pub fn outside_locations(&self) -> Vec<LocId> {
        self.locations().filter(|&id| self.graph[id].is_outside()).collect()
    }

    /// Locations allowed to originate traffic.
    pub fn originators(&self) -> Vec<LocId> {
        self.locations().filter(|&id| self.graph[id].can_originate()).collect()
    }

    /// Locations `id` announces to (outgoing neighbors, in topology-edge direction).
    pub fn exports_to(&self, id: LocId) -> Vec<LocId> {
        self.graph.neighbors_directed(id, Direction::Outgoing).collect()
    }

    /// Locations `id` receives announcements from (incoming neighbors).
    pub fn receives_from(&self, id: LocId) -> Vec<LocId> {
        self.graph.neighbors_directed(id, Direction::Incoming).collect()
    }

    /// Whether there is a direct topology edge `a -> b`.
    pub fn has_edge(&self, a: LocId, b: LocId) -> bool {
        self.graph.edges_directed(a, Direction::Outgoing).any(|e| e.target() == b)
    }

    /// Validate the structural invariant from §3: the inside subgraph must be weakly connected.
    /// An empty or single-node inside subgraph is trivially connected.
    pub fn validate(&self) -> Result<(), TopologyError> {
        let inside: Vec<LocId> = self.inside_locations();
        if inside.len() <= 1 {
            return Ok(());
        }
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![inside[0]];
        seen.insert(inside[0]);
        while let Some(n) = stack.pop() {
            for m in self.graph.neighbors_undirected(n) {
                if self.graph[m].is_inside() && seen.insert(m) {
                    stack.push(m);
                }
            }
        }
        if seen.len() == inside.len() {
            Ok(())
        } else {
            Err(TopologyError::InsideDisconnected)
        }
    }
}

/// Convenience builder mirroring `Network::add_router`/`add_external_router`/`add_link` in the
/// network-simulator idiom this crate is descended from.
#[derive(Debug, Clone, Default)]
pub struct TopologyBuilder {
    topo: Topology,
}

impl TopologyBuilder {
    /// Start an empty builder.
    pub fn new() -> Self {
        Self { topo: Topology::new() }
    }

    /// Register an inside location.
    pub fn add_inside(
        &mut self,
        name: impl Into<String>,
        can_originate: bool,
    ) -> Result<LocId, TopologyError> {
        self.topo.add_location(name, LocationKind::Inside, can_originate)
    }

    /// Register an outside (peer) location. Outside locations are always allowed to "originate"
    /// in the sense that they may be the source of external routes.
    pub fn add_outside(&mut self, name: impl Into<String>) -> Result<LocId, TopologyError> {
        self.topo.add_location(name, LocationKind::Outside, true)
    }

    /// Add a directed edge `a -> b` (and, for the common case of a symmetric BGP session, the
    /// caller adds the reverse edge too).
    pub fn add_edge(&mut self, a: LocId, b: LocId) -> &mut Self {
        self.topo.add_edge(a, b);
        self
    }

    /// Add both directions of a session between `a` and `b`.
    pub fn add_session(&mut self, a: LocId, b: LocId) -> &mut Self {
        self.topo.add_edge(a, b);
        self.topo.add_edge(b, a);
        self
    }

    /// Finish building, validating the inside-connectivity invariant.
    pub fn build(self) -> Result<Topology, TopologyError> {
        self.topo.validate()?;
        Ok(self.topo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_inside_validates() {
        let mut b = TopologyBuilder::new();
        let a = b.add_inside("A", false).unwrap();
        let x = b.add_inside("X", false).unwrap();
        b.add_session(a, x);
        assert!(b.build().is_ok());
    }

    #[test]
    fn disconnected_inside_fails() {
        let mut b = TopologyBuilder::new();
        b.add_inside("A", false).unwrap();
        b.add_inside("X", false).unwrap();
        assert_eq!(b.build(), Err(TopologyError::InsideDisconnected));
    }

    #[test]
    fn duplicate_name_fails() {
        let mut b = TopologyBuilder::new();
        b.add_inside("A", false).unwrap();
        assert_eq!(
            b.add_inside("A", false),
            Err(TopologyError::DuplicateLocation("A".into()))
        );
    }
}
