//! Incoming-traffic configurator (§4.F): for each outside peer, decides whether the inside
//! network can accept "anything", must reject "nothing", or needs a non-trivial path constraint
//! BGP exports alone cannot express.

use crate::config::{Action, Export};
use crate::error::CompileError;
use crate::location::{LocId, Topology};
use crate::pg::regex_from_pg::regex_between;
use crate::pg::ProductGraph;
use crate::regex_lang::PathRegex;
use crate::settings::CompilerSettings;
use log::debug;

/// The three-state classification of what an outside peer is permitted to send inbound (§9's
/// "state machine for incoming classification" — computed fresh per compile, never persisted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerClass {
    /// Every inside-reachable path is welcome; no tagging needed.
    Anything,
    /// The peer must send nothing at all.
    Nothing,
    /// Only expressible as a non-trivial path regex BGP exports cannot enforce on their own.
    Specific(PathRegex),
}

/// Per-peer export actions computed to realize a preference ordering inbound, when the peer's
/// own tiers must be distinguished (§4.F's `SetMED`/`PrependPath` emission).
#[derive(Debug, Clone, Default)]
pub struct PeerActions {
    pub actions: Vec<Action>,
}

/// Classify every direct outside peer of the inside network against the minimized PG.
///
/// A peer is `Anything` if every node reachable from it downstream is inside-reachable and
/// accepting; `Nothing` if none of its downstream nodes are accepting; `Specific` otherwise,
/// in which case the constraining regex is reconstructed via state elimination for the error's
/// counter-example.
pub fn classify_peers(
    topo: &Topology,
    pg: &ProductGraph,
    settings: &CompilerSettings,
) -> Result<Vec<(LocId, PeerClass)>, CompileError> {
    let mut out = Vec::new();
    for peer in topo.outside_locations() {
        let peer_nodes = pg.nodes_at(peer);
        if peer_nodes.is_empty() {
            out.push((peer, PeerClass::Anything));
            continue;
        }
        let total = peer_nodes.len();
        let accepting = peer_nodes.iter().filter(|&&i| pg.node(i).is_accepting()).count();
        let class = if accepting == total {
            PeerClass::Anything
        } else if accepting == 0 {
            if !settings.use_no_export {
                return Err(CompileError::UncontrollableEnter {
                    peer: topo.location(peer).name().to_string(),
                    reason: "peer must send nothing but use-no-export is disabled".into(),
                });
            }
            PeerClass::Nothing
        } else {
            let re = reconstruct_specific(pg, &peer_nodes)?;
            return Err(CompileError::UncontrollableEnter {
                peer: topo.location(peer).name().to_string(),
                reason: format!("only a non-trivial path constraint ({:?}) describes what this peer may send", re),
            });
        };
        debug!("peer {} classified as {:?}", topo.location(peer).name(), class);
        out.push((peer, class));
    }
    Ok(out)
}

fn reconstruct_specific(pg: &ProductGraph, peer_nodes: &[usize]) -> Result<PathRegex, CompileError> {
    let accepting: Vec<usize> = peer_nodes.iter().copied().filter(|&i| pg.node(i).is_accepting()).collect();
    if accepting.is_empty() || peer_nodes.is_empty() {
        return Ok(PathRegex::Empty);
    }
    let nodes: Vec<usize> = peer_nodes.to_vec();
    let source = peer_nodes[0];
    let sink = accepting[0];
    regex_between(pg, &nodes, source, sink).map_err(CompileError::from)
}

/// Compute export actions that distinguish consecutive preference tiers at `peer`, per §4.F:
/// `SetMED(80 + i)` and/or `PrependPath(3 * i)` for tier index `i`, subject to the settings'
/// `use_med`/`use_prepending` knobs.
pub fn tier_actions(
    peer: LocId,
    tier_index: usize,
    settings: &CompilerSettings,
) -> Result<PeerActions, CompileError> {
    let mut actions = Vec::new();
    if settings.use_med {
        actions.push(Action::SetMed(80 + tier_index as i32));
    }
    if settings.use_prepending {
        actions.push(Action::PrependPath((3 * tier_index) as u8));
    }
    if actions.is_empty() {
        return Err(CompileError::UncontrollablePeerPreference(format!("{:?}", peer)));
    }
    Ok(PeerActions { actions })
}

/// An export a peer should receive, used by `configgen` when wiring §4.F's decisions into a
/// full [`crate::config::Filter`] export list.
pub fn no_export_action() -> Export {
    Export { peer: None, actions: vec![Action::SetCommunity("no-export".into())] }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::make_dfa;
    use crate::location::TopologyBuilder;
    use crate::pg::builder::build_pg;

    #[test]
    fn peer_with_no_accepting_downstream_is_nothing() {
        let mut b = TopologyBuilder::new();
        let a = b.add_inside("A", false).unwrap();
        let z = b.add_outside("Z").unwrap();
        b.add_session(a, z);
        let topo = b.build().unwrap();
        let re = PathRegex::Loc(a);
        let dfa = make_dfa(&topo, &re).unwrap();
        let pg = build_pg(&topo, &[dfa]);
        let settings = CompilerSettings::default();
        let classes = classify_peers(&topo, &pg, &settings).unwrap();
        assert!(classes.iter().any(|(l, c)| *l == z && *c == PeerClass::Nothing));
    }

    #[test]
    fn tier_actions_requires_at_least_one_knob() {
        let mut settings = CompilerSettings::default();
        settings.use_med = false;
        settings.use_prepending = false;
        let loc = petgraph::graph::NodeIndex::new(0);
        assert!(tier_actions(loc, 1, &settings).is_err());
    }
}
