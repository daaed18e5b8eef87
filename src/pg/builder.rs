//! Forward-BFS construction of the product graph (§4.C) from a topology and a tuple of
//! preference DFAs.

use super::{accept_rank, PgNode, ProductGraph};
use crate::dfa::{Dfa, DfaStateId};
use crate::location::{LocId, Topology};
use log::debug;
use std::collections::HashMap;

/// Build the reachable subset of `topology x dfas` plus the synthetic poles, following §4.C:
/// a forward BFS from every originator location (the product start), stepping every DFA in
/// lockstep as the walk follows topology edges in announce direction. Transitions into a DFA's
/// dead state are kept (they merely drop that DFA out of contention for this node and its
/// descendants) rather than pruning the node outright, since another DFA may still accept.
pub fn build_pg(topo: &Topology, dfas: &[Dfa]) -> ProductGraph {
    let mut pg = ProductGraph::empty();
    let mut index: HashMap<(LocId, Vec<DfaStateId>), usize> = HashMap::new();

    let mut frontier: Vec<(LocId, Vec<DfaStateId>)> = Vec::new();
    for loc in topo.originators() {
        // The DFA walk begins by consuming the originator's own location symbol (the first
        // symbol read in announce order), not the unconsumed start state.
        let sv: Vec<DfaStateId> = dfas.iter().map(|d| d.step(d.start(), loc)).collect();
        frontier.push((loc, sv));
    }

    let mut queue: Vec<usize> = Vec::new();
    for (loc, sv) in frontier.drain(..) {
        let idx = *index.entry((loc, sv.clone())).or_insert_with(|| {
            let accepting: Vec<bool> =
                dfas.iter().zip(sv.iter()).map(|(d, &s)| d.is_accepting(s)).collect();
            let node_idx = pg.push_node(PgNode { loc, state_vector: sv, accept_rank: accept_rank(&accepting) });
            queue.push(node_idx);
            node_idx
        });
        pg.start_edges.push(idx);
    }
    pg.start_edges.sort_unstable();
    pg.start_edges.dedup();

    let mut head = 0;
    while head < queue.len() {
        let cur = queue[head];
        head += 1;
        let (loc, sv) = (pg.nodes[cur].loc, pg.nodes[cur].state_vector.clone());
        for next_loc in topo.exports_to(loc) {
            let next_sv: Vec<DfaStateId> =
                dfas.iter().zip(sv.iter()).map(|(d, &s)| d.step(s, next_loc)).collect();
            let key = (next_loc, next_sv.clone());
            let next_idx = if let Some(&i) = index.get(&key) {
                i
            } else {
                let accepting: Vec<bool> = dfas
                    .iter()
                    .zip(next_sv.iter())
                    .map(|(d, &s)| d.is_accepting(s))
                    .collect();
                let node_idx = pg.push_node(PgNode {
                    loc: next_loc,
                    state_vector: next_sv,
                    accept_rank: accept_rank(&accepting),
                });
                index.insert(key, node_idx);
                queue.push(node_idx);
                node_idx
            };
            pg.add_real_edge(cur, next_idx);
        }
    }

    for idx in pg.node_indices() {
        if pg.nodes[idx].is_accepting() {
            pg.end_edges.push(idx);
        }
    }

    debug!(
        "built product graph with {} nodes ({} originator roots, {} accepting)",
        pg.len(),
        pg.start_edges.len(),
        pg.end_edges.len()
    );
    pg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::make_dfa;
    use crate::location::TopologyBuilder;
    use crate::regex_lang::PathRegex;

    #[test]
    fn linear_topology_reaches_end_from_origin() {
        let mut b = TopologyBuilder::new();
        let a = b.add_inside("A", false).unwrap();
        let x = b.add_inside("X", false).unwrap();
        let y = b.add_inside("Y", true).unwrap();
        b.add_session(a, x);
        b.add_session(x, y);
        let topo = b.build().unwrap();

        let re = PathRegex::path([a, x, y]);
        let dfa = make_dfa(&topo, &re).unwrap();
        let pg = build_pg(&topo, &[dfa]);

        assert!(!pg.end_edges.is_empty());
        assert!(pg.start_edges.iter().any(|&i| pg.node(i).loc == y));
    }

    #[test]
    fn unreachable_preference_yields_no_accepting_node() {
        let mut b = TopologyBuilder::new();
        let a = b.add_inside("A", true).unwrap();
        let z = b.add_outside("Z").unwrap();
        let topo = b.build().unwrap();

        // Z never appears in the topology's edges from A, so a regex requiring it is unrealizable.
        let re = PathRegex::path([z]);
        let dfa = make_dfa(&topo, &re).unwrap();
        let pg = build_pg(&topo, &[dfa]);
        assert!(pg.end_edges.is_empty());
        let _ = a;
    }
}
