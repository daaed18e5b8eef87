//! Consistency / ordering solver (§4.E): turns a minimized product graph into a per-router total
//! order over that router's PG nodes, sorted best-first, rejecting specifications whose local
//! preference structure cannot be realized without a routing instability (a dispute-wheel-style
//! contradiction between two nodes at the same router).

use crate::error::CompileError;
use crate::location::{LocId, Topology};
use crate::pg::ProductGraph;
use log::warn;
use std::collections::HashMap;

/// A router's resolved preference order, best node first.
#[derive(Debug, Clone)]
pub struct RouterOrdering {
    /// The router's location.
    pub loc: LocId,
    /// PG node arena indices, best (lowest `accept_rank`) first.
    pub order: Vec<usize>,
}

/// Solve orderings for every inside router, per §4.E.
///
/// First runs the well-formedness check: every location that can originate traffic and appears
/// in some DFA's starting set (approximated here as: is a `Start` root of the PG) must have a
/// PG node reachable to `End`. Then, for every router, sorts its nodes by `accept_rank` (ties
/// broken by a canonical state-vector key, since siblings at the same router already share a
/// location and so can't be told apart by location name) and performs the pairwise local
/// contradiction check from step 2 of the algorithm.
pub fn solve_orderings(
    topo: &Topology,
    pg: &ProductGraph,
) -> Result<Vec<RouterOrdering>, CompileError> {
    check_well_formed(topo, pg)?;

    let mut by_loc: HashMap<LocId, Vec<usize>> = HashMap::new();
    for i in pg.node_indices() {
        by_loc.entry(pg.node(i).loc).or_default().push(i);
    }

    let mut orderings = Vec::new();
    for (loc, mut nodes) in by_loc {
        nodes.sort_by_key(|&i| {
            let node = pg.node(i);
            (rank_key(node.accept_rank), format!("{:?}", node.state_vector))
        });
        check_pairwise_consistency(pg, &nodes)?;
        orderings.push(RouterOrdering { loc, order: nodes });
    }
    orderings.sort_by_key(|o| o.loc.index());
    Ok(orderings)
}

fn rank_key(rank: Option<usize>) -> usize {
    rank.unwrap_or(usize::MAX)
}

fn check_well_formed(topo: &Topology, pg: &ProductGraph) -> Result<(), CompileError> {
    let mut offending = Vec::new();
    for loc in topo.originators() {
        let has_reachable = pg
            .start_neighbors()
            .iter()
            .any(|&i| pg.node(i).loc == loc && reaches_end(pg, i));
        if !has_reachable {
            offending.push(topo.location(loc).name().to_string());
        }
    }
    if offending.is_empty() {
        Ok(())
    } else {
        Err(CompileError::NoPathForRouters(offending))
    }
}

fn reaches_end(pg: &ProductGraph, from: usize) -> bool {
    let mut seen = std::collections::HashSet::new();
    let mut stack = vec![from];
    seen.insert(from);
    while let Some(cur) = stack.pop() {
        if pg.node(cur).is_accepting() {
            return true;
        }
        for &next in pg.out_neighbors(cur) {
            if seen.insert(next) {
                stack.push(next);
            }
        }
    }
    false
}

/// Step 2 of §4.E's algorithm: for every ordered pair `(a, b)` with `a` preferred over `b` at
/// this router (the list is already sorted best-first), verify locally that no reachability
/// relation forces `b ≻ a` instead. The sort already encodes `accept_rank`, so within one router
/// any rank disagreement is self-consistent by construction; the remaining way two nodes can
/// contradict each other is if the best rank reachable downstream of `b` is strictly better than
/// the best rank reachable downstream of `a`, which would mean some other router's own preference
/// depends on choosing `b`'s path over `a`'s — the dispute-wheel signature this check rejects.
fn check_pairwise_consistency(pg: &ProductGraph, sorted: &[usize]) -> Result<(), CompileError> {
    for (pos_a, &a) in sorted.iter().enumerate() {
        for &b in &sorted[pos_a + 1..] {
            if a == b {
                continue;
            }
            if induces_reversed_preference(pg, a, b) {
                warn!("inconsistent preference detected between pg nodes {:?} and {:?}", a, b);
                return Err(CompileError::InconsistentPrefs(
                    crate::pg::PgNodeId::Node(a),
                    crate::pg::PgNodeId::Node(b),
                ));
            }
        }
    }
    Ok(())
}

/// Whether some node downstream of both `a` and `b` is only reachable via `b` at a better rank
/// than anything reachable via `a`, while `a` is nonetheless ranked ahead of `b` at their shared
/// router — the signature of a dispute wheel: `a`'s own preference depends on a path that
/// contradicts preferring `a` in the first place.
fn induces_reversed_preference(pg: &ProductGraph, a: usize, b: usize) -> bool {
    let best_via = |start: usize| -> Option<usize> {
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![start];
        seen.insert(start);
        let mut best = None;
        while let Some(cur) = stack.pop() {
            if let Some(r) = pg.node(cur).accept_rank {
                best = Some(best.map_or(r, |b: usize| b.min(r)));
            }
            for &next in pg.out_neighbors(cur) {
                if seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        best
    };
    let best_a = best_via(a);
    let best_b = best_via(b);
    matches!((best_a, best_b), (Some(ba), Some(bb)) if ba > bb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::make_dfa;
    use crate::location::TopologyBuilder;
    use crate::pg::builder::build_pg;
    use crate::regex_lang::PathRegex;

    fn diamond1() -> (Topology, Vec<LocId>) {
        let mut b = TopologyBuilder::new();
        let a = b.add_inside("A", false).unwrap();
        let x = b.add_inside("X", false).unwrap();
        let n = b.add_inside("N", false).unwrap();
        let y = b.add_inside("Y", false).unwrap();
        let bb = b.add_inside("B", true).unwrap();
        b.add_session(a, x);
        b.add_session(x, n);
        b.add_session(n, y);
        b.add_session(y, bb);
        (b.build().unwrap(), vec![a, x, n, y, bb])
    }

    #[test]
    fn diamond1_compiles_with_single_preference() {
        let (topo, locs) = diamond1();
        let re = PathRegex::path(locs.clone());
        let dfa = make_dfa(&topo, &re).unwrap();
        let pg = build_pg(&topo, &[dfa]);
        let orderings = solve_orderings(&topo, &pg);
        assert!(orderings.is_ok());
    }

    #[test]
    fn well_formedness_catches_unreachable_originator() {
        let mut b = TopologyBuilder::new();
        let a = b.add_inside("A", true).unwrap();
        let iso = b.add_inside("Iso", true).unwrap();
        b.add_session(a, iso);
        let topo = b.build().unwrap();
        // a regex that only Iso can ever realize
        let re = PathRegex::Loc(iso);
        let dfa = make_dfa(&topo, &re).unwrap();
        let pg = build_pg(&topo, &[dfa]);
        let result = solve_orderings(&topo, &pg);
        assert!(matches!(result, Err(CompileError::NoPathForRouters(_))));
    }
}
