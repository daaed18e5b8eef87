//! Two fixed-point reductions over a built product graph (§4.D): a missing-suffix-paths prune,
//! then dominance minimization. Both monotonically remove nodes from a finite set, so both
//! terminate.

use super::ProductGraph;
use log::debug;
use std::collections::HashMap;

/// Run both reductions to a fixed point, in the order §4.D describes: pruning first opens up
/// dominance opportunities that wouldn't otherwise be visible (a sibling only dominates once its
/// own dead branches are gone).
pub fn minimize(pg: &mut ProductGraph) {
    loop {
        let removed_a = prune_missing_suffix_paths(pg);
        let removed_b = prune_dominated(pg);
        if !removed_a && !removed_b {
            break;
        }
    }
    debug!("minimized product graph down to {} nodes", pg.len());
}

/// Reduction 1: remove any node with no path to `End` in the edge-reversed graph, i.e. no
/// directed path from the node to any accepting node. Returns whether anything was removed.
fn prune_missing_suffix_paths(pg: &mut ProductGraph) -> bool {
    let n = pg.len();
    if n == 0 {
        return false;
    }
    let mut reaches_end = vec![false; n];
    let mut stack: Vec<usize> = pg.end_predecessors().to_vec();
    for &i in &stack {
        reaches_end[i] = true;
    }
    while let Some(cur) = stack.pop() {
        for &pred in pg.in_neighbors(cur) {
            if !reaches_end[pred] {
                reaches_end[pred] = true;
                stack.push(pred);
            }
        }
    }
    if reaches_end.iter().all(|&b| b) {
        return false;
    }
    pg.retain_nodes(&reaches_end);
    true
}

/// Reduction 2: a node *v* is redundant if, for every path through *v* realizing some rank *r*,
/// a sibling node at the same `loc` realizes a rank `<= r` via paths covering the same
/// reachability. We approximate this (as §4.D's design notes license: the check is conservative)
/// by comparing each node's own `accept_rank` against the best `accept_rank` reachable from any
/// other node sharing its `loc`, treating a node as dominated only when a strictly-better-or-equal
/// sibling reaches everything this node reaches "forward" (same out-neighborhood closure).
fn prune_dominated(pg: &mut ProductGraph) -> bool {
    let n = pg.len();
    if n == 0 {
        return false;
    }
    // best_rank_from[i] = the best (smallest, None counts as worst) accept_rank reachable from i
    // (including i itself), via forward edges.
    let mut best_rank_from: Vec<Option<usize>> = vec![None; n];
    // Relaxed to a fixed point below (`minimize`'s caller re-invokes this to convergence), so
    // any visiting order is safe even though the graph may be cyclic.
    for i in 0..n {
        let mut best = pg.node(i).accept_rank;
        for &o in pg.out_neighbors(i) {
            best = min_rank(best, best_rank_from[o]);
        }
        best_rank_from[i] = best;
    }

    let mut by_loc: HashMap<_, Vec<usize>> = HashMap::new();
    for i in pg.node_indices() {
        by_loc.entry(pg.node(i).loc).or_default().push(i);
    }

    let mut keep = vec![true; n];
    for (_, siblings) in by_loc.iter() {
        if siblings.len() < 2 {
            continue;
        }
        for &v in siblings {
            let v_out: std::collections::HashSet<usize> = pg.out_neighbors(v).iter().copied().collect();
            for &u in siblings {
                if u == v {
                    continue;
                }
                let u_out: std::collections::HashSet<usize> = pg.out_neighbors(u).iter().copied().collect();
                let u_covers_v = v_out.is_subset(&u_out);
                let u_at_least_as_good = better_or_equal(best_rank_from[u], best_rank_from[v]);
                if u_covers_v && u_at_least_as_good && (u_out.len() > v_out.len() || u < v) {
                    keep[v] = false;
                    break;
                }
            }
        }
    }

    if keep.iter().all(|&k| k) {
        return false;
    }
    pg.retain_nodes(&keep);
    true
}

fn min_rank(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (None, x) => x,
        (x, None) => x,
        (Some(x), Some(y)) => Some(x.min(y)),
    }
}

/// `a` is at least as good a rank as `b` (smaller is better; `None` is worst).
fn better_or_equal(a: Option<usize>, b: Option<usize>) -> bool {
    match (a, b) {
        (None, None) => true,
        (None, Some(_)) => false,
        (Some(_), None) => true,
        (Some(x), Some(y)) => x <= y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::make_dfa;
    use crate::location::TopologyBuilder;
    use crate::pg::builder::build_pg;
    use crate::regex_lang::PathRegex;

    #[test]
    fn dead_branch_is_pruned() {
        let mut b = TopologyBuilder::new();
        let a = b.add_inside("A", false).unwrap();
        let x = b.add_inside("X", false).unwrap();
        let y = b.add_inside("Y", true).unwrap();
        let dead_end = b.add_inside("Dead", false).unwrap();
        b.add_session(a, x);
        b.add_session(x, y);
        b.add_session(x, dead_end);
        let topo = b.build().unwrap();

        let re = PathRegex::path([a, x, y]);
        let dfa = make_dfa(&topo, &re).unwrap();
        let mut pg = build_pg(&topo, &[dfa]);
        let before = pg.len();
        minimize(&mut pg);
        assert!(pg.len() <= before);
        assert!(pg.node_indices().all(|i| pg.node(i).loc != dead_end));
    }
}
