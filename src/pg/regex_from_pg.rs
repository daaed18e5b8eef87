//! State elimination (Arden's lemma) over a PG subgraph, used by §4.G to reconstruct a
//! `Match::PathRegex` when a router's incoming match cannot be expressed as a simple
//! `Peer`/`State` match.

use super::{PgError, ProductGraph};
use crate::regex_lang::PathRegex;

/// Reconstruct a regex describing every path from `source` to `sink` within the subgraph induced
/// by `nodes` (both given as arena indices into `pg`), labeling each traversed edge `u -> v` with
/// `v`'s location — i.e. the label a walker reads on *arriving* at `v`, matching how
/// [`crate::dfa`] steps a DFA by the location being entered.
///
/// Classic state-elimination: repeatedly remove a non-terminal state `q`, folding its self-loop
/// (via `Star`) and every `in -> q -> out` detour into a direct `in -> out` edge labeled
/// `in_label . q_self* . out_label`, until only `source` and `sink` remain.
pub fn regex_between(
    pg: &ProductGraph,
    nodes: &[usize],
    source: usize,
    sink: usize,
) -> Result<PathRegex, PgError> {
    if !nodes.contains(&source) || !nodes.contains(&sink) {
        return Err(PgError::DisconnectedSubgraph);
    }
    let n = nodes.len();
    let local: std::collections::HashMap<usize, usize> =
        nodes.iter().enumerate().map(|(i, &g)| (g, i)).collect();
    let src = local[&source];
    let dst = local[&sink];

    // trans[i][j] = regex labeling the direct edge i -> j (None if absent).
    let mut trans: Vec<Vec<Option<PathRegex>>> = vec![vec![None; n]; n];
    for (gi, &g) in nodes.iter().enumerate() {
        for &gt in pg.out_neighbors(g) {
            if let Some(&j) = local.get(&gt) {
                let label = PathRegex::Loc(pg.node(gt).loc);
                trans[gi][j] = Some(union_opt(trans[gi][j].take(), label));
            }
        }
    }

    // Eliminate every state except src and dst.
    let mut alive: Vec<bool> = vec![true; n];
    for q in 0..n {
        if q == src || q == dst {
            continue;
        }
        let self_loop = trans[q][q].clone();
        let star = self_loop.map(|r| PathRegex::Star(Box::new(r)));
        for i in 0..n {
            if !alive[i] || i == q {
                continue;
            }
            let Some(in_label) = trans[i][q].clone() else { continue };
            for j in 0..n {
                if !alive[j] || j == q {
                    continue;
                }
                let Some(out_label) = trans[q][j].clone() else { continue };
                let mut through = in_label.clone();
                if let Some(s) = &star {
                    through = through.then(s.clone());
                }
                through = through.then(out_label);
                trans[i][j] = Some(union_opt(trans[i][j].take(), through));
            }
        }
        alive[q] = false;
        for i in 0..n {
            trans[i][q] = None;
            trans[q][i] = None;
        }
    }

    match trans[src][dst].clone() {
        Some(re) => Ok(re),
        None if src == dst => Ok(PathRegex::Epsilon),
        None => Err(PgError::DisconnectedSubgraph),
    }
}

fn union_opt(existing: Option<PathRegex>, new: PathRegex) -> PathRegex {
    match existing {
        None => new,
        Some(PathRegex::Union(mut parts)) => {
            parts.push(new);
            PathRegex::Union(parts)
        }
        Some(other) => PathRegex::Union(vec![other, new]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::make_dfa;
    use crate::location::TopologyBuilder;
    use crate::pg::builder::build_pg;

    #[test]
    fn straight_line_reconstructs_path() {
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

        let y_node = pg.node_indices().find(|&i| pg.node(i).loc == y).unwrap();
        let a_node = pg.node_indices().find(|&i| pg.node(i).loc == a).unwrap();
        let nodes: Vec<usize> = pg.node_indices().collect();
        let rebuilt = regex_between(&pg, &nodes, y_node, a_node);
        assert!(rebuilt.is_ok());
    }

    #[test]
    fn disconnected_pair_errors() {
        let mut b = TopologyBuilder::new();
        let a = b.add_inside("A", true).unwrap();
        let iso = b.add_inside("Iso", false).unwrap();
        b.add_session(a, iso);
        let topo = b.build().unwrap();
        let re = PathRegex::Loc(a);
        let dfa = make_dfa(&topo, &re).unwrap();
        let pg = build_pg(&topo, &[dfa]);
        let nodes: Vec<usize> = pg.node_indices().collect();
        if nodes.len() >= 2 {
            let result = regex_between(&pg, &[nodes[0]], nodes[0], *nodes.last().unwrap());
            assert!(result.is_err());
        }
    }
}
