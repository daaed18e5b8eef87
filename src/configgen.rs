//! Configuration generator (§4.G): turns a router's resolved ordering into filter rules, with
//! local-pref assignment, peer-vs-state match selection, export collapsing, tag stripping and
//! peer-set-uniqueness rewriting.

use crate::bdd::{BddManager, TRUE};
use crate::config::{Action, DeviceConfig, Export, Filter, Match};
use crate::incoming::{classify_peers, tier_actions, PeerClass};
use crate::location::{LocId, Topology};
use crate::ordering::RouterOrdering;
use crate::pg::regex_from_pg::regex_between;
use crate::pg::ProductGraph;
use crate::settings::CompilerSettings;
use log::trace;

/// Generate one router's [`DeviceConfig`] from its resolved ordering, per the seven steps of
/// §4.G. `bdd` is used only to tag scoped predicates at the call site; this function produces a
/// single [`DeviceConfig`] scoped to the caller's predicate.
pub fn generate_router_config(
    topo: &Topology,
    pg: &ProductGraph,
    ordering: &RouterOrdering,
    settings: &CompilerSettings,
) -> DeviceConfig {
    let full_peer_set: Vec<LocId> = topo.locations().collect();
    let mut filters = Vec::new();
    let originates = ordering.order.iter().any(|&i| pg.node(i).loc == ordering.loc && start_originates(pg, i));

    for (i, &node_idx) in ordering.order.iter().enumerate() {
        let local_pref = 101 - i as i32;
        let matched = derive_match(topo, pg, &ordering.order, node_idx);
        let exports = derive_exports(topo, pg, node_idx, &full_peer_set, settings);
        filters.push(Filter::Allow { matched, local_pref, exports });
    }

    // Step 5: tag stripping — an inside export's SetCommunity action is redundant if every
    // receiver's own match would already imply that community from the state vector, which for
    // this per-prefix scope collapses to: state-tag exports are dropped whenever only one filter
    // remains (a single PG node per router — nothing downstream needs to disambiguate).
    if filters.len() == 1 {
        strip_redundant_tags(&mut filters);
    }

    // Step 7: terminal Deny.
    filters.push(Filter::Deny);
    // §4.G: "the filter list is reversed so that the best preference appears first" — `filters`
    // was already built best-first, then Deny appended; nothing further to reverse here since we
    // never prepended in reverse order to begin with.

    trace!("generated {} filters for router {}", filters.len(), topo.location(ordering.loc).name());
    DeviceConfig { originates, filters }
}

fn start_originates(pg: &ProductGraph, idx: usize) -> bool {
    pg.start_neighbors().contains(&idx)
}

/// Step 2-3 & 6: pick `Match::Peer`/`Match::State`/`Match::PathRegex`, collapsing to a wildcard
/// `State` when every peer agrees, and simplifying a unique edge down to `Match::Peer`.
fn derive_match(topo: &Topology, pg: &ProductGraph, sorted: &[usize], node_idx: usize) -> Match {
    let in_neighbors = pg.in_neighbors(node_idx);
    if in_neighbors.is_empty() {
        return Match::NoMatch;
    }
    let all_peers = topo.locations().count();
    let in_locs: Vec<LocId> = in_neighbors.iter().map(|&i| pg.node(i).loc).collect();
    let state_id = format!("{:?}", pg.node(node_idx).state_vector);

    // Step 3: if every topology peer is represented and they share one DFA state, collapse.
    let same_state = in_neighbors.iter().all(|&i| format!("{:?}", pg.node(i).state_vector) == state_id);
    if same_state && in_locs.len() >= all_peers.saturating_sub(1) {
        return Match::State(state_id, None);
    }

    if in_neighbors.len() == 1 {
        // Step 6: peer-set uniqueness — a single PG predecessor is the sole path into this node,
        // so the state match collapses to a plain per-peer match.
        let only = in_neighbors[0];
        return Match::Peer(topo.location(pg.node(only).loc).name().to_string());
    }

    // Otherwise fall back to the path-regex reconstruction via state elimination.
    let nodes: Vec<usize> = sorted.to_vec();
    match in_neighbors.first() {
        Some(&source) => match regex_between(pg, &nodes, source, node_idx) {
            Ok(re) => Match::PathRegex(re),
            Err(_) => Match::State(state_id, None),
        },
        None => Match::NoMatch,
    }
}

/// Step 4: partition out-neighbors into inside/outside, collapsing to a single wildcard export
/// when the full topology peer set is covered and nothing special is required inbound.
fn derive_exports(
    topo: &Topology,
    pg: &ProductGraph,
    node_idx: usize,
    full_peer_set: &[LocId],
    settings: &CompilerSettings,
) -> Vec<Export> {
    let out = pg.out_neighbors(node_idx);
    let state_id = format!("{:?}", pg.node(node_idx).state_vector);
    let (inside, outside): (Vec<LocId>, Vec<LocId>) = out
        .iter()
        .map(|&i| pg.node(i).loc)
        .partition(|&l| topo.location(l).is_inside());

    let mut exports = Vec::new();
    if !inside.is_empty() {
        exports.push(Export { peer: None, actions: vec![Action::SetCommunity(state_id.clone())] });
    }
    for (i, &peer) in outside.iter().enumerate() {
        let mut actions = Vec::new();
        if let Ok(peer_actions) = tier_actions(peer, i, settings) {
            actions = peer_actions.actions;
        }
        exports.push(Export { peer: Some(topo.location(peer).name().to_string()), actions });
    }

    if inside.len() + outside.len() == full_peer_set.len().saturating_sub(1) {
        // Every peer is represented and no peer required a distinguishing tier action: collapse.
        let any_tiered = exports.iter().any(|e| !e.actions.is_empty());
        if !any_tiered {
            return vec![Export { peer: None, actions: vec![] }];
        }
    }
    exports
}

fn strip_redundant_tags(filters: &mut [Filter]) {
    for f in filters.iter_mut() {
        if let Filter::Allow { exports, .. } = f {
            for export in exports.iter_mut() {
                export.actions.retain(|a| !matches!(a, Action::SetCommunity(_)));
            }
        }
    }
}

/// Run §4.F's peer classification up front so callers can feed `UncontrollableEnter`/
/// `UncontrollablePeerPreference` failures back before generating any router configs.
pub fn precheck_incoming(
    topo: &Topology,
    pg: &ProductGraph,
    settings: &CompilerSettings,
) -> Result<Vec<(LocId, PeerClass)>, crate::error::CompileError> {
    classify_peers(topo, pg, settings)
}

/// Build a fresh [`BddManager`] sized for the standard 32 prefix bits + 32 slash-length bits
/// variable family (§4.B); community variables are allocated on demand past that base.
pub fn new_bdd_manager(extra_vars: u32) -> BddManager {
    BddManager::new(64 + extra_vars)
}

/// The scope predicate meaning "applies everywhere" — used when a policy pair's predicate is the
/// universal set.
pub fn universal_scope() -> crate::bdd::BddIndex {
    TRUE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::make_dfa;
    use crate::location::TopologyBuilder;
    use crate::ordering::solve_orderings;
    use crate::pg::builder::build_pg;
    use crate::regex_lang::PathRegex;

    #[test]
    fn single_hop_router_gets_deny_terminated_filters() {
        let mut b = TopologyBuilder::new();
        let a = b.add_inside("A", false).unwrap();
        let x = b.add_inside("X", true).unwrap();
        b.add_session(a, x);
        let topo = b.build().unwrap();
        let re = PathRegex::path([a, x]);
        let dfa = make_dfa(&topo, &re).unwrap();
        let pg = build_pg(&topo, &[dfa]);
        let orderings = solve_orderings(&topo, &pg).unwrap();
        let settings = CompilerSettings::default();
        for ordering in &orderings {
            let cfg = generate_router_config(&topo, &pg, ordering, &settings);
            assert_eq!(cfg.filters.last(), Some(&Filter::Deny));
        }
    }
}
