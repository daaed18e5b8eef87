//! Prefix driver (§4.H): runs the full A-through-G pipeline for each `(predicate, preferences)`
//! pair, embarrassingly parallel across a worker pool, then joins per-router results
//! deterministically by router name.

use crate::bdd::BddIndex;
use crate::config::{RouterConfig, ScopedConfig};
use crate::dfa::make_dfa;
use crate::error::CompileError;
use crate::location::Topology;
use crate::ordering::solve_orderings;
use crate::pg::builder::build_pg;
use crate::pg::minimize::minimize;
use crate::regex_lang::PathRegex;
use crate::settings::{CompilerSettings, DebugHookRef};
use log::info;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::thread;

/// One entry of the policy input: a predicate scope and its ordered preference regexes, best
/// first (§6's `PolicyPair`).
#[derive(Debug, Clone)]
pub struct PolicyPair {
    pub predicate: BddIndex,
    pub preferences: Vec<PathRegex>,
}

/// Compile every [`PolicyPair`] against `topo` and join the results, per §4.H/§5. Each pair's
/// compilation is independent and synchronous; pairs run across a worker pool sized to
/// `num_cpus::get()` unless the caller supplies fewer pairs than that.
pub fn compile_all(
    topo: &Topology,
    pairs: Vec<PolicyPair>,
    settings: &CompilerSettings,
    debug_hook: DebugHookRef,
) -> Result<BTreeMap<String, RouterConfig>, CompileError> {
    let topo = Arc::new(topo.clone());
    let settings = Arc::new(settings.clone());
    let pairs = Arc::new(Mutex::new(pairs.into_iter().enumerate().collect::<Vec<_>>()));
    let results: Arc<Mutex<Vec<(usize, Result<BTreeMap<String, ScopedConfig>, CompileError>)>>> =
        Arc::new(Mutex::new(Vec::new()));

    let num_workers = num_cpus::get().max(1);
    let mut handles = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        let topo = Arc::clone(&topo);
        let settings = Arc::clone(&settings);
        let pairs = Arc::clone(&pairs);
        let results = Arc::clone(&results);
        let debug_hook = Arc::clone(&debug_hook);
        handles.push(thread::spawn(move || loop {
            let next = pairs.lock().unwrap().pop();
            let Some((idx, pair)) = next else { break };
            let outcome = compile_one(&topo, &pair, &settings, &debug_hook);
            results.lock().unwrap().push((idx, outcome));
        }));
    }
    for h in handles {
        let _ = h.join();
    }

    let mut ordered = Arc::try_unwrap(results).unwrap().into_inner().unwrap();
    ordered.sort_by_key(|(idx, _)| *idx);

    let mut joined: BTreeMap<String, RouterConfig> = BTreeMap::new();
    for (_, outcome) in ordered {
        let per_router = outcome?;
        for (router, scoped) in per_router {
            joined.entry(router).or_default().actions.push(scoped);
        }
    }
    info!("compiled {} policy pair(s) into {} router configs", joined.values().len(), joined.len());
    Ok(joined)
}

/// The single-prefix pipeline, A through G, for one [`PolicyPair`].
fn compile_one(
    topo: &Topology,
    pair: &PolicyPair,
    settings: &CompilerSettings,
    debug_hook: &DebugHookRef,
) -> Result<BTreeMap<String, ScopedConfig>, CompileError> {
    if pair.preferences.is_empty() {
        return Err(CompileError::EmptyPreferenceList);
    }
    let dfas: Result<Vec<_>, _> = pair.preferences.iter().map(|re| make_dfa(topo, re)).collect();
    let dfas = dfas?;
    debug_hook.on_checkpoint("dfas", &format!("{} dfas built", dfas.len()));

    let mut pg = build_pg(topo, &dfas);
    debug_hook.on_checkpoint("raw_pg", &format!("{} nodes", pg.len()));

    minimize(&mut pg);
    debug_hook.on_checkpoint("minimized_pg", &format!("{} nodes", pg.len()));

    let orderings = solve_orderings(topo, &pg)?;
    crate::configgen::precheck_incoming(topo, &pg, settings)?;

    let mut out = BTreeMap::new();
    for ordering in &orderings {
        let name = topo.location(ordering.loc).name().to_string();
        let device = crate::configgen::generate_router_config(topo, &pg, ordering, settings);
        out.insert(name, ScopedConfig { predicate: pair.predicate, device });
    }
    Ok(out)
}

/// Smallest number of concurrent link failures that would disconnect `aggregate_loc` from every
/// originator in `topo`, i.e. the topology's edge-connectivity as seen from that location. Used
/// by §4.H to report the minimum "aggregate-failures-survived" across all compiled prefixes.
///
/// Computed as the minimum, over every originator, of the size of the smallest edge cut
/// separating it from `aggregate_loc`; approximated here via per-originator max-flow with unit
/// edge capacities (standard Menger's-theorem equivalence between min-cut and edge-disjoint
/// paths).
pub fn aggregate_failures_survived(topo: &Topology, aggregate_loc: crate::location::LocId) -> usize {
    let originators = topo.originators();
    originators
        .iter()
        .filter(|&&o| o != aggregate_loc)
        .map(|&o| edge_disjoint_paths(topo, o, aggregate_loc))
        .min()
        .unwrap_or(0)
}

/// Count of edge-disjoint paths from `src` to `dst`, via repeated BFS augmentation (Ford-Fulkerson
/// style) over the directed topology with unit edge capacities.
fn edge_disjoint_paths(topo: &Topology, src: crate::location::LocId, dst: crate::location::LocId) -> usize {
    let mut used: HashMap<(crate::location::LocId, crate::location::LocId), bool> = HashMap::new();
    let mut count = 0;
    loop {
        let mut prev: HashMap<crate::location::LocId, crate::location::LocId> = HashMap::new();
        let mut seen = std::collections::HashSet::new();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(src);
        seen.insert(src);
        while let Some(cur) = queue.pop_front() {
            if cur == dst {
                break;
            }
            for next in topo.exports_to(cur) {
                if !seen.contains(&next) && !used.get(&(cur, next)).copied().unwrap_or(false) {
                    seen.insert(next);
                    prev.insert(next, cur);
                    queue.push_back(next);
                }
            }
        }
        if !seen.contains(&dst) {
            break;
        }
        let mut node = dst;
        while node != src {
            let p = prev[&node];
            used.insert((p, node), true);
            node = p;
        }
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::TopologyBuilder;
    use crate::settings::noop_debug_hook;

    #[test]
    fn compiles_single_policy_pair() {
        let mut b = TopologyBuilder::new();
        let a = b.add_inside("A", false).unwrap();
        let x = b.add_inside("X", true).unwrap();
        b.add_session(a, x);
        let topo = b.build().unwrap();
        let pair = PolicyPair { predicate: crate::bdd::TRUE, preferences: vec![PathRegex::path([a, x])] };
        let settings = CompilerSettings::default();
        let result = compile_all(&topo, vec![pair], &settings, noop_debug_hook());
        assert!(result.is_ok());
    }

    #[test]
    fn empty_preference_list_is_rejected() {
        let mut b = TopologyBuilder::new();
        let a = b.add_inside("A", false).unwrap();
        let x = b.add_inside("X", true).unwrap();
        b.add_session(a, x);
        let topo = b.build().unwrap();
        let pair = PolicyPair { predicate: crate::bdd::TRUE, preferences: vec![] };
        let settings = CompilerSettings::default();
        let result = compile_all(&topo, vec![pair], &settings, noop_debug_hook());
        assert!(matches!(result, Err(CompileError::EmptyPreferenceList)));
    }

    #[test]
    fn edge_disjoint_paths_counts_parallel_routes() {
        let mut b = TopologyBuilder::new();
        let a = b.add_inside("A", true).unwrap();
        let x = b.add_inside("X", false).unwrap();
        let y = b.add_inside("Y", false).unwrap();
        let z = b.add_inside("Z", true).unwrap();
        b.add_edge(a, x);
        b.add_edge(a, y);
        b.add_edge(x, z);
        b.add_edge(y, z);
        let topo = b.build().unwrap();
        assert_eq!(edge_disjoint_paths(&topo, a, z), 2);
    }
}
