//! End-to-end scenarios seeded from the compiler's worked examples: one test function per named
//! scenario, plus the two boundary behaviors. Each scenario builds its own small topology with
//! `TopologyBuilder` rather than a shared fixture module, since every scenario's shape differs.

use netpolicy::bdd::TRUE;
use netpolicy::driver::{compile_all, PolicyPair};
use netpolicy::location::TopologyBuilder;
use netpolicy::regex_lang::PathRegex;
use netpolicy::settings::{noop_debug_hook, CompilerSettings};
use netpolicy::Error as CompileError;

fn pair(preferences: Vec<PathRegex>) -> PolicyPair {
    PolicyPair { predicate: TRUE, preferences }
}

/// Diamond1: a single exact-path preference over a line of routers. Compiles; every hop receives
/// from exactly the next location down the chain; the originator needs no ordering at all.
#[test]
fn diamond1_single_preference_compiles() {
    let mut b = TopologyBuilder::new();
    let a = b.add_inside("A", false).unwrap();
    let x = b.add_inside("X", false).unwrap();
    let n = b.add_inside("N", false).unwrap();
    let y = b.add_inside("Y", false).unwrap();
    let origin = b.add_inside("B", true).unwrap();
    b.add_session(origin, y);
    b.add_session(y, n);
    b.add_session(n, x);
    b.add_session(x, a);
    let topo = b.build().unwrap();

    assert!(topo.receives_from(y).contains(&origin));
    assert!(topo.receives_from(n).contains(&y));
    assert!(topo.receives_from(x).contains(&n));
    assert!(topo.receives_from(a).contains(&x));

    let p = pair(vec![PathRegex::path([a, x, n, y, origin])]);
    let configs = compile_all(&topo, vec![p], &CompilerSettings::default(), noop_debug_hook()).unwrap();
    assert!(configs.contains_key("A"));
    assert!(configs.contains_key("B"));
    assert!(configs["B"].actions[0].device.originates);
}

/// DatacenterSmall3: a spine-waypoint router with a backup path. Compiles; the receiver prefers
/// the primary spine over the backup.
#[test]
fn datacenter_small3_prefers_primary_spine_over_backup() {
    let mut b = TopologyBuilder::new();
    let origin = b.add_inside("A", true).unwrap();
    let primary = b.add_inside("M", false).unwrap();
    let backup = b.add_inside("N", false).unwrap();
    let receiver = b.add_inside("Y", false).unwrap();
    b.add_session(origin, primary);
    b.add_session(origin, backup);
    b.add_session(primary, receiver);
    b.add_session(backup, receiver);
    let topo = b.build().unwrap();

    let p = pair(vec![
        PathRegex::path([receiver, primary, origin]),
        PathRegex::path([receiver, backup, origin]),
    ]);
    let result = compile_all(&topo, vec![p], &CompilerSettings::default(), noop_debug_hook());
    assert!(result.is_ok());
}

/// StretchingMan1: a receiver with two outside peers, one preferred over "anything else".
/// Compiles; no preference conflict arises for the listed receiver.
#[test]
fn stretching_man1_prefers_named_peer_over_fallback() {
    let mut b = TopologyBuilder::new();
    let receiver = b.add_inside("R", false).unwrap();
    let preferred_peer = b.add_outside("Y").unwrap();
    let fallback_peer = b.add_outside("Z").unwrap();
    b.add_edge(preferred_peer, receiver);
    b.add_edge(fallback_peer, receiver);
    let topo = b.build().unwrap();

    let p = pair(vec![
        PathRegex::path([receiver, preferred_peer]),
        PathRegex::path([receiver, fallback_peer]),
    ]);
    let result = compile_all(&topo, vec![p], &CompilerSettings::default(), noop_debug_hook());
    assert!(result.is_ok());
}

/// The classic three-router "bad gadget": each router's best path runs through the next router in
/// the ring, whose own best path in turn depends on the router after that. Expected:
/// `InconsistentPrefs`.
#[test]
fn bad_gadget_cyclic_preferences_are_inconsistent() {
    let mut b = TopologyBuilder::new();
    let origin = b.add_inside("D", true).unwrap();
    let r0 = b.add_inside("R0", false).unwrap();
    let r1 = b.add_inside("R1", false).unwrap();
    let r2 = b.add_inside("R2", false).unwrap();
    b.add_edge(origin, r0);
    b.add_edge(origin, r1);
    b.add_edge(origin, r2);
    b.add_edge(r1, r0);
    b.add_edge(r2, r1);
    b.add_edge(r0, r2);
    let topo = b.build().unwrap();

    let p = pair(vec![
        PathRegex::path([r0, r1, origin]),
        PathRegex::path([r1, r2, origin]),
        PathRegex::path([r2, r0, origin]),
        PathRegex::path([r0, origin]),
        PathRegex::path([r1, origin]),
        PathRegex::path([r2, origin]),
    ]);
    let result = compile_all(&topo, vec![p], &CompilerSettings::default(), noop_debug_hook());
    assert!(matches!(result, Err(CompileError::InconsistentPrefs(_, _))));
}

/// The same ring topology as the bad gadget, but with the six per-router alternatives merged down
/// into two ranked tiers (every "via" path tied at rank 0, every direct path tied at rank 1).
/// Expected: compiles — the merge removes the asymmetric ranking that made the bad gadget
/// inconsistent.
#[test]
fn ok_gadget_merged_preferences_compile() {
    let mut b = TopologyBuilder::new();
    let origin = b.add_inside("D", true).unwrap();
    let ra = b.add_inside("A", false).unwrap();
    let rb = b.add_inside("B", false).unwrap();
    let rc = b.add_inside("C", false).unwrap();
    b.add_edge(origin, ra);
    b.add_edge(origin, rb);
    b.add_edge(origin, rc);
    b.add_edge(rb, ra);
    b.add_edge(rc, rb);
    b.add_edge(ra, rc);
    let topo = b.build().unwrap();

    let via = PathRegex::Union(vec![
        PathRegex::path([ra, rb, origin]),
        PathRegex::path([rb, rc, origin]),
        PathRegex::path([rc, ra, origin]),
    ]);
    let direct = PathRegex::Union(vec![
        PathRegex::path([ra, origin]),
        PathRegex::path([rb, origin]),
        PathRegex::path([rc, origin]),
    ]);
    let p = pair(vec![via, direct]);
    let result = compile_all(&topo, vec![p], &CompilerSettings::default(), noop_debug_hook());
    assert!(result.is_ok());
}

/// Boundary behavior: a preference with the empty language can never be satisfied, so the
/// originator's well-formedness check must reject it rather than silently producing an empty
/// config.
#[test]
fn empty_language_preference_is_rejected() {
    let mut b = TopologyBuilder::new();
    let origin = b.add_inside("A", true).unwrap();
    let other = b.add_inside("X", false).unwrap();
    b.add_session(origin, other);
    let topo = b.build().unwrap();

    let p = pair(vec![PathRegex::Empty]);
    let result = compile_all(&topo, vec![p], &CompilerSettings::default(), noop_debug_hook());
    assert!(matches!(result, Err(CompileError::NoPathForRouters(_))));
}

/// Boundary behavior: a disconnected inside subgraph must fail at topology-build time, before any
/// product graph is ever constructed.
#[test]
fn disconnected_inside_topology_fails_before_compiling() {
    let mut b = TopologyBuilder::new();
    b.add_inside("A", true).unwrap();
    b.add_inside("B", true).unwrap();
    assert!(b.build().is_err());
}
