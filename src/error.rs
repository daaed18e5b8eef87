//! Module containing all error types returned by the compilation pipeline.

use crate::bdd::BddError;
use crate::dfa::DfaError;
use crate::location::TopologyError;
use crate::pg::{PgError, PgNodeId};
use thiserror::Error;

/// Top-level error produced by the compiler. Every fatal outcome of a compile is one of these
/// variants; recoverable local conditions (a dead DFA state, a missing edge) are pruning events,
/// not errors, and never surface here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The topology itself is malformed (duplicate/unknown location, disconnected inside
    /// subgraph). This aborts compilation before any per-prefix work starts.
    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),
    /// A preference regex could not be turned into a DFA over the topology alphabet.
    #[error("dfa error: {0}")]
    Dfa(#[from] DfaError),
    /// The BDD predicate engine hit an internal inconsistency.
    #[error("bdd error: {0}")]
    Bdd(#[from] BddError),
    /// The product-graph construction or minimization hit an internal inconsistency.
    #[error("product graph error: {0}")]
    Pg(#[from] PgError),
    /// At least one router that ought to originate or relay traffic has no accepted path in the
    /// product graph: the policy is unrealizable on this topology. Emitted by §4.E/§4.D.
    #[error("no realizable path exists for router(s): {0:?}")]
    NoPathForRouters(Vec<String>),
    /// No single per-router total order can realize both of these product-graph nodes'
    /// preferences without routing instability. Emitted by §4.E.
    #[error("no consistent per-router ordering exists between nodes {0:?} and {1:?}")]
    InconsistentPrefs(PgNodeId, PgNodeId),
    /// A preference regex produced no accepting product-graph node. Reserved: see Open Questions
    /// in DESIGN.md — currently emitted as a diagnostic, never fatal on its own.
    #[error("preference(s) at index/indices {0:?} are never realized by any accepted path")]
    UnusedPreferences(Vec<usize>),
    /// No combination of export actions can restrict what a peer sends inbound to the policy's
    /// desired set. Emitted by §4.F.
    #[error("cannot control inbound traffic accepted from peer `{peer}`: {reason}")]
    UncontrollableEnter {
        /// Name of the offending outside peer.
        peer: String,
        /// Human-readable explanation / counter-example.
        reason: String,
    },
    /// Two consecutive preference tiers from the same peer must be distinguished inbound, but
    /// the MED/prepend knobs needed to do so are disabled. Emitted by §4.F.
    #[error("cannot enforce inbound preference ordering at peer `{0}` without MED or prepending")]
    UncontrollablePeerPreference(String),
    /// A `PolicyPair` was submitted with an empty preference list: there is nothing to compile.
    #[error("policy pair has an empty preference list")]
    EmptyPreferenceList,
}
