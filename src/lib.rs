#![deny(missing_docs)]

//! # netpolicy: compiling inter-domain routing policy into per-router BGP configuration
//! This is a library for turning a declarative routing policy — a topology, a set of per-prefix
//! preference orderings expressed as path regexes, and a handful of global constraints — into
//! per-router BGP filter configuration that realizes it, or a structured counter-example
//! explaining why it cannot be realized.
//!
//! ## Problem statement
//! Given
//! - a topology of inside routers and outside peers,
//! - for each prefix (or range of prefixes), an ordered list of preference regexes describing
//!   which AS-paths are acceptable and in what order they should be preferred,
//! - a handful of aggregation/community/max-routes constraints,
//!
//! produce a `RouterConfig` per router expressing match/export filters that realize the policy
//! using only local, per-router BGP mechanisms (local-pref, MED, AS-prepending, communities),
//! or fail with a structured reason when no such configuration exists.
//!
//! ## Structure
//!
//! This library is structured in the following way:
//!
//! - **[`location`]**: the topology data model — [`Topology`](location::Topology) and its
//!   builder.
//! - **[`regex_lang`]**: the [`PathRegex`](regex_lang::PathRegex) combinator language used to
//!   express preferences and constraints over the topology's location alphabet.
//! - **[`dfa`]**: compiles a [`PathRegex`](regex_lang::PathRegex) into a [`Dfa`](dfa::Dfa) over
//!   the topology's alphabet.
//! - **[`pg`]**: the product graph — [`builder`](pg::builder) constructs it,
//!   [`minimize`](pg::minimize) shrinks it to a fixed point, and
//!   [`regex_from_pg`](pg::regex_from_pg) reconstructs a regex from a subgraph via state
//!   elimination.
//! - **[`bdd`]**: the hash-consed [`BddManager`](bdd::BddManager) predicate engine over
//!   prefix/community variables.
//! - **[`ordering`]**: the per-router consistency/ordering solver.
//! - **[`incoming`]**: the per-peer incoming-traffic classifier.
//! - **[`config`]**: the `Match`/`Action`/`Filter`/`DeviceConfig`/`RouterConfig` output data
//!   model.
//! - **[`configgen`]**: turns a resolved ordering into a router's filter list.
//! - **[`driver`]**: runs the whole pipeline per prefix, in parallel, and joins the results.
//! - **[`printer`]**: non-semantic pretty-printing for diffing and debugging.
//! - **[`settings`]**: the knobs ([`CompilerSettings`](settings::CompilerSettings)) and the
//!   [`DebugHook`](settings::DebugHook) seam external tooling plugs into.
//!
//! ## Usage
//!
//! ```
//! use netpolicy::location::TopologyBuilder;
//! use netpolicy::driver::{compile_all, PolicyPair};
//! use netpolicy::regex_lang::PathRegex;
//! use netpolicy::settings::{CompilerSettings, noop_debug_hook};
//! use netpolicy::bdd::TRUE;
//!
//! # fn main() -> Result<(), netpolicy::Error> {
//! let mut builder = TopologyBuilder::new();
//! let origin = builder.add_inside("B", true)?;
//! let edge = builder.add_inside("A", false)?;
//! builder.add_session(origin, edge);
//! let topo = builder.build()?;
//!
//! let pair = PolicyPair { predicate: TRUE, preferences: vec![PathRegex::path([edge, origin])] };
//! let settings = CompilerSettings::default();
//! let configs = compile_all(&topo, vec![pair], &settings, noop_debug_hook())?;
//! println!("{}", netpolicy::printer::print_all(&configs));
//! # Ok(())
//! # }
//! ```

pub mod bdd;
pub mod config;
pub mod configgen;
pub mod dfa;
pub mod driver;
mod error;
pub mod incoming;
pub mod location;
pub mod ordering;
pub mod pg;
pub mod printer;
pub mod regex_lang;
pub mod settings;

pub use error::CompileError as Error;
