//! The configuration data model (§3/§6): `Match`/`Action`/`Filter`/`DeviceConfig`, the
//! per-router control block for aggregates/communities/max-routes, and the final per-prefix,
//! per-router `RouterConfig` the compiler hands back to its caller.

use crate::bdd::BddIndex;
use crate::regex_lang::PathRegex;

/// What an inbound announcement must satisfy for a [`Filter`] to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    /// Matches announcements received directly from the named peer location.
    Peer(String),
    /// Matches announcements tagged with `community` received from `loc`, or from any peer if
    /// `loc` is `None` (the "*" wildcard).
    State(String, Option<String>),
    /// Matches announcements whose AS-path satisfies this regex; the fallback when no simpler
    /// match suffices (§4.G step 2).
    PathRegex(PathRegex),
    /// Matches locally-originated routes (no inbound announcement).
    NoMatch,
}

/// A per-hop action applied to an outbound announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Tag the announcement with a BGP community string.
    SetCommunity(String),
    /// Set the MED (multi-exit discriminator) attribute.
    SetMed(i32),
    /// Prepend the local AS to the path this many times.
    PrependPath(u8),
}

/// Where an export goes and what it does to the announcement on the way out. `peer = None` means
/// the collapsed wildcard export (§4.G step 4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    /// Target peer location name, or `None` for the wildcard export.
    pub peer: Option<String>,
    /// Actions applied before sending.
    pub actions: Vec<Action>,
}

/// One filter rule: `Deny`, or `Allow` with a `(match, local-pref)` head and an export list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Unconditional reject. Always the last rule in a [`DeviceConfig`]'s filter list.
    Deny,
    /// Accept announcements satisfying `matched`, set `local_pref`, and re-export per `exports`.
    Allow { matched: Match, local_pref: i32, exports: Vec<Export> },
}

/// Per-router configuration for a single prefix/predicate scope.
#[derive(Debug, Clone, Default)]
pub struct DeviceConfig {
    /// Whether this router originates the prefix locally.
    pub originates: bool,
    /// Filter list in significance order: earlier filters override later ones. The terminal
    /// entry is always [`Filter::Deny`].
    pub filters: Vec<Filter>,
}

/// An aggregation/tagging/route-limiting constraint from the policy input (§6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Summarize a finer prefix into a coarser one at the boundary between `in_locs`/`out_locs`.
    Aggregate { prefix: String, in_locs: Vec<String>, out_locs: Vec<String> },
    /// Tag routes crossing the `in_locs`/`out_locs` boundary with a named community.
    Community { name: String, prefix: String, in_locs: Vec<String>, out_locs: Vec<String> },
    /// Cap the number of accepted routes at the `in_locs`/`out_locs` boundary.
    MaxRoutes { n: u32, in_locs: Vec<String>, out_locs: Vec<String> },
}

/// The control block collected from [`Constraint`]s that apply to one router (§6's
/// `RouterConfig.control`).
#[derive(Debug, Clone, Default)]
pub struct RouterControl {
    pub aggregates: Vec<String>,
    pub tags: Vec<String>,
    pub max_routes: Option<u32>,
}

/// One predicate-scoped slice of a router's configuration (§6's `actions: [(predicate,
/// DeviceConfig)]`).
#[derive(Debug, Clone)]
pub struct ScopedConfig {
    /// The BDD predicate this `DeviceConfig` applies to.
    pub predicate: BddIndex,
    pub device: DeviceConfig,
}

/// The compiler's final per-router output (§6).
#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
    pub actions: Vec<ScopedConfig>,
    pub control: RouterControl,
}

impl RouterConfig {
    /// `szRaw`: Σ |in| × |out| across this router's filters, a size metric before any
    /// compaction/collapsing is applied (§4.G).
    pub fn size_raw(&self, in_degree: usize, out_degree: usize) -> usize {
        self.actions.len() * in_degree * out_degree
    }

    /// `szSmart`: Σ |exports| + |filters| across this router's scoped configs, the size metric
    /// after compaction.
    pub fn size_smart(&self) -> usize {
        self.actions
            .iter()
            .map(|sc| sc.device.filters.iter().map(export_count).sum::<usize>() + sc.device.filters.len())
            .sum()
    }
}

fn export_count(f: &Filter) -> usize {
    match f {
        Filter::Deny => 0,
        Filter::Allow { exports, .. } => exports.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_smart_counts_exports_and_filters() {
        let mut rc = RouterConfig::default();
        rc.actions.push(ScopedConfig {
            predicate: crate::bdd::TRUE,
            device: DeviceConfig {
                originates: false,
                filters: vec![
                    Filter::Allow {
                        matched: Match::Peer("X".into()),
                        local_pref: 100,
                        exports: vec![Export { peer: None, actions: vec![] }],
                    },
                    Filter::Deny,
                ],
            },
        });
        assert_eq!(rc.size_smart(), 1 + 2);
    }
}
