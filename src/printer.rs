//! # Helper (printer) functions for router configurations
//! Formatted strings for diffing and debugging. Not part of the semantic contract (§6): nothing
//! here participates in compilation, only in presenting its result to a human.

use crate::config::{Action, Export, Filter, Match, RouterConfig};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Pretty-print every router's configuration, one router per block, in router-name order.
pub fn print_all(configs: &BTreeMap<String, RouterConfig>) -> String {
    let mut out = String::new();
    for (name, cfg) in configs {
        let _ = writeln!(out, "router {}:", name);
        out.push_str(&router_config(cfg));
    }
    out
}

/// Pretty-print a single router's scoped actions and control block.
pub fn router_config(cfg: &RouterConfig) -> String {
    let mut out = String::new();
    for scoped in &cfg.actions {
        let _ = writeln!(out, "  scope {:?}:", scoped.predicate);
        if scoped.device.originates {
            out.push_str("    originates\n");
        }
        for (i, f) in scoped.device.filters.iter().enumerate() {
            let _ = writeln!(out, "    [{}] {}", i, filter(f));
        }
    }
    if !cfg.control.aggregates.is_empty() {
        let _ = writeln!(out, "  aggregates: {:?}", cfg.control.aggregates);
    }
    if !cfg.control.tags.is_empty() {
        let _ = writeln!(out, "  tags: {:?}", cfg.control.tags);
    }
    if let Some(n) = cfg.control.max_routes {
        let _ = writeln!(out, "  max-routes: {}", n);
    }
    out
}

/// Formatted string for a single filter rule.
pub fn filter(f: &Filter) -> String {
    match f {
        Filter::Deny => "deny".to_string(),
        Filter::Allow { matched, local_pref, exports } => format!(
            "allow {} -> local-pref {} -> [{}]",
            matcher(matched),
            local_pref,
            exports.iter().map(export).collect::<Vec<_>>().join(", ")
        ),
    }
}

fn matcher(m: &Match) -> String {
    match m {
        Match::Peer(p) => format!("peer({})", p),
        Match::State(c, None) => format!("state({}, *)", c),
        Match::State(c, Some(l)) => format!("state({}, {})", c, l),
        Match::PathRegex(re) => format!("path({:?})", re),
        Match::NoMatch => "origin".to_string(),
    }
}

fn export(e: &Export) -> String {
    let target = e.peer.as_deref().unwrap_or("*");
    if e.actions.is_empty() {
        target.to_string()
    } else {
        format!("{}[{}]", target, e.actions.iter().map(action).collect::<Vec<_>>().join(", "))
    }
}

fn action(a: &Action) -> String {
    match a {
        Action::SetCommunity(c) => format!("set-community({})", c),
        Action::SetMed(m) => format!("set-med({})", m),
        Action::PrependPath(n) => format!("prepend({})", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScopedConfig;

    #[test]
    fn prints_deny_terminated_filter_list() {
        let mut cfg = RouterConfig::default();
        cfg.actions.push(ScopedConfig {
            predicate: crate::bdd::TRUE,
            device: crate::config::DeviceConfig { originates: true, filters: vec![Filter::Deny] },
        });
        let s = router_config(&cfg);
        assert!(s.contains("originates"));
        assert!(s.contains("deny"));
    }
}
