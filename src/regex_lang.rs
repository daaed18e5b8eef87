//! Path-regex combinators (§4.A). A [`PathRegex`] describes a language over the topology's
//! location alphabet; [`crate::dfa::make_dfa`] turns one into a deterministic recognizer.

use crate::location::LocId;

/// A regular expression over the location alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRegex {
    /// The empty language.
    Empty,
    /// The language containing only the empty path.
    Epsilon,
    /// A single location symbol.
    Loc(LocId),
    /// Alternation of every inside location (resolved against the topology at DFA-build time).
    Inside,
    /// Alternation of every outside location.
    Outside,
    /// The "stay inside" regex: `Inside*`.
    Internal,
    /// Concatenation of a sequence of sub-expressions.
    Concat(Vec<PathRegex>),
    /// Union (alternation) of a set of sub-expressions.
    Union(Vec<PathRegex>),
    /// Intersection of a set of sub-expressions.
    Inter(Vec<PathRegex>),
    /// Kleene star.
    Star(Box<PathRegex>),
    /// Complement (over the full location alphabet).
    Negate(Box<PathRegex>),
}

impl PathRegex {
    /// `Path([l1..ln])`: exact sequence of locations.
    pub fn path(locs: impl IntoIterator<Item = LocId>) -> Self {
        PathRegex::Concat(locs.into_iter().map(PathRegex::Loc).collect())
    }

    /// `StartsAtAny([...])`: any path beginning at one of the given locations.
    pub fn starts_at_any(locs: impl IntoIterator<Item = LocId>) -> Self {
        let start = PathRegex::Union(locs.into_iter().map(PathRegex::Loc).collect());
        PathRegex::Concat(vec![start, PathRegex::Star(Box::new(PathRegex::anything()))])
    }

    /// `EndsAt(l)`: any path ending at `l`.
    pub fn ends_at(l: LocId) -> Self {
        PathRegex::Concat(vec![
            PathRegex::Star(Box::new(PathRegex::anything())),
            PathRegex::Loc(l),
        ])
    }

    /// `Waypoint(l)`: every path on which `l` appears somewhere.
    pub fn waypoint(l: LocId) -> Self {
        PathRegex::Concat(vec![
            PathRegex::Star(Box::new(PathRegex::anything())),
            PathRegex::Loc(l),
            PathRegex::Star(Box::new(PathRegex::anything())),
        ])
    }

    /// `ValleyFree([[tier...]...])`: the classic inter-domain constraint forbidding
    /// customer-to-provider transit through a peer. `tiers` lists locations from the "highest"
    /// tier (e.g. Tier-1 transit) down to the lowest (stub/customer); a valley-free path may only
    /// descend tiers once it starts ascending is forbidden (no up-down-up).
    ///
    /// We encode this as: a path is valley-free iff it is the concatenation of a (possibly empty)
    /// non-increasing run of tiers followed by a (possibly empty) non-decreasing run, i.e. at
    /// most one local minimum. For `n` tiers this is expressed as the union, over every split
    /// point `k`, of `(tier_0 ∪ .. ∪ tier_k)* · tier_k · (tier_k ∪ .. ∪ tier_{n-1})*`.
    pub fn valley_free(tiers: &[Vec<LocId>]) -> Self {
        if tiers.is_empty() {
            return PathRegex::Epsilon;
        }
        let tier_alt = |locs: &[LocId]| PathRegex::Union(locs.iter().copied().map(PathRegex::Loc).collect());
        let mut branches = Vec::new();
        for k in 0..tiers.len() {
            let down: Vec<LocId> = tiers[..=k].iter().flatten().copied().collect();
            let up: Vec<LocId> = tiers[k..].iter().flatten().copied().collect();
            branches.push(PathRegex::Concat(vec![
                PathRegex::Star(Box::new(tier_alt(&down))),
                tier_alt(&tiers[k]),
                PathRegex::Star(Box::new(tier_alt(&up))),
            ]));
        }
        PathRegex::Union(branches)
    }

    /// Any single symbol: `Inside ∪ Outside`.
    pub fn anything() -> Self {
        PathRegex::Union(vec![PathRegex::Inside, PathRegex::Outside])
    }

    /// Concatenate `self` with `other`.
    pub fn then(self, other: PathRegex) -> Self {
        match self {
            PathRegex::Concat(mut v) => {
                v.push(other);
                PathRegex::Concat(v)
            }
            s => PathRegex::Concat(vec![s, other]),
        }
    }

    /// Reverse the language described by this regex (§4.A contract: `MakeDFA(reverse(r))`).
    /// Reversal distributes over every combinator except that `Concat` must also reverse the
    /// order of its operands.
    pub fn reversed(&self) -> PathRegex {
        match self {
            PathRegex::Empty => PathRegex::Empty,
            PathRegex::Epsilon => PathRegex::Epsilon,
            PathRegex::Loc(l) => PathRegex::Loc(*l),
            PathRegex::Inside => PathRegex::Inside,
            PathRegex::Outside => PathRegex::Outside,
            PathRegex::Internal => PathRegex::Internal,
            PathRegex::Concat(parts) => {
                PathRegex::Concat(parts.iter().rev().map(PathRegex::reversed).collect())
            }
            PathRegex::Union(parts) => {
                PathRegex::Union(parts.iter().map(PathRegex::reversed).collect())
            }
            PathRegex::Inter(parts) => {
                PathRegex::Inter(parts.iter().map(PathRegex::reversed).collect())
            }
            PathRegex::Star(inner) => PathRegex::Star(Box::new(inner.reversed())),
            PathRegex::Negate(inner) => PathRegex::Negate(Box::new(inner.reversed())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::graph::NodeIndex;

    fn l(i: u32) -> LocId {
        NodeIndex::new(i as usize)
    }

    #[test]
    fn reversal_flips_concat_order() {
        let r = PathRegex::path([l(0), l(1), l(2)]);
        let rev = r.reversed();
        assert_eq!(rev, PathRegex::Concat(vec![PathRegex::Loc(l(2)), PathRegex::Loc(l(1)), PathRegex::Loc(l(0))]));
    }

    #[test]
    fn reversal_is_involutive() {
        let r = PathRegex::waypoint(l(3)).then(PathRegex::Loc(l(4)));
        assert_eq!(r.reversed().reversed(), r);
    }
}
