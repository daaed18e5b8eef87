//! Hash-consed Binary Decision Diagram predicate engine (§4.B). Predicates over prefix
//! bits/community tags are represented as BDDs with a signed-index negation encoding: negating a
//! node is `O(1)` (flip the sign), and every other operator is built on a single memoized `and`.

use log::trace;
use std::collections::HashMap;
use thiserror::Error;

/// Index into the node table. Positive values name a node directly; the sign is flipped to mean
/// "complement of this node". `TRUE`/`FALSE` are the two terminal constants.
pub type BddIndex = i32;

/// The constant-true terminal.
pub const TRUE: BddIndex = 1;
/// The constant-false terminal.
pub const FALSE: BddIndex = -1;

/// Errors raised by the predicate engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BddError {
    /// A variable index was referenced that the engine was never told about (out of range of the
    /// registered variable order).
    #[error("unknown bdd variable {0}")]
    UnknownVariable(u32),
    /// Decoding a BDD path back into a concrete prefix/community range failed because the path was
    /// not a total assignment recognized by the encoding (§4.B's range decoder).
    #[error("bdd path does not decode to a well-formed range: {0}")]
    MalformedRange(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Node {
    var: u32,
    low: BddIndex,
    high: BddIndex,
}

/// A hash-consed BDD manager: owns the shared node table every [`BddIndex`] handed out refers
/// into. Variables are numbered `0..num_vars`, ordered from root to leaf.
#[derive(Debug)]
pub struct BddManager {
    nodes: Vec<Node>,
    unique: HashMap<Node, BddIndex>,
    and_cache: HashMap<(BddIndex, BddIndex), BddIndex>,
    num_vars: u32,
}

impl BddManager {
    /// Create a manager for `num_vars` boolean variables.
    pub fn new(num_vars: u32) -> Self {
        Self { nodes: vec![Node { var: 0, low: 0, high: 0 }, Node { var: 0, low: 0, high: 0 }], unique: HashMap::new(), and_cache: HashMap::new(), num_vars }
    }

    /// Number of variables this manager was built for.
    pub fn num_vars(&self) -> u32 {
        self.num_vars
    }

    fn check_var(&self, var: u32) -> Result<(), BddError> {
        if var >= self.num_vars {
            Err(BddError::UnknownVariable(var))
        } else {
            Ok(())
        }
    }

    /// `O(1)` negation: flip the sign.
    pub fn not(&self, a: BddIndex) -> BddIndex {
        -a
    }

    /// The single node for variable `var`, true iff the variable is set.
    pub fn var(&mut self, var: u32) -> Result<BddIndex, BddError> {
        self.check_var(var)?;
        Ok(self.mk(var, FALSE, TRUE))
    }

    /// Intern a node, canonicalizing `low == high` away and normalizing sign so the table only
    /// ever stores one orientation per distinct node.
    fn mk(&mut self, var: u32, low: BddIndex, high: BddIndex) -> BddIndex {
        if low == high {
            return low;
        }
        // Canonical orientation: the `high` edge of a stored node is never complemented. If it
        // would be, store the complemented node instead and flip the sign of the handle we return.
        if high < 0 {
            let idx = self.mk(var, -low, -high);
            return -idx;
        }
        let key = Node { var, low, high };
        if let Some(&idx) = self.unique.get(&key) {
            return idx;
        }
        self.nodes.push(key);
        let idx = (self.nodes.len() - 1) as BddIndex;
        self.unique.insert(key, idx);
        idx
    }

    fn node_of(&self, a: BddIndex) -> Option<(Node, bool)> {
        if a == TRUE || a == FALSE {
            None
        } else {
            let complemented = a < 0;
            let raw = a.unsigned_abs() as usize;
            Some((self.nodes[raw], complemented))
        }
    }

    fn top_var(&self, a: BddIndex) -> Option<u32> {
        self.node_of(a).map(|(n, _)| n.var)
    }

    fn cofactor(&self, a: BddIndex, var: u32, branch: bool) -> BddIndex {
        match self.node_of(a) {
            None => a,
            Some((n, complemented)) => {
                if n.var != var {
                    a
                } else {
                    let raw = if branch { n.high } else { n.low };
                    if complemented {
                        -raw
                    } else {
                        raw
                    }
                }
            }
        }
    }

    /// Memoized conjunction.
    pub fn and(&mut self, a: BddIndex, b: BddIndex) -> BddIndex {
        if a == FALSE || b == FALSE {
            return FALSE;
        }
        if a == TRUE {
            return b;
        }
        if b == TRUE {
            return a;
        }
        if a == b {
            return a;
        }
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        if let Some(&cached) = self.and_cache.get(&(a, b)) {
            return cached;
        }
        let va = self.top_var(a);
        let vb = self.top_var(b);
        let var = va.min(vb).unwrap();
        let a_lo = self.cofactor(a, var, false);
        let a_hi = self.cofactor(a, var, true);
        let b_lo = self.cofactor(b, var, false);
        let b_hi = self.cofactor(b, var, true);
        let lo = self.and(a_lo, b_lo);
        let hi = self.and(a_hi, b_hi);
        let result = self.mk(var, lo, hi);
        self.and_cache.insert((a, b), result);
        result
    }

    /// Disjunction, derived from `and`/`not` via De Morgan: `a ∨ b = ¬(¬a ∧ ¬b)`.
    pub fn or(&mut self, a: BddIndex, b: BddIndex) -> BddIndex {
        self.not(self.and(self.not(a), self.not(b)))
    }

    /// `a ⟹ b`, derived as `¬(a ∧ ¬b)`.
    pub fn implies(&mut self, a: BddIndex, b: BddIndex) -> BddIndex {
        let nb = self.not(b);
        self.not(self.and(a, nb))
    }

    /// Whether `a` implies `b` (i.e. `a ⟹ b` is the tautology `TRUE`). Used for checking subset
    /// relations between two predicates.
    pub fn implies_taut(&mut self, a: BddIndex, b: BddIndex) -> bool {
        self.implies(a, b) == TRUE
    }

    /// `a` is unsatisfiable.
    pub fn is_false(&self, a: BddIndex) -> bool {
        a == FALSE
    }

    /// `a` is the tautology.
    pub fn is_true(&self, a: BddIndex) -> bool {
        a == TRUE
    }

    /// Enumerate every satisfying path as a vector of `(var, value)` pairs covering every
    /// variable the path constrains (don't-care variables are simply absent). Used by
    /// [`Self::to_prefixes`] and by rule compaction (§8, BDD testable properties 1-3).
    pub fn iter_paths(&self, a: BddIndex) -> Vec<Vec<(u32, bool)>> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.iter_paths_rec(a, &mut path, &mut out);
        out
    }

    fn iter_paths_rec(&self, a: BddIndex, path: &mut Vec<(u32, bool)>, out: &mut Vec<Vec<(u32, bool)>>) {
        if a == FALSE {
            return;
        }
        if a == TRUE {
            out.push(path.clone());
            return;
        }
        let (n, complemented) = self.node_of(a).unwrap();
        let (lo, hi) = if complemented { (-n.low, -n.high) } else { (n.low, n.high) };
        path.push((n.var, false));
        self.iter_paths_rec(lo, path, out);
        path.pop();
        path.push((n.var, true));
        self.iter_paths_rec(hi, path, out);
        path.pop();
    }

    /// Build the predicate of the CIDR-style range `[lo, hi]` over the first `bits` boolean
    /// variables (most-significant bit first, variable `0`), i.e. the standard binary
    /// trie-interval encoding: the union of the maximal aligned binary blocks covering `[lo,hi]`.
    pub fn range_predicate(&mut self, lo: u32, hi: u32, bits: u32) -> Result<BddIndex, BddError> {
        if bits == 0 || bits > self.num_vars {
            return Err(BddError::UnknownVariable(bits));
        }
        if lo > hi {
            return Ok(FALSE);
        }
        let mut acc = FALSE;
        for (block_lo, block_len) in split_into_aligned_blocks(lo as u64, hi as u64, bits) {
            let pred = self.aligned_block_predicate(block_lo, block_len, bits)?;
            acc = self.or(acc, pred);
        }
        Ok(acc)
    }

    /// Predicate for an aligned block: the top `prefix_len` bits are fixed, the remaining
    /// `bits - prefix_len` are don't-care.
    fn aligned_block_predicate(&mut self, value: u64, prefix_len: u32, bits: u32) -> Result<BddIndex, BddError> {
        let mut acc = TRUE;
        for i in 0..prefix_len {
            let bit = ((value >> (bits - 1 - i)) & 1) != 0;
            let v = self.var(i)?;
            let lit = if bit { v } else { self.not(v) };
            acc = self.and(acc, lit);
        }
        Ok(acc)
    }

    /// The inverse of [`Self::range_predicate`]: decode a predicate back into the disjoint set of
    /// `[lo, hi]` ranges it accepts, sorted and non-overlapping (§8 property: compaction produces
    /// a disjoint, total partition over the address space it covers).
    pub fn to_prefixes(&self, a: BddIndex, bits: u32) -> Result<Vec<(u32, u32)>, BddError> {
        let mut ranges = Vec::new();
        for path in self.iter_paths(a) {
            let mut lo = 0u64;
            let mut hi = 0u64;
            let mut fixed = vec![false; bits as usize];
            for &(var, val) in &path {
                if var >= bits {
                    return Err(BddError::MalformedRange(format!(
                        "path constrains variable {} outside of {} declared bits",
                        var, bits
                    )));
                }
                fixed[var as usize] = true;
                let shift = bits - 1 - var;
                if val {
                    lo |= 1 << shift;
                    hi |= 1 << shift;
                }
            }
            for (i, &f) in fixed.iter().enumerate() {
                if !f {
                    let shift = bits - 1 - i as u32;
                    hi |= 1 << shift;
                }
            }
            ranges.push((lo as u32, hi as u32));
        }
        ranges.sort_unstable();
        Ok(compact_adjacent(ranges))
    }

    /// Rewrite a set of predicates into the smallest number of disjoint, order-independent
    /// predicates whose union equals the union of the inputs, while preserving which original
    /// predicate(s) cover which region, mirroring §4.G's filter-compaction step: predicates
    /// `ps[0..i]` take priority over `ps[i+1..]`, so compaction here means carving out from each
    /// predicate the part not already claimed by a higher-priority one.
    pub fn compact_priority(&mut self, ps: &[BddIndex]) -> Vec<BddIndex> {
        let mut claimed = FALSE;
        let mut out = Vec::with_capacity(ps.len());
        for &p in ps {
            let not_claimed = self.not(claimed);
            let region = self.and(p, not_claimed);
            out.push(region);
            claimed = self.or(claimed, p);
        }
        out
    }
}

/// Decompose `[lo, hi]` into maximal power-of-two aligned blocks, returning each as
/// `(value, prefix_len)` where `prefix_len` bits of `value` (MSB-first, out of `bits` total) are
/// fixed and the rest are don't-care. Standard greedy CIDR-range splitting.
fn split_into_aligned_blocks(lo: u64, hi: u64, bits: u32) -> Vec<(u64, u32)> {
    let mut out = Vec::new();
    let mut cur = lo;
    while cur <= hi {
        let max_size_by_alignment = if cur == 0 { bits } else { cur.trailing_zeros().min(bits) };
        let mut size = max_size_by_alignment;
        while size > 0 && cur + (1u64 << size) - 1 > hi {
            size -= 1;
        }
        let prefix_len = bits - size;
        out.push((cur, prefix_len));
        let block_len = 1u64 << size;
        if cur + block_len > hi {
            break;
        }
        cur += block_len;
    }
    out
}

fn compact_adjacent(ranges: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
    let mut out: Vec<(u32, u32)> = Vec::new();
    for (lo, hi) in ranges {
        if let Some(last) = out.last_mut() {
            if lo <= last.1.saturating_add(1) {
                last.1 = last.1.max(hi);
                continue;
            }
        }
        out.push((lo, hi));
    }
    trace!("compacted into {} disjoint ranges", out.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_or_not_are_consistent() {
        let mut m = BddManager::new(2);
        let a = m.var(0).unwrap();
        let b = m.var(1).unwrap();
        let and_ab = m.and(a, b);
        let or_ab = m.or(a, b);
        assert!(m.implies_taut(and_ab, or_ab));
        assert!(!m.implies_taut(or_ab, and_ab));
    }

    #[test]
    fn negation_is_involutive() {
        let mut m = BddManager::new(1);
        let a = m.var(0).unwrap();
        assert_eq!(m.not(m.not(a)), a);
    }

    #[test]
    fn implies_self_is_true() {
        let mut m = BddManager::new(3);
        let a = m.var(0).unwrap();
        let b = m.var(1).unwrap();
        let p = m.and(a, b);
        assert!(m.implies_taut(p, p));
    }

    #[test]
    fn range_predicate_round_trips() {
        let mut m = BddManager::new(8);
        let p = m.range_predicate(10, 19, 8).unwrap();
        let back = m.to_prefixes(p, 8).unwrap();
        let covered: u64 = back.iter().map(|&(lo, hi)| (hi - lo + 1) as u64).sum();
        assert_eq!(covered, 10);
        for &(lo, hi) in &back {
            assert!(lo >= 10 && hi <= 19);
        }
    }

    #[test]
    fn priority_compaction_is_disjoint_and_covers_union() {
        let mut m = BddManager::new(8);
        let a = m.range_predicate(0, 127, 8).unwrap();
        let b = m.range_predicate(64, 255, 8).unwrap();
        let compacted = m.compact_priority(&[a, b]);
        let inter = m.and(compacted[0], compacted[1]);
        assert!(m.is_false(inter));
        let union_before = m.or(a, b);
        let union_after = m.or(compacted[0], compacted[1]);
        assert_eq!(union_before, union_after);
    }

    #[test]
    fn unknown_variable_is_rejected() {
        let mut m = BddManager::new(2);
        assert_eq!(m.var(5), Err(BddError::UnknownVariable(5)));
    }
}
