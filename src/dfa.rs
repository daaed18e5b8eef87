//! Regex-to-DFA front end (§4.A). Builds deterministic recognizers over the topology's location
//! alphabet. [`make_dfa`] reverses the regex before determinizing, per the component's contract,
//! so that walking the DFA in the direction BGP announcements propagate accepts exactly the
//! data-plane paths the regex describes.

use crate::location::{LocId, Topology};
use crate::regex_lang::PathRegex;
use log::{debug, trace};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Index of a DFA state. State `0` is always the dead/sink state once a DFA is built.
pub type DfaStateId = usize;

/// Errors raised while building a DFA.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DfaError {
    /// A regex referenced a location that does not exist in the topology's alphabet.
    #[error("regex references unknown location id {0:?}")]
    UnknownLocation(LocId),
}

/// A deterministic, total recognizer over the location alphabet.
#[derive(Debug, Clone)]
pub struct Dfa {
    start: DfaStateId,
    accepting: Vec<bool>,
    /// `trans[state][symbol position in `alphabet`] = next state`.
    trans: Vec<Vec<DfaStateId>>,
    alphabet: Vec<LocId>,
    sym_index: HashMap<LocId, usize>,
}

impl Dfa {
    /// Index of the canonical dead/sink state (never accepting, every transition loops to it).
    pub fn dead_state(&self) -> DfaStateId {
        0
    }

    /// Start state.
    pub fn start(&self) -> DfaStateId {
        self.start
    }

    /// Whether `state` is accepting.
    pub fn is_accepting(&self, state: DfaStateId) -> bool {
        self.accepting[state]
    }

    /// Total transition function: the next state after reading symbol `sym` from `state`.
    /// Symbols outside the alphabet this DFA was built over transition to the dead state.
    pub fn step(&self, state: DfaStateId, sym: LocId) -> DfaStateId {
        match self.sym_index.get(&sym) {
            Some(&i) => self.trans[state][i],
            None => self.dead_state(),
        }
    }

    /// Number of states, including the dead state.
    pub fn num_states(&self) -> usize {
        self.trans.len()
    }

    /// The alphabet this DFA was built over.
    pub fn alphabet(&self) -> &[LocId] {
        &self.alphabet
    }

    /// Whether this DFA accepts the empty language (no reachable accepting state).
    pub fn is_empty_language(&self) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![self.start];
        seen.insert(self.start);
        while let Some(s) = stack.pop() {
            if self.accepting[s] {
                return false;
            }
            for &t in &self.trans[s] {
                if seen.insert(t) {
                    stack.push(t);
                }
            }
        }
        true
    }

    /// Complement: a DFA accepting exactly the complement language. Valid because `self` is
    /// total.
    pub fn complement(&self) -> Dfa {
        Dfa { accepting: self.accepting.iter().map(|b| !b).collect(), ..self.clone() }
    }

    /// Product of `self` and `other` over the same alphabet, combining acceptance with `combine`.
    /// Used to implement intersection (`combine = a && b`) for [`PathRegex::Inter`].
    fn product(a: &Dfa, b: &Dfa, combine: impl Fn(bool, bool) -> bool) -> Dfa {
        debug_assert_eq!(a.alphabet, b.alphabet);
        let mut states: Vec<(DfaStateId, DfaStateId)> = Vec::new();
        let mut index: HashMap<(DfaStateId, DfaStateId), DfaStateId> = HashMap::new();
        let mut push = |s: (DfaStateId, DfaStateId),
                        states: &mut Vec<(DfaStateId, DfaStateId)>,
                        index: &mut HashMap<(DfaStateId, DfaStateId), DfaStateId>| {
            *index.entry(s).or_insert_with(|| {
                states.push(s);
                states.len() - 1
            })
        };
        push((a.dead_state(), b.dead_state()), &mut states, &mut index);
        push((a.start, b.start), &mut states, &mut index);
        let mut i = 0;
        while i < states.len() {
            let (sa, sb) = states[i];
            for &sym in &a.alphabet {
                let ta = a.step(sa, sym);
                let tb = b.step(sb, sym);
                push((ta, tb), &mut states, &mut index);
            }
            i += 1;
        }
        let mut trans = vec![Vec::with_capacity(a.alphabet.len()); states.len()];
        let mut accepting = vec![false; states.len()];
        for (idx, &(sa, sb)) in states.iter().enumerate() {
            accepting[idx] = combine(a.is_accepting(sa), b.is_accepting(sb));
            for &sym in &a.alphabet {
                let ta = a.step(sa, sym);
                let tb = b.step(sb, sym);
                trans[idx].push(index[&(ta, tb)]);
            }
        }
        Dfa {
            start: index[&(a.start, b.start)],
            accepting,
            trans,
            alphabet: a.alphabet.clone(),
            sym_index: a.sym_index.clone(),
        }
    }
}

/// Builds an NFA with epsilon transitions while walking the [`PathRegex`] AST, then determinizes
/// it via subset construction. `Inter`/`Negate` are handled by recursively compiling their
/// operand(s) to DFAs and combining those DFAs directly (product / complement), since a clean
/// NFA-level construction does not exist for intersection.
struct NfaBuilder<'t> {
    topo: &'t Topology,
    alphabet: Vec<LocId>,
    eps: Vec<Vec<usize>>,
    sym: Vec<Vec<(LocId, usize)>>,
}

#[derive(Clone, Copy)]
struct Frag {
    start: usize,
    accept: usize,
}

impl<'t> NfaBuilder<'t> {
    fn new(topo: &'t Topology, alphabet: Vec<LocId>) -> Self {
        Self { topo, alphabet, eps: Vec::new(), sym: Vec::new() }
    }

    fn new_state(&mut self) -> usize {
        self.eps.push(Vec::new());
        self.sym.push(Vec::new());
        self.eps.len() - 1
    }

    fn add_eps(&mut self, a: usize, b: usize) {
        self.eps[a].push(b);
    }

    fn add_sym(&mut self, a: usize, sym: LocId, b: usize) {
        self.sym[a].push((sym, b));
    }

    /// Embed an already-built DFA as a fragment of this NFA (used for nested `Inter`/`Negate`).
    fn embed_dfa(&mut self, dfa: &Dfa) -> Frag {
        let base = self.eps.len();
        for _ in 0..dfa.num_states() {
            self.new_state();
        }
        let accept = self.new_state();
        for s in 0..dfa.num_states() {
            if dfa.is_accepting(s) {
                self.add_eps(base + s, accept);
            }
            for &sym in &dfa.alphabet {
                let t = dfa.step(s, sym);
                self.add_sym(base + s, sym, base + t);
            }
        }
        Frag { start: base + dfa.start, accept }
    }

    fn build(&mut self, re: &PathRegex) -> Result<Frag, DfaError> {
        match re {
            PathRegex::Empty => {
                let s0 = self.new_state();
                let s1 = self.new_state();
                Ok(Frag { start: s0, accept: s1 })
            }
            PathRegex::Epsilon => {
                let s0 = self.new_state();
                Ok(Frag { start: s0, accept: s0 })
            }
            PathRegex::Loc(l) => {
                if !self.alphabet.contains(l) {
                    return Err(DfaError::UnknownLocation(*l));
                }
                let s0 = self.new_state();
                let s1 = self.new_state();
                self.add_sym(s0, *l, s1);
                Ok(Frag { start: s0, accept: s1 })
            }
            PathRegex::Inside => self.build_alternation(|t, l| t.location(l).is_inside()),
            PathRegex::Outside => self.build_alternation(|t, l| t.location(l).is_outside()),
            PathRegex::Internal => self.build(&PathRegex::Star(Box::new(PathRegex::Inside))),
            PathRegex::Concat(parts) => {
                if parts.is_empty() {
                    return self.build(&PathRegex::Epsilon);
                }
                let mut frags = Vec::with_capacity(parts.len());
                for p in parts {
                    frags.push(self.build(p)?);
                }
                for w in frags.windows(2) {
                    self.add_eps(w[0].accept, w[1].start);
                }
                Ok(Frag { start: frags[0].start, accept: frags.last().unwrap().accept })
            }
            PathRegex::Union(parts) => {
                if parts.is_empty() {
                    return self.build(&PathRegex::Empty);
                }
                let s0 = self.new_state();
                let s1 = self.new_state();
                for p in parts {
                    let f = self.build(p)?;
                    self.add_eps(s0, f.start);
                    self.add_eps(f.accept, s1);
                }
                Ok(Frag { start: s0, accept: s1 })
            }
            PathRegex::Star(inner) => {
                let f = self.build(inner)?;
                let s0 = self.new_state();
                let s1 = self.new_state();
                self.add_eps(s0, f.start);
                self.add_eps(f.accept, s1);
                self.add_eps(f.accept, f.start);
                self.add_eps(s0, s1);
                Ok(Frag { start: s0, accept: s1 })
            }
            PathRegex::Inter(parts) => {
                let dfa = compile_inter(self.topo, &self.alphabet, parts)?;
                Ok(self.embed_dfa(&dfa))
            }
            PathRegex::Negate(inner) => {
                let dfa = compile_regex(self.topo, &self.alphabet, inner)?.complement();
                Ok(self.embed_dfa(&dfa))
            }
        }
    }

    fn build_alternation(
        &mut self,
        keep: impl Fn(&Topology, LocId) -> bool,
    ) -> Result<Frag, DfaError> {
        let s0 = self.new_state();
        let s1 = self.new_state();
        for &l in &self.alphabet.clone() {
            if keep(self.topo, l) {
                self.add_sym(s0, l, s1);
            }
        }
        Ok(Frag { start: s0, accept: s1 })
    }

    fn eps_closure(&self, states: &HashSet<usize>) -> HashSet<usize> {
        let mut out = states.clone();
        let mut stack: Vec<usize> = states.iter().copied().collect();
        while let Some(s) = stack.pop() {
            for &t in &self.eps[s] {
                if out.insert(t) {
                    stack.push(t);
                }
            }
        }
        out
    }

    fn determinize(self, start: usize, accept: usize) -> Dfa {
        let alphabet = self.alphabet.clone();
        let start_set = self.eps_closure(&HashSet::from([start]));
        let mut subsets: Vec<HashSet<usize>> = vec![HashSet::new(), start_set.clone()];
        let mut index: HashMap<Vec<usize>, DfaStateId> = HashMap::new();
        let key = |s: &HashSet<usize>| {
            let mut v: Vec<usize> = s.iter().copied().collect();
            v.sort_unstable();
            v
        };
        index.insert(Vec::new(), 0);
        index.insert(key(&start_set), 1);
        let mut i = 0;
        while i < subsets.len() {
            let cur = subsets[i].clone();
            for &sym in &alphabet {
                let mut next = HashSet::new();
                for &s in &cur {
                    for &(l, t) in &self.sym[s] {
                        if l == sym {
                            next.insert(t);
                        }
                    }
                }
                let next = self.eps_closure(&next);
                let k = key(&next);
                index.entry(k.clone()).or_insert_with(|| {
                    subsets.push(next.clone());
                    subsets.len() - 1
                });
            }
            i += 1;
        }
        let mut trans = vec![vec![0usize; alphabet.len()]; subsets.len()];
        let mut accepting = vec![false; subsets.len()];
        for (idx, subset) in subsets.iter().enumerate() {
            accepting[idx] = subset.contains(&accept);
            for (si, &sym) in alphabet.iter().enumerate() {
                let mut next = HashSet::new();
                for &s in subset {
                    for &(l, t) in &self.sym[s] {
                        if l == sym {
                            next.insert(t);
                        }
                    }
                }
                let next = self.eps_closure(&next);
                trans[idx][si] = index[&key(&next)];
            }
        }
        let sym_index = alphabet.iter().enumerate().map(|(i, &l)| (l, i)).collect();
        trace!("determinized NFA with {} nfa states into {} dfa states", self.eps.len(), subsets.len());
        Dfa { start: index[&key(&start_set)], accepting, trans, alphabet, sym_index }
    }
}

/// Compile a single [`PathRegex`] (not yet reversed) into a DFA over the topology's full
/// alphabet.
pub fn compile_regex(topo: &Topology, alphabet: &[LocId], re: &PathRegex) -> Result<Dfa, DfaError> {
    // `Inter`/`Negate` at top level skip the NFA builder entirely: no NFA-level construction for
    // intersection exists, so we go straight to compiling the operands and combining the DFAs.
    match re {
        PathRegex::Inter(parts) => return compile_inter(topo, alphabet, parts),
        PathRegex::Negate(inner) => return Ok(compile_regex(topo, alphabet, inner)?.complement()),
        _ => {}
    }
    let mut builder = NfaBuilder::new(topo, alphabet.to_vec());
    let frag = builder.build(re)?;
    Ok(builder.determinize(frag.start, frag.accept))
}

fn compile_inter(topo: &Topology, alphabet: &[LocId], parts: &[PathRegex]) -> Result<Dfa, DfaError> {
    if parts.is_empty() {
        return compile_regex(topo, alphabet, &PathRegex::Star(Box::new(PathRegex::anything())));
    }
    let mut acc = compile_regex(topo, alphabet, &parts[0])?;
    for p in &parts[1..] {
        let d = compile_regex(topo, alphabet, p)?;
        acc = Dfa::product(&acc, &d, |a, b| a && b);
    }
    Ok(acc)
}

/// Build a DFA recognizing the *reversal* of `re`'s language over `topo`'s full location
/// alphabet — the contract of §4.A: `MakeDFA(reverse(r))`.
pub fn make_dfa(topo: &Topology, re: &PathRegex) -> Result<Dfa, DfaError> {
    let alphabet: Vec<LocId> = topo.locations().collect();
    let reversed = re.reversed();
    let dfa = compile_regex(topo, &alphabet, &reversed)?;
    debug!(
        "built dfa with {} states ({} symbols) for reversed regex",
        dfa.num_states(),
        alphabet.len()
    );
    Ok(dfa)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::TopologyBuilder;

    fn small_topo() -> (Topology, LocId, LocId, LocId) {
        let mut b = TopologyBuilder::new();
        let a = b.add_inside("A", false).unwrap();
        let x = b.add_inside("X", false).unwrap();
        let y = b.add_inside("Y", true).unwrap();
        b.add_session(a, x);
        b.add_session(x, y);
        (b.build().unwrap(), a, x, y)
    }

    #[test]
    fn path_regex_accepts_exact_path_reversed() {
        let (topo, a, x, y) = small_topo();
        let re = PathRegex::path([a, x, y]);
        let dfa = make_dfa(&topo, &re).unwrap();
        // walking in BGP-announce order (origin first): y, x, a
        let s = dfa.start();
        let s = dfa.step(s, y);
        let s = dfa.step(s, x);
        let s = dfa.step(s, a);
        assert!(dfa.is_accepting(s));
    }

    #[test]
    fn unrelated_path_is_rejected() {
        let (topo, a, x, y) = small_topo();
        let re = PathRegex::path([a, x, y]);
        let dfa = make_dfa(&topo, &re).unwrap();
        let s = dfa.start();
        let s = dfa.step(s, x); // wrong first announce hop
        assert!(!dfa.is_accepting(s));
    }

    #[test]
    fn negate_complements_language() {
        let (topo, a, x, _y) = small_topo();
        let re = PathRegex::Negate(Box::new(PathRegex::Loc(a)));
        let dfa = make_dfa(&topo, &re).unwrap();
        let accept_a = dfa.is_accepting(dfa.step(dfa.start(), a));
        let accept_x = dfa.is_accepting(dfa.step(dfa.start(), x));
        assert!(!accept_a);
        assert!(accept_x);
    }

    #[test]
    fn empty_regex_has_empty_language() {
        let (topo, _a, _x, _y) = small_topo();
        let dfa = make_dfa(&topo, &PathRegex::Empty).unwrap();
        assert!(dfa.is_empty_language());
    }

    #[test]
    fn unknown_location_is_rejected() {
        let (topo, _a, _x, _y) = small_topo();
        let bogus = petgraph::graph::NodeIndex::new(999);
        assert_eq!(make_dfa(&topo, &PathRegex::Loc(bogus)), Err(DfaError::UnknownLocation(bogus)));
    }
}
