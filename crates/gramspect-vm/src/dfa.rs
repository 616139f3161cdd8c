//! Per-decision DFA cache for the prediction engine.

use std::collections::HashMap;

use gramspect_atn::{DecisionId, StateId};

pub type DfaStateId = u32;

/// One rule-invocation frame of a configuration's call stack: where to
/// continue after the callee's stop state, and the precedence to restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CtxFrame {
    pub follow: StateId,
    pub prec: u32,
}

/// One ATN configuration: position, predicted alternative, call stack,
/// and the precedence governing guards in the current frame. `depth`
/// tracks frames entered (+) or left (-) relative to where prediction
/// started; negative depth means the configuration escaped into the
/// caller's territory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Config {
    pub state: StateId,
    pub alt: u32,
    pub ctx: Vec<CtxFrame>,
    pub prec: u32,
    pub depth: i32,
}

impl Config {
    pub fn seed(state: StateId, alt: u32, ctx: Vec<CtxFrame>, prec: u32) -> Self {
        Self {
            state,
            alt,
            ctx,
            prec,
            depth: 0,
        }
    }

    /// Same stack and frame, different state.
    pub fn at(&self, state: StateId) -> Self {
        Self {
            state,
            alt: self.alt,
            ctx: self.ctx.clone(),
            prec: self.prec,
            depth: self.depth,
        }
    }
}

/// Sorted, deduplicated set of configurations. Equality over the sorted
/// vector makes the set usable as a DFA-state key, which also keeps DFA
/// state numbering deterministic across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ConfigSet {
    configs: Vec<Config>,
}

impl ConfigSet {
    pub fn from_vec(mut configs: Vec<Config>) -> Self {
        configs.sort();
        configs.dedup();
        Self { configs }
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Config> {
        self.configs.iter()
    }

    /// Surviving alternatives, ascending, unique.
    pub fn alts(&self) -> Vec<u32> {
        let mut alts: Vec<u32> = self.configs.iter().map(|c| c.alt).collect();
        alts.sort_unstable();
        alts.dedup();
        alts
    }
}

/// One DFA state: its configuration set, outgoing edges by symbol, and
/// the accept alternative once prediction is decided here.
#[derive(Debug, Clone)]
pub struct DfaState {
    pub id: DfaStateId,
    pub configs: ConfigSet,
    pub edges: HashMap<i32, DfaStateId>,
    pub accept: Option<u32>,
    /// SLL conflicted here; full-context prediction is required.
    pub requires_full_context: bool,
}

/// Mutable per-decision DFA, grown on demand during SLL prediction.
#[derive(Debug, Default)]
pub struct Dfa {
    pub decision: DecisionId,
    states: Vec<DfaState>,
    index: HashMap<ConfigSet, DfaStateId>,
    pub start: Option<DfaStateId>,
}

impl Dfa {
    pub fn new(decision: DecisionId) -> Self {
        Self {
            decision,
            states: Vec::new(),
            index: HashMap::new(),
            start: None,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self, id: DfaStateId) -> &DfaState {
        &self.states[id as usize]
    }

    pub fn state_mut(&mut self, id: DfaStateId) -> &mut DfaState {
        &mut self.states[id as usize]
    }

    /// Interns a configuration set, returning its state id and whether it
    /// was newly created.
    pub fn intern(&mut self, configs: ConfigSet) -> (DfaStateId, bool) {
        if let Some(&id) = self.index.get(&configs) {
            return (id, false);
        }
        let id = self.states.len() as DfaStateId;
        self.index.insert(configs.clone(), id);
        self.states.push(DfaState {
            id,
            configs,
            edges: HashMap::new(),
            accept: None,
            requires_full_context: false,
        });
        (id, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_set_sorts_and_dedupes() {
        let set = ConfigSet::from_vec(vec![
            Config::seed(5, 2, vec![], 0),
            Config::seed(1, 1, vec![CtxFrame { follow: 7, prec: 0 }], 0),
            Config::seed(5, 2, vec![], 0),
        ]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.alts(), vec![1, 2]);
    }

    #[test]
    fn intern_reuses_equal_sets() {
        let mut dfa = Dfa::new(0);
        let a = ConfigSet::from_vec(vec![Config::seed(1, 1, vec![], 0)]);
        let b = ConfigSet::from_vec(vec![Config::seed(1, 1, vec![], 0)]);
        let (id_a, new_a) = dfa.intern(a);
        let (id_b, new_b) = dfa.intern(b);
        assert_eq!(id_a, id_b);
        assert!(new_a);
        assert!(!new_b);
        assert_eq!(dfa.len(), 1);
    }
}
