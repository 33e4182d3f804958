//! Parse tables for the ca65 assembler dialect.
//!
//! The grammar is written in Rust with [`GrammarBuilder`] and compiled into
//! LALR(1) tables at load time. Conflicts that static precedence cannot settle
//! stay in the table as ordered action lists; the GLR driver explores all of
//! them and picks a winner by dynamic precedence.

mod builder;
mod ca65;
mod error;
mod lalr;

use std::fmt;

pub use builder::{GrammarBuilder, RuleBuilder};
pub use ca65::build;
use ca65_syntax::{SyntaxKind, SyntaxSet};
pub use error::GrammarError;

pub type StateId = u32;
pub type RuleId = u32;

/// Index of a nonterminal in its grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonterminalId(u32);

impl NonterminalId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Terminal(SyntaxKind),
    Nonterminal(NonterminalId),
}

impl From<SyntaxKind> for Symbol {
    #[inline]
    fn from(kind: SyntaxKind) -> Self {
        Self::Terminal(kind)
    }
}

impl From<NonterminalId> for Symbol {
    #[inline]
    fn from(id: NonterminalId) -> Self {
        Self::Nonterminal(id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
    NonAssoc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Shift(StateId),
    Reduce(RuleId),
    Accept,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub lhs: NonterminalId,
    pub rhs: Box<[Symbol]>,
    /// Node kind built on reduction; `None` splices the children into the
    /// parent.
    pub kind: Option<SyntaxKind>,
    /// Static precedence level, from an explicit annotation or the last
    /// terminal of `rhs` that has one.
    pub precedence: Option<u8>,
    /// Added to a stack's score when the rule is reduced.
    pub dynamic: i32,
}

#[derive(Clone, Copy, Debug, Default)]
struct ActionSlot {
    start: u32,
    len: u32,
}

const NO_STATE: StateId = StateId::MAX;

/// Immutable LALR(1) parse tables.
pub struct Grammar {
    nonterminals: Box<[Box<str>]>,
    rules: Box<[Rule]>,
    state_count: usize,
    action_slots: Box<[ActionSlot]>,
    action_pool: Box<[Action]>,
    gotos: Box<[StateId]>,
    valid: Box<[SyntaxSet]>,
    conflicts: usize,
}

impl Grammar {
    /// The state every parse starts in.
    pub const START_STATE: StateId = 0;

    #[inline]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    #[inline]
    pub fn state_count(&self) -> usize {
        self.state_count
    }

    #[inline]
    pub fn nonterminal_count(&self) -> usize {
        self.nonterminals.len()
    }

    #[inline]
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id as usize]
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().enumerate().map(|(id, rule)| (id as RuleId, rule))
    }

    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        match symbol {
            Symbol::Terminal(kind) => kind.name(),
            Symbol::Nonterminal(id) => &self.nonterminals[id.index()],
        }
    }

    /// Every action for `terminal` in `state`, shift first, then reductions
    /// in rule order. More than one entry means the GLR driver must fork.
    #[inline]
    pub fn actions(&self, state: StateId, terminal: SyntaxKind) -> &[Action] {
        if !terminal.is_token() {
            return &[];
        }
        let slot = self.action_slots[state as usize * SyntaxKind::TOKEN_COUNT + terminal as usize];
        &self.action_pool[slot.start as usize..(slot.start + slot.len) as usize]
    }

    /// The preferred action, or [`Action::Error`] if there is none.
    #[inline]
    pub fn action(&self, state: StateId, terminal: SyntaxKind) -> Action {
        self.actions(state, terminal).first().copied().unwrap_or(Action::Error)
    }

    #[inline]
    pub fn goto(&self, state: StateId, nonterminal: NonterminalId) -> Option<StateId> {
        let target = self.gotos[state as usize * self.nonterminals.len() + nonterminal.index()];
        (target != NO_STATE).then_some(target)
    }

    /// Terminals with at least one action in `state`.
    #[inline]
    pub fn valid_terminals(&self, state: StateId) -> &SyntaxSet {
        &self.valid[state as usize]
    }

    /// Number of (state, terminal) cells left with more than one action.
    #[inline]
    pub fn conflict_count(&self) -> usize {
        self.conflicts
    }
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("rules", &self.rules.len())
            .field("nonterminals", &self.nonterminals.len())
            .field("states", &self.state_count)
            .field("conflicts", &self.conflicts)
            .finish_non_exhaustive()
    }
}
