//! LALR(1) table construction: LR(0) item sets, lookaheads by spontaneous
//! generation and propagation, then yacc-style precedence resolution.

use std::collections::BTreeMap;
use std::hash::BuildHasherDefault;

use ca65_syntax::{SyntaxKind, SyntaxSet};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxHashMap, FxHasher};

use crate::{
    Action, ActionSlot, Assoc, Grammar, GrammarError, NO_STATE, NonterminalId, Rule, RuleId,
    StateId, Symbol,
};

type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;
type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

const MAX_STATES: usize = u16::MAX as usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Item {
    rule: RuleId,
    dot: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Lookahead {
    set: SyntaxSet,
    /// Stands for the lookaheads of the kernel item the closure started from.
    propagate: bool,
}

impl Lookahead {
    const EMPTY: Self = Self { set: SyntaxSet::EMPTY, propagate: false };

    fn merge(&mut self, other: &Self) -> bool {
        let merged = Self {
            set: self.set.union(&other.set),
            propagate: self.propagate || other.propagate,
        };
        let changed = merged != *self;
        *self = merged;
        changed
    }
}

struct Tables<'a> {
    rules: &'a [Rule],
    by_lhs: Vec<Vec<RuleId>>,
    nullable: Vec<bool>,
    first: Vec<SyntaxSet>,
}

impl<'a> Tables<'a> {
    fn new(rules: &'a [Rule], nonterminal_count: usize) -> Self {
        let mut by_lhs = vec![Vec::new(); nonterminal_count];
        for (id, rule) in rules.iter().enumerate() {
            by_lhs[rule.lhs.index()].push(id as RuleId);
        }

        let mut tables = Self {
            rules,
            by_lhs,
            nullable: vec![false; nonterminal_count],
            first: vec![SyntaxSet::EMPTY; nonterminal_count],
        };

        let mut changed = true;
        while changed {
            changed = false;
            for rule in rules {
                let (first, nullable) = tables.first_of(&rule.rhs);
                let lhs = rule.lhs.index();
                let merged = tables.first[lhs].union(&first);
                if merged != tables.first[lhs] || (nullable && !tables.nullable[lhs]) {
                    tables.first[lhs] = merged;
                    tables.nullable[lhs] |= nullable;
                    changed = true;
                }
            }
        }

        tables
    }

    /// FIRST set of a symbol sequence and whether it can derive nothing.
    fn first_of(&self, symbols: &[Symbol]) -> (SyntaxSet, bool) {
        let mut set = SyntaxSet::EMPTY;
        for symbol in symbols {
            match *symbol {
                Symbol::Terminal(kind) => {
                    set.insert(kind);
                    return (set, false);
                }
                Symbol::Nonterminal(id) => {
                    set = set.union(&self.first[id.index()]);
                    if !self.nullable[id.index()] {
                        return (set, false);
                    }
                }
            }
        }
        (set, true)
    }

    #[inline]
    fn next_symbol(&self, item: Item) -> Option<Symbol> {
        self.rules[item.rule as usize].rhs.get(item.dot as usize).copied()
    }

    fn lr0_closure(&self, kernel: &[Item]) -> Vec<Item> {
        let mut items = kernel.to_vec();
        let mut expanded = vec![false; self.by_lhs.len()];
        let mut index = 0;
        while index < items.len() {
            if let Some(Symbol::Nonterminal(id)) = self.next_symbol(items[index]) {
                if !std::mem::replace(&mut expanded[id.index()], true) {
                    items.extend(self.by_lhs[id.index()].iter().map(|&rule| Item { rule, dot: 0 }));
                }
            }
            index += 1;
        }
        items
    }

    fn lr1_closure(
        &self,
        seeds: impl IntoIterator<Item = (Item, Lookahead)>,
    ) -> FxIndexMap<Item, Lookahead> {
        let mut items = FxIndexMap::default();
        let mut queue = Vec::new();
        for (item, lookahead) in seeds {
            let (index, _) = items.insert_full(item, lookahead);
            queue.push(index);
        }

        while let Some(index) = queue.pop() {
            let Some((&item, &lookahead)) = items.get_index(index) else { continue };
            let Some(Symbol::Nonterminal(id)) = self.next_symbol(item) else { continue };

            let rest = &self.rules[item.rule as usize].rhs[item.dot as usize + 1..];
            let (first, nullable) = self.first_of(rest);
            let mut generated = Lookahead { set: first, propagate: false };
            if nullable {
                generated.merge(&lookahead);
            }

            for &rule in &self.by_lhs[id.index()] {
                let item = Item { rule, dot: 0 };
                match items.get_full_mut(&item) {
                    Some((index, _, existing)) => {
                        if existing.merge(&generated) {
                            queue.push(index);
                        }
                    }
                    None => {
                        let (index, _) = items.insert_full(item, generated);
                        queue.push(index);
                    }
                }
            }
        }

        items
    }
}

/// LR(0) automaton: kernels in discovery order and their transitions.
struct Automaton {
    kernels: FxIndexSet<Box<[Item]>>,
    transitions: Vec<Vec<(Symbol, StateId)>>,
}

impl Automaton {
    fn new(tables: &Tables<'_>, start_rule: RuleId) -> Result<Self, GrammarError> {
        let mut kernels = FxIndexSet::default();
        kernels.insert(vec![Item { rule: start_rule, dot: 0 }].into_boxed_slice());
        let mut transitions = Vec::new();

        let mut state = 0;
        while state < kernels.len() {
            let closure = tables.lr0_closure(&kernels[state]);

            let mut successors: BTreeMap<Symbol, Vec<Item>> = BTreeMap::new();
            for item in closure {
                if let Some(symbol) = tables.next_symbol(item) {
                    successors.entry(symbol).or_default().push(Item { dot: item.dot + 1, ..item });
                }
            }

            let mut edges = Vec::with_capacity(successors.len());
            for (symbol, mut kernel) in successors {
                kernel.sort_unstable();
                kernel.dedup();
                let (target, _) = kernels.insert_full(kernel.into_boxed_slice());
                edges.push((symbol, target as StateId));
            }
            transitions.push(edges);

            if kernels.len() > MAX_STATES {
                return Err(GrammarError::TooManyStates { count: kernels.len(), max: MAX_STATES });
            }
            state += 1;
        }

        Ok(Self { kernels, transitions })
    }

    fn target(&self, state: usize, symbol: Symbol) -> StateId {
        let edges = &self.transitions[state];
        match edges.binary_search_by(|(edge, _)| edge.cmp(&symbol)) {
            Ok(index) => edges[index].1,
            Err(_) => unreachable!("closure item without a transition"),
        }
    }

    fn kernel_position(&self, state: StateId, item: Item) -> usize {
        match self.kernels[state as usize].binary_search(&item) {
            Ok(index) => index,
            Err(_) => unreachable!("advanced item missing from its target kernel"),
        }
    }

    /// Kernel lookaheads, computed by spontaneous generation and propagation.
    fn lookaheads(&self, tables: &Tables<'_>) -> Vec<Vec<SyntaxSet>> {
        let mut lookaheads: Vec<Vec<SyntaxSet>> =
            self.kernels.iter().map(|kernel| vec![SyntaxSet::EMPTY; kernel.len()]).collect();
        let mut propagation: Vec<(usize, usize, StateId, usize)> = Vec::new();

        for (state, kernel) in self.kernels.iter().enumerate() {
            for (position, &kernel_item) in kernel.iter().enumerate() {
                let seed = Lookahead { set: SyntaxSet::EMPTY, propagate: true };
                for (item, lookahead) in tables.lr1_closure([(kernel_item, seed)]) {
                    let Some(symbol) = tables.next_symbol(item) else { continue };
                    let target = self.target(state, symbol);
                    let advanced = self.kernel_position(target, Item { dot: item.dot + 1, ..item });
                    let slot = &mut lookaheads[target as usize][advanced];
                    *slot = slot.union(&lookahead.set);
                    if lookahead.propagate {
                        propagation.push((state, position, target, advanced));
                    }
                }
            }
        }

        lookaheads[0][0].insert(SyntaxKind::EOF);

        let mut changed = true;
        while changed {
            changed = false;
            for &(state, position, target, advanced) in &propagation {
                let source = lookaheads[state][position];
                let slot = &mut lookaheads[target as usize][advanced];
                let merged = slot.union(&source);
                if merged != *slot {
                    *slot = merged;
                    changed = true;
                }
            }
        }

        lookaheads
    }
}

pub(crate) fn build(
    mut nonterminals: Vec<Box<str>>,
    mut rules: Vec<Rule>,
    token_precedence: &FxHashMap<SyntaxKind, (u8, Assoc)>,
    start: NonterminalId,
) -> Result<Grammar, GrammarError> {
    let accept = NonterminalId::from_raw(nonterminals.len() as u32);
    nonterminals.push("$accept".into());
    let accept_rule = rules.len() as RuleId;
    rules.push(Rule {
        lhs: accept,
        rhs: Box::new([Symbol::Nonterminal(start)]),
        kind: None,
        precedence: None,
        dynamic: 0,
    });

    let tables = Tables::new(&rules, nonterminals.len());
    let automaton = Automaton::new(&tables, accept_rule)?;
    let lookaheads = automaton.lookaheads(&tables);
    let state_count = automaton.kernels.len();

    let mut action_slots = vec![ActionSlot::default(); state_count * SyntaxKind::TOKEN_COUNT];
    let mut action_pool = Vec::new();
    let mut gotos = vec![NO_STATE; state_count * nonterminals.len()];
    let mut valid = Vec::with_capacity(state_count);
    let mut conflicts = 0;

    for (state, kernel) in automaton.kernels.iter().enumerate() {
        let mut shifts: FxHashMap<SyntaxKind, StateId> = FxHashMap::default();
        for &(symbol, target) in &automaton.transitions[state] {
            match symbol {
                Symbol::Terminal(kind) => {
                    shifts.insert(kind, target);
                }
                Symbol::Nonterminal(id) => gotos[state * nonterminals.len() + id.index()] = target,
            }
        }

        let seeds = kernel
            .iter()
            .zip(&lookaheads[state])
            .map(|(&item, &set)| (item, Lookahead { set, ..Lookahead::EMPTY }));
        let mut reductions: FxHashMap<SyntaxKind, Vec<RuleId>> = FxHashMap::default();
        let mut accepts = false;
        for (item, lookahead) in tables.lr1_closure(seeds) {
            if tables.next_symbol(item).is_some() {
                continue;
            }
            if item.rule == accept_rule {
                accepts |= lookahead.set.contains(SyntaxKind::EOF);
                continue;
            }
            for terminal in lookahead.set.iter() {
                reductions.entry(terminal).or_default().push(item.rule);
            }
        }

        let mut state_valid = SyntaxSet::EMPTY;
        for &terminal in &SyntaxKind::ALL[..SyntaxKind::TOKEN_COUNT] {
            let mut reduces = reductions.remove(&terminal).unwrap_or_default();
            reduces.sort_unstable();
            reduces.dedup();
            let shift = shifts.get(&terminal).copied();
            let accept = accepts && terminal == SyntaxKind::EOF;

            let (shift, reduces) =
                resolve(&rules, token_precedence.get(&terminal).copied(), shift, reduces);

            let start = action_pool.len() as u32;
            action_pool.extend(accept.then_some(Action::Accept));
            action_pool.extend(shift.map(Action::Shift));
            action_pool.extend(reduces.into_iter().map(Action::Reduce));
            let len = action_pool.len() as u32 - start;

            if len > 1 {
                conflicts += 1;
                log::debug!(
                    "state {state}: {len} actions on {terminal} kept for GLR: {:?}",
                    &action_pool[start as usize..]
                );
            }
            if len > 0 {
                state_valid.insert(terminal);
            }
            action_slots[state * SyntaxKind::TOKEN_COUNT + terminal as usize] =
                ActionSlot { start, len };
        }
        valid.push(state_valid);
    }

    log::info!(
        "built {state_count} states for {} rules and {} nonterminals ({conflicts} conflicts kept)",
        rules.len(),
        nonterminals.len()
    );

    Ok(Grammar {
        nonterminals: nonterminals.into(),
        rules: rules.into(),
        state_count,
        action_slots: action_slots.into(),
        action_pool: action_pool.into(),
        gotos: gotos.into(),
        valid: valid.into(),
        conflicts,
    })
}

/// Settles shift/reduce pairs where both the token and the rule carry a
/// static precedence. Anything else is left for the GLR driver.
fn resolve(
    rules: &[Rule],
    token: Option<(u8, Assoc)>,
    shift: Option<StateId>,
    reduces: Vec<RuleId>,
) -> (Option<StateId>, Vec<RuleId>) {
    if shift.is_none() {
        return (shift, reduces);
    }

    let mut keep_shift = true;
    let mut kept = Vec::with_capacity(reduces.len());
    for rule in reduces {
        match (rules[rule as usize].precedence, token) {
            (Some(rule_level), Some((token_level, assoc))) => {
                if token_level > rule_level {
                    continue;
                }
                if token_level < rule_level {
                    keep_shift = false;
                    kept.push(rule);
                    continue;
                }
                match assoc {
                    Assoc::Left => {
                        keep_shift = false;
                        kept.push(rule);
                    }
                    Assoc::Right => {}
                    Assoc::NonAssoc => keep_shift = false,
                }
            }
            _ => kept.push(rule),
        }
    }

    (shift.filter(|_| keep_shift), kept)
}

#[cfg(test)]
mod tests {
    use ca65_syntax::SyntaxKind::*;

    use crate::{Action, Assoc, GrammarBuilder, GrammarError, Symbol};

    macro_rules! syms {
        () => {{ let empty: [Symbol; 0] = []; empty }};
        ($($symbol:expr),+ $(,)?) => { [$(Symbol::from($symbol)),+] };
    }

    // expr -> expr + expr | expr * expr | NUMBER
    fn arithmetic(with_precedence: bool) -> crate::Grammar {
        let mut g = GrammarBuilder::new();
        let expr = g.nonterminal("expr");
        g.start(expr);
        g.rule(expr, Some(BINARY_EXPR), syms![expr, PLUS, expr]);
        g.rule(expr, Some(BINARY_EXPR), syms![expr, STAR, expr]);
        g.rule(expr, None, syms![NUMBER]);
        if with_precedence {
            g.precedence(1, Assoc::Left, [PLUS]);
            g.precedence(2, Assoc::Left, [STAR]);
        }
        g.build().unwrap()
    }

    /// Runs the deterministic LR driver over `tokens`, returning the rules
    /// reduced in order.
    fn drive(grammar: &crate::Grammar, tokens: &[ca65_syntax::SyntaxKind]) -> Option<Vec<u32>> {
        let mut stack = vec![crate::Grammar::START_STATE];
        let mut reduced = Vec::new();
        let mut input = tokens.iter().copied().chain([EOF]);
        let mut token = input.next()?;
        loop {
            let state = *stack.last()?;
            match grammar.action(state, token) {
                Action::Shift(next) => {
                    stack.push(next);
                    token = input.next()?;
                }
                Action::Reduce(rule) => {
                    let rule_def = grammar.rule(rule);
                    stack.truncate(stack.len() - rule_def.rhs.len());
                    stack.push(grammar.goto(*stack.last()?, rule_def.lhs)?);
                    reduced.push(rule);
                }
                Action::Accept => return Some(reduced),
                Action::Error => return None,
            }
        }
    }

    #[test]
    fn precedence_resolves_everything() {
        let grammar = arithmetic(true);
        assert_eq!(grammar.conflict_count(), 0);
        // 1 + 2 * 3 reduces the product before the sum.
        let reduced = drive(&grammar, &[NUMBER, PLUS, NUMBER, STAR, NUMBER]).unwrap();
        assert_eq!(reduced, [2, 2, 2, 1, 0]);
        // 1 + 2 + 3 is left associative.
        let reduced = drive(&grammar, &[NUMBER, PLUS, NUMBER, PLUS, NUMBER]).unwrap();
        assert_eq!(reduced, [2, 2, 0, 2, 0]);
    }

    #[test]
    fn unresolved_conflicts_are_kept() {
        let grammar = arithmetic(false);
        assert!(grammar.conflict_count() > 0);
        let forked = (0..grammar.state_count() as u32)
            .map(|state| grammar.actions(state, PLUS))
            .find(|actions| actions.len() > 1)
            .unwrap();
        assert!(matches!(forked[0], Action::Shift(_)));
        assert!(matches!(forked[1], Action::Reduce(_)));
    }

    #[test]
    fn valid_terminals_follow_actions() {
        let grammar = arithmetic(true);
        let start = grammar.valid_terminals(crate::Grammar::START_STATE);
        assert!(start.contains(NUMBER));
        assert!(!start.contains(PLUS));
        assert_eq!(grammar.action(0, PLUS), Action::Error);
    }

    #[test]
    fn nullable_rules() {
        // list -> list NUMBER | ε
        let mut g = GrammarBuilder::new();
        let list = g.nonterminal("list");
        g.start(list);
        g.rule(list, None, syms![list, NUMBER]);
        g.rule(list, None, syms![]);
        let grammar = g.build().unwrap();
        assert_eq!(drive(&grammar, &[]), Some(vec![1]));
        assert_eq!(drive(&grammar, &[NUMBER, NUMBER]), Some(vec![1, 0, 0]));
        assert_eq!(drive(&grammar, &[PLUS]), None);
    }

    #[test]
    fn malformed_grammars() {
        let mut g = GrammarBuilder::new();
        let a = g.nonterminal("a");
        let b = g.nonterminal("b");
        g.start(a);
        g.rule(a, None, syms![b]);
        assert_eq!(g.build().unwrap_err(), GrammarError::UndefinedNonterminal { name: "b".into() });

        let mut g = GrammarBuilder::new();
        let a = g.nonterminal("a");
        g.start(a);
        g.rule(a, None, syms![a, NUMBER]);
        assert_eq!(
            g.build().unwrap_err(),
            GrammarError::UnproductiveNonterminal { name: "a".into() }
        );

        let mut g = GrammarBuilder::new();
        let a = g.nonterminal("a");
        g.start(a);
        g.rule(a, None, syms![LINE]);
        assert!(matches!(g.build(), Err(GrammarError::NodeKindAsTerminal { kind: LINE, .. })));

        let mut g = GrammarBuilder::new();
        let a = g.nonterminal("a");
        g.rule(a, None, syms![NUMBER]);
        assert_eq!(g.build().unwrap_err(), GrammarError::MissingStartRule);
    }
}
