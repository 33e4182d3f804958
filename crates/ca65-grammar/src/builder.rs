use ca65_syntax::SyntaxKind;
use rustc_hash::FxHashMap;

use crate::{Assoc, Grammar, GrammarError, NonterminalId, Rule, Symbol, lalr};

/// Declarative grammar definition, compiled by [`GrammarBuilder::build`].
#[derive(Default)]
pub struct GrammarBuilder {
    nonterminals: Vec<Box<str>>,
    rules: Vec<RuleDef>,
    token_precedence: FxHashMap<SyntaxKind, (u8, Assoc)>,
    start: Option<NonterminalId>,
}

struct RuleDef {
    lhs: NonterminalId,
    rhs: Vec<Symbol>,
    kind: Option<SyntaxKind>,
    precedence: Option<u8>,
    dynamic: i32,
}

/// Handle for annotating the rule just added.
pub struct RuleBuilder<'a> {
    rule: &'a mut RuleDef,
}

impl RuleBuilder<'_> {
    /// Overrides the static precedence taken from the rule's last terminal.
    pub fn prec(self, level: u8) -> Self {
        self.rule.precedence = Some(level);
        self
    }

    /// Score added to a GLR stack that reduces this rule.
    pub fn dynamic(self, value: i32) -> Self {
        self.rule.dynamic = value;
        self
    }
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nonterminal(&mut self, name: &str) -> NonterminalId {
        let id = NonterminalId::from_raw(self.nonterminals.len() as u32);
        self.nonterminals.push(name.into());
        id
    }

    pub fn start(&mut self, nonterminal: NonterminalId) {
        self.start = Some(nonterminal);
    }

    /// Adds `lhs -> rhs`, building a node of `kind` on reduction.
    pub fn rule(
        &mut self,
        lhs: NonterminalId,
        kind: Option<SyntaxKind>,
        rhs: impl IntoIterator<Item = Symbol>,
    ) -> RuleBuilder<'_> {
        let index = self.rules.len();
        self.rules.push(RuleDef {
            lhs,
            rhs: rhs.into_iter().collect(),
            kind,
            precedence: None,
            dynamic: 0,
        });
        RuleBuilder { rule: &mut self.rules[index] }
    }

    /// Declares a precedence level shared by `tokens`; higher binds tighter.
    pub fn precedence(
        &mut self,
        level: u8,
        assoc: Assoc,
        tokens: impl IntoIterator<Item = SyntaxKind>,
    ) {
        for token in tokens {
            self.token_precedence.insert(token, (level, assoc));
        }
    }

    pub fn build(self) -> Result<Grammar, GrammarError> {
        let start = self.start.ok_or(GrammarError::MissingStartRule)?;
        if !self.rules.iter().any(|rule| rule.lhs == start) {
            return Err(GrammarError::MissingStartRule);
        }

        let name = |id: NonterminalId| self.nonterminals[id.index()].to_string();

        let mut defined = vec![false; self.nonterminals.len()];
        for rule in &self.rules {
            defined[rule.lhs.index()] = true;
            if let Some(kind) = rule.kind.filter(|kind| kind.is_token()) {
                return Err(GrammarError::TokenKindAsNode { kind, rule: name(rule.lhs) });
            }
            for symbol in &rule.rhs {
                if let Symbol::Terminal(kind) = *symbol {
                    if !kind.is_token() {
                        return Err(GrammarError::NodeKindAsTerminal { kind, rule: name(rule.lhs) });
                    }
                }
            }
        }
        if let Some(index) = defined.iter().position(|defined| !defined) {
            let id = NonterminalId::from_raw(index as u32);
            return Err(GrammarError::UndefinedNonterminal { name: name(id) });
        }

        let mut productive = vec![false; self.nonterminals.len()];
        let mut changed = true;
        while changed {
            changed = false;
            for rule in &self.rules {
                if productive[rule.lhs.index()] {
                    continue;
                }
                let derives = rule.rhs.iter().all(|symbol| match symbol {
                    Symbol::Terminal(_) => true,
                    Symbol::Nonterminal(id) => productive[id.index()],
                });
                if derives {
                    productive[rule.lhs.index()] = true;
                    changed = true;
                }
            }
        }
        if let Some(index) = productive.iter().position(|productive| !productive) {
            let id = NonterminalId::from_raw(index as u32);
            return Err(GrammarError::UnproductiveNonterminal { name: name(id) });
        }

        let rules = self
            .rules
            .into_iter()
            .map(|rule| {
                let precedence = rule.precedence.or_else(|| {
                    rule.rhs.iter().rev().find_map(|symbol| match symbol {
                        Symbol::Terminal(kind) => {
                            self.token_precedence.get(kind).map(|(level, _)| *level)
                        }
                        Symbol::Nonterminal(_) => None,
                    })
                });
                Rule {
                    lhs: rule.lhs,
                    rhs: rule.rhs.into(),
                    kind: rule.kind,
                    precedence,
                    dynamic: rule.dynamic,
                }
            })
            .collect();

        lalr::build(self.nonterminals, rules, &self.token_precedence, start)
    }
}
