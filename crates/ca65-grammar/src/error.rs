use ca65_syntax::SyntaxKind;

/// Failure to build parse tables from a grammar definition.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("nonterminal `{name}` is used but has no rules")]
    UndefinedNonterminal { name: String },
    #[error("nonterminal `{name}` cannot derive any token sequence")]
    UnproductiveNonterminal { name: String },
    #[error("node kind `{kind}` used as a terminal in a rule for `{rule}`")]
    NodeKindAsTerminal { kind: SyntaxKind, rule: String },
    #[error("token kind `{kind}` used as the node kind of a rule for `{rule}`")]
    TokenKindAsNode { kind: SyntaxKind, rule: String },
    #[error("grammar has no start rule")]
    MissingStartRule,
    #[error("grammar needs {count} states, more than the supported {max}")]
    TooManyStates { count: usize, max: usize },
}
