//! Parsing ca65 assembly with a process-wide grammar.
//!
//! This is the surface hosts are meant to use: the parse tables are built
//! once by [`load_grammar`] and shared, and [`parse`], [`reparse`] and
//! [`Document`] return immutable [`SyntaxTree`]s. Nothing here exposes the
//! automaton itself.

mod document;

use std::fmt;
use std::sync::Arc;

use ca65_grammar::Grammar;
pub use ca65_grammar::GrammarError;
pub use ca65_parse::ParserConfig;
pub use ca65_syntax::{
    EditRangeError, SyntaxError, SyntaxErrorKind, SyntaxKind, SyntaxNode, SyntaxToken,
    SyntaxTree, TextEdit, TextRange, TextSize,
};
pub use document::Document;
use once_cell::sync::OnceCell;

static GRAMMAR: OnceCell<Result<GrammarHandle, GrammarError>> = OnceCell::new();

/// Returns the ca65 grammar, building its tables on the first call.
///
/// Concurrent first callers block until construction finishes; every call
/// returns the same handle, or a clone of the same error.
pub fn load_grammar() -> Result<GrammarHandle, GrammarError> {
    GRAMMAR
        .get_or_init(|| {
            log::debug!("building ca65 grammar tables");
            ca65_grammar::build().map(|grammar| GrammarHandle(Arc::new(grammar)))
        })
        .clone()
}

/// Parses `text` with the shared grammar.
pub fn parse(text: &str) -> Result<SyntaxTree, GrammarError> {
    Ok(load_grammar()?.parse(text))
}

/// Applies `edits` in order to `tree` and reparses the result, which must be
/// `new_text`.
pub fn reparse(tree: &SyntaxTree, edits: &[TextEdit], new_text: &str) -> Result<SyntaxTree, Error> {
    Ok(load_grammar()?.reparse(tree, edits, new_text)?)
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    Edit(#[from] EditRangeError),
}

/// Shared, immutable parse tables. Two handles are equal when they refer to
/// the same tables.
#[derive(Clone)]
pub struct GrammarHandle(Arc<Grammar>);

impl GrammarHandle {
    pub fn parser(&self) -> Parser<'_> {
        Parser::new(&self.0)
    }

    pub fn parse(&self, text: &str) -> SyntaxTree {
        self.parser().parse(text)
    }

    pub fn reparse(
        &self,
        tree: &SyntaxTree,
        edits: &[TextEdit],
        new_text: &str,
    ) -> Result<SyntaxTree, EditRangeError> {
        self.parser().reparse_with(tree, edits, new_text)
    }

    pub fn state_count(&self) -> usize {
        self.0.state_count()
    }

    pub fn rule_count(&self) -> usize {
        self.0.rule_count()
    }

    pub fn nonterminal_count(&self) -> usize {
        self.0.nonterminal_count()
    }

    /// Number of table cells the parser forks on.
    pub fn conflict_count(&self) -> usize {
        self.0.conflict_count()
    }
}

impl PartialEq for GrammarHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for GrammarHandle {}

impl fmt::Debug for GrammarHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GrammarHandle").field(&Arc::as_ptr(&self.0)).finish()
    }
}

/// A configured parser borrowing a grammar handle.
#[derive(Clone, Copy, Debug)]
pub struct Parser<'g> {
    inner: ca65_parse::Parser<'g>,
}

impl<'g> Parser<'g> {
    fn new(grammar: &'g Grammar) -> Self {
        Self { inner: ca65_parse::Parser::new(grammar) }
    }

    pub fn with_config(self, config: ParserConfig) -> Self {
        Self { inner: ca65_parse::Parser::with_config(self.inner.grammar(), config) }
    }

    pub fn config(&self) -> ParserConfig {
        self.inner.config()
    }

    pub fn parse(&self, text: &str) -> SyntaxTree {
        self.inner.parse(text)
    }

    /// Reparses `tree` after its own pending edits.
    pub fn reparse(&self, tree: &SyntaxTree, new_text: &str) -> Result<SyntaxTree, EditRangeError> {
        self.inner.reparse(tree, new_text)
    }

    pub fn reparse_with(
        &self,
        tree: &SyntaxTree,
        edits: &[TextEdit],
        new_text: &str,
    ) -> Result<SyntaxTree, EditRangeError> {
        let mut edited = tree.clone();
        for edit in edits {
            edited = edited.apply_edit(edit)?;
        }
        self.inner.reparse(&edited, new_text)
    }
}
