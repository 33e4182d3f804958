//! GLR parser for ca65 sources.
//!
//! The parser runs the tables of [`ca65_grammar`] over tokens lexed on demand
//! by [`ca65_tokenizer`], forking on the conflicts the tables keep. It never
//! fails: unexpected input ends up in `ERROR` nodes and the returned tree
//! always covers the whole text. Given the previous tree, unchanged subtrees
//! are reused by reference.

mod config;
mod parser;
mod reuse;
mod stack;
#[cfg(test)]
mod tests;

use ca65_grammar::Grammar;
use ca65_syntax::{EditRangeError, SyntaxTree};
pub use config::ParserConfig;
use parser::Driver;
use reuse::ReuseCursor;
use text_size::TextSize;

/// Parses `text` with the default configuration.
pub fn parse(grammar: &Grammar, text: &str) -> SyntaxTree {
    Parser::new(grammar).parse(text)
}

#[derive(Clone, Copy, Debug)]
pub struct Parser<'g> {
    grammar: &'g Grammar,
    config: ParserConfig,
}

impl<'g> Parser<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self::with_config(grammar, ParserConfig::default())
    }

    pub fn with_config(grammar: &'g Grammar, config: ParserConfig) -> Self {
        Self { grammar, config }
    }

    #[inline]
    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    #[inline]
    pub fn config(&self) -> ParserConfig {
        self.config
    }

    pub fn parse(&self, text: &str) -> SyntaxTree {
        let (root, errors) = Driver::new(self.grammar, self.config, text, None).run();
        SyntaxTree::new(root, errors, 0)
    }

    /// Parses `text`, the document `old` describes after its pending edits.
    ///
    /// Subtrees of `old` whose text the edits left alone are shared with the
    /// result when the parser reaches them in the same state.
    pub fn reparse(&self, old: &SyntaxTree, text: &str) -> Result<SyntaxTree, EditRangeError> {
        let actual = TextSize::of(text);
        if old.text_len() != actual {
            return Err(EditRangeError::LengthMismatch { expected: old.text_len(), actual });
        }

        let reuse = self.config.reuse.then(|| ReuseCursor::new(old));
        let (root, errors) = Driver::new(self.grammar, self.config, text, reuse).run();
        Ok(SyntaxTree::new(root, errors, old.version() + 1))
    }
}
