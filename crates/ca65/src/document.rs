use std::ops::Range;

use ca65_parse::ParserConfig;
use ca65_syntax::{EditRangeError, SyntaxTree, TextEdit, TextRange, TextSize};

use crate::{GrammarError, GrammarHandle, load_grammar};

/// Source text kept together with its latest tree.
///
/// Every edit updates the text and reparses it against the previous tree,
/// so lines the edit did not touch keep their nodes.
#[derive(Clone, Debug)]
pub struct Document {
    grammar: GrammarHandle,
    config: ParserConfig,
    text: String,
    tree: SyntaxTree,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Result<Self, GrammarError> {
        Ok(Self::with_config(load_grammar()?, ParserConfig::default(), text))
    }

    pub fn with_config(
        grammar: GrammarHandle,
        config: ParserConfig,
        text: impl Into<String>,
    ) -> Self {
        let text = text.into();
        let tree = grammar.parser().with_config(config).parse(&text);
        Self { grammar, config, text, tree }
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.tree.version()
    }

    /// Replaces `range` with `replacement` and reparses.
    ///
    /// On error the document is left unchanged.
    pub fn edit(
        &mut self,
        range: TextRange,
        replacement: &str,
    ) -> Result<&SyntaxTree, EditRangeError> {
        let edited = self.tree.apply_edit(&TextEdit::replace(range, replacement))?;
        if !self.text.is_char_boundary(range.start().into())
            || !self.text.is_char_boundary(range.end().into())
        {
            return Err(EditRangeError::NotCharBoundary { range });
        }

        self.text.replace_range(Range::<usize>::from(range), replacement);
        self.tree = self.grammar.parser().with_config(self.config).reparse(&edited, &self.text)?;
        Ok(&self.tree)
    }

    pub fn insert(&mut self, offset: TextSize, text: &str) -> Result<&SyntaxTree, EditRangeError> {
        self.edit(TextRange::empty(offset), text)
    }

    pub fn delete(&mut self, range: TextRange) -> Result<&SyntaxTree, EditRangeError> {
        self.edit(range, "")
    }

    pub fn into_parts(self) -> (String, SyntaxTree) {
        (self.text, self.tree)
    }
}
