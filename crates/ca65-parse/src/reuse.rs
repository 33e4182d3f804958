use ca65_grammar::{Grammar, NonterminalId, StateId};
use ca65_syntax::{EditMap, GreenElement, GreenNode, NodeOrToken, SyntaxKind, SyntaxTree};
use ca65_tokenizer::Token;
use text_size::{TextRange, TextSize};

/// Walks the previous tree alongside the parser and hands out subtrees that
/// can be pushed as a whole at the parser's position.
///
/// Offsets stored in the old tree are translated through the tree's edit map.
pub(crate) struct ReuseCursor<'a> {
    edits: &'a EditMap,
    stack: Vec<Level<'a>>,
}

struct Level<'a> {
    children: &'a [GreenElement],
    index: usize,
    /// Old offset of `children[index]`.
    offset: TextSize,
}

impl<'a> ReuseCursor<'a> {
    pub(crate) fn new(tree: &'a SyntaxTree) -> Self {
        let root = Level { children: tree.green().children(), index: 0, offset: TextSize::new(0) };
        Self { edits: tree.edit_map(), stack: vec![root] }
    }

    fn current(&self) -> Option<(&'a GreenElement, TextSize)> {
        let level = self.stack.last()?;
        Some((level.children.get(level.index)?, level.offset))
    }

    fn next_sibling(&mut self) {
        while let Some(level) = self.stack.last_mut() {
            if let Some(element) = level.children.get(level.index) {
                level.offset += element.text_len();
                level.index += 1;
            }
            if level.index < level.children.len() {
                return;
            }
            self.stack.pop();
        }
    }

    fn descend(&mut self) {
        match self.current() {
            Some((NodeOrToken::Node(node), offset)) if !node.children().is_empty() => {
                self.stack.push(Level { children: node.children(), index: 0, offset });
            }
            _ => self.next_sibling(),
        }
    }

    /// Finds the outermost reusable node starting at `position`, given that
    /// the parser sits in `state` with `token` freshly lexed there. Returns
    /// the node and the state to push it with.
    pub(crate) fn take(
        &mut self,
        grammar: &Grammar,
        position: TextSize,
        state: StateId,
        token: &Token,
        token_text: &str,
    ) -> Option<(GreenNode, StateId)> {
        while let Some((element, offset)) = self.current() {
            if self.edits.map_offset(offset) >= position {
                break;
            }
            if self.edits.map_offset(offset + element.text_len()) <= position {
                self.next_sibling();
            } else {
                self.descend();
            }
        }

        while let Some((element, offset)) = self.current() {
            if self.edits.map_offset(offset) != position {
                return None;
            }
            if let NodeOrToken::Node(node) = element {
                let lexed = (token.kind, token_text);
                if let Some(next) = self.accepts(grammar, node, offset, position, state, lexed) {
                    self.next_sibling();
                    return Some((node.clone(), next));
                }
            }
            self.descend();
        }
        None
    }

    fn accepts(
        &self,
        grammar: &Grammar,
        node: &GreenNode,
        offset: TextSize,
        position: TextSize,
        state: StateId,
        (kind, text): (SyntaxKind, &str),
    ) -> Option<StateId> {
        let origin = node.origin()?;
        if origin.fragile || origin.state != state || node.has_error() {
            return None;
        }

        let first = node.first_token()?;
        if first.kind() != kind || first.text() != text {
            return None;
        }

        // The byte before the node steers the lexer too (`foo(` vs `foo (`).
        let start = offset.checked_sub(TextSize::new(1)).unwrap_or(offset);
        let end = offset + node.text_len() + origin.lookahead;
        let moved = self.edits.unchanged(TextRange::new(start, end))?;
        if moved.start() + (offset - start) != position {
            return None;
        }

        grammar.goto(state, NonterminalId::from_raw(origin.symbol))
    }
}
