//! Cursors over green trees with parent pointers and absolute offsets.

use std::fmt;
use std::sync::Arc;

use text_size::{TextRange, TextSize};

use crate::{GreenElement, GreenNode, GreenToken, SyntaxKind};

/// Node-or-token wrapper used throughout the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeOrToken<N, T> {
    Node(N),
    Token(T),
}

impl<N, T> NodeOrToken<N, T> {
    /// Converts into the node variant, if any.
    pub fn into_node(self) -> Option<N> {
        match self {
            NodeOrToken::Node(node) => Some(node),
            NodeOrToken::Token(_) => None,
        }
    }

    /// Converts into the token variant, if any.
    pub fn into_token(self) -> Option<T> {
        match self {
            NodeOrToken::Node(_) => None,
            NodeOrToken::Token(token) => Some(token),
        }
    }

    /// Returns a shared reference to the node, if any.
    pub fn as_node(&self) -> Option<&N> {
        match self {
            NodeOrToken::Node(node) => Some(node),
            NodeOrToken::Token(_) => None,
        }
    }

    /// Returns a shared reference to the token, if any.
    pub fn as_token(&self) -> Option<&T> {
        match self {
            NodeOrToken::Node(_) => None,
            NodeOrToken::Token(token) => Some(token),
        }
    }
}

impl<N: fmt::Display, T: fmt::Display> fmt::Display for NodeOrToken<N, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeOrToken::Node(node) => fmt::Display::fmt(node, f),
            NodeOrToken::Token(token) => fmt::Display::fmt(token, f),
        }
    }
}

pub type SyntaxElement = NodeOrToken<SyntaxNode, SyntaxToken>;

impl SyntaxElement {
    #[inline]
    pub fn kind(&self) -> SyntaxKind {
        match self {
            NodeOrToken::Node(node) => node.kind(),
            NodeOrToken::Token(token) => token.kind(),
        }
    }

    #[inline]
    pub fn text_range(&self) -> TextRange {
        match self {
            NodeOrToken::Node(node) => node.text_range(),
            NodeOrToken::Token(token) => token.text_range(),
        }
    }

    /// First or last non-empty token of the element.
    fn edge_token(self, last: bool) -> Option<SyntaxToken> {
        let mut element = self;
        loop {
            let node = match element {
                NodeOrToken::Token(token) => return Some(token),
                NodeOrToken::Node(node) => node,
            };
            let mut children =
                node.children_with_tokens().filter(|child| !child.text_range().is_empty());
            element = if last { children.last()? } else { children.next()? };
        }
    }
}

/// Node handle carrying its absolute offset and a link to its parent.
#[derive(Clone)]
pub struct SyntaxNode {
    data: Arc<NodeData>,
}

struct NodeData {
    green: GreenNode,
    offset: TextSize,
    parent: Option<SyntaxNode>,
    index: usize,
}

impl Drop for NodeData {
    fn drop(&mut self) {
        let mut parent = self.parent.take();
        while let Some(node) = parent {
            parent = match Arc::try_unwrap(node.data) {
                Ok(mut data) => data.parent.take(),
                Err(_) => None,
            };
        }
    }
}

impl SyntaxNode {
    pub fn new_root(green: GreenNode) -> Self {
        Self::new(green, TextSize::new(0), None, 0)
    }

    fn new(green: GreenNode, offset: TextSize, parent: Option<SyntaxNode>, index: usize) -> Self {
        Self { data: Arc::new(NodeData { green, offset, parent, index }) }
    }

    /// Returns this node's kind.
    #[inline]
    pub fn kind(&self) -> SyntaxKind {
        self.data.green.kind()
    }

    #[inline]
    pub fn green(&self) -> &GreenNode {
        &self.data.green
    }

    #[inline]
    pub fn text_range(&self) -> TextRange {
        TextRange::at(self.data.offset, self.data.green.text_len())
    }

    /// Returns the source text covered by this node.
    pub fn text(&self) -> String {
        let mut buf = String::with_capacity(self.data.green.text_len().into());
        self.data.green.write_text(&mut buf);
        buf
    }

    #[inline]
    pub fn parent(&self) -> Option<SyntaxNode> {
        self.data.parent.clone()
    }

    /// Returns an iterator of nodes starting at this node and walking up.
    pub fn ancestors(&self) -> impl Iterator<Item = SyntaxNode> + use<> {
        std::iter::successors(Some(self.clone()), SyntaxNode::parent)
    }

    #[inline]
    pub fn children_with_tokens(&self) -> SyntaxElementChildren {
        SyntaxElementChildren { parent: self.clone(), next_index: 0, next_offset: self.data.offset }
    }

    #[inline]
    pub fn children(&self) -> SyntaxNodeChildren {
        SyntaxNodeChildren { inner: self.children_with_tokens() }
    }

    #[inline]
    pub fn first_child(&self) -> Option<SyntaxNode> {
        self.children().next()
    }

    pub fn next_sibling(&self) -> Option<SyntaxNode> {
        let parent = self.data.parent.clone()?;
        let siblings = SyntaxElementChildren {
            parent,
            next_index: self.data.index + 1,
            next_offset: self.text_range().end(),
        };
        SyntaxNodeChildren { inner: siblings }.next()
    }

    /// Returns the first non-trivia token spanned by this node.
    pub fn first_token(&self) -> Option<SyntaxToken> {
        self.preorder_with_tokens().find_map(|event| match event {
            WalkEventWithTokens::Token(token) if !token.is_trivia() => Some(token),
            _ => None,
        })
    }

    /// Returns `true` if the subtree contains an `ERROR` node or an
    /// `UNKNOWN` token.
    #[inline]
    pub fn has_error(&self) -> bool {
        self.data.green.has_error()
    }

    #[inline]
    pub fn preorder(&self) -> Preorder {
        Preorder { stack: Vec::with_capacity(32), root: Some(self.clone()) }
    }

    /// Iterates over this node and all of its descendant nodes.
    pub fn descendants(&self) -> impl Iterator<Item = SyntaxNode> + use<> {
        self.preorder().filter_map(|event| match event {
            WalkEvent::Enter(node) => Some(node),
            WalkEvent::Leave(_) => None,
        })
    }

    /// Finds the token(s) touching `offset`.
    pub fn token_at_offset(&self, offset: TextSize) -> TokenAtOffset<SyntaxToken> {
        let range = self.text_range();
        if offset < range.start() || range.end() < offset {
            return TokenAtOffset::None;
        }

        let mut node = self.clone();
        loop {
            let mut children = node.children_with_tokens().filter(|child| {
                let range = child.text_range();
                !range.is_empty() && range.start() <= offset && offset <= range.end()
            });

            match (children.next(), children.next()) {
                (None, _) => return TokenAtOffset::None,
                (Some(NodeOrToken::Token(token)), None) => return TokenAtOffset::Single(token),
                (Some(NodeOrToken::Node(child)), None) => node = child,
                (Some(left), Some(right)) => {
                    return match (left.edge_token(true), right.edge_token(false)) {
                        (Some(left), Some(right)) => TokenAtOffset::Between(left, right),
                        (Some(single), None) | (None, Some(single)) => {
                            TokenAtOffset::Single(single)
                        }
                        (None, None) => TokenAtOffset::None,
                    };
                }
            }
        }
    }

    /// Returns the deepest node whose range contains `offset`.
    pub fn covering_node(&self, offset: TextSize) -> SyntaxNode {
        let mut node = self.clone();
        while let Some(child) = node.children().find(|child| child.text_range().contains(offset)) {
            node = child;
        }
        node
    }
}

impl PartialEq for SyntaxNode {
    fn eq(&self, other: &Self) -> bool {
        self.data.green.ptr_eq(&other.data.green) && self.data.offset == other.data.offset
    }
}

impl Eq for SyntaxNode {}

impl fmt::Debug for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{:?}", self.kind(), self.text_range())
    }
}

/// Writes the subtree as an indented `KIND@start..end` listing.
impl fmt::Display for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0usize;
        for event in self.preorder_with_tokens() {
            match event {
                WalkEventWithTokens::EnterNode(node) => {
                    writeln!(f, "{:indent$}{node:?}", "", indent = depth * 2)?;
                    depth += 1;
                }
                WalkEventWithTokens::Token(token) => {
                    writeln!(f, "{:indent$}{token}", "", indent = depth * 2)?;
                }
                WalkEventWithTokens::LeaveNode(_) => depth -= 1,
            }
        }
        Ok(())
    }
}

impl SyntaxNode {
    fn preorder_with_tokens(&self) -> PreorderWithTokens {
        PreorderWithTokens { stack: Vec::with_capacity(32), root: Some(self.clone()) }
    }
}

/// Token handle with its absolute offset and parent node.
#[derive(Clone, PartialEq, Eq)]
pub struct SyntaxToken {
    parent: SyntaxNode,
    green: GreenToken,
    offset: TextSize,
}

impl SyntaxToken {
    /// Returns this token's kind.
    #[inline]
    pub fn kind(&self) -> SyntaxKind {
        self.green.kind()
    }

    #[inline]
    pub fn text(&self) -> &str {
        self.green.text()
    }

    #[inline]
    pub fn text_range(&self) -> TextRange {
        TextRange::at(self.offset, self.green.text_len())
    }

    /// Returns `true` if this token is trivia.
    #[inline]
    pub fn is_trivia(&self) -> bool {
        self.kind().is_trivia()
    }

    #[inline]
    pub fn parent(&self) -> SyntaxNode {
        self.parent.clone()
    }

    #[inline]
    pub fn green(&self) -> &GreenToken {
        &self.green
    }
}

impl fmt::Debug for SyntaxToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{:?} {:?}", self.kind(), self.text_range(), self.text())
    }
}

impl fmt::Display for SyntaxToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Children of a node, tokens included.
#[derive(Clone)]
pub struct SyntaxElementChildren {
    parent: SyntaxNode,
    next_index: usize,
    next_offset: TextSize,
}

impl Iterator for SyntaxElementChildren {
    type Item = SyntaxElement;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next_index;
        let offset = self.next_offset;
        let child = self.parent.green().children().get(index)?;

        self.next_index += 1;
        self.next_offset += child.text_len();

        Some(match child {
            GreenElement::Node(node) => NodeOrToken::Node(SyntaxNode::new(
                node.clone(),
                offset,
                Some(self.parent.clone()),
                index,
            )),
            GreenElement::Token(token) => NodeOrToken::Token(SyntaxToken {
                parent: self.parent.clone(),
                green: token.clone(),
                offset,
            }),
        })
    }
}

/// Child nodes of a node.
#[derive(Clone)]
pub struct SyntaxNodeChildren {
    inner: SyntaxElementChildren,
}

impl Iterator for SyntaxNodeChildren {
    type Item = SyntaxNode;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.find_map(SyntaxElement::into_node)
    }
}

/// Preorder walk event for nodes.
#[derive(Clone, Debug)]
pub enum WalkEvent {
    Enter(SyntaxNode),
    Leave(SyntaxNode),
}

/// Preorder traversal over nodes.
#[derive(Clone)]
pub struct Preorder {
    stack: Vec<(SyntaxNode, SyntaxNodeChildren)>,
    root: Option<SyntaxNode>,
}

impl Preorder {
    /// Skips the current subtree during traversal.
    #[inline]
    pub fn skip_subtree(&mut self) {
        assert!(self.stack.pop().is_some(), "must have a subtree to skip");
    }
}

impl Iterator for Preorder {
    type Item = WalkEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let Some((_, active_node)) = self.stack.last_mut() else {
            let root = self.root.take()?;
            self.stack.push((root.clone(), root.children()));
            return Some(WalkEvent::Enter(root));
        };
        match active_node.next() {
            Some(child) => {
                self.stack.push((child.clone(), child.children()));
                Some(WalkEvent::Enter(child))
            }
            None => {
                let (exited, _) = self.stack.pop()?;
                Some(WalkEvent::Leave(exited))
            }
        }
    }
}

enum WalkEventWithTokens {
    EnterNode(SyntaxNode),
    LeaveNode(SyntaxNode),
    Token(SyntaxToken),
}

struct PreorderWithTokens {
    stack: Vec<(SyntaxNode, SyntaxElementChildren)>,
    root: Option<SyntaxNode>,
}

impl Iterator for PreorderWithTokens {
    type Item = WalkEventWithTokens;

    fn next(&mut self) -> Option<Self::Item> {
        let Some((_, active_node)) = self.stack.last_mut() else {
            let root = self.root.take()?;
            self.stack.push((root.clone(), root.children_with_tokens()));
            return Some(WalkEventWithTokens::EnterNode(root));
        };
        match active_node.next() {
            Some(NodeOrToken::Node(child)) => {
                self.stack.push((child.clone(), child.children_with_tokens()));
                Some(WalkEventWithTokens::EnterNode(child))
            }
            Some(NodeOrToken::Token(token)) => Some(WalkEventWithTokens::Token(token)),
            None => {
                let (exited, _) = self.stack.pop()?;
                Some(WalkEventWithTokens::LeaveNode(exited))
            }
        }
    }
}

/// There might be zero, one or two tokens at a given offset.
#[derive(Clone, Debug)]
pub enum TokenAtOffset<T> {
    /// No tokens at offset.
    None,
    /// Only a single token at offset.
    Single(T),
    /// Offset is exactly between two tokens.
    Between(T, T),
}

impl<T> TokenAtOffset<T> {
    /// Maps tokens to a different type.
    pub fn map<F: Fn(T) -> U, U>(self, f: F) -> TokenAtOffset<U> {
        match self {
            TokenAtOffset::None => TokenAtOffset::None,
            TokenAtOffset::Single(it) => TokenAtOffset::Single(f(it)),
            TokenAtOffset::Between(l, r) => TokenAtOffset::Between(f(l), f(r)),
        }
    }

    /// Convert to option, preferring the right token in case of a tie.
    pub fn right_biased(self) -> Option<T> {
        match self {
            Self::None => None,
            Self::Single(token) => Some(token),
            Self::Between(_, right) => Some(right),
        }
    }

    /// Convert to option, preferring the left token in case of a tie.
    pub fn left_biased(self) -> Option<T> {
        match self {
            Self::None => None,
            Self::Single(token) => Some(token),
            Self::Between(left, _) => Some(left),
        }
    }
}

impl<T> Iterator for TokenAtOffset<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        match std::mem::replace(self, Self::None) {
            Self::None => None,
            Self::Single(token) => Some(token),
            Self::Between(left, right) => {
                *self = Self::Single(right);
                Some(left)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::None => (0, Some(0)),
            Self::Single(_) => (1, Some(1)),
            Self::Between(_, _) => (2, Some(2)),
        }
    }
}

impl<T> ExactSizeIterator for TokenAtOffset<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: SyntaxKind, text: &str) -> GreenElement {
        NodeOrToken::Token(GreenToken::new(kind, text))
    }

    fn node(kind: SyntaxKind, children: Vec<GreenElement>) -> GreenElement {
        NodeOrToken::Node(GreenNode::new(kind, children))
    }

    // "NOP\nRTS"
    fn sample() -> SyntaxNode {
        let first = node(
            SyntaxKind::LINE,
            vec![
                node(SyntaxKind::INSTRUCTION, vec![token(SyntaxKind::MNEMONIC, "NOP")]),
                token(SyntaxKind::NEWLINE, "\n"),
            ],
        );
        let second = node(
            SyntaxKind::LINE,
            vec![node(SyntaxKind::INSTRUCTION, vec![token(SyntaxKind::MNEMONIC, "RTS")])],
        );
        SyntaxNode::new_root(GreenNode::new(SyntaxKind::SOURCE_FILE, vec![first, second]))
    }

    #[test]
    fn offsets_and_siblings() {
        let root = sample();
        let lines: Vec<_> = root.children().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].text_range(), TextRange::new(4.into(), 7.into()));
        assert_eq!(lines[0].next_sibling(), Some(lines[1].clone()));
        assert_eq!(lines[1].next_sibling(), None);
        assert_eq!(lines[1].parent(), Some(root.clone()));
        assert_eq!(root.text(), "NOP\nRTS");
    }

    #[test]
    fn token_lookup() {
        let root = sample();
        let single = root.token_at_offset(1.into()).collect::<Vec<_>>();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].text(), "NOP");

        let between = root.token_at_offset(3.into());
        let texts: Vec<_> = between.map(|token| token.text().to_owned()).collect();
        assert_eq!(texts, ["NOP", "\n"]);

        assert!(root.token_at_offset(8.into()).next().is_none());
    }

    #[test]
    fn covering_node_is_deepest() {
        let root = sample();
        assert_eq!(root.covering_node(5.into()).kind(), SyntaxKind::INSTRUCTION);
        assert_eq!(root.covering_node(3.into()).kind(), SyntaxKind::LINE);
        assert_eq!(root.covering_node(7.into()).kind(), SyntaxKind::SOURCE_FILE);
    }

    #[test]
    fn dump_format() {
        let expected = "\
SOURCE_FILE@0..7
  LINE@0..4
    INSTRUCTION@0..3
      MNEMONIC@0..3 \"NOP\"
    NEWLINE@3..4 \"\\n\"
  LINE@4..7
    INSTRUCTION@4..7
      MNEMONIC@4..7 \"RTS\"
";
        assert_eq!(sample().to_string(), expected);
        assert_eq!(sample().descendants().count(), 5);
    }
}
