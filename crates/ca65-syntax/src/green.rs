use std::{fmt, mem};

use text_size::TextSize;
use triomphe::Arc;

use crate::{NodeOrToken, SyntaxKind};

pub type GreenElement = NodeOrToken<GreenNode, GreenToken>;

impl GreenElement {
    #[inline]
    pub fn kind(&self) -> SyntaxKind {
        match self {
            NodeOrToken::Node(node) => node.kind(),
            NodeOrToken::Token(token) => token.kind(),
        }
    }

    #[inline]
    pub fn text_len(&self) -> TextSize {
        match self {
            NodeOrToken::Node(node) => node.text_len(),
            NodeOrToken::Token(token) => token.text_len(),
        }
    }

    #[inline]
    pub fn has_error(&self) -> bool {
        match self {
            NodeOrToken::Node(node) => node.has_error(),
            NodeOrToken::Token(token) => token.kind() == SyntaxKind::UNKNOWN,
        }
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NodeOrToken::Node(a), NodeOrToken::Node(b)) => a.ptr_eq(b),
            (NodeOrToken::Token(a), NodeOrToken::Token(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Parser state recorded on a node when it was reduced.
///
/// Only nodes carrying an origin are candidates for reuse by the incremental
/// parser. The origin does not take part in structural equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParseOrigin {
    /// LR state on top of the stack before the node's first token was shifted.
    pub state: u32,
    /// Grammar symbol the node was reduced to.
    pub symbol: u32,
    /// Bytes past the node's end the lexer inspected while the node was built.
    pub lookahead: TextSize,
    /// Set when the node was reduced while several parse heads were alive.
    pub fragile: bool,
}

#[derive(Clone)]
pub struct GreenNode {
    data: Arc<GreenNodeData>,
}

struct GreenNodeData {
    kind: SyntaxKind,
    text_len: TextSize,
    has_error: bool,
    origin: Option<ParseOrigin>,
    children: Box<[GreenElement]>,
}

impl GreenNode {
    pub fn new(kind: SyntaxKind, children: Vec<GreenElement>) -> Self {
        Self::with_origin(kind, children, None)
    }

    pub fn with_origin(
        kind: SyntaxKind,
        children: Vec<GreenElement>,
        origin: Option<ParseOrigin>,
    ) -> Self {
        let text_len = children.iter().map(GreenElement::text_len).sum();
        let has_error = kind == SyntaxKind::ERROR || children.iter().any(GreenElement::has_error);
        let data = GreenNodeData { kind, text_len, has_error, origin, children: children.into() };
        Self { data: Arc::new(data) }
    }

    #[inline]
    pub fn kind(&self) -> SyntaxKind {
        self.data.kind
    }

    #[inline]
    pub fn text_len(&self) -> TextSize {
        self.data.text_len
    }

    #[inline]
    pub fn children(&self) -> &[GreenElement] {
        &self.data.children
    }

    /// Returns `true` if this node is or contains an `ERROR` node or an
    /// `UNKNOWN` token.
    #[inline]
    pub fn has_error(&self) -> bool {
        self.data.has_error
    }

    #[inline]
    pub fn origin(&self) -> Option<ParseOrigin> {
        self.data.origin
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Tokens of this subtree in source order, trivia included.
    pub fn tokens(&self) -> impl Iterator<Item = &GreenToken> {
        let mut stack = vec![self.children().iter()];
        std::iter::from_fn(move || {
            loop {
                match stack.last_mut()?.next() {
                    Some(NodeOrToken::Node(node)) => stack.push(node.children().iter()),
                    Some(NodeOrToken::Token(token)) => return Some(token),
                    None => {
                        stack.pop();
                    }
                }
            }
        })
    }

    /// Returns the first non-trivia token in this subtree.
    pub fn first_token(&self) -> Option<&GreenToken> {
        self.tokens().find(|token| !token.kind().is_trivia())
    }

    pub(crate) fn write_text(&self, buf: &mut String) {
        for token in self.tokens() {
            buf.push_str(token.text());
        }
    }
}

// Trees may be nested arbitrarily deep, so comparing and dropping them walks
// an explicit stack instead of recursing.
impl PartialEq for GreenNode {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((a, b)) = pending.pop() {
            if a.ptr_eq(b) {
                continue;
            }
            if a.kind() != b.kind()
                || a.text_len() != b.text_len()
                || a.children().len() != b.children().len()
            {
                return false;
            }
            for pair in a.children().iter().zip(b.children()) {
                match pair {
                    (NodeOrToken::Node(a), NodeOrToken::Node(b)) => pending.push((a, b)),
                    (NodeOrToken::Token(a), NodeOrToken::Token(b)) if a == b => {}
                    _ => return false,
                }
            }
        }
        true
    }
}

impl Eq for GreenNode {}

impl Drop for GreenNodeData {
    fn drop(&mut self) {
        let mut orphans = mem::take(&mut self.children).into_vec();
        while let Some(child) = orphans.pop() {
            if let NodeOrToken::Node(node) = child {
                if let Ok(mut data) = Arc::try_unwrap(node.data) {
                    orphans.extend(mem::take(&mut data.children).into_vec());
                }
            }
        }
    }
}

impl fmt::Debug for GreenNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GreenNode")
            .field("kind", &self.kind())
            .field("text_len", &self.text_len())
            .field("children", &self.children().len())
            .finish()
    }
}

#[derive(Clone)]
pub struct GreenToken {
    data: Arc<GreenTokenData>,
}

struct GreenTokenData {
    kind: SyntaxKind,
    text: Box<str>,
}

impl GreenToken {
    pub fn new(kind: SyntaxKind, text: &str) -> Self {
        Self { data: Arc::new(GreenTokenData { kind, text: text.into() }) }
    }

    #[inline]
    pub fn kind(&self) -> SyntaxKind {
        self.data.kind
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.data.text
    }

    #[inline]
    pub fn text_len(&self) -> TextSize {
        TextSize::of(self.text())
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl PartialEq for GreenToken {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.kind() == other.kind() && self.text() == other.text())
    }
}

impl Eq for GreenToken {}

impl fmt::Debug for GreenToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:?}", self.kind(), self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: SyntaxKind, text: &str) -> GreenElement {
        NodeOrToken::Token(GreenToken::new(kind, text))
    }

    #[test]
    fn equality_ignores_origin() {
        let origin = ParseOrigin { state: 3, symbol: 7, lookahead: 1.into(), fragile: false };
        let a = GreenNode::with_origin(
            SyntaxKind::INSTRUCTION,
            vec![token(SyntaxKind::MNEMONIC, "NOP")],
            Some(origin),
        );
        let b = GreenNode::new(SyntaxKind::INSTRUCTION, vec![token(SyntaxKind::MNEMONIC, "NOP")]);

        assert!(!a.ptr_eq(&b));
        assert_eq!(a, b);
        assert_eq!(a.origin(), Some(origin));
        assert_eq!(b.origin(), None);
    }

    #[test]
    fn error_flag_propagates() {
        let error = GreenNode::new(SyntaxKind::ERROR, vec![token(SyntaxKind::COMMA, ",")]);
        let line = GreenNode::new(
            SyntaxKind::LINE,
            vec![NodeOrToken::Node(error), token(SyntaxKind::NEWLINE, "\n")],
        );
        assert!(line.has_error());
        assert_eq!(line.text_len(), TextSize::new(2));

        let unknown = GreenNode::new(SyntaxKind::LINE, vec![token(SyntaxKind::UNKNOWN, "`")]);
        assert!(unknown.has_error());
    }

    fn nested(depth: usize) -> GreenNode {
        let mut node = GreenNode::new(SyntaxKind::UNARY_EXPR, vec![token(SyntaxKind::NUMBER, "1")]);
        for _ in 0..depth {
            node = GreenNode::new(
                SyntaxKind::UNARY_EXPR,
                vec![token(SyntaxKind::MINUS, "-"), NodeOrToken::Node(node)],
            );
        }
        node
    }

    #[test]
    fn deep_trees_compare_and_drop() {
        let (a, b) = (nested(300_000), nested(300_000));
        assert_eq!(a, b);
        assert_ne!(a, nested(299_999));
        assert_eq!(a.first_token().map(GreenToken::text), Some("-"));
        assert_eq!(a.tokens().count(), 300_001);
        drop(a);
        drop(b);
    }

    #[test]
    fn first_token_skips_trivia() {
        let node = GreenNode::new(
            SyntaxKind::LINE,
            vec![token(SyntaxKind::WHITESPACE, "  "), token(SyntaxKind::MNEMONIC, "RTS")],
        );
        assert_eq!(node.first_token().map(GreenToken::text), Some("RTS"));
    }
}
