use std::fmt;
use std::sync::Arc;

use text_size::{TextRange, TextSize};

use crate::{
    EditMap, EditRangeError, GreenElement, GreenNode, NodeOrToken, SyntaxError, SyntaxKind,
    SyntaxNode, SyntaxToken, TextEdit, TokenAtOffset,
};

/// Immutable snapshot of a parsed document.
///
/// Editing a tree yields a new snapshot that shares every node with the old
/// one; the nodes keep describing the text that was parsed, and
/// [`SyntaxTree::edit_map`] tells which of their bytes survive in the edited
/// text. Reparsing resets the map.
#[derive(Clone)]
pub struct SyntaxTree {
    root: GreenNode,
    errors: Arc<[SyntaxError]>,
    edits: EditMap,
    version: u64,
}

impl SyntaxTree {
    pub fn new(root: GreenNode, errors: Vec<SyntaxError>, version: u64) -> Self {
        let edits = EditMap::identity(root.text_len());
        Self { root, errors: errors.into(), edits, version }
    }

    /// Returns the root syntax node.
    #[inline]
    pub fn root(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.root.clone())
    }

    #[inline]
    pub fn green(&self) -> &GreenNode {
        &self.root
    }

    /// Length of the text this tree describes after pending edits.
    #[inline]
    pub fn text_len(&self) -> TextSize {
        self.edits.len()
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    #[inline]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.root.has_error()
    }

    #[inline]
    pub fn edit_map(&self) -> &EditMap {
        &self.edits
    }

    /// Returns `true` if edits were applied since the last parse.
    #[inline]
    pub fn is_edited(&self) -> bool {
        !self.edits.is_identity()
    }

    /// Reconstructs the parsed source text.
    pub fn text(&self) -> String {
        self.root().text()
    }

    /// Records the replacement of `range` with `new_len` bytes; the result is
    /// a new version sharing all nodes.
    #[inline]
    pub fn edit(&self, range: TextRange, new_len: TextSize) -> Result<Self, EditRangeError> {
        self.apply_edit(&TextEdit::new(range, new_len))
    }

    pub fn apply_edit(&self, edit: &TextEdit) -> Result<Self, EditRangeError> {
        let edits = self.edits.apply(edit)?;
        Ok(Self {
            root: self.root.clone(),
            errors: self.errors.clone(),
            edits,
            version: self.version + 1,
        })
    }

    /// Returns the deepest node containing `offset`, or `None` if the offset
    /// lies past the end of the text.
    ///
    /// Like [`SyntaxTree::token_at`], this looks at the nodes as parsed:
    /// after [`SyntaxTree::edit`] the offset still refers to the old text,
    /// not to the [`SyntaxTree::text_len`] bytes of the edited one.
    /// [`EditMap::map_offset`] maps the nodes' offsets into the edited text.
    pub fn node_at(&self, offset: TextSize) -> Option<SyntaxNode> {
        if offset > self.root.text_len() {
            return None;
        }
        Some(self.root().covering_node(offset))
    }

    /// Finds the token(s) touching `offset`.
    #[inline]
    pub fn token_at(&self, offset: TextSize) -> TokenAtOffset<SyntaxToken> {
        self.root().token_at_offset(offset)
    }

    /// Iterates over the `ERROR` nodes of the tree in source order.
    pub fn error_nodes(&self) -> impl Iterator<Item = SyntaxNode> + use<> {
        self.root().descendants().filter(|node| node.kind() == SyntaxKind::ERROR)
    }

    /// Ranges of `other` covered by subtrees that differ from this tree.
    ///
    /// Subtrees shared by reference or equal in structure are skipped, so two
    /// trees from an incremental reparse only report the edited region.
    pub fn changed_ranges(&self, other: &SyntaxTree) -> Vec<TextRange> {
        let mut ranges = Vec::new();
        diff_nodes(&self.root, &other.root, TextSize::new(0), &mut ranges);
        ranges
    }
}

fn same(a: &GreenElement, b: &GreenElement) -> bool {
    a.ptr_eq(b) || a == b
}

fn diff_nodes(old: &GreenNode, new: &GreenNode, offset: TextSize, out: &mut Vec<TextRange>) {
    let (mut old, mut new, mut offset) = (old, new, offset);
    loop {
        if old.ptr_eq(new) || old == new {
            return;
        }
        if old.kind() != new.kind() {
            out.push(TextRange::at(offset, new.text_len()));
            return;
        }

        let (old_children, new_children) = (old.children(), new.children());
        let max = old_children.len().min(new_children.len());

        let prefix = old_children.iter().zip(new_children).take_while(|(a, b)| same(a, b)).count();
        let suffix = old_children[prefix..]
            .iter()
            .rev()
            .zip(new_children[prefix..].iter().rev())
            .take(max - prefix)
            .take_while(|(a, b)| same(a, b))
            .count();

        let start =
            offset + new_children[..prefix].iter().map(GreenElement::text_len).sum::<TextSize>();
        let old_middle = &old_children[prefix..old_children.len() - suffix];
        let new_middle = &new_children[prefix..new_children.len() - suffix];

        match (old_middle, new_middle) {
            ([NodeOrToken::Node(a)], [NodeOrToken::Node(b)]) if a.kind() == b.kind() => {
                (old, new, offset) = (a, b, start);
            }
            _ => {
                let len = new_middle.iter().map(GreenElement::text_len).sum();
                out.push(TextRange::at(start, len));
                return;
            }
        }
    }
}

impl PartialEq for SyntaxTree {
    fn eq(&self, other: &Self) -> bool {
        self.edits == other.edits && self.root == other.root
    }
}

impl Eq for SyntaxTree {}

impl fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("text_len", &self.text_len())
            .field("version", &self.version)
            .field("errors", &self.errors.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.root(), f)
    }
}

unsafe impl salsa::Update for SyntaxTree {
    unsafe fn maybe_update(old_pointer: *mut Self, new_value: Self) -> bool {
        let old_value = unsafe { &mut *old_pointer };
        if old_value.root.ptr_eq(&new_value.root) && old_value.edits == new_value.edits {
            false
        } else {
            *old_value = new_value;
            true
        }
    }
}
