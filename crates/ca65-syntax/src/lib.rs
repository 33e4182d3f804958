//! Lossless, immutable syntax tree for ca65 assembly sources.
//!
//! Green nodes are position independent and shared by reference between tree
//! versions; red nodes (`SyntaxNode`, `SyntaxToken`) are cheap cursors that
//! add parent pointers and absolute offsets on top of them.

mod edit;
mod error;
mod green;
mod red;
mod syntax_kind;
mod syntax_set;
mod tree;

/// Text edits and the offset map between tree versions.
pub use edit::{EditMap, EditRangeError, TextEdit};
/// Syntax errors recorded while parsing.
pub use error::{SyntaxError, SyntaxErrorKind};
/// Position-independent tree storage.
pub use green::{GreenElement, GreenNode, GreenToken, ParseOrigin};
/// Cursor API over a green tree.
pub use red::{
    NodeOrToken, Preorder, SyntaxElement, SyntaxElementChildren, SyntaxNode, SyntaxNodeChildren,
    SyntaxToken, TokenAtOffset, WalkEvent,
};
/// Token and node kinds used throughout the tree.
pub use syntax_kind::SyntaxKind;
/// Compact set for grouping `SyntaxKind` values.
pub use syntax_set::SyntaxSet;
pub use text_size::{TextRange, TextSize};
/// Versioned syntax tree snapshot.
pub use tree::SyntaxTree;
