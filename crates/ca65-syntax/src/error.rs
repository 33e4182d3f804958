use text_size::TextRange;

use crate::{SyntaxKind, SyntaxSet};

/// A recovered parse error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntaxError {
    range: TextRange,
    kind: SyntaxErrorKind,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxErrorKind {
    #[error("unexpected {found}, expected {expected}")]
    UnexpectedToken { found: SyntaxKind, expected: SyntaxSet },
    #[error("unexpected end of line, expected {expected}")]
    UnexpectedEol { expected: SyntaxSet },
    #[error("unexpected end of file, expected {expected}")]
    UnexpectedEof { expected: SyntaxSet },
    #[error("invalid token")]
    InvalidToken,
}

impl SyntaxError {
    #[inline]
    pub fn new(range: TextRange, kind: SyntaxErrorKind) -> Self {
        Self { range, kind }
    }

    #[inline]
    pub fn range(&self) -> TextRange {
        self.range
    }

    #[inline]
    pub fn kind(&self) -> &SyntaxErrorKind {
        &self.kind
    }

    #[inline]
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {:?}", self.kind, self.range)
    }
}

impl std::error::Error for SyntaxError {}
