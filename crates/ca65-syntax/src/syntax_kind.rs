macro_rules! syntax_kinds {
    (tokens { $($token:ident),* $(,)? } nodes { $($node:ident),* $(,)? }) => {
        /// Kind of a token or node.
        ///
        /// Token kinds come first so that `kind as u16` stays dense for the
        /// terminal range; grammar tables index on it.
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
        #[repr(u16)]
        pub enum SyntaxKind {
            $($token,)*
            $($node,)*
        }

        impl SyntaxKind {
            /// Every kind, ordered by discriminant.
            pub const ALL: &'static [SyntaxKind] =
                &[$(SyntaxKind::$token,)* $(SyntaxKind::$node,)*];

            /// Number of token kinds; tokens occupy `0..TOKEN_COUNT`.
            pub const TOKEN_COUNT: usize = [$(SyntaxKind::$token,)*].len();

            /// Returns the kind's name as written in tree dumps.
            pub const fn name(self) -> &'static str {
                match self {
                    $(SyntaxKind::$token => stringify!($token),)*
                    $(SyntaxKind::$node => stringify!($node),)*
                }
            }
        }
    };
}

syntax_kinds! {
    tokens {
        WHITESPACE,
        COMMENT,
        NEWLINE,
        EOF,
        UNKNOWN,

        HASH,
        COMMA,
        COLON,
        COLON2,
        COLON_EQ,
        EQ,
        L_PAREN,
        R_PAREN,
        IMM_L_PAREN,
        L_BRACE,
        R_BRACE,

        PLUS,
        MINUS,
        STAR,
        SLASH,
        AMP,
        AMP2,
        PIPE,
        PIPE2,
        CARET,
        TILDE,
        BANG,
        LT,
        GT,
        LT_EQ,
        GT_EQ,
        NEQ,
        SHL,
        SHR,

        NUMBER,
        STRING,
        CHAR,

        IDENT,
        LOCAL_NAME,
        UNNAMED_REF,

        MNEMONIC,
        REG_A,
        REG_X,
        REG_Y,
        ADDR_SIZE,
        SWITCH,

        DOT_MUL_OP,
        DOT_ADD_OP,
        DOT_AND_OP,
        DOT_OR_OP,
        DOT_NOT,
        SET_KW,
        PSEUDO_VAR,
        FUNCTION_KW,
        TOKEN_FUNCTION_KW,
        DIRECTIVE_KW,
        EXPR_DIRECTIVE_KW,
        SYMBOL_DIRECTIVE_KW,
        SEGMENT_KW,
        SWITCH_DIRECTIVE_KW,
        FEATURE_KW,
        MACRO_KW,
        DEFINE_KW,
        RAW_DIRECTIVE_KW,

        RAW_TEXT,
        MACRO_ARG,
        BRACED_TEXT,
        RAW_FUNC_ARG,
    }
    nodes {
        SOURCE_FILE,
        LINE,
        LABEL,
        UNNAMED_LABEL,
        CONSTANT_DEF,
        LABEL_DEF,
        VARIABLE_DEF,

        INSTRUCTION,
        OPERAND_IMMEDIATE,
        OPERAND_ACCUMULATOR,
        OPERAND_ADDRESS,
        OPERAND_INDEXED_X,
        OPERAND_INDEXED_Y,
        OPERAND_INDIRECT,
        OPERAND_INDEXED_INDIRECT,
        OPERAND_INDIRECT_INDEXED,

        MACRO_CALL,
        BRACED_ARG,
        DIRECTIVE,
        SYMBOL_ITEM,
        FEATURE_ITEM,
        PARAM_LIST,

        BINARY_EXPR,
        UNARY_EXPR,
        PAREN_EXPR,
        SCOPED_NAME,
        FUNCTION_CALL,

        ERROR,
    }
}

impl SyntaxKind {
    /// Returns `true` for whitespace and comments.
    #[inline]
    pub const fn is_trivia(self) -> bool {
        matches!(self, SyntaxKind::WHITESPACE | SyntaxKind::COMMENT)
    }

    /// Returns `true` if this kind is a terminal.
    #[inline]
    pub const fn is_token(self) -> bool {
        (self as usize) < Self::TOKEN_COUNT
    }

    /// Inverse of `kind as u16`.
    #[inline]
    pub fn from_raw(raw: u16) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }
}

impl std::fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::SyntaxKind;

    #[test]
    fn discriminants_follow_all() {
        for (index, kind) in SyntaxKind::ALL.iter().enumerate() {
            assert_eq!(*kind as usize, index);
            assert_eq!(SyntaxKind::from_raw(index as u16), Some(*kind));
        }
        assert_eq!(SyntaxKind::from_raw(SyntaxKind::ALL.len() as u16), None);
    }

    #[test]
    fn tokens_precede_nodes() {
        assert!(SyntaxKind::RAW_FUNC_ARG.is_token());
        assert!(!SyntaxKind::SOURCE_FILE.is_token());
        assert_eq!(SyntaxKind::SOURCE_FILE as usize, SyntaxKind::TOKEN_COUNT);
        assert_eq!(SyntaxKind::OPERAND_INDEXED_X.name(), "OPERAND_INDEXED_X");
    }
}
