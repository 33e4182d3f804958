/// Knobs of the GLR driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParserConfig {
    /// Upper bound on parse stacks kept alive at once. Lower-scoring stacks
    /// are dropped first.
    pub max_heads: usize,
    /// How many stack frames error recovery may discard looking for a state
    /// that accepts the synchronising token.
    pub max_recovery_depth: usize,
    /// Whether [`reparse`](crate::Parser::reparse) reuses subtrees of the
    /// previous tree.
    pub reuse: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self { max_heads: 8, max_recovery_depth: 64, reuse: true }
    }
}

impl ParserConfig {
    pub fn with_max_heads(self, max_heads: usize) -> Self {
        Self { max_heads: max_heads.max(1), ..self }
    }

    pub fn with_max_recovery_depth(self, max_recovery_depth: usize) -> Self {
        Self { max_recovery_depth, ..self }
    }

    pub fn with_reuse(self, reuse: bool) -> Self {
        Self { reuse, ..self }
    }
}
