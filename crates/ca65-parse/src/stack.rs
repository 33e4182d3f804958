//! Persistent parse stacks.
//!
//! Every live GLR head owns a linked list of frames. Forked heads share the
//! frames below the fork point; popping a frame that no other head sees moves
//! its elements instead of cloning them.

use std::mem;

use ca65_grammar::{Grammar, RuleId, StateId};
use ca65_syntax::{GreenElement, GreenNode, NodeOrToken, ParseOrigin};
use text_size::TextSize;
use triomphe::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FrameKind {
    /// A shifted token, a reduced rule or a reused subtree.
    Symbol,
    /// Whitespace or a comment. Invisible to the automaton.
    Trivia,
    /// Input discarded by error recovery, held in a single `ERROR` node.
    Error,
}

#[derive(Clone)]
pub(crate) struct Frame {
    pub(crate) state: StateId,
    pub(crate) kind: FrameKind,
    /// Hidden rules leave several elements, empty ones none.
    pub(crate) elems: Vec<GreenElement>,
    /// Offset just past the frame's text.
    pub(crate) end: TextSize,
    prev: Option<Arc<Frame>>,
}

impl Frame {
    #[inline]
    pub(crate) fn is_extra(&self) -> bool {
        self.kind != FrameKind::Symbol
    }
}

#[derive(Clone)]
pub(crate) struct Head {
    top: Arc<Frame>,
    /// Sum of the dynamic precedence of every rule reduced on this stack.
    pub(crate) score: i32,
}

impl Drop for Head {
    // Unlinks frames no other head shares one at a time; a long chain would
    // otherwise be dropped recursively.
    fn drop(&mut self) {
        let mut next = Arc::get_mut(&mut self.top).and_then(|frame| frame.prev.take());
        while let Some(mut frame) = next {
            next = Arc::get_mut(&mut frame).and_then(|frame| frame.prev.take());
        }
    }
}

impl Head {
    pub(crate) fn new() -> Self {
        let bottom = Frame {
            state: Grammar::START_STATE,
            kind: FrameKind::Symbol,
            elems: Vec::new(),
            end: TextSize::new(0),
            prev: None,
        };
        Self { top: Arc::new(bottom), score: 0 }
    }

    #[inline]
    pub(crate) fn state(&self) -> StateId {
        self.top.state
    }

    #[inline]
    pub(crate) fn top(&self) -> &Frame {
        &self.top
    }

    /// Frames from the top of the stack down to the bottom.
    pub(crate) fn frames(&self) -> impl Iterator<Item = &Frame> {
        std::iter::successors(Some(&*self.top), |frame| frame.prev.as_deref())
    }

    pub(crate) fn push(
        &mut self,
        state: StateId,
        kind: FrameKind,
        elems: Vec<GreenElement>,
        end: TextSize,
    ) {
        let frame = Frame { state, kind, elems, end, prev: Some(self.top.clone()) };
        self.top = Arc::new(frame);
    }

    /// Removes the top frame. The bottom frame is never popped.
    pub(crate) fn pop(&mut self) -> Option<Frame> {
        let prev = self.top.prev.clone()?;
        let top = mem::replace(&mut self.top, prev);
        let mut frame = Arc::try_unwrap(top).unwrap_or_else(|shared| Frame::clone(&shared));
        frame.prev = None;
        Some(frame)
    }

    /// Applies `rule`, building its node from the popped frames.
    ///
    /// Trivia and error frames between the popped symbols become children of
    /// the node; those on top of the stack stay outside of it and are pushed
    /// back above the new frame. `lookahead_end` is the first offset the
    /// lexer did not look at when it produced the token that triggered the
    /// reduction.
    ///
    /// Returns `None` if the tables do not fit the stack.
    pub(crate) fn reduce(
        mut self,
        grammar: &Grammar,
        rule_id: RuleId,
        lookahead_end: TextSize,
        fragile: bool,
    ) -> Option<Self> {
        let rule = grammar.rule(rule_id);

        let mut trailing = Vec::new();
        if !rule.rhs.is_empty() {
            while self.top.is_extra() {
                trailing.push(self.pop()?);
            }
        }

        let end = self.top.end;
        let mut parts = Vec::with_capacity(rule.rhs.len());
        let mut remaining = rule.rhs.len();
        while remaining > 0 {
            let frame = self.pop()?;
            if !frame.is_extra() {
                remaining -= 1;
            }
            parts.push(frame.elems);
        }

        let mut parts = parts.into_iter().rev();
        let mut elems = parts.next().unwrap_or_default();
        for part in parts {
            elems.extend(part);
        }

        let base = self.state();
        if let Some(kind) = rule.kind {
            let origin = ParseOrigin {
                state: base,
                symbol: rule.lhs.raw(),
                lookahead: lookahead_end.checked_sub(end).unwrap_or_default(),
                fragile,
            };
            elems = vec![NodeOrToken::Node(GreenNode::with_origin(kind, elems, Some(origin)))];
        }

        let state = grammar.goto(base, rule.lhs)?;
        self.push(state, FrameKind::Symbol, elems, end);
        for frame in trailing.into_iter().rev() {
            self.push(state, frame.kind, frame.elems, frame.end);
        }
        self.score += rule.dynamic;
        Some(self)
    }

    /// Drains the stack into the children of the root node.
    pub(crate) fn into_elements(mut self) -> Vec<GreenElement> {
        let mut parts = Vec::new();
        while let Some(frame) = self.pop() {
            parts.push(frame.elems);
        }
        parts.into_iter().rev().flatten().collect()
    }
}
