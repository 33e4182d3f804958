use std::collections::VecDeque;
use std::mem;

use ca65_grammar::{Action, Grammar, StateId};
use ca65_syntax::SyntaxKind::{self, *};
use ca65_syntax::{
    GreenElement, GreenNode, GreenToken, NodeOrToken, SyntaxError, SyntaxErrorKind, SyntaxSet,
};
use ca65_tokenizer::{Token, Tokenizer};
use text_size::TextSize;

use crate::ParserConfig;
use crate::reuse::ReuseCursor;
use crate::stack::{FrameKind, Head};

/// Bound on the reductions simulated while looking for a recovery point.
const MAX_SIMULATED_REDUCTIONS: usize = 256;

/// One GLR parse over a text.
pub(crate) struct Driver<'a> {
    grammar: &'a Grammar,
    config: ParserConfig,
    tokenizer: Tokenizer<'a>,
    reuse: Option<ReuseCursor<'a>>,
    heads: Vec<Head>,
    position: TextSize,
    errors: Vec<SyntaxError>,
    /// Set once more than one head is alive for the current token. Nodes
    /// reduced meanwhile are not reused later.
    forked: bool,
    reused: usize,
}

/// Heads after all reductions for one token.
#[derive(Default)]
struct Step {
    shifted: Vec<(Head, StateId)>,
    accepted: Option<Head>,
    failed: Vec<Head>,
}

enum Recovery {
    /// The stack was unwound to a state that accepts the token.
    Retry(Head),
    /// The token was wrapped into an `ERROR` node.
    Skipped(Head),
    /// Nothing can follow; the stack becomes the root.
    Finish(Head),
}

impl<'a> Driver<'a> {
    pub(crate) fn new(
        grammar: &'a Grammar,
        config: ParserConfig,
        text: &'a str,
        reuse: Option<ReuseCursor<'a>>,
    ) -> Self {
        Self {
            grammar,
            config,
            tokenizer: Tokenizer::new(text),
            reuse,
            heads: vec![Head::new()],
            position: TextSize::new(0),
            errors: Vec::new(),
            forked: false,
            reused: 0,
        }
    }

    pub(crate) fn run(mut self) -> (GreenNode, Vec<SyntaxError>) {
        let head = loop {
            let valid = self.valid_terminals();
            let token = self.tokenizer.token_at(self.position, &valid);
            if token.kind.is_trivia() {
                self.push_trivia(token);
                continue;
            }
            if let Some(head) = self.advance(token) {
                break head;
            }
        };

        if self.reuse.is_some() {
            log::debug!("reused {} subtrees", self.reused);
        }
        let root = GreenNode::new(SOURCE_FILE, head.into_elements());
        (root, self.errors)
    }

    fn valid_terminals(&self) -> SyntaxSet {
        self.heads.iter().fold(SyntaxSet::EMPTY, |set, head| {
            set.union(self.grammar.valid_terminals(head.state()))
        })
    }

    fn text(&self, token: &Token) -> &'a str {
        &self.tokenizer.text()[token.range]
    }

    fn element(&self, token: &Token) -> GreenElement {
        NodeOrToken::Token(GreenToken::new(token.kind, self.text(token)))
    }

    fn push_trivia(&mut self, token: Token) {
        let element = self.element(&token);
        for head in &mut self.heads {
            let state = head.state();
            head.push(state, FrameKind::Trivia, vec![element.clone()], token.range.end());
        }
        self.position = token.range.end();
    }

    /// Feeds one significant token to every head. Returns the accepted stack
    /// once the input is complete.
    fn advance(&mut self, token: Token) -> Option<Head> {
        let mut heads = mem::take(&mut self.heads);
        let mut retried = false;
        loop {
            // Kept in case no head survives a reduction the tables got wrong.
            let before = best(heads.iter().cloned());
            let step = self.process(heads, token);
            if let Some(head) = step.accepted {
                return Some(head);
            }
            if !step.shifted.is_empty() {
                self.shift(step.shifted, token);
                return None;
            }

            let head = best(step.failed).or(before).unwrap_or_else(Head::new);
            match self.recover(head, token, retried) {
                Recovery::Retry(head) => {
                    heads = vec![head];
                    retried = true;
                }
                Recovery::Skipped(head) => {
                    self.heads = vec![head];
                    self.position = token.range.end();
                    return None;
                }
                Recovery::Finish(head) => return Some(head),
            }
        }
    }

    /// Runs every reduction `token` triggers, breadth first, and sorts the
    /// resulting heads by what they do with the token.
    fn process(&mut self, heads: Vec<Head>, token: Token) -> Step {
        let lookahead_end = token.range.end() + TextSize::new(1);
        let mut step = Step::default();
        self.forked = heads.len() > 1;

        let mut pending = VecDeque::from(heads);
        while let Some(head) = pending.pop_front() {
            let state = head.state();
            let actions = self.grammar.actions(state, token.kind);
            if actions.is_empty() {
                step.failed.push(head);
                continue;
            }
            if actions.len() > 1 {
                self.forked = true;
                log::trace!("forking in state {state} on {}: {actions:?}", token.kind);
            }

            let mut head = Some(head);
            for (index, &action) in actions.iter().enumerate() {
                let current = if index + 1 == actions.len() { head.take() } else { head.clone() };
                let Some(current) = current else { break };
                match action {
                    Action::Shift(next) => step.shifted.push((current, next)),
                    Action::Reduce(rule) => {
                        match current.reduce(self.grammar, rule, lookahead_end, self.forked) {
                            Some(reduced) => pending.push_back(reduced),
                            None => {
                                log::warn!("rule {rule} does not fit the stack in state {state}")
                            }
                        }
                    }
                    Action::Accept => {
                        step.accepted = match step.accepted.take() {
                            Some(other) if other.score >= current.score => Some(other),
                            _ => Some(current),
                        };
                    }
                    Action::Error => step.failed.push(current),
                }
            }
        }
        step
    }

    fn shift(&mut self, shifted: Vec<(Head, StateId)>, token: Token) {
        if let [(head, _)] = shifted.as_slice() {
            if let Some((node, next)) = self.reusable(head.state(), &token) {
                let end = self.position + node.text_len();
                log::trace!("reusing {:?} at {:?}", node.kind(), self.position);
                self.heads = shifted.into_iter().map(|(head, _)| head).collect();
                for head in &mut self.heads {
                    head.push(next, FrameKind::Symbol, vec![NodeOrToken::Node(node.clone())], end);
                }
                self.position = end;
                self.reused += 1;
                return;
            }
        }

        let element = self.element(&token);
        let mut heads: Vec<Head> = Vec::with_capacity(shifted.len());
        for (mut head, state) in shifted {
            head.push(state, FrameKind::Symbol, vec![element.clone()], token.range.end());
            match heads.iter_mut().find(|other| other.state() == state) {
                Some(other) => {
                    log::trace!(
                        "merging heads in state {state} (scores {} and {})",
                        other.score,
                        head.score
                    );
                    if head.score > other.score {
                        *other = head;
                    }
                }
                None => heads.push(head),
            }
        }

        if heads.len() > self.config.max_heads {
            log::trace!("dropping {} heads", heads.len() - self.config.max_heads);
            heads.sort_by_key(|head| std::cmp::Reverse(head.score));
            heads.truncate(self.config.max_heads);
        }

        self.heads = heads;
        self.position = token.range.end();
    }

    fn reusable(&mut self, state: StateId, token: &Token) -> Option<(GreenNode, StateId)> {
        if self.forked {
            return None;
        }
        let text = self.text(token);
        let reuse = self.reuse.as_mut()?;
        reuse.take(self.grammar, self.position, state, token, text)
    }

    fn recover(&mut self, head: Head, token: Token, retried: bool) -> Recovery {
        let kind = token.kind;
        if !matches!(kind, NEWLINE | EOF) {
            return Recovery::Skipped(self.skip(head, token));
        }

        if !retried {
            let expected = *self.grammar.valid_terminals(head.state());
            let error = match kind {
                EOF => SyntaxErrorKind::UnexpectedEof { expected },
                _ => SyntaxErrorKind::UnexpectedEol { expected },
            };
            self.errors.push(SyntaxError::new(token.range, error));

            if let Some(depth) = self.sync_depth(&head, kind) {
                log::debug!("recovering at {:?}: unwinding {depth} frames", token.range);
                return Recovery::Retry(unwind(head, depth));
            }
        }

        match kind {
            EOF => {
                log::debug!("no state accepts the end of input, closing the tree");
                Recovery::Finish(head)
            }
            _ => Recovery::Skipped(self.skip(head, token)),
        }
    }

    /// Wraps an unexpected token into an `ERROR` node, extending the previous
    /// one if only trivia separates them.
    fn skip(&mut self, mut head: Head, token: Token) -> Head {
        let mut trivia = Vec::new();
        while head.top().kind == FrameKind::Trivia {
            match head.pop() {
                Some(frame) => trivia.push(frame),
                None => break,
            }
        }
        let state = head.state();

        let mut children = Vec::new();
        let extends = head.top().kind == FrameKind::Error;
        if extends {
            if let Some(error) = head.pop() {
                for element in error.elems {
                    match element {
                        NodeOrToken::Node(node) if node.kind() == ERROR => {
                            children.extend(node.children().iter().cloned());
                        }
                        element => children.push(element),
                    }
                }
            }
            children.extend(trivia.into_iter().rev().flat_map(|frame| frame.elems));
        } else {
            for frame in trivia.into_iter().rev() {
                head.push(state, FrameKind::Trivia, frame.elems, frame.end);
            }
        }
        children.push(self.element(&token));

        let end = token.range.end();
        let node = GreenNode::new(ERROR, children);
        head.push(state, FrameKind::Error, vec![NodeOrToken::Node(node)], end);

        if extends {
            if let Some(last) = self.errors.last_mut() {
                *last = SyntaxError::new(last.range().cover(token.range), last.kind().clone());
            }
        } else {
            let kind = match token.kind {
                UNKNOWN => SyntaxErrorKind::InvalidToken,
                found => {
                    let expected = *self.grammar.valid_terminals(state);
                    SyntaxErrorKind::UnexpectedToken { found, expected }
                }
            };
            log::debug!("skipping {} at {:?}", token.kind, token.range);
            self.errors.push(SyntaxError::new(token.range, kind));
        }
        head
    }

    /// Number of frames to pop until a state that can consume `kind` is on
    /// top.
    fn sync_depth(&self, head: &Head, kind: SyntaxKind) -> Option<usize> {
        let frames: Vec<_> = head.frames().collect();
        let limit = frames.len().min(self.config.max_recovery_depth + 1);
        (1..limit).find(|&depth| {
            !frames[depth].is_extra() && {
                let states = frames[depth..]
                    .iter()
                    .rev()
                    .filter(|frame| !frame.is_extra())
                    .map(|frame| frame.state)
                    .collect();
                self.consumes(states, kind)
            }
        })
    }

    /// Replays the preferred actions for `kind` on a stack of bare states.
    fn consumes(&self, mut states: Vec<StateId>, kind: SyntaxKind) -> bool {
        for _ in 0..MAX_SIMULATED_REDUCTIONS {
            let Some(&state) = states.last() else { return false };
            match self.grammar.action(state, kind) {
                Action::Shift(_) | Action::Accept => return true,
                Action::Error => return false,
                Action::Reduce(rule) => {
                    let rule = self.grammar.rule(rule);
                    let Some(len) = states.len().checked_sub(rule.rhs.len()) else { return false };
                    states.truncate(len);
                    let next = states.last().and_then(|&base| self.grammar.goto(base, rule.lhs));
                    let Some(next) = next else {
                        return false;
                    };
                    states.push(next);
                }
            }
        }
        false
    }
}

/// Pops `depth` frames and pushes them back as one `ERROR` node, keeping
/// leading and trailing trivia outside of it.
fn unwind(mut head: Head, depth: usize) -> Head {
    let mut popped = Vec::with_capacity(depth);
    for _ in 0..depth {
        match head.pop() {
            Some(frame) => popped.push(frame),
            None => break,
        }
    }
    popped.reverse();

    let state = head.state();
    let leading = popped.iter().take_while(|frame| frame.kind == FrameKind::Trivia).count();
    let trailing =
        popped[leading..].iter().rev().take_while(|frame| frame.kind == FrameKind::Trivia).count();
    let middle_len = popped.len() - leading - trailing;

    let mut frames = popped.into_iter();
    for frame in frames.by_ref().take(leading) {
        head.push(state, FrameKind::Trivia, frame.elems, frame.end);
    }

    let mut children = Vec::new();
    let mut end = None;
    for frame in frames.by_ref().take(middle_len) {
        end = Some(frame.end);
        for element in frame.elems {
            match element {
                NodeOrToken::Node(node) if frame.kind == FrameKind::Error => {
                    children.extend(node.children().iter().cloned());
                }
                element => children.push(element),
            }
        }
    }
    if let Some(end) = end.filter(|_| !children.is_empty()) {
        let node = GreenNode::new(ERROR, children);
        head.push(state, FrameKind::Error, vec![NodeOrToken::Node(node)], end);
    }

    for frame in frames {
        head.push(state, FrameKind::Trivia, frame.elems, frame.end);
    }
    head
}

/// The head with the highest score, the earliest one on ties.
fn best(heads: impl IntoIterator<Item = Head>) -> Option<Head> {
    heads.into_iter().reduce(|best, head| if head.score > best.score { head } else { best })
}
