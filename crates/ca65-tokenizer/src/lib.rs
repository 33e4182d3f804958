//! Context-sensitive tokenizer for ca65 sources.
//!
//! The tokenizer holds no position of its own: every call lexes one token at a
//! caller-supplied offset, steered by the set of terminals the parser can
//! accept there. Restarting at any offset is therefore free, which the
//! incremental parser relies on.

mod classes;
mod cursor;

pub use ca65_syntax::SyntaxKind;
use ca65_syntax::SyntaxKind::*;
use ca65_syntax::SyntaxSet;
use cursor::Cursor;
use line_index::LineIndex;
use text_size::{TextRange, TextSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub range: TextRange,
    /// Zero-based line of `range.start()`.
    pub line: u32,
    /// Zero-based UTF-8 column of `range.start()`.
    pub column: u32,
}

pub struct Tokenizer<'a> {
    text: &'a str,
    line_index: LineIndex,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, line_index: LineIndex::new(text) }
    }

    #[inline]
    pub fn text(&self) -> &'a str {
        self.text
    }

    #[inline]
    pub fn len(&self) -> TextSize {
        TextSize::of(self.text)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Lexes the token starting at `offset`.
    ///
    /// Returns an empty `EOF` token at the end of the text. An offset that is
    /// not on a char boundary yields a one-byte `UNKNOWN` token.
    pub fn token_at(&self, offset: TextSize, valid: &SyntaxSet) -> Token {
        let offset = offset.min(self.len());
        let (kind, len) = match self.text.get(usize::from(offset)..) {
            None => (UNKNOWN, self.char_tail(offset)),
            Some("") => (EOF, TextSize::new(0)),
            Some(rest) => self.lex(rest, offset, valid),
        };
        let position = self.line_index.line_col(offset);
        Token { kind, range: TextRange::at(offset, len), line: position.line, column: position.col }
    }

    /// Lexes the whole text with a fixed set of valid terminals, ending with
    /// the `EOF` token.
    pub fn tokens(&self, valid: SyntaxSet) -> impl Iterator<Item = Token> + '_ {
        let mut offset = Some(TextSize::new(0));
        std::iter::from_fn(move || {
            let token = self.token_at(offset?, &valid);
            offset = (token.kind != EOF).then(|| token.range.end());
            Some(token)
        })
    }

    fn lex(&self, rest: &str, offset: TextSize, valid: &SyntaxSet) -> (SyntaxKind, TextSize) {
        let mut cursor = Cursor::new(rest);
        let first = cursor.advance();

        let kind = match first {
            '\n' => NEWLINE,
            '\r' if cursor.peek() == '\n' => {
                cursor.advance();
                NEWLINE
            }
            ';' => {
                cursor.advance_line();
                COMMENT
            }
            c if is_whitespace(c) => {
                cursor.advance_while(|c| is_whitespace(c) && c != '\r');
                while cursor.peek() == '\r' && cursor.second() != '\n' {
                    cursor.advance();
                    cursor.advance_while(|c| is_whitespace(c) && c != '\r');
                }
                WHITESPACE
            }
            _ => {
                let mut fixed = cursor.clone();
                let kind = self.fixed_token(&mut fixed, first, offset, valid);
                if !valid.contains(kind) {
                    if let Some(raw) = raw_kind(valid) {
                        if let Some(len) = raw_len(rest, raw) {
                            return (raw, len);
                        }
                    }
                }
                cursor = fixed;
                kind
            }
        };

        (kind, cursor.pos())
    }

    fn fixed_token(
        &self,
        cursor: &mut Cursor<'_>,
        first: char,
        offset: TextSize,
        valid: &SyntaxSet,
    ) -> SyntaxKind {
        match first {
            '#' => HASH,
            ',' => COMMA,
            '(' if valid.contains(IMM_L_PAREN) && !self.follows_whitespace(offset) => IMM_L_PAREN,
            '(' => L_PAREN,
            ')' => R_PAREN,
            '{' => L_BRACE,
            '}' => R_BRACE,
            '=' => EQ,
            '+' => PLUS,
            '-' => MINUS,
            '*' => STAR,
            '/' => SLASH,
            '~' => TILDE,
            '!' => BANG,
            '^' => CARET,
            '&' if cursor.eat('&') => AMP2,
            '&' => AMP,
            '|' if cursor.eat('|') => PIPE2,
            '|' => PIPE,
            '<' if cursor.eat('=') => LT_EQ,
            '<' if cursor.eat('>') => NEQ,
            '<' if cursor.eat('<') => SHL,
            '<' => LT,
            '>' if cursor.eat('=') => GT_EQ,
            '>' if cursor.eat('>') => SHR,
            '>' => GT,
            ':' => colon(cursor, valid),
            '$' => digits(cursor, |c| c.is_ascii_hexdigit()),
            '%' => digits(cursor, |c| matches!(c, '0' | '1')),
            '0'..='9' => {
                cursor.advance_while(|c| c.is_ascii_digit());
                NUMBER
            }
            '"' => quoted(cursor, '"', STRING),
            '\'' => quoted(cursor, '\'', CHAR),
            '.' if is_ident_start(cursor.peek()) => {
                cursor.advance_while(is_ident_continue);
                classes::dot_keyword(&cursor.consumed()[1..]).unwrap_or(UNKNOWN)
            }
            '@' if is_ident_start(cursor.peek()) => {
                cursor.advance_while(is_ident_continue);
                LOCAL_NAME
            }
            c if is_ident_start(c) => {
                cursor.advance_while(is_ident_continue);
                word_kind(cursor.consumed(), valid)
            }
            _ => UNKNOWN,
        }
    }

    /// Bytes up to the next char boundary after a mid-char `offset`.
    fn char_tail(&self, offset: TextSize) -> TextSize {
        let start = usize::from(offset);
        let end = (start + 1..=self.text.len())
            .find(|index| self.text.is_char_boundary(*index))
            .unwrap_or(self.text.len());
        TextSize::new((end - start) as u32)
    }

    fn follows_whitespace(&self, offset: TextSize) -> bool {
        let offset = usize::from(offset);
        offset > 0 && matches!(self.text.as_bytes().get(offset - 1), Some(b' ' | b'\t'))
    }
}

fn word_kind(word: &str, valid: &SyntaxSet) -> SyntaxKind {
    let register =
        |name: &str, kind: SyntaxKind| valid.contains(kind) && word.eq_ignore_ascii_case(name);

    if valid.contains(MNEMONIC) && classes::is_mnemonic(word) {
        MNEMONIC
    } else if register("a", REG_A) {
        REG_A
    } else if register("x", REG_X) {
        REG_X
    } else if register("y", REG_Y) {
        REG_Y
    } else if valid.contains(ADDR_SIZE) && classes::is_addr_size(word) {
        ADDR_SIZE
    } else if valid.contains(SWITCH) && classes::is_switch(word) {
        SWITCH
    } else {
        IDENT
    }
}

fn colon(cursor: &mut Cursor<'_>, valid: &SyntaxSet) -> SyntaxKind {
    let prefer = |long: SyntaxKind| valid.contains(long) || !valid.contains(COLON);
    match cursor.peek() {
        ':' if prefer(COLON2) => {
            cursor.advance();
            COLON2
        }
        '=' if prefer(COLON_EQ) => {
            cursor.advance();
            COLON_EQ
        }
        sign @ ('+' | '-') if valid.contains(UNNAMED_REF) => {
            cursor.advance_while(|c| c == sign);
            UNNAMED_REF
        }
        _ => COLON,
    }
}

fn digits(cursor: &mut Cursor<'_>, is_digit: impl Fn(char) -> bool + Copy) -> SyntaxKind {
    if !is_digit(cursor.peek()) {
        return UNKNOWN;
    }
    cursor.advance_while(is_digit);
    NUMBER
}

fn quoted(cursor: &mut Cursor<'_>, quote: char, kind: SyntaxKind) -> SyntaxKind {
    while !cursor.is_eof() && !cursor.at_newline() {
        if cursor.advance() == quote {
            return kind;
        }
    }
    UNKNOWN
}

fn raw_kind(valid: &SyntaxSet) -> Option<SyntaxKind> {
    [BRACED_TEXT, RAW_FUNC_ARG, MACRO_ARG, RAW_TEXT].into_iter().find(|kind| valid.contains(*kind))
}

/// Length of the raw token of `kind` at the start of `rest`, or `None` if it
/// would be empty. Trailing whitespace is left for the trivia lexer.
fn raw_len(rest: &str, kind: SyntaxKind) -> Option<TextSize> {
    let mut depth = 0u32;
    let mut quote = None;
    let mut end = 0;

    for (index, c) in rest.char_indices() {
        if c == '\n' || (c == '\r' && rest[index..].starts_with("\r\n")) {
            break;
        }
        if let Some(open) = quote {
            if c == open {
                quote = None;
            }
            end = index + c.len_utf8();
            continue;
        }
        let stop = match (kind, c) {
            (BRACED_TEXT, '}') => true,
            (_, '"' | '\'') if kind != BRACED_TEXT => {
                quote = Some(c);
                false
            }
            (BRACED_TEXT, _) => false,
            (_, ';') => true,
            (MACRO_ARG, ',') => true,
            (RAW_FUNC_ARG, ',' | ')') if depth == 0 => true,
            (RAW_FUNC_ARG, '(') => {
                depth += 1;
                false
            }
            (RAW_FUNC_ARG, ')') => {
                depth -= 1;
                false
            }
            _ => false,
        };
        if stop {
            break;
        }
        if !is_whitespace(c) {
            end = index + c.len_utf8();
        }
    }

    (end > 0).then(|| TextSize::new(end as u32))
}

fn is_whitespace(c: char) -> bool {
    c != '\n' && c.is_whitespace()
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests;
