use std::str::Chars;

use text_size::{TextLen, TextSize};

pub(crate) const EOF_CHAR: char = '\0';

#[derive(Clone)]
pub(crate) struct Cursor<'a> {
    text: &'a str,
    chars: Chars<'a>,
    len: TextSize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self { text, chars: text.chars(), len: text.text_len() }
    }

    fn remaining(&self) -> TextSize {
        self.chars.as_str().text_len()
    }

    /// Bytes consumed since the cursor was created.
    pub(crate) fn pos(&self) -> TextSize {
        self.len - self.remaining()
    }

    /// Text consumed since the cursor was created.
    pub(crate) fn consumed(&self) -> &'a str {
        &self.text[..usize::from(self.pos())]
    }

    pub(crate) fn peek(&self) -> char {
        self.chars.clone().next().unwrap_or(EOF_CHAR)
    }

    pub(crate) fn second(&self) -> char {
        let mut chars = self.chars.clone();
        chars.next();
        chars.next().unwrap_or(EOF_CHAR)
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    pub(crate) fn advance(&mut self) -> char {
        self.chars.next().unwrap_or(EOF_CHAR)
    }

    pub(crate) fn eat(&mut self, c: char) -> bool {
        let matches = self.peek() == c;
        if matches {
            self.advance();
        }
        matches
    }

    pub(crate) fn advance_while(&mut self, f: impl Fn(char) -> bool + Copy) {
        while !self.is_eof() && f(self.peek()) {
            self.advance();
        }
    }

    /// Consumes up to the end of the line, leaving `\n` (or `\r\n`) in place.
    pub(crate) fn advance_line(&mut self) {
        while !self.is_eof() && !self.at_newline() {
            self.advance();
        }
    }

    pub(crate) fn at_newline(&self) -> bool {
        match self.peek() {
            '\n' => true,
            '\r' => self.second() == '\n',
            _ => false,
        }
    }
}
