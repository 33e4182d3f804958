use ca65_syntax::SyntaxSet;

use super::*;

fn lex(text: &str, valid: SyntaxSet) -> Vec<(SyntaxKind, &str)> {
    Tokenizer::new(text)
        .tokens(valid)
        .filter(|token| token.kind != EOF)
        .map(|token| (token.kind, &text[token.range]))
        .collect()
}

#[test]
fn instruction_line() {
    let valid = SyntaxSet::new([MNEMONIC, HASH, NUMBER]);
    assert_eq!(
        lex("LDA #$01 ; load\n", valid),
        [
            (MNEMONIC, "LDA"),
            (WHITESPACE, " "),
            (HASH, "#"),
            (NUMBER, "$01"),
            (WHITESPACE, " "),
            (COMMENT, "; load"),
            (NEWLINE, "\n"),
        ]
    );
}

#[test]
fn numbers() {
    let inputs = [("123", NUMBER), ("$1f", NUMBER), ("$C000", NUMBER), ("%1010", NUMBER)];
    for (input, expected) in inputs {
        assert_eq!(lex(input, SyntaxSet::EMPTY), [(expected, input)], "{input}");
    }
    assert_eq!(lex("$", SyntaxSet::EMPTY), [(UNKNOWN, "$")]);
    assert_eq!(lex("%2", SyntaxSet::EMPTY), [(UNKNOWN, "%"), (NUMBER, "2")]);
}

#[test]
fn contextual_keywords() {
    assert_eq!(lex("lda", SyntaxSet::new([IDENT])), [(IDENT, "lda")]);
    assert_eq!(lex("lda", SyntaxSet::new([IDENT, MNEMONIC])), [(MNEMONIC, "lda")]);
    assert_eq!(lex("A", SyntaxSet::new([IDENT, REG_A])), [(REG_A, "A")]);
    assert_eq!(lex("x", SyntaxSet::new([IDENT, REG_A])), [(IDENT, "x")]);
    assert_eq!(lex("zp", SyntaxSet::new([ADDR_SIZE])), [(ADDR_SIZE, "zp")]);
    assert_eq!(lex("on", SyntaxSet::new([SWITCH])), [(SWITCH, "on")]);
}

#[test]
fn colons() {
    assert_eq!(lex(":+", SyntaxSet::new([UNNAMED_REF])), [(UNNAMED_REF, ":+")]);
    assert_eq!(lex(":--", SyntaxSet::new([UNNAMED_REF])), [(UNNAMED_REF, ":--")]);
    assert_eq!(lex(":+", SyntaxSet::new([COLON])), [(COLON, ":"), (PLUS, "+")]);
    assert_eq!(
        lex("foo::bar", SyntaxSet::new([IDENT, COLON2])),
        [(IDENT, "foo"), (COLON2, "::"), (IDENT, "bar")]
    );
    assert_eq!(lex(":=", SyntaxSet::new([COLON, COLON_EQ])), [(COLON_EQ, ":=")]);
    assert_eq!(lex(":=", SyntaxSet::new([COLON])), [(COLON, ":"), (EQ, "=")]);
}

#[test]
fn operators() {
    assert_eq!(
        lex("<= <> << < >= >> && || ^ ~ !", SyntaxSet::EMPTY)
            .into_iter()
            .filter(|(kind, _)| *kind != WHITESPACE)
            .map(|(kind, _)| kind)
            .collect::<Vec<_>>(),
        [LT_EQ, NEQ, SHL, LT, GT_EQ, SHR, AMP2, PIPE2, CARET, TILDE, BANG]
    );
}

#[test]
fn dot_keywords() {
    let kinds: Vec<_> = lex(".byte .ENDPROC .mod .sizeof .left .cpu .bogus", SyntaxSet::EMPTY)
        .into_iter()
        .filter(|(kind, _)| *kind != WHITESPACE)
        .map(|(kind, _)| kind)
        .collect();
    assert_eq!(
        kinds,
        [
            EXPR_DIRECTIVE_KW,
            DIRECTIVE_KW,
            DOT_MUL_OP,
            FUNCTION_KW,
            TOKEN_FUNCTION_KW,
            PSEUDO_VAR,
            UNKNOWN
        ]
    );
}

#[test]
fn literals() {
    assert_eq!(lex("\"a;b\"", SyntaxSet::EMPTY), [(STRING, "\"a;b\"")]);
    assert_eq!(lex("'x'", SyntaxSet::EMPTY), [(CHAR, "'x'")]);
    assert_eq!(lex("\"abc\n", SyntaxSet::EMPTY), [(UNKNOWN, "\"abc"), (NEWLINE, "\n")]);
    assert_eq!(lex("`", SyntaxSet::EMPTY), [(UNKNOWN, "`")]);
}

#[test]
fn raw_text() {
    let valid = SyntaxSet::new([RAW_TEXT, IMM_L_PAREN, NEWLINE]);
    assert_eq!(
        lex("  value (1, 2) ; c\n", valid),
        [
            (WHITESPACE, "  "),
            (RAW_TEXT, "value (1, 2)"),
            (WHITESPACE, " "),
            (COMMENT, "; c"),
            (NEWLINE, "\n"),
        ]
    );
    assert_eq!(lex("\"a;b\" x", valid), [(RAW_TEXT, "\"a;b\" x")]);
}

#[test]
fn immediate_paren_needs_adjacency() {
    let valid = SyntaxSet::new([IMM_L_PAREN, RAW_TEXT]);
    let tokenizer = Tokenizer::new("FOO(a)");
    assert_eq!(tokenizer.token_at(3.into(), &valid).kind, IMM_L_PAREN);

    let tokenizer = Tokenizer::new("FOO (a)");
    let token = tokenizer.token_at(4.into(), &valid);
    assert_eq!((token.kind, &tokenizer.text()[token.range]), (RAW_TEXT, "(a)"));
}

#[test]
fn macro_arguments() {
    let valid = SyntaxSet::new([MACRO_ARG, COMMA, L_BRACE, NEWLINE]);
    assert_eq!(
        lex("1+2, (x), y ;c\n", valid),
        [
            (MACRO_ARG, "1+2"),
            (COMMA, ","),
            (WHITESPACE, " "),
            (MACRO_ARG, "(x)"),
            (COMMA, ","),
            (WHITESPACE, " "),
            (MACRO_ARG, "y"),
            (WHITESPACE, " "),
            (COMMENT, ";c"),
            (NEWLINE, "\n"),
        ]
    );
}

#[test]
fn braced_text() {
    let valid = SyntaxSet::new([L_BRACE, BRACED_TEXT, R_BRACE]);
    assert_eq!(
        lex("{a, b; c}", valid),
        [(L_BRACE, "{"), (BRACED_TEXT, "a, b; c"), (R_BRACE, "}")]
    );
}

#[test]
fn token_function_arguments() {
    let valid = SyntaxSet::new([RAW_FUNC_ARG, COMMA, R_PAREN, L_BRACE]);
    assert_eq!(
        lex("a (b, c), d)", valid),
        [
            (RAW_FUNC_ARG, "a (b, c)"),
            (COMMA, ","),
            (WHITESPACE, " "),
            (RAW_FUNC_ARG, "d"),
            (R_PAREN, ")"),
        ]
    );
}

#[test]
fn line_endings_and_positions() {
    let valid = SyntaxSet::new([MNEMONIC]);
    assert_eq!(
        lex("NOP\r\nRTS", valid),
        [(MNEMONIC, "NOP"), (NEWLINE, "\r\n"), (MNEMONIC, "RTS")]
    );

    let tokenizer = Tokenizer::new("NOP\n  RTS");
    let token = tokenizer.token_at(6.into(), &valid);
    assert_eq!((token.kind, token.line, token.column), (MNEMONIC, 1, 2));

    let eof = tokenizer.token_at(9.into(), &valid);
    assert_eq!((eof.kind, eof.range), (EOF, TextRange::empty(9.into())));
}

#[test]
fn restart_anywhere() {
    let text = "LDA #1";
    let valid = SyntaxSet::new([MNEMONIC, HASH, NUMBER]);
    let tokenizer = Tokenizer::new(text);
    let sequential: Vec<_> = tokenizer.tokens(valid).collect();
    for token in &sequential {
        assert_eq!(tokenizer.token_at(token.range.start(), &valid), *token);
    }
}

#[test]
fn mid_char_offset() {
    let tokenizer = Tokenizer::new("é");
    let token = tokenizer.token_at(1.into(), &SyntaxSet::EMPTY);
    assert_eq!((token.kind, token.range), (UNKNOWN, TextRange::new(1.into(), 2.into())));
}
