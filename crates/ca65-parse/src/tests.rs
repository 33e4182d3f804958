use std::sync::LazyLock;

use ca65_grammar::Grammar;
use ca65_syntax::{
    EditRangeError, GreenNode, NodeOrToken, SyntaxErrorKind, SyntaxKind, SyntaxTree, TextEdit,
    TextRange, TextSize,
};
use expect_test::{Expect, expect};

use crate::{Parser, ParserConfig, parse};

static GRAMMAR: LazyLock<Grammar> = LazyLock::new(|| ca65_grammar::build().unwrap());

fn check(text: &str, expect: Expect) -> SyntaxTree {
    let tree = parse(&GRAMMAR, text);
    assert_eq!(tree.text(), text);
    assert_eq!(tree.root().text_range(), TextRange::up_to(tree.text_len()));
    expect.assert_eq(&tree.to_string());
    tree
}

fn range(start: u32, end: u32) -> TextRange {
    TextRange::new(start.into(), end.into())
}

#[test]
fn immediate_operand() {
    let tree = check(
        "LDA #$01\n",
        expect![[r##"
            SOURCE_FILE@0..9
              LINE@0..9
                INSTRUCTION@0..8
                  MNEMONIC@0..3 "LDA"
                  WHITESPACE@3..4 " "
                  OPERAND_IMMEDIATE@4..8
                    HASH@4..5 "#"
                    NUMBER@5..8 "$01"
                NEWLINE@8..9 "\n"
        "##]],
    );
    assert!(!tree.has_errors());
}

#[test]
fn label_before_instruction() {
    check(
        "reset: sei\n",
        expect![[r##"
            SOURCE_FILE@0..11
              LINE@0..11
                LABEL@0..6
                  IDENT@0..5 "reset"
                  COLON@5..6 ":"
                WHITESPACE@6..7 " "
                INSTRUCTION@7..10
                  MNEMONIC@7..10 "sei"
                NEWLINE@10..11 "\n"
        "##]],
    );
}

#[test]
fn operator_precedence() {
    check(
        "x = 1 + 2 * 3\n",
        expect![[r##"
            SOURCE_FILE@0..14
              LINE@0..14
                CONSTANT_DEF@0..13
                  IDENT@0..1 "x"
                  WHITESPACE@1..2 " "
                  EQ@2..3 "="
                  WHITESPACE@3..4 " "
                  BINARY_EXPR@4..13
                    NUMBER@4..5 "1"
                    WHITESPACE@5..6 " "
                    PLUS@6..7 "+"
                    WHITESPACE@7..8 " "
                    BINARY_EXPR@8..13
                      NUMBER@8..9 "2"
                      WHITESPACE@9..10 " "
                      STAR@10..11 "*"
                      WHITESPACE@11..12 " "
                      NUMBER@12..13 "3"
                NEWLINE@13..14 "\n"
        "##]],
    );
}

#[test]
fn ambiguous_parentheses_prefer_indirect() {
    check(
        "JMP ($FFFC)\n",
        expect![[r##"
            SOURCE_FILE@0..12
              LINE@0..12
                INSTRUCTION@0..11
                  MNEMONIC@0..3 "JMP"
                  WHITESPACE@3..4 " "
                  OPERAND_INDIRECT@4..11
                    L_PAREN@4..5 "("
                    NUMBER@5..10 "$FFFC"
                    R_PAREN@10..11 ")"
                NEWLINE@11..12 "\n"
        "##]],
    );
    check(
        "LDA ($10),Y\n",
        expect![[r##"
            SOURCE_FILE@0..12
              LINE@0..12
                INSTRUCTION@0..11
                  MNEMONIC@0..3 "LDA"
                  WHITESPACE@3..4 " "
                  OPERAND_INDIRECT_INDEXED@4..11
                    L_PAREN@4..5 "("
                    NUMBER@5..8 "$10"
                    R_PAREN@8..9 ")"
                    COMMA@9..10 ","
                    REG_Y@10..11 "Y"
                NEWLINE@11..12 "\n"
        "##]],
    );
}

#[test]
fn macro_call_arguments() {
    check(
        "push_ax foo, {a, b}\n",
        expect![[r##"
            SOURCE_FILE@0..20
              LINE@0..20
                MACRO_CALL@0..19
                  IDENT@0..7 "push_ax"
                  WHITESPACE@7..8 " "
                  MACRO_ARG@8..11 "foo"
                  COMMA@11..12 ","
                  WHITESPACE@12..13 " "
                  BRACED_ARG@13..19
                    L_BRACE@13..14 "{"
                    BRACED_TEXT@14..18 "a, b"
                    R_BRACE@18..19 "}"
                NEWLINE@19..20 "\n"
        "##]],
    );
}

#[test]
fn directives_and_indentation() {
    check(
        "\t.segment \"CODE\"\n\t.byte $01, \"hi\"\n",
        expect![[r##"
            SOURCE_FILE@0..34
              WHITESPACE@0..1 "\t"
              LINE@1..17
                DIRECTIVE@1..16
                  SEGMENT_KW@1..9 ".segment"
                  WHITESPACE@9..10 " "
                  STRING@10..16 "\"CODE\""
                NEWLINE@16..17 "\n"
              WHITESPACE@17..18 "\t"
              LINE@18..34
                DIRECTIVE@18..33
                  EXPR_DIRECTIVE_KW@18..23 ".byte"
                  WHITESPACE@23..24 " "
                  NUMBER@24..27 "$01"
                  COMMA@27..28 ","
                  WHITESPACE@28..29 " "
                  STRING@29..33 "\"hi\""
                NEWLINE@33..34 "\n"
        "##]],
    );
}

#[test]
fn struct_members() {
    let tree = check(
        ".struct Point\n  xcoord .word\n  ycoord .word\n.endstruct\n",
        expect![[r##"
            SOURCE_FILE@0..55
              LINE@0..14
                DIRECTIVE@0..13
                  SYMBOL_DIRECTIVE_KW@0..7 ".struct"
                  WHITESPACE@7..8 " "
                  SYMBOL_ITEM@8..13
                    IDENT@8..13 "Point"
                NEWLINE@13..14 "\n"
              WHITESPACE@14..16 "  "
              LINE@16..29
                LABEL@16..22
                  IDENT@16..22 "xcoord"
                WHITESPACE@22..23 " "
                DIRECTIVE@23..28
                  EXPR_DIRECTIVE_KW@23..28 ".word"
                NEWLINE@28..29 "\n"
              WHITESPACE@29..31 "  "
              LINE@31..44
                LABEL@31..37
                  IDENT@31..37 "ycoord"
                WHITESPACE@37..38 " "
                DIRECTIVE@38..43
                  EXPR_DIRECTIVE_KW@38..43 ".word"
                NEWLINE@43..44 "\n"
              LINE@44..55
                DIRECTIVE@44..54
                  DIRECTIVE_KW@44..54 ".endstruct"
                NEWLINE@54..55 "\n"
        "##]],
    );
    assert!(!tree.has_errors());

    let union = ".union\n  word .word 2\n  bytes .byte\n  .res 4\n.endunion\n";
    assert!(!parse(&GRAMMAR, union).has_errors());
}

#[test]
fn cpu_selection() {
    let cpus = [
        "p02", "p02x", "p4510", "p45gs02", "p6280", "p816", "pc02", "pce02", "pdtv", "pm740",
        "psc02", "psweet16", "pwc02",
    ];
    for cpu in cpus {
        for text in [format!(".{cpu}\n"), format!("\t.if{cpu}\n\tnop\n\t.endif\n")] {
            let tree = parse(&GRAMMAR, &text);
            assert!(!tree.has_errors(), "{text:?}: {:?}", tree.errors());
        }
    }
}

#[test]
fn start_of_a_string() {
    let tree = parse(&GRAMMAR, "x = .start(\"abc\", 1)\n");
    assert!(!tree.has_errors(), "{:?}", tree.errors());
    assert!(tree.root().descendants().any(|node| node.kind() == SyntaxKind::FUNCTION_CALL));
}

#[test]
fn macro_call_in_expression() {
    check(
        "x = pair(1, 2) + 1\n",
        expect![[r##"
            SOURCE_FILE@0..19
              LINE@0..19
                CONSTANT_DEF@0..18
                  IDENT@0..1 "x"
                  WHITESPACE@1..2 " "
                  EQ@2..3 "="
                  WHITESPACE@3..4 " "
                  BINARY_EXPR@4..18
                    MACRO_CALL@4..14
                      IDENT@4..8 "pair"
                      IMM_L_PAREN@8..9 "("
                      RAW_FUNC_ARG@9..10 "1"
                      COMMA@10..11 ","
                      WHITESPACE@11..12 " "
                      RAW_FUNC_ARG@12..13 "2"
                      R_PAREN@13..14 ")"
                    WHITESPACE@14..15 " "
                    PLUS@15..16 "+"
                    WHITESPACE@16..17 " "
                    NUMBER@17..18 "1"
                NEWLINE@18..19 "\n"
        "##]],
    );
    let tree = parse(&GRAMMAR, "lda #lo()\n");
    assert!(!tree.has_errors(), "{:?}", tree.errors());
}

#[test]
fn macro_call_needs_parentheses_in_expression() {
    // Space separated arguments would make `lda foo a, x` ambiguous with an
    // indexed operand.
    let tree = parse(&GRAMMAR, "lda #foo bar\n");
    let errors: Vec<_> = tree.error_nodes().map(|node| node.text()).collect();
    assert_eq!(errors, ["bar"]);
    assert!(!tree.root().descendants().any(|node| node.kind() == SyntaxKind::MACRO_CALL));

    let spaced = parse(&GRAMMAR, "x = pair (1)\n");
    assert!(spaced.has_errors());
}

#[test]
fn deep_nesting_parses_and_drops() {
    let depth = 200_000;
    let unary = format!("x = {}1\n", "-".repeat(depth));
    let parens = format!("x = {}1{}\n", "(".repeat(depth / 2), ")".repeat(depth / 2));
    for text in [unary, parens] {
        let tree = parse(&GRAMMAR, &text);
        assert!(!tree.has_errors());
        assert_eq!(tree.text_len(), TextSize::of(text.as_str()));
        assert_eq!(tree.text(), text);
        let nested = tree
            .root()
            .descendants()
            .filter(|node| matches!(node.kind(), SyntaxKind::UNARY_EXPR | SyntaxKind::PAREN_EXPR))
            .count();
        assert_eq!(nested, text.len() - "x = 1\n".len() - text.matches(')').count());
        let reparsed = Parser::new(&GRAMMAR).reparse(&tree, &text).unwrap();
        assert_eq!(reparsed, tree);
        drop((tree, reparsed));
    }
}

#[test]
fn truncated_operand() {
    let tree = check(
        "LDA #",
        expect![[r##"
            SOURCE_FILE@0..5
              LINE@0..3
                INSTRUCTION@0..3
                  MNEMONIC@0..3 "LDA"
              WHITESPACE@3..4 " "
              ERROR@4..5
                HASH@4..5 "#"
        "##]],
    );
    assert_eq!(tree.error_nodes().count(), 1);
    let [error] = tree.errors() else { panic!("expected one error: {:?}", tree.errors()) };
    assert_eq!(error.range(), range(5, 5));
    assert!(matches!(
        error.kind(),
        SyntaxErrorKind::UnexpectedEof { expected } if expected.contains(SyntaxKind::NUMBER)
    ));
}

#[test]
fn invalid_character() {
    let tree = check(
        "nop ?\n",
        expect![[r##"
            SOURCE_FILE@0..6
              LINE@0..6
                INSTRUCTION@0..3
                  MNEMONIC@0..3 "nop"
                WHITESPACE@3..4 " "
                ERROR@4..5
                  UNKNOWN@4..5 "?"
                NEWLINE@5..6 "\n"
        "##]],
    );
    let [error] = tree.errors() else { panic!("expected one error: {:?}", tree.errors()) };
    assert_eq!(error.kind(), &SyntaxErrorKind::InvalidToken);
    assert_eq!(error.range(), range(4, 5));
}

#[test]
fn skipped_tokens_merge() {
    let tree = parse(&GRAMMAR, "rts ) ) )\nnop\n");
    assert_eq!(tree.error_nodes().count(), 1);
    assert_eq!(tree.errors().len(), 1);
    assert_eq!(tree.errors()[0].range(), range(4, 9));
    let lines = tree.root().children().filter(|node| node.kind() == SyntaxKind::LINE).count();
    assert_eq!(lines, 2);
}

#[test]
fn broken_line_does_not_leak() {
    let tree = parse(&GRAMMAR, "lda #(1 +\nsta $2000\n");
    assert!(tree.has_errors());
    let last = tree.root().children().last().unwrap();
    assert_eq!(last.kind(), SyntaxKind::LINE);
    assert!(!last.has_error());
    assert_eq!(last.text(), "sta $2000\n");
}

#[test]
fn every_input_yields_a_tree() {
    let inputs = ["", "\n", ":", ")))", "lda", ".macro", "\"open", "a = = b\n", "x:: y", "\u{e9}t"];
    for text in inputs {
        let tree = parse(&GRAMMAR, text);
        assert_eq!(tree.text(), text);
        assert_eq!(tree.root().text_range(), TextRange::up_to(tree.text_len()));
    }
}

#[test]
fn tight_recovery_depth_still_terminates() {
    let config = ParserConfig::default().with_max_recovery_depth(0).with_max_heads(1);
    let parser = Parser::with_config(&GRAMMAR, config);
    let text = "lda (1,\njmp (2)\n";
    let tree = parser.parse(text);
    assert_eq!(tree.text(), text);
}

fn lines(tree: &SyntaxTree) -> Vec<GreenNode> {
    tree.green()
        .children()
        .iter()
        .filter_map(|child| match child {
            NodeOrToken::Node(node) if node.kind() == SyntaxKind::LINE => Some(node.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn reparse_reuses_untouched_lines() {
    let old_text = "nop\nnop\nnop\nnop\nnop\n";
    let new_text = "nop\nnop\nnop\ninx\nnop\n";
    let parser = Parser::new(&GRAMMAR);

    let old = parser.parse(old_text);
    let edited = old.apply_edit(&TextEdit::replace(range(12, 15), "inx")).unwrap();
    let new = parser.reparse(&edited, new_text).unwrap();

    assert_eq!(new, parser.parse(new_text));
    assert_eq!(new.version(), 2);

    let (old_lines, new_lines) = (lines(&old), lines(&new));
    assert!(new_lines[0].ptr_eq(&old_lines[0]));
    assert!(new_lines[1].ptr_eq(&old_lines[1]));
    assert!(!new_lines[3].ptr_eq(&old_lines[3]));
}

#[test]
fn reparse_without_reuse() {
    let text = "nop\nnop\n";
    let parser = Parser::with_config(&GRAMMAR, ParserConfig::default().with_reuse(false));
    let old = parser.parse(text);
    let new = parser.reparse(&old, text).unwrap();
    assert_eq!(new, old);
    assert!(!lines(&new)[0].ptr_eq(&lines(&old)[0]));
}

#[test]
fn reparse_rejects_wrong_length() {
    let parser = Parser::new(&GRAMMAR);
    let old = parser.parse("nop\n");
    let error = parser.reparse(&old, "nop\nnop\n").unwrap_err();
    assert_eq!(
        error,
        EditRangeError::LengthMismatch { expected: 4.into(), actual: 8.into() }
    );
}

#[test]
fn reparse_after_insertion_matches_fresh_parse() {
    let parser = Parser::new(&GRAMMAR);
    let old_text = "start:\n  lda #<msg\n  ldx #>msg\n  jsr print\n  rts\n";
    let old = parser.parse(old_text);
    assert!(!old.has_errors());

    let offset = old_text.find("  rts").unwrap();
    let insertion = "  inx\n";
    let new_text = format!("{}{insertion}{}", &old_text[..offset], &old_text[offset..]);
    let edit = TextEdit::insert((offset as u32).into(), insertion);
    let new = parser.reparse(&old.apply_edit(&edit).unwrap(), &new_text).unwrap();

    assert_eq!(new, parser.parse(&new_text));
    assert!(lines(&new)[0].ptr_eq(&lines(&old)[0]));
}
