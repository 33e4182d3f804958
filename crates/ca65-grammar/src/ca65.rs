//! The ca65 rule set.
//!
//! Nonterminals starting with `_` never produce nodes of their own; every rule
//! states the node kind it builds, so one nonterminal may produce several
//! kinds (all operand forms reduce to `_operand`).

use ca65_syntax::SyntaxKind::{self, *};

use crate::{Assoc, Grammar, GrammarBuilder, GrammarError, Symbol};

macro_rules! syms {
    () => {{ let empty: [Symbol; 0] = []; empty }};
    ($($symbol:expr),+ $(,)?) => { [$(Symbol::from($symbol)),+] };
}

const PREC_NOT: u8 = 1;
const PREC_OR: u8 = 2;
const PREC_AND: u8 = 3;
const PREC_CMP: u8 = 4;
const PREC_ADD: u8 = 5;
const PREC_MUL: u8 = 6;
const PREC_UNARY: u8 = 7;

const BINARY_OPERATORS: [(u8, &[SyntaxKind]); 5] = [
    (PREC_OR, &[PIPE2, DOT_OR_OP]),
    (PREC_AND, &[AMP2, DOT_AND_OP]),
    (PREC_CMP, &[EQ, NEQ, LT, GT, LT_EQ, GT_EQ]),
    (PREC_ADD, &[PLUS, MINUS, PIPE, DOT_ADD_OP]),
    (PREC_MUL, &[STAR, SLASH, DOT_MUL_OP, AMP, CARET, SHL, SHR]),
];

const UNARY_OPERATORS: [SyntaxKind; 6] = [PLUS, MINUS, TILDE, LT, GT, CARET];

const PRIMARIES: [SyntaxKind; 8] =
    [NUMBER, STRING, CHAR, IDENT, LOCAL_NAME, UNNAMED_REF, STAR, PSEUDO_VAR];

/// Builds the parse tables for ca65 sources.
pub fn build() -> Result<Grammar, GrammarError> {
    let mut g = GrammarBuilder::new();

    let source_file = g.nonterminal("source_file");
    let lines = g.nonterminal("_lines");
    let line = g.nonterminal("line");
    let last_line = g.nonterminal("last_line");
    let content = g.nonterminal("_content");
    let label = g.nonterminal("label");
    let bare_label = g.nonterminal("bare_label");
    let symbol_definition = g.nonterminal("symbol_definition");
    let statement = g.nonterminal("_statement");
    let operand = g.nonterminal("_operand");
    let macro_args = g.nonterminal("_macro_args");
    let macro_arg = g.nonterminal("_macro_arg");
    let directive = g.nonterminal("_directive");
    let symbol_items = g.nonterminal("_symbol_items");
    let symbol_item = g.nonterminal("symbol_item");
    let switch = g.nonterminal("_switch");
    let feature_items = g.nonterminal("_feature_items");
    let feature_item = g.nonterminal("feature_item");
    let params = g.nonterminal("_params");
    let param_list = g.nonterminal("param_list");
    let define_params = g.nonterminal("define_params");
    let expr_list = g.nonterminal("_expr_list");
    let expr = g.nonterminal("_expr");
    let scoped_name = g.nonterminal("scoped_name");
    let token_args = g.nonterminal("_token_args");
    let token_arg = g.nonterminal("_token_arg");

    g.start(source_file);

    // Lines. The root node is built by the parser once the input is accepted.
    g.rule(source_file, None, syms![lines]);
    g.rule(source_file, None, syms![lines, last_line]);
    g.rule(lines, None, syms![]);
    g.rule(lines, None, syms![lines, line]);
    g.rule(line, Some(LINE), syms![NEWLINE]);
    g.rule(line, Some(LINE), syms![content, NEWLINE]);
    g.rule(last_line, Some(LINE), syms![content]);

    g.rule(content, None, syms![label]);
    g.rule(content, None, syms![label, statement]);
    g.rule(content, None, syms![statement]);
    g.rule(content, None, syms![symbol_definition]);
    g.rule(content, None, syms![bare_label, directive]);

    g.rule(label, Some(LABEL), syms![IDENT, COLON]);
    g.rule(label, Some(LABEL), syms![LOCAL_NAME, COLON]);
    g.rule(label, Some(UNNAMED_LABEL), syms![COLON]);
    // Struct members and friends: `name .res 2`.
    g.rule(bare_label, Some(LABEL), syms![IDENT]);

    g.rule(symbol_definition, Some(CONSTANT_DEF), syms![IDENT, EQ, expr]);
    g.rule(symbol_definition, Some(LABEL_DEF), syms![IDENT, COLON_EQ, expr]);
    g.rule(symbol_definition, Some(VARIABLE_DEF), syms![IDENT, SET_KW, expr]);

    // Instructions.
    g.rule(statement, Some(INSTRUCTION), syms![MNEMONIC]);
    g.rule(statement, Some(INSTRUCTION), syms![MNEMONIC, operand]);

    g.rule(operand, Some(OPERAND_IMMEDIATE), syms![HASH, expr]);
    g.rule(operand, Some(OPERAND_ACCUMULATOR), syms![REG_A]);
    g.rule(operand, Some(OPERAND_ADDRESS), syms![expr]);
    g.rule(operand, Some(OPERAND_INDEXED_X), syms![expr, COMMA, REG_X]);
    g.rule(operand, Some(OPERAND_INDEXED_Y), syms![expr, COMMA, REG_Y]);
    // `(expr)` is both an indirect operand and a parenthesized address; the
    // GLR driver keeps both readings and prefers the indirect one.
    g.rule(operand, Some(OPERAND_INDIRECT), syms![L_PAREN, expr, R_PAREN]).dynamic(1);
    g.rule(operand, Some(OPERAND_INDEXED_INDIRECT), syms![L_PAREN, expr, COMMA, REG_X, R_PAREN])
        .dynamic(1);
    g.rule(operand, Some(OPERAND_INDIRECT_INDEXED), syms![L_PAREN, expr, R_PAREN, COMMA, REG_Y])
        .dynamic(1);

    // Macro invocations.
    g.rule(statement, Some(MACRO_CALL), syms![IDENT]);
    g.rule(statement, Some(MACRO_CALL), syms![IDENT, macro_args]);
    g.rule(macro_args, None, syms![macro_arg]);
    g.rule(macro_args, None, syms![macro_args, COMMA, macro_arg]);
    g.rule(macro_arg, None, syms![MACRO_ARG]);
    g.rule(macro_arg, Some(BRACED_ARG), syms![L_BRACE, R_BRACE]);
    g.rule(macro_arg, Some(BRACED_ARG), syms![L_BRACE, BRACED_TEXT, R_BRACE]);

    // Control commands.
    g.rule(statement, None, syms![directive]);
    g.rule(directive, Some(DIRECTIVE), syms![DIRECTIVE_KW]);
    // `.byte` alone declares a `.struct` member.
    g.rule(directive, Some(DIRECTIVE), syms![EXPR_DIRECTIVE_KW]);
    g.rule(directive, Some(DIRECTIVE), syms![EXPR_DIRECTIVE_KW, expr_list]);
    g.rule(directive, Some(DIRECTIVE), syms![SYMBOL_DIRECTIVE_KW]);
    g.rule(directive, Some(DIRECTIVE), syms![SYMBOL_DIRECTIVE_KW, symbol_items]);
    g.rule(directive, Some(DIRECTIVE), syms![SEGMENT_KW, STRING]);
    g.rule(directive, Some(DIRECTIVE), syms![SEGMENT_KW, STRING, COLON, ADDR_SIZE]);
    g.rule(directive, Some(DIRECTIVE), syms![SWITCH_DIRECTIVE_KW]);
    g.rule(directive, Some(DIRECTIVE), syms![SWITCH_DIRECTIVE_KW, switch]);
    g.rule(directive, Some(DIRECTIVE), syms![FEATURE_KW, feature_items]);
    g.rule(directive, Some(DIRECTIVE), syms![MACRO_KW, IDENT]);
    g.rule(directive, Some(DIRECTIVE), syms![MACRO_KW, IDENT, param_list]);
    g.rule(directive, Some(DIRECTIVE), syms![DEFINE_KW, IDENT]);
    g.rule(directive, Some(DIRECTIVE), syms![DEFINE_KW, IDENT, define_params]);
    g.rule(directive, Some(DIRECTIVE), syms![DEFINE_KW, IDENT, RAW_TEXT]);
    g.rule(directive, Some(DIRECTIVE), syms![DEFINE_KW, IDENT, define_params, RAW_TEXT]);
    g.rule(directive, Some(DIRECTIVE), syms![RAW_DIRECTIVE_KW]);
    g.rule(directive, Some(DIRECTIVE), syms![RAW_DIRECTIVE_KW, RAW_TEXT]);

    g.rule(symbol_items, None, syms![symbol_item]);
    g.rule(symbol_items, None, syms![symbol_items, COMMA, symbol_item]);
    g.rule(symbol_item, Some(SYMBOL_ITEM), syms![IDENT]);
    g.rule(symbol_item, Some(SYMBOL_ITEM), syms![IDENT, COLON, ADDR_SIZE]);
    g.rule(symbol_item, Some(SYMBOL_ITEM), syms![IDENT, EQ, expr]);
    g.rule(symbol_item, Some(SYMBOL_ITEM), syms![IDENT, COLON_EQ, expr]);
    g.rule(symbol_item, Some(SYMBOL_ITEM), syms![IDENT, COLON, ADDR_SIZE, EQ, expr]);
    g.rule(symbol_item, Some(SYMBOL_ITEM), syms![IDENT, COLON, ADDR_SIZE, COLON_EQ, expr]);

    g.rule(switch, None, syms![PLUS]);
    g.rule(switch, None, syms![MINUS]);
    g.rule(switch, None, syms![SWITCH]);

    g.rule(feature_items, None, syms![feature_item]);
    g.rule(feature_items, None, syms![feature_items, COMMA, feature_item]);
    g.rule(feature_item, Some(FEATURE_ITEM), syms![IDENT]);
    g.rule(feature_item, Some(FEATURE_ITEM), syms![IDENT, PLUS]);
    g.rule(feature_item, Some(FEATURE_ITEM), syms![IDENT, MINUS]);

    g.rule(params, None, syms![IDENT]);
    g.rule(params, None, syms![params, COMMA, IDENT]);
    g.rule(param_list, Some(PARAM_LIST), syms![params]);
    g.rule(define_params, Some(PARAM_LIST), syms![IMM_L_PAREN, R_PAREN]);
    g.rule(define_params, Some(PARAM_LIST), syms![IMM_L_PAREN, params, R_PAREN]);

    // Expressions.
    g.rule(expr_list, None, syms![expr]);
    g.rule(expr_list, None, syms![expr_list, COMMA, expr]);

    for primary in PRIMARIES {
        g.rule(expr, None, syms![primary]);
    }
    g.rule(expr, None, syms![scoped_name]);
    g.rule(scoped_name, Some(SCOPED_NAME), syms![COLON2, IDENT]);
    g.rule(scoped_name, Some(SCOPED_NAME), syms![IDENT, COLON2, IDENT]);
    g.rule(scoped_name, Some(SCOPED_NAME), syms![scoped_name, COLON2, IDENT]);

    g.rule(expr, Some(PAREN_EXPR), syms![L_PAREN, expr, R_PAREN]);

    g.rule(expr, Some(FUNCTION_CALL), syms![FUNCTION_KW, L_PAREN, R_PAREN]);
    g.rule(expr, Some(FUNCTION_CALL), syms![FUNCTION_KW, L_PAREN, expr_list, R_PAREN]);
    g.rule(expr, Some(FUNCTION_CALL), syms![TOKEN_FUNCTION_KW, L_PAREN, R_PAREN]);
    g.rule(expr, Some(FUNCTION_CALL), syms![TOKEN_FUNCTION_KW, L_PAREN, token_args, R_PAREN]);
    // `name(args)`: a macro used as a function. The arguments are raw like
    // those of token functions; the opening parenthesis must touch the name.
    g.rule(expr, Some(MACRO_CALL), syms![IDENT, IMM_L_PAREN, R_PAREN]);
    g.rule(expr, Some(MACRO_CALL), syms![IDENT, IMM_L_PAREN, token_args, R_PAREN]);
    g.rule(token_args, None, syms![token_arg]);
    g.rule(token_args, None, syms![token_args, COMMA, token_arg]);
    g.rule(token_arg, None, syms![RAW_FUNC_ARG]);
    g.rule(token_arg, Some(BRACED_ARG), syms![L_BRACE, R_BRACE]);
    g.rule(token_arg, Some(BRACED_ARG), syms![L_BRACE, BRACED_TEXT, R_BRACE]);

    for (level, operators) in BINARY_OPERATORS {
        g.precedence(level, Assoc::Left, operators.iter().copied());
        for &operator in operators {
            g.rule(expr, Some(BINARY_EXPR), syms![expr, operator, expr]);
        }
    }
    for operator in UNARY_OPERATORS {
        g.rule(expr, Some(UNARY_EXPR), syms![operator, expr]).prec(PREC_UNARY);
    }
    for operator in [BANG, DOT_NOT] {
        g.rule(expr, Some(UNARY_EXPR), syms![operator, expr]).prec(PREC_NOT);
    }

    g.build()
}
