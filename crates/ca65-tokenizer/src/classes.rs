//! Keyword tables. Everything here is matched case-insensitively.

use ca65_syntax::SyntaxKind::{self, *};

const MNEMONICS: [&str; 56] = [
    "adc", "and", "asl", "bcc", "bcs", "beq", "bit", "bmi", "bne", "bpl", "brk", "bvc", "bvs",
    "clc", "cld", "cli", "clv", "cmp", "cpx", "cpy", "dec", "dex", "dey", "eor", "inc", "inx",
    "iny", "jmp", "jsr", "lda", "ldx", "ldy", "lsr", "nop", "ora", "pha", "php", "pla", "plp",
    "rol", "ror", "rti", "rts", "sbc", "sec", "sed", "sei", "sta", "stx", "sty", "tax", "tay",
    "tsx", "txa", "txs", "tya",
];

const ADDR_SIZES: [&str; 9] =
    ["abs", "absolute", "direct", "dword", "far", "long", "near", "zeropage", "zp"];

/// CPU selectors; `.p02` switches to the 6502 and `.ifp02` tests for it.
const CPUS: [&str; 13] = [
    "p02", "p02x", "p4510", "p45gs02", "p6280", "p816", "pc02", "pce02", "pdtv", "pm740",
    "psc02", "psweet16", "pwc02",
];

fn is_cpu(name: &str) -> bool {
    CPUS.contains(&name)
}

pub(crate) fn is_mnemonic(word: &str) -> bool {
    word.len() == 3 && MNEMONICS.iter().any(|mnemonic| mnemonic.eq_ignore_ascii_case(word))
}

pub(crate) fn is_addr_size(word: &str) -> bool {
    ADDR_SIZES.iter().any(|size| size.eq_ignore_ascii_case(word))
}

pub(crate) fn is_switch(word: &str) -> bool {
    word.eq_ignore_ascii_case("on") || word.eq_ignore_ascii_case("off")
}

/// Classifies a control command; `name` excludes the leading dot.
pub(crate) fn dot_keyword(name: &str) -> Option<SyntaxKind> {
    let kind = match name.to_ascii_lowercase().as_str() {
        "a16" | "a8" | "bss" | "code" | "data" | "rodata" | "zeropage" | "reloc" | "else"
        | "end" | "endif" | "endmacro" | "endmac" | "endproc" | "endrepeat" | "endrep"
        | "endscope" | "exitmacro" | "exitmac" | "endenum" | "endstruct" | "endunion" | "i16"
        | "i8" | "pushseg" | "popseg" | "pushcpu" | "popcpu" | "pushcharmap" | "popcharmap" => {
            DIRECTIVE_KW
        }
        cpu if is_cpu(cpu.strip_prefix("if").unwrap_or(cpu)) => DIRECTIVE_KW,

        "addr" | "byte" | "byt" | "word" | "dword" | "dbyt" | "faraddr" | "bankbytes"
        | "hibytes" | "lobytes" | "literal" | "res" | "align" | "org" | "if" | "elseif"
        | "ifconst" | "ifnconst" | "repeat" | "charmap" | "assert" | "asciiz" | "include"
        | "incbin" | "error" | "fatal" | "out" | "warning" | "setcpu" | "listbytes"
        | "pagelength" | "tag" | "referto" | "refto" | "delmacro" | "delmac" | "undefine"
        | "undef" | "ifdef" | "ifndef" | "ifref" | "ifnref" | "localchar" | "macpack"
        | "fileopt" | "fopt" | "condes" | "constructor" | "destructor" | "interruptor" => {
            EXPR_DIRECTIVE_KW
        }

        "export" | "exportzp" | "import" | "importzp" | "global" | "globalzp" | "local"
        | "forceimport" | "proc" | "scope" | "enum" | "struct" | "union" => SYMBOL_DIRECTIVE_KW,

        "autoimport" | "case" | "debuginfo" | "list" | "smart" => SWITCH_DIRECTIVE_KW,
        "ifblank" | "ifnblank" => RAW_DIRECTIVE_KW,
        "segment" => SEGMENT_KW,
        "feature" => FEATURE_KW,
        "macro" | "mac" => MACRO_KW,
        "define" => DEFINE_KW,
        "set" => SET_KW,

        "mod" | "bitand" | "bitxor" | "shl" | "shr" => DOT_MUL_OP,
        "bitor" => DOT_ADD_OP,
        "and" | "xor" => DOT_AND_OP,
        "or" => DOT_OR_OP,
        "not" => DOT_NOT,

        "defined" | "def" | "sizeof" | "hibyte" | "lobyte" | "bank" | "bankbyte" | "const"
        | "hiword" | "loword" | "ident" | "max" | "min" | "strlen" | "string" | "concat"
        | "sprintf" | "addrsize" | "referenced" | "ref" | "definedmacro" | "ismnemonic"
        | "ismnem" | "capability" | "cap" | "start" => FUNCTION_KW,
        "blank" | "left" | "mid" | "right" | "match" | "xmatch" | "tcount" => {
            TOKEN_FUNCTION_KW
        }
        "asize" | "cpu" | "isize" | "paramcount" | "time" | "version" => PSEUDO_VAR,

        _ => return None,
    };
    Some(kind)
}
