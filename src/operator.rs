//! Static operator catalog.
//!
//! Every operator has a canonical spelling (used by both textual forms and in
//! error messages), a display name, an arity and two precedences.  The
//! *input* precedence applies when the operator arrives from the token
//! stream, the *stack* precedence while it waits on the compiler's operator
//! stack.  `input <= stack` makes an operator left-associative,
//! `input > stack` right-associative.

use phf::phf_map;

/// Lowest precedence; held by the sentinels on the compiler stack.
pub const SENTINEL: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    // ── unary ──────────────────────────────────────────────────────
    Not,
    Negate,
    Sqrt,
    ToInt,
    ToFloat,
    ToStr,
    ToBool,
    ToChar,
    ToName,
    ToBin,
    ToRaw,
    Len,
    Trim,
    LTrim,
    RTrim,
    Exists,
    IsSet,
    IsName,
    TypeOf,
    Delete,
    LoadStr,
    LoadRaw,
    LoadBin,
    Return,

    // ── binary ─────────────────────────────────────────────────────
    Assign,
    SaveTo,
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Match,
    Resize,
    Plus,
    Minus,
    Multiply,
    Divide,
    Mod,
    Pow,
    Call,
    Element,

    // ── ternary ────────────────────────────────────────────────────
    IfElse,
    Slice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpInfo {
    pub spelling: &'static str,
    pub name: &'static str,
    pub arity: usize,
    pub input: u8,
    pub stack: u8,
}

const fn op(spelling: &'static str, name: &'static str, arity: usize, input: u8, stack: u8) -> OpInfo {
    OpInfo {
        spelling,
        name,
        arity,
        input,
        stack,
    }
}

const ASSIGN: (u8, u8) = (11, 10);
const SAVE: (u8, u8) = (20, 20);
const OR: (u8, u8) = (30, 30);
const AND: (u8, u8) = (40, 40);
const RELATIONAL: (u8, u8) = (50, 50);
const ADDITIVE: (u8, u8) = (60, 60);
const MULTIPLICATIVE: (u8, u8) = (70, 70);
const POWER: (u8, u8) = (81, 80);
const CALL: (u8, u8) = (85, 85);
const UNARY: (u8, u8) = (91, 90);
const INDEX: (u8, u8) = (100, 100);
const TERNARY: (u8, u8) = (110, SENTINEL);

const fn unary(spelling: &'static str, name: &'static str) -> OpInfo {
    op(spelling, name, 1, UNARY.0, UNARY.1)
}

const fn binary(spelling: &'static str, name: &'static str, prec: (u8, u8)) -> OpInfo {
    op(spelling, name, 2, prec.0, prec.1)
}

impl OpCode {
    pub const fn info(self) -> OpInfo {
        match self {
            OpCode::Not => unary("not", "not"),
            OpCode::Negate => unary("-", "negate"),
            OpCode::Sqrt => unary("sqrt", "sqrt"),
            OpCode::ToInt => unary("toint", "to int"),
            OpCode::ToFloat => unary("tofloat", "to float"),
            OpCode::ToStr => unary("tostr", "to string"),
            OpCode::ToBool => unary("tobool", "to bool"),
            OpCode::ToChar => unary("tochar", "to char"),
            OpCode::ToName => unary("toname", "to name"),
            OpCode::ToBin => unary("tobin", "to binary"),
            OpCode::ToRaw => unary("toraw", "to raw"),
            OpCode::Len => unary("len", "length"),
            OpCode::Trim => unary("trim", "trim"),
            OpCode::LTrim => unary("ltrim", "left trim"),
            OpCode::RTrim => unary("rtrim", "right trim"),
            OpCode::Exists => unary("exists", "exists"),
            OpCode::IsSet => unary("isset", "is set"),
            OpCode::IsName => unary("isname", "is name"),
            OpCode::TypeOf => unary("typeof", "type of"),
            OpCode::Delete => unary("delete", "delete"),
            OpCode::LoadStr => unary("loadstr", "load string"),
            OpCode::LoadRaw => unary("loadraw", "load raw"),
            OpCode::LoadBin => unary("loadbin", "load binary"),
            OpCode::Return => unary("return", "return"),

            OpCode::Assign => binary("=", "assign", ASSIGN),
            OpCode::SaveTo => binary("saveto", "save to", SAVE),
            OpCode::Or => binary("or", "or", OR),
            OpCode::And => binary("and", "and", AND),
            OpCode::Eq => binary("==", "equal", RELATIONAL),
            OpCode::Ne => binary("!=", "not equal", RELATIONAL),
            OpCode::Lt => binary("<", "less", RELATIONAL),
            OpCode::Le => binary("<=", "less or equal", RELATIONAL),
            OpCode::Gt => binary(">", "greater", RELATIONAL),
            OpCode::Ge => binary(">=", "greater or equal", RELATIONAL),
            OpCode::In => binary("in", "in", RELATIONAL),
            OpCode::Match => binary("match", "match", RELATIONAL),
            OpCode::Resize => binary("resize", "resize", RELATIONAL),
            OpCode::Plus => binary("+", "plus", ADDITIVE),
            OpCode::Minus => binary("-", "minus", ADDITIVE),
            OpCode::Multiply => binary("*", "multiply", MULTIPLICATIVE),
            OpCode::Divide => binary("/", "divide", MULTIPLICATIVE),
            OpCode::Mod => binary("mod", "modulo", MULTIPLICATIVE),
            OpCode::Pow => binary("pow", "power", POWER),
            OpCode::Call => binary("call", "call", CALL),
            OpCode::Element => binary("[]", "element", INDEX),

            OpCode::IfElse => op("if", "if else", 3, TERNARY.0, TERNARY.1),
            OpCode::Slice => op("[:]", "slice", 3, INDEX.0, INDEX.1),
        }
    }

    #[inline]
    pub const fn spelling(self) -> &'static str {
        self.info().spelling
    }

    #[inline]
    pub const fn arity(self) -> usize {
        self.info().arity
    }

    #[inline]
    pub const fn input_precedence(self) -> u8 {
        self.info().input
    }

    #[inline]
    pub const fn stack_precedence(self) -> u8 {
        self.info().stack
    }

    #[inline]
    pub const fn is_right_associative(self) -> bool {
        self.info().input > self.info().stack
    }

    /// Operators the compiler can look up from a token lexeme.  `-` maps to
    /// the binary form; the compiler turns it into `Negate` in operand
    /// position.
    pub fn from_spelling(spelling: &str) -> Option<OpCode> {
        SPELLINGS.get(spelling).copied()
    }
}

static SPELLINGS: phf::Map<&'static str, OpCode> = phf_map! {
    "not"     => OpCode::Not,
    "!"       => OpCode::Not,
    "sqrt"    => OpCode::Sqrt,
    "toint"   => OpCode::ToInt,
    "tofloat" => OpCode::ToFloat,
    "tostr"   => OpCode::ToStr,
    "tobool"  => OpCode::ToBool,
    "tochar"  => OpCode::ToChar,
    "toname"  => OpCode::ToName,
    "tobin"   => OpCode::ToBin,
    "toraw"   => OpCode::ToRaw,
    "len"     => OpCode::Len,
    "trim"    => OpCode::Trim,
    "ltrim"   => OpCode::LTrim,
    "rtrim"   => OpCode::RTrim,
    "exists"  => OpCode::Exists,
    "isset"   => OpCode::IsSet,
    "isname"  => OpCode::IsName,
    "typeof"  => OpCode::TypeOf,
    "delete"  => OpCode::Delete,
    "loadstr" => OpCode::LoadStr,
    "loadraw" => OpCode::LoadRaw,
    "loadbin" => OpCode::LoadBin,
    "return"  => OpCode::Return,
    "="       => OpCode::Assign,
    "saveto"  => OpCode::SaveTo,
    "or"      => OpCode::Or,
    "||"      => OpCode::Or,
    "and"     => OpCode::And,
    "&&"      => OpCode::And,
    "=="      => OpCode::Eq,
    "!="      => OpCode::Ne,
    "<"       => OpCode::Lt,
    "<="      => OpCode::Le,
    ">"       => OpCode::Gt,
    ">="      => OpCode::Ge,
    "in"      => OpCode::In,
    "match"   => OpCode::Match,
    "resize"  => OpCode::Resize,
    "+"       => OpCode::Plus,
    "-"       => OpCode::Minus,
    "*"       => OpCode::Multiply,
    "/"       => OpCode::Divide,
    "mod"     => OpCode::Mod,
    "%"       => OpCode::Mod,
    "pow"     => OpCode::Pow,
    "call"    => OpCode::Call,
};
