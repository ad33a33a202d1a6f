//! Syntax kinds for the Soma model language.
//!
//! `SyntaxKind` serves dual roles: token kinds (from lexer) and node kinds
//! (from parser). Logos derives token recognition; node kinds lack
//! token/regex attributes. `SomaLang` implements Rowan's `Language` trait
//! for tree construction.
//!
//! Newlines are real tokens: the grammar is line-oriented and statements
//! terminate at end of line. Spaces and `#` comments are trivia.

use logos::Logos;
use rowan::Language;

/// All token and node kinds. Tokens first, then nodes, then `__LAST` sentinel.
/// `#[repr(u16)]` enables safe transmute in `kind_from_raw`.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum SyntaxKind {
    #[token("(")]
    ParenOpen = 0,

    #[token(")")]
    ParenClose,

    /// `[[` opens a declaration invariant. Defined before `[` for precedence.
    #[token("[[")]
    DoubleBracketOpen,

    #[token("]]")]
    DoubleBracketClose,

    #[token("[")]
    BracketOpen,

    #[token("]")]
    BracketClose,

    #[token(",")]
    Comma,

    #[token("?")]
    Question,

    #[token(":")]
    Colon,

    /// Range separator in `for` bounds: `for i in 1 ... 10`
    #[token("...")]
    Ellipsis,

    /// Port binding arrow: `spikes <- excitatory spike`
    #[token("<-")]
    LeftArrow,

    #[token("**")]
    Pow,

    #[token("*=")]
    StarAssign,

    #[token("*")]
    Star,

    #[token("/=")]
    SlashAssign,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("+=")]
    PlusAssign,

    #[token("+")]
    Plus,

    #[token("-=")]
    MinusAssign,

    #[token("-")]
    Minus,

    #[token("<<")]
    Shl,

    #[token(">>")]
    Shr,

    #[token("<=")]
    Le,

    /// `<>`, the alternate not-equal spelling.
    #[token("<>")]
    Ne2,

    #[token("<")]
    Lt,

    #[token("==")]
    EqEq,

    #[token("!=")]
    Ne,

    #[token(">=")]
    Ge,

    #[token(">")]
    Gt,

    #[token("=")]
    Assign,

    #[token("&")]
    Amp,

    #[token("^")]
    Caret,

    #[token("|")]
    Pipe,

    #[token("~")]
    Tilde,

    /// Derivative marker: `V''` is the second derivative of `V`.
    #[token("'")]
    Quote,

    #[token("neuron")]
    KwNeuron,

    #[token("state")]
    KwState,

    #[token("parameters")]
    KwParameters,

    #[token("internals")]
    KwInternals,

    #[token("initial_values")]
    KwInitialValues,

    #[token("update")]
    KwUpdate,

    #[token("equations")]
    KwEquations,

    #[token("input")]
    KwInput,

    #[token("output")]
    KwOutput,

    #[token("end")]
    KwEnd,

    #[token("function")]
    KwFunction,

    #[token("shape")]
    KwShape,

    #[token("recordable")]
    KwRecordable,

    #[token("if")]
    KwIf,

    #[token("elif")]
    KwElif,

    #[token("else")]
    KwElse,

    #[token("while")]
    KwWhile,

    #[token("for")]
    KwFor,

    #[token("in")]
    KwIn,

    #[token("step")]
    KwStep,

    #[token("return")]
    KwReturn,

    #[token("and")]
    KwAnd,

    #[token("or")]
    KwOr,

    #[token("not")]
    KwNot,

    #[token("true")]
    #[token("True")]
    KwTrue,

    #[token("false")]
    #[token("False")]
    KwFalse,

    #[token("inf")]
    KwInf,

    #[token("integer")]
    KwInteger,

    #[token("real")]
    KwReal,

    #[token("string")]
    KwString,

    #[token("boolean")]
    KwBoolean,

    #[token("void")]
    KwVoid,

    #[token("current")]
    KwCurrent,

    #[token("spike")]
    KwSpike,

    #[token("inhibitory")]
    KwInhibitory,

    #[token("excitatory")]
    KwExcitatory,

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+")]
    Float,

    #[regex(r"[0-9]+")]
    Integer,

    #[regex(r#""[^"\n]*""#)]
    StringLiteral,

    /// Identifier. Defined after keywords so they take precedence.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Name,

    #[regex(r"[ \t]+")]
    Whitespace,

    #[token("\n")]
    #[token("\r\n")]
    Newline,

    #[regex(r"#[^\n]*", allow_greedy = true)]
    LineComment,

    /// Coalesced unrecognized characters
    Garbage,
    Error,

    // --- Node kinds (non-terminals) ---
    CompilationUnit,
    Neuron,
    BlockWithVariables,
    UpdateBlock,
    EquationsBlock,
    InputBlock,
    OutputBlock,
    Function,
    Parameter,
    InputLine,
    OdeEquation,
    OdeShape,
    OdeFunction,
    Block,
    Stmt,
    SmallStmt,
    CompoundStmt,
    Assignment,
    Declaration,
    SizeParameter,
    Invariant,
    ReturnStmt,
    IfStmt,
    IfClause,
    ElifClause,
    ElseClause,
    WhileStmt,
    ForStmt,
    Expression,
    SimpleExpression,
    UnaryOperator,
    Variable,
    FunctionCall,
    DataType,

    // Must be last - used for bounds checking in `kind_from_raw`
    #[doc(hidden)]
    __LAST,
}

use SyntaxKind::*;

impl SyntaxKind {
    #[inline]
    pub fn is_trivia(self) -> bool {
        matches!(self, Whitespace | LineComment)
    }

    #[inline]
    pub fn is_error(self) -> bool {
        matches!(self, Error | Garbage)
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    #[inline]
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

/// Language tag for Rowan's tree types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SomaLang {}

impl Language for SomaLang {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        assert!(raw.0 < __LAST as u16);
        // SAFETY: We've verified the value is in bounds, and SyntaxKind is repr(u16)
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// Type aliases for Rowan types parameterized by our language.
pub type SyntaxNode = rowan::SyntaxNode<SomaLang>;
pub type SyntaxToken = rowan::SyntaxToken<SomaLang>;
pub type SyntaxElement = rowan::NodeOrToken<SyntaxNode, SyntaxToken>;

/// 128-bit bitset of token `SyntaxKind`s for O(1) membership testing.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TokenSet(u128);

impl TokenSet {
    /// Creates an empty token set.
    pub const EMPTY: TokenSet = TokenSet(0);

    /// Panics at compile time if any kind's discriminant >= 128.
    #[inline]
    pub const fn new(kinds: &[SyntaxKind]) -> Self {
        let mut bits = 0u128;
        let mut i = 0;
        while i < kinds.len() {
            let kind = kinds[i] as u16;
            assert!(kind < 128, "SyntaxKind value exceeds TokenSet capacity");
            bits |= 1 << kind;
            i += 1;
        }
        TokenSet(bits)
    }

    #[inline]
    pub const fn single(kind: SyntaxKind) -> Self {
        let kind = kind as u16;
        assert!(kind < 128, "SyntaxKind value exceeds TokenSet capacity");
        TokenSet(1 << kind)
    }

    #[inline]
    pub const fn contains(&self, kind: SyntaxKind) -> bool {
        let kind = kind as u16;
        if kind >= 128 {
            return false;
        }
        self.0 & (1 << kind) != 0
    }

    #[inline]
    pub const fn union(self, other: TokenSet) -> TokenSet {
        TokenSet(self.0 | other.0)
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_set();
        for i in 0..128u16 {
            if self.0 & (1 << i) != 0 && i < __LAST as u16 {
                let kind: SyntaxKind = unsafe { std::mem::transmute(i) };
                list.entry(&kind);
            }
        }
        list.finish()
    }
}

/// Pre-defined token sets for the parser.
pub mod token_sets {
    use super::*;

    /// FIRST set of expressions.
    pub const EXPR_FIRST: TokenSet = TokenSet::new(&[
        ParenOpen,
        Plus,
        Minus,
        Tilde,
        KwNot,
        Integer,
        Float,
        KwTrue,
        KwFalse,
        KwInf,
        StringLiteral,
        Name,
    ]);

    /// Tokens that can open a data type.
    pub const DATA_TYPE_FIRST: TokenSet =
        TokenSet::new(&[KwInteger, KwReal, KwString, KwBoolean, KwVoid, Name]);

    /// Tokens that can open a statement inside `update` or a function body.
    pub const STMT_FIRST: TokenSet = TokenSet::new(&[
        Name,
        KwRecordable,
        KwFunction,
        KwReturn,
        KwIf,
        KwWhile,
        KwFor,
    ]);

    /// Tokens that can open a neuron body element.
    pub const BODY_ELEMENT_FIRST: TokenSet = TokenSet::new(&[
        KwState,
        KwParameters,
        KwInternals,
        KwInitialValues,
        KwUpdate,
        KwEquations,
        KwInput,
        KwOutput,
        KwFunction,
    ]);

    pub const ASSIGN_OPS: TokenSet =
        TokenSet::new(&[Assign, PlusAssign, MinusAssign, StarAssign, SlashAssign]);

    pub const COMPARISON_OPS: TokenSet = TokenSet::new(&[Lt, Le, EqEq, Ne, Ne2, Ge, Gt]);

    pub const BIT_OPS: TokenSet = TokenSet::new(&[Amp, Caret, Pipe, Shl, Shr]);

    pub const TRIVIA: TokenSet = TokenSet::new(&[Whitespace, LineComment]);
}
