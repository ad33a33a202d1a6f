//! Expression nodes.

use super::{Meta, impl_ast_node};
use crate::span::SourceSpan;

/// One expression of any shape. The shape lives in [`ExprKind`]; the node
/// itself carries the metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExprKind,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A literal, variable or function call.
    Simple(SimpleExpr),
    /// `-x`, `+x`, `~x`, `not x`
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    /// `(x)` - kept explicit so spans and comments survive.
    Encapsulated(Box<Expression>),
    /// `a <op> b`
    Binary {
        lhs: Box<Expression>,
        op: BinaryOp,
        rhs: Box<Expression>,
    },
    /// `cond ? a : b`
    Ternary {
        condition: Box<Expression>,
        if_true: Box<Expression>,
        if_not: Box<Expression>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimpleExpr {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Inf,
    Variable(Variable),
    Call(FunctionCall),
}

impl Expression {
    pub fn new(kind: ExprKind, span: SourceSpan) -> Self {
        Self {
            kind,
            meta: Meta::at(span),
        }
    }

    pub fn simple(simple: SimpleExpr, span: SourceSpan) -> Self {
        Self::new(ExprKind::Simple(simple), span)
    }
}

/// A (possibly differentiated) variable reference. `V_m''` has name `V_m`
/// and differential order 2.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub differential_order: usize,
    pub meta: Meta,
}

impl Variable {
    pub fn new(name: impl Into<String>, differential_order: usize, span: SourceSpan) -> Self {
        Self {
            name: name.into(),
            differential_order,
            meta: Meta::at(span),
        }
    }

    /// Name including derivative quotes, as written in the source.
    pub fn complete_name(&self) -> String {
        let mut name = self.name.clone();
        name.extend(std::iter::repeat_n('\'', self.differential_order));
        name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub callee_name: String,
    pub args: Vec<Expression>,
    pub meta: Meta,
}

impl FunctionCall {
    pub fn new(callee_name: impl Into<String>, args: Vec<Expression>, span: SourceSpan) -> Self {
        Self {
            callee_name: callee_name.into(),
            args,
            meta: Meta::at(span),
        }
    }
}

impl_ast_node!(Expression, Variable, FunctionCall);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Minus,
    BitwiseNot,
    LogicalNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Arithmetic(ArithmeticOp),
    Bit(BitOp),
    Comparison(ComparisonOp),
    Logical(LogicalOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitOp {
    And,
    Xor,
    Or,
    ShiftLeft,
    ShiftRight,
}

/// Both not-equal spellings (`!=` and `<>`) collapse to [`ComparisonOp::Ne`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}
