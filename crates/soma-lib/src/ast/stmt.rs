//! Statement and declaration nodes.

use super::expr::{Expression, FunctionCall, Variable};
use super::{Meta, impl_ast_node};

/// Sequence of statements forming the body of `update`, a user function
/// or a control-flow clause.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub meta: Meta,
}

/// A statement is exactly one of a small or a compound statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StmtKind,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Small(SmallStmt),
    Compound(CompoundStmt),
}

/// One-line statements.
#[derive(Debug, Clone, PartialEq)]
pub enum SmallStmt {
    Assignment(Assignment),
    Call(FunctionCall),
    Declaration(Declaration),
    Return(ReturnStmt),
}

/// Statements that carry a block and close with `end`.
#[derive(Debug, Clone, PartialEq)]
pub enum CompoundStmt {
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub lhs: Variable,
    pub op: AssignmentOp,
    pub expression: Expression,
    pub meta: Meta,
}

/// `=` and the compound forms. `x += e` keeps its operator here rather than
/// being desugared, so printers can reproduce the source form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentOp {
    Direct,
    Add,
    Sub,
    Mul,
    Div,
}

/// `recordable function g pA = I_syn * 2 [[g >= 0]]`
///
/// One declaration can introduce several variables; they share the type,
/// the initializer and the invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub is_recordable: bool,
    pub is_function: bool,
    pub variables: Vec<Variable>,
    pub data_type: DataType,
    pub size_parameter: Option<String>,
    pub expression: Option<Expression>,
    pub invariant: Option<Expression>,
    pub meta: Meta,
}

/// Builtin types plus physical units kept as written (`mV`, `ms**2`).
/// Unit checking happens in a later pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    Real,
    String,
    Boolean,
    Void,
    Unit(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub expression: Option<Expression>,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub if_clause: IfClause,
    pub elif_clauses: Vec<ElifClause>,
    pub else_clause: Option<ElseClause>,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    pub condition: Expression,
    pub block: Block,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElifClause {
    pub condition: Expression,
    pub block: Block,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseClause {
    pub block: Block,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Expression,
    pub block: Block,
    pub meta: Meta,
}

/// `for i in 1 ... 10 step 2: ... end`. The step defaults to 1 when the
/// source omits it.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub variable: String,
    pub start_from: Expression,
    pub end_at: Expression,
    pub step: f64,
    pub block: Block,
    pub meta: Meta,
}

impl_ast_node!(
    Block, Statement, Assignment, Declaration, ReturnStmt, IfStmt, IfClause, ElifClause,
    ElseClause, WhileStmt, ForStmt,
);
