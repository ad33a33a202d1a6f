//! The abstract syntax tree produced by lowering.
//!
//! Every node owns a [`Meta`] record: source span, attached comments, the
//! resolved scope and the implicit unit-conversion factor. `Meta` compares
//! equal to any other `Meta`, so derived `PartialEq` on nodes is purely
//! structural and two trees built from differently formatted sources still
//! compare equal.

pub mod expr;
pub mod model;
pub mod stmt;

#[cfg(test)]
mod ast_tests;

use std::rc::Rc;

use crate::span::SourceSpan;

pub use expr::{
    ArithmeticOp, BinaryOp, BitOp, ComparisonOp, ExprKind, Expression, FunctionCall, LogicalOp,
    SimpleExpr, UnaryOp, Variable,
};
pub use model::{
    BlockWithVariables, BodyElement, CompilationUnit, EquationsBlock, EquationsElement, Function,
    InputBlock, InputLine, InputQualifier, Neuron, OdeEquation, OdeFunction, OdeShape, OutputBlock,
    Parameter, SignalType, UpdateBlock, VarBlockKind,
};
pub use stmt::{
    Assignment, AssignmentOp, Block, CompoundStmt, DataType, Declaration, ElifClause, ElseClause,
    ForStmt, IfClause, IfStmt, ReturnStmt, SmallStmt, Statement, StmtKind, WhileStmt,
};

/// Scopes are built by a later pass and shared into the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub kind: ScopeKind,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Neuron,
    Function,
    Update,
}

pub type ScopeRef = Rc<Scope>;

/// Per-node metadata: position, comments, scope, unit conversion.
///
/// Excluded from equality on purpose. Two nodes are "the same" when their
/// structure matches, regardless of where they were parsed from or what
/// comments surround them.
#[derive(Debug, Clone)]
pub struct Meta {
    pub span: SourceSpan,
    pub scope: Option<ScopeRef>,
    pub pre_comments: Vec<String>,
    pub in_comment: Option<String>,
    pub post_comments: Vec<String>,
    pub implicit_conversion_factor: Option<f64>,
}

impl Meta {
    pub fn at(span: SourceSpan) -> Self {
        Self {
            span,
            scope: None,
            pre_comments: Vec::new(),
            in_comment: None,
            post_comments: Vec::new(),
            implicit_conversion_factor: None,
        }
    }
}

impl Default for Meta {
    fn default() -> Self {
        Self::at(SourceSpan::UNKNOWN)
    }
}

impl PartialEq for Meta {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// Common surface of every AST node.
pub trait AstNode {
    fn meta(&self) -> &Meta;
    fn meta_mut(&mut self) -> &mut Meta;

    fn span(&self) -> SourceSpan {
        self.meta().span
    }

    fn scope(&self) -> Option<&ScopeRef> {
        self.meta().scope.as_ref()
    }

    fn set_scope(&mut self, scope: ScopeRef) {
        self.meta_mut().scope = Some(scope);
    }

    /// All comments attached to the node, preceding first.
    fn comments(&self) -> Vec<&str> {
        let meta = self.meta();
        meta.pre_comments
            .iter()
            .map(String::as_str)
            .chain(meta.in_comment.as_deref())
            .chain(meta.post_comments.iter().map(String::as_str))
            .collect()
    }
}

macro_rules! impl_ast_node {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::ast::AstNode for $ty {
            fn meta(&self) -> &$crate::ast::Meta {
                &self.meta
            }
            fn meta_mut(&mut self) -> &mut $crate::ast::Meta {
                &mut self.meta
            }
        }
    )+};
}
pub(crate) use impl_ast_node;

/// Borrowed, type-erased view of any AST node.
///
/// Nodes hold no parent pointers, so parent lookup walks down from a root
/// comparing node addresses.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    CompilationUnit(&'a CompilationUnit),
    Neuron(&'a Neuron),
    BlockWithVariables(&'a BlockWithVariables),
    UpdateBlock(&'a UpdateBlock),
    EquationsBlock(&'a EquationsBlock),
    InputBlock(&'a InputBlock),
    OutputBlock(&'a OutputBlock),
    Function(&'a Function),
    Parameter(&'a Parameter),
    InputLine(&'a InputLine),
    OdeEquation(&'a OdeEquation),
    OdeShape(&'a OdeShape),
    OdeFunction(&'a OdeFunction),
    Block(&'a Block),
    Statement(&'a Statement),
    Assignment(&'a Assignment),
    Declaration(&'a Declaration),
    ReturnStmt(&'a ReturnStmt),
    IfStmt(&'a IfStmt),
    IfClause(&'a IfClause),
    ElifClause(&'a ElifClause),
    ElseClause(&'a ElseClause),
    WhileStmt(&'a WhileStmt),
    ForStmt(&'a ForStmt),
    Expression(&'a Expression),
    Variable(&'a Variable),
    FunctionCall(&'a FunctionCall),
}

macro_rules! impl_node_ref_from {
    ($($variant:ident => $ty:ty),+ $(,)?) => {$(
        impl<'a> From<&'a $ty> for NodeRef<'a> {
            fn from(node: &'a $ty) -> Self {
                NodeRef::$variant(node)
            }
        }
    )+};
}

impl_node_ref_from! {
    CompilationUnit => CompilationUnit,
    Neuron => Neuron,
    BlockWithVariables => BlockWithVariables,
    UpdateBlock => UpdateBlock,
    EquationsBlock => EquationsBlock,
    InputBlock => InputBlock,
    OutputBlock => OutputBlock,
    Function => Function,
    Parameter => Parameter,
    InputLine => InputLine,
    OdeEquation => OdeEquation,
    OdeShape => OdeShape,
    OdeFunction => OdeFunction,
    Block => Block,
    Statement => Statement,
    Assignment => Assignment,
    Declaration => Declaration,
    ReturnStmt => ReturnStmt,
    IfStmt => IfStmt,
    IfClause => IfClause,
    ElifClause => ElifClause,
    ElseClause => ElseClause,
    WhileStmt => WhileStmt,
    ForStmt => ForStmt,
    Expression => Expression,
    Variable => Variable,
    FunctionCall => FunctionCall,
}

impl<'a> NodeRef<'a> {
    /// Identity of the referenced node. Two `NodeRef`s pointing at the same
    /// node in the same tree agree here even if obtained separately.
    pub fn addr(&self) -> usize {
        match self {
            Self::CompilationUnit(n) => *n as *const _ as usize,
            Self::Neuron(n) => *n as *const _ as usize,
            Self::BlockWithVariables(n) => *n as *const _ as usize,
            Self::UpdateBlock(n) => *n as *const _ as usize,
            Self::EquationsBlock(n) => *n as *const _ as usize,
            Self::InputBlock(n) => *n as *const _ as usize,
            Self::OutputBlock(n) => *n as *const _ as usize,
            Self::Function(n) => *n as *const _ as usize,
            Self::Parameter(n) => *n as *const _ as usize,
            Self::InputLine(n) => *n as *const _ as usize,
            Self::OdeEquation(n) => *n as *const _ as usize,
            Self::OdeShape(n) => *n as *const _ as usize,
            Self::OdeFunction(n) => *n as *const _ as usize,
            Self::Block(n) => *n as *const _ as usize,
            Self::Statement(n) => *n as *const _ as usize,
            Self::Assignment(n) => *n as *const _ as usize,
            Self::Declaration(n) => *n as *const _ as usize,
            Self::ReturnStmt(n) => *n as *const _ as usize,
            Self::IfStmt(n) => *n as *const _ as usize,
            Self::IfClause(n) => *n as *const _ as usize,
            Self::ElifClause(n) => *n as *const _ as usize,
            Self::ElseClause(n) => *n as *const _ as usize,
            Self::WhileStmt(n) => *n as *const _ as usize,
            Self::ForStmt(n) => *n as *const _ as usize,
            Self::Expression(n) => *n as *const _ as usize,
            Self::Variable(n) => *n as *const _ as usize,
            Self::FunctionCall(n) => *n as *const _ as usize,
        }
    }

    pub fn meta(&self) -> &'a Meta {
        match self {
            Self::CompilationUnit(n) => n.meta(),
            Self::Neuron(n) => n.meta(),
            Self::BlockWithVariables(n) => n.meta(),
            Self::UpdateBlock(n) => n.meta(),
            Self::EquationsBlock(n) => n.meta(),
            Self::InputBlock(n) => n.meta(),
            Self::OutputBlock(n) => n.meta(),
            Self::Function(n) => n.meta(),
            Self::Parameter(n) => n.meta(),
            Self::InputLine(n) => n.meta(),
            Self::OdeEquation(n) => n.meta(),
            Self::OdeShape(n) => n.meta(),
            Self::OdeFunction(n) => n.meta(),
            Self::Block(n) => n.meta(),
            Self::Statement(n) => n.meta(),
            Self::Assignment(n) => n.meta(),
            Self::Declaration(n) => n.meta(),
            Self::ReturnStmt(n) => n.meta(),
            Self::IfStmt(n) => n.meta(),
            Self::IfClause(n) => n.meta(),
            Self::ElifClause(n) => n.meta(),
            Self::ElseClause(n) => n.meta(),
            Self::WhileStmt(n) => n.meta(),
            Self::ForStmt(n) => n.meta(),
            Self::Expression(n) => n.meta(),
            Self::Variable(n) => n.meta(),
            Self::FunctionCall(n) => n.meta(),
        }
    }

    pub fn span(&self) -> SourceSpan {
        self.meta().span
    }

    /// Direct children in declaration order.
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        match self {
            Self::CompilationUnit(n) => n.neurons.iter().map(NodeRef::from).collect(),
            Self::Neuron(n) => n
                .body
                .iter()
                .map(|element| match element {
                    BodyElement::Variables(b) => NodeRef::from(b),
                    BodyElement::Update(b) => NodeRef::from(b),
                    BodyElement::Equations(b) => NodeRef::from(b),
                    BodyElement::Input(b) => NodeRef::from(b),
                    BodyElement::Output(b) => NodeRef::from(b),
                    BodyElement::Function(b) => NodeRef::from(b),
                })
                .collect(),
            Self::BlockWithVariables(n) => n.declarations.iter().map(NodeRef::from).collect(),
            Self::UpdateBlock(n) => vec![NodeRef::from(&n.block)],
            Self::EquationsBlock(n) => n
                .equations
                .iter()
                .map(|element| match element {
                    EquationsElement::Equation(e) => NodeRef::from(e),
                    EquationsElement::Shape(e) => NodeRef::from(e),
                    EquationsElement::Function(e) => NodeRef::from(e),
                })
                .collect(),
            Self::InputBlock(n) => n.lines.iter().map(NodeRef::from).collect(),
            Self::OutputBlock(_) => Vec::new(),
            Self::Function(n) => {
                let mut children: Vec<NodeRef<'a>> =
                    n.parameters.iter().map(NodeRef::from).collect();
                children.push(NodeRef::from(&n.block));
                children
            }
            Self::Parameter(_) | Self::InputLine(_) | Self::Variable(_) => Vec::new(),
            Self::OdeEquation(n) => vec![NodeRef::from(&n.lhs), NodeRef::from(&n.rhs)],
            Self::OdeShape(n) => {
                vec![NodeRef::from(&n.variable), NodeRef::from(&n.expression)]
            }
            Self::OdeFunction(n) => vec![NodeRef::from(&n.expression)],
            Self::Block(n) => n.statements.iter().map(NodeRef::from).collect(),
            Self::Statement(n) => match &n.kind {
                StmtKind::Small(SmallStmt::Assignment(s)) => vec![NodeRef::from(s)],
                StmtKind::Small(SmallStmt::Call(s)) => vec![NodeRef::from(s)],
                StmtKind::Small(SmallStmt::Declaration(s)) => vec![NodeRef::from(s)],
                StmtKind::Small(SmallStmt::Return(s)) => vec![NodeRef::from(s)],
                StmtKind::Compound(CompoundStmt::If(s)) => vec![NodeRef::from(s)],
                StmtKind::Compound(CompoundStmt::While(s)) => vec![NodeRef::from(s)],
                StmtKind::Compound(CompoundStmt::For(s)) => vec![NodeRef::from(s)],
            },
            Self::Assignment(n) => vec![NodeRef::from(&n.lhs), NodeRef::from(&n.expression)],
            Self::Declaration(n) => {
                let mut children: Vec<NodeRef<'a>> =
                    n.variables.iter().map(NodeRef::from).collect();
                children.extend(n.expression.as_ref().map(NodeRef::from));
                children.extend(n.invariant.as_ref().map(NodeRef::from));
                children
            }
            Self::ReturnStmt(n) => n.expression.iter().map(NodeRef::from).collect(),
            Self::IfStmt(n) => {
                let mut children = vec![NodeRef::from(&n.if_clause)];
                children.extend(n.elif_clauses.iter().map(NodeRef::from));
                children.extend(n.else_clause.as_ref().map(NodeRef::from));
                children
            }
            Self::IfClause(n) => vec![NodeRef::from(&n.condition), NodeRef::from(&n.block)],
            Self::ElifClause(n) => vec![NodeRef::from(&n.condition), NodeRef::from(&n.block)],
            Self::ElseClause(n) => vec![NodeRef::from(&n.block)],
            Self::WhileStmt(n) => vec![NodeRef::from(&n.condition), NodeRef::from(&n.block)],
            Self::ForStmt(n) => vec![
                NodeRef::from(&n.start_from),
                NodeRef::from(&n.end_at),
                NodeRef::from(&n.block),
            ],
            Self::Expression(n) => match &n.kind {
                ExprKind::Simple(SimpleExpr::Variable(v)) => vec![NodeRef::from(v)],
                ExprKind::Simple(SimpleExpr::Call(c)) => vec![NodeRef::from(c)],
                ExprKind::Simple(_) => Vec::new(),
                ExprKind::Unary { operand, .. } => vec![NodeRef::from(operand.as_ref())],
                ExprKind::Encapsulated(inner) => vec![NodeRef::from(inner.as_ref())],
                ExprKind::Binary { lhs, rhs, .. } => {
                    vec![NodeRef::from(lhs.as_ref()), NodeRef::from(rhs.as_ref())]
                }
                ExprKind::Ternary {
                    condition,
                    if_true,
                    if_not,
                } => vec![
                    NodeRef::from(condition.as_ref()),
                    NodeRef::from(if_true.as_ref()),
                    NodeRef::from(if_not.as_ref()),
                ],
            },
            Self::FunctionCall(n) => n.args.iter().map(NodeRef::from).collect(),
        }
    }

    /// Finds the direct parent of `target` in the subtree rooted here.
    /// `target` must be a reference into the same tree.
    pub fn find_parent_of(&self, target: NodeRef<'a>) -> Option<NodeRef<'a>> {
        for child in self.children() {
            if child.addr() == target.addr() {
                return Some(*self);
            }
            if let Some(parent) = child.find_parent_of(target) {
                return Some(parent);
            }
        }
        None
    }

    /// Whether `target` is this node or lies anywhere beneath it.
    pub fn contains(&self, target: NodeRef<'a>) -> bool {
        if self.addr() == target.addr() {
            return true;
        }
        self.children().iter().any(|child| child.contains(target))
    }
}
