//! Lowering from the lossless syntax tree to the AST.
//!
//! The walk never aborts on user-level mistakes: unknown block kinds and
//! signal types become diagnostics and the offending node is skipped, so
//! one bad block still yields a usable tree for the rest of the model.
//! Structurally impossible trees (an expression with no recognizable
//! shape, a statement with no body) are a different matter and abort with
//! [`Error`].

pub(crate) mod order;
pub(crate) mod validation;

use crate::Error;
use crate::ast::{
    Assignment, AssignmentOp, BinaryOp, Block, BlockWithVariables, BodyElement, CompilationUnit,
    CompoundStmt, DataType, Declaration, ElifClause, ElseClause, EquationsBlock, EquationsElement,
    ExprKind, Expression, ForStmt, Function, FunctionCall, IfClause, IfStmt, InputBlock, InputLine,
    InputQualifier, Meta, Neuron, OdeEquation, OdeFunction, OdeShape, OutputBlock, Parameter,
    ReturnStmt, SignalType, SimpleExpr, SmallStmt, Statement, StmtKind, UnaryOp, UpdateBlock,
    VarBlockKind, Variable, WhileStmt,
};
use crate::ast::{ArithmeticOp, BitOp, ComparisonOp, LogicalOp};
use crate::comments::CommentIndex;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::parser::{SyntaxKind, SyntaxNode, SyntaxToken};
use crate::span::{LineIndex, SourceSpan};

/// Lowers a parsed artifact into a [`CompilationUnit`].
///
/// `source` must be the text the tree was built from; spans and comment
/// positions are computed against it. `artifact_name` is stamped onto the
/// unit and every neuron, so nodes stay attributable when several files
/// are compiled together.
pub fn lower(
    root: &SyntaxNode,
    source: &str,
    artifact_name: &str,
) -> Result<(CompilationUnit, Diagnostics), Error> {
    let lines = LineIndex::new(source);
    let comments = CommentIndex::build(root, &lines);
    let mut builder = AstBuilder {
        lines,
        comments,
        diagnostics: Diagnostics::new(),
        artifact_name: artifact_name.to_string(),
        current_neuron: None,
    };
    let unit = builder.compilation_unit(root)?;
    Ok((unit, builder.diagnostics))
}

struct AstBuilder {
    lines: LineIndex,
    comments: CommentIndex,
    diagnostics: Diagnostics,
    artifact_name: String,
    current_neuron: Option<String>,
}

impl AstBuilder {
    fn span_of(&self, node: &SyntaxNode) -> SourceSpan {
        self.lines.span(node.text_range())
    }

    fn report(&mut self, kind: DiagnosticKind, span: SourceSpan, message: impl Into<String>) {
        self.diagnostics
            .report(kind, span)
            .message(message)
            .neuron(self.current_neuron.clone())
            .emit();
    }

    fn fatal_statement(&self, node: &SyntaxNode) -> Error {
        let span = self.span_of(node);
        Error::MalformedStatement {
            line: span.start_line,
            col: span.start_col,
        }
    }

    fn fatal_expression(&self, node: &SyntaxNode) -> Error {
        let span = self.span_of(node);
        Error::MalformedExpression {
            line: span.start_line,
            col: span.start_col,
        }
    }

    /// Builds a node's metadata, claiming the comments that document it.
    /// Sibling bounds keep a comment between two nodes from being claimed
    /// by the wrong one.
    fn meta_for(
        &mut self,
        node: &SyntaxNode,
        prev: Option<&SyntaxNode>,
        next: Option<&SyntaxNode>,
    ) -> Meta {
        let span = self.span_of(node);
        let prev_end = prev.map(|n| self.lines.span(n.text_range()).end_line);
        let next_start = next.map(|n| self.lines.span(n.text_range()).start_line);
        let claimed = self.comments.claim_for(span, prev_end, next_start);
        let mut meta = Meta::at(span);
        meta.pre_comments = claimed.pre;
        meta.in_comment = claimed.trailing;
        meta.post_comments = claimed.post;
        meta
    }

    fn compilation_unit(&mut self, node: &SyntaxNode) -> Result<CompilationUnit, Error> {
        let neuron_nodes: Vec<SyntaxNode> = child_nodes(node, SyntaxKind::Neuron);
        let mut neurons = Vec::with_capacity(neuron_nodes.len());
        for (index, neuron_node) in neuron_nodes.iter().enumerate() {
            let prev = index.checked_sub(1).and_then(|i| neuron_nodes.get(i));
            let next = neuron_nodes.get(index + 1);
            neurons.push(self.neuron(neuron_node, prev, next)?);
        }
        let unit = CompilationUnit {
            artifact_name: self.artifact_name.clone(),
            neurons,
            meta: Meta::at(self.span_of(node)),
        };
        validation::check_unique_neuron_names(&unit, &mut self.diagnostics);
        Ok(unit)
    }

    fn neuron(
        &mut self,
        node: &SyntaxNode,
        prev: Option<&SyntaxNode>,
        next: Option<&SyntaxNode>,
    ) -> Result<Neuron, Error> {
        let name = find_token(node, SyntaxKind::Name)
            .map(|t| t.text().to_string())
            .ok_or_else(|| self.fatal_statement(node))?;
        self.current_neuron = Some(name.clone());
        let meta = self.meta_for(node, prev, next);

        let block_nodes: Vec<SyntaxNode> = node
            .children()
            .filter(|child| {
                matches!(
                    child.kind(),
                    SyntaxKind::BlockWithVariables
                        | SyntaxKind::UpdateBlock
                        | SyntaxKind::EquationsBlock
                        | SyntaxKind::InputBlock
                        | SyntaxKind::OutputBlock
                        | SyntaxKind::Function
                )
            })
            .collect();
        let ordered = order::drain_in_source_order(block_nodes, &self.lines);

        let mut body = Vec::with_capacity(ordered.len());
        for (index, element_node) in ordered.iter().enumerate() {
            let prev = index.checked_sub(1).and_then(|i| ordered.get(i));
            let next = ordered.get(index + 1);
            if let Some(element) = self.body_element(element_node, prev, next)? {
                body.push(element);
            }
        }

        let neuron = Neuron {
            name,
            artifact_name: self.artifact_name.clone(),
            body,
            meta,
        };
        validation::check_unique_block_kinds(&neuron, &mut self.diagnostics);
        self.current_neuron = None;
        Ok(neuron)
    }

    fn body_element(
        &mut self,
        node: &SyntaxNode,
        prev: Option<&SyntaxNode>,
        next: Option<&SyntaxNode>,
    ) -> Result<Option<BodyElement>, Error> {
        match node.kind() {
            SyntaxKind::BlockWithVariables => Ok(self
                .block_with_variables(node, prev, next)?
                .map(BodyElement::Variables)),
            SyntaxKind::UpdateBlock => {
                Ok(Some(BodyElement::Update(self.update_block(node, prev, next)?)))
            }
            SyntaxKind::EquationsBlock => Ok(Some(BodyElement::Equations(
                self.equations_block(node, prev, next)?,
            ))),
            SyntaxKind::InputBlock => {
                Ok(Some(BodyElement::Input(self.input_block(node, prev, next)?)))
            }
            SyntaxKind::OutputBlock => {
                Ok(self.output_block(node, prev, next).map(BodyElement::Output))
            }
            SyntaxKind::Function => {
                Ok(Some(BodyElement::Function(self.function(node, prev, next)?)))
            }
            _ => Err(self.fatal_statement(node)),
        }
    }

    /// Returns `None` when the block kind is not one of the four known
    /// ones; the walk continues with the remaining blocks.
    fn block_with_variables(
        &mut self,
        node: &SyntaxNode,
        prev: Option<&SyntaxNode>,
        next: Option<&SyntaxNode>,
    ) -> Result<Option<BlockWithVariables>, Error> {
        let kind = direct_tokens(node).find_map(|t| match t.kind() {
            SyntaxKind::KwState => Some(VarBlockKind::State),
            SyntaxKind::KwParameters => Some(VarBlockKind::Parameters),
            SyntaxKind::KwInternals => Some(VarBlockKind::Internals),
            SyntaxKind::KwInitialValues => Some(VarBlockKind::InitialValues),
            _ => None,
        });
        let Some(kind) = kind else {
            let span = self.span_of(node);
            self.report(
                DiagnosticKind::UnknownBlockKind,
                span,
                "expected `state`, `parameters`, `internals` or `initial_values`",
            );
            return Ok(None);
        };

        let meta = self.meta_for(node, prev, next);
        let declaration_nodes = child_nodes(node, SyntaxKind::Declaration);
        let mut declarations = Vec::with_capacity(declaration_nodes.len());
        for (index, declaration_node) in declaration_nodes.iter().enumerate() {
            let prev = index.checked_sub(1).and_then(|i| declaration_nodes.get(i));
            let next = declaration_nodes.get(index + 1);
            if let Some(declaration) = self.declaration(declaration_node, prev, next)? {
                declarations.push(declaration);
            }
        }

        Ok(Some(BlockWithVariables {
            kind,
            declarations,
            meta,
        }))
    }

    /// Returns `None` when the declaration has no usable data type; the
    /// parser has already pointed at the gap.
    fn declaration(
        &mut self,
        node: &SyntaxNode,
        prev: Option<&SyntaxNode>,
        next: Option<&SyntaxNode>,
    ) -> Result<Option<Declaration>, Error> {
        let meta = self.meta_for(node, prev, next);
        let is_recordable = has_token(node, SyntaxKind::KwRecordable);
        let is_function = has_token(node, SyntaxKind::KwFunction);

        let variable_nodes = child_nodes(node, SyntaxKind::Variable);
        if variable_nodes.is_empty() {
            return Err(self.fatal_statement(node));
        }
        let mut variables = Vec::with_capacity(variable_nodes.len());
        for variable_node in &variable_nodes {
            variables.push(self.variable(variable_node)?);
        }

        let Some(data_type) = child_node(node, SyntaxKind::DataType)
            .and_then(|type_node| self.data_type(&type_node))
        else {
            return Ok(None);
        };

        let size_parameter =
            child_node(node, SyntaxKind::SizeParameter).and_then(|n| size_parameter_text(&n));

        let expression = match child_node(node, SyntaxKind::Expression) {
            Some(expression_node) => Some(self.expression(&expression_node)?),
            None => None,
        };

        let invariant = match child_node(node, SyntaxKind::Invariant)
            .and_then(|n| child_node(&n, SyntaxKind::Expression))
        {
            Some(expression_node) => Some(self.expression(&expression_node)?),
            None => None,
        };

        Ok(Some(Declaration {
            is_recordable,
            is_function,
            variables,
            data_type,
            size_parameter,
            expression,
            invariant,
            meta,
        }))
    }

    fn data_type(&mut self, node: &SyntaxNode) -> Option<DataType> {
        if let Some(builtin) = direct_tokens(node).find_map(|t| match t.kind() {
            SyntaxKind::KwInteger => Some(DataType::Integer),
            SyntaxKind::KwReal => Some(DataType::Real),
            SyntaxKind::KwString => Some(DataType::String),
            SyntaxKind::KwBoolean => Some(DataType::Boolean),
            SyntaxKind::KwVoid => Some(DataType::Void),
            _ => None,
        }) {
            return Some(builtin);
        }
        let unit = node.text().to_string().trim().to_string();
        if unit.is_empty() {
            return None;
        }
        Some(DataType::Unit(unit))
    }

    fn update_block(
        &mut self,
        node: &SyntaxNode,
        prev: Option<&SyntaxNode>,
        next: Option<&SyntaxNode>,
    ) -> Result<UpdateBlock, Error> {
        let meta = self.meta_for(node, prev, next);
        let block_node =
            child_node(node, SyntaxKind::Block).ok_or_else(|| self.fatal_statement(node))?;
        Ok(UpdateBlock {
            block: self.block(&block_node)?,
            meta,
        })
    }

    fn equations_block(
        &mut self,
        node: &SyntaxNode,
        prev: Option<&SyntaxNode>,
        next: Option<&SyntaxNode>,
    ) -> Result<EquationsBlock, Error> {
        let meta = self.meta_for(node, prev, next);
        let element_nodes: Vec<SyntaxNode> = node
            .children()
            .filter(|child| {
                matches!(
                    child.kind(),
                    SyntaxKind::OdeEquation | SyntaxKind::OdeShape | SyntaxKind::OdeFunction
                )
            })
            .collect();
        let ordered = order::drain_in_source_order(element_nodes, &self.lines);

        let mut equations = Vec::with_capacity(ordered.len());
        for (index, element_node) in ordered.iter().enumerate() {
            let prev = index.checked_sub(1).and_then(|i| ordered.get(i));
            let next = ordered.get(index + 1);
            let element = match element_node.kind() {
                SyntaxKind::OdeEquation => Some(EquationsElement::Equation(
                    self.ode_equation(element_node, prev, next)?,
                )),
                SyntaxKind::OdeShape => Some(EquationsElement::Shape(
                    self.ode_shape(element_node, prev, next)?,
                )),
                SyntaxKind::OdeFunction => self
                    .ode_function(element_node, prev, next)?
                    .map(EquationsElement::Function),
                _ => None,
            };
            equations.extend(element);
        }

        Ok(EquationsBlock { equations, meta })
    }

    fn ode_equation(
        &mut self,
        node: &SyntaxNode,
        prev: Option<&SyntaxNode>,
        next: Option<&SyntaxNode>,
    ) -> Result<OdeEquation, Error> {
        let meta = self.meta_for(node, prev, next);
        let lhs_node =
            child_node(node, SyntaxKind::Variable).ok_or_else(|| self.fatal_statement(node))?;
        let rhs_node =
            child_node(node, SyntaxKind::Expression).ok_or_else(|| self.fatal_statement(node))?;
        Ok(OdeEquation {
            lhs: self.variable(&lhs_node)?,
            rhs: self.expression(&rhs_node)?,
            meta,
        })
    }

    fn ode_shape(
        &mut self,
        node: &SyntaxNode,
        prev: Option<&SyntaxNode>,
        next: Option<&SyntaxNode>,
    ) -> Result<OdeShape, Error> {
        let meta = self.meta_for(node, prev, next);
        let variable_node =
            child_node(node, SyntaxKind::Variable).ok_or_else(|| self.fatal_statement(node))?;
        let expression_node =
            child_node(node, SyntaxKind::Expression).ok_or_else(|| self.fatal_statement(node))?;
        Ok(OdeShape {
            variable: self.variable(&variable_node)?,
            expression: self.expression(&expression_node)?,
            meta,
        })
    }

    fn ode_function(
        &mut self,
        node: &SyntaxNode,
        prev: Option<&SyntaxNode>,
        next: Option<&SyntaxNode>,
    ) -> Result<Option<OdeFunction>, Error> {
        let meta = self.meta_for(node, prev, next);
        let is_recordable = has_token(node, SyntaxKind::KwRecordable);
        let variable_name = find_token(node, SyntaxKind::Name)
            .map(|t| t.text().to_string())
            .ok_or_else(|| self.fatal_statement(node))?;
        let Some(data_type) = child_node(node, SyntaxKind::DataType)
            .and_then(|type_node| self.data_type(&type_node))
        else {
            return Ok(None);
        };
        let expression_node =
            child_node(node, SyntaxKind::Expression).ok_or_else(|| self.fatal_statement(node))?;
        Ok(Some(OdeFunction {
            is_recordable,
            variable_name,
            data_type,
            expression: self.expression(&expression_node)?,
            meta,
        }))
    }

    fn input_block(
        &mut self,
        node: &SyntaxNode,
        prev: Option<&SyntaxNode>,
        next: Option<&SyntaxNode>,
    ) -> Result<InputBlock, Error> {
        let meta = self.meta_for(node, prev, next);
        let line_nodes = child_nodes(node, SyntaxKind::InputLine);
        let mut lines = Vec::with_capacity(line_nodes.len());
        for (index, line_node) in line_nodes.iter().enumerate() {
            let prev = index.checked_sub(1).and_then(|i| line_nodes.get(i));
            let next = line_nodes.get(index + 1);
            if let Some(line) = self.input_line(line_node, prev, next)? {
                lines.push(line);
            }
        }
        Ok(InputBlock { lines, meta })
    }

    /// Returns `None` for a port without a recognizable signal type.
    fn input_line(
        &mut self,
        node: &SyntaxNode,
        prev: Option<&SyntaxNode>,
        next: Option<&SyntaxNode>,
    ) -> Result<Option<InputLine>, Error> {
        let meta = self.meta_for(node, prev, next);
        let name = find_token(node, SyntaxKind::Name)
            .map(|t| t.text().to_string())
            .ok_or_else(|| self.fatal_statement(node))?;

        let signal_type = direct_tokens(node).find_map(|t| match t.kind() {
            SyntaxKind::KwSpike => Some(SignalType::Spike),
            SyntaxKind::KwCurrent => Some(SignalType::Current),
            _ => None,
        });
        let Some(signal_type) = signal_type else {
            let span = meta.span;
            self.report(
                DiagnosticKind::UnknownSignalType,
                span,
                format!("input port `{name}` must end in `spike` or `current`"),
            );
            return Ok(None);
        };

        let size_parameter =
            child_node(node, SyntaxKind::SizeParameter).and_then(|n| size_parameter_text(&n));
        let data_type =
            child_node(node, SyntaxKind::DataType).and_then(|type_node| self.data_type(&type_node));
        let qualifiers = direct_tokens(node)
            .filter_map(|t| match t.kind() {
                SyntaxKind::KwInhibitory => Some(InputQualifier::Inhibitory),
                SyntaxKind::KwExcitatory => Some(InputQualifier::Excitatory),
                _ => None,
            })
            .collect();

        Ok(Some(InputLine {
            name,
            size_parameter,
            data_type,
            qualifiers,
            signal_type,
            meta,
        }))
    }

    /// Returns `None` for an output block without a recognizable signal
    /// type, mirroring the input-port policy.
    fn output_block(
        &mut self,
        node: &SyntaxNode,
        prev: Option<&SyntaxNode>,
        next: Option<&SyntaxNode>,
    ) -> Option<OutputBlock> {
        let meta = self.meta_for(node, prev, next);
        let signal_type = direct_tokens(node).find_map(|t| match t.kind() {
            SyntaxKind::KwSpike => Some(SignalType::Spike),
            SyntaxKind::KwCurrent => Some(SignalType::Current),
            _ => None,
        });
        let Some(signal_type) = signal_type else {
            let span = meta.span;
            self.report(
                DiagnosticKind::UnknownSignalType,
                span,
                "output must be `spike` or `current`",
            );
            return None;
        };
        Some(OutputBlock { signal_type, meta })
    }

    fn function(
        &mut self,
        node: &SyntaxNode,
        prev: Option<&SyntaxNode>,
        next: Option<&SyntaxNode>,
    ) -> Result<Function, Error> {
        let meta = self.meta_for(node, prev, next);
        let name = find_token(node, SyntaxKind::Name)
            .map(|t| t.text().to_string())
            .ok_or_else(|| self.fatal_statement(node))?;

        let mut parameters = Vec::new();
        for parameter_node in child_nodes(node, SyntaxKind::Parameter) {
            if let Some(parameter) = self.parameter(&parameter_node) {
                parameters.push(parameter);
            }
        }

        // A DataType directly under the function node is the return type;
        // parameter types live inside their Parameter nodes.
        let return_type =
            child_node(node, SyntaxKind::DataType).and_then(|type_node| self.data_type(&type_node));

        let block_node =
            child_node(node, SyntaxKind::Block).ok_or_else(|| self.fatal_statement(node))?;
        Ok(Function {
            name,
            parameters,
            return_type,
            block: self.block(&block_node)?,
            meta,
        })
    }

    fn parameter(&mut self, node: &SyntaxNode) -> Option<Parameter> {
        let meta = Meta::at(self.span_of(node));
        let name = find_token(node, SyntaxKind::Name)?.text().to_string();
        let data_type =
            child_node(node, SyntaxKind::DataType).and_then(|type_node| self.data_type(&type_node))?;
        Some(Parameter {
            name,
            data_type,
            meta,
        })
    }

    fn block(&mut self, node: &SyntaxNode) -> Result<Block, Error> {
        let stmt_nodes = child_nodes(node, SyntaxKind::Stmt);
        let mut statements = Vec::with_capacity(stmt_nodes.len());
        for (index, stmt_node) in stmt_nodes.iter().enumerate() {
            let prev = index.checked_sub(1).and_then(|i| stmt_nodes.get(i));
            let next = stmt_nodes.get(index + 1);
            if let Some(statement) = self.statement(stmt_node, prev, next)? {
                statements.push(statement);
            }
        }
        Ok(Block {
            statements,
            meta: Meta::at(self.span_of(node)),
        })
    }

    /// A statement wraps exactly one small or compound statement; anything
    /// else is a structural defect.
    fn statement(
        &mut self,
        node: &SyntaxNode,
        prev: Option<&SyntaxNode>,
        next: Option<&SyntaxNode>,
    ) -> Result<Option<Statement>, Error> {
        let meta = self.meta_for(node, prev, next);
        let inner: Vec<SyntaxNode> = node
            .children()
            .filter(|child| {
                matches!(child.kind(), SyntaxKind::SmallStmt | SyntaxKind::CompoundStmt)
            })
            .collect();
        let [inner] = inner.as_slice() else {
            return Err(self.fatal_statement(node));
        };
        let kind = match inner.kind() {
            SyntaxKind::SmallStmt => match self.small_stmt(inner)? {
                Some(small) => StmtKind::Small(small),
                None => return Ok(None),
            },
            _ => StmtKind::Compound(self.compound_stmt(inner)?),
        };
        Ok(Some(Statement { kind, meta }))
    }

    fn small_stmt(&mut self, node: &SyntaxNode) -> Result<Option<SmallStmt>, Error> {
        let inner: Vec<SyntaxNode> = node
            .children()
            .filter(|child| {
                matches!(
                    child.kind(),
                    SyntaxKind::Assignment
                        | SyntaxKind::FunctionCall
                        | SyntaxKind::Declaration
                        | SyntaxKind::ReturnStmt
                )
            })
            .collect();
        let [inner] = inner.as_slice() else {
            return Err(self.fatal_statement(node));
        };
        Ok(match inner.kind() {
            SyntaxKind::Assignment => Some(SmallStmt::Assignment(self.assignment(inner)?)),
            SyntaxKind::FunctionCall => Some(SmallStmt::Call(self.function_call(inner)?)),
            SyntaxKind::Declaration => self
                .declaration(inner, None, None)?
                .map(SmallStmt::Declaration),
            _ => Some(SmallStmt::Return(self.return_stmt(inner)?)),
        })
    }

    fn compound_stmt(&mut self, node: &SyntaxNode) -> Result<CompoundStmt, Error> {
        let inner: Vec<SyntaxNode> = node
            .children()
            .filter(|child| {
                matches!(
                    child.kind(),
                    SyntaxKind::IfStmt | SyntaxKind::WhileStmt | SyntaxKind::ForStmt
                )
            })
            .collect();
        let [inner] = inner.as_slice() else {
            return Err(self.fatal_statement(node));
        };
        Ok(match inner.kind() {
            SyntaxKind::IfStmt => CompoundStmt::If(self.if_stmt(inner)?),
            SyntaxKind::WhileStmt => CompoundStmt::While(self.while_stmt(inner)?),
            _ => CompoundStmt::For(self.for_stmt(inner)?),
        })
    }

    fn assignment(&mut self, node: &SyntaxNode) -> Result<Assignment, Error> {
        let meta = Meta::at(self.span_of(node));
        let lhs_node =
            child_node(node, SyntaxKind::Variable).ok_or_else(|| self.fatal_statement(node))?;
        let op = direct_tokens(node)
            .find_map(|t| match t.kind() {
                SyntaxKind::Assign => Some(AssignmentOp::Direct),
                SyntaxKind::PlusAssign => Some(AssignmentOp::Add),
                SyntaxKind::MinusAssign => Some(AssignmentOp::Sub),
                SyntaxKind::StarAssign => Some(AssignmentOp::Mul),
                SyntaxKind::SlashAssign => Some(AssignmentOp::Div),
                _ => None,
            })
            .ok_or_else(|| self.fatal_statement(node))?;
        let expression_node =
            child_node(node, SyntaxKind::Expression).ok_or_else(|| self.fatal_statement(node))?;
        Ok(Assignment {
            lhs: self.variable(&lhs_node)?,
            op,
            expression: self.expression(&expression_node)?,
            meta,
        })
    }

    fn return_stmt(&mut self, node: &SyntaxNode) -> Result<ReturnStmt, Error> {
        let meta = Meta::at(self.span_of(node));
        let expression = match child_node(node, SyntaxKind::Expression) {
            Some(expression_node) => Some(self.expression(&expression_node)?),
            None => None,
        };
        Ok(ReturnStmt { expression, meta })
    }

    fn if_stmt(&mut self, node: &SyntaxNode) -> Result<IfStmt, Error> {
        let meta = Meta::at(self.span_of(node));
        let if_clause_node =
            child_node(node, SyntaxKind::IfClause).ok_or_else(|| self.fatal_statement(node))?;
        let (condition, block) = self.clause(&if_clause_node)?;
        let if_clause = IfClause {
            condition,
            block,
            meta: Meta::at(self.span_of(&if_clause_node)),
        };

        let mut elif_clauses = Vec::new();
        for elif_node in child_nodes(node, SyntaxKind::ElifClause) {
            let (condition, block) = self.clause(&elif_node)?;
            elif_clauses.push(ElifClause {
                condition,
                block,
                meta: Meta::at(self.span_of(&elif_node)),
            });
        }

        let else_clause = match child_node(node, SyntaxKind::ElseClause) {
            Some(else_node) => {
                let block_node = child_node(&else_node, SyntaxKind::Block)
                    .ok_or_else(|| self.fatal_statement(&else_node))?;
                Some(ElseClause {
                    block: self.block(&block_node)?,
                    meta: Meta::at(self.span_of(&else_node)),
                })
            }
            None => None,
        };

        Ok(IfStmt {
            if_clause,
            elif_clauses,
            else_clause,
            meta,
        })
    }

    fn clause(&mut self, node: &SyntaxNode) -> Result<(Expression, Block), Error> {
        let condition_node =
            child_node(node, SyntaxKind::Expression).ok_or_else(|| self.fatal_statement(node))?;
        let block_node =
            child_node(node, SyntaxKind::Block).ok_or_else(|| self.fatal_statement(node))?;
        Ok((self.expression(&condition_node)?, self.block(&block_node)?))
    }

    fn while_stmt(&mut self, node: &SyntaxNode) -> Result<WhileStmt, Error> {
        let meta = Meta::at(self.span_of(node));
        let (condition, block) = self.clause(node)?;
        Ok(WhileStmt {
            condition,
            block,
            meta,
        })
    }

    fn for_stmt(&mut self, node: &SyntaxNode) -> Result<ForStmt, Error> {
        let meta = Meta::at(self.span_of(node));
        let variable = find_token(node, SyntaxKind::Name)
            .map(|t| t.text().to_string())
            .ok_or_else(|| self.fatal_statement(node))?;

        let bounds = child_nodes(node, SyntaxKind::Expression);
        let [from_node, to_node] = bounds.as_slice() else {
            return Err(self.fatal_statement(node));
        };

        let step = self.for_step(node);

        let block_node =
            child_node(node, SyntaxKind::Block).ok_or_else(|| self.fatal_statement(node))?;
        Ok(ForStmt {
            variable,
            start_from: self.expression(from_node)?,
            end_at: self.expression(to_node)?,
            step,
            block: self.block(&block_node)?,
            meta,
        })
    }

    /// The `step` clause is a signed numeric literal; it defaults to 1.
    fn for_step(&mut self, node: &SyntaxNode) -> f64 {
        let tokens: Vec<SyntaxToken> = direct_tokens(node).collect();
        let Some(step_pos) = tokens.iter().position(|t| t.kind() == SyntaxKind::KwStep) else {
            return 1.0;
        };
        let mut sign = 1.0;
        for token in &tokens[step_pos + 1..] {
            match token.kind() {
                SyntaxKind::Minus => sign = -1.0,
                SyntaxKind::Integer | SyntaxKind::Float => {
                    return token.text().parse::<f64>().map_or(1.0, |value| sign * value);
                }
                SyntaxKind::Colon => break,
                _ => {}
            }
        }
        1.0
    }

    fn variable(&mut self, node: &SyntaxNode) -> Result<Variable, Error> {
        let name = find_token(node, SyntaxKind::Name)
            .map(|t| t.text().to_string())
            .ok_or_else(|| self.fatal_statement(node))?;
        let differential_order = direct_tokens(node)
            .filter(|t| t.kind() == SyntaxKind::Quote)
            .count();
        Ok(Variable {
            name,
            differential_order,
            meta: Meta::at(self.span_of(node)),
        })
    }

    fn function_call(&mut self, node: &SyntaxNode) -> Result<FunctionCall, Error> {
        let callee_name = find_token(node, SyntaxKind::Name)
            .map(|t| t.text().to_string())
            .ok_or_else(|| self.fatal_expression(node))?;
        let mut args = Vec::new();
        for arg_node in child_nodes(node, SyntaxKind::Expression) {
            args.push(self.expression(&arg_node)?);
        }
        Ok(FunctionCall {
            callee_name,
            args,
            meta: Meta::at(self.span_of(node)),
        })
    }

    /// Resolves which of the five expression shapes a node has, most
    /// specific first: atom, unary, parenthesized, binary, ternary. A node
    /// matching none of them aborts the pass.
    fn expression(&mut self, node: &SyntaxNode) -> Result<Expression, Error> {
        let span = self.span_of(node);
        let operands = child_nodes(node, SyntaxKind::Expression);

        if let Some(simple_node) = child_node(node, SyntaxKind::SimpleExpression) {
            return self.simple_expression(&simple_node);
        }

        if let Some(unary_node) = child_node(node, SyntaxKind::UnaryOperator) {
            let op = direct_tokens(&unary_node)
                .find_map(|t| match t.kind() {
                    SyntaxKind::Plus => Some(UnaryOp::Plus),
                    SyntaxKind::Minus => Some(UnaryOp::Minus),
                    SyntaxKind::Tilde => Some(UnaryOp::BitwiseNot),
                    SyntaxKind::KwNot => Some(UnaryOp::LogicalNot),
                    _ => None,
                })
                .ok_or_else(|| self.fatal_expression(node))?;
            let [operand] = operands.as_slice() else {
                return Err(self.fatal_expression(node));
            };
            return Ok(Expression::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(self.expression(operand)?),
                },
                span,
            ));
        }

        if has_token(node, SyntaxKind::ParenOpen) {
            let [inner] = operands.as_slice() else {
                return Err(self.fatal_expression(node));
            };
            return Ok(Expression::new(
                ExprKind::Encapsulated(Box::new(self.expression(inner)?)),
                span,
            ));
        }

        if let Some(op) = direct_tokens(node).find_map(|t| binary_op(t.kind())) {
            let [lhs, rhs] = operands.as_slice() else {
                return Err(self.fatal_expression(node));
            };
            return Ok(Expression::new(
                ExprKind::Binary {
                    lhs: Box::new(self.expression(lhs)?),
                    op,
                    rhs: Box::new(self.expression(rhs)?),
                },
                span,
            ));
        }

        if has_token(node, SyntaxKind::Question) {
            let [condition, if_true, if_not] = operands.as_slice() else {
                return Err(self.fatal_expression(node));
            };
            return Ok(Expression::new(
                ExprKind::Ternary {
                    condition: Box::new(self.expression(condition)?),
                    if_true: Box::new(self.expression(if_true)?),
                    if_not: Box::new(self.expression(if_not)?),
                },
                span,
            ));
        }

        Err(self.fatal_expression(node))
    }

    fn simple_expression(&mut self, node: &SyntaxNode) -> Result<Expression, Error> {
        let span = self.span_of(node);

        if let Some(variable_node) = child_node(node, SyntaxKind::Variable) {
            let variable = self.variable(&variable_node)?;
            return Ok(Expression::simple(SimpleExpr::Variable(variable), span));
        }
        if let Some(call_node) = child_node(node, SyntaxKind::FunctionCall) {
            let call = self.function_call(&call_node)?;
            return Ok(Expression::simple(SimpleExpr::Call(call), span));
        }

        let token = direct_tokens(node)
            .find(|t| {
                matches!(
                    t.kind(),
                    SyntaxKind::Integer
                        | SyntaxKind::Float
                        | SyntaxKind::KwTrue
                        | SyntaxKind::KwFalse
                        | SyntaxKind::KwInf
                        | SyntaxKind::StringLiteral
                )
            })
            .ok_or_else(|| self.fatal_expression(node))?;

        let simple = match token.kind() {
            SyntaxKind::Integer => match token.text().parse::<i64>() {
                Ok(value) => SimpleExpr::Integer(value),
                Err(_) => {
                    self.report(
                        DiagnosticKind::UnexpectedToken,
                        span,
                        "integer literal out of range",
                    );
                    SimpleExpr::Integer(0)
                }
            },
            SyntaxKind::Float => SimpleExpr::Float(token.text().parse::<f64>().unwrap_or(0.0)),
            SyntaxKind::KwTrue => SimpleExpr::Boolean(true),
            SyntaxKind::KwFalse => SimpleExpr::Boolean(false),
            SyntaxKind::KwInf => SimpleExpr::Inf,
            _ => SimpleExpr::String(strip_quotes(token.text())),
        };
        Ok(Expression::simple(simple, span))
    }
}

fn binary_op(kind: SyntaxKind) -> Option<BinaryOp> {
    Some(match kind {
        SyntaxKind::Plus => BinaryOp::Arithmetic(ArithmeticOp::Add),
        SyntaxKind::Minus => BinaryOp::Arithmetic(ArithmeticOp::Sub),
        SyntaxKind::Star => BinaryOp::Arithmetic(ArithmeticOp::Mul),
        SyntaxKind::Slash => BinaryOp::Arithmetic(ArithmeticOp::Div),
        SyntaxKind::Percent => BinaryOp::Arithmetic(ArithmeticOp::Mod),
        SyntaxKind::Pow => BinaryOp::Arithmetic(ArithmeticOp::Pow),
        SyntaxKind::Amp => BinaryOp::Bit(BitOp::And),
        SyntaxKind::Caret => BinaryOp::Bit(BitOp::Xor),
        SyntaxKind::Pipe => BinaryOp::Bit(BitOp::Or),
        SyntaxKind::Shl => BinaryOp::Bit(BitOp::ShiftLeft),
        SyntaxKind::Shr => BinaryOp::Bit(BitOp::ShiftRight),
        SyntaxKind::Lt => BinaryOp::Comparison(ComparisonOp::Lt),
        SyntaxKind::Le => BinaryOp::Comparison(ComparisonOp::Le),
        SyntaxKind::EqEq => BinaryOp::Comparison(ComparisonOp::Eq),
        SyntaxKind::Ne | SyntaxKind::Ne2 => BinaryOp::Comparison(ComparisonOp::Ne),
        SyntaxKind::Ge => BinaryOp::Comparison(ComparisonOp::Ge),
        SyntaxKind::Gt => BinaryOp::Comparison(ComparisonOp::Gt),
        SyntaxKind::KwAnd => BinaryOp::Logical(LogicalOp::And),
        SyntaxKind::KwOr => BinaryOp::Logical(LogicalOp::Or),
        _ => return None,
    })
}

fn strip_quotes(raw: &str) -> String {
    raw.trim_matches('"').to_string()
}

fn child_node(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxNode> {
    node.children().find(|child| child.kind() == kind)
}

fn child_nodes(node: &SyntaxNode, kind: SyntaxKind) -> Vec<SyntaxNode> {
    node.children().filter(|child| child.kind() == kind).collect()
}

fn direct_tokens(node: &SyntaxNode) -> impl Iterator<Item = SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|element| element.into_token())
}

fn find_token(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxToken> {
    direct_tokens(node).find(|token| token.kind() == kind)
}

fn has_token(node: &SyntaxNode, kind: SyntaxKind) -> bool {
    find_token(node, kind).is_some()
}

fn size_parameter_text(node: &SyntaxNode) -> Option<String> {
    direct_tokens(node)
        .find(|token| matches!(token.kind(), SyntaxKind::Name | SyntaxKind::Integer))
        .map(|token| token.text().to_string())
}

#[cfg(test)]
mod lower_tests;
