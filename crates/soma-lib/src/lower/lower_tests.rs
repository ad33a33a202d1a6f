use indoc::indoc;
use rowan::GreenNodeBuilder;

use super::*;
use crate::ast::AstNode;
use crate::parser;

fn lower_source(source: &str) -> (CompilationUnit, Diagnostics) {
    let (parse, parse_diagnostics) = parser::parse(source).unwrap();
    assert!(parse_diagnostics.is_empty(), "{parse_diagnostics:?}");
    lower(&parse.syntax(), source, "test.soma").unwrap()
}

fn lower_clean(source: &str) -> CompilationUnit {
    let (unit, diagnostics) = lower_source(source);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    unit
}

fn update_statements(unit: &CompilationUnit) -> &[Statement] {
    unit.neurons[0]
        .body
        .iter()
        .find_map(|element| match element {
            BodyElement::Update(update) => Some(update.block.statements.as_slice()),
            _ => None,
        })
        .expect("neuron has an update block")
}

fn first_assignment(unit: &CompilationUnit) -> &Assignment {
    match &update_statements(unit)[0].kind {
        StmtKind::Small(SmallStmt::Assignment(assignment)) => assignment,
        other => panic!("expected an assignment, got {other:?}"),
    }
}

#[test]
fn artifact_name_is_stamped_everywhere() {
    let unit = lower_clean("neuron n:\nend\n");
    assert_eq!(unit.artifact_name, "test.soma");
    assert_eq!(unit.neurons[0].artifact_name, "test.soma");
    assert_eq!(unit.neurons[0].name, "n");
}

#[test]
fn body_elements_keep_source_order() {
    let unit = lower_clean(indoc! {"
        neuron n:
        parameters:
        tau ms = 10.0
        end
        state:
        V_m mV = 0.0
        end
        internals:
        h ms = 0.1
        end
        update:
        V_m = V_m + 1.0
        end
        end
    "});
    let kinds: Vec<&str> = unit.neurons[0]
        .body
        .iter()
        .map(|element| match element {
            BodyElement::Variables(block) => match block.kind {
                VarBlockKind::Parameters => "parameters",
                VarBlockKind::State => "state",
                VarBlockKind::Internals => "internals",
                VarBlockKind::InitialValues => "initial_values",
            },
            BodyElement::Update(_) => "update",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["parameters", "state", "internals", "update"]);
}

#[test]
fn duplicate_state_block_keeps_both_and_reports_once() {
    let (unit, diagnostics) = lower_source(indoc! {"
        neuron n:
        state:
        a real = 1
        end
        state:
        b real = 2
        end
        end
    "});
    let variable_blocks: Vec<_> = unit.neurons[0].variable_blocks().collect();
    assert_eq!(variable_blocks.len(), 2);
    assert_eq!(diagnostics.len(), 1);
    let diagnostic = diagnostics.iter().next().unwrap();
    assert_eq!(diagnostic.kind, DiagnosticKind::BlockNotUnique);
    assert_eq!(diagnostic.neuron.as_deref(), Some("n"));
}

#[test]
fn equations_elements_stay_interleaved() {
    let unit = lower_clean(indoc! {"
        neuron n:
        equations:
        shape G = exp(-t / tau)
        V_m' = -V_m / tau
        recordable function I_total pA = I_syn * 2
        end
        end
    "});
    let BodyElement::Equations(equations) = &unit.neurons[0].body[0] else {
        panic!("expected equations");
    };
    assert!(matches!(equations.equations[0], EquationsElement::Shape(_)));
    assert!(matches!(
        equations.equations[1],
        EquationsElement::Equation(_)
    ));
    let EquationsElement::Function(function) = &equations.equations[2] else {
        panic!("expected an equations function");
    };
    assert!(function.is_recordable);
    assert_eq!(function.variable_name, "I_total");
    assert_eq!(function.data_type, DataType::Unit("pA".into()));
}

#[test]
fn initial_values_block_kind() {
    let unit = lower_clean("neuron n:\ninitial_values:\nV_m mV = E_L\nend\nend\n");
    let block = unit.neurons[0].variable_blocks().next().unwrap();
    assert_eq!(block.kind, VarBlockKind::InitialValues);
    assert_eq!(block.declarations[0].data_type, DataType::Unit("mV".into()));
}

#[test]
fn declaration_clauses_lowered() {
    let unit = lower_clean(indoc! {"
        neuron n:
        state:
        recordable function g, h pA [n_ports] = 0.5 [[ g >= 0 ]]
        end
        end
    "});
    let block = unit.neurons[0].variable_blocks().next().unwrap();
    let declaration = &block.declarations[0];
    assert!(declaration.is_recordable);
    assert!(declaration.is_function);
    assert_eq!(declaration.variables.len(), 2);
    assert_eq!(declaration.variables[1].name, "h");
    assert_eq!(declaration.size_parameter.as_deref(), Some("n_ports"));
    assert!(declaration.expression.is_some());
    assert!(matches!(
        declaration.invariant.as_ref().unwrap().kind,
        ExprKind::Binary { .. }
    ));
}

#[test]
fn compound_assignment_operators() {
    let unit = lower_clean(indoc! {"
        neuron n:
        update:
        a = 1
        b += 2
        c -= 3
        d *= 4
        e /= 5
        end
        end
    "});
    let ops: Vec<AssignmentOp> = update_statements(&unit)
        .iter()
        .map(|statement| match &statement.kind {
            StmtKind::Small(SmallStmt::Assignment(assignment)) => assignment.op,
            other => panic!("expected an assignment, got {other:?}"),
        })
        .collect();
    assert_eq!(
        ops,
        vec![
            AssignmentOp::Direct,
            AssignmentOp::Add,
            AssignmentOp::Sub,
            AssignmentOp::Mul,
            AssignmentOp::Div,
        ]
    );
}

#[test]
fn binary_precedence_shapes_the_tree() {
    let unit = lower_clean("neuron n:\nupdate:\nx = a + b * 2\nend\nend\n");
    let assignment = first_assignment(&unit);
    let ExprKind::Binary { op, rhs, .. } = &assignment.expression.kind else {
        panic!("expected a binary expression");
    };
    assert_eq!(*op, BinaryOp::Arithmetic(ArithmeticOp::Add));
    assert!(matches!(
        rhs.kind,
        ExprKind::Binary {
            op: BinaryOp::Arithmetic(ArithmeticOp::Mul),
            ..
        }
    ));
}

#[test]
fn both_not_equal_spellings_lower_identically() {
    let bang = lower_clean("neuron n:\nupdate:\nx = a != b\nend\nend\n");
    let angle = lower_clean("neuron n:\nupdate:\nx = a <> b\nend\nend\n");
    let bang_expr = &first_assignment(&bang).expression;
    let angle_expr = &first_assignment(&angle).expression;
    assert!(matches!(
        bang_expr.kind,
        ExprKind::Binary {
            op: BinaryOp::Comparison(ComparisonOp::Ne),
            ..
        }
    ));
    assert_eq!(bang_expr, angle_expr);
}

#[test]
fn ternary_unary_and_parentheses() {
    let unit = lower_clean("neuron n:\nupdate:\nx = V > 0 ? (-V) : not flag\nend\nend\n");
    let assignment = first_assignment(&unit);
    let ExprKind::Ternary {
        if_true, if_not, ..
    } = &assignment.expression.kind
    else {
        panic!("expected a ternary");
    };
    let ExprKind::Encapsulated(inner) = &if_true.kind else {
        panic!("expected parentheses");
    };
    assert!(matches!(
        inner.kind,
        ExprKind::Unary {
            op: UnaryOp::Minus,
            ..
        }
    ));
    assert!(matches!(
        if_not.kind,
        ExprKind::Unary {
            op: UnaryOp::LogicalNot,
            ..
        }
    ));
}

#[test]
fn literals_lower_to_typed_values() {
    let unit = lower_clean("neuron n:\nupdate:\nf(1, 2.5, true, inf, \"txt\")\nend\nend\n");
    let StmtKind::Small(SmallStmt::Call(call)) = &update_statements(&unit)[0].kind else {
        panic!("expected a call statement");
    };
    assert_eq!(call.callee_name, "f");
    let literals: Vec<&SimpleExpr> = call
        .args
        .iter()
        .map(|arg| match &arg.kind {
            ExprKind::Simple(simple) => simple,
            other => panic!("expected a literal, got {other:?}"),
        })
        .collect();
    assert_eq!(literals[0], &SimpleExpr::Integer(1));
    assert_eq!(literals[1], &SimpleExpr::Float(2.5));
    assert_eq!(literals[2], &SimpleExpr::Boolean(true));
    assert_eq!(literals[3], &SimpleExpr::Inf);
    assert_eq!(literals[4], &SimpleExpr::String("txt".into()));
}

#[test]
fn input_lines_capture_ports() {
    let unit = lower_clean(indoc! {"
        neuron n:
        input:
        spikes [n_ports] pA <- inhibitory excitatory spike
        currents <- current
        end
        output: spike
        end
    "});
    let BodyElement::Input(input) = &unit.neurons[0].body[0] else {
        panic!("expected an input block");
    };
    let line = &input.lines[0];
    assert_eq!(line.name, "spikes");
    assert_eq!(line.size_parameter.as_deref(), Some("n_ports"));
    assert_eq!(line.data_type, Some(DataType::Unit("pA".into())));
    assert_eq!(
        line.qualifiers,
        vec![InputQualifier::Inhibitory, InputQualifier::Excitatory]
    );
    assert_eq!(line.signal_type, SignalType::Spike);
    assert_eq!(input.lines[1].signal_type, SignalType::Current);

    let BodyElement::Output(output) = &unit.neurons[0].body[1] else {
        panic!("expected an output block");
    };
    assert_eq!(output.signal_type, SignalType::Spike);
}

#[test]
fn user_function_with_parameters_and_return_type() {
    let unit = lower_clean(indoc! {"
        neuron n:
        function clip(v mV, lo mV) mV:
        if v < lo:
        return lo
        end
        return v
        end
        end
    "});
    let function = unit.neurons[0].functions().next().unwrap();
    assert_eq!(function.name, "clip");
    assert_eq!(function.parameters.len(), 2);
    assert_eq!(function.parameters[0].name, "v");
    assert_eq!(function.return_type, Some(DataType::Unit("mV".into())));
    assert_eq!(function.block.statements.len(), 2);
}

#[test]
fn for_step_defaults_to_one() {
    let unit = lower_clean("neuron n:\nupdate:\nfor i in 1 ... 10:\nx = i\nend\nend\nend\n");
    let StmtKind::Compound(CompoundStmt::For(for_stmt)) = &update_statements(&unit)[0].kind else {
        panic!("expected a for loop");
    };
    assert_eq!(for_stmt.variable, "i");
    assert_eq!(for_stmt.step, 1.0);
}

#[test]
fn for_step_accepts_signed_literals() {
    let unit =
        lower_clean("neuron n:\nupdate:\nfor i in 10 ... 0 step -0.5:\nx = i\nend\nend\nend\n");
    let StmtKind::Compound(CompoundStmt::For(for_stmt)) = &update_statements(&unit)[0].kind else {
        panic!("expected a for loop");
    };
    assert_eq!(for_stmt.step, -0.5);
}

#[test]
fn if_elif_else_clauses() {
    let unit = lower_clean(indoc! {"
        neuron n:
        update:
        if V > 20.0:
        V = 0.0
        elif V < -70.0:
        V = -70.0
        else:
        V = V + 1.0
        end
        end
        end
    "});
    let StmtKind::Compound(CompoundStmt::If(if_stmt)) = &update_statements(&unit)[0].kind else {
        panic!("expected an if statement");
    };
    assert_eq!(if_stmt.elif_clauses.len(), 1);
    assert!(if_stmt.else_clause.is_some());
    assert_eq!(if_stmt.if_clause.block.statements.len(), 1);
}

#[test]
fn comments_attach_to_declarations() {
    let (unit, diagnostics) = lower_source(indoc! {"
        neuron n:
        state:
        # documents x
        x real = 0 # beside x
        # after x
        end
        end
    "});
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let block = unit.neurons[0].variable_blocks().next().unwrap();
    let meta = &block.declarations[0].meta;
    assert_eq!(meta.pre_comments, vec!["documents x".to_string()]);
    assert_eq!(meta.in_comment.as_deref(), Some("beside x"));
    assert_eq!(meta.post_comments, vec!["after x".to_string()]);
}

#[test]
fn comment_between_declarations_claimed_once() {
    let unit = lower_clean(indoc! {"
        neuron n:
        state:
        a real = 0
        # belongs to one of them, not both
        b real = 0
        end
        end
    "});
    let block = unit.neurons[0].variable_blocks().next().unwrap();
    let total: usize = block
        .declarations
        .iter()
        .map(|d| d.comments().len())
        .sum();
    assert_eq!(total, 1);
}

#[test]
fn redeclared_neuron_is_reported_not_dropped() {
    let (unit, diagnostics) = lower_source("neuron a:\nend\nneuron a:\nend\n");
    assert_eq!(unit.neurons.len(), 2);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics.iter().next().unwrap().kind,
        DiagnosticKind::NeuronRedeclared
    );
}

// Hand-built trees exercise inputs the parser itself would never produce.
struct TreeBuilder {
    builder: GreenNodeBuilder<'static>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            builder: GreenNodeBuilder::new(),
        }
    }

    fn start(&mut self, kind: SyntaxKind) {
        self.builder.start_node(kind.into());
    }

    fn token(&mut self, kind: SyntaxKind, text: &str) {
        self.builder.token(kind.into(), text);
    }

    fn end(&mut self) {
        self.builder.finish_node();
    }

    fn finish(self) -> SyntaxNode {
        SyntaxNode::new_root(self.builder.finish())
    }
}

fn neuron_header(t: &mut TreeBuilder) {
    t.token(SyntaxKind::KwNeuron, "neuron");
    t.token(SyntaxKind::Whitespace, " ");
    t.token(SyntaxKind::Name, "n");
    t.token(SyntaxKind::Colon, ":");
    t.token(SyntaxKind::Newline, "\n");
}

fn state_block_with_declaration(t: &mut TreeBuilder) {
    t.start(SyntaxKind::BlockWithVariables);
    t.token(SyntaxKind::KwState, "state");
    t.token(SyntaxKind::Colon, ":");
    t.token(SyntaxKind::Newline, "\n");
    t.start(SyntaxKind::Declaration);
    t.start(SyntaxKind::Variable);
    t.token(SyntaxKind::Name, "x");
    t.end();
    t.token(SyntaxKind::Whitespace, " ");
    t.start(SyntaxKind::DataType);
    t.token(SyntaxKind::KwReal, "real");
    t.end();
    t.end();
    t.token(SyntaxKind::Newline, "\n");
    t.token(SyntaxKind::KwEnd, "end");
    t.end();
}

#[test]
fn unknown_variable_block_kind_is_skipped_not_fatal() {
    let mut t = TreeBuilder::new();
    t.start(SyntaxKind::CompilationUnit);
    t.start(SyntaxKind::Neuron);
    neuron_header(&mut t);
    // A variables block whose kind is not one of the four known keywords.
    t.start(SyntaxKind::BlockWithVariables);
    t.token(SyntaxKind::Name, "clump");
    t.token(SyntaxKind::Colon, ":");
    t.token(SyntaxKind::Newline, "\n");
    t.token(SyntaxKind::KwEnd, "end");
    t.end();
    t.token(SyntaxKind::Newline, "\n");
    state_block_with_declaration(&mut t);
    t.token(SyntaxKind::Newline, "\n");
    t.token(SyntaxKind::KwEnd, "end");
    t.end();
    t.token(SyntaxKind::Newline, "\n");
    t.end();
    let root = t.finish();
    let source = root.text().to_string();

    let (unit, diagnostics) = lower(&root, &source, "test.soma").unwrap();
    assert_eq!(diagnostics.len(), 1);
    let diagnostic = diagnostics.iter().next().unwrap();
    assert_eq!(diagnostic.kind, DiagnosticKind::UnknownBlockKind);
    assert_eq!(diagnostic.neuron.as_deref(), Some("n"));

    // The malformed block is gone; the healthy one survived.
    let body = &unit.neurons[0].body;
    assert_eq!(body.len(), 1);
    let BodyElement::Variables(block) = &body[0] else {
        panic!("expected a variables block");
    };
    assert_eq!(block.kind, VarBlockKind::State);
    assert_eq!(block.declarations[0].variables[0].name, "x");
}

#[test]
fn unknown_signal_types_are_skipped_not_fatal() {
    let mut t = TreeBuilder::new();
    t.start(SyntaxKind::CompilationUnit);
    t.start(SyntaxKind::Neuron);
    neuron_header(&mut t);
    t.start(SyntaxKind::InputBlock);
    t.token(SyntaxKind::KwInput, "input");
    t.token(SyntaxKind::Colon, ":");
    t.token(SyntaxKind::Newline, "\n");
    t.start(SyntaxKind::InputLine);
    t.token(SyntaxKind::Name, "spikes");
    t.token(SyntaxKind::Whitespace, " ");
    t.token(SyntaxKind::LeftArrow, "<-");
    t.token(SyntaxKind::Whitespace, " ");
    t.token(SyntaxKind::Name, "banana");
    t.end();
    t.token(SyntaxKind::Newline, "\n");
    t.start(SyntaxKind::InputLine);
    t.token(SyntaxKind::Name, "currents");
    t.token(SyntaxKind::Whitespace, " ");
    t.token(SyntaxKind::LeftArrow, "<-");
    t.token(SyntaxKind::Whitespace, " ");
    t.token(SyntaxKind::KwCurrent, "current");
    t.end();
    t.token(SyntaxKind::Newline, "\n");
    t.token(SyntaxKind::KwEnd, "end");
    t.end();
    t.token(SyntaxKind::Newline, "\n");
    t.start(SyntaxKind::OutputBlock);
    t.token(SyntaxKind::KwOutput, "output");
    t.token(SyntaxKind::Colon, ":");
    t.token(SyntaxKind::Whitespace, " ");
    t.token(SyntaxKind::Name, "banana");
    t.end();
    t.token(SyntaxKind::Newline, "\n");
    t.token(SyntaxKind::KwEnd, "end");
    t.end();
    t.token(SyntaxKind::Newline, "\n");
    t.end();
    let root = t.finish();
    let source = root.text().to_string();

    let (unit, diagnostics) = lower(&root, &source, "test.soma").unwrap();
    assert_eq!(diagnostics.len(), 2);
    assert!(
        diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::UnknownSignalType)
    );

    let body = &unit.neurons[0].body;
    assert_eq!(body.len(), 1);
    let BodyElement::Input(input) = &body[0] else {
        panic!("expected an input block");
    };
    assert_eq!(input.lines.len(), 1);
    assert_eq!(input.lines[0].name, "currents");
}

#[test]
fn shapeless_expression_is_fatal() {
    let mut t = TreeBuilder::new();
    t.start(SyntaxKind::CompilationUnit);
    t.start(SyntaxKind::Neuron);
    neuron_header(&mut t);
    t.start(SyntaxKind::UpdateBlock);
    t.token(SyntaxKind::KwUpdate, "update");
    t.token(SyntaxKind::Colon, ":");
    t.token(SyntaxKind::Newline, "\n");
    t.start(SyntaxKind::Block);
    t.start(SyntaxKind::Stmt);
    t.start(SyntaxKind::SmallStmt);
    t.start(SyntaxKind::Assignment);
    t.start(SyntaxKind::Variable);
    t.token(SyntaxKind::Name, "x");
    t.end();
    t.token(SyntaxKind::Whitespace, " ");
    t.token(SyntaxKind::Assign, "=");
    t.token(SyntaxKind::Whitespace, " ");
    t.start(SyntaxKind::Expression);
    t.end();
    t.end();
    t.end();
    t.token(SyntaxKind::Newline, "\n");
    t.end();
    t.end();
    t.token(SyntaxKind::KwEnd, "end");
    t.end();
    t.token(SyntaxKind::Newline, "\n");
    t.token(SyntaxKind::KwEnd, "end");
    t.end();
    t.token(SyntaxKind::Newline, "\n");
    t.end();
    let root = t.finish();
    let source = root.text().to_string();

    let error = lower(&root, &source, "test.soma").unwrap_err();
    assert!(matches!(error, Error::MalformedExpression { line: 3, .. }));
}
