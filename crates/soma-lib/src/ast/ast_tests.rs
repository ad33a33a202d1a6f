use indoc::indoc;
use proptest::prelude::*;

use super::*;
use crate::parse_model;
use crate::span::SourceSpan;

fn lower_unit(source: &str) -> CompilationUnit {
    let (unit, diagnostics) = parse_model(source, "test.soma").unwrap();
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    unit
}

#[test]
fn clone_compares_equal() {
    let unit = lower_unit(indoc! {"
        neuron iaf:
        state:
        V_m mV = 0.0
        end
        update:
        V_m = V_m + 1.0
        end
        end
    "});
    assert_eq!(unit.clone(), unit);
}

#[test]
fn equality_ignores_formatting_and_comments() {
    let plain = lower_unit(indoc! {"
        neuron iaf:
        state:
        V_m mV = 0.0
        end
        end
    "});
    let commented = lower_unit(indoc! {"

        # membrane model
        neuron iaf:
        state:
        V_m mV = 0.0 # resting potential
        end
        end

    "});
    assert_eq!(plain, commented);
}

#[test]
fn equality_ignores_metadata_mutation() {
    let unit = lower_unit("neuron n:\nend\n");
    let mut mutated = unit.clone();
    mutated.neurons[0].meta_mut().span = SourceSpan::UNKNOWN;
    mutated.neurons[0].meta_mut().pre_comments.push("extra".into());
    mutated.neurons[0].meta_mut().implicit_conversion_factor = Some(1000.0);
    assert_eq!(mutated, unit);
}

#[test]
fn structural_difference_is_detected() {
    let a = lower_unit("neuron n:\nstate:\nx real = 1\nend\nend\n");
    let b = lower_unit("neuron n:\nstate:\nx real = 2\nend\nend\n");
    assert_ne!(a, b);
}

#[test]
fn find_parent_walks_down_from_the_root() {
    let unit = lower_unit(indoc! {"
        neuron iaf:
        state:
        V_m mV = 0.0
        end
        end
    "});
    let root = NodeRef::from(&unit);

    let neuron = &unit.neurons[0];
    let parent = root.find_parent_of(NodeRef::from(neuron)).unwrap();
    assert_eq!(parent.addr(), root.addr());

    let BodyElement::Variables(state) = &neuron.body[0] else {
        panic!("expected a variables block");
    };
    let declaration = &state.declarations[0];
    let parent = root.find_parent_of(NodeRef::from(declaration)).unwrap();
    assert_eq!(parent.addr(), NodeRef::from(state).addr());
}

#[test]
fn find_parent_of_foreign_node_is_none() {
    let unit = lower_unit("neuron a:\nend\n");
    let other = lower_unit("neuron b:\nend\n");
    let root = NodeRef::from(&unit);
    assert!(root.find_parent_of(NodeRef::from(&other.neurons[0])).is_none());
    assert!(!root.contains(NodeRef::from(&other.neurons[0])));
}

#[test]
fn differential_order_counts_quotes() {
    let unit = lower_unit(indoc! {"
        neuron osc:
        equations:
        V_m'' = -V_m
        end
        end
    "});
    let BodyElement::Equations(equations) = &unit.neurons[0].body[0] else {
        panic!("expected an equations block");
    };
    let EquationsElement::Equation(equation) = &equations.equations[0] else {
        panic!("expected an equation");
    };
    assert_eq!(equation.lhs.name, "V_m");
    assert_eq!(equation.lhs.differential_order, 2);
    assert_eq!(equation.lhs.complete_name(), "V_m''");
}

#[test]
fn comments_accessor_keeps_order() {
    let mut meta = Meta::default();
    meta.pre_comments = vec!["above".into()];
    meta.in_comment = Some("beside".into());
    meta.post_comments = vec!["below".into()];
    let variable = Variable {
        name: "x".into(),
        differential_order: 0,
        meta,
    };
    assert_eq!(variable.comments(), vec!["above", "beside", "below"]);
}

fn expr_strategy() -> impl Strategy<Value = Expression> {
    let leaf = prop_oneof![
        any::<i64>().prop_map(|v| Expression::simple(SimpleExpr::Integer(v), SourceSpan::UNKNOWN)),
        any::<bool>().prop_map(|v| Expression::simple(SimpleExpr::Boolean(v), SourceSpan::UNKNOWN)),
        "[a-z][a-z0-9_]{0,7}".prop_map(|name| {
            Expression::simple(
                SimpleExpr::Variable(Variable::new(name, 0, SourceSpan::UNKNOWN)),
                SourceSpan::UNKNOWN,
            )
        }),
    ];
    leaf.prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(lhs, rhs)| {
                Expression::new(
                    ExprKind::Binary {
                        lhs: Box::new(lhs),
                        op: BinaryOp::Arithmetic(ArithmeticOp::Add),
                        rhs: Box::new(rhs),
                    },
                    SourceSpan::UNKNOWN,
                )
            }),
            inner.clone().prop_map(|operand| {
                Expression::new(
                    ExprKind::Unary {
                        op: UnaryOp::Minus,
                        operand: Box::new(operand),
                    },
                    SourceSpan::UNKNOWN,
                )
            }),
            inner.prop_map(|e| {
                Expression::new(ExprKind::Encapsulated(Box::new(e)), SourceSpan::UNKNOWN)
            }),
        ]
    })
}

proptest! {
    #[test]
    fn cloned_expressions_compare_equal(expr in expr_strategy()) {
        prop_assert_eq!(expr.clone(), expr);
    }

    #[test]
    fn metadata_never_affects_expression_equality(expr in expr_strategy(), line in 1u32..500) {
        let mut mutated = expr.clone();
        mutated.meta.span = SourceSpan::new(line, 0, line, 1);
        mutated.meta.in_comment = Some("mutated".into());
        prop_assert_eq!(mutated, expr);
    }
}
