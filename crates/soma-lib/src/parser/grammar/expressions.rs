//! Expression parsing via precedence climbing.
//!
//! Every composite expression becomes an `Expression` node; atoms become a
//! `SimpleExpression` wrapped in one. Checkpoints let binary operators wrap
//! an already-parsed left operand without backtracking.

use super::super::core::Parser;
use super::super::cst::SyntaxKind::{self, *};
use super::statements;
use crate::diagnostics::DiagnosticKind;

/// Right binding power of prefix `+`, `-` and `~`. `-2**3` parses as
/// `-(2**3)`, matching Python.
const UNARY_RBP: u8 = 15;

/// `not` binds tighter than `and`/`or` but looser than comparisons.
const NOT_RBP: u8 = 5;

/// Left/right binding powers for infix operators. `**` is right-associative.
fn binary_bp(kind: SyntaxKind) -> Option<(u8, u8)> {
    Some(match kind {
        KwOr => (1, 2),
        KwAnd => (3, 4),
        Lt | Le | EqEq | Ne | Ne2 | Ge | Gt => (7, 8),
        Amp | Caret | Pipe | Shl | Shr => (9, 10),
        Plus | Minus => (11, 12),
        Star | Slash | Percent => (13, 14),
        Pow => (17, 16),
        _ => return None,
    })
}

/// Full expression, including the ternary `cond ? a : b` at lowest
/// precedence (right-associative).
pub(crate) fn expression(p: &mut Parser) {
    if !p.enter_recursion() {
        return;
    }
    let checkpoint = p.checkpoint();
    expr_bp(p, 0);
    if p.at(Question) {
        p.start_node_at(checkpoint, Expression);
        p.bump();
        expression(p);
        p.expect(Colon, "`:` in the conditional expression");
        expression(p);
        p.finish_node();
    }
    p.exit_recursion();
}

fn expr_bp(p: &mut Parser, min_bp: u8) {
    if !p.enter_recursion() {
        return;
    }
    let checkpoint = p.checkpoint();
    lhs(p);
    loop {
        let Some((left_bp, right_bp)) = binary_bp(p.current()) else {
            break;
        };
        if left_bp < min_bp {
            break;
        }
        p.start_node_at(checkpoint, Expression);
        p.bump();
        expr_bp(p, right_bp);
        p.finish_node();
    }
    p.exit_recursion();
}

fn lhs(p: &mut Parser) {
    match p.current() {
        Plus | Minus | Tilde => unary(p, UNARY_RBP),
        KwNot => unary(p, NOT_RBP),
        ParenOpen => {
            p.start_node(Expression);
            p.bump();
            expression(p);
            p.expect(ParenClose, "`)` closing the expression");
            p.finish_node();
        }
        Integer | Float | KwTrue | KwFalse | KwInf | StringLiteral => {
            p.start_node(Expression);
            p.start_node(SimpleExpression);
            p.bump();
            p.finish_node();
            p.finish_node();
        }
        Name => {
            p.start_node(Expression);
            p.start_node(SimpleExpression);
            if p.next_is(ParenOpen) {
                function_call(p);
            } else {
                statements::variable(p);
            }
            p.finish_node();
            p.finish_node();
        }
        _ => p.error(DiagnosticKind::ExpectedExpression),
    }
}

fn unary(p: &mut Parser, rbp: u8) {
    p.start_node(Expression);
    p.start_node(UnaryOperator);
    p.bump();
    p.finish_node();
    expr_bp(p, rbp);
    p.finish_node();
}

/// `NAME(arg, ...)` - used both inside expressions and as a statement.
pub(crate) fn function_call(p: &mut Parser) {
    p.start_node(FunctionCall);
    p.bump();
    p.bump();
    if !p.at(ParenClose) {
        expression(p);
        while p.eat(Comma) {
            expression(p);
        }
    }
    p.expect(ParenClose, "`)` closing the argument list");
    p.finish_node();
}
