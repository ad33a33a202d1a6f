//! Statement productions: blocks, declarations, assignments and control flow.

use super::super::core::Parser;
use super::super::cst::SyntaxKind::*;
use super::super::cst::token_sets;
use super::{data_type, end_of_line, expressions, size_parameter};
use crate::diagnostics::DiagnosticKind;

/// A run of statements, ending before `end`, `elif`, `else` or EOF.
pub(crate) fn block(p: &mut Parser) {
    p.start_node(Block);
    while !p.should_stop() && !matches!(p.current(), KwEnd | KwElif | KwElse) {
        match p.current() {
            Newline => p.bump(),
            _ if p.at_set(token_sets::STMT_FIRST) => stmt(p),
            _ => p.error_and_bump(DiagnosticKind::UnexpectedToken, "expected a statement"),
        }
    }
    p.finish_node();
}

fn stmt(p: &mut Parser) {
    p.start_node(Stmt);
    match p.current() {
        KwIf | KwWhile | KwFor => {
            p.start_node(CompoundStmt);
            match p.current() {
                KwIf => if_stmt(p),
                KwWhile => while_stmt(p),
                _ => for_stmt(p),
            }
            p.finish_node();
        }
        _ => {
            p.start_node(SmallStmt);
            small_stmt(p);
            p.finish_node();
            end_of_line(p);
        }
    }
    p.finish_node();
}

fn small_stmt(p: &mut Parser) {
    match p.current() {
        KwReturn => return_stmt(p),
        KwRecordable | KwFunction => declaration(p),
        Name => match name_stmt_kind(p) {
            NameStmt::Call => expressions::function_call(p),
            NameStmt::Assignment => assignment(p),
            NameStmt::Declaration => declaration(p),
        },
        _ => p.error_and_bump(DiagnosticKind::UnexpectedToken, "expected a statement"),
    }
}

enum NameStmt {
    Call,
    Assignment,
    Declaration,
}

/// A line starting with a name is a call, an assignment or a declaration.
/// Looks past the derivative quotes of the leading variable to decide.
fn name_stmt_kind(p: &mut Parser) -> NameStmt {
    if p.next_is(ParenOpen) {
        return NameStmt::Call;
    }
    let mut n = 1;
    while p.peek_nth(n) == Quote {
        n += 1;
    }
    if token_sets::ASSIGN_OPS.contains(p.peek_nth(n)) {
        NameStmt::Assignment
    } else {
        NameStmt::Declaration
    }
}

/// `variable (= | += | -= | *= | /=) expression`
fn assignment(p: &mut Parser) {
    p.start_node(Assignment);
    variable(p);
    if p.at_set(token_sets::ASSIGN_OPS) {
        p.bump();
    } else {
        p.error_msg(DiagnosticKind::UnexpectedToken, "expected an assignment operator");
    }
    expressions::expression(p);
    p.finish_node();
}

/// `[recordable] [function] var, ... datatype [\[n\]] [= expr] [[[ expr ]]]`
pub(crate) fn declaration(p: &mut Parser) {
    p.start_node(Declaration);
    p.eat(KwRecordable);
    p.eat(KwFunction);
    variable(p);
    while p.eat(Comma) {
        variable(p);
    }
    data_type(p);
    if p.at(BracketOpen) {
        size_parameter(p);
    }
    if p.eat(Assign) {
        expressions::expression(p);
    }
    if p.at(DoubleBracketOpen) {
        invariant(p);
    }
    p.finish_node();
}

/// `[[ expression ]]` attached to a declaration.
fn invariant(p: &mut Parser) {
    p.start_node(Invariant);
    p.bump();
    expressions::expression(p);
    p.expect(DoubleBracketClose, "`]]` closing the invariant");
    p.finish_node();
}

fn return_stmt(p: &mut Parser) {
    p.start_node(ReturnStmt);
    p.bump();
    if p.at_set(token_sets::EXPR_FIRST) {
        expressions::expression(p);
    }
    p.finish_node();
}

/// `if`/`elif`/`else` clauses sharing one closing `end`.
fn if_stmt(p: &mut Parser) {
    p.start_node(IfStmt);

    p.start_node(IfClause);
    p.bump();
    expressions::expression(p);
    p.expect(Colon, "`:` after the condition");
    block(p);
    p.finish_node();

    while p.at(KwElif) {
        p.start_node(ElifClause);
        p.bump();
        expressions::expression(p);
        p.expect(Colon, "`:` after the condition");
        block(p);
        p.finish_node();
    }

    if p.at(KwElse) {
        p.start_node(ElseClause);
        p.bump();
        p.expect(Colon, "`:` after `else`");
        block(p);
        p.finish_node();
    }

    if !p.eat(KwEnd) {
        p.error(DiagnosticKind::UnterminatedBlock);
    }
    p.finish_node();
}

fn while_stmt(p: &mut Parser) {
    p.start_node(WhileStmt);
    p.bump();
    expressions::expression(p);
    p.expect(Colon, "`:` after the condition");
    block(p);
    if !p.eat(KwEnd) {
        p.error(DiagnosticKind::UnterminatedBlock);
    }
    p.finish_node();
}

/// `for NAME in lower ... upper [step signed_number]: <block> end`
fn for_stmt(p: &mut Parser) {
    p.start_node(ForStmt);
    p.bump();
    p.expect(Name, "a loop variable");
    p.expect(KwIn, "`in`");
    expressions::expression(p);
    p.expect(Ellipsis, "`...` between the loop bounds");
    expressions::expression(p);
    if p.eat(KwStep) {
        if p.at(Plus) || p.at(Minus) {
            p.bump();
        }
        if !p.eat(Integer) && !p.eat(Float) {
            p.error_msg(DiagnosticKind::UnexpectedToken, "expected a step size");
        }
    }
    p.expect(Colon, "`:` before the loop body");
    block(p);
    if !p.eat(KwEnd) {
        p.error(DiagnosticKind::UnterminatedBlock);
    }
    p.finish_node();
}

/// `NAME` followed by derivative quotes: `V_m''`.
pub(crate) fn variable(p: &mut Parser) {
    p.start_node(Variable);
    p.expect(Name, "a variable");
    while p.at(Quote) {
        p.bump();
    }
    p.finish_node();
}
