//! Grammar productions for model files.
//!
//! The grammar is line-oriented: declarations, equations and simple
//! statements end at the newline, and every block closes with `end`. Each
//! function parses one production and leaves the parser positioned after it.

pub(crate) mod expressions;
pub(crate) mod statements;

use super::core::Parser;
use super::cst::SyntaxKind::*;
use super::cst::token_sets;
use crate::diagnostics::DiagnosticKind;

pub(crate) fn compilation_unit(p: &mut Parser) {
    p.start_node(CompilationUnit);
    while !p.should_stop() {
        match p.current() {
            Newline => p.bump(),
            KwNeuron => neuron(p),
            _ => p.error_and_bump(
                DiagnosticKind::UnexpectedToken,
                "expected a neuron definition",
            ),
        }
    }
    p.finish_node();
}

/// `neuron NAME: <body> end`
fn neuron(p: &mut Parser) {
    p.start_node(Neuron);
    p.bump();
    p.expect(Name, "a neuron name");
    p.expect(Colon, "`:` after the neuron name");

    while !p.should_stop() && !p.at(KwEnd) {
        match p.current() {
            Newline => p.bump(),
            KwState | KwParameters | KwInternals | KwInitialValues => block_with_variables(p),
            KwUpdate => update_block(p),
            KwEquations => equations_block(p),
            KwInput => input_block(p),
            KwOutput => output_block(p),
            KwFunction => function(p),
            _ => p.error_and_bump(
                DiagnosticKind::UnexpectedToken,
                "expected a block definition or `end`",
            ),
        }
    }
    if !p.eat(KwEnd) {
        p.error(DiagnosticKind::UnterminatedBlock);
    }
    p.finish_node();
}

/// `state:`, `parameters:`, `internals:` or `initial_values:` followed by
/// declarations, one per line.
fn block_with_variables(p: &mut Parser) {
    p.start_node(BlockWithVariables);
    p.bump();
    p.expect(Colon, "`:` after the block kind");

    while !p.should_stop() && !p.at(KwEnd) {
        match p.current() {
            Newline => p.bump(),
            Name | KwRecordable | KwFunction => {
                statements::declaration(p);
                end_of_line(p);
            }
            _ => p.error_and_bump(DiagnosticKind::UnexpectedToken, "expected a declaration"),
        }
    }
    if !p.eat(KwEnd) {
        p.error(DiagnosticKind::UnterminatedBlock);
    }
    p.finish_node();
}

/// `update: <block> end`
fn update_block(p: &mut Parser) {
    p.start_node(UpdateBlock);
    p.bump();
    p.expect(Colon, "`:` after `update`");
    statements::block(p);
    if !p.eat(KwEnd) {
        p.error(DiagnosticKind::UnterminatedBlock);
    }
    p.finish_node();
}

/// `equations:` containing ODE equations, shapes and aliases.
fn equations_block(p: &mut Parser) {
    p.start_node(EquationsBlock);
    p.bump();
    p.expect(Colon, "`:` after `equations`");

    while !p.should_stop() && !p.at(KwEnd) {
        match p.current() {
            Newline => p.bump(),
            KwShape => {
                ode_shape(p);
                end_of_line(p);
            }
            KwRecordable | KwFunction => {
                ode_function(p);
                end_of_line(p);
            }
            Name => {
                ode_equation(p);
                end_of_line(p);
            }
            _ => p.error_and_bump(
                DiagnosticKind::UnexpectedToken,
                "expected an equation, shape or function",
            ),
        }
    }
    if !p.eat(KwEnd) {
        p.error(DiagnosticKind::UnterminatedBlock);
    }
    p.finish_node();
}

/// `V_m' = -V_m / tau_m`
fn ode_equation(p: &mut Parser) {
    p.start_node(OdeEquation);
    statements::variable(p);
    p.expect(Assign, "`=` in the equation");
    expressions::expression(p);
    p.finish_node();
}

/// `shape G = exp(-t / tau_syn)`
fn ode_shape(p: &mut Parser) {
    p.start_node(OdeShape);
    p.bump();
    statements::variable(p);
    p.expect(Assign, "`=` in the shape definition");
    expressions::expression(p);
    p.finish_node();
}

/// `[recordable] function NAME datatype = expression`
fn ode_function(p: &mut Parser) {
    p.start_node(OdeFunction);
    p.eat(KwRecordable);
    p.expect(KwFunction, "`function`");
    p.expect(Name, "a function name");
    data_type(p);
    p.expect(Assign, "`=` in the function definition");
    expressions::expression(p);
    p.finish_node();
}

/// `input:` containing one port per line.
fn input_block(p: &mut Parser) {
    p.start_node(InputBlock);
    p.bump();
    p.expect(Colon, "`:` after `input`");

    while !p.should_stop() && !p.at(KwEnd) {
        match p.current() {
            Newline => p.bump(),
            Name => {
                input_line(p);
                end_of_line(p);
            }
            _ => p.error_and_bump(DiagnosticKind::UnexpectedToken, "expected an input port"),
        }
    }
    if !p.eat(KwEnd) {
        p.error(DiagnosticKind::UnterminatedBlock);
    }
    p.finish_node();
}

/// `spikes [n] pA <- inhibitory excitatory spike`
fn input_line(p: &mut Parser) {
    p.start_node(InputLine);
    p.expect(Name, "a port name");
    if p.at(BracketOpen) {
        size_parameter(p);
    }
    if p.at_set(token_sets::DATA_TYPE_FIRST) && !p.at(LeftArrow) {
        data_type(p);
    }
    p.expect(LeftArrow, "`<-`");
    while p.at(KwInhibitory) || p.at(KwExcitatory) {
        p.bump();
    }
    match p.current() {
        KwSpike | KwCurrent => p.bump(),
        _ => p.error_msg(
            DiagnosticKind::UnexpectedToken,
            "expected `spike` or `current`",
        ),
    }
    p.finish_node();
}

/// `output: spike` - a single line, no `end`.
fn output_block(p: &mut Parser) {
    p.start_node(OutputBlock);
    p.bump();
    p.expect(Colon, "`:` after `output`");
    match p.current() {
        KwSpike | KwCurrent => p.bump(),
        _ => p.error_msg(
            DiagnosticKind::UnexpectedToken,
            "expected `spike` or `current`",
        ),
    }
    p.finish_node();
}

/// `function NAME(params) [returntype]: <block> end`
fn function(p: &mut Parser) {
    p.start_node(Function);
    p.bump();
    p.expect(Name, "a function name");
    p.expect(ParenOpen, "`(`");
    if p.at(Name) {
        parameter(p);
        while p.eat(Comma) {
            parameter(p);
        }
    }
    p.expect(ParenClose, "`)`");
    if p.at_set(token_sets::DATA_TYPE_FIRST) {
        data_type(p);
    }
    p.expect(Colon, "`:` before the function body");
    statements::block(p);
    if !p.eat(KwEnd) {
        p.error(DiagnosticKind::UnterminatedBlock);
    }
    p.finish_node();
}

/// `NAME datatype`
fn parameter(p: &mut Parser) {
    p.start_node(Parameter);
    p.expect(Name, "a parameter name");
    data_type(p);
    p.finish_node();
}

/// `[n]` where the size is a name or an integer.
pub(crate) fn size_parameter(p: &mut Parser) {
    p.start_node(SizeParameter);
    p.bump();
    match p.current() {
        Name | Integer => p.bump(),
        _ => p.error_msg(
            DiagnosticKind::UnexpectedToken,
            "expected a vector size parameter",
        ),
    }
    p.expect(BracketClose, "`]`");
    p.finish_node();
}

/// Builtin type keyword or a physical unit such as `mV`, `ms**2` or `1/ms`.
pub(crate) fn data_type(p: &mut Parser) {
    p.start_node(DataType);
    match p.current() {
        KwInteger | KwReal | KwString | KwBoolean | KwVoid => p.bump(),
        Name | Integer | ParenOpen => unit_expr(p),
        _ => p.error(DiagnosticKind::ExpectedDataType),
    }
    p.finish_node();
}

fn unit_expr(p: &mut Parser) {
    unit_atom(p);
    loop {
        match p.current() {
            Star | Slash => {
                p.bump();
                unit_atom(p);
            }
            Pow => {
                p.bump();
                p.eat(Minus);
                if !p.eat(Integer) {
                    p.error_msg(DiagnosticKind::ExpectedDataType, "expected a unit exponent");
                }
            }
            _ => break,
        }
    }
}

fn unit_atom(p: &mut Parser) {
    match p.current() {
        Name | Integer => p.bump(),
        ParenOpen => {
            p.bump();
            unit_expr(p);
            p.expect(ParenClose, "`)` in the unit type");
        }
        _ => p.error(DiagnosticKind::ExpectedDataType),
    }
}

/// Consumes the statement-terminating newline, recovering past any
/// leftover tokens first.
pub(crate) fn end_of_line(p: &mut Parser) {
    if p.should_stop() || p.at(KwEnd) {
        return;
    }
    if !p.at(Newline) {
        p.error_msg(DiagnosticKind::UnexpectedToken, "expected end of line");
        p.recover_to_line_end();
    }
    p.eat(Newline);
}
