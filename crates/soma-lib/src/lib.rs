//! Frontend for the Soma dynamical-system modeling language.
//!
//! The pipeline has two stages. [`parser`] turns source text into a
//! lossless syntax tree; [`lower`] turns that tree into the typed AST in
//! [`ast`], attaching source spans and comments along the way. Both stages
//! collect user-level mistakes into [`Diagnostics`] and keep going;
//! [`Error`] is reserved for trees the frontend cannot make sense of at
//! all.
//!
//! ```
//! let source = "neuron iaf:\nstate:\nV_m mV = 0.0\nend\nend\n";
//! let (unit, diagnostics) = soma_lib::parse_model(source, "iaf.soma").unwrap();
//! assert!(diagnostics.is_empty());
//! assert_eq!(unit.neurons[0].name, "iaf");
//! ```

pub mod ast;
pub mod comments;
pub mod diagnostics;
pub mod lower;
pub mod parser;
pub mod span;

pub use ast::{AstNode, CompilationUnit, Neuron, NodeRef};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use span::SourceSpan;

/// Defects that abort a pass outright. User-level syntax mistakes never
/// land here; they are collected as [`Diagnostics`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An expression node matching none of the known shapes.
    #[error("cannot resolve the shape of the expression at {line}:{col}")]
    MalformedExpression { line: u32, col: u32 },

    /// A statement node missing its mandatory parts.
    #[error("cannot resolve the statement at {line}:{col}")]
    MalformedStatement { line: u32, col: u32 },

    /// Input nested deeper than the parser is willing to follow.
    #[error("nesting depth exceeds the supported limit")]
    RecursionLimitExceeded,
}

/// Result of a pass: the produced value plus everything it complained
/// about on the way.
pub type PassResult<T> = Result<(T, Diagnostics), Error>;

/// Parses and lowers one source artifact.
pub fn parse_model(source: &str, artifact_name: &str) -> PassResult<CompilationUnit> {
    let (parse, mut diagnostics) = parser::parse(source)?;
    let (unit, lower_diagnostics) = lower::lower(&parse.syntax(), source, artifact_name)?;
    diagnostics.extend(lower_diagnostics);
    Ok((unit, diagnostics))
}
