//! Lossless parser for the Soma model language.
//!
//! Builds a full-fidelity Rowan syntax tree: every byte of the input,
//! including whitespace and comments, appears in the tree, so
//! `parse.syntax().text() == source` always holds. Structural errors become
//! `Error` nodes plus diagnostics; only pathological nesting aborts.

pub mod core;
pub mod cst;
pub mod grammar;
pub mod lexer;

pub use cst::{SomaLang, SyntaxElement, SyntaxKind, SyntaxNode, SyntaxToken, TokenSet};
pub use lexer::{Token, lex, token_text};

use rowan::GreenNode;

use crate::Error;
use crate::diagnostics::Diagnostics;

/// Result of a parse: the green tree root. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parse {
    green: GreenNode,
}

impl Parse {
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }
}

/// Parses source text into a lossless syntax tree.
///
/// Returns `Err` only for defects that make the tree unusable (runaway
/// nesting); ordinary syntax errors are collected as diagnostics while the
/// parse continues.
pub fn parse(source: &str) -> Result<(Parse, Diagnostics), Error> {
    let tokens = lex(source);
    let mut parser = core::Parser::new(source, tokens);
    grammar::compilation_unit(&mut parser);
    let (green, diagnostics) = parser.finish()?;
    Ok((Parse { green }, diagnostics))
}
