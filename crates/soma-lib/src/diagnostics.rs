//! Diagnostics collection for accumulating frontend messages.
//!
//! Parsing and lowering never abort on user-level mistakes; they push
//! diagnostics here and keep going. Formatting beyond `Display` is left to
//! the embedding tool.

use crate::span::SourceSpan;

/// Everything the frontend can complain about, parser first, lowering second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    // Parser
    UnexpectedToken,
    ExpectedExpression,
    ExpectedDataType,
    ExpectedVariable,
    UnterminatedBlock,

    // Lowering / context conditions
    UnknownBlockKind,
    UnknownSignalType,
    BlockNotUnique,
    NeuronRedeclared,
}

impl DiagnosticKind {
    pub fn default_severity(&self) -> Severity {
        // Everything the frontend reports today blocks code generation.
        Severity::Error
    }

    /// Base message, used when the reporter adds no detail.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Self::UnexpectedToken => "unexpected token",
            Self::ExpectedExpression => "expected an expression",
            Self::ExpectedDataType => "expected a data type",
            Self::ExpectedVariable => "expected a variable",
            Self::UnterminatedBlock => "missing closing `end`",
            Self::UnknownBlockKind => "unknown variable-block kind",
            Self::UnknownSignalType => "unknown signal type",
            Self::BlockNotUnique => "block defined more than once",
            Self::NeuronRedeclared => "neuron name already used",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single accumulated message.
///
/// `neuron` names the neuron under construction when the message was
/// emitted, so multi-neuron artifacts stay attributable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub span: SourceSpan,
    pub message: String,
    pub neuron: Option<String>,
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        self.kind.default_severity()
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.severity(), self.span)?;
        if let Some(neuron) = &self.neuron {
            write!(f, " in `{}`", neuron)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Collection of diagnostics from parsing and lowering.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics(Vec<Diagnostic>);

#[must_use = "diagnostic not recorded, call .emit()"]
pub struct DiagnosticBuilder<'a> {
    diagnostics: &'a mut Diagnostics,
    diagnostic: Diagnostic,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Starts a diagnostic with the kind's default message.
    pub fn report(&mut self, kind: DiagnosticKind, span: SourceSpan) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            diagnostic: Diagnostic {
                kind,
                span,
                message: kind.fallback_message().to_string(),
                neuron: None,
            },
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, iter: impl IntoIterator<Item = Diagnostic>) {
        self.0.extend(iter);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.0.iter().filter(|d| d.is_error()).count()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl<'a> DiagnosticBuilder<'a> {
    /// Replaces the default message with caller-provided detail.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.diagnostic.message = msg.into();
        self
    }

    /// Attributes the diagnostic to the neuron currently under construction.
    pub fn neuron(mut self, name: impl Into<Option<String>>) -> Self {
        self.diagnostic.neuron = name.into();
        self
    }

    pub fn emit(self) {
        self.diagnostics.0.push(self.diagnostic);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
