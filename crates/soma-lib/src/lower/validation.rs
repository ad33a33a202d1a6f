//! Structural checks run as each model element completes.
//!
//! These never stop the walk; they only add diagnostics, so a model with a
//! duplicated block still lowers to a complete tree.

use std::collections::HashMap;

use crate::ast::{AstNode, BodyElement, CompilationUnit, Neuron, VarBlockKind};
use crate::diagnostics::{DiagnosticKind, Diagnostics};

/// Each block kind may appear at most once per neuron. User functions are
/// exempt; a neuron can define any number of them.
pub(crate) fn check_unique_block_kinds(neuron: &Neuron, diagnostics: &mut Diagnostics) {
    let mut seen_variables: HashMap<VarBlockKind, u32> = HashMap::new();
    let mut seen_update = false;
    let mut seen_equations = false;
    let mut seen_input = false;
    let mut seen_output = false;

    for element in &neuron.body {
        let duplicate = match element {
            BodyElement::Variables(block) => {
                let count = seen_variables.entry(block.kind).or_insert(0);
                *count += 1;
                (*count > 1).then(|| (format!("`{}` block defined twice", block.kind), block.span()))
            }
            BodyElement::Update(block) => {
                duplicate_flag(&mut seen_update, "update", block.span())
            }
            BodyElement::Equations(block) => {
                duplicate_flag(&mut seen_equations, "equations", block.span())
            }
            BodyElement::Input(block) => duplicate_flag(&mut seen_input, "input", block.span()),
            BodyElement::Output(block) => duplicate_flag(&mut seen_output, "output", block.span()),
            BodyElement::Function(_) => None,
        };
        if let Some((message, span)) = duplicate {
            diagnostics
                .report(DiagnosticKind::BlockNotUnique, span)
                .message(message)
                .neuron(Some(neuron.name.clone()))
                .emit();
        }
    }
}

fn duplicate_flag(
    seen: &mut bool,
    name: &str,
    span: crate::span::SourceSpan,
) -> Option<(String, crate::span::SourceSpan)> {
    if *seen {
        return Some((format!("`{name}` block defined twice"), span));
    }
    *seen = true;
    None
}

/// Later neurons reusing an earlier name are reported, not dropped.
pub(crate) fn check_unique_neuron_names(unit: &CompilationUnit, diagnostics: &mut Diagnostics) {
    let mut seen: Vec<&str> = Vec::new();
    for neuron in &unit.neurons {
        if seen.contains(&neuron.name.as_str()) {
            diagnostics
                .report(DiagnosticKind::NeuronRedeclared, neuron.span())
                .message(format!("neuron `{}` is defined more than once", neuron.name))
                .neuron(Some(neuron.name.clone()))
                .emit();
        } else {
            seen.push(&neuron.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BlockWithVariables, Meta, UpdateBlock};
    use crate::ast::stmt::Block;

    fn neuron_with(body: Vec<BodyElement>) -> Neuron {
        Neuron {
            name: "iaf".into(),
            artifact_name: "iaf.soma".into(),
            body,
            meta: Meta::default(),
        }
    }

    fn state_block() -> BodyElement {
        BodyElement::Variables(BlockWithVariables {
            kind: VarBlockKind::State,
            declarations: Vec::new(),
            meta: Meta::default(),
        })
    }

    #[test]
    fn duplicate_state_block_reported_once() {
        let neuron = neuron_with(vec![state_block(), state_block()]);
        let mut diagnostics = Diagnostics::new();
        check_unique_block_kinds(&neuron, &mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        let diagnostic = diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.kind, DiagnosticKind::BlockNotUnique);
        assert_eq!(diagnostic.neuron.as_deref(), Some("iaf"));
    }

    #[test]
    fn distinct_kinds_do_not_collide() {
        let update = BodyElement::Update(UpdateBlock {
            block: Block::default(),
            meta: Meta::default(),
        });
        let neuron = neuron_with(vec![state_block(), update]);
        let mut diagnostics = Diagnostics::new();
        check_unique_block_kinds(&neuron, &mut diagnostics);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn redeclared_neuron_name() {
        let unit = CompilationUnit {
            artifact_name: "a.soma".into(),
            neurons: vec![neuron_with(Vec::new()), neuron_with(Vec::new())],
            meta: Meta::default(),
        };
        let mut diagnostics = Diagnostics::new();
        check_unique_neuron_names(&unit, &mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics.iter().next().unwrap().kind,
            DiagnosticKind::NeuronRedeclared
        );
    }
}
