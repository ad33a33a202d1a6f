//! Source-order resolution for block elements.
//!
//! Blocks collect elements of several kinds (equations, shapes, aliases;
//! or the different top-level blocks of a neuron). The AST interleaves
//! them by their position in the file, picked by repeatedly taking the
//! element with the smallest start line. Ties keep the earlier element of
//! the pool, so the procedure is stable and idempotent.

use crate::parser::SyntaxNode;
use crate::span::LineIndex;

/// Drains `pool` in ascending start-line order.
pub(crate) fn drain_in_source_order(
    mut pool: Vec<SyntaxNode>,
    lines: &LineIndex,
) -> Vec<SyntaxNode> {
    let mut ordered = Vec::with_capacity(pool.len());
    while !pool.is_empty() {
        let mut smallest = 0;
        let mut smallest_line = start_line(&pool[smallest], lines);
        for (index, node) in pool.iter().enumerate().skip(1) {
            let line = start_line(node, lines);
            if line < smallest_line {
                smallest = index;
                smallest_line = line;
            }
        }
        ordered.push(pool.remove(smallest));
    }
    ordered
}

fn start_line(node: &SyntaxNode, lines: &LineIndex) -> u32 {
    lines.line_col(node.text_range().start()).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn neuron_block_nodes(source: &str) -> (Vec<SyntaxNode>, LineIndex) {
        let (parse, diagnostics) = parser::parse(source).unwrap();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let neuron = parse
            .syntax()
            .children()
            .next()
            .expect("source contains a neuron");
        (neuron.children().collect(), LineIndex::new(source))
    }

    #[test]
    fn already_ordered_input_is_untouched() {
        let source = "neuron n:\nstate:\nend\nparameters:\nend\nupdate:\nend\nend\n";
        let (nodes, lines) = neuron_block_nodes(source);
        let before: Vec<_> = nodes.clone();
        let ordered = drain_in_source_order(nodes, &lines);
        assert_eq!(ordered, before);
    }

    #[test]
    fn ordering_is_idempotent() {
        let source = "neuron n:\nequations:\nV_m' = -V_m / tau\nend\nstate:\nV_m mV = 0.0\nend\nend\n";
        let (nodes, lines) = neuron_block_nodes(source);
        let once = drain_in_source_order(nodes, &lines);
        let twice = drain_in_source_order(once.clone(), &lines);
        assert_eq!(once, twice);
    }
}
