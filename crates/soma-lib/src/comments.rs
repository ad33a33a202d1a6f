//! Comment attachment.
//!
//! One pre-scan collects every `#` comment from the syntax tree; lowering
//! then claims comments for the nodes they document. A comment belongs to
//! at most one attachment site per position (preceding, trailing, or
//! following): the first node to claim it wins.

use crate::parser::{SyntaxKind, SyntaxNode};
use crate::span::{LineIndex, SourceSpan};

#[derive(Debug, Clone)]
struct CommentEntry {
    /// Comment text without the leading `#`, trimmed.
    text: String,
    line: u32,
    /// No other content precedes the comment on its line.
    own_line: bool,
    claimed: bool,
}

/// Comments a node claimed, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimedComments {
    pub pre: Vec<String>,
    pub trailing: Option<String>,
    pub post: Vec<String>,
}

/// All comments of one source artifact, ordered by position.
#[derive(Debug, Clone)]
pub struct CommentIndex {
    entries: Vec<CommentEntry>,
}

impl CommentIndex {
    pub fn build(root: &SyntaxNode, lines: &LineIndex) -> Self {
        let mut entries = Vec::new();
        let mut last_content_line = 0u32;
        for element in root.descendants_with_tokens() {
            let Some(token) = element.into_token() else {
                continue;
            };
            let (line, _) = lines.line_col(token.text_range().start());
            match token.kind() {
                SyntaxKind::LineComment => {
                    entries.push(CommentEntry {
                        text: strip_marker(token.text()),
                        line,
                        own_line: line != last_content_line,
                        claimed: false,
                    });
                }
                SyntaxKind::Whitespace | SyntaxKind::Newline => {}
                _ => last_content_line = line,
            }
        }
        Self { entries }
    }

    /// Claims the comments documenting a node at `span`.
    ///
    /// Preceding comments are the contiguous run of own-line comments
    /// directly above the node, stopping at the previous sibling's last
    /// line. The trailing comment shares the node's first line. Following
    /// comments are one sharing the node's closing line (`end # done`)
    /// plus the contiguous run directly below, stopping before the next
    /// sibling.
    pub fn claim_for(
        &mut self,
        span: SourceSpan,
        prev_end_line: Option<u32>,
        next_start_line: Option<u32>,
    ) -> ClaimedComments {
        let mut claimed = ClaimedComments::default();
        if span.is_unknown() {
            return claimed;
        }

        for entry in self.entries.iter_mut() {
            if !entry.claimed && !entry.own_line && entry.line == span.start_line {
                entry.claimed = true;
                claimed.trailing = Some(entry.text.clone());
                break;
            }
        }

        let floor = prev_end_line.unwrap_or(0);
        let mut expected = span.start_line.saturating_sub(1);
        for entry in self.entries.iter_mut().rev() {
            if entry.line >= span.start_line || !entry.own_line {
                continue;
            }
            if entry.line != expected || entry.line <= floor {
                break;
            }
            if !entry.claimed {
                entry.claimed = true;
                claimed.pre.push(entry.text.clone());
            }
            expected = expected.saturating_sub(1);
        }
        claimed.pre.reverse();

        if span.end_line > span.start_line {
            for entry in self.entries.iter_mut() {
                if !entry.claimed && !entry.own_line && entry.line == span.end_line {
                    entry.claimed = true;
                    claimed.post.push(entry.text.clone());
                    break;
                }
            }
        }

        let ceiling = next_start_line.unwrap_or(u32::MAX);
        let mut expected = span.end_line + 1;
        for entry in self.entries.iter_mut() {
            if entry.line <= span.end_line || !entry.own_line {
                continue;
            }
            if entry.line != expected || entry.line >= ceiling {
                break;
            }
            if !entry.claimed {
                entry.claimed = true;
                claimed.post.push(entry.text.clone());
            }
            expected += 1;
        }

        claimed
    }
}

fn strip_marker(raw: &str) -> String {
    raw.strip_prefix('#').unwrap_or(raw).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn index_for(source: &str) -> CommentIndex {
        let (parse, _) = parser::parse(source).unwrap();
        CommentIndex::build(&parse.syntax(), &LineIndex::new(source))
    }

    #[test]
    fn trailing_comment_on_same_line() {
        let source = "neuron n:\nstate:\nx real = 0 # init\nend\nend\n";
        let mut index = index_for(source);
        let claimed = index.claim_for(SourceSpan::new(3, 0, 3, 10), None, None);
        assert_eq!(claimed.trailing.as_deref(), Some("init"));
        assert!(claimed.pre.is_empty());
    }

    #[test]
    fn preceding_run_stops_at_gap() {
        let source = "# far away\n\n# one\n# two\nneuron n:\nend\n";
        let mut index = index_for(source);
        let claimed = index.claim_for(SourceSpan::new(5, 0, 6, 3), None, None);
        assert_eq!(claimed.pre, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn comment_on_closing_line_is_claimed() {
        let source = "neuron n:\nend # done\n";
        let mut index = index_for(source);
        let claimed = index.claim_for(SourceSpan::new(1, 0, 2, 3), None, None);
        assert_eq!(claimed.post, vec!["done".to_string()]);
        assert!(claimed.trailing.is_none());
    }

    #[test]
    fn first_claim_wins() {
        let source = "# shared\nneuron n:\nend\n";
        let mut index = index_for(source);
        let span = SourceSpan::new(2, 0, 3, 3);
        let first = index.claim_for(span, None, None);
        let second = index.claim_for(span, None, None);
        assert_eq!(first.pre, vec!["shared".to_string()]);
        assert!(second.pre.is_empty());
    }

    #[test]
    fn sibling_boundaries_respected() {
        let source = "neuron n:\nstate:\na real = 0\n# between\nb real = 0\nend\nend\n";
        let mut index = index_for(source);
        let first = index.claim_for(SourceSpan::new(3, 0, 3, 10), None, Some(5));
        assert_eq!(first.post, vec!["between".to_string()]);
        let second = index.claim_for(SourceSpan::new(5, 0, 5, 10), Some(3), None);
        assert!(second.pre.is_empty());
    }
}
