//! Structural classification of completed blocks.

use crate::element::StructuralNode;
use crate::line::{classify_line, LineKind};

/// Classify a completed block, or a whole finished message, into nodes.
///
/// Never fails: text that matches nothing else is a paragraph. Inline markup,
/// nested lists and nested quotes stay as flat text.
#[profiling::function]
pub fn classify(raw: &str) -> Vec<StructuralNode> {
    let mut builder = NodeBuilder::default();
    let body = raw.strip_suffix('\n').unwrap_or(raw);
    let mut lines = body.split('\n');

    while let Some(line) = lines.next() {
        match classify_line(line) {
            LineKind::Fence { marker, language } => {
                builder.flush();

                let mut code = Vec::new();
                for inner in lines.by_ref() {
                    if marker.closes(inner) {
                        break;
                    }
                    code.push(inner);
                }

                builder.nodes.push(StructuralNode::CodeBlock {
                    language: language.to_string(),
                    code: code.join("\n"),
                });
            }
            LineKind::Heading { level, text } => {
                builder.flush();
                builder.nodes.push(StructuralNode::Heading {
                    level,
                    text: text.to_string(),
                });
            }
            LineKind::Rule => {
                builder.flush();
                builder.nodes.push(StructuralNode::HorizontalRule);
            }
            LineKind::ListItem { number, text } => {
                builder.flush();
                builder.nodes.push(StructuralNode::ListItem {
                    text: text.trim_end().to_string(),
                    number,
                });
            }
            LineKind::Quote { text } => {
                builder.flush_paragraph();
                builder.quote.push(text.trim_end());
            }
            LineKind::Blank => builder.flush(),
            LineKind::Text => {
                builder.flush_quote();
                builder.paragraph.push(line.trim_end_matches('\r'));
            }
        }
    }

    builder.finish()
}

/// Accumulates consecutive paragraph or quote lines.
#[derive(Default)]
struct NodeBuilder<'a> {
    nodes: Vec<StructuralNode>,
    paragraph: Vec<&'a str>,
    quote: Vec<&'a str>,
}

impl NodeBuilder<'_> {
    fn flush(&mut self) {
        self.flush_paragraph();
        self.flush_quote();
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }

        let text = self.paragraph.join("\n").trim().to_string();
        self.paragraph.clear();
        self.nodes.push(StructuralNode::Paragraph { text });
    }

    fn flush_quote(&mut self) {
        if self.quote.is_empty() {
            return;
        }

        let text = self.quote.join("\n");
        self.quote.clear();
        self.nodes.push(StructuralNode::Quote { text });
    }

    fn finish(mut self) -> Vec<StructuralNode> {
        self.flush();
        self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn paragraph(text: &str) -> StructuralNode {
        StructuralNode::Paragraph {
            text: text.to_string(),
        }
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(
            classify("# Title"),
            vec![StructuralNode::Heading {
                level: 1,
                text: "Title".to_string()
            }]
        );
        assert_eq!(
            classify("###### Deep"),
            vec![StructuralNode::Heading {
                level: 6,
                text: "Deep".to_string()
            }]
        );
    }

    #[test]
    fn test_seven_marks_is_paragraph() {
        assert_eq!(classify("####### Title"), vec![paragraph("####### Title")]);
    }

    #[test]
    fn test_horizontal_rule() {
        assert_eq!(classify("----"), vec![StructuralNode::HorizontalRule]);
        assert_eq!(classify("--"), vec![paragraph("--")]);
    }

    #[test]
    fn test_code_block_preserves_content() {
        let raw = "```python\ndef f():\n\n    return 1\n```";
        assert_eq!(
            classify(raw),
            vec![StructuralNode::CodeBlock {
                language: "python".to_string(),
                code: "def f():\n\n    return 1".to_string(),
            }]
        );
    }

    #[test]
    fn test_code_block_without_language() {
        assert_eq!(
            classify("```\nls -la\n```"),
            vec![StructuralNode::CodeBlock {
                language: String::new(),
                code: "ls -la".to_string(),
            }]
        );
    }

    #[test]
    fn test_unclosed_code_block() {
        assert_eq!(
            classify("```rust\nfn main() {"),
            vec![StructuralNode::CodeBlock {
                language: "rust".to_string(),
                code: "fn main() {".to_string(),
            }]
        );
    }

    #[test]
    fn test_markers_inside_code_are_opaque() {
        let raw = "```md\n# not a heading\n- not a list\n> nor a quote\n```";
        let nodes = classify(raw);
        assert_eq!(nodes.len(), 1);
        assert_eq!(
            nodes[0].text(),
            "# not a heading\n- not a list\n> nor a quote"
        );
    }

    #[test]
    fn test_list_items_strip_markers() {
        assert_eq!(
            classify("- first\n2. second\n  * nested"),
            vec![
                StructuralNode::ListItem {
                    text: "first".to_string(),
                    number: None
                },
                StructuralNode::ListItem {
                    text: "second".to_string(),
                    number: Some(2)
                },
                StructuralNode::ListItem {
                    text: "nested".to_string(),
                    number: None
                },
            ]
        );
    }

    #[test]
    fn test_consecutive_quote_lines_merge() {
        assert_eq!(
            classify("> one\n>   two\nafter"),
            vec![
                StructuralNode::Quote {
                    text: "one\ntwo".to_string()
                },
                paragraph("after"),
            ]
        );
    }

    #[test]
    fn test_paragraph_keeps_internal_newlines() {
        assert_eq!(
            classify("first line\nsecond **line**"),
            vec![paragraph("first line\nsecond **line**")]
        );
    }

    #[test]
    fn test_whole_message() {
        let message = "# Setup\n\nInstall it:\n\n```sh\ncargo install foo\n```\n\n1. run\n2. enjoy\n\n---\n\n> done\n";
        assert_eq!(
            classify(message),
            vec![
                StructuralNode::Heading {
                    level: 1,
                    text: "Setup".to_string()
                },
                paragraph("Install it:"),
                StructuralNode::CodeBlock {
                    language: "sh".to_string(),
                    code: "cargo install foo".to_string(),
                },
                StructuralNode::ListItem {
                    text: "run".to_string(),
                    number: Some(1)
                },
                StructuralNode::ListItem {
                    text: "enjoy".to_string(),
                    number: Some(2)
                },
                StructuralNode::HorizontalRule,
                StructuralNode::Quote {
                    text: "done".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_blank_input() {
        assert!(classify("").is_empty());
        assert!(classify("\n\n  \n").is_empty());
    }
}
