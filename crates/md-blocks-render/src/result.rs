use std::sync::Arc;

use md_blocks::StructuralNode;
use serde::Serialize;

use crate::highlight::StyledText;

/// A classified block plus what the renderer needs to draw it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderResult {
    pub node: StructuralNode,

    /// Highlighted runs for code once the highlighter got to it, a single
    /// plain run otherwise
    pub content: Arc<StyledText>,

    pub is_code_block: bool,

    /// Fence language of a code block, if it declared one
    pub language: Option<String>,

    /// `content` came from the highlighter
    pub highlighted: bool,

    /// Speculative rendering of text that has not completed yet. Replaced
    /// on the next pass.
    pub partial: bool,
}

impl RenderResult {
    /// Plain projection of a completed node. Code shows unstyled until
    /// [`with_highlight`](Self::with_highlight) replaces its content.
    pub fn new(node: StructuralNode) -> Self {
        Self::plain(node, false)
    }

    /// Render still-growing text.
    pub fn speculative(node: StructuralNode) -> Self {
        Self::plain(node, true)
    }

    pub fn with_highlight(&self, content: Arc<StyledText>) -> Self {
        Self {
            content,
            highlighted: true,
            ..self.clone()
        }
    }

    fn plain(node: StructuralNode, partial: bool) -> Self {
        let content = Arc::new(StyledText::plain(node.text()));
        let language = node
            .language()
            .filter(|lang| !lang.is_empty())
            .map(str::to_string);

        Self {
            is_code_block: node.is_code_block(),
            language,
            content,
            node,
            highlighted: false,
            partial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::TokenKind;

    #[test]
    fn test_code_block_gets_highlight() {
        let result = RenderResult::new(StructuralNode::CodeBlock {
            language: "rust".to_string(),
            code: "let x = 1;".to_string(),
        });

        assert!(result.is_code_block);
        assert!(!result.partial);
        assert!(!result.highlighted);
        assert_eq!(result.language.as_deref(), Some("rust"));
        assert_eq!(result.content.to_plain_string(), "let x = 1;");

        let mut styled = StyledText::default();
        styled.push(TokenKind::Keyword, "let");
        styled.push(TokenKind::Plain, " x = 1;");
        let highlighted = result.with_highlight(Arc::new(styled));

        assert!(highlighted.highlighted);
        assert_eq!(highlighted.node, result.node);
        assert_eq!(highlighted.content.runs[0].kind, TokenKind::Keyword);
    }

    #[test]
    fn test_text_nodes_are_projected() {
        let result = RenderResult::new(StructuralNode::Heading {
            level: 2,
            text: "Usage".to_string(),
        });

        assert!(!result.is_code_block);
        assert_eq!(result.language, None);
        assert_eq!(result.content.to_plain_string(), "Usage");

        let rule = RenderResult::new(StructuralNode::HorizontalRule);
        assert!(rule.content.is_empty());
    }

    #[test]
    fn test_code_without_language() {
        let result = RenderResult::speculative(StructuralNode::CodeBlock {
            language: String::new(),
            code: "echo hi".to_string(),
        });

        assert!(result.partial);
        assert!(result.is_code_block);
        assert_eq!(result.language, None);
        assert_eq!(result.content.runs.len(), 1);
    }
}
