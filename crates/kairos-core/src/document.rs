//! Live display tree
//!
//! The only piece that knows how render commands turn into something on
//! screen. Front ends read the tree through [`LiveDocument::root`] and draw it
//! however their display technology wants.

use crate::animate::RenderCommand;
use crate::markup::{parse_fragment, Fragment, MarkupNode};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveDocument {
    root: Fragment,
    // Child indices from the root down to the element currently receiving nodes
    path: Vec<usize>,
    // Index of the text node being revealed, within the current element
    text: Option<usize>,
}

impl LiveDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// A settled document showing stored markup (used on restore)
    pub fn from_markup(html: &str) -> Self {
        let mut document = Self::new();
        document.set_markup(html);
        document
    }

    pub fn set_markup(&mut self, html: &str) {
        self.root = parse_fragment(html);
        self.path.clear();
        self.text = None;
    }

    pub fn root(&self) -> &Fragment {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn to_html(&self) -> String {
        self.root.to_html()
    }

    pub fn plain_text(&self) -> String {
        self.root.plain_text()
    }

    pub fn apply(&mut self, command: &RenderCommand) {
        match command {
            RenderCommand::Open { tag, attributes } => {
                let Some(children) = children_at(&mut self.root.children, &self.path) else {
                    return;
                };
                children.push(MarkupNode::Element {
                    tag: *tag,
                    attributes: attributes.clone(),
                    children: Vec::new(),
                });
                let index = children.len() - 1;
                self.path.push(index);
                self.text = None;
            }
            RenderCommand::Close => {
                self.path.pop();
                self.text = None;
            }
            RenderCommand::BeginText => {
                let Some(children) = children_at(&mut self.root.children, &self.path) else {
                    return;
                };
                children.push(MarkupNode::Text(String::new()));
                self.text = Some(children.len() - 1);
            }
            RenderCommand::Reveal(prefix) => {
                let Some(index) = self.text else {
                    return;
                };
                let Some(children) = children_at(&mut self.root.children, &self.path) else {
                    return;
                };
                if let Some(MarkupNode::Text(text)) = children.get_mut(index) {
                    text.clone_from(prefix);
                }
            }
            RenderCommand::Finished => {
                self.path.clear();
                self.text = None;
            }
        }
    }
}

fn children_at<'a>(
    mut children: &'a mut Vec<MarkupNode>,
    path: &[usize],
) -> Option<&'a mut Vec<MarkupNode>> {
    for &index in path {
        match children.get_mut(index)? {
            MarkupNode::Element { children: inner, .. } => children = inner,
            MarkupNode::Text(_) => return None,
        }
    }
    Some(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::Tag;

    #[test]
    fn test_commands_build_nested_tree() {
        let mut doc = LiveDocument::new();
        doc.apply(&RenderCommand::Open { tag: Tag::P, attributes: vec![] });
        doc.apply(&RenderCommand::BeginText);
        doc.apply(&RenderCommand::Reveal("Ho".to_string()));
        assert_eq!(doc.to_html(), "<p>Ho</p>");

        doc.apply(&RenderCommand::Reveal("Hola ".to_string()));
        doc.apply(&RenderCommand::Open { tag: Tag::Strong, attributes: vec![] });
        doc.apply(&RenderCommand::BeginText);
        doc.apply(&RenderCommand::Reveal("mundo".to_string()));
        doc.apply(&RenderCommand::Close);
        doc.apply(&RenderCommand::Close);
        doc.apply(&RenderCommand::Open { tag: Tag::P, attributes: vec![] });
        doc.apply(&RenderCommand::Close);
        doc.apply(&RenderCommand::Finished);

        assert_eq!(doc.to_html(), "<p>Hola <strong>mundo</strong></p><p></p>");
    }

    #[test]
    fn test_attributes_are_copied() {
        let mut doc = LiveDocument::new();
        doc.apply(&RenderCommand::Open {
            tag: Tag::Ul,
            attributes: vec![("class".to_string(), "hint-list".to_string())],
        });
        doc.apply(&RenderCommand::Close);
        assert_eq!(doc.to_html(), "<ul class=\"hint-list\"></ul>");
    }

    #[test]
    fn test_reveal_without_text_node_is_ignored() {
        let mut doc = LiveDocument::new();
        doc.apply(&RenderCommand::Reveal("x".to_string()));
        assert!(doc.is_empty());
    }

    #[test]
    fn test_restore_from_markup() {
        let doc = LiveDocument::from_markup("<p>a<br>b</p>");
        assert_eq!(doc.plain_text(), "a\nb");
        assert_eq!(doc.to_html(), "<p>a<br>b</p>");
    }
}
