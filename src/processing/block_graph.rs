use crate::models::{AnnotatedNode, ExtractedFieldMap, LinkRelation, NodeKind, NodeRole, SelectionState};
use std::collections::HashMap;

/// Token rendered for a ticked selection element.
pub const SELECTED_MARK: &str = "X";

/// Reduces a form-analysis block graph to label -> value pairs.
///
/// Missing relationship targets are never an error: an unresolved value link
/// yields an empty value and an unresolved child contributes no text.
pub struct BlockGraphReducer;

struct NodeIndex<'a> {
    keys: Vec<&'a AnnotatedNode>,
    values: HashMap<&'a str, &'a AnnotatedNode>,
    all: HashMap<&'a str, &'a AnnotatedNode>,
}

impl BlockGraphReducer {
    pub fn reduce(nodes: &[AnnotatedNode]) -> ExtractedFieldMap {
        let index = Self::index(nodes);
        let mut fields = ExtractedFieldMap::new();

        for key_node in &index.keys {
            let label = Self::text_of(key_node, &index.all);
            let value = Self::paired_value(key_node, &index.values)
                .map(|value_node| Self::text_of(value_node, &index.all))
                .unwrap_or_default();
            fields.insert(label, value);
        }

        fields
    }

    fn index(nodes: &[AnnotatedNode]) -> NodeIndex<'_> {
        let mut index = NodeIndex {
            keys: Vec::new(),
            values: HashMap::new(),
            all: HashMap::with_capacity(nodes.len()),
        };

        for node in nodes {
            index.all.insert(node.id.as_str(), node);
            match node.role() {
                Some(NodeRole::Key) => index.keys.push(node),
                Some(NodeRole::Value) => {
                    index.values.insert(node.id.as_str(), node);
                }
                None => {}
            }
        }

        index
    }

    // Last VALUE target wins, even when it does not resolve.
    fn paired_value<'a>(
        key_node: &AnnotatedNode,
        values: &HashMap<&str, &'a AnnotatedNode>,
    ) -> Option<&'a AnnotatedNode> {
        key_node
            .targets(LinkRelation::Value)
            .last()
            .and_then(|id| values.get(id).copied())
    }

    fn text_of(node: &AnnotatedNode, all: &HashMap<&str, &AnnotatedNode>) -> String {
        let mut text = String::new();

        for child in node.targets(LinkRelation::Child).filter_map(|id| all.get(id)) {
            match &child.kind {
                NodeKind::Word(word) => {
                    text.push_str(word);
                    text.push(' ');
                }
                NodeKind::Selection(SelectionState::Selected) => {
                    text.push_str(SELECTED_MARK);
                    text.push(' ');
                }
                _ => {}
            }
        }

        text.truncate(text.trim_end().len());
        text
    }
}
