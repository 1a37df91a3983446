use serde::{Deserialize, Serialize};

/// Role of a key/value node in a form-analysis result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Key,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionState {
    Selected,
    #[default]
    NotSelected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    KeyValue(NodeRole),
    Word(String),
    Selection(SelectionState),
    /// Page, line and layout blocks. Kept addressable but never rendered.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRelation {
    Value,
    Child,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLink {
    pub relation: LinkRelation,
    pub target_ids: Vec<String>,
}

/// One element of the form-analysis block graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedNode {
    pub id: String,
    pub kind: NodeKind,
    pub links: Vec<NodeLink>,
}

impl AnnotatedNode {
    pub fn key(id: &str) -> Self {
        Self::new(id, NodeKind::KeyValue(NodeRole::Key))
    }

    pub fn value(id: &str) -> Self {
        Self::new(id, NodeKind::KeyValue(NodeRole::Value))
    }

    pub fn word(id: &str, text: &str) -> Self {
        Self::new(id, NodeKind::Word(text.to_string()))
    }

    pub fn selection(id: &str, state: SelectionState) -> Self {
        Self::new(id, NodeKind::Selection(state))
    }

    fn new(id: &str, kind: NodeKind) -> Self {
        AnnotatedNode {
            id: id.to_string(),
            kind,
            links: Vec::new(),
        }
    }

    /// Builder-style helper appending a link.
    pub fn with_link(mut self, relation: LinkRelation, targets: &[&str]) -> Self {
        self.links.push(NodeLink {
            relation,
            target_ids: targets.iter().map(|t| t.to_string()).collect(),
        });
        self
    }

    pub fn role(&self) -> Option<NodeRole> {
        match self.kind {
            NodeKind::KeyValue(role) => Some(role),
            _ => None,
        }
    }

    /// Target ids of every link of the given relation, in link order.
    pub fn targets(&self, relation: LinkRelation) -> impl Iterator<Item = &str> {
        self.links
            .iter()
            .filter(move |link| link.relation == relation)
            .flat_map(|link| link.target_ids.iter().map(String::as_str))
    }
}

// Wire shape of an AnalyzeDocument response

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalyzeDocumentResponse {
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl AnalyzeDocumentResponse {
    pub fn into_nodes(self) -> Vec<AnnotatedNode> {
        self.blocks.into_iter().map(AnnotatedNode::from).collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Block {
    pub id: String,
    pub block_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Relationship {
    #[serde(rename = "Type")]
    pub relation_type: String,
    #[serde(default)]
    pub ids: Vec<String>,
}

impl From<Block> for AnnotatedNode {
    fn from(block: Block) -> Self {
        let kind = match block.block_type.as_str() {
            "KEY_VALUE_SET" => {
                if block.entity_types.iter().any(|t| t == "KEY") {
                    NodeKind::KeyValue(NodeRole::Key)
                } else {
                    NodeKind::KeyValue(NodeRole::Value)
                }
            }
            "WORD" => NodeKind::Word(block.text.unwrap_or_default()),
            "SELECTION_ELEMENT" => match block.selection_status.as_deref() {
                Some("SELECTED") => NodeKind::Selection(SelectionState::Selected),
                _ => NodeKind::Selection(SelectionState::NotSelected),
            },
            _ => NodeKind::Other,
        };

        let links = block
            .relationships
            .into_iter()
            .map(|rel| NodeLink {
                relation: match rel.relation_type.as_str() {
                    "VALUE" => LinkRelation::Value,
                    "CHILD" => LinkRelation::Child,
                    _ => LinkRelation::Other,
                },
                target_ids: rel.ids,
            })
            .collect();

        AnnotatedNode {
            id: block.id,
            kind,
            links,
        }
    }
}
