//! Nested serde form of a document, used for document files

use super::tree::{Document, NodeId, NodeKind};
use crate::errors::ExError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One element with its attributes, body and child elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DocNode>,
}

impl DocNode {
    pub fn element(name: impl Into<String>, children: Vec<DocNode>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
            body: None,
            children,
        }
    }

    pub fn leaf(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::element(name, Vec::new())
        }
    }
}

impl Document {
    pub fn to_node(&self) -> DocNode {
        self.node_at(self.root())
    }

    fn node_at(&self, id: NodeId) -> DocNode {
        let mut node = DocNode::element(self.name(id), Vec::new());
        for &child in self.children(id) {
            match self.kind(child) {
                NodeKind::Element => node.children.push(self.node_at(child)),
                NodeKind::Attribute => {
                    node.attributes.insert(
                        self.name(child).to_string(),
                        self.value(child).unwrap_or_default().to_string(),
                    );
                }
                NodeKind::Body => {
                    if node.body.is_none() {
                        node.body = self.value(child).map(str::to_string);
                    }
                }
            }
        }
        node
    }

    pub fn from_node(node: &DocNode) -> Self {
        let mut doc = Document::new(node.name.clone());
        let root = doc.root();
        doc.fill(root, node);
        doc
    }

    fn fill(&mut self, id: NodeId, node: &DocNode) {
        for (name, value) in &node.attributes {
            self.add_attribute(id, name, value);
        }
        if let Some(body) = &node.body {
            self.add_body(id, body);
        }
        for child in &node.children {
            let child_id = self.add_element(id, &child.name);
            self.fill(child_id, child);
        }
    }

    /// Pretty JSON document file contents
    pub fn to_json(&self) -> Result<String, ExError> {
        Ok(serde_json::to_string_pretty(&self.to_node())?)
    }

    pub fn from_json(text: &str) -> Result<Self, ExError> {
        let node: DocNode = serde_json::from_str(text)?;
        Ok(Self::from_node(&node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;

    #[test]
    fn test_json_shape_omits_empty_parts() {
        let mut doc = Document::default();
        let root = doc.root();
        doc.add_leaf(root, "hostname", "r1");
        let json: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "config",
                "children": [{ "name": "hostname", "body": "r1" }]
            })
        );
    }

    #[test]
    fn test_node_form_round_trips() {
        let node = DocNode::element(
            "config",
            vec![DocNode::element(
                "interface",
                vec![DocNode::leaf("name", "eth0"), DocNode::leaf("mtu", "1500")],
            )],
        );
        let doc = Document::from_node(&node);
        assert_eq!(doc.to_node(), node);
        assert_eq!(Document::from_json(&doc.to_json().unwrap()).unwrap().to_node(), node);
    }

    #[test]
    fn test_bad_json_is_serialization_error() {
        let err = Document::from_json("{\"children\": 3}").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Serialization);
    }
}
