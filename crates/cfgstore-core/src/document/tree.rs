use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Element,
    Attribute,
    Body,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    name: String,
    value: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed document tree
///
/// Nodes are never removed, so every `NodeId` handed out stays valid for the
/// lifetime of the document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(super::ROOT_ELEMENT)
    }
}

impl Document {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element,
                name: root_name.into(),
                value: None,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind, name: &str, value: Option<&str>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            name: name.to_string(),
            value: value.map(str::to_string),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn add_element(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.push(parent, NodeKind::Element, name, None)
    }

    pub fn add_attribute(&mut self, parent: NodeId, name: &str, value: &str) -> NodeId {
        self.push(parent, NodeKind::Attribute, name, Some(value))
    }

    pub fn add_body(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(parent, NodeKind::Body, "", Some(text))
    }

    /// Add `<name>text</name>` below `parent`
    pub fn add_leaf(&mut self, parent: NodeId, name: &str, text: &str) -> NodeId {
        let leaf = self.add_element(parent, name);
        self.add_body(leaf, text);
        leaf
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.node(id).name
    }

    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.node(id).value.as_deref()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.kind(c) == NodeKind::Element)
    }

    pub fn attributes(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.children(id)
            .iter()
            .filter(|&&c| self.kind(c) == NodeKind::Attribute)
            .map(|&c| (self.name(c), self.value(c).unwrap_or_default()))
    }

    /// Text of the first body child
    pub fn body(&self, id: NodeId) -> Option<&str> {
        self.children(id)
            .iter()
            .find(|&&c| self.kind(c) == NodeKind::Body)
            .and_then(|&c| self.value(c))
    }

    /// An element with a body and no element children
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.body(id).is_some() && self.child_elements(id).next().is_none()
    }

    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.child_elements(parent).find(|&c| self.name(c) == name)
    }

    pub fn find_or_create(&mut self, parent: NodeId, name: &str) -> NodeId {
        match self.find_child(parent, name) {
            Some(id) => id,
            None => self.add_element(parent, name),
        }
    }

    /// Body of the named leaf child
    pub fn child_body(&self, parent: NodeId, name: &str) -> Option<&str> {
        self.child_elements(parent)
            .filter(|&c| self.name(c) == name)
            .find_map(|c| self.body(c))
    }

    /// Slash separated element names from the root down to `id`
    pub fn path(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut cur = Some(id);
        while let Some(n) = cur {
            names.push(self.name(n));
            cur = self.parent(n);
        }
        names.reverse();
        names.join("/")
    }

    /// Number of element nodes, root included
    pub fn element_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Element)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_links_and_path() {
        let mut doc = Document::default();
        let iface = doc.add_element(doc.root(), "interface");
        let name = doc.add_leaf(iface, "name", "eth0");
        assert_eq!(doc.parent(name), Some(iface));
        assert_eq!(doc.path(name), "config/interface/name");
        assert_eq!(doc.child_body(iface, "name"), Some("eth0"));
        assert!(doc.is_leaf(name));
        assert!(!doc.is_leaf(iface));
    }

    #[test]
    fn test_find_or_create_reuses_first_match() {
        let mut doc = Document::default();
        let root = doc.root();
        let a = doc.find_or_create(root, "system");
        let b = doc.find_or_create(root, "system");
        assert_eq!(a, b);
        assert_eq!(doc.children(root).len(), 1);
    }

    #[test]
    fn test_attributes_are_not_elements() {
        let mut doc = Document::default();
        let root = doc.root();
        doc.add_attribute(root, "version", "1");
        assert_eq!(doc.child_elements(root).count(), 0);
        assert_eq!(doc.attributes(root).collect::<Vec<_>>(), [("version", "1")]);
    }
}
