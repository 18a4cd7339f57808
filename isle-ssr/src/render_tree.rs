//! The reconstructed node tree.
//!
//! Nodes live in an arena owned by [`Tree`] and refer to each other by
//! [`NodeId`]. Parent links are plain indices, so walking up or down never
//! recurses.

use std::fmt;

use derive_more::{Display, Error};
use serde::ser::{Serialize, SerializeSeq, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Binding {
    pub item: String,
    pub collection: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FragmentMarker {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NodeKind {
    Root,
    Element {
        tag: String,
        attrs: String,
    },
    Component {
        reference: String,
        props: String,
    },
    Slot {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        scope: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        iteration: Option<Binding>,
    },
    Conditional {
        test: String,
        /// An `else if` of the preceding conditional.
        chained: bool,
    },
    Else,
    Iteration {
        left: String,
        right: String,
    },
    Text {
        content: String,
    },
    Comment {
        marker: FragmentMarker,
    },
    Invalid,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Element { .. } => "element",
            NodeKind::Component { .. } => "component",
            NodeKind::Slot { .. } => "slot",
            NodeKind::Conditional { .. } => "conditional",
            NodeKind::Else => "else",
            NodeKind::Iteration { .. } => "iteration",
            NodeKind::Text { .. } => "text",
            NodeKind::Comment { .. } => "comment",
            NodeKind::Invalid => "invalid",
        }
    }

    fn accepts(&self, child: &NodeKind) -> bool {
        match (self, child) {
            (_, NodeKind::Root) => false,
            (NodeKind::Component { .. }, child) => matches!(child, NodeKind::Slot { .. }),
            (_, NodeKind::Slot { .. }) => false,
            (NodeKind::Text { .. } | NodeKind::Comment { .. } | NodeKind::Invalid, _) => false,
            _ => true,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Root => f.write_str("#root"),
            NodeKind::Element { tag, attrs } if attrs.is_empty() => write!(f, "<{tag}>"),
            NodeKind::Element { tag, attrs } => write!(f, "<{tag} {attrs}>"),
            NodeKind::Component { reference, props } => write!(f, "component {reference} {props}"),
            NodeKind::Slot {
                name,
                scope,
                iteration,
            } => {
                write!(f, "slot {name:?}")?;
                if let Some(scope) = scope {
                    write!(f, " scope {scope}")?;
                }
                if let Some(Binding { item, collection }) = iteration {
                    write!(f, " for {item} in {collection}")?;
                }
                Ok(())
            }
            NodeKind::Conditional {
                test,
                chained: false,
            } => write!(f, "if ({test})"),
            NodeKind::Conditional { test, chained: true } => write!(f, "else if ({test})"),
            NodeKind::Else => f.write_str("else"),
            NodeKind::Iteration { left, right } => write!(f, "for {left} in {right}"),
            NodeKind::Text { content } => write!(f, "{content:?}"),
            NodeKind::Comment {
                marker: FragmentMarker::Start,
            } => f.write_str("<!--[-->"),
            NodeKind::Comment {
                marker: FragmentMarker::End,
            } => f.write_str("<!--]-->"),
            NodeKind::Invalid => f.write_str("#invalid"),
        }
    }
}

/// A child was offered to a node that cannot hold it.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("a {child} node cannot be placed under a {parent} node")]
pub struct InvalidChild {
    pub parent: &'static str,
    pub child: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    nodes: Vec<NodeData>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn get(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    /// Appends `kind` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, InvalidChild> {
        let parent_kind = &self.nodes[parent.0].kind;
        if !parent_kind.accepts(&kind) {
            return Err(InvalidChild {
                parent: parent_kind.name(),
                child: kind.name(),
            });
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Appends text to `parent`, extending its last child when that is
    /// already a text node.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, InvalidChild> {
        if let Some(&last) = self.nodes[parent.0].children.last() {
            if let NodeKind::Text { content } = &mut self.nodes[last.0].kind {
                content.push_str(text);
                return Ok(last);
            }
        }
        self.append(
            parent,
            NodeKind::Text {
                content: text.to_string(),
            },
        )
    }

    /// Pre-order walk of the subtree under `id`, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: self.children(id).iter().rev().copied().collect(),
        }
    }

    /// Indented text rendering, one node per line.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(self.root(), 0usize)];
        while let Some((id, depth)) = stack.pop() {
            for _ in 0..depth {
                out.push_str("  ");
            }
            out.push_str(&self.kind(id).to_string());
            out.push('\n');
            stack.extend(self.children(id).iter().rev().map(|&c| (c, depth + 1)));
        }
        out
    }
}

pub struct Descendants<'t> {
    tree: &'t Tree,
    stack: Vec<NodeId>,
}

impl<'t> Iterator for Descendants<'t> {
    type Item = NodeRef<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack.extend(self.tree.children(id).iter().rev().copied());
        Some(self.tree.get(id))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'t> {
    tree: &'t Tree,
    id: NodeId,
}

impl<'t> NodeRef<'t> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &'t NodeKind {
        self.tree.kind(self.id)
    }

    pub fn parent(&self) -> Option<NodeRef<'t>> {
        self.tree.parent(self.id).map(|id| self.tree.get(id))
    }

    pub fn children(self) -> impl ExactSizeIterator<Item = NodeRef<'t>> + 't {
        let tree = self.tree;
        tree.children(self.id).iter().map(move |&id| tree.get(id))
    }

    pub fn child(&self, index: usize) -> Option<NodeRef<'t>> {
        self.tree.children(self.id).get(index).map(|&id| self.tree.get(id))
    }

    /// Concatenated content of the text children.
    pub fn text(&self) -> String {
        self.children()
            .filter_map(|c| match c.kind() {
                NodeKind::Text { content } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[derive(serde::Serialize)]
struct SerializedNode<'t> {
    #[serde(flatten)]
    kind: &'t NodeKind,
    #[serde(skip_serializing_if = "ChildList::is_empty")]
    children: ChildList<'t>,
}

struct ChildList<'t>(NodeRef<'t>);

impl ChildList<'_> {
    fn is_empty(&self) -> bool {
        self.0.tree.children(self.0.id).is_empty()
    }
}

impl Serialize for ChildList<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.tree.children(self.0.id).len()))?;
        for child in self.0.children() {
            seq.serialize_element(&child)?;
        }
        seq.end()
    }
}

impl Serialize for NodeRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SerializedNode {
            kind: self.kind(),
            children: ChildList(*self),
        }
        .serialize(serializer)
    }
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.get(self.root()).serialize(serializer)
    }
}
