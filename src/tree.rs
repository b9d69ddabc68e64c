//! Lineage record of a pipeline run.
//!
//! Each module invocation becomes a [`BranchNode`]: which stage and module
//! ran, with which persisted object, on which inputs, producing which
//! outputs. A node's children are the invocations of the next stage that
//! consumed its outputs, so the tree shows how every final document was
//! reached from the pipeline's seed.
//!
//! ```text
//! [0] ReadFiles  1 → 3
//! ├── [1] FrontMatter  1 → 1
//! │   └── [2] Markdown  1 → 1
//! ...
//! ```
//!
//! Nodes live in an arena and refer to each other by [`NodeId`].

use crate::document::Document;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
pub struct BranchNode {
    pub id: NodeId,
    /// Index of the module within the pipeline.
    pub stage: usize,
    pub module: String,
    pub persisted: Option<Value>,
    pub inputs: Vec<Document>,
    pub outputs: Vec<Document>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionTree {
    nodes: Vec<BranchNode>,
    roots: Vec<NodeId>,
}

impl ExecutionTree {
    pub(crate) fn push(
        &mut self,
        parent: Option<NodeId>,
        stage: usize,
        module: &str,
        persisted: Option<Value>,
        inputs: Vec<Document>,
        outputs: Vec<Document>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(BranchNode {
            id,
            stage,
            module: module.to_string(),
            persisted,
            inputs,
            outputs,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn node(&self, id: NodeId) -> &BranchNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[BranchNode] {
        &self.nodes
    }

    pub fn roots(&self) -> impl Iterator<Item = &BranchNode> {
        self.roots.iter().map(|id| self.node(*id))
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &BranchNode> {
        self.node(id).children.iter().map(|id| self.node(*id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Invocations of the module at `stage`.
    pub fn stage(&self, stage: usize) -> impl Iterator<Item = &BranchNode> {
        self.nodes.iter().filter(move |n| n.stage == stage)
    }

    /// The invocation that produced `document`.
    ///
    /// A document passed through unchanged appears in several nodes' outputs;
    /// the producer is the one that did not receive it as an input.
    pub fn node_for(&self, document: &Document) -> Option<&BranchNode> {
        self.nodes
            .iter()
            .find(|n| n.outputs.contains(document) && !n.inputs.contains(document))
    }

    /// Documents produced by the same invocation as `document`, itself included.
    pub fn siblings(&self, document: &Document) -> &[Document] {
        self.node_for(document)
            .map(|n| n.outputs.as_slice())
            .unwrap_or_default()
    }

    pub fn previous_sibling(&self, document: &Document) -> Option<&Document> {
        let siblings = self.siblings(document);
        let index = siblings.iter().position(|d| d == document)?;
        index.checked_sub(1).map(|i| &siblings[i])
    }

    pub fn next_sibling(&self, document: &Document) -> Option<&Document> {
        let siblings = self.siblings(document);
        let index = siblings.iter().position(|d| d == document)?;
        siblings.get(index + 1)
    }
}
