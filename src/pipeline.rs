//! Pipelines and the branch scheduler.
//!
//! A [`Pipeline`] is a named, ordered list of modules. Running it means
//! feeding a seed document through every module in order, one stage at a
//! time. Within a stage the documents are split into *branches*:
//!
//! ```text
//! stage 0   A([seed])                    → a1 a2          (one branch)
//! stage 1   B([a1 a2])                   → b11 b12 b13 b21 b22 b23
//! stage 2   C([b11 b12 b13])  C([b21 b22 b23])            (two branches)
//! ```
//!
//! A branch is a persisted object plus the documents it applies to. The
//! module runs once per branch with a fresh context, its output is drained,
//! and the outputs are regrouped into child branches:
//!
//! - an output identical to one of the invocation's inputs is *recycled*; it
//!   stays in the current branch and carries no persisted object forward
//! - any other output carries the persisted object it was cloned with
//! - outputs descending from an input that produced several outputs form a
//!   branch of their own (fan-out); 1:1 results and documents unrelated to
//!   the inputs stay in the current branch
//! - within each of those, distinct persisted objects split further, in
//!   order of first appearance
//! - a stage that outputs nothing hands one empty branch to the next module,
//!   so modules that produce documents without inputs still run
//!
//! Sibling branches therefore never see each other's persisted object, and
//! fan-out multiplies invocations only where lineage actually diverges.
//!
//! Every top-level invocation is recorded in the pipeline's
//! [`ExecutionTree`]. Nested runs started from a module through
//! [`ExecutionContext::execute`] use the same scheduler but are not recorded.

use crate::context::{Environment, ExecutionContext};
use crate::document::{Content, Document, DocumentId};
use crate::module::{ExecutionError, Module};
use crate::tree::{ExecutionTree, NodeId};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub struct Pipeline {
    name: Arc<str>,
    modules: Vec<Box<dyn Module>>,
    executed: bool,
    outputs: Vec<Document>,
    tree: ExecutionTree,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            modules: Vec::new(),
            executed: false,
            outputs: Vec::new(),
            tree: ExecutionTree::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(&mut self, module: impl Module + 'static) -> &mut Self {
        self.modules.push(Box::new(module));
        self
    }

    pub fn add_boxed(&mut self, module: Box<dyn Module>) -> &mut Self {
        self.modules.push(module);
        self
    }

    pub fn modules(&self) -> &[Box<dyn Module>] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Whether the pipeline has run since the last reset.
    pub fn executed(&self) -> bool {
        self.executed
    }

    /// Final documents of the last run.
    pub fn outputs(&self) -> &[Document] {
        &self.outputs
    }

    pub fn tree(&self) -> &ExecutionTree {
        &self.tree
    }

    /// Dispose and forget the previous run's documents.
    pub(crate) fn reset(&mut self) {
        for doc in &self.outputs {
            doc.dispose();
        }
        self.outputs.clear();
        self.tree = ExecutionTree::default();
        self.executed = false;
    }

    /// Run every module over one seed document carrying the global metadata.
    pub(crate) fn execute(&mut self, env: Environment<'_>) -> Result<(), ExecutionError> {
        let seed = Document::root(
            String::new(),
            Content::Empty,
            env.metadata.clone(),
            Some(Arc::clone(&self.name)),
        );
        let mut tree = ExecutionTree::default();
        let outputs = run_modules(
            env,
            &self.name,
            &self.modules,
            vec![seed],
            None,
            Some(&mut tree),
        )?;
        self.outputs = outputs;
        self.tree = tree;
        self.executed = true;
        Ok(())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("modules", &self.modules.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("executed", &self.executed)
            .field("outputs", &self.outputs.len())
            .finish()
    }
}

struct Branch {
    persisted: Option<Value>,
    documents: Vec<Document>,
    node: Option<NodeId>,
}

/// Run `modules` stage by stage starting from one branch of `seed` documents.
///
/// Returns the documents of the final stage, branch by branch.
pub(crate) fn run_modules(
    env: Environment<'_>,
    pipeline: &Arc<str>,
    modules: &[Box<dyn Module>],
    seed: Vec<Document>,
    persisted: Option<Value>,
    mut tree: Option<&mut ExecutionTree>,
) -> Result<Vec<Document>, ExecutionError> {
    let mut branches = vec![Branch {
        persisted,
        documents: seed,
        node: None,
    }];

    for (stage, module) in modules.iter().enumerate() {
        let mut next = Vec::new();
        let mut last_node = None;
        for branch in branches {
            let context = ExecutionContext::new(
                env,
                Arc::clone(pipeline),
                &branch.documents,
                branch.persisted.clone(),
            );
            let outputs = module
                .execute(&branch.documents, &context)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| e.in_module(module.name()))?;
            drop(context);

            tracing::debug!(
                pipeline = %pipeline,
                stage,
                module = module.name(),
                inputs = branch.documents.len(),
                outputs = outputs.len(),
                "module.executed"
            );

            let children = partition(&branch.documents, &outputs);
            let node = tree.as_deref_mut().map(|tree| {
                tree.push(
                    branch.node,
                    stage,
                    module.name(),
                    branch.persisted,
                    branch.documents,
                    outputs,
                )
            });
            last_node = node.or(last_node);
            next.extend(children.into_iter().map(|(persisted, documents)| Branch {
                persisted,
                documents,
                node,
            }));
        }
        // Later modules still run when a stage produced nothing.
        if next.is_empty() {
            next.push(Branch {
                persisted: None,
                documents: Vec::new(),
                node: last_node,
            });
        }
        branches = next;
    }

    Ok(branches.into_iter().flat_map(|b| b.documents).collect())
}

/// Group one invocation's outputs into the branches of the next stage.
fn partition(inputs: &[Document], outputs: &[Document]) -> Vec<(Option<Value>, Vec<Document>)> {
    let positions: HashMap<DocumentId, usize> =
        inputs.iter().enumerate().map(|(i, d)| (d.id(), i)).collect();

    // (origin input, persisted) per output; recycled outputs have neither.
    let traced: Vec<(Option<usize>, Option<Value>)> = outputs
        .iter()
        .map(|doc| {
            if positions.contains_key(&doc.id()) {
                return (None, None);
            }
            let origin = doc.ancestors().find_map(|a| positions.get(&a.id()).copied());
            (origin, doc.persisted().cloned())
        })
        .collect();

    let mut produced = vec![0usize; inputs.len()];
    for (origin, _) in &traced {
        if let Some(i) = origin {
            produced[*i] += 1;
        }
    }

    let mut groups: Vec<((Option<usize>, Option<Value>), Vec<Document>)> = Vec::new();
    for (doc, (origin, persisted)) in outputs.iter().zip(traced) {
        let fork = origin.filter(|i| produced[*i] > 1);
        let key = (fork, persisted);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(doc.clone()),
            None => groups.push((key, vec![doc.clone()])),
        }
    }
    groups
        .into_iter()
        .map(|((_, persisted), members)| (persisted, members))
        .collect()
}

/// The pipelines of an engine, in declaration order.
#[derive(Debug, Default)]
pub struct PipelineCollection {
    pipelines: Vec<Pipeline>,
}

impl PipelineCollection {
    /// Add an empty pipeline. Unnamed pipelines are called `Pipeline N`.
    pub fn create(&mut self, name: Option<&str>) -> Result<&mut Pipeline, crate::engine::EngineError> {
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("Pipeline {}", self.pipelines.len() + 1),
        };
        self.add(Pipeline::new(name))
    }

    pub fn add(&mut self, pipeline: Pipeline) -> Result<&mut Pipeline, crate::engine::EngineError> {
        if self.get(pipeline.name()).is_some() {
            return Err(crate::engine::EngineError::DuplicatePipeline(
                pipeline.name().to_string(),
            ));
        }
        self.pipelines.push(pipeline);
        let index = self.pipelines.len() - 1;
        Ok(&mut self.pipelines[index])
    }

    pub fn get(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines.iter().find(|p| p.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pipeline> {
        self.pipelines.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Pipeline> {
        self.pipelines.iter_mut()
    }

    pub fn names(&self) -> Vec<&str> {
        self.pipelines.iter().map(Pipeline::name).collect()
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;
    use crate::metadata::Metadata;

    fn doc(source: &str) -> Document {
        Document::new(source, Content::Empty, Metadata::new())
    }

    // =========================================================================
    // partition
    // =========================================================================

    #[test]
    fn fan_out_of_a_single_input_is_one_branch() {
        let seed = doc("seed");
        let outputs = vec![seed.clone_with([("n", 1)]), seed.clone_with([("n", 2)])];
        let groups = partition(std::slice::from_ref(&seed), &outputs);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].1, outputs);
    }

    #[test]
    fn fan_out_of_several_inputs_splits_per_input() {
        let a = doc("a");
        let b = doc("b");
        let outputs = vec![
            a.clone_with([("n", 1)]),
            b.clone_with([("n", 1)]),
            a.clone_with([("n", 2)]),
            b.clone_with([("n", 2)]),
        ];
        let groups = partition(&[a, b], &outputs);
        let sizes: Vec<usize> = groups.iter().map(|(_, d)| d.len()).collect();
        assert_eq!(sizes, vec![2, 2]);
        assert_eq!(groups[0].1, vec![outputs[0].clone(), outputs[2].clone()]);
    }

    #[test]
    fn one_to_one_results_stay_together() {
        let inputs = vec![doc("a"), doc("b"), doc("c")];
        let outputs: Vec<Document> = inputs
            .iter()
            .map(|d| d.clone_with([("x", 1)]).clone_with([("y", 2)]))
            .collect();
        let groups = partition(&inputs, &outputs);
        assert_eq!(groups, vec![(None, outputs)]);
    }

    #[test]
    fn recycled_and_unrelated_documents_stay_together() {
        let a = doc("a");
        let b = doc("b");
        let unrelated = doc("elsewhere");
        let outputs = vec![b.clone(), unrelated.clone(), a.clone()];
        let groups = partition(&[a, b], &outputs);
        assert_eq!(groups, vec![(None, outputs)]);
    }

    #[test]
    fn distinct_persisted_objects_split() {
        let seed = doc("seed");
        let outputs = vec![seed.clone_persisting(0), seed.clone_persisting(1)];
        let groups = partition(std::slice::from_ref(&seed), &outputs);
        let persisted: Vec<Option<Value>> = groups.into_iter().map(|(p, _)| p).collect();
        assert_eq!(persisted, vec![Some(Value::Int(0)), Some(Value::Int(1))]);
    }

    #[test]
    fn recycled_documents_drop_persisted_object() {
        let seed = doc("seed");
        let carried = seed.clone_persisting("A");
        let groups = partition(std::slice::from_ref(&carried), std::slice::from_ref(&carried));
        assert_eq!(groups, vec![(None, vec![carried])]);
    }

    #[test]
    fn empty_output_has_no_branches() {
        assert!(partition(&[doc("a")], &[]).is_empty());
    }

    // =========================================================================
    // PipelineCollection
    // =========================================================================

    #[test]
    fn unnamed_pipelines_are_numbered() {
        let mut pipelines = PipelineCollection::default();
        pipelines.create(None).unwrap();
        pipelines.create(Some("posts")).unwrap();
        pipelines.create(None).unwrap();
        assert_eq!(pipelines.names(), vec!["Pipeline 1", "posts", "Pipeline 3"]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut pipelines = PipelineCollection::default();
        pipelines.create(Some("posts")).unwrap();
        let err = pipelines.create(Some("posts")).unwrap_err();
        assert!(matches!(err, EngineError::DuplicatePipeline(name) if name == "posts"));
        assert_eq!(pipelines.len(), 1);
    }
}
