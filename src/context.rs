//! Per-invocation execution context.
//!
//! The scheduler builds one [`ExecutionContext`] for every module invocation.
//! It gives the module read access to the run's shared services (global
//! metadata, file system, tracer, documents of earlier pipelines) through an
//! [`Environment`], plus the two things that belong to this invocation only:
//! the input documents and the persisted object of the branch being run.
//!
//! The persisted object is fixed when the context is created. A module that
//! wants the next stage to see different state attaches it to the documents
//! it clones (`doc.derive().persist(..)`); the scheduler then opens a new
//! context for them.

use crate::document::{Content, Document};
use crate::engine::DocumentCollection;
use crate::fs::{FileSystem, OutputClaims};
use crate::metadata::Metadata;
use crate::module::{ExecutionError, Module};
use crate::pipeline;
use crate::trace::{TraceError, Tracer};
use crate::value::Value;
use std::sync::Arc;

/// Services shared by every context in a run.
#[derive(Clone, Copy)]
pub struct Environment<'a> {
    pub metadata: &'a Metadata,
    pub file_system: &'a dyn FileSystem,
    pub tracer: &'a Tracer,
    pub documents: &'a DocumentCollection,
    pub claims: &'a OutputClaims,
}

pub struct ExecutionContext<'a> {
    env: Environment<'a>,
    pipeline: Arc<str>,
    inputs: &'a [Document],
    persisted: Option<Value>,
}

impl<'a> ExecutionContext<'a> {
    pub(crate) fn new(
        env: Environment<'a>,
        pipeline: Arc<str>,
        inputs: &'a [Document],
        persisted: Option<Value>,
    ) -> Self {
        Self {
            env,
            pipeline,
            inputs,
            persisted,
        }
    }

    /// State threaded into this branch by the module that cloned its documents.
    pub fn persisted_object(&self) -> Option<&Value> {
        self.persisted.as_ref()
    }

    pub fn pipeline_name(&self) -> &str {
        &self.pipeline
    }

    /// Global metadata, the root of every document's chain.
    pub fn metadata(&self) -> &Metadata {
        self.env.metadata
    }

    /// Final documents of the pipelines that already ran.
    pub fn documents(&self) -> &DocumentCollection {
        self.env.documents
    }

    pub fn file_system(&self) -> &dyn FileSystem {
        self.env.file_system
    }

    /// Output paths already written in this run.
    pub fn output_claims(&self) -> &OutputClaims {
        self.env.claims
    }

    pub fn trace(&self) -> &Tracer {
        self.env.tracer
    }

    /// The documents this invocation was handed.
    pub fn inputs(&self) -> &[Document] {
        self.inputs
    }

    pub fn warning(&self, message: &str) -> Result<(), TraceError> {
        self.env.tracer.warning(message)
    }

    /// A new root document in this pipeline, layered on the global metadata.
    pub fn new_document<I, K, V>(
        &self,
        source: impl Into<String>,
        content: impl Into<Content>,
        metadata: I,
    ) -> Document
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Document::root(
            source.into(),
            content.into(),
            self.env.metadata.child(metadata),
            Some(Arc::clone(&self.pipeline)),
        )
    }

    /// Run `modules` over `inputs` as a nested pipeline and return its final documents.
    ///
    /// The nested run starts from this context's persisted object and follows
    /// the same branching rules as a top-level pipeline.
    pub fn execute(
        &self,
        modules: &[Box<dyn Module>],
        inputs: &[Document],
    ) -> Result<Vec<Document>, ExecutionError> {
        pipeline::run_modules(
            self.env,
            &self.pipeline,
            modules,
            inputs.to_vec(),
            self.persisted.clone(),
            None,
        )
    }
}
