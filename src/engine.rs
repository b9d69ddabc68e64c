//! Engine orchestration.
//!
//! An [`Engine`] owns everything a run needs: global metadata, the pipelines,
//! the file system, the tracer, and the documents each pipeline produced.
//! [`Engine::run`] executes the pipelines in declaration order. Each one
//! starts from a single seed document carrying the global metadata, and its
//! final documents are published in the [`DocumentCollection`] before the
//! next pipeline starts, which is how later pipelines see earlier ones.
//!
//! The first failing pipeline stops the run; later pipelines are skipped.
//!
//! Engines are configured once. Rebuilding (watch mode, tests) means a new
//! engine, not reconfiguring an existing one.

use crate::config::{ConfigError, SiteConfig};
use crate::context::Environment;
use crate::document::Document;
use crate::fs::{FileSystem, OutputClaims, PhysicalFileSystem};
use crate::metadata::Metadata;
use crate::module::ExecutionError;
use crate::pipeline::{Pipeline, PipelineCollection};
use crate::registry;
use crate::trace::{StrictListener, TraceListener, Tracer};
use crate::value::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine is already configured")]
    AlreadyConfigured,
    #[error("duplicate pipeline name: {0}")]
    DuplicatePipeline(String),
    #[error("pipeline '{name}' failed: {source}")]
    Pipeline {
        name: String,
        #[source]
        source: ExecutionError,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Whether the failure came from configuration rather than from running it.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, EngineError::Pipeline { .. })
    }
}

/// Final documents of each executed pipeline, in execution order.
#[derive(Debug, Default)]
pub struct DocumentCollection {
    pipelines: Vec<(String, Vec<Document>)>,
}

impl DocumentCollection {
    pub fn get(&self, pipeline: &str) -> Option<&[Document]> {
        self.pipelines
            .iter()
            .find(|(name, _)| name == pipeline)
            .map(|(_, docs)| docs.as_slice())
    }

    /// Every document, pipeline by pipeline.
    pub fn all(&self) -> impl Iterator<Item = &Document> {
        self.pipelines.iter().flat_map(|(_, docs)| docs.iter())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Document])> {
        self.pipelines
            .iter()
            .map(|(name, docs)| (name.as_str(), docs.as_slice()))
    }

    pub fn pipelines(&self) -> Vec<&str> {
        self.pipelines.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Total number of documents.
    pub fn len(&self) -> usize {
        self.pipelines.iter().map(|(_, docs)| docs.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, pipeline: &str, documents: Vec<Document>) {
        match self.pipelines.iter_mut().find(|(name, _)| name == pipeline) {
            Some((_, existing)) => *existing = documents,
            None => self.pipelines.push((pipeline.to_string(), documents)),
        }
    }

    fn clear(&mut self) {
        self.pipelines.clear();
    }
}

pub struct Engine {
    metadata: Metadata,
    pipelines: PipelineCollection,
    file_system: Box<dyn FileSystem>,
    tracer: Tracer,
    documents: DocumentCollection,
    claims: OutputClaims,
    configured: bool,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("pipelines", &self.pipelines.names())
            .field("input", &self.file_system.input_path())
            .field("output", &self.file_system.output_path())
            .field("documents", &self.documents.len())
            .field("configured", &self.configured)
            .finish()
    }
}

impl Engine {
    /// An engine rooted at the current directory with `input`/`output` below it.
    pub fn new() -> Self {
        Self::with_file_system(PhysicalFileSystem::new(".", "input", "output"))
    }

    pub fn with_file_system(file_system: impl FileSystem + 'static) -> Self {
        Self {
            metadata: Metadata::new(),
            pipelines: PipelineCollection::default(),
            file_system: Box::new(file_system),
            tracer: Tracer::new(),
            documents: DocumentCollection::default(),
            claims: OutputClaims::default(),
            configured: false,
        }
    }

    /// Build and configure an engine for the site at `root`.
    pub fn from_config(config: &SiteConfig, root: &Path) -> Result<Self, EngineError> {
        let mut engine = Self::with_file_system(PhysicalFileSystem::new(
            root,
            &config.input,
            &config.output,
        ));
        engine.configure(config)?;
        Ok(engine)
    }

    /// Apply a site configuration: global metadata, listeners, pipelines.
    pub fn configure(&mut self, config: &SiteConfig) -> Result<(), EngineError> {
        if self.configured {
            return Err(EngineError::AlreadyConfigured);
        }

        // Everything fallible happens on locals; a failed configure leaves
        // the engine as it was.
        let mut metadata = self.metadata.clone();
        for (key, value) in &config.metadata {
            metadata.set(key.clone(), Value::from(value.clone())).map_err(|e| {
                ConfigError::Validation(format!("global metadata: {e}"))
            })?;
        }
        let mut staged: Vec<Pipeline> = Vec::with_capacity(config.pipelines.len());
        for declared in &config.pipelines {
            let name = match &declared.name {
                Some(name) => name.clone(),
                None => format!("Pipeline {}", self.pipelines.len() + staged.len() + 1),
            };
            if self.pipelines.get(&name).is_some() || staged.iter().any(|p| p.name() == name) {
                return Err(EngineError::DuplicatePipeline(name));
            }
            let mut pipeline = Pipeline::new(name);
            for module in &declared.modules {
                pipeline.add_boxed(registry::build(module)?);
            }
            staged.push(pipeline);
        }

        self.metadata = metadata;
        if config.strict {
            self.add_trace_listener(Arc::new(StrictListener::new()));
        }
        for pipeline in staged {
            self.pipelines.add(pipeline)?;
        }
        self.configured = true;
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Global metadata, visible at the root of every document's chain.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn pipelines(&self) -> &PipelineCollection {
        &self.pipelines
    }

    pub fn pipelines_mut(&mut self) -> &mut PipelineCollection {
        &mut self.pipelines
    }

    pub fn file_system(&self) -> &dyn FileSystem {
        self.file_system.as_ref()
    }

    pub fn add_trace_listener(&mut self, listener: Arc<dyn TraceListener>) {
        self.tracer.add_listener(listener);
    }

    /// Documents produced by the last run, keyed by pipeline.
    pub fn documents(&self) -> &DocumentCollection {
        &self.documents
    }

    /// Run every pipeline once, in declaration order.
    pub fn run(&mut self) -> Result<(), EngineError> {
        let started = Instant::now();
        for pipeline in self.pipelines.iter_mut() {
            pipeline.reset();
        }
        self.documents.clear();
        self.claims.clear();

        tracing::info!(pipelines = self.pipelines.len(), "engine.start");

        let Engine {
            metadata,
            pipelines,
            file_system,
            tracer,
            documents,
            claims,
            ..
        } = self;

        for pipeline in pipelines.iter_mut() {
            let pipeline_started = Instant::now();
            tracing::info!(pipeline = pipeline.name(), modules = pipeline.len(), "pipeline.start");

            let env = Environment {
                metadata: &*metadata,
                file_system: &**file_system,
                tracer: &*tracer,
                documents: &*documents,
                claims: &*claims,
            };
            pipeline
                .execute(env)
                .map_err(|source| EngineError::Pipeline {
                    name: pipeline.name().to_string(),
                    source,
                })?;

            tracing::info!(
                pipeline = pipeline.name(),
                documents = pipeline.outputs().len(),
                invocations = pipeline.tree().len(),
                elapsed_ms = pipeline_started.elapsed().as_millis() as u64,
                "pipeline.finish"
            );
            documents.insert(pipeline.name(), pipeline.outputs().to_vec());
        }

        tracing::info!(
            documents = documents.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "engine.finish"
        );
        Ok(())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
