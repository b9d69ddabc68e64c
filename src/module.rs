//! The module contract.
//!
//! A [`Module`] turns an ordered list of input documents into a lazy stream
//! of output documents. The stream may be empty (a filter), longer than the
//! input (fan-out), or reordered (sorting). The scheduler drains the stream
//! completely before the next stage starts, so side effects inside the
//! iterator (tracing, counters) are only guaranteed to have happened once
//! the stage boundary is crossed.
//!
//! Modules hold configuration set at construction and nothing else. State
//! that belongs to a branch of the run travels in the
//! [`ExecutionContext`](crate::context::ExecutionContext) as its persisted
//! object.
//!
//! Failures are items of the stream: a module yields `Err` and the pipeline
//! aborts at that point. The scheduler wraps the error with the module name
//! so a nested failure reads as a path (`FrontMatter: Yaml: ...`).

use crate::context::ExecutionContext;
use crate::document::{ContentError, Document};
use crate::fs::FsError;
use crate::metadata::MetadataError;
use crate::trace::TraceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("{module}: {source}")]
    Module {
        module: String,
        #[source]
        source: Box<ExecutionError>,
    },
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    FileSystem(#[from] FsError),
    #[error(transparent)]
    Trace(#[from] TraceError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
    #[error("unknown or not yet executed pipeline: {0}")]
    UnknownPipeline(String),
    #[error("{0}")]
    Failed(String),
}

impl ExecutionError {
    /// Attribute this error to `module`.
    pub fn in_module(self, module: &str) -> Self {
        ExecutionError::Module {
            module: module.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, past any module attribution.
    pub fn root_cause(&self) -> &ExecutionError {
        match self {
            ExecutionError::Module { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Lazy output of one module invocation.
pub type Outputs<'a> = Box<dyn Iterator<Item = Result<Document, ExecutionError>> + 'a>;

/// A document transformation stage.
pub trait Module: Send + Sync {
    /// Name used in logs, errors and the execution tree.
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a>;
}

/// Stream an already-known set of documents.
pub fn emit<'a, I>(documents: I) -> Outputs<'a>
where
    I: IntoIterator<Item = Document>,
    I::IntoIter: 'a,
{
    Box::new(documents.into_iter().map(Ok))
}

/// A stream holding a single error.
pub fn fail<'a>(error: impl Into<ExecutionError>) -> Outputs<'a> {
    Box::new(std::iter::once(Err(error.into())))
}

/// Stream the result of an eager computation.
pub fn outputs<'a>(result: Result<Vec<Document>, ExecutionError>) -> Outputs<'a> {
    match result {
        Ok(documents) => emit(documents),
        Err(e) => fail(e),
    }
}
