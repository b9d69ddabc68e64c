//! Ad-hoc per-document transforms.

use crate::context::ExecutionContext;
use crate::document::Document;
use crate::module::{ExecutionError, Module, Outputs};

/// What an [`Execute`] closure may return for one input.
///
/// `None` and `()` drop the document; `Err` fails the module.
pub trait IntoDocuments {
    fn into_documents(self) -> Result<Vec<Document>, ExecutionError>;
}

impl IntoDocuments for Document {
    fn into_documents(self) -> Result<Vec<Document>, ExecutionError> {
        Ok(vec![self])
    }
}

impl IntoDocuments for Vec<Document> {
    fn into_documents(self) -> Result<Vec<Document>, ExecutionError> {
        Ok(self)
    }
}

impl IntoDocuments for () {
    fn into_documents(self) -> Result<Vec<Document>, ExecutionError> {
        Ok(Vec::new())
    }
}

impl<T: IntoDocuments> IntoDocuments for Option<T> {
    fn into_documents(self) -> Result<Vec<Document>, ExecutionError> {
        match self {
            Some(inner) => inner.into_documents(),
            None => Ok(Vec::new()),
        }
    }
}

impl<T, E> IntoDocuments for Result<T, E>
where
    T: IntoDocuments,
    E: Into<ExecutionError>,
{
    fn into_documents(self) -> Result<Vec<Document>, ExecutionError> {
        self.map_err(Into::into)?.into_documents()
    }
}

/// Calls a closure on each input, lazily, and outputs what it returns.
pub struct Execute<F> {
    f: F,
}

impl<F> Execute<F> {
    pub fn new<R>(f: F) -> Self
    where
        F: Fn(&Document, &ExecutionContext<'_>) -> R + Send + Sync,
        R: IntoDocuments,
    {
        Self { f }
    }
}

impl<F, R> Module for Execute<F>
where
    F: Fn(&Document, &ExecutionContext<'_>) -> R + Send + Sync,
    R: IntoDocuments,
{
    fn name(&self) -> &str {
        "Execute"
    }

    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        Box::new(inputs.iter().flat_map(move |input| {
            match (self.f)(input, context).into_documents() {
                Ok(docs) => docs.into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(e)],
            }
        }))
    }
}
