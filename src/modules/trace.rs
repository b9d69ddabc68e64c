//! Trace messages per document.

use crate::context::ExecutionContext;
use crate::document::Document;
use crate::module::{ExecutionError, Module, Outputs};

/// Traces one informational line per document and passes documents through.
#[derive(Debug, Clone)]
pub struct Trace {
    message: String,
}

impl Trace {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Module for Trace {
    fn name(&self) -> &str {
        "Trace"
    }

    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        Box::new(inputs.iter().map(move |input| -> Result<Document, ExecutionError> {
            let line = if input.source().is_empty() {
                self.message.clone()
            } else {
                format!("{}: {}", self.message, input.source())
            };
            context.trace().info(&line)?;
            Ok(input.clone())
        }))
    }
}
