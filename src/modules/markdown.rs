//! Markdown to HTML with pulldown-cmark.

use crate::context::ExecutionContext;
use crate::document::Document;
use crate::module::{ExecutionError, Module, Outputs};
use pulldown_cmark::{Options, Parser, html};
use rayon::prelude::*;

/// Renders Markdown content to HTML.
///
/// Documents are rendered on the rayon pool; output order matches input order.
#[derive(Debug, Clone)]
pub struct Markdown {
    options: Options,
}

impl Markdown {
    pub fn new() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_FOOTNOTES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS,
        }
    }

    fn render(&self, input: &Document) -> Result<Document, ExecutionError> {
        let text = input.content_text()?;
        let mut out = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut out, Parser::new_ext(&text, self.options));
        Ok(input.derive().content(out).build())
    }
}

impl Default for Markdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for Markdown {
    fn name(&self) -> &str {
        "Markdown"
    }

    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        _context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        let rendered: Vec<Result<Document, ExecutionError>> =
            inputs.par_iter().map(|input| self.render(input)).collect();
        Box::new(rendered.into_iter())
    }
}
