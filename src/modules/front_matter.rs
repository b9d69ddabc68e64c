//! Front matter extraction.
//!
//! A delimiter line is one or more repetitions of the delimiter, optionally
//! followed by whitespace, and nothing else. Leading whitespace disqualifies
//! a line. Everything before the first delimiter line is front matter;
//! everything after it is the body:
//!
//! ```text
//! title: Hello        ┐
//! tags: [a, b]        ┘ front matter → inner modules (e.g. Yaml)
//! ---                   delimiter
//! Body text...          body → document content
//! ```
//!
//! With `ignore_delimiter_on_first_line` (the default) a delimiter on the
//! very first line opens the block instead of closing it, so Jekyll-style
//! `---` fences work too.

use crate::context::ExecutionContext;
use crate::document::Document;
use crate::module::{ExecutionError, Module, Outputs};

pub struct FrontMatter {
    delimiter: String,
    ignore_delimiter_on_first_line: bool,
    modules: Vec<Box<dyn Module>>,
}

impl FrontMatter {
    /// Front matter closed by a line of dashes.
    pub fn new(modules: Vec<Box<dyn Module>>) -> Self {
        Self::with_delimiter("-", modules)
    }

    /// An empty delimiter never matches.
    pub fn with_delimiter(delimiter: impl Into<String>, modules: Vec<Box<dyn Module>>) -> Self {
        Self {
            delimiter: delimiter.into(),
            ignore_delimiter_on_first_line: true,
            modules,
        }
    }

    pub fn ignore_delimiter_on_first_line(mut self, ignore: bool) -> Self {
        self.ignore_delimiter_on_first_line = ignore;
        self
    }

    fn is_delimiter(&self, line: &str) -> bool {
        let delimiter = self.delimiter.as_bytes();
        let line = line.trim_end().as_bytes();
        !delimiter.is_empty()
            && !line.is_empty()
            && line.len() % delimiter.len() == 0
            && line.chunks(delimiter.len()).all(|chunk| chunk == delimiter)
    }

    /// Split `text` into `(front matter, body)` if it has a delimiter line.
    fn split(&self, text: &str) -> Option<(String, String)> {
        let lines: Vec<&str> = text.split('\n').collect();
        let start = match lines.first() {
            Some(first) if self.ignore_delimiter_on_first_line && self.is_delimiter(first) => 1,
            _ => 0,
        };
        let end = (start..lines.len()).find(|&i| self.is_delimiter(lines[i]))?;
        let mut front = lines[start..end].join("\n");
        front.push('\n');
        let body = lines[end + 1..].join("\n");
        Some((front, body))
    }

    fn process(
        &self,
        input: &Document,
        context: &ExecutionContext<'_>,
    ) -> Result<Vec<Document>, ExecutionError> {
        let text = input.content_text()?;
        let Some((front, body)) = self.split(&text) else {
            return Ok(vec![input.clone()]);
        };
        let front_doc = input.derive().content(front).build();
        let results = context.execute(&self.modules, &[front_doc])?;
        Ok(results
            .iter()
            .map(|result| result.derive().content(body.as_str()).build())
            .collect())
    }
}

impl Module for FrontMatter {
    fn name(&self) -> &str {
        "FrontMatter"
    }

    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        Box::new(inputs.iter().flat_map(move |input| {
            match self.process(input, context) {
                Ok(docs) => docs.into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(e)],
            }
        }))
    }
}
