//! Text substitution in document content.

use crate::context::ExecutionContext;
use crate::document::Document;
use crate::module::{ExecutionError, Module, Outputs};
use regex::Regex;

enum Pattern {
    Literal(String),
    Regex(Regex),
}

/// Replaces text in each document's content.
pub struct Replace {
    pattern: Pattern,
    replacement: String,
}

impl Replace {
    /// Replace every occurrence of `search`.
    pub fn new(search: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: Pattern::Literal(search.into()),
            replacement: replacement.into(),
        }
    }

    /// Replace every match of the regex `search`; `$1`-style captures expand.
    pub fn regex(search: &str, replacement: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Pattern::Regex(Regex::new(search)?),
            replacement: replacement.into(),
        })
    }

    fn apply(&self, input: &Document) -> Result<Document, ExecutionError> {
        let text = input.content_text()?;
        let replaced = match &self.pattern {
            Pattern::Literal(search) if search.is_empty() => return Ok(input.clone()),
            Pattern::Literal(search) => text.replace(search.as_str(), &self.replacement),
            Pattern::Regex(regex) => regex.replace_all(&text, self.replacement.as_str()).into_owned(),
        };
        Ok(input.derive().content(replaced).build())
    }
}

impl Module for Replace {
    fn name(&self) -> &str {
        "Replace"
    }

    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        _context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        Box::new(inputs.iter().map(move |input| self.apply(input)))
    }
}

/// Wraps each input in the inner modules' results.
///
/// For each input the inner modules run on that input alone; every result
/// yields one clone of the input whose content is the result's content with
/// `search` replaced by the input's content. With a layout module inside,
/// this places page bodies into a template.
pub struct ReplaceIn {
    search: String,
    modules: Vec<Box<dyn Module>>,
}

impl ReplaceIn {
    pub fn new(search: impl Into<String>, modules: Vec<Box<dyn Module>>) -> Self {
        Self {
            search: search.into(),
            modules,
        }
    }

    fn wrap(
        &self,
        input: &Document,
        context: &ExecutionContext<'_>,
    ) -> Result<Vec<Document>, ExecutionError> {
        let body = input.content_text()?;
        context
            .execute(&self.modules, std::slice::from_ref(input))?
            .iter()
            .map(|result| {
                let template = result.content_text()?;
                Ok(input
                    .derive()
                    .content(template.replace(self.search.as_str(), &body))
                    .build())
            })
            .collect()
    }
}

impl Module for ReplaceIn {
    fn name(&self) -> &str {
        "ReplaceIn"
    }

    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        Box::new(inputs.iter().flat_map(move |input| {
            match self.wrap(input, context) {
                Ok(docs) => docs.into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(e)],
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::Execute;
    use crate::test_helpers::*;

    #[test]
    fn literal_replacement() {
        let out = Replace::new("world", "there")
            .apply(&doc("hello world, world", [("a", 1)]))
            .unwrap();
        assert_eq!(out.content_text().unwrap(), "hello there, there");
        assert_eq!(out.get_as::<i64>("a"), Ok(1));
    }

    #[test]
    fn regex_replacement_expands_captures() {
        let out = Replace::regex(r"(\d+)-(\d+)", "$2-$1")
            .unwrap()
            .apply(&doc("12-34 and 5-6", Vec::<(String, i64)>::new()))
            .unwrap();
        assert_eq!(out.content_text().unwrap(), "34-12 and 6-5");
    }

    #[test]
    fn invalid_regex_is_rejected() {
        assert!(Replace::regex("(", "x").is_err());
    }

    #[test]
    fn replace_in_wraps_each_input() {
        let docs = run_modules(crate::modules![
            Execute::new(|doc: &Document, _: &ExecutionContext<'_>| {
                vec![
                    doc.clone_with_content("one", [("title", "One")]),
                    doc.clone_with_content("two", [("title", "Two")]),
                ]
            }),
            ReplaceIn::new(
                "{{content}}",
                crate::modules![Execute::new(|doc: &Document, _: &ExecutionContext<'_>| {
                    let title = doc.string("title").unwrap_or_default();
                    doc.clone_with_content(
                        format!("<h1>{title}</h1>{{{{content}}}}"),
                        Vec::<(String, i64)>::new(),
                    )
                })],
            ),
        ]);
        assert_eq!(
            contents(&docs),
            vec!["<h1>One</h1>one", "<h1>Two</h1>two"]
        );
        assert_eq!(docs[1].string("title").as_deref(), Some("Two"));
    }
}
