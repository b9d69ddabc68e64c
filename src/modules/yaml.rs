//! YAML content into metadata.

use crate::context::ExecutionContext;
use crate::document::Document;
use crate::module::{ExecutionError, Module, Outputs};
use crate::value::Value;

/// Parses content as YAML into metadata.
///
/// Without a key the document must be a mapping, and each entry becomes a
/// metadata key. With a key the whole parsed value is stored under it.
/// Blank content passes through untouched.
#[derive(Debug, Clone, Default)]
pub struct Yaml {
    key: Option<String>,
}

impl Yaml {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
        }
    }

    fn process(&self, input: &Document) -> Result<Document, ExecutionError> {
        let text = input.content_text()?;
        if text.trim().is_empty() {
            return Ok(input.clone());
        }
        let parsed: serde_yaml::Value = serde_yaml::from_str(&text)?;
        let value = Value::from(parsed);
        match (&self.key, value) {
            (Some(key), value) => Ok(input.clone_with([(key.as_str(), value)])),
            (None, Value::Map(map)) => Ok(input.clone_with(map)),
            (None, Value::Null) => Ok(input.clone()),
            (None, other) => Err(ExecutionError::Failed(format!(
                "YAML in {} is a {}, not a mapping; set a key to store it",
                input.source(),
                other.type_name()
            ))),
        }
    }
}

impl Module for Yaml {
    fn name(&self) -> &str {
        "Yaml"
    }

    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        _context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        Box::new(inputs.iter().map(move |input| self.process(input)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn parse(yaml: Yaml, content: &str) -> Result<Document, ExecutionError> {
        yaml.process(&doc(content, [("existing", "kept")]))
    }

    #[test]
    fn mapping_entries_become_keys() {
        let out = parse(Yaml::new(), "title: Hello\ncount: 3\ntags: [a, b]\n").unwrap();
        assert_eq!(out.string("title").as_deref(), Some("Hello"));
        assert_eq!(out.get_as::<i64>("count"), Ok(3));
        assert_eq!(out.get_as::<Vec<String>>("tags"), Ok(vec!["a".into(), "b".into()]));
        assert_eq!(out.string("existing").as_deref(), Some("kept"));
    }

    #[test]
    fn keyed_yaml_stores_whole_value() {
        let out = parse(Yaml::with_key("items"), "- one\n- two\n").unwrap();
        assert_eq!(
            out.get_as::<Vec<String>>("items"),
            Ok(vec!["one".into(), "two".into()])
        );
    }

    #[test]
    fn blank_content_passes_through() {
        let input = doc("  \n", [("a", 1)]);
        let out = Yaml::new().process(&input).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn scalar_without_key_is_an_error() {
        assert!(matches!(
            parse(Yaml::new(), "just text"),
            Err(ExecutionError::Failed(_))
        ));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(matches!(
            parse(Yaml::new(), "a: [unclosed"),
            Err(ExecutionError::Yaml(_))
        ));
    }
}
