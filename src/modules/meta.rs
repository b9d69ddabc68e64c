//! Setting a single metadata key.

use crate::context::ExecutionContext;
use crate::document::Document;
use crate::module::{Module, Outputs};
use crate::modules::Selector;
use crate::value::Value;

enum MetaValue {
    Constant(Value),
    Computed(Selector),
}

/// Clones each input with one metadata key set.
pub struct Meta {
    key: String,
    value: MetaValue,
}

impl Meta {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: MetaValue::Constant(value.into()),
        }
    }

    /// Compute the value per document.
    pub fn computed<F>(key: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Document, &ExecutionContext<'_>) -> Value + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            value: MetaValue::Computed(Box::new(f)),
        }
    }
}

impl Module for Meta {
    fn name(&self) -> &str {
        "Meta"
    }

    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        Box::new(inputs.iter().map(move |input| {
            let value = match &self.value {
                MetaValue::Constant(value) => value.clone(),
                MetaValue::Computed(f) => f(input, context),
            };
            Ok(input.clone_with([(self.key.as_str(), value)]))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    #[test]
    fn constant_value_is_set_on_every_document() {
        let docs = run_modules(crate::modules![
            CountModule::new("A").with_additional_outputs(2),
            Meta::new("layout", "post"),
        ]);
        assert_eq!(meta_values::<String>(&docs, "layout"), vec!["post"; 3]);
    }

    #[test]
    fn computed_value_sees_the_document() {
        let docs = run_modules(crate::modules![
            CountModule::new("A").with_additional_outputs(2),
            Meta::computed("double", |doc: &Document, _: &ExecutionContext<'_>| {
                Value::from(doc.get_as::<i64>("A").unwrap_or(0) * 2)
            }),
        ]);
        assert_eq!(meta_values::<i64>(&docs, "double"), vec![2, 4, 6]);
    }

    #[test]
    fn override_shadows_without_touching_the_input() {
        let input = doc("x", [("layout", "page")]);
        let docs = run_modules(crate::modules![
            crate::modules::Execute::new(move |_: &Document, _: &ExecutionContext<'_>| input.clone()),
            Meta::new("layout", "post"),
        ]);
        assert_eq!(docs[0].string("layout").as_deref(), Some("post"));
        assert_eq!(docs[0].parent().and_then(|p| p.string("layout")).as_deref(), Some("page"));
    }
}
