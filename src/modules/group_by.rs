//! Grouping documents by a metadata value.

use crate::context::ExecutionContext;
use crate::document::{Content, Document};
use crate::keys;
use crate::module::{Module, Outputs, outputs};
use crate::modules::{Selector, key_selector};
use crate::value::Value;

/// Groups the inner modules' results by a key.
///
/// Emits one new document per distinct key, in order of first appearance,
/// with the key under [`keys::GROUP_KEY`] and the members under
/// [`keys::GROUP_DOCUMENTS`]. Keys compare by value. Documents whose key is
/// `Null` belong to no group.
pub struct GroupBy {
    key: Selector,
    modules: Vec<Box<dyn Module>>,
}

impl GroupBy {
    pub fn new<F>(key: F, modules: Vec<Box<dyn Module>>) -> Self
    where
        F: Fn(&Document, &ExecutionContext<'_>) -> Value + Send + Sync + 'static,
    {
        Self {
            key: Box::new(key),
            modules,
        }
    }

    /// Group by the value of a metadata key.
    pub fn by_key(key: impl Into<String>, modules: Vec<Box<dyn Module>>) -> Self {
        Self {
            key: key_selector(key),
            modules,
        }
    }
}

impl Module for GroupBy {
    fn name(&self) -> &str {
        "GroupBy"
    }

    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        outputs(context.execute(&self.modules, inputs).map(|results| {
            let mut groups: Vec<(Value, Vec<Document>)> = Vec::new();
            for doc in results {
                let key = (self.key)(&doc, context);
                if key.is_null() {
                    continue;
                }
                match groups.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, members)) => members.push(doc),
                    None => groups.push((key, vec![doc])),
                }
            }
            groups
                .into_iter()
                .map(|(key, members)| {
                    context.new_document(
                        format!("group:{key}"),
                        Content::Empty,
                        [
                            (keys::GROUP_KEY, key),
                            (keys::GROUP_DOCUMENTS, Value::from(members)),
                        ],
                    )
                })
                .collect()
        }))
    }
}
