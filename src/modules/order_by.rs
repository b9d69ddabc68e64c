//! Stable sorting by metadata keys.

use crate::context::ExecutionContext;
use crate::document::Document;
use crate::module::{Module, Outputs, emit};
use crate::modules::{Selector, key_selector};
use crate::value::Value;
use std::cmp::Ordering;

struct SortKey {
    selector: Selector,
    descending: bool,
}

/// Stable sort of the inputs by one or more keys.
///
/// Keys compare with [`Value::compare`]; ties keep their input order, so
/// sorting is deterministic for pagination downstream.
pub struct OrderBy {
    keys: Vec<SortKey>,
}

impl OrderBy {
    pub fn new<F>(key: F) -> Self
    where
        F: Fn(&Document, &ExecutionContext<'_>) -> Value + Send + Sync + 'static,
    {
        Self {
            keys: vec![SortKey {
                selector: Box::new(key),
                descending: false,
            }],
        }
    }

    pub fn by_key(key: impl Into<String>) -> Self {
        Self {
            keys: vec![SortKey {
                selector: key_selector(key),
                descending: false,
            }],
        }
    }

    /// Reverse the most recently added key.
    pub fn descending(mut self) -> Self {
        if let Some(last) = self.keys.last_mut() {
            last.descending = true;
        }
        self
    }

    /// Break ties with another key.
    pub fn then_by<F>(mut self, key: F) -> Self
    where
        F: Fn(&Document, &ExecutionContext<'_>) -> Value + Send + Sync + 'static,
    {
        self.keys.push(SortKey {
            selector: Box::new(key),
            descending: false,
        });
        self
    }

    pub fn then_by_key(mut self, key: impl Into<String>) -> Self {
        self.keys.push(SortKey {
            selector: key_selector(key),
            descending: false,
        });
        self
    }
}

impl Module for OrderBy {
    fn name(&self) -> &str {
        "OrderBy"
    }

    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        let mut keyed: Vec<(Vec<Value>, &Document)> = inputs
            .iter()
            .map(|doc| {
                let values = self.keys.iter().map(|k| (k.selector)(doc, context)).collect();
                (values, doc)
            })
            .collect();

        keyed.sort_by(|(a, _), (b, _)| {
            for (key, (x, y)) in self.keys.iter().zip(a.iter().zip(b)) {
                let ord = x.compare(y);
                let ord = if key.descending { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        emit(keyed.into_iter().map(|(_, doc)| doc.clone()).collect::<Vec<_>>())
    }
}
