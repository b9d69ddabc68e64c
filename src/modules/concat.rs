//! Branching containers: run inner modules beside the main flow.

use crate::context::ExecutionContext;
use crate::document::Document;
use crate::module::{Module, Outputs, outputs};

/// Outputs the inputs followed by the inner modules' results over them.
pub struct Concat {
    modules: Vec<Box<dyn Module>>,
}

impl Concat {
    pub fn new(modules: Vec<Box<dyn Module>>) -> Self {
        Self { modules }
    }
}

impl Module for Concat {
    fn name(&self) -> &str {
        "Concat"
    }

    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        outputs(context.execute(&self.modules, inputs).map(|results| {
            inputs.iter().cloned().chain(results).collect()
        }))
    }
}

/// Runs the inner modules for their side effects and outputs the inputs.
pub struct Branch {
    modules: Vec<Box<dyn Module>>,
}

impl Branch {
    pub fn new(modules: Vec<Box<dyn Module>>) -> Self {
        Self { modules }
    }
}

impl Module for Branch {
    fn name(&self) -> &str {
        "Branch"
    }

    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        outputs(context.execute(&self.modules, inputs).map(|_| inputs.to_vec()))
    }
}

type Predicate = Box<dyn Fn(&Document, &ExecutionContext<'_>) -> bool + Send + Sync>;

/// Like [`Concat`], but only inputs matching the predicate enter the branch.
///
/// Every input is output unchanged; the branch results follow.
pub struct BranchConcat {
    modules: Vec<Box<dyn Module>>,
    predicate: Option<Predicate>,
}

impl BranchConcat {
    pub fn new(modules: Vec<Box<dyn Module>>) -> Self {
        Self {
            modules,
            predicate: None,
        }
    }

    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Document, &ExecutionContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Branch only the documents whose `key` metadata is truthy.
    pub fn when_key(self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.when(move |doc: &Document, _: &ExecutionContext<'_>| {
            doc.get(&key).is_some_and(|v| v.is_truthy())
        })
    }
}

impl Module for BranchConcat {
    fn name(&self) -> &str {
        "BranchConcat"
    }

    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        let selected: Vec<Document> = match &self.predicate {
            Some(predicate) => inputs
                .iter()
                .filter(|doc| predicate(doc, context))
                .cloned()
                .collect(),
            None => inputs.to_vec(),
        };
        outputs(context.execute(&self.modules, &selected).map(|results| {
            inputs.iter().cloned().chain(results).collect()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::{Execute, Meta};
    use crate::test_helpers::*;
    use std::sync::atomic::Ordering;

    fn numbered() -> Execute<impl Fn(&Document, &ExecutionContext<'_>) -> Vec<Document> + Send + Sync>
    {
        Execute::new(|doc: &Document, _: &ExecutionContext<'_>| {
            (1..=3)
                .map(|i| doc.clone_with_content(i.to_string(), [("n", i)]))
                .collect::<Vec<_>>()
        })
    }

    #[test]
    fn concat_appends_inner_results_to_inputs() {
        let docs = run_modules(crate::modules![
            numbered(),
            Concat::new(crate::modules![Meta::new("copy", true)]),
        ]);

        assert_eq!(contents(&docs), vec!["1", "2", "3", "1", "2", "3"]);
        assert!(docs[..3].iter().all(|d| d.get("copy").is_none()));
        assert!(docs[3..].iter().all(|d| d.get("copy").is_some()));
    }

    #[test]
    fn branch_discards_inner_results() {
        let inner = CountModule::new("Inner");
        let stats = inner.stats();
        let docs = run_modules(crate::modules![numbered(), Branch::new(crate::modules![inner])]);

        assert_eq!(contents(&docs), vec!["1", "2", "3"]);
        assert_eq!(stats.executions.load(Ordering::SeqCst), 1);
        assert_eq!(stats.inputs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn branch_concat_filters_branch_input_only() {
        let recorder = InputRecorder::new();
        let batches = recorder.batches();
        let docs = run_modules(crate::modules![
            numbered(),
            BranchConcat::new(crate::modules![recorder, Meta::new("branched", true)])
                .when(|doc: &Document, _: &ExecutionContext<'_>| {
                    doc.get_as::<i64>("n").is_ok_and(|n| n != 2)
                }),
        ]);

        let batches = batches.lock().unwrap();
        assert_eq!(contents(&batches[0]), vec!["1", "3"]);
        assert_eq!(contents(&docs), vec!["1", "2", "3", "1", "3"]);
        assert!(docs[1].get("branched").is_none());
    }

    #[test]
    fn branch_concat_keeps_identity_of_unmatched_inputs() {
        let before = InputRecorder::new();
        let seen = before.batches();
        let docs = run_modules(crate::modules![
            numbered(),
            before,
            BranchConcat::new(crate::modules![Meta::new("x", 1)]).when_key("missing"),
        ]);

        let originals = seen.lock().unwrap()[0].clone();
        assert_eq!(docs, originals);
    }
}
