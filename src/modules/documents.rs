//! Access to the documents of earlier pipelines.

use crate::context::ExecutionContext;
use crate::document::Document;
use crate::module::{ExecutionError, Module, Outputs, emit, fail};

/// Outputs the final documents of pipelines that already ran.
///
/// Inputs are ignored. Naming a pipeline that does not exist, or has not run
/// yet in this run, is an error.
#[derive(Debug, Clone, Default)]
pub struct Documents {
    pipeline: Option<String>,
}

impl Documents {
    /// Documents of every earlier pipeline, in pipeline order.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_pipeline(name: impl Into<String>) -> Self {
        Self {
            pipeline: Some(name.into()),
        }
    }
}

impl Module for Documents {
    fn name(&self) -> &str {
        "Documents"
    }

    fn execute<'a>(
        &'a self,
        _inputs: &'a [Document],
        context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        let collection = context.documents();
        match &self.pipeline {
            None => emit(collection.all().cloned().collect::<Vec<_>>()),
            Some(name) => match collection.get(name) {
                Some(docs) => emit(docs.to_vec()),
                None => fail(ExecutionError::UnknownPipeline(name.clone())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    #[test]
    fn all_collects_every_earlier_pipeline() {
        let mut engine = test_engine();
        engine
            .pipelines_mut()
            .create(Some("a"))
            .unwrap()
            .add(CountModule::new("A").with_additional_outputs(1));
        engine
            .pipelines_mut()
            .create(Some("b"))
            .unwrap()
            .add(CountModule::new("B"));
        let docs = run_in(&mut engine, crate::modules![Documents::all()]);

        assert_eq!(contents(&docs), vec!["1", "2", "1"]);
    }

    #[test]
    fn later_pipeline_is_not_visible() {
        let mut engine = test_engine();
        engine
            .pipelines_mut()
            .create(Some("early"))
            .unwrap()
            .add(Documents::from_pipeline("late"));
        engine.pipelines_mut().create(Some("late")).unwrap();

        let err = engine.run().unwrap_err();
        assert!(matches!(
            err,
            crate::engine::EngineError::Pipeline { source, .. }
                if matches!(source.root_cause(), ExecutionError::UnknownPipeline(name) if name == "late")
        ));
    }
}
