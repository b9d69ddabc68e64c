//! Shared test utilities for the folio test suite.
//!
//! Provides counting and recording modules, engine builders, and extractors
//! for the content and metadata of result documents.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let a = CountModule::new("A").with_additional_outputs(1);
//! let stats = a.stats();
//! let docs = run_modules(vec![Box::new(a)]);
//!
//! assert_eq!(stats.executions.load(Ordering::SeqCst), 1);
//! assert_eq!(contents(&docs), vec!["1", "2"]);
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::context::ExecutionContext;
use crate::document::{Content, Document};
use crate::engine::Engine;
use crate::fs::PhysicalFileSystem;
use crate::metadata::Metadata;
use crate::module::{Module, Outputs, emit};
use crate::value::{FromValue, Value};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
pub fn setup_site() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Engines
// =========================================================================

/// An unconfigured engine whose file system points at paths nobody reads.
pub fn test_engine() -> Engine {
    Engine::with_file_system(PhysicalFileSystem::new(".", "input", "output"))
}

/// An engine over the site at `root` (`input/` and `output/` below it).
pub fn site_engine(root: &Path) -> Engine {
    Engine::with_file_system(PhysicalFileSystem::new(root, "input", "output"))
}

/// Run `modules` as the only pipeline of a fresh engine and return its outputs.
pub fn run_modules(modules: Vec<Box<dyn Module>>) -> Vec<Document> {
    let mut engine = test_engine();
    run_in(&mut engine, modules)
}

/// Add `modules` as a pipeline named `test` to `engine`, run it, return its outputs.
pub fn run_in(engine: &mut Engine, modules: Vec<Box<dyn Module>>) -> Vec<Document> {
    let pipeline = engine.pipelines_mut().create(Some("test")).unwrap();
    for module in modules {
        pipeline.add_boxed(module);
    }
    engine.run().unwrap();
    engine.documents().get("test").unwrap().to_vec()
}

/// A standalone document with text content and metadata.
pub fn doc<I, K, V>(content: &str, metadata: I) -> Document
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    Document::new("test", Content::from(content), Metadata::from_pairs(metadata))
}

// =========================================================================
// Extractors
// =========================================================================

pub fn contents(docs: &[Document]) -> Vec<String> {
    docs.iter().map(|d| d.content_text().unwrap()).collect()
}

/// `key` from every document, converted to `T`; panics on a miss.
pub fn meta_values<T: FromValue>(docs: &[Document], key: &str) -> Vec<T> {
    docs.iter()
        .map(|d| {
            d.get_as(key)
                .unwrap_or_else(|e| panic!("{key} on {}: {e}", d.source()))
        })
        .collect()
}

// =========================================================================
// Counting module
// =========================================================================

#[derive(Debug, Default)]
pub struct CountStats {
    pub executions: AtomicUsize,
    pub inputs: AtomicUsize,
    pub outputs: AtomicUsize,
}

/// Emits `1 + additional_outputs` clones per input, each holding the next
/// value of a shared counter as content and under the module's name.
pub struct CountModule {
    name: String,
    additional_outputs: usize,
    value: Arc<AtomicI64>,
    stats: Arc<CountStats>,
}

impl CountModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            additional_outputs: 0,
            value: Arc::new(AtomicI64::new(0)),
            stats: Arc::new(CountStats::default()),
        }
    }

    pub fn with_additional_outputs(mut self, additional: usize) -> Self {
        self.additional_outputs = additional;
        self
    }

    pub fn stats(&self) -> Arc<CountStats> {
        Arc::clone(&self.stats)
    }
}

impl Module for CountModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        _context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        self.stats.executions.fetch_add(1, Ordering::SeqCst);
        self.stats.inputs.fetch_add(inputs.len(), Ordering::SeqCst);
        let mut outputs = Vec::new();
        for input in inputs {
            for _ in 0..=self.additional_outputs {
                let value = self.value.fetch_add(1, Ordering::SeqCst) + 1;
                outputs.push(input.clone_with_content(
                    value.to_string(),
                    [(self.name.as_str(), value)],
                ));
            }
        }
        self.stats.outputs.fetch_add(outputs.len(), Ordering::SeqCst);
        emit(outputs)
    }
}

// =========================================================================
// Recording modules
// =========================================================================

/// Records the persisted object of every context it runs in and passes its
/// inputs through unchanged.
pub struct PersistedRecorder {
    seen: Arc<Mutex<Vec<Option<Value>>>>,
}

impl PersistedRecorder {
    pub fn new() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn seen(&self) -> Arc<Mutex<Vec<Option<Value>>>> {
        Arc::clone(&self.seen)
    }
}

impl Module for PersistedRecorder {
    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        self.seen
            .lock()
            .unwrap()
            .push(context.persisted_object().cloned());
        emit(inputs.to_vec())
    }
}

/// Records every batch of inputs it receives and passes them through.
pub struct InputRecorder {
    batches: Arc<Mutex<Vec<Vec<Document>>>>,
}

impl InputRecorder {
    pub fn new() -> Self {
        Self {
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn batches(&self) -> Arc<Mutex<Vec<Vec<Document>>>> {
        Arc::clone(&self.batches)
    }
}

impl Module for InputRecorder {
    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        _context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        self.batches.lock().unwrap().push(inputs.to_vec());
        emit(inputs.to_vec())
    }
}
