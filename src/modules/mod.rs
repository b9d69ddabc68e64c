//! Built-in modules.
//!
//! | Module | Inputs → outputs |
//! |--------|------------------|
//! | [`Concat`] | inputs, then the inner modules' results |
//! | [`Branch`] | inputs; inner results are discarded |
//! | [`BranchConcat`] | inputs, then inner results for the inputs matching a predicate |
//! | [`Execute`] | whatever a closure returns per input (`None` drops it) |
//! | [`GroupBy`] | one document per distinct key over the inner results |
//! | [`OrderBy`] | inputs, stably sorted |
//! | [`Paginate`] | one document per page of the inner results |
//! | [`FrontMatter`] | inputs with front matter stripped, after the inner modules processed it |
//! | [`Yaml`] | inputs with YAML content merged into metadata |
//! | [`Markdown`] | inputs with content rendered to HTML |
//! | [`Replace`] | inputs with content substituted |
//! | [`ReplaceIn`] | inputs wrapped in the inner results (layouts) |
//! | [`Meta`] | inputs with one metadata key set |
//! | [`Documents`] | final documents of earlier pipelines |
//! | [`Trace`] | inputs, unchanged, after tracing each |
//! | [`ReadFiles`] | one document per matching input file |
//! | [`WriteFiles`] | inputs, written to the output directory |
//!
//! Container modules take their inner modules as `Vec<Box<dyn Module>>`;
//! the [`modules!`](crate::modules!) macro builds one from plain values.

mod concat;
mod documents;
mod execute;
mod front_matter;
mod group_by;
mod markdown;
mod meta;
mod order_by;
mod paginate;
mod read_files;
mod replace;
mod trace;
mod write_files;
mod yaml;

pub use concat::{Branch, BranchConcat, Concat};
pub use documents::Documents;
pub use execute::{Execute, IntoDocuments};
pub use front_matter::FrontMatter;
pub use group_by::GroupBy;
pub use markdown::Markdown;
pub use meta::Meta;
pub use order_by::OrderBy;
pub use paginate::Paginate;
pub use read_files::ReadFiles;
pub use replace::{Replace, ReplaceIn};
pub use trace::Trace;
pub use write_files::WriteFiles;
pub use yaml::Yaml;

use crate::context::ExecutionContext;
use crate::document::Document;
use crate::value::Value;

/// Box a list of modules for a container module.
///
/// ```rust,ignore
/// let concat = Concat::new(modules![Meta::new("a", 1), Markdown::new()]);
/// ```
#[macro_export]
macro_rules! modules {
    ($($module:expr),* $(,)?) => {
        vec![$(Box::new($module) as Box<dyn $crate::module::Module>),*]
    };
}

/// Per-document selector used by `GroupBy`, `OrderBy` and `Meta`.
pub type Selector = Box<dyn Fn(&Document, &ExecutionContext<'_>) -> Value + Send + Sync>;

/// Selector reading one metadata key (`Null` when missing).
pub fn key_selector(key: impl Into<String>) -> Selector {
    let key = key.into();
    Box::new(move |doc: &Document, _: &ExecutionContext<'_>| {
        doc.get(&key).cloned().unwrap_or_default()
    })
}
