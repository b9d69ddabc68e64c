//! # Folio
//!
//! A pipeline-based static site generator. A site is a list of named
//! pipelines; each pipeline is an ordered list of modules that transform
//! documents: read files, parse front matter, render Markdown, apply layouts,
//! write files.
//!
//! # Architecture: Documents Through Modules
//!
//! ```text
//! seed ─► ReadFiles ─► FrontMatter(Yaml) ─► Markdown ─► ReplaceIn(layout) ─► WriteFiles
//! ```
//!
//! Every pipeline starts from one empty seed document carrying the global
//! metadata. A module receives the documents of its branch and returns a lazy
//! stream of output documents; a document that fans out into several becomes
//! a new branch for the modules that follow. Documents are immutable: a
//! module never edits a document, it clones it with new content or metadata,
//! and the clone keeps a link to where it came from.
//!
//! Pipelines run in declaration order. Each one publishes its final
//! documents before the next starts, so an index or archive pipeline can
//! read the pages pipeline's documents through [`modules::Documents`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`value`] | Metadata values and typed conversions |
//! | [`metadata`] | Layered copy-on-write metadata chain |
//! | [`keys`] | Well-known metadata keys set by built-in modules |
//! | [`document`] | Immutable documents, lazily-read content, clone builder |
//! | [`module`] | The [`module::Module`] trait and execution errors |
//! | [`context`] | What a module can reach while it runs |
//! | [`pipeline`] | Pipelines and the branch scheduler |
//! | [`tree`] | Record of every module invocation of a run |
//! | [`engine`] | Configured engine that runs all pipelines |
//! | [`fs`] | File system seam: input discovery, output writes |
//! | [`trace`] | Trace messages and listeners (strict mode) |
//! | [`config`] | `folio.toml` loading, merging, validation |
//! | [`registry`] | Declarative module config → module values |
//! | [`output`] | CLI output formatting |
//! | [`modules`] | Built-in modules |
//!
//! # Using the Library
//!
//! ```rust,no_run
//! use folio::engine::Engine;
//! use folio::fs::PhysicalFileSystem;
//! use folio::modules::{FrontMatter, Markdown, ReadFiles, WriteFiles, Yaml};
//!
//! let mut engine = Engine::with_file_system(PhysicalFileSystem::new(".", "input", "output"));
//! engine
//!     .pipelines_mut()
//!     .create(Some("pages"))?
//!     .add(ReadFiles::new("**/*.md"))
//!     .add(FrontMatter::new(folio::modules![Yaml::new()]))
//!     .add(Markdown::new())
//!     .add(WriteFiles::with_extension("html"));
//! engine.run()?;
//! # Ok::<(), folio::engine::EngineError>(())
//! ```
//!
//! # Design Decisions
//!
//! ## Config Files Instead of Scripts
//!
//! Pipelines are declared in TOML and turned into modules by a static
//! [`registry`]. Every module kind is known at compile time, unknown keys are
//! rejected, and `folio check` validates a site without touching its files.
//! Library users who need custom modules implement [`module::Module`] and add
//! them to a pipeline directly.
//!
//! ## Warnings Are Data, Strictness Is a Listener
//!
//! Recoverable problems (an unreadable file, two documents written to the
//! same path) are traced as warnings and the build goes on. Strict mode is a
//! [`trace::TraceListener`] that turns warnings into errors, so the modules
//! themselves never decide how strict a build is.

pub mod config;
pub mod context;
pub mod document;
pub mod engine;
pub mod fs;
pub mod keys;
pub mod metadata;
pub mod module;
pub mod modules;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod trace;
pub mod tree;
pub mod value;

pub use document::{Content, Document};
pub use engine::{Engine, EngineError};
pub use module::{ExecutionError, Module};
pub use value::Value;

#[cfg(test)]
pub(crate) mod test_helpers;
