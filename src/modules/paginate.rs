//! Splitting documents into fixed-size pages.
//!
//! Each page is one document carrying its slice under `PageDocuments` plus
//! `CurrentPage`, `TotalPages`, `TotalItems`, `HasNextPage` and
//! `HasPreviousPage`.

use crate::context::ExecutionContext;
use crate::document::{Content, Document};
use crate::keys;
use crate::module::{Module, Outputs, outputs};
use crate::value::Value;

/// Splits the inner modules' results into pages of `size` documents.
///
/// Emits one document per page, cloned from the first input so it keeps
/// that input's source, content and lineage. Each page carries:
///
/// | Key | Value |
/// |-----|-------|
/// | `PageDocuments` | the page's documents |
/// | `CurrentPage` | 1-based page number |
/// | `TotalPages` | number of pages |
/// | `TotalItems` | number of paged documents |
/// | `HasNextPage` / `HasPreviousPage` | neighbours exist |
///
/// No results, no pages.
pub struct Paginate {
    size: usize,
    modules: Vec<Box<dyn Module>>,
}

impl Paginate {
    /// `size` is clamped to at least one document per page.
    pub fn new(size: usize, modules: Vec<Box<dyn Module>>) -> Self {
        Self {
            size: size.max(1),
            modules,
        }
    }
}

impl Module for Paginate {
    fn name(&self) -> &str {
        "Paginate"
    }

    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        outputs(context.execute(&self.modules, inputs).map(|results| {
            let total_items = results.len();
            let total_pages = total_items.div_ceil(self.size);
            results
                .chunks(self.size)
                .enumerate()
                .map(|(index, page)| {
                    let number = index + 1;
                    let meta = [
                        (keys::PAGE_DOCUMENTS, Value::from(page.to_vec())),
                        (keys::CURRENT_PAGE, Value::from(number)),
                        (keys::TOTAL_PAGES, Value::from(total_pages)),
                        (keys::TOTAL_ITEMS, Value::from(total_items)),
                        (keys::HAS_NEXT_PAGE, Value::from(number < total_pages)),
                        (keys::HAS_PREVIOUS_PAGE, Value::from(number > 1)),
                    ];
                    match inputs.first() {
                        Some(first) => first.clone_with(meta),
                        None => context.new_document(
                            format!("page:{number}"),
                            Content::Empty,
                            meta,
                        ),
                    }
                })
                .collect()
        }))
    }
}
