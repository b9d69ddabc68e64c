//! Writing documents under the output directory.

use crate::context::ExecutionContext;
use crate::document::Document;
use crate::keys;
use crate::module::{ExecutionError, Module, Outputs};
use crate::value::Value;
use std::path::PathBuf;

/// Writes documents under the output directory.
///
/// The destination is `WritePath` when set, otherwise `RelativeFilePath`
/// with the extension swapped when one is configured. Documents with
/// neither pass through untouched. Written documents come out as clones
/// carrying the `DestinationFile*` keys.
///
/// A destination outside the output directory, one already written earlier
/// in the run, or a write that fails is reported as a warning and that
/// document passes through unwritten.
#[derive(Debug, Clone, Default)]
pub struct WriteFiles {
    extension: Option<String>,
}

impl WriteFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the extension of the relative path (`"html"` or `".html"`).
    pub fn with_extension(extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            extension: Some(extension.trim_start_matches('.').to_string()),
        }
    }

    fn destination(&self, input: &Document) -> Option<PathBuf> {
        if let Some(path) = input.string(keys::WRITE_PATH) {
            return Some(PathBuf::from(path));
        }
        let mut path = PathBuf::from(input.string(keys::RELATIVE_FILE_PATH)?);
        if let Some(ext) = &self.extension {
            path.set_extension(ext);
        }
        Some(path)
    }

    fn write(
        &self,
        input: &Document,
        context: &ExecutionContext<'_>,
    ) -> Result<Document, ExecutionError> {
        let Some(relative) = self.destination(input) else {
            return Ok(input.clone());
        };
        if !crate::fs::is_contained(&relative) {
            context.warning(&format!(
                "skipping {}: {} is outside the output directory",
                input.source(),
                relative.display()
            ))?;
            return Ok(input.clone());
        }
        let fs = context.file_system();
        let path = fs.output_file(&relative);

        if !context.output_claims().claim(&path) {
            context.warning(&format!(
                "skipping {}: {} was already written in this run",
                input.source(),
                path.display()
            ))?;
            return Ok(input.clone());
        }

        let written = input
            .content_bytes()
            .map_err(|e| e.to_string())
            .and_then(|bytes| fs.write_file(&path, &bytes).map_err(|e| e.to_string()));
        if let Err(e) = written {
            context.warning(&format!("could not write {}: {e}", path.display()))?;
            return Ok(input.clone());
        }
        tracing::debug!(path = %path.display(), "write_files.written");

        let text = |s: Option<&std::ffi::OsStr>| {
            s.map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
        };
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let dir = path
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let meta: [(&str, Value); 5] = [
            (keys::DESTINATION_FILE_PATH, path.display().to_string().into()),
            (keys::DESTINATION_FILE_DIR, dir.into()),
            (keys::DESTINATION_FILE_NAME, text(path.file_name()).into()),
            (keys::DESTINATION_FILE_BASE, text(path.file_stem()).into()),
            (keys::DESTINATION_FILE_EXT, ext.into()),
        ];
        Ok(input.clone_with(meta))
    }
}

impl Module for WriteFiles {
    fn name(&self) -> &str {
        "WriteFiles"
    }

    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        Box::new(inputs.iter().map(move |input| self.write(input, context)))
    }
}
