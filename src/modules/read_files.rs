//! Reading input files into documents.

use crate::context::ExecutionContext;
use crate::document::Document;
use crate::fs::slash_path;
use crate::keys;
use crate::module::{ExecutionError, Module, Outputs, fail};
use crate::value::Value;
use std::path::Path;

/// Reads the input files matching a glob pattern.
///
/// Each input is cloned once per file, so the usual seed document becomes one
/// document per file. Content is opened now and read on first use. A file
/// that cannot be opened is reported as a warning and skipped.
///
/// Metadata set on each document:
///
/// | Key | Example (`input/posts/hello.md`) |
/// |-----|----------------------------------|
/// | `SourceFileRoot` | `/site/input` |
/// | `SourceFilePath` | `/site/input/posts/hello.md` |
/// | `SourceFileDir` | `/site/input/posts` |
/// | `SourceFileName` | `hello.md` |
/// | `SourceFileBase` | `hello` |
/// | `SourceFileExt` | `.md` |
/// | `RelativeFilePath` | `posts/hello.md` |
/// | `RelativeFileDir` | `posts` |
#[derive(Debug, Clone)]
pub struct ReadFiles {
    pattern: String,
}

impl ReadFiles {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    fn read(
        &self,
        input: &Document,
        relative: &Path,
        context: &ExecutionContext<'_>,
    ) -> Result<Option<Document>, ExecutionError> {
        let fs = context.file_system();
        let path = fs.input_file(relative);
        let content = match fs.open_file(&path) {
            Ok(content) => content,
            Err(e) => {
                context.warning(&format!("could not read {}: {e}", path.display()))?;
                return Ok(None);
            }
        };

        let display = |p: &Path| p.display().to_string();
        let name = relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base = relative
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = relative
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let relative_dir = relative.parent().map(slash_path).unwrap_or_default();
        let dir = path.parent().map(display).unwrap_or_default();

        let meta: [(&str, Value); 8] = [
            (keys::SOURCE_FILE_ROOT, display(fs.input_path()).into()),
            (keys::SOURCE_FILE_PATH, display(&path).into()),
            (keys::SOURCE_FILE_DIR, dir.into()),
            (keys::SOURCE_FILE_NAME, name.into()),
            (keys::SOURCE_FILE_BASE, base.into()),
            (keys::SOURCE_FILE_EXT, ext.into()),
            (keys::RELATIVE_FILE_PATH, slash_path(relative).into()),
            (keys::RELATIVE_FILE_DIR, relative_dir.into()),
        ];
        Ok(Some(
            input
                .derive()
                .source(display(&path))
                .content(content)
                .metadata(meta)
                .build(),
        ))
    }
}

impl Module for ReadFiles {
    fn name(&self) -> &str {
        "ReadFiles"
    }

    fn execute<'a>(
        &'a self,
        inputs: &'a [Document],
        context: &'a ExecutionContext<'_>,
    ) -> Outputs<'a> {
        let files = match context.file_system().find_input_files(&self.pattern) {
            Ok(files) => files,
            Err(e) => return fail(e),
        };
        tracing::debug!(pattern = %self.pattern, files = files.len(), "read_files.matched");

        Box::new(
            inputs
                .iter()
                .flat_map(move |input| files.clone().into_iter().map(move |file| (input, file)))
                .filter_map(move |(input, file)| self.read(input, &file, context).transpose()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::FsError;
    use crate::test_helpers::*;
    use crate::trace::{RecordingListener, TraceLevel};
    use std::sync::Arc;

    #[test]
    fn one_document_per_matching_file() {
        let tmp = setup_site();
        let mut engine = site_engine(tmp.path());
        let docs = run_in(&mut engine, crate::modules![ReadFiles::new("**/*.md")]);

        let relative: Vec<String> = meta_values(&docs, keys::RELATIVE_FILE_PATH);
        assert_eq!(
            relative,
            vec!["about.md", "index.md", "posts/first.md", "posts/second.md"]
        );
    }

    #[test]
    fn source_metadata_describes_the_file() {
        let tmp = setup_site();
        let mut engine = site_engine(tmp.path());
        let docs = run_in(&mut engine, crate::modules![ReadFiles::new("posts/first.md")]);

        let post = &docs[0];
        let expected = tmp.path().join("input/posts/first.md");
        assert_eq!(post.source(), expected.display().to_string());
        assert_eq!(post.string(keys::SOURCE_FILE_NAME).as_deref(), Some("first.md"));
        assert_eq!(post.string(keys::SOURCE_FILE_BASE).as_deref(), Some("first"));
        assert_eq!(post.string(keys::SOURCE_FILE_EXT).as_deref(), Some(".md"));
        assert_eq!(post.string(keys::RELATIVE_FILE_DIR).as_deref(), Some("posts"));
        assert!(post.content_text().unwrap().contains("First post"));
    }

    #[test]
    fn global_metadata_flows_into_file_documents() {
        let tmp = setup_site();
        let mut engine = site_engine(tmp.path());
        engine.metadata_mut().set("site", "Example").unwrap();
        let docs = run_in(&mut engine, crate::modules![ReadFiles::new("index.md")]);
        assert_eq!(docs[0].string("site").as_deref(), Some("Example"));
    }

    #[test]
    fn no_matches_is_empty_not_an_error() {
        let tmp = setup_site();
        let mut engine = site_engine(tmp.path());
        let docs = run_in(&mut engine, crate::modules![ReadFiles::new("**/*.rst")]);
        assert!(docs.is_empty());
    }

    #[test]
    fn missing_input_directory_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut engine = site_engine(tmp.path());
        engine
            .pipelines_mut()
            .create(None)
            .unwrap()
            .add(ReadFiles::new("*"));
        let err = engine.run().unwrap_err();
        assert!(matches!(
            err,
            crate::engine::EngineError::Pipeline { source, .. }
                if matches!(source.root_cause(), ExecutionError::FileSystem(FsError::MissingInput(_)))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_is_skipped_with_a_warning() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = setup_site();
        let locked = tmp.path().join("input/about.md");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        if std::fs::File::open(&locked).is_ok() {
            // running as root; permissions are not enforced
            return;
        }

        let recorder = Arc::new(RecordingListener::new());
        let mut engine = site_engine(tmp.path());
        engine.add_trace_listener(recorder.clone());
        let docs = run_in(&mut engine, crate::modules![ReadFiles::new("*.md")]);

        assert_eq!(meta_values::<String>(&docs, keys::SOURCE_FILE_NAME), vec!["index.md"]);
        assert_eq!(recorder.at_least(TraceLevel::Warning).len(), 1);
    }
}
