//! Immutable documents.
//!
//! A [`Document`] is a snapshot of `(source, content, metadata)` plus the
//! bookkeeping the pipeline needs: the pipeline that owns it, the document it
//! was cloned from, and the persisted object it was cloned with. Nothing in a
//! document changes after creation; modules produce new documents with
//! [`Document::derive`] (or the `clone_with_*` shorthands), which layers
//! metadata overrides on top of the original chain.
//!
//! Identity is per creation: every document gets a fresh [`DocumentId`], and
//! equality compares ids. Two clones with identical content are still two
//! documents, and a module that returns one of its inputs returns *the same*
//! document. The scheduler relies on that to tell recycled documents from
//! fresh ones.
//!
//! # Content
//!
//! Content is bytes, held in memory or read lazily from an open file handle
//! (see [`FileContent`]). [`Document::dispose`] releases the handle; it is
//! idempotent and never touches metadata.

use crate::metadata::{Metadata, MetadataError};
use crate::value::{FromValue, Value};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("content of {0} was disposed before it was read")]
    Disposed(PathBuf),
}

/// Process-unique document identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        DocumentId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Content
// =============================================================================

/// Document payload.
#[derive(Clone, Default)]
pub enum Content {
    #[default]
    Empty,
    Memory(Arc<[u8]>),
    File(Arc<FileContent>),
}

impl Content {
    /// Open `path` now and read it on first access.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        FileContent::open(path).map(|file| Content::File(Arc::new(file)))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Content::Empty)
    }

    pub fn bytes(&self) -> Result<Arc<[u8]>, ContentError> {
        match self {
            Content::Empty => Ok(Arc::from(Vec::new())),
            Content::Memory(bytes) => Ok(Arc::clone(bytes)),
            Content::File(file) => file.bytes(),
        }
    }

    /// Content as text; invalid UTF-8 is replaced rather than rejected.
    pub fn text(&self) -> Result<String, ContentError> {
        let bytes = self.bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn dispose(&self) {
        if let Content::File(file) = self {
            file.dispose();
        }
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Content::Memory(Arc::from(s.as_bytes()))
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Content::Memory(Arc::from(s.into_bytes()))
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Content::Memory(Arc::from(bytes))
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Empty => f.write_str("Empty"),
            Content::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
            Content::File(file) => write!(f, "File({})", file.path.display()),
        }
    }
}

/// File-backed content.
///
/// The handle is opened up front (so unreadable files surface where they are
/// discovered), read once on first access, then closed. The bytes are cached
/// for every later reader, including clones sharing this content.
pub struct FileContent {
    path: PathBuf,
    handle: Mutex<Option<File>>,
    data: OnceLock<Arc<[u8]>>,
}

impl FileContent {
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        Ok(Self {
            path,
            handle: Mutex::new(Some(file)),
            data: OnceLock::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the underlying handle is still open.
    pub fn is_open(&self) -> bool {
        self.lock_handle().is_some()
    }

    fn bytes(&self) -> Result<Arc<[u8]>, ContentError> {
        if let Some(data) = self.data.get() {
            return Ok(Arc::clone(data));
        }
        let mut handle = self.lock_handle();
        // Another reader may have filled the cache while we waited.
        if let Some(data) = self.data.get() {
            return Ok(Arc::clone(data));
        }
        let mut file = handle
            .take()
            .ok_or_else(|| ContentError::Disposed(self.path.clone()))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(|source| ContentError::Io {
            path: self.path.clone(),
            source,
        })?;
        let data: Arc<[u8]> = Arc::from(buf);
        Ok(Arc::clone(self.data.get_or_init(|| data)))
    }

    fn dispose(&self) {
        self.lock_handle().take();
    }

    fn lock_handle(&self) -> std::sync::MutexGuard<'_, Option<File>> {
        // A poisoned lock only means a reader panicked; the Option is still valid.
        self.handle.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// =============================================================================
// Document
// =============================================================================

struct Inner {
    id: DocumentId,
    source: String,
    content: Content,
    metadata: Metadata,
    pipeline: Option<Arc<str>>,
    parent: Option<Document>,
    persisted: Option<Value>,
}

/// An immutable document. Cloning the handle is cheap; it is the same document.
#[derive(Clone)]
pub struct Document {
    inner: Arc<Inner>,
}

impl Document {
    /// A root document with no pipeline and no parent. The metadata is locked.
    pub fn new(source: impl Into<String>, content: Content, metadata: Metadata) -> Self {
        Self::root(source.into(), content, metadata, None)
    }

    pub(crate) fn root(
        source: String,
        content: Content,
        metadata: Metadata,
        pipeline: Option<Arc<str>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: DocumentId::next(),
                source,
                content,
                metadata: metadata.locked(),
                pipeline,
                parent: None,
                persisted: None,
            }),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.inner.id
    }

    /// Original file path or synthetic id.
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    pub fn content(&self) -> &Content {
        &self.inner.content
    }

    pub fn content_bytes(&self) -> Result<Arc<[u8]>, ContentError> {
        self.inner.content.bytes()
    }

    pub fn content_text(&self) -> Result<String, ContentError> {
        self.inner.content.text()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.inner.metadata
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.metadata.get(key)
    }

    pub fn get_as<T: FromValue>(&self, key: &str) -> Result<T, MetadataError> {
        self.inner.metadata.get_as(key)
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.inner.metadata.string(key)
    }

    /// Name of the pipeline this document belongs to, if any.
    pub fn pipeline(&self) -> Option<&str> {
        self.inner.pipeline.as_deref()
    }

    /// The document this one was cloned from.
    pub fn parent(&self) -> Option<&Document> {
        self.inner.parent.as_ref()
    }

    /// Parent, grandparent, ... up to the root document.
    pub fn ancestors(&self) -> impl Iterator<Item = &Document> {
        std::iter::successors(self.parent(), |doc| doc.parent())
    }

    /// The persisted object this document was cloned with.
    pub fn persisted(&self) -> Option<&Value> {
        self.inner.persisted.as_ref()
    }

    /// Release any open content handle. Safe to call repeatedly.
    pub fn dispose(&self) {
        self.inner.content.dispose();
    }

    /// Start a clone of this document.
    pub fn derive(&self) -> DocumentBuilder<'_> {
        DocumentBuilder {
            base: self,
            source: None,
            content: None,
            overrides: Vec::new(),
            persisted: None,
        }
    }

    /// Clone with extra metadata, keeping the content.
    pub fn clone_with<I, K, V>(&self, overrides: I) -> Document
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.derive().metadata(overrides).build()
    }

    /// Clone with new content and extra metadata.
    pub fn clone_with_content<I, K, V>(&self, content: impl Into<Content>, overrides: I) -> Document
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.derive().content(content).metadata(overrides).build()
    }

    /// Clone under a new source identity (a module "renaming" its input).
    pub fn clone_with_source<I, K, V>(
        &self,
        source: impl Into<String>,
        content: Option<Content>,
        overrides: I,
    ) -> Document
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut builder = self.derive().source(source).metadata(overrides);
        if let Some(content) = content {
            builder = builder.content(content);
        }
        builder.build()
    }

    /// Plain clone that carries `persisted` into the next stage.
    pub fn clone_persisting(&self, persisted: impl Into<Value>) -> Document {
        self.derive().persist(persisted).build()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Document {}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.inner.id)
            .field("source", &self.inner.source)
            .field("content", &self.inner.content)
            .field("keys", &self.inner.metadata.keys())
            .finish()
    }
}

/// Builder returned by [`Document::derive`].
///
/// Anything not set is inherited from the base document. With no metadata
/// overrides the clone shares the base's metadata chain as-is.
#[must_use]
pub struct DocumentBuilder<'a> {
    base: &'a Document,
    source: Option<String>,
    content: Option<Content>,
    overrides: Vec<(String, Value)>,
    persisted: Option<Value>,
}

impl DocumentBuilder<'_> {
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn content(mut self, content: impl Into<Content>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }

    pub fn metadata<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.overrides
            .extend(overrides.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Attach a persisted object for the context that processes the clone.
    pub fn persist(mut self, persisted: impl Into<Value>) -> Self {
        self.persisted = Some(persisted.into());
        self
    }

    pub fn build(self) -> Document {
        let base = &self.base.inner;
        let metadata = if self.overrides.is_empty() {
            base.metadata.clone()
        } else {
            base.metadata.child(self.overrides).locked()
        };
        Document {
            inner: Arc::new(Inner {
                id: DocumentId::next(),
                source: self.source.unwrap_or_else(|| base.source.clone()),
                content: self.content.unwrap_or_else(|| base.content.clone()),
                metadata,
                pipeline: base.pipeline.clone(),
                parent: Some(self.base.clone()),
                persisted: self.persisted,
            }),
        }
    }
}
