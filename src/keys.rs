//! Well-known metadata keys.
//!
//! These are the contract between built-in modules: `ReadFiles` sets the
//! source keys, `WriteFiles` reads the relative path and sets the destination
//! keys, `GroupBy` and `Paginate` publish their members under the group and
//! page keys for whatever renders them downstream.

// Grouping
pub const GROUP_KEY: &str = "GroupKey";
pub const GROUP_DOCUMENTS: &str = "GroupDocuments";

// Pagination
pub const PAGE_DOCUMENTS: &str = "PageDocuments";
pub const CURRENT_PAGE: &str = "CurrentPage";
pub const TOTAL_PAGES: &str = "TotalPages";
pub const TOTAL_ITEMS: &str = "TotalItems";
pub const HAS_NEXT_PAGE: &str = "HasNextPage";
pub const HAS_PREVIOUS_PAGE: &str = "HasPreviousPage";

// Source files (set by ReadFiles)
pub const SOURCE_FILE_ROOT: &str = "SourceFileRoot";
pub const SOURCE_FILE_BASE: &str = "SourceFileBase";
pub const SOURCE_FILE_EXT: &str = "SourceFileExt";
pub const SOURCE_FILE_NAME: &str = "SourceFileName";
pub const SOURCE_FILE_DIR: &str = "SourceFileDir";
pub const SOURCE_FILE_PATH: &str = "SourceFilePath";
pub const RELATIVE_FILE_PATH: &str = "RelativeFilePath";
pub const RELATIVE_FILE_DIR: &str = "RelativeFileDir";

// Destination files (set by WriteFiles)
pub const DESTINATION_FILE_BASE: &str = "DestinationFileBase";
pub const DESTINATION_FILE_EXT: &str = "DestinationFileExt";
pub const DESTINATION_FILE_NAME: &str = "DestinationFileName";
pub const DESTINATION_FILE_DIR: &str = "DestinationFileDir";
pub const DESTINATION_FILE_PATH: &str = "DestinationFilePath";

/// Per-document override of the output path, relative to the output root.
pub const WRITE_PATH: &str = "WritePath";
