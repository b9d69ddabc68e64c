//! Site configuration.
//!
//! A site is described by `folio.toml` at the site root. The file is sparse:
//! it is merged over the stock defaults, so it only needs the keys it wants
//! to change, then deserialized and validated. Unknown keys are rejected to
//! catch typos early.
//!
//! ## Layout
//!
//! ```text
//! site/
//! ├── folio.toml        # this file
//! ├── input/            # `input`, read by `read_files`
//! └── output/           # `output`, written by `write_files`
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! input = "input"           # Relative to the site root
//! output = "output"
//! strict = false            # Warnings fail the build
//!
//! [metadata]                # Global metadata, visible to every document
//! title = "My Site"
//!
//! [processing]
//! max_processes = 4         # Worker threads (omit for auto = CPU cores)
//!
//! [[pipelines]]
//! name = "pages"
//! modules = [
//!   { kind = "read_files", pattern = "**/*.md" },
//!   { kind = "front_matter", modules = [{ kind = "yaml" }] },
//!   { kind = "markdown" },
//!   { kind = "write_files", extension = "html" },
//! ]
//! ```
//!
//! Pipelines run in the order they are declared. Each module is a table
//! whose `kind` selects the module; container modules nest their own
//! `modules` list. See [`ModuleConfig`] for every kind.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up at the site root.
pub const CONFIG_FILE: &str = "folio.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `folio.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Input directory, relative to the site root.
    pub input: String,
    /// Output directory, relative to the site root.
    pub output: String,
    /// Escalate warnings to build failures.
    pub strict: bool,
    /// Global metadata at the root of every document's metadata chain.
    pub metadata: toml::Table,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Pipelines, in execution order.
    pub pipelines: Vec<PipelineConfig>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            input: "input".to_string(),
            output: "output".to_string(),
            strict: false,
            metadata: toml::Table::new(),
            processing: ProcessingConfig::default(),
            pipelines: Vec::new(),
        }
    }
}

impl SiteConfig {
    /// Validate everything the registry relies on when building modules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.trim().is_empty() {
            return Err(ConfigError::Validation("input must not be empty".into()));
        }
        if self.output.trim().is_empty() {
            return Err(ConfigError::Validation("output must not be empty".into()));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }

        let mut declared: Vec<String> = Vec::new();
        for (index, pipeline) in self.pipelines.iter().enumerate() {
            let name = pipeline.effective_name(index);
            if declared.contains(&name) {
                return Err(ConfigError::Validation(format!(
                    "duplicate pipeline name: {name}"
                )));
            }
            for module in &pipeline.modules {
                module.validate(&declared).map_err(|msg| {
                    ConfigError::Validation(format!("pipeline '{name}': {msg}"))
                })?;
            }
            declared.push(name);
        }
        Ok(())
    }

    /// Pipeline names as the engine will register them.
    pub fn pipeline_names(&self) -> Vec<String> {
        self.pipelines
            .iter()
            .enumerate()
            .map(|(i, p)| p.effective_name(i))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum worker threads. `None` uses every core.
    pub max_processes: Option<usize>,
}

/// Resolve the worker thread count: the configured maximum, clamped to the
/// available cores.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Unnamed pipelines are called `Pipeline N` (1-based position).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
}

impl PipelineConfig {
    pub fn effective_name(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Pipeline {}", index + 1),
        }
    }
}

/// One module declaration. `kind` selects the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum ModuleConfig {
    ReadFiles {
        pattern: String,
    },
    WriteFiles {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extension: Option<String>,
    },
    FrontMatter {
        #[serde(default = "default_delimiter")]
        delimiter: String,
        #[serde(default = "default_true")]
        ignore_delimiter_on_first_line: bool,
        #[serde(default)]
        modules: Vec<ModuleConfig>,
    },
    Yaml {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
    },
    Markdown,
    Replace {
        search: String,
        #[serde(default)]
        replacement: String,
        /// Treat `search` as a regular expression.
        #[serde(default)]
        regex: bool,
    },
    ReplaceIn {
        search: String,
        #[serde(default)]
        modules: Vec<ModuleConfig>,
    },
    Meta {
        key: String,
        value: toml::Value,
    },
    Concat {
        #[serde(default)]
        modules: Vec<ModuleConfig>,
    },
    Branch {
        #[serde(default)]
        modules: Vec<ModuleConfig>,
    },
    BranchConcat {
        /// Only inputs whose metadata value for this key is truthy.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        when: Option<String>,
        #[serde(default)]
        modules: Vec<ModuleConfig>,
    },
    GroupBy {
        key: String,
        #[serde(default)]
        modules: Vec<ModuleConfig>,
    },
    OrderBy {
        key: String,
        #[serde(default)]
        descending: bool,
        /// Secondary keys, ascending.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        then_by: Vec<String>,
    },
    Paginate {
        size: usize,
        #[serde(default)]
        modules: Vec<ModuleConfig>,
    },
    Documents {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pipeline: Option<String>,
    },
    Trace {
        message: String,
    },
}

fn default_delimiter() -> String {
    "-".to_string()
}

fn default_true() -> bool {
    true
}

impl ModuleConfig {
    /// The `kind` string of this declaration.
    pub fn kind(&self) -> &'static str {
        match self {
            ModuleConfig::ReadFiles { .. } => "read_files",
            ModuleConfig::WriteFiles { .. } => "write_files",
            ModuleConfig::FrontMatter { .. } => "front_matter",
            ModuleConfig::Yaml { .. } => "yaml",
            ModuleConfig::Markdown => "markdown",
            ModuleConfig::Replace { .. } => "replace",
            ModuleConfig::ReplaceIn { .. } => "replace_in",
            ModuleConfig::Meta { .. } => "meta",
            ModuleConfig::Concat { .. } => "concat",
            ModuleConfig::Branch { .. } => "branch",
            ModuleConfig::BranchConcat { .. } => "branch_concat",
            ModuleConfig::GroupBy { .. } => "group_by",
            ModuleConfig::OrderBy { .. } => "order_by",
            ModuleConfig::Paginate { .. } => "paginate",
            ModuleConfig::Documents { .. } => "documents",
            ModuleConfig::Trace { .. } => "trace",
        }
    }

    /// Nested module declarations of container kinds.
    pub fn children(&self) -> &[ModuleConfig] {
        match self {
            ModuleConfig::FrontMatter { modules, .. }
            | ModuleConfig::ReplaceIn { modules, .. }
            | ModuleConfig::Concat { modules }
            | ModuleConfig::Branch { modules }
            | ModuleConfig::BranchConcat { modules, .. }
            | ModuleConfig::GroupBy { modules, .. }
            | ModuleConfig::Paginate { modules, .. } => modules,
            _ => &[],
        }
    }

    /// `earlier` holds the names of the pipelines declared before this one.
    fn validate(&self, earlier: &[String]) -> Result<(), String> {
        let kind = self.kind();
        match self {
            ModuleConfig::ReadFiles { pattern } if pattern.trim().is_empty() => {
                return Err(format!("{kind}: pattern must not be empty"));
            }
            ModuleConfig::FrontMatter { delimiter, .. } if delimiter.is_empty() => {
                return Err(format!("{kind}: delimiter must not be empty"));
            }
            ModuleConfig::Replace {
                search,
                regex: true,
                ..
            } => {
                regex::Regex::new(search).map_err(|e| format!("{kind}: {e}"))?;
            }
            ModuleConfig::ReplaceIn { search, .. } if search.is_empty() => {
                return Err(format!("{kind}: search must not be empty"));
            }
            ModuleConfig::Meta { key, .. }
            | ModuleConfig::GroupBy { key, .. }
            | ModuleConfig::OrderBy { key, .. }
                if key.trim().is_empty() =>
            {
                return Err(format!("{kind}: key must not be empty"));
            }
            ModuleConfig::Paginate { size: 0, .. } => {
                return Err(format!("{kind}: size must be at least 1"));
            }
            ModuleConfig::Documents {
                pipeline: Some(name),
            } if !earlier.contains(name) => {
                return Err(format!(
                    "{kind}: pipeline '{name}' is not declared before this one"
                ));
            }
            _ => {}
        }
        for child in self.children() {
            child.validate(earlier)?;
        }
        Ok(())
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// The stock defaults as a TOML value, the base layer every config file is
/// merged over.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults: {e}")))
}

/// Recursively merge `overlay` into `base`. Tables merge key by key; any
/// other value (arrays included) is replaced by the overlay's.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file if it exists.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    read_toml(path).map(Some)
}

fn read_toml(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the configuration of the site at `root`.
///
/// An explicit `config` path must exist; without one, `root/folio.toml` is
/// used when present and the stock defaults otherwise.
pub fn load_config(root: &Path, config: Option<&Path>) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = match config {
        Some(path) => Some(read_toml(path)?),
        None => load_raw_config(&root.join(CONFIG_FILE))?,
    };
    resolve_config(base, overlay)
}

/// A documented starter `folio.toml`, printed by `folio gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# Folio Configuration
# ===================
# Every top-level setting is optional; values shown are the defaults.
# Unknown keys will cause an error.

# Directories, relative to the site root.
input = "input"
output = "output"

# Fail the build on warnings (unreadable files, output collisions).
strict = false

# ---------------------------------------------------------------------------
# Global metadata, visible to every document
# ---------------------------------------------------------------------------
[metadata]
# title = "My Site"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum worker threads (Markdown rendering).
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Pipelines run top to bottom. Later pipelines can read the documents of
# earlier ones with { kind = "documents", pipeline = "<name>" }.
#
# Module kinds:
#   read_files     pattern
#   write_files    extension?
#   front_matter   delimiter = "-", ignore_delimiter_on_first_line = true, modules
#   yaml           key?
#   markdown
#   replace        search, replacement, regex = false
#   replace_in     search, modules
#   meta           key, value
#   concat         modules
#   branch         modules
#   branch_concat  when?, modules
#   group_by       key, modules
#   order_by       key, descending = false, then_by = []
#   paginate       size, modules
#   documents      pipeline?
#   trace          message
# ---------------------------------------------------------------------------
[[pipelines]]
name = "pages"
modules = [
  { kind = "read_files", pattern = "**/*.md" },
  { kind = "front_matter", modules = [{ kind = "yaml" }] },
  { kind = "markdown" },
  { kind = "write_files", extension = "html" },
]
"##
}
