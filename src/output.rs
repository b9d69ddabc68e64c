//! CLI output formatting.
//!
//! Every command has a `format_*` function returning lines, for testability,
//! and a `print_*` wrapper that writes them to stdout. Format functions are
//! pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Pipelines
//! 001 pages
//!     read_files **/*.md
//!     front_matter
//!         yaml
//!     markdown
//!     write_files .html
//! 002 archive
//!     documents pages
//! ```
//!
//! ## Build
//!
//! ```text
//! 001 pages → 4 documents (5 invocations)
//! 002 archive → 4 documents (4 invocations)
//!
//! Built 8 documents in 2 pipelines
//! ```
//!
//! ## Build `--tree`
//!
//! Each line is one module invocation: stage, module, documents in and out,
//! and the persisted object of the branch when there is one.
//!
//! ```text
//! pages
//!     [0] ReadFiles 1 → 4
//!         [1] FrontMatter 4 → 4
//!             [2] Markdown 4 → 4
//! ```

use crate::config::{ModuleConfig, SiteConfig};
use crate::engine::Engine;
use crate::pipeline::Pipeline;
use crate::tree::{BranchNode, ExecutionTree};
use serde::Serialize;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Check
// ============================================================================

/// One-line description of a module declaration: its kind plus the setting
/// that identifies it.
fn describe_module(module: &ModuleConfig) -> String {
    let kind = module.kind();
    match module {
        ModuleConfig::ReadFiles { pattern } => format!("{kind} {pattern}"),
        ModuleConfig::WriteFiles {
            extension: Some(ext),
        } => format!("{kind} .{}", ext.trim_start_matches('.')),
        ModuleConfig::Yaml { key: Some(key) } => format!("{kind} → {key}"),
        ModuleConfig::Replace { search, regex, .. } => {
            if *regex {
                format!("{kind} /{search}/")
            } else {
                format!("{kind} \"{search}\"")
            }
        }
        ModuleConfig::ReplaceIn { search, .. } => format!("{kind} \"{search}\""),
        ModuleConfig::Meta { key, .. } => format!("{kind} {key}"),
        ModuleConfig::BranchConcat { when: Some(key), .. } => format!("{kind} when {key}"),
        ModuleConfig::GroupBy { key, .. } => format!("{kind} {key}"),
        ModuleConfig::OrderBy {
            key, descending, ..
        } => {
            if *descending {
                format!("{kind} {key} desc")
            } else {
                format!("{kind} {key}")
            }
        }
        ModuleConfig::Paginate { size, .. } => format!("{kind} {size}"),
        ModuleConfig::Documents {
            pipeline: Some(name),
        } => format!("{kind} {name}"),
        ModuleConfig::Trace { message } => format!("{kind} \"{message}\""),
        _ => kind.to_string(),
    }
}

fn push_modules(modules: &[ModuleConfig], depth: usize, lines: &mut Vec<String>) {
    for module in modules {
        lines.push(format!("{}{}", indent(depth), describe_module(module)));
        push_modules(module.children(), depth + 1, lines);
    }
}

/// Format the declared pipelines and their modules.
pub fn format_pipelines(config: &SiteConfig) -> Vec<String> {
    let mut lines = vec!["Pipelines".to_string()];
    if config.pipelines.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
        return lines;
    }
    for (i, pipeline) in config.pipelines.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), pipeline.effective_name(i)));
        push_modules(&pipeline.modules, 1, &mut lines);
    }
    lines
}

pub fn print_pipelines(config: &SiteConfig) {
    for line in format_pipelines(config) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

/// Format the per-pipeline document counts of the last run.
pub fn format_run_summary(engine: &Engine) -> Vec<String> {
    let mut lines = Vec::new();
    let mut total = 0;
    for (i, pipeline) in engine.pipelines().iter().enumerate() {
        let documents = pipeline.outputs().len();
        total += documents;
        lines.push(format!(
            "{} {} → {} ({})",
            format_index(i + 1),
            pipeline.name(),
            plural(documents, "document", "documents"),
            plural(pipeline.tree().len(), "invocation", "invocations"),
        ));
    }
    lines.push(String::new());
    lines.push(format!(
        "Built {} in {}",
        plural(total, "document", "documents"),
        plural(engine.pipelines().len(), "pipeline", "pipelines"),
    ));
    lines
}

/// Machine-readable counterpart of [`format_run_summary`].
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub pipelines: Vec<PipelineSummary>,
    pub documents: usize,
}

#[derive(Debug, Serialize)]
pub struct PipelineSummary {
    pub name: String,
    pub documents: usize,
    pub invocations: usize,
}

pub fn run_summary(engine: &Engine) -> RunSummary {
    let pipelines: Vec<PipelineSummary> = engine
        .pipelines()
        .iter()
        .map(|p| PipelineSummary {
            name: p.name().to_string(),
            documents: p.outputs().len(),
            invocations: p.tree().len(),
        })
        .collect();
    RunSummary {
        documents: pipelines.iter().map(|p| p.documents).sum(),
        pipelines,
    }
}

pub fn format_run_summary_json(engine: &Engine) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&run_summary(engine))
}

pub fn print_run_summary(engine: &Engine) {
    for line in format_run_summary(engine) {
        println!("{}", line);
    }
}

fn node_line(node: &BranchNode, depth: usize) -> String {
    let mut line = format!(
        "{}[{}] {} {} → {}",
        indent(depth),
        node.stage,
        node.module,
        node.inputs.len(),
        node.outputs.len()
    );
    if let Some(persisted) = &node.persisted {
        line.push_str(&format!(" (persisted: {persisted})"));
    }
    line
}

fn push_nodes<'a>(
    tree: &'a ExecutionTree,
    nodes: impl Iterator<Item = &'a BranchNode>,
    depth: usize,
    lines: &mut Vec<String>,
) {
    for node in nodes {
        lines.push(node_line(node, depth));
        push_nodes(tree, tree.children(node.id), depth + 1, lines);
    }
}

/// Format a pipeline's execution tree, one invocation per line.
pub fn format_execution_tree(pipeline: &Pipeline) -> Vec<String> {
    let mut lines = vec![pipeline.name().to_string()];
    let tree = pipeline.tree();
    if tree.is_empty() {
        lines.push(format!("{}(not executed)", indent(1)));
        return lines;
    }
    push_nodes(tree, tree.roots(), 1, &mut lines);
    lines
}

pub fn print_execution_trees(engine: &Engine) {
    for pipeline in engine.pipelines().iter() {
        for line in format_execution_tree(pipeline) {
            println!("{}", line);
        }
    }
}
