use clap::{Parser, Subcommand};
use folio::config::{self, SiteConfig};
use folio::engine::{Engine, EngineError};
use folio::output;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("FOLIO_ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("FOLIO_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Pipeline-based static site generator")]
#[command(long_about = "\
Pipeline-based static site generator

A site is a list of pipelines declared in folio.toml. Each pipeline starts
from a single empty document and passes documents through its modules in
order: read files, parse front matter, render Markdown, apply layouts,
write files. Later pipelines can read the documents of earlier ones.

Site structure:

  site/
  ├── folio.toml        # Pipelines, global metadata, settings
  ├── input/            # Read by read_files
  │   ├── index.md
  │   └── posts/
  │       └── hello.md
  └── output/           # Written by write_files

Run 'folio gen-config' to generate a documented folio.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Site root directory
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file (default: <root>/folio.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Input directory, overriding the config (relative to the root)
    #[arg(long, global = true)]
    input: Option<String>,

    /// Output directory, overriding the config (relative to the root)
    #[arg(long, global = true)]
    output: Option<String>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Treat warnings as errors
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every pipeline and write the site
    Build {
        /// Print each pipeline's execution tree
        #[arg(long)]
        tree: bool,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load and validate the configuration without building
    Check,
    /// Print a stock folio.toml with all options documented
    GenConfig,
}

/// Process exit statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Normal = 0,
    CommandLineError = 1,
    ConfigurationError = 2,
    ExecutionError = 3,
    UnhandledError = 4,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit as u8)
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // help and --version land here too
            let exit = if e.use_stderr() {
                Exit::CommandLineError
            } else {
                Exit::Normal
            };
            let _ = e.print();
            return exit.into();
        }
    };
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => Exit::Normal.into(),
        Err(e) => {
            eprintln!("error: {e}");
            let exit = match &e {
                CliError::Config(_) => Exit::ConfigurationError,
                CliError::Engine(e) if e.is_configuration() => Exit::ConfigurationError,
                CliError::Engine(_) => Exit::ExecutionError,
                CliError::Json(_) => Exit::UnhandledError,
            };
            exit.into()
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("could not serialize run summary: {0}")]
    Json(#[from] serde_json::Error),
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Check => {
            let site = load_site_config(&cli)?;
            println!("==> Checking {}", cli.root.display());
            output::print_pipelines(&site);
            println!("==> Configuration is valid");
        }
        Command::Build { tree, json } => {
            let site = load_site_config(&cli)?;
            init_thread_pool(&site.processing);
            let mut engine = Engine::from_config(&site, &cli.root)?;

            if !json {
                println!("==> Building {}", cli.root.display());
            }
            engine.run()?;

            if json {
                let summary = output::format_run_summary_json(&engine)?;
                println!("{summary}");
            } else {
                if tree {
                    output::print_execution_trees(&engine);
                    println!();
                }
                output::print_run_summary(&engine);
                println!(
                    "==> Build complete: {}",
                    engine.file_system().output_path().display()
                );
            }
        }
    }
    Ok(())
}

/// Load the site config and apply command-line overrides.
fn load_site_config(cli: &Cli) -> Result<SiteConfig, config::ConfigError> {
    let mut site = config::load_config(&cli.root, cli.config.as_deref())?;
    if let Some(input) = &cli.input {
        site.input = input.clone();
    }
    if let Some(output) = &cli.output {
        site.output = output.clone();
    }
    if cli.strict {
        site.strict = true;
    }
    site.validate()?;
    Ok(site)
}

/// Log to stderr. `RUST_LOG` wins over the default filter.
fn init_tracing(verbose: bool) {
    let default = if verbose { "folio=debug" } else { "folio=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
