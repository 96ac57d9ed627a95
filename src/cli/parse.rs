//! CLI parse: clap types for Planwright. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Planwright CLI - business plan generation, one section at a time
#[derive(Parser, Debug)]
#[command(name = "planwright")]
#[command(about = "Generate structured business plan documents with an LLM provider")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (config/ is read from here)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Generate a business plan document and print it as JSON
    Generate {
        /// Free-form business description; repeat for several items
        #[arg(long = "text")]
        text: Vec<String>,

        /// Text file with extracted document content; repeat for several files
        #[arg(long = "document")]
        document: Vec<PathBuf>,

        /// Output language
        #[arg(long, default_value = crate::context::DEFAULT_LANGUAGE)]
        language: String,

        /// Currency for every monetary amount
        #[arg(long, default_value = crate::context::DEFAULT_CURRENCY)]
        currency: String,

        /// Only generate these section keys; repeat for several
        #[arg(long = "section")]
        section: Vec<String>,

        /// Skip the enhancement pass
        #[arg(long)]
        no_enhance: bool,

        /// Include the per-section status report in the output
        #[arg(long)]
        report: bool,

        /// Write the JSON to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List the sections of the active catalog
    Sections {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Suggest short answers to a business plan question
    Suggest {
        /// The question to answer
        question: String,
    },
}
