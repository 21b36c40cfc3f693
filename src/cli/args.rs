//! Defines the command-line arguments and subcommands for the Coreform CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::macros::{ExpandOptions, MAX_EXPANSION_DEPTH};

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "coreform",
    version,
    about = "Expand macro uses into core forms, stopping where asked."
)]
pub struct CoreformArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the fully expanded form of a JSON datum.
    Expand {
        /// The path to the JSON datum to expand.
        #[arg(required = true)]
        file: PathBuf,
        #[command(flatten)]
        expansion: ExpansionArgs,
        /// Print the expanded tree as JSON instead of s-expression text.
        #[arg(long)]
        json: bool,
    },
    /// Show a stepwise macro expansion trace with diffs.
    Macrotrace {
        /// The path to the JSON datum to trace.
        #[arg(required = true)]
        file: PathBuf,
        #[command(flatten)]
        expansion: ExpansionArgs,
    },
    /// List the built-in forms with their kind and traversal descriptor.
    ListForms,
}

/// Options shared by every subcommand that runs the expander.
#[derive(Debug, Clone, Args)]
pub struct ExpansionArgs {
    /// Leave uses of this form unexpanded (repeatable).
    #[arg(long = "stop", value_name = "NAME")]
    pub stop: Vec<String>,
    /// Ceiling on macro re-entries along one path and on nesting depth.
    #[arg(long, default_value_t = MAX_EXPANSION_DEPTH)]
    pub max_depth: usize,
    /// Fail when the result carries wrappers nobody consumed.
    #[arg(long)]
    pub strict_wrappers: bool,
}

impl ExpansionArgs {
    pub fn options(&self) -> ExpandOptions {
        ExpandOptions {
            max_depth: self.max_depth,
            strict_wrappers: self.strict_wrappers,
        }
    }
}
