//! The Coreform Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions. Input files hold a JSON datum (see
//! [`crate::ast::Datum`]) which is bound against a unit registry layered over
//! the built-in base.

use std::path::Path;
use std::{fs, process};

use clap::Parser;
use tracing::debug;

use crate::ast::Syntax;
use crate::cli::args::{Command, CoreformArgs, ExpansionArgs};
use crate::macros::std::base_registry;
use crate::macros::{Expander, FormRegistry, StopSet};
use crate::FormError;

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = CoreformArgs::parse();

    // Dispatch to the appropriate subcommand handler.
    let result = match args.command {
        Command::Expand {
            file,
            expansion,
            json,
        } => handle_expand(&file, &expansion, json),
        Command::Macrotrace { file, expansion } => handle_macrotrace(&file, &expansion),
        Command::ListForms => output::print_forms(&base_registry()),
    };

    if let Err(e) = result {
        eprintln!("{:?}", miette::Report::new(e));
        process::exit(1);
    }
}

/// Handles the `expand` subcommand.
fn handle_expand(path: &Path, expansion: &ExpansionArgs, json: bool) -> Result<(), FormError> {
    let registry = FormRegistry::with_base(base_registry());
    let (tree, stop_set) = load(&registry, path, expansion)?;
    let expander = Expander::with_options(&registry, expansion.options());
    let expanded = expander.expand(tree, stop_set)?;
    output::print_expanded(&expanded, json)
}

/// Handles the `macrotrace` subcommand.
fn handle_macrotrace(path: &Path, expansion: &ExpansionArgs) -> Result<(), FormError> {
    let registry = FormRegistry::with_base(base_registry());
    let (tree, stop_set) = load(&registry, path, expansion)?;
    let expander = Expander::with_options(&registry, expansion.options());
    let (expanded, trace) = expander.expand_traced(tree, stop_set)?;
    output::print_trace(&trace, &expanded)
}

// Reads and binds the input datum, and resolves `--stop` names.
fn load(
    registry: &FormRegistry,
    path: &Path,
    expansion: &ExpansionArgs,
) -> Result<(Syntax, StopSet), FormError> {
    debug!(file = %path.display(), "reading datum");
    let source = fs::read_to_string(path)?;
    let datum = crate::ast::Datum::from_json(&source)?;
    let tree = registry.bind(&datum)?;

    let mut stop_set = StopSet::new();
    for name in &expansion.stop {
        let identity = registry
            .resolve(name)
            .ok_or_else(|| crate::err_msg!(Input, "cannot stop at `{}`: no such form", name))?;
        stop_set.insert(identity.clone());
    }
    Ok((tree, stop_set))
}
