//! Handles all user-facing output for the CLI.
//!
//! This module is responsible for pretty-printing, colorizing output,
//! and generating JSON. Diagnostics themselves are rendered by `miette` in
//! [`crate::cli::run`].

use std::io::Write;

use difference::{Changeset, Difference};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::ast::Syntax;
use crate::macros::{ExpansionStep, FormRegistry, Provenance};
use crate::FormError;

// ============================================================================
// CORE OUTPUT FUNCTIONS: User-facing CLI output utilities
// ============================================================================

/// Prints an expanded tree as s-expression text, or as JSON.
pub fn print_expanded(tree: &Syntax, json: bool) -> Result<(), FormError> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    if json {
        let rendered = serde_json::to_string_pretty(tree)
            .map_err(|e| crate::err_msg!(Input, "cannot render tree as JSON: {}", e))?;
        writeln!(stdout, "{}", rendered)?;
    } else {
        writeln!(stdout, "{}", tree.pretty())?;
    }
    Ok(())
}

/// Prints a macro expansion trace to the console with colored word diffs.
pub fn print_trace(trace: &[ExpansionStep], result: &Syntax) -> Result<(), FormError> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    for (i, step) in trace.iter().enumerate() {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
        writeln!(
            stdout,
            "--- Step {}: {} ({}, depth {}) ---",
            i,
            step.identity,
            provenance_label(step.provenance),
            step.depth
        )?;
        stdout.reset()?;

        let before = step.input.pretty();
        let after = step.output.pretty();
        let changeset = Changeset::new(&before, &after, " ");
        print_diff(&mut stdout, &changeset.diffs)?;
        writeln!(stdout)?;
    }

    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
    writeln!(stdout, "Result ({} steps):", trace.len())?;
    stdout.reset()?;
    writeln!(stdout, "{}", result.pretty())?;
    Ok(())
}

/// Lists every form in `registry` with its kind and, for core forms, its
/// traversal descriptor.
pub fn print_forms(registry: &FormRegistry) -> Result<(), FormError> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let mut identities = registry.identities();
    identities.sort_by(|a, b| a.name().cmp(b.name()));

    for identity in identities {
        let Some(entry) = registry.get(identity) else {
            continue;
        };
        stdout.set_color(ColorSpec::new().set_bold(true))?;
        write!(stdout, "{:<8}", identity.name())?;
        stdout.reset()?;
        match entry.as_core() {
            Some(descriptor) => writeln!(stdout, " {:<6} {}", entry.kind(), descriptor)?,
            None => writeln!(stdout, " {}", entry.kind())?,
        }
    }
    Ok(())
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn provenance_label(provenance: Provenance) -> &'static str {
    match provenance {
        Provenance::Unit => "unit",
        Provenance::Base => "base",
    }
}

// Word-level diff on one line: removals as [-x-], additions as {+x+}.
fn print_diff(stdout: &mut StandardStream, diffs: &[Difference]) -> Result<(), FormError> {
    for diff in diffs {
        match diff {
            Difference::Same(ref x) => {
                stdout.reset()?;
                write!(stdout, "{} ", x)?;
            }
            Difference::Add(ref x) => {
                stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
                write!(stdout, "{{+{}+}} ", x)?;
            }
            Difference::Rem(ref x) => {
                stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                write!(stdout, "[-{}-] ", x)?;
            }
        }
    }
    stdout.reset()?;
    Ok(())
}
