//! Command-line argument definitions for the Spytial CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. A subcommand picks between laying out an instance and
//! reformatting a spec; configuration file selection and logging verbosity
//! apply to both.

use clap::{Parser, Subcommand};

/// Command-line arguments for the Spytial layout tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Lay out a data instance and write the result as TOML
    Layout {
        /// Path to the layout spec
        spec: String,

        /// Path to the data instance (TOML)
        instance: String,

        /// Output file; standard output when omitted
        #[arg(short, long)]
        output: Option<String>,

        /// Atom to show for a projected type, as `Type=Atom`
        #[arg(long = "project", value_name = "TYPE=ATOM")]
        projections: Vec<String>,

        /// Abort on the first selector that fails to evaluate
        #[arg(long)]
        strict: bool,
    },

    /// Print a spec in canonical form
    Fmt {
        /// Path to the layout spec
        spec: String,

        /// Output file; standard output when omitted
        #[arg(short, long)]
        output: Option<String>,
    },
}
