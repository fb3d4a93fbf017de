//! CLI argument definitions for Cascade.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "cascade",
    version,
    about = "An interactive Verilog simulator",
    long_about = "Cascade evaluates Verilog incrementally: code can be added to a running \
                  program from a file or an interactive prompt and takes effect immediately."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate a program, then keep accepting code at the prompt
    Run {
        /// Verilog file to evaluate first
        #[arg(short = 'e', long = "eval")]
        file: Option<PathBuf>,
        /// March target (see `cascade march`)
        #[arg(long)]
        march: Option<String>,
        /// Colon-separated include directories
        #[arg(short = 'I', long = "include")]
        include: Option<String>,
        /// Exit after evaluating the input file instead of starting the prompt
        #[arg(long)]
        batch: bool,
        /// Target seconds per open-loop batch; 0 disables open-loop scheduling
        #[arg(long)]
        open_loop_target: Option<u64>,
        /// Milliseconds between virtual clock frequency reports; 0 disables
        #[arg(long)]
        profile_interval: Option<u64>,
        /// Suppress typechecker warnings
        #[arg(long)]
        disable_warnings: bool,
    },

    /// Parse and typecheck files without simulating them
    Check {
        /// Files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// March target whose declarations are visible
        #[arg(long)]
        march: Option<String>,
        /// Colon-separated include directories
        #[arg(short = 'I', long = "include")]
        include: Option<String>,
    },

    /// Print a file as canonical Verilog
    Fmt {
        file: PathBuf,
        /// Fail if the file is not already formatted
        #[arg(long)]
        check: bool,
    },

    /// List available march targets
    March,
}

pub fn parse() -> Cli {
    Cli::parse()
}
