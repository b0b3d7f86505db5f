use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lunette")]
#[command(about = "Lunette CLI", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./lunette.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Log filter used when LUNETTE_LOG is unset (e.g. "warn", "vm=trace")
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a source file or binary chunk ("-" reads standard input)
    Run {
        /// Path to the script, or "-"
        path: String,
        /// Root that loadfile/dofile resolve relative names against
        #[arg(long)]
        script_root: Option<PathBuf>,
        /// Guest call depth before "stack overflow"
        #[arg(long)]
        max_call_depth: Option<usize>,
    },
    /// Compile a source file to a binary chunk
    Compile {
        /// Input source file
        path: String,
        /// Output file (defaults to the input with a .luac extension)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print the instruction listing of a source file or binary chunk
    Disassemble {
        /// Path to the file
        path: String,
    },
}
