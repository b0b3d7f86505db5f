use anyhow::Result;
use clap::Parser;

use cli::args::{Cli, Commands};
use cli::commands::{compile, disassemble, run};
use cli::config::{LunetteConfig, RunOverrides, RunSettings};
use cli::logging;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = LunetteConfig::discover(cli.config.as_deref())?;
    logging::init(&config.log_level(cli.log_level.as_deref()));

    match &cli.command {
        Commands::Run {
            path,
            script_root,
            max_call_depth,
        } => {
            let overrides = RunOverrides {
                script_root: script_root.clone(),
                max_call_depth: *max_call_depth,
            };
            run::run_file(path, &RunSettings::resolve(&config, &overrides, path))
        }
        Commands::Compile { path, output } => {
            compile::compile_file(path, output.as_deref()).map(|_| ())
        }
        Commands::Disassemble { path } => disassemble::disassemble_file(path),
    }
}
