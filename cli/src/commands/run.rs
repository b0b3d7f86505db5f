use super::chunk_name;
use crate::config::RunSettings;
use anyhow::{anyhow, Context, Result};
use compiler::ChunkCompiler;
use lunette_std::{load_file, Registry};
use memory::Value;
use std::fs;
use tracing::debug;
use vm::{FsHost, RuntimeError, VM};

/// A VM with the source compiler, a filesystem host rooted at
/// `settings.script_root`, and the base library installed.
pub fn new_vm(settings: &RunSettings) -> Result<VM> {
    let mut vm = VM::with_options(settings.options.clone());
    vm.set_host(Box::new(FsHost::new(settings.script_root.clone())));
    vm.set_compiler(Box::new(ChunkCompiler));
    let registry = Registry::install(&mut vm).context("cannot install the base library")?;
    debug!(
        builtins = registry.len(),
        root = %settings.script_root.display(),
        "vm ready"
    );
    Ok(vm)
}

/// Load `path` (source or binary chunk) as a closure; `-` reads stdin.
pub fn load_script(vm: &mut VM, path: &str) -> Result<Value> {
    if path == "-" {
        return load_file(vm, None).context("cannot load standard input");
    }
    let bytes = fs::read(path).with_context(|| format!("cannot read '{}'", path))?;
    let main = vm.decode_bytes(&bytes, &chunk_name(path))?;
    Ok(vm.new_closure(main))
}

pub fn run_file(path: &str, settings: &RunSettings) -> Result<()> {
    let mut vm = new_vm(settings)?;
    let main = load_script(&mut vm, path)?;
    let results = vm
        .call_value(main, &[])
        .map_err(|e| describe_failure(&vm, &e))?;
    debug!(path, results = results.len(), "script finished");
    Ok(())
}

/// `message (in function, line n)` when the failing location is known.
pub fn describe_failure(vm: &VM, err: &RuntimeError) -> anyhow::Error {
    match &vm.last_error_location {
        Some((function, line)) => anyhow!("{} (in {}, line {})", err.message(), function, line),
        None => anyhow!("{}", err.message()),
    }
}
