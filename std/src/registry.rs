//! Function identifiers and their installation into the guest namespaces.

use crate::{base, env, loader, math, select, string};
use memory::Value;
use tracing::{debug, trace};
use vm::{NativeFn, NativeRegistry, RuntimeError, VM};

/// Where a builtin is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Global,
    Math,
    String,
}

/// One identifier per bridge function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionId {
    Assert,
    LoadFile,
    ToNumber,
    RawGet,
    SetFenv,
    Select,
    CollectGarbage,
    DoFile,
    LoadString,
    Load,
    ToString,
    Unpack,
    Next,
    Print,
    Abs,
    Max,
    Min,
    Modf,
    Sin,
    Rep,
    Sub,
}

impl FunctionId {
    pub const ALL: [FunctionId; 21] = [
        FunctionId::Assert,
        FunctionId::LoadFile,
        FunctionId::ToNumber,
        FunctionId::RawGet,
        FunctionId::SetFenv,
        FunctionId::Select,
        FunctionId::CollectGarbage,
        FunctionId::DoFile,
        FunctionId::LoadString,
        FunctionId::Load,
        FunctionId::ToString,
        FunctionId::Unpack,
        FunctionId::Next,
        FunctionId::Print,
        FunctionId::Abs,
        FunctionId::Max,
        FunctionId::Min,
        FunctionId::Modf,
        FunctionId::Sin,
        FunctionId::Rep,
        FunctionId::Sub,
    ];

    /// Name inside its namespace.
    pub fn name(self) -> &'static str {
        match self {
            FunctionId::Assert => "assert",
            FunctionId::LoadFile => "loadfile",
            FunctionId::ToNumber => "tonumber",
            FunctionId::RawGet => "rawget",
            FunctionId::SetFenv => "setfenv",
            FunctionId::Select => "select",
            FunctionId::CollectGarbage => "collectgarbage",
            FunctionId::DoFile => "dofile",
            FunctionId::LoadString => "loadstring",
            FunctionId::Load => "load",
            FunctionId::ToString => "tostring",
            FunctionId::Unpack => "unpack",
            FunctionId::Next => "next",
            FunctionId::Print => "print",
            FunctionId::Abs => "abs",
            FunctionId::Max => "max",
            FunctionId::Min => "min",
            FunctionId::Modf => "modf",
            FunctionId::Sin => "sin",
            FunctionId::Rep => "rep",
            FunctionId::Sub => "sub",
        }
    }

    pub fn namespace(self) -> Namespace {
        match self {
            FunctionId::Abs
            | FunctionId::Max
            | FunctionId::Min
            | FunctionId::Modf
            | FunctionId::Sin => Namespace::Math,
            FunctionId::Rep | FunctionId::Sub => Namespace::String,
            _ => Namespace::Global,
        }
    }

    pub fn behavior(self) -> NativeFn {
        match self {
            FunctionId::Assert => base::native_assert,
            FunctionId::LoadFile => loader::native_loadfile,
            FunctionId::ToNumber => base::native_tonumber,
            FunctionId::RawGet => base::native_rawget,
            FunctionId::SetFenv => env::native_setfenv,
            FunctionId::Select => select::native_select,
            FunctionId::CollectGarbage => base::native_collectgarbage,
            FunctionId::DoFile => loader::native_dofile,
            FunctionId::LoadString => loader::native_loadstring,
            FunctionId::Load => loader::native_load,
            FunctionId::ToString => base::native_tostring,
            FunctionId::Unpack => base::native_unpack,
            FunctionId::Next => base::native_next,
            FunctionId::Print => base::native_print,
            FunctionId::Abs => math::native_abs,
            FunctionId::Max => math::native_max,
            FunctionId::Min => math::native_min,
            FunctionId::Modf => math::native_modf,
            FunctionId::Sin => math::native_sin,
            FunctionId::Rep => string::native_rep,
            FunctionId::Sub => string::native_sub,
        }
    }
}

/// The installed bridge: which native handle each identifier received.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    handles: Vec<(FunctionId, u32)>,
}

impl Registry {
    /// Register every builtin in `vm`.
    ///
    /// Globals receive the base functions plus the `math` and `string`
    /// tables. `string` is the VM's string method table, so `s:sub(2)` and
    /// `string.sub(s, 2)` reach the same builtin. Running this twice
    /// registers everything again under fresh handles.
    pub fn install(vm: &mut VM) -> Result<Registry, RuntimeError> {
        let math = vm.new_table();
        let string = Value::table(vm.string_methods);

        let mut handles = Vec::with_capacity(FunctionId::ALL.len());
        for id in FunctionId::ALL {
            let value = vm.define_native(id.name(), id.behavior());
            match id.namespace() {
                Namespace::Global => vm.set_global(id.name(), value),
                Namespace::Math => {
                    let key = vm.str_value(id.name());
                    vm.raw_set(math, key, value)?;
                }
                Namespace::String => {
                    let key = vm.str_value(id.name());
                    vm.raw_set(string, key, value)?;
                }
            }
            if let Value::Native(handle) = value {
                handles.push((id, handle));
            }
            trace!(name = id.name(), namespace = ?id.namespace(), "builtin installed");
        }

        let huge = vm.str_value("huge");
        vm.raw_set(math, huge, Value::number(f64::MAX))?;
        let pi = vm.str_value("pi");
        vm.raw_set(math, pi, Value::number(std::f64::consts::PI))?;

        vm.set_global("math", math);
        vm.set_global("string", string);
        debug!(builtins = handles.len(), "base library installed");
        Ok(Registry { handles })
    }

    /// Native handle registered for `id`.
    pub fn handle(&self, id: FunctionId) -> Option<u32> {
        self.handles.iter().find(|(i, _)| *i == id).map(|&(_, h)| h)
    }

    /// Identifier behind a native handle, if it belongs to this registry.
    pub fn id_of(&self, handle: u32) -> Option<FunctionId> {
        self.handles.iter().find(|(_, h)| *h == handle).map(|&(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vm::Facade;

    #[test]
    fn test_every_id_is_installed_once() {
        let mut vm = VM::new();
        let registry = Registry::install(&mut vm).unwrap();
        assert_eq!(registry.len(), FunctionId::ALL.len());
        for id in FunctionId::ALL {
            let handle = registry.handle(id).unwrap();
            assert_eq!(registry.id_of(handle), Some(id));
            assert_eq!(vm.native_name(handle), Some(id.name()));
        }
    }

    #[test]
    fn test_namespaces() {
        let mut vm = VM::new();
        Registry::install(&mut vm).unwrap();

        assert!(vm.get_global("select").is_native());
        assert!(vm.get_global("print").is_native());
        assert!(vm.get_global("sub").is_nil());
        assert!(vm.get_global("abs").is_nil());

        let math = vm.get_global("math");
        let key = vm.str_value("max");
        assert!(vm.raw_get(math, key).is_native());
        let key = vm.str_value("huge");
        assert_eq!(vm.raw_get(math, key), Value::number(f64::MAX));
        let key = vm.str_value("pi");
        assert_eq!(vm.raw_get(math, key), Value::number(std::f64::consts::PI));

        let string = vm.get_global("string");
        assert_eq!(string, Value::table(vm.string_methods));
        let key = vm.str_value("rep");
        assert!(vm.raw_get(string, key).is_native());
    }

    #[test]
    fn test_reinstall_replaces_entries() {
        let mut vm = VM::new();
        let first = Registry::install(&mut vm).unwrap();
        let second = Registry::install(&mut vm).unwrap();
        let select = second.handle(FunctionId::Select).unwrap();
        assert_ne!(first.handle(FunctionId::Select), Some(select));
        assert_eq!(vm.get_global("select"), Value::native(select));
    }

    #[test]
    fn test_direct_call_through_handle() {
        let mut vm = VM::new();
        let registry = Registry::install(&mut vm).unwrap();
        let rep = Value::native(registry.handle(FunctionId::Rep).unwrap());
        let s = vm.str_value("ab");
        let out = vm.invoke(rep, &[s, Value::int(3)]).unwrap();
        assert_eq!(vm.tostring_lossy(out[0]), "ababab");
    }
}
