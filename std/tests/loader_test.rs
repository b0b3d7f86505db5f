mod common;

use common::Harness;
use lunette_std::{load_file, load_string};
use memory::Value;
use std::fs;
use vm::{Facade, FsHost, LoadError};

#[test]
fn test_loadstring_compiles_and_runs() {
    let mut h = Harness::new();
    assert_eq!(h.eval("local f = loadstring('return 1 + 1') return f()"), ["2"]);
}

#[test]
fn test_loadstring_reports_syntax_errors() {
    let mut h = Harness::new();
    let out = h.eval("local f, msg = loadstring('x = = 1', '=bad') return f, msg");
    assert_eq!(out[0], "nil");
    assert!(out[1].starts_with("bad:1:"), "{}", out[1]);

    // Without a name the source text identifies the chunk.
    let out = h.eval("local f, msg = loadstring('x = = 1') return msg");
    assert!(out[0].starts_with("[string \"x = = 1\"]:1:"), "{}", out[0]);
}

#[test]
fn test_load_accumulates_reader_pieces() {
    let mut h = Harness::new();
    let src = "
        local parts = {'return ', '1+1'}
        local i = 0
        local f = load(function() i = i + 1 return parts[i] end, 'chunk')
        return f()
    ";
    assert_eq!(h.eval(src), ["2"]);
}

#[test]
fn test_load_stops_at_empty_piece() {
    let mut h = Harness::new();
    let src = "
        local parts = {'return 5', '', 'garbage'}
        local i = 0
        return load(function() i = i + 1 return parts[i] end)()
    ";
    assert_eq!(h.eval(src), ["5"]);
}

#[test]
fn test_load_rejects_non_function() {
    let mut h = Harness::new();
    assert_eq!(h.error("load(42)"), "not a function: 42");
}

#[test]
fn test_load_reader_failure_becomes_message() {
    let mut h = Harness::new();
    let out = h.eval("local f, msg = load(function() local t = nil return t.x end) return f, msg");
    assert_eq!(out[0], "nil");
    assert!(out[1].contains("attempt to index a nil value"), "{}", out[1]);
}

#[test]
fn test_swallowed_reader_error_leaves_no_location() {
    let mut h = Harness::new();
    let src = "local f = load(function() local t = nil return t.x end)\n\
               assert(f == nil)\n\
               local z = nil\n\
               return z.y";
    assert!(h.run(src).is_err());
    assert_eq!(
        h.vm.last_error_location,
        Some(("main chunk".to_string(), 4))
    );
}

#[test]
fn test_deeply_nested_source_fails_to_load() {
    let mut h = Harness::new();
    let out = h.eval(
        "local f, msg = loadstring(string.rep('(', 200000) .. '1' .. string.rep(')', 200000), '=deep')
         return f, msg",
    );
    assert_eq!(out, ["nil", "deep:1: chunk has too many syntax levels"]);
}

#[test]
fn test_deeply_nested_file_fails_to_load_and_closes() {
    let deep = format!("return {}{{}}{}", "{".repeat(5_000), "}".repeat(5_000));
    let mut h = Harness::with_files(&[("deep.lua", deep.as_str())], "");
    let out = h.eval("local f, msg = loadfile('deep.lua') return f, msg");
    assert_eq!(out, ["nil", "deep.lua:1: chunk has too many syntax levels"]);
    assert_eq!(h.closed(), ["deep.lua"]);
}

#[test]
fn test_dofile_runs_resource_and_closes_it() {
    let mut h = Harness::with_files(&[("lib.lua", "return 40 + 2, ...")], "");
    assert_eq!(h.eval("return dofile('lib.lua')"), ["42"]);
    assert_eq!(h.closed(), ["lib.lua"]);
}

#[test]
fn test_dofile_missing_file() {
    let mut h = Harness::new();
    assert_eq!(h.error("dofile('missing.lua')"), "file not found: missing.lua");
}

#[test]
fn test_dofile_syntax_error() {
    let mut h = Harness::with_files(&[("bad.lua", "return return")], "");
    let msg = h.error("dofile('bad.lua')");
    assert!(msg.starts_with("bad.lua:1:"), "{msg}");
    assert_eq!(h.closed(), ["bad.lua"]);
}

#[test]
fn test_loadfile_results() {
    let mut h = Harness::with_files(&[("ok.lua", "return 'ok'")], "");
    assert_eq!(h.eval("return loadfile('ok.lua')()"), ["ok"]);
    assert_eq!(
        h.eval("return loadfile('missing.lua')"),
        ["nil", "cannot open missing.lua"]
    );
}

#[test]
fn test_loadfile_reads_stdin_without_closing_it() {
    let mut h = Harness::with_files(&[], "return 7");
    assert_eq!(h.eval("return loadfile()()"), ["7"]);
    assert!(h.closed().is_empty());
}

#[test]
fn test_loaded_chunk_sees_globals() {
    let mut h = Harness::new();
    assert_eq!(
        h.eval("shared = 'yes' return loadstring('return shared')()"),
        ["yes"]
    );
}

#[test]
fn test_rust_api_distinguishes_failures() {
    let mut h = Harness::new();
    let err = load_file(&mut h.vm, Some("nowhere.lua")).unwrap_err();
    assert!(matches!(err, LoadError::NotFound(ref name) if name == "nowhere.lua"));

    let err = load_string(&mut h.vm, b"local = 1", "=inline").unwrap_err();
    assert!(matches!(err, LoadError::Syntax(_)));

    let closure = load_string(&mut h.vm, b"return 3", "=inline").unwrap();
    assert!(closure.is_closure());
}

#[test]
fn test_binary_chunk_loads_through_loadstring_path() {
    let mut h = Harness::new();
    let function = compiler::compile_chunk(&mut h.vm.heap, b"return 6 * 7", "=bin").unwrap();
    let mut bytes = Vec::new();
    vm::dump::dump_chunk(&h.vm.heap, function, &mut bytes).unwrap();
    assert!(bytes.starts_with(vm::SIGNATURE));

    let closure = load_string(&mut h.vm, &bytes, "=bin").unwrap();
    let results = h.vm.invoke(closure, &[]).unwrap();
    assert_eq!(results, vec![Value::int(42)]);
}

#[test]
fn test_dofile_from_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.lua"), "return dofile('b.lua') + 1").unwrap();
    fs::write(dir.path().join("b.lua"), "return 10").unwrap();

    let mut h = Harness::new();
    h.vm.set_host(Box::new(FsHost::new(dir.path())));
    assert_eq!(h.eval("return dofile('a.lua')"), ["11"]);

    let err = load_file(&mut h.vm, Some("c.lua")).unwrap_err();
    assert!(matches!(err, LoadError::NotFound(_)));
}
