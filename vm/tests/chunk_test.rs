use compiler::{compile_chunk, ChunkCompiler};
use memory::Value;
use proptest::prelude::*;
use std::io::Cursor;
use vm::dump::dump_chunk;
use vm::{LoadError, VM, SIGNATURE};

fn dumped(source: &str) -> Vec<u8> {
    let mut vm = VM::new();
    let main = compile_chunk(&mut vm.heap, source.as_bytes(), "=src").unwrap();
    let mut out = Vec::new();
    dump_chunk(&vm.heap, main, &mut out).unwrap();
    out
}

#[test]
fn test_binary_chunk_runs_without_compiler() {
    let bytes = dumped(
        "local function add(a, b) return a + b end
         local s = 'x' .. 'y'
         return add(2, 3), s, 1.5, nil, true",
    );
    assert!(bytes.starts_with(SIGNATURE));

    // No source compiler installed in this VM.
    let mut vm = VM::new();
    let main = vm.decode_chunk(&mut Cursor::new(bytes), "=bin").unwrap();
    let results = vm.run_main(main).unwrap();
    assert_eq!(results[0], Value::int(5));
    assert_eq!(vm.tostring_lossy(results[1]), "xy");
    assert_eq!(results[2], Value::number(1.5));
    assert_eq!(results[3], Value::nil());
    assert_eq!(results[4], Value::true_val());
}

#[test]
fn test_binary_chunk_keeps_closures_and_lines() {
    let bytes = dumped("local n = 0\nlocal function bump()\n  n = n + 1\n  return n\nend\nbump()\nreturn bump()");
    let mut vm = VM::new();
    let main = vm.decode_bytes(&bytes, "=bin").unwrap();
    assert_eq!(vm.run_main(main).unwrap(), vec![Value::int(2)]);

    let bytes = dumped("\nreturn nil + 1");
    let main = vm.decode_bytes(&bytes, "=bin").unwrap();
    assert!(vm.run_main(main).is_err());
    assert_eq!(vm.last_error_location, Some(("main chunk".to_string(), 2)));
}

#[test]
fn test_source_goes_to_compiler() {
    let mut vm = VM::new();
    vm.set_compiler(Box::new(ChunkCompiler));
    let main = vm.decode_bytes(b"return 'src'", "=s").unwrap();
    let results = vm.run_main(main).unwrap();
    assert_eq!(vm.tostring_lossy(results[0]), "src");
}

#[test]
fn test_syntax_error_is_rendered_with_chunk_and_line() {
    let mut vm = VM::new();
    vm.set_compiler(Box::new(ChunkCompiler));
    let err = vm.decode_bytes(b"local x = 1\nx = = 2", "@script.lua").unwrap_err();
    match err {
        LoadError::Syntax(msg) => assert!(msg.starts_with("script.lua:2:"), "{msg}"),
        other => panic!("expected a syntax error, got {other}"),
    }
}

#[test]
fn test_missing_tail_rejected() {
    let mut bytes = dumped("return 1");
    // Drop the nested prototype count at the very end.
    let len = bytes.len();
    let mut vm = VM::new();
    bytes.truncate(len - 4);
    let err = vm.decode_bytes(&bytes, "=bin").unwrap_err();
    assert!(matches!(err, LoadError::Format(_)), "{err}");
}

proptest! {
    #[test]
    fn truncated_chunks_never_panic(cut in 0usize..64) {
        let bytes = dumped("local t = {1, 2, 'three'} return #t");
        let cut = cut.min(bytes.len().saturating_sub(1));
        let mut vm = VM::new();
        prop_assert!(vm.decode_bytes(&bytes[..cut], "=bin").is_err());
    }
}
