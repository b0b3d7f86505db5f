use compiler::ChunkCompiler;
use vm::VM;

/// Run `source` (expected to fail) and return where the VM says it failed.
fn failure_location(source: &str) -> Option<(String, u32)> {
    let mut vm = VM::new();
    vm.set_compiler(Box::new(ChunkCompiler));
    let main = vm.decode_bytes(source.as_bytes(), "=test").unwrap();
    assert!(vm.run_main(main).is_err(), "{source:?} should fail");
    vm.last_error_location.clone()
}

#[test]
fn test_error_in_main_chunk() {
    let loc = failure_location("local a = 1\nlocal t = nil\nreturn t.x");
    assert_eq!(loc, Some(("main chunk".to_string(), 3)));
}

#[test]
fn test_innermost_function_is_reported() {
    let src = "local function inner()\n  return nil + 1\nend\nlocal function outer()\n  return inner()\nend\nouter()";
    assert_eq!(failure_location(src), Some(("inner".to_string(), 2)));
}

#[test]
fn test_anonymous_function_name() {
    let src = "local f = function()\n  return #nil\nend\nf()";
    assert_eq!(
        failure_location(src),
        Some(("function <test:1>".to_string(), 2))
    );
}

#[test]
fn test_location_resets_between_runs() {
    let mut vm = VM::new();
    vm.set_compiler(Box::new(ChunkCompiler));
    let bad = vm.decode_bytes(b"\n\nreturn nil .. 1", "=bad").unwrap();
    assert!(vm.run_main(bad).is_err());
    assert_eq!(vm.last_error_location.as_ref().map(|l| l.1), Some(3));

    let good = vm.decode_bytes(b"return 1", "=good").unwrap();
    vm.run_main(good).unwrap();
    assert_eq!(vm.last_error_location, None);
}
