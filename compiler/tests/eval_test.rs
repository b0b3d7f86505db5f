use compiler::ChunkCompiler;
use memory::Value;
use proptest::prelude::*;
use vm::VM;

fn eval(source: &str) -> Value {
    let mut vm = VM::new();
    vm.set_compiler(Box::new(ChunkCompiler));
    let main = vm.decode_bytes(source.as_bytes(), "=prop").unwrap();
    vm.run_main(main).unwrap()[0]
}

#[test]
fn test_and_or_keep_operand_values() {
    assert_eq!(eval("return 1 and nil"), Value::nil());
    assert_eq!(eval("return false or 'x' and 3"), Value::int(3));
    assert_eq!(eval("local t = {} return t.missing or 7"), Value::int(7));
}

#[test]
fn test_nested_upvalue_chain() {
    let src = "
        local a = 1
        local function f()
            local function g()
                local function h() a = a + 1 return a end
                return h()
            end
            return g()
        end
        f()
        return f() + a
    ";
    assert_eq!(eval(src), Value::int(6));
}

#[test]
fn test_shadowing_in_nested_blocks() {
    let src = "
        local x = 1
        do
            local x = x + 1
            if x == 2 then x = 20 end
        end
        return x
    ";
    assert_eq!(eval(src), Value::int(1));
}

#[test]
fn test_deepest_accepted_nesting_compiles() {
    let parens = format!("return {}1{}", "(".repeat(190), ")".repeat(190));
    assert_eq!(eval(&parens), Value::int(1));

    let sum = format!("return 1{}", " + 1".repeat(190));
    assert_eq!(eval(&sum), Value::int(191));

    let tables = format!("local t = {}1{} return 1", "{".repeat(190), "}".repeat(190));
    assert_eq!(eval(&tables), Value::int(1));
}

#[test]
fn test_too_deep_source_is_a_syntax_error() {
    let mut vm = VM::new();
    vm.set_compiler(Box::new(ChunkCompiler));
    let src = format!("return {}1{}", "(".repeat(50_000), ")".repeat(50_000));
    let err = vm.decode_bytes(src.as_bytes(), "=deep").unwrap_err();
    assert_eq!(err.to_string(), "deep:1: chunk has too many syntax levels");
}

proptest! {
    #[test]
    fn integer_expressions_match_host(a in -1000i64..1000, b in -1000i64..1000, c in 1i64..100) {
        let src = format!("local a, b, c = {a}, {b}, {c} return a * b - c + a % c");
        prop_assert_eq!(eval(&src), Value::int(a * b - c + a.rem_euclid(c)));
    }

    #[test]
    fn comparisons_match_host(a in -50i64..50, b in -50i64..50) {
        let src = format!("return {a} < {b}, {a} <= {b}, {a} == {b}");
        let mut vm = VM::new();
        vm.set_compiler(Box::new(ChunkCompiler));
        let main = vm.decode_bytes(src.as_bytes(), "=prop").unwrap();
        let out = vm.run_main(main).unwrap();
        prop_assert_eq!(out, vec![Value::bool(a < b), Value::bool(a <= b), Value::bool(a == b)]);
    }
}
