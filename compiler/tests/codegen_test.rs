use compiler::{compile_chunk, CompilerError};
use memory::{Heap, UpvalueDesc, Value};
use vm::opcode::{instruction::*, OpCode};

fn compile(source: &str) -> (Heap, u32) {
    let mut heap = Heap::new();
    let main = compile_chunk(&mut heap, source.as_bytes(), "=test")
        .unwrap_or_else(|e| panic!("{source:?} failed to compile: {e}"));
    (heap, main)
}

fn opcodes(heap: &Heap, function: u32) -> Vec<OpCode> {
    heap.get_function(function)
        .unwrap()
        .chunk
        .iter()
        .map(|&inst| OpCode::from_u8(decode_opcode(inst)).unwrap())
        .collect()
}

#[test]
fn test_simple_arithmetic() {
    let (heap, main) = compile("return 1 + 2 * 3");
    assert_eq!(
        opcodes(&heap, main),
        [
            OpCode::LoadConst,
            OpCode::LoadConst,
            OpCode::LoadConst,
            OpCode::Mul,
            OpCode::Add,
            OpCode::Return,
            OpCode::Return,
        ]
    );
}

#[test]
fn test_main_chunk_shape() {
    let (heap, main) = compile("local a = 1");
    let f = heap.get_function(main).unwrap();
    assert_eq!(f.name, "main chunk");
    assert!(f.is_vararg);
    assert_eq!(f.arity, 0);
    assert_eq!(f.cell_count, 1);
    assert_eq!(f.line_info.len(), f.chunk.len());
}

#[test]
fn test_constants_are_deduplicated() {
    let (heap, main) = compile("local a, b, c = 1, 1, 'x' local d = 'x'");
    let f = heap.get_function(main).unwrap();
    assert_eq!(f.constants.len(), 2);
    assert_eq!(f.constants[0], Value::int(1));
}

#[test]
fn test_zero_and_negative_zero_stay_distinct() {
    let (heap, main) = compile("return 0.0, -0.0");
    let f = heap.get_function(main).unwrap();
    assert_eq!(f.constants.len(), 2);
}

#[test]
fn test_sibling_scopes_reuse_cells() {
    let (heap, main) = compile("do local a = 1 end do local b, c = 2, 3 end");
    assert_eq!(heap.get_function(main).unwrap().cell_count, 2);
}

#[test]
fn test_nested_prototypes_and_upvalues() {
    let src = "
        local x = 1
        local function outer()
            return function() return x end
        end
    ";
    let (heap, main) = compile(src);
    let main_fn = heap.get_function(main).unwrap();
    assert_eq!(main_fn.protos.len(), 1);

    let outer = heap.get_function(main_fn.protos[0]).unwrap();
    assert_eq!(outer.name, "outer");
    assert_eq!(outer.upvalue_info, vec![UpvalueDesc::ParentCell(0)]);

    let inner = heap.get_function(outer.protos[0]).unwrap();
    assert_eq!(inner.name, "function <test:4>");
    assert_eq!(inner.upvalue_info, vec![UpvalueDesc::ParentUpvalue(0)]);
}

#[test]
fn test_method_definition_prepends_self() {
    let (heap, main) = compile("local obj = {} function obj:get(a) return self end");
    let main_fn = heap.get_function(main).unwrap();
    let method = heap.get_function(main_fn.protos[0]).unwrap();
    assert_eq!(method.name, "obj:get");
    assert_eq!(method.arity, 2);
}

#[test]
fn test_call_operands() {
    let (heap, main) = compile("local function f(...) end f(1, 2) return f(...)");
    let f = heap.get_function(main).unwrap();
    let calls: Vec<u32> = f
        .chunk
        .iter()
        .copied()
        .filter(|&inst| decode_opcode(inst) == OpCode::Call.as_u8())
        .collect();
    assert_eq!(calls.len(), 2);
    // Statement call: two fixed arguments, no results.
    assert_eq!((decode_a(calls[0]), decode_b(calls[0]), decode_c(calls[0])), (2, 0, 1));
    // Returned call: open-ended arguments and results.
    assert_eq!((decode_a(calls[1]), decode_b(calls[1]), decode_c(calls[1])), (0, 1, 0));
}

#[test]
fn test_line_info_follows_statements() {
    let (heap, main) = compile("local a = 1\n\nlocal b = 2");
    let f = heap.get_function(main).unwrap();
    assert_eq!(f.line_info.first(), Some(&1));
    assert!(f.line_info.contains(&3));
}

#[test]
fn test_compile_errors() {
    let mut heap = Heap::new();
    let cases: [(&str, u32, &str); 4] = [
        ("break", 1, "no loop to break"),
        ("local function f()\n return ...\nend", 2, "outside a vararg function"),
        ("for k in pairs(t) do end", 1, "generic 'for' is not supported"),
        ("local a = 1\nlocal = 2", 2, ""),
    ];
    for (source, line, text) in cases {
        let err = compile_chunk(&mut heap, source.as_bytes(), "=e").unwrap_err();
        assert_eq!(err.line(), line, "{source:?}: {err}");
        assert!(err.to_string().contains(text), "{source:?}: {err}");
    }
}

#[test]
fn test_parse_errors_convert() {
    let mut heap = Heap::new();
    let err = compile_chunk(&mut heap, b"x = = 1", "=e").unwrap_err();
    assert!(matches!(err, CompilerError::Parse(_)));
}
