use lunette_parser::ast::{Expr, Stmt, TableField};
use lunette_parser::parse_chunk;
use proptest::prelude::*;

fn stmts(src: &str) -> Vec<Stmt> {
    parse_chunk(src.as_bytes()).expect("Failed to parse").block.stmts
}

#[test]
fn test_control_flow_statements() {
    let s = stmts(
        "if a then b() elseif c then d() else e() end
         while x do break end
         repeat y = y + 1 until y > 3
         for i = 1, 10, 2 do end
         do local z end",
    );
    assert_eq!(s.len(), 5);
    match &s[0] {
        Stmt::If { branches, else_block, .. } => {
            assert_eq!(branches.len(), 2);
            assert!(else_block.is_some());
        }
        other => panic!("expected if, got {other:?}"),
    }
    assert!(matches!(s[3], Stmt::NumericFor { step: Some(_), .. }));
}

#[test]
fn test_generic_for_parses() {
    assert!(matches!(
        stmts("for k, v in pairs(t) do end")[0],
        Stmt::GenericFor { .. }
    ));
}

#[test]
fn test_table_constructor_fields() {
    match &stmts("t = { 1, x = 2, [3] = 4; 5 }")[0] {
        Stmt::Assign { values, .. } => match &values[0] {
            Expr::Table { fields, .. } => {
                assert_eq!(fields.len(), 4);
                assert!(matches!(fields[0], TableField::Positional(_)));
                assert!(matches!(fields[1], TableField::Keyed { .. }));
                assert!(matches!(fields[2], TableField::Keyed { .. }));
            }
            other => panic!("expected table, got {other:?}"),
        },
        other => panic!("expected assignment, got {other:?}"),
    }
}

#[test]
fn test_vararg_function() {
    match &stmts("local f = function(a, ...) return ... end")[0] {
        Stmt::Local { values, .. } => match &values[0] {
            Expr::Function(body) => {
                assert!(body.is_vararg);
                assert_eq!(body.params, vec!["a"]);
            }
            other => panic!("expected function, got {other:?}"),
        },
        other => panic!("expected local, got {other:?}"),
    }
}

#[test]
fn test_paren_call_is_not_multi() {
    match &stmts("return (f())")[0] {
        Stmt::Return { values, .. } => assert!(!values[0].is_multi()),
        other => panic!("expected return, got {other:?}"),
    }
}

#[test]
fn test_error_location() {
    let err = parse_chunk(b"local x = 1\nlocal = 2").unwrap_err();
    assert_eq!(err.line, 2);
    assert!(err.to_string().starts_with("2:"), "{err}");
}

fn nested_parens(levels: usize) -> String {
    format!("return {}1{}", "(".repeat(levels), ")".repeat(levels))
}

#[test]
fn test_nesting_within_limit_parses() {
    assert_eq!(stmts(&nested_parens(150)).len(), 1);
}

#[test]
fn test_deep_parentheses_rejected() {
    let err = parse_chunk(nested_parens(100_000).as_bytes()).unwrap_err();
    assert_eq!(err.message, "chunk has too many syntax levels");
    assert_eq!(err.line, 1);
}

#[test]
fn test_deep_blocks_rejected() {
    let src = format!("{}{}", "do ".repeat(10_000), "end ".repeat(10_000));
    let err = parse_chunk(src.as_bytes()).unwrap_err();
    assert_eq!(err.message, "chunk has too many syntax levels");
}

#[test]
fn test_long_operator_chains_rejected() {
    let sum = format!("return 1{}", " + 1".repeat(100_000));
    let err = parse_chunk(sum.as_bytes()).unwrap_err();
    assert_eq!(err.message, "chunk has too many syntax levels");

    let fields = format!("return t{}", ".x".repeat(100_000));
    let err = parse_chunk(fields.as_bytes()).unwrap_err();
    assert_eq!(err.message, "chunk has too many syntax levels");

    // Short chains are untouched.
    assert_eq!(stmts(&format!("return 1{}", " + 1".repeat(100))).len(), 1);
}

proptest! {
    #[test]
    fn prop_integer_literals_survive(n in 0i64..i64::MAX) {
        let src = format!("return {n}");
        match &stmts(&src)[0] {
            Stmt::Return { values, .. } => match values[0] {
                Expr::Int { value, .. } => prop_assert_eq!(value, n),
                ref other => prop_assert!(false, "expected int, got {:?}", other),
            },
            other => prop_assert!(false, "expected return, got {:?}", other),
        }
    }

    #[test]
    fn prop_plain_strings_survive(s in "[a-zA-Z0-9 ]{0,32}") {
        let src = format!("return '{s}'");
        match &stmts(&src)[0] {
            Stmt::Return { values, .. } => match &values[0] {
                Expr::Str { value, .. } => prop_assert_eq!(value.as_slice(), s.as_bytes()),
                other => prop_assert!(false, "expected string, got {:?}", other),
            },
            other => prop_assert!(false, "expected return, got {:?}", other),
        }
    }
}
