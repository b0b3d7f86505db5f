mod common;

use common::Harness;
use lunette_std::FunctionId;
use memory::Value;
use proptest::prelude::*;
use vm::Facade;

#[test]
fn test_sub_examples() {
    let mut h = Harness::new();
    assert_eq!(
        h.eval(
            "local s = 'hello' \
             return string.sub(s, 2), s:sub(-3), string.sub(s, 2, -2), string.sub(s, 10)"
        ),
        ["ello", "llo", "ell", ""]
    );
    assert_eq!(h.eval("return string.sub(12345, 2, 3)"), ["23"]);
}

#[test]
fn test_rep_examples() {
    let mut h = Harness::new();
    assert_eq!(
        h.eval("return string.rep('ab', 3), string.rep('x', 0), string.rep('x', -1)"),
        ["ababab", "", "nil"]
    );
    assert_eq!(h.eval("local s = '-' return s:rep(4)"), ["----"]);
}

#[test]
fn test_string_argument_errors() {
    let mut h = Harness::new();
    let msg = h.error("string.sub({}, 1)");
    assert_eq!(msg, "bad argument #1 to 'sub' (string expected, got table)");
    let msg = h.error("string.rep('x')");
    assert_eq!(msg, "bad argument #2 to 'rep' (number expected, got no value)");
}

#[test]
fn test_math_functions() {
    let mut h = Harness::new();
    assert_eq!(
        h.eval(
            "return math.abs(-3), math.abs(2.5), math.max(1, 5, 3), math.min(4, 2, 8), \
             math.modf(-3.7)"
        ),
        ["3", "2.5", "5", "2", "-3", "-0.7"]
    );
    assert_eq!(h.eval("return math.sin(0), math.sin('0')"), ["0", "0"]);
    assert_eq!(h.eval("return math.max('a', 'b')"), ["b"]);
    assert_eq!(h.eval("return math.pi"), ["3.1415926535898"]);
    assert_eq!(h.eval("return math.huge > 1e308"), ["true"]);
}

#[test]
fn test_math_errors() {
    let mut h = Harness::new();
    assert_eq!(
        h.error("math.max()"),
        "bad argument #1 to 'max' (number expected, got no value)"
    );
    assert_eq!(
        h.error("math.sin({})"),
        "bad argument #1 to 'sin' (number expected, got table)"
    );
    assert!(h.error("math.min(1, 'x')").contains("attempt to compare"));
}

#[test]
fn test_modf_results_are_floats() {
    let mut h = Harness::new();
    let values = h.run("return math.modf(5)").unwrap();
    assert_eq!(values, vec![Value::number(5.0), Value::number(0.0)]);
}

proptest! {
    #[test]
    fn rep_length_is_product(s in "[a-z]{0,5}", n in 0i64..20) {
        let mut h = Harness::new();
        let rep = Value::native(h.registry.handle(FunctionId::Rep).unwrap());
        let arg = h.vm.str_value(&s);
        let out = h.vm.invoke(rep, &[arg, Value::int(n)]).unwrap();
        prop_assert_eq!(h.vm.tostring_lossy(out[0]), s.repeat(n as usize));
    }

    #[test]
    fn sub_agrees_with_byte_slicing(s in "[a-z]{0,12}", i in -20i64..20, j in -20i64..20) {
        let mut h = Harness::new();
        let sub = Value::native(h.registry.handle(FunctionId::Sub).unwrap());
        let arg = h.vm.str_value(&s);
        let out = h.vm.invoke(sub, &[arg, Value::int(i), Value::int(j)]).unwrap();
        let (start, end) = lunette_std::string::normalize_range(s.len(), i, j);
        prop_assert_eq!(h.vm.tostring_lossy(out[0]), &s[start..end]);
    }
}
