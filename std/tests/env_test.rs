mod common;

use common::Harness;
use vm::RuntimeError;

#[test]
fn test_setfenv_on_running_caller() {
    let mut h = Harness::new();
    let src = "
        local t = {x = 5}
        local function f()
            setfenv(1, t)
            return x
        end
        x = 1
        return f(), x
    ";
    assert_eq!(h.eval(src), ["5", "1"]);
}

#[test]
fn test_setfenv_on_closure() {
    let mut h = Harness::new();
    let src = "
        local function g() return y end
        y = 'global'
        setfenv(g, {y = 'local'})
        return g(), y
    ";
    assert_eq!(h.eval(src), ["local", "global"]);
}

#[test]
fn test_setfenv_returns_target() {
    let mut h = Harness::new();
    assert_eq!(
        h.eval("local function g() end return setfenv(g, {}) == g"),
        ["true"]
    );
}

#[test]
fn test_setfenv_without_table_returns_nothing() {
    let mut h = Harness::new();
    assert_eq!(
        h.eval("local function g() end return select('#', setfenv(g, 5))"),
        ["0"]
    );
    assert_eq!(h.eval("return select('#', setfenv(50, {}))"), ["0"]);
}

#[test]
fn test_setfenv_reaches_outer_frame() {
    let mut h = Harness::new();
    let src = "
        local t = {v = 't'}
        local function inner() setfenv(2, t) end
        local function outer()
            inner()
            return v
        end
        v = 'g'
        return outer()
    ";
    assert_eq!(h.eval(src), ["t"]);
}

#[test]
fn test_new_closures_inherit_swapped_environment() {
    let mut h = Harness::new();
    let src = "
        local function make()
            setfenv(1, {k = 'env'})
            return function() return k end
        end
        k = 'g'
        return make()()
    ";
    assert_eq!(h.eval(src), ["env"]);
}

#[test]
fn test_setfenv_level_zero_is_unsupported() {
    let mut h = Harness::new();
    assert!(matches!(
        h.run("setfenv(0, {})"),
        Err(RuntimeError::Unsupported(_))
    ));
}

#[test]
fn test_setfenv_bad_arguments() {
    let mut h = Harness::new();
    let msg = h.error("setfenv(-1, {})");
    assert!(msg.starts_with("bad argument #1 to 'setfenv'"), "{msg}");
    let msg = h.error("setfenv(true, {})");
    assert!(msg.contains("function or number expected, got boolean"), "{msg}");
}
