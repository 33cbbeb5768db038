//! Rendering of inference errors against the function's source text.

use numjit_ast::build::*;
use numjit_ast::{Expr, FunctionDef};
use numjit_common::Span;
use numjit_types::Type;
use numjit_typeck::diagnostics::{diagnostic_json, error_code, render_diagnostic};
use numjit_typeck::{
    infer_function, DynamicResolver, ModuleAttr, NameKind, Namespace, Signature, TypeError,
    TypeckOptions,
};

// ── Helpers ────────────────────────────────────────────────────────────

struct NoGlobals;

impl Namespace for NoGlobals {
    fn lookup(&self, _name: &str) -> NameKind {
        NameKind::Global
    }

    fn module_attribute(&self, _module: &str, _attr: &str) -> Option<ModuleAttr> {
        None
    }
}

fn at(expr: Expr, start: u32, end: u32) -> Expr {
    Expr {
        span: Span::new(start, end),
        ..expr
    }
}

fn error_of(mut func: FunctionDef, args: Vec<Type>) -> TypeError {
    infer_function(
        &mut func,
        &Signature::new(args, None),
        &NoGlobals,
        &DynamicResolver,
        &TypeckOptions::default(),
    )
    .expect_err("inference should fail")
}

// ── Tests ──────────────────────────────────────────────────────────────

#[test]
fn test_unbound_local_report() {
    let source = "def f():\n    return y\n    y = 1\n";
    let func = function(
        "f",
        &[],
        vec![ret(Some(at(load("y"), 20, 21))), assign(store("y"), int(1))],
    );
    let err = error_of(func, vec![]);
    assert_eq!(error_code(&err), "E0013");

    let rendered = render_diagnostic(&err, source, "f.py");
    assert!(rendered.contains("E0013"), "{}", rendered);
    assert!(rendered.contains("local variable `y` referenced before assignment"));
    assert!(rendered.contains("read before any assignment"));
    assert!(rendered.contains("assign `y` before this point on every path"));
    assert!(!rendered.contains('\u{1b}'), "output must be colorless");
}

#[test]
fn test_unpack_arity_json() {
    let source = "def f():\n    a, b = 1, 2, 3\n";
    let func = function(
        "f",
        &[],
        vec![assign(
            tuple_store(vec![store("a"), store("b")]),
            at(tuple(vec![int(1), int(2), int(3)]), 20, 27),
        )],
    );
    let err = error_of(func, vec![]);
    let json = diagnostic_json(&err, source, "f.py");
    assert_eq!(json["code"], "E0003");
    assert_eq!(json["severity"], "error");
    assert_eq!(json["message"], "too many/few values to unpack, got (3, 2)");
    assert_eq!(json["line"], 2);
    assert_eq!(json["column"], 12);
    assert_eq!(json["fix"], "add 1 more target(s)");
}

#[test]
fn test_span_past_end_of_source_still_renders() {
    let err = TypeError::unsupported("`global` statement", Span::new(400, 410));
    let rendered = render_diagnostic(&err, "def f():\n    global g\n", "f.py");
    assert!(rendered.contains("unsupported: `global` statement"));
}
