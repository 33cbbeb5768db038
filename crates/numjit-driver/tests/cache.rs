//! The specialization cache: one compilation per key, on-demand callee
//! compilation, and the host fallbacks for recursion and failed callees.

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use numjit_ast::build::*;
use numjit_ast::printer::print_function;
use numjit_ast::{BinOp, CmpOp, FunctionDef, Stmt, StmtKind};
use numjit_common::Span;
use numjit_driver::{CompileError, FunctionCache, ModuleNamespace};
use numjit_typeck::{ModuleAttr, NameKind, Namespace, Signature, TypeError, TypeckOptions};
use numjit_types::Type;

// ── Helpers ────────────────────────────────────────────────────────────

fn cache() -> FunctionCache {
    FunctionCache::new(ModuleNamespace::default(), TypeckOptions::default())
}

/// `def square(x): return x * x`
fn square() -> FunctionDef {
    function(
        "square",
        &["x"],
        vec![ret(Some(binop(load("x"), BinOp::Mult, load("x"))))],
    )
}

/// `def <name>(y): return <callee>(y)`
fn forwarding(name: &str, callee: &str) -> FunctionDef {
    function(
        name,
        &["y"],
        vec![ret(Some(call(load(callee), vec![load("y")])))],
    )
}

/// Delays every name lookup so that concurrent compilations overlap.
struct SlowNamespace(ModuleNamespace);

impl Namespace for SlowNamespace {
    fn lookup(&self, name: &str) -> NameKind {
        thread::sleep(Duration::from_millis(200));
        self.0.lookup(name)
    }

    fn module_attribute(&self, module: &str, attr: &str) -> Option<ModuleAttr> {
        self.0.module_attribute(module, attr)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────

#[test]
fn test_second_request_hits_the_cache() {
    let cache = cache();
    cache.register(square());

    let first = cache.compile("square", &[Type::float64()]).unwrap();
    let second = cache.compile("square", &[Type::float64()]).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.compile_count(), 1);
    assert_eq!(first.signature.to_string(), "(float64) -> float64");
}

#[test]
fn test_concurrent_requests_share_one_compilation() {
    let cache = cache();
    cache.register(square());

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| cache.compile("square", &[Type::float64()]).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(cache.compile_count(), 1);
    for result in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], result));
    }
}

#[test]
fn test_each_argument_tuple_is_its_own_specialization() {
    let cache = cache();
    cache.register(square());

    let float = cache.compile("square", &[Type::float64()]).unwrap();
    let int = cache.compile("square", &[Type::int64()]).unwrap();
    assert_eq!(cache.compile_count(), 2);
    assert_eq!(int.signature.ret, Type::int64());
    assert_ne!(float.symbol(), int.symbol());
}

#[test]
fn test_callee_is_compiled_on_demand() {
    let cache = cache();
    cache.register(square());
    cache.register(forwarding("f", "square"));

    let f = cache.compile("f", &[Type::float64()]).unwrap();
    assert_eq!(f.signature.ret, Type::float64());
    assert!(print_function(&f.func).contains("@square__float64(y)"));
    assert_eq!(cache.compile_count(), 2);

    // The callee's specialization is now cached for direct use too.
    cache.compile("square", &[Type::float64()]).unwrap();
    assert_eq!(cache.compile_count(), 2);
}

#[test]
fn test_recursive_call_goes_through_the_host() {
    // def fact(n):
    //     if n < 1:
    //         return 1
    //     return n * fact(n - 1)
    let fact = function(
        "fact",
        &["n"],
        vec![
            if_(
                compare(load("n"), CmpOp::Lt, int(1)),
                vec![ret(Some(int(1)))],
                vec![],
            ),
            ret(Some(binop(
                load("n"),
                BinOp::Mult,
                call(load("fact"), vec![binop(load("n"), BinOp::Sub, int(1))]),
            ))),
        ],
    );
    let cache = cache();
    cache.register(fact);

    let compiled = cache.compile("fact", &[Type::int64()]).unwrap();
    let printed = print_function(&compiled.func);
    assert!(printed.contains("py:"), "{}", printed);
    assert!(!printed.contains("@fact"), "{}", printed);
    assert_eq!(compiled.signature.ret, Type::Object);
    assert_eq!(cache.compile_count(), 1);
}

#[test]
fn test_failing_callee_falls_back_and_its_error_is_cached() {
    let bad = function(
        "bad",
        &["x"],
        vec![
            Stmt::new(
                StmtKind::Global {
                    names: vec!["g".to_string()],
                },
                Span::synthetic(),
            ),
            ret(Some(load("x"))),
        ],
    );
    let cache = cache();
    cache.register(bad);
    cache.register(forwarding("f", "bad"));

    let f = cache.compile("f", &[Type::float64()]).unwrap();
    assert_eq!(f.signature.ret, Type::Object);
    assert_eq!(cache.compile_count(), 2);

    let err = cache.compile("bad", &[Type::float64()]).unwrap_err();
    assert!(matches!(err, CompileError::Type(TypeError::Unsupported { .. })));
    assert_eq!(cache.compile_count(), 2);
}

#[test]
fn test_redefinition_discards_old_specializations() {
    let cache = cache();
    cache.register(square());
    let old = cache.compile("square", &[Type::float64()]).unwrap();

    cache.register(function(
        "square",
        &["x"],
        vec![ret(Some(binop(load("x"), BinOp::Add, load("x"))))],
    ));
    let new = cache.compile("square", &[Type::float64()]).unwrap();

    assert!(!Arc::ptr_eq(&old, &new));
    assert_eq!(cache.compile_count(), 2);
    assert!(print_function(&new.func).contains("(x + x)"));
}

#[test]
fn test_unknown_function() {
    let err = cache().compile("nope", &[]).unwrap_err();
    assert_eq!(err, CompileError::UnknownFunction("nope".to_string()));
    assert_eq!(err.to_string(), "no function named `nope`");
}

#[test]
fn test_declared_return_type_coerces_the_result() {
    let cache = cache();
    cache.register(function("f", &["x"], vec![ret(Some(load("x")))]));

    let compiled = cache
        .compile_declared("f", &Signature::new(vec![Type::int32()], Some(Type::float64())))
        .unwrap();
    assert_eq!(compiled.signature.to_string(), "(int32) -> float64");
    assert!(print_function(&compiled.func).contains("return coerce<float64>(x)"));
}

#[test]
fn test_mixed_float_returns_widen() {
    // def pick(a, b, c):
    //     if c:
    //         return a
    //     return b
    let cache = cache();
    cache.register(function(
        "pick",
        &["a", "b", "c"],
        vec![
            if_(load("c"), vec![ret(Some(load("a")))], vec![]),
            ret(Some(load("b"))),
        ],
    ));

    let compiled = cache
        .compile("pick", &[Type::float32(), Type::float64(), Type::Bool])
        .unwrap();
    assert_eq!(compiled.signature.ret, Type::float64());
    let printed = print_function(&compiled.func);
    assert!(printed.contains("return coerce<float64>(a)"), "{}", printed);
    assert!(printed.contains("return b"), "{}", printed);
}

#[test]
fn test_mutual_recursion_across_threads_does_not_deadlock() {
    // def f(y): return g(y)
    // def g(y): return f(y)
    // compiled from two threads at once: each owns one key and asks for
    // the other's.
    let cache = Arc::new(FunctionCache::new(
        SlowNamespace(ModuleNamespace::default()),
        TypeckOptions::default(),
    ));
    cache.register(forwarding("f", "g"));
    cache.register(forwarding("g", "f"));

    let (tx, rx) = mpsc::channel();
    for name in ["f", "g"] {
        let cache = Arc::clone(&cache);
        let tx = tx.clone();
        thread::spawn(move || {
            let result = cache.compile(name, &[Type::float64()]);
            tx.send((name, result)).unwrap();
        });
    }

    for _ in 0..2 {
        let (name, result) = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("compilation deadlocked");
        assert!(result.is_ok(), "`{}` failed: {:?}", name, result);
    }
    assert_eq!(cache.compile_count(), 2);
}
