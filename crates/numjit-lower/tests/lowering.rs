//! Lowering of fully typed functions: the inference passes followed by
//! iterable lowering and specialization.

use std::collections::HashMap;

use numjit_ast::build::*;
use numjit_ast::printer::print_function;
use numjit_ast::{BinOp, Expr, ExprKind, FunctionDef, Stmt, StmtKind};
use numjit_lower::{lower_iterables, specialize};
use numjit_types::{Constant, Type};
use numjit_typeck::{
    infer_function, set_types, DynamicResolver, ModuleAttr, NameKind, Namespace, Signature,
    TypeckOptions,
};

// ── Helpers ────────────────────────────────────────────────────────────

struct Builtins;

impl Namespace for Builtins {
    fn lookup(&self, name: &str) -> NameKind {
        match name {
            "range" | "len" => NameKind::Builtin,
            "np" => NameKind::Module {
                name: "numpy".to_string(),
                is_numpy: true,
            },
            _ => NameKind::Global,
        }
    }

    fn module_attribute(&self, module: &str, attr: &str) -> Option<ModuleAttr> {
        match (module, attr) {
            ("numpy", "zeros_like") => Some(ModuleAttr::Function),
            _ => None,
        }
    }
}

fn lower(func: &mut FunctionDef, args: Vec<Type>) {
    let options = TypeckOptions::default();
    let inferred = infer_function(
        func,
        &Signature::new(args, None),
        &Builtins,
        &DynamicResolver,
        &options,
    )
    .expect("inference should succeed");
    set_types(func, &inferred.symtab).expect("type setting should succeed");
    lower_iterables(func, &inferred.symtab, &options.index_type).expect("iterable lowering");
    specialize(func, &inferred.signature, &inferred.symtab).expect("specialization");
}

/// `s = 0.0; for x in <iter>: s += x; return s`
fn summing_loop(name: &str, args: &[&str], iter: Expr) -> FunctionDef {
    function(
        name,
        args,
        vec![
            assign(store("s"), float(0.0)),
            for_in(
                store("x"),
                iter,
                vec![aug_assign(store("s"), BinOp::Add, load("x"))],
            ),
            ret(Some(load("s"))),
        ],
    )
}

/// Values a lowered function computes with.
#[derive(Clone, Debug, PartialEq)]
enum Value {
    Int(i64),
    Float(f64),
    Array(Vec<f64>),
    Shape(Vec<i64>),
}

impl Value {
    fn as_int(&self) -> i64 {
        match self {
            Value::Int(v) => *v,
            Value::Float(v) => *v as i64,
            other => panic!("not a number: {:?}", other),
        }
    }

    fn as_float(&self) -> f64 {
        match self {
            Value::Int(v) => *v as f64,
            Value::Float(v) => *v,
            other => panic!("not a number: {:?}", other),
        }
    }
}

/// A tiny interpreter for the lowered subset used here. Every value
/// stored into `x` is recorded in `trace`.
#[derive(Default)]
struct Eval {
    names: HashMap<String, Value>,
    temps: HashMap<u32, Value>,
    trace: Vec<f64>,
}

impl Eval {
    fn run(&mut self, body: &[Stmt]) -> Option<Value> {
        for stmt in body {
            match &stmt.kind {
                StmtKind::Assign { targets, value } => {
                    let value = self.expr(value);
                    self.store(&targets[0], value);
                }
                StmtKind::For {
                    iter, body, index, ..
                } => {
                    let ExprKind::Range { start, stop, step } = &iter.kind else {
                        panic!("loop was not lowered: {:?}", iter.kind);
                    };
                    let (start, stop, step) = (
                        self.expr(start).as_int(),
                        self.expr(stop).as_int(),
                        self.expr(step).as_int(),
                    );
                    let index = index.as_ref().expect("lowered loops carry an index");
                    let mut i = start;
                    while i < stop {
                        self.store(index, Value::Int(i));
                        if let Some(value) = self.run(body) {
                            return Some(value);
                        }
                        i += step;
                    }
                }
                StmtKind::Return { value } => return value.as_ref().map(|v| self.expr(v)),
                other => panic!("unexpected statement {:?}", other),
            }
        }
        None
    }

    fn store(&mut self, target: &Expr, value: Value) {
        match &target.kind {
            ExprKind::Name { id, .. } => {
                if id == "x" {
                    self.trace.push(value.as_float());
                }
                self.names.insert(id.clone(), value);
            }
            ExprKind::Temp { id, .. } => {
                self.temps.insert(id.0, value);
            }
            other => panic!("unexpected store target {:?}", other),
        }
    }

    fn expr(&mut self, expr: &Expr) -> Value {
        match &expr.kind {
            ExprKind::Const(Constant::Int(v)) => Value::Int(*v),
            ExprKind::Const(Constant::Float(v)) => Value::Float(*v),
            ExprKind::Name { id, .. } => self.names[id].clone(),
            ExprKind::Temp { id, .. } => self.temps[&id.0].clone(),
            ExprKind::Coercion { node, target } => {
                let value = self.expr(node);
                match target {
                    Type::Float { .. } => Value::Float(value.as_float()),
                    Type::Int { .. } => Value::Int(value.as_int()),
                    _ => value,
                }
            }
            ExprKind::BinOp {
                left,
                op: BinOp::Add,
                right,
            } => Value::Float(self.expr(left).as_float() + self.expr(right).as_float()),
            ExprKind::DataPointer(array) => self.expr(array),
            ExprKind::ArrayAttribute { array, .. } => match self.expr(array) {
                Value::Array(items) => Value::Shape(vec![items.len() as i64]),
                other => panic!("not an array: {:?}", other),
            },
            ExprKind::Subscript { value, slice, .. } => {
                let i = self.expr(slice).as_int() as usize;
                match self.expr(value) {
                    Value::Array(items) => Value::Float(items[i]),
                    Value::Shape(dims) => Value::Int(dims[i]),
                    other => panic!("cannot index {:?}", other),
                }
            }
            other => panic!("unexpected expression {:?}", other),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────

#[test]
fn test_array_sum_lowers_to_counted_loop() {
    let mut func = summing_loop("total", &["xs"], load("xs"));
    lower(&mut func, vec![Type::array(Type::float64(), 1)]);
    insta::assert_snapshot!(print_function(&func), @r"
    def total(xs):
        # $t0: int64 (index)
        # on error: return NaN
        s = 0.0
        for x in range(0, xs.shape[0], 1):  # index $t0
            x = data(xs)[$t0]
            s = (s + x)
        return s
    ");
}

#[test]
fn test_computed_iterable_is_evaluated_once() {
    let mut func = summing_loop("first_row", &["a"], index(load("a"), int(0)));
    lower(&mut func, vec![Type::array(Type::float64(), 2)]);
    insta::assert_snapshot!(print_function(&func), @r"
    def first_row(a):
        # $t0: float64[:] (array)
        # $t1: int64 (index)
        # on error: return NaN
        s = 0.0
        $t0 = data(a)[0, :]
        for x in range(0, $t0.shape[0], 1):  # index $t1
            x = data($t0)[$t1]
            s = (s + x)
        return s
    ");
}

#[test]
fn test_array_iteration_visits_every_element_in_order() {
    for n in [0usize, 1, 2, 7] {
        let mut func = summing_loop("total", &["xs"], load("xs"));
        lower(&mut func, vec![Type::array(Type::float64(), 1)]);

        let items: Vec<f64> = (0..n).map(|i| (i as f64) * 1.5 + 1.0).collect();
        let mut eval = Eval::default();
        eval.names.insert("xs".to_string(), Value::Array(items.clone()));
        let result = eval.run(&func.body);

        assert_eq!(eval.trace, items, "n = {}", n);
        assert_eq!(result, Some(Value::Float(items.iter().sum())));
    }
}

#[test]
fn test_int_array_elements_are_coerced_to_the_target() {
    let mut func = function(
        "f",
        &["xs"],
        vec![
            assign(store("x"), float(0.0)),
            for_in(store("x"), load("xs"), vec![]),
        ],
    );
    lower(&mut func, vec![Type::array(Type::int32(), 1)]);
    assert!(print_function(&func).contains("x = coerce<float64>(data(xs)[$t0])"));

    let mut eval = Eval::default();
    eval.names.insert("xs".to_string(), Value::Array(vec![3.0, 4.0]));
    eval.run(&func.body);
    assert_eq!(eval.trace, vec![0.0, 3.0, 4.0]);
}

#[test]
fn test_nested_loops_are_lowered() {
    let inner = for_in(store("y"), load("ys"), vec![]);
    let mut func = function(
        "f",
        &["xs", "ys"],
        vec![for_in(
            store("x"),
            load("xs"),
            vec![if_(load("x"), vec![inner], vec![])],
        )],
    );
    let arr = Type::array(Type::Bool, 1);
    lower(&mut func, vec![arr.clone(), arr]);
    assert_eq!(func.temps.len(), 2);
    let printed = print_function(&func);
    assert!(printed.contains("for y in range(0, ys.shape[0], 1):  # index $t0"));
    assert!(printed.contains("for x in range(0, xs.shape[0], 1):  # index $t1"));
}

#[test]
fn test_object_call_gets_a_temporary() {
    let mut func = function(
        "f",
        &["g", "x"],
        vec![ret(Some(call(load("g"), vec![load("x")])))],
    );
    lower(&mut func, vec![Type::Object, Type::int64()]);
    insta::assert_snapshot!(print_function(&func), @r"
    def f(g, x):
        # $t0: object (object)
        # on error: return NULL
        return obj#0(py:g(coerce<object>(x)))
    ");
}

#[test]
fn test_object_temporary_keeps_the_inferred_array_type() {
    // def f(a):
    //     x = np.zeros_like(a)
    //     return x
    let mut func = function(
        "f",
        &["a"],
        vec![
            assign(
                store("x"),
                call(attr(load("np"), "zeros_like"), vec![load("a")]),
            ),
            ret(Some(load("x"))),
        ],
    );
    lower(&mut func, vec![Type::array(Type::float64(), 2)]);

    let StmtKind::Assign { targets, value } = &func.body[0].kind else {
        panic!("expected an assignment, got {:?}", func.body[0].kind);
    };
    assert!(matches!(value.kind, ExprKind::ObjectTemp { .. }));
    assert_eq!(targets[0].ty, Some(Type::array(Type::float64(), 2)));
    assert_eq!(value.ty, targets[0].ty);
    assert_eq!(func.temps[0].ty, Type::Object);
}

#[test]
fn test_mixed_tuple_is_wrapped_without_packing() {
    let mut func = function(
        "f",
        &["x", "o"],
        vec![ret(Some(tuple(vec![load("x"), load("o")])))],
    );
    lower(&mut func, vec![Type::int64(), Type::Object]);
    let StmtKind::Return { value: Some(value) } = &func.body[0].kind else {
        panic!("expected a return");
    };
    assert!(matches!(
        value.kind,
        ExprKind::ObjectTemp { id: Some(_), ref node } if matches!(node.kind, ExprKind::Tuple { .. })
    ));
}
