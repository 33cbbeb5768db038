//! AST specialization.
//!
//! The last pass before code generation. It decides representation:
//! every expression producing a new boxed object is wrapped in an
//! `ObjectTemp` with a slot in the function's temporary table, so the
//! backend can release it on every exit path. It also rewrites tuple
//! literals and `print` into runtime calls, marks array subscripts as
//! data-pointer accesses, and installs the value returned when the
//! function bails out with a host exception set.

use numjit_ast::{ErrorReturn, Expr, ExprContext, ExprKind, FunctionDef, Stmt, StmtKind, TempKind};
use numjit_common::Span;
use numjit_types::{Constant, FunctionType, SymbolTable, Type};
use numjit_typeck::coerce::finalize_deferred;
use numjit_typeck::runtime::{RuntimeFn, PRINT_RAW};
use numjit_typeck::TypeError;

/// Integer poison returned on error from functions with an integer or
/// complex result.
pub const BAD_INT: i64 = 0xbadbadbad;

pub fn specialize(
    func: &mut FunctionDef,
    signature: &FunctionType,
    symtab: &SymbolTable,
) -> Result<(), TypeError> {
    func.error_return = Some(ErrorReturn {
        value: error_return_value(&signature.ret, func.span),
    });

    let body = std::mem::take(&mut func.body);
    let mut specializer = Specializer {
        func: &mut *func,
        symtab,
    };
    let body = specializer.visit_body(body)?;
    func.body = body;

    let objects = func
        .temps
        .iter()
        .filter(|t| t.kind == TempKind::Object)
        .count();
    log::debug!("[specialize] {}: {} object temporaries", func.name, objects);
    Ok(())
}

/// The sentinel returned when an exception is pending.
fn error_return_value(ret: &Type, span: Span) -> Option<Expr> {
    let value = match ret {
        Type::Object | Type::Array(_) => Constant::Null,
        Type::Float { .. } => Constant::Float(f64::NAN),
        Type::Int { .. } | Type::Complex { .. } => Constant::Int(BAD_INT),
        _ => return None,
    };
    let ty = if ret.is_array() { Type::Object } else { ret.clone() };
    Some(Expr::constant(value, span).annotated(ty))
}

struct Specializer<'a> {
    func: &'a mut FunctionDef,
    symtab: &'a SymbolTable,
}

impl Specializer<'_> {
    fn visit_body(&mut self, body: Vec<Stmt>) -> Result<Vec<Stmt>, TypeError> {
        let mut out = Vec::with_capacity(body.len());
        for mut stmt in body {
            for expr in stmt.exprs_mut() {
                self.visit_expr(expr)?;
            }
            for nested in stmt.bodies_mut() {
                let taken = std::mem::take(nested);
                *nested = self.visit_body(taken)?;
            }

            match stmt.kind {
                StmtKind::Print { values, dest, .. } => {
                    if let Some(dest) = dest {
                        return Err(TypeError::unsupported(
                            "print to a stream other than stdout",
                            dest.span,
                        ));
                    }
                    out.extend(values.into_iter().map(|value| print_call(value, stmt.span)));
                }
                kind => out.push(Stmt::new(kind, stmt.span)),
            }
        }
        Ok(out)
    }

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<(), TypeError> {
        for child in expr.children_mut() {
            self.visit_expr(child)?;
        }

        match &expr.kind {
            ExprKind::DeferredCoercion { .. } => {
                let deferred = take(expr);
                *expr = finalize_deferred(deferred, self.symtab)?;
            }
            ExprKind::Tuple {
                elts,
                ctx: ExprContext::Load,
            } => {
                let boxed = elts.iter().all(|e| e.ty.as_ref() == Some(&Type::Object));
                let tuple = take(expr);
                let node = if boxed {
                    pack_tuple(tuple)
                } else {
                    tuple
                };
                *expr = self.object_temp(node);
            }
            ExprKind::Dict { .. } | ExprKind::ObjectCall { .. } => {
                let node = take(expr);
                *expr = self.object_temp(node);
            }
            ExprKind::NativeCall { signature, .. } if signature.ret.is_object() => {
                let node = take(expr);
                *expr = self.object_temp(node);
            }
            ExprKind::Subscript { value, ctx, .. } => {
                if let ExprKind::ArrayAttribute { attr, .. } = &value.kind {
                    if *ctx == ExprContext::Store {
                        return Err(TypeError::ReadOnlyAttribute {
                            attr: attr.name().to_string(),
                            span: expr.span,
                        });
                    }
                } else if value.ty.as_ref().is_some_and(Type::is_array) {
                    if let ExprKind::Subscript { value, .. } = &mut expr.kind {
                        let array = take(value);
                        let data_ty = array
                            .ty
                            .as_ref()
                            .and_then(Type::base_type)
                            .map_or(Type::Object, |dtype| Type::pointer(dtype.clone()));
                        let span = array.span;
                        **value = Expr::new(ExprKind::DataPointer(Box::new(array)), span)
                            .annotated(data_ty);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Give a new-reference expression a temporary the backend releases.
    fn object_temp(&mut self, node: Expr) -> Expr {
        let id = self.func.alloc_temp(Type::Object, TempKind::Object);
        let span = node.span;
        // The slot holds an object; the expression keeps its inferred type
        // so the store into a typed target still matches.
        let ty = node.ty.clone().unwrap_or(Type::Object);
        Expr::new(
            ExprKind::ObjectTemp {
                node: Box::new(node),
                id: Some(id),
            },
            span,
        )
        .annotated(ty)
    }
}

/// Move a node out, leaving a placeholder that is overwritten right away.
fn take(expr: &mut Expr) -> Expr {
    let span = expr.span;
    std::mem::replace(expr, Expr::new(ExprKind::Ellipsis, span))
}

/// `PyTuple_Pack(n, elts...)` for a tuple whose elements are all objects.
fn pack_tuple(tuple: Expr) -> Expr {
    let span = tuple.span;
    let ExprKind::Tuple { elts, .. } = tuple.kind else {
        return tuple;
    };
    let count = Expr::constant(Constant::Int(elts.len() as i64), span).annotated(Type::intp());
    let mut args = Vec::with_capacity(elts.len() + 1);
    args.push(count);
    args.extend(elts);
    RuntimeFn::TuplePack.call(args, span)
}

/// `PyObject_Print(value, stdout, Py_PRINT_RAW)` as a statement.
fn print_call(value: Expr, span: Span) -> Stmt {
    let stdout = Expr::constant(Constant::Stdout, span).annotated(Type::pointer(Type::Void));
    let flags = Expr::constant(Constant::Int(PRINT_RAW), span).annotated(Type::int32());
    Stmt::new(
        StmtKind::Expr(RuntimeFn::ObjectPrint.call(vec![value, stdout, flags], span)),
        span,
    )
}

#[cfg(test)]
mod tests {
    use numjit_ast::build::*;
    use numjit_ast::printer::print_function;

    use super::*;

    fn obj(id: &str) -> Expr {
        Expr::name(id, ExprContext::Load, Span::synthetic()).annotated(Type::Object)
    }

    fn run(mut func: FunctionDef, ret: Type) -> Result<FunctionDef, TypeError> {
        let signature = FunctionType::new(vec![], ret);
        specialize(&mut func, &signature, &SymbolTable::new())?;
        Ok(func)
    }

    fn error_value(ret: Type) -> Option<Constant> {
        let func = run(function("f", &[], vec![]), ret).unwrap();
        func.error_return?.value?.const_value().cloned()
    }

    #[test]
    fn test_error_return_sentinels() {
        assert_eq!(error_value(Type::Object), Some(Constant::Null));
        assert_eq!(error_value(Type::array(Type::float64(), 1)), Some(Constant::Null));
        assert_eq!(error_value(Type::int32()), Some(Constant::Int(BAD_INT)));
        assert_eq!(error_value(Type::complex128()), Some(Constant::Int(BAD_INT)));
        assert_eq!(error_value(Type::Void), None);
        assert_eq!(error_value(Type::Bool), None);
        let Some(Constant::Float(nan)) = error_value(Type::float64()) else {
            panic!("expected a float sentinel");
        };
        assert!(nan.is_nan());
    }

    #[test]
    fn test_object_tuple_is_packed() {
        let tuple = tuple(vec![obj("a"), obj("b")]).annotated(Type::tuple(2));
        let func = run(function("f", &[], vec![ret(Some(tuple))]), Type::Object).unwrap();
        insta::assert_snapshot!(print_function(&func), @r"
        def f():
            # $t0: object (object)
            # on error: return NULL
            return obj#0(@PyTuple_Pack(2, a, b))
        ");
    }

    #[test]
    fn test_print_becomes_one_call_per_value() {
        let func = run(
            function("f", &[], vec![print(vec![obj("a"), obj("b")])]),
            Type::Void,
        )
        .unwrap();
        insta::assert_snapshot!(print_function(&func), @r"
        def f():
            # on error: return
            @PyObject_Print(a, stdout, 1)
            @PyObject_Print(b, stdout, 1)
        ");
    }

    #[test]
    fn test_store_into_array_metadata_is_read_only() {
        let shape = Expr::new(
            numjit_ast::ExprKind::ArrayAttribute {
                attr: numjit_ast::ArrayAttr::Shape,
                array: Box::new(
                    Expr::name("a", ExprContext::Load, Span::synthetic())
                        .annotated(Type::array(Type::float64(), 1)),
                ),
                ctx: ExprContext::Load,
            },
            Span::synthetic(),
        )
        .annotated(Type::carray(Type::intp(), 1));
        let mut target = index(shape, int(0)).annotated(Type::intp());
        target.set_ctx(ExprContext::Store);
        let func = function("f", &[], vec![assign(target, int(3).annotated(Type::intp()))]);
        let err = run(func, Type::Void).unwrap_err();
        assert!(matches!(err, TypeError::ReadOnlyAttribute { ref attr, .. } if attr == "shape"));
    }
}
