//! Iterable lowering.
//!
//! Rewrites `for` loops into counted loops the backend can emit directly:
//!
//! ```text
//! for x in xs:            $t0 = xs                        (unless xs is a name)
//!     body          =>    for x in range(0, $t0.shape[0], 1):  # index $t1
//!                             x = coerce<T>($t0[$t1])
//!                             body
//! ```
//!
//! Range loops keep their iterable and use the target itself as index.

use numjit_ast::{
    ArrayAttr, Expr, ExprContext, ExprKind, FunctionDef, Stmt, StmtKind, TempId, TempKind,
};
use numjit_common::Span;
use numjit_types::{Constant, SymbolTable, Type};
use numjit_typeck::coerce::coerce;
use numjit_typeck::TypeError;

/// Lower every `for` loop in `func`, nested loops included.
pub fn lower_iterables(
    func: &mut FunctionDef,
    symtab: &SymbolTable,
    index_type: &Type,
) -> Result<(), TypeError> {
    let body = std::mem::take(&mut func.body);
    let mut lowering = IterableLowering {
        func: &mut *func,
        symtab,
        index_type,
    };
    let body = lowering.lower_body(body)?;
    func.body = body;
    log::debug!("[iterable] {}: {} temporaries", func.name, func.temps.len());
    Ok(())
}

struct IterableLowering<'a> {
    func: &'a mut FunctionDef,
    symtab: &'a SymbolTable,
    index_type: &'a Type,
}

impl IterableLowering<'_> {
    fn lower_body(&mut self, body: Vec<Stmt>) -> Result<Vec<Stmt>, TypeError> {
        let mut out = Vec::with_capacity(body.len());
        for stmt in body {
            let span = stmt.span;
            match stmt.kind {
                StmtKind::For {
                    target,
                    iter,
                    body,
                    orelse,
                    index: _,
                } => {
                    let body = self.lower_body(body)?;
                    let orelse = self.lower_body(orelse)?;
                    self.lower_for(target, iter, body, orelse, span, &mut out)?;
                }
                StmtKind::While { test, body, orelse } => {
                    let body = self.lower_body(body)?;
                    let orelse = self.lower_body(orelse)?;
                    out.push(Stmt::new(StmtKind::While { test, body, orelse }, span));
                }
                StmtKind::If { test, body, orelse } => {
                    let body = self.lower_body(body)?;
                    let orelse = self.lower_body(orelse)?;
                    out.push(Stmt::new(StmtKind::If { test, body, orelse }, span));
                }
                kind => out.push(Stmt::new(kind, span)),
            }
        }
        Ok(out)
    }

    fn lower_for(
        &mut self,
        target: Expr,
        iter: Expr,
        mut body: Vec<Stmt>,
        orelse: Vec<Stmt>,
        span: Span,
        out: &mut Vec<Stmt>,
    ) -> Result<(), TypeError> {
        if target.as_name().is_none() {
            return Err(TypeError::unsupported(
                "for loop target that is not a plain name",
                target.span,
            ));
        }

        let iter_ty = iter.ty.clone().unwrap_or(Type::Void);
        let (iter, index) = match &iter_ty {
            Type::Range => {
                let mut index = target.clone();
                index.set_ctx(ExprContext::Load);
                (iter, index)
            }
            Type::Array(array) if array.ndim == 1 => {
                let dtype = (*array.dtype).clone();
                let array = self.hoist(iter, iter_ty.clone(), out);
                let counter = self.func.alloc_temp(self.index_type.clone(), TempKind::Index);
                let counter_load = temp(counter, ExprContext::Load, self.index_type.clone(), span);

                let element = Expr::new(
                    ExprKind::Subscript {
                        value: Box::new(array.clone()),
                        slice: Box::new(counter_load.clone()),
                        ctx: ExprContext::Load,
                    },
                    span,
                )
                .annotated(dtype);
                let target_ty = target.ty.clone().unwrap_or(Type::Object);
                let element = coerce(element, &target_ty, self.symtab);
                body.insert(0, Stmt::assign(target.clone(), element, span));

                (self.counted_range(array, span), counter_load)
            }
            other => {
                return Err(TypeError::unsupported(
                    format!("loop pattern: iteration over `{}`", other),
                    iter.span,
                ))
            }
        };

        log::debug!("[iterable] lowered loop over {}", iter_ty);
        out.push(Stmt::new(
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
                index: Some(index),
            },
            span,
        ));
        Ok(())
    }

    /// Evaluate a non-trivial iterable once, before the loop.
    fn hoist(&mut self, iter: Expr, ty: Type, out: &mut Vec<Stmt>) -> Expr {
        if iter.as_name().is_some() {
            return iter;
        }
        let span = iter.span;
        let id = self.func.alloc_temp(ty.clone(), TempKind::Array);
        out.push(Stmt::assign(
            temp(id, ExprContext::Store, ty.clone(), span),
            iter,
            span,
        ));
        temp(id, ExprContext::Load, ty, span)
    }

    /// `range(0, array.shape[0], 1)` in the index type.
    fn counted_range(&self, array: Expr, span: Span) -> Expr {
        let index_ty = self.index_type.clone();
        let shape = Expr::new(
            ExprKind::ArrayAttribute {
                attr: ArrayAttr::Shape,
                array: Box::new(array),
                ctx: ExprContext::Load,
            },
            span,
        )
        .annotated(Type::carray(Type::intp(), 1));
        let len = Expr::new(
            ExprKind::Subscript {
                value: Box::new(shape),
                slice: Box::new(int(0, Type::intp(), span)),
                ctx: ExprContext::Load,
            },
            span,
        )
        .annotated(Type::intp());
        Expr::new(
            ExprKind::Range {
                start: Box::new(int(0, index_ty.clone(), span)),
                stop: Box::new(coerce(len, &index_ty, self.symtab)),
                step: Box::new(int(1, index_ty, span)),
            },
            span,
        )
        .annotated(Type::Range)
    }
}

fn temp(id: TempId, ctx: ExprContext, ty: Type, span: Span) -> Expr {
    Expr::new(ExprKind::Temp { id, ctx }, span).annotated(ty)
}

fn int(value: i64, ty: Type, span: Span) -> Expr {
    Expr::constant(Constant::Int(value), span).annotated(ty)
}
