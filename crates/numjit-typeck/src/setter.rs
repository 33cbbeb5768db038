//! Type setting.
//!
//! After inference every binding is final. This pass copies each node's
//! binding type into its `ty` field and reduces deferred coercions, so
//! later passes read types straight off the tree.

use numjit_ast::{Expr, ExprKind, FunctionDef, Stmt};
use numjit_types::SymbolTable;

use crate::binding_type;
use crate::coerce::finalize_deferred;
use crate::error::TypeError;

pub fn set_types(func: &mut FunctionDef, symtab: &SymbolTable) -> Result<(), TypeError> {
    set_body(&mut func.body, symtab)?;
    if let Some(value) = func.error_return.as_mut().and_then(|ret| ret.value.as_mut()) {
        set_expr(value, symtab)?;
    }
    log::debug!("[setter] {}: types set", func.name);
    Ok(())
}

fn set_body(body: &mut [Stmt], symtab: &SymbolTable) -> Result<(), TypeError> {
    for stmt in body {
        for expr in stmt.exprs_mut() {
            set_expr(expr, symtab)?;
        }
        for nested in stmt.bodies_mut() {
            set_body(nested, symtab)?;
        }
    }
    Ok(())
}

fn set_expr(expr: &mut Expr, symtab: &SymbolTable) -> Result<(), TypeError> {
    for child in expr.children_mut() {
        set_expr(child, symtab)?;
    }

    if matches!(expr.kind, ExprKind::DeferredCoercion { .. }) {
        let placeholder = Expr::new(ExprKind::Ellipsis, expr.span);
        let deferred = std::mem::replace(expr, placeholder);
        *expr = finalize_deferred(deferred, symtab)?;
    }

    match binding_type(expr, symtab) {
        Some(ty) => {
            expr.ty = Some(ty);
            Ok(())
        }
        None => Err(TypeError::internal("node left without a type", expr.span)),
    }
}
