//! Coercion markers.
//!
//! `coerce` inserts a resolved conversion; `finalize_deferred` reduces a
//! deferred conversion (one whose target is the final type of a
//! symbol-table slot) once that slot can no longer change.

use numjit_ast::{Binding, Expr, ExprKind};
use numjit_types::{SymbolTable, Type, Variable};

use crate::binding_type;
use crate::error::TypeError;

/// Wrap `node` in a conversion to `target`, unless it already has that
/// type.
pub fn coerce(node: Expr, target: &Type, symtab: &SymbolTable) -> Expr {
    if binding_type(&node, symtab).as_ref() == Some(target) {
        return node;
    }
    let span = node.span;
    Expr {
        kind: ExprKind::Coercion {
            node: Box::new(node),
            target: target.clone(),
        },
        span,
        binding: Some(Binding::Value(Variable::typed(target.clone()))),
        ty: Some(target.clone()),
    }
}

/// Coerce every node in `nodes` to `target`.
pub fn coerce_all(nodes: Vec<Expr>, target: &Type, symtab: &SymbolTable) -> Vec<Expr> {
    nodes
        .into_iter()
        .map(|node| coerce(node, target, symtab))
        .collect()
}

/// Reduce a `DeferredCoercion` to a resolved coercion (or to its operand,
/// when the operand already has the slot's final type). Other nodes are
/// returned unchanged.
pub fn finalize_deferred(expr: Expr, symtab: &SymbolTable) -> Result<Expr, TypeError> {
    match expr.kind {
        ExprKind::DeferredCoercion { node, slot } => {
            let target = symtab.get(slot).ty.clone().ok_or_else(|| {
                TypeError::internal("deferred coercion to an unresolved slot", expr.span)
            })?;
            Ok(coerce(*node, &target, symtab))
        }
        kind => Ok(Expr { kind, ..expr }),
    }
}

#[cfg(test)]
mod tests {
    use numjit_common::Span;
    use numjit_types::Constant;

    use super::*;

    fn float32_const() -> Expr {
        Expr::constant(Constant::Float(1.5), Span::new(3, 6)).typed(Type::float32())
    }

    #[test]
    fn coerce_same_type_is_identity() {
        let table = SymbolTable::new();
        let node = coerce(float32_const(), &Type::float32(), &table);
        assert!(matches!(node.kind, ExprKind::Const(_)));
    }

    #[test]
    fn coerce_wraps_and_keeps_span() {
        let table = SymbolTable::new();
        let node = coerce(float32_const(), &Type::float64(), &table);
        assert_eq!(node.span, Span::new(3, 6));
        assert_eq!(node.ty, Some(Type::float64()));
        assert!(matches!(node.kind, ExprKind::Coercion { .. }));
    }

    #[test]
    fn deferred_coercion_resolves_against_final_slot() {
        let mut table = SymbolTable::new();
        let slot = table.return_slot();
        table.get_mut(slot).ty = Some(Type::float64());
        let deferred = Expr::new(
            ExprKind::DeferredCoercion {
                node: Box::new(float32_const()),
                slot,
            },
            Span::new(3, 6),
        )
        .with_binding(Binding::Symbol(slot));

        let resolved = finalize_deferred(deferred, &table).unwrap();
        let ExprKind::Coercion { target, .. } = &resolved.kind else {
            panic!("expected a coercion, got {:?}", resolved.kind);
        };
        assert_eq!(target, &Type::float64());
    }

    #[test]
    fn deferred_coercion_to_unresolved_slot_is_internal() {
        let mut table = SymbolTable::new();
        let slot = table.return_slot();
        let deferred = Expr::new(
            ExprKind::DeferredCoercion {
                node: Box::new(float32_const()),
                slot,
            },
            Span::synthetic(),
        );
        let err = finalize_deferred(deferred, &table).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Internal);
    }
}
