//! Generic traversal helpers.
//!
//! Passes that only care about a few node kinds recurse through the rest
//! with these accessors instead of repeating the full match.

use crate::tree::{Expr, ExprKind, Stmt, StmtKind};

impl Expr {
    /// Direct sub-expressions, in evaluation order.
    pub fn children_mut(&mut self) -> Vec<&mut Expr> {
        match &mut self.kind {
            ExprKind::Name { .. }
            | ExprKind::Const(_)
            | ExprKind::Ellipsis
            | ExprKind::Temp { .. } => Vec::new(),
            ExprKind::BinOp { left, right, .. } => vec![&mut **left, &mut **right],
            ExprKind::BoolOp { values, .. } => values.iter_mut().collect(),
            ExprKind::UnaryOp { operand, .. } => vec![&mut **operand],
            ExprKind::Compare {
                left, comparators, ..
            } => {
                let mut out = vec![&mut **left];
                out.extend(comparators.iter_mut());
                out
            }
            ExprKind::Call {
                func,
                args,
                keywords,
            }
            | ExprKind::ObjectCall {
                func,
                args,
                keywords,
            } => {
                let mut out = vec![&mut **func];
                out.extend(args.iter_mut());
                out.extend(keywords.iter_mut().map(|kw| &mut kw.value));
                out
            }
            ExprKind::Attribute { value, .. } => vec![&mut **value],
            ExprKind::Subscript { value, slice, .. } => vec![&mut **value, &mut **slice],
            ExprKind::Index(value) => vec![&mut **value],
            ExprKind::Slice { lower, upper, step } => [lower, upper, step]
                .into_iter()
                .flatten()
                .map(|part| &mut **part)
                .collect(),
            ExprKind::ExtSlice(dims) => dims.iter_mut().collect(),
            ExprKind::Tuple { elts, .. } | ExprKind::List { elts, .. } => {
                elts.iter_mut().collect()
            }
            ExprKind::Dict { keys, values } => keys.iter_mut().chain(values.iter_mut()).collect(),
            ExprKind::Coercion { node, .. }
            | ExprKind::DeferredCoercion { node, .. }
            | ExprKind::ObjectTemp { node, .. } => vec![&mut **node],
            ExprKind::Range { start, stop, step } => {
                vec![&mut **start, &mut **stop, &mut **step]
            }
            ExprKind::NativeCall { args, .. } => args.iter_mut().collect(),
            ExprKind::ArrayAttribute { array, .. } | ExprKind::DataPointer(array) => {
                vec![&mut **array]
            }
        }
    }
}

impl Stmt {
    /// Expressions owned directly by this statement (not by nested bodies).
    pub fn exprs_mut(&mut self) -> Vec<&mut Expr> {
        match &mut self.kind {
            StmtKind::Assign { targets, value } => {
                let mut out: Vec<&mut Expr> = targets.iter_mut().collect();
                out.push(value);
                out
            }
            StmtKind::AugAssign { target, value, .. } => vec![target, value],
            StmtKind::For {
                target,
                iter,
                index,
                ..
            } => {
                let mut out = vec![target, iter];
                out.extend(index.as_mut());
                out
            }
            StmtKind::While { test, .. } | StmtKind::If { test, .. } => vec![test],
            StmtKind::Return { value } => value.iter_mut().collect(),
            StmtKind::Expr(expr) => vec![expr],
            StmtKind::Print { values, dest, .. } => {
                let mut out: Vec<&mut Expr> = dest.iter_mut().collect();
                out.extend(values.iter_mut());
                out
            }
            StmtKind::Global { .. } | StmtKind::Pass | StmtKind::Break | StmtKind::Continue => {
                Vec::new()
            }
        }
    }

    /// Nested statement lists.
    pub fn bodies_mut(&mut self) -> Vec<&mut Vec<Stmt>> {
        match &mut self.kind {
            StmtKind::For { body, orelse, .. }
            | StmtKind::While { body, orelse, .. }
            | StmtKind::If { body, orelse, .. } => vec![body, orelse],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use numjit_common::Span;
    use numjit_types::Constant;

    use crate::tree::{BinOp, Expr, ExprContext, ExprKind};

    #[test]
    fn children_in_evaluation_order() {
        let mut expr = Expr::new(
            ExprKind::BinOp {
                left: Box::new(Expr::name("a", ExprContext::Load, Span::synthetic())),
                op: BinOp::Mult,
                right: Box::new(Expr::constant(Constant::Int(2), Span::synthetic())),
            },
            Span::synthetic(),
        );
        let children = expr.children_mut();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].as_name(), Some("a"));
    }

    #[test]
    fn open_slice_has_no_children() {
        let mut expr = Expr::new(
            ExprKind::Slice {
                lower: None,
                upper: None,
                step: None,
            },
            Span::synthetic(),
        );
        assert!(expr.children_mut().is_empty());
    }
}
