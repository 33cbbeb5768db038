//! Terse constructors for building trees in code.
//!
//! Every node gets a synthetic span. Used by embedders that construct
//! functions directly instead of deserializing parser output, and by the
//! tests of every pass.

use numjit_common::Span;
use numjit_types::Constant;

use crate::tree::{
    BinOp, CmpOp, Expr, ExprContext, ExprKind, FunctionDef, Keyword, Stmt, StmtKind,
};

fn sp() -> Span {
    Span::synthetic()
}

pub fn load(id: &str) -> Expr {
    Expr::name(id, ExprContext::Load, sp())
}

pub fn store(id: &str) -> Expr {
    Expr::name(id, ExprContext::Store, sp())
}

pub fn int(value: i64) -> Expr {
    Expr::constant(Constant::Int(value), sp())
}

pub fn float(value: f64) -> Expr {
    Expr::constant(Constant::Float(value), sp())
}

pub fn string(value: &str) -> Expr {
    Expr::constant(Constant::Str(value.to_string()), sp())
}

pub fn binop(left: Expr, op: BinOp, right: Expr) -> Expr {
    Expr::new(
        ExprKind::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        sp(),
    )
}

pub fn compare(left: Expr, op: CmpOp, right: Expr) -> Expr {
    Expr::new(
        ExprKind::Compare {
            left: Box::new(left),
            ops: vec![op],
            comparators: vec![right],
        },
        sp(),
    )
}

pub fn call(func: Expr, args: Vec<Expr>) -> Expr {
    call_kw(func, args, Vec::new())
}

pub fn call_kw(func: Expr, args: Vec<Expr>, keywords: Vec<(&str, Expr)>) -> Expr {
    Expr::new(
        ExprKind::Call {
            func: Box::new(func),
            args,
            keywords: keywords
                .into_iter()
                .map(|(arg, value)| Keyword {
                    arg: arg.to_string(),
                    value,
                })
                .collect(),
        },
        sp(),
    )
}

pub fn attr(value: Expr, name: &str) -> Expr {
    Expr::new(
        ExprKind::Attribute {
            value: Box::new(value),
            attr: name.to_string(),
            ctx: ExprContext::Load,
        },
        sp(),
    )
}

pub fn subscript(value: Expr, slice: Expr) -> Expr {
    Expr::new(
        ExprKind::Subscript {
            value: Box::new(value),
            slice: Box::new(slice),
            ctx: ExprContext::Load,
        },
        sp(),
    )
}

/// `value[i]` with a single index expression.
pub fn index(value: Expr, i: Expr) -> Expr {
    subscript(value, Expr::new(ExprKind::Index(Box::new(i)), sp()))
}

pub fn slice(lower: Option<Expr>, upper: Option<Expr>) -> Expr {
    Expr::new(
        ExprKind::Slice {
            lower: lower.map(Box::new),
            upper: upper.map(Box::new),
            step: None,
        },
        sp(),
    )
}

pub fn ext_slice(dims: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::ExtSlice(dims), sp())
}

pub fn ellipsis() -> Expr {
    Expr::new(ExprKind::Ellipsis, sp())
}

pub fn tuple(elts: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::Tuple {
            elts,
            ctx: ExprContext::Load,
        },
        sp(),
    )
}

/// A tuple of store targets.
pub fn tuple_store(elts: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::Tuple {
            elts,
            ctx: ExprContext::Store,
        },
        sp(),
    )
}

pub fn assign(target: Expr, value: Expr) -> Stmt {
    Stmt::assign(target, value, sp())
}

pub fn aug_assign(target: Expr, op: BinOp, value: Expr) -> Stmt {
    Stmt::new(StmtKind::AugAssign { target, op, value }, sp())
}

pub fn ret(value: Option<Expr>) -> Stmt {
    Stmt::new(StmtKind::Return { value }, sp())
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::new(StmtKind::Expr(expr), sp())
}

pub fn print(values: Vec<Expr>) -> Stmt {
    Stmt::new(
        StmtKind::Print {
            values,
            dest: None,
            nl: true,
        },
        sp(),
    )
}

pub fn for_in(target: Expr, iter: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::new(
        StmtKind::For {
            target,
            iter,
            body,
            orelse: Vec::new(),
            index: None,
        },
        sp(),
    )
}

pub fn while_(test: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::new(
        StmtKind::While {
            test,
            body,
            orelse: Vec::new(),
        },
        sp(),
    )
}

pub fn if_(test: Expr, body: Vec<Stmt>, orelse: Vec<Stmt>) -> Stmt {
    Stmt::new(StmtKind::If { test, body, orelse }, sp())
}

pub fn function(name: &str, args: &[&str], body: Vec<Stmt>) -> FunctionDef {
    FunctionDef::new(name, args, body)
}
