//! Pseudo-source rendering of (possibly lowered) function trees.
//!
//! Lowered node kinds get a compact notation of their own:
//!
//! | node               | rendering              |
//! |--------------------|------------------------|
//! | `Coercion`         | `coerce<T>(x)`         |
//! | `DeferredCoercion` | `coerce<$N>(x)`        |
//! | `NativeCall`       | `@symbol(args)`        |
//! | `ObjectCall`       | `py:f(args)`           |
//! | `DataPointer`      | `data(a)`              |
//! | `ObjectTemp`       | `obj#N(x)`             |
//! | `Temp`             | `$tN`                  |

use std::fmt::Write;

use crate::tree::{
    BoolOp, ErrorReturn, Expr, ExprKind, FunctionDef, Keyword, Stmt, StmtKind, TempKind, UnaryOp,
};

const INDENT: &str = "    ";

/// Render a whole function, its temporaries and error return included.
pub fn print_function(func: &FunctionDef) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "def {}({}):", func.name, func.args.join(", "));
    for temp in &func.temps {
        let kind = match temp.kind {
            TempKind::Index => "index",
            TempKind::Array => "array",
            TempKind::Object => "object",
        };
        let _ = writeln!(out, "{INDENT}# $t{}: {} ({})", temp.id.0, temp.ty, kind);
    }
    if let Some(ErrorReturn { value }) = &func.error_return {
        match value {
            Some(v) => {
                let _ = writeln!(out, "{INDENT}# on error: return {}", print_expr(v));
            }
            None => {
                let _ = writeln!(out, "{INDENT}# on error: return");
            }
        }
    }
    print_body(&mut out, &func.body, 1);
    out
}

/// Render a single expression.
pub fn print_expr(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

fn print_body(out: &mut String, body: &[Stmt], depth: usize) {
    if body.is_empty() {
        indent(out, depth);
        out.push_str("pass\n");
        return;
    }
    for stmt in body {
        print_stmt(out, stmt, depth);
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn print_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    indent(out, depth);
    match &stmt.kind {
        StmtKind::Assign { targets, value } => {
            for target in targets {
                write_expr(out, target);
                out.push_str(" = ");
            }
            write_expr(out, value);
            out.push('\n');
        }
        StmtKind::AugAssign { target, op, value } => {
            write_expr(out, target);
            let _ = write!(out, " {}= ", op.symbol());
            write_expr(out, value);
            out.push('\n');
        }
        StmtKind::For {
            target,
            iter,
            body,
            orelse,
            index,
        } => {
            out.push_str("for ");
            write_expr(out, target);
            out.push_str(" in ");
            write_expr(out, iter);
            out.push(':');
            if let Some(index) = index {
                out.push_str("  # index ");
                write_expr(out, index);
            }
            out.push('\n');
            print_body(out, body, depth + 1);
            print_else(out, orelse, depth);
        }
        StmtKind::While { test, body, orelse } => {
            out.push_str("while ");
            write_expr(out, test);
            out.push_str(":\n");
            print_body(out, body, depth + 1);
            print_else(out, orelse, depth);
        }
        StmtKind::If { test, body, orelse } => {
            out.push_str("if ");
            write_expr(out, test);
            out.push_str(":\n");
            print_body(out, body, depth + 1);
            print_else(out, orelse, depth);
        }
        StmtKind::Return { value } => {
            out.push_str("return");
            if let Some(value) = value {
                out.push(' ');
                write_expr(out, value);
            }
            out.push('\n');
        }
        StmtKind::Expr(expr) => {
            write_expr(out, expr);
            out.push('\n');
        }
        StmtKind::Print { values, dest, nl } => {
            out.push_str("print");
            if let Some(dest) = dest {
                out.push_str(" >>");
                write_expr(out, dest);
                if !values.is_empty() {
                    out.push(',');
                }
            }
            for (i, value) in values.iter().enumerate() {
                out.push_str(if i == 0 { " " } else { ", " });
                write_expr(out, value);
            }
            if !nl {
                out.push(',');
            }
            out.push('\n');
        }
        StmtKind::Global { names } => {
            let _ = writeln!(out, "global {}", names.join(", "));
        }
        StmtKind::Pass => out.push_str("pass\n"),
        StmtKind::Break => out.push_str("break\n"),
        StmtKind::Continue => out.push_str("continue\n"),
    }
}

fn print_else(out: &mut String, orelse: &[Stmt], depth: usize) {
    if orelse.is_empty() {
        return;
    }
    indent(out, depth);
    out.push_str("else:\n");
    print_body(out, orelse, depth + 1);
}

fn write_list(out: &mut String, items: &[Expr]) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_expr(out, item);
    }
}

fn write_call_args(out: &mut String, args: &[Expr], keywords: &[Keyword]) {
    out.push('(');
    write_list(out, args);
    for (i, kw) in keywords.iter().enumerate() {
        if i > 0 || !args.is_empty() {
            out.push_str(", ");
        }
        let _ = write!(out, "{}=", kw.arg);
        write_expr(out, &kw.value);
    }
    out.push(')');
}

fn write_expr(out: &mut String, expr: &Expr) {
    match &expr.kind {
        ExprKind::Name { id, .. } => out.push_str(id),
        ExprKind::Const(value) => {
            let _ = write!(out, "{}", value);
        }
        ExprKind::BinOp { left, op, right } => {
            out.push('(');
            write_expr(out, left);
            let _ = write!(out, " {} ", op.symbol());
            write_expr(out, right);
            out.push(')');
        }
        ExprKind::BoolOp { op, values } => {
            let sep = match op {
                BoolOp::And => " and ",
                BoolOp::Or => " or ",
            };
            out.push('(');
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    out.push_str(sep);
                }
                write_expr(out, value);
            }
            out.push(')');
        }
        ExprKind::UnaryOp { op, operand } => {
            out.push_str(match op {
                UnaryOp::Not => "not ",
                UnaryOp::USub => "-",
                UnaryOp::UAdd => "+",
                UnaryOp::Invert => "~",
            });
            write_expr(out, operand);
        }
        ExprKind::Compare {
            left,
            ops,
            comparators,
        } => {
            out.push('(');
            write_expr(out, left);
            for (op, rhs) in ops.iter().zip(comparators) {
                let _ = write!(out, " {} ", op.symbol());
                write_expr(out, rhs);
            }
            out.push(')');
        }
        ExprKind::Call {
            func,
            args,
            keywords,
        } => {
            write_expr(out, func);
            write_call_args(out, args, keywords);
        }
        ExprKind::Attribute { value, attr, .. } => {
            write_expr(out, value);
            let _ = write!(out, ".{}", attr);
        }
        ExprKind::Subscript { value, slice, .. } => {
            write_expr(out, value);
            out.push('[');
            write_expr(out, slice);
            out.push(']');
        }
        ExprKind::Index(value) => write_expr(out, value),
        ExprKind::Slice { lower, upper, step } => {
            if let Some(lower) = lower {
                write_expr(out, lower);
            }
            out.push(':');
            if let Some(upper) = upper {
                write_expr(out, upper);
            }
            if let Some(step) = step {
                out.push(':');
                write_expr(out, step);
            }
        }
        ExprKind::ExtSlice(dims) => write_list(out, dims),
        ExprKind::Ellipsis => out.push_str("..."),
        ExprKind::Tuple { elts, .. } => {
            out.push('(');
            write_list(out, elts);
            if elts.len() == 1 {
                out.push(',');
            }
            out.push(')');
        }
        ExprKind::List { elts, .. } => {
            out.push('[');
            write_list(out, elts);
            out.push(']');
        }
        ExprKind::Dict { keys, values } => {
            out.push('{');
            for (i, (k, v)) in keys.iter().zip(values).enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expr(out, k);
                out.push_str(": ");
                write_expr(out, v);
            }
            out.push('}');
        }
        ExprKind::Coercion { node, target } => {
            let _ = write!(out, "coerce<{}>(", target);
            write_expr(out, node);
            out.push(')');
        }
        ExprKind::DeferredCoercion { node, slot } => {
            let _ = write!(out, "coerce<${}>(", slot.0);
            write_expr(out, node);
            out.push(')');
        }
        ExprKind::Range { start, stop, step } => {
            out.push_str("range(");
            write_expr(out, start);
            out.push_str(", ");
            write_expr(out, stop);
            out.push_str(", ");
            write_expr(out, step);
            out.push(')');
        }
        ExprKind::NativeCall { symbol, args, .. } => {
            let _ = write!(out, "@{}", symbol);
            write_call_args(out, args, &[]);
        }
        ExprKind::ObjectCall {
            func,
            args,
            keywords,
        } => {
            out.push_str("py:");
            write_expr(out, func);
            write_call_args(out, args, keywords);
        }
        ExprKind::ArrayAttribute { attr, array, .. } => {
            write_expr(out, array);
            let _ = write!(out, ".{}", attr.name());
        }
        ExprKind::DataPointer(array) => {
            out.push_str("data(");
            write_expr(out, array);
            out.push(')');
        }
        ExprKind::ObjectTemp { node, id } => {
            match id {
                Some(id) => {
                    let _ = write!(out, "obj#{}(", id.0);
                }
                None => out.push_str("obj("),
            }
            write_expr(out, node);
            out.push(')');
        }
        ExprKind::Temp { id, .. } => {
            let _ = write!(out, "$t{}", id.0);
        }
    }
}
