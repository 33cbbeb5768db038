//! Collection of the names a function binds locally.

use rustc_hash::FxHashSet;

use crate::tree::{Expr, ExprKind, FunctionDef, Stmt, StmtKind};

impl FunctionDef {
    /// Every name assigned anywhere in the body (assignment, augmented
    /// assignment and loop targets, including tuple/list unpacking), in
    /// order of first appearance. Parameters are not included.
    pub fn local_names(&self) -> Vec<String> {
        let mut seen: FxHashSet<&str> = self.args.iter().map(String::as_str).collect();
        let mut names = Vec::new();
        collect_body(&self.body, &mut seen, &mut names);
        names
    }
}

fn collect_body<'a>(body: &'a [Stmt], seen: &mut FxHashSet<&'a str>, names: &mut Vec<String>) {
    for stmt in body {
        match &stmt.kind {
            StmtKind::Assign { targets, .. } => {
                for target in targets {
                    collect_target(target, seen, names);
                }
            }
            StmtKind::AugAssign { target, .. } => collect_target(target, seen, names),
            StmtKind::For {
                target,
                body,
                orelse,
                ..
            } => {
                collect_target(target, seen, names);
                collect_body(body, seen, names);
                collect_body(orelse, seen, names);
            }
            StmtKind::While { body, orelse, .. } | StmtKind::If { body, orelse, .. } => {
                collect_body(body, seen, names);
                collect_body(orelse, seen, names);
            }
            StmtKind::Return { .. }
            | StmtKind::Expr(_)
            | StmtKind::Print { .. }
            | StmtKind::Global { .. }
            | StmtKind::Pass
            | StmtKind::Break
            | StmtKind::Continue => {}
        }
    }
}

fn collect_target<'a>(target: &'a Expr, seen: &mut FxHashSet<&'a str>, names: &mut Vec<String>) {
    match &target.kind {
        ExprKind::Name { id, .. } => {
            if seen.insert(id.as_str()) {
                names.push(id.clone());
            }
        }
        ExprKind::Tuple { elts, .. } | ExprKind::List { elts, .. } => {
            for elt in elts {
                collect_target(elt, seen, names);
            }
        }
        // Attribute and subscript stores write into an existing value.
        _ => {}
    }
}
