//! Forward type inference.
//!
//! A single traversal of the function body in source order. Every
//! expression gets a binding (a symbol-table entry for names, a private
//! `Variable` otherwise); locals take the type of their first assignment;
//! mismatched operands, assignments and arguments get explicit coercion
//! nodes. Builtin calls, unpacking assignments and augmented assignments
//! are rewritten into simpler forms on the way.
//!
//! Return statements all feed one anonymous return slot. Each returned
//! value is wrapped in a deferred coercion to that slot, so a later return
//! of a wider type retroactively widens earlier ones.

use rustc_hash::FxHashMap;

use numjit_ast::{
    ArrayAttr, Binding, Expr, ExprContext, ExprKind, FunctionDef, Keyword, Stmt, StmtKind,
    UnaryOp,
};
use numjit_common::Span;
use numjit_types::{
    from_native_value, promote, ArrayType, Constant, FunctionType, SymbolId, SymbolTable, Type,
    Variable,
};

use crate::coerce::{coerce, coerce_all};
use crate::error::TypeError;
use crate::namespace::{ModuleAttr, NameKind, Namespace};
use crate::resolve::{EntryPoint, FunctionResolver};
use crate::runtime::RuntimeFn;
use crate::{binding_type, binding_var, Signature, TypeckOptions};

/// The outcome of inference: the finalized signature and the populated
/// symbol table. The tree itself is annotated in place.
#[derive(Clone, Debug)]
pub struct Inferred {
    pub signature: FunctionType,
    pub symtab: SymbolTable,
}

/// Run type inference on `func` for the given signature.
pub fn infer_function(
    func: &mut FunctionDef,
    signature: &Signature,
    namespace: &dyn Namespace,
    resolver: &dyn FunctionResolver,
    options: &TypeckOptions,
) -> Result<Inferred, TypeError> {
    if func.args.len() != signature.args.len() {
        return Err(TypeError::ArityMismatch {
            callee: func.name.clone(),
            expected: func.args.len(),
            found: signature.args.len(),
            span: func.span,
        });
    }

    let mut inferer = TypeInferer::new(namespace, resolver, options);
    inferer.init_locals(func, &signature.args);

    let body = std::mem::take(&mut func.body);
    func.body = inferer.visit_body(body)?;

    let ret = inferer.finalize_return(signature.ret.as_ref(), func.span)?;
    let signature = FunctionType::new(signature.args.clone(), ret);
    log::debug!("[infer] {}: {}", func.name, signature);

    Ok(Inferred {
        signature,
        symtab: inferer.symtab,
    })
}

pub struct TypeInferer<'a> {
    pub(crate) symtab: SymbolTable,
    pub(crate) namespace: &'a dyn Namespace,
    pub(crate) resolver: &'a dyn FunctionResolver,
    pub(crate) options: &'a TypeckOptions,
    /// Entry points of free names the namespace classified as native.
    pub(crate) natives: FxHashMap<String, EntryPoint>,
    return_slot: SymbolId,
}

impl<'a> TypeInferer<'a> {
    pub fn new(
        namespace: &'a dyn Namespace,
        resolver: &'a dyn FunctionResolver,
        options: &'a TypeckOptions,
    ) -> Self {
        let mut symtab = SymbolTable::new();
        let return_slot = symtab.return_slot();
        TypeInferer {
            symtab,
            namespace,
            resolver,
            options,
            natives: FxHashMap::default(),
            return_slot,
        }
    }

    /// Seed the symbol table: one typed binding per parameter, one
    /// undetermined binding per other local, and the `None` constant.
    fn init_locals(&mut self, func: &FunctionDef, arg_types: &[Type]) {
        for (name, ty) in func.args.iter().zip(arg_types) {
            self.symtab.insert(Variable::local(name, Some(ty.clone())));
        }
        for name in func.local_names() {
            self.symtab.insert(Variable::local(&name, None));
        }
        self.symtab.insert(Variable {
            name: Some("None".to_string()),
            ..Variable::constant(Constant::None, Type::Object)
        });
    }

    /// Bind a free name through the namespace.
    fn init_global(&mut self, name: &str) -> SymbolId {
        let ty = match self.namespace.lookup(name) {
            NameKind::Builtin => Type::Builtin(name.to_string()),
            NameKind::Module { name, is_numpy } => Type::Module { name, is_numpy },
            NameKind::Native(entry) => {
                let ty = Type::Function(Box::new(entry.signature.clone()));
                self.natives.insert(name.to_string(), entry);
                ty
            }
            NameKind::Global => Type::Global(name.to_string()),
        };
        log::debug!("[infer] free name `{}` is {}", name, ty);
        self.symtab.insert(Variable::global(name, ty))
    }

    fn finalize_return(&mut self, declared: Option<&Type>, span: Span) -> Result<Type, TypeError> {
        let inferred = self.symtab.get(self.return_slot).ty.clone();
        let ret = match (inferred, declared) {
            (None, Some(declared)) => declared.clone(),
            (None, None) => Type::Void,
            (Some(found), Some(declared)) if &found != declared => {
                promote(declared, &found).map_err(|e| TypeError::Promotion {
                    left: e.left,
                    right: e.right,
                    span,
                })?
            }
            (Some(found), _) => found,
        };
        self.symtab.get_mut(self.return_slot).ty = Some(ret.clone());
        Ok(ret)
    }

    // ── Helpers ────────────────────────────────────────────────────────

    pub(crate) fn type_of(&self, expr: &Expr) -> Result<Type, TypeError> {
        binding_type(expr, &self.symtab)
            .ok_or_else(|| TypeError::internal("expression has no inferred type", expr.span))
    }

    pub(crate) fn coerce(&self, node: Expr, target: &Type) -> Expr {
        coerce(node, target, &self.symtab)
    }

    pub(crate) fn coerce_all(&self, nodes: Vec<Expr>, target: &Type) -> Vec<Expr> {
        coerce_all(nodes, target, &self.symtab)
    }

    pub(crate) fn promote(&self, a: &Type, b: &Type, span: Span) -> Result<Type, TypeError> {
        promote(a, b).map_err(|e| TypeError::Promotion {
            left: e.left,
            right: e.right,
            span,
        })
    }

    /// A literal node typed from its value.
    pub(crate) fn constant(&self, value: Constant, span: Span) -> Expr {
        let ty = from_native_value(&value);
        self.typed_constant(value, ty, span)
    }

    pub(crate) fn typed_constant(&self, value: Constant, ty: Type, span: Span) -> Expr {
        Expr::constant(value.clone(), span).with_binding(Binding::Value(Variable::constant(value, ty)))
    }

    /// An integer constant of the index type.
    pub(crate) fn index_constant(&self, value: i64, span: Span) -> Expr {
        self.typed_constant(Constant::Int(value), self.options.index_type.clone(), span)
    }

    fn is_none_constant(&self, expr: &Expr) -> bool {
        binding_var(expr, &self.symtab).is_some_and(|var| {
            var.is_constant && matches!(var.constant_value, Some(Constant::None))
        })
    }

    fn is_newaxis(&self, expr: &Expr) -> bool {
        binding_type(expr, &self.symtab).is_some_and(|ty| ty.is_newaxis())
            || self.is_none_constant(expr)
    }

    fn full_slice(span: Span) -> Expr {
        Expr::new(
            ExprKind::Slice {
                lower: None,
                upper: None,
                step: None,
            },
            span,
        )
        .typed(Type::Slice)
    }

    // ── Statements ─────────────────────────────────────────────────────

    pub fn visit_body(&mut self, body: Vec<Stmt>) -> Result<Vec<Stmt>, TypeError> {
        let mut out = Vec::with_capacity(body.len());
        for stmt in body {
            self.visit_stmt(stmt, &mut out)?;
        }
        Ok(out)
    }

    /// Visit one statement, pushing its rewritten form (possibly several
    /// statements) onto `out`.
    fn visit_stmt(&mut self, stmt: Stmt, out: &mut Vec<Stmt>) -> Result<(), TypeError> {
        let span = stmt.span;
        match stmt.kind {
            StmtKind::Assign { targets, value } => {
                let value = self.visit_expr(value)?;
                let unpacking = targets.len() != 1
                    || matches!(
                        targets[0].kind,
                        ExprKind::Tuple { .. } | ExprKind::List { .. }
                    );
                if unpacking {
                    self.unpack(targets, value, span, out)?;
                } else if let Some(target) = targets.into_iter().next() {
                    out.push(self.assign(target, value, span)?);
                }
            }
            StmtKind::AugAssign { target, op, value } => {
                let mut load = target.clone();
                load.set_ctx(ExprContext::Load);
                let combined = Expr::new(
                    ExprKind::BinOp {
                        left: Box::new(load),
                        op,
                        right: Box::new(value),
                    },
                    span,
                );
                let value = self.visit_expr(combined)?;
                out.push(self.assign(target, value, span)?);
            }
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
                index,
            } => {
                if !orelse.is_empty() {
                    return Err(TypeError::unsupported("`else` clause on a for loop", span));
                }
                if target.as_name().is_none() {
                    return Err(TypeError::unsupported(
                        "for loop target that is not a plain name",
                        target.span,
                    ));
                }
                let iter = self.visit_expr(iter)?;
                let element = self.element_type(&iter)?;
                let target = self.bind_loop_target(target, element)?;
                let body = self.visit_body(body)?;
                out.push(Stmt::new(
                    StmtKind::For {
                        target,
                        iter,
                        body,
                        orelse,
                        index,
                    },
                    span,
                ));
            }
            StmtKind::While { test, body, orelse } => {
                if !orelse.is_empty() {
                    return Err(TypeError::unsupported(
                        "`else` clause on a while loop",
                        span,
                    ));
                }
                let test = self.visit_expr(test)?;
                let test = self.coerce(test, &Type::Bool);
                let body = self.visit_body(body)?;
                out.push(Stmt::new(StmtKind::While { test, body, orelse }, span));
            }
            StmtKind::If { test, body, orelse } => {
                let test = self.visit_expr(test)?;
                let test = self.coerce(test, &Type::Bool);
                let body = self.visit_body(body)?;
                let orelse = self.visit_body(orelse)?;
                out.push(Stmt::new(StmtKind::If { test, body, orelse }, span));
            }
            StmtKind::Return { value } => {
                let value = value.map(|v| self.visit_expr(v)).transpose()?;
                out.push(self.visit_return(value, span)?);
            }
            StmtKind::Expr(expr) => {
                let expr = self.visit_expr(expr)?;
                out.push(Stmt::new(StmtKind::Expr(expr), span));
            }
            StmtKind::Print { values, dest, nl } => {
                let mut visited = Vec::with_capacity(values.len());
                for value in values {
                    let value = self.visit_expr(value)?;
                    visited.push(self.coerce(value, &Type::Object));
                }
                let dest = dest.map(|d| self.visit_expr(d)).transpose()?;
                out.push(Stmt::new(
                    StmtKind::Print {
                        values: visited,
                        dest,
                        nl,
                    },
                    span,
                ));
            }
            StmtKind::Global { .. } => {
                return Err(TypeError::unsupported("`global` statement", span));
            }
            kind @ (StmtKind::Pass | StmtKind::Break | StmtKind::Continue) => {
                out.push(Stmt::new(kind, span));
            }
        }
        Ok(())
    }

    /// Assign an already-visited value to a single target, inserting a
    /// coercion when the target's type is already fixed and differs.
    fn assign(&mut self, target: Expr, value: Expr, span: Span) -> Result<Stmt, TypeError> {
        let target = self.visit_expr(target)?;
        let rhs = self.type_of(&value)?;

        let value = match &target.binding {
            Some(Binding::Symbol(id)) if self.symtab.get(*id).is_undetermined() => {
                self.symtab.get_mut(*id).ty = Some(rhs);
                value
            }
            _ => {
                let lhs = self.type_of(&target)?;
                if lhs != rhs {
                    self.promote(&lhs, &rhs, value.span)?;
                }
                self.coerce(value, &lhs)
            }
        };
        Ok(Stmt::assign(target, value, span))
    }

    /// Lower `a, b = value` into one assignment per element.
    fn unpack(
        &mut self,
        targets: Vec<Expr>,
        value: Expr,
        span: Span,
        out: &mut Vec<Stmt>,
    ) -> Result<(), TypeError> {
        let mut targets = targets;
        if targets.len() == 1 {
            if let ExprKind::Tuple { elts, .. } | ExprKind::List { elts, .. } = &mut targets[0].kind {
                targets = std::mem::take(elts);
            }
        }

        let value_ty = self.type_of(&value)?;
        let size = match &value_ty {
            Type::CArray { size, .. } | Type::List { size, .. } | Type::Tuple { size, .. } => *size,
            other => {
                return Err(TypeError::UnpackType {
                    ty: other.clone(),
                    span: value.span,
                })
            }
        };
        if size != targets.len() {
            return Err(TypeError::UnpackArity {
                found: size,
                expected: targets.len(),
                span: value.span,
            });
        }

        let value_span = value.span;
        let elements: Vec<Expr> = match (&value_ty, value.kind) {
            (Type::CArray { base, .. }, kind) => {
                let base = (**base).clone();
                let array = Expr {
                    kind,
                    span: value_span,
                    binding: value.binding,
                    ty: value.ty,
                };
                (0..size)
                    .map(|i| {
                        Expr::new(
                            ExprKind::Subscript {
                                value: Box::new(array.clone()),
                                slice: Box::new(self.index_constant(i as i64, value_span)),
                                ctx: ExprContext::Load,
                            },
                            value_span,
                        )
                        .typed(base.clone())
                    })
                    .collect()
            }
            (_, ExprKind::Tuple { elts, .. }) | (_, ExprKind::List { elts, .. }) => elts,
            (ty, _) => match ty.constant_elements() {
                Some(items) => items
                    .iter()
                    .map(|item| self.constant(item.clone(), value_span))
                    .collect(),
                None => {
                    return Err(TypeError::unsupported(
                        "unpacking a value that is not a literal",
                        value_span,
                    ))
                }
            },
        };

        for (target, element) in targets.into_iter().zip(elements) {
            out.push(self.assign(target, element, span)?);
        }
        Ok(())
    }

    /// Element type produced by iterating over `iter`.
    fn element_type(&self, iter: &Expr) -> Result<Type, TypeError> {
        match self.type_of(iter)? {
            Type::Range => Ok(self.options.index_type.clone()),
            Type::Array(array) if array.ndim == 1 => Ok(*array.dtype),
            Type::Array(array) => Ok(Type::Array(ArrayType {
                ndim: array.ndim - 1,
                ..array
            })),
            other => Err(TypeError::NotIterable {
                ty: other,
                span: iter.span,
            }),
        }
    }

    fn bind_loop_target(&mut self, target: Expr, element: Type) -> Result<Expr, TypeError> {
        let target = self.visit_expr(target)?;
        match &target.binding {
            Some(Binding::Symbol(id)) if self.symtab.get(*id).is_undetermined() => {
                self.symtab.get_mut(*id).ty = Some(element);
            }
            _ => {
                let current = self.type_of(&target)?;
                if current != element {
                    self.promote(&current, &element, target.span)?;
                }
            }
        }
        Ok(target)
    }

    fn visit_return(&mut self, value: Option<Expr>, span: Span) -> Result<Stmt, TypeError> {
        let slot = self.return_slot;
        let current = self.symtab.get(slot).ty.clone();

        let value = match value {
            Some(value) if !self.is_none_constant(&value) => value,
            _ => {
                // A bare return or `return None` makes the function void.
                match current {
                    None | Some(Type::Void) => {
                        self.symtab.get_mut(slot).ty = Some(Type::Void);
                    }
                    Some(other) => {
                        return Err(TypeError::Promotion {
                            left: other,
                            right: Type::Void,
                            span,
                        })
                    }
                }
                return Ok(Stmt::new(StmtKind::Return { value: None }, span));
            }
        };

        let ty = self.type_of(&value)?;
        let widened = match current {
            None => ty,
            Some(current) => self.promote(&current, &ty, value.span)?,
        };
        self.symtab.get_mut(slot).ty = Some(widened);

        let value_span = value.span;
        let deferred = Expr::new(
            ExprKind::DeferredCoercion {
                node: Box::new(value),
                slot,
            },
            value_span,
        )
        .with_binding(Binding::Symbol(slot));
        Ok(Stmt::new(
            StmtKind::Return {
                value: Some(deferred),
            },
            span,
        ))
    }

    // ── Expressions ────────────────────────────────────────────────────

    pub fn visit_expr(&mut self, expr: Expr) -> Result<Expr, TypeError> {
        let span = expr.span;
        match expr.kind {
            ExprKind::Name { id, ctx } => {
                let symbol = match self.symtab.lookup(&id) {
                    Some(symbol) => {
                        let var = self.symtab.get(symbol);
                        if var.is_local && var.is_undetermined() && ctx == ExprContext::Load {
                            return Err(TypeError::UnboundLocal { name: id, span });
                        }
                        symbol
                    }
                    None => self.init_global(&id),
                };
                Ok(Expr::new(ExprKind::Name { id, ctx }, span).with_binding(Binding::Symbol(symbol)))
            }
            ExprKind::Const(value) => Ok(self.constant(value, span)),
            ExprKind::Ellipsis => Ok(Expr::new(ExprKind::Ellipsis, span).with_binding(
                Binding::Value(Variable::constant(Constant::Ellipsis, Type::Ellipsis)),
            )),
            ExprKind::BinOp { left, op, right } => {
                let left = self.visit_expr(*left)?;
                let right = self.visit_expr(*right)?;
                let ty = self.promote(&self.type_of(&left)?, &self.type_of(&right)?, span)?;
                let left = self.coerce(left, &ty);
                let right = self.coerce(right, &ty);
                Ok(Expr::new(
                    ExprKind::BinOp {
                        left: Box::new(left),
                        op,
                        right: Box::new(right),
                    },
                    span,
                )
                .typed(ty))
            }
            ExprKind::BoolOp { op, values } => {
                if values.len() != 2 {
                    return Err(TypeError::unsupported(
                        "boolean operation with more than two operands",
                        span,
                    ));
                }
                let values = values
                    .into_iter()
                    .map(|v| self.visit_expr(v))
                    .collect::<Result<Vec<_>, _>>()?;
                let values = self.coerce_all(values, &Type::Bool);
                Ok(Expr::new(ExprKind::BoolOp { op, values }, span).typed(Type::Bool))
            }
            ExprKind::UnaryOp { op, operand } => {
                let operand = self.visit_expr(*operand)?;
                let (operand, ty) = if op == UnaryOp::Not {
                    (self.coerce(operand, &Type::Bool), Type::Bool)
                } else {
                    let ty = self.type_of(&operand)?;
                    (operand, ty)
                };
                Ok(Expr::new(
                    ExprKind::UnaryOp {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                )
                .typed(ty))
            }
            ExprKind::Compare {
                left,
                ops,
                comparators,
            } => {
                if ops.len() != 1 || comparators.len() != 1 {
                    return Err(TypeError::unsupported("chained comparison", span));
                }
                let left = self.visit_expr(*left)?;
                let mut comparators = comparators
                    .into_iter()
                    .map(|c| self.visit_expr(c))
                    .collect::<Result<Vec<_>, _>>()?;
                let lt = self.type_of(&left)?;
                let rt = self.type_of(&comparators[0])?;
                let left = if lt != rt {
                    let ty = self.promote(&lt, &rt, span)?;
                    comparators = self.coerce_all(comparators, &ty);
                    self.coerce(left, &ty)
                } else {
                    left
                };
                Ok(Expr::new(
                    ExprKind::Compare {
                        left: Box::new(left),
                        ops,
                        comparators,
                    },
                    span,
                )
                .typed(Type::Bool))
            }
            ExprKind::Call {
                func,
                args,
                keywords,
            } => self.visit_call(*func, args, keywords, span),
            ExprKind::Attribute { value, attr, ctx } => {
                self.visit_attribute(*value, attr, ctx, span)
            }
            ExprKind::Subscript { value, slice, ctx } => {
                self.visit_subscript(*value, *slice, ctx, span)
            }
            ExprKind::Index(inner) => {
                let inner = self.visit_expr(*inner)?;
                let ty = if self.is_none_constant(&inner) {
                    Type::NewAxis
                } else {
                    self.type_of(&inner)?
                };
                Ok(Expr::new(ExprKind::Index(Box::new(inner)), span).typed(ty))
            }
            ExprKind::Slice { lower, upper, step } => {
                let mut visit = |part: Option<Box<Expr>>| -> Result<Option<Box<Expr>>, TypeError> {
                    part.map(|p| self.visit_expr(*p).map(Box::new)).transpose()
                };
                let lower = visit(lower)?;
                let upper = visit(upper)?;
                let step = visit(step)?;
                Ok(Expr::new(ExprKind::Slice { lower, upper, step }, span).typed(Type::Slice))
            }
            ExprKind::ExtSlice(dims) => {
                let dims = dims
                    .into_iter()
                    .map(|d| self.visit_expr(d))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::new(ExprKind::ExtSlice(dims), span).typed(Type::Object))
            }
            ExprKind::Tuple { elts, ctx } => {
                let elts = elts
                    .into_iter()
                    .map(|e| self.visit_expr(e))
                    .collect::<Result<Vec<_>, _>>()?;
                let size = elts.len();
                let folded: Option<Vec<Constant>> = if ctx == ExprContext::Load {
                    elts.iter()
                        .map(|e| {
                            binding_var(e, &self.symtab)
                                .filter(|var| var.is_constant)
                                .and_then(|var| var.constant_value.clone())
                        })
                        .collect()
                } else {
                    None
                };
                let var = match folded {
                    Some(items) => Variable {
                        ty: Some(Type::Tuple {
                            size,
                            value: Some(items.clone()),
                        }),
                        is_constant: true,
                        constant_value: Some(Constant::Tuple(items)),
                        ..Default::default()
                    },
                    None => Variable::typed(Type::tuple(size)),
                };
                Ok(Expr::new(ExprKind::Tuple { elts, ctx }, span).with_binding(Binding::Value(var)))
            }
            ExprKind::List { elts, ctx } => {
                let elts = elts
                    .into_iter()
                    .map(|e| self.visit_expr(e))
                    .collect::<Result<Vec<_>, _>>()?;
                let ty = Type::List {
                    size: elts.len(),
                    value: None,
                };
                Ok(Expr::new(ExprKind::List { elts, ctx }, span).typed(ty))
            }
            ExprKind::Dict { keys, values } => {
                let keys = keys
                    .into_iter()
                    .map(|k| self.visit_expr(k))
                    .collect::<Result<Vec<_>, _>>()?;
                let values = values
                    .into_iter()
                    .map(|v| self.visit_expr(v))
                    .collect::<Result<Vec<_>, _>>()?;
                let keys = self.coerce_all(keys, &Type::Object);
                let values = self.coerce_all(values, &Type::Object);
                Ok(Expr::new(ExprKind::Dict { keys, values }, span).typed(Type::Object))
            }
            ExprKind::Coercion { .. }
            | ExprKind::DeferredCoercion { .. }
            | ExprKind::Range { .. }
            | ExprKind::NativeCall { .. }
            | ExprKind::ObjectCall { .. }
            | ExprKind::ArrayAttribute { .. }
            | ExprKind::DataPointer(_)
            | ExprKind::ObjectTemp { .. }
            | ExprKind::Temp { .. } => Err(TypeError::internal(
                "lowered node in an input tree",
                span,
            )),
        }
    }

    fn visit_attribute(
        &mut self,
        value: Expr,
        attr: String,
        ctx: ExprContext,
        span: Span,
    ) -> Result<Expr, TypeError> {
        let value = self.visit_expr(value)?;
        let ty = self.type_of(&value)?;

        let array_attr = ArrayAttr::from_name(&attr);
        let result_ty = match &ty {
            Type::Complex { bits } => {
                if attr != "real" && attr != "imag" {
                    return Err(TypeError::InvalidAttribute {
                        ty: ty.clone(),
                        attr,
                        span,
                    });
                }
                if ctx == ExprContext::Store {
                    return Err(TypeError::ReadOnlyAttribute { attr, span });
                }
                Type::Float { bits: *bits }
            }
            Type::Module { name, is_numpy } => {
                match self.namespace.module_attribute(name, &attr) {
                    Some(ModuleAttr::NewAxis) => Type::NewAxis,
                    Some(ModuleAttr::Dtype(dtype)) => Type::NumpyDtype(Box::new(dtype)),
                    Some(ModuleAttr::Function) | Some(ModuleAttr::Other) => {
                        Type::ModuleAttribute {
                            module: name.clone(),
                            attr: attr.clone(),
                            is_numpy: *is_numpy,
                        }
                    }
                    None => return self.getattr_fallback(value, attr, ctx, span),
                }
            }
            Type::Object => Type::Object,
            Type::Array(array) => {
                let Some(kind) = array_attr else {
                    return self.getattr_fallback(value, attr, ctx, span);
                };
                if ctx == ExprContext::Store {
                    return Err(TypeError::ReadOnlyAttribute { attr, span });
                }
                let attr_ty = match kind {
                    ArrayAttr::Data => Type::pointer((*array.dtype).clone()),
                    ArrayAttr::Shape | ArrayAttr::Strides => Type::carray(Type::intp(), array.ndim),
                    ArrayAttr::Ndim => Type::int32(),
                };
                return Ok(Expr::new(
                    ExprKind::ArrayAttribute {
                        attr: kind,
                        array: Box::new(value),
                        ctx,
                    },
                    span,
                )
                .typed(attr_ty));
            }
            _ => return self.getattr_fallback(value, attr, ctx, span),
        };

        Ok(Expr::new(
            ExprKind::Attribute {
                value: Box::new(value),
                attr,
                ctx,
            },
            span,
        )
        .typed(result_ty))
    }

    /// `PyObject_GetAttrString(value, "attr")` for attributes the compiler
    /// cannot resolve statically.
    fn getattr_fallback(
        &mut self,
        value: Expr,
        attr: String,
        ctx: ExprContext,
        span: Span,
    ) -> Result<Expr, TypeError> {
        if ctx == ExprContext::Store {
            let ty = self.type_of(&value)?;
            return Err(TypeError::InvalidAttribute { ty, attr, span });
        }
        let object = self.coerce(value, &Type::Object);
        let name = self.constant(Constant::Str(attr), span);
        Ok(RuntimeFn::GetAttrString.call(vec![object, name], span))
    }

    fn visit_subscript(
        &mut self,
        value: Expr,
        slice: Expr,
        ctx: ExprContext,
        span: Span,
    ) -> Result<Expr, TypeError> {
        let value = self.visit_expr(value)?;
        let slice = self.visit_expr(slice)?;
        let value_ty = self.type_of(&value)?;

        let (value, slice, result_ty) = match value_ty {
            Type::Array(array) => return self.subscript_array(value, slice, array, ctx, span),
            Type::CArray { base, .. } | Type::Pointer(base) => {
                let index_ty = self.type_of(&slice)?;
                match slice.kind {
                    ExprKind::Index(index) if index_ty.is_int() => (value, *index, *base),
                    _ => {
                        return Err(TypeError::InvalidIndex {
                            ty: self.type_of(&value)?,
                            index: Some(index_ty),
                            span,
                        })
                    }
                }
            }
            Type::Object => (value, slice, Type::Object),
            other => {
                return Err(TypeError::InvalidIndex {
                    ty: other,
                    index: binding_type(&slice, &self.symtab),
                    span,
                })
            }
        };

        Ok(Expr::new(
            ExprKind::Subscript {
                value: Box::new(value),
                slice: Box::new(slice),
                ctx,
            },
            span,
        )
        .typed(result_ty))
    }

    /// Normalize an array subscript into one selector per axis and compute
    /// the result type.
    fn subscript_array(
        &mut self,
        value: Expr,
        slice: Expr,
        array: ArrayType,
        ctx: ExprContext,
        span: Span,
    ) -> Result<Expr, TypeError> {
        let selectors = match into_selectors(slice) {
            Ok(selectors) => selectors,
            Err(slice) => return Ok(self.object_subscript(value, slice, ctx, span)),
        };
        let slice_span = selectors.first().map_or(span, |s| s.span);

        let ndim = array.ndim;
        let newaxes = selectors.iter().filter(|s| self.is_newaxis(s)).count();
        let n_indices = selectors.len() - newaxes;

        let mut result = Vec::with_capacity(ndim + newaxes);
        let mut seen_ellipsis = false;
        let mut ints = 0;
        let mut unclassified = None;
        for selector in selectors {
            let ty = self.type_of(&selector)?;
            if ty.is_ellipsis() {
                let count = if seen_ellipsis {
                    1
                } else {
                    (ndim + 1).saturating_sub(n_indices)
                };
                seen_ellipsis = true;
                result.extend((0..count).map(|_| Self::full_slice(selector.span)));
            } else if ty.is_slice() || ty.is_int() || self.is_newaxis(&selector) {
                if ty.is_int() {
                    ints += 1;
                }
                result.push(selector);
            } else {
                unclassified = Some(selector.span);
                result.push(selector);
            }
        }

        if unclassified.is_some() {
            let ext = Expr::new(ExprKind::ExtSlice(result), slice_span).typed(Type::Object);
            return Ok(self.object_subscript(value, ext, ctx, span));
        }

        let consumed = result.len() - newaxes;
        if consumed > ndim {
            return Err(TypeError::TooManyIndices {
                ndim,
                found: consumed,
                span,
            });
        }
        result.extend((consumed..ndim).map(|_| Self::full_slice(slice_span)));

        let rank = ndim + newaxes - ints;
        let result_ty = if rank == 0 {
            *array.dtype
        } else {
            Type::array(*array.dtype, rank)
        };

        let slice = Expr::new(ExprKind::ExtSlice(result), slice_span).typed(Type::Object);
        Ok(Expr::new(
            ExprKind::Subscript {
                value: Box::new(value),
                slice: Box::new(slice),
                ctx,
            },
            span,
        )
        .typed(result_ty))
    }

    /// Subscript through the host object protocol.
    fn object_subscript(&self, value: Expr, slice: Expr, ctx: ExprContext, span: Span) -> Expr {
        let value = self.coerce(value, &Type::Object);
        Expr::new(
            ExprKind::Subscript {
                value: Box::new(value),
                slice: Box::new(slice),
                ctx,
            },
            span,
        )
        .typed(Type::Object)
    }

    pub(crate) fn visit_keywords(&mut self, keywords: Vec<Keyword>) -> Result<Vec<Keyword>, TypeError> {
        keywords
            .into_iter()
            .map(|kw| {
                Ok(Keyword {
                    arg: kw.arg,
                    value: self.visit_expr(kw.value)?,
                })
            })
            .collect()
    }
}

/// Split a visited subscript slice into per-axis selectors. A slice with
/// no per-axis reading is handed back unchanged.
fn into_selectors(slice: Expr) -> Result<Vec<Expr>, Expr> {
    let single = match &slice.kind {
        ExprKind::Index(inner) => !matches!(inner.kind, ExprKind::Tuple { .. }),
        ExprKind::Ellipsis | ExprKind::Slice { .. } => true,
        _ => false,
    };
    if single {
        return Ok(vec![slice]);
    }
    match slice.kind {
        ExprKind::Index(inner) => match inner.kind {
            ExprKind::Tuple { elts, .. } => Ok(elts),
            kind => Err(Expr::new(kind, inner.span)),
        },
        ExprKind::ExtSlice(dims) => Ok(dims),
        ExprKind::Tuple { elts, .. } => Ok(elts),
        kind => Err(Expr { kind, ..slice }),
    }
}
