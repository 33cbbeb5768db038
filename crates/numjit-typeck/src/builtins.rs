//! Call typing: host builtins, native calls, numpy constructors and the
//! object-call fallback.

use numjit_ast::{ArrayAttr, Expr, ExprContext, ExprKind, Keyword};
use numjit_common::Span;
use numjit_types::{SymbolTable, Type};

use crate::binding_type;
use crate::error::TypeError;
use crate::infer::TypeInferer;
use crate::resolve::{CallResolution, EntryPoint};

impl TypeInferer<'_> {
    pub(crate) fn visit_call(
        &mut self,
        func: Expr,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
        span: Span,
    ) -> Result<Expr, TypeError> {
        let func = self.visit_expr(func)?;
        let args = args
            .into_iter()
            .map(|a| self.visit_expr(a))
            .collect::<Result<Vec<_>, _>>()?;
        let keywords = self.visit_keywords(keywords)?;

        match self.type_of(&func)? {
            Type::Builtin(name) => self.builtin_call(&name, args, keywords, span),
            Type::Function(_) => {
                if !keywords.is_empty() {
                    // Native entry points take positional arguments only.
                    return Ok(self.object_call(func, args, keywords, Type::Object, span));
                }
                let entry = func
                    .as_name()
                    .and_then(|name| self.natives.get(name))
                    .cloned()
                    .ok_or_else(|| TypeError::internal("native callee without entry point", span))?;
                self.native_call(entry, args, span)
            }
            Type::Global(name) => self.external_call(&name, func, args, keywords, None, span),
            Type::ModuleAttribute {
                module,
                attr,
                is_numpy,
            } => {
                let special = if is_numpy {
                    Some(numpy_return_type(&attr, &args, &keywords, &self.symtab))
                } else {
                    None
                };
                let callee = format!("{}.{}", module, attr);
                self.external_call(&callee, func, args, keywords, special, span)
            }
            _ => Ok(self.object_call(func, args, keywords, Type::Object, span)),
        }
    }

    /// A direct call to a compiled function, arguments coerced to its
    /// parameter types.
    pub(crate) fn native_call(
        &self,
        entry: EntryPoint,
        args: Vec<Expr>,
        span: Span,
    ) -> Result<Expr, TypeError> {
        let params = &entry.signature.args;
        if params.len() != args.len() {
            return Err(TypeError::ArityMismatch {
                callee: entry.symbol,
                expected: params.len(),
                found: args.len(),
                span,
            });
        }
        let args = args
            .into_iter()
            .zip(params)
            .map(|(arg, param)| self.coerce(arg, param))
            .collect();
        let ret = entry.signature.ret.clone();
        Ok(Expr::new(
            ExprKind::NativeCall {
                symbol: entry.symbol,
                signature: entry.signature,
                args,
            },
            span,
        )
        .typed(ret))
    }

    /// A call to a global: compiled through the resolver when possible,
    /// otherwise an object call typed `special` (numpy constructors) or
    /// `object`.
    fn external_call(
        &mut self,
        callee: &str,
        func: Expr,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
        special: Option<Type>,
        span: Span,
    ) -> Result<Expr, TypeError> {
        if keywords.is_empty() {
            let arg_types = args
                .iter()
                .map(|a| self.type_of(a))
                .collect::<Result<Vec<_>, _>>()?;
            if let CallResolution::Native(entry) =
                self.resolver.resolve_or_compile(callee, &arg_types)
            {
                log::debug!("[infer] `{}` resolved to native {}", callee, entry.symbol);
                return self.native_call(entry, args, span);
            }
        }
        log::debug!("[infer] `{}` called through the object protocol", callee);
        Ok(self.object_call(func, args, keywords, special.unwrap_or(Type::Object), span))
    }

    /// Box everything and call through the host.
    pub(crate) fn object_call(
        &self,
        func: Expr,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
        ty: Type,
        span: Span,
    ) -> Expr {
        let func = self.coerce(func, &Type::Object);
        let args = self.coerce_all(args, &Type::Object);
        let keywords = keywords
            .into_iter()
            .map(|kw| Keyword {
                arg: kw.arg,
                value: self.coerce(kw.value, &Type::Object),
            })
            .collect();
        Expr::new(
            ExprKind::ObjectCall {
                func: Box::new(func),
                args,
                keywords,
            },
            span,
        )
        .typed(ty)
    }

    fn builtin_call(
        &mut self,
        name: &str,
        mut args: Vec<Expr>,
        keywords: Vec<Keyword>,
        span: Span,
    ) -> Result<Expr, TypeError> {
        if !keywords.is_empty() {
            return Err(TypeError::unsupported(
                format!("keyword arguments to `{}`", name),
                span,
            ));
        }
        let arity = |expected: &str, args: &[Expr]| TypeError::BuiltinArity {
            name: name.to_string(),
            expected: expected.to_string(),
            found: args.len(),
            span,
        };

        match name {
            "range" | "xrange" => {
                if args.is_empty() || args.len() > 3 {
                    return Err(arity("1 to 3", &args));
                }
                let (start, stop, step) = match args.len() {
                    1 => (self.index_constant(0, span), args.remove(0), self.index_constant(1, span)),
                    2 => {
                        let start = args.remove(0);
                        (start, args.remove(0), self.index_constant(1, span))
                    }
                    _ => {
                        let start = args.remove(0);
                        let stop = args.remove(0);
                        (start, stop, args.remove(0))
                    }
                };
                let index = self.options.index_type.clone();
                Ok(Expr::new(
                    ExprKind::Range {
                        start: Box::new(self.coerce(start, &index)),
                        stop: Box::new(self.coerce(stop, &index)),
                        step: Box::new(self.coerce(step, &index)),
                    },
                    span,
                )
                .typed(Type::Range))
            }
            "len" => {
                if args.len() != 1 {
                    return Err(arity("1", &args));
                }
                let array = args.remove(0);
                let ndim = match self.type_of(&array)? {
                    Type::Array(array) => array.ndim,
                    _ => {
                        return Err(TypeError::UnsupportedBuiltin {
                            name: "len".to_string(),
                            span,
                        })
                    }
                };
                let shape = Expr::new(
                    ExprKind::ArrayAttribute {
                        attr: ArrayAttr::Shape,
                        array: Box::new(array),
                        ctx: ExprContext::Load,
                    },
                    span,
                )
                .typed(Type::carray(Type::intp(), ndim));
                Ok(Expr::new(
                    ExprKind::Subscript {
                        value: Box::new(shape),
                        slice: Box::new(self.index_constant(0, span)),
                        ctx: ExprContext::Load,
                    },
                    span,
                )
                .typed(Type::intp()))
            }
            "int" | "float" => {
                if args.len() != 1 {
                    return Err(arity("1", &args));
                }
                let target = if name == "int" {
                    self.options.int_builtin.clone()
                } else {
                    self.options.float_builtin.clone()
                };
                Ok(self.coerce(args.remove(0), &target))
            }
            other => Err(TypeError::UnsupportedBuiltin {
                name: other.to_string(),
                span,
            }),
        }
    }
}

/// Result type of a numpy constructor call, `object` when it cannot be
/// determined statically.
fn numpy_return_type(
    attr: &str,
    args: &[Expr],
    keywords: &[Keyword],
    symtab: &SymbolTable,
) -> Type {
    let keyword = |name: &str| {
        keywords
            .iter()
            .find(|kw| kw.arg == name)
            .map(|kw| &kw.value)
    };
    let dtype_of = |expr: Option<&Expr>| -> Option<Option<Type>> {
        expr.map(|e| match binding_type(e, symtab) {
            Some(Type::NumpyDtype(dtype)) => Some(*dtype),
            _ => None,
        })
    };

    match attr {
        "zeros_like" | "ones_like" | "empty_like" => {
            let (array, rest) = match keyword("a") {
                Some(array) => (Some(array), args),
                None => (args.first(), args.get(1..).unwrap_or(&[])),
            };
            let Some(Type::Array(array)) = array.and_then(|a| binding_type(a, symtab)) else {
                return Type::Object;
            };
            match dtype_of(keyword("dtype").or(rest.first())) {
                None => Type::Array(array),
                Some(Some(dtype)) => Type::array(dtype, array.ndim),
                Some(None) => Type::Object,
            }
        }
        "arange" => match dtype_of(keyword("dtype").or(args.get(3))) {
            None => Type::array(Type::int64(), 1),
            Some(Some(dtype)) => Type::array(dtype, 1),
            Some(None) => Type::Object,
        },
        _ => Type::Object,
    }
}
