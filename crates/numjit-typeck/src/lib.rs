//! numjit type checker: forward type inference and type setting.
//!
//! Inference runs once per function and per concrete argument-type tuple.
//! It is local: callee return types come from an injected
//! [`FunctionResolver`], free names are classified by an injected
//! [`Namespace`].
//!
//! # Architecture
//!
//! - [`infer`]: the forward inference pass (pass 1)
//! - [`builtins`]: `range`, `len`, `int`, `float` and numpy call typing
//! - [`setter`]: copies resolved types onto nodes (pass 2)
//! - [`coerce`]: coercion and deferred-coercion markers
//! - [`runtime`]: host runtime entry points used by lowered code
//! - [`error`] / [`diagnostics`]: errors and their rendering

pub mod builtins;
pub mod coerce;
pub mod diagnostics;
pub mod error;
pub mod infer;
pub mod namespace;
pub mod resolve;
pub mod runtime;
pub mod setter;

use numjit_ast::{Binding, Expr};
use numjit_types::{SymbolTable, Type, Variable};

pub use error::{ErrorKind, TypeError};
pub use infer::{infer_function, Inferred};
pub use namespace::{ModuleAttr, NameKind, Namespace};
pub use resolve::{CallResolution, DynamicResolver, EntryPoint, FunctionResolver};
pub use setter::set_types;

/// The signature a function is compiled for: concrete argument types and
/// an optional declared return type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    pub args: Vec<Type>,
    pub ret: Option<Type>,
}

impl Signature {
    pub fn new(args: Vec<Type>, ret: Option<Type>) -> Self {
        Signature { args, ret }
    }
}

/// Types the inferer picks for constructs the source leaves implicit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeckOptions {
    /// Loop counters, `range` bounds and constant indices.
    pub index_type: Type,
    /// Target of the `int(x)` builtin.
    pub int_builtin: Type,
    /// Target of the `float(x)` builtin.
    pub float_builtin: Type,
}

impl Default for TypeckOptions {
    fn default() -> Self {
        TypeckOptions {
            index_type: Type::intp(),
            int_builtin: Type::int32(),
            float_builtin: Type::float32(),
        }
    }
}

/// The variable an expression is bound to, looking symbols up in `symtab`.
pub fn binding_var<'a>(expr: &'a Expr, symtab: &'a SymbolTable) -> Option<&'a Variable> {
    match expr.binding.as_ref()? {
        Binding::Symbol(id) => Some(symtab.get(*id)),
        Binding::Value(var) => Some(var),
    }
}

/// The type of an expression: its binding's type during inference, the
/// `ty` field for nodes that carry no binding.
pub fn binding_type(expr: &Expr, symtab: &SymbolTable) -> Option<Type> {
    match binding_var(expr, symtab) {
        Some(var) => var.ty.clone(),
        None => expr.ty.clone(),
    }
}
