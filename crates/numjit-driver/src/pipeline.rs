//! The pass pipeline for one function and one signature.

use numjit_ast::FunctionDef;
use numjit_lower::{lower_iterables, specialize};
use numjit_typeck::{
    infer_function, set_types, EntryPoint, FunctionResolver, Namespace, Signature, TypeError,
    TypeckOptions,
};
use numjit_types::{FunctionType, SymbolTable, Type};

/// A function after every pass, ready for code generation.
#[derive(Clone, Debug)]
pub struct CompiledFunction {
    pub signature: FunctionType,
    pub symtab: SymbolTable,
    pub func: FunctionDef,
}

impl CompiledFunction {
    /// The symbol callers link against. Distinct argument types give
    /// distinct symbols.
    pub fn symbol(&self) -> String {
        mangle(&self.func.name, &self.signature.args)
    }

    pub fn entry_point(&self) -> EntryPoint {
        EntryPoint {
            symbol: self.symbol(),
            signature: self.signature.clone(),
        }
    }
}

/// Run inference, type setting, iterable lowering and specialization.
pub fn compile_function(
    mut func: FunctionDef,
    signature: &Signature,
    namespace: &dyn Namespace,
    resolver: &dyn FunctionResolver,
    options: &TypeckOptions,
) -> Result<CompiledFunction, TypeError> {
    log::debug!(
        "[pipeline] compiling `{}` for ({})",
        func.name,
        join(&signature.args)
    );

    let inferred = infer_function(&mut func, signature, namespace, resolver, options)?;
    set_types(&mut func, &inferred.symtab)?;
    lower_iterables(&mut func, &inferred.symtab, &options.index_type)?;
    specialize(&mut func, &inferred.signature, &inferred.symtab)?;

    log::info!("[pipeline] compiled `{}` as {}", func.name, inferred.signature);
    Ok(CompiledFunction {
        signature: inferred.signature,
        symtab: inferred.symtab,
        func,
    })
}

/// `name__arg1_arg2`, with every character outside `[A-Za-z0-9_]`
/// replaced by `_`.
pub fn mangle(name: &str, args: &[Type]) -> String {
    let mut symbol = format!("{}_", name);
    for arg in args {
        symbol.push('_');
        symbol.extend(arg.to_string().chars().map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        }));
    }
    symbol
}

pub(crate) fn join(types: &[Type]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
