//! Resolution of calls to other functions.

use numjit_types::{FunctionType, Type};

/// A native symbol and its signature.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntryPoint {
    pub symbol: String,
    pub signature: FunctionType,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallResolution {
    /// Call the compiled function directly.
    Native(EntryPoint),
    /// Box the arguments and call through the host's call protocol.
    Fallback,
}

/// Turns a callee name and concrete argument types into a call strategy,
/// compiling the callee on demand when the implementation knows its
/// source.
///
/// Implementations decide their own failure policy: a callee that cannot
/// be compiled resolves to `Fallback`.
pub trait FunctionResolver {
    fn resolve_or_compile(&self, callee: &str, arg_types: &[Type]) -> CallResolution;
}

/// A resolver that knows no functions; every call goes through the host.
#[derive(Clone, Copy, Debug, Default)]
pub struct DynamicResolver;

impl FunctionResolver for DynamicResolver {
    fn resolve_or_compile(&self, _callee: &str, _arg_types: &[Type]) -> CallResolution {
        CallResolution::Fallback
    }
}
