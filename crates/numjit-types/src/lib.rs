//! Types, the promotion lattice and symbol tables for numjit.
//!
//! Every pass of the compiler reads and writes types through this crate:
//! the inferer promotes and classifies, the specializer asks for
//! representations, and the driver keys its cache on argument types.

pub mod lattice;
pub mod parse;
pub mod symtab;
pub mod ty;

pub use lattice::{classify, from_native_value, promote, Classification, NumericKind, PromoteError, TypeKind};
pub use parse::ParseTypeError;
pub use symtab::{SymbolId, SymbolTable, Variable};
pub use ty::{ArrayType, Constant, FunctionType, Type};
