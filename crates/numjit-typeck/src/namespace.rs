//! Name classification for names a function does not bind itself.
//!
//! The inferer never inspects the host environment directly. Whatever owns
//! the function's globals implements [`Namespace`] and answers two
//! questions: what kind of thing a free name is, and what a module
//! attribute refers to.

use numjit_types::Type;

use crate::resolve::EntryPoint;

/// Classification of a free name.
#[derive(Clone, Debug, PartialEq)]
pub enum NameKind {
    /// A host builtin such as `range` or `len`.
    Builtin,
    /// An imported module; `name` is the module's real name, not the alias.
    Module { name: String, is_numpy: bool },
    /// An already compiled native function.
    Native(EntryPoint),
    /// Any other global value.
    Global,
}

/// What a module attribute refers to.
#[derive(Clone, Debug, PartialEq)]
pub enum ModuleAttr {
    /// The array-indexing new-axis marker.
    NewAxis,
    /// A scalar dtype such as `float32`.
    Dtype(Type),
    /// A callable.
    Function,
    /// Any other attribute.
    Other,
}

pub trait Namespace {
    fn lookup(&self, name: &str) -> NameKind;

    /// `None` when the module has no such attribute.
    fn module_attribute(&self, module: &str, attr: &str) -> Option<ModuleAttr>;
}
