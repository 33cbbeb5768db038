//! Per-function symbol table.
//!
//! Bindings live in an arena indexed by `SymbolId`; names map into it
//! through an `FxHashMap`. Tree nodes refer to bindings by id, so a
//! binding whose type is resolved later (an undetermined local, the
//! return slot) is observed by every node that refers to it.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::ty::{Constant, Type};

/// A named or anonymous binding.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Resolved type. `None` for a local that has not been assigned yet.
    pub ty: Option<Type>,
    pub is_local: bool,
    pub is_constant: bool,
    pub constant_value: Option<Constant>,
    pub name: Option<String>,
}

impl Variable {
    /// A binding with a known type and no name.
    pub fn typed(ty: Type) -> Self {
        Variable {
            ty: Some(ty),
            ..Default::default()
        }
    }

    /// A local whose type is fixed up front (parameters).
    pub fn local(name: &str, ty: Option<Type>) -> Self {
        Variable {
            ty,
            is_local: true,
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    /// A global or builtin name.
    pub fn global(name: &str, ty: Type) -> Self {
        Variable {
            ty: Some(ty),
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    /// A compile-time constant with the type of its value.
    pub fn constant(value: Constant, ty: Type) -> Self {
        Variable {
            ty: Some(ty),
            is_constant: true,
            constant_value: Some(value),
            ..Default::default()
        }
    }

    pub fn is_undetermined(&self) -> bool {
        self.ty.is_none()
    }
}

/// Index of a binding in a `SymbolTable`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    vars: Vec<Variable>,
    names: FxHashMap<String, SymbolId>,
    return_slot: Option<SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding. Named bindings shadow any earlier binding of the
    /// same name.
    pub fn insert(&mut self, var: Variable) -> SymbolId {
        let id = SymbolId(self.vars.len() as u32);
        if let Some(name) = &var.name {
            self.names.insert(name.clone(), id);
        }
        self.vars.push(var);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.names.get(name).copied()
    }

    pub fn get(&self, id: SymbolId) -> &Variable {
        &self.vars[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Variable {
        &mut self.vars[id.0 as usize]
    }

    /// The anonymous binding holding the function's return type,
    /// created on first use.
    pub fn return_slot(&mut self) -> SymbolId {
        if let Some(id) = self.return_slot {
            return id;
        }
        let id = self.insert(Variable::default());
        self.return_slot = Some(id);
        id
    }

    /// The return slot if one was created.
    pub fn existing_return_slot(&self) -> Option<SymbolId> {
        self.return_slot
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Named bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Variable)> {
        self.vars
            .iter()
            .enumerate()
            .map(|(i, var)| (SymbolId(i as u32), var))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup() {
        let mut table = SymbolTable::new();
        let a = table.insert(Variable::local("a", Some(Type::float64())));
        let b = table.insert(Variable::local("b", None));
        assert_eq!(table.lookup("a"), Some(a));
        assert!(table.get(b).is_undetermined());
        assert_eq!(table.lookup("missing"), None);
    }

    #[test]
    fn return_slot_is_created_once() {
        let mut table = SymbolTable::new();
        assert_eq!(table.existing_return_slot(), None);
        let slot = table.return_slot();
        assert_eq!(table.return_slot(), slot);
        assert_eq!(table.len(), 1);
        assert!(table.get(slot).name.is_none());
    }

    #[test]
    fn later_binding_shadows() {
        let mut table = SymbolTable::new();
        table.insert(Variable::global("x", Type::Object));
        let second = table.insert(Variable::local("x", None));
        assert_eq!(table.lookup("x"), Some(second));
        table.get_mut(second).ty = Some(Type::int32());
        assert_eq!(table.get(second).ty, Some(Type::int32()));
    }
}
