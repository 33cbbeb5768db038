//! A host namespace built from configuration.
//!
//! Free names resolve in this order: compiled natives, module aliases,
//! configured globals, host builtins. Anything else is a plain global.
//! Configured globals therefore shadow builtins of the same name.

use rustc_hash::{FxHashMap, FxHashSet};

use numjit_typeck::{EntryPoint, ModuleAttr, NameKind, Namespace};
use numjit_types::Type;

/// Builtins the host always provides.
const HOST_BUILTINS: &[&str] = &[
    "abs", "bool", "complex", "float", "int", "len", "max", "min", "print", "range", "round",
    "sum", "xrange",
];

/// numpy callables the inferer may see as call targets.
const NUMPY_FUNCTIONS: &[&str] = &[
    "abs", "arange", "array", "cos", "dot", "empty", "empty_like", "exp", "log", "ones",
    "ones_like", "sin", "sqrt", "sum", "zeros", "zeros_like",
];

fn numpy_dtype(attr: &str) -> Option<Type> {
    Some(match attr {
        "bool_" => Type::bool_(),
        "int8" => Type::int8(),
        "int16" => Type::int16(),
        "int32" => Type::int32(),
        "int64" | "int_" | "intp" => Type::int64(),
        "uint8" => Type::uint8(),
        "uint16" => Type::uint16(),
        "uint32" => Type::uint32(),
        "uint64" => Type::uint64(),
        "float32" | "single" => Type::float32(),
        "float64" | "double" | "float_" => Type::float64(),
        "complex64" => Type::complex64(),
        "complex128" | "complex_" => Type::complex128(),
        _ => return None,
    })
}

#[derive(Clone, Debug)]
pub struct ModuleNamespace {
    /// alias -> real module name
    modules: FxHashMap<String, String>,
    globals: FxHashSet<String>,
    natives: FxHashMap<String, EntryPoint>,
}

impl ModuleNamespace {
    /// A namespace with no modules imported.
    pub fn empty() -> Self {
        ModuleNamespace {
            modules: FxHashMap::default(),
            globals: FxHashSet::default(),
            natives: FxHashMap::default(),
        }
    }

    /// Bind `alias` to the module `name`, as `import name as alias` would.
    pub fn with_module(mut self, alias: &str, name: &str) -> Self {
        self.modules.insert(alias.to_string(), name.to_string());
        self
    }

    pub fn with_global(mut self, name: &str) -> Self {
        self.globals.insert(name.to_string());
        self
    }

    /// Bind `name` to an already compiled function.
    pub fn with_native(mut self, name: &str, entry: EntryPoint) -> Self {
        self.natives.insert(name.to_string(), entry);
        self
    }
}

impl Default for ModuleNamespace {
    /// `numpy` importable as `np` or `numpy`, plus `math`.
    fn default() -> Self {
        ModuleNamespace::empty()
            .with_module("np", "numpy")
            .with_module("numpy", "numpy")
            .with_module("math", "math")
    }
}

impl Namespace for ModuleNamespace {
    fn lookup(&self, name: &str) -> NameKind {
        if let Some(entry) = self.natives.get(name) {
            return NameKind::Native(entry.clone());
        }
        if let Some(module) = self.modules.get(name) {
            return NameKind::Module {
                name: module.clone(),
                is_numpy: module == "numpy",
            };
        }
        if self.globals.contains(name) {
            return NameKind::Global;
        }
        if HOST_BUILTINS.contains(&name) {
            NameKind::Builtin
        } else {
            NameKind::Global
        }
    }

    fn module_attribute(&self, module: &str, attr: &str) -> Option<ModuleAttr> {
        if module != "numpy" {
            // Other modules are opaque; every attribute is looked up at
            // run time.
            return Some(ModuleAttr::Other);
        }
        if attr == "newaxis" {
            return Some(ModuleAttr::NewAxis);
        }
        if let Some(dtype) = numpy_dtype(attr) {
            return Some(ModuleAttr::Dtype(dtype));
        }
        if NUMPY_FUNCTIONS.contains(&attr) {
            return Some(ModuleAttr::Function);
        }
        match attr {
            "pi" | "e" | "inf" | "nan" => Some(ModuleAttr::Other),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use numjit_types::FunctionType;

    use super::*;

    #[test]
    fn test_default_lookup() {
        let ns = ModuleNamespace::default();
        assert_eq!(ns.lookup("range"), NameKind::Builtin);
        assert_eq!(ns.lookup("data"), NameKind::Global);
        assert_eq!(
            ns.lookup("np"),
            NameKind::Module {
                name: "numpy".to_string(),
                is_numpy: true
            }
        );
        assert_eq!(
            ns.lookup("math"),
            NameKind::Module {
                name: "math".to_string(),
                is_numpy: false
            }
        );
    }

    #[test]
    fn test_globals_shadow_builtins_and_natives_shadow_everything() {
        let entry = EntryPoint {
            symbol: "np_f64".to_string(),
            signature: FunctionType::new(vec![], Type::float64()),
        };
        let ns = ModuleNamespace::default()
            .with_global("len")
            .with_native("np", entry.clone());
        assert_eq!(ns.lookup("len"), NameKind::Global);
        assert_eq!(ns.lookup("np"), NameKind::Native(entry));
    }

    #[test]
    fn test_numpy_attributes() {
        let ns = ModuleNamespace::empty();
        assert_eq!(
            ns.module_attribute("numpy", "double"),
            Some(ModuleAttr::Dtype(Type::float64()))
        );
        assert_eq!(ns.module_attribute("numpy", "newaxis"), Some(ModuleAttr::NewAxis));
        assert_eq!(ns.module_attribute("numpy", "zeros_like"), Some(ModuleAttr::Function));
        assert_eq!(ns.module_attribute("numpy", "pi"), Some(ModuleAttr::Other));
        assert_eq!(ns.module_attribute("numpy", "no_such_thing"), None);
        assert_eq!(ns.module_attribute("math", "anything"), Some(ModuleAttr::Other));
    }
}
