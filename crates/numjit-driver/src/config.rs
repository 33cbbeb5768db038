use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use numjit_typeck::TypeckOptions;
use numjit_types::Type;

use crate::namespace::ModuleNamespace;

/// A parsed `numjit.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub types: TypesSection,
    #[serde(default)]
    pub namespace: NamespaceSection,
}

/// The `[types]` section. Each entry is a type name such as `"int32"`;
/// missing entries keep the compiler defaults.
#[derive(Debug, Default, Deserialize)]
pub struct TypesSection {
    #[serde(default)]
    pub index_type: Option<String>,
    #[serde(default)]
    pub int_builtin: Option<String>,
    #[serde(default)]
    pub float_builtin: Option<String>,
}

/// The `[namespace]` section.
#[derive(Debug, Default, Deserialize)]
pub struct NamespaceSection {
    /// Names that are plain globals even if the host has a builtin of the
    /// same name.
    #[serde(default)]
    pub globals: Vec<String>,
    /// Extra module aliases, alias -> module name.
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

impl Config {
    /// Read and parse a numjit.toml from a file path.
    pub fn from_file(path: &Path) -> Result<Config, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_str(&content)
    }

    /// Parse a numjit.toml from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Config, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config: {}", e))
    }

    pub fn typeck_options(&self) -> Result<TypeckOptions, String> {
        let defaults = TypeckOptions::default();
        Ok(TypeckOptions {
            index_type: parse_type("index_type", &self.types.index_type, defaults.index_type)?,
            int_builtin: parse_type("int_builtin", &self.types.int_builtin, defaults.int_builtin)?,
            float_builtin: parse_type(
                "float_builtin",
                &self.types.float_builtin,
                defaults.float_builtin,
            )?,
        })
    }

    /// The default namespace extended with the configured globals and
    /// module aliases.
    pub fn namespace(&self) -> ModuleNamespace {
        let mut namespace = ModuleNamespace::default();
        for name in &self.namespace.globals {
            namespace = namespace.with_global(name);
        }
        for (alias, module) in &self.namespace.modules {
            namespace = namespace.with_module(alias, module);
        }
        namespace
    }
}

fn parse_type(key: &str, value: &Option<String>, default: Type) -> Result<Type, String> {
    match value {
        None => Ok(default),
        Some(text) => text
            .parse()
            .map_err(|e| format!("Invalid [types] {}: {}", key, e)),
    }
}
