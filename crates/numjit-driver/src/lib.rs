//! numjit driver: runs the passes over a function and caches the result
//! per concrete argument-type tuple.
//!
//! - [`pipeline`]: inference, type setting, iterable lowering, specialization
//! - [`cache`]: the specialization cache, which doubles as the call resolver
//! - [`namespace`]: a configurable host namespace with numpy's attribute table
//! - [`config`]: `numjit.toml` loading

pub mod cache;
pub mod config;
pub mod namespace;
pub mod pipeline;

pub use cache::{CompileError, FunctionCache};
pub use config::Config;
pub use namespace::ModuleNamespace;
pub use pipeline::{compile_function, CompiledFunction};
