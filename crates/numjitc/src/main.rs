//! The numjit front-end CLI.
//!
//! - `numjitc compile <tree.json> --arg T...` - Infer, lower and specialize
//!   one function of a parser-produced tree for concrete argument types
//!
//! Options:
//! - `--ret` - Declared return type
//! - `--entry` - Function to compile when the tree holds several
//! - `--config` - Path to a numjit.toml
//! - `--source` - Source text the tree's spans point into, for diagnostics
//! - `--emit` - What to print: the lowered tree, the signature, or JSON
//! - `--json` - Output diagnostics as JSON
//! - `-v` - More logging on stderr (repeatable)

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use numjit_ast::printer::print_function;
use numjit_ast::FunctionDef;
use numjit_driver::{CompileError, CompiledFunction, Config, FunctionCache};
use numjit_typeck::diagnostics::{diagnostic_json, render_diagnostic};
use numjit_typeck::Signature;
use numjit_types::Type;

#[derive(Parser)]
#[command(name = "numjitc", version, about = "The numjit front end")]
struct Cli {
    /// Log more on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile one function for concrete argument types
    Compile {
        /// JSON tree: one function or a list of functions
        tree: PathBuf,

        /// Argument type, once per parameter (e.g. `float64[:, :]`)
        #[arg(long = "arg", value_name = "TYPE")]
        args: Vec<Type>,

        /// Declared return type
        #[arg(long, value_name = "TYPE")]
        ret: Option<Type>,

        /// Function to compile (defaults to the first in the tree)
        #[arg(long)]
        entry: Option<String>,

        /// Path to a numjit.toml
        #[arg(long)]
        config: Option<PathBuf>,

        /// Source file the tree's spans refer to
        #[arg(long)]
        source: Option<PathBuf>,

        /// What to print on success
        #[arg(long, value_enum, default_value = "tree")]
        emit: Emit,

        /// Output diagnostics as JSON (one object per line)
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Emit {
    /// The lowered function
    Tree,
    /// `name: (args) -> ret`
    Signature,
    /// The lowered function as JSON
    Json,
}

/// A tree file holds a single function or several.
#[derive(Deserialize)]
#[serde(untagged)]
enum TreeFile {
    Many(Vec<FunctionDef>),
    One(Box<FunctionDef>),
}

/// Why `compile` failed.
enum Failure {
    /// A type error in the entry function, rendered against the source.
    Type(numjit_typeck::TypeError),
    Other(String),
}

impl From<String> for Failure {
    fn from(msg: String) -> Self {
        Failure::Other(msg)
    }
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Commands::Compile {
            tree,
            args,
            ret,
            entry,
            config,
            source,
            emit,
            json,
        } => {
            let signature = Signature::new(args, ret);
            let result = compile(&tree, &signature, entry.as_deref(), config.as_deref());
            match result {
                Ok(compiled) => match render(&compiled, emit) {
                    Ok(out) => println!("{}", out),
                    Err(e) => fail(&Failure::Other(e), None, json),
                },
                Err(failure) => fail(&failure, source.as_deref(), json),
            }
        }
    }
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let applied = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}: {}",
                record.level().to_string().to_lowercase(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply();
    if let Err(e) = applied {
        eprintln!("warning: logging disabled: {}", e);
    }
}

/// Load the tree and config, register every function, compile the entry.
fn compile(
    tree: &Path,
    signature: &Signature,
    entry: Option<&str>,
    config: Option<&Path>,
) -> Result<CompiledFunction, Failure> {
    let config = match config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let functions = load_tree(tree)?;
    let name = match entry {
        Some(name) => name.to_string(),
        None => functions
            .first()
            .map(|f| f.name.clone())
            .ok_or_else(|| format!("'{}' contains no functions", tree.display()))?,
    };

    let cache = FunctionCache::new(config.namespace(), config.typeck_options()?);
    for func in functions {
        cache.register(func);
    }

    let compiled = match &signature.ret {
        Some(_) => cache.compile_declared(&name, signature),
        None => cache
            .compile(&name, &signature.args)
            .map(|compiled| (*compiled).clone()),
    };
    compiled.map_err(|e| match e {
        CompileError::Type(err) => Failure::Type(err),
        other => Failure::Other(other.to_string()),
    })
}

fn load_tree(path: &Path) -> Result<Vec<FunctionDef>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let file: TreeFile = serde_json::from_str(&text)
        .map_err(|e| format!("Failed to parse '{}': {}", path.display(), e))?;
    Ok(match file {
        TreeFile::Many(functions) => functions,
        TreeFile::One(func) => vec![*func],
    })
}

fn render(compiled: &CompiledFunction, emit: Emit) -> Result<String, String> {
    match emit {
        Emit::Tree => Ok(print_function(&compiled.func).trim_end().to_string()),
        Emit::Signature => Ok(format!("{}: {}", compiled.func.name, compiled.signature)),
        Emit::Json => serde_json::to_string_pretty(&compiled.func)
            .map_err(|e| format!("Failed to serialize tree: {}", e)),
    }
}

fn fail(failure: &Failure, source: Option<&Path>, json: bool) -> ! {
    match failure {
        Failure::Type(err) => {
            let (text, file) = match source {
                Some(path) => (
                    std::fs::read_to_string(path).unwrap_or_default(),
                    path.display().to_string(),
                ),
                None => (String::new(), "<tree>".to_string()),
            };
            if json {
                eprintln!("{}", diagnostic_json(err, &text, &file));
            } else {
                eprint!("{}", render_diagnostic(err, &text, &file));
            }
        }
        Failure::Other(msg) => {
            if json {
                let msg = serde_json::json!({
                    "code": "C0001",
                    "severity": "error",
                    "message": msg,
                    "file": "",
                    "spans": [],
                    "fix": null
                });
                eprintln!("{}", msg);
            } else {
                eprintln!("error: {}", msg);
            }
        }
    }
    process::exit(1);
}
