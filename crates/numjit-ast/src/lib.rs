//! The numjit function syntax tree.
//!
//! An external parser hands numjit one function at a time as a
//! [`FunctionDef`] (usually deserialized from JSON). The passes annotate it
//! in place and splice in lowered node kinds; [`printer`] renders the
//! result for inspection.

pub mod build;
pub mod locals;
pub mod printer;
pub mod tree;
pub mod visit;

pub use tree::{
    ArrayAttr, BinOp, Binding, BoolOp, CmpOp, ErrorReturn, Expr, ExprContext, ExprKind,
    FunctionDef, Keyword, Stmt, StmtKind, TempDecl, TempId, TempKind, UnaryOp,
};
