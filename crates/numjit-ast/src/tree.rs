//! Syntax tree node definitions.
//!
//! The tree enters the pipeline in the shape the external parser produces
//! (names, literals, calls, subscripts, loops) and leaves it with every
//! expression typed and the lowered node kinds (`Coercion`, `NativeCall`,
//! `ObjectTemp`, `Temp`, ...) spliced in. All variants are closed; passes
//! match on them exhaustively.

use numjit_common::Span;
use numjit_types::{Constant, FunctionType, SymbolId, Type, Variable};
use serde::{Deserialize, Serialize};

// ── Operators ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mult => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::LShift => "<<",
            BinOp::RShift => ">>",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitAnd => "&",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    USub,
    UAdd,
    Invert,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
        }
    }
}

/// Whether an expression is read or written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExprContext {
    #[default]
    Load,
    Store,
}

/// Array metadata reachable through attribute syntax.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrayAttr {
    Data,
    Shape,
    Strides,
    Ndim,
}

impl ArrayAttr {
    pub fn from_name(name: &str) -> Option<ArrayAttr> {
        match name {
            "data" => Some(ArrayAttr::Data),
            "shape" => Some(ArrayAttr::Shape),
            "strides" => Some(ArrayAttr::Strides),
            "ndim" => Some(ArrayAttr::Ndim),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ArrayAttr::Data => "data",
            ArrayAttr::Shape => "shape",
            ArrayAttr::Strides => "strides",
            ArrayAttr::Ndim => "ndim",
        }
    }
}

// ── Temporaries ────────────────────────────────────────────────────────

/// Id of a compiler-introduced temporary, unique within a function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TempId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TempKind {
    /// Loop counter introduced by iterable lowering.
    Index,
    /// Hoisted iterable, evaluated once before its loop.
    Array,
    /// Owned reference to a boxed object; released on every exit path.
    Object,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TempDecl {
    pub id: TempId,
    pub ty: Type,
    pub kind: TempKind,
}

// ── Expressions ────────────────────────────────────────────────────────

/// Type information attached to an expression by the inferer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Binding {
    /// A symbol-table entry, for names and deferred coercions.
    Symbol(SymbolId),
    /// A binding private to this node.
    Value(Variable),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub arg: String,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    #[serde(default)]
    pub span: Span,
    /// Set by type inference.
    #[serde(default)]
    pub binding: Option<Binding>,
    /// Set by the type setter.
    #[serde(default)]
    pub ty: Option<Type>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Name {
        id: String,
        #[serde(default)]
        ctx: ExprContext,
    },
    Const(Constant),
    BinOp {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    BoolOp {
        op: BoolOp,
        values: Vec<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOp>,
        comparators: Vec<Expr>,
    },
    Call {
        func: Box<Expr>,
        #[serde(default)]
        args: Vec<Expr>,
        #[serde(default)]
        keywords: Vec<Keyword>,
    },
    Attribute {
        value: Box<Expr>,
        attr: String,
        #[serde(default)]
        ctx: ExprContext,
    },
    Subscript {
        value: Box<Expr>,
        slice: Box<Expr>,
        #[serde(default)]
        ctx: ExprContext,
    },
    /// A single-expression subscript selector.
    Index(Box<Expr>),
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    /// Per-axis selectors of a multidimensional subscript.
    ExtSlice(Vec<Expr>),
    Ellipsis,
    Tuple {
        elts: Vec<Expr>,
        #[serde(default)]
        ctx: ExprContext,
    },
    List {
        elts: Vec<Expr>,
        #[serde(default)]
        ctx: ExprContext,
    },
    Dict {
        keys: Vec<Expr>,
        values: Vec<Expr>,
    },

    // Lowered forms. The parser never produces these.
    /// Convert `node` to `target`.
    Coercion {
        node: Box<Expr>,
        target: Type,
    },
    /// Convert `node` to whatever type the binding `slot` finally has.
    DeferredCoercion {
        node: Box<Expr>,
        slot: SymbolId,
    },
    /// A `range(start, stop, step)` iterable with every bound explicit.
    Range {
        start: Box<Expr>,
        stop: Box<Expr>,
        step: Box<Expr>,
    },
    /// Direct call of a native symbol with a known signature.
    NativeCall {
        symbol: String,
        signature: FunctionType,
        args: Vec<Expr>,
    },
    /// Call through the host's dynamic call protocol.
    ObjectCall {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
    },
    ArrayAttribute {
        attr: ArrayAttr,
        array: Box<Expr>,
        #[serde(default)]
        ctx: ExprContext,
    },
    /// Raw element pointer of an array, used as a subscript base.
    DataPointer(Box<Expr>),
    /// A boxed value owned by the function until it exits.
    ObjectTemp {
        node: Box<Expr>,
        id: Option<TempId>,
    },
    Temp {
        id: TempId,
        #[serde(default)]
        ctx: ExprContext,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr {
            kind,
            span,
            binding: None,
            ty: None,
        }
    }

    pub fn name(id: &str, ctx: ExprContext, span: Span) -> Self {
        Expr::new(
            ExprKind::Name {
                id: id.to_string(),
                ctx,
            },
            span,
        )
    }

    pub fn constant(value: Constant, span: Span) -> Self {
        Expr::new(ExprKind::Const(value), span)
    }

    /// Attach a binding, builder style.
    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.binding = Some(binding);
        self
    }

    /// Attach a private binding of the given type.
    pub fn typed(self, ty: Type) -> Self {
        self.with_binding(Binding::Value(Variable::typed(ty)))
    }

    /// Attach a private binding and set `ty`, for nodes created after
    /// type setting.
    pub fn annotated(self, ty: Type) -> Self {
        let mut expr = self.typed(ty.clone());
        expr.ty = Some(ty);
        expr
    }

    /// The constant value, if this node is a literal.
    pub fn const_value(&self) -> Option<&Constant> {
        match &self.kind {
            ExprKind::Const(value) => Some(value),
            _ => None,
        }
    }

    /// Whether this is a plain name.
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Name { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Switch a name, attribute, subscript or temporary between load and
    /// store context.
    pub fn set_ctx(&mut self, new_ctx: ExprContext) {
        match &mut self.kind {
            ExprKind::Name { ctx, .. }
            | ExprKind::Attribute { ctx, .. }
            | ExprKind::Subscript { ctx, .. }
            | ExprKind::Tuple { ctx, .. }
            | ExprKind::List { ctx, .. }
            | ExprKind::ArrayAttribute { ctx, .. }
            | ExprKind::Temp { ctx, .. } => *ctx = new_ctx,
            _ => {}
        }
    }

    pub fn ctx(&self) -> ExprContext {
        match &self.kind {
            ExprKind::Name { ctx, .. }
            | ExprKind::Attribute { ctx, .. }
            | ExprKind::Subscript { ctx, .. }
            | ExprKind::Tuple { ctx, .. }
            | ExprKind::List { ctx, .. }
            | ExprKind::ArrayAttribute { ctx, .. }
            | ExprKind::Temp { ctx, .. } => *ctx,
            _ => ExprContext::Load,
        }
    }
}

// ── Statements ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    #[serde(default)]
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    Assign {
        targets: Vec<Expr>,
        value: Expr,
    },
    AugAssign {
        target: Expr,
        op: BinOp,
        value: Expr,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        #[serde(default)]
        orelse: Vec<Stmt>,
        /// Loop counter, set by iterable lowering.
        #[serde(default)]
        index: Option<Expr>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        #[serde(default)]
        orelse: Vec<Stmt>,
    },
    If {
        test: Expr,
        body: Vec<Stmt>,
        #[serde(default)]
        orelse: Vec<Stmt>,
    },
    Return {
        value: Option<Expr>,
    },
    Expr(Expr),
    Print {
        values: Vec<Expr>,
        #[serde(default)]
        dest: Option<Expr>,
        #[serde(default = "default_nl")]
        nl: bool,
    },
    Global {
        names: Vec<String>,
    },
    Pass,
    Break,
    Continue,
}

fn default_nl() -> bool {
    true
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }

    pub fn assign(target: Expr, value: Expr, span: Span) -> Self {
        Stmt::new(
            StmtKind::Assign {
                targets: vec![target],
                value,
            },
            span,
        )
    }
}

// ── Functions ──────────────────────────────────────────────────────────

/// The value returned when the function bails out with a host exception
/// set. `value == None` means a bare return.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorReturn {
    pub value: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub args: Vec<String>,
    pub body: Vec<Stmt>,
    #[serde(default)]
    pub span: Span,
    /// Installed by the specializer.
    #[serde(default)]
    pub error_return: Option<ErrorReturn>,
    /// Temporaries introduced by lowering, in allocation order.
    #[serde(default)]
    pub temps: Vec<TempDecl>,
}

impl FunctionDef {
    pub fn new(name: &str, args: &[&str], body: Vec<Stmt>) -> Self {
        FunctionDef {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            body,
            span: Span::synthetic(),
            error_return: None,
            temps: Vec::new(),
        }
    }

    /// Allocate a new temporary and record it in the temp table.
    pub fn alloc_temp(&mut self, ty: Type, kind: TempKind) -> TempId {
        let id = TempId(self.temps.len() as u32);
        self.temps.push(TempDecl { id, ty, kind });
        id
    }
}
