//! The type lattice: promotion, classification and constant typing.
//!
//! `promote` computes the least common type two values can both be
//! converted to. It is symmetric and reflexive; pairs without a common
//! type produce a `PromoteError` that callers turn into a diagnostic.

use std::fmt;

use crate::ty::{ArrayType, Constant, Type};

/// Two types have no common representation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromoteError {
    pub left: Type,
    pub right: Type,
}

impl fmt::Display for PromoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot promote types {} and {}", self.left, self.right)
    }
}

impl std::error::Error for PromoteError {}

/// Compute the promoted type of `a` and `b`.
pub fn promote(a: &Type, b: &Type) -> Result<Type, PromoteError> {
    promote_ordered(a, b)
        .or_else(|| promote_ordered(b, a))
        .ok_or_else(|| PromoteError {
            left: a.clone(),
            right: b.clone(),
        })
}

/// One direction of the promotion table. `promote` tries both argument
/// orders, so each rule only needs to be written once.
fn promote_ordered(a: &Type, b: &Type) -> Option<Type> {
    if a == b {
        return Some(a.clone());
    }

    match (a, b) {
        (Type::Object, other) if !other.is_void() => Some(Type::Object),

        (Type::Bool, other) if other.is_numeric() => Some(other.clone()),

        (
            Type::Int { signed: s1, bits: b1 },
            Type::Int { signed: s2, bits: b2 },
        ) => Some(Type::Int {
            signed: *s1 || *s2,
            bits: (*b1).max(*b2),
        }),

        (Type::Int { .. }, Type::Float { .. }) => Some(b.clone()),

        (Type::Float { bits: b1 }, Type::Float { bits: b2 }) => Some(Type::Float {
            bits: (*b1).max(*b2),
        }),

        (Type::Complex { bits }, Type::Int { .. }) => Some(Type::Complex { bits: *bits }),
        (Type::Complex { bits: c }, Type::Float { bits: f }) => Some(Type::Complex {
            bits: (*c).max(*f),
        }),
        (Type::Complex { bits: b1 }, Type::Complex { bits: b2 }) => Some(Type::Complex {
            bits: (*b1).max(*b2),
        }),

        (Type::Pointer(_), Type::Int { .. }) => Some(a.clone()),

        (Type::Array(x), Type::Array(y)) => {
            let dtype = promote(&x.dtype, &y.dtype).ok()?;
            Some(Type::Array(ArrayType {
                dtype: Box::new(dtype),
                ndim: x.ndim.max(y.ndim),
                c_contig: x.c_contig && y.c_contig,
                inner_contig: x.inner_contig && y.inner_contig,
            }))
        }

        (Type::Array(x), scalar) if scalar.is_numeric() => {
            let dtype = promote(&x.dtype, scalar).ok()?;
            Some(Type::Array(ArrayType {
                dtype: Box::new(dtype),
                ..x.clone()
            }))
        }

        (Type::Tuple { size: n1, .. }, Type::Tuple { size: n2, .. }) if n1 == n2 => {
            Some(Type::Tuple {
                size: *n1,
                value: None,
            })
        }
        (Type::List { size: n1, .. }, Type::List { size: n2, .. }) if n1 == n2 => {
            Some(Type::List {
                size: *n1,
                value: None,
            })
        }

        (Type::CArray { base: b1, size: n1 }, Type::CArray { base: b2, size: n2 })
            if n1 == n2 =>
        {
            let base = promote(b1, b2).ok()?;
            Some(Type::carray(base, *n1))
        }

        _ => None,
    }
}

// ── Classification ─────────────────────────────────────────────────────

/// Mutually exclusive kind of a type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Scalar,
    Pointer,
    Array,
    CArray,
    Tuple,
    List,
    Range,
    Slice,
    Ellipsis,
    NewAxis,
    Object,
    Void,
    Module,
    ModuleAttribute,
    NumpyDtype,
    Builtin,
    Global,
    Function,
}

/// Numeric category of a scalar or of an array's elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumericKind {
    Bool,
    Int,
    Float,
    Complex,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Classification {
    pub kind: TypeKind,
    pub numeric: Option<NumericKind>,
}

fn numeric_kind(ty: &Type) -> Option<NumericKind> {
    match ty {
        Type::Bool => Some(NumericKind::Bool),
        Type::Int { .. } => Some(NumericKind::Int),
        Type::Float { .. } => Some(NumericKind::Float),
        Type::Complex { .. } => Some(NumericKind::Complex),
        _ => None,
    }
}

/// Classify a type along the kind axis and, where meaningful, the
/// numeric axis.
pub fn classify(ty: &Type) -> Classification {
    let kind = match ty {
        Type::Bool | Type::Int { .. } | Type::Float { .. } | Type::Complex { .. } => {
            TypeKind::Scalar
        }
        Type::Pointer(_) => TypeKind::Pointer,
        Type::Array(_) => TypeKind::Array,
        Type::CArray { .. } => TypeKind::CArray,
        Type::Tuple { .. } => TypeKind::Tuple,
        Type::List { .. } => TypeKind::List,
        Type::Range => TypeKind::Range,
        Type::Slice => TypeKind::Slice,
        Type::Ellipsis => TypeKind::Ellipsis,
        Type::NewAxis => TypeKind::NewAxis,
        Type::Object => TypeKind::Object,
        Type::Void => TypeKind::Void,
        Type::Module { .. } => TypeKind::Module,
        Type::ModuleAttribute { .. } => TypeKind::ModuleAttribute,
        Type::NumpyDtype(_) => TypeKind::NumpyDtype,
        Type::Builtin(_) => TypeKind::Builtin,
        Type::Global(_) => TypeKind::Global,
        Type::Function(_) => TypeKind::Function,
    };
    let numeric = match ty {
        Type::Array(array) => numeric_kind(&array.dtype),
        other => numeric_kind(other),
    };
    Classification { kind, numeric }
}

/// The type of a host value known at compile time.
pub fn from_native_value(value: &Constant) -> Type {
    match value {
        Constant::Bool(_) => Type::Bool,
        Constant::Int(_) => Type::int64(),
        Constant::Float(_) => Type::float64(),
        Constant::Complex(..) => Type::complex128(),
        Constant::Str(_) => Type::c_string(),
        Constant::None | Constant::Null => Type::Object,
        Constant::Ellipsis => Type::Ellipsis,
        Constant::Stdout => Type::pointer(Type::Void),
        Constant::Tuple(items) => Type::Tuple {
            size: items.len(),
            value: Some(items.clone()),
        },
    }
}
