//! Type errors raised by the numjit passes.
//!
//! Every variant carries the span of the offending node. Constructs the
//! compiler can still handle dynamically (object calls, object subscripts)
//! are never errors; these variants are reserved for programs that cannot
//! be compiled at all.

use std::fmt;

use numjit_common::Span;
use numjit_types::Type;

/// Coarse grouping of errors, for callers that only need to decide
/// policy (reject the function, fall back to the interpreter, report a
/// compiler bug).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A construct outside the compilable subset.
    Unsupported,
    /// A well-formed construct applied to the wrong types.
    Type,
    /// A name read before it is bound.
    UnboundName,
    /// A pass invariant was violated.
    Internal,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeError {
    /// `construct` names what was rejected, e.g. "else clause on a for loop".
    Unsupported { construct: String, span: Span },
    /// Two types have no common representation.
    Promotion { left: Type, right: Type, span: Span },
    /// `a, b = t` where `t` has `found` elements and there are `expected`
    /// targets.
    UnpackArity {
        found: usize,
        expected: usize,
        span: Span,
    },
    /// Unpacking something that is not a C array, list or tuple.
    UnpackType { ty: Type, span: Span },
    BuiltinArity {
        name: String,
        expected: String,
        found: usize,
        span: Span,
    },
    UnsupportedBuiltin { name: String, span: Span },
    ArityMismatch {
        callee: String,
        expected: usize,
        found: usize,
        span: Span,
    },
    InvalidAttribute { ty: Type, attr: String, span: Span },
    ReadOnlyAttribute { attr: String, span: Span },
    InvalidIndex {
        ty: Type,
        index: Option<Type>,
        span: Span,
    },
    TooManyIndices {
        ndim: usize,
        found: usize,
        span: Span,
    },
    NotIterable { ty: Type, span: Span },
    UnboundLocal { name: String, span: Span },
    Internal { message: String, span: Span },
}

impl TypeError {
    pub fn unsupported(construct: impl Into<String>, span: Span) -> Self {
        TypeError::Unsupported {
            construct: construct.into(),
            span,
        }
    }

    pub fn internal(message: impl Into<String>, span: Span) -> Self {
        TypeError::Internal {
            message: message.into(),
            span,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TypeError::Unsupported { .. } => ErrorKind::Unsupported,
            TypeError::Promotion { .. }
            | TypeError::UnpackArity { .. }
            | TypeError::UnpackType { .. }
            | TypeError::BuiltinArity { .. }
            | TypeError::UnsupportedBuiltin { .. }
            | TypeError::ArityMismatch { .. }
            | TypeError::InvalidAttribute { .. }
            | TypeError::ReadOnlyAttribute { .. }
            | TypeError::InvalidIndex { .. }
            | TypeError::TooManyIndices { .. }
            | TypeError::NotIterable { .. } => ErrorKind::Type,
            TypeError::UnboundLocal { .. } => ErrorKind::UnboundName,
            TypeError::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            TypeError::Unsupported { span, .. }
            | TypeError::Promotion { span, .. }
            | TypeError::UnpackArity { span, .. }
            | TypeError::UnpackType { span, .. }
            | TypeError::BuiltinArity { span, .. }
            | TypeError::UnsupportedBuiltin { span, .. }
            | TypeError::ArityMismatch { span, .. }
            | TypeError::InvalidAttribute { span, .. }
            | TypeError::ReadOnlyAttribute { span, .. }
            | TypeError::InvalidIndex { span, .. }
            | TypeError::TooManyIndices { span, .. }
            | TypeError::NotIterable { span, .. }
            | TypeError::UnboundLocal { span, .. }
            | TypeError::Internal { span, .. } => *span,
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::Unsupported { construct, .. } => {
                write!(f, "unsupported: {}", construct)
            }
            TypeError::Promotion { left, right, .. } => {
                write!(f, "cannot promote types `{}` and `{}`", left, right)
            }
            TypeError::UnpackArity {
                found, expected, ..
            } => {
                write!(
                    f,
                    "too many/few values to unpack, got ({}, {})",
                    found, expected
                )
            }
            TypeError::UnpackType { ty, .. } => {
                write!(
                    f,
                    "cannot unpack a value of type `{}`; only C arrays, lists and tuples unpack",
                    ty
                )
            }
            TypeError::BuiltinArity {
                name,
                expected,
                found,
                ..
            } => {
                write!(
                    f,
                    "builtin `{}` takes {} arguments, found {}",
                    name, expected, found
                )
            }
            TypeError::UnsupportedBuiltin { name, .. } => {
                write!(f, "unsupported call to builtin `{}`", name)
            }
            TypeError::ArityMismatch {
                callee,
                expected,
                found,
                ..
            } => {
                write!(
                    f,
                    "`{}` takes {} arguments, found {}",
                    callee, expected, found
                )
            }
            TypeError::InvalidAttribute { ty, attr, .. } => {
                write!(f, "type `{}` has no attribute `{}`", ty, attr)
            }
            TypeError::ReadOnlyAttribute { attr, .. } => {
                write!(f, "cannot assign to read-only attribute `{}`", attr)
            }
            TypeError::InvalidIndex { ty, index, .. } => match index {
                Some(index) => write!(f, "cannot index `{}` with `{}`", ty, index),
                None => write!(f, "cannot index `{}`", ty),
            },
            TypeError::TooManyIndices { ndim, found, .. } => {
                write!(
                    f,
                    "too many indices: array has {} dimensions, {} indexed",
                    ndim, found
                )
            }
            TypeError::NotIterable { ty, .. } => {
                write!(f, "cannot iterate over `{}`", ty)
            }
            TypeError::UnboundLocal { name, .. } => {
                write!(f, "local variable `{}` referenced before assignment", name)
            }
            TypeError::Internal { message, .. } => {
                write!(f, "internal compiler error: {}", message)
            }
        }
    }
}

impl std::error::Error for TypeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_arity_reports_size_then_targets() {
        let err = TypeError::UnpackArity {
            found: 3,
            expected: 2,
            span: Span::new(0, 4),
        };
        assert_eq!(err.to_string(), "too many/few values to unpack, got (3, 2)");
        assert_eq!(err.kind(), ErrorKind::Type);
        assert_eq!(err.span(), Span::new(0, 4));
    }

    #[test]
    fn kinds() {
        let span = Span::synthetic();
        assert_eq!(
            TypeError::unsupported("global statement", span).kind(),
            ErrorKind::Unsupported
        );
        assert_eq!(
            TypeError::UnboundLocal {
                name: "x".into(),
                span
            }
            .kind(),
            ErrorKind::UnboundName
        );
        assert_eq!(TypeError::internal("x", span).kind(), ErrorKind::Internal);
    }
}
