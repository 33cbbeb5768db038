//! Type representation for the numjit type system.
//!
//! Defines the closed `Type` enum, function signatures (`FunctionType`),
//! array layouts (`ArrayType`) and compile-time constants (`Constant`).
//! Every type is an immutable value compared structurally.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A statically known value: a literal in the source, or a value the
/// passes synthesize (loop bounds, error sentinels, runtime handles).
///
/// Floats compare and hash by bit pattern so that constant-carrying types
/// (`Tuple { value: Some(..) }`) keep `Eq + Hash`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex(f64, f64),
    Str(String),
    Ellipsis,
    /// The null object pointer.
    Null,
    /// The host process's standard output handle.
    Stdout,
    Tuple(Vec<Constant>),
}

impl Constant {
    /// Whether this is the `None` singleton.
    pub fn is_none(&self) -> bool {
        matches!(self, Constant::None)
    }

    /// The integer payload, if this is an integer constant.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Constant::Int(v) => Some(*v),
            Constant::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }
}

impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        use Constant::*;
        match (self, other) {
            (None, None) | (Ellipsis, Ellipsis) | (Null, Null) | (Stdout, Stdout) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Complex(ar, ai), Complex(br, bi)) => {
                ar.to_bits() == br.to_bits() && ai.to_bits() == bi.to_bits()
            }
            (Str(a), Str(b)) => a == b,
            (Tuple(a), Tuple(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Constant {}

impl Hash for Constant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Constant::Bool(b) => b.hash(state),
            Constant::Int(v) => v.hash(state),
            Constant::Float(v) => v.to_bits().hash(state),
            Constant::Complex(re, im) => {
                re.to_bits().hash(state);
                im.to_bits().hash(state);
            }
            Constant::Str(s) => s.hash(state),
            Constant::Tuple(items) => items.hash(state),
            Constant::None
            | Constant::Ellipsis
            | Constant::Null
            | Constant::Stdout => {}
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::None => write!(f, "None"),
            Constant::Bool(true) => write!(f, "True"),
            Constant::Bool(false) => write!(f, "False"),
            Constant::Int(v) => write!(f, "{}", v),
            Constant::Float(v) => write!(f, "{:?}", v),
            Constant::Complex(re, im) => write!(f, "({:?}+{:?}j)", re, im),
            Constant::Str(s) => write!(f, "{:?}", s),
            Constant::Ellipsis => write!(f, "..."),
            Constant::Null => write!(f, "NULL"),
            Constant::Stdout => write!(f, "stdout"),
            Constant::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Layout of a multidimensional array value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArrayType {
    /// Element type.
    pub dtype: Box<Type>,
    /// Number of dimensions, always at least 1.
    pub ndim: usize,
    /// The whole buffer is laid out in C order.
    pub c_contig: bool,
    /// The innermost dimension is contiguous.
    pub inner_contig: bool,
}

/// A function signature: argument types and a return type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionType {
    pub args: Vec<Type>,
    pub ret: Type,
}

impl FunctionType {
    pub fn new(args: Vec<Type>, ret: Type) -> Self {
        FunctionType { args, ret }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

/// A numjit type.
///
/// The variant set is closed: every pass matches on it exhaustively.
/// - numeric scalars: `Bool`, `Int`, `Float`, `Complex`
/// - native aggregates: `Pointer`, `Array`, `CArray`
/// - source-level aggregates: `Tuple`, `List`, `Range`, `Slice`,
///   `Ellipsis`, `NewAxis`
/// - dynamic values: `Object`, `Void`
/// - names the inferer classifies but never materializes natively:
///   `Module`, `ModuleAttribute`, `NumpyDtype`, `Builtin`, `Global`,
///   `Function`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Bool,
    Int { signed: bool, bits: u8 },
    /// IEEE float of the given width.
    Float { bits: u8 },
    /// Complex number; `bits` is the width of each component.
    Complex { bits: u8 },
    Pointer(Box<Type>),
    Array(ArrayType),
    /// Fixed-size C array, e.g. the `shape` of an array.
    CArray { base: Box<Type>, size: usize },
    Tuple { size: usize, value: Option<Vec<Constant>> },
    List { size: usize, value: Option<Vec<Constant>> },
    Range,
    Slice,
    Ellipsis,
    NewAxis,
    /// A dynamically-boxed, reference-counted host object.
    Object,
    Void,
    Module { name: String, is_numpy: bool },
    ModuleAttribute { module: String, attr: String, is_numpy: bool },
    NumpyDtype(Box<Type>),
    Builtin(String),
    Global(String),
    Function(Box<FunctionType>),
}

impl Type {
    pub fn bool_() -> Type {
        Type::Bool
    }

    pub fn int8() -> Type {
        Type::Int { signed: true, bits: 8 }
    }

    pub fn int16() -> Type {
        Type::Int { signed: true, bits: 16 }
    }

    pub fn int32() -> Type {
        Type::Int { signed: true, bits: 32 }
    }

    pub fn int64() -> Type {
        Type::Int { signed: true, bits: 64 }
    }

    pub fn uint8() -> Type {
        Type::Int { signed: false, bits: 8 }
    }

    pub fn uint16() -> Type {
        Type::Int { signed: false, bits: 16 }
    }

    pub fn uint32() -> Type {
        Type::Int { signed: false, bits: 32 }
    }

    pub fn uint64() -> Type {
        Type::Int { signed: false, bits: 64 }
    }

    pub fn float32() -> Type {
        Type::Float { bits: 32 }
    }

    pub fn float64() -> Type {
        Type::Float { bits: 64 }
    }

    pub fn complex64() -> Type {
        Type::Complex { bits: 32 }
    }

    pub fn complex128() -> Type {
        Type::Complex { bits: 64 }
    }

    /// The platform index type (`Py_ssize_t` / `npy_intp`).
    pub fn intp() -> Type {
        Type::int64()
    }

    /// `char *`, the type of string literals.
    pub fn c_string() -> Type {
        Type::pointer(Type::int8())
    }

    pub fn pointer(base: Type) -> Type {
        Type::Pointer(Box::new(base))
    }

    /// A strided (non-contiguous) array.
    pub fn array(dtype: Type, ndim: usize) -> Type {
        Type::Array(ArrayType {
            dtype: Box::new(dtype),
            ndim,
            c_contig: false,
            inner_contig: false,
        })
    }

    /// A C-contiguous array.
    pub fn contiguous_array(dtype: Type, ndim: usize) -> Type {
        Type::Array(ArrayType {
            dtype: Box::new(dtype),
            ndim,
            c_contig: true,
            inner_contig: true,
        })
    }

    pub fn carray(base: Type, size: usize) -> Type {
        Type::CArray {
            base: Box::new(base),
            size,
        }
    }

    pub fn tuple(size: usize) -> Type {
        Type::Tuple { size, value: None }
    }

    pub fn function(args: Vec<Type>, ret: Type) -> Type {
        Type::Function(Box::new(FunctionType::new(args, ret)))
    }

    // ── Predicates ──────────────────────────────────────────────────────

    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Bool)
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Type::Int { .. })
    }

    /// Integers and booleans: anything usable as an index.
    pub fn is_int_like(&self) -> bool {
        matches!(self, Type::Int { .. } | Type::Bool)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::Float { .. })
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Type::Complex { .. })
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Type::Bool | Type::Int { .. } | Type::Float { .. } | Type::Complex { .. }
        )
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    pub fn is_carray(&self) -> bool {
        matches!(self, Type::CArray { .. })
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self, Type::Tuple { .. })
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Type::List { .. })
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Type::Range)
    }

    pub fn is_slice(&self) -> bool {
        matches!(self, Type::Slice)
    }

    pub fn is_ellipsis(&self) -> bool {
        matches!(self, Type::Ellipsis)
    }

    pub fn is_newaxis(&self) -> bool {
        matches!(self, Type::NewAxis)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Type::Object)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_module(&self) -> bool {
        matches!(self, Type::Module { .. })
    }

    pub fn is_numpy_module(&self) -> bool {
        matches!(self, Type::Module { is_numpy: true, .. })
    }

    pub fn is_module_attribute(&self) -> bool {
        matches!(self, Type::ModuleAttribute { .. })
    }

    pub fn is_numpy_attribute(&self) -> bool {
        matches!(self, Type::ModuleAttribute { is_numpy: true, .. })
    }

    pub fn is_numpy_dtype(&self) -> bool {
        matches!(self, Type::NumpyDtype(_))
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Type::Builtin(_))
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Type::Global(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Type::Function(_))
    }

    // ── Accessors ───────────────────────────────────────────────────────

    /// The type one level down: pointee, C-array element, complex
    /// component, dtype wrapper payload, or array element.
    pub fn base_type(&self) -> Option<&Type> {
        match self {
            Type::Pointer(base) | Type::NumpyDtype(base) => Some(base),
            Type::CArray { base, .. } => Some(base),
            Type::Array(array) => Some(&array.dtype),
            _ => None,
        }
    }

    /// The component type of a complex number.
    pub fn complex_component(&self) -> Option<Type> {
        match self {
            Type::Complex { bits } => Some(Type::Float { bits: *bits }),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayType> {
        match self {
            Type::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Array rank, zero for everything that is not an array.
    pub fn ndim(&self) -> usize {
        match self {
            Type::Array(array) => array.ndim,
            _ => 0,
        }
    }

    /// Element count of fixed-size aggregates.
    pub fn size(&self) -> Option<usize> {
        match self {
            Type::CArray { size, .. } | Type::Tuple { size, .. } | Type::List { size, .. } => {
                Some(*size)
            }
            _ => None,
        }
    }

    /// Constant elements recorded on a tuple or list type.
    pub fn constant_elements(&self) -> Option<&[Constant]> {
        match self {
            Type::Tuple { value: Some(items), .. } | Type::List { value: Some(items), .. } => {
                Some(items)
            }
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionType> {
        match self {
            Type::Function(sig) => Some(sig),
            _ => None,
        }
    }
}

fn write_numeric(f: &mut fmt::Formatter<'_>, ty: &Type) -> fmt::Result {
    match ty {
        Type::Bool => write!(f, "bool"),
        Type::Int { signed: true, bits } => write!(f, "int{}", bits),
        Type::Int { signed: false, bits } => write!(f, "uint{}", bits),
        Type::Float { bits } => write!(f, "float{}", bits),
        Type::Complex { bits } => write!(f, "complex{}", u32::from(*bits) * 2),
        _ => unreachable!("write_numeric called on a non-numeric type"),
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool | Type::Int { .. } | Type::Float { .. } | Type::Complex { .. } => {
                write_numeric(f, self)
            }
            Type::Pointer(base) => write!(f, "{}*", base),
            Type::Array(array) => {
                write!(f, "{}[", array.dtype)?;
                for axis in 0..array.ndim {
                    if axis > 0 {
                        write!(f, ", ")?;
                    }
                    if axis + 1 == array.ndim && array.inner_contig {
                        write!(f, "::1")?;
                    } else {
                        write!(f, ":")?;
                    }
                }
                write!(f, "]")
            }
            Type::CArray { base, size } => write!(f, "{}[{}]", base, size),
            Type::Tuple { size, .. } => write!(f, "tuple({})", size),
            Type::List { size, .. } => write!(f, "list({})", size),
            Type::Range => write!(f, "range"),
            Type::Slice => write!(f, "slice"),
            Type::Ellipsis => write!(f, "ellipsis"),
            Type::NewAxis => write!(f, "newaxis"),
            Type::Object => write!(f, "object"),
            Type::Void => write!(f, "void"),
            Type::Module { name, .. } => write!(f, "module({})", name),
            Type::ModuleAttribute { module, attr, .. } => {
                write!(f, "attribute({}.{})", module, attr)
            }
            Type::NumpyDtype(dtype) => write!(f, "dtype({})", dtype),
            Type::Builtin(name) => write!(f, "builtin({})", name),
            Type::Global(name) => write!(f, "global({})", name),
            Type::Function(sig) => write!(f, "{}", sig),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_scalars() {
        assert_eq!(Type::int32().to_string(), "int32");
        assert_eq!(Type::uint8().to_string(), "uint8");
        assert_eq!(Type::float64().to_string(), "float64");
        assert_eq!(Type::complex128().to_string(), "complex128");
        assert_eq!(Type::c_string().to_string(), "int8*");
    }

    #[test]
    fn display_arrays() {
        assert_eq!(Type::array(Type::float64(), 2).to_string(), "float64[:, :]");
        assert_eq!(
            Type::contiguous_array(Type::uint8(), 3).to_string(),
            "uint8[:, :, ::1]"
        );
        assert_eq!(Type::carray(Type::intp(), 2).to_string(), "int64[2]");
    }

    #[test]
    fn display_function() {
        let sig = Type::function(vec![Type::float64(), Type::int32()], Type::int32());
        assert_eq!(sig.to_string(), "(float64, int32) -> int32");
    }

    #[test]
    fn constants_compare_floats_bitwise() {
        assert_eq!(Constant::Float(f64::NAN), Constant::Float(f64::NAN));
        assert_ne!(Constant::Float(0.0), Constant::Float(-0.0));
        assert_ne!(Constant::Int(1), Constant::Float(1.0));
    }

    #[test]
    fn constant_tuple_display() {
        let single = Constant::Tuple(vec![Constant::Int(1)]);
        assert_eq!(single.to_string(), "(1,)");
        let pair = Constant::Tuple(vec![Constant::Float(1.5), Constant::None]);
        assert_eq!(pair.to_string(), "(1.5, None)");
    }

    #[test]
    fn base_types() {
        let arr = Type::array(Type::float32(), 1);
        assert_eq!(arr.base_type(), Some(&Type::float32()));
        assert_eq!(Type::complex64().complex_component(), Some(Type::float32()));
        assert_eq!(Type::carray(Type::intp(), 3).size(), Some(3));
    }
}
