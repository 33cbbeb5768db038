//! Parsing type names back into `Type`.
//!
//! Accepts the same syntax `Display` produces for the types a user can
//! write in a signature or a config file:
//!
//! - scalars: `bool`, `int8`..`int64`, `uint8`..`uint64`, `float32`,
//!   `float64`, `complex64`, `complex128`, plus the aliases `intp`,
//!   `double`, `float`, `int`, `char`
//! - `object`, `void`
//! - pointers: `float64*`
//! - arrays: `float64[:, :]`, `int32[:, ::1]` (trailing `::1` marks a
//!   C-contiguous array)
//! - C arrays: `int64[3]`

use std::fmt;
use std::str::FromStr;

use crate::ty::Type;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseTypeError {
    pub input: String,
    pub reason: String,
}

impl fmt::Display for ParseTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid type `{}`: {}", self.input, self.reason)
    }
}

impl std::error::Error for ParseTypeError {}

fn scalar_from_name(name: &str) -> Option<Type> {
    let ty = match name {
        "bool" => Type::Bool,
        "int8" | "char" => Type::int8(),
        "int16" => Type::int16(),
        "int32" | "int" => Type::int32(),
        "int64" | "intp" => Type::int64(),
        "uint8" => Type::uint8(),
        "uint16" => Type::uint16(),
        "uint32" => Type::uint32(),
        "uint64" => Type::uint64(),
        "float32" | "float" => Type::float32(),
        "float64" | "double" => Type::float64(),
        "complex64" => Type::complex64(),
        "complex128" => Type::complex128(),
        "object" => Type::Object,
        "void" => Type::Void,
        _ => return None,
    };
    Some(ty)
}

impl FromStr for Type {
    type Err = ParseTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let fail = |reason: &str| ParseTypeError {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if let Some(base) = input.strip_suffix('*') {
            let base: Type = base.parse().map_err(|_| fail("bad pointee type"))?;
            return Ok(Type::pointer(base));
        }

        if let Some(open) = input.find('[') {
            let inner = input[open + 1..]
                .strip_suffix(']')
                .ok_or_else(|| fail("missing closing `]`"))?;
            let elem: Type = input[..open]
                .parse()
                .map_err(|_| fail("bad element type"))?;

            if let Ok(size) = inner.trim().parse::<usize>() {
                return Ok(Type::carray(elem, size));
            }

            let axes: Vec<&str> = inner.split(',').map(str::trim).collect();
            let last = axes.len() - 1;
            let mut contiguous = false;
            for (i, axis) in axes.iter().enumerate() {
                match *axis {
                    ":" => {}
                    "::1" if i == last => contiguous = true,
                    _ => return Err(fail("array axes must be `:` or a trailing `::1`")),
                }
            }
            return Ok(if contiguous {
                Type::contiguous_array(elem, axes.len())
            } else {
                Type::array(elem, axes.len())
            });
        }

        scalar_from_name(input).ok_or_else(|| fail("unknown type name"))
    }
}
