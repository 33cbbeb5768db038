//! Host runtime entry points the lowered tree calls directly.

use numjit_ast::{Binding, Expr, ExprKind};
use numjit_common::Span;
use numjit_types::{FunctionType, Type, Variable};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuntimeFn {
    /// `PyTuple_Pack(n, obj...)`: a new tuple from `n` objects.
    TuplePack,
    /// `PyObject_Print(obj, stream, flags)`.
    ObjectPrint,
    /// `PyObject_GetAttrString(obj, name)`: a new reference.
    GetAttrString,
}

/// `Py_PRINT_RAW`: print with `str()` rather than `repr()`.
pub const PRINT_RAW: i64 = 1;

impl RuntimeFn {
    pub fn symbol(self) -> &'static str {
        match self {
            RuntimeFn::TuplePack => "PyTuple_Pack",
            RuntimeFn::ObjectPrint => "PyObject_Print",
            RuntimeFn::GetAttrString => "PyObject_GetAttrString",
        }
    }

    /// Signature for a call with `nargs` arguments. Only `PyTuple_Pack` is
    /// variadic; its object arguments follow the leading count.
    pub fn signature(self, nargs: usize) -> FunctionType {
        match self {
            RuntimeFn::TuplePack => {
                let mut args = vec![Type::intp()];
                args.extend(std::iter::repeat(Type::Object).take(nargs.saturating_sub(1)));
                FunctionType::new(args, Type::Object)
            }
            RuntimeFn::ObjectPrint => FunctionType::new(
                vec![Type::Object, Type::pointer(Type::Void), Type::int32()],
                Type::int32(),
            ),
            RuntimeFn::GetAttrString => {
                FunctionType::new(vec![Type::Object, Type::c_string()], Type::Object)
            }
        }
    }

    /// Build a typed call node. Both the binding and the `ty` field are
    /// set so the node is valid before and after type setting.
    pub fn call(self, args: Vec<Expr>, span: Span) -> Expr {
        let signature = self.signature(args.len());
        let ret = signature.ret.clone();
        Expr {
            kind: ExprKind::NativeCall {
                symbol: self.symbol().to_string(),
                signature,
                args,
            },
            span,
            binding: Some(Binding::Value(Variable::typed(ret.clone()))),
            ty: Some(ret),
        }
    }
}
