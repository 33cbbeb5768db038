//! Property tests for the promotion lattice.
//!
//! 1. Reflexivity: promote(t, t) == t
//! 2. Symmetry: promote(a, b) == promote(b, a), including failures
//! 3. Object absorbs every non-void type
//! 4. A promoted numeric scalar is never narrower than either input

use numjit_types::{promote, Type};
use proptest::prelude::*;

// ── Strategies ─────────────────────────────────────────────────────────

fn arb_scalar() -> impl Strategy<Value = Type> {
    prop_oneof![
        Just(Type::Bool),
        (any::<bool>(), prop::sample::select(vec![8u8, 16, 32, 64]))
            .prop_map(|(signed, bits)| Type::Int { signed, bits }),
        prop::sample::select(vec![32u8, 64]).prop_map(|bits| Type::Float { bits }),
        prop::sample::select(vec![32u8, 64]).prop_map(|bits| Type::Complex { bits }),
    ]
}

fn arb_type() -> impl Strategy<Value = Type> {
    let leaf = prop_oneof![
        arb_scalar(),
        Just(Type::Object),
        Just(Type::Void),
        Just(Type::Range),
        Just(Type::Slice),
        (1usize..4).prop_map(Type::tuple),
    ];
    leaf.prop_recursive(2, 8, 2, |inner| {
        prop_oneof![
            (arb_scalar(), 1usize..4, any::<bool>()).prop_map(|(dtype, ndim, contig)| {
                if contig {
                    Type::contiguous_array(dtype, ndim)
                } else {
                    Type::array(dtype, ndim)
                }
            }),
            inner.clone().prop_map(Type::pointer),
            (inner, 1usize..4).prop_map(|(base, size)| Type::carray(base, size)),
        ]
    })
}

fn width(ty: &Type) -> u8 {
    match ty {
        Type::Bool => 1,
        Type::Int { bits, .. } | Type::Float { bits } | Type::Complex { bits } => *bits,
        _ => 0,
    }
}

// ── Properties ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn promote_is_reflexive(t in arb_type()) {
        prop_assert_eq!(promote(&t, &t), Ok(t.clone()));
    }

    #[test]
    fn promote_is_symmetric(a in arb_type(), b in arb_type()) {
        let ab = promote(&a, &b).ok();
        let ba = promote(&b, &a).ok();
        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn object_absorbs_non_void(t in arb_type()) {
        prop_assume!(!t.is_void());
        prop_assert_eq!(promote(&Type::Object, &t), Ok(Type::Object));
    }

    #[test]
    fn scalar_promotion_never_narrows(a in arb_scalar(), b in arb_scalar()) {
        let joined = promote(&a, &b).unwrap();
        prop_assert!(joined.is_numeric());
        prop_assert!(width(&joined) >= width(&a).min(width(&b)));
        if !joined.is_complex() {
            prop_assert!(width(&joined) >= width(&a).max(width(&b)) || a.is_float() || b.is_float());
        }
    }
}
