//! Type parameter bounds.
//!
//! A parameter declared `T < B` accepts arguments that are subtypes of
//! `B`; `T > B` accepts supertypes of `B`. Subtyping here is the bound
//! relation of [`check_bound`]: equality, a chain of parameter bounds, or
//! unboxing the smaller side.

use rowan::TextRange;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::describe::describe_type_in_ctx;
use crate::error::{TypeError, TypeErrorKind};
use crate::ty::{
    fill_type_args, fill_type_args_with_defaults, types_equal, GenericType, Type, TypeBounds, TypeCtx,
    TypeDef, TypeParam, TypeRepr,
};
use crate::unbox::{unbox, Unboxed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    /// `T > B`
    Lower,
    /// `T < B`
    Upper,
}

impl BoundKind {
    pub fn symbol(self) -> char {
        match self {
            BoundKind::Lower => '>',
            BoundKind::Upper => '<',
        }
    }
}

fn sorted_bounds(map: &FxHashMap<usize, Type>) -> Vec<(usize, &Type)> {
    let mut all: Vec<_> = map.iter().map(|(i, t)| (*i, t)).collect();
    all.sort_by_key(|(i, _)| *i);
    all
}

/// Whether `sub` is within `sup` in the bound relation.
pub fn check_bound(sub: &Type, sup: &Type, ctx: &TypeCtx<'_>) -> bool {
    check_bound_rec(sub, sup, &mut FxHashSet::default(), ctx)
}

fn check_bound_rec(sub: &Type, sup: &Type, checked: &mut FxHashSet<Type>, ctx: &TypeCtx<'_>) -> bool {
    if let Type::Parameter { index, .. } = sub {
        if checked.insert(sub.clone()) {
            if let Some(upper) = ctx.bounds.upper.get(index) {
                return check_bound_rec(upper, sup, checked, ctx);
            }
        }
    }
    if let Type::Parameter { index, .. } = sup {
        if checked.insert(sup.clone()) {
            if let Some(lower) = ctx.bounds.lower.get(index) {
                return check_bound_rec(sub, lower, checked, ctx);
            }
        }
    }
    if types_equal(sub, sup) {
        return true;
    }
    match unbox(sub, ctx.module, ctx.registry) {
        Unboxed::Inner(inner) => check_bound_rec(&inner, sup, checked, ctx),
        _ => false,
    }
}

/// Check a single argument against the bound of its parameter.
pub fn check_type_arg_bound(
    arg: &Type,
    bound: &Type,
    kind: BoundKind,
    ctx: &TypeCtx<'_>,
    span: TextRange,
) -> Result<(), TypeError> {
    let ok = match kind {
        BoundKind::Upper => check_bound(arg, bound, ctx),
        BoundKind::Lower => check_bound(bound, arg, ctx),
    };
    if ok {
        Ok(())
    } else {
        Err(TypeError::new(
            TypeErrorKind::BoundNotSatisfied {
                kind: kind.symbol(),
                bound: describe_type_in_ctx(bound, ctx),
            },
            span,
        ))
    }
}

/// Check every instantiation inside `t` against the bounds of the
/// instantiated declaration.
pub fn check_type_bounds(t: &Type, ctx: &TypeCtx<'_>, span: TextRange) -> Result<(), TypeError> {
    match t {
        Type::Never | Type::Any | Type::Parameter { .. } => Ok(()),
        Type::Named { name, args } => {
            for arg in args {
                check_type_bounds(arg, ctx, span)?;
            }
            // Unknown names are reported by validation.
            let Some(g) = ctx.registry.get(name) else {
                return Ok(());
            };
            for (i, bound) in sorted_bounds(&g.bounds.upper) {
                if let Some(arg) = args.get(i) {
                    check_type_arg_bound(arg, &fill_type_args(bound, args), BoundKind::Upper, ctx, span)?;
                }
            }
            for (i, bound) in sorted_bounds(&g.bounds.lower) {
                if let Some(arg) = args.get(i) {
                    check_type_arg_bound(arg, &fill_type_args(bound, args), BoundKind::Lower, ctx, span)?;
                }
            }
            Ok(())
        }
        Type::Anonymous(repr) => match repr {
            TypeRepr::Unit => Ok(()),
            TypeRepr::Tuple(elements) => elements
                .iter()
                .try_for_each(|el| check_type_bounds(el, ctx, span)),
            TypeRepr::Bundle(fields) => fields
                .values()
                .try_for_each(|f| check_type_bounds(&f.ty, ctx, span)),
            TypeRepr::Func { input, output } => {
                check_type_bounds(input, ctx, span)?;
                check_type_bounds(output, ctx, span)
            }
        },
    }
}

/// Check explicit type arguments of a generic function or type reference
/// in an expression.
pub fn check_type_args_bounds(
    args: &[Type],
    params: &[TypeParam],
    defaults: &FxHashMap<usize, Type>,
    bounds: &TypeBounds,
    ctx: &TypeCtx<'_>,
    span: TextRange,
) -> Result<(), TypeError> {
    let bad_type_arg = |index: usize, err: TypeError| {
        TypeError::new(
            TypeErrorKind::BadTypeArg {
                index,
                name: params.get(index).map(|p| p.name.clone()).unwrap_or_default(),
                detail: Box::new(err),
            },
            span,
        )
    };
    for (kind, map) in [(BoundKind::Upper, &bounds.upper), (BoundKind::Lower, &bounds.lower)] {
        for (index, raw) in sorted_bounds(map) {
            let Some(arg) = args.get(index) else {
                continue;
            };
            let bound = fill_type_args_with_defaults(raw, args, defaults);
            check_type_arg_bound(arg, &bound, kind, ctx, span).map_err(|e| bad_type_arg(index, e))?;
        }
    }
    Ok(())
}

fn same_bound(a: Option<&Type>, b: Option<&Type>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => types_equal(x, y),
        _ => false,
    }
}

/// Check bounds inside a declaration: a union's cases must repeat the
/// union's bounds, a boxed inner type must respect the bounds of what it
/// instantiates.
pub fn check_type_def_bounds(g: &GenericType, ctx: &TypeCtx<'_>) -> Result<(), TypeError> {
    match &g.def {
        TypeDef::Union(cases) => {
            for case in cases {
                let Some(case_g) = ctx.registry.get(&case.name) else {
                    continue;
                };
                for (i, j) in case.params.iter().enumerate() {
                    let lower_ok = same_bound(case_g.bounds.lower.get(&i), g.bounds.lower.get(j));
                    let upper_ok = same_bound(case_g.bounds.upper.get(&i), g.bounds.upper.get(j));
                    if !(lower_ok && upper_ok) {
                        return Err(TypeError::new(
                            TypeErrorKind::CaseBadBounds {
                                case_name: case.name.to_string(),
                                union_name: case_g
                                    .case_info
                                    .as_ref()
                                    .map(|info| info.union_name.to_string())
                                    .unwrap_or_default(),
                            },
                            case_g.span,
                        ));
                    }
                }
            }
            Ok(())
        }
        TypeDef::Boxed(boxed) => check_type_bounds(&boxed.inner, ctx, g.span),
        TypeDef::Native => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;
    use crate::variance::Variance;
    use fjord_common::Symbol;

    fn number() -> Type {
        Type::named(Symbol::core("Number"), vec![])
    }

    fn int() -> Type {
        Type::named(Symbol::core("Int"), vec![])
    }

    #[test]
    fn parameter_upper_bound_chain() {
        let reg = builtins::core_registry();
        let params = vec![TypeParam {
            name: "T".into(),
            variance: Variance::Invariant,
        }];
        let mut bounds = TypeBounds::default();
        bounds.upper.insert(0, number());
        let ctx = TypeCtx {
            module: "Main",
            registry: &reg,
            params: &params,
            bounds: &bounds,
        };
        assert!(check_bound(&Type::param(0), &number(), &ctx));
        assert!(!check_bound(&Type::param(0), &int(), &ctx));
        assert!(check_bound(&int(), &int(), &ctx));
    }

    #[test]
    fn violated_bound_names_the_bound() {
        let reg = builtins::core_registry();
        let bounds = TypeBounds::default();
        let ctx = TypeCtx {
            module: "Main",
            registry: &reg,
            params: &[],
            bounds: &bounds,
        };
        let err = check_type_arg_bound(&int(), &number(), BoundKind::Upper, &ctx, TextRange::default())
            .unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"type parameter bound < Number not satisfied");
    }
}
