//! Boxing values into named types, and lifting case values into unions.
//!
//! `Name(value)` boxes `value` into the boxed type `Name`. The value is
//! assigned to the inner type, with the type arguments either given or
//! inferred from the value. A boxed case type is then lifted into its
//! union unless the reference was written `Name!`.
//!
//! The same operation backs implicit boxing when an assignment to a boxed
//! type fails (see [`crate::assign::assign_to`]).

use fjord_common::Symbol;
use rowan::TextRange;

use crate::assign::{assign_to, is_assignable};
use crate::bounds::check_type_args_bounds;
use crate::error::{ExprError, ExprErrorKind, TypeError, TypeErrorKind};
use crate::expr::{internal, Expr, ExprContext, ExprVal, SemiExpr};
use crate::infer::{substitute_inferred, TypeArgsInferringContext};
use crate::ty::{
    complete_args, fill_type_args, fill_type_args_with_defaults, mark_params_as_being_inferred, CaseInfo, Type,
    TypeDef, TypeRegistry,
};
use crate::variance::Variance;

/// Box `value` into the type `name`, with `args` as its type arguments
/// (none to infer them).
#[allow(clippy::too_many_arguments)]
pub fn box_value(
    value: SemiExpr,
    name: &Symbol,
    args: &[Type],
    force_exact: bool,
    span: TextRange,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Expr, ExprError> {
    let g = ctx.registry.get(name).ok_or_else(|| {
        ExprError::new(
            ExprErrorKind::TypeErrorInExpr(TypeError::new(
                TypeErrorKind::TypeNotFound { name: name.to_string() },
                span,
            )),
            span,
        )
    })?;
    let boxed = match &g.def {
        TypeDef::Boxed(boxed) => boxed,
        TypeDef::Union(_) => return box_into_union(value, name, ctx),
        TypeDef::Native => {
            return Err(ExprError::new(
                ExprErrorKind::BoxNonBoxedType { name: name.to_string() },
                span,
            ))
        }
    };
    if name.module != ctx.module {
        if boxed.protected {
            return Err(ExprError::new(
                ExprErrorKind::BoxProtectedType { name: name.to_string() },
                span,
            ));
        }
        if boxed.opaque {
            return Err(ExprError::new(
                ExprErrorKind::BoxOpaqueType { name: name.to_string() },
                span,
            ));
        }
    }

    let types = ctx.types();
    let value_span = value.span;
    if (g.min_arity()..=g.arity()).contains(&args.len()) {
        let inner = fill_type_args_with_defaults(&boxed.inner, args, &g.defaults);
        let expr = assign_to(Some(&inner), value, ctx, infer)?;
        let args = complete_args(&substitute_types(args, infer), g.arity(), &g.defaults);
        check_type_args_bounds(&args, &g.params, &g.defaults, &g.bounds, &types, span)?;
        let outer = Type::named(name.clone(), args);
        let boxed_expr = Expr::new(outer, expr.value, span);
        return Ok(lift_if(boxed_expr, force_exact, ctx.registry));
    }
    if !args.is_empty() {
        return Err(TypeError::new(
            TypeErrorKind::WrongParameterQuantity {
                type_name: name.to_string(),
                required: g.arity(),
                given: args.len(),
            },
            span,
        )
        .into());
    }

    let mut inferring = TypeArgsInferringContext::enabled(&g.params, &g.bounds);
    let marked = mark_params_as_being_inferred(&boxed.inner);
    let expr = assign_to(Some(&marked), value, ctx, &mut inferring)?;
    let Some(inferred) = inferring.inferred_args() else {
        return Err(ExprError::new(ExprErrorKind::ExplicitTypeParamsRequired, span));
    };
    let inner = fill_type_args(&boxed.inner, &inferred);
    if !is_assignable(&inner, &expr.ty, &types) {
        return Err(internal(
            format!("boxed value does not fit the inferred inner type of {}", name),
            value_span,
        ));
    }
    check_type_args_bounds(&inferred, &g.params, &g.defaults, &g.bounds, &types, span)?;
    tracing::trace!(%name, ?inferred, "inferred boxing arguments");
    let boxed_expr = Expr::new(Type::named(name.clone(), inferred), expr.value, span);
    Ok(lift_if(boxed_expr, force_exact, ctx.registry))
}

fn substitute_types(args: &[Type], infer: &TypeArgsInferringContext) -> Vec<Type> {
    args.iter().map(|a| substitute_inferred(a, infer)).collect()
}

/// `Union(value)`: only a value of one of the union's cases fits.
fn box_into_union(value: SemiExpr, union: &Symbol, ctx: &ExprContext<'_>) -> Result<Expr, ExprError> {
    let span = value.span;
    let Some(typed) = value.as_typed() else {
        return Err(ExprError::new(ExprErrorKind::ExplicitTypeRequired, span));
    };
    let is_case = typed
        .ty
        .as_named()
        .and_then(|(n, _)| ctx.registry.get(n))
        .and_then(|g| g.case_info.as_ref())
        .is_some_and(|info| info.union_name == *union);
    if is_case {
        Ok(lift_case(typed.clone(), ctx.registry))
    } else {
        Err(ExprError::new(
            ExprErrorKind::NotCaseType {
                ty: ctx.describe(&typed.ty),
                union: union.to_string(),
            },
            span,
        ))
    }
}

fn lift_if(expr: Expr, force_exact: bool, registry: &TypeRegistry) -> Expr {
    if force_exact {
        expr
    } else {
        lift_case(expr, registry)
    }
}

/// Lift a value of a case type into its union. Values of other types are
/// returned unchanged.
pub fn lift_case(expr: Expr, registry: &TypeRegistry) -> Expr {
    let Some((name, args)) = expr.ty.as_named() else {
        return expr;
    };
    let Some(info) = registry.get(name).and_then(|g| g.case_info.as_ref()) else {
        return expr;
    };
    let union = Type::named(info.union_name.clone(), get_union_args(args, info));
    let span = expr.span;
    let index = info.case_index;
    Expr::new(
        union,
        ExprVal::Sum {
            value: Box::new(expr),
            index,
        },
        span,
    )
}

/// The union's type arguments for a case instantiated with `case_args`.
///
/// Union parameters the case does not use are filled by variance: `never`
/// when covariant, `any` when contravariant, unit otherwise.
pub fn get_union_args(case_args: &[Type], info: &CaseInfo) -> Vec<Type> {
    let mut mapped: Vec<Type> = (0..info.union_arity)
        .map(|i| match info.union_variance.get(i) {
            Some(Variance::Covariant) => Type::Never,
            Some(Variance::Contravariant) => Type::Any,
            _ => Type::unit(),
        })
        .collect();
    for (i, &j) in info.case_params.iter().enumerate() {
        if let (Some(slot), Some(arg)) = (mapped.get_mut(j), case_args.get(i)) {
            *slot = arg.clone();
        }
    }
    mapped
}
