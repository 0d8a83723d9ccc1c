//! Assignability.
//!
//! [`assign_type`] decides whether a value of type `given` may stand where
//! `inferred` is expected, and computes the resulting type. The direction
//! says which side may be bigger:
//!
//! - `ToInferred`: `given` must fit into `inferred`
//! - `FromInferred`: `inferred` must fit into `given`
//! - `Matching`: both must be the same
//!
//! Assignment first tries a direct nominal or structural match. If that
//! fails, `never` and `any` are absorbed and the smaller side is unboxed
//! one level before retrying. [`assign_to`] adds a last resort on top:
//! boxing the value into the expected boxed type, or lifting a case value
//! into the expected union.

use fjord_common::Symbol;

use crate::boxing::{box_value, lift_case};
use crate::error::{ExprError, ExprErrorKind};
use crate::expr::{Expr, ExprContext, SemiExpr, SemiExprVal};
use crate::infer::{get_certain_type, substitute_inferred, ActiveType, Constraint, TypeArgsInferringContext};
use crate::ty::{Field, Type, TypeCtx, TypeDef, TypeRepr};
use crate::unbox::{unbox, Unboxed};
use crate::variance::Variance;
use crate::{array, block, lambda, literal, overload, product, refs, sum};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToInferred,
    FromInferred,
    Matching,
}

impl Direction {
    pub fn from_variance(v: Variance) -> Direction {
        match v {
            Variance::Covariant => Direction::ToInferred,
            Variance::Contravariant => Direction::FromInferred,
            Variance::Invariant | Variance::Bivariant => Direction::Matching,
        }
    }

    pub fn inverse(self) -> Direction {
        match self {
            Direction::ToInferred => Direction::FromInferred,
            Direction::FromInferred => Direction::ToInferred,
            Direction::Matching => Direction::Matching,
        }
    }

    /// How a parameter first bound in this direction may change later.
    fn constraint(self) -> Constraint {
        match self {
            Direction::ToInferred => Constraint::ExactOrBigger,
            Direction::FromInferred => Constraint::ExactOrSmaller,
            Direction::Matching => Constraint::Exact,
        }
    }
}

// ── Types ──────────────────────────────────────────────────────────────

/// Assign `given` to `inferred` in direction `d`, returning the resulting
/// type. Bindings made by a failed attempt are rolled back.
pub fn assign_type(
    inferred: &Type,
    given: &Type,
    d: Direction,
    ctx: &TypeCtx<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Option<Type> {
    if let Some(t) = infer.probe(|infer| direct_assign_type(inferred, given, d, ctx, infer)) {
        return Some(t);
    }
    match d {
        Direction::ToInferred => {
            if *given == Type::Never {
                let certain = substitute_inferred(inferred, infer);
                return (!certain.has_inferred_params()).then_some(certain);
            }
            if *inferred == Type::Any {
                return Some(Type::Any);
            }
            match unbox(given, ctx.module, ctx.registry) {
                Unboxed::Inner(inner) => assign_type(inferred, &inner, d, ctx, infer),
                Unboxed::Opaque | Unboxed::Failed => None,
            }
        }
        Direction::FromInferred => {
            if *inferred == Type::Never {
                return Some(given.clone());
            }
            if *given == Type::Any {
                return Some(Type::Any);
            }
            match unbox(inferred, ctx.module, ctx.registry) {
                Unboxed::Inner(inner) => assign_type(&inner, given, d, ctx, infer),
                Unboxed::Opaque | Unboxed::Failed => None,
            }
        }
        Direction::Matching => None,
    }
}

/// Whether `given` can be assigned to `expected` without any inference.
pub fn is_assignable(expected: &Type, given: &Type, ctx: &TypeCtx<'_>) -> bool {
    assign_type(
        expected,
        given,
        Direction::ToInferred,
        ctx,
        &mut TypeArgsInferringContext::disabled(),
    )
    .is_some()
}

/// The nominal and structural match, without unboxing.
pub fn direct_assign_type(
    inferred: &Type,
    given: &Type,
    d: Direction,
    ctx: &TypeCtx<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Option<Type> {
    // A parameter of the enclosing declaration stands for its bound.
    if let Type::Parameter {
        index,
        being_inferred: false,
    } = given
    {
        let bound = match d {
            Direction::ToInferred => ctx.bounds.upper.get(index),
            Direction::FromInferred => ctx.bounds.lower.get(index),
            Direction::Matching => None,
        };
        if let Some(t) = bound.and_then(|b| assign_type(inferred, b, d, ctx, infer)) {
            return Some(t);
        }
    }
    match inferred {
        Type::Never => (*given == Type::Never).then(|| given.clone()),
        Type::Any => (*given == Type::Any).then(|| given.clone()),
        Type::Parameter {
            index,
            being_inferred: true,
        } => assign_to_inferred_param(*index, given, d, ctx, infer),
        Type::Parameter {
            index,
            being_inferred: false,
        } => match given {
            Type::Parameter { index: other, .. } if other == index => Some(given.clone()),
            Type::Parameter { .. } => None,
            _ => {
                let bound = match d {
                    Direction::ToInferred => ctx.bounds.lower.get(index),
                    Direction::FromInferred => ctx.bounds.upper.get(index),
                    Direction::Matching => None,
                }?;
                assign_type(bound, given, d, ctx, infer)
            }
        },
        Type::Named { name, args } => {
            let Type::Named {
                name: given_name,
                args: given_args,
            } = given
            else {
                return None;
            };
            if name != given_name || args.len() != given_args.len() {
                return None;
            }
            let g = ctx.registry.get(name)?;
            let mut assigned = Vec::with_capacity(args.len());
            for (i, (arg, given_arg)) in args.iter().zip(given_args).enumerate() {
                let param_d = match d {
                    Direction::Matching => Direction::Matching,
                    _ => {
                        let v = g.params.get(i).map_or(Variance::Invariant, |p| p.variance);
                        let param_d = Direction::from_variance(v);
                        if d == Direction::FromInferred {
                            param_d.inverse()
                        } else {
                            param_d
                        }
                    }
                };
                assigned.push(assign_type(arg, given_arg, param_d, ctx, infer)?);
            }
            Some(Type::named(name.clone(), assigned))
        }
        Type::Anonymous(repr) => {
            let Type::Anonymous(given_repr) = given else {
                return None;
            };
            match (repr, given_repr) {
                (TypeRepr::Unit, TypeRepr::Unit) => Some(given.clone()),
                (TypeRepr::Tuple(elements), TypeRepr::Tuple(given_elements)) => {
                    if elements.len() != given_elements.len() {
                        return None;
                    }
                    let assigned = elements
                        .iter()
                        .zip(given_elements)
                        .map(|(e, t)| assign_type(e, t, d, ctx, infer))
                        .collect::<Option<Vec<_>>>()?;
                    Some(Type::tuple(assigned))
                }
                (TypeRepr::Bundle(fields), TypeRepr::Bundle(given_fields)) => {
                    if fields.len() != given_fields.len() {
                        return None;
                    }
                    let mut assigned = std::collections::BTreeMap::new();
                    for (name, field) in fields {
                        let given_field = given_fields.get(name)?;
                        if given_field.index != field.index {
                            return None;
                        }
                        let ty = assign_type(&field.ty, &given_field.ty, d, ctx, infer)?;
                        assigned.insert(
                            name.clone(),
                            Field {
                                ty,
                                index: field.index,
                            },
                        );
                    }
                    Some(Type::Anonymous(TypeRepr::Bundle(assigned)))
                }
                (
                    TypeRepr::Func { input, output },
                    TypeRepr::Func {
                        input: given_input,
                        output: given_output,
                    },
                ) => {
                    let input = assign_type(input, given_input, d.inverse(), ctx, infer)?;
                    let output = assign_type(output, given_output, d, ctx, infer)?;
                    Some(Type::func(input, output))
                }
                _ => None,
            }
        }
    }
}

fn assign_to_inferred_param(
    index: usize,
    given: &Type,
    d: Direction,
    ctx: &TypeCtx<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Option<Type> {
    if !infer.is_enabled() {
        return None;
    }
    let Some(active) = infer.get(index).cloned() else {
        infer.set(
            index,
            ActiveType {
                current: given.clone(),
                constraint: d.constraint(),
            },
        );
        return Some(given.clone());
    };
    let current = &active.current;
    if let Some(t) = direct_assign_type(current, given, d, ctx, infer) {
        return Some(t);
    }
    // Grow (or shrink) the binding until it accommodates this use.
    let adjustable = match active.constraint {
        Constraint::ExactOrBigger => d == Direction::ToInferred,
        Constraint::ExactOrSmaller => d == Direction::FromInferred,
        Constraint::Exact => false,
    };
    if adjustable && assign_type(current, given, d.inverse(), ctx, infer).is_some() {
        infer.set(
            index,
            ActiveType {
                current: given.clone(),
                constraint: active.constraint,
            },
        );
        return Some(given.clone());
    }
    None
}

// ── Expressions ────────────────────────────────────────────────────────

/// Give `semi` a type, assigning it to `expected` if there is one.
pub fn assign_to(
    expected: Option<&Type>,
    semi: SemiExpr,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Expr, ExprError> {
    let fallback = expected.and_then(|e| fallback_target(e, &semi, ctx, infer));
    let retry = fallback.as_ref().map(|_| semi.clone());
    let span = semi.span;
    let err = match infer.with_saved(|infer| dispatch(expected, semi, ctx, infer)) {
        Ok(expr) => return Ok(expr),
        Err(err) if err.is_internal() => return Err(err),
        Err(err) => err,
    };
    let (Some(target), Some(semi)) = (fallback, retry) else {
        return Err(err);
    };
    tracing::trace!(?target, "assignment failed, trying the boxing fallback");
    match target {
        Fallback::Box { name, args } => box_value(semi, &name, &args, true, span, ctx, infer),
        Fallback::Lift { union } => {
            let Some(case_value) = semi.as_typed().cloned() else {
                return Err(err);
            };
            let lifted = lift_case(case_value, ctx.registry);
            if lifted.ty.as_named().map(|(n, _)| n) != Some(&union) {
                return Err(err);
            }
            typed_assign_to(expected, lifted, ctx, infer)
        }
    }
}

#[derive(Debug)]
enum Fallback {
    /// Box the value into a boxed type that is neither protected nor opaque.
    Box { name: Symbol, args: Vec<Type> },
    /// Lift a case value into its union.
    Lift { union: Symbol },
}

fn fallback_target(
    expected: &Type,
    semi: &SemiExpr,
    ctx: &ExprContext<'_>,
    infer: &TypeArgsInferringContext,
) -> Option<Fallback> {
    let certain = match expected {
        Type::Named { .. } => expected.clone(),
        _ => get_certain_type(expected, infer, semi.span).ok()?,
    };
    let (name, args) = certain.as_named()?;
    let g = ctx.registry.get(name)?;
    match &g.def {
        TypeDef::Boxed(boxed) if !boxed.protected && !boxed.opaque => Some(Fallback::Box {
            name: name.clone(),
            args: args.to_vec(),
        }),
        TypeDef::Union(_) => {
            let given = semi.as_typed()?;
            let (case_name, _) = given.ty.as_named()?;
            let info = ctx.registry.get(case_name)?.case_info.as_ref()?;
            (info.union_name == *name).then(|| Fallback::Lift {
                union: name.clone(),
            })
        }
        _ => None,
    }
}

fn dispatch(
    expected: Option<&Type>,
    semi: SemiExpr,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Expr, ExprError> {
    let span = semi.span;
    match semi.value {
        SemiExprVal::Typed(expr) => typed_assign_to(expected, expr, ctx, infer),
        SemiExprVal::Undecided(call) => overload::assign_undecided_to(expected, call, span, ctx, infer),
        SemiExprVal::Lambda(l) => lambda::assign_lambda_to(expected, l, span, ctx, infer),
        SemiExprVal::Integer(value) => literal::assign_integer_to(expected, value, span, ctx, infer),
        SemiExprVal::Tuple(elements) => product::assign_tuple_to(expected, elements, span, ctx, infer),
        SemiExprVal::Bundle(fields) => product::assign_bundle_to(expected, fields, span, ctx, infer),
        SemiExprVal::Array(items) => array::assign_array_to(expected, items, span, ctx, infer),
        SemiExprVal::Block(b) => block::assign_block_to(expected, b, span, ctx, infer),
        SemiExprVal::Switch(sw) => sum::assign_switch_to(expected, sw, span, ctx, infer),
        SemiExprVal::MultiSwitch(msw) => sum::assign_multi_switch_to(expected, msw, span, ctx, infer),
        SemiExprVal::Ref(r) => refs::assign_ref_to(expected, r, span, ctx, infer),
    }
}

/// Assign an already typed expression; its type becomes the assigned one.
pub fn typed_assign_to(
    expected: Option<&Type>,
    expr: Expr,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Expr, ExprError> {
    let Some(expected) = expected else {
        return Ok(expr);
    };
    match assign_type(expected, &expr.ty, Direction::ToInferred, &ctx.types(), infer) {
        Some(ty) => Ok(expr.with_type(ty)),
        None => Err(ExprError::new(
            ExprErrorKind::NotAssignable {
                from: ctx.describe(&expr.ty),
                to: ctx.describe_inferred(expected, infer),
            },
            expr.span,
        )),
    }
}

/// Fail with `ExplicitTypeRequired` when there is no expected type.
pub fn require_explicit_type<'t>(
    expected: Option<&'t Type>,
    span: rowan::TextRange,
) -> Result<&'t Type, ExprError> {
    expected.ok_or_else(|| ExprError::new(ExprErrorKind::ExplicitTypeRequired, span))
}

#[cfg(test)]
mod tests {
    use fjord_common::Symbol;

    use super::*;
    use crate::builtins::{self, core_type};
    use crate::ty::{TypeBounds, TypeParam};

    fn with_ctx<R>(f: impl FnOnce(&TypeCtx<'_>) -> R) -> R {
        let reg = builtins::core_registry();
        let bounds = TypeBounds::default();
        let ctx = TypeCtx {
            module: "Main",
            registry: &reg,
            params: &[],
            bounds: &bounds,
        };
        f(&ctx)
    }

    fn list(t: Type) -> Type {
        Type::named(Symbol::core("List"), vec![t])
    }

    fn array(t: Type) -> Type {
        Type::named(Symbol::core("Array"), vec![t])
    }

    fn assign(inferred: &Type, given: &Type, d: Direction, ctx: &TypeCtx<'_>) -> Option<Type> {
        assign_type(inferred, given, d, ctx, &mut TypeArgsInferringContext::disabled())
    }

    #[test]
    fn extremes() {
        with_ctx(|ctx| {
            let int = core_type("Int");
            assert_eq!(assign(&Type::Any, &int, Direction::ToInferred, ctx), Some(Type::Any));
            assert_eq!(assign(&int, &Type::Never, Direction::ToInferred, ctx), Some(int.clone()));
            assert_eq!(assign(&int, &Type::Any, Direction::ToInferred, ctx), None);
            assert_eq!(assign(&Type::Never, &int, Direction::FromInferred, ctx), Some(int.clone()));
            assert_eq!(assign(&Type::Any, &int, Direction::Matching, ctx), None);
        });
    }

    #[test]
    fn variance_of_named_arguments() {
        with_ctx(|ctx| {
            // List is covariant, Array invariant.
            let int = core_type("Int");
            assert_eq!(
                assign(&list(Type::Any), &list(int.clone()), Direction::ToInferred, ctx),
                Some(list(Type::Any))
            );
            assert_eq!(assign(&list(int.clone()), &list(Type::Any), Direction::ToInferred, ctx), None);
            assert_eq!(assign(&array(Type::Any), &array(int.clone()), Direction::ToInferred, ctx), None);
            assert_eq!(
                assign(&list(int.clone()), &list(Type::Any), Direction::FromInferred, ctx),
                Some(list(Type::Any))
            );
        });
    }

    #[test]
    fn functions_are_contravariant_in_input() {
        with_ctx(|ctx| {
            let int = core_type("Int");
            let wide = Type::func(Type::Any, int.clone());
            let narrow = Type::func(int.clone(), int.clone());
            assert!(assign(&narrow, &wide, Direction::ToInferred, ctx).is_some());
            assert!(assign(&wide, &narrow, Direction::ToInferred, ctx).is_none());
        });
    }

    #[test]
    fn bundles_match_by_name_and_slot() {
        with_ctx(|ctx| {
            let a = Type::bundle(vec![("x", Type::unit()), ("y", Type::Never)]);
            let b = Type::bundle(vec![("y", Type::Never), ("x", Type::unit())]);
            assert!(assign(&a, &a, Direction::Matching, ctx).is_some());
            assert!(assign(&a, &b, Direction::Matching, ctx).is_none());
        });
    }

    #[test]
    fn inference_binds_and_widens() {
        with_ctx(|ctx| {
            let params = vec![TypeParam {
                name: "T".into(),
                variance: Variance::Invariant,
            }];
            let mut infer = TypeArgsInferringContext::enabled(&params, &TypeBounds::default());
            let pair = Type::tuple(vec![Type::inferred_param(0), Type::inferred_param(0)]);
            let given = Type::tuple(vec![Type::Never, core_type("Int")]);
            let t = assign_type(&pair, &given, Direction::ToInferred, ctx, &mut infer).unwrap();
            assert_eq!(t, Type::tuple(vec![Type::Never, core_type("Int")]));
            assert_eq!(infer.get(0).map(|a| &a.current), Some(&core_type("Int")));
            assert_eq!(infer.get(0).map(|a| a.constraint), Some(Constraint::ExactOrBigger));
        });
    }

    #[test]
    fn exact_bindings_do_not_change() {
        with_ctx(|ctx| {
            let params = vec![TypeParam {
                name: "T".into(),
                variance: Variance::Invariant,
            }];
            let mut infer = TypeArgsInferringContext::enabled(&params, &TypeBounds::default());
            let pair = Type::tuple(vec![Type::inferred_param(0), Type::inferred_param(0)]);
            let given = Type::tuple(vec![Type::Never, core_type("Int")]);
            assert!(assign_type(&pair, &given, Direction::Matching, ctx, &mut infer).is_none());
            assert_eq!(infer.get(0), None);
        });
    }

    #[test]
    fn boxed_values_unbox_on_the_given_side() {
        use fjord_ast::build::{boxed, module, ty};
        let units = module("Units").with_type(boxed("Meters", vec![], ty("Float")));
        let declared = crate::declare::declare_types(
            &[&builtins::core_module(), &units],
            &crate::config::Limits::default(),
        );
        assert!(declared.errors.is_empty());
        let bounds = TypeBounds::default();
        let ctx = TypeCtx {
            module: "Main",
            registry: &declared.registry,
            params: &[],
            bounds: &bounds,
        };
        let meters = Type::named(Symbol::new("Units", "Meters"), vec![]);
        let float = core_type("Float");
        assert_eq!(assign(&float, &meters, Direction::ToInferred, &ctx), Some(float.clone()));
        assert_eq!(assign(&meters, &float, Direction::ToInferred, &ctx), None);
        assert_eq!(assign(&meters, &float, Direction::FromInferred, &ctx), Some(float));
    }

    #[test]
    fn parameters_use_their_bounds() {
        let reg = builtins::core_registry();
        let mut bounds = TypeBounds::default();
        bounds.upper.insert(0, core_type("Number"));
        let params = vec![TypeParam {
            name: "T".into(),
            variance: Variance::Invariant,
        }];
        let ctx = TypeCtx {
            module: "Main",
            registry: &reg,
            params: &params,
            bounds: &bounds,
        };
        assert!(assign(&core_type("Number"), &Type::param(0), Direction::ToInferred, &ctx).is_some());
        assert!(assign(&core_type("Int"), &Type::param(0), Direction::ToInferred, &ctx).is_none());
        assert!(assign(&Type::param(0), &Type::param(0), Direction::Matching, &ctx).is_some());
    }
}
