//! Overload resolution.
//!
//! Every overload of a name is tried against the same argument. When
//! several accept it, the decision waits until the expected type is known
//! ([`assign_undecided_to`]); among the candidates that still fit, the one
//! whose own result type is strictly narrower than every other wins. When
//! no candidate is, the call is ambiguous.

use rowan::TextRange;
use tracing::debug;

use crate::assign::{assign_type, typed_assign_to, Direction};
use crate::describe::describe_type;
use crate::error::{CandidateError, ExprError, ExprErrorKind, FunctionError, FunctionErrorKind};
use crate::expr::{CallOption, Expr, ExprContext, SemiExpr, SemiExprVal, UndecidedCall};
use crate::function::FunctionSig;
use crate::generics::{generic_function_assign_to, generic_function_call};
use crate::infer::TypeArgsInferringContext;
use crate::ty::{types_equal, Type};

/// `name[T, U]: (λ In Out)`, as shown in candidate lists.
pub fn describe_function(f: &FunctionSig, module: &str) -> String {
    let params: Vec<&str> = f.params.iter().map(|p| p.name.as_str()).collect();
    format!(
        "{}[{}]: {}",
        f.symbol.name,
        params.join(", "),
        describe_type(&f.func_type(), module, &f.params)
    )
}

/// Two overloads of one name may not share a signature.
pub fn validate_overload(existing: &FunctionSig, added: &FunctionSig) -> Result<(), FunctionError> {
    if existing.arity() == added.arity() && types_equal(&existing.func_type(), &added.func_type()) {
        return Err(FunctionError::new(
            FunctionErrorKind::InvalidOverload {
                name: added.symbol.name.clone(),
                existing_module: existing.symbol.module.to_string(),
            },
            added.span,
        ));
    }
    Ok(())
}

/// A candidate that accepted the argument, with the bindings it made.
struct Available {
    expr: Expr,
    /// The candidate's own result type, before any assignment.
    result: Type,
    desc: String,
    infer: TypeArgsInferringContext,
}

/// Call the overloads of `name` with `arg`.
#[allow(clippy::too_many_arguments)]
pub fn overloaded_call(
    name: &str,
    functions: &[FunctionSig],
    type_args: &[Type],
    arg: SemiExpr,
    f_span: TextRange,
    span: TextRange,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<SemiExpr, ExprError> {
    if let [f] = functions {
        let expr = generic_function_call(f, type_args, arg, f_span, span, ctx, infer)?;
        return Ok(SemiExpr::typed(expr));
    }
    let mut available = Vec::new();
    let mut unavailable = Vec::new();
    for f in functions {
        let desc = describe_function(f, ctx.module);
        let mut trial = infer.clone();
        match generic_function_call(f, type_args, arg.clone(), f_span, span, ctx, &mut trial) {
            Ok(expr) => available.push(Available {
                result: expr.ty.clone(),
                expr,
                desc,
                infer: trial,
            }),
            Err(err) if err.is_internal() => return Err(err),
            Err(error) => unavailable.push(CandidateError { desc, error }),
        }
    }
    debug!(
        name,
        available = available.len(),
        unavailable = unavailable.len(),
        "tried overloads"
    );
    match generate_call_result(name, available, unavailable, false, span, ctx, infer)? {
        Decision::Typed(expr) => Ok(SemiExpr::typed(expr)),
        Decision::Undecided(call) => Ok(SemiExpr::new(SemiExprVal::Undecided(call), span)),
    }
}

/// Settle an undecided call once its expected type is known.
pub fn assign_undecided_to(
    expected: Option<&Type>,
    call: UndecidedCall,
    span: TextRange,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Expr, ExprError> {
    let mut available = Vec::new();
    let mut unavailable = Vec::new();
    for option in call.options {
        let mut trial = infer.clone();
        let result = option.expr.ty.clone();
        match typed_assign_to(expected, option.expr, ctx, &mut trial) {
            Ok(expr) => available.push(Available {
                expr,
                result,
                desc: option.desc,
                infer: trial,
            }),
            Err(err) if err.is_internal() => return Err(err),
            Err(error) => unavailable.push(CandidateError {
                desc: option.desc,
                error,
            }),
        }
    }
    match generate_call_result(&call.name, available, unavailable, true, span, ctx, infer)? {
        Decision::Typed(expr) => Ok(expr),
        Decision::Undecided(_) => Err(crate::expr::internal("assigned call left undecided", span)),
    }
}

enum Decision {
    Typed(Expr),
    Undecided(UndecidedCall),
}

/// Pick the result of a call from the overloads that accepted it.
fn generate_call_result(
    name: &str,
    mut available: Vec<Available>,
    unavailable: Vec<CandidateError>,
    assigned: bool,
    span: TextRange,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Decision, ExprError> {
    match available.len() {
        0 => Err(ExprError::new(
            ExprErrorKind::NoneOfFunctionsCallable {
                candidates: unavailable,
            },
            span,
        )),
        1 => {
            let only = available.remove(0);
            infer.merge_from(only.infer);
            Ok(Decision::Typed(only.expr))
        }
        _ if !assigned => Ok(Decision::Undecided(UndecidedCall {
            name: name.to_string(),
            options: available
                .into_iter()
                .map(|a| CallOption {
                    expr: a.expr,
                    desc: a.desc,
                })
                .collect(),
        })),
        _ => match minimal(&available, ctx) {
            Some(index) => {
                let chosen = available.swap_remove(index);
                debug!(name, chosen = %chosen.desc, "picked the narrowest overload");
                infer.merge_from(chosen.infer);
                Ok(Decision::Typed(chosen.expr))
            }
            None => Err(ExprError::new(
                ExprErrorKind::AmbiguousCall {
                    candidates: available.into_iter().map(|a| a.desc).collect(),
                },
                span,
            )),
        },
    }
}

/// The candidate whose result type is strictly narrower than every other
/// candidate's. Equal or unrelated results leave no such candidate.
fn minimal(available: &[Available], ctx: &ExprContext<'_>) -> Option<usize> {
    let types = ctx.types();
    let fits = |to: &Type, from: &Type| {
        assign_type(
            to,
            from,
            Direction::ToInferred,
            &types,
            &mut TypeArgsInferringContext::disabled(),
        )
        .is_some()
    };
    let narrower = |a: &Type, b: &Type| !types_equal(a, b) && fits(b, a) && !fits(a, b);
    (0..available.len()).find(|&i| {
        let candidate = &available[i].result;
        available
            .iter()
            .enumerate()
            .all(|(j, other)| i == j || narrower(candidate, &other.result))
    })
}

/// Use the overloads of `name` as a value of type `expected`.
pub fn overloaded_assign_to(
    expected: Option<&Type>,
    name: &str,
    functions: &[FunctionSig],
    type_args: &[Type],
    span: TextRange,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Expr, ExprError> {
    if let [f] = functions {
        return generic_function_assign_to(expected, f, type_args, span, ctx, infer);
    }
    let mut available = Vec::new();
    let mut unavailable = Vec::new();
    for f in functions {
        let desc = describe_function(f, ctx.module);
        let mut trial = infer.clone();
        match generic_function_assign_to(expected, f, type_args, span, ctx, &mut trial) {
            Ok(expr) => available.push(Available {
                result: expr.ty.clone(),
                expr,
                desc,
                infer: trial,
            }),
            Err(err) if err.is_internal() => return Err(err),
            Err(error) => unavailable.push(CandidateError { desc, error }),
        }
    }
    debug!(name, available = available.len(), "assigned overloads");
    match available.len() {
        0 => Err(ExprError::new(
            ExprErrorKind::NoneOfFunctionsAssignable {
                to: expected.map_or_else(|| "(none)".to_string(), |t| ctx.describe_inferred(t, infer)),
                candidates: unavailable,
            },
            span,
        )),
        1 => {
            let only = available.remove(0);
            infer.merge_from(only.infer);
            Ok(only.expr)
        }
        _ => Err(ExprError::new(
            ExprErrorKind::AmbiguousFunctionAssign {
                candidates: available.into_iter().map(|a| a.desc).collect(),
            },
            span,
        )),
    }
}

#[cfg(test)]
mod tests {
    use fjord_ast::build::*;
    use fjord_common::Symbol;

    use super::*;
    use crate::expr::testing::Fixture;
    use crate::expr::ExprVal;
    use crate::infer::{ActiveType, Constraint};
    use crate::ty::{TypeBounds, TypeParam};
    use crate::variance::Variance;

    fn fixture() -> Fixture {
        Fixture::new(
            module("Text")
                .with_function(native_function("show", vec![], ty("Int"), ty("String")))
                .with_function(native_function("show", vec![], ty("Float"), ty("String")))
                .with_function(native_function(
                    "wrap",
                    vec![],
                    ty("Int"),
                    ty_args("List", vec![ty("Int")]),
                ))
                .with_function(native_function(
                    "wrap",
                    vec![],
                    ty("Int"),
                    ty_args("List", vec![ty("any")]),
                ))
                .with_function(native_function("pick", vec![], ty("Int"), ty("Int")))
                .with_function(native_function("pick", vec![], ty("Int"), ty("Float"))),
        )
    }

    fn typed(t: Type) -> SemiExpr {
        SemiExpr::typed(Expr::new(t, ExprVal::UnitValue, TextRange::default()))
    }

    fn call(fx: &Fixture, name: &str, arg: SemiExpr) -> Result<SemiExpr, ExprError> {
        let ctx = fx.ctx();
        let span = TextRange::default();
        let functions = &fx.scope.functions[name];
        overloaded_call(
            name,
            functions,
            &[],
            arg,
            span,
            span,
            &ctx,
            &mut TypeArgsInferringContext::disabled(),
        )
    }

    fn settle(fx: &Fixture, semi: SemiExpr, expected: Option<&Type>) -> Result<Expr, ExprError> {
        crate::assign::assign_to(expected, semi, &fx.ctx(), &mut TypeArgsInferringContext::disabled())
    }

    #[test]
    fn the_argument_selects_the_overload() {
        let fx = fixture();
        let semi = call(&fx, "show", typed(fx.named("Float"))).unwrap();
        let expr = semi.as_typed().unwrap();
        assert_eq!(expr.ty, fx.named("String"));
        match &expr.value {
            ExprVal::Call { callee, .. } => {
                assert!(matches!(callee.value, ExprVal::RefFunction { index: 1, .. }))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn no_overload_accepts_the_argument() {
        let fx = fixture();
        let err = call(&fx, "show", typed(fx.named("String"))).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @r###"
        none of the functions are callable
          show[]: (λ Int String): value of type String cannot be assigned to type Int
          show[]: (λ Float String): value of type String cannot be assigned to type Float
        "###);
    }

    #[test]
    fn the_narrowest_result_wins() {
        let fx = fixture();
        let semi = call(&fx, "wrap", typed(fx.named("Int"))).unwrap();
        assert!(matches!(semi.value, SemiExprVal::Undecided(_)));
        let expr = settle(&fx, semi, None).unwrap();
        assert_eq!(
            expr.ty,
            Type::named(Symbol::core("List"), vec![fx.named("Int")])
        );
    }

    #[test]
    fn unrelated_results_are_ambiguous_until_assigned() {
        let fx = fixture();
        let semi = call(&fx, "pick", typed(fx.named("Int"))).unwrap();
        let err = settle(&fx, semi.clone(), None).unwrap_err();
        assert!(matches!(err.kind, ExprErrorKind::AmbiguousCall { .. }));
        let float = fx.named("Float");
        let expr = settle(&fx, semi, Some(&float)).unwrap();
        assert_eq!(expr.ty, float);
    }

    #[test]
    fn the_narrowest_result_wins_against_an_expected_type() {
        let fx = fixture();
        let semi = call(&fx, "wrap", typed(fx.named("Int"))).unwrap();
        let wide = Type::named(Symbol::core("List"), vec![Type::Any]);
        let expr = settle(&fx, semi, Some(&wide)).unwrap();
        match &expr.value {
            ExprVal::Call { callee, .. } => {
                assert!(matches!(callee.value, ExprVal::RefFunction { index: 0, .. }))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    /// `split` overloads returning `(never, never)`, `(Int, never)` and
    /// `(never, Int)`, declared in the given order.
    fn splits(order: &[usize]) -> Fixture {
        let results = [
            tuple_ty(vec![ty("never"), ty("never")]),
            tuple_ty(vec![ty("Int"), ty("never")]),
            tuple_ty(vec![ty("never"), ty("Int")]),
        ];
        let m = order.iter().fold(module("Text"), |m, &i| {
            m.with_function(native_function("split", vec![], ty("Int"), results[i].clone()))
        });
        Fixture::new(m)
    }

    #[test]
    fn minimality_ignores_declaration_order() {
        for order in [[0, 1, 2], [1, 2, 0], [2, 0, 1]] {
            let fx = splits(&order);
            let semi = call(&fx, "split", typed(fx.named("Int"))).unwrap();
            let expr = settle(&fx, semi, None).unwrap();
            assert_eq!(expr.ty, Type::tuple(vec![Type::Never, Type::Never]), "order {:?}", order);
        }
    }

    #[test]
    fn incomparable_results_stay_ambiguous() {
        for order in [[1, 2], [2, 1]] {
            let fx = splits(&order);
            let semi = call(&fx, "split", typed(fx.named("Int"))).unwrap();
            let err = settle(&fx, semi, None).unwrap_err();
            assert!(matches!(err.kind, ExprErrorKind::AmbiguousCall { .. }), "order {:?}", order);
        }
    }

    #[test]
    fn a_single_success_keeps_its_bindings() {
        let fx = fixture();
        let params = [TypeParam {
            name: "T".to_string(),
            variance: Variance::Invariant,
        }];
        let mut infer = TypeArgsInferringContext::enabled(&params, &TypeBounds::default());
        let mut trial = infer.clone();
        trial.set(
            0,
            ActiveType {
                current: fx.named("Int"),
                constraint: Constraint::Exact,
            },
        );
        let string = fx.named("String");
        let only = Available {
            expr: Expr::new(string.clone(), ExprVal::UnitValue, TextRange::default()),
            result: string,
            desc: "show".to_string(),
            infer: trial,
        };
        let ctx = fx.ctx();
        let decision =
            generate_call_result("show", vec![only], vec![], false, TextRange::default(), &ctx, &mut infer)
                .unwrap();
        assert!(matches!(decision, Decision::Typed(_)));
        assert_eq!(infer.get(0).map(|a| &a.current), Some(&fx.named("Int")));
    }

    #[test]
    fn references_to_overloads() {
        let fx = fixture();
        let ctx = fx.ctx();
        let span = TextRange::default();
        let expected = Type::func(fx.named("Float"), fx.named("String"));
        let mut infer = TypeArgsInferringContext::disabled();
        let functions = &fx.scope.functions["show"];
        let expr = overloaded_assign_to(Some(&expected), "show", functions, &[], span, &ctx, &mut infer).unwrap();
        assert!(matches!(expr.value, ExprVal::RefFunction { index: 1, .. }));

        let err = overloaded_assign_to(Some(&fx.named("Int")), "show", functions, &[], span, &ctx, &mut infer)
            .unwrap_err();
        assert!(matches!(err.kind, ExprErrorKind::NoneOfFunctionsAssignable { .. }));

        let any_input = Type::func(Type::Never, fx.named("String"));
        let err = overloaded_assign_to(Some(&any_input), "show", functions, &[], span, &ctx, &mut infer)
            .unwrap_err();
        assert!(matches!(err.kind, ExprErrorKind::AmbiguousFunctionAssign { .. }));
    }

    #[test]
    fn descriptions_list_type_parameters() {
        let fx = Fixture::new(module("Lists").with_function(native_function(
            "pair",
            vec![param("A"), param("B")],
            tuple_ty(vec![ty("A"), ty("B")]),
            ty("A"),
        )));
        let f = &fx.scope.functions["pair"][0];
        assert_eq!(describe_function(f, "Lists"), "pair[A, B]: (λ (A, B) A)");
    }
}
