//! Switches over unions, and `if`.
//!
//! A switch names one or more case types per branch. Every case of the
//! union has to be covered exactly once, either by a branch of its own or
//! by the default branch, which in turn must not be superfluous. A
//! multi-switch does the same over the product of several unions.
//!
//! `if` is a switch over `Bool` with a `Yes` branch and a default branch.

use fjord_ast::expr::{Expr as AstExpr, ExprKind, If, InlineRef, MultiSwitch, Switch};
use fjord_common::Symbol;
use rowan::TextRange;
use rustc_hash::FxHashSet;

use crate::assign::{assign_to, require_explicit_type};
use crate::builtins::{bool_type, YES};
use crate::describe::describe_symbol;
use crate::error::{ExprError, ExprErrorKind, TypeError, TypeErrorKind};
use crate::expr::{
    assign_untyped, check, Branch, Expr, ExprContext, ExprVal, MultiBranch, SemiBranch, SemiExpr, SemiExprVal,
    SemiMultiBranch, SemiMultiSwitch, SemiSwitch,
};
use crate::infer::{get_certain_type, TypeArgsInferringContext};
use crate::pattern::pattern_from;
use crate::ty::{CaseType, Type, TypeDef};
use crate::unbox::{is_reactive, reactive_symbol, unbox, Unboxed};

const ANY_CASE: &str = "_";

/// A union found behind the type of a switch argument.
#[derive(Debug, Clone)]
pub struct UnionInfo {
    pub name: Symbol,
    pub args: Vec<Type>,
    pub cases: Vec<CaseType>,
    /// The argument is a `Reactive` of the union.
    pub across_reactive: bool,
}

/// Find the union behind `t`, through boxed types and, if allowed, one
/// `Reactive` layer.
pub fn extract_union(t: &Type, ctx: &ExprContext<'_>, cross_reactive: bool) -> Option<UnionInfo> {
    let Type::Named { name, args } = t else {
        return None;
    };
    if cross_reactive && is_reactive(t) {
        let inner = extract_union(args.first()?, ctx, false)?;
        return Some(UnionInfo {
            across_reactive: true,
            ..inner
        });
    }
    match &ctx.registry.get(name)?.def {
        TypeDef::Union(cases) => Some(UnionInfo {
            name: name.clone(),
            args: args.clone(),
            cases: cases.clone(),
            across_reactive: false,
        }),
        TypeDef::Boxed(_) => match unbox(t, ctx.module, ctx.registry) {
            Unboxed::Inner(inner) => extract_union(&inner, ctx, cross_reactive),
            Unboxed::Opaque | Unboxed::Failed => None,
        },
        TypeDef::Native => None,
    }
}

/// A case named by a branch.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseRef {
    pub index: usize,
    pub ty: Type,
}

/// Resolve the case type `r` names within `union`. With `any_ok`, `_`
/// stands for every case and yields `None`.
pub fn get_case_type(
    r: &InlineRef,
    union: &UnionInfo,
    any_ok: bool,
    ctx: &ExprContext<'_>,
) -> Result<Option<CaseRef>, ExprError> {
    let span = r.name.span;
    if !r.type_args.is_empty() {
        return Err(ExprError::new(ExprErrorKind::TypeParametersUnnecessary, span));
    }
    if any_ok && r.name.module.is_none() && r.name.name == ANY_CASE {
        return Ok(None);
    }
    let symbol = match &r.name.module {
        Some(module) => Symbol::new(module.as_str(), r.name.name.as_str()),
        None => {
            let local = Symbol::new(ctx.module, r.name.name.as_str());
            if ctx.registry.contains(&local) {
                local
            } else {
                Symbol::core(r.name.name.as_str())
            }
        }
    };
    if !ctx.registry.contains(&symbol) {
        return Err(TypeError::new(
            TypeErrorKind::TypeNotFound {
                name: symbol.to_string(),
            },
            span,
        )
        .into());
    }
    let Some(index) = union.cases.iter().position(|c| c.name == symbol) else {
        return Err(ExprError::new(
            ExprErrorKind::NotBranchType {
                union: ctx.describe(&Type::named(union.name.clone(), union.args.clone())),
                type_name: describe_symbol(&symbol, ctx.module),
            },
            span,
        ));
    };
    let args = union.cases[index]
        .params
        .iter()
        .filter_map(|&j| union.args.get(j).cloned())
        .collect();
    Ok(Some(CaseRef {
        index,
        ty: Type::named(symbol, args),
    }))
}

fn typed_arg(arg: &AstExpr, ctx: &ExprContext<'_>) -> Result<Expr, ExprError> {
    assign_untyped(check(arg, ctx)?, ctx)
}

fn invalid_arg(arg: &Expr, ctx: &ExprContext<'_>) -> ExprError {
    ExprError::new(
        ExprErrorKind::InvalidSwitchArgType {
            arg_type: ctx.describe(&arg.ty),
        },
        arg.span,
    )
}

// ── Switch ─────────────────────────────────────────────────────────────

pub fn check_switch(sw: &Switch, span: TextRange, ctx: &ExprContext<'_>) -> Result<SemiExpr, ExprError> {
    let arg = typed_arg(&sw.arg, ctx)?;
    let union = extract_union(&arg.ty, ctx, true).ok_or_else(|| invalid_arg(&arg, ctx))?;
    let mut checked = FxHashSet::default();
    let mut default_span = None;
    let mut branches = Vec::new();
    for branch in &sw.branches {
        if branch.is_default() {
            if default_span.is_some() {
                return Err(ExprError::new(ExprErrorKind::DuplicateDefaultBranch, branch.span));
            }
            default_span = Some(branch.span);
            branches.push(SemiBranch {
                case: None,
                pattern: None,
                value: check(&branch.value, ctx)?,
            });
            continue;
        }
        // `case A, B: value` is one branch per case.
        for r in &branch.types {
            let Some(case) = get_case_type(r, &union, false, ctx)? else {
                continue;
            };
            if !checked.insert(case.index) {
                return Err(ExprError::new(ExprErrorKind::CheckedBranch, branch.span));
            }
            let case_ty = if union.across_reactive {
                Type::named(reactive_symbol(), vec![case.ty])
            } else {
                case.ty
            };
            let pattern = branch
                .pattern
                .as_ref()
                .map(|p| pattern_from(p, &case_ty, ctx))
                .transpose()?;
            let branch_ctx = match &pattern {
                Some(p) => ctx.with_pattern(p),
                None => ctx.clone(),
            };
            branches.push(SemiBranch {
                case: Some(case.index),
                pattern,
                value: check(&branch.value, &branch_ctx)?,
            });
        }
    }
    match default_span {
        None if checked.len() != union.cases.len() => {
            let missing = union
                .cases
                .iter()
                .enumerate()
                .filter(|(i, _)| !checked.contains(i))
                .map(|(_, c)| describe_symbol(&c.name, ctx.module))
                .collect();
            Err(ExprError::new(ExprErrorKind::IncompleteMatch { missing }, span))
        }
        Some(default) if checked.len() == union.cases.len() => {
            Err(ExprError::new(ExprErrorKind::SuperfluousDefaultBranch, default))
        }
        _ => Ok(SemiExpr::new(
            SemiExprVal::Switch(SemiSwitch {
                arg,
                branches,
                reactive: union.across_reactive,
            }),
            span,
        )),
    }
}

pub fn assign_switch_to(
    expected: Option<&Type>,
    sw: SemiSwitch,
    span: TextRange,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Expr, ExprError> {
    let expected = require_explicit_type(expected, span)?;
    let branches = sw
        .branches
        .into_iter()
        .map(|b| {
            Ok(Branch {
                case: b.case,
                pattern: b.pattern,
                value: assign_to(Some(expected), b.value, ctx, infer)?,
            })
        })
        .collect::<Result<Vec<_>, ExprError>>()?;
    let ty = get_certain_type(expected, infer, span)?;
    Ok(Expr::new(
        ty,
        ExprVal::Switch {
            arg: Box::new(sw.arg),
            branches,
            reactive: sw.reactive,
        },
        span,
    ))
}

// ── Multi-switch ───────────────────────────────────────────────────────

/// Every combination of case indices a branch covers; `None` positions
/// range over all cases of their union.
fn expand_keys(cases: &[Option<usize>], unions: &[UnionInfo]) -> Vec<Vec<usize>> {
    let mut keys: Vec<Vec<usize>> = vec![Vec::with_capacity(cases.len())];
    for (case, union) in cases.iter().zip(unions) {
        let choices: Vec<usize> = match case {
            Some(index) => vec![*index],
            None => (0..union.cases.len()).collect(),
        };
        keys = keys
            .into_iter()
            .flat_map(|prefix| {
                choices.iter().map(move |&c| {
                    let mut key = prefix.clone();
                    key.push(c);
                    key
                })
            })
            .collect();
    }
    keys
}

pub fn check_multi_switch(msw: &MultiSwitch, span: TextRange, ctx: &ExprContext<'_>) -> Result<SemiExpr, ExprError> {
    let mut args = Vec::with_capacity(msw.args.len());
    let mut unions = Vec::with_capacity(msw.args.len());
    for a in &msw.args {
        let arg = typed_arg(a, ctx)?;
        let union = extract_union(&arg.ty, ctx, false).ok_or_else(|| invalid_arg(&arg, ctx))?;
        args.push(arg);
        unions.push(union);
    }
    let total: usize = unions.iter().map(|u| u.cases.len()).product();
    let mut checked: FxHashSet<Vec<usize>> = FxHashSet::default();
    let mut default_span = None;
    let mut branches = Vec::with_capacity(msw.branches.len());
    for branch in &msw.branches {
        let Some(types) = &branch.types else {
            if default_span.is_some() {
                return Err(ExprError::new(ExprErrorKind::DuplicateDefaultBranch, branch.span));
            }
            default_span = Some(branch.span);
            branches.push(SemiMultiBranch {
                cases: None,
                pattern: None,
                value: check(&branch.value, ctx)?,
            });
            continue;
        };
        if types.len() != args.len() {
            return Err(ExprError::new(
                ExprErrorKind::WrongMultiBranchTypeQuantity {
                    required: args.len(),
                    given: types.len(),
                },
                branch.span,
            ));
        }
        let mut cases = Vec::with_capacity(types.len());
        let mut case_types = Vec::with_capacity(types.len());
        for (r, union) in types.iter().zip(&unions) {
            match get_case_type(r, union, true, ctx)? {
                Some(case) => {
                    cases.push(Some(case.index));
                    case_types.push(case.ty);
                }
                None => {
                    cases.push(None);
                    case_types.push(Type::unit());
                }
            }
        }
        if cases.iter().all(Option::is_none) {
            return Err(ExprError::new(ExprErrorKind::MultiBranchTypesAllDefault, branch.span));
        }
        for key in expand_keys(&cases, &unions) {
            if !checked.insert(key) {
                return Err(ExprError::new(ExprErrorKind::CheckedBranch, branch.span));
            }
        }
        let pattern = branch
            .pattern
            .as_ref()
            .map(|p| pattern_from(p, &Type::tuple(case_types), ctx))
            .transpose()?;
        let branch_ctx = match &pattern {
            Some(p) => ctx.with_pattern(p),
            None => ctx.clone(),
        };
        branches.push(SemiMultiBranch {
            cases: Some(cases),
            pattern,
            value: check(&branch.value, &branch_ctx)?,
        });
    }
    match default_span {
        None if checked.len() != total => Err(ExprError::new(
            ExprErrorKind::IncompleteMultiMatch {
                missing: total - checked.len(),
            },
            span,
        )),
        Some(default) if checked.len() == total => {
            Err(ExprError::new(ExprErrorKind::SuperfluousDefaultBranch, default))
        }
        _ => Ok(SemiExpr::new(
            SemiExprVal::MultiSwitch(SemiMultiSwitch { args, branches }),
            span,
        )),
    }
}

pub fn assign_multi_switch_to(
    expected: Option<&Type>,
    msw: SemiMultiSwitch,
    span: TextRange,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Expr, ExprError> {
    let expected = require_explicit_type(expected, span)?;
    let branches = msw
        .branches
        .into_iter()
        .map(|b| {
            Ok(MultiBranch {
                cases: b.cases,
                pattern: b.pattern,
                value: assign_to(Some(expected), b.value, ctx, infer)?,
            })
        })
        .collect::<Result<Vec<_>, ExprError>>()?;
    let ty = get_certain_type(expected, infer, span)?;
    Ok(Expr::new(
        ty,
        ExprVal::MultiSwitch {
            args: msw.args,
            branches,
        },
        span,
    ))
}

// ── If ─────────────────────────────────────────────────────────────────

/// `if a then x elif b then y else z` is `if a then x else (if b then y else z)`.
fn desugar_elifs(i: &If) -> AstExpr {
    i.elifs.iter().rev().fold((*i.no).clone(), |no, elif| AstExpr {
        kind: ExprKind::If(If {
            cond: Box::new(elif.cond.clone()),
            yes: Box::new(elif.yes.clone()),
            elifs: vec![],
            no: Box::new(no),
        }),
        span: elif.span,
    })
}

fn yes_index(ctx: &ExprContext<'_>) -> usize {
    ctx.registry
        .get(&Symbol::core(crate::builtins::BOOL))
        .and_then(|g| g.as_union())
        .and_then(|cases| cases.iter().position(|c| c.name == Symbol::core(YES)))
        .unwrap_or(0)
}

pub fn check_if(i: &If, span: TextRange, ctx: &ExprContext<'_>) -> Result<SemiExpr, ExprError> {
    let cond_semi = check(&i.cond, ctx)?;
    let mut infer = TypeArgsInferringContext::disabled();
    let (cond, reactive) = match assign_to(Some(&bool_type()), cond_semi.clone(), ctx, &mut infer) {
        Ok(cond) => (cond, false),
        Err(err) if err.is_internal() => return Err(err),
        Err(err) => {
            let reactive_bool = Type::named(reactive_symbol(), vec![bool_type()]);
            match assign_to(Some(&reactive_bool), cond_semi, ctx, &mut infer) {
                Ok(cond) => (cond, true),
                Err(_) => return Err(err),
            }
        }
    };
    let yes = check(&i.yes, ctx)?;
    let no = check(&desugar_elifs(i), ctx)?;
    Ok(SemiExpr::new(
        SemiExprVal::Switch(SemiSwitch {
            arg: cond,
            branches: vec![
                SemiBranch {
                    case: Some(yes_index(ctx)),
                    pattern: None,
                    value: yes,
                },
                SemiBranch {
                    case: None,
                    pattern: None,
                    value: no,
                },
            ],
            reactive,
        }),
        span,
    ))
}

#[cfg(test)]
mod tests {
    use fjord_ast::build::*;

    use super::*;
    use crate::expr::testing::Fixture;

    fn fixture() -> Fixture {
        Fixture::new(
            module("Geometry")
                .with_type(union(
                    "Shape",
                    vec![],
                    vec![
                        boxed("Circle", vec![], ty("Float")),
                        boxed("Square", vec![], ty("Float")),
                        unit_boxed("Dot"),
                    ],
                ))
                .with_type(boxed("Wrapped", vec![], ty("Shape")))
                .with_type(union(
                    "Light",
                    vec![],
                    vec![unit_boxed("Red"), unit_boxed("Green")],
                )),
        )
    }

    fn run(fx: &Fixture, src: &AstExpr, expected: Option<&Type>) -> Result<Expr, ExprError> {
        let ctx = fx.ctx().with_locals([
            ("s".to_string(), fx.named("Shape")),
            ("w".to_string(), fx.named("Wrapped")),
            ("l".to_string(), fx.named("Light")),
            ("b".to_string(), bool_type()),
        ]);
        let semi = check(src, &ctx)?;
        assign_to(expected, semi, &ctx, &mut TypeArgsInferringContext::disabled())
    }

    fn err_of(fx: &Fixture, src: &AstExpr) -> ExprError {
        run(fx, src, Some(&fx.named("Int"))).unwrap_err()
    }

    #[test]
    fn complete_switch() {
        let fx = fixture();
        let src = switch(
            var("s"),
            vec![
                branch(&["Circle", "Square"], Some(pat("r")), int("1")),
                branch(&["Dot"], None, int("0")),
            ],
        );
        let expr = run(&fx, &src, Some(&fx.named("Int"))).unwrap();
        match expr.value {
            ExprVal::Switch { branches, .. } => {
                let cases: Vec<Option<usize>> = branches.iter().map(|b| b.case).collect();
                assert_eq!(cases, vec![Some(0), Some(1), Some(2)]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn completeness_errors() {
        let fx = fixture();
        let src = switch(var("s"), vec![branch(&["Circle"], None, int("1"))]);
        insta::assert_snapshot!(err_of(&fx, &src).to_string(), @"incomplete match: missing Square, Dot");

        let src = switch(
            var("s"),
            vec![
                branch(&["Circle", "Square", "Dot"], None, int("1")),
                default_branch(int("0")),
            ],
        );
        assert_eq!(err_of(&fx, &src).kind, ExprErrorKind::SuperfluousDefaultBranch);

        let src = switch(
            var("s"),
            vec![branch(&["Circle"], None, int("1")), branch(&["Circle"], None, int("2"))],
        );
        assert_eq!(err_of(&fx, &src).kind, ExprErrorKind::CheckedBranch);

        let src = switch(
            var("s"),
            vec![default_branch(int("1")), default_branch(int("2"))],
        );
        assert_eq!(err_of(&fx, &src).kind, ExprErrorKind::DuplicateDefaultBranch);
    }

    #[test]
    fn branch_types_must_be_cases() {
        let fx = fixture();
        let src = switch(var("s"), vec![branch(&["Red"], None, int("1")), default_branch(int("0"))]);
        insta::assert_snapshot!(err_of(&fx, &src).to_string(), @"type Red is not a case of the union Shape");
        let src = switch(var("s"), vec![branch(&["Nope"], None, int("1")), default_branch(int("0"))]);
        assert!(matches!(err_of(&fx, &src).kind, ExprErrorKind::TypeErrorInExpr(_)));
        let src = switch(int("1"), vec![default_branch(int("0"))]);
        assert!(matches!(err_of(&fx, &src).kind, ExprErrorKind::ExplicitTypeRequired));
        let src = switch(text("x"), vec![default_branch(int("0"))]);
        assert!(matches!(err_of(&fx, &src).kind, ExprErrorKind::InvalidSwitchArgType { .. }));
    }

    #[test]
    fn switch_through_boxed_and_reactive() {
        let fx = fixture();
        let src = switch(var("w"), vec![default_branch(int("0"))]);
        assert!(run(&fx, &src, Some(&fx.named("Int"))).is_ok());

        let reactive = Type::named(reactive_symbol(), vec![fx.named("Shape")]);
        let ctx = fx.ctx().with_locals([("r".to_string(), reactive)]);
        let src = switch(var("r"), vec![default_branch(int("0"))]);
        match check(&src, &ctx).unwrap().value {
            SemiExprVal::Switch(sw) => assert!(sw.reactive),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn switch_needs_an_expected_type() {
        let fx = fixture();
        let src = switch(var("s"), vec![default_branch(int("0"))]);
        assert_eq!(run(&fx, &src, None).unwrap_err().kind, ExprErrorKind::ExplicitTypeRequired);
    }

    #[test]
    fn multi_switch_coverage() {
        let fx = fixture();
        let complete = multi_switch(
            vec![var("l"), var("l")],
            vec![
                multi_branch(&["Red", "_"], None, int("1")),
                multi_branch(&["Green", "Red"], None, int("2")),
                multi_branch(&["Green", "Green"], None, int("3")),
            ],
        );
        assert!(run(&fx, &complete, Some(&fx.named("Int"))).is_ok());

        let incomplete = multi_switch(
            vec![var("l"), var("s")],
            vec![multi_branch(&["Red", "_"], None, int("1"))],
        );
        insta::assert_snapshot!(err_of(&fx, &incomplete).to_string(), @"incomplete match: 3 combination(s) missing");

        let overlapping = multi_switch(
            vec![var("l"), var("l")],
            vec![
                multi_branch(&["Red", "_"], None, int("1")),
                multi_branch(&["Red", "Green"], None, int("2")),
                multi_default(int("0")),
            ],
        );
        assert_eq!(err_of(&fx, &overlapping).kind, ExprErrorKind::CheckedBranch);
    }

    #[test]
    fn multi_switch_branch_shapes() {
        let fx = fixture();
        let src = multi_switch(
            vec![var("l"), var("l")],
            vec![multi_branch(&["_", "_"], None, int("1"))],
        );
        assert_eq!(err_of(&fx, &src).kind, ExprErrorKind::MultiBranchTypesAllDefault);
        let src = multi_switch(
            vec![var("l"), var("l")],
            vec![multi_branch(&["Red"], None, int("1")), multi_default(int("0"))],
        );
        assert_eq!(
            err_of(&fx, &src).kind,
            ExprErrorKind::WrongMultiBranchTypeQuantity { required: 2, given: 1 }
        );
    }

    #[test]
    fn multi_switch_patterns_bind_case_values() {
        let fx = fixture();
        let src = multi_switch(
            vec![var("s"), var("l")],
            vec![
                multi_branch(&["Circle", "_"], Some(pat_tuple(&["c", "_"])), var("c")),
                multi_default(var("s")),
            ],
        );
        let err = run(&fx, &src, Some(&fx.named("Float"))).unwrap_err();
        // `c` is a Circle, which is not a Float.
        assert!(matches!(err.kind, ExprErrorKind::NotAssignable { .. }));
    }

    #[test]
    fn if_is_a_switch_over_bool() {
        let fx = fixture();
        let src = if_chain(var("b"), int("1"), vec![(var("b"), int("2"))], int("3"));
        let expr = run(&fx, &src, Some(&fx.named("Int"))).unwrap();
        match expr.value {
            ExprVal::Switch { branches, reactive, .. } => {
                assert!(!reactive);
                assert_eq!(branches[0].case, Some(0));
                assert_eq!(branches[1].case, None);
                assert!(matches!(branches[1].value.value, ExprVal::Switch { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
        let src = if_else(int("1"), int("1"), int("2"));
        assert!(matches!(err_of(&fx, &src).kind, ExprErrorKind::IntegerAssignedToNonIntegerType { .. }));
    }
}
