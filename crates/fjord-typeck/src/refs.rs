//! Names used as values.
//!
//! A name may mean a local, a constant, a type (boxing or a unit case), or
//! a set of overloaded functions. Locals and constants are typed at once;
//! the rest wait for either an expected type or an argument.

use fjord_ast::expr::InlineRef;
use rowan::TextRange;

use crate::assign::typed_assign_to;
use crate::boxing::box_value;
use crate::call::call_typed;
use crate::error::{ExprError, ExprErrorKind};
use crate::expr::{
    Expr, ExprContext, ExprVal, FunctionsRef, RefTarget, SemiExpr, SemiExprVal, Sym, TypeRef, UntypedRef,
};
use crate::infer::TypeArgsInferringContext;
use crate::overload::{overloaded_assign_to, overloaded_call};
use crate::ty::Type;
use crate::unbox::{unbox_func, Repr};

fn display_name(r: &InlineRef) -> String {
    match &r.name.module {
        Some(module) => format!("{}::{}", module, r.name.name),
        None => r.name.name.clone(),
    }
}

pub fn check_ref(r: &InlineRef, span: TextRange, ctx: &ExprContext<'_>) -> Result<SemiExpr, ExprError> {
    let Some(sym) = ctx.lookup(&r.name) else {
        return Err(ExprError::new(
            ExprErrorKind::TypeOrValueNotFound { name: display_name(r) },
            span,
        ));
    };
    let type_args = r
        .type_args
        .iter()
        .map(|te| ctx.resolve_type(te))
        .collect::<Result<Vec<Type>, ExprError>>()?;
    let untyped = |target| {
        let r = UntypedRef {
            target,
            type_args: type_args.clone(),
        };
        SemiExpr::new(SemiExprVal::Ref(r), span)
    };
    let no_type_args = || {
        if type_args.is_empty() {
            Ok(())
        } else {
            Err(ExprError::new(ExprErrorKind::SuperfluousTypeArgs, span))
        }
    };
    match sym {
        Sym::Local(ty) => {
            no_type_args()?;
            Ok(SemiExpr::typed(Expr::new(ty, ExprVal::RefLocal(r.name.name.clone()), span)))
        }
        Sym::Constant(symbol, ty) => {
            no_type_args()?;
            Ok(SemiExpr::typed(Expr::new(ty, ExprVal::RefConstant(symbol), span)))
        }
        Sym::TypeParam(_) => Err(ExprError::new(
            ExprErrorKind::TypeParamInExpr { name: r.name.name.clone() },
            span,
        )),
        Sym::Type(t) => Ok(untyped(RefTarget::Type(t))),
        Sym::Functions(functions) => Ok(untyped(RefTarget::Functions(functions))),
        Sym::LocalAndFunctions(ty, functions) => {
            if !type_args.is_empty() {
                return Ok(untyped(RefTarget::Functions(functions)));
            }
            let local = Expr::new(ty, ExprVal::RefLocal(r.name.name.clone()), span);
            Ok(untyped(RefTarget::FunctionsOrLocal { functions, local }))
        }
    }
}

/// Box a unit value into a type named as a value, e.g. `None`.
fn type_as_value(
    t: &TypeRef,
    type_args: &[Type],
    span: TextRange,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Expr, ExprError> {
    let unit = SemiExpr::typed(Expr::unit(span));
    box_value(unit, &t.name, type_args, t.force_exact, span, ctx, infer).map_err(|err| {
        if err.is_internal() {
            err
        } else {
            ExprError::new(
                ExprErrorKind::TypeUsedAsValue {
                    name: t.name.to_string(),
                },
                span,
            )
        }
    })
}

pub fn assign_ref_to(
    expected: Option<&Type>,
    r: UntypedRef,
    span: TextRange,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Expr, ExprError> {
    match r.target {
        RefTarget::Type(t) => {
            let boxed = type_as_value(&t, &r.type_args, span, ctx, infer)?;
            typed_assign_to(expected, boxed, ctx, infer)
        }
        RefTarget::Functions(f) => {
            overloaded_assign_to(expected, &f.name, &f.functions, &r.type_args, span, ctx, infer)
        }
        RefTarget::FunctionsOrLocal { functions, local } => {
            let local_err = match infer.with_saved(|infer| typed_assign_to(expected, local, ctx, infer)) {
                Ok(expr) => return Ok(expr),
                Err(err) => err,
            };
            infer
                .with_saved(|infer| {
                    overloaded_assign_to(expected, &functions.name, &functions.functions, &[], span, ctx, infer)
                })
                .map_err(|_| local_err)
        }
    }
}

/// Call a reference with `arg`.
pub fn call_untyped_ref(
    r: UntypedRef,
    arg: SemiExpr,
    f_span: TextRange,
    span: TextRange,
    ctx: &ExprContext<'_>,
) -> Result<SemiExpr, ExprError> {
    let mut infer = TypeArgsInferringContext::disabled();
    match r.target {
        RefTarget::Type(t) => {
            let boxed = box_value(arg, &t.name, &r.type_args, t.force_exact, span, ctx, &mut infer)?;
            Ok(SemiExpr::typed(boxed))
        }
        RefTarget::Functions(f) => call_functions(&f, &r.type_args, arg, f_span, span, ctx),
        RefTarget::FunctionsOrLocal { functions, local } => {
            if let Repr::Found { .. } = unbox_func(&local.ty, ctx.module, ctx.registry) {
                Ok(SemiExpr::typed(call_typed(local, arg, span, ctx)?))
            } else {
                call_functions(&functions, &[], arg, f_span, span, ctx)
            }
        }
    }
}

fn call_functions(
    f: &FunctionsRef,
    type_args: &[Type],
    arg: SemiExpr,
    f_span: TextRange,
    span: TextRange,
    ctx: &ExprContext<'_>,
) -> Result<SemiExpr, ExprError> {
    let retry = f.type_fallback.as_ref().map(|_| arg.clone());
    let mut infer = TypeArgsInferringContext::disabled();
    let err = match overloaded_call(&f.name, &f.functions, type_args, arg, f_span, span, ctx, &mut infer) {
        Ok(semi) => return Ok(semi),
        Err(err) if err.is_internal() => return Err(err),
        Err(err) => err,
    };
    let (Some(t), Some(arg)) = (&f.type_fallback, retry) else {
        return Err(err);
    };
    tracing::trace!(name = %t.name, "no overload accepted the call, boxing instead");
    box_value(arg, &t.name, type_args, t.force_exact, span, ctx, &mut infer)
        .map(SemiExpr::typed)
        .map_err(|_| err)
}
