//! Calls, infix calls and casts.

use fjord_ast::expr::Expr as AstExpr;
use fjord_ast::ty::TypeExpr;
use rowan::TextRange;

use crate::assign::assign_to;
use crate::error::{ExprError, ExprErrorKind};
use crate::expr::{check, Expr, ExprContext, ExprVal, SemiExpr, SemiExprVal};
use crate::infer::TypeArgsInferringContext;
use crate::lambda::call_untyped_lambda;
use crate::refs::call_untyped_ref;
use crate::unbox::{unbox_func, Repr};

/// `callee(arg)`
pub fn check_call(
    callee: &AstExpr,
    arg: &AstExpr,
    span: TextRange,
    ctx: &ExprContext<'_>,
) -> Result<SemiExpr, ExprError> {
    let callee = check(callee, ctx)?;
    let arg = check(arg, ctx)?;
    call_semi(callee, arg, span, ctx)
}

/// `left op right`, which is `op(left, right)`.
pub fn check_infix(
    op: &AstExpr,
    left: &AstExpr,
    right: &AstExpr,
    span: TextRange,
    ctx: &ExprContext<'_>,
) -> Result<SemiExpr, ExprError> {
    let callee = check(op, ctx)?;
    let left = check(left, ctx)?;
    let right = check(right, ctx)?;
    let arg = SemiExpr::new(SemiExprVal::Tuple(vec![left, right]), span);
    call_semi(callee, arg, span, ctx)
}

fn call_semi(callee: SemiExpr, arg: SemiExpr, span: TextRange, ctx: &ExprContext<'_>) -> Result<SemiExpr, ExprError> {
    let f_span = callee.span;
    match callee.value {
        SemiExprVal::Typed(f) => Ok(SemiExpr::typed(call_typed(f, arg, span, ctx)?)),
        SemiExprVal::Lambda(l) => Ok(SemiExpr::typed(call_untyped_lambda(l, arg, f_span, span, ctx)?)),
        SemiExprVal::Ref(r) => call_untyped_ref(r, arg, f_span, span, ctx),
        SemiExprVal::Switch(_) | SemiExprVal::MultiSwitch(_) | SemiExprVal::Block(_) => {
            Err(ExprError::new(ExprErrorKind::ExplicitTypeRequired, f_span))
        }
        _ => Err(ExprError::new(ExprErrorKind::ExprNotCallable, f_span)),
    }
}

/// Call a value whose type is, or boxes, a function type.
pub fn call_typed(f: Expr, arg: SemiExpr, span: TextRange, ctx: &ExprContext<'_>) -> Result<Expr, ExprError> {
    let Repr::Found {
        repr: (input, output), ..
    } = unbox_func(&f.ty, ctx.module, ctx.registry)
    else {
        return Err(ExprError::new(
            ExprErrorKind::ExprTypeNotCallable {
                ty: ctx.describe(&f.ty),
            },
            f.span,
        ));
    };
    let arg = assign_to(Some(&input), arg, ctx, &mut TypeArgsInferringContext::disabled())?;
    Ok(Expr::new(
        output,
        ExprVal::Call {
            callee: Box::new(f),
            arg: Box::new(arg),
        },
        span,
    ))
}

/// `value as T`: assignment to a written type.
pub fn check_cast(
    value: &AstExpr,
    target: &TypeExpr,
    span: TextRange,
    ctx: &ExprContext<'_>,
) -> Result<SemiExpr, ExprError> {
    let target = ctx.resolve_type(target)?;
    let semi = check(value, ctx)?;
    let expr = assign_to(Some(&target), semi, ctx, &mut TypeArgsInferringContext::disabled())?;
    Ok(SemiExpr::typed(Expr { span, ..expr }))
}
