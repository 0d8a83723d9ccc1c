//! Lambdas.
//!
//! A lambda cannot be checked on its own: its input pattern needs a type.
//! It is typed either by assignment to a function type or by being called
//! on the spot with an already typed argument.

use fjord_ast::expr::Lambda;
use rowan::TextRange;

use crate::assign::{assign_to, is_assignable, require_explicit_type};
use crate::error::{ExprError, ExprErrorKind};
use crate::expr::{
    assign_untyped, check, internal, Expr, ExprContext, ExprVal, SemiExpr, SemiExprVal, UntypedLambda,
};
use crate::infer::{get_certain_type, TypeArgsInferringContext};
use crate::pattern::pattern_from;
use crate::ty::{Type, TypeRepr};

pub fn check_lambda(l: &Lambda, span: TextRange, ctx: &ExprContext<'_>) -> SemiExpr {
    SemiExpr::new(
        SemiExprVal::Lambda(UntypedLambda {
            lambda: l.clone(),
            locals: ctx.locals.clone(),
        }),
        span,
    )
}

/// The context a lambda body is checked in: the locals visible where the
/// lambda was written.
fn body_ctx<'a>(l: &UntypedLambda, ctx: &ExprContext<'a>) -> ExprContext<'a> {
    ExprContext {
        locals: l.locals.clone(),
        ..ctx.clone()
    }
}

pub fn assign_lambda_to(
    expected: Option<&Type>,
    l: UntypedLambda,
    span: TextRange,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Expr, ExprError> {
    let expected = require_explicit_type(expected, span)?;
    let Type::Anonymous(TypeRepr::Func { input, output }) = expected else {
        return Err(ExprError::new(
            ExprErrorKind::LambdaAssignedToNonFuncType {
                non_func: ctx.describe_inferred(expected, infer),
            },
            span,
        ));
    };
    let input_t = get_certain_type(input, infer, span)?;
    let pattern = pattern_from(&l.lambda.input, &input_t, ctx)?;
    let inner = body_ctx(&l, ctx).with_pattern(&pattern);
    let output_semi = check(&l.lambda.output, &inner)?;
    let output_expr = assign_to(Some(output), output_semi, &inner, infer)?;
    let output_certain = get_certain_type(output, infer, span)
        .map_err(|_| internal("lambda output type still undetermined after its body", span))?;
    if !is_assignable(&output_certain, &output_expr.ty, &inner.types()) {
        return Err(internal("lambda body does not fit its own output type", span));
    }
    Ok(Expr::new(
        Type::func(input_t, output_certain),
        ExprVal::Lambda {
            input: pattern,
            output: Box::new(output_expr),
        },
        span,
    ))
}

/// `(λ pattern body)(arg)`: the argument's type types the pattern.
pub fn call_untyped_lambda(
    l: UntypedLambda,
    arg: SemiExpr,
    lambda_span: TextRange,
    span: TextRange,
    ctx: &ExprContext<'_>,
) -> Result<Expr, ExprError> {
    let arg = match arg.value {
        SemiExprVal::Typed(expr) => expr,
        _ => assign_untyped(arg, ctx)
            .map_err(|_| ExprError::new(ExprErrorKind::ExplicitTypeRequired, lambda_span))?,
    };
    let pattern = pattern_from(&l.lambda.input, &arg.ty, ctx)?;
    let inner = body_ctx(&l, ctx).with_pattern(&pattern);
    let body = check(&l.lambda.output, &inner)?;
    let body = match body.value {
        SemiExprVal::Typed(expr) => expr,
        _ => assign_untyped(body, &inner)?,
    };
    let output = body.ty.clone();
    let lambda = Expr::new(
        Type::func(arg.ty.clone(), output.clone()),
        ExprVal::Lambda {
            input: pattern,
            output: Box::new(body),
        },
        lambda_span,
    );
    Ok(Expr::new(
        output,
        ExprVal::Call {
            callee: Box::new(lambda),
            arg: Box::new(arg),
        },
        span,
    ))
}
