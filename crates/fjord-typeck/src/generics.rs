//! Calling and referring to generic functions.
//!
//! Type arguments are either written out in full or inferred. A call
//! infers them from its argument; a reference infers them from the type
//! it is assigned to. Parameters a call leaves unbound are defaulted from
//! how they occur in the output type: `never` when only covariant, `any`
//! when only contravariant.

use rowan::TextRange;

use crate::assign::{assign_type, assign_to, typed_assign_to, Direction};
use crate::bounds::check_type_args_bounds;
use crate::error::{ExprError, ExprErrorKind};
use crate::expr::{internal, Expr, ExprContext, ExprVal, SemiExpr};
use crate::function::FunctionSig;
use crate::infer::{get_certain_type, TypeArgsInferringContext};
use crate::ty::{fill_type_args, mark_params_as_being_inferred, types_equal, Type};
use crate::variance::{get_variance, Variance};

fn wrong_quantity(f: &FunctionSig, given: usize, span: TextRange) -> ExprError {
    ExprError::new(
        ExprErrorKind::FunctionWrongTypeParamsQuantity {
            name: f.symbol.name.clone(),
            given,
            required: f.arity(),
        },
        span,
    )
}

/// A reference to one overload, after checking its type arguments against
/// the declared bounds.
pub fn make_ref_function(
    f: &FunctionSig,
    type_args: Vec<Type>,
    span: TextRange,
    ctx: &ExprContext<'_>,
) -> Result<ExprVal, ExprError> {
    let no_defaults = Default::default();
    check_type_args_bounds(&type_args, &f.params, &no_defaults, &f.bounds, &ctx.types(), span)?;
    Ok(ExprVal::RefFunction {
        name: f.symbol.clone(),
        index: f.index,
        type_args,
    })
}

fn call_expr(f_type: Type, f_ref: ExprVal, f_span: TextRange, arg: Expr, output: Type, span: TextRange) -> Expr {
    Expr::new(
        output,
        ExprVal::Call {
            callee: Box::new(Expr::new(f_type, f_ref, f_span)),
            arg: Box::new(arg),
        },
        span,
    )
}

/// Call `f` with `arg`.
#[allow(clippy::too_many_arguments)]
pub fn generic_function_call(
    f: &FunctionSig,
    type_args: &[Type],
    arg: SemiExpr,
    f_span: TextRange,
    span: TextRange,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Expr, ExprError> {
    let arity = f.arity();
    if type_args.len() == arity {
        let input = fill_type_args(&f.input, type_args);
        let output = fill_type_args(&f.output, type_args);
        let arg = assign_to(Some(&input), arg, ctx, infer)?;
        let f_type = Type::func(input, output.clone());
        let f_ref = make_ref_function(f, type_args.to_vec(), f_span, ctx)?;
        return Ok(call_expr(f_type, f_ref, f_span, arg, output, span));
    }
    if !type_args.is_empty() {
        return Err(wrong_quantity(f, type_args.len(), f_span));
    }

    let mut inferring = TypeArgsInferringContext::enabled(&f.params, &f.bounds);
    let marked_input = mark_params_as_being_inferred(&f.input);
    let arg = assign_to(Some(&marked_input), arg, ctx, &mut inferring)?;
    let output_variance = get_variance(&f.output, arity, ctx.registry);
    let mut inferred = Vec::with_capacity(arity);
    for i in 0..arity {
        let t = match inferring.get(i) {
            Some(active) => active.current.clone(),
            None => match output_variance.get(i) {
                Some(Variance::Covariant) => Type::Never,
                Some(Variance::Contravariant) => Type::Any,
                _ => return Err(ExprError::new(ExprErrorKind::ExplicitTypeParamsRequired, f_span)),
            },
        };
        inferred.push(t);
    }
    tracing::trace!(function = %f.symbol, ?inferred, "inferred call arguments");

    let input = fill_type_args(&f.input, &inferred);
    // A widened binding may be bigger than the argument, so the argument
    // only has to fit, not match.
    let fits = assign_type(
        &input,
        &arg.ty,
        Direction::ToInferred,
        &ctx.types(),
        &mut TypeArgsInferringContext::disabled(),
    );
    if fits.is_none() {
        return Err(internal(
            format!("argument does not fit the inferred input of {}", f.symbol),
            arg.span,
        ));
    }
    let output = fill_type_args(&f.output, &inferred);
    let f_type = Type::func(input, output.clone());
    let f_ref = make_ref_function(f, inferred, f_span, ctx)?;
    Ok(call_expr(f_type, f_ref, f_span, arg, output, span))
}

/// Use `f` as a value of type `expected`.
pub fn generic_function_assign_to(
    expected: Option<&Type>,
    f: &FunctionSig,
    type_args: &[Type],
    span: TextRange,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Expr, ExprError> {
    // A function taking unit may stand for its result.
    if types_equal(&f.input, &Type::unit()) {
        let thunk = infer.with_saved(|infer| {
            let unit = SemiExpr::typed(Expr::unit(span));
            let called = generic_function_call(f, type_args, unit, span, span, ctx, infer)?;
            typed_assign_to(expected, called, ctx, infer)
        });
        if let Ok(expr) = thunk {
            return Ok(expr);
        }
    }

    let arity = f.arity();
    if type_args.len() == arity {
        let f_type = fill_type_args(&f.func_type(), type_args);
        let f_ref = make_ref_function(f, type_args.to_vec(), span, ctx)?;
        return typed_assign_to(expected, Expr::new(f_type, f_ref, span), ctx, infer);
    }
    if !type_args.is_empty() {
        return Err(wrong_quantity(f, type_args.len(), span));
    }

    let expected = expected.ok_or_else(|| ExprError::new(ExprErrorKind::ExplicitTypeRequired, span))?;
    let exp_certain = get_certain_type(expected, infer, span)?;
    let mut inferring = TypeArgsInferringContext::enabled(&f.params, &f.bounds);
    let marked = mark_params_as_being_inferred(&f.func_type());
    let types = ctx.types();
    if assign_type(&marked, &exp_certain, Direction::FromInferred, &types, &mut inferring).is_none() {
        return Err(ExprError::new(
            ExprErrorKind::NotAssignable {
                from: ctx.describe_inferred(&marked, &inferring),
                to: ctx.describe(&exp_certain),
            },
            span,
        ));
    }
    let Some(inferred) = inferring.inferred_args() else {
        return Err(ExprError::new(ExprErrorKind::ExplicitTypeParamsRequired, span));
    };
    let f_type = fill_type_args(&f.func_type(), &inferred);
    let fits = assign_type(
        &exp_certain,
        &f_type,
        Direction::ToInferred,
        &types,
        &mut TypeArgsInferringContext::disabled(),
    );
    if fits.is_none() {
        return Err(internal(
            format!("reference to {} does not fit the type it was inferred from", f.symbol),
            span,
        ));
    }
    let f_ref = make_ref_function(f, inferred, span, ctx)?;
    Ok(Expr::new(f_type, f_ref, span))
}
