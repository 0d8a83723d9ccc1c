//! Blocks: a sequence of bindings followed by a returned value.
//!
//! Each binding sees the ones before it; a later binding of the same name
//! shadows an earlier one. A recursive binding also sees itself, which
//! only makes sense for a lambda whose type is written down.

use fjord_ast::expr::{Binding as AstBinding, Block};
use rowan::TextRange;

use crate::assign::assign_to;
use crate::error::{ExprError, ExprErrorKind};
use crate::expr::{
    check, check_and_assign, Binding, Expr, ExprContext, ExprVal, SemiBlock, SemiExpr, SemiExprVal,
};
use crate::infer::TypeArgsInferringContext;
use crate::pattern::pattern_from;
use crate::ty::Type;

pub fn check_block(b: &Block, span: TextRange, ctx: &ExprContext<'_>) -> Result<SemiExpr, ExprError> {
    let mut inner = ctx.clone();
    let mut bindings = Vec::with_capacity(b.bindings.len());
    for binding in &b.bindings {
        let checked = check_binding(binding, &inner)?;
        inner = inner.with_pattern(&checked.pattern);
        bindings.push(checked);
    }
    let ret = check(&b.ret, &inner)?;
    let value = match ret.value {
        SemiExprVal::Typed(ret) => {
            return Ok(SemiExpr::typed(Expr::new(
                ret.ty.clone(),
                ExprVal::Block {
                    bindings,
                    ret: Box::new(ret),
                },
                span,
            )))
        }
        _ => SemiExprVal::Block(SemiBlock {
            bindings,
            ret: Box::new(ret),
        }),
    };
    Ok(SemiExpr::new(value, span))
}

fn check_binding(binding: &AstBinding, ctx: &ExprContext<'_>) -> Result<Binding, ExprError> {
    let annotation = binding.ty.as_ref().map(|te| ctx.resolve_type(te)).transpose()?;
    let mut infer = TypeArgsInferringContext::disabled();
    if binding.recursive {
        let Some(declared) = annotation else {
            return Err(ExprError::new(ExprErrorKind::ExplicitTypeRequired, binding.span));
        };
        let pattern = pattern_from(&binding.pattern, &declared, ctx)?;
        let own_ctx = ctx.with_pattern(&pattern);
        let value = check_and_assign(Some(&declared), &binding.value, &own_ctx, &mut infer)?;
        if !matches!(value.value, ExprVal::Lambda { .. }) {
            return Err(ExprError::new(ExprErrorKind::RecursiveMarkUsedOnNonLambda, binding.value.span));
        }
        return Ok(Binding {
            pattern,
            value,
            recursive: true,
        });
    }
    let value = check_and_assign(annotation.as_ref(), &binding.value, ctx, &mut infer)?;
    let pattern = pattern_from(&binding.pattern, &value.ty, ctx)?;
    Ok(Binding {
        pattern,
        value,
        recursive: false,
    })
}

/// The bindings are already typed; only the returned value is left.
pub fn assign_block_to(
    expected: Option<&Type>,
    b: SemiBlock,
    span: TextRange,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Expr, ExprError> {
    let inner = b
        .bindings
        .iter()
        .fold(ctx.clone(), |inner, binding| inner.with_pattern(&binding.pattern));
    let ret = assign_to(expected, *b.ret, &inner, infer)?;
    Ok(Expr::new(
        ret.ty.clone(),
        ExprVal::Block {
            bindings: b.bindings,
            ret: Box::new(ret),
        },
        span,
    ))
}

#[cfg(test)]
mod tests {
    use fjord_ast::build::*;
    use fjord_ast::expr::Expr as AstExpr;

    use super::*;
    use crate::expr::testing::Fixture;

    fn fixture() -> Fixture {
        Fixture::new(module("Main").with_function(native_function(
            "dec",
            vec![],
            ty("Int"),
            ty("Int"),
        )))
    }

    fn run(fx: &Fixture, src: &AstExpr, expected: Option<&Type>) -> Result<Expr, ExprError> {
        let ctx = fx.ctx();
        assign_to(expected, check(src, &ctx)?, &ctx, &mut TypeArgsInferringContext::disabled())
    }

    fn recursive(mut b: AstBinding) -> AstBinding {
        b.recursive = true;
        b
    }

    #[test]
    fn bindings_are_visible_to_later_ones() {
        let fx = fixture();
        let src = block(
            vec![
                typed_binding(pat("a"), ty("Int"), int("1")),
                binding(pat("b"), call(var("dec"), var("a"))),
            ],
            var("b"),
        );
        let expr = run(&fx, &src, None).unwrap();
        assert_eq!(expr.ty, fx.named("Int"));
        match expr.value {
            ExprVal::Block { bindings, .. } => assert_eq!(bindings.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn later_bindings_shadow() {
        let fx = fixture();
        let src = block(
            vec![
                typed_binding(pat("a"), ty("Int"), int("1")),
                binding(pat("a"), text("one")),
            ],
            var("a"),
        );
        assert_eq!(run(&fx, &src, None).unwrap().ty, fx.named("String"));
    }

    #[test]
    fn untyped_return_waits_for_the_expected_type() {
        let fx = fixture();
        let src = block(vec![binding(pat("s"), text("x"))], int("5"));
        let semi = check(&src, &fx.ctx()).unwrap();
        assert!(matches!(semi.value, SemiExprVal::Block(_)));
        let expr = run(&fx, &src, Some(&fx.named("Float"))).unwrap();
        assert_eq!(expr.ty, fx.named("Float"));
        let err = run(&fx, &src, None).unwrap_err();
        assert_eq!(err.kind, ExprErrorKind::ExplicitTypeRequired);
    }

    #[test]
    fn unannotated_literals_need_a_type() {
        let fx = fixture();
        let src = block(vec![binding(pat("a"), int("1"))], var("a"));
        assert_eq!(run(&fx, &src, None).unwrap_err().kind, ExprErrorKind::ExplicitTypeRequired);
    }

    #[test]
    fn recursive_bindings() {
        let fx = fixture();
        let int_t = fx.named("Int");
        let countdown = lambda_expr(pat("n"), call(var("loop"), call(var("dec"), var("n"))));
        let src = block(
            vec![recursive(typed_binding(
                pat("loop"),
                func_ty(ty("Int"), ty("Int")),
                countdown.clone(),
            ))],
            var("loop"),
        );
        let expr = run(&fx, &src, None).unwrap();
        assert_eq!(expr.ty, Type::func(int_t.clone(), int_t));

        let src = block(vec![recursive(binding(pat("loop"), countdown))], var("loop"));
        assert_eq!(run(&fx, &src, None).unwrap_err().kind, ExprErrorKind::ExplicitTypeRequired);

        let src = block(
            vec![recursive(typed_binding(pat("x"), ty("Int"), int("3")))],
            var("x"),
        );
        let err = run(&fx, &src, None).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"recursive binding requires a typed lambda");
    }

    #[test]
    fn binding_patterns_destructure() {
        let fx = fixture();
        let pair = tuple(vec![text("a"), char_lit('b')]);
        let src = block(vec![binding(pat_tuple(&["s", "c"]), pair)], var("c"));
        assert_eq!(run(&fx, &src, None).unwrap().ty, fx.named("Char"));
        let src = block(vec![binding(pat("x"), var("nope"))], unit());
        assert!(matches!(
            run(&fx, &src, None).unwrap_err().kind,
            ExprErrorKind::TypeOrValueNotFound { .. }
        ));
    }
}
