//! Array literals, typed as `Core::Array[T]`.

use fjord_ast::expr::Expr as AstExpr;
use fjord_common::Symbol;
use rowan::TextRange;

use crate::assign::{assign_to, typed_assign_to};
use crate::builtins::{array_of, ARRAY};
use crate::error::{ExprError, ExprErrorKind};
use crate::expr::{assign_untyped, check, Expr, ExprContext, ExprVal, SemiExpr, SemiExprVal};
use crate::infer::{get_certain_type, TypeArgsInferringContext};
use crate::ty::Type;

pub fn check_array(items: &[AstExpr], span: TextRange, ctx: &ExprContext<'_>) -> Result<SemiExpr, ExprError> {
    let items = items.iter().map(|item| check(item, ctx)).collect::<Result<Vec<_>, _>>()?;
    Ok(SemiExpr::new(SemiExprVal::Array(items), span))
}

/// Without an expected element type, the first item decides it.
fn untyped_array(items: Vec<SemiExpr>, span: TextRange, ctx: &ExprContext<'_>) -> Result<Expr, ExprError> {
    let mut items = items.into_iter();
    let Some(first) = items.next() else {
        return Err(ExprError::new(ExprErrorKind::ExplicitTypeRequired, span));
    };
    let first = assign_untyped(first, ctx)?;
    let element = first.ty.clone();
    let mut typed = vec![first];
    let mut infer = TypeArgsInferringContext::disabled();
    for item in items {
        typed.push(assign_to(Some(&element), item, ctx, &mut infer)?);
    }
    Ok(Expr::new(array_of(element), ExprVal::Array(typed), span))
}

pub fn assign_array_to(
    expected: Option<&Type>,
    items: Vec<SemiExpr>,
    span: TextRange,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Expr, ExprError> {
    let Some(expected) = expected else {
        return untyped_array(items, span, ctx);
    };
    match expected {
        Type::Named { name, args } if *name == Symbol::core(ARRAY) && args.len() == 1 => {
            let element = &args[0];
            let typed = items
                .into_iter()
                .map(|item| assign_to(Some(element), item, ctx, infer))
                .collect::<Result<Vec<_>, _>>()?;
            let element = get_certain_type(element, infer, span)?;
            Ok(Expr::new(array_of(element), ExprVal::Array(typed), span))
        }
        Type::Named { .. } | Type::Parameter { .. } | Type::Any => {
            let array = untyped_array(items, span, ctx)?;
            typed_assign_to(Some(expected), array, ctx, infer)
        }
        Type::Never | Type::Anonymous(_) => Err(ExprError::new(
            ExprErrorKind::ArrayAssignedToNonArrayType {
                non_array: ctx.describe_inferred(expected, infer),
            },
            span,
        )),
    }
}

#[cfg(test)]
mod tests {
    use fjord_ast::build::*;

    use super::*;
    use crate::expr::testing::Fixture;

    fn run(fx: &Fixture, src: &AstExpr, expected: Option<&Type>) -> Result<Expr, ExprError> {
        let ctx = fx.ctx();
        assign_to(expected, check(src, &ctx)?, &ctx, &mut TypeArgsInferringContext::disabled())
    }

    #[test]
    fn element_type_from_the_expected_array() {
        let fx = Fixture::new(module("Main"));
        let expected = array_of(fx.named("Float"));
        let expr = run(&fx, &array(vec![int("1"), float(2.5)]), Some(&expected)).unwrap();
        assert_eq!(expr.ty, expected);
        match expr.value {
            ExprVal::Array(items) => assert_eq!(items[0].value, ExprVal::Float(1.0)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn element_type_from_the_first_item() {
        let fx = Fixture::new(module("Main"));
        let expr = run(&fx, &array(vec![text("a"), text("b")]), None).unwrap();
        assert_eq!(expr.ty, array_of(fx.named("String")));
        let err = run(&fx, &array(vec![text("a"), char_lit('b')]), None).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"value of type Char cannot be assigned to type String");
        let err = run(&fx, &array(vec![]), None).unwrap_err();
        assert_eq!(err.kind, ExprErrorKind::ExplicitTypeRequired);
    }

    #[test]
    fn empty_array_with_an_expected_type() {
        let fx = Fixture::new(module("Main"));
        let expected = array_of(fx.named("Int"));
        assert_eq!(run(&fx, &array(vec![]), Some(&expected)).unwrap().ty, expected);
    }

    #[test]
    fn non_array_targets() {
        let fx = Fixture::new(module("Main"));
        let err = run(&fx, &array(vec![text("a")]), Some(&Type::unit())).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"array cannot be assigned to non-array type ()");
        let err = run(&fx, &array(vec![text("a")]), Some(&fx.named("Int"))).unwrap_err();
        assert!(matches!(err.kind, ExprErrorKind::NotAssignable { .. }));
        let expr = run(&fx, &array(vec![text("a")]), Some(&Type::Any)).unwrap();
        assert_eq!(expr.ty, Type::Any);
    }

    #[test]
    fn boxed_arrays() {
        let names = boxed("Names", vec![], ty_args("Array", vec![ty("String")]));
        let fx = Fixture::new(module("Main").with_type(names));
        let expr = run(&fx, &array(vec![text("a")]), Some(&fx.named("Names"))).unwrap();
        assert_eq!(expr.ty, fx.named("Names"));
    }
}
