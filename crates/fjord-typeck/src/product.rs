//! Tuples and bundles: literals, field access and functional update.

use fjord_ast::expr::{Expr as AstExpr, ExprKind, FieldValue, InlineRef};
use fjord_ast::{Ident, RefName};
use rowan::TextRange;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::assign::{assign_to, require_explicit_type, typed_assign_to};
use crate::error::{ExprError, ExprErrorKind};
use crate::expr::{assign_untyped, check, Expr, ExprContext, ExprVal, SemiExpr, SemiExprVal, SemiField};
use crate::infer::TypeArgsInferringContext;
use crate::ty::{ordered_fields, Field, Type, TypeRepr};
use crate::unbox::{unbox_bundle, Repr};

// ── Literals ───────────────────────────────────────────────────────────

pub fn check_tuple(elements: &[AstExpr], span: TextRange, ctx: &ExprContext<'_>) -> Result<SemiExpr, ExprError> {
    match elements {
        [] => Ok(SemiExpr::typed(Expr::unit(span))),
        [single] => check(single, ctx),
        _ => {
            let checked = elements
                .iter()
                .map(|el| check(el, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(SemiExpr::new(SemiExprVal::Tuple(checked), span))
        }
    }
}

/// `{ name }` is short for `{ name: name }`.
fn field_value(field: &FieldValue) -> AstExpr {
    match &field.value {
        Some(value) => value.clone(),
        None => AstExpr {
            kind: ExprKind::Ref(InlineRef {
                name: RefName {
                    module: None,
                    name: field.name.name.clone(),
                    span: field.name.span,
                },
                type_args: vec![],
            }),
            span: field.name.span,
        },
    }
}

fn duplicate_field(name: &Ident) -> ExprError {
    ExprError::new(
        ExprErrorKind::DuplicateField {
            field: name.name.clone(),
        },
        name.span,
    )
}

pub fn check_bundle(fields: &[FieldValue], span: TextRange, ctx: &ExprContext<'_>) -> Result<SemiExpr, ExprError> {
    let mut seen = FxHashSet::default();
    let mut checked = Vec::with_capacity(fields.len());
    for field in fields {
        if !seen.insert(field.name.name.as_str()) {
            return Err(duplicate_field(&field.name));
        }
        checked.push(SemiField {
            name: field.name.clone(),
            value: check(&field_value(field), ctx)?,
        });
    }
    Ok(SemiExpr::new(SemiExprVal::Bundle(checked), span))
}

/// A bundle written out in place, rather than obtained from a value.
fn is_bundle_literal(expr: &Expr) -> bool {
    matches!(
        (&expr.value, &expr.ty),
        (ExprVal::Product(_), Type::Anonymous(TypeRepr::Bundle(_)))
    )
}

// ── Access and update ──────────────────────────────────────────────────

/// `base.field`
pub fn check_get(
    base: &AstExpr,
    field: &Ident,
    span: TextRange,
    ctx: &ExprContext<'_>,
) -> Result<SemiExpr, ExprError> {
    let semi = check(base, ctx)?;
    get_from(semi, field, span, ctx)
}

fn get_from(base: SemiExpr, field: &Ident, span: TextRange, ctx: &ExprContext<'_>) -> Result<SemiExpr, ExprError> {
    let base_span = base.span;
    match base.value {
        SemiExprVal::Ref(_) => {
            let typed = assign_untyped(base, ctx)
                .map_err(|_| ExprError::new(ExprErrorKind::ExplicitTypeRequired, base_span))?;
            get_from(SemiExpr::typed(typed), field, span, ctx)
        }
        SemiExprVal::Typed(b) => {
            if is_bundle_literal(&b) {
                return Err(ExprError::new(ExprErrorKind::GetFromLiteralBundle, base_span));
            }
            match unbox_bundle(&b.ty, ctx.module, ctx.registry, false) {
                Repr::Found { repr: fields, .. } => {
                    let Some(Field { ty, index }) = fields.get(&field.name).cloned() else {
                        return Err(ExprError::new(
                            ExprErrorKind::FieldDoesNotExist {
                                field: field.name.clone(),
                                target: ctx.describe(&Type::Anonymous(TypeRepr::Bundle(fields))),
                            },
                            field.span,
                        ));
                    };
                    Ok(SemiExpr::typed(Expr::new(
                        ty,
                        ExprVal::Get {
                            product: Box::new(b),
                            index,
                        },
                        span,
                    )))
                }
                Repr::Opaque => Err(ExprError::new(ExprErrorKind::GetFromOpaqueBundle, base_span)),
                Repr::NotFound => Err(ExprError::new(ExprErrorKind::GetFromNonBundle, base_span)),
            }
        }
        SemiExprVal::Bundle(_) => Err(ExprError::new(ExprErrorKind::GetFromLiteralBundle, base_span)),
        _ => Err(ExprError::new(ExprErrorKind::GetFromNonBundle, base_span)),
    }
}

/// `base with { field: value, ... }`: a copy of `base` with some fields
/// replaced. The fields keep their types.
pub fn check_update(
    base: &AstExpr,
    fields: &[FieldValue],
    span: TextRange,
    ctx: &ExprContext<'_>,
) -> Result<SemiExpr, ExprError> {
    let semi = check(base, ctx)?;
    let base_span = semi.span;
    let b = match semi.value {
        SemiExprVal::Typed(b) if is_bundle_literal(&b) => {
            return Err(ExprError::new(ExprErrorKind::SetToLiteralBundle, base_span))
        }
        SemiExprVal::Typed(b) => b,
        SemiExprVal::Bundle(_) => return Err(ExprError::new(ExprErrorKind::SetToLiteralBundle, base_span)),
        _ => return Err(ExprError::new(ExprErrorKind::SetToNonBundle, base_span)),
    };
    let declared = match unbox_bundle(&b.ty, ctx.module, ctx.registry, false) {
        Repr::Found { repr, .. } => repr,
        Repr::Opaque => return Err(ExprError::new(ExprErrorKind::SetToOpaqueBundle, base_span)),
        Repr::NotFound => return Err(ExprError::new(ExprErrorKind::SetToNonBundle, base_span)),
    };
    let mut seen = FxHashSet::default();
    let ty = b.ty.clone();
    let mut current = b;
    for fv in fields {
        let name = &fv.name;
        let Some(target) = declared.get(&name.name) else {
            return Err(ExprError::new(
                ExprErrorKind::FieldDoesNotExist {
                    field: name.name.clone(),
                    target: ctx.describe(&ty),
                },
                name.span,
            ));
        };
        if !seen.insert(name.name.as_str()) {
            return Err(duplicate_field(name));
        }
        let value_semi = check(&field_value(fv), ctx)?;
        let value = assign_to(Some(&target.ty), value_semi, ctx, &mut TypeArgsInferringContext::disabled())?;
        current = Expr::new(
            ty.clone(),
            ExprVal::Set {
                product: Box::new(current),
                index: target.index,
                value: Box::new(value),
            },
            span,
        );
    }
    Ok(SemiExpr::typed(current))
}

// ── Assignment ─────────────────────────────────────────────────────────

pub fn assign_tuple_to(
    expected: Option<&Type>,
    elements: Vec<SemiExpr>,
    span: TextRange,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Expr, ExprError> {
    match expected {
        Some(Type::Anonymous(TypeRepr::Tuple(required))) => {
            if required.len() != elements.len() {
                return Err(ExprError::new(
                    ExprErrorKind::TupleSizeNotMatching {
                        required: required.len(),
                        given: elements.len(),
                        given_type: ctx.describe_inferred(&Type::tuple(required.clone()), infer),
                    },
                    span,
                ));
            }
            let typed = elements
                .into_iter()
                .zip(required)
                .map(|(el, t)| assign_to(Some(t), el, ctx, infer))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(product(typed, span))
        }
        Some(other @ Type::Anonymous(_)) => Err(ExprError::new(
            ExprErrorKind::TupleAssignedToNonTupleType {
                non_tuple: ctx.describe_inferred(other, infer),
            },
            span,
        )),
        _ => {
            let typed = elements
                .into_iter()
                .map(|el| assign_untyped(el, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            typed_assign_to(expected, product(typed, span), ctx, infer)
        }
    }
}

fn product(elements: Vec<Expr>, span: TextRange) -> Expr {
    let ty = Type::tuple(elements.iter().map(|el| el.ty.clone()).collect());
    Expr::new(ty, ExprVal::Product(elements), span)
}

pub fn assign_bundle_to(
    expected: Option<&Type>,
    fields: Vec<SemiField>,
    span: TextRange,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Expr, ExprError> {
    let expected = require_explicit_type(expected, span)?;
    match expected {
        Type::Anonymous(TypeRepr::Unit) if fields.is_empty() => Ok(Expr::unit(span)),
        Type::Anonymous(TypeRepr::Bundle(declared)) => {
            let mut given: FxHashMap<String, SemiField> =
                fields.into_iter().map(|f| (f.name.name.clone(), f)).collect();
            let mut values = Vec::with_capacity(declared.len());
            let mut final_fields = Vec::with_capacity(declared.len());
            for (name, field) in ordered_fields(declared) {
                let Some(given_field) = given.remove(name) else {
                    return Err(ExprError::new(
                        ExprErrorKind::MissingField {
                            field: name.to_string(),
                            ty: ctx.describe_inferred(&field.ty, infer),
                        },
                        span,
                    ));
                };
                let value = assign_to(Some(&field.ty), given_field.value, ctx, infer)?;
                final_fields.push((name.to_string(), value.ty.clone()));
                values.push(value);
            }
            if let Some(extra) = given.into_values().min_by_key(|f| f.name.span.start()) {
                return Err(ExprError::new(
                    ExprErrorKind::SuperfluousField {
                        field: extra.name.name.clone(),
                        ty: ctx.describe_inferred(expected, infer),
                    },
                    extra.name.span,
                ));
            }
            Ok(Expr::new(Type::bundle(final_fields), ExprVal::Product(values), span))
        }
        other => Err(ExprError::new(
            ExprErrorKind::BundleAssignedToNonBundleType {
                non_bundle: ctx.describe_inferred(other, infer),
            },
            span,
        )),
    }
}
