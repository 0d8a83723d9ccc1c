//! Binding patterns.
//!
//! A pattern destructures the input of a lambda, the value of a block
//! binding or the case value of a switch branch. Tuple and bundle
//! patterns see through boxed types, subject to opacity.

use fjord_ast::pat::{Pattern, PatternKind};
use fjord_ast::Ident;
use rowan::TextRange;
use rustc_hash::FxHashSet;

use crate::error::{ExprError, ExprErrorKind};
use crate::expr::ExprContext;
use crate::ty::Type;
use crate::unbox::{unbox_bundle, unbox_tuple, unbox_weak, Repr};

const IGNORED: &str = "_";

#[derive(Debug, Clone, PartialEq)]
pub struct CheckedPattern {
    pub kind: CheckedPatternKind,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckedPatternKind {
    /// Binds the whole value, with weak boxed layers stripped.
    Trivial { name: String, ty: Type },
    Tuple(Vec<PatternItem>),
    Bundle(Vec<PatternItem>),
}

/// A name bound to the `index`-th element or field slot.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternItem {
    pub name: String,
    pub index: usize,
    pub ty: Type,
    pub span: TextRange,
}

impl CheckedPattern {
    /// The locals this pattern introduces.
    pub fn bindings(&self) -> Vec<(String, Type)> {
        match &self.kind {
            CheckedPatternKind::Trivial { name, ty } => vec![(name.clone(), ty.clone())],
            CheckedPatternKind::Tuple(items) | CheckedPatternKind::Bundle(items) => items
                .iter()
                .map(|item| (item.name.clone(), item.ty.clone()))
                .collect(),
        }
    }
}

/// Check `pattern` against a value of type `input`.
pub fn pattern_from(pattern: &Pattern, input: &Type, ctx: &ExprContext<'_>) -> Result<CheckedPattern, ExprError> {
    let span = pattern.span;
    let kind = match &pattern.kind {
        PatternKind::Trivial(name) => trivial(name, input, ctx),
        PatternKind::Tuple(names) if names.len() == 1 => trivial(&names[0], input, ctx),
        PatternKind::Tuple(names) => match unbox_tuple(input, ctx.module, ctx.registry, false) {
            Repr::Found { repr: elements, .. } => {
                if elements.len() != names.len() {
                    return Err(ExprError::new(
                        ExprErrorKind::TupleSizeNotMatching {
                            required: names.len(),
                            given: elements.len(),
                            given_type: ctx.describe(input),
                        },
                        span,
                    ));
                }
                let mut seen = FxHashSet::default();
                let mut items = Vec::new();
                for (index, (name, ty)) in names.iter().zip(elements).enumerate() {
                    if name.name == IGNORED {
                        continue;
                    }
                    check_unique(name, &mut seen)?;
                    items.push(PatternItem {
                        name: name.name.clone(),
                        index,
                        ty,
                        span: name.span,
                    });
                }
                if items.is_empty() {
                    return Err(ExprError::new(ExprErrorKind::EntireValueIgnored, span));
                }
                CheckedPatternKind::Tuple(items)
            }
            Repr::NotFound => return Err(ExprError::new(ExprErrorKind::MatchingNonTupleType, span)),
            Repr::Opaque => return Err(ExprError::new(ExprErrorKind::MatchingOpaqueTupleType, span)),
        },
        PatternKind::Bundle(fields) => match unbox_bundle(input, ctx.module, ctx.registry, false) {
            Repr::Found { repr: declared, .. } => {
                let mut seen = FxHashSet::default();
                let mut items = Vec::with_capacity(fields.len());
                for fb in fields {
                    let Some(field) = declared.get(&fb.field.name) else {
                        return Err(ExprError::new(
                            ExprErrorKind::FieldDoesNotExist {
                                field: fb.field.name.clone(),
                                target: ctx.describe(input),
                            },
                            fb.field.span,
                        ));
                    };
                    check_unique(&fb.binding, &mut seen)?;
                    items.push(PatternItem {
                        name: fb.binding.name.clone(),
                        index: field.index,
                        ty: field.ty.clone(),
                        span: fb.binding.span,
                    });
                }
                CheckedPatternKind::Bundle(items)
            }
            Repr::NotFound => return Err(ExprError::new(ExprErrorKind::MatchingNonBundleType, span)),
            Repr::Opaque => return Err(ExprError::new(ExprErrorKind::MatchingOpaqueBundleType, span)),
        },
    };
    Ok(CheckedPattern { kind, span })
}

fn trivial(name: &Ident, input: &Type, ctx: &ExprContext<'_>) -> CheckedPatternKind {
    CheckedPatternKind::Trivial {
        name: name.name.clone(),
        ty: unbox_weak(input, ctx.registry),
    }
}

fn check_unique<'n>(name: &'n Ident, seen: &mut FxHashSet<&'n str>) -> Result<(), ExprError> {
    if seen.insert(name.name.as_str()) {
        Ok(())
    } else {
        Err(ExprError::new(
            ExprErrorKind::DuplicateBinding {
                name: name.name.clone(),
            },
            name.span,
        ))
    }
}
