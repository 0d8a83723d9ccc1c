//! Structural validation of types and declarations.

use fjord_common::Symbol;
use rowan::TextRange;
use rustc_hash::FxHashMap;

use crate::config::Limits;
use crate::error::{TypeError, TypeErrorKind};
use crate::ty::{GenericType, Type, TypeCtx, TypeDef, TypeRegistry, TypeRepr};
use crate::variance::{get_variance, match_variance, params_variance};

/// Anything that knows how many arguments each type name takes.
pub trait TypeLookup {
    /// `(fewest, most)` arguments accepted by `name`, or `None` if there
    /// is no such type.
    fn arity_range(&self, name: &Symbol) -> Option<(usize, usize)>;
}

impl TypeLookup for TypeRegistry {
    fn arity_range(&self, name: &Symbol) -> Option<(usize, usize)> {
        self.get(name).map(|g| (g.min_arity(), g.arity()))
    }
}

/// Arities of declarations that are still being registered.
#[derive(Debug, Clone, Default)]
pub struct Arities {
    map: FxHashMap<Symbol, (usize, usize)>,
}

impl Arities {
    pub fn insert(&mut self, name: Symbol, min: usize, max: usize) {
        self.map.insert(name, (min, max));
    }
}

impl TypeLookup for Arities {
    fn arity_range(&self, name: &Symbol) -> Option<(usize, usize)> {
        self.map.get(name).copied()
    }
}

/// Check that `name` exists and accepts `given` arguments.
pub fn validate_named(
    name: &Symbol,
    given: usize,
    lookup: &dyn TypeLookup,
    span: TextRange,
) -> Result<(), TypeError> {
    let Some((min, max)) = lookup.arity_range(name) else {
        return Err(TypeError::new(
            TypeErrorKind::TypeNotFound {
                name: name.to_string(),
            },
            span,
        ));
    };
    if given < min || given > max {
        return Err(TypeError::new(
            TypeErrorKind::WrongParameterQuantity {
                type_name: name.to_string(),
                required: max,
                given,
            },
            span,
        ));
    }
    Ok(())
}

pub fn validate_product_size(count: usize, limits: &Limits, span: TextRange) -> Result<(), TypeError> {
    if count > limits.max_product_items {
        return Err(TypeError::new(
            TypeErrorKind::TooManyProductItems {
                defined: count,
                limit: limits.max_product_items,
            },
            span,
        ));
    }
    Ok(())
}

/// Check that every name in `t` exists with a fitting argument count and
/// that no product exceeds the size limit.
pub fn validate_type(t: &Type, lookup: &dyn TypeLookup, limits: &Limits, span: TextRange) -> Result<(), TypeError> {
    match t {
        Type::Never | Type::Any | Type::Parameter { .. } => Ok(()),
        Type::Named { name, args } => {
            validate_named(name, args.len(), lookup, span)?;
            args.iter()
                .try_for_each(|arg| validate_type(arg, lookup, limits, span))
        }
        Type::Anonymous(repr) => match repr {
            TypeRepr::Unit => Ok(()),
            TypeRepr::Tuple(elements) => {
                validate_product_size(elements.len(), limits, span)?;
                elements
                    .iter()
                    .try_for_each(|el| validate_type(el, lookup, limits, span))
            }
            TypeRepr::Bundle(fields) => {
                validate_product_size(fields.len(), limits, span)?;
                fields
                    .values()
                    .try_for_each(|f| validate_type(&f.ty, lookup, limits, span))
            }
            TypeRepr::Func { input, output } => {
                validate_type(input, lookup, limits, span)?;
                validate_type(output, lookup, limits, span)
            }
        },
    }
}

/// Validate the definition of a registered declaration. `ctx.params` must
/// be the declaration's own parameters.
pub fn validate_type_def(g: &GenericType, ctx: &TypeCtx<'_>, limits: &Limits) -> Result<(), TypeError> {
    match &g.def {
        TypeDef::Union(cases) => {
            if cases.len() > limits.max_union_cases {
                return Err(TypeError::new(
                    TypeErrorKind::TooManyUnionItems {
                        defined: cases.len(),
                        limit: limits.max_union_cases,
                    },
                    g.span,
                ));
            }
            let union_v = params_variance(&g.params);
            for case in cases {
                let Some(case_g) = ctx.registry.get(&case.name) else {
                    continue;
                };
                let case_v = params_variance(&case_g.params);
                let agrees = case
                    .params
                    .iter()
                    .enumerate()
                    .all(|(i, j)| case_v.get(i) == union_v.get(*j));
                if !agrees {
                    return Err(TypeError::new(
                        TypeErrorKind::CaseBadVariance {
                            case_name: case.name.to_string(),
                            union_name: case_g
                                .case_info
                                .as_ref()
                                .map(|info| info.union_name.to_string())
                                .unwrap_or_default(),
                        },
                        case_g.span,
                    ));
                }
            }
            Ok(())
        }
        TypeDef::Boxed(boxed) => {
            validate_type(&boxed.inner, ctx.registry, limits, g.span)?;
            let inner_v = get_variance(&boxed.inner, g.arity(), ctx.registry);
            match_variance(&g.params, &inner_v).map_err(|bad_params| {
                TypeError::new(TypeErrorKind::BoxedBadVariance { bad_params }, g.span)
            })
        }
        TypeDef::Native => Ok(()),
    }
}
