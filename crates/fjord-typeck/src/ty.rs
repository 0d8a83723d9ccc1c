//! Type representation for the Fjord type checker.
//!
//! Types are either nominal (`Named`, an instantiated generic declaration),
//! structural (`Anonymous`: unit, tuples, bundles and functions), a
//! reference to a type parameter of the enclosing declaration, or one of the
//! two extremes `Never` and `Any`.
//!
//! Declarations live in a [`TypeRegistry`] keyed by their [`Symbol`].

use std::collections::BTreeMap;

use fjord_common::Symbol;
use rowan::TextRange;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::variance::Variance;

// ── Types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Type {
    /// Bottom: assignable to every type.
    Never,
    /// Top: every type is assignable to it.
    Any,
    /// The `index`-th parameter of the enclosing declaration. When
    /// `being_inferred` is set it is a free variable of the current
    /// inference pass instead.
    Parameter { index: usize, being_inferred: bool },
    /// A generic declaration instantiated with exactly `arity` arguments.
    Named { name: Symbol, args: Vec<Type> },
    Anonymous(TypeRepr),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TypeRepr {
    Unit,
    Tuple(Vec<Type>),
    /// Named fields, each with a stable slot index.
    Bundle(BTreeMap<String, Field>),
    Func { input: Box<Type>, output: Box<Type> },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Field {
    pub ty: Type,
    pub index: usize,
}

impl Type {
    pub fn unit() -> Type {
        Type::Anonymous(TypeRepr::Unit)
    }

    pub fn param(index: usize) -> Type {
        Type::Parameter {
            index,
            being_inferred: false,
        }
    }

    pub fn inferred_param(index: usize) -> Type {
        Type::Parameter {
            index,
            being_inferred: true,
        }
    }

    pub fn named(name: Symbol, args: Vec<Type>) -> Type {
        Type::Named { name, args }
    }

    pub fn tuple(elements: Vec<Type>) -> Type {
        Type::Anonymous(TypeRepr::Tuple(elements))
    }

    /// A bundle whose slot indices follow the given order.
    pub fn bundle<S: Into<String>>(fields: impl IntoIterator<Item = (S, Type)>) -> Type {
        let fields = fields
            .into_iter()
            .enumerate()
            .map(|(index, (name, ty))| (name.into(), Field { ty, index }))
            .collect();
        Type::Anonymous(TypeRepr::Bundle(fields))
    }

    pub fn func(input: Type, output: Type) -> Type {
        Type::Anonymous(TypeRepr::Func {
            input: Box::new(input),
            output: Box::new(output),
        })
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Type::Anonymous(TypeRepr::Unit))
    }

    pub fn as_named(&self) -> Option<(&Symbol, &[Type])> {
        match self {
            Type::Named { name, args } => Some((name, args)),
            _ => None,
        }
    }

    /// Whether any parameter occurrence is flagged as being inferred.
    pub fn has_inferred_params(&self) -> bool {
        let mut found = false;
        self.map_params(&mut |index, being_inferred| {
            found |= being_inferred;
            Some(Type::Parameter {
                index,
                being_inferred,
            })
        });
        found
    }

    /// Rebuild the type, replacing each parameter occurrence for which `f`
    /// returns a type.
    pub fn map_params(&self, f: &mut impl FnMut(usize, bool) -> Option<Type>) -> Type {
        match self {
            Type::Never => Type::Never,
            Type::Any => Type::Any,
            Type::Parameter {
                index,
                being_inferred,
            } => f(*index, *being_inferred).unwrap_or_else(|| self.clone()),
            Type::Named { name, args } => Type::Named {
                name: name.clone(),
                args: args.iter().map(|a| a.map_params(f)).collect(),
            },
            Type::Anonymous(repr) => Type::Anonymous(match repr {
                TypeRepr::Unit => TypeRepr::Unit,
                TypeRepr::Tuple(elements) => {
                    TypeRepr::Tuple(elements.iter().map(|e| e.map_params(f)).collect())
                }
                TypeRepr::Bundle(fields) => TypeRepr::Bundle(
                    fields
                        .iter()
                        .map(|(name, field)| {
                            (
                                name.clone(),
                                Field {
                                    ty: field.ty.map_params(f),
                                    index: field.index,
                                },
                            )
                        })
                        .collect(),
                ),
                TypeRepr::Func { input, output } => TypeRepr::Func {
                    input: Box::new(input.map_params(f)),
                    output: Box::new(output.map_params(f)),
                },
            }),
        }
    }
}

/// Bundle fields in slot order.
pub fn ordered_fields(fields: &BTreeMap<String, Field>) -> Vec<(&String, &Field)> {
    let mut ordered: Vec<_> = fields.iter().collect();
    ordered.sort_by_key(|(_, f)| f.index);
    ordered
}

/// Substitute `args` for the parameters of `t`.
pub fn fill_type_args(t: &Type, args: &[Type]) -> Type {
    t.map_params(&mut |index, _| args.get(index).cloned())
}

/// Substitute `given` for the leading parameters of `t` and declared
/// defaults for the rest.
pub fn fill_type_args_with_defaults(t: &Type, given: &[Type], defaults: &FxHashMap<usize, Type>) -> Type {
    t.map_params(&mut |index, _| {
        given
            .get(index)
            .cloned()
            .or_else(|| defaults.get(&index).map(|d| fill_type_args(d, given)))
    })
}

/// Complete a possibly shortened argument list with declared defaults.
pub fn complete_args(given: &[Type], arity: usize, defaults: &FxHashMap<usize, Type>) -> Vec<Type> {
    let mut args: Vec<Type> = given.iter().take(arity).cloned().collect();
    for i in args.len()..arity {
        let arg = defaults
            .get(&i)
            .map(|d| fill_type_args(d, &args))
            .unwrap_or(Type::Any);
        args.push(arg);
    }
    args
}

/// Flag every parameter occurrence as a free inference variable.
pub fn mark_params_as_being_inferred(t: &Type) -> Type {
    t.map_params(&mut |index, _| Some(Type::inferred_param(index)))
}

/// Structural equality that ignores the being-inferred flag.
pub fn types_equal(a: &Type, b: &Type) -> bool {
    match (a, b) {
        (Type::Never, Type::Never) | (Type::Any, Type::Any) => true,
        (Type::Parameter { index: i, .. }, Type::Parameter { index: j, .. }) => i == j,
        (Type::Named { name: n1, args: a1 }, Type::Named { name: n2, args: a2 }) => {
            n1 == n2 && a1.len() == a2.len() && a1.iter().zip(a2).all(|(x, y)| types_equal(x, y))
        }
        (Type::Anonymous(r1), Type::Anonymous(r2)) => match (r1, r2) {
            (TypeRepr::Unit, TypeRepr::Unit) => true,
            (TypeRepr::Tuple(e1), TypeRepr::Tuple(e2)) => {
                e1.len() == e2.len() && e1.iter().zip(e2).all(|(x, y)| types_equal(x, y))
            }
            (TypeRepr::Bundle(f1), TypeRepr::Bundle(f2)) => {
                f1.len() == f2.len()
                    && f1.iter().all(|(name, field)| {
                        f2.get(name)
                            .map_or(false, |other| types_equal(&field.ty, &other.ty))
                    })
            }
            (
                TypeRepr::Func {
                    input: i1,
                    output: o1,
                },
                TypeRepr::Func {
                    input: i2,
                    output: o2,
                },
            ) => types_equal(i1, i2) && types_equal(o1, o2),
            _ => false,
        },
        _ => false,
    }
}

// ── Declarations ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParam {
    pub name: String,
    pub variance: Variance,
}

pub fn param_names(params: &[TypeParam]) -> Vec<String> {
    params.iter().map(|p| p.name.clone()).collect()
}

/// Per-parameter bounds: `lower` holds `T > B` (every argument must be a
/// supertype of `B`), `upper` holds `T < B`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeBounds {
    pub lower: FxHashMap<usize, Type>,
    pub upper: FxHashMap<usize, Type>,
}

impl TypeBounds {
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty() && self.upper.is_empty()
    }
}

/// A generic type declaration.
#[derive(Debug, Clone)]
pub struct GenericType {
    pub doc: String,
    pub tags: TypeTags,
    pub params: Vec<TypeParam>,
    pub bounds: TypeBounds,
    pub defaults: FxHashMap<usize, Type>,
    pub def: TypeDef,
    /// Set when this type is a case of a union.
    pub case_info: Option<CaseInfo>,
    pub span: TextRange,
}

impl GenericType {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Fewest arguments a reference may give; the rest come from the
    /// trailing run of defaulted parameters.
    pub fn min_arity(&self) -> usize {
        let trailing = (0..self.arity())
            .rev()
            .take_while(|i| self.defaults.contains_key(i))
            .count();
        self.arity() - trailing
    }

    pub fn as_boxed(&self) -> Option<&Boxed> {
        match &self.def {
            TypeDef::Boxed(boxed) => Some(boxed),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&[CaseType]> {
        match &self.def {
            TypeDef::Union(cases) => Some(cases),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDef {
    Union(Vec<CaseType>),
    Boxed(Boxed),
    Native,
}

/// A case of a union: `params[i]` is the union parameter that the case's
/// `i`-th parameter stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseType {
    pub name: Symbol,
    pub params: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Boxed {
    pub inner: Type,
    pub implicit: bool,
    pub weak: bool,
    /// Only boxable inside the declaring module.
    pub protected: bool,
    /// Only unboxable inside the declaring module.
    pub opaque: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseInfo {
    pub union_name: Symbol,
    pub union_arity: usize,
    pub union_variance: Vec<Variance>,
    pub case_index: usize,
    pub case_params: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeTags {
    pub data: Option<DataConfig>,
}

/// `# data: name=..., ver=...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataConfig {
    pub name: String,
    pub version: String,
}

// ── Registry ───────────────────────────────────────────────────────────

/// All type declarations of a program, keyed by qualified name.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: FxHashMap<Symbol, GenericType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &Symbol) -> Option<&GenericType> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &Symbol) -> bool {
        self.types.contains_key(name)
    }

    pub fn insert(&mut self, name: Symbol, g: GenericType) {
        self.types.insert(name, g);
    }

    pub fn remove(&mut self, name: &Symbol) -> Option<GenericType> {
        self.types.remove(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Declarations sorted by name.
    pub fn sorted(&self) -> Vec<(&Symbol, &GenericType)> {
        let mut all: Vec<_> = self.types.iter().collect();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all
    }

    pub fn extend(&mut self, other: TypeRegistry) {
        self.types.extend(other.types);
    }
}

/// What a type-level operation needs to know about where it runs: the
/// current module (for visibility), the registry, and the parameters and
/// bounds of the enclosing declaration.
#[derive(Debug, Clone, Copy)]
pub struct TypeCtx<'a> {
    pub module: &'a str,
    pub registry: &'a TypeRegistry,
    pub params: &'a [TypeParam],
    pub bounds: &'a TypeBounds,
}
