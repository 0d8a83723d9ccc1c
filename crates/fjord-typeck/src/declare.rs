//! Registering type declarations.
//!
//! Declarations of every module are registered together so that modules
//! may refer to each other's types. Registration runs in stages:
//!
//! 1. collect declarations, flattening union cases and mapping their
//!    parameters onto the union's
//! 2. convert parameters, bounds, defaults and definitions into [`Type`]s
//! 3. reject circular chains of boxed types
//! 4. validate every definition and its bounds
//!
//! Errors never stop registration; an invalid declaration is left out of
//! the registry and reported under its module.

use fjord_ast::item::{BoundKind, Module, Tag, TypeDecl, TypeDefExpr, TypeParamDecl};
use fjord_ast::ty::{TypeExpr, TypeExprKind};
use fjord_ast::RefName;
use fjord_common::Symbol;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::bounds::{check_type_bounds, check_type_def_bounds};
use crate::config::Limits;
use crate::describe::describe_type;
use crate::error::{CheckError, TypeDeclError, TypeDeclErrorKind, TypeError, TypeErrorKind};
use crate::ty::{
    complete_args, Boxed, CaseInfo, CaseType, DataConfig, GenericType, Type, TypeBounds, TypeCtx, TypeDef,
    TypeParam, TypeRegistry, TypeRepr, TypeTags,
};
use crate::validate::{validate_named, validate_product_size, validate_type, validate_type_def, Arities, TypeLookup};
use crate::variance::{params_variance, Variance};

/// Names no type or type parameter may take.
pub const RESERVED_TYPE_NAMES: &[&str] = &["_", "-", "never", "any", "super"];

/// Written in type position, `-` is unit.
pub const UNIT_ALIAS: &str = "-";

pub fn is_valid_type_name(name: &str) -> bool {
    !(name.is_empty()
        || name.ends_with('!')
        || name.starts_with('+')
        || name.starts_with('-')
        || RESERVED_TYPE_NAMES.contains(&name))
}

/// Parse declared parameters, reading `+` / `-` prefixes as variance.
pub fn parse_type_params(decls: &[TypeParamDecl]) -> Result<Vec<TypeParam>, TypeDeclError> {
    let mut params: Vec<TypeParam> = Vec::with_capacity(decls.len());
    for decl in decls {
        let raw = decl.name.name.as_str();
        let (name, variance) = if let Some(rest) = raw.strip_prefix('+') {
            (rest, Variance::Covariant)
        } else if let Some(rest) = raw.strip_prefix('-').filter(|rest| !rest.is_empty()) {
            (rest, Variance::Contravariant)
        } else {
            (raw, Variance::Invariant)
        };
        if !is_valid_type_name(name) {
            return Err(TypeDeclError::new(
                TypeDeclErrorKind::InvalidTypeName {
                    name: raw.to_string(),
                },
                decl.name.span,
            ));
        }
        if params.iter().any(|p| p.name == name) {
            return Err(TypeDeclError::new(
                TypeDeclErrorKind::DuplicateTypeParam {
                    name: name.to_string(),
                },
                decl.name.span,
            ));
        }
        params.push(TypeParam {
            name: name.to_string(),
            variance,
        });
    }
    Ok(params)
}

// ── Type expressions ───────────────────────────────────────────────────

/// Where a type expression is converted.
#[derive(Clone, Copy)]
pub struct TypeScope<'a> {
    pub module: &'a str,
    pub params: &'a [TypeParam],
    pub lookup: &'a dyn TypeLookup,
    pub limits: &'a Limits,
}

/// Resolve an unqualified name to the current module, falling back to the
/// core module.
pub fn resolve_type_name(name: &RefName, module: &str, lookup: &dyn TypeLookup) -> Symbol {
    if let Some(m) = &name.module {
        return Symbol::new(m.as_str(), name.name.as_str());
    }
    let local = Symbol::new(module, name.name.as_str());
    if lookup.arity_range(&local).is_some() {
        return local;
    }
    let core = Symbol::core(name.name.as_str());
    if lookup.arity_range(&core).is_some() {
        core
    } else {
        local
    }
}

/// Convert a written type. References may still omit defaulted trailing
/// arguments; see [`complete_type`].
pub fn convert_type(te: &TypeExpr, scope: &TypeScope<'_>) -> Result<Type, TypeError> {
    match &te.kind {
        TypeExprKind::Ref { name, args } => {
            if !name.is_qualified() && args.is_empty() {
                match name.name.as_str() {
                    UNIT_ALIAS => return Ok(Type::unit()),
                    "never" => return Ok(Type::Never),
                    "any" => return Ok(Type::Any),
                    other => {
                        if let Some(index) = scope.params.iter().position(|p| p.name == other) {
                            return Ok(Type::param(index));
                        }
                    }
                }
            }
            let symbol = resolve_type_name(name, scope.module, scope.lookup);
            validate_named(&symbol, args.len(), scope.lookup, te.span)?;
            let args = args
                .iter()
                .map(|arg| convert_type(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Type::named(symbol, args))
        }
        TypeExprKind::Tuple(elements) => match elements.as_slice() {
            [] => Ok(Type::unit()),
            [single] => convert_type(single, scope),
            _ => {
                validate_product_size(elements.len(), scope.limits, te.span)?;
                let elements = elements
                    .iter()
                    .map(|el| convert_type(el, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Type::tuple(elements))
            }
        },
        TypeExprKind::Bundle(fields) => {
            if fields.is_empty() {
                return Ok(Type::unit());
            }
            validate_product_size(fields.len(), scope.limits, te.span)?;
            let mut seen = FxHashSet::default();
            let mut converted = Vec::with_capacity(fields.len());
            for field in fields {
                let name = field.name.name.as_str();
                if name == "_" {
                    return Err(TypeError::new(
                        TypeErrorKind::InvalidFieldName { name: name.into() },
                        field.name.span,
                    ));
                }
                if !seen.insert(name) {
                    return Err(TypeError::new(
                        TypeErrorKind::DuplicateField { name: name.into() },
                        field.name.span,
                    ));
                }
                converted.push((name, convert_type(&field.ty, scope)?));
            }
            Ok(Type::bundle(converted))
        }
        TypeExprKind::Func { input, output } => Ok(Type::func(
            convert_type(input, scope)?,
            convert_type(output, scope)?,
        )),
    }
}

/// Fill omitted trailing arguments of every reference with declared
/// defaults.
pub fn complete_type(t: &Type, registry: &TypeRegistry) -> Type {
    match t {
        Type::Never | Type::Any | Type::Parameter { .. } => t.clone(),
        Type::Named { name, args } => {
            let args: Vec<Type> = args.iter().map(|a| complete_type(a, registry)).collect();
            let args = match registry.get(name) {
                Some(g) if args.len() < g.arity() => complete_args(&args, g.arity(), &g.defaults),
                _ => args,
            };
            Type::named(name.clone(), args)
        }
        Type::Anonymous(repr) => Type::Anonymous(match repr {
            TypeRepr::Unit => TypeRepr::Unit,
            TypeRepr::Tuple(elements) => {
                TypeRepr::Tuple(elements.iter().map(|e| complete_type(e, registry)).collect())
            }
            TypeRepr::Bundle(fields) => TypeRepr::Bundle(
                fields
                    .iter()
                    .map(|(name, f)| {
                        let mut f = f.clone();
                        f.ty = complete_type(&f.ty, registry);
                        (name.clone(), f)
                    })
                    .collect(),
            ),
            TypeRepr::Func { input, output } => TypeRepr::Func {
                input: Box::new(complete_type(input, registry)),
                output: Box::new(complete_type(output, registry)),
            },
        }),
    }
}

/// Convert, complete and bound-check a type written inside a function
/// signature or an expression.
pub fn resolve_type(te: &TypeExpr, ctx: &TypeCtx<'_>, limits: &Limits) -> Result<Type, TypeError> {
    let scope = TypeScope {
        module: ctx.module,
        params: ctx.params,
        lookup: ctx.registry,
        limits,
    };
    let t = complete_type(&convert_type(te, &scope)?, ctx.registry);
    check_type_bounds(&t, ctx, te.span)?;
    Ok(t)
}

// ── Tags ───────────────────────────────────────────────────────────────

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Parse `# data: name=Point, ver=v1` style tags.
pub fn parse_type_tags(tags: &[Tag]) -> Result<TypeTags, TypeDeclError> {
    let mut parsed = TypeTags::default();
    for tag in tags {
        let invalid = |info: String| {
            TypeDeclError::new(
                TypeDeclErrorKind::InvalidTypeTag {
                    tag: tag.text.clone(),
                    info,
                },
                tag.span,
            )
        };
        let raw = tag.text.trim_end_matches('\r').trim_start_matches('#').trim();
        let Some((kind, body)) = raw.split_once(':') else {
            return Err(invalid("wrong format".into()));
        };
        if kind.trim() != "data" {
            return Err(invalid(format!("invalid type tag kind: {}", kind.trim())));
        }
        let mut name = None;
        let mut version = None;
        for item in body.split(',') {
            let item = item.trim();
            let Some((key, val)) = item.split_once('=') else {
                return Err(invalid(format!("invalid data config item: {}", item)));
            };
            let slot = match key {
                "name" => &mut name,
                "ver" => &mut version,
                _ => return Err(invalid(format!("unknown data config key: {}", key))),
            };
            if !is_identifier(val) {
                return Err(invalid(format!("invalid value for item '{}': {}", key, val)));
            }
            *slot = Some(val.to_string());
        }
        let Some(name) = name else {
            return Err(invalid("invalid data config: 'name' not set".into()));
        };
        let Some(version) = version else {
            return Err(invalid("invalid data config: 'ver' not set".into()));
        };
        parsed.data = Some(DataConfig { name, version });
    }
    Ok(parsed)
}

// ── Registration ───────────────────────────────────────────────────────

/// The registry of a program's types together with the errors found while
/// building it, keyed by module.
#[derive(Debug, Default)]
pub struct DeclaredTypes {
    pub registry: TypeRegistry,
    pub errors: Vec<(String, CheckError)>,
}

impl DeclaredTypes {
    pub fn errors_of<'a>(&'a self, module: &'a str) -> impl Iterator<Item = &'a CheckError> + 'a {
        self.errors
            .iter()
            .filter(move |(m, _)| m == module)
            .map(|(_, e)| e)
    }
}

struct Entry<'a> {
    module: &'a str,
    symbol: Symbol,
    decl: &'a TypeDecl,
    params: Vec<TypeParam>,
    /// For a case type: the owning union entry and, per case parameter,
    /// the union parameter it stands for.
    union: Option<(usize, Vec<usize>)>,
}

struct Declarer<'a> {
    entries: Vec<Entry<'a>>,
    seen: FxHashSet<Symbol>,
    errors: Vec<(String, CheckError)>,
}

impl<'a> Declarer<'a> {
    fn error(&mut self, module: &str, err: impl Into<CheckError>) {
        self.errors.push((module.to_string(), err.into()));
    }

    fn collect(&mut self, module: &'a str, decl: &'a TypeDecl, owner: Option<usize>) {
        let name = decl.name.name.as_str();
        if !is_valid_type_name(name) {
            let err = TypeDeclError::new(TypeDeclErrorKind::InvalidTypeName { name: name.into() }, decl.name.span);
            return self.error(module, err);
        }
        let symbol = Symbol::new(module, name);
        if !self.seen.insert(symbol.clone()) {
            let err = TypeDeclError::new(
                TypeDeclErrorKind::DuplicateTypeDecl {
                    name: symbol.to_string(),
                },
                decl.name.span,
            );
            return self.error(module, err);
        }
        let params = match parse_type_params(&decl.params) {
            Ok(params) => params,
            Err(err) => return self.error(module, err),
        };
        let union = match owner {
            None => None,
            Some(u) => {
                let mut mapping = Vec::with_capacity(params.len());
                for (p, p_decl) in params.iter().zip(&decl.params) {
                    match self.entries[u].params.iter().position(|up| up.name == p.name) {
                        Some(j) => mapping.push(j),
                        None => {
                            let err = TypeDeclError::new(
                                TypeDeclErrorKind::InvalidCaseTypeParam { name: p.name.clone() },
                                p_decl.name.span,
                            );
                            return self.error(module, err);
                        }
                    }
                }
                Some((u, mapping))
            }
        };
        let index = self.entries.len();
        self.entries.push(Entry {
            module,
            symbol,
            decl,
            params,
            union,
        });
        if let TypeDefExpr::Union(cases) = &decl.def {
            for case in cases {
                self.collect(module, case, Some(index));
            }
        }
    }

    fn build(
        &self,
        index: usize,
        children: &[Vec<usize>],
        arities: &Arities,
        limits: &Limits,
    ) -> Result<GenericType, CheckError> {
        let entry = &self.entries[index];
        let decl = entry.decl;
        let scope = TypeScope {
            module: entry.module,
            params: &entry.params,
            lookup: arities,
            limits,
        };
        let invalid = |detail: TypeError| -> CheckError {
            TypeDeclError::new(
                TypeDeclErrorKind::InvalidTypeDecl {
                    type_name: entry.symbol.to_string(),
                    detail,
                },
                decl.span,
            )
            .into()
        };
        let tags = parse_type_tags(&decl.tags)?;

        let mut bounds = TypeBounds::default();
        let mut defaults = FxHashMap::default();
        for (i, p) in decl.params.iter().enumerate() {
            if let Some(bound) = &p.bound {
                let t = convert_type(&bound.ty, &scope).map_err(invalid)?;
                if let Type::Parameter { .. } = t {
                    return Err(invalid(TypeError::new(
                        TypeErrorKind::InvalidBoundType {
                            ty: describe_type(&t, entry.module, &entry.params),
                        },
                        bound.ty.span,
                    )));
                }
                match bound.kind {
                    BoundKind::Sub => bounds.lower.insert(i, t),
                    BoundKind::Super => bounds.upper.insert(i, t),
                };
            }
            if let Some(default) = &p.default {
                defaults.insert(i, convert_type(default, &scope).map_err(invalid)?);
            }
        }

        let def = match &decl.def {
            TypeDefExpr::Union(_) => TypeDef::Union(
                children[index]
                    .iter()
                    .filter_map(|&c| {
                        let case = &self.entries[c];
                        case.union.as_ref().map(|(_, mapping)| CaseType {
                            name: case.symbol.clone(),
                            params: mapping.clone(),
                        })
                    })
                    .collect(),
            ),
            TypeDefExpr::Boxed(boxed) => {
                let inner = match &boxed.inner {
                    Some(te) => convert_type(te, &scope).map_err(invalid)?,
                    None => Type::unit(),
                };
                TypeDef::Boxed(Boxed {
                    inner,
                    implicit: boxed.implicit,
                    weak: boxed.weak,
                    protected: boxed.protected,
                    opaque: boxed.opaque,
                })
            }
            TypeDefExpr::Native => TypeDef::Native,
        };

        let case_info = entry.union.as_ref().map(|(u, mapping)| {
            let union = &self.entries[*u];
            CaseInfo {
                union_name: union.symbol.clone(),
                union_arity: union.params.len(),
                union_variance: params_variance(&union.params),
                case_index: children[*u].iter().position(|&c| c == index).unwrap_or_default(),
                case_params: mapping.clone(),
            }
        });

        Ok(GenericType {
            doc: decl.doc.clone(),
            tags,
            params: entry.params.clone(),
            bounds,
            defaults,
            def,
            case_info,
            span: decl.span,
        })
    }
}

fn complete_decl(g: &GenericType, registry: &TypeRegistry) -> GenericType {
    let mut g = g.clone();
    let complete_map = |map: &mut FxHashMap<usize, Type>| {
        for t in map.values_mut() {
            *t = complete_type(t, registry);
        }
    };
    complete_map(&mut g.bounds.lower);
    complete_map(&mut g.bounds.upper);
    complete_map(&mut g.defaults);
    if let TypeDef::Boxed(boxed) = &mut g.def {
        boxed.inner = complete_type(&boxed.inner, registry);
    }
    g
}

/// The boxed chain starting at `start`, if it leads back to `start`.
fn boxed_cycle(start: &Symbol, registry: &TypeRegistry) -> Option<Vec<Symbol>> {
    let mut path = vec![start.clone()];
    let mut current = start.clone();
    loop {
        let next = match registry.get(&current)?.as_boxed()?.inner.as_named() {
            Some((name, _)) => name.clone(),
            None => return None,
        };
        if next == *start {
            path.push(next);
            return Some(path);
        }
        if path.contains(&next) {
            return None;
        }
        path.push(next.clone());
        current = next;
    }
}

/// Register the type declarations of `modules`.
pub fn declare_types(modules: &[&Module], limits: &Limits) -> DeclaredTypes {
    let mut declarer = Declarer {
        entries: Vec::new(),
        seen: FxHashSet::default(),
        errors: Vec::new(),
    };
    for module in modules {
        for decl in &module.types {
            declarer.collect(&module.name, decl, None);
        }
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); declarer.entries.len()];
    let mut arities = Arities::default();
    for (i, entry) in declarer.entries.iter().enumerate() {
        if let Some((u, _)) = &entry.union {
            children[*u].push(i);
        }
        let arity = entry.params.len();
        let trailing_defaults = entry
            .decl
            .params
            .iter()
            .rev()
            .take_while(|p| p.default.is_some())
            .count();
        arities.insert(entry.symbol.clone(), arity - trailing_defaults, arity);
    }

    let mut registry = TypeRegistry::new();
    let mut failed = Vec::new();
    for index in 0..declarer.entries.len() {
        match declarer.build(index, &children, &arities, limits) {
            Ok(g) => registry.insert(declarer.entries[index].symbol.clone(), g),
            Err(err) => failed.push((declarer.entries[index].module.to_string(), err)),
        }
    }
    declarer.errors.extend(failed);

    let completed: Vec<(Symbol, GenericType)> = registry
        .sorted()
        .into_iter()
        .map(|(name, g)| (name.clone(), complete_decl(g, &registry)))
        .collect();
    for (name, g) in completed {
        registry.insert(name, g);
    }

    // Boxed chains are followed by unboxing, so a cycle must not survive.
    let mut cyclic: Vec<(Symbol, Vec<Symbol>)> = Vec::new();
    for (name, _) in registry.sorted() {
        if let Some(path) = boxed_cycle(name, &registry) {
            cyclic.push((name.clone(), path));
        }
    }
    for (name, path) in &cyclic {
        // Report each cycle once, from its smallest member.
        if path.iter().all(|member| member >= name) {
            let span = registry.get(name).map(|g| g.span).unwrap_or_default();
            let err = TypeDeclError::new(
                TypeDeclErrorKind::TypeCircularDependency {
                    path: path.iter().map(|s| s.to_string()).collect(),
                },
                span,
            );
            declarer.errors.push((name.module.clone(), err.into()));
        }
    }
    for (name, _) in &cyclic {
        registry.remove(name);
    }

    for (name, g) in registry.sorted() {
        let ctx = TypeCtx {
            module: &name.module,
            registry: &registry,
            params: &g.params,
            bounds: &g.bounds,
        };
        if let Err(detail) = validate_decl(g, &ctx, limits) {
            let err = TypeDeclError::new(
                TypeDeclErrorKind::InvalidTypeDecl {
                    type_name: name.to_string(),
                    detail,
                },
                g.span,
            );
            declarer.errors.push((name.module.clone(), err.into()));
        }
    }

    tracing::debug!(
        types = registry.len(),
        errors = declarer.errors.len(),
        "declared types"
    );
    DeclaredTypes {
        registry,
        errors: declarer.errors,
    }
}

fn validate_decl(g: &GenericType, ctx: &TypeCtx<'_>, limits: &Limits) -> Result<(), TypeError> {
    validate_type_def(g, ctx, limits)?;
    for bound in g.bounds.lower.values().chain(g.bounds.upper.values()) {
        validate_type(bound, ctx.registry, limits, g.span)?;
        check_type_bounds(bound, ctx, g.span)?;
    }
    check_type_def_bounds(g, ctx)
}
