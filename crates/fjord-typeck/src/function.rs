//! Function and constant signatures, and checking their bodies.
//!
//! Before any body is checked, the signatures a module can see are
//! collected into a [`ModuleScope`]: its own functions and constants,
//! followed by the public ones of every imported module (including
//! `Core`). Functions of the same name form one overload set.

use fjord_ast::item::{BoundKind, ConstDecl, ConstValue, FunctionBody, FunctionDecl, Module};
use fjord_common::Symbol;
use rowan::TextRange;
use rustc_hash::FxHashMap;

use crate::assign::assign_to;
use crate::config::Limits;
use crate::declare::{parse_type_params, resolve_type};
use crate::describe::describe_type;
use crate::error::{
    CheckError, ExprError, FunctionError, FunctionErrorKind, TypeDeclErrorKind, TypeError, TypeErrorKind,
};
use crate::expr::{check_and_assign, Expr, ExprContext};
use crate::infer::TypeArgsInferringContext;
use crate::lambda::check_lambda;
use crate::overload::validate_overload;
use crate::ty::{Type, TypeBounds, TypeCtx, TypeParam, TypeRegistry};

/// Names no function or constant may take.
const RESERVED_VALUE_NAMES: &[&str] = &["_", "-", "never", "any", "super"];

pub fn is_valid_value_name(name: &str) -> bool {
    !(name.is_empty() || name.ends_with('!') || RESERVED_VALUE_NAMES.contains(&name))
}

// ── Signatures ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSig {
    pub symbol: Symbol,
    /// Position among the functions of this name in the declaring module.
    pub index: usize,
    pub public: bool,
    pub doc: String,
    pub params: Vec<TypeParam>,
    pub bounds: TypeBounds,
    pub input: Type,
    pub output: Type,
    pub span: TextRange,
}

impl FunctionSig {
    pub fn func_type(&self) -> Type {
        Type::func(self.input.clone(), self.output.clone())
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantSig {
    pub symbol: Symbol,
    pub ty: Type,
    pub public: bool,
    pub doc: String,
    pub span: TextRange,
}

/// Everything a module can refer to by value.
#[derive(Debug, Clone, Default)]
pub struct ModuleScope {
    pub module: String,
    pub functions: FxHashMap<String, Vec<FunctionSig>>,
    pub constants: FxHashMap<Symbol, ConstantSig>,
}

impl ModuleScope {
    /// Overload `index` of `name` declared by this module itself.
    pub fn own_function(&self, name: &str, index: usize) -> Option<&FunctionSig> {
        self.functions
            .get(name)?
            .iter()
            .find(|f| f.symbol.module == self.module && f.index == index)
    }
}

fn signature_error(err: TypeError) -> CheckError {
    let span = err.span;
    FunctionError::new(FunctionErrorKind::Signature(err), span).into()
}

/// Resolve the parameters, bounds and types of a function signature.
pub fn function_sig(
    decl: &FunctionDecl,
    module: &str,
    index: usize,
    registry: &TypeRegistry,
    limits: &Limits,
) -> Result<FunctionSig, CheckError> {
    let name = decl.name.name.as_str();
    if !is_valid_value_name(name) {
        return Err(FunctionError::new(FunctionErrorKind::InvalidName { name: name.into() }, decl.name.span).into());
    }
    let params = parse_type_params(&decl.params).map_err(|err| -> CheckError {
        let kind = match err.kind {
            TypeDeclErrorKind::DuplicateTypeParam { name } => FunctionErrorKind::DuplicateTypeParam { name },
            TypeDeclErrorKind::InvalidTypeName { name } => FunctionErrorKind::InvalidName { name },
            _ => FunctionErrorKind::InvalidName { name: name.into() },
        };
        FunctionError::new(kind, err.span).into()
    })?;

    let unbounded = TypeBounds::default();
    let bare = TypeCtx {
        module,
        registry,
        params: &params,
        bounds: &unbounded,
    };
    let mut bounds = TypeBounds::default();
    for (i, p) in decl.params.iter().enumerate() {
        let Some(bound) = &p.bound else {
            continue;
        };
        let t = resolve_type(&bound.ty, &bare, limits).map_err(signature_error)?;
        if let Type::Parameter { .. } = t {
            return Err(signature_error(TypeError::new(
                TypeErrorKind::InvalidBoundType {
                    ty: describe_type(&t, module, &params),
                },
                bound.ty.span,
            )));
        }
        match bound.kind {
            BoundKind::Sub => bounds.lower.insert(i, t),
            BoundKind::Super => bounds.upper.insert(i, t),
        };
    }

    let ctx = TypeCtx {
        bounds: &bounds,
        ..bare
    };
    let input = resolve_type(&decl.input, &ctx, limits).map_err(signature_error)?;
    let output = resolve_type(&decl.output, &ctx, limits).map_err(signature_error)?;
    Ok(FunctionSig {
        symbol: Symbol::new(module, name),
        index,
        public: decl.public,
        doc: decl.doc.clone(),
        params,
        bounds,
        input,
        output,
        span: decl.span,
    })
}

pub fn constant_sig(
    decl: &ConstDecl,
    module: &str,
    registry: &TypeRegistry,
    limits: &Limits,
) -> Result<ConstantSig, CheckError> {
    let name = decl.name.name.as_str();
    if !is_valid_value_name(name) {
        return Err(FunctionError::new(FunctionErrorKind::InvalidName { name: name.into() }, decl.name.span).into());
    }
    let bounds = TypeBounds::default();
    let ctx = TypeCtx {
        module,
        registry,
        params: &[],
        bounds: &bounds,
    };
    let ty = resolve_type(&decl.ty, &ctx, limits).map_err(signature_error)?;
    Ok(ConstantSig {
        symbol: Symbol::new(module, name),
        ty,
        public: decl.public,
        doc: decl.doc.clone(),
        span: decl.span,
    })
}

/// Per-name declaration indices, in declaration order.
pub(crate) fn overload_indices(module: &Module) -> Vec<usize> {
    let mut seen: FxHashMap<&str, usize> = FxHashMap::default();
    module
        .functions
        .iter()
        .map(|f| {
            let next = seen.entry(f.name.name.as_str()).or_insert(0);
            let index = *next;
            *next += 1;
            index
        })
        .collect()
}

/// Collect the signatures visible in `module`.
///
/// Errors in the module's own signatures are returned; those of imported
/// modules are reported when those modules are checked, and their broken
/// declarations are simply left out.
pub fn collect_scope(
    module: &Module,
    imported: &[&Module],
    registry: &TypeRegistry,
    limits: &Limits,
) -> (ModuleScope, Vec<CheckError>) {
    let mut scope = ModuleScope {
        module: module.name.clone(),
        ..ModuleScope::default()
    };
    let mut errors = Vec::new();

    for (decl, index) in module.functions.iter().zip(overload_indices(module)) {
        match function_sig(decl, &module.name, index, registry, limits) {
            Ok(sig) => add_function(&mut scope, sig, &mut errors),
            Err(err) => errors.push(err),
        }
    }
    for decl in &module.constants {
        match constant_sig(decl, &module.name, registry, limits) {
            Ok(sig) => {
                if scope.constants.contains_key(&sig.symbol) {
                    errors.push(
                        FunctionError::new(
                            FunctionErrorKind::DuplicateConstant {
                                name: sig.symbol.name.clone(),
                            },
                            decl.name.span,
                        )
                        .into(),
                    );
                } else {
                    scope.constants.insert(sig.symbol.clone(), sig);
                }
            }
            Err(err) => errors.push(err),
        }
    }

    for other in imported {
        for (decl, index) in other.functions.iter().zip(overload_indices(other)) {
            if !decl.public {
                continue;
            }
            if let Ok(sig) = function_sig(decl, &other.name, index, registry, limits) {
                add_function(&mut scope, sig, &mut errors);
            }
        }
        for decl in other.constants.iter().filter(|c| c.public) {
            if let Ok(sig) = constant_sig(decl, &other.name, registry, limits) {
                scope.constants.entry(sig.symbol.clone()).or_insert(sig);
            }
        }
    }
    (scope, errors)
}

fn add_function(scope: &mut ModuleScope, sig: FunctionSig, errors: &mut Vec<CheckError>) {
    let overloads = scope.functions.entry(sig.symbol.name.clone()).or_default();
    // Clashes between two imported modules are their own problem.
    let own = sig.symbol.module == scope.module;
    for existing in overloads.iter() {
        if let Err(err) = validate_overload(existing, &sig) {
            if own {
                errors.push(err.into());
            }
            return;
        }
    }
    overloads.push(sig);
}

// ── Bodies ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum CheckedBody {
    Expr(Expr),
    /// Implemented by the host runtime under this id.
    Native(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckedFunction {
    pub sig: FunctionSig,
    pub body: CheckedBody,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckedConstant {
    pub sig: ConstantSig,
    pub value: CheckedBody,
}

/// Where bodies of one module are checked.
#[derive(Clone, Copy)]
pub struct BodyEnv<'a> {
    pub registry: &'a TypeRegistry,
    pub scope: &'a ModuleScope,
    pub limits: &'a Limits,
}

impl<'a> BodyEnv<'a> {
    pub(crate) fn ctx(&self, params: &'a [TypeParam], bounds: &'a TypeBounds) -> ExprContext<'a> {
        ExprContext {
            module: &self.scope.module,
            registry: self.registry,
            scope: self.scope,
            params,
            bounds,
            limits: self.limits,
            locals: FxHashMap::default(),
        }
    }
}

/// Check a function body against its signature.
pub fn check_function(
    decl: &FunctionDecl,
    sig: &FunctionSig,
    env: BodyEnv<'_>,
) -> Result<CheckedFunction, ExprError> {
    let body = match &decl.body {
        FunctionBody::Native(id) => CheckedBody::Native(id.clone()),
        FunctionBody::Lambda(lambda) => {
            let ctx = env.ctx(&sig.params, &sig.bounds);
            let semi = check_lambda(lambda, lambda.span, &ctx);
            let f_type = sig.func_type();
            let expr = assign_to(Some(&f_type), semi, &ctx, &mut TypeArgsInferringContext::disabled())?;
            CheckedBody::Expr(expr)
        }
    };
    Ok(CheckedFunction {
        sig: sig.clone(),
        body,
    })
}

pub fn check_constant(decl: &ConstDecl, sig: &ConstantSig, env: BodyEnv<'_>) -> Result<CheckedConstant, ExprError> {
    let value = match &decl.value {
        ConstValue::Native(id) => CheckedBody::Native(id.clone()),
        ConstValue::Expr(expr) => {
            let bounds = TypeBounds::default();
            let ctx = env.ctx(&[], &bounds);
            let checked = check_and_assign(Some(&sig.ty), expr, &ctx, &mut TypeArgsInferringContext::disabled())?;
            CheckedBody::Expr(checked)
        }
    };
    Ok(CheckedConstant {
        sig: sig.clone(),
        value,
    })
}
